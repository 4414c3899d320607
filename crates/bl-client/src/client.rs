use std::time::Duration;

use async_trait::async_trait;
use bl_api_types::{
    ConfirmAppointmentRequest, ConfirmAppointmentResponse, TaskCreateRequest, TaskCreateResponse,
    TaskList, TaskState, TaskSummary,
};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{extract_error_message, ApiError};

pub type Result<T> = std::result::Result<T, ApiError>;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5001";
pub const DEFAULT_PATH_PREFIX: &str = "/api/v1";

/// The remote task-processing service.
///
/// Each method is a single request/response with no retry policy; callers
/// decide what a failure means.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// `POST /tasks/`
    async fn create_task(&self, request: &TaskCreateRequest) -> Result<TaskCreateResponse>;

    /// `GET /tasks/{task_id}`
    async fn get_task_status(&self, task_id: &str) -> Result<TaskState>;

    /// `POST /appointments/confirm`
    async fn confirm_appointment(
        &self,
        request: &ConfirmAppointmentRequest,
    ) -> Result<ConfirmAppointmentResponse>;

    /// `GET /tasks/`
    async fn list_tasks(&self) -> Result<Vec<TaskSummary>>;
}

/// [`TaskApi`] over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpTaskClient {
    http: reqwest::Client,
    base: String,
}

impl HttpTaskClient {
    /// `base_url` is scheme + host (`http://localhost:5001`); `path_prefix`
    /// is the mount point of the task routes (`/api/v1`).
    pub fn new(base_url: &str, path_prefix: &str) -> Result<Self> {
        Self::with_timeout(base_url, path_prefix, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: &str, path_prefix: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base: join_base(base_url, path_prefix),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    async fn send<R: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<R> {
        let resp = request.header(ACCEPT, "application/json").send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);
            let message = extract_error_message(&body);
            debug!(status = status.as_u16(), %message, "backend returned error status");
            return Err(ApiError::Http {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TaskApi for HttpTaskClient {
    async fn create_task(&self, request: &TaskCreateRequest) -> Result<TaskCreateResponse> {
        let url = format!("{}/tasks/", self.base);
        self.send(self.http.post(url).json(request)).await
    }

    async fn get_task_status(&self, task_id: &str) -> Result<TaskState> {
        let url = format!("{}/tasks/{}", self.base, task_id);
        self.send(self.http.get(url)).await
    }

    async fn confirm_appointment(
        &self,
        request: &ConfirmAppointmentRequest,
    ) -> Result<ConfirmAppointmentResponse> {
        let url = format!("{}/appointments/confirm", self.base);
        self.send(self.http.post(url).json(request)).await
    }

    async fn list_tasks(&self) -> Result<Vec<TaskSummary>> {
        let url = format!("{}/tasks/", self.base);
        let list: TaskList = self.send(self.http.get(url)).await?;
        Ok(list.tasks)
    }
}

fn join_base(base_url: &str, path_prefix: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let prefix = path_prefix.trim_matches('/');
    if prefix.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{prefix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_joins_without_double_slashes() {
        assert_eq!(join_base("http://h:1/", "/api/v1/"), "http://h:1/api/v1");
        assert_eq!(join_base("http://h:1", "api/v1"), "http://h:1/api/v1");
        assert_eq!(join_base("http://h:1", ""), "http://h:1");
        assert_eq!(join_base("http://h:1", "/"), "http://h:1");
    }

    #[test]
    fn client_exposes_joined_base() {
        let client = HttpTaskClient::new(DEFAULT_BASE_URL, DEFAULT_PATH_PREFIX).unwrap();
        assert_eq!(client.base(), "http://localhost:5001/api/v1");
    }
}
