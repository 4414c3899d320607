use serde_json::Value;
use thiserror::Error;

/// Fallback used when an error body carries nothing readable.
pub const GENERIC_ERROR_MESSAGE: &str = "Request failed";

/// Errors returned by [`TaskApi`](crate::TaskApi) operations.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The backend answered with a non-2xx status.
    ///
    /// `message` is extracted from the response body by
    /// [`extract_error_message`].
    #[error("{message} (HTTP {status})")]
    Http { status: u16, message: String },

    /// The request never produced a response: connection refused, DNS
    /// failure, timeout, and so on.
    #[error("network error: {0}")]
    Network(String),

    /// A 2xx response whose body did not match the expected shape.
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text suitable for showing to a user. HTTP errors carry the server's
    /// own message; transport and decode failures fall back to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Http { message, .. } => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if err.is_connect() {
            ApiError::Network(format!("could not connect to the backend: {err}"))
        } else if err.is_timeout() {
            ApiError::Network(format!("request timed out: {err}"))
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Best-effort message extraction from an error body.
///
/// Priority: `detail` as a string, then `detail` as a list of `{msg}`
/// objects, then `message`. Anything else yields [`GENERIC_ERROR_MESSAGE`].
pub fn extract_error_message(body: &Value) -> String {
    let Some(obj) = body.as_object() else {
        return GENERIC_ERROR_MESSAGE.to_string();
    };

    match obj.get("detail") {
        Some(Value::String(detail)) => return detail.clone(),
        Some(Value::Array(items)) if !items.is_empty() => {
            if let Some(msg) = items[0].get("msg") {
                return value_text(msg);
            }
            return items
                .iter()
                .map(|item| item.get("msg").map(value_text).unwrap_or_else(|| value_text(item)))
                .collect::<Vec<_>>()
                .join("; ");
        }
        _ => {}
    }

    match obj.get("message") {
        Some(Value::Null) | None => GENERIC_ERROR_MESSAGE.to_string(),
        Some(msg) => value_text(msg),
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
