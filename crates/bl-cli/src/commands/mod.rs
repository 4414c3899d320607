pub mod book;
pub mod confirm;
pub mod status;
pub mod tasks;

use anyhow::Context;
use bl_client::{ApiError, HttpTaskClient};
use bl_core::config::{Config, BASE_URL_ENV};

/// Build the backend client from the loaded config.
pub fn api_client(config: &Config) -> anyhow::Result<HttpTaskClient> {
    HttpTaskClient::with_timeout(
        &config.api.base_url,
        &config.api.path_prefix,
        config.api.timeout(),
    )
    .context("failed to build HTTP client")
}

/// Map client errors to user-friendly messages.
pub fn friendly_error(err: ApiError) -> anyhow::Error {
    match err {
        ApiError::Network(detail) => anyhow::anyhow!(
            "Could not reach the backend. Is it running?\n  \
             (hint: check --api-url or {BASE_URL_ENV})\n  \
             ({detail})"
        ),
        ApiError::Http { status, message } => anyhow::anyhow!("{message} (HTTP {status})"),
        ApiError::Decode(detail) => {
            anyhow::anyhow!("The backend sent a response this client could not read: {detail}")
        }
    }
}
