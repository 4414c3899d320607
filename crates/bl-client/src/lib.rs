//! Typed client for the BookLine task-processing backend.
//!
//! [`TaskApi`] is the seam the lifecycle controller is written against;
//! [`HttpTaskClient`] is the reqwest-backed implementation.

pub mod client;
pub mod error;

pub use client::{HttpTaskClient, Result, TaskApi, DEFAULT_BASE_URL, DEFAULT_PATH_PREFIX};
pub use error::{extract_error_message, ApiError, GENERIC_ERROR_MESSAGE};
