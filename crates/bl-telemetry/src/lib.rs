//! Logging setup for BookLine binaries.
//!
//! Libraries in this workspace only emit `tracing` events; binaries call one
//! of the initialisers here once at startup.

pub mod logging;
