//! Client-side core of the BookLine scheduling assistant.
//!
//! The [`controller::TaskController`] drives a remote scheduling task from
//! creation to a terminal status and keeps the chat log presentation
//! renders. Presentation talks to it only through `user_send`, `confirm`,
//! the read accessors and the [`event_bus::UiEvent`] stream.

pub mod config;
pub mod confirmation;
pub mod controller;
pub mod event_bus;
pub mod lifecycle;
pub mod message_log;
pub mod notifications;

pub use confirmation::ConfirmOutcome;
pub use controller::{StartOutcome, TaskController};
pub use event_bus::{EventBus, StopReason, UiEvent};
pub use lifecycle::LifecyclePhase;
pub use message_log::{ChatMessage, ChatRole, MessageLog};
