//! Task lifecycle controller.
//!
//! One [`TaskController`] owns one scheduling conversation: it creates the
//! remote task, polls it on a fixed cadence, folds each snapshot into its
//! state and writes exactly one chat message when the task reaches a
//! terminal status.
//!
//! All mutable state lives behind a single mutex that is never held across
//! an `.await`. Every resumption after a network call re-checks the
//! liveness flag and the start generation before touching that state, so a
//! disposed controller or a superseded `start` cannot be mutated by a late
//! response.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bl_api_types::{RankedSlot, TaskInput, TaskMode, TaskState, TaskStatus};
use bl_client::TaskApi;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use crate::config::{Config, PollingConfig};
use crate::confirmation::{self, ConfirmOutcome, NO_ACTIVE_TASK};
use crate::event_bus::{EventBus, StopReason, UiEvent};
use crate::lifecycle::LifecyclePhase;
use crate::message_log::{ChatMessage, MessageLog};
use crate::notifications::{Notification, NotificationKind, NotificationStore};

pub const TASK_ACCEPTED: &str = "Got it! I'm working on finding you an appointment…";
pub const BACKEND_UNREACHABLE: &str = "Could not reach the backend. Is it running?";
pub const RESULTS_FOUND: &str =
    "Great news! I've found available appointments. Here are your best options:";
pub const NO_SLOTS_FOUND: &str =
    "The task completed but no appointment slots were found. Try again with different preferences.";
pub const TASK_FAILED_FALLBACK: &str = "Something went wrong. Please try again.";
pub const TASK_CANCELLED: &str = "The task was cancelled.";

const DEFAULT_MAX_NOTIFICATIONS: usize = 50;

/// Result of [`TaskController::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started { task_id: String },
    /// Task creation failed; the reason is already in the chat log.
    Failed { message: String },
    /// The controller was disposed, or `start` was called again, while the
    /// create call was in flight. Its result was dropped. Also returned,
    /// without any call, by `start` on a disposed controller.
    Superseded,
}

/// What a terminal snapshot means for the conversation.
#[derive(Debug, Clone, PartialEq)]
enum TerminalOutcome {
    Results(Vec<RankedSlot>),
    NoSlots,
    Failed(Option<String>),
    Cancelled,
}

impl TerminalOutcome {
    fn from_snapshot(snapshot: &TaskState) -> Option<Self> {
        match snapshot.status {
            TaskStatus::Completed if snapshot.shortlist.is_empty() => Some(Self::NoSlots),
            TaskStatus::Completed => Some(Self::Results(snapshot.shortlist.clone())),
            TaskStatus::Failed => Some(Self::Failed(snapshot.error_message.clone())),
            TaskStatus::Cancelled => Some(Self::Cancelled),
            TaskStatus::Pending | TaskStatus::Running => None,
        }
    }

    fn chat_message(&self) -> String {
        match self {
            Self::Results(_) => RESULTS_FOUND.to_string(),
            Self::NoSlots => NO_SLOTS_FOUND.to_string(),
            Self::Failed(err) => format!("⚠️ {}", err.as_deref().unwrap_or(TASK_FAILED_FALLBACK)),
            Self::Cancelled => TASK_CANCELLED.to_string(),
        }
    }
}

#[derive(Debug)]
struct ControllerState {
    phase: LifecyclePhase,
    /// Bumped by every `start`; results tagged with an older value are stale.
    generation: u64,
    task_id: Option<String>,
    mode: TaskMode,
    creating: bool,
    snapshot: Option<TaskState>,
    messages: MessageLog,
    notifications: NotificationStore,
    ticker: Option<JoinHandle<()>>,
    next_tick_seq: u64,
    last_applied_seq: u64,
}

impl ControllerState {
    fn new(max_notifications: usize) -> Self {
        Self {
            phase: LifecyclePhase::Uninitialized,
            generation: 0,
            task_id: None,
            mode: TaskMode::default(),
            creating: false,
            snapshot: None,
            messages: MessageLog::new(),
            notifications: NotificationStore::new(max_notifications),
            ticker: None,
            next_tick_seq: 0,
            last_applied_seq: 0,
        }
    }

    /// Abort the ticker if one is installed. Returns whether one was.
    fn stop_ticker(&mut self) -> bool {
        match self.ticker.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

struct Inner {
    api: Arc<dyn TaskApi>,
    polling: PollingConfig,
    events: EventBus,
    alive: AtomicBool,
    state: Mutex<ControllerState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn append_agent(&self, st: &mut ControllerState, content: impl Into<String>) {
        let msg = st.messages.append_agent(content);
        self.events.publish(UiEvent::MessageAppended(msg));
    }

    fn notify(&self, st: &mut ControllerState, notification: Notification) {
        st.notifications.push(notification.clone());
        self.events.publish(UiEvent::Notification(notification));
    }

    fn spawn_ticker(self: &Arc<Self>, task_id: String, generation: u64) -> JoinHandle<()> {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(inner.polling.interval());
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut attempts: u32 = 0;
            let mut in_flight: Vec<JoinHandle<()>> = Vec::new();

            loop {
                // The first tick completes immediately.
                interval.tick().await;

                if let Some(max) = inner.polling.max_attempts {
                    if attempts >= max {
                        // The last permitted fetch may still report a terminal status.
                        for fetch in in_flight.drain(..) {
                            if let Err(e) = fetch.await {
                                debug!(error = %e, "poll fetch did not complete");
                            }
                        }
                        inner.exhaust(generation, max);
                        return;
                    }
                }

                let Some(seq) = inner.next_tick_seq(generation) else {
                    return;
                };
                attempts += 1;

                let tick = Arc::clone(&inner);
                let id = task_id.clone();
                in_flight.retain(|fetch| !fetch.is_finished());
                in_flight.push(tokio::spawn(async move {
                    tick.poll_tick(&id, generation, seq).await;
                }));
            }
        })
    }

    fn next_tick_seq(&self, generation: u64) -> Option<u64> {
        let mut st = self.lock();
        if !self.is_alive() || st.generation != generation {
            return None;
        }
        st.next_tick_seq += 1;
        Some(st.next_tick_seq)
    }

    fn exhaust(&self, generation: u64, max: u32) {
        let mut st = self.lock();
        if !self.is_alive() || st.generation != generation || st.phase != LifecyclePhase::Polling {
            return;
        }
        // This runs on the ticker itself; dropping its own handle detaches it.
        st.ticker = None;
        warn!(
            task_id = st.task_id.as_deref().unwrap_or("?"),
            attempts = max,
            "poll attempts exhausted; polling stopped"
        );
        self.events.publish(UiEvent::PollingStopped {
            reason: StopReason::AttemptsExhausted,
        });
        self.notify(
            &mut st,
            Notification::new(
                NotificationKind::Warning,
                "Still working",
                format!("Stopped checking for updates after {max} attempts."),
            ),
        );
    }

    async fn poll_tick(&self, task_id: &str, generation: u64, seq: u64) {
        let result = self.api.get_task_status(task_id).await;

        let mut st = self.lock();
        if !self.is_alive() || st.generation != generation {
            trace!(task_id, "poll result discarded; controller disposed or restarted");
            return;
        }
        match result {
            Ok(snapshot) => self.apply_snapshot(&mut st, snapshot, seq),
            Err(err) => {
                // Transient by policy: the next tick retries.
                debug!(task_id, error = %err, "poll failed");
            }
        }
    }

    fn apply_snapshot(&self, st: &mut ControllerState, snapshot: TaskState, seq: u64) {
        if self.polling.discard_stale_responses && seq < st.last_applied_seq {
            debug!(seq, last_applied = st.last_applied_seq, "stale poll response dropped");
            return;
        }
        st.last_applied_seq = st.last_applied_seq.max(seq);

        let status = snapshot.status;
        let terminal = TerminalOutcome::from_snapshot(&snapshot);
        st.snapshot = Some(snapshot);
        self.events.publish(UiEvent::SnapshotUpdated { status });

        if let Some(outcome) = terminal {
            self.finish(st, status, outcome);
        }
    }

    fn finish(&self, st: &mut ControllerState, status: TaskStatus, outcome: TerminalOutcome) {
        if st.phase.transition(LifecyclePhase::Terminal).is_err() {
            trace!(%status, "terminal status already handled");
            return;
        }
        st.stop_ticker();
        info!(
            task_id = st.task_id.as_deref().unwrap_or("?"),
            %status,
            "task reached terminal status"
        );
        self.events.publish(UiEvent::PollingStopped {
            reason: StopReason::Terminal(status),
        });

        self.append_agent(st, outcome.chat_message());
        if let TerminalOutcome::Results(shortlist) = outcome {
            if st.mode != TaskMode::Swarm {
                self.events.publish(UiEvent::ShowResults { shortlist });
            }
        }
    }
}

/// Owns one task's lifecycle. Dropping the controller disposes it.
pub struct TaskController {
    inner: Arc<Inner>,
}

impl TaskController {
    pub fn new(api: Arc<dyn TaskApi>, polling: PollingConfig) -> Self {
        Self::with_event_bus(api, polling, DEFAULT_MAX_NOTIFICATIONS, EventBus::new())
    }

    pub fn from_config(api: Arc<dyn TaskApi>, config: &Config) -> Self {
        Self::with_event_bus(
            api,
            config.polling.clone(),
            config.notifications.max_notifications,
            EventBus::new(),
        )
    }

    pub fn with_event_bus(
        api: Arc<dyn TaskApi>,
        polling: PollingConfig,
        max_notifications: usize,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                polling,
                events,
                alive: AtomicBool::new(true),
                state: Mutex::new(ControllerState::new(max_notifications)),
            }),
        }
    }

    /// Create a remote task for `input` and begin polling it.
    ///
    /// Any earlier task on this controller is abandoned first: its ticker is
    /// torn down and its late responses are ignored.
    pub async fn start(&self, input: TaskInput) -> StartOutcome {
        let generation = {
            let mut st = self.inner.lock();
            if !self.inner.is_alive() {
                debug!("start ignored; controller disposed");
                return StartOutcome::Superseded;
            }
            if st.stop_ticker() {
                debug!("previous ticker torn down by restart");
            }
            st.generation += 1;
            st.phase = LifecyclePhase::Uninitialized;
            st.task_id = None;
            st.snapshot = None;
            st.mode = input.mode;
            st.creating = true;
            st.next_tick_seq = 0;
            st.last_applied_seq = 0;
            let seed = st.messages.reset_with_user(input.description.clone());
            self.inner.events.publish(UiEvent::MessageAppended(seed));
            st.generation
        };

        info!(mode = %input.mode, "creating task");
        let result = self.inner.api.create_task(&input.to_create_request()).await;

        let mut st = self.inner.lock();
        if !self.inner.is_alive() || st.generation != generation {
            debug!("create result discarded; controller disposed or restarted");
            return StartOutcome::Superseded;
        }
        st.creating = false;

        match result {
            Ok(resp) => {
                let task_id = resp.task_id;
                info!(task_id = %task_id, status = %resp.status, "task created");
                if let Err(e) = st.phase.transition(LifecyclePhase::Polling) {
                    warn!(error = %e, "unexpected phase after create");
                }
                st.task_id = Some(task_id.clone());
                self.inner.append_agent(&mut st, TASK_ACCEPTED);
                st.ticker = Some(self.inner.spawn_ticker(task_id.clone(), generation));
                StartOutcome::Started { task_id }
            }
            Err(err) => {
                warn!(error = %err, "task creation failed");
                let message = err.user_message(BACKEND_UNREACHABLE);
                self.inner.append_agent(&mut st, format!("⚠️ {message}"));
                self.inner.notify(&mut st, Notification::error(message.clone()));
                StartOutcome::Failed { message }
            }
        }
    }

    /// Fetch the task status once, right now, under the same rules as a
    /// scheduled tick. Returns `false` without fetching when there is no
    /// task being polled.
    pub async fn poll_now(&self) -> bool {
        let (task_id, generation, seq) = {
            let mut st = self.inner.lock();
            if st.phase != LifecyclePhase::Polling || !self.inner.is_alive() {
                return false;
            }
            let Some(task_id) = st.task_id.clone() else {
                return false;
            };
            st.next_tick_seq += 1;
            (task_id, st.generation, st.next_tick_seq)
        };
        self.inner.poll_tick(&task_id, generation, seq).await;
        true
    }

    /// Cancel the poll ticker. Safe to call at any time, any number of times.
    pub fn stop(&self) {
        let mut st = self.inner.lock();
        if st.stop_ticker() {
            debug!(task_id = st.task_id.as_deref().unwrap_or("?"), "polling stopped");
            self.inner.events.publish(UiEvent::PollingStopped {
                reason: StopReason::Stopped,
            });
        }
    }

    /// Tear the controller down: stop polling and ignore every in-flight
    /// result from here on.
    pub fn dispose(&self) {
        self.inner.alive.store(false, Ordering::SeqCst);
        self.stop();
    }

    pub fn is_disposed(&self) -> bool {
        !self.inner.is_alive()
    }

    /// Presentation callback for text typed by the user. Blank input is
    /// ignored.
    pub fn user_send(&self, text: &str) -> Option<ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let mut st = self.inner.lock();
        let msg = st.messages.append_user(text);
        self.inner.events.publish(UiEvent::MessageAppended(msg.clone()));
        Some(msg)
    }

    /// Presentation callback for picking a slot. Success lands in the chat
    /// log; every failure is a notification only. Polling is not touched.
    pub async fn confirm(&self, slot: &RankedSlot) -> ConfirmOutcome {
        let (task_id, generation) = {
            let mut st = self.inner.lock();
            self.inner.events.publish(UiEvent::ResultsDismissed);
            match st.task_id.clone() {
                Some(id) => (id, st.generation),
                None => {
                    self.inner.notify(&mut st, Notification::error(NO_ACTIVE_TASK));
                    return ConfirmOutcome::NoTask;
                }
            }
        };

        let outcome = confirmation::confirm_slot(self.inner.api.as_ref(), &task_id, slot).await;

        let mut st = self.inner.lock();
        if !self.inner.is_alive() || st.generation != generation {
            debug!(task_id = %task_id, "confirmation result discarded; controller disposed or restarted");
            return outcome;
        }
        match &outcome {
            ConfirmOutcome::Booked { message, .. } => {
                self.inner.append_agent(&mut st, message.clone());
                let summary = format!(
                    "{} on {}",
                    slot.display_name(),
                    confirmation::format_slot(&slot.slot)
                );
                self.inner.notify(
                    &mut st,
                    Notification::new(NotificationKind::Success, "Appointment Confirmed!", summary),
                );
            }
            ConfirmOutcome::Rejected { reason } | ConfirmOutcome::Failed { reason } => {
                self.inner.notify(&mut st, Notification::error(reason.clone()));
            }
            ConfirmOutcome::NoTask => {}
        }
        outcome
    }

    pub fn subscribe(&self) -> flume::Receiver<UiEvent> {
        self.inner.events.subscribe()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.inner.lock().messages.entries().to_vec()
    }

    pub fn snapshot(&self) -> Option<TaskState> {
        self.inner.lock().snapshot.clone()
    }

    pub fn task_id(&self) -> Option<String> {
        self.inner.lock().task_id.clone()
    }

    pub fn mode(&self) -> TaskMode {
        self.inner.lock().mode
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.inner.lock().phase
    }

    /// Whether a poll ticker is currently installed.
    pub fn is_polling(&self) -> bool {
        self.inner.lock().ticker.is_some()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.lock().notifications.list_all().to_vec()
    }

    pub fn mark_notifications_read(&self) {
        self.inner.lock().notifications.mark_all_read();
    }

    /// Short header badge text.
    pub fn status_label(&self) -> &'static str {
        let st = self.inner.lock();
        match st.snapshot.as_ref().map(|s| s.status) {
            Some(status) if status.is_live() => "Live",
            _ if st.creating => "Connecting…",
            Some(TaskStatus::Completed) => "Done",
            _ => "Ready",
        }
    }
}

impl Drop for TaskController {
    fn drop(&mut self) {
        self.dispose();
    }
}
