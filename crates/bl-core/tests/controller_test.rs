//! Lifecycle controller behaviour against a scripted backend, on paused time.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bl_api_types::{
    BookedAppointment, ConfirmAppointmentRequest, ConfirmAppointmentResponse, RankedSlot, SlotTime,
    TaskCreateRequest, TaskCreateResponse, TaskInput, TaskMode, TaskState, TaskStatus,
    TaskSummary,
};
use bl_client::{ApiError, TaskApi};
use bl_core::config::PollingConfig;
use bl_core::controller::{
    BACKEND_UNREACHABLE, NO_SLOTS_FOUND, RESULTS_FOUND, TASK_ACCEPTED, TASK_CANCELLED,
};
use bl_core::notifications::NotificationKind;
use bl_core::{
    ChatRole, ConfirmOutcome, LifecyclePhase, StartOutcome, StopReason, TaskController, UiEvent,
};
use chrono::{TimeZone, Utc};

type Scripted<T> = Mutex<VecDeque<(Duration, Result<T, ApiError>)>>;

/// Backend double. Poll answers are consumed in order; once the script runs
/// out the last answer repeats.
#[derive(Default)]
struct ScriptedApi {
    creates: Scripted<TaskCreateResponse>,
    polls: Scripted<TaskState>,
    last_poll: Mutex<Option<Result<TaskState, ApiError>>>,
    confirms: Mutex<VecDeque<Result<ConfirmAppointmentResponse, ApiError>>>,
    poll_calls: Mutex<Vec<String>>,
    confirm_calls: Mutex<Vec<ConfirmAppointmentRequest>>,
}

impl ScriptedApi {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn create_ok(&self, task_id: &str) {
        self.create_after(Duration::ZERO, Ok(created(task_id)));
    }

    fn create_after(&self, delay: Duration, result: Result<TaskCreateResponse, ApiError>) {
        self.creates.lock().unwrap().push_back((delay, result));
    }

    fn poll(&self, result: Result<TaskState, ApiError>) {
        self.poll_after(Duration::ZERO, result);
    }

    fn poll_after(&self, delay: Duration, result: Result<TaskState, ApiError>) {
        self.polls.lock().unwrap().push_back((delay, result));
    }

    fn confirm(&self, result: Result<ConfirmAppointmentResponse, ApiError>) {
        self.confirms.lock().unwrap().push_back(result);
    }

    fn poll_count(&self) -> usize {
        self.poll_calls.lock().unwrap().len()
    }

    fn poll_count_for(&self, task_id: &str) -> usize {
        self.poll_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|id| id.as_str() == task_id)
            .count()
    }
}

#[async_trait]
impl TaskApi for ScriptedApi {
    async fn create_task(&self, _request: &TaskCreateRequest) -> bl_client::Result<TaskCreateResponse> {
        let next = self.creates.lock().unwrap().pop_front();
        let (delay, result) =
            next.unwrap_or((Duration::ZERO, Err(ApiError::Network("no create scripted".into()))));
        tokio::time::sleep(delay).await;
        result
    }

    async fn get_task_status(&self, task_id: &str) -> bl_client::Result<TaskState> {
        self.poll_calls.lock().unwrap().push(task_id.to_string());
        let (delay, result) = {
            let next = self.polls.lock().unwrap().pop_front();
            match next {
                Some((delay, result)) => {
                    *self.last_poll.lock().unwrap() = Some(result.clone());
                    (delay, result)
                }
                None => {
                    let last = self.last_poll.lock().unwrap().clone();
                    (
                        Duration::ZERO,
                        last.unwrap_or_else(|| Err(ApiError::Network("no poll scripted".into()))),
                    )
                }
            }
        };
        tokio::time::sleep(delay).await;
        result
    }

    async fn confirm_appointment(
        &self,
        request: &ConfirmAppointmentRequest,
    ) -> bl_client::Result<ConfirmAppointmentResponse> {
        self.confirm_calls.lock().unwrap().push(request.clone());
        self.confirms
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Network("no confirm scripted".into())))
    }

    async fn list_tasks(&self) -> bl_client::Result<Vec<TaskSummary>> {
        Ok(vec![])
    }
}

// ── fixtures ──

fn created(task_id: &str) -> TaskCreateResponse {
    TaskCreateResponse {
        task_id: task_id.into(),
        status: "pending".into(),
        message: "Task started.".into(),
    }
}

fn state(task_id: &str, status: TaskStatus) -> TaskState {
    let ts = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    TaskState {
        task_id: task_id.into(),
        status,
        mode: TaskMode::Single,
        user_request: TaskInput::new("Book me a dentist", TaskMode::Single)
            .to_create_request()
            .user_request,
        created_at: ts,
        updated_at: ts,
        outcomes: vec![],
        tool_calls_log: vec![],
        error_message: None,
        shortlist: vec![],
        confirmed_appointment: None,
        transcript: vec![],
    }
}

fn p1_slot() -> RankedSlot {
    RankedSlot {
        provider_id: "p1".into(),
        provider_name: None,
        slot: SlotTime::parse("2024-01-01T10:00:00").unwrap(),
        score: 9.1,
        rank: 1,
    }
}

fn completed_with(task_id: &str, shortlist: Vec<RankedSlot>) -> TaskState {
    TaskState {
        shortlist,
        ..state(task_id, TaskStatus::Completed)
    }
}

fn failed_with(task_id: &str, error: &str) -> TaskState {
    TaskState {
        error_message: Some(error.into()),
        ..state(task_id, TaskStatus::Failed)
    }
}

fn booked(task_id: &str, slot: &RankedSlot) -> ConfirmAppointmentResponse {
    ConfirmAppointmentResponse {
        ok: true,
        appointment: Some(BookedAppointment {
            task_id: task_id.into(),
            provider_id: slot.provider_id.clone(),
            slot: slot.slot.at(),
            booked_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap(),
            calendar_event_id: None,
            calendar_link: None,
        }),
        error: None,
    }
}

fn controller(api: &Arc<ScriptedApi>) -> TaskController {
    TaskController::new(api.clone(), PollingConfig::default())
}

fn single(description: &str) -> TaskInput {
    TaskInput::new(description, TaskMode::Single)
}

/// Let spawned work run without crossing a poll boundary.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn agent_texts(c: &TaskController) -> Vec<String> {
    c.messages()
        .into_iter()
        .filter(|m| m.role == ChatRole::Agent)
        .map(|m| m.content)
        .collect()
}

fn show_results_count(events: &[UiEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, UiEvent::ShowResults { .. }))
        .count()
}

// ── scenarios ──

#[tokio::test(start_paused = true)]
async fn pending_then_completed_then_confirm() {
    let api = ScriptedApi::new();
    api.create_ok("task-1");
    api.poll(Ok(state("task-1", TaskStatus::Pending)));
    api.poll(Ok(completed_with("task-1", vec![p1_slot()])));
    api.confirm(Ok(booked("task-1", &p1_slot())));

    let c = controller(&api);
    let events = c.subscribe();

    let outcome = c.start(single("Book me a dentist")).await;
    assert_eq!(outcome, StartOutcome::Started { task_id: "task-1".into() });
    assert_eq!(c.messages()[0].role, ChatRole::User);
    assert_eq!(c.messages()[0].content, "Book me a dentist");
    assert_eq!(agent_texts(&c), [TASK_ACCEPTED]);

    // Immediate first tick: pending adds nothing.
    settle().await;
    assert_eq!(api.poll_count(), 1);
    assert_eq!(agent_texts(&c).len(), 1);
    assert_eq!(c.phase(), LifecyclePhase::Polling);
    assert_eq!(c.status_label(), "Live");

    // Second tick: completed.
    advance(2500).await;
    assert_eq!(api.poll_count(), 2);
    assert_eq!(agent_texts(&c), [TASK_ACCEPTED, RESULTS_FOUND]);
    assert_eq!(c.phase(), LifecyclePhase::Terminal);
    assert!(!c.is_polling());
    assert_eq!(c.status_label(), "Done");

    let seen: Vec<UiEvent> = events.try_iter().collect();
    assert_eq!(show_results_count(&seen), 1);
    assert!(seen.iter().any(|e| matches!(
        e,
        UiEvent::PollingStopped { reason: StopReason::Terminal(TaskStatus::Completed) }
    )));

    let outcome = c.confirm(&p1_slot()).await;
    assert!(outcome.is_booked());
    let texts = agent_texts(&c);
    assert_eq!(texts.len(), 3);
    assert!(texts[2].contains("p1"));
    assert!(texts[2].contains("Mon, Jan 1 2024 10:00 AM UTC"));

    let sent = api.confirm_calls.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].task_id, "task-1");
    assert_eq!(sent[0].provider_id, "p1");
    assert_eq!(sent[0].slot.as_str(), "2024-01-01T10:00:00");

    let notes = c.notifications();
    assert_eq!(notes.last().unwrap().kind, NotificationKind::Success);
    assert_eq!(notes.last().unwrap().title, "Appointment Confirmed!");
}

#[tokio::test(start_paused = true)]
async fn failed_task_reports_server_error_once_and_stops_polling() {
    let api = ScriptedApi::new();
    api.create_ok("task-f");
    api.poll(Ok(failed_with("task-f", "No providers available")));

    let c = controller(&api);
    c.start(single("Book me a dentist")).await;
    settle().await;

    let texts = agent_texts(&c);
    assert_eq!(texts.len(), 2);
    assert!(texts[1].contains("No providers available"));
    assert_eq!(c.phase(), LifecyclePhase::Terminal);

    let polls = api.poll_count();
    advance(10_000).await;
    assert_eq!(api.poll_count(), polls, "no fetch after terminal status");
    assert_eq!(agent_texts(&c).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_without_error_text_uses_fallback() {
    let api = ScriptedApi::new();
    api.create_ok("t");
    api.poll(Ok(state("t", TaskStatus::Failed)));

    let c = controller(&api);
    c.start(single("x")).await;
    settle().await;

    assert_eq!(
        agent_texts(&c).last().unwrap(),
        "⚠️ Something went wrong. Please try again."
    );
}

#[tokio::test(start_paused = true)]
async fn cancelled_task_emits_generic_message() {
    let api = ScriptedApi::new();
    api.create_ok("t");
    api.poll(Ok(state("t", TaskStatus::Running)));
    api.poll(Ok(state("t", TaskStatus::Cancelled)));

    let c = controller(&api);
    c.start(single("x")).await;
    settle().await;
    advance(2500).await;

    assert_eq!(agent_texts(&c), [TASK_ACCEPTED, TASK_CANCELLED]);
    assert!(!c.is_polling());
}

#[tokio::test(start_paused = true)]
async fn completed_with_empty_shortlist_says_no_slots() {
    let api = ScriptedApi::new();
    api.create_ok("t");
    api.poll(Ok(completed_with("t", vec![])));

    let c = controller(&api);
    let events = c.subscribe();
    c.start(single("x")).await;
    settle().await;

    assert_eq!(agent_texts(&c), [TASK_ACCEPTED, NO_SLOTS_FOUND]);
    let seen: Vec<UiEvent> = events.try_iter().collect();
    assert_eq!(show_results_count(&seen), 0);
}

#[tokio::test(start_paused = true)]
async fn swarm_mode_never_opens_results() {
    let api = ScriptedApi::new();
    api.create_ok("t");
    api.poll(Ok(completed_with("t", vec![p1_slot()])));

    let c = controller(&api);
    let events = c.subscribe();
    c.start(TaskInput::new("x", TaskMode::Swarm)).await;
    settle().await;
    advance(10_000).await;

    assert_eq!(agent_texts(&c), [TASK_ACCEPTED, RESULTS_FOUND]);
    let seen: Vec<UiEvent> = events.try_iter().collect();
    assert_eq!(show_results_count(&seen), 0);
}

#[tokio::test(start_paused = true)]
async fn overlapping_terminal_responses_emit_once() {
    let api = ScriptedApi::new();
    api.create_ok("t");
    // Tick 1 is slow and lands after tick 2; both say completed.
    api.poll_after(Duration::from_millis(4000), Ok(completed_with("t", vec![p1_slot()])));
    api.poll(Ok(completed_with("t", vec![p1_slot()])));

    let c = controller(&api);
    let events = c.subscribe();
    c.start(single("x")).await;

    advance(2510).await;
    assert_eq!(api.poll_count(), 2);
    assert_eq!(agent_texts(&c), [TASK_ACCEPTED, RESULTS_FOUND]);

    // The slow response arrives now.
    advance(2000).await;
    assert_eq!(agent_texts(&c), [TASK_ACCEPTED, RESULTS_FOUND]);
    let seen: Vec<UiEvent> = events.try_iter().collect();
    assert_eq!(show_results_count(&seen), 1);
    assert_eq!(api.poll_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_manual_polls_emit_once() {
    let api = ScriptedApi::new();
    api.create_ok("t");
    api.poll(Ok(state("t", TaskStatus::Running)));
    api.poll_after(Duration::from_millis(300), Ok(state("t", TaskStatus::Cancelled)));
    api.poll_after(Duration::from_millis(300), Ok(state("t", TaskStatus::Cancelled)));

    let c = controller(&api);
    c.start(single("x")).await;
    settle().await;

    let (a, b) = tokio::join!(c.poll_now(), c.poll_now());
    assert!(a && b);
    assert_eq!(agent_texts(&c), [TASK_ACCEPTED, TASK_CANCELLED]);

    // Once terminal, manual polling is refused.
    assert!(!c.poll_now().await);
}

#[tokio::test(start_paused = true)]
async fn transient_poll_failure_changes_nothing() {
    let api = ScriptedApi::new();
    api.create_ok("t");
    api.poll(Ok(state("t", TaskStatus::Running)));
    api.poll(Err(ApiError::Network("connection reset".into())));
    api.poll(Err(ApiError::Decode("truncated body".into())));
    api.poll(Ok(completed_with("t", vec![])));

    let c = controller(&api);
    c.start(single("x")).await;
    settle().await;
    let before = c.snapshot();
    let messages_before = c.messages();
    assert_eq!(before.as_ref().map(|s| s.status), Some(TaskStatus::Running));

    advance(2500).await;
    assert_eq!(api.poll_count(), 2);
    assert_eq!(c.snapshot(), before);
    assert_eq!(c.messages(), messages_before);
    assert_eq!(c.phase(), LifecyclePhase::Polling);
    assert!(c.is_polling());
    assert!(c.notifications().is_empty());

    advance(2500).await;
    assert_eq!(c.snapshot(), before);
    assert!(c.is_polling());

    advance(2500).await;
    assert_eq!(agent_texts(&c), [TASK_ACCEPTED, NO_SLOTS_FOUND]);
}

#[tokio::test(start_paused = true)]
async fn create_http_error_surfaces_server_message() {
    let api = ScriptedApi::new();
    api.create_after(
        Duration::ZERO,
        Err(ApiError::Http {
            status: 500,
            message: "App settings not available".into(),
        }),
    );

    let c = controller(&api);
    let outcome = c.start(single("x")).await;
    assert_eq!(
        outcome,
        StartOutcome::Failed { message: "App settings not available".into() }
    );
    assert_eq!(agent_texts(&c), ["⚠️ App settings not available"]);
    assert!(c.task_id().is_none());
    assert_eq!(c.phase(), LifecyclePhase::Uninitialized);

    advance(10_000).await;
    assert_eq!(api.poll_count(), 0);
    let notes = c.notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, NotificationKind::Error);
}

#[tokio::test(start_paused = true)]
async fn create_network_error_uses_unreachable_text() {
    let api = ScriptedApi::new();
    api.create_after(Duration::ZERO, Err(ApiError::Network("refused".into())));

    let c = controller(&api);
    c.start(single("x")).await;
    assert_eq!(agent_texts(&c), [format!("⚠️ {BACKEND_UNREACHABLE}")]);
    assert!(!c.is_polling());
}

#[tokio::test(start_paused = true)]
async fn dispose_during_create_discards_result() {
    let api = ScriptedApi::new();
    api.create_after(Duration::from_secs(1), Ok(created("late")));
    api.poll(Ok(state("late", TaskStatus::Pending)));

    let c = Arc::new(controller(&api));
    let runner = {
        let c = Arc::clone(&c);
        tokio::spawn(async move { c.start(single("x")).await })
    };

    advance(100).await;
    assert_eq!(c.status_label(), "Connecting…");
    c.dispose();

    let outcome = runner.await.unwrap();
    assert_eq!(outcome, StartOutcome::Superseded);
    assert!(c.task_id().is_none());
    assert_eq!(c.messages().len(), 1);
    advance(10_000).await;
    assert_eq!(api.poll_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn dispose_ignores_in_flight_poll() {
    let api = ScriptedApi::new();
    api.create_ok("t");
    api.poll_after(Duration::from_secs(1), Ok(completed_with("t", vec![p1_slot()])));

    let c = controller(&api);
    c.start(single("x")).await;
    settle().await;
    assert_eq!(api.poll_count(), 1);

    c.dispose();
    assert!(c.is_disposed());
    advance(5_000).await;

    assert_eq!(agent_texts(&c), [TASK_ACCEPTED]);
    assert!(c.snapshot().is_none());
    assert_eq!(api.poll_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_is_idempotent_and_halts_ticks() {
    let api = ScriptedApi::new();
    api.create_ok("t");
    api.poll(Ok(state("t", TaskStatus::Pending)));

    let c = controller(&api);
    c.stop();
    c.start(single("x")).await;
    settle().await;
    assert!(c.is_polling());

    c.stop();
    c.stop();
    assert!(!c.is_polling());
    let polls = api.poll_count();
    advance(10_000).await;
    assert_eq!(api.poll_count(), polls);
}

#[tokio::test(start_paused = true)]
async fn restart_replaces_previous_ticker() {
    let api = ScriptedApi::new();
    api.create_ok("task-a");
    api.create_ok("task-b");
    api.poll(Ok(state("any", TaskStatus::Pending)));

    let c = controller(&api);
    c.start(single("first")).await;
    settle().await;
    assert_eq!(api.poll_count_for("task-a"), 1);

    c.start(single("second")).await;
    advance(10_000).await;

    assert_eq!(api.poll_count_for("task-a"), 1);
    assert!(api.poll_count_for("task-b") >= 4);
    assert_eq!(c.task_id().as_deref(), Some("task-b"));
    assert_eq!(c.messages()[0].content, "second");
    assert_eq!(agent_texts(&c), [TASK_ACCEPTED]);
}

#[tokio::test(start_paused = true)]
async fn max_attempts_stops_quietly() {
    let api = ScriptedApi::new();
    api.create_ok("t");
    api.poll(Ok(state("t", TaskStatus::Running)));

    let polling = PollingConfig {
        max_attempts: Some(3),
        ..PollingConfig::default()
    };
    let c = TaskController::new(api.clone(), polling);
    let events = c.subscribe();
    c.start(single("x")).await;
    advance(20_000).await;

    assert_eq!(api.poll_count(), 3);
    assert!(!c.is_polling());
    assert_eq!(c.phase(), LifecyclePhase::Polling);
    assert_eq!(agent_texts(&c), [TASK_ACCEPTED]);

    let seen: Vec<UiEvent> = events.try_iter().collect();
    assert!(seen.iter().any(|e| matches!(
        e,
        UiEvent::PollingStopped { reason: StopReason::AttemptsExhausted }
    )));
    assert_eq!(c.notifications().last().unwrap().kind, NotificationKind::Warning);
}

#[tokio::test(start_paused = true)]
async fn slow_last_attempt_can_still_complete() {
    let api = ScriptedApi::new();
    api.create_ok("t");
    api.poll(Ok(state("t", TaskStatus::Running)));
    // Second and last permitted fetch outlives the next tick.
    api.poll_after(Duration::from_millis(4000), Ok(completed_with("t", vec![p1_slot()])));

    let polling = PollingConfig {
        max_attempts: Some(2),
        ..PollingConfig::default()
    };
    let c = TaskController::new(api.clone(), polling);
    let events = c.subscribe();
    c.start(single("x")).await;

    // Tick 3 is due at 5000ms while fetch 2 is still out until 6500ms.
    advance(5100).await;
    assert!(c.is_polling());
    assert!(c.notifications().is_empty());

    advance(1500).await;
    assert_eq!(api.poll_count(), 2);
    assert_eq!(c.phase(), LifecyclePhase::Terminal);
    assert_eq!(agent_texts(&c), [TASK_ACCEPTED, RESULTS_FOUND]);
    assert!(c.notifications().is_empty());

    let stops: Vec<StopReason> = events
        .try_iter()
        .filter_map(|e| match e {
            UiEvent::PollingStopped { reason } => Some(reason),
            _ => None,
        })
        .collect();
    assert_eq!(stops, [StopReason::Terminal(TaskStatus::Completed)]);
}

#[tokio::test(start_paused = true)]
async fn start_after_dispose_touches_nothing() {
    let api = ScriptedApi::new();
    api.create_ok("t");

    let c = controller(&api);
    let events = c.subscribe();
    c.dispose();

    assert_eq!(c.start(single("x")).await, StartOutcome::Superseded);
    assert!(c.messages().is_empty());
    assert!(c.task_id().is_none());
    assert_eq!(api.creates.lock().unwrap().len(), 1, "no create call made");
    assert_eq!(events.try_iter().count(), 0);
    advance(10_000).await;
    assert_eq!(api.poll_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn late_response_overwrites_by_default() {
    let api = ScriptedApi::new();
    api.create_ok("t");
    api.poll_after(Duration::from_millis(4000), Ok(state("t", TaskStatus::Running)));
    api.poll(Ok(state("t", TaskStatus::Pending)));

    let c = controller(&api);
    c.start(single("x")).await;
    advance(4100).await;

    assert_eq!(c.snapshot().map(|s| s.status), Some(TaskStatus::Running));
}

#[tokio::test(start_paused = true)]
async fn stale_response_is_dropped_when_configured() {
    let api = ScriptedApi::new();
    api.create_ok("t");
    api.poll_after(Duration::from_millis(4000), Ok(state("t", TaskStatus::Running)));
    api.poll(Ok(state("t", TaskStatus::Pending)));

    let polling = PollingConfig {
        discard_stale_responses: true,
        ..PollingConfig::default()
    };
    let c = TaskController::new(api.clone(), polling);
    c.start(single("x")).await;
    advance(4100).await;

    assert_eq!(c.snapshot().map(|s| s.status), Some(TaskStatus::Pending));
}

#[tokio::test(start_paused = true)]
async fn rejected_confirmation_only_notifies() {
    let api = ScriptedApi::new();
    api.create_ok("t");
    api.poll(Ok(completed_with("t", vec![p1_slot()])));
    api.confirm(Ok(ConfirmAppointmentResponse {
        ok: false,
        appointment: None,
        error: Some("Selected provider_id and slot are not in the task shortlist.".into()),
    }));

    let c = controller(&api);
    c.start(single("x")).await;
    settle().await;
    let before = c.messages().len();

    let outcome = c.confirm(&p1_slot()).await;
    assert!(matches!(outcome, ConfirmOutcome::Rejected { .. }));
    assert_eq!(c.messages().len(), before);
    let note = c.notifications().last().cloned().unwrap();
    assert_eq!(note.kind, NotificationKind::Error);
    assert!(note.message.contains("not in the task shortlist"));
}

#[tokio::test(start_paused = true)]
async fn ok_without_appointment_is_rejected() {
    let api = ScriptedApi::new();
    api.create_ok("t");
    api.poll(Ok(completed_with("t", vec![p1_slot()])));
    api.confirm(Ok(ConfirmAppointmentResponse { ok: true, appointment: None, error: None }));

    let c = controller(&api);
    c.start(single("x")).await;
    settle().await;
    let before = c.messages().len();

    let outcome = c.confirm(&p1_slot()).await;
    assert_eq!(outcome, ConfirmOutcome::Rejected { reason: "Could not confirm.".into() });
    assert_eq!(c.messages().len(), before);
}

#[tokio::test(start_paused = true)]
async fn failed_confirmation_call_only_notifies() {
    let api = ScriptedApi::new();
    api.create_ok("t");
    api.poll(Ok(completed_with("t", vec![p1_slot()])));
    api.confirm(Err(ApiError::Network("reset".into())));

    let c = controller(&api);
    c.start(single("x")).await;
    settle().await;
    let before = c.messages().len();

    let outcome = c.confirm(&p1_slot()).await;
    assert_eq!(
        outcome,
        ConfirmOutcome::Failed { reason: "Failed to confirm appointment.".into() }
    );
    assert_eq!(c.messages().len(), before);
    assert_eq!(c.phase(), LifecyclePhase::Terminal);
}

#[tokio::test(start_paused = true)]
async fn confirm_without_task_makes_no_call() {
    let api = ScriptedApi::new();
    let c = controller(&api);

    assert_eq!(c.confirm(&p1_slot()).await, ConfirmOutcome::NoTask);
    assert!(api.confirm_calls.lock().unwrap().is_empty());
    assert!(c.messages().is_empty());
    assert_eq!(c.notifications().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn confirmation_leaves_polling_alone() {
    let api = ScriptedApi::new();
    api.create_ok("t");
    api.poll(Ok(state("t", TaskStatus::Running)));
    api.confirm(Ok(booked("t", &p1_slot())));

    let c = controller(&api);
    let events = c.subscribe();
    c.start(single("x")).await;
    settle().await;

    assert!(c.confirm(&p1_slot()).await.is_booked());
    assert!(c.is_polling());
    assert_eq!(c.phase(), LifecyclePhase::Polling);
    let seen: Vec<UiEvent> = events.try_iter().collect();
    assert!(seen.iter().any(|e| matches!(e, UiEvent::ResultsDismissed)));
}

#[tokio::test(start_paused = true)]
async fn user_send_appends_user_messages() {
    let api = ScriptedApi::new();
    let c = controller(&api);

    assert!(c.user_send("   ").is_none());
    let msg = c.user_send(" any time after 3pm ").unwrap();
    assert_eq!(msg.role, ChatRole::User);
    assert_eq!(msg.content, "any time after 3pm");
    assert_eq!(c.messages().len(), 1);
    assert_eq!(c.status_label(), "Ready");
}
