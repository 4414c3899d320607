//! Shared API types for the BookLine scheduling client.
//!
//! These mirror the JSON exchanged with the task-processing backend. Every
//! snapshot field the backend may omit carries `#[serde(default)]` so that a
//! partially populated `TaskState` still decodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod timestamp;

pub use timestamp::SlotTime;

// ── Enums ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// `completed`, `failed` and `cancelled` are final; the backend never
    /// moves a task out of them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// `pending` and `running` are indistinguishable to the user.
    pub fn is_live(&self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskMode {
    /// One agent calls one provider.
    #[default]
    Single,
    /// Parallel agents call several providers; results come back ranked.
    Swarm,
}

impl TaskMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskMode::Single => "single",
            TaskMode::Swarm => "swarm",
        }
    }
}

impl std::fmt::Display for TaskMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskUrgency {
    #[default]
    Asap,
    Flexible,
    Specific,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    Agent,
    Receptionist,
    #[serde(other)]
    Other,
}

// ── User intent ──

/// Ranking weights tuned by the user before submission. They are not
/// required to sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreferenceWeights {
    #[serde(default = "default_availability_weight")]
    pub availability_weight: f64,
    #[serde(default = "default_rating_weight")]
    pub rating_weight: f64,
    #[serde(default = "default_distance_weight")]
    pub distance_weight: f64,
}

impl Default for PreferenceWeights {
    fn default() -> Self {
        Self {
            availability_weight: default_availability_weight(),
            rating_weight: default_rating_weight(),
            distance_weight: default_distance_weight(),
        }
    }
}

impl PreferenceWeights {
    /// Each weight must be a finite, non-negative number.
    pub fn is_valid(&self) -> bool {
        [self.availability_weight, self.rating_weight, self.distance_weight]
            .iter()
            .all(|w| w.is_finite() && *w >= 0.0)
    }
}

fn default_availability_weight() -> f64 {
    0.5
}
fn default_rating_weight() -> f64 {
    0.3
}
fn default_distance_weight() -> f64 {
    0.2
}

/// What the user asked for. Immutable once a task has been created from it;
/// only the description, mode and preferences are sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInput {
    pub description: String,
    #[serde(default)]
    pub mode: TaskMode,
    #[serde(default)]
    pub urgency: TaskUrgency,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub specific_date: Option<String>,
    #[serde(default)]
    pub preferences: Option<PreferenceWeights>,
}

impl TaskInput {
    pub fn new(description: impl Into<String>, mode: TaskMode) -> Self {
        Self {
            description: description.into(),
            mode,
            urgency: TaskUrgency::default(),
            duration: None,
            specific_date: None,
            preferences: None,
        }
    }

    pub fn with_preferences(mut self, preferences: PreferenceWeights) -> Self {
        self.preferences = Some(preferences);
        self
    }

    pub fn to_create_request(&self) -> TaskCreateRequest {
        TaskCreateRequest {
            user_request: UserRequest {
                message: self.description.clone(),
                mode: self.mode,
                preferences: self.preferences,
            },
        }
    }
}

// ── Request bodies ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRequest {
    pub message: String,
    #[serde(default)]
    pub mode: TaskMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<PreferenceWeights>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCreateRequest {
    pub user_request: UserRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmAppointmentRequest {
    pub task_id: String,
    pub provider_id: String,
    /// Sent back verbatim as received in the shortlist.
    pub slot: SlotTime,
}

// ── Response bodies ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCreateResponse {
    pub task_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmAppointmentResponse {
    pub ok: bool,
    #[serde(default)]
    pub appointment: Option<BookedAppointment>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub mode: TaskMode,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskList {
    #[serde(default)]
    pub tasks: Vec<TaskSummary>,
}

// ── Task snapshot ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub role: TurnRole,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationOutcome {
    pub provider_id: String,
    #[serde(default, with = "timestamp::option")]
    pub proposed_slot: Option<DateTime<Utc>>,
    #[serde(default)]
    pub confidence_score: f64,
    #[serde(default)]
    pub rejection_reasons: Vec<String>,
    #[serde(default)]
    pub raw_metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub transcript: Vec<TranscriptTurn>,
}

/// One candidate appointment. `rank` is 1-based and the backend sends the
/// shortlist already sorted by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSlot {
    pub provider_id: String,
    #[serde(default)]
    pub provider_name: Option<String>,
    pub slot: SlotTime,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub rank: u32,
}

impl RankedSlot {
    pub fn display_name(&self) -> &str {
        self.provider_name.as_deref().unwrap_or(&self.provider_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookedAppointment {
    pub task_id: String,
    pub provider_id: String,
    #[serde(with = "timestamp")]
    pub slot: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub booked_at: DateTime<Utc>,
    #[serde(default)]
    pub calendar_event_id: Option<String>,
    #[serde(default)]
    pub calendar_link: Option<String>,
}

/// Server-side view of a task. Clients replace their copy wholesale on each
/// fetch instead of patching fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskState {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub mode: TaskMode,
    pub user_request: UserRequest,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub outcomes: Vec<NegotiationOutcome>,
    #[serde(default)]
    pub tool_calls_log: Vec<serde_json::Value>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub shortlist: Vec<RankedSlot>,
    #[serde(default)]
    pub confirmed_appointment: Option<BookedAppointment>,
    #[serde(default)]
    pub transcript: Vec<TranscriptTurn>,
}

impl TaskState {
    /// Top of the shortlist, if any.
    pub fn best_slot(&self) -> Option<&RankedSlot> {
        self.shortlist.first()
    }

    /// Shortlist entry with the given 1-based rank.
    pub fn slot_by_rank(&self, rank: u32) -> Option<&RankedSlot> {
        self.shortlist.iter().find(|s| s.rank == rank)
    }
}
