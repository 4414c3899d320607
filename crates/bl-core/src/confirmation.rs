//! Booking one slot from a finished task's shortlist.
//!
//! [`confirm_slot`] only talks to the backend and classifies the answer; the
//! controller decides what reaches the chat log and what becomes a
//! notification. Nothing here touches polling state.

use bl_api_types::{BookedAppointment, ConfirmAppointmentRequest, RankedSlot};
use bl_client::TaskApi;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

pub const CONFIRM_REJECTED_FALLBACK: &str = "Could not confirm.";
pub const CONFIRM_FAILED_FALLBACK: &str = "Failed to confirm appointment.";
pub const NO_ACTIVE_TASK: &str = "No active task to confirm.";

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOutcome {
    /// The backend booked the slot.
    Booked {
        appointment: BookedAppointment,
        message: String,
    },
    /// The backend answered but did not book (`ok: false`, no appointment,
    /// or an explicit error).
    Rejected { reason: String },
    /// The call itself failed.
    Failed { reason: String },
    /// There was no task to confirm against.
    NoTask,
}

impl ConfirmOutcome {
    pub fn is_booked(&self) -> bool {
        matches!(self, ConfirmOutcome::Booked { .. })
    }
}

pub async fn confirm_slot(api: &dyn TaskApi, task_id: &str, slot: &RankedSlot) -> ConfirmOutcome {
    let request = ConfirmAppointmentRequest {
        task_id: task_id.to_string(),
        provider_id: slot.provider_id.clone(),
        slot: slot.slot.clone(),
    };

    match api.confirm_appointment(&request).await {
        Ok(resp) => match (resp.ok, resp.appointment, resp.error) {
            (true, Some(appointment), None) => {
                info!(task_id, provider_id = %slot.provider_id, "appointment confirmed");
                let message = booking_message(slot, &appointment);
                ConfirmOutcome::Booked {
                    appointment,
                    message,
                }
            }
            (_, _, error) => {
                let reason = error.unwrap_or_else(|| CONFIRM_REJECTED_FALLBACK.to_string());
                warn!(task_id, provider_id = %slot.provider_id, %reason, "confirmation rejected");
                ConfirmOutcome::Rejected { reason }
            }
        },
        Err(err) => {
            warn!(task_id, error = %err, "confirmation call failed");
            ConfirmOutcome::Failed {
                reason: err.user_message(CONFIRM_FAILED_FALLBACK),
            }
        }
    }
}

/// Chat text announcing a booking.
pub fn booking_message(slot: &RankedSlot, appointment: &BookedAppointment) -> String {
    let mut msg = format!(
        "Your appointment with {} on {} has been confirmed!",
        slot.display_name(),
        format_slot(&slot.slot)
    );
    if let Some(link) = &appointment.calendar_link {
        msg.push_str(&format!(" [View in Calendar]({link})"));
    }
    msg
}

pub fn format_slot(slot: &DateTime<Utc>) -> String {
    slot.format("%a, %b %-d %Y %-I:%M %p UTC").to_string()
}
