use bl_api_types::{RankedSlot, SlotTime};
use bl_client::TaskApi;
use bl_core::confirmation::{confirm_slot, ConfirmOutcome};

/// Run the `confirm` subcommand: book `provider_id` at `slot` for a task.
pub async fn run(
    client: &dyn TaskApi,
    task_id: &str,
    provider_id: &str,
    slot: &str,
) -> anyhow::Result<()> {
    let Some(at) = SlotTime::parse(slot) else {
        anyhow::bail!("invalid slot {slot:?}; expected an ISO-8601 timestamp");
    };
    let pick = RankedSlot {
        provider_id: provider_id.to_string(),
        provider_name: None,
        slot: at,
        score: 0.0,
        rank: 0,
    };

    match confirm_slot(client, task_id, &pick).await {
        ConfirmOutcome::Booked { message, .. } => {
            println!("{message}");
            Ok(())
        }
        ConfirmOutcome::Rejected { reason } | ConfirmOutcome::Failed { reason } => {
            anyhow::bail!(reason)
        }
        ConfirmOutcome::NoTask => anyhow::bail!("no task to confirm against"),
    }
}
