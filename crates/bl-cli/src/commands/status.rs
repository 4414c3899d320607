use bl_api_types::TaskState;
use bl_client::TaskApi;
use bl_core::confirmation::format_slot;

use super::friendly_error;

/// Run the `status` subcommand: fetch one snapshot and print it.
pub async fn run(client: &dyn TaskApi, task_id: &str, json: bool) -> anyhow::Result<()> {
    let state = client
        .get_task_status(task_id)
        .await
        .map_err(friendly_error)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        print!("{}", render(&state));
    }
    Ok(())
}

fn render(state: &TaskState) -> String {
    let mut out = String::new();
    out.push_str(&format!("task {}\n", state.task_id));
    out.push_str(&format!("{}\n", "-".repeat(40)));
    out.push_str(&format!("Status:     {}\n", state.status));
    out.push_str(&format!("Mode:       {}\n", state.mode));
    out.push_str(&format!("Request:    {}\n", state.user_request.message));
    out.push_str(&format!("Updated:    {}\n", state.updated_at.to_rfc3339()));
    out.push_str(&format!("Providers:  {}\n", state.outcomes.len()));

    if let Some(err) = &state.error_message {
        out.push_str(&format!("Error:      {err}\n"));
    }

    if !state.shortlist.is_empty() {
        out.push_str("Shortlist:\n");
        for s in &state.shortlist {
            out.push_str(&format!(
                "  #{:<2} {:<28} {}  (score {:.1})\n",
                s.rank,
                s.display_name(),
                format_slot(&s.slot),
                s.score
            ));
        }
    }

    if let Some(appt) = &state.confirmed_appointment {
        out.push_str(&format!(
            "Booked:     {} at {}\n",
            appt.provider_id,
            format_slot(&appt.slot)
        ));
    }
    out
}
