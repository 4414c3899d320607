use bl_api_types::TaskSummary;
use bl_client::TaskApi;

use super::friendly_error;

/// Run the `tasks` subcommand.
pub async fn run(client: &dyn TaskApi) -> anyhow::Result<()> {
    let tasks = client.list_tasks().await.map_err(friendly_error)?;
    print!("{}", render(&tasks));
    Ok(())
}

fn render(tasks: &[TaskSummary]) -> String {
    if tasks.is_empty() {
        return "No tasks.\n".to_string();
    }
    let mut out = format!("{:<38} {:<10} {}\n", "TASK", "STATUS", "MODE");
    for t in tasks {
        out.push_str(&format!("{:<38} {:<10} {}\n", t.task_id, t.status, t.mode));
    }
    out
}
