use std::io::Write;
use std::sync::Arc;

use bl_api_types::{RankedSlot, TaskInput, TaskMode, TaskStatus};
use bl_client::TaskApi;
use bl_core::confirmation::format_slot;
use bl_core::config::Config;
use bl_core::{ChatRole, ConfirmOutcome, StartOutcome, StopReason, TaskController, UiEvent};
use serde_json::json;
use tracing::{debug, warn};

/// How many ranked slots a finished swarm task shows.
const SWARM_TOP: usize = 5;

#[derive(Debug, Clone)]
pub struct BookOptions {
    pub input: TaskInput,
    /// Shortlist rank to confirm once results arrive.
    pub pick: Option<u32>,
    pub json: bool,
}

/// Run the `book` subcommand: create a task, follow it to a terminal status,
/// and optionally confirm one slot from the shortlist.
pub async fn run(config: &Config, api: Arc<dyn TaskApi>, opts: BookOptions) -> anyhow::Result<()> {
    let mut printer = Printer::new(opts.json, std::io::stdout());
    follow(config, api, opts, &mut printer).await
}

async fn follow<W: Write>(
    config: &Config,
    api: Arc<dyn TaskApi>,
    opts: BookOptions,
    printer: &mut Printer<W>,
) -> anyhow::Result<()> {
    let controller = TaskController::from_config(api, config);
    let events = controller.subscribe();

    match controller.start(opts.input).await {
        StartOutcome::Started { task_id } => debug!(task_id = %task_id, "following task"),
        StartOutcome::Failed { message } => {
            printer.drain(&events);
            anyhow::bail!(message);
        }
        StartOutcome::Superseded => anyhow::bail!("task creation was interrupted"),
    }

    let stop = loop {
        tokio::select! {
            event = events.recv_async() => {
                let Ok(event) = event else {
                    break None;
                };
                printer.print(&event);
                if let UiEvent::PollingStopped { reason } = event {
                    break Some(reason);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                controller.dispose();
                printer.drain(&events);
                anyhow::bail!("interrupted");
            }
        }
    };
    // Events published in the same step as the stop are already queued.
    printer.drain(&events);

    match stop {
        Some(StopReason::Terminal(TaskStatus::Completed)) => {}
        Some(StopReason::Terminal(status)) => anyhow::bail!("task ended with status {status}"),
        Some(StopReason::AttemptsExhausted) => {
            let id = controller.task_id().unwrap_or_default();
            anyhow::bail!("gave up waiting; check again later with `bookline status {id}`");
        }
        Some(StopReason::Stopped) | None => anyhow::bail!("polling stopped before the task finished"),
    }

    // Swarm tasks never raise the results event; show the ranking directly.
    if controller.mode() == TaskMode::Swarm {
        if let Some(snapshot) = controller.snapshot() {
            printer.swarm_results(&snapshot.shortlist);
        }
    }

    if let Some(rank) = opts.pick {
        let Some(slot) = controller
            .snapshot()
            .and_then(|s| s.slot_by_rank(rank).cloned())
        else {
            anyhow::bail!("no shortlist entry with rank {rank}");
        };
        let outcome = controller.confirm(&slot).await;
        printer.drain(&events);
        match outcome {
            ConfirmOutcome::Booked { .. } => {}
            ConfirmOutcome::Rejected { reason } | ConfirmOutcome::Failed { reason } => {
                warn!(rank, %reason, "confirmation did not go through");
                anyhow::bail!(reason);
            }
            ConfirmOutcome::NoTask => anyhow::bail!("no task to confirm against"),
        }
    }

    controller.dispose();
    Ok(())
}

fn slot_rows(shortlist: &[RankedSlot]) -> String {
    shortlist
        .iter()
        .map(|s| {
            format!(
                "  #{:<2} {:<28} {}  (score {:.1})",
                s.rank,
                s.display_name(),
                format_slot(&s.slot),
                s.score
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Writes controller events as text or JSON lines.
struct Printer<W: Write> {
    json: bool,
    last_status: Option<TaskStatus>,
    out: W,
}

impl<W: Write> Printer<W> {
    fn new(json: bool, out: W) -> Self {
        Self {
            json,
            last_status: None,
            out,
        }
    }

    fn drain(&mut self, events: &flume::Receiver<UiEvent>) {
        for event in events.try_iter() {
            self.print(&event);
        }
    }

    fn print(&mut self, event: &UiEvent) {
        if self.json {
            match serde_json::to_string(event) {
                Ok(line) => self.line(&line),
                Err(e) => warn!(error = %e, "could not serialise event"),
            }
            return;
        }
        if let Some(text) = self.render(event) {
            self.line(&text);
        }
    }

    /// The top of a swarm ranking. An empty shortlist prints nothing; the
    /// agent message already said so.
    fn swarm_results(&mut self, shortlist: &[RankedSlot]) {
        let top = &shortlist[..shortlist.len().min(SWARM_TOP)];
        if self.json {
            let line = json!({"type": "swarm_results", "shortlist": top}).to_string();
            self.line(&line);
        } else if !top.is_empty() {
            let text = format!("Top {} across providers:\n{}", top.len(), slot_rows(top));
            self.line(&text);
        }
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}") {
            warn!(error = %e, "could not write output");
        }
    }

    fn render(&mut self, event: &UiEvent) -> Option<String> {
        match event {
            UiEvent::MessageAppended(msg) => {
                let who = match msg.role {
                    ChatRole::User => "you",
                    ChatRole::Agent => "agent",
                };
                Some(format!("{who}: {}", msg.content))
            }
            UiEvent::SnapshotUpdated { status } => {
                // Only report changes.
                if self.last_status == Some(*status) {
                    return None;
                }
                self.last_status = Some(*status);
                Some(format!("  [{status}]"))
            }
            UiEvent::ShowResults { shortlist } => Some(slot_rows(shortlist)),
            UiEvent::Notification(n) => Some(format!("! {}: {}", n.title, n.message)),
            UiEvent::ResultsDismissed | UiEvent::PollingStopped { .. } => None,
        }
    }
}
