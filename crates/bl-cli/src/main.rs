mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use bl_api_types::{PreferenceWeights, TaskInput, TaskMode, TaskUrgency};
use bl_core::config::Config;
use bl_telemetry::logging::{self, LogFormat};
use clap::{Parser, Subcommand, ValueEnum};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// bookline -- hand an appointment request to the scheduling backend and
/// follow it to a result.
#[derive(Parser)]
#[command(name = "bookline", version, about)]
struct Cli {
    /// Backend base URL (overrides config and BOOKLINE_API_BASE_URL).
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Config file to use instead of ~/.bookline/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a scheduling request and follow it until it finishes.
    Book {
        /// What you need, in plain words.
        description: String,
        #[arg(long, value_enum, default_value_t = ModeArg::Single)]
        mode: ModeArg,
        #[arg(long, value_enum, default_value_t = UrgencyArg::Asap)]
        urgency: UrgencyArg,
        /// Appointment length, e.g. "30 min".
        #[arg(long)]
        duration: Option<String>,
        /// Preferred date when urgency is `specific`.
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        availability_weight: Option<f64>,
        #[arg(long)]
        rating_weight: Option<f64>,
        #[arg(long)]
        distance_weight: Option<f64>,
        /// Confirm the shortlist entry with this rank once results arrive.
        #[arg(long)]
        pick: Option<u32>,
        /// Print events as JSON lines.
        #[arg(long)]
        json: bool,
    },

    /// Show the current snapshot of a task.
    Status {
        task_id: String,
        #[arg(long)]
        json: bool,
    },

    /// List the tasks the backend knows about.
    Tasks,

    /// Book a slot directly.
    Confirm {
        task_id: String,
        provider_id: String,
        /// Slot start, ISO-8601.
        slot: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Single,
    Swarm,
}

impl From<ModeArg> for TaskMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Single => TaskMode::Single,
            ModeArg::Swarm => TaskMode::Swarm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum UrgencyArg {
    Asap,
    Flexible,
    Specific,
}

impl From<UrgencyArg> for TaskUrgency {
    fn from(u: UrgencyArg) -> Self {
        match u {
            UrgencyArg::Asap => TaskUrgency::Asap,
            UrgencyArg::Flexible => TaskUrgency::Flexible,
            UrgencyArg::Specific => TaskUrgency::Specific,
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load().context("failed to load config")?,
    };
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    if cli.json_logs {
        config.general.json_logs = true;
    }
    config.validate()?;
    Ok(config)
}

/// Explicit weights start from the defaults; no flags means no preferences
/// are sent at all.
fn weights(
    availability: Option<f64>,
    rating: Option<f64>,
    distance: Option<f64>,
) -> anyhow::Result<Option<PreferenceWeights>> {
    if availability.is_none() && rating.is_none() && distance.is_none() {
        return Ok(None);
    }
    let defaults = PreferenceWeights::default();
    let w = PreferenceWeights {
        availability_weight: availability.unwrap_or(defaults.availability_weight),
        rating_weight: rating.unwrap_or(defaults.rating_weight),
        distance_weight: distance.unwrap_or(defaults.distance_weight),
    };
    if !w.is_valid() {
        anyhow::bail!("preference weights must be finite and non-negative");
    }
    Ok(Some(w))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    logging::init(
        "bookline",
        &config.general.log_level,
        LogFormat::from_json_flag(config.general.json_logs),
    );

    let client = commands::api_client(&config)?;

    match cli.command {
        Commands::Book {
            description,
            mode,
            urgency,
            duration,
            date,
            availability_weight,
            rating_weight,
            distance_weight,
            pick,
            json,
        } => {
            if description.trim().is_empty() {
                anyhow::bail!("description must not be empty");
            }
            let mut input = TaskInput::new(description.trim(), mode.into());
            input.urgency = urgency.into();
            input.duration = duration;
            input.specific_date = date;
            input.preferences = weights(availability_weight, rating_weight, distance_weight)?;

            let opts = commands::book::BookOptions { input, pick, json };
            commands::book::run(&config, Arc::new(client), opts).await?;
        }
        Commands::Status { task_id, json } => {
            commands::status::run(&client, &task_id, json).await?;
        }
        Commands::Tasks => {
            commands::tasks::run(&client).await?;
        }
        Commands::Confirm {
            task_id,
            provider_id,
            slot,
        } => {
            commands::confirm::run(&client, &task_id, &provider_id, &slot).await?;
        }
    }

    Ok(())
}
