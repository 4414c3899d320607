use std::str::FromStr;

use tracing_subscriber::{fmt, EnvFilter};

/// HTTP-stack targets that are noisy at `debug` and below. They stay at
/// `warn` unless the configured level names them explicitly.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "h2", "reqwest"];

/// Output flavour for [`init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

impl LogFormat {
    /// Maps the `general.json_logs` / `--json-logs` switch.
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            LogFormat::Json
        } else {
            LogFormat::Human
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" | "text" | "pretty" => Ok(LogFormat::Human),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format {other:?} (expected human or json)")),
        }
    }
}

/// Filter directives for a configured level such as `"info"` or
/// `"bl_core=debug,warn"`.
pub fn directives(level: &str) -> String {
    let level = level.trim();
    let base = if level.is_empty() { "info" } else { level };
    let mut out = base.to_string();
    for target in QUIET_TARGETS {
        let named = base
            .split(',')
            .any(|d| d.split('=').next().map(str::trim) == Some(*target));
        if !named {
            out.push_str(&format!(",{target}=warn"));
        }
    }
    out
}

/// Install the global subscriber, writing to stderr so stdout stays free
/// for command output.
///
/// `RUST_LOG` wins over `level` when set. Returns `false` when a subscriber
/// was already installed, which makes repeated calls (tests) harmless.
pub fn init(service_name: &str, level: &str, format: LogFormat) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives(level)));

    let installed = match format {
        LogFormat::Human => fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .try_init()
            .is_ok(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_current_span(false)
            .with_file(true)
            .with_line_number(true)
            .try_init()
            .is_ok(),
    };

    if installed {
        tracing::debug!(service = service_name, ?format, "logging initialised");
    }
    installed
}
