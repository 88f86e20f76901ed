//! Log output setup for the `triage` binary.
//!
//! Verbosity comes from `TRIAGE_LOG`, then `RUST_LOG`, then the level the
//! caller passes. Both formats write to stderr so stdout carries only
//! command output.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Directive variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "TRIAGE_LOG";

/// Shape of emitted log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Human
        }
    }
}

fn log_filter(default_level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str()))
}

/// Install the process-wide subscriber.
///
/// Returns `false` when a subscriber was already installed; the existing one
/// stays in place.
pub fn init_tracing(format: LogFormat, default_level: Level) -> bool {
    let (human, json) = match format {
        LogFormat::Human => (
            Some(fmt::layer().with_target(false).with_writer(std::io::stderr)),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(fmt::layer().with_target(false).with_writer(std::io::stderr).json()),
        ),
    };

    tracing_subscriber::registry()
        .with(log_filter(default_level))
        .with(human)
        .with(json)
        .try_init()
        .is_ok()
}
