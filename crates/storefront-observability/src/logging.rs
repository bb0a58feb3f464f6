//! Structured logging setup

use serde::{Deserialize, Serialize};
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Filter for the given base level. `RUST_LOG` wins when set.
///
/// Connection-level chatter from the HTTP stack is capped at `warn` unless the
/// base level asks for `trace`.
pub fn build_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let mut filter = EnvFilter::new(level);
    if !level.eq_ignore_ascii_case("trace") {
        for directive in ["hyper_util=warn", "reqwest=warn", "notify=warn"] {
            match directive.parse() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(e) => eprintln!("Ignoring log directive {}: {}", directive, e),
            }
        }
    }
    filter
}

/// Install the global subscriber
pub fn init_logging(level: &str, format: LogFormat) -> Result<(), SetGlobalDefaultError> {
    let filter = build_filter(level);

    match format {
        LogFormat::Text => {
            let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
            tracing::subscriber::set_global_default(subscriber)
        }
        LogFormat::Json => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .json()
                .with_current_span(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
    }
}
