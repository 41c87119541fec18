//! # Structured Logging
//!
//! `simulate` writes its report to stdout as JSON lines, so everything
//! `tracing` emits goes to stderr. That keeps
//! `strongbox-node simulate run.json | jq .` working with logging on.
//!
//! What shows up at each level:
//!
//! - `info`: deployment summary, one line per applied step.
//! - `warn`: failed steps, and vault operations reverted after an external
//!   call failed.
//! - `debug`: committed vault operations with owner, asset and amount, and
//!   sandbox deployments.
//! - `trace`: every native transfer and funding in the sandbox.
//!
//! `--log-format json` (or `VAULT_LOG_FORMAT=json`) switches stderr to JSON
//! lines for log collectors.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, colored output. Suitable for local runs.
    Pretty,
    /// Machine-parseable JSON lines.
    Json,
}

impl LogFormat {
    /// Parse a format string. Accepts "json" or "pretty" (case-insensitive).
    /// Returns `Pretty` for any unrecognized value.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Installs the global subscriber. Call once, before the scenario loads.
///
/// `default_level` applies when `RUST_LOG` is unset. To see every ledger
/// posting and host transfer of a run:
///
/// ```text
/// RUST_LOG=strongbox_protocol=debug,strongbox_contracts=trace strongbox-node simulate run.json
/// ```
pub fn init_logging(default_level: &str, format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
                .init();
        }
    }

    tracing::debug!("logging initialized (format={:?})", format);
}
