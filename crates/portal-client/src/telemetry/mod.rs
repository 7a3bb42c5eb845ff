//! Telemetry initialisation for the portal client.
//!
//! Structured JSON logs only, written to stderr so that command output on
//! stdout stays machine-readable.
//!
//! # Telemetry invariants
//!
//! - **No key material, tokens or decrypted payloads** in any log field.
//! - Log level is configurable via `NCD_LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   overrides it when set.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Level used when neither the command line nor configuration sets one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Pick the log level: an explicit flag wins over the configured value.
pub fn resolve_level<'a>(flag: Option<&'a str>, configured: Option<&'a str>) -> &'a str {
    flag.or(configured)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(DEFAULT_LOG_LEVEL)
}

/// Initialise the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the subscriber has already been set.
pub fn init(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise tracing subscriber: {e}"))
}
