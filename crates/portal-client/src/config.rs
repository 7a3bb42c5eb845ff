//! Configuration loading and validation for the portal client.
//!
//! All values are read from `NCD_`-prefixed environment variables at startup.
//! The process exits with a clear error message if any required variable is
//! missing or invalid.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::crypto::SymmetricKey;
use crate::envelope::{DecoderConfig, TagPolicy};
use crate::telemetry;

/// Prefix shared by every environment variable the client reads.
pub const ENV_PREFIX: &str = "NCD";

/// Validated client configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Base URL of the NCD backend API, e.g. `https://api.example.com/v1`. **Required.**
    pub api_base_url: String,

    /// Whether sealed response envelopes are decrypted.
    #[serde(default)]
    pub response_encryption_enabled: bool,

    /// base64url-encoded 32-byte response key.
    #[serde(default)]
    pub response_encryption_key: Option<String>,

    /// Reject sealed responses whose integrity tag does not verify.
    #[serde(default)]
    pub verify_response_tag: bool,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Bearer token attached to every request when set.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_request_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    telemetry::DEFAULT_LOG_LEVEL.into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::load(config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Load and validate configuration from an arbitrary source.
    pub fn load<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let cfg = config::Config::builder()
            .add_source(source)
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.api_base_url, "NCD_API_BASE_URL")?;
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            anyhow::bail!("NCD_API_BASE_URL must be an http:// or https:// URL");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("NCD_REQUEST_TIMEOUT_SECS must be > 0");
        }
        self.response_key()?;
        Ok(())
    }

    /// Parse the configured response key, if any.
    ///
    /// An empty or whitespace-only value counts as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not base64url or not 32 bytes.
    pub fn response_key(&self) -> Result<Option<SymmetricKey>> {
        match self.response_encryption_key.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(encoded) => SymmetricKey::from_base64url(encoded)
                .map(Some)
                .context("NCD_RESPONSE_ENCRYPTION_KEY is invalid"),
        }
    }

    /// Build the decoder settings from this configuration.
    pub fn decoder_config(&self) -> Result<DecoderConfig> {
        Ok(DecoderConfig {
            enabled: self.response_encryption_enabled,
            key: self.response_key()?,
            tag_policy: if self.verify_response_tag {
                TagPolicy::Verify
            } else {
                TagPolicy::Ignore
            },
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Bearer token, ignoring empty values.
    pub fn api_token(&self) -> Option<&str> {
        self.api_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material or tokens.
        f.debug_struct("Config")
            .field("api_base_url", &self.api_base_url)
            .field("response_encryption_enabled", &self.response_encryption_enabled)
            .field(
                "response_encryption_key",
                &self.response_encryption_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("verify_response_tag", &self.verify_response_tag)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
