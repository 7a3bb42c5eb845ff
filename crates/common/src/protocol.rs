//! Wire types exchanged between the portal client and the NCD backend.
//!
//! Every JSON response body from the backend is either a [`ResponseEnvelope`]
//! or a legacy, non-enveloped payload that callers receive unchanged.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// Field name flagging whether `data` carries an encrypted token.
pub const ENCRYPTED_FIELD: &str = "encrypted";

/// Field name holding the envelope payload.
pub const DATA_FIELD: &str = "data";

/// Outer wrapper around every enveloped backend response.
///
/// When `encrypted` is `true`, `data` is a base64url token string. Otherwise
/// `data` is the plain JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Whether `data` is an encrypted token.
    pub encrypted: bool,
    /// Token string or raw JSON value.
    pub data: serde_json::Value,
}

impl ResponseEnvelope {
    /// Wrap a token string in an encrypted envelope.
    pub fn sealed(token: impl Into<String>) -> Self {
        Self {
            encrypted: true,
            data: serde_json::Value::String(token.into()),
        }
    }

    /// Wrap a JSON value in a plaintext envelope.
    pub fn plain(data: serde_json::Value) -> Self {
        Self {
            encrypted: false,
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Error body returned by the backend on non-2xx statuses.
///
/// The backend is inconsistent about the field name: validation errors use
/// `detail`, everything else uses `message`. Both are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    /// Best human-readable description carried by the body, if any.
    pub fn describe(&self) -> Option<String> {
        if let Some(message) = self.message.as_deref() {
            if !message.trim().is_empty() {
                return Some(message.to_owned());
            }
        }
        match &self.detail {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }
}
