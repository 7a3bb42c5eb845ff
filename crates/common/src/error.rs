//! Error taxonomy for calls against the NCD backend.

use thiserror::Error;

/// Maximum number of bytes of a response body kept in an error message.
pub const MAX_ERROR_BODY_LEN: usize = 256;

/// Failure of a single backend call.
///
/// Status-derived variants are produced by [`ApiError::from_status`]:
/// - 400 / 422 → [`ApiError::Validation`]
/// - 401 → [`ApiError::Unauthorized`]
/// - 403 → [`ApiError::Forbidden`]
/// - 404 → [`ApiError::NotFound`]
/// - 409 → [`ApiError::Conflict`]
/// - 429 → [`ApiError::RateLimited`]
/// - 5xx → [`ApiError::Server`]
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body or parameters were rejected by the backend.
    #[error("validation failed ({status}): {message}")]
    Validation { status: u16, message: String },

    /// Missing or expired bearer token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The authenticated principal lacks permission for the resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request conflicts with current resource state (e.g. series already approved).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Too many requests.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The backend failed internally.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Any other non-2xx status.
    #[error("unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// The request could not be built (bad path or unserialisable body).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The request never produced a response (connect, timeout, body read).
    #[error("transport error: {0}")]
    Transport(String),

    /// A 2xx body could not be decoded into the caller-visible payload.
    #[error("response decode failed: {0}")]
    Decode(String),
}

impl ApiError {
    /// Map a non-2xx status and its (already extracted) message to an error.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = truncate(message.into());
        match status {
            400 | 422 => ApiError::Validation { status, message },
            401 => ApiError::Unauthorized(message),
            403 => ApiError::Forbidden(message),
            404 => ApiError::NotFound(message),
            409 => ApiError::Conflict(message),
            429 => ApiError::RateLimited(message),
            500..=599 => ApiError::Server { status, message },
            _ => ApiError::UnexpectedStatus { status, message },
        }
    }

    /// HTTP status behind this error, if it came from a response.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ApiError::Validation { status, .. }
            | ApiError::Server { status, .. }
            | ApiError::UnexpectedStatus { status, .. } => Some(*status),
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Forbidden(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::Conflict(_) => Some(409),
            ApiError::RateLimited(_) => Some(429),
            ApiError::InvalidRequest(_) | ApiError::Transport(_) | ApiError::Decode(_) => None,
        }
    }

    /// Whether the caller should drop its session and re-authenticate.
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }
}

fn truncate(mut message: String) -> String {
    if message.len() <= MAX_ERROR_BODY_LEN {
        return message;
    }
    let mut cut = MAX_ERROR_BODY_LEN;
    while !message.is_char_boundary(cut) {
        cut -= 1;
    }
    message.truncate(cut);
    message.push('…');
    message
}
