//! [`DecodeError`]: everything that can go wrong turning a response into a payload.

use thiserror::Error;

use crate::crypto::{CipherError, TokenError};

/// Failure of a single decode. Decoding is deterministic, so none of these
/// are worth retrying.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The token is not base64url, is truncated, or carries an unknown version.
    #[error("malformed token: {0}")]
    MalformedToken(#[from] TokenError),

    /// `encrypted: true` but `data` is not a string.
    #[error("malformed token: encrypted envelope data is not a string")]
    NonStringData,

    /// CBC decryption failed (ragged ciphertext or bad padding).
    #[error("cipher failure: {0}")]
    CipherFailure(#[from] CipherError),

    /// The trailing tag does not match; only raised when tag verification is on.
    #[error("integrity tag mismatch")]
    IntegrityMismatch,

    /// Decryption succeeded but the plaintext is not UTF-8 JSON.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Encryption is enabled but no key was configured.
    #[error("response encryption is enabled but no key is configured")]
    MisconfiguredKey,
}

impl DecodeError {
    /// Stable short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::MalformedToken(_) | DecodeError::NonStringData => "malformed_token",
            DecodeError::CipherFailure(_) => "cipher_failure",
            DecodeError::IntegrityMismatch => "integrity_mismatch",
            DecodeError::InvalidPayload(_) => "invalid_payload",
            DecodeError::MisconfiguredKey => "misconfigured_key",
        }
    }

    /// Whether the token itself is structurally bad.
    pub fn is_malformed_token(&self) -> bool {
        matches!(
            self,
            DecodeError::MalformedToken(_) | DecodeError::NonStringData
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(
            DecodeError::from(TokenError::TooShort(3)).kind(),
            "malformed_token"
        );
        assert_eq!(DecodeError::NonStringData.kind(), "malformed_token");
        assert_eq!(
            DecodeError::from(CipherError::InvalidPadding).kind(),
            "cipher_failure"
        );
        assert_eq!(DecodeError::IntegrityMismatch.kind(), "integrity_mismatch");
        assert_eq!(
            DecodeError::InvalidPayload("invalid json".into()).kind(),
            "invalid_payload"
        );
        assert_eq!(DecodeError::MisconfiguredKey.kind(), "misconfigured_key");
    }

    #[test]
    fn display_carries_token_defect() {
        let e = DecodeError::from(TokenError::BadVersion(0x81));
        assert!(e.to_string().contains("bad version"));
        let e = DecodeError::from(TokenError::TooShort(10));
        assert!(e.to_string().contains("too short"));
    }
}
