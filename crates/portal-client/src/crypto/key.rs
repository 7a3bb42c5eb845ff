//! [`SymmetricKey`]: the pre-shared 32-byte response key.

use thiserror::Error;

use super::{cipher, encoding};

/// Byte length of the full symmetric key.
pub const KEY_LEN: usize = 32;

/// Byte length of each half of the key.
pub const SUB_KEY_LEN: usize = KEY_LEN / 2;

/// Errors produced while loading a key.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// The configured value is not base64 or base64url.
    #[error("key is not valid base64url")]
    InvalidEncoding,

    /// The decoded key material has an unexpected length.
    #[error("key has invalid length: expected {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

#[derive(Clone)]
struct Halves {
    encryption: [u8; cipher::KEY_LEN],
    signing: [u8; SUB_KEY_LEN],
}

/// The response key, split into its encryption and signing halves.
///
/// The first 16 bytes key AES-128-CBC; the last 16 bytes key HMAC-SHA256
/// for the integrity tag. Memory is zeroed on drop and `Debug` never prints
/// key bytes.
#[derive(Clone)]
pub struct SymmetricKey(Box<Halves>);

impl SymmetricKey {
    /// Build a key from exactly [`KEY_LEN`] raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidLength`] if the slice has the wrong length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != KEY_LEN {
            return Err(KeyError::InvalidLength(bytes.len()));
        }
        let mut halves = Box::new(Halves {
            encryption: [0u8; cipher::KEY_LEN],
            signing: [0u8; SUB_KEY_LEN],
        });
        halves.encryption.copy_from_slice(&bytes[..SUB_KEY_LEN]);
        halves.signing.copy_from_slice(&bytes[SUB_KEY_LEN..]);
        Ok(Self(halves))
    }

    /// Parse a base64url (padded or unpadded) key as delivered in configuration.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidEncoding`] or [`KeyError::InvalidLength`].
    pub fn from_base64url(encoded: &str) -> Result<Self, KeyError> {
        let mut raw = encoding::decode_base64url(encoded).map_err(|_| KeyError::InvalidEncoding)?;
        let key = Self::from_bytes(&raw);
        raw.iter_mut().for_each(|b| *b = 0);
        key
    }

    /// AES-128 sub-key (first half).
    pub fn encryption_key(&self) -> &[u8; cipher::KEY_LEN] {
        &self.0.encryption
    }

    /// HMAC sub-key (second half).
    pub fn signing_key(&self) -> &[u8; SUB_KEY_LEN] {
        &self.0.signing
    }

    /// Encode the full key as padded base64url.
    pub fn to_base64url(&self) -> String {
        let mut raw = [0u8; KEY_LEN];
        raw[..SUB_KEY_LEN].copy_from_slice(&self.0.encryption);
        raw[SUB_KEY_LEN..].copy_from_slice(&self.0.signing);
        let encoded = encoding::encode_base64url(&raw);
        raw.iter_mut().for_each(|b| *b = 0);
        encoded
    }
}

impl Drop for Halves {
    fn drop(&mut self) {
        self.encryption.iter_mut().for_each(|b| *b = 0);
        self.signing.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}
