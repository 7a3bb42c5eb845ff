//! Parsing and sealing of encrypted response tokens.
//!
//! # Layout
//!
//! ```text
//! offset  len      field
//! 0       1        version (0x80)
//! 1       8        timestamp, big-endian seconds since the Unix epoch
//! 9       16       CBC initialization vector
//! 25      len-57   AES-128-CBC ciphertext (PKCS#7)
//! len-32  32       HMAC-SHA256 over bytes [0, len-32)
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use thiserror::Error;

use super::cipher::{self, CipherError, IV_LEN};
use super::encoding;
use super::key::SymmetricKey;

type HmacSha256 = Hmac<Sha256>;

/// The only supported version byte.
pub const VERSION: u8 = 0x80;

/// Byte length of the embedded timestamp.
pub const TIMESTAMP_LEN: usize = 8;

/// Byte length of the trailing integrity tag.
pub const TAG_LEN: usize = 32;

/// Version + timestamp + IV.
pub const HEADER_LEN: usize = 1 + TIMESTAMP_LEN + IV_LEN;

/// Smallest decoded length that can hold a header, one block and a tag.
pub const MIN_TOKEN_LEN: usize = HEADER_LEN + TAG_LEN;

/// Structural problems found before any decryption is attempted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is not valid base64url")]
    InvalidEncoding,

    #[error("too short: {0} bytes, need at least {MIN_TOKEN_LEN}")]
    TooShort(usize),

    #[error("bad version: 0x{0:02x}")]
    BadVersion(u8),
}

/// A structurally valid token, not yet decrypted or authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    timestamp: u64,
    iv: [u8; IV_LEN],
    ciphertext: Vec<u8>,
    tag: [u8; TAG_LEN],
}

impl Token {
    /// Decode a base64url token string and split it into its fields.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenError`] for bad encoding, short input or an unknown
    /// version byte.
    pub fn parse(encoded: &str) -> Result<Self, TokenError> {
        let raw = encoding::decode_base64url(encoded).map_err(|_| TokenError::InvalidEncoding)?;
        Self::from_bytes(&raw)
    }

    /// Split raw token bytes into their fields.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, TokenError> {
        if raw.len() < MIN_TOKEN_LEN {
            return Err(TokenError::TooShort(raw.len()));
        }
        if raw[0] != VERSION {
            return Err(TokenError::BadVersion(raw[0]));
        }

        let mut ts = [0u8; TIMESTAMP_LEN];
        ts.copy_from_slice(&raw[1..1 + TIMESTAMP_LEN]);
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&raw[1 + TIMESTAMP_LEN..HEADER_LEN]);
        let tag_start = raw.len() - TAG_LEN;
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&raw[tag_start..]);

        Ok(Self {
            timestamp: u64::from_be_bytes(ts),
            iv,
            ciphertext: raw[HEADER_LEN..tag_start].to_vec(),
            tag,
        })
    }

    /// Encrypt `plaintext` into a token with an explicit timestamp and IV.
    ///
    /// The tag is a real HMAC-SHA256 under the key's signing half, so sealed
    /// tokens pass tag verification.
    pub fn seal(plaintext: &[u8], key: &SymmetricKey, timestamp: u64, iv: [u8; IV_LEN]) -> Self {
        let mut token = Self {
            timestamp,
            iv,
            ciphertext: cipher::encrypt(plaintext, key.encryption_key(), &iv),
            tag: [0u8; TAG_LEN],
        };
        if let Some(mac) = token.mac(key) {
            token.tag.copy_from_slice(&mac.finalize().into_bytes());
        }
        token
    }

    /// Encrypt `plaintext` with a random IV and the current time.
    pub fn seal_now(plaintext: &[u8], key: &SymmetricKey) -> Self {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::seal(plaintext, key, now, iv)
    }

    /// Decrypt the ciphertext with the key's encryption half.
    ///
    /// The tag is not consulted; see [`Token::verify_tag`].
    pub fn decrypt(&self, key: &SymmetricKey) -> Result<Vec<u8>, CipherError> {
        cipher::decrypt(&self.ciphertext, key.encryption_key(), &self.iv)
    }

    /// Constant-time check of the trailing tag against the key's signing half.
    pub fn verify_tag(&self, key: &SymmetricKey) -> bool {
        self.mac(key)
            .is_some_and(|mac| mac.verify_slice(&self.tag).is_ok())
    }

    /// Embedded timestamp in seconds since the Unix epoch.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Embedded timestamp as a wall-clock time, `None` if it does not fit in
    /// a [`SystemTime`].
    pub fn issued_at(&self) -> Option<SystemTime> {
        UNIX_EPOCH.checked_add(Duration::from_secs(self.timestamp))
    }

    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn tag(&self) -> &[u8; TAG_LEN] {
        &self.tag
    }

    /// Serialise to raw bytes in wire layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.header_and_ciphertext();
        out.extend_from_slice(&self.tag);
        out
    }

    /// Serialise to the padded base64url wire string.
    pub fn encode(&self) -> String {
        encoding::encode_base64url(&self.to_bytes())
    }

    fn header_and_ciphertext(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.ciphertext.len() + TAG_LEN);
        out.push(VERSION);
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// HMAC over version, timestamp, IV and ciphertext.
    fn mac(&self, key: &SymmetricKey) -> Option<HmacSha256> {
        // HMAC accepts keys of any length, so this never yields `None`.
        let mut mac = <HmacSha256 as Mac>::new_from_slice(key.signing_key()).ok()?;
        mac.update(&self.header_and_ciphertext());
        Some(mac)
    }
}
