//! Token cryptography for encrypted backend responses.
//!
//! This module is free of HTTP and configuration concerns. It provides the
//! key type, the AES-128-CBC primitive and the token codec used by
//! [`crate::envelope`].
//!
//! # Token format
//!
//! ```text
//! base64url( 0x80 | timestamp(8) | iv(16) | ciphertext | hmac-sha256(32) )
//! ```

pub mod cipher;
pub mod encoding;
pub mod key;
pub mod token;

pub use cipher::CipherError;
pub use key::{KeyError, SymmetricKey};
pub use token::{Token, TokenError};
