//! Response envelope handling.
//!
//! Every 2xx body from the backend passes through [`ResponseDecoder`] before
//! callers see it. The envelope is `{ "encrypted": bool, "data": … }`; sealed
//! envelopes carry a token (see [`crate::crypto::token`]) in `data`.
//!
//! # Invariants
//!
//! - The decoder is a pure function of the response and the configuration it
//!   was built with. No global state.
//! - Key bytes, tokens and decrypted payloads are never logged.

pub mod decoder;
pub mod error;

pub use decoder::{
    decode, is_encrypted, DecoderConfig, FailurePolicy, Outcome, ResponseDecoder, TagPolicy,
};
pub use error::DecodeError;
