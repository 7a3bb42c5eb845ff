//! Client library for the NCD issuer portal backend.
//!
//! The backend owns all business logic. This crate covers the client's side
//! of the contract:
//!
//! - [`envelope`]: turns raw JSON bodies into payloads, decrypting sealed
//!   `{ "encrypted": true, "data": <token> }` envelopes;
//! - [`crypto`]: the key type and the token codec behind it;
//! - [`api`]: an authenticated HTTP client that runs every body through the
//!   decoder and maps failure statuses to [`common::ApiError`];
//! - [`config`] and [`telemetry`]: environment configuration and logging.

pub mod api;
pub mod config;
pub mod crypto;
pub mod envelope;
pub mod telemetry;

pub use api::ApiClient;
pub use config::Config;
pub use envelope::{DecodeError, DecoderConfig, FailurePolicy, Outcome, ResponseDecoder, TagPolicy};
