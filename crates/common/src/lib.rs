//! Wire types and error taxonomy shared by the NCD portal client crates.

pub mod error;
pub mod protocol;

pub use error::ApiError;
pub use protocol::{ErrorResponse, ResponseEnvelope};
