//! HTTP access to the NCD backend.
//!
//! All business logic (series approval, payout calculation, compliance
//! scoring, reports) runs on the backend. This layer authenticates requests,
//! maps failure statuses to [`common::ApiError`], and passes every JSON body
//! through [`crate::envelope::ResponseDecoder`].

pub mod client;
pub mod resource;
pub mod session;

pub use client::{ApiClient, ClientBuildError};
pub use resource::Resource;
pub use session::Session;
