//! Remote commerce platform API client.
//!
//! A thin I/O boundary over the platform's GraphQL Admin endpoint. The client
//! issues one query or mutation per call and never retries; classification of
//! failures into [`ApiError`] variants is the only logic that lives here.

mod client;
pub mod documents;
mod error;
mod types;

#[cfg(test)]
pub use client::MockGraphClient;
pub use client::{endpoint_url, ClientConfig, GraphClient, HttpGraphClient};
pub use error::{ApiError, ErrorKind, FieldError};
pub use types::{GraphErrorEntry, GraphResponse, PageInfo};
