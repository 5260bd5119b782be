//! shopsync - bidirectional sync between a local commerce store and a
//! remote commerce platform.
//!
//! Local records are pushed to the platform's Admin GraphQL API one at a
//! time and pulled back page by page. The engine lives in [`sync`]; the
//! network boundary in [`remote`].

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod remote;
pub mod storage;
pub mod sync;

pub use cli::args::{Cli, Commands, OutputFormat};
pub use error::ShopSyncError;
pub use storage::Database;
