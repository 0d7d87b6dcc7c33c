//! # Visits
//!
//! A per-user visit counter meant to be hosted as a serverless function.
//!
//! Each invocation carries a `user` identifier. The counter reads that user's
//! current count from a key-value store, adds one, writes the new count back
//! and answers with a greeting:
//!
//! ```json
//! {"message": "Hello alice! You have visited this page 1 times.", "count": 1}
//! ```
//!
//! ## Concepts
//!
//! - **Record**: the stored `(user, count)` pair, see [`VisitRecord`]. A user
//!   that has never been seen has no record, which is read as a count of `0`.
//! - **Store**: anything implementing [`VisitStore`]. The production store is
//!   [`DynamoStore`], tests use [`MemoryStore`].
//! - **Strategy**: how the increment reaches the store, see [`UpdateStrategy`].
//!   The default reads then unconditionally writes, which loses increments when
//!   two invocations for the same user overlap. The atomic strategy asks the
//!   store to add one in a single request instead.
//!
//! ## Error Handling
//!
//! All failures are reported through [`Error`]. Nothing is retried or
//! compensated: a failed read or write aborts the invocation and the error is
//! handed back to the hosting environment.

pub mod config;
pub mod dynamodb;
pub mod handler;
pub mod record;
pub mod store;
#[cfg(test)]
mod test;

pub use config::{Config, UpdateStrategy};
pub use dynamodb::DynamoStore;
pub use handler::VisitCounter;
pub use record::{VisitRecord, VisitRequest, VisitResponse};
pub use store::{MemoryStore, VisitStore};

/// Marker trait for errors produced by a [`VisitStore`].
pub trait StoreError: core::fmt::Display + core::fmt::Debug + Send + Sync + 'static {}
impl<T: core::fmt::Display + core::fmt::Debug + Send + Sync + 'static> StoreError for T {}

/// Top-level error enum that encompasses all errors.
#[derive(snafu::Snafu, Debug)]
pub enum Error {
    #[snafu(display("{source}:\n{}",
                source.chain()
                    .map(|e| format!("{e}"))
                    .collect::<Vec<_>>()
                    .join("\n -> ")))]
    Sdk { source: anyhow::Error },

    #[snafu(display("Invalid visit request: {source}"))]
    Request { source: serde_json::Error },

    #[snafu(display("Could not read the visit count of '{user}': {error}"))]
    Get {
        user: String,
        error: Box<dyn StoreError>,
    },

    #[snafu(display("Could not write visit count {count} for '{user}': {error}"))]
    Put {
        user: String,
        count: u64,
        error: Box<dyn StoreError>,
    },

    #[snafu(display("Could not increment the visit count of '{user}': {error}"))]
    Increment {
        user: String,
        error: Box<dyn StoreError>,
    },

    #[snafu(display("Invalid configuration: {msg}"))]
    Config { msg: String },
}

impl From<anyhow::Error> for Error {
    fn from(source: anyhow::Error) -> Self {
        Error::Sdk { source }
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
