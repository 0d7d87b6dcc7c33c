//! Visit records and the invocation payloads.
use snafu::prelude::*;

use crate::{RequestSnafu, Result};

/// The stored `(user, count)` pair for one user.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VisitRecord {
    pub user: String,
    pub count: u64,
}

impl VisitRecord {
    pub fn new(user: impl Into<String>, count: u64) -> Self {
        VisitRecord {
            user: user.into(),
            count,
        }
    }

    /// The record of a user that has never visited.
    ///
    /// Stores return `None` for users without a record; callers read that
    /// as this zero-count record rather than special-casing absence.
    pub fn absent(user: impl Into<String>) -> Self {
        Self::new(user, 0)
    }

    /// Resolves a lookup result, falling back to [`VisitRecord::absent`].
    pub fn or_absent(found: Option<VisitRecord>, user: &str) -> Self {
        found.unwrap_or_else(|| Self::absent(user))
    }

    /// The record after one more visit.
    pub fn next(&self) -> Self {
        Self::new(self.user.clone(), self.count.saturating_add(1))
    }
}

/// Incoming invocation event.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VisitRequest {
    pub user: String,
}

impl VisitRequest {
    pub fn new(user: impl Into<String>) -> Self {
        VisitRequest { user: user.into() }
    }

    /// Extracts the request from a raw event.
    ///
    /// Fails if `user` is missing or is not a string. The value itself is
    /// not validated.
    pub fn from_event(event: serde_json::Value) -> Result<Self> {
        serde_json::from_value(event).context(RequestSnafu)
    }
}

/// The invocation result.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VisitResponse {
    pub message: String,
    pub count: u64,
}

impl From<&VisitRecord> for VisitResponse {
    fn from(record: &VisitRecord) -> Self {
        VisitResponse {
            message: format!(
                "Hello {}! You have visited this page {} times.",
                record.user, record.count
            ),
            count: record.count,
        }
    }
}
