//! Key-value storage of visit records.
use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use crate::{StoreError, VisitRecord};

/// A table of visit records keyed by user.
///
/// Implementations only move records in and out. They never retry, and
/// `put` never checks what it overwrites.
pub trait VisitStore {
    /// Errors that may occur talking to the store.
    type Error: StoreError;

    /// Looks up the record for `user`, `None` if the user has no record.
    fn get(
        &self,
        user: &str,
    ) -> impl Future<Output = Result<Option<VisitRecord>, Self::Error>> + Send;

    /// Writes `record`, replacing any previous record for the same user.
    fn put(&self, record: &VisitRecord) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Adds one to the count of `user` in a single store operation and
    /// returns the updated record. A missing record is created with a
    /// count of `1`.
    fn increment(&self, user: &str) -> impl Future<Output = Result<VisitRecord, Self::Error>> + Send;
}

#[derive(Default)]
struct MemoryInner {
    records: Mutex<HashMap<String, u64>>,
    fail_gets: AtomicBool,
    fail_puts: AtomicBool,
    gets: AtomicUsize,
    puts: AtomicUsize,
}

/// An in-memory [`VisitStore`].
///
/// Clones share the same records, so a test can keep a handle while the
/// counter owns another.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `records`.
    pub fn with_records(records: impl IntoIterator<Item = VisitRecord>) -> Self {
        let store = Self::new();
        store.records().extend(records.into_iter().map(|r| (r.user, r.count)));
        store
    }

    fn records(&self) -> std::sync::MutexGuard<'_, HashMap<String, u64>> {
        // Every mutation is a single insert, a poisoned map is still whole.
        self.inner
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The stored count of `user`, if any.
    pub fn count(&self, user: &str) -> Option<u64> {
        self.records().get(user).copied()
    }

    /// Makes every following `get` fail.
    pub fn fail_gets(&self, fail: bool) {
        self.inner.fail_gets.store(fail, Ordering::SeqCst);
    }

    /// Makes every following `put` and `increment` fail.
    pub fn fail_puts(&self, fail: bool) {
        self.inner.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Number of `get` calls made so far.
    pub fn gets(&self) -> usize {
        self.inner.gets.load(Ordering::SeqCst)
    }

    /// Number of `put` calls made so far.
    pub fn puts(&self) -> usize {
        self.inner.puts.load(Ordering::SeqCst)
    }
}

impl VisitStore for MemoryStore {
    type Error = String;

    async fn get(&self, user: &str) -> Result<Option<VisitRecord>, Self::Error> {
        self.inner.gets.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_gets.load(Ordering::SeqCst) {
            return Err("store unavailable".to_owned());
        }
        Ok(self.count(user).map(|count| VisitRecord::new(user, count)))
    }

    async fn put(&self, record: &VisitRecord) -> Result<(), Self::Error> {
        self.inner.puts.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_puts.load(Ordering::SeqCst) {
            return Err("store unavailable".to_owned());
        }
        self.records().insert(record.user.clone(), record.count);
        Ok(())
    }

    async fn increment(&self, user: &str) -> Result<VisitRecord, Self::Error> {
        if self.inner.fail_puts.load(Ordering::SeqCst) {
            return Err("store unavailable".to_owned());
        }
        let mut records = self.records();
        let count = records.entry(user.to_owned()).or_insert(0);
        *count = count.saturating_add(1);
        Ok(VisitRecord::new(user, *count))
    }
}
