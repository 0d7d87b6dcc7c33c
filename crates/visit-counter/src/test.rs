use std::sync::Arc;

use pretty_assertions::assert_eq;
use tokio::sync::Barrier;

use crate::*;

fn counter(store: &MemoryStore) -> VisitCounter<MemoryStore> {
    let _ = env_logger::builder().is_test(true).try_init();
    VisitCounter::new(store.clone(), UpdateStrategy::ReadThenWrite)
}

/// Holds every `get` and `increment` until `parties` of them have arrived,
/// so that overlapping invocations all reach the store before any of them
/// writes.
#[derive(Clone)]
struct GatedStore {
    inner: MemoryStore,
    gate: Arc<Barrier>,
}

impl GatedStore {
    fn new(inner: &MemoryStore, parties: usize) -> Self {
        GatedStore {
            inner: inner.clone(),
            gate: Arc::new(Barrier::new(parties)),
        }
    }
}

impl VisitStore for GatedStore {
    type Error = String;

    async fn get(&self, user: &str) -> Result<Option<VisitRecord>, Self::Error> {
        let found = self.inner.get(user).await?;
        self.gate.wait().await;
        Ok(found)
    }

    async fn put(&self, record: &VisitRecord) -> Result<(), Self::Error> {
        self.inner.put(record).await
    }

    async fn increment(&self, user: &str) -> Result<VisitRecord, Self::Error> {
        self.gate.wait().await;
        self.inner.increment(user).await
    }
}

#[tokio::test]
async fn first_visit_counts_one() {
    let store = MemoryStore::new();
    let response = counter(&store)
        .handle_event(serde_json::json!({"user": "alice"}))
        .await
        .unwrap();
    assert_eq!(
        VisitResponse {
            message: "Hello alice! You have visited this page 1 times.".to_owned(),
            count: 1,
        },
        response
    );
    assert_eq!(Some(1), store.count("alice"));
}

#[tokio::test]
async fn existing_count_is_incremented_and_stored() {
    let store = MemoryStore::with_records([VisitRecord::new("bob", 41)]);
    let response = counter(&store)
        .handle(&VisitRequest::new("bob"))
        .await
        .unwrap();
    assert_eq!(42, response.count);
    assert_eq!(
        "Hello bob! You have visited this page 42 times.",
        response.message
    );
    assert_eq!(Some(42), store.count("bob"));
    assert_eq!((1, 1), (store.gets(), store.puts()));
}

#[tokio::test]
async fn sequential_visits_accumulate() {
    let store = MemoryStore::new();
    let counter = counter(&store);
    let request = VisitRequest::new("vsubtle");
    for k in 1..=7 {
        let response = counter.handle(&request).await.unwrap();
        assert_eq!(k, response.count);
        assert!(response.message.contains("vsubtle"));
        assert!(response.message.contains(&k.to_string()));
    }
    assert_eq!(Some(7), store.count("vsubtle"));
}

#[tokio::test]
async fn users_are_counted_separately() {
    let store = MemoryStore::new();
    let counter = counter(&store);
    counter.handle(&VisitRequest::new("a")).await.unwrap();
    counter.handle(&VisitRequest::new("a")).await.unwrap();
    counter.handle(&VisitRequest::new("b")).await.unwrap();
    assert_eq!((Some(2), Some(1)), (store.count("a"), store.count("b")));
}

#[tokio::test]
async fn user_value_is_not_validated() {
    let store = MemoryStore::new();
    let response = counter(&store)
        .handle_event(serde_json::json!({"user": ""}))
        .await
        .unwrap();
    assert_eq!("Hello ! You have visited this page 1 times.", response.message);
    assert_eq!(Some(1), store.count(""));
}

#[tokio::test]
async fn missing_user_fails_without_touching_the_store() {
    let store = MemoryStore::new();
    let result = counter(&store)
        .handle_event(serde_json::json!({"name": "alice"}))
        .await;
    assert!(matches!(result, Err(Error::Request { .. })), "{result:?}");
    assert_eq!((0, 0), (store.gets(), store.puts()));
}

#[tokio::test]
async fn read_failure_is_propagated() {
    let store = MemoryStore::with_records([VisitRecord::new("alice", 3)]);
    store.fail_gets(true);
    let result = counter(&store).handle(&VisitRequest::new("alice")).await;
    match result {
        Err(Error::Get { user, error }) => {
            assert_eq!("alice", user);
            assert_eq!("store unavailable", error.to_string());
        }
        other => panic!("expected a read error, got {other:?}"),
    }
    assert_eq!(0, store.puts());
    assert_eq!(Some(3), store.count("alice"));
}

#[tokio::test]
async fn write_failure_loses_the_visit() {
    let store = MemoryStore::with_records([VisitRecord::new("alice", 3)]);
    store.fail_puts(true);
    let result = counter(&store).handle(&VisitRequest::new("alice")).await;
    assert!(
        matches!(&result, Err(Error::Put { user, count: 4, .. }) if user == "alice"),
        "{result:?}"
    );
    assert_eq!(Some(3), store.count("alice"));

    store.fail_puts(false);
    let response = counter(&store)
        .handle(&VisitRequest::new("alice"))
        .await
        .unwrap();
    assert_eq!(4, response.count);
}

#[tokio::test]
async fn overlapping_visits_lose_an_increment() {
    let store = MemoryStore::new();
    let counter = VisitCounter::new(GatedStore::new(&store, 2), UpdateStrategy::ReadThenWrite);
    let request = VisitRequest::new("carol");

    let (a, b) = tokio::join!(counter.handle(&request), counter.handle(&request));

    // Both invocations read an absent record before either wrote.
    assert_eq!((1, 1), (a.unwrap().count, b.unwrap().count));
    assert_eq!(Some(1), store.count("carol"));
    assert_eq!(2, store.puts());
}

#[tokio::test]
async fn atomic_strategy_keeps_overlapping_visits() {
    let store = MemoryStore::new();
    let counter = VisitCounter::new(GatedStore::new(&store, 2), UpdateStrategy::Atomic);
    let request = VisitRequest::new("carol");

    // Neither increment runs until both invocations have reached the store.
    let (a, b) = tokio::join!(counter.handle(&request), counter.handle(&request));

    let mut counts = [a.unwrap().count, b.unwrap().count];
    counts.sort();
    assert_eq!([1, 2], counts);
    assert_eq!(Some(2), store.count("carol"));
    assert_eq!((0, 0), (store.gets(), store.puts()));
}

#[tokio::test]
async fn atomic_failure_is_propagated() {
    let store = MemoryStore::new();
    store.fail_puts(true);
    let counter = VisitCounter::new(store.clone(), UpdateStrategy::Atomic);
    let result = counter.handle(&VisitRequest::new("dave")).await;
    assert!(matches!(result, Err(Error::Increment { .. })), "{result:?}");
    assert_eq!(None, store.count("dave"));
}

#[tokio::test]
async fn counter_follows_config() {
    let config = Config {
        strategy: UpdateStrategy::Atomic,
        ..Default::default()
    };
    let counter = VisitCounter::from_config(MemoryStore::new(), &config);
    assert_eq!(UpdateStrategy::Atomic, counter.strategy());
    counter.handle(&VisitRequest::new("erin")).await.unwrap();
    assert_eq!(Some(1), counter.store().count("erin"));
}
