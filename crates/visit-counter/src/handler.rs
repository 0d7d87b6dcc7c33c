//! The visit counter operation.
use crate::{
    Config, Error, Result, UpdateStrategy, VisitRecord, VisitRequest, VisitResponse, VisitStore,
};

/// Counts visits per user.
///
/// Holds no state of its own besides the injected store, so one counter may
/// serve any number of invocations.
#[derive(Clone, Debug)]
pub struct VisitCounter<S> {
    store: S,
    strategy: UpdateStrategy,
}

impl<S: VisitStore + Sync> VisitCounter<S> {
    pub fn new(store: S, strategy: UpdateStrategy) -> Self {
        VisitCounter { store, strategy }
    }

    /// A counter using the strategy named in `config`.
    pub fn from_config(store: S, config: &Config) -> Self {
        Self::new(store, config.strategy)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn strategy(&self) -> UpdateStrategy {
        self.strategy
    }

    /// Handles a raw invocation event.
    pub async fn handle_event(&self, event: serde_json::Value) -> Result<VisitResponse> {
        let request = VisitRequest::from_event(event)?;
        self.handle(&request).await
    }

    /// Records one visit of `request.user` and greets them.
    pub async fn handle(&self, request: &VisitRequest) -> Result<VisitResponse> {
        let user = request.user.as_str();
        let record = match self.strategy {
            UpdateStrategy::ReadThenWrite => self.read_then_write(user).await?,
            UpdateStrategy::Atomic => {
                self.store
                    .increment(user)
                    .await
                    .map_err(|error| Error::Increment {
                        user: user.to_owned(),
                        error: Box::new(error),
                    })?
            }
        };
        log::info!("'{}' has visited {} times", record.user, record.count);
        Ok(VisitResponse::from(&record))
    }

    async fn read_then_write(&self, user: &str) -> Result<VisitRecord> {
        let found = self.store.get(user).await.map_err(|error| Error::Get {
            user: user.to_owned(),
            error: Box::new(error),
        })?;
        log::debug!("read {found:?} for '{user}'");
        let record = VisitRecord::or_absent(found, user).next();
        self.store.put(&record).await.map_err(|error| Error::Put {
            user: user.to_owned(),
            count: record.count,
            error: Box::new(error),
        })?;
        Ok(record)
    }
}
