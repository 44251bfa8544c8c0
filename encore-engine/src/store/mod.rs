use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// An unknown or internal error happened with the store
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A stored value did not (de)serialize
    #[error("Stored value could not be decoded: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Represents a namespaced key-value store holding all venue state.
///
/// Every component receives the store by injection, never through a global,
/// so tests can swap in [MemoryStore]. The `put_if_absent`, `incr`, and
/// `incr_field` operations must be atomic: vote dedup, skip tallies, and
/// hype counters rely on them instead of read-modify-write sequences.
#[async_trait]
pub trait VenueStore: Send + Sync + 'static {
    /// Returns the value at `key`, skipping entries past their expiry
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Writes `value` at `key`, replacing any previous value
    async fn put(&self, key: &str, value: Value, expires_at: Option<DateTime<Utc>>) -> Result<()>;

    /// Writes `value` at `key` only if nothing valid is stored there yet.
    /// Returns false when an entry already exists.
    async fn put_if_absent(&self, key: &str, value: Value) -> Result<bool>;

    /// Atomically adds `by` to the integer at `key`, treating a missing
    /// entry as 0, and returns the new value
    async fn incr(&self, key: &str, by: i64) -> Result<i64>;

    /// Atomically adds `by` to the numeric `field` of the JSON object at
    /// `key` and returns the new value, or None if the key is missing
    async fn incr_field(&self, key: &str, field: &str, by: i64) -> Result<Option<i64>>;

    /// Removes the entry at `key`, returning whether one existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Returns all live entries whose key starts with `prefix`
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Value)>>;
}

/// Helper trait to reduce (de)serialization boilerplate
#[async_trait]
pub trait StoreExt: VenueStore {
    async fn get_json<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn put_json<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        self.put(key, serde_json::to_value(value)?, None).await
    }

    async fn put_json_expiring<T>(
        &self,
        key: &str,
        value: &T,
        expires_at: DateTime<Utc>,
    ) -> Result<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        self.put(key, serde_json::to_value(value)?, Some(expires_at))
            .await
    }

    async fn put_json_if_absent<T>(&self, key: &str, value: &T) -> Result<bool>
    where
        T: Serialize + Sync + ?Sized,
    {
        self.put_if_absent(key, serde_json::to_value(value)?).await
    }
}

impl<S> StoreExt for S where S: VenueStore + ?Sized {}
