use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use serde_json::Value;

use super::{Result, VenueStore};

/// An in-memory venue store, used by the engine tests and suitable for
/// single-node deployments without a database
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

struct Entry {
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn new(value: Value, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { value, expires_at }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.map(|at| at <= Utc::now()).unwrap_or(false)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VenueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self
            .entries
            .get(key)
            .filter(|e| !e.is_expired())
            .map(|e| e.value.clone()))
    }

    async fn put(&self, key: &str, value: Value, expires_at: Option<DateTime<Utc>>) -> Result<()> {
        self.entries
            .insert(key.to_string(), Entry::new(value, expires_at));

        Ok(())
    }

    async fn put_if_absent(&self, key: &str, value: Value) -> Result<bool> {
        match self.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    occupied.insert(Entry::new(value, None));
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry::new(value, None));
                Ok(true)
            }
        }
    }

    async fn incr(&self, key: &str, by: i64) -> Result<i64> {
        match self.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                let current = if occupied.get().is_expired() {
                    0
                } else {
                    occupied.get().value.as_i64().unwrap_or(0)
                };

                let next = current + by;
                occupied.insert(Entry::new(next.into(), None));

                Ok(next)
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry::new(by.into(), None));
                Ok(by)
            }
        }
    }

    async fn incr_field(&self, key: &str, field: &str, by: i64) -> Result<Option<i64>> {
        let Some(mut entry) = self.entries.get_mut(key) else {
            return Ok(None);
        };

        if entry.is_expired() {
            return Ok(None);
        }

        let Some(object) = entry.value.as_object_mut() else {
            return Ok(None);
        };

        let current = object.get(field).and_then(Value::as_i64).unwrap_or(0);
        let next = current + by;

        object.insert(field.to_string(), next.into());

        Ok(Some(next))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Value)>> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix) && !e.is_expired())
            .map(|e| (e.key().clone(), e.value.clone()))
            .collect())
    }
}

#[cfg(test)]
mod test {
    use chrono::Duration;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryStore::new();

        store.put("a", json!({"x": 1}), None).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(json!({"x": 1})));

        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expiry_is_lazy() {
        let store = MemoryStore::new();

        store
            .put("gone", json!(true), Some(Utc::now() - Duration::seconds(1)))
            .await
            .unwrap();
        store
            .put("kept", json!(true), Some(Utc::now() + Duration::hours(1)))
            .await
            .unwrap();

        assert_eq!(store.get("gone").await.unwrap(), None);
        assert_eq!(store.get("kept").await.unwrap(), Some(json!(true)));

        // An expired entry no longer blocks put_if_absent
        assert!(store.put_if_absent("gone", json!(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_put_if_absent() {
        let store = MemoryStore::new();

        assert!(store.put_if_absent("once", json!(1)).await.unwrap());
        assert!(!store.put_if_absent("once", json!(2)).await.unwrap());
        assert_eq!(store.get("once").await.unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_incr() {
        let store = MemoryStore::new();

        assert_eq!(store.incr("n", 1).await.unwrap(), 1);
        assert_eq!(store.incr("n", 1).await.unwrap(), 2);
        assert_eq!(store.incr("n", 3).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_incr_field() {
        let store = MemoryStore::new();

        store
            .put("song", json!({"title": "x", "hype": 2}), None)
            .await
            .unwrap();

        assert_eq!(store.incr_field("song", "hype", 1).await.unwrap(), Some(3));
        assert_eq!(
            store.get("song").await.unwrap().unwrap()["hype"],
            json!(3)
        );

        assert_eq!(store.incr_field("missing", "hype", 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_scan_prefix() {
        let store = MemoryStore::new();

        store.put("queue:v:1", json!(1), None).await.unwrap();
        store.put("queue:v:2", json!(2), None).await.unwrap();
        store.put("queue:w:1", json!(3), None).await.unwrap();

        let mut keys: Vec<_> = store
            .scan_prefix("queue:v:")
            .await
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        keys.sort();

        assert_eq!(keys, vec!["queue:v:1", "queue:v:2"]);
    }
}
