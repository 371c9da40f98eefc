//! Per-device survey record aggregation.
//!
//! Each device has one JSON-encoded list under `rover_<deviceId>`, newest
//! record first and unique by plot id. A merge is a single read followed by
//! a single write with no compare-and-swap, so two merges for the same
//! device racing each other can lose one update.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::StoreError;

/// Named sensor fields of one reading.
pub type Details = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyRecord {
    pub plot_id: String,
    #[serde(default)]
    pub details: Details,
}

/// String key-value collaborator holding the encoded record lists.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }
}

pub struct SurveyStore<S: KeyValueStore> {
    backend: S,
}

impl<S: KeyValueStore> SurveyStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn key(device_id: &str) -> String {
        format!("rover_{}", device_id)
    }

    /// Put `{plot_id, details}` at the head of the device's list, dropping
    /// any older record for the same plot. Unrelated records keep their
    /// order. The list is never trimmed.
    pub fn merge(
        &self,
        device_id: &str,
        plot_id: &str,
        details: Details,
    ) -> Result<(), StoreError> {
        let key = Self::key(device_id);
        let existing = self.decode(&key)?.unwrap_or_default();

        let mut records = Vec::with_capacity(existing.len() + 1);
        records.push(SurveyRecord {
            plot_id: plot_id.to_string(),
            details,
        });
        records.extend(existing.into_iter().filter(|r| r.plot_id != plot_id));

        debug!("Storing {} records under {}", records.len(), key);
        self.backend.set(&key, serde_json::to_string(&records)?);
        Ok(())
    }

    pub fn read(&self, device_id: &str) -> Result<Option<Vec<SurveyRecord>>, StoreError> {
        self.decode(&Self::key(device_id))
    }

    fn decode(&self, key: &str) -> Result<Option<Vec<SurveyRecord>>, StoreError> {
        self.backend
            .get(key)
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|source| StoreError::Decode {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn details(value: serde_json::Value) -> Details {
        value.as_object().cloned().unwrap()
    }

    fn plot_ids(records: &[SurveyRecord]) -> Vec<&str> {
        records.iter().map(|r| r.plot_id.as_str()).collect()
    }

    #[test]
    fn test_read_absent_device() {
        let store = SurveyStore::new(MemoryStore::new());
        assert_eq!(store.read("255").unwrap(), None);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let store = SurveyStore::new(MemoryStore::new());
        let v = details(json!({"soil_pH": 6.8}));
        store.merge("255", "P", v.clone()).unwrap();
        store.merge("255", "P", v.clone()).unwrap();

        let records = store.read("255").unwrap().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].details, v);
    }

    #[test]
    fn test_merge_keeps_unrelated_newest_first() {
        let store = SurveyStore::new(MemoryStore::new());
        let v1 = details(json!({"n": 1}));
        let v2 = details(json!({"n": 2}));
        store.merge("255", "A", v1.clone()).unwrap();
        store.merge("255", "B", v2.clone()).unwrap();

        let records = store.read("255").unwrap().unwrap();
        assert_eq!(
            records,
            vec![
                SurveyRecord { plot_id: "B".into(), details: v2 },
                SurveyRecord { plot_id: "A".into(), details: v1 },
            ]
        );
    }

    #[test]
    fn test_last_write_wins_and_moves_to_front() {
        let store = SurveyStore::new(MemoryStore::new());
        store.merge("1", "A", details(json!({"n": 1}))).unwrap();
        store.merge("1", "B", details(json!({"n": 2}))).unwrap();
        store.merge("1", "C", details(json!({"n": 3}))).unwrap();
        store.merge("1", "A", details(json!({"n": 4}))).unwrap();

        let records = store.read("1").unwrap().unwrap();
        assert_eq!(plot_ids(&records), vec!["A", "C", "B"]);
        assert_eq!(records[0].details["n"], 4);
    }

    #[test]
    fn test_devices_are_independent() {
        let backend = MemoryStore::new();
        let store = SurveyStore::new(backend.clone());
        store.merge("1", "A", Details::new()).unwrap();
        store.merge("2", "B", Details::new()).unwrap();

        assert_eq!(plot_ids(&store.read("1").unwrap().unwrap()), vec!["A"]);
        assert!(backend.get("rover_2").unwrap().contains("\"plot_id\":\"B\""));
    }

    #[test]
    fn test_stale_read_loses_update() {
        // two merges that both read before either writes
        let backend = MemoryStore::new();
        let store = SurveyStore::new(backend.clone());
        store.merge("1", "A", Details::new()).unwrap();

        let stale = backend.get("rover_1").unwrap();
        store.merge("1", "B", Details::new()).unwrap();
        backend.set("rover_1", stale);
        store.merge("1", "C", Details::new()).unwrap();

        let records = store.read("1").unwrap().unwrap();
        assert_eq!(plot_ids(&records), vec!["C", "A"]);
    }

    #[test]
    fn test_corrupt_value_is_reported() {
        let backend = MemoryStore::new();
        backend.set("rover_9", "not json".to_string());
        let store = SurveyStore::new(backend);
        assert!(matches!(
            store.merge("9", "A", Details::new()),
            Err(StoreError::Decode { .. })
        ));
    }
}
