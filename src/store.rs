use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

use crate::config::RawServiceRecord;
use crate::error::PricingError;

/// Change-notification event emitted by the configuration store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigChangeEvent {
    pub event_type: ChangeType,
    pub company_id: String,
    pub service_name: String,
    pub new_record: Option<RawServiceRecord>,
    pub old_record: Option<RawServiceRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Insert,
    Update,
    Delete,
}

/// Opaque key-value configuration store with change notifications.
///
/// The persistence technology behind this trait is out of scope for the
/// pricing core; implementations only need point lookups and a broadcast of
/// change events. Receivers are expected to filter events by identity.
#[async_trait]
pub trait ConfigStore: Send + Sync + 'static {
    /// Point lookup. `Ok(None)` means no record exists for this identity.
    async fn fetch(
        &self,
        company_id: &str,
        service_name: &str,
    ) -> Result<Option<RawServiceRecord>, PricingError>;

    /// Open a change-notification stream. The stream may carry events for
    /// other identities; callers filter.
    async fn subscribe(
        &self,
        company_id: &str,
        service_name: &str,
    ) -> Result<broadcast::Receiver<ConfigChangeEvent>, PricingError>;
}

/// In-process store used by the CLI (JSON fixtures) and tests.
pub struct MemoryStore {
    records: DashMap<String, RawServiceRecord>,
    changes: broadcast::Sender<ConfigChangeEvent>,
    // Simulates an unreachable store (fallback-path testing)
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            records: DashMap::new(),
            changes,
            failing: AtomicBool::new(false),
        }
    }

    /// Load records from a JSON fixture of shape
    /// `{ "company:service": { ...record } }`.
    pub fn from_fixture(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let records: std::collections::HashMap<String, RawServiceRecord> =
            serde_json::from_str(&raw)?;

        let store = Self::new();
        for (key, record) in records {
            store.records.insert(key, record);
        }
        Ok(store)
    }

    fn key(company_id: &str, service_name: &str) -> String {
        format!("{company_id}:{service_name}")
    }

    /// Insert or replace a record, publishing a change event.
    pub fn put(&self, company_id: &str, service_name: &str, record: RawServiceRecord) {
        let old = self
            .records
            .insert(Self::key(company_id, service_name), record.clone());

        let event = ConfigChangeEvent {
            event_type: if old.is_some() {
                ChangeType::Update
            } else {
                ChangeType::Insert
            },
            company_id: company_id.to_string(),
            service_name: service_name.to_string(),
            new_record: Some(record),
            old_record: old,
        };
        // No receivers is fine
        let _ = self.changes.send(event);
    }

    /// Remove a record, publishing a delete event.
    pub fn remove(&self, company_id: &str, service_name: &str) {
        if let Some((_, old)) = self.records.remove(&Self::key(company_id, service_name)) {
            let _ = self.changes.send(ConfigChangeEvent {
                event_type: ChangeType::Delete,
                company_id: company_id.to_string(),
                service_name: service_name.to_string(),
                new_record: None,
                old_record: Some(old),
            });
        }
    }

    /// Make subsequent fetches fail, simulating an unreachable store.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn fetch(
        &self,
        company_id: &str,
        service_name: &str,
    ) -> Result<Option<RawServiceRecord>, PricingError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PricingError::StoreUnavailable(
                "memory store marked unreachable".to_string(),
            ));
        }
        Ok(self
            .records
            .get(&Self::key(company_id, service_name))
            .map(|entry| entry.value().clone()))
    }

    async fn subscribe(
        &self,
        _company_id: &str,
        _service_name: &str,
    ) -> Result<broadcast::Receiver<ConfigChangeEvent>, PricingError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PricingError::StoreUnavailable(
                "memory store marked unreachable".to_string(),
            ));
        }
        Ok(self.changes.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_round_trip() {
        let store = MemoryStore::new();
        store.put(
            "acme",
            "paverPatio",
            RawServiceRecord {
                hourly_labor_rate: Some(30.0),
                ..Default::default()
            },
        );

        let record = store.fetch("acme", "paverPatio").await.unwrap().unwrap();
        assert_eq!(record.hourly_labor_rate, Some(30.0));

        let missing = store.fetch("acme", "excavation").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_put_publishes_change_events() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe("acme", "paverPatio").await.unwrap();

        store.put("acme", "paverPatio", RawServiceRecord::default());
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, ChangeType::Insert);
        assert_eq!(event.company_id, "acme");

        store.put("acme", "paverPatio", RawServiceRecord::default());
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, ChangeType::Update);
        assert!(event.old_record.is_some());

        store.remove("acme", "paverPatio");
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, ChangeType::Delete);
    }

    #[tokio::test]
    async fn test_failing_store_errors() {
        let store = MemoryStore::new();
        store.set_failing(true);

        assert!(store.fetch("acme", "paverPatio").await.is_err());
        assert!(store.subscribe("acme", "paverPatio").await.is_err());

        store.set_failing(false);
        assert!(store.fetch("acme", "paverPatio").await.is_ok());
    }
}
