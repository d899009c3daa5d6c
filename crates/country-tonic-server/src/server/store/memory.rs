//! In-process store used by the test suite.
//!
//! Mirrors the MongoDB contract closely enough for the handler and lifecycle
//! tests: each insert yields a fresh `ObjectId` and a disconnected store
//! rejects further writes.

use super::CountryStore;
use anyhow::bail;
use core::time::Duration;
use country_tonic_core::{
    bson::{self, Bson, Document, oid::ObjectId},
    types::CountryRecord,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// In-process [`CountryStore`] that keeps inserted documents in a `Vec`.
///
/// Identifiers are fresh [`ObjectId`]s, the same kind MongoDB generates. The
/// store can be told to fail inserts, to report a different identifier or to
/// hold each insert for a while, which lets callers exercise the failure and
/// shutdown paths without a database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<Vec<Document>>,
    fail_inserts: AtomicBool,
    disconnected: AtomicBool,
    reported_id: Mutex<Option<Bson>>,
    insert_delay: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds every insert for `delay` before it is applied.
    pub fn with_insert_delay(mut self, delay: Duration) -> Self {
        self.insert_delay = Some(delay);
        self
    }

    /// Makes subsequent inserts fail (or succeed again).
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::Relaxed);
    }

    /// Reports `id` as the generated identifier instead of the real one. The
    /// document itself is still stored under a fresh `ObjectId`.
    pub fn report_id(&self, id: Bson) {
        *self.reported_id.lock() = Some(id);
    }

    /// Snapshot of every stored document, in insertion order.
    pub fn documents(&self) -> Vec<Document> {
        self.documents.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::Acquire)
    }
}

#[tonic::async_trait]
impl CountryStore for MemoryStore {
    async fn insert_one(&self, record: CountryRecord) -> anyhow::Result<Bson> {
        if let Some(delay) = self.insert_delay {
            tokio::time::sleep(delay).await;
        }

        if self.is_disconnected() {
            bail!("client has been shut down");
        }
        if self.fail_inserts.load(Ordering::Relaxed) {
            bail!("write error: store unavailable");
        }

        let oid = ObjectId::new();
        let mut document = bson::to_document(&record)?;
        document.insert("_id", oid);
        self.documents.lock().push(document);

        let reported = self.reported_id.lock().clone();
        Ok(reported.unwrap_or(Bson::ObjectId(oid)))
    }

    async fn disconnect(&self) -> anyhow::Result<()> {
        if self.disconnected.swap(true, Ordering::AcqRel) {
            bail!("already disconnected");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: &str) -> CountryRecord {
        CountryRecord {
            code: code.to_string(),
            ..CountryRecord::default()
        }
    }

    #[tokio::test]
    async fn insert_assigns_object_id() {
        let store = MemoryStore::new();
        let id = store.insert_one(record("FR")).await.unwrap();

        let Bson::ObjectId(oid) = id else {
            panic!("expected an ObjectId, got {id:?}");
        };
        let documents = store.documents();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].get_object_id("_id").unwrap(), oid);
        assert_eq!(documents[0].get_str("code").unwrap(), "FR");
    }

    #[tokio::test]
    async fn failing_store_keeps_nothing() {
        let store = MemoryStore::new();
        store.fail_inserts(true);
        assert!(store.insert_one(record("FR")).await.is_err());
        assert!(store.is_empty());

        store.fail_inserts(false);
        assert!(store.insert_one(record("FR")).await.is_ok());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn disconnect_rejects_later_inserts() {
        let store = MemoryStore::new();
        store.disconnect().await.unwrap();
        assert!(store.is_disconnected());
        assert!(store.insert_one(record("FR")).await.is_err());
        assert!(store.disconnect().await.is_err());
    }
}
