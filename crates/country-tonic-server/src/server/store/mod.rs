//! Persistence seam for the country service.
//!
//! The handler only ever talks to a [`CountryStore`]. The process wires in a
//! [`MongoStore`] at startup; tests use the in-process `MemoryStore`.

#[cfg(test)]
pub mod memory;
pub mod mongo;

#[cfg(test)]
pub use memory::MemoryStore;
pub use mongo::MongoStore;

use country_tonic_core::{bson::Bson, types::CountryRecord};

/// A document store that can insert a single country and hand back the
/// identifier it generated for it.
///
/// Implementations must be safe to share across concurrent calls; the handler
/// holds the store behind an `Arc` and does no locking of its own.
#[tonic::async_trait]
pub trait CountryStore: Send + Sync + 'static {
    /// Inserts `record` as one new document and returns the store-generated
    /// `_id`, as the store reported it.
    async fn insert_one(&self, record: CountryRecord) -> anyhow::Result<Bson>;

    /// Releases the connection. Called once during shutdown.
    async fn disconnect(&self) -> anyhow::Result<()>;
}
