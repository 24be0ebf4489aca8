//! Storage layer for run records and execution metrics.
//!
//! Collections are registered on a [`Store`] by a [`DbStore`] backend and looked up by
//! the record type they hold. `MemStore` is the in-memory backend.

pub mod data;
mod db;
mod store;

use strum::{AsRefStr, EnumIter};

use crate::Result;

pub use data::{RunState, RunStatus};
pub use db::MemStore;
pub use store::Store;

/// Identifiers for different storage collections.
#[derive(Debug, Clone, AsRefStr, PartialEq, Hash, Eq, EnumIter)]
pub enum StoreIden {
    /// Run status records.
    #[strum(serialize = "runs")]
    Runs,
    /// Aggregated metrics per edge direction.
    #[strum(serialize = "edge_metrics")]
    EdgeMetrics,
    /// Aggregated verification metrics per node.
    #[strum(serialize = "node_metrics")]
    NodeMetrics,
    /// Raw action execution log.
    #[strum(serialize = "actions")]
    Actions,
}

/// Trait for types that can identify their storage collection.
pub trait DbCollectionIden {
    /// Returns the collection identifier for this type.
    fn iden() -> StoreIden;
}

/// Trait for database collection operations.
pub trait DbCollection: Send + Sync {
    /// The type of items stored in this collection.
    type Item;

    /// Checks if a record with the given ID exists.
    fn exists(
        &self,
        id: &str,
    ) -> Result<bool>;

    /// Finds a record by ID.
    fn find(
        &self,
        id: &str,
    ) -> Result<Self::Item>;

    /// All records in insertion order.
    fn list(&self) -> Result<Vec<Self::Item>>;

    /// Creates a new record.
    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool>;

    /// Updates an existing record.
    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool>;

    /// Creates or replaces a record.
    fn upsert(
        &self,
        data: &Self::Item,
    ) -> Result<bool>;

    /// Deletes a record by ID.
    fn delete(
        &self,
        id: &str,
    ) -> Result<bool>;
}

/// Trait for database store initialization.
pub trait DbStore {
    /// Initializes the database and registers collections with the store.
    fn init(
        &self,
        s: &Store,
    );
}
