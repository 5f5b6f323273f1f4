//! Durable seen-set persistence.
//!
//! The seen set is the ledger of listing identities already notified.
//! It is loaded once at run start, mutated in memory, and written back
//! wholesale at the end of the batch.

pub mod local;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::ListingId;

pub use local::LocalSeenStore;

/// In-memory set of already-notified listing identities.
///
/// Identities are only ever added; nothing removes them.
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    ids: HashSet<ListingId>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids(ids: Vec<ListingId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn contains(&self, id: &ListingId) -> bool {
        self.ids.contains(id)
    }

    /// Add an identity; returns false if it was already present.
    pub fn insert(&mut self, id: ListingId) -> bool {
        self.ids.insert(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Identities in a stable order, for deterministic output files.
    pub fn sorted_ids(&self) -> Vec<ListingId> {
        let mut ids: Vec<ListingId> = self.ids.iter().cloned().collect();
        ids.sort();
        ids
    }
}

/// Trait for seen-set storage backends.
#[async_trait]
pub trait SeenStorage: Send + Sync {
    /// Load the seen set. Absent or corrupt storage yields an empty set,
    /// never an error that would abort the run.
    async fn load(&self) -> Result<SeenSet>;

    /// Persist the seen set wholesale.
    async fn persist(&self, seen: &SeenSet) -> Result<()>;
}
