//! In-memory storage backend.
//!
//! Each resource maps to an immutable snapshot (`Arc<Vec<Item>>`). Readers
//! clone the `Arc` and release the shard lock immediately; writers build the
//! next snapshot under the [`DashMap`] entry guard and swap it in, so a
//! collection is only ever observed whole.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use reststack_model::types::{Document, Item};

use super::{Queries, StorageResult, collection};
use crate::filter::Filter;

/// In-memory implementation of [`Queries`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<String, Arc<Vec<Item>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every collection (for testing).
    pub fn reset(&self) {
        self.collections.clear();
    }

    fn snapshot(&self, resource: &str) -> Arc<Vec<Item>> {
        Arc::clone(
            self.collections
                .entry(resource.to_owned())
                .or_default()
                .value(),
        )
    }

    /// Apply `op` to a copy of the collection and publish it on success.
    fn write<T>(
        &self,
        resource: &str,
        op: impl FnOnce(&mut Vec<Item>) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut entry = self.collections.entry(resource.to_owned()).or_default();
        let mut next: Vec<Item> = (**entry).clone();
        let out = op(&mut next)?;
        *entry = Arc::new(next);
        Ok(out)
    }
}

#[async_trait]
impl Queries for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get_all(&self, resource: &str, filter: Option<&Filter>) -> StorageResult<Vec<Item>> {
        Ok(collection::select(&self.snapshot(resource), filter))
    }

    async fn get_by_id(&self, resource: &str, id: &str) -> StorageResult<Option<Item>> {
        Ok(collection::find(&self.snapshot(resource), id))
    }

    async fn create(
        &self,
        resource: &str,
        id: Option<&str>,
        fields: Document,
    ) -> StorageResult<Item> {
        self.write(resource, |items| collection::insert(items, id, fields))
    }

    async fn update(&self, resource: &str, item: Item) -> StorageResult<Item> {
        self.write(resource, |items| collection::merge(items, item))
    }

    async fn replace(&self, resource: &str, item: Item) -> StorageResult<Item> {
        self.write(resource, |items| collection::replace(items, item))
    }

    async fn delete_by_id(&self, resource: &str, id: &str) -> StorageResult<()> {
        self.write(resource, |items| {
            collection::remove(items, id);
            Ok(())
        })
    }

    async fn delete_all(&self, resource: &str) -> StorageResult<()> {
        self.collections.insert(resource.to_owned(), Arc::new(Vec::new()));
        Ok(())
    }

    async fn delete_by_filter(&self, resource: &str, filter: &Filter) -> StorageResult<()> {
        let removed = self.write(resource, |items| Ok(collection::remove_matching(items, filter)))?;
        debug!(resource, removed, "deleted filtered items");
        Ok(())
    }
}
