//! In-memory [`VectorIndex`] implementation for tests and throwaway sessions.
//!
//! Entries live in a `BTreeMap` keyed by id behind `std::sync::RwLock`.
//! Query is brute-force cosine distance over every stored vector.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::embedding::cosine_distance;
use crate::error::{KbError, KbResult};
use crate::models::{IndexEntry, QueryHit};

use super::{rank_hits, sort_entries, MetadataFilter, VectorIndex};

pub struct InMemoryIndex {
    entries: RwLock<BTreeMap<String, IndexEntry>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    fn read(&self) -> KbResult<RwLockReadGuard<'_, BTreeMap<String, IndexEntry>>> {
        self.entries
            .read()
            .map_err(|_| KbError::index("in-memory index lock poisoned"))
    }

    fn write(&self) -> KbResult<RwLockWriteGuard<'_, BTreeMap<String, IndexEntry>>> {
        self.entries
            .write()
            .map_err(|_| KbError::index("in-memory index lock poisoned"))
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, entries: &[IndexEntry]) -> KbResult<()> {
        let mut stored = self.write()?;
        for entry in entries {
            stored.insert(entry.id.clone(), entry.clone());
        }
        Ok(())
    }

    async fn delete_where(&self, filter: &MetadataFilter) -> KbResult<usize> {
        let mut stored = self.write()?;
        let before = stored.len();
        stored.retain(|_, entry| !filter.matches(&entry.metadata));
        Ok(before - stored.len())
    }

    async fn query(&self, vector: &[f32], k: usize) -> KbResult<Vec<QueryHit>> {
        let stored = self.read()?;
        let hits = stored
            .values()
            .map(|entry| QueryHit {
                id: entry.id.clone(),
                text: entry.text.clone(),
                metadata: entry.metadata.clone(),
                distance: cosine_distance(vector, &entry.vector),
            })
            .collect();
        Ok(rank_hits(hits, k))
    }

    async fn get_where(&self, filter: &MetadataFilter) -> KbResult<Vec<IndexEntry>> {
        let stored = self.read()?;
        let mut entries: Vec<IndexEntry> = stored
            .values()
            .filter(|entry| filter.matches(&entry.metadata))
            .cloned()
            .collect();
        sort_entries(&mut entries);
        Ok(entries)
    }

    async fn count(&self) -> KbResult<usize> {
        Ok(self.read()?.len())
    }
}
