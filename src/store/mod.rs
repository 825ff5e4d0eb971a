//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait is the only persistence surface the
//! knowledge-base manager and the retrieval tool touch. Two backends ship:
//!
//! | Backend | Config | Notes |
//! |---------|--------|-------|
//! | [`InMemoryIndex`] | `index.backend = "memory"` | tests, throwaway sessions |
//! | [`SqliteIndex`] | `index.backend = "sqlite"` | `index_entries` table, f32 BLOBs |
//!
//! Both rank by brute-force cosine distance. Implementations must be
//! `Send + Sync` to be shared across tasks.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryIndex;
pub use sqlite::SqliteIndex;

use async_trait::async_trait;

use crate::error::KbResult;
use crate::models::{ChunkMetadata, IndexEntry, QueryHit};

/// Predicate over entry metadata for [`VectorIndex::delete_where`] and
/// [`VectorIndex::get_where`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataFilter {
    All,
    DocumentHash(String),
    DisplayName(String),
}

impl MetadataFilter {
    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        match self {
            MetadataFilter::All => true,
            MetadataFilter::DocumentHash(hash) => metadata.document_hash == *hash,
            MetadataFilter::DisplayName(name) => metadata.display_name == *name,
        }
    }
}

/// Persistent store of chunk vectors with similarity search.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert`](VectorIndex::upsert) | Insert or replace entries by id, all-or-nothing |
/// | [`delete_where`](VectorIndex::delete_where) | Remove every matching entry |
/// | [`query`](VectorIndex::query) | k nearest entries by cosine distance |
/// | [`get_where`](VectorIndex::get_where) | Matching entries, ordered by (hash, chunk index) |
/// | [`count`](VectorIndex::count) | Total entry count |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace entries. Either every entry is written or none is.
    async fn upsert(&self, entries: &[IndexEntry]) -> KbResult<()>;

    /// Remove every entry matching `filter`, returning how many were removed.
    async fn delete_where(&self, filter: &MetadataFilter) -> KbResult<usize>;

    /// Return the `k` entries nearest to `vector`, ascending by distance.
    ///
    /// Ties are broken by entry id. An empty index yields an empty result.
    async fn query(&self, vector: &[f32], k: usize) -> KbResult<Vec<QueryHit>>;

    async fn get_where(&self, filter: &MetadataFilter) -> KbResult<Vec<IndexEntry>>;

    async fn count(&self) -> KbResult<usize>;
}

/// Sort hits nearest-first with id tiebreak and keep the first `k`.
pub(crate) fn rank_hits(mut hits: Vec<QueryHit>, k: usize) -> Vec<QueryHit> {
    hits.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.id.cmp(&b.id))
    });
    hits.truncate(k);
    hits
}

/// Order entries by (document hash, chunk index).
pub(crate) fn sort_entries(entries: &mut [IndexEntry]) {
    entries.sort_by(|a, b| {
        a.metadata
            .document_hash
            .cmp(&b.metadata.document_hash)
            .then(a.metadata.chunk_index.cmp(&b.metadata.chunk_index))
    });
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matches() {
        let meta = ChunkMetadata {
            document_hash: "abc".to_string(),
            chunk_index: 0,
            display_name: "koalas.txt".to_string(),
        };
        assert!(MetadataFilter::All.matches(&meta));
        assert!(MetadataFilter::DocumentHash("abc".to_string()).matches(&meta));
        assert!(!MetadataFilter::DocumentHash("abd".to_string()).matches(&meta));
        assert!(MetadataFilter::DisplayName("koalas.txt".to_string()).matches(&meta));
        assert!(!MetadataFilter::DisplayName("lions.txt".to_string()).matches(&meta));
    }

    fn hit(id: &str, distance: f32) -> QueryHit {
        QueryHit {
            id: id.to_string(),
            text: String::new(),
            metadata: ChunkMetadata {
                document_hash: "abc".to_string(),
                chunk_index: 0,
                display_name: String::new(),
            },
            distance,
        }
    }

    #[test]
    fn test_rank_hits_orders_non_finite_distances() {
        let hits = vec![
            hit("e", f32::NAN),
            hit("d", 0.5),
            hit("c", f32::INFINITY),
            hit("b", 0.1),
            hit("a", f32::NAN),
            hit("f", 0.5),
        ];

        let ranked = rank_hits(hits, 6);
        let ids: Vec<&str> = ranked.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "f", "c", "a", "e"]);

        assert_eq!(rank_hits(ranked, 2).len(), 2);
    }
}
