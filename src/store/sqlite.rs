//! SQLite-backed [`VectorIndex`] implementation.
//!
//! Entries live in the `index_entries` table created by
//! [`run_migrations`](crate::migrate::run_migrations). Vectors are stored as
//! little-endian `f32` BLOBs and ranked with a brute-force cosine scan.
//! Every operation is bounded by a timeout; hitting it is a retryable
//! [`KbError::IndexFailure`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use crate::error::{KbError, KbResult};
use crate::models::{ChunkMetadata, IndexEntry, QueryHit};

use super::{rank_hits, MetadataFilter, VectorIndex};

pub struct SqliteIndex {
    pool: SqlitePool,
    timeout: Duration,
}

impl SqliteIndex {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn bounded<T, F>(&self, op: &str, fut: F) -> KbResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(KbError::from),
            Err(_) => Err(KbError::index_retryable(format!(
                "index {} timed out after {:?}",
                op, self.timeout
            ))),
        }
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &MetadataFilter) {
    match filter {
        MetadataFilter::All => {}
        MetadataFilter::DocumentHash(hash) => {
            builder.push(" WHERE document_hash = ");
            builder.push_bind(hash.clone());
        }
        MetadataFilter::DisplayName(name) => {
            builder.push(" WHERE display_name = ");
            builder.push_bind(name.clone());
        }
    }
}

fn row_to_entry(row: &SqliteRow) -> IndexEntry {
    let blob: Vec<u8> = row.get("embedding");
    IndexEntry {
        id: row.get("id"),
        vector: blob_to_vec(&blob),
        text: row.get("text"),
        metadata: ChunkMetadata {
            document_hash: row.get("document_hash"),
            chunk_index: row.get("chunk_index"),
            display_name: row.get("display_name"),
        },
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn upsert(&self, entries: &[IndexEntry]) -> KbResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        self.bounded("upsert", async {
            let mut tx = self.pool.begin().await?;

            for entry in entries {
                sqlx::query(
                    r#"
                    INSERT INTO index_entries (id, document_hash, chunk_index, display_name, text, embedding)
                    VALUES (?, ?, ?, ?, ?, ?)
                    ON CONFLICT(id) DO UPDATE SET
                        document_hash = excluded.document_hash,
                        chunk_index = excluded.chunk_index,
                        display_name = excluded.display_name,
                        text = excluded.text,
                        embedding = excluded.embedding
                    "#,
                )
                .bind(&entry.id)
                .bind(&entry.metadata.document_hash)
                .bind(entry.metadata.chunk_index)
                .bind(&entry.metadata.display_name)
                .bind(&entry.text)
                .bind(vec_to_blob(&entry.vector))
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await
        })
        .await
    }

    async fn delete_where(&self, filter: &MetadataFilter) -> KbResult<usize> {
        let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM index_entries");
        push_filter(&mut builder, filter);

        let result = self
            .bounded("delete", builder.build().execute(&self.pool))
            .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn query(&self, vector: &[f32], k: usize) -> KbResult<Vec<QueryHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = self
            .bounded(
                "query",
                sqlx::query(
                    "SELECT id, document_hash, chunk_index, display_name, text, embedding FROM index_entries",
                )
                .fetch_all(&self.pool),
            )
            .await?;

        let hits = rows
            .iter()
            .map(|row| {
                let entry = row_to_entry(row);
                QueryHit {
                    distance: cosine_distance(vector, &entry.vector),
                    id: entry.id,
                    text: entry.text,
                    metadata: entry.metadata,
                }
            })
            .collect();

        Ok(rank_hits(hits, k))
    }

    async fn get_where(&self, filter: &MetadataFilter) -> KbResult<Vec<IndexEntry>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, document_hash, chunk_index, display_name, text, embedding FROM index_entries",
        );
        push_filter(&mut builder, filter);
        builder.push(" ORDER BY document_hash ASC, chunk_index ASC");

        let rows = self
            .bounded("get", builder.build().fetch_all(&self.pool))
            .await?;
        Ok(rows.iter().map(row_to_entry).collect())
    }

    async fn count(&self) -> KbResult<usize> {
        let count: i64 = self
            .bounded(
                "count",
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM index_entries")
                    .fetch_one(&self.pool),
            )
            .await?;
        Ok(count as usize)
    }
}
