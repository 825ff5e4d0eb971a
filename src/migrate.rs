//! Idempotent schema creation.
//!
//! | Table | Owner |
//! |-------|-------|
//! | `index_entries` | [`SqliteIndex`](crate::store::SqliteIndex) |
//! | `sessions` | [`SqliteChatStore`](crate::chat_store::SqliteChatStore) |
//! | `messages` | [`SqliteChatStore`](crate::chat_store::SqliteChatStore) |

use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Index entries: one row per chunk, vector stored as little-endian f32 BLOB
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS index_entries (
            id TEXT PRIMARY KEY,
            document_hash TEXT NOT NULL,
            chunk_index INTEGER NOT NULL CHECK (chunk_index >= 0),
            display_name TEXT NOT NULL DEFAULT '',
            text TEXT NOT NULL,
            embedding BLOB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_index_entries_hash ON index_entries(document_hash, chunk_index)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_index_entries_name ON index_entries(display_name)",
    )
    .execute(pool)
    .await?;

    // Chat sessions
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Chat messages, ordered by insertion id
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id INTEGER NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
            content TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id, id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
