//! Chat history persistence.
//!
//! Sessions own an ordered list of messages. Order is the insertion
//! sequence (`messages.id`), never wall-clock time, so two messages written
//! in the same millisecond still come back in the order they were added.
//! Writing a message to an unknown session id creates that session.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::models::{Message, Role, Session};

#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Create a new empty session and return its id.
    async fn create_session(&self) -> Result<i64>;

    /// Append a message, creating the session if it does not exist.
    async fn add_message(&self, session_id: i64, role: Role, content: &str) -> Result<()>;

    /// Messages of a session in insertion order. Unknown ids yield an empty list.
    async fn get_messages(&self, session_id: i64) -> Result<Vec<Message>>;

    /// All sessions, newest first.
    async fn list_sessions(&self) -> Result<Vec<Session>>;

    /// Delete a session and its messages. Returns whether anything existed.
    async fn delete_session(&self, session_id: i64) -> Result<bool>;
}

pub struct SqliteChatStore {
    pool: SqlitePool,
}

impl SqliteChatStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[async_trait]
impl ChatStore for SqliteChatStore {
    async fn create_session(&self) -> Result<i64> {
        let result = sqlx::query("INSERT INTO sessions (created_at) VALUES (?)")
            .bind(now_iso())
            .execute(&self.pool)
            .await?;

        let id = result.last_insert_rowid();
        tracing::debug!(session_id = id, "created chat session");
        Ok(id)
    }

    async fn add_message(&self, session_id: i64, role: Role, content: &str) -> Result<()> {
        let now = now_iso();
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT OR IGNORE INTO sessions (id, created_at) VALUES (?, ?)")
            .bind(session_id)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO messages (session_id, role, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(role.as_str())
        .bind(content)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_messages(&self, session_id: i64) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT role, content FROM messages WHERE session_id = ? ORDER BY id ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let role: String = row.get("role");
                let role = Role::parse(&role)
                    .ok_or_else(|| anyhow::anyhow!("unknown message role in database: {}", role))?;
                Ok(Message {
                    role,
                    content: row.get("content"),
                })
            })
            .collect()
    }

    async fn list_sessions(&self) -> Result<Vec<Session>> {
        let rows = sqlx::query("SELECT id, created_at FROM sessions ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| Session {
                id: row.get("id"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn delete_session(&self, session_id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let messages = sqlx::query("DELETE FROM messages WHERE session_id = ?")
            .bind(session_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let sessions = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(session_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        if messages + sessions > 0 {
            tracing::info!(session_id, messages, "deleted chat session");
        }
        Ok(messages + sessions > 0)
    }
}
