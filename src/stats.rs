//! Knowledge base and chat history overview.
//!
//! Provides a quick summary of what's indexed: document and chunk counts,
//! chat sessions and messages, and a per-document breakdown. Used by
//! `ragchat stats` to confirm that adds and syncs are landing.

use anyhow::Result;

use crate::context::AppContext;

/// Run the stats command: query the index and chat store and print a summary.
pub async fn run_stats(ctx: &AppContext) -> Result<()> {
    let documents = ctx.knowledge.list_documents().await?;
    let total_chunks = ctx.index.count().await?;

    let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
        .fetch_one(ctx.pool())
        .await?;
    let messages: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
        .fetch_one(ctx.pool())
        .await?;

    let db_size = std::fs::metadata(&ctx.config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("RAG Chat — Knowledge Base Stats");
    println!("===============================");
    println!();
    println!("  Database:    {}", ctx.config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!("  Index:       {}", ctx.config.index.backend);
    println!(
        "  Embedder:    {} ({} dims)",
        ctx.embedder.model_name(),
        ctx.embedder.dims()
    );
    println!();
    println!("  Documents:   {}", documents.len());
    println!("  Chunks:      {}", total_chunks);
    println!("  Sessions:    {}", sessions);
    println!("  Messages:    {}", messages);

    if !documents.is_empty() {
        println!();
        println!("  By document:");
        println!("  {:<32} {:>8}   {}", "NAME", "CHUNKS", "HASH");
        println!("  {}", "-".repeat(76));

        for doc in &documents {
            let name = if doc.display_name.is_empty() {
                "(unnamed)"
            } else {
                doc.display_name.as_str()
            };
            println!(
                "  {:<32} {:>8}   {}",
                name,
                doc.chunk_count,
                short_hash(&doc.doc_hash)
            );
        }
    }

    println!();
    Ok(())
}

/// First 12 hex digits of a content hash.
pub fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
