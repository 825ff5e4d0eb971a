//! CLI command runners.
//!
//! Each `run_*` function backs one `ragchat` subcommand: it calls into the
//! [`AppContext`] components and prints human-readable output to stdout.
//! Lookups that find nothing surface here as [`KbError::NotFound`].

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::context::AppContext;
use crate::error::KbError;
use crate::stats::short_hash;

/// Index a text file, retaining a copy in `knowledge.dir` when configured.
///
/// The copy is written only after indexing succeeds. A retained name acts as
/// a slot: documents previously stored under it are removed once the new
/// content replaces the file.
pub async fn run_add(ctx: &AppContext, file: &Path, name: Option<String>) -> Result<()> {
    let name = match name {
        Some(n) => n,
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow::anyhow!("Cannot derive a name from {}", file.display()))?,
    };

    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let retain_dir = ctx.config.knowledge.dir.as_deref();
    if retain_dir.is_some() {
        check_retainable(&name)?;
    }

    let outcome = ctx.knowledge.add_bytes(&bytes, Some(&name)).await?;

    let mut replaced = 0;
    if let Some(dir) = retain_dir {
        let previous = ctx.knowledge.find_by_name(&name).await?;

        if let Err(err) = retain_original(dir, &name, &bytes) {
            if !outcome.was_duplicate {
                ctx.knowledge.delete(&outcome.doc_hash).await?;
            }
            return Err(err);
        }
        tracing::debug!(dir = %dir.display(), name = %name, "retained original");

        for hash in previous.iter().filter(|h| **h != outcome.doc_hash) {
            if ctx.knowledge.delete(hash).await? {
                tracing::info!(doc_hash = %hash, name = %name, "replaced document retained under the same name");
                replaced += 1;
            }
        }
    }

    if outcome.was_duplicate {
        println!(
            "'{}' has the same content as an existing document ({}); re-indexed {} chunks.",
            name,
            short_hash(&outcome.doc_hash),
            outcome.chunk_count
        );
    } else {
        println!(
            "Added '{}' ({}): {} chunks.",
            name,
            short_hash(&outcome.doc_hash),
            outcome.chunk_count
        );
    }
    if replaced > 0 {
        println!(
            "Replaced {} previous version{} of '{}'.",
            replaced,
            if replaced == 1 { "" } else { "s" },
            name
        );
    }
    Ok(())
}

/// Index every `*.txt` file in `knowledge.dir`.
pub async fn run_sync(ctx: &AppContext) -> Result<()> {
    let dir = ctx
        .config
        .knowledge
        .dir
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("knowledge.dir is not set in config"))?;

    let report = ctx.knowledge.load_directory(dir).await?;
    println!(
        "Synced {}: {} files, {} added, {} unchanged, {} failed.",
        dir.display(),
        report.files,
        report.added,
        report.duplicates,
        report.failed
    );
    Ok(())
}

pub async fn run_list(ctx: &AppContext) -> Result<()> {
    let docs = ctx.knowledge.list_documents().await?;
    if docs.is_empty() {
        println!("No documents indexed.");
        return Ok(());
    }

    for doc in &docs {
        let name = if doc.display_name.is_empty() {
            "(unnamed)"
        } else {
            doc.display_name.as_str()
        };
        println!("{}  {:>5} chunks  {}", doc.doc_hash, doc.chunk_count, name);
    }
    Ok(())
}

/// Delete by content hash, or with `by_name`, every document recorded under a name.
pub async fn run_delete(ctx: &AppContext, target: &str, by_name: bool) -> Result<()> {
    let hashes = if by_name {
        validate_file_name(target)?;
        ctx.knowledge.find_by_name(target).await?
    } else {
        vec![target.to_string()]
    };

    let mut deleted = 0;
    for hash in &hashes {
        if ctx.knowledge.delete(hash).await? {
            deleted += 1;
        }
    }

    let mut file_removed = false;
    if by_name {
        if let Some(dir) = &ctx.config.knowledge.dir {
            let path = dir.join(target);
            if path.is_file() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                file_removed = true;
            }
        }
    }

    if deleted == 0 && !file_removed {
        return Err(KbError::not_found(format!("document '{}'", target)).into());
    }

    println!("Deleted '{}' ({} document{}).", target, deleted, if deleted == 1 { "" } else { "s" });
    Ok(())
}

pub async fn run_search(ctx: &AppContext, query: &str, k: Option<usize>) -> Result<()> {
    let hits = ctx.retrieval.search(query, k).await?;
    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let preview: String = hit.text.chars().take(160).collect();
        println!(
            "{}. [{:.4}] {} #{}",
            i + 1,
            hit.distance,
            hit.metadata.source(),
            hit.metadata.chunk_index
        );
        println!("   {}", preview.replace('\n', " "));
    }
    Ok(())
}

pub async fn run_retrieve(ctx: &AppContext, question: &str, k: Option<usize>) -> Result<()> {
    let context = ctx.retrieval.retrieve(question, k).await?;
    println!("{}", context);
    Ok(())
}

pub fn run_route(ctx: &AppContext, question: &str) -> Result<()> {
    let decision = ctx.router.route(question);
    println!("{}", serde_json::to_string(&serde_json::json!({
        "needs_retrieval": decision.needs_retrieval,
        "agent": decision.agent(),
    }))?);
    Ok(())
}

pub async fn run_chat_sessions(ctx: &AppContext) -> Result<()> {
    let sessions = ctx.chat.list_sessions().await?;
    if sessions.is_empty() {
        println!("No chat sessions.");
        return Ok(());
    }
    for session in &sessions {
        println!("{:>6}  {}", session.id, session.created_at);
    }
    Ok(())
}

pub async fn run_chat_history(ctx: &AppContext, session_id: i64) -> Result<()> {
    let messages = ctx.chat.get_messages(session_id).await?;
    if messages.is_empty() {
        let known = ctx
            .chat
            .list_sessions()
            .await?
            .iter()
            .any(|s| s.id == session_id);
        if !known {
            return Err(KbError::not_found(format!("chat session {}", session_id)).into());
        }
        println!("(no messages)");
        return Ok(());
    }
    for message in &messages {
        println!("[{}] {}", message.role.as_str(), message.content);
    }
    Ok(())
}

pub async fn run_chat_delete(ctx: &AppContext, session_id: i64) -> Result<()> {
    if !ctx.chat.delete_session(session_id).await? {
        return Err(KbError::not_found(format!("chat session {}", session_id)).into());
    }
    println!("Deleted chat session {}.", session_id);
    Ok(())
}

/// Reject names that could escape the knowledge directory.
fn validate_file_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
        bail!("Invalid document name: '{}'", name);
    }
    Ok(())
}

/// Names stored in the knowledge directory must be plain `.txt` file names.
fn check_retainable(name: &str) -> Result<()> {
    validate_file_name(name)?;
    if !name.to_ascii_lowercase().ends_with(".txt") {
        bail!("Only .txt documents can be retained in the knowledge directory: '{}'", name);
    }
    Ok(())
}

/// Write `bytes` to `dir/name`, creating the directory if needed.
fn retain_original(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    check_retainable(name)?;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create knowledge directory: {}", dir.display()))?;
    let path = dir.join(name);
    std::fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_file_name() {
        assert!(validate_file_name("koalas.txt").is_ok());
        assert!(validate_file_name("../etc/passwd").is_err());
        assert!(validate_file_name("a/b.txt").is_err());
        assert!(validate_file_name("a\\b.txt").is_err());
        assert!(validate_file_name("").is_err());
    }

    #[test]
    fn test_retain_original() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("knowledge");
        let path = retain_original(&dir, "koalas.txt", b"Koalas sleep.").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "Koalas sleep.");
        assert!(retain_original(&dir, "notes.md", b"x").is_err());
    }
}
