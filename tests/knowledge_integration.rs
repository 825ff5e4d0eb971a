//! In-process tests of the knowledge base, retrieval tool, router, and chat
//! store wired together through `AppContext` on a real SQLite file.

use std::sync::Arc;

use rag_chat::config::Config;
use rag_chat::context::AppContext;
use rag_chat::models::Role;
use rag_chat::retrieval::NO_RESULTS_MESSAGE;
use rag_chat::store::MetadataFilter;
use serde_json::json;
use tempfile::TempDir;

async fn open_context(tmp: &TempDir) -> AppContext {
    let mut config = Config::minimal(tmp.path().join("data/ragchat.sqlite"));
    config.chunking.chunk_size = 120;
    config.chunking.chunk_overlap = 20;
    config.embedding.provider = "hash".to_string();
    config.embedding.dims = Some(128);
    config.validate().unwrap();
    AppContext::open(config).await.unwrap()
}

fn long_text(topic: &str, n: usize) -> String {
    (0..n)
        .map(|i| format!("Fact {} about {}: they are remarkable animals.", i, topic))
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test]
async fn test_full_question_flow() {
    let tmp = TempDir::new().unwrap();
    let ctx = open_context(&tmp).await;

    let question = "Tell me about koalas";
    assert!(ctx.router.route(question).needs_retrieval);
    assert!(!ctx.router.route("What is 2+2?").needs_retrieval);

    let (tools, tool_ctx) = ctx.tools();
    let tool = tools.find("retrieve_from_knowledge_base").unwrap();

    let empty = tool
        .execute(json!({ "question": question }), &tool_ctx)
        .await
        .unwrap();
    assert_eq!(empty["context"], NO_RESULTS_MESSAGE);

    ctx.knowledge
        .add_or_replace(&long_text("koalas", 6), Some("koalas.txt"))
        .await
        .unwrap();
    ctx.knowledge
        .add_or_replace(&long_text("lions", 6), Some("lions.txt"))
        .await
        .unwrap();

    let result = tool
        .execute(json!({ "question": question, "k": 2 }), &tool_ctx)
        .await
        .unwrap();
    let context = result["context"].as_str().unwrap();
    assert!(context.starts_with("From koalas.txt:\n"));
    assert_eq!(context.matches("\n\n---\n\n").count(), 1);

    ctx.chat.add_message(1, Role::User, question).await.unwrap();
    ctx.chat.add_message(1, Role::Assistant, context).await.unwrap();
    let history = ctx.chat.get_messages(1).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);

    ctx.close().await;
}

#[tokio::test]
async fn test_search_ranking_and_k_clamp() {
    let tmp = TempDir::new().unwrap();
    let ctx = open_context(&tmp).await;

    for topic in ["koalas", "lions", "rabbits"] {
        ctx.knowledge
            .add_or_replace(&long_text(topic, 4), Some(&format!("{}.txt", topic)))
            .await
            .unwrap();
    }
    let total = ctx.index.count().await.unwrap();

    let hits = ctx.retrieval.search("rabbits", Some(total + 10)).await.unwrap();
    assert_eq!(hits.len(), total);
    for pair in hits.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }

    let hits = ctx.retrieval.search("rabbits", Some(3)).await.unwrap();
    assert_eq!(hits.len(), 3);

    ctx.close().await;
}

#[tokio::test]
async fn test_replace_changes_nothing_for_same_content() {
    let tmp = TempDir::new().unwrap();
    let ctx = open_context(&tmp).await;
    let text = long_text("habitats", 10);

    let first = ctx.knowledge.add_or_replace(&text, Some("habitats.txt")).await.unwrap();
    let before = ctx.index.get_where(&MetadataFilter::All).await.unwrap();

    let second = ctx.knowledge.add_or_replace(&text, Some("habitats.txt")).await.unwrap();
    let after = ctx.index.get_where(&MetadataFilter::All).await.unwrap();

    assert!(!first.was_duplicate);
    assert!(second.was_duplicate);
    assert_eq!(before, after);

    let indices: Vec<i64> = after.iter().map(|e| e.metadata.chunk_index).collect();
    let expected: Vec<i64> = (0..first.chunk_count as i64).collect();
    assert_eq!(indices, expected);

    ctx.close().await;
}

#[tokio::test]
async fn test_chunks_cover_document() {
    let tmp = TempDir::new().unwrap();
    let ctx = open_context(&tmp).await;
    let text = long_text("species", 12);

    ctx.knowledge.add_or_replace(&text, None).await.unwrap();
    let entries = ctx.index.get_where(&MetadataFilter::All).await.unwrap();
    let overlap = ctx.knowledge.splitter().overlap();

    let mut rebuilt = String::new();
    for (i, entry) in entries.iter().enumerate() {
        if i == 0 {
            rebuilt.push_str(&entry.text);
        } else {
            rebuilt.extend(entry.text.chars().skip(overlap));
        }
    }
    assert_eq!(rebuilt, text);

    ctx.close().await;
}

#[tokio::test]
async fn test_concurrent_adds_of_different_documents() {
    let tmp = TempDir::new().unwrap();
    let ctx = open_context(&tmp).await;
    let knowledge = ctx.knowledge.clone();

    let mut handles = Vec::new();
    for topic in ["koalas", "lions", "rabbits", "wombats", "emus"] {
        let knowledge = Arc::clone(&knowledge);
        handles.push(tokio::spawn(async move {
            knowledge
                .add_or_replace(&long_text(topic, 5), Some(&format!("{}.txt", topic)))
                .await
                .unwrap()
        }));
    }

    let mut expected_chunks = 0;
    for h in handles {
        expected_chunks += h.await.unwrap().chunk_count;
    }

    assert_eq!(ctx.knowledge.list_all().await.unwrap().len(), 5);
    assert_eq!(ctx.index.count().await.unwrap(), expected_chunks);

    ctx.close().await;
}

#[tokio::test]
async fn test_delete_then_retrieve_sentinel() {
    let tmp = TempDir::new().unwrap();
    let ctx = open_context(&tmp).await;

    let outcome = ctx
        .knowledge
        .add_or_replace("Koalas are marsupials.", Some("koalas.txt"))
        .await
        .unwrap();
    assert!(ctx.knowledge.delete(&outcome.doc_hash).await.unwrap());
    assert!(ctx.knowledge.list_all().await.unwrap().is_empty());

    let context = ctx.retrieval.retrieve("koalas", None).await.unwrap();
    assert_eq!(context, NO_RESULTS_MESSAGE);

    ctx.close().await;
}
