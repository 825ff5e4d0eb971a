use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn ragchat_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ragchat"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    // Source files live outside the knowledge dir
    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("koalas.txt"),
        "Koalas live in the eucalyptus forests of eastern Australia.\n\n\
         A koala eats eucalyptus leaves and sleeps up to twenty hours a day.",
    )
    .unwrap();
    fs::write(
        files_dir.join("lions.txt"),
        "Lions live in prides on the African savanna.\n\n\
         Lionesses do most of the hunting, usually at night.",
    )
    .unwrap();
    fs::write(
        files_dir.join("koalas-copy.txt"),
        "Koalas live in the eucalyptus forests of eastern Australia.\n\n\
         A koala eats eucalyptus leaves and sleeps up to twenty hours a day.",
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/ragchat.sqlite"

[chunking]
chunk_size = 80
chunk_overlap = 10

[retrieval]
top_k = 3

[embedding]
provider = "hash"
dims = 128

[knowledge]
dir = "{root}/knowledge"

[logging]
level = "warn"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("ragchat.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_ragchat(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = ragchat_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run ragchat binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn files(config_path: &Path, name: &str) -> String {
    config_path
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("files")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

fn listed_hashes(config_path: &Path) -> Vec<String> {
    let (stdout, stderr, success) = run_ragchat(config_path, &["list"]);
    assert!(success, "list failed: {}", stderr);
    stdout
        .lines()
        .filter(|l| !l.starts_with("No documents"))
        .filter_map(|l| l.split_whitespace().next().map(str::to_string))
        .collect()
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_ragchat(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_ragchat(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_ragchat(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_add_and_list() {
    let (_tmp, config_path) = setup_test_env();
    run_ragchat(&config_path, &["init"]);

    let (stdout, stderr, success) =
        run_ragchat(&config_path, &["add", &files(&config_path, "koalas.txt")]);
    assert!(success, "add failed: {}", stderr);
    assert!(stdout.contains("Added 'koalas.txt'"));

    let (stdout, _, _) = run_ragchat(&config_path, &["list"]);
    assert!(stdout.contains("koalas.txt"));
    assert_eq!(listed_hashes(&config_path).len(), 1);
}

#[test]
fn test_duplicate_content_stored_once() {
    let (_tmp, config_path) = setup_test_env();
    run_ragchat(&config_path, &["init"]);

    run_ragchat(&config_path, &["add", &files(&config_path, "koalas.txt")]);
    let (stdout, stderr, success) =
        run_ragchat(&config_path, &["add", &files(&config_path, "koalas-copy.txt")]);
    assert!(success, "second add failed: {}", stderr);
    assert!(stdout.contains("same content"));

    assert_eq!(listed_hashes(&config_path).len(), 1);
    let (stdout, _, _) = run_ragchat(&config_path, &["list"]);
    assert!(stdout.contains("koalas.txt"));
    assert!(!stdout.contains("koalas-copy.txt"));
}

#[test]
fn test_retrieve_attributes_sources() {
    let (_tmp, config_path) = setup_test_env();
    run_ragchat(&config_path, &["init"]);
    run_ragchat(&config_path, &["add", &files(&config_path, "koalas.txt")]);
    run_ragchat(&config_path, &["add", &files(&config_path, "lions.txt")]);

    let (stdout, stderr, success) =
        run_ragchat(&config_path, &["retrieve", "koalas eucalyptus forests", "--k", "1"]);
    assert!(success, "retrieve failed: {}", stderr);
    assert!(stdout.starts_with("From koalas.txt:\n"), "got: {}", stdout);
}

#[test]
fn test_retrieve_empty_knowledge_base() {
    let (_tmp, config_path) = setup_test_env();
    run_ragchat(&config_path, &["init"]);

    let (stdout, _, success) = run_ragchat(&config_path, &["retrieve", "Tell me about koalas"]);
    assert!(success);
    assert!(stdout.contains("No relevant information found in the knowledge base."));
}

#[test]
fn test_delete_by_hash() {
    let (_tmp, config_path) = setup_test_env();
    run_ragchat(&config_path, &["init"]);
    run_ragchat(&config_path, &["add", &files(&config_path, "koalas.txt")]);
    run_ragchat(&config_path, &["add", &files(&config_path, "lions.txt")]);

    let hashes = listed_hashes(&config_path);
    assert_eq!(hashes.len(), 2);

    let (_, stderr, success) = run_ragchat(&config_path, &["delete", &hashes[0]]);
    assert!(success, "delete failed: {}", stderr);
    assert_eq!(listed_hashes(&config_path), vec![hashes[1].clone()]);

    let (_, stderr, success) = run_ragchat(&config_path, &["delete", &hashes[0]]);
    assert!(!success);
    assert!(stderr.contains("not found"));
}

#[test]
fn test_delete_by_name_removes_retained_file() {
    let (tmp, config_path) = setup_test_env();
    run_ragchat(&config_path, &["init"]);
    run_ragchat(&config_path, &["add", &files(&config_path, "lions.txt")]);

    let retained = tmp.path().join("knowledge").join("lions.txt");
    assert!(retained.exists());

    let (_, stderr, success) = run_ragchat(&config_path, &["delete", "--name", "lions.txt"]);
    assert!(success, "delete failed: {}", stderr);
    assert!(!retained.exists());
    assert!(listed_hashes(&config_path).is_empty());
}

#[test]
fn test_failed_add_retains_nothing() {
    let (tmp, config_path) = setup_test_env();
    run_ragchat(&config_path, &["init"]);

    let bad = tmp.path().join("files").join("bad.txt");
    fs::write(&bad, [0xFFu8, 0xFE, 0x00]).unwrap();

    let (_, stderr, success) = run_ragchat(&config_path, &["add", bad.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("not UTF-8"), "got: {}", stderr);
    assert!(!tmp.path().join("knowledge").join("bad.txt").exists());
    assert!(listed_hashes(&config_path).is_empty());
}

#[test]
fn test_add_under_retained_name_replaces_previous_document() {
    let (tmp, config_path) = setup_test_env();
    run_ragchat(&config_path, &["init"]);

    let (_, stderr, success) = run_ragchat(
        &config_path,
        &["add", &files(&config_path, "koalas.txt"), "--name", "animals.txt"],
    );
    assert!(success, "first add failed: {}", stderr);
    let first = listed_hashes(&config_path);
    assert_eq!(first.len(), 1);

    let (stdout, stderr, success) = run_ragchat(
        &config_path,
        &["add", &files(&config_path, "lions.txt"), "--name", "animals.txt"],
    );
    assert!(success, "second add failed: {}", stderr);
    assert!(stdout.contains("Replaced 1 previous version"));

    let hashes = listed_hashes(&config_path);
    assert_eq!(hashes.len(), 1);
    assert_ne!(hashes, first);

    let retained = fs::read_to_string(tmp.path().join("knowledge").join("animals.txt")).unwrap();
    let lions = fs::read_to_string(files(&config_path, "lions.txt")).unwrap();
    assert_eq!(retained, lions);
}

#[test]
fn test_sync_loads_knowledge_dir() {
    let (tmp, config_path) = setup_test_env();
    let knowledge = tmp.path().join("knowledge");
    fs::create_dir_all(&knowledge).unwrap();
    fs::write(knowledge.join("rabbits.txt"), "Rabbits dig burrows called warrens.").unwrap();
    fs::write(knowledge.join("notes.md"), "ignored").unwrap();

    run_ragchat(&config_path, &["init"]);
    let (stdout, stderr, success) = run_ragchat(&config_path, &["sync"]);
    assert!(success, "sync failed: {}", stderr);
    assert!(stdout.contains("1 files, 1 added"));

    // Second sync re-indexes the same content without duplicating it
    let (stdout, _, _) = run_ragchat(&config_path, &["sync"]);
    assert!(stdout.contains("0 added, 1 unchanged"));
    assert_eq!(listed_hashes(&config_path).len(), 1);
}

#[test]
fn test_route() {
    let (_tmp, config_path) = setup_test_env();
    run_ragchat(&config_path, &["init"]);

    let (stdout, _, success) = run_ragchat(&config_path, &["route", "Tell me about koalas"]);
    assert!(success);
    assert!(stdout.contains("\"needs_retrieval\":true"));
    assert!(stdout.contains("knowledge_base"));

    let (stdout, _, _) = run_ragchat(&config_path, &["route", "What is 2+2?"]);
    assert!(stdout.contains("\"needs_retrieval\":false"));
    assert!(stdout.contains("plain"));
}

#[test]
fn test_stats() {
    let (_tmp, config_path) = setup_test_env();
    run_ragchat(&config_path, &["init"]);
    run_ragchat(&config_path, &["add", &files(&config_path, "koalas.txt")]);

    let (stdout, stderr, success) = run_ragchat(&config_path, &["stats"]);
    assert!(success, "stats failed: {}", stderr);
    assert!(stdout.contains("Documents:   1"));
    assert!(stdout.contains("koalas.txt"));
}

#[test]
fn test_chat_history_missing_session() {
    let (_tmp, config_path) = setup_test_env();
    run_ragchat(&config_path, &["init"]);

    let (stdout, _, success) = run_ragchat(&config_path, &["chat", "sessions"]);
    assert!(success);
    assert!(stdout.contains("No chat sessions"));

    let (_, stderr, success) = run_ragchat(&config_path, &["chat", "history", "7"]);
    assert!(!success);
    assert!(stderr.contains("not found"));
}

#[test]
fn test_invalid_config_rejected() {
    let (tmp, _) = setup_test_env();
    let bad = tmp.path().join("config").join("bad.toml");
    fs::write(
        &bad,
        "[db]\npath = \"x.sqlite\"\n[chunking]\nchunk_size = 10\nchunk_overlap = 10\n",
    )
    .unwrap();

    let (_, stderr, success) = run_ragchat(&bad, &["init"]);
    assert!(!success);
    assert!(stderr.contains("chunk_overlap"));
}
