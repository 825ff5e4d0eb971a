//! # RAG Chat CLI (`ragchat`)
//!
//! Manages the knowledge base and chat history that back the
//! retrieval-augmented chat service, and exercises retrieval and routing
//! from the command line.
//!
//! ## Usage
//!
//! ```bash
//! ragchat --config ./config/ragchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragchat init` | Create the SQLite database and run schema migrations |
//! | `ragchat add <file>` | Index a text file |
//! | `ragchat sync` | Index every `*.txt` file in `knowledge.dir` |
//! | `ragchat list` | List indexed documents |
//! | `ragchat delete <hash>` | Remove a document (or `--name <file>`) |
//! | `ragchat search "<query>"` | Show the nearest chunks with distances |
//! | `ragchat retrieve "<question>"` | Print the context the agent would receive |
//! | `ragchat route "<question>"` | Show which agent would answer |
//! | `ragchat stats` | Summarize the index and chat history |
//! | `ragchat chat sessions` | List chat sessions, newest first |
//! | `ragchat chat history <id>` | Print a session's messages |
//! | `ragchat chat delete <id>` | Delete a session and its messages |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use rag_chat::config::{self, Config};
use rag_chat::context::AppContext;
use rag_chat::{commands, logging, migrate, stats};

/// RAG Chat CLI: knowledge base and chat history management for a
/// retrieval-augmented chat service.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/ragchat.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "ragchat",
    about = "RAG Chat — knowledge base and chat history management for a retrieval-augmented chat service",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ragchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the `index_entries`, `sessions`,
    /// and `messages` tables. Safe to run repeatedly.
    Init,

    /// Index a UTF-8 text file.
    ///
    /// Identical content is stored once regardless of file name.
    Add {
        /// Path to the text file.
        file: PathBuf,

        /// Display name to record (defaults to the file name).
        #[arg(long)]
        name: Option<String>,
    },

    /// Index every `*.txt` file in the configured knowledge directory.
    Sync,

    /// List indexed documents.
    List,

    /// Delete a document by content hash.
    Delete {
        /// Content hash, or a display name with `--name`.
        target: String,

        /// Treat the target as a display name.
        #[arg(long)]
        name: bool,
    },

    /// Show the nearest chunks for a query.
    Search {
        query: String,

        /// Number of chunks to return (defaults to `retrieval.top_k`).
        #[arg(long)]
        k: Option<usize>,
    },

    /// Print the formatted context the retrieval tool returns.
    Retrieve {
        question: String,

        #[arg(long)]
        k: Option<usize>,
    },

    /// Show whether a question would be routed to the knowledge-base agent.
    Route { question: String },

    /// Show knowledge base and chat statistics.
    Stats,

    /// Inspect and manage chat history.
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },
}

/// Chat history subcommands.
#[derive(Subcommand)]
enum ChatAction {
    /// List sessions, newest first.
    Sessions,
    /// Print the messages of a session in order.
    History { session_id: i64 },
    /// Delete a session and all its messages.
    Delete { session_id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg: Config = config::load_config(&cli.config)?;
    logging::init_logging(&cfg.logging);

    if let Commands::Init = cli.command {
        let pool = rag_chat::db::connect(&cfg).await?;
        migrate::run_migrations(&pool).await?;
        pool.close().await;
        println!("Database initialized successfully.");
        return Ok(());
    }

    let ctx = AppContext::open(cfg).await?;

    let result = match cli.command {
        Commands::Init => Ok(()),
        Commands::Add { file, name } => commands::run_add(&ctx, &file, name).await,
        Commands::Sync => commands::run_sync(&ctx).await,
        Commands::List => commands::run_list(&ctx).await,
        Commands::Delete { target, name } => commands::run_delete(&ctx, &target, name).await,
        Commands::Search { query, k } => commands::run_search(&ctx, &query, k).await,
        Commands::Retrieve { question, k } => commands::run_retrieve(&ctx, &question, k).await,
        Commands::Route { question } => commands::run_route(&ctx, &question),
        Commands::Stats => stats::run_stats(&ctx).await,
        Commands::Chat { action } => match action {
            ChatAction::Sessions => commands::run_chat_sessions(&ctx).await,
            ChatAction::History { session_id } => {
                commands::run_chat_history(&ctx, session_id).await
            }
            ChatAction::Delete { session_id } => commands::run_chat_delete(&ctx, session_id).await,
        },
    };

    ctx.close().await;
    result
}
