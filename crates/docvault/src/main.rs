//! # Docvault CLI (`dv`)
//!
//! The `dv` binary is the interface to the docvault document service. It
//! provides commands for uploading, editing, versioning, deleting, and
//! searching documents.
//!
//! ## Usage
//!
//! ```bash
//! dv --config ./config/dv.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dv list` | List all documents |
//! | `dv upload <file>` | Upload a file with optional metadata |
//! | `dv edit <id>...` | Edit metadata (one id) or bulk-edit (several) |
//! | `dv replace <id> <file>` | Replace a document's file, keeping its history |
//! | `dv delete <id>...` | Delete one document or a batch |
//! | `dv versions <id>` | Show a document's snapshot history |
//! | `dv rollback <id> <version-id>` | Restore an earlier snapshot as a new version |
//! | `dv search "<query>"` | Semantic search, one ranked entry per document |
//! | `dv ask "<question>"` | RAG answer with source excerpts |
//! | `dv show <id>` | Document metadata plus extracted text preview |
//! | `dv tags` | List all tags |
//! | `dv stats` | Library summary |
//!
//! Destructive commands (`delete`, `rollback`, bulk edits) prompt for
//! confirmation; `--yes` approves everything, for scripts.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use docvault::commands;
use docvault::config;
use docvault::confirm::{AssumeYes, Confirmation, StdinConfirmation};
use docvault::http_store::HttpStore;
use docvault::session::{DocumentSession, SessionOptions};

/// Docvault CLI — a client for the docvault document service.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/dv.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "dv",
    about = "Docvault — a client for the docvault document service",
    version,
    long_about = "Docvault manages a remote document library: uploads, metadata edits with \
    append-only version history, rollback, bulk operations, and semantic/RAG search with \
    per-document result aggregation."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/dv.toml")]
    config: PathBuf,

    /// Approve all confirmation prompts without asking.
    #[arg(long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// List all documents in the library.
    List,

    /// Upload a file as a new document.
    ///
    /// The document starts at version 1 with an "Initial version" snapshot.
    Upload {
        /// Path to the file to upload.
        file: PathBuf,

        /// Description text.
        #[arg(long)]
        description: Option<String>,

        /// Comma-separated tag names.
        #[arg(long)]
        tags: Option<String>,

        /// Visibility: `public` or `private` (default private).
        #[arg(long)]
        visibility: Option<String>,
    },

    /// Edit document metadata.
    ///
    /// With one id, opens an edit against the document's current version;
    /// a stale edit (the document changed underneath) is rejected. With
    /// several ids, applies the same patch to all of them concurrently
    /// behind one confirmation.
    Edit {
        /// Document id(s).
        #[arg(required = true)]
        ids: Vec<i64>,

        /// New description text.
        #[arg(long)]
        description: Option<String>,

        /// Comma-separated tag names, replacing the current set.
        #[arg(long)]
        tags: Option<String>,

        /// Visibility: `public` or `private`.
        #[arg(long)]
        visibility: Option<String>,
    },

    /// Replace a document's file, keeping its id and version history.
    ///
    /// Metadata flags default to the document's current values.
    Replace {
        /// Document id.
        id: i64,

        /// Path to the replacement file.
        file: PathBuf,

        /// New description text.
        #[arg(long)]
        description: Option<String>,

        /// Comma-separated tag names, replacing the current set.
        #[arg(long)]
        tags: Option<String>,

        /// Visibility: `public` or `private`.
        #[arg(long)]
        visibility: Option<String>,
    },

    /// Delete one document, or a batch of them.
    ///
    /// A batch is deleted concurrently behind one confirmation; failures
    /// are reported as a single aggregate notice.
    Delete {
        /// Document id(s).
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Show a document's version history, newest first.
    Versions {
        /// Document id.
        id: i64,
    },

    /// Restore an earlier snapshot as a new version.
    ///
    /// History is append-only: rollback never removes later versions.
    Rollback {
        /// Document id.
        id: i64,

        /// Version id to restore (as shown by `dv versions`).
        version_id: i64,
    },

    /// Semantic search over the library.
    ///
    /// Chunk-level hits are aggregated to one ranked entry per document,
    /// carrying the best-matching chunk and the match count.
    Search {
        /// The search query string.
        query: String,
    },

    /// Ask a question, answered from the library's content.
    Ask {
        /// The question.
        query: String,
    },

    /// Show one document's metadata and extracted text preview.
    Show {
        /// Document id.
        id: i64,
    },

    /// List all tags known to the service.
    Tags,

    /// Library summary: counts, visibility split, total size, tags.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    let store = Arc::new(HttpStore::new(&cfg.server)?);
    let confirm: Arc<dyn Confirmation> = if cli.yes {
        Arc::new(AssumeYes)
    } else {
        Arc::new(StdinConfirmation)
    };
    let session = DocumentSession::new(store, confirm, SessionOptions::from_config(&cfg));

    let result = match cli.command {
        Commands::List => commands::run_list(&session).await,
        Commands::Upload {
            file,
            description,
            tags,
            visibility,
        } => commands::run_upload(&session, &file, description, tags, visibility).await,
        Commands::Edit {
            ids,
            description,
            tags,
            visibility,
        } => commands::run_edit(&session, &ids, description, tags, visibility).await,
        Commands::Replace {
            id,
            file,
            description,
            tags,
            visibility,
        } => commands::run_replace(&session, id, &file, description, tags, visibility).await,
        Commands::Delete { ids } => commands::run_delete(&session, &ids).await,
        Commands::Versions { id } => commands::run_versions(&session, id).await,
        Commands::Rollback { id, version_id } => {
            commands::run_rollback(&session, id, version_id).await
        }
        Commands::Search { query } => {
            commands::run_search(&session, &query, cfg.search.preview_chars).await
        }
        Commands::Ask { query } => commands::run_ask(&session, &query).await,
        Commands::Show { id } => commands::run_show(&session, id).await,
        Commands::Tags => commands::run_tags(&session).await,
        Commands::Stats => commands::run_stats(&session).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
