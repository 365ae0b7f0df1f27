//! Inkdraft - local markdown documents with HTML preview
//!
//! Command-line front end over the document store, draft manager, and
//! preview renderer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inkdraft::{extract_toc, AppConfig, Document, DocumentStore, DraftManager, MarkdownRenderer, Snapshot};

#[derive(Parser, Debug)]
#[clap(
    name = "inkdraft",
    version = env!("CARGO_PKG_VERSION"),
    about = "Local markdown documents with drafts and HTML preview"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Render a markdown file to HTML
    Render { file: PathBuf },
    /// Print the table of contents of a markdown file
    Toc { file: PathBuf },
    /// Store a markdown file as a document
    Save { file: PathBuf },
    /// List stored documents, most recent first
    List,
    /// Search documents by title, content, or tag
    Search { query: String },
    /// Delete a document
    Delete { id: String },
    /// Write all documents and drafts to a JSON snapshot
    Export { file: PathBuf },
    /// Load a JSON snapshot, replacing entries with the same id
    Import { file: PathBuf },
    /// Delete every document and draft
    Clear,
    /// Save a markdown file as a draft
    Draft { file: PathBuf },
    /// List drafts, most recent first
    Drafts,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::filter::LevelFilter::INFO)
        .init();

    let cli = Cli::parse();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Using default config: {:#}", e);
            AppConfig::default()
        }
    };

    // preview commands need no database
    match &cli.command {
        Command::Render { file } => {
            let renderer = MarkdownRenderer::new(&config.preview);
            println!("{}", renderer.render(&read_source(file)?));
            return Ok(());
        }
        Command::Toc { file } => {
            let source = read_source(file)?;
            let entries: Vec<_> = extract_toc(&source).collect();
            return print_json(&entries);
        }
        _ => {}
    }

    let store = Arc::new(DocumentStore::from_config(&config));
    store.init().await?;

    match cli.command {
        Command::Render { .. } | Command::Toc { .. } => {}
        Command::Save { file } => {
            let document = Document::from_markdown(read_source(&file)?);
            let id = store.save(&document).await?;
            println!("{id}");
        }
        Command::List => print_json(&summaries(store.list().await?))?,
        Command::Search { query } => print_json(&summaries(store.search(&query).await?))?,
        Command::Delete { id } => store.delete(&id).await?,
        Command::Export { file } => {
            let snapshot = store.export_snapshot().await?;
            let json = serde_json::to_string_pretty(&snapshot)?;
            std::fs::write(&file, json)
                .with_context(|| format!("Failed to write {}", file.display()))?;
            tracing::info!(
                "Exported {} documents and {} drafts",
                snapshot.documents.len(),
                snapshot.drafts.len()
            );
        }
        Command::Import { file } => {
            let json = read_source(&file)?;
            let snapshot: Snapshot = serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse {}", file.display()))?;
            store.import_snapshot(&snapshot).await?;
        }
        Command::Clear => store.clear().await?,
        Command::Draft { file } => {
            let drafts = DraftManager::from_config(Arc::clone(&store), &config.autosave);
            let document = Document::from_markdown(read_source(&file)?);
            let id = drafts.save_draft(&document).await?;
            drafts.cleanup().await;
            println!("{id}");
        }
        Command::Drafts => print_json(&summaries(store.list_drafts().await?))?,
    }

    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    id: String,
    title: String,
    tags: Vec<String>,
    updated_at: String,
}

fn summaries(documents: Vec<Document>) -> Vec<Summary> {
    documents
        .into_iter()
        .map(|doc| Summary {
            id: doc.id,
            title: doc.title,
            tags: doc.tags,
            updated_at: doc.updated_at.to_rfc3339(),
        })
        .collect()
}

fn read_source(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
