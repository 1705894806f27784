//! CLI command runners.
//!
//! Each `run_*` function drives the [`DocumentSession`] through one command
//! and prints the result. Declined confirmations print a cancellation
//! notice and exit cleanly; engine errors bubble up as `anyhow` errors for
//! `main` to report.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};

use docvault_core::models::{Document, MetadataPatch, Visibility};

use crate::error::{EngineError, Outcome};
use crate::session::{DocumentSession, StagedFile, UploadDraft};
use crate::stats;

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

/// Read a file into a staged upload, using its final path component as the
/// file name.
fn stage_file(path: &Path) -> Result<StagedFile> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid file path: {}", path.display()))?
        .to_string();
    let content = std::fs::read(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(StagedFile { name, content })
}

fn parse_tags(tags: Option<String>) -> Option<Vec<String>> {
    tags.map(|t| {
        t.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

fn parse_visibility(visibility: Option<String>) -> Result<Option<Visibility>> {
    match visibility.as_deref() {
        None => Ok(None),
        Some("public") => Ok(Some(Visibility::Public)),
        Some("private") => Ok(Some(Visibility::Private)),
        Some(other) => bail!("Unknown visibility: {}. Use public or private.", other),
    }
}

fn print_document_row(doc: &Document) {
    let tags = doc.tag_names().join(",");
    println!(
        "  {:>5}  {:<32} {:>4}  {:<8} {:>10}  {:<16} {}",
        doc.id,
        truncate(&doc.original_filename, 32),
        format!("v{}", doc.version),
        doc.visibility,
        stats::format_bytes(doc.file_size),
        format_ts(&doc.upload_date),
        tags
    );
}

fn truncate(text: &str, max: usize) -> String {
    docvault_core::aggregate::excerpt(text, max)
}

pub async fn run_list(session: &DocumentSession) -> Result<()> {
    let docs = session.documents().await?;
    if docs.is_empty() {
        println!("No documents.");
        return Ok(());
    }
    println!(
        "  {:>5}  {:<32} {:>4}  {:<8} {:>10}  {:<16} {}",
        "ID", "NAME", "VER", "ACCESS", "SIZE", "UPLOADED", "TAGS"
    );
    println!("  {}", "-".repeat(96));
    for doc in &docs {
        print_document_row(doc);
    }
    println!();
    println!("  {} document(s)", docs.len());
    Ok(())
}

pub async fn run_upload(
    session: &DocumentSession,
    path: &Path,
    description: Option<String>,
    tags: Option<String>,
    visibility: Option<String>,
) -> Result<()> {
    let file = stage_file(path)?;
    session.open_upload();
    session.set_upload_draft(UploadDraft {
        file: Some(file),
        description,
        tags: parse_tags(tags).unwrap_or_default(),
        visibility: parse_visibility(visibility)?.unwrap_or_default(),
    });

    let doc = session.upload().await?;
    println!(
        "Uploaded \"{}\" as document {} (version {}).",
        doc.original_filename, doc.id, doc.version
    );
    Ok(())
}

pub async fn run_edit(
    session: &DocumentSession,
    ids: &[i64],
    description: Option<String>,
    tags: Option<String>,
    visibility: Option<String>,
) -> Result<()> {
    let patch = MetadataPatch {
        description,
        tags: parse_tags(tags),
        visibility: parse_visibility(visibility)?,
    };
    if patch.is_empty() {
        bail!("Nothing to change. Pass --description, --tags, or --visibility.");
    }

    // Prime the cache so drafts and base versions come from fresh state.
    session.documents().await?;

    match ids {
        [] => bail!("No document ids given."),
        [id] => {
            session.begin_edit(*id)?;
            session.amend_edit(*id, patch)?;
            let doc = session.save_edit(*id).await?;
            println!("Updated document {} to version {}.", doc.id, doc.version);
        }
        many => match session.bulk_edit(many, patch).await {
            Ok(Outcome::Completed) => println!("Updated {} documents.", many.len()),
            Ok(Outcome::Declined) => println!("Cancelled."),
            Err(err @ EngineError::PartialBatch { .. }) => {
                report_partial(&err);
            }
            Err(err) => return Err(err.into()),
        },
    }
    Ok(())
}

pub async fn run_replace(
    session: &DocumentSession,
    id: i64,
    path: &Path,
    description: Option<String>,
    tags: Option<String>,
    visibility: Option<String>,
) -> Result<()> {
    let file = stage_file(path)?;
    session.documents().await?;

    // Unspecified metadata carries over from the current document.
    let current = session
        .cached_document(id)
        .with_context(|| format!("unknown document: {}", id))?;
    let doc = session
        .replace_file(
            id,
            file,
            description.or(current.description),
            parse_tags(tags).unwrap_or_else(|| current.tags.iter().map(|t| t.name.clone()).collect()),
            parse_visibility(visibility)?.unwrap_or(current.visibility),
        )
        .await?;

    println!(
        "Replaced file of document {} with \"{}\" (now version {}).",
        doc.id, doc.original_filename, doc.version
    );
    Ok(())
}

pub async fn run_delete(session: &DocumentSession, ids: &[i64]) -> Result<()> {
    session.documents().await?;

    match ids {
        [] => bail!("No document ids given."),
        [id] => match session.delete(*id).await? {
            Outcome::Completed => println!("Deleted document {}.", id),
            Outcome::Declined => println!("Cancelled."),
        },
        many => match session.bulk_delete(many).await {
            Ok(Outcome::Completed) => println!("Deleted {} documents.", many.len()),
            Ok(Outcome::Declined) => println!("Cancelled."),
            Err(err @ EngineError::PartialBatch { .. }) => {
                report_partial(&err);
            }
            Err(err) => return Err(err.into()),
        },
    }
    Ok(())
}

/// One aggregate notice for a partial batch failure. The cache already
/// reflects what actually happened.
fn report_partial(err: &EngineError) {
    eprintln!("Warning: {}", err);
    if let EngineError::PartialBatch { failures, .. } = err {
        for (id, message) in failures {
            eprintln!("  document {}: {}", id, message);
        }
    }
}

pub async fn run_versions(session: &DocumentSession, id: i64) -> Result<()> {
    let versions = session.open_versions(id).await?;
    session.close_versions();

    if versions.is_empty() {
        println!("No versions.");
        return Ok(());
    }
    println!("--- Versions of document {} ---", id);
    for version in &versions {
        println!(
            "  [{}] v{}  {}  {}",
            version.id,
            version.version_number,
            format_ts(&version.created_at),
            version.change_summary.as_deref().unwrap_or("")
        );
        if let Some(ref description) = version.description {
            println!("        description: {}", description);
        }
        if !version.tags_snapshot.is_empty() {
            println!("        tags:        {}", version.tags_snapshot.join(","));
        }
        println!("        visibility:  {}", version.is_public_snapshot);
    }
    Ok(())
}

pub async fn run_rollback(session: &DocumentSession, id: i64, version_id: i64) -> Result<()> {
    session.documents().await?;
    match session.rollback(id, version_id).await? {
        Outcome::Completed => {
            let doc = session.documents().await?;
            let version = doc
                .iter()
                .find(|d| d.id == id)
                .map(|d| d.version)
                .unwrap_or_default();
            println!("Rolled back document {} (now version {}).", id, version);
        }
        Outcome::Declined => println!("Cancelled."),
    }
    Ok(())
}

pub async fn run_search(session: &DocumentSession, query: &str, preview_chars: usize) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }
    session.documents().await?;
    let results = session.search(query).await?;
    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    println!("--- Results ({}) ---", results.len());
    for result in &results {
        let name = result
            .document
            .as_ref()
            .map(|d| d.original_filename.as_str())
            .unwrap_or(result.filename.as_str());
        println!(
            "  [{:.3}] {} (document {}, {} matching chunk{})",
            result.score,
            name,
            result.document_id,
            result.match_count,
            if result.match_count == 1 { "" } else { "s" }
        );
        println!(
            "        {}",
            truncate(&result.chunk_content, preview_chars)
        );
    }
    Ok(())
}

pub async fn run_ask(session: &DocumentSession, query: &str) -> Result<()> {
    if query.trim().is_empty() {
        bail!("Empty question.");
    }
    let view = session.ask(query).await?;

    println!("--- Answer ---");
    println!("{}", view.answer);
    if !view.sources.is_empty() {
        println!();
        println!("--- Sources ({}) ---", view.sources.len());
        for source in &view.sources {
            println!("  [{:.3}] {} (document {})", source.score, source.filename, source.document_id);
            println!("        {}", source.excerpt);
        }
    }
    Ok(())
}

pub async fn run_show(session: &DocumentSession, id: i64) -> Result<()> {
    session.documents().await?;
    let doc = session
        .cached_document(id)
        .with_context(|| format!("unknown document: {}", id))?;

    println!("--- Document ---");
    println!("id:          {}", doc.id);
    println!("name:        {}", doc.original_filename);
    println!("stored as:   {}", doc.filename);
    println!("type:        {}", doc.file_type);
    println!("size:        {}", stats::format_bytes(doc.file_size));
    println!("version:     {}", doc.version);
    println!("visibility:  {}", doc.visibility);
    println!("uploaded:    {}", format_ts(&doc.upload_date));
    if let Some(ref modified) = doc.last_modified {
        println!("modified:    {}", format_ts(modified));
    }
    if let Some(ref description) = doc.description {
        println!("description: {}", description);
    }
    if !doc.tags.is_empty() {
        println!("tags:        {}", doc.tag_names().join(","));
    }
    println!();

    let preview = session.preview(id).await?;
    println!("--- Preview ({} chars) ---", preview.preview_length);
    println!("{}", preview.content);
    Ok(())
}

pub async fn run_tags(session: &DocumentSession) -> Result<()> {
    let tags = session.tags().await?;
    if tags.is_empty() {
        println!("No tags.");
        return Ok(());
    }
    for tag in &tags {
        println!("  [{}] {}", tag.id, tag.name);
    }
    Ok(())
}

pub async fn run_stats(session: &DocumentSession) -> Result<()> {
    let docs = session.documents().await?;
    let summary = stats::compute(&docs);

    println!("Docvault — Library Stats");
    println!("========================");
    println!();
    println!("  Documents:  {}", summary.document_count);
    println!(
        "  Access:     {} public / {} private",
        summary.public_count, summary.private_count
    );
    println!("  Total size: {}", stats::format_bytes(summary.total_bytes));
    println!("  Tags:       {}", summary.tags.len());
    if !summary.tags.is_empty() {
        println!("              {}", summary.tags.join(", "));
    }
    println!();
    Ok(())
}
