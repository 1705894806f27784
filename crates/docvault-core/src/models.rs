//! Core data models used throughout docvault.
//!
//! These types mirror the wire contract of the remote document service:
//! documents with versioned metadata, tag records, snapshot history entries,
//! and the chunk-level hits produced by semantic and RAG queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Document visibility, carried on the wire as `"public"` / `"private"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tag record as the service stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// A document as served by the remote store.
///
/// `filename` is the server-assigned storage name (`{uuid}_{original}`);
/// `original_filename` is the display name. `version` starts at 1 and is
/// bumped by every metadata edit, file replacement, and rollback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub filename: String,
    pub original_filename: String,
    pub file_type: String,
    pub file_size: i64,
    pub upload_date: DateTime<Utc>,
    pub owner_id: i64,
    pub description: Option<String>,
    #[serde(rename = "is_public")]
    pub visibility: Visibility,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    pub version: i64,
}

impl Document {
    /// Tag names in stored order.
    pub fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.name.clone()).collect()
    }
}

/// An immutable snapshot of a document's metadata at one version number.
///
/// History is append-only: `version_number` values for a document are
/// strictly increasing and contiguous from 1, and rollback appends a new
/// entry rather than rewriting old ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentVersion {
    pub id: i64,
    pub document_id: i64,
    pub version_number: i64,
    pub description: Option<String>,
    #[serde(default)]
    pub tags_snapshot: Vec<String>,
    pub is_public_snapshot: Visibility,
    pub created_at: DateTime<Utc>,
    pub created_by_id: i64,
    pub change_summary: Option<String>,
}

/// A single chunk-level search match. Ephemeral, produced per query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub document_id: i64,
    pub filename: String,
    pub chunk_content: String,
    /// Relevance score in `[0.0, 1.0]`.
    pub score: f64,
    /// Owning document payload when the service joins it into the hit.
    #[serde(default)]
    pub document: Option<Document>,
}

/// One entry per distinct document in a query's hit set: the representative
/// (highest-score) chunk plus the number of chunks that matched.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedResult {
    pub document_id: i64,
    pub filename: String,
    pub chunk_content: String,
    /// Maximum score among the document's hits.
    pub score: f64,
    pub match_count: usize,
    pub document: Option<Document>,
}

/// Answer plus supporting chunks from a RAG query. Sources stay in the
/// service's ranked order and are not aggregated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<SearchHit>,
}

/// Extracted text content of one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentPreview {
    pub document_id: i64,
    pub original_filename: String,
    pub file_type: String,
    pub content: String,
    pub preview_length: usize,
}

/// Payload for creating a document: the file plus its initial metadata.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub file_name: String,
    pub content: Vec<u8>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub visibility: Visibility,
}

/// Metadata fields of an update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetadataPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(rename = "is_public", skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
}

impl MetadataPatch {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.tags.is_none() && self.visibility.is_none()
    }
}

/// Lowercased extension of a file name, or the whole name when it has no
/// dot. This matches how the service derives `file_type`.
pub fn file_extension(name: &str) -> String {
    name.rsplit('.').next().unwrap_or(name).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("report.PDF"), "pdf");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
        assert_eq!(file_extension("noext"), "noext");
        assert_eq!(file_extension(""), "");
    }

    #[test]
    fn test_visibility_wire_format() {
        let doc = serde_json::json!({
            "id": 1,
            "filename": "abc_report.pdf",
            "original_filename": "report.pdf",
            "file_type": "pdf",
            "file_size": 100,
            "upload_date": "2025-01-10T12:00:00Z",
            "owner_id": 1,
            "description": null,
            "is_public": "public",
            "version": 1
        });
        let doc: Document = serde_json::from_value(doc).unwrap();
        assert_eq!(doc.visibility, Visibility::Public);
        assert!(doc.tags.is_empty());
        assert!(doc.last_modified.is_none());

        let patch = MetadataPatch {
            visibility: Some(Visibility::Private),
            ..MetadataPatch::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({ "is_public": "private" }));
    }
}
