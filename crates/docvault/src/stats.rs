//! Library statistics.
//!
//! A quick summary of what the service holds: document counts, visibility
//! split, total bytes, and distinct tags. Computed from the cached document
//! list, so it reflects the last successful reload. Used by `dv stats`.

use std::collections::BTreeSet;

use docvault_core::models::{Document, Visibility};

/// Derived summary of the document library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryStats {
    pub document_count: usize,
    pub public_count: usize,
    pub private_count: usize,
    pub total_bytes: i64,
    /// Distinct tag names across the library, sorted.
    pub tags: Vec<String>,
}

pub fn compute(docs: &[Document]) -> LibraryStats {
    let mut public_count = 0;
    let mut total_bytes = 0;
    let mut tags: BTreeSet<String> = BTreeSet::new();

    for doc in docs {
        if doc.visibility == Visibility::Public {
            public_count += 1;
        }
        total_bytes += doc.file_size;
        for tag in &doc.tags {
            tags.insert(tag.name.clone());
        }
    }

    LibraryStats {
        document_count: docs.len(),
        public_count,
        private_count: docs.len() - public_count,
        total_bytes,
        tags: tags.into_iter().collect(),
    }
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: i64) -> String {
    let bytes = bytes.max(0) as u64;
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
