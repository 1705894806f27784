//! Ranked per-document aggregation of chunk-level search hits.
//!
//! A query can match many chunks of the same document. Displaying them all
//! would let one document crowd out every other result, so the aggregator
//! collapses hits to one entry per document:
//!
//! 1. Group hits by `document_id`, preserving first-seen group order.
//! 2. Within a group, the representative chunk is the hit with the maximum
//!    score; ties keep the earlier hit.
//! 3. Each entry carries the number of hits in its group.
//! 4. Sort entries by score (desc); equal scores keep first-seen order.
//!
//! RAG sources are deliberately *not* aggregated — they are displayed in the
//! service's ranked order, truncated to a preview with [`excerpt`].

use std::collections::HashMap;

use crate::models::{AggregatedResult, SearchHit};

/// Collapse a flat hit sequence into one ranked entry per document.
///
/// For every distinct `document_id` in the input there is exactly one output
/// entry, and its `score` equals the maximum score among that document's
/// hits.
pub fn aggregate(hits: &[SearchHit]) -> Vec<AggregatedResult> {
    let mut groups: Vec<AggregatedResult> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for hit in hits {
        match index.get(&hit.document_id) {
            Some(&i) => {
                let entry = &mut groups[i];
                entry.match_count += 1;
                // Strict comparison: an equal score keeps the earlier hit.
                if hit.score > entry.score {
                    entry.score = hit.score;
                    entry.filename = hit.filename.clone();
                    entry.chunk_content = hit.chunk_content.clone();
                }
                if entry.document.is_none() {
                    entry.document = hit.document.clone();
                }
            }
            None => {
                index.insert(hit.document_id, groups.len());
                groups.push(AggregatedResult {
                    document_id: hit.document_id,
                    filename: hit.filename.clone(),
                    chunk_content: hit.chunk_content.clone(),
                    score: hit.score,
                    match_count: 1,
                    document: hit.document.clone(),
                });
            }
        }
    }

    // sort_by is stable, so documents with equal scores stay in
    // first-seen order.
    groups.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    groups
}

/// Truncate `text` to at most `max_chars` characters for display.
///
/// Counts characters rather than bytes, so multibyte text is never split
/// mid-character; shorter strings come back whole.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(doc: i64, score: f64, content: &str) -> SearchHit {
        SearchHit {
            document_id: doc,
            filename: format!("doc-{}.pdf", doc),
            chunk_content: content.to_string(),
            score,
            document: None,
        }
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate(&[]).is_empty());
    }

    #[test]
    fn test_aggregate_dedupes_and_ranks() {
        let hits = vec![
            hit(1, 0.9, "first chunk"),
            hit(2, 0.5, "other doc"),
            hit(1, 0.7, "second chunk"),
        ];

        let results = aggregate(&hits);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document_id, 1);
        assert!((results[0].score - 0.9).abs() < 1e-9);
        assert_eq!(results[0].match_count, 2);
        assert_eq!(results[1].document_id, 2);
        assert!((results[1].score - 0.5).abs() < 1e-9);
        assert_eq!(results[1].match_count, 1);
    }

    #[test]
    fn test_representative_is_max_score_chunk() {
        let hits = vec![
            hit(7, 0.2, "weak match"),
            hit(7, 0.8, "strong match"),
            hit(7, 0.5, "middling match"),
        ];

        let results = aggregate(&hits);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_content, "strong match");
        assert_eq!(results[0].match_count, 3);
    }

    #[test]
    fn test_score_tie_keeps_first_seen_chunk() {
        let hits = vec![hit(3, 0.6, "earlier"), hit(3, 0.6, "later")];

        let results = aggregate(&hits);

        assert_eq!(results[0].chunk_content, "earlier");
    }

    #[test]
    fn test_equal_scores_keep_document_order() {
        let hits = vec![hit(10, 0.4, "a"), hit(20, 0.4, "b"), hit(30, 0.4, "c")];

        let order: Vec<i64> = aggregate(&hits).iter().map(|r| r.document_id).collect();

        assert_eq!(order, vec![10, 20, 30]);
    }

    #[test]
    fn test_one_entry_per_document() {
        let hits = vec![
            hit(1, 0.1, "a"),
            hit(2, 0.9, "b"),
            hit(1, 0.3, "c"),
            hit(3, 0.5, "d"),
            hit(2, 0.2, "e"),
        ];

        let results = aggregate(&hits);

        assert_eq!(results.len(), 3);
        let order: Vec<i64> = results.iter().map(|r| r.document_id).collect();
        assert_eq!(order, vec![2, 3, 1]);
        for r in &results {
            let max = hits
                .iter()
                .filter(|h| h.document_id == r.document_id)
                .map(|h| h.score)
                .fold(f64::NEG_INFINITY, f64::max);
            assert!((r.score - max).abs() < 1e-9, "doc {} score", r.document_id);
        }
    }

    #[test]
    fn test_document_payload_joined_from_any_hit() {
        let mut first = hit(5, 0.9, "no payload");
        first.document = None;
        let mut second = hit(5, 0.1, "has payload");
        second.document = Some(crate::models::Document {
            id: 5,
            filename: "abc_report.pdf".to_string(),
            original_filename: "report.pdf".to_string(),
            file_type: "pdf".to_string(),
            file_size: 10,
            upload_date: chrono::Utc::now(),
            owner_id: 1,
            description: None,
            visibility: crate::models::Visibility::Private,
            tags: Vec::new(),
            last_modified: None,
            version: 1,
        });

        let results = aggregate(&[first, second]);

        assert_eq!(results.len(), 1);
        assert!(results[0].document.is_some());
        // Representative stays the higher-scored chunk.
        assert_eq!(results[0].chunk_content, "no payload");
    }

    #[test]
    fn test_excerpt_short_string_unchanged() {
        assert_eq!(excerpt("short", 200), "short");
    }

    #[test]
    fn test_excerpt_truncates_by_chars() {
        let text = "a".repeat(300);
        assert_eq!(excerpt(&text, 200).len(), 200);
    }

    #[test]
    fn test_excerpt_never_splits_multibyte() {
        let text = "é".repeat(250);
        let cut = excerpt(&text, 200);
        assert_eq!(cut.chars().count(), 200);
        assert!(cut.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_excerpt_empty() {
        assert_eq!(excerpt("", 200), "");
    }
}
