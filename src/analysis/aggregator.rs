//! Joins reviews, meta-reviews and decisions back to their submissions
//! and computes per-paper and venue-level counts.
//!
//! Counting rules:
//! - duplicate submission forum ids: first seen wins, counted as a warning;
//! - a linked record with an empty `paper_forum` is a data-integrity error;
//! - orphan records (forum id matches no submission) are counted as
//!   warnings and excluded from both the per-paper rows and the venue
//!   totals, so the header total always equals the sum of per-paper counts.

use crate::error::{Error, Result};
use crate::models::{AggregateReport, LinkedNote, Note, PaperStats, RatingSummary, VenueBatch};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// Produce the aggregate view over one fetched batch.
pub fn aggregate(batch: &VenueBatch) -> Result<AggregateReport> {
    let mut papers: Vec<PaperStats> = Vec::with_capacity(batch.submissions.len());
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut duplicate_submissions = 0usize;

    for submission in &batch.submissions {
        let forum = submission.forum_id().to_string();
        if forum.is_empty() {
            return Err(Error::DataIntegrity(format!(
                "submission {} has no forum id",
                submission.id
            )));
        }
        if index.contains_key(&forum) {
            warn!("duplicate submission for forum {}, keeping first", forum);
            duplicate_submissions += 1;
            continue;
        }
        index.insert(forum.clone(), papers.len());
        papers.push(PaperStats {
            paper_forum: forum,
            n_reviews: 0,
            n_meta_reviews: 0,
            title: submission.title().to_string(),
            decision: String::new(),
        });
    }

    let mut orphan_records = 0usize;
    let mut total_reviews = 0usize;
    let mut total_meta_reviews = 0usize;
    let mut total_decisions = 0usize;

    let mut ratings: Vec<f64> = Vec::new();

    for review in &batch.reviews {
        match lookup(&index, review, "review")? {
            Some(i) => {
                papers[i].n_reviews += 1;
                total_reviews += 1;
                ratings.extend(note_ratings(&review.note));
            }
            None => orphan_records += 1,
        }
    }

    for meta in &batch.meta_reviews {
        match lookup(&index, meta, "meta-review")? {
            Some(i) => {
                papers[i].n_meta_reviews += 1;
                total_meta_reviews += 1;
            }
            None => orphan_records += 1,
        }
    }

    for decision in &batch.decisions {
        match lookup(&index, decision, "decision")? {
            Some(i) => {
                papers[i].decision = decision.note.decision().to_string();
                total_decisions += 1;
            }
            None => orphan_records += 1,
        }
    }

    // Vec::sort_by_key is stable, so equal counts keep submission order.
    papers.sort_by_key(|p| std::cmp::Reverse(p.n_reviews));

    Ok(AggregateReport {
        source: batch.source.clone(),
        total_submissions: papers.len(),
        total_reviews,
        total_meta_reviews,
        total_decisions,
        orphan_records,
        duplicate_submissions,
        ratings: summarize_ratings(&ratings),
        papers,
    })
}

/// Collapse collected rating values into min/max/mean.
fn summarize_ratings(ratings: &[f64]) -> Option<RatingSummary> {
    if ratings.is_empty() {
        return None;
    }
    let min = ratings.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = ratings.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;
    Some(RatingSummary {
        n: ratings.len(),
        min,
        max,
        mean,
    })
}

/// All numeric ratings carried by one review's content.
fn note_ratings(note: &Note) -> Vec<f64> {
    note.content
        .iter()
        .filter(|(key, _)| is_rating_key(key))
        .filter_map(|(_, value)| extract_numeric_rating(value))
        .collect()
}

/// Content keys that carry reviewer scores.
fn is_rating_key(key: &str) -> bool {
    let key = key.to_lowercase();
    key.contains("rating") || key.contains("recommend") || key.contains("score")
}

/// Extract the leading numeric from a rating value
/// (e.g. 7 from "7: accept, good paper").
fn extract_numeric_rating(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_number(s),
        Value::Object(obj) => obj.get("value").and_then(extract_numeric_rating),
        _ => None,
    }
}

/// First number appearing in the string, digits with at most one dot.
fn leading_number(s: &str) -> Option<f64> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let rest = &s[start..];
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in rest.char_indices() {
        if c.is_ascii_digit() {
            end = i + 1;
        } else if c == '.' && !seen_dot {
            seen_dot = true;
        } else {
            break;
        }
    }
    rest[..end].parse().ok()
}

/// Resolve a linked record to its submission's index.
///
/// An empty forum id is fatal; an unknown one is an orphan (`None`).
fn lookup(
    index: &HashMap<String, usize>,
    record: &LinkedNote,
    kind: &str,
) -> Result<Option<usize>> {
    if record.paper_forum.is_empty() {
        return Err(Error::DataIntegrity(format!(
            "{} {} has no paper_forum",
            kind, record.note.id
        )));
    }
    match index.get(&record.paper_forum) {
        Some(&i) => Ok(Some(i)),
        None => {
            warn!(
                "orphan {} {} references unknown paper {}",
                kind, record.note.id, record.paper_forum
            );
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Note;
    use serde_json::json;

    fn submission(forum: &str, title: &str) -> Note {
        serde_json::from_value(json!({
            "id": forum,
            "forum": forum,
            "content": {"title": title}
        }))
        .unwrap()
    }

    fn review(id: &str, paper_forum: &str) -> LinkedNote {
        LinkedNote::new(
            paper_forum,
            Note {
                id: id.to_string(),
                ..Default::default()
            },
        )
    }

    fn decision(id: &str, paper_forum: &str, outcome: &str) -> LinkedNote {
        let note: Note = serde_json::from_value(json!({
            "id": id,
            "content": {"decision": outcome}
        }))
        .unwrap();
        LinkedNote::new(paper_forum, note)
    }

    fn batch_with_reviews(reviews_per_paper: &[(&str, usize)]) -> VenueBatch {
        let mut batch = VenueBatch {
            source: "test-venue".to_string(),
            ..Default::default()
        };
        for (forum, n) in reviews_per_paper {
            batch.submissions.push(submission(forum, forum));
            for i in 0..*n {
                batch.reviews.push(review(&format!("{}-r{}", forum, i), forum));
            }
        }
        batch
    }

    #[test]
    fn test_empty_batch_is_not_an_error() {
        let report = aggregate(&VenueBatch::default()).unwrap();
        assert_eq!(report.total_submissions, 0);
        assert_eq!(report.total_reviews, 0);
        assert_eq!(report.total_meta_reviews, 0);
        assert_eq!(report.total_decisions, 0);
        assert!(report.papers.is_empty());
    }

    #[test]
    fn test_per_paper_counts_and_totals_agree() {
        let batch = batch_with_reviews(&[("p1", 3), ("p2", 0), ("p3", 5)]);
        let report = aggregate(&batch).unwrap();

        assert_eq!(report.total_submissions, 3);
        assert_eq!(report.total_reviews, 8);
        let sum: usize = report.papers.iter().map(|p| p.n_reviews).sum();
        assert_eq!(sum, report.total_reviews);

        // Zero-review papers still get a row.
        let p2 = report.papers.iter().find(|p| p.paper_forum == "p2").unwrap();
        assert_eq!(p2.n_reviews, 0);
    }

    #[test]
    fn test_ranking_descending_with_stable_ties() {
        // P3 appears before P1 in the input and ties it at 2 reviews.
        let batch = batch_with_reviews(&[("P3", 2), ("P1", 2), ("P2", 5)]);
        let report = aggregate(&batch).unwrap();

        let order: Vec<&str> = report.papers.iter().map(|p| p.paper_forum.as_str()).collect();
        assert_eq!(order, vec!["P2", "P3", "P1"]);
    }

    #[test]
    fn test_orphans_warn_and_are_excluded() {
        let mut batch = batch_with_reviews(&[("p1", 1)]);
        batch.reviews.push(review("stray", "unknown-forum"));
        batch.decisions.push(decision("d1", "unknown-forum", "Reject"));

        let report = aggregate(&batch).unwrap();
        assert_eq!(report.orphan_records, 2);
        assert_eq!(report.total_reviews, 1);
        assert_eq!(report.total_decisions, 0);
        let sum: usize = report.papers.iter().map(|p| p.n_reviews).sum();
        assert_eq!(sum, report.total_reviews);
    }

    #[test]
    fn test_missing_paper_forum_is_fatal() {
        let mut batch = batch_with_reviews(&[("p1", 1)]);
        batch.reviews.push(review("broken", ""));

        let err = aggregate(&batch).unwrap_err();
        assert!(matches!(err, Error::DataIntegrity(_)));
    }

    #[test]
    fn test_duplicate_submissions_first_wins() {
        let mut batch = batch_with_reviews(&[("p1", 2)]);
        batch.submissions.push(submission("p1", "second copy"));

        let report = aggregate(&batch).unwrap();
        assert_eq!(report.duplicate_submissions, 1);
        assert_eq!(report.total_submissions, 1);
        assert_eq!(report.papers[0].title, "p1");
        assert_eq!(report.papers[0].n_reviews, 2);
    }

    fn rated_review(id: &str, paper_forum: &str, rating: Value) -> LinkedNote {
        let note: Note = serde_json::from_value(json!({
            "id": id,
            "content": {"rating": rating}
        }))
        .unwrap();
        LinkedNote::new(paper_forum, note)
    }

    #[test]
    fn test_extract_numeric_rating_shapes() {
        assert_eq!(extract_numeric_rating(&json!("7: Accept")), Some(7.0));
        assert_eq!(extract_numeric_rating(&json!("score of 6.5/10")), Some(6.5));
        assert_eq!(extract_numeric_rating(&json!(8)), Some(8.0));
        assert_eq!(extract_numeric_rating(&json!({"value": "3: Reject"})), Some(3.0));
        assert_eq!(extract_numeric_rating(&json!("strong accept")), None);
        assert_eq!(extract_numeric_rating(&json!(null)), None);
    }

    #[test]
    fn test_rating_keys() {
        assert!(is_rating_key("rating"));
        assert!(is_rating_key("content.Recommendation"));
        assert!(is_rating_key("confidence_score"));
        assert!(!is_rating_key("review"));
        assert!(!is_rating_key("title"));
    }

    #[test]
    fn test_rating_summary_over_counted_reviews() {
        let mut batch = batch_with_reviews(&[("p1", 0)]);
        batch.reviews.push(rated_review("r1", "p1", json!("3: Reject")));
        batch.reviews.push(rated_review("r2", "p1", json!("8: Accept")));
        // Orphan ratings never enter the summary.
        batch.reviews.push(rated_review("r3", "nowhere", json!("10")));

        let report = aggregate(&batch).unwrap();
        let ratings = report.ratings.unwrap();
        assert_eq!(ratings.n, 2);
        assert_eq!(ratings.min, 3.0);
        assert_eq!(ratings.max, 8.0);
        assert!((ratings.mean - 5.5).abs() < 1e-9);
    }

    #[test]
    fn test_no_ratings_means_no_summary() {
        let batch = batch_with_reviews(&[("p1", 2)]);
        let report = aggregate(&batch).unwrap();
        assert!(report.ratings.is_none());
    }

    #[test]
    fn test_decisions_and_meta_reviews_attach() {
        let mut batch = batch_with_reviews(&[("p1", 1), ("p2", 1)]);
        batch.meta_reviews.push(review("m1", "p1"));
        batch
            .decisions
            .push(decision("d1", "p1", "Accept: notable-top-25%"));
        batch.decisions.push(decision("d2", "p2", "Reject"));

        let report = aggregate(&batch).unwrap();
        assert_eq!(report.total_meta_reviews, 1);
        assert_eq!(report.total_decisions, 2);

        let p1 = report.papers.iter().find(|p| p.paper_forum == "p1").unwrap();
        assert_eq!(p1.n_meta_reviews, 1);
        assert_eq!(p1.decision, "Accept: notable-top-25%");
        let p2 = report.papers.iter().find(|p| p.paper_forum == "p2").unwrap();
        assert_eq!(p2.decision, "Reject");
    }
}
