//! Data models for review metadata.
//!
//! This module contains the raw API record type (`Note`), the joined
//! per-run collections (`VenueBatch`), and the derived aggregate view
//! (`AggregateReport`) rendered by the reporter.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A raw note as returned by the OpenReview `/notes` endpoint.
///
/// Submissions, reviews, meta-reviews and decisions all share this shape;
/// they are distinguished by their `invitation` and their position in the
/// forum thread.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    #[serde(default)]
    pub forum: Option<String>,
    #[serde(default)]
    pub replyto: Option<String>,
    #[serde(default)]
    pub invitation: Option<String>,
    #[serde(default)]
    pub signatures: Vec<String>,
    #[serde(default)]
    pub readers: Vec<String>,
    #[serde(default)]
    pub writers: Vec<String>,
    #[serde(default)]
    pub cdate: Option<i64>,
    #[serde(default)]
    pub tcdate: Option<i64>,
    #[serde(default)]
    pub tmdate: Option<i64>,
    /// Free-form content fields (title, decision, review text, ratings...).
    #[serde(default)]
    pub content: Map<String, Value>,
}

impl Note {
    /// The forum id this note belongs to, falling back to its own id
    /// (a submission is the root of its own forum).
    pub fn forum_id(&self) -> &str {
        self.forum.as_deref().unwrap_or(&self.id)
    }

    /// Look up a string content field, trying each key in order.
    ///
    /// Handles both the flat v1 shape (`"title": "..."`) and the v2 shape
    /// (`"title": {"value": "..."}`).
    pub fn content_str(&self, keys: &[&str]) -> Option<&str> {
        for key in keys {
            match self.content.get(*key) {
                Some(Value::String(s)) => return Some(s),
                Some(Value::Object(obj)) => {
                    if let Some(Value::String(s)) = obj.get("value") {
                        return Some(s);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Submission title, empty string if absent.
    pub fn title(&self) -> &str {
        self.content_str(&["title", "Title"]).unwrap_or("")
    }

    /// Decision string carried by a decision note, empty string if absent.
    pub fn decision(&self) -> &str {
        self.content_str(&["decision", "Decision"]).unwrap_or("")
    }
}

/// A note joined to its parent submission's forum id.
///
/// Reviews, meta-reviews and decisions are carried in this form; the
/// `paper_forum` is filled during the fetch and validated by the
/// aggregator (empty means the linkage was lost).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedNote {
    pub paper_forum: String,
    #[serde(flatten)]
    pub note: Note,
}

impl LinkedNote {
    pub fn new(paper_forum: impl Into<String>, note: Note) -> Self {
        Self {
            paper_forum: paper_forum.into(),
            note,
        }
    }
}

/// Everything fetched for one run: the four flat collections.
///
/// All entities are read-only snapshots of one fetch; nothing here is
/// mutated after the fetch completes.
#[derive(Debug, Clone, Default)]
pub struct VenueBatch {
    /// Venue id or paper id the batch was fetched for (report label).
    pub source: String,
    pub submissions: Vec<Note>,
    pub reviews: Vec<LinkedNote>,
    pub meta_reviews: Vec<LinkedNote>,
    pub decisions: Vec<LinkedNote>,
}

/// Per-paper counters and join results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperStats {
    pub paper_forum: String,
    pub n_reviews: usize,
    pub n_meta_reviews: usize,
    pub title: String,
    pub decision: String,
}

/// Summary statistics over numeric ratings found in review content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RatingSummary {
    /// Number of rating values found.
    pub n: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Derived, read-only view over one batch.
///
/// `papers` is sorted descending by review count; ties keep the
/// submissions' fetch order (stable sort).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateReport {
    pub source: String,
    pub total_submissions: usize,
    pub total_reviews: usize,
    pub total_meta_reviews: usize,
    pub total_decisions: usize,
    /// Linked records whose forum id matched no fetched submission.
    /// Excluded from per-paper rows and from the totals above.
    pub orphan_records: usize,
    /// Submissions sharing a forum id with an earlier one (first wins).
    pub duplicate_submissions: usize,
    /// Present when any counted review carried a rating-like field.
    pub ratings: Option<RatingSummary>,
    pub papers: Vec<PaperStats>,
}
