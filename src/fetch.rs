//! Fetch pipeline: submissions first, then each paper's reply thread.
//!
//! Replies are classified into reviews / meta-reviews / decisions by
//! matching fragments against their invitation id. Per-paper threads are
//! fetched through a bounded, order-preserving stream so the resulting
//! batch (and therefore the report) is deterministic regardless of which
//! request completes first.

use crate::error::Result;
use crate::models::{LinkedNote, Note, VenueBatch};
use crate::openreview::OpenReviewClient;
use futures::{stream, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

/// What a forum reply turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    Review,
    MetaReview,
    Decision,
    /// Author responses, public comments, the submission itself.
    Other,
}

/// Invitation-fragment matcher for forum replies.
#[derive(Debug, Clone)]
pub struct NoteClassifier {
    review_names: Vec<String>,
    meta_names: Vec<String>,
    decision_names: Vec<String>,
}

impl NoteClassifier {
    pub fn new(
        review_names: Vec<String>,
        meta_names: Vec<String>,
        decision_names: Vec<String>,
    ) -> Self {
        Self {
            review_names,
            meta_names,
            decision_names,
        }
    }

    /// Classify a reply by its invitation id.
    ///
    /// Meta-review fragments are tested before review fragments: a
    /// `Meta_Review` invitation also contains the substring `Review`, and
    /// each record must land in exactly one bucket.
    pub fn classify(&self, note: &Note) -> NoteKind {
        let invitation = note.invitation.as_deref().unwrap_or("");

        if self.decision_names.iter().any(|f| invitation.contains(f)) {
            NoteKind::Decision
        } else if self.meta_names.iter().any(|f| invitation.contains(f)) {
            NoteKind::MetaReview
        } else if self.review_names.iter().any(|f| invitation.contains(f)) {
            NoteKind::Review
        } else {
            NoteKind::Other
        }
    }
}

/// Options controlling the fetch pipeline.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Invitation suffixes to try for venue submissions, in order.
    pub inv_suffixes: Vec<String>,
    pub classifier: NoteClassifier,
    /// Maximum number of submissions to fetch in venue mode.
    pub limit: usize,
    /// Bound on concurrent per-paper thread fetches.
    pub concurrency: usize,
    pub show_progress: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            inv_suffixes: vec!["Blind_Submission".to_string(), "Submission".to_string()],
            classifier: NoteClassifier::new(
                vec!["Official_Review".to_string(), "Review".to_string()],
                vec!["Meta_Review".to_string(), "Meta-Review".to_string()],
                vec!["Decision".to_string()],
            ),
            limit: 50,
            concurrency: 4,
            show_progress: true,
        }
    }
}

/// Fetch a venue's submissions and their reply threads.
pub async fn fetch_venue(
    client: &OpenReviewClient,
    venue: &str,
    options: &FetchOptions,
) -> Result<VenueBatch> {
    info!("fetching submissions for venue {}", venue);
    let submissions = client
        .venue_submissions(venue, &options.inv_suffixes, options.limit)
        .await?;
    info!("found {} submissions", submissions.len());

    collect_batch(client, venue.to_string(), submissions, options).await
}

/// Fetch a single paper and its reply thread.
pub async fn fetch_paper(
    client: &OpenReviewClient,
    paper_id: &str,
    options: &FetchOptions,
) -> Result<VenueBatch> {
    info!("fetching single paper {}", paper_id);
    let submission = client.get_note(paper_id).await?;

    collect_batch(client, paper_id.to_string(), vec![submission], options).await
}

/// Fetch and classify reply threads for the given submissions.
async fn collect_batch(
    client: &OpenReviewClient,
    source: String,
    submissions: Vec<Note>,
    options: &FetchOptions,
) -> Result<VenueBatch> {
    let forums = unique_forums(&submissions);

    let progress = if options.show_progress {
        let pb = ProgressBar::new(forums.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    // buffered (not buffer_unordered) keeps submission order, which fixes
    // the tie-break order of the final ranking.
    let threads: Vec<(String, Result<Vec<Note>>)> = stream::iter(forums)
        .map(|forum| async move {
            let replies = client.forum_notes(&forum).await;
            (forum, replies)
        })
        .buffered(options.concurrency.max(1))
        .inspect(|_| progress.inc(1))
        .collect()
        .await;
    progress.finish_and_clear();

    let mut batch = VenueBatch {
        source,
        submissions,
        ..Default::default()
    };

    for (forum, replies) in threads {
        for note in replies? {
            // The forum query returns the submission itself; only replies
            // are review material.
            if note.id == forum {
                continue;
            }
            match options.classifier.classify(&note) {
                NoteKind::Review => batch.reviews.push(LinkedNote::new(forum.clone(), note)),
                NoteKind::MetaReview => {
                    batch.meta_reviews.push(LinkedNote::new(forum.clone(), note))
                }
                NoteKind::Decision => batch.decisions.push(LinkedNote::new(forum.clone(), note)),
                NoteKind::Other => debug!("skipping note {} ({:?})", note.id, note.invitation),
            }
        }
    }

    info!(
        "collected {} reviews, {} meta-reviews, {} decisions",
        batch.reviews.len(),
        batch.meta_reviews.len(),
        batch.decisions.len()
    );

    Ok(batch)
}

/// Forum ids to fetch, in submission order, each at most once.
///
/// A paper listed under more than one invitation suffix must not have
/// its thread fetched twice; the replies would be double-counted.
fn unique_forums(submissions: &[Note]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    submissions
        .iter()
        .map(|s| s.forum_id().to_string())
        .filter(|forum| seen.insert(forum.clone()))
        .collect()
}
