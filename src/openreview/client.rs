//! HTTP client for the OpenReview notes API.
//!
//! Two query shapes are used: "by invitation, paged, up to a limit"
//! (venue mode) and "by single note/forum id" (paper mode). The client
//! performs no retries beyond reqwest's defaults.

use crate::error::{Error, Result};
use crate::models::Note;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Page size for offset-based pagination of the notes endpoint.
const PAGE_SIZE: usize = 1000;

/// PDFs are served from the web host, not the API host.
const PDF_BASE: &str = "https://openreview.net";

/// Options for constructing an [`OpenReviewClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// API base URL, e.g. `https://api.openreview.net`.
    pub baseurl: String,
    /// Optional bearer token for venues requiring authentication.
    pub token: Option<String>,
    /// Per-request timeout.
    pub timeout_seconds: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            baseurl: "https://api.openreview.net".to_string(),
            token: None,
            timeout_seconds: 30,
        }
    }
}

/// Response envelope of the `/notes` endpoint.
#[derive(Debug, Deserialize)]
struct NotesResponse {
    #[serde(default)]
    notes: Vec<Note>,
}

/// Client for the OpenReview notes API.
pub struct OpenReviewClient {
    http: reqwest::Client,
    baseurl: String,
    token: Option<String>,
}

impl OpenReviewClient {
    /// Build a client with the given options.
    pub fn new(options: ClientOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .map_err(|e| Error::Fetch(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            baseurl: options.baseurl.trim_end_matches('/').to_string(),
            token: options.token,
        })
    }

    /// Map a reqwest failure to a one-line cause.
    fn fetch_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Fetch(format!("request to {} timed out", self.baseurl))
        } else if e.is_connect() {
            Error::Fetch(format!("cannot connect to {}", self.baseurl))
        } else {
            Error::Fetch(e.to_string())
        }
    }

    /// Issue one GET against `/notes` with the given query parameters.
    async fn get_notes(&self, query: &[(&str, String)]) -> Result<Vec<Note>> {
        let url = format!("{}/notes", self.baseurl);
        debug!("GET {} {:?}", url, query);

        let mut request = self.http.get(&url).query(query);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.fetch_error(e))?;

        if !response.status().is_success() {
            return Err(Error::Fetch(format!(
                "{} returned HTTP {}",
                url,
                response.status()
            )));
        }

        let body: NotesResponse = response
            .json()
            .await
            .map_err(|e| Error::Fetch(format!("invalid API response: {}", e)))?;

        Ok(body.notes)
    }

    /// Fetch a single note by id (single-paper mode).
    pub async fn get_note(&self, id: &str) -> Result<Note> {
        let notes = self.get_notes(&[("id", id.to_string())]).await?;
        notes
            .into_iter()
            .next()
            .ok_or_else(|| Error::Fetch(format!("no note found for id {}", id)))
    }

    /// Fetch all notes in a forum thread (the submission and its replies).
    pub async fn forum_notes(&self, forum_id: &str) -> Result<Vec<Note>> {
        let mut all = Vec::new();
        let mut offset = 0usize;

        loop {
            let page = self
                .get_notes(&[
                    ("forum", forum_id.to_string()),
                    ("offset", offset.to_string()),
                    ("limit", PAGE_SIZE.to_string()),
                ])
                .await?;
            let page_len = page.len();
            all.extend(page);
            if page_len < PAGE_SIZE {
                break;
            }
            offset += page_len;
        }

        Ok(all)
    }

    /// Fetch submissions for a venue, trying each invitation suffix in
    /// order and deduplicating by note id, up to `limit` submissions.
    pub async fn venue_submissions(
        &self,
        venue: &str,
        inv_suffixes: &[String],
        limit: usize,
    ) -> Result<Vec<Note>> {
        let mut results: Vec<Note> = Vec::new();
        let mut seen_ids = std::collections::HashSet::new();

        for suffix in inv_suffixes {
            let invitation = format!("{}/-/{}", venue, suffix);
            let mut offset = 0usize;

            loop {
                let page_limit = PAGE_SIZE.min(limit.saturating_sub(results.len()).max(1));
                let page = self
                    .get_notes(&[
                        ("invitation", invitation.clone()),
                        ("offset", offset.to_string()),
                        ("limit", page_limit.to_string()),
                    ])
                    .await?;
                if page.is_empty() {
                    break;
                }

                offset += page.len();
                let page_len = page.len();
                for note in page {
                    if seen_ids.insert(note.id.clone()) {
                        results.push(note);
                        if results.len() >= limit {
                            return Ok(results);
                        }
                    }
                }
                if page_len < page_limit {
                    break;
                }
            }
        }

        Ok(results)
    }

    /// Download a submission's PDF into `dest_dir`.
    ///
    /// Returns the written path, or `None` when the platform has no PDF
    /// for the note (non-200 or wrong content type, logged as a warning).
    pub async fn download_pdf(&self, note_id: &str, dest_dir: &Path) -> Result<Option<PathBuf>> {
        let url = format!("{}/pdf", PDF_BASE);

        let response = self
            .http
            .get(&url)
            .query(&[("id", note_id)])
            .send()
            .await
            .map_err(|e| self.fetch_error(e))?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if !response.status().is_success() || !content_type.starts_with("application/pdf") {
            warn!("no PDF available for {}", note_id);
            return Ok(None);
        }

        let bytes = response.bytes().await.map_err(|e| self.fetch_error(e))?;
        let path = dest_dir.join(format!("{}.pdf", sanitize_filename(note_id)));
        std::fs::write(&path, &bytes)?;

        Ok(Some(path))
    }
}

/// Replace characters that are unsafe in filenames.
pub fn sanitize_filename(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '.' | '-' => c,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("abc123"), "abc123");
        assert_eq!(sanitize_filename("a/b\\c d"), "a_b_c_d");
        assert_eq!(sanitize_filename("  x.y-z  "), "x.y-z");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = OpenReviewClient::new(ClientOptions {
            baseurl: "https://api.openreview.net/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.baseurl, "https://api.openreview.net");
    }

    #[test]
    fn test_default_options() {
        let options = ClientOptions::default();
        assert_eq!(options.baseurl, "https://api.openreview.net");
        assert!(options.token.is_none());
    }
}
