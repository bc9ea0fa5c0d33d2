//! Raw-record export: JSONL snapshots and the run manifest.
//!
//! Content fields are flattened to `content.<key>` columns so the JSONL
//! files load cleanly into tabular tooling. Non-scalar content values are
//! stored as their JSON string form.

use crate::error::Result;
use crate::models::{LinkedNote, Note, VenueBatch};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Flatten a note into a single-level row.
pub fn flat_row(note: &Note) -> Map<String, Value> {
    let mut row = Map::new();
    row.insert("id".to_string(), Value::String(note.id.clone()));
    row.insert("forum".to_string(), json_opt(&note.forum));
    row.insert("replyto".to_string(), json_opt(&note.replyto));
    row.insert("invitation".to_string(), json_opt(&note.invitation));
    row.insert(
        "signatures".to_string(),
        Value::String(note.signatures.join(",")),
    );
    row.insert("readers".to_string(), Value::String(note.readers.join(",")));
    row.insert("writers".to_string(), Value::String(note.writers.join(",")));
    row.insert("cdate".to_string(), json_i64(note.cdate));
    row.insert("tcdate".to_string(), json_i64(note.tcdate));
    row.insert("tmdate".to_string(), json_i64(note.tmdate));

    for (key, value) in &note.content {
        let flat = match value {
            Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null => value.clone(),
            other => Value::String(other.to_string()),
        };
        row.insert(format!("content.{}", key), flat);
    }

    row
}

fn json_opt(v: &Option<String>) -> Value {
    v.as_ref().map_or(Value::Null, |s| Value::String(s.clone()))
}

fn json_i64(v: Option<i64>) -> Value {
    v.map_or(Value::Null, Value::from)
}

/// Flatten a linked note, adding its `paper_forum` column.
pub fn flat_linked_row(record: &LinkedNote) -> Map<String, Value> {
    let mut row = flat_row(&record.note);
    row.insert(
        "paper_forum".to_string(),
        Value::String(record.paper_forum.clone()),
    );
    row
}

/// Write one JSON object per line.
fn write_jsonl<'a, I>(path: &Path, rows: I) -> Result<()>
where
    I: Iterator<Item = Map<String, Value>>,
{
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for row in rows {
        serde_json::to_writer(&mut writer, &row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the four JSONL snapshots into `outdir`.
pub fn export_batch(outdir: &Path, batch: &VenueBatch) -> Result<()> {
    write_jsonl(
        &outdir.join("submissions.jsonl"),
        batch.submissions.iter().map(flat_row),
    )?;
    write_jsonl(
        &outdir.join("reviews.jsonl"),
        batch.reviews.iter().map(flat_linked_row),
    )?;
    write_jsonl(
        &outdir.join("meta_reviews.jsonl"),
        batch.meta_reviews.iter().map(flat_linked_row),
    )?;
    write_jsonl(
        &outdir.join("decisions.jsonl"),
        batch.decisions.iter().map(flat_linked_row),
    )?;

    info!("wrote JSONL snapshots to {}", outdir.display());
    Ok(())
}

/// What was asked of this run, recorded next to its outputs.
#[derive(Debug, Serialize)]
pub struct RunManifest {
    pub venue: Option<String>,
    pub paper_id: Option<String>,
    pub limit: usize,
    pub outdir: String,
    pub with_pdfs: bool,
    pub summary_csv: bool,
    pub ts: i64,
}

impl RunManifest {
    pub fn new(
        venue: Option<String>,
        paper_id: Option<String>,
        limit: usize,
        outdir: &Path,
        with_pdfs: bool,
        summary_csv: bool,
    ) -> Self {
        Self {
            venue,
            paper_id,
            limit,
            outdir: outdir.display().to_string(),
            with_pdfs,
            summary_csv,
            ts: Utc::now().timestamp(),
        }
    }

    /// Write the manifest as `log.json` in `outdir`.
    pub fn write(&self, outdir: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(outdir.join("log.json"), content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn note(v: Value) -> Note {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_flat_row_scalars_and_nested() {
        let row = flat_row(&note(json!({
            "id": "n1",
            "forum": "f1",
            "signatures": ["a", "b"],
            "readers": ["everyone"],
            "writers": ["venue", "authors"],
            "content": {
                "title": "T",
                "rating": 7,
                "authors": ["x", "y"]
            }
        })));

        assert_eq!(row["id"], "n1");
        assert_eq!(row["signatures"], "a,b");
        assert_eq!(row["readers"], "everyone");
        assert_eq!(row["writers"], "venue,authors");
        assert_eq!(row["content.title"], "T");
        assert_eq!(row["content.rating"], 7);
        // Non-scalar content is stringified.
        assert_eq!(row["content.authors"], "[\"x\",\"y\"]");
    }

    #[test]
    fn test_flat_linked_row_adds_paper_forum() {
        let record = LinkedNote::new("f9", note(json!({"id": "r1"})));
        let row = flat_linked_row(&record);
        assert_eq!(row["paper_forum"], "f9");
    }

    #[test]
    fn test_export_batch_writes_four_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut batch = VenueBatch {
            source: "v".to_string(),
            ..Default::default()
        };
        batch.submissions.push(note(json!({"id": "s1", "forum": "s1"})));
        batch
            .reviews
            .push(LinkedNote::new("s1", note(json!({"id": "r1"}))));

        export_batch(dir.path(), &batch).unwrap();

        for name in [
            "submissions.jsonl",
            "reviews.jsonl",
            "meta_reviews.jsonl",
            "decisions.jsonl",
        ] {
            assert!(dir.path().join(name).exists(), "{} missing", name);
        }

        let reviews = std::fs::read_to_string(dir.path().join("reviews.jsonl")).unwrap();
        assert_eq!(reviews.lines().count(), 1);
        let row: Value = serde_json::from_str(reviews.lines().next().unwrap()).unwrap();
        assert_eq!(row["paper_forum"], "s1");
    }

    #[test]
    fn test_manifest_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = RunManifest::new(
            Some("ICLR.cc/2024/Conference".to_string()),
            None,
            50,
            dir.path(),
            false,
            true,
        );
        manifest.write(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join("log.json")).unwrap();
        let value: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["venue"], "ICLR.cc/2024/Conference");
        assert_eq!(value["limit"], 50);
        assert!(value["ts"].as_i64().unwrap() > 0);
    }
}
