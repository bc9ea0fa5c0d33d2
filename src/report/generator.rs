//! Markdown and CSV rendering of an [`AggregateReport`].
//!
//! Rendering is pure: these functions return text and never touch the
//! filesystem. The caller decides what gets written where.

use crate::error::{Error, Result};
use crate::models::{AggregateReport, PaperStats};
use std::collections::{BTreeMap, HashMap};

/// Default number of rows in the "reviews per paper" table.
pub const DEFAULT_TOP_N: usize = 10;

/// Render the human-readable Markdown summary.
///
/// The ranked table is truncated to `top_n` rows; the CSV export carries
/// the full per-paper table.
pub fn generate_markdown_summary(report: &AggregateReport, top_n: usize) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Review summary for `{}`\n\n", report.source));
    output.push_str(&format!("- **submissions**: {}\n", report.total_submissions));
    output.push_str(&format!("- **reviews**: {}\n", report.total_reviews));
    output.push_str(&format!("- **meta_reviews**: {}\n", report.total_meta_reviews));
    output.push_str(&format!("- **decisions**: {}\n", report.total_decisions));
    output.push('\n');

    if report.orphan_records > 0 {
        output.push_str(&format!(
            "> ⚠️ {} record(s) referenced a paper outside this fetch and were excluded.\n",
            report.orphan_records
        ));
    }
    if report.duplicate_submissions > 0 {
        output.push_str(&format!(
            "> ⚠️ {} duplicate submission(s) were dropped (first occurrence kept).\n",
            report.duplicate_submissions
        ));
    }
    if report.orphan_records > 0 || report.duplicate_submissions > 0 {
        output.push('\n');
    }

    output.push_str(&generate_ranking_section(report, top_n));
    output.push_str(&generate_distribution_section(report));
    output.push_str(&generate_rating_section(report));
    output.push_str(&generate_decision_section(report));

    output
}

/// How many papers received k reviews, for each observed k.
fn generate_distribution_section(report: &AggregateReport) -> String {
    if report.papers.is_empty() {
        return String::new();
    }

    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for paper in &report.papers {
        *counts.entry(paper.n_reviews).or_default() += 1;
    }

    let mut section = String::new();
    section.push_str("## Reviews per paper distribution\n\n");
    section.push_str("| n_reviews | n_papers |\n");
    section.push_str("|---:|---:|\n");
    for (n_reviews, n_papers) in counts {
        section.push_str(&format!("| {} | {} |\n", n_reviews, n_papers));
    }
    section.push('\n');

    section
}

/// Summary statistics over rating-like review fields, when any exist.
fn generate_rating_section(report: &AggregateReport) -> String {
    let ratings = match report.ratings {
        Some(ref r) => r,
        None => return String::new(),
    };

    let mut section = String::new();
    section.push_str("## Rating summary\n\n");
    section.push_str(&format!("- **rated values**: {}\n", ratings.n));
    section.push_str(&format!("- **min**: {:.1}\n", ratings.min));
    section.push_str(&format!("- **max**: {:.1}\n", ratings.max));
    section.push_str(&format!("- **mean**: {:.2}\n", ratings.mean));
    section.push('\n');

    section
}

/// The "Reviews per paper (top N)" table.
fn generate_ranking_section(report: &AggregateReport, top_n: usize) -> String {
    let mut section = String::new();

    section.push_str(&format!("## Reviews per paper (top {})\n\n", top_n));

    if report.papers.is_empty() {
        section.push_str("_No submissions found._\n");
        return section;
    }

    section.push_str("| paper_forum | n_reviews | title | decision |\n");
    section.push_str("|:---|---:|:---|:---|\n");
    for paper in report.papers.iter().take(top_n) {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            paper.paper_forum,
            paper.n_reviews,
            escape_markdown_cell(&paper.title),
            escape_markdown_cell(&paper.decision),
        ));
    }
    section.push('\n');

    section
}

/// Decision breakdown over all papers with a known decision.
fn generate_decision_section(report: &AggregateReport) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for paper in &report.papers {
        if !paper.decision.is_empty() {
            *counts.entry(paper.decision.as_str()).or_default() += 1;
        }
    }
    if counts.is_empty() {
        return String::new();
    }

    let mut rows: Vec<(&str, usize)> = counts.into_iter().collect();
    rows.sort_by_key(|&(decision, count)| (std::cmp::Reverse(count), decision));

    let mut section = String::new();
    section.push_str("## Decision breakdown\n\n");
    section.push_str("| decision | count |\n");
    section.push_str("|:---|---:|\n");
    for (decision, count) in rows {
        section.push_str(&format!("| {} | {} |\n", escape_markdown_cell(decision), count));
    }
    section.push('\n');

    section
}

/// Pipes and newlines break table cells.
fn escape_markdown_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// Render the full per-paper table as CSV (one row per submission,
/// not truncated to top N).
pub fn generate_summary_csv(report: &AggregateReport) -> String {
    let mut output = String::new();
    output.push_str("paper_forum,n_reviews,title,decision\n");

    for paper in &report.papers {
        output.push_str(&format!(
            "{},{},{},{}\n",
            escape_csv_field(&paper.paper_forum),
            paper.n_reviews,
            escape_csv_field(&paper.title),
            escape_csv_field(&paper.decision),
        ));
    }

    output
}

/// Quote a CSV field when it contains a delimiter, quote or newline.
fn escape_csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Parse a CSV produced by [`generate_summary_csv`] back into rows.
///
/// Quoted fields may span lines, so records are delimited by a single
/// scan that tracks quoting state instead of splitting on lines first.
#[allow(dead_code)] // Used by round-trip tests and downstream tooling
pub fn parse_summary_csv(content: &str) -> Result<Vec<PaperStats>> {
    let mut rows = Vec::new();

    for (record_no, fields) in split_csv_records(content).into_iter().enumerate() {
        if record_no == 0 {
            continue;
        }
        if fields.len() != 4 {
            return Err(Error::DataIntegrity(format!(
                "csv record {} has {} fields, expected 4",
                record_no + 1,
                fields.len()
            )));
        }
        let n_reviews = fields[1].parse::<usize>().map_err(|_| {
            Error::DataIntegrity(format!(
                "csv record {}: bad count '{}'",
                record_no + 1,
                fields[1]
            ))
        })?;
        rows.push(PaperStats {
            paper_forum: fields[0].clone(),
            n_reviews,
            n_meta_reviews: 0,
            title: fields[2].clone(),
            decision: fields[3].clone(),
        });
    }

    Ok(rows)
}

/// Split CSV content into records, honoring quoted fields (which may
/// contain commas, doubled quotes and newlines).
#[allow(dead_code)] // Companion to parse_summary_csv
fn split_csv_records(content: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
                // A bare blank line is not a record.
                if fields.len() > 1 || !fields[0].is_empty() {
                    records.push(std::mem::take(&mut fields));
                } else {
                    fields.clear();
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() || !fields.is_empty() {
        fields.push(current);
        records.push(fields);
    }

    records
}
