//! Report rendering (Markdown summary and CSV export).

pub mod generator;

pub use generator::{generate_markdown_summary, generate_summary_csv};
