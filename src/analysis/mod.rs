//! Aggregation of fetched review metadata.

pub mod aggregator;

pub use aggregator::aggregate;
