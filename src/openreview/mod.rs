//! OpenReview API access.
//!
//! This module provides the HTTP client for the notes endpoint and the
//! PDF download helper.

pub mod client;

pub use client::{ClientOptions, OpenReviewClient};
