//! Spyglass - a GitHub issues dashboard engine.
//!
//! This library provides the core functionality for the `sg` CLI tool:
//! acquiring issues across an owner's repositories through the paginated
//! GitHub REST API, caching them locally with freshness policies, and
//! deriving filtered/sorted/paginated views for display.
//!
//! The main pieces:
//! - [`catalog`] - Repository catalog loading (CSV source, org listing, built-in fallback)
//! - [`github`] - HTTP transport and GitHub API client
//! - [`ratelimit`] - Rate-limit budget tracking from response metadata
//! - [`engine`] - Per-repository issue acquisition and the global issue collection
//! - [`store`] - Persisted key-value state (token, caches, preferences)
//! - [`view`] - Pure filter/sort/paginate view-model builder
//! - [`events`] - Typed user actions and the session reducer

pub mod catalog;
pub mod cli;
pub mod engine;
pub mod events;
pub mod filters;
pub mod github;
pub mod models;
pub mod ratelimit;
pub mod store;
pub mod view;

use chrono::{DateTime, Utc};

/// Library-level error type for Spyglass operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level failure: the request produced no response at all.
    #[error("network error: {0}")]
    Network(String),

    /// The remote API answered with a non-2xx status.
    #[error("GitHub API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// A 403 response whose message indicates rate-limit exhaustion.
    #[error("GitHub API rate limit exhausted")]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    /// The structured catalog source could not be parsed.
    #[error("malformed repository catalog: {0}")]
    Catalog(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Spyglass operations.
pub type Result<T> = std::result::Result<T, Error>;
