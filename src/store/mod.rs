//! Persisted key-value state for Spyglass.
//!
//! Everything Spyglass remembers between runs lives here, string-serialized
//! as JSON under short keys:
//!
//! - `token` - the GitHub bearer token
//! - `rate-limit` - the last observed rate-limit metadata
//! - `snapshot` - repositories + issues + filters, 5-minute freshness
//! - `repo-listing` - the org repository listing, 1-hour freshness per owner
//! - `issue-counts` - per-repository open/total counts, 5-minute freshness
//! - `view-mode` - the last-selected list/card preference
//!
//! The default location is `~/.local/share/spyglass/<owner-hash>/` (one
//! file per key); `SPYGLASS_DATA_DIR` overrides it for test isolation.
//! Freshness checks are pure functions of the capture timestamp and a
//! supplied `now`, so the boundaries are testable without a clock.

pub mod backend;

pub use backend::{FileBackend, MemoryBackend, StoreBackend};

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::filters::FilterState;
use crate::models::{Issue, Repository, ViewMode};
use crate::ratelimit::RateLimit;
use crate::{Error, Result};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "SPYGLASS_DATA_DIR";

/// Snapshot freshness window, in seconds.
pub const SNAPSHOT_MAX_AGE_SECS: i64 = 5 * 60;

/// Repository-listing cache freshness window, in seconds.
pub const REPO_LISTING_MAX_AGE_SECS: i64 = 60 * 60;

/// Issue-count cache freshness window, in seconds.
pub const ISSUE_COUNT_MAX_AGE_SECS: i64 = 5 * 60;

const TOKEN_KEY: &str = "token";
const RATE_LIMIT_KEY: &str = "rate-limit";
const SNAPSHOT_KEY: &str = "snapshot";
const REPO_LISTING_KEY: &str = "repo-listing";
const ISSUE_COUNTS_KEY: &str = "issue-counts";
const VIEW_MODE_KEY: &str = "view-mode";

/// Time-boxed snapshot of the session data: repository list, the full
/// issue collection, and the filters that were active at capture time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub filters: FilterState,
    pub repositories: Vec<Repository>,
    pub issues: Vec<Issue>,
    pub captured_at: DateTime<Utc>,
}

impl CacheSnapshot {
    /// Valid for read only while younger than [`SNAPSHOT_MAX_AGE_SECS`].
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now - self.captured_at < Duration::seconds(SNAPSHOT_MAX_AGE_SECS)
    }
}

/// Cached org repository listing (credentialed catalog path).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoListingCache {
    pub owner: String,
    pub repositories: Vec<Repository>,
    pub captured_at: DateTime<Utc>,
}

impl RepoListingCache {
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now - self.captured_at < Duration::seconds(REPO_LISTING_MAX_AGE_SECS)
    }
}

/// Cached open/total issue counts for one repository.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IssueCountEntry {
    pub open: u32,
    pub total: u32,
    pub captured_at: DateTime<Utc>,
}

impl IssueCountEntry {
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now - self.captured_at < Duration::seconds(ISSUE_COUNT_MAX_AGE_SECS)
    }
}

/// Typed persistence layer over a [`StoreBackend`].
pub struct Store {
    backend: Box<dyn StoreBackend>,
}

impl Store {
    /// Open the default file-backed store for an owner.
    pub fn open_default(owner: &str) -> Result<Self> {
        let root = data_dir_for(owner)?;
        Ok(Self {
            backend: Box::new(FileBackend::new(root)?),
        })
    }

    /// Open a store over an explicit backend.
    pub fn with_backend(backend: Box<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    /// In-memory store for tests.
    pub fn in_memory() -> Self {
        Self::with_backend(Box::new(MemoryBackend::new()))
    }

    /// Storage location description.
    pub fn location(&self) -> String {
        self.backend.location()
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.backend.get(key)? {
            // A corrupt entry reads as absent rather than failing the load
            Some(raw) => Ok(serde_json::from_str(&raw).ok()),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.backend.set(key, &raw)
    }

    // --- token ---

    /// The stored bearer token, if any.
    pub fn token(&self) -> Result<Option<String>> {
        self.get_json(TOKEN_KEY)
    }

    /// Store a token. Visible data may differ under different
    /// authorization, so the snapshot is dropped regardless of freshness.
    pub fn set_token(&mut self, token: &str) -> Result<()> {
        self.set_json(TOKEN_KEY, &token.to_string())?;
        self.clear_snapshot()
    }

    /// Clear the token, dropping the snapshot for the same reason.
    pub fn clear_token(&mut self) -> Result<()> {
        self.backend.remove(TOKEN_KEY)?;
        self.clear_snapshot()
    }

    // --- rate limit ---

    /// The persisted rate-limit state, default when absent.
    pub fn rate_limit(&self) -> Result<RateLimit> {
        Ok(self.get_json(RATE_LIMIT_KEY)?.unwrap_or_default())
    }

    pub fn save_rate_limit(&mut self, rate_limit: &RateLimit) -> Result<()> {
        self.set_json(RATE_LIMIT_KEY, rate_limit)
    }

    pub fn clear_rate_limit(&mut self) -> Result<()> {
        self.backend.remove(RATE_LIMIT_KEY)
    }

    // --- snapshot ---

    pub fn save_snapshot(&mut self, snapshot: &CacheSnapshot) -> Result<()> {
        self.set_json(SNAPSHOT_KEY, snapshot)
    }

    /// Load the snapshot; a stale one is treated as absent.
    pub fn load_snapshot(&self, now: DateTime<Utc>) -> Result<Option<CacheSnapshot>> {
        Ok(self
            .get_json::<CacheSnapshot>(SNAPSHOT_KEY)?
            .filter(|s| s.is_fresh_at(now)))
    }

    pub fn clear_snapshot(&mut self) -> Result<()> {
        self.backend.remove(SNAPSHOT_KEY)
    }

    // --- repository listing ---

    pub fn save_repo_listing(
        &mut self,
        owner: &str,
        repositories: &[Repository],
        now: DateTime<Utc>,
    ) -> Result<()> {
        let cache = RepoListingCache {
            owner: owner.to_string(),
            repositories: repositories.to_vec(),
            captured_at: now,
        };
        self.set_json(REPO_LISTING_KEY, &cache)
    }

    /// Load the cached listing for an owner; stale entries and entries
    /// recorded for a different owner are treated as absent.
    pub fn load_repo_listing(
        &self,
        owner: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<Repository>>> {
        Ok(self
            .get_json::<RepoListingCache>(REPO_LISTING_KEY)?
            .filter(|c| c.owner == owner && c.is_fresh_at(now))
            .map(|c| c.repositories))
    }

    // --- issue counts ---

    /// Record fetched open/total counts for one repository.
    pub fn record_issue_counts(
        &mut self,
        repo: &str,
        open: u32,
        total: u32,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut counts: BTreeMap<String, IssueCountEntry> =
            self.get_json(ISSUE_COUNTS_KEY)?.unwrap_or_default();
        counts.insert(
            repo.to_string(),
            IssueCountEntry {
                open,
                total,
                captured_at: now,
            },
        );
        self.set_json(ISSUE_COUNTS_KEY, &counts)
    }

    /// Fresh cached counts for one repository, if any.
    pub fn issue_counts(&self, repo: &str, now: DateTime<Utc>) -> Result<Option<(u32, u32)>> {
        let counts: BTreeMap<String, IssueCountEntry> =
            self.get_json(ISSUE_COUNTS_KEY)?.unwrap_or_default();
        Ok(counts
            .get(repo)
            .filter(|e| e.is_fresh_at(now))
            .map(|e| (e.open, e.total)))
    }

    // --- view mode ---

    /// The last-selected view mode, default when absent.
    pub fn view_mode(&self) -> Result<ViewMode> {
        Ok(self.get_json(VIEW_MODE_KEY)?.unwrap_or_default())
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) -> Result<()> {
        self.set_json(VIEW_MODE_KEY, &mode)
    }
}

/// Resolve the data directory for an owner.
///
/// `SPYGLASS_DATA_DIR` wins when set; otherwise the owner name is hashed
/// into a short directory under the platform data dir.
pub fn data_dir_for(owner: &str) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }

    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::Store("could not determine data directory".to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(owner.to_lowercase().as_bytes());
    let hash_hex = format!("{:x}", hasher.finalize());
    let short_hash = &hash_hex[..12];

    Ok(data_dir.join("spyglass").join(short_hash))
}
