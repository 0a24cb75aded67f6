//! Issue acquisition engine.
//!
//! The engine owns the session's data state: the repository catalog, the
//! global issue collection (deduplicated by id), the per-repository fetch
//! record, and the assignee/label option sets derived for the filter UI.
//!
//! Acquisition is sequential: one repository at a time in catalog order,
//! and within a repository strictly in increasing page order, because the
//! terminal condition (an empty page) depends on the previous page's
//! result. Failures are contained per repository: pagination stops there,
//! whatever was collected is kept and merged, and other repositories are
//! unaffected. Partial results are a first-class outcome, not an
//! exception path.

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::catalog::{self, CatalogSource};
use crate::filters::FilterState;
use crate::github::{CommentRecord, GithubClient, IssueRecord, PER_PAGE, decode_json};
use crate::models::{Comment, Issue, Repository};
use crate::ratelimit::RateLimit;
use crate::store::{CacheSnapshot, Store};
use crate::{Error, Result};

/// Result of acquiring one repository's issues.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Pagination ran to the terminal empty page
    Complete { count: usize },
    /// An error interrupted pagination; the issues collected before it
    /// were kept and merged
    Partial { count: usize, error: Error },
    /// Nothing was collected
    Failed { error: Error },
}

impl FetchOutcome {
    /// Issues collected for the repository.
    pub fn count(&self) -> usize {
        match self {
            Self::Complete { count } | Self::Partial { count, .. } => *count,
            Self::Failed { .. } => 0,
        }
    }

    /// The interrupting error, if any.
    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Complete { .. } => None,
            Self::Partial { error, .. } | Self::Failed { error } => Some(error),
        }
    }

    /// Displayable summary, used in load reports.
    pub fn status(&self) -> FetchStatus {
        match self {
            Self::Complete { count } => FetchStatus::Complete { count: *count },
            Self::Partial { count, error } => FetchStatus::Partial {
                count: *count,
                error: error.to_string(),
            },
            Self::Failed { error } => FetchStatus::Failed {
                error: error.to_string(),
            },
        }
    }
}

/// Displayable form of a [`FetchOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FetchStatus {
    Complete { count: usize },
    Partial { count: usize, error: String },
    Failed { error: String },
}

/// Where a load's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadOrigin {
    Cache,
    Remote,
}

/// Report of a [`Engine::load`] run.
#[derive(Debug)]
pub struct LoadReport {
    pub origin: LoadOrigin,
    /// Per-repository outcomes, in acquisition order (empty on a cache hit)
    pub statuses: Vec<(String, FetchStatus)>,
    /// Filters restored from the snapshot, on a cache hit
    pub cached_filters: Option<FilterState>,
}

impl LoadReport {
    /// Repositories whose acquisition was interrupted.
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.statuses
            .iter()
            .filter_map(|(name, status)| match status {
                FetchStatus::Complete { .. } => None,
                FetchStatus::Partial { error, .. } | FetchStatus::Failed { error } => {
                    Some((name.as_str(), error.as_str()))
                }
            })
            .collect()
    }
}

/// The acquisition engine and the session's data state.
pub struct Engine {
    client: GithubClient,
    store: Store,
    owner: String,
    catalog_source: CatalogSource,
    rate_limit: RateLimit,
    repositories: Vec<Repository>,
    issues: Vec<Issue>,
    seen_ids: HashSet<u64>,
    fetched: HashMap<String, FetchOutcome>,
    assignee_options: BTreeSet<String>,
    label_options: BTreeSet<String>,
}

impl Engine {
    /// Create an engine. Restores persisted rate-limit state, clearing it
    /// if the reset time has already elapsed.
    pub fn new(
        client: GithubClient,
        mut store: Store,
        owner: impl Into<String>,
        catalog_source: CatalogSource,
    ) -> Self {
        let mut rate_limit = store.rate_limit().unwrap_or_default();
        if rate_limit.clear_if_elapsed(Utc::now()) {
            let _ = store.clear_rate_limit();
        }

        Self {
            client,
            store,
            owner: owner.into(),
            catalog_source,
            rate_limit,
            repositories: Vec::new(),
            issues: Vec::new(),
            seen_ids: HashSet::new(),
            fetched: HashMap::new(),
            assignee_options: BTreeSet::new(),
            label_options: BTreeSet::new(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repositories(&self) -> &[Repository] {
        &self.repositories
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Assignee logins seen across all fetched issues, sorted.
    pub fn assignee_options(&self) -> impl Iterator<Item = &str> {
        self.assignee_options.iter().map(String::as_str)
    }

    /// Label names seen across all fetched issues, sorted.
    pub fn label_options(&self) -> impl Iterator<Item = &str> {
        self.label_options.iter().map(String::as_str)
    }

    pub fn rate_limit(&self) -> &RateLimit {
        &self.rate_limit
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Load session data: a fresh snapshot when allowed, otherwise the
    /// catalog plus acquisition for the targeted repositories.
    ///
    /// Only a totally empty catalog (remote and fallback both
    /// unavailable) is a blocking error; per-repository acquisition
    /// failures are reported in the returned statuses.
    pub fn load(&mut self, filters: &FilterState, force_refresh: bool) -> Result<LoadReport> {
        if force_refresh {
            self.store.clear_snapshot()?;
            self.reset();
        } else if let Some(snapshot) = self.store.load_snapshot(Utc::now())? {
            let filters = snapshot.filters.clone();
            self.hydrate(snapshot);
            return Ok(LoadReport {
                origin: LoadOrigin::Cache,
                statuses: Vec::new(),
                cached_filters: Some(filters),
            });
        }

        self.repositories = catalog::load(
            &self.client,
            &mut self.store,
            &mut self.rate_limit,
            &self.catalog_source,
            &self.owner,
        );
        let _ = self.store.save_rate_limit(&self.rate_limit);
        if self.repositories.is_empty() {
            return Err(Error::Catalog(
                "no repositories available from any source".to_string(),
            ));
        }

        let targets: Vec<String> = if filters.is_all_repos() {
            self.repositories.iter().map(|r| r.name.clone()).collect()
        } else {
            vec![filters.repo.clone()]
        };

        let mut statuses = Vec::new();
        for name in targets {
            let status = self.fetch_repository(&name).status();
            statuses.push((name, status));
        }

        self.save_snapshot(filters)?;
        info!(
            repositories = self.repositories.len(),
            issues = self.issues.len(),
            "load complete"
        );

        Ok(LoadReport {
            origin: LoadOrigin::Remote,
            statuses,
            cached_filters: None,
        })
    }

    /// Acquire one repository's issues, idempotent per session: a
    /// repository already fetched (successfully or not) is served from
    /// the session record.
    pub fn fetch_repository(&mut self, name: &str) -> &FetchOutcome {
        if !self.fetched.contains_key(name) {
            let outcome = self.acquire(name);
            if let Some(error) = outcome.error() {
                warn!(repo = name, "issue acquisition incomplete: {}", error);
            }
            self.fetched.insert(name.to_string(), outcome);
        } else {
            debug!(repo = name, "issues served from session record");
        }
        &self.fetched[name]
    }

    /// Whether a repository has been fetched this session.
    pub fn is_fetched(&self, name: &str) -> bool {
        self.fetched.contains_key(name)
    }

    /// Capture the current session data into the persisted snapshot.
    pub fn save_snapshot(&mut self, filters: &FilterState) -> Result<()> {
        let snapshot = CacheSnapshot {
            filters: filters.clone(),
            repositories: self.repositories.clone(),
            issues: self.issues.clone(),
            captured_at: Utc::now(),
        };
        self.store.save_snapshot(&snapshot)
    }

    /// Paginate one repository, stopping on the first empty page or on
    /// the first error, and merge whatever was collected.
    fn acquire(&mut self, name: &str) -> FetchOutcome {
        let mut collected: Vec<Issue> = Vec::new();
        let mut failure: Option<Error> = None;
        let mut page = 1;

        loop {
            let path = format!(
                "/repos/{}/{}/issues?state=all&per_page={}&page={}",
                self.owner, name, PER_PAGE, page
            );
            let records: Vec<IssueRecord> = match self.api_get(&path) {
                Ok(records) => records,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };
            if records.is_empty() {
                break;
            }

            for record in records {
                // Pull requests share the issues endpoint
                if record.is_pull_request() {
                    continue;
                }
                let mut issue = record.into_issue(name);
                if issue.comment_count > 0 {
                    issue.comments = self.fetch_comments(name, issue.number);
                }
                collected.push(issue);
            }
            page += 1;
        }

        let count = collected.len();
        debug!(repo = name, count, "acquisition finished");

        match failure {
            None => {
                self.merge(name, collected);
                FetchOutcome::Complete { count }
            }
            Some(error) if count > 0 => {
                self.merge(name, collected);
                FetchOutcome::Partial { count, error }
            }
            Some(error) => FetchOutcome::Failed { error },
        }
    }

    /// Fetch the ordered comment sequence for one issue. Failure degrades
    /// to an empty sequence rather than aborting the issue fetch.
    fn fetch_comments(&mut self, repo: &str, number: u64) -> Vec<Comment> {
        let path = format!("/repos/{}/{}/issues/{}/comments", self.owner, repo, number);
        match self.api_get::<Vec<CommentRecord>>(&path) {
            Ok(records) => records.into_iter().map(CommentRecord::into_comment).collect(),
            Err(e) => {
                warn!(repo, number, "comment fetch failed, leaving comments empty: {}", e);
                Vec::new()
            }
        }
    }

    /// One API GET with rate-limit bookkeeping: metadata is observed on
    /// every response, exhaustion is recorded immediately, and the
    /// tracker is persisted (silently, persistence never fails a fetch).
    fn api_get<T: DeserializeOwned>(&mut self, path: &str) -> Result<T> {
        let resp = self.client.get(path)?;
        self.rate_limit.observe(resp.rate_remaining, resp.rate_reset_at());

        let result = decode_json(&resp);
        if let Err(Error::RateLimited { reset_at }) = &result {
            self.rate_limit.mark_exhausted(*reset_at, Utc::now());
        }
        let _ = self.store.save_rate_limit(&self.rate_limit);
        result
    }

    /// Merge fetched issues into the global collection (id-dedup), update
    /// the owning repository's counts, and fold in filter options.
    fn merge(&mut self, repo: &str, fetched: Vec<Issue>) {
        let open = fetched.iter().filter(|i| i.is_open()).count() as u32;
        let total = fetched.len() as u32;
        if let Some(entry) = self.repositories.iter_mut().find(|r| r.name == repo) {
            entry.open_issue_count = Some(open);
            entry.total_issue_count = Some(total);
        }
        let _ = self.store.record_issue_counts(repo, open, total, Utc::now());

        for issue in fetched {
            self.index_options(&issue);
            if self.seen_ids.insert(issue.id) {
                self.issues.push(issue);
            }
        }
    }

    fn index_options(&mut self, issue: &Issue) {
        for assignee in &issue.assignees {
            self.assignee_options.insert(assignee.login.clone());
        }
        for label in &issue.labels {
            self.label_options.insert(label.name.clone());
        }
    }

    /// Rebuild in-memory state from a snapshot. The per-repository fetch
    /// record is deliberately not restored: selecting a repository later
    /// refetches it, and the id-dedup merge keeps the collection
    /// duplicate-free.
    fn hydrate(&mut self, snapshot: CacheSnapshot) {
        self.reset();
        self.repositories = snapshot.repositories;
        for issue in snapshot.issues {
            self.index_options(&issue);
            if self.seen_ids.insert(issue.id) {
                self.issues.push(issue);
            }
        }
        info!(
            repositories = self.repositories.len(),
            issues = self.issues.len(),
            "session restored from snapshot"
        );
    }

    fn reset(&mut self) {
        self.repositories.clear();
        self.issues.clear();
        self.seen_ids.clear();
        self.fetched.clear();
        self.assignee_options.clear();
        self.label_options.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::testing::{FakeTransport, response, response_with_rate};
    use serde_json::json;
    use std::path::PathBuf;

    fn issue_record(id: u64, number: u64, title: &str, state: &str) -> serde_json::Value {
        json!({
            "id": id,
            "number": number,
            "title": title,
            "state": state,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z",
            "comments": 0,
            "user": {"login": "alice"},
            "html_url": format!("https://github.com/acme/repo/issues/{}", number)
        })
    }

    fn issues_url(repo: &str, page: usize) -> String {
        format!(
            "https://api.github.com/repos/acme/{}/issues?state=all&per_page={}&page={}",
            repo, PER_PAGE, page
        )
    }

    fn engine_with(transport: &FakeTransport) -> Engine {
        let client = GithubClient::with_transport(Box::new(transport.clone()), None);
        Engine::new(
            client,
            Store::in_memory(),
            "acme",
            CatalogSource::File(PathBuf::from("/nonexistent/repos.csv")),
        )
    }

    #[test]
    fn test_pagination_collects_until_empty_page() {
        let transport = FakeTransport::new();
        let page1: Vec<_> = (1..=PER_PAGE as u64)
            .map(|n| issue_record(n, n, "t", "open"))
            .collect();
        let page2 = vec![issue_record(200, 200, "t", "open")];
        transport.push_ok(&issues_url("alpha", 1), &json!(page1).to_string());
        transport.push_ok(&issues_url("alpha", 2), &json!(page2).to_string());
        // Page 3 gets the default empty response and terminates the loop

        let mut engine = engine_with(&transport);
        let outcome = engine.fetch_repository("alpha");
        assert!(matches!(outcome, FetchOutcome::Complete { count } if *count == PER_PAGE + 1));
        assert_eq!(engine.issues().len(), PER_PAGE + 1);
        assert_eq!(
            transport.requests(),
            vec![
                issues_url("alpha", 1),
                issues_url("alpha", 2),
                issues_url("alpha", 3),
            ]
        );
    }

    #[test]
    fn test_pull_requests_are_excluded() {
        let transport = FakeTransport::new();
        let mut pr = issue_record(2, 2, "A pull request", "open");
        pr["pull_request"] = json!({"url": "https://api.github.com/repos/acme/alpha/pulls/2"});
        transport.push_ok(
            &issues_url("alpha", 1),
            &json!([issue_record(1, 1, "Real issue", "open"), pr]).to_string(),
        );

        let mut engine = engine_with(&transport);
        let outcome = engine.fetch_repository("alpha");
        assert_eq!(outcome.count(), 1);
        assert_eq!(engine.issues()[0].title, "Real issue");
    }

    #[test]
    fn test_partial_failure_on_page_two_keeps_page_one() {
        let transport = FakeTransport::new();
        let page1: Vec<_> = (1..=PER_PAGE as u64)
            .map(|n| issue_record(n, n, "t", "open"))
            .collect();
        transport.push_ok(&issues_url("beta", 1), &json!(page1).to_string());
        transport.push(
            &issues_url("beta", 2),
            response(502, r#"{"message": "bad gateway"}"#),
        );
        transport.push_ok(
            &issues_url("gamma", 1),
            &json!([issue_record(900, 1, "unaffected", "open")]).to_string(),
        );

        let mut engine = engine_with(&transport);
        let outcome = engine.fetch_repository("beta");
        match outcome {
            FetchOutcome::Partial { count, error } => {
                assert_eq!(*count, PER_PAGE);
                assert!(matches!(error, Error::Api { status: 502, .. }));
            }
            other => panic!("expected Partial, got: {:?}", other),
        }
        assert_eq!(engine.issues().len(), PER_PAGE);

        // Other repositories are unaffected by beta's failure
        let outcome = engine.fetch_repository("gamma");
        assert!(matches!(outcome, FetchOutcome::Complete { count: 1 }));
        assert_eq!(engine.issues().len(), PER_PAGE + 1);
    }

    #[test]
    fn test_network_failure_with_nothing_collected_is_failed() {
        let transport = FakeTransport::new();
        transport.push_network_error(&issues_url("alpha", 1));

        let mut engine = engine_with(&transport);
        let outcome = engine.fetch_repository("alpha");
        assert!(matches!(
            outcome,
            FetchOutcome::Failed {
                error: Error::Network(_)
            }
        ));
        assert!(engine.issues().is_empty());
    }

    #[test]
    fn test_fetch_is_idempotent_per_session() {
        let transport = FakeTransport::new();
        transport.push_ok(
            &issues_url("alpha", 1),
            &json!([issue_record(1, 1, "t", "open")]).to_string(),
        );

        let mut engine = engine_with(&transport);
        engine.fetch_repository("alpha");
        let first_requests = transport.requests().len();

        engine.fetch_repository("alpha");
        assert_eq!(transport.requests().len(), first_requests);
        assert_eq!(engine.issues().len(), 1);
    }

    #[test]
    fn test_comment_enrichment() {
        let transport = FakeTransport::new();
        let mut with_comments = issue_record(1, 5, "t", "open");
        with_comments["comments"] = json!(2);
        transport.push_ok(&issues_url("alpha", 1), &json!([with_comments]).to_string());
        transport.push_ok(
            "https://api.github.com/repos/acme/alpha/issues/5/comments",
            r#"[
                {"user": {"login": "bob"}, "body": "first", "created_at": "2024-01-03T00:00:00Z"},
                {"user": {"login": "carol"}, "body": "second", "created_at": "2024-01-04T00:00:00Z"}
            ]"#,
        );

        let mut engine = engine_with(&transport);
        engine.fetch_repository("alpha");
        let issue = &engine.issues()[0];
        assert_eq!(issue.comments.len(), 2);
        assert_eq!(issue.comments[0].author, "bob");
        assert_eq!(issue.comments[1].author, "carol");
    }

    #[test]
    fn test_comment_fetch_failure_degrades_to_empty() {
        let transport = FakeTransport::new();
        let mut with_comments = issue_record(1, 5, "t", "open");
        with_comments["comments"] = json!(3);
        transport.push_ok(&issues_url("alpha", 1), &json!([with_comments]).to_string());
        transport.push_network_error("https://api.github.com/repos/acme/alpha/issues/5/comments");

        let mut engine = engine_with(&transport);
        let outcome = engine.fetch_repository("alpha");
        assert!(matches!(outcome, FetchOutcome::Complete { count: 1 }));
        let issue = &engine.issues()[0];
        assert_eq!(issue.comment_count, 3);
        assert!(issue.comments.is_empty());
    }

    #[test]
    fn test_rate_limit_exhaustion_is_recorded() {
        let transport = FakeTransport::new();
        transport.push(
            &issues_url("alpha", 1),
            response_with_rate(
                403,
                r#"{"message": "API rate limit exceeded for user"}"#,
                0,
                4_102_444_800, // far future
            ),
        );

        let mut engine = engine_with(&transport);
        let outcome = engine.fetch_repository("alpha");
        assert!(matches!(
            outcome,
            FetchOutcome::Failed {
                error: Error::RateLimited { .. }
            }
        ));
        assert_eq!(engine.rate_limit().remaining, Some(0));
        assert!(engine.rate_limit().is_exhausted(Utc::now()));
        // The tracker was persisted alongside
        assert_eq!(engine.store().rate_limit().unwrap().remaining, Some(0));
    }

    #[test]
    fn test_merge_updates_repository_counts() {
        let transport = FakeTransport::new();
        transport.push_ok(
            &issues_url("alpha", 1),
            &json!([
                issue_record(1, 1, "a", "open"),
                issue_record(2, 2, "b", "closed"),
                issue_record(3, 3, "c", "open"),
            ])
            .to_string(),
        );

        let mut engine = engine_with(&transport);
        engine.repositories = vec![Repository::new("alpha", "acme")];
        engine.fetch_repository("alpha");

        let repo = &engine.repositories()[0];
        assert_eq!(repo.open_issue_count, Some(2));
        assert_eq!(repo.total_issue_count, Some(3));
        assert_eq!(
            engine.store().issue_counts("alpha", Utc::now()).unwrap(),
            Some((2, 3))
        );
    }

    #[test]
    fn test_dedup_across_cache_restore_and_live_fetch() {
        let transport = FakeTransport::new();
        transport.push_ok(
            &issues_url("alpha", 1),
            &json!([issue_record(1, 1, "restored twice", "open"), issue_record(2, 2, "new", "open")])
                .to_string(),
        );

        let mut engine = engine_with(&transport);
        let snapshot = CacheSnapshot {
            filters: FilterState::default(),
            repositories: vec![Repository::new("alpha", "acme")],
            issues: vec![
                serde_json::from_value(json!({
                    "id": 1,
                    "number": 1,
                    "title": "restored twice",
                    "state": "open",
                    "created_at": "2024-01-01T00:00:00Z",
                    "updated_at": "2024-01-02T00:00:00Z",
                    "comment_count": 0,
                    "repository": "alpha",
                    "author": {"login": "alice"},
                    "url": "https://github.com/acme/alpha/issues/1"
                }))
                .unwrap(),
            ],
            captured_at: Utc::now(),
        };
        engine.hydrate(snapshot);
        assert_eq!(engine.issues().len(), 1);

        // Live fetch returns id 1 again plus a new id 2
        engine.fetch_repository("alpha");
        let mut ids: Vec<u64> = engine.issues().iter().map(|i| i.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_assignee_and_label_options_accumulate() {
        let transport = FakeTransport::new();
        let mut a = issue_record(1, 1, "a", "open");
        a["assignees"] = json!([{"login": "zoe"}, {"login": "adam"}]);
        a["labels"] = json!([{"name": "bug", "color": "d73a4a"}]);
        transport.push_ok(&issues_url("alpha", 1), &json!([a]).to_string());

        let mut engine = engine_with(&transport);
        engine.fetch_repository("alpha");

        // Sorted order for the filter dropdowns
        let assignees: Vec<&str> = engine.assignee_options().collect();
        assert_eq!(assignees, vec!["adam", "zoe"]);
        let labels: Vec<&str> = engine.label_options().collect();
        assert_eq!(labels, vec!["bug"]);
    }

    #[test]
    fn test_load_fetches_catalog_repos_in_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let csv = dir.path().join("repos.csv");
        std::fs::write(&csv, "repo_name,display_name\nfirst,First\nsecond,Second\n").unwrap();

        let transport = FakeTransport::new();
        transport.push_ok(
            &issues_url("first", 1),
            &json!([issue_record(1, 1, "t", "open")]).to_string(),
        );

        let client = GithubClient::with_transport(Box::new(transport.clone()), None);
        let mut engine = Engine::new(
            client,
            Store::in_memory(),
            "acme",
            CatalogSource::File(csv),
        );

        let report = engine.load(&FilterState::default(), false).unwrap();
        assert_eq!(report.origin, LoadOrigin::Remote);
        assert_eq!(report.statuses.len(), 2);
        assert_eq!(report.statuses[0].0, "first");
        assert_eq!(report.statuses[1].0, "second");
        assert!(report.failures().is_empty());

        // Sequential acquisition in catalog order
        assert_eq!(
            transport.requests(),
            vec![issues_url("first", 1), issues_url("first", 2), issues_url("second", 1)]
        );
    }

    #[test]
    fn test_load_serves_fresh_snapshot_without_network() {
        let dir = tempfile::TempDir::new().unwrap();
        let csv = dir.path().join("repos.csv");
        std::fs::write(&csv, "repo_name\nfirst\n").unwrap();

        let transport = FakeTransport::new();
        transport.push_ok(
            &issues_url("first", 1),
            &json!([issue_record(1, 1, "t", "open")]).to_string(),
        );
        let client = GithubClient::with_transport(Box::new(transport.clone()), None);
        let mut engine = Engine::new(
            client,
            Store::in_memory(),
            "acme",
            CatalogSource::File(csv.clone()),
        );
        engine.load(&FilterState::default(), false).unwrap();
        let requests_after_cold_load = transport.requests().len();

        // A second engine over the same store restores from the snapshot
        let mut engine = Engine::new(
            GithubClient::with_transport(Box::new(transport.clone()), None),
            rebuild_store(&engine),
            "acme",
            CatalogSource::File(csv),
        );
        let report = engine.load(&FilterState::default(), false).unwrap();
        assert_eq!(report.origin, LoadOrigin::Cache);
        assert!(report.cached_filters.is_some());
        assert_eq!(engine.issues().len(), 1);
        assert_eq!(transport.requests().len(), requests_after_cold_load);
    }

    // Memory-backed stores are per-instance; hand the snapshot over by
    // copying it into a fresh store.
    fn rebuild_store(engine: &Engine) -> Store {
        let snapshot = engine.store().load_snapshot(Utc::now()).unwrap().unwrap();
        let mut store = Store::in_memory();
        store.save_snapshot(&snapshot).unwrap();
        store
    }

    #[test]
    fn test_force_refresh_skips_snapshot_and_refetches() {
        let dir = tempfile::TempDir::new().unwrap();
        let csv = dir.path().join("repos.csv");
        std::fs::write(&csv, "repo_name\nfirst\n").unwrap();

        let transport = FakeTransport::new();
        let client = GithubClient::with_transport(Box::new(transport.clone()), None);
        let mut engine = Engine::new(
            client,
            Store::in_memory(),
            "acme",
            CatalogSource::File(csv),
        );

        engine.load(&FilterState::default(), false).unwrap();
        let cold_requests = transport.requests().len();

        let report = engine.load(&FilterState::default(), true).unwrap();
        assert_eq!(report.origin, LoadOrigin::Remote);
        assert!(transport.requests().len() > cold_requests);
    }

    #[test]
    fn test_load_with_specific_repo_targets_only_it() {
        let dir = tempfile::TempDir::new().unwrap();
        let csv = dir.path().join("repos.csv");
        std::fs::write(&csv, "repo_name\nfirst\nsecond\n").unwrap();

        let transport = FakeTransport::new();
        let client = GithubClient::with_transport(Box::new(transport.clone()), None);
        let mut engine = Engine::new(
            client,
            Store::in_memory(),
            "acme",
            CatalogSource::File(csv),
        );

        let filters = FilterState {
            repo: "second".to_string(),
            ..Default::default()
        };
        let report = engine.load(&filters, false).unwrap();
        assert_eq!(report.statuses.len(), 1);
        assert_eq!(report.statuses[0].0, "second");
        assert_eq!(transport.requests(), vec![issues_url("second", 1)]);
    }
}
