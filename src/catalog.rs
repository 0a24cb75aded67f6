//! Repository catalog loading.
//!
//! The catalog is the list of repositories the dashboard tracks. It is
//! resolved from the first available of three sources:
//!
//! 1. The owner's repository listing from the API (credentialed path),
//!    filtered to non-archived repositories with issue tracking enabled
//!    and cached for one hour per owner
//! 2. A structured CSV source (URL or local file) with curated display
//!    names and descriptions
//! 3. A fixed built-in list, so the dashboard stays usable with zero
//!    catalog connectivity
//!
//! The API listing and the CSV source are deliberately not merged:
//! API-sourced repositories simply lack the curated fields.

use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::github::{GithubClient, PER_PAGE, RepoRecord, Transport, USER_AGENT, decode_json};
use crate::models::Repository;
use crate::ratelimit::RateLimit;
use crate::store::Store;
use crate::{Error, Result};

/// Default owner whose repositories are tracked.
pub const DEFAULT_OWNER: &str = "ModelEarth";

/// Built-in fallback catalog: (name, display name, description, branch).
const BUILTIN_CATALOG: &[(&str, &str, &str, &str)] = &[
    ("modelearth", "ModelEarth", "Main ModelEarth repository", "master"),
    ("localsite", "LocalSite", "Core CSS/JS utilities", "main"),
    ("realitystream", "RealityStream", "ML Models and Visualization", "main"),
    ("feed", "Feed", "FeedPlayer video/gallery", "main"),
    ("swiper", "Swiper", "UI swiper components", "main"),
    ("comparison", "Comparison", "Trade Flow tools", "main"),
    ("codechat", "CodeChat", "Code chat interface", "main"),
    ("home", "Home", "Home page content", "main"),
    ("cloud", "Cloud", "Cloud platform tools", "main"),
    ("projects", "Projects", "Project showcases", "main"),
];

/// Where the structured catalog comes from.
#[derive(Debug, Clone)]
pub enum CatalogSource {
    /// Fetched over HTTP
    Url(String),
    /// Read from a local file
    File(PathBuf),
}

impl CatalogSource {
    /// Interpret a CLI argument: anything that looks like a URL is
    /// fetched, everything else is a path.
    pub fn from_arg(arg: &str) -> Self {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            Self::Url(arg.to_string())
        } else {
            Self::File(PathBuf::from(arg))
        }
    }
}

/// The fixed built-in repository list.
pub fn builtin_catalog(owner: &str) -> Vec<Repository> {
    BUILTIN_CATALOG
        .iter()
        .map(|(name, display, description, branch)| {
            let mut repo = Repository::new(*name, owner);
            repo.display_name = Some(display.to_string());
            repo.description = Some(description.to_string());
            repo.default_branch = Some(branch.to_string());
            repo
        })
        .collect()
}

/// Parse the tabular catalog text.
///
/// The first row is the header; recognized columns are `repo_name`,
/// `display_name`, `description`, and `default_branch`. Parsing is
/// defensive: ragged rows leave missing fields unset, rows without a
/// repo name are skipped. Only a missing header column or an empty
/// result fails the parse.
pub fn parse_catalog(text: &str, owner: &str) -> Result<Vec<Repository>> {
    let mut lines = text.trim().lines();
    let header = lines
        .next()
        .ok_or_else(|| Error::Catalog("empty catalog source".to_string()))?;

    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    let column = |name: &str| columns.iter().position(|c| *c == name);
    let name_idx = column("repo_name")
        .ok_or_else(|| Error::Catalog("missing repo_name column".to_string()))?;
    let display_idx = column("display_name");
    let description_idx = column("description");
    let branch_idx = column("default_branch");

    let mut repositories = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let field = |idx: Option<usize>| {
            idx.and_then(|i| fields.get(i))
                .filter(|v| !v.is_empty())
                .map(|v| v.to_string())
        };

        let Some(name) = field(Some(name_idx)) else {
            continue;
        };
        let mut repo = Repository::new(name, owner);
        repo.display_name = field(display_idx);
        repo.description = field(description_idx);
        repo.default_branch = field(branch_idx);
        repositories.push(repo);
    }

    if repositories.is_empty() {
        return Err(Error::Catalog("no repositories in catalog".to_string()));
    }
    Ok(repositories)
}

/// Load the structured source, falling back to the built-in list on any
/// failure. Never errors: the dashboard must stay usable without the
/// catalog source.
pub fn load_catalog(
    source: &CatalogSource,
    transport: &dyn Transport,
    owner: &str,
) -> Vec<Repository> {
    match try_load_source(source, transport, owner) {
        Ok(repositories) => {
            debug!(count = repositories.len(), "catalog loaded from structured source");
            repositories
        }
        Err(e) => {
            warn!("catalog source unavailable, using built-in list: {}", e);
            builtin_catalog(owner)
        }
    }
}

fn try_load_source(
    source: &CatalogSource,
    transport: &dyn Transport,
    owner: &str,
) -> Result<Vec<Repository>> {
    let text = match source {
        CatalogSource::File(path) => fs::read_to_string(path)?,
        CatalogSource::Url(url) => {
            let resp = transport.get(url, &[("User-Agent", USER_AGENT.to_string())])?;
            if !resp.is_success() {
                return Err(Error::Api {
                    status: resp.status,
                    message: resp.error_message(),
                });
            }
            resp.body
        }
    };
    parse_catalog(&text, owner)
}

/// Fetch the owner's repository listing from the API, with a 1-hour
/// persisted cache per owner. Pagination terminates when a page returns
/// fewer than the requested page size.
pub fn fetch_org_repos(
    client: &GithubClient,
    store: &mut Store,
    rate_limit: &mut RateLimit,
    owner: &str,
) -> Result<Vec<Repository>> {
    let now = Utc::now();
    if let Some(cached) = store.load_repo_listing(owner, now)? {
        debug!(owner, count = cached.len(), "repository listing served from cache");
        return Ok(cached);
    }

    let mut repositories = Vec::new();
    let mut page = 1;
    loop {
        let path = format!(
            "/orgs/{}/repos?per_page={}&page={}&type=all&sort=name",
            owner, PER_PAGE, page
        );
        let resp = client.get(&path)?;
        rate_limit.observe(resp.rate_remaining, resp.rate_reset_at());

        let records: Vec<RepoRecord> = decode_json(&resp)?;
        let batch_len = records.len();
        repositories.extend(
            records
                .into_iter()
                .filter(|r| !r.archived && r.has_issues)
                .map(RepoRecord::into_repository),
        );

        if batch_len < PER_PAGE {
            break;
        }
        page += 1;
    }

    store.save_repo_listing(owner, &repositories, now)?;
    Ok(repositories)
}

/// Resolve the repository catalog.
///
/// A credentialed client prefers the API listing; the structured source
/// (then the built-in list) covers everything else.
pub fn load(
    client: &GithubClient,
    store: &mut Store,
    rate_limit: &mut RateLimit,
    source: &CatalogSource,
    owner: &str,
) -> Vec<Repository> {
    if client.has_token() {
        match fetch_org_repos(client, store, rate_limit, owner) {
            Ok(repositories) if !repositories.is_empty() => return repositories,
            Ok(_) => debug!(owner, "organization listing empty, trying structured source"),
            Err(e) => warn!("organization listing failed, trying structured source: {}", e),
        }
    }
    load_catalog(source, client.transport(), owner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::testing::{FakeTransport, response};

    #[test]
    fn test_parse_catalog_basic() {
        let text = "repo_name,display_name,description,default_branch\n\
                    feed,Feed,Video player,main\n\
                    home,Home,Home page,master\n";
        let repos = parse_catalog(text, "acme").unwrap();

        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0].name, "feed");
        assert_eq!(repos[0].display_name.as_deref(), Some("Feed"));
        assert_eq!(repos[1].default_branch.as_deref(), Some("master"));
        assert_eq!(repos[0].url, "https://github.com/acme/feed");
    }

    #[test]
    fn test_parse_catalog_tolerates_ragged_rows() {
        let text = "repo_name,display_name,description,default_branch\n\
                    feed,Feed\n\
                    ,NoName\n\
                    home\n";
        let repos = parse_catalog(text, "acme").unwrap();

        // The row with no repo name is skipped, short rows keep what they have
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0].display_name.as_deref(), Some("Feed"));
        assert!(repos[0].description.is_none());
        assert!(repos[1].display_name.is_none());
    }

    #[test]
    fn test_parse_catalog_requires_repo_name_column() {
        let text = "name,description\nfeed,Video player\n";
        assert!(matches!(
            parse_catalog(text, "acme"),
            Err(Error::Catalog(_))
        ));
    }

    #[test]
    fn test_parse_catalog_rejects_empty() {
        assert!(parse_catalog("", "acme").is_err());
        assert!(parse_catalog("repo_name,display_name\n", "acme").is_err());
    }

    #[test]
    fn test_load_catalog_falls_back_to_builtin_on_missing_file() {
        let transport = FakeTransport::new();
        let source = CatalogSource::File(PathBuf::from("/nonexistent/repos.csv"));

        let repos = load_catalog(&source, &transport, "acme");
        assert_eq!(repos.len(), BUILTIN_CATALOG.len());
        assert_eq!(repos[0].name, "modelearth");
        assert_eq!(repos[0].display_name.as_deref(), Some("ModelEarth"));
    }

    #[test]
    fn test_load_catalog_falls_back_on_http_error() {
        let transport = FakeTransport::new();
        transport.push("https://example.com/repos.csv", response(500, "boom"));
        let source = CatalogSource::Url("https://example.com/repos.csv".to_string());

        let repos = load_catalog(&source, &transport, "acme");
        assert_eq!(repos.len(), BUILTIN_CATALOG.len());
    }

    #[test]
    fn test_load_catalog_from_url() {
        let transport = FakeTransport::new();
        transport.push_ok(
            "https://example.com/repos.csv",
            "repo_name,display_name\nfeed,Feed\n",
        );
        let source = CatalogSource::Url("https://example.com/repos.csv".to_string());

        let repos = load_catalog(&source, &transport, "acme");
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].name, "feed");
    }

    #[test]
    fn test_fetch_org_repos_filters_and_caches() {
        let transport = FakeTransport::new();
        let url = format!(
            "https://api.github.com/orgs/acme/repos?per_page={}&page=1&type=all&sort=name",
            PER_PAGE
        );
        transport.push_ok(
            &url,
            r#"[
                {"name": "feed", "html_url": "https://github.com/acme/feed", "archived": false, "has_issues": true},
                {"name": "attic", "html_url": "https://github.com/acme/attic", "archived": true, "has_issues": true},
                {"name": "mirror", "html_url": "https://github.com/acme/mirror", "archived": false, "has_issues": false}
            ]"#,
        );

        let client = GithubClient::with_transport(
            Box::new(transport.clone()),
            Some("token".to_string()),
        );
        let mut store = Store::in_memory();
        let mut rate_limit = RateLimit::default();

        let repos = fetch_org_repos(&client, &mut store, &mut rate_limit, "acme").unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].name, "feed");

        // Second call is served from the listing cache
        let again = fetch_org_repos(&client, &mut store, &mut rate_limit, "acme").unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn test_fetch_org_repos_observes_rate_limit() {
        let transport = FakeTransport::new();
        let url = format!(
            "https://api.github.com/orgs/acme/repos?per_page={}&page=1&type=all&sort=name",
            PER_PAGE
        );
        transport.push(
            &url,
            crate::github::testing::response_with_rate(200, "[]", 4321, 1_700_000_000),
        );

        let client = GithubClient::with_transport(
            Box::new(transport),
            Some("token".to_string()),
        );
        let mut store = Store::in_memory();
        let mut rate_limit = RateLimit::default();

        fetch_org_repos(&client, &mut store, &mut rate_limit, "acme").unwrap();
        assert_eq!(rate_limit.remaining, Some(4321));
    }

    #[test]
    fn test_load_without_token_skips_org_listing() {
        let transport = FakeTransport::new();
        let client = GithubClient::with_transport(Box::new(transport.clone()), None);
        let mut store = Store::in_memory();
        let mut rate_limit = RateLimit::default();
        let source = CatalogSource::File(PathBuf::from("/nonexistent/repos.csv"));

        let repos = load(&client, &mut store, &mut rate_limit, &source, "acme");
        assert_eq!(repos.len(), BUILTIN_CATALOG.len());
        // No API request was made without a token
        assert!(transport.requests().is_empty());
    }
}
