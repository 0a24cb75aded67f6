//! GitHub API transport and client.
//!
//! This module provides the HTTP edge of the acquisition layer:
//! - `Transport` - the seam between the engine and the network, so tests
//!   can script responses without a server
//! - `UreqTransport` - the real blocking HTTP implementation
//! - `GithubClient` - request construction (base URL, auth, API headers)
//! - Wire-format records for the issues, comments, and repository listing
//!   endpoints, deserializing only the fields we care about
//!
//! Non-2xx responses are returned as data (`ApiResponse`), not errors, so
//! rate-limit metadata stays observable on every response; `decode_json`
//! maps them into the error taxonomy afterwards.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::models::{Comment, Issue, IssueState, Label, Repository, UserRef};
use crate::{Error, Result};

/// GitHub API base URL
pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// User-Agent header required by the GitHub API
pub const USER_AGENT: &str = "spyglass-cli";

/// API version header value
const API_VERSION: &str = "2022-11-28";

/// Page size used for all paginated listings
pub const PER_PAGE: usize = 100;

/// A response from the remote API.
///
/// Carries the rate-limit metadata from the response headers regardless of
/// status, so the tracker can observe every call.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: String,
    /// `x-ratelimit-remaining` header, when present
    pub rate_remaining: Option<u32>,
    /// `x-ratelimit-reset` header (epoch seconds), when present
    pub rate_reset: Option<i64>,
}

impl ApiResponse {
    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether this is a 403 whose message indicates rate-limit exhaustion.
    pub fn is_rate_limit_exhaustion(&self) -> bool {
        self.status == 403 && self.error_message().to_lowercase().contains("rate limit")
    }

    /// The reset time from the rate-limit headers, as a timestamp.
    pub fn rate_reset_at(&self) -> Option<DateTime<Utc>> {
        self.rate_reset.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// Extract the structured error message from the body, falling back to
    /// the raw body text.
    pub fn error_message(&self) -> String {
        #[derive(Deserialize)]
        struct ErrorBody {
            message: String,
        }

        serde_json::from_str::<ErrorBody>(&self.body)
            .map(|e| e.message)
            .unwrap_or_else(|_| self.body.trim().to_string())
    }
}

/// Transport seam for remote calls.
///
/// `Err` is reserved for transport-level failures (no response at all);
/// a non-2xx status comes back as an `ApiResponse` like any other.
pub trait Transport {
    /// Issue a GET request with the given headers.
    fn get(&self, url: &str, headers: &[(&str, String)]) -> Result<ApiResponse>;
}

/// Blocking HTTP transport backed by ureq.
pub struct UreqTransport;

impl UreqTransport {
    fn convert(resp: ureq::Response) -> Result<ApiResponse> {
        let status = resp.status();
        let rate_remaining = resp
            .header("x-ratelimit-remaining")
            .and_then(|v| v.parse().ok());
        let rate_reset = resp.header("x-ratelimit-reset").and_then(|v| v.parse().ok());
        let body = resp
            .into_string()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(ApiResponse {
            status,
            body,
            rate_remaining,
            rate_reset,
        })
    }
}

impl Transport for UreqTransport {
    fn get(&self, url: &str, headers: &[(&str, String)]) -> Result<ApiResponse> {
        let mut request = ureq::get(url);
        for (name, value) in headers {
            request = request.set(name, value);
        }

        match request.call() {
            Ok(resp) => Self::convert(resp),
            Err(ureq::Error::Status(_, resp)) => Self::convert(resp),
            Err(e) => Err(Error::Network(e.to_string())),
        }
    }
}

/// Client for the GitHub REST API.
///
/// Builds request URLs and headers; the bearer token is passed through
/// as-is, never validated or refreshed.
pub struct GithubClient {
    transport: Box<dyn Transport>,
    base_url: String,
    token: Option<String>,
}

impl GithubClient {
    /// Create a client over the real HTTP transport.
    pub fn new(token: Option<String>) -> Self {
        Self::with_transport(Box::new(UreqTransport), token)
    }

    /// Create a client over an explicit transport (used by tests).
    pub fn with_transport(transport: Box<dyn Transport>, token: Option<String>) -> Self {
        Self {
            transport,
            base_url: GITHUB_API_BASE.to_string(),
            token,
        }
    }

    /// Whether a bearer token is configured.
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// The underlying transport, for non-API fetches (catalog source).
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// GET an API path (leading slash), with auth and API headers.
    pub fn get(&self, path: &str) -> Result<ApiResponse> {
        let url = format!("{}{}", self.base_url, path);
        let mut headers: Vec<(&str, String)> = vec![
            ("Accept", "application/vnd.github+json".to_string()),
            ("User-Agent", USER_AGENT.to_string()),
            ("X-GitHub-Api-Version", API_VERSION.to_string()),
        ];
        if let Some(token) = &self.token {
            headers.push(("Authorization", format!("Bearer {}", token)));
        }

        self.transport.get(&url, &headers)
    }
}

/// Decode a JSON API response, mapping non-2xx statuses into the error
/// taxonomy. Rate-limit exhaustion is distinguished from other remote
/// errors so callers can record it.
pub fn decode_json<T: DeserializeOwned>(resp: &ApiResponse) -> Result<T> {
    if resp.is_rate_limit_exhaustion() {
        return Err(Error::RateLimited {
            reset_at: resp.rate_reset_at(),
        });
    }
    if !resp.is_success() {
        return Err(Error::Api {
            status: resp.status,
            message: resp.error_message(),
        });
    }

    Ok(serde_json::from_str(&resp.body)?)
}

/// A user reference as it appears on the wire.
#[derive(Debug, Deserialize)]
pub struct UserRecord {
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl UserRecord {
    fn into_user_ref(self) -> UserRef {
        UserRef {
            login: self.login,
            avatar_url: self.avatar_url,
        }
    }
}

/// A label as it appears on the wire.
#[derive(Debug, Deserialize)]
pub struct LabelRecord {
    pub name: String,
    #[serde(default)]
    pub color: String,
}

/// An entry from the issues listing endpoint (only fields we care about).
///
/// Pull requests share this endpoint; they carry a `pull_request` marker
/// and are not domain issues.
#[derive(Debug, Deserialize)]
pub struct IssueRecord {
    pub id: u64,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: IssueState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub comments: u32,
    #[serde(default)]
    pub assignees: Vec<UserRecord>,
    #[serde(default)]
    pub labels: Vec<LabelRecord>,
    pub user: UserRecord,
    pub html_url: String,
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl IssueRecord {
    /// Whether this listing entry is actually a pull request.
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    /// Convert into a domain issue owned by the given repository.
    pub fn into_issue(self, repository: &str) -> Issue {
        Issue {
            id: self.id,
            number: self.number,
            title: self.title,
            body: self.body,
            state: self.state,
            created_at: self.created_at,
            updated_at: self.updated_at,
            comment_count: self.comments,
            assignees: self
                .assignees
                .into_iter()
                .map(UserRecord::into_user_ref)
                .collect(),
            labels: self
                .labels
                .into_iter()
                .map(|l| Label {
                    name: l.name,
                    color: l.color,
                })
                .collect(),
            repository: repository.to_string(),
            author: self.user.into_user_ref(),
            url: self.html_url,
            comments: Vec::new(),
        }
    }
}

/// A comment as it appears on the wire.
#[derive(Debug, Deserialize)]
pub struct CommentRecord {
    pub user: UserRecord,
    #[serde(default)]
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl CommentRecord {
    /// Convert into a domain comment.
    pub fn into_comment(self) -> Comment {
        Comment {
            author: self.user.login,
            body: self.body,
            created_at: self.created_at,
        }
    }
}

/// An entry from the org repository listing (only fields we care about).
#[derive(Debug, Deserialize)]
pub struct RepoRecord {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub has_issues: bool,
}

impl RepoRecord {
    /// Convert into a repository descriptor. API-sourced repositories have
    /// no curated display name.
    pub fn into_repository(self) -> Repository {
        Repository {
            name: self.name,
            display_name: None,
            description: self.description,
            default_branch: self.default_branch,
            open_issue_count: None,
            total_issue_count: None,
            url: self.html_url,
        }
    }
}
