//! Data models for Spyglass entities.
//!
//! This module defines the core data structures:
//! - `Repository` - A trackable repository belonging to the configured owner
//! - `Issue` - An issue fetched from the remote API, enriched with comments
//! - `UserRef` - A user handle with an avatar reference
//! - `Label` - An issue label with its display color
//! - `Comment` - A single issue comment
//! - `SortKey` - The available orderings for the issue view
//! - `ViewMode` - The list/card rendering preference

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Issue state as reported by the remote API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    #[default]
    Open,
    Closed,
}

impl IssueState {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user handle with an avatar reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// Login handle
    pub login: String,

    /// Avatar image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// An issue label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Label name
    pub name: String,

    /// Display color as a hex string without the leading `#`
    #[serde(default)]
    pub color: String,
}

/// A single comment on an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Login handle of the comment author
    pub author: String,

    /// Comment body
    pub body: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// An issue tracked by Spyglass.
///
/// Created by the acquisition engine from remote records; never mutated
/// after creation except to attach `comments`. The `id` is globally unique
/// across repositories and is the deduplication key for the global
/// collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Globally unique identifier assigned by the remote API
    pub id: u64,

    /// Issue number within its repository
    pub number: u64,

    /// Issue title
    pub title: String,

    /// Issue body text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Open/closed state
    pub state: IssueState,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Number of comments reported by the listing endpoint
    #[serde(default)]
    pub comment_count: u32,

    /// Assigned users
    #[serde(default)]
    pub assignees: Vec<UserRef>,

    /// Labels attached to the issue
    #[serde(default)]
    pub labels: Vec<Label>,

    /// Name of the owning repository (foreign key to `Repository::name`)
    pub repository: String,

    /// Issue author
    pub author: UserRef,

    /// Web URL for the issue detail page
    pub url: String,

    /// Comment details, populated lazily when `comment_count > 0`.
    /// Empty when enrichment failed or the issue has no comments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
}

impl Issue {
    /// Whether the issue is open.
    pub fn is_open(&self) -> bool {
        self.state == IssueState::Open
    }

    /// Whether the given login is among the assignees.
    pub fn has_assignee(&self, login: &str) -> bool {
        self.assignees.iter().any(|a| a.login == login)
    }

    /// Whether the issue carries a label with the given name.
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l.name == name)
    }
}

/// A repository tracked by Spyglass.
///
/// Created by the catalog loader; the issue counts stay `None` until the
/// acquisition engine has fetched that repository's issues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    /// Repository name, unique within the owner's namespace
    pub name: String,

    /// Curated display name (catalog source only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Short description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Default branch name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,

    /// Count of open issues, once fetched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_issue_count: Option<u32>,

    /// Count of all issues, once fetched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_issue_count: Option<u32>,

    /// Canonical web URL
    pub url: String,
}

impl Repository {
    /// Create a descriptor with no curated metadata.
    pub fn new(name: impl Into<String>, owner: &str) -> Self {
        let name = name.into();
        let url = format!("https://github.com/{}/{}", owner, name);
        Self {
            name,
            display_name: None,
            description: None,
            default_branch: None,
            open_issue_count: None,
            total_issue_count: None,
            url,
        }
    }

    /// Name to show in listings: the curated display name when present.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// Sort orderings for the issue view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Most recently updated first (default)
    #[default]
    Updated,
    /// Most recently created first
    Created,
    /// Most comments first
    Comments,
    /// Title, ascending
    Title,
    /// Issue number, descending
    Number,
}

impl SortKey {
    /// Parse a sort key from a string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "updated" => Some(Self::Updated),
            "created" => Some(Self::Created),
            "comments" => Some(Self::Comments),
            "title" => Some(Self::Title),
            "number" => Some(Self::Number),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::Created => "created",
            Self::Comments => "comments",
            Self::Title => "title",
            Self::Number => "number",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rendering preference for the issue list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// One line per issue
    #[default]
    List,
    /// Multi-line block per issue
    Card,
}

impl ViewMode {
    /// Parse a view mode from a string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "list" => Some(Self::List),
            "card" => Some(Self::Card),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Card => "card",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
