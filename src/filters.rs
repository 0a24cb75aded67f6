//! Filter state and the shareable fragment codec.
//!
//! The active filters are a single session-scoped value, mutated only
//! through explicit actions (see [`crate::events`]). They round-trip
//! through a compact query-string fragment (`repo=feed&state=closed`)
//! so a filtered view is a shareable, bookmarkable string; default and
//! empty values are omitted from the encoding.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::models::{Issue, IssueState, SortKey};

/// Repository selection matching every repository.
pub const ALL_REPOSITORIES: &str = "all";

/// Issue-state filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateFilter {
    #[default]
    Open,
    Closed,
    All,
}

impl StateFilter {
    /// Parse a state filter from a string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        }
    }

    /// Whether an issue state passes this filter.
    pub fn matches(&self, state: IssueState) -> bool {
        match self {
            Self::Open => state == IssueState::Open,
            Self::Closed => state == IssueState::Closed,
            Self::All => true,
        }
    }
}

/// Assignee filter: any, explicitly unassigned, or a specific login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AssigneeFilter {
    #[default]
    Any,
    Unassigned,
    Login(String),
}

impl AssigneeFilter {
    /// Parse from the string form. Anything that is not one of the
    /// sentinels is a login.
    pub fn from_str(s: &str) -> Self {
        match s {
            "all" => Self::Any,
            "unassigned" => Self::Unassigned,
            login => Self::Login(login.to_string()),
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Any => "all",
            Self::Unassigned => "unassigned",
            Self::Login(login) => login,
        }
    }

    /// Whether an issue passes this filter.
    pub fn matches(&self, issue: &Issue) -> bool {
        match self {
            Self::Any => true,
            Self::Unassigned => issue.assignees.is_empty(),
            Self::Login(login) => issue.has_assignee(login),
        }
    }
}

impl Serialize for AssigneeFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AssigneeFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from_str(&s))
    }
}

/// Label filter: any, or a specific label name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LabelFilter {
    #[default]
    Any,
    Name(String),
}

impl LabelFilter {
    /// Parse from the string form.
    pub fn from_str(s: &str) -> Self {
        match s {
            "all" => Self::Any,
            name => Self::Name(name.to_string()),
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Any => "all",
            Self::Name(name) => name,
        }
    }

    /// Whether an issue passes this filter.
    pub fn matches(&self, issue: &Issue) -> bool {
        match self {
            Self::Any => true,
            Self::Name(name) => issue.has_label(name),
        }
    }
}

impl Serialize for LabelFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LabelFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from_str(&s))
    }
}

/// The active filter set.
///
/// `repo` is either [`ALL_REPOSITORIES`] or a repository name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default = "default_repo")]
    pub repo: String,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub state: StateFilter,
    #[serde(default)]
    pub assignee: AssigneeFilter,
    #[serde(default)]
    pub label: LabelFilter,
    #[serde(default)]
    pub search: String,
}

fn default_repo() -> String {
    ALL_REPOSITORIES.to_string()
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            repo: default_repo(),
            sort: SortKey::default(),
            state: StateFilter::default(),
            assignee: AssigneeFilter::default(),
            label: LabelFilter::default(),
            search: String::new(),
        }
    }
}

impl FilterState {
    /// Whether the repository selection matches every repository.
    pub fn is_all_repos(&self) -> bool {
        self.repo == ALL_REPOSITORIES
    }

    /// Encode into the shareable fragment form, omitting default and
    /// empty values. The default filter set encodes to an empty string.
    pub fn to_fragment(&self) -> String {
        let defaults = Self::default();
        let mut pairs: Vec<(&str, &str)> = Vec::new();

        if self.repo != defaults.repo {
            pairs.push(("repo", &self.repo));
        }
        if self.sort != defaults.sort {
            pairs.push(("sort", self.sort.as_str()));
        }
        if self.assignee != defaults.assignee {
            pairs.push(("assignee", self.assignee.as_str()));
        }
        if self.state != defaults.state {
            pairs.push(("state", self.state.as_str()));
        }
        if self.label != defaults.label {
            pairs.push(("label", self.label.as_str()));
        }
        if !self.search.is_empty() {
            pairs.push(("search", &self.search));
        }

        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, encode_component(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Decode from the fragment form. Unknown keys and unparsable values
    /// are ignored; a leading `#` is tolerated.
    pub fn from_fragment(fragment: &str) -> Self {
        let mut filters = Self::default();
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);

        for pair in fragment.split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let value = decode_component(value);
            match key {
                "repo" if !value.is_empty() => filters.repo = value,
                "sort" => {
                    if let Some(sort) = SortKey::from_str(&value) {
                        filters.sort = sort;
                    }
                }
                "assignee" if !value.is_empty() => {
                    filters.assignee = AssigneeFilter::from_str(&value);
                }
                "state" => {
                    if let Some(state) = StateFilter::from_str(&value) {
                        filters.state = state;
                    }
                }
                "label" if !value.is_empty() => {
                    filters.label = LabelFilter::from_str(&value);
                }
                "search" => filters.search = value,
                _ => {}
            }
        }

        filters
    }
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "repo={} sort={} assignee={} state={} label={} search={:?}",
            self.repo,
            self.sort,
            self.assignee.as_str(),
            self.state.as_str(),
            self.label.as_str(),
            self.search
        )
    }
}

/// Percent-encode a fragment value. Unreserved ASCII passes through,
/// space becomes `+`, everything else is `%XX` per byte.
fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Decode a fragment value. Malformed escapes pass through literally.
fn decode_component(value: &str) -> String {
    let raw = value.as_bytes();
    let mut bytes = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        match raw[i] {
            b'+' => {
                bytes.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < raw.len() => {
                let hi = (raw[i + 1] as char).to_digit(16);
                let lo = (raw[i + 2] as char).to_digit(16);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        bytes.push((hi * 16 + lo) as u8);
                        i += 3;
                    }
                    _ => {
                        bytes.push(b'%');
                        i += 1;
                    }
                }
            }
            other => {
                bytes.push(other);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&bytes).into_owned()
}
