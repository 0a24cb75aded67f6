//! Pure filter/sort/paginate view-model builder.
//!
//! `build_view` derives the displayed page from the full issue collection,
//! the active filters, and a page request. It has no network or storage
//! side effects, so every property of the dashboard view is testable from
//! plain values.

use serde::Serialize;
use std::cmp::Ordering;

use crate::filters::FilterState;
use crate::models::{Issue, Repository, SortKey};

/// Issues shown per page.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// One page of the filtered, sorted issue collection.
#[derive(Debug, Clone, Serialize)]
pub struct ViewModel {
    /// The issues on the requested page, in display order
    pub page_items: Vec<Issue>,
    /// Total issues matching the filters
    pub total_count: usize,
    /// Total pages at the requested page size
    pub total_pages: usize,
    /// The requested page (1-based)
    pub page: usize,
    /// The requested page size
    pub page_size: usize,
}

impl ViewModel {
    /// An empty view for page 1.
    pub fn empty(page_size: usize) -> Self {
        Self {
            page_items: Vec::new(),
            total_count: 0,
            total_pages: 0,
            page: 1,
            page_size,
        }
    }

    /// 1-based index range shown, for "Showing X-Y of Z" displays.
    /// `(0, 0)` when the view is empty.
    pub fn shown_range(&self) -> (usize, usize) {
        if self.page_items.is_empty() {
            return (0, 0);
        }
        let start = (self.page - 1) * self.page_size + 1;
        (start, start + self.page_items.len() - 1)
    }
}

/// Headline counts for the dashboard.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DashboardStats {
    pub repository_count: usize,
    pub open_count: usize,
    pub closed_count: usize,
    pub comment_count: u64,
}

/// Compute headline counts over the full (unfiltered) collection.
pub fn stats(repositories: &[Repository], issues: &[Issue]) -> DashboardStats {
    DashboardStats {
        repository_count: repositories.len(),
        open_count: issues.iter().filter(|i| i.is_open()).count(),
        closed_count: issues.iter().filter(|i| !i.is_open()).count(),
        comment_count: issues.iter().map(|i| u64::from(i.comment_count)).sum(),
    }
}

/// Build the view for one page.
///
/// Returns `None` when the page request is out of range (`page < 1`, or
/// past the last page when any pages exist) so the caller can keep its
/// previous view; page 1 of an empty result is a valid empty view. The
/// sort is stable: ties keep the input order, so unchanged inputs always
/// produce identical output.
pub fn build_view(
    issues: &[Issue],
    filters: &FilterState,
    page: usize,
    page_size: usize,
) -> Option<ViewModel> {
    if page < 1 || page_size == 0 {
        return None;
    }

    let mut matched: Vec<&Issue> = issues.iter().filter(|i| matches(i, filters)).collect();
    matched.sort_by(|a, b| compare(a, b, filters.sort));

    let total_count = matched.len();
    let total_pages = total_count.div_ceil(page_size);
    if total_pages == 0 {
        if page != 1 {
            return None;
        }
    } else if page > total_pages {
        return None;
    }

    let start = (page - 1) * page_size;
    let page_items = matched
        .into_iter()
        .skip(start)
        .take(page_size)
        .cloned()
        .collect();

    Some(ViewModel {
        page_items,
        total_count,
        total_pages,
        page,
        page_size,
    })
}

/// Whether an issue passes every active filter (conjunctive).
pub fn matches(issue: &Issue, filters: &FilterState) -> bool {
    if !filters.is_all_repos() && issue.repository != filters.repo {
        return false;
    }
    if !filters.state.matches(issue.state) {
        return false;
    }
    if !filters.assignee.matches(issue) {
        return false;
    }
    if !filters.label.matches(issue) {
        return false;
    }
    if !filters.search.is_empty() {
        let needle = filters.search.to_lowercase();
        if !search_text(issue).contains(&needle) {
            return false;
        }
    }
    true
}

/// Lowercased searchable text: title, body, issue number, label names.
fn search_text(issue: &Issue) -> String {
    let mut text = issue.title.clone();
    if let Some(body) = &issue.body {
        text.push(' ');
        text.push_str(body);
    }
    text.push(' ');
    text.push_str(&issue.number.to_string());
    for label in &issue.labels {
        text.push(' ');
        text.push_str(&label.name);
    }
    text.to_lowercase()
}

fn compare(a: &Issue, b: &Issue, sort: SortKey) -> Ordering {
    match sort {
        SortKey::Updated => b.updated_at.cmp(&a.updated_at),
        SortKey::Created => b.created_at.cmp(&a.created_at),
        SortKey::Comments => b.comment_count.cmp(&a.comment_count),
        SortKey::Title => a.title.cmp(&b.title),
        SortKey::Number => b.number.cmp(&a.number),
    }
}
