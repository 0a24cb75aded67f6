//! Typed user actions and the session reducer.
//!
//! User interactions form a small closed set of actions, each mapped to a
//! state transition by [`Session::apply`]. This keeps the coupling between
//! any presentation layer and the data state down to one entry point:
//! filter changes reset to page 1 and persist the snapshot, page changes
//! are validated against the current view, and a refresh forces a cold
//! load.

use tracing::warn;

use crate::engine::{Engine, LoadReport};
use crate::filters::{AssigneeFilter, FilterState, LabelFilter, StateFilter};
use crate::models::SortKey;
use crate::view::{self, DEFAULT_PAGE_SIZE, DashboardStats, ViewModel, build_view};
use crate::Result;

/// A user interaction.
#[derive(Debug, Clone)]
pub enum Action {
    SetRepository(String),
    SetSort(SortKey),
    SetState(StateFilter),
    SetAssignee(AssigneeFilter),
    SetLabel(LabelFilter),
    Search(String),
    ClearSearch,
    SetPage(usize),
    Refresh,
}

/// A loaded dashboard session: the engine's data state plus the active
/// filters, page, and derived view model.
pub struct Session {
    engine: Engine,
    filters: FilterState,
    page: usize,
    page_size: usize,
    view: ViewModel,
}

impl Session {
    /// Load session data and build the initial view.
    ///
    /// Explicitly requested filters win; otherwise the filters captured
    /// in a restored snapshot are used, then the defaults.
    pub fn load(
        mut engine: Engine,
        filters: Option<FilterState>,
        page_size: usize,
        force_refresh: bool,
    ) -> Result<(Self, LoadReport)> {
        let requested = filters.clone().unwrap_or_default();
        let report = engine.load(&requested, force_refresh)?;

        let filters = match (filters, &report.cached_filters) {
            (Some(explicit), _) => explicit,
            (None, Some(cached)) => cached.clone(),
            (None, None) => requested,
        };

        let mut session = Self {
            engine,
            filters,
            page: 1,
            page_size,
            view: ViewModel::empty(page_size),
        };
        session.rebuild();
        Ok((session, report))
    }

    /// Load with the default page size.
    pub fn load_default(
        engine: Engine,
        filters: Option<FilterState>,
        force_refresh: bool,
    ) -> Result<(Self, LoadReport)> {
        Self::load(engine, filters, DEFAULT_PAGE_SIZE, force_refresh)
    }

    /// Apply one action and update the view.
    pub fn apply(&mut self, action: Action) -> Result<()> {
        match action {
            Action::SetRepository(repo) => {
                self.filters.repo = repo;
                if !self.filters.is_all_repos() && !self.engine.is_fetched(&self.filters.repo) {
                    let name = self.filters.repo.clone();
                    self.engine.fetch_repository(&name);
                }
                self.filter_changed();
            }
            Action::SetSort(sort) => {
                self.filters.sort = sort;
                self.filter_changed();
            }
            Action::SetState(state) => {
                self.filters.state = state;
                self.filter_changed();
            }
            Action::SetAssignee(assignee) => {
                self.filters.assignee = assignee;
                self.filter_changed();
            }
            Action::SetLabel(label) => {
                self.filters.label = label;
                self.filter_changed();
            }
            Action::Search(text) => {
                self.filters.search = text.trim().to_string();
                self.filter_changed();
            }
            Action::ClearSearch => {
                self.filters.search.clear();
                self.filter_changed();
            }
            Action::SetPage(page) => {
                // Out of range leaves the view unchanged
                match build_view(self.engine.issues(), &self.filters, page, self.page_size) {
                    Some(view) => {
                        self.page = page;
                        self.view = view;
                    }
                    None => warn!(page, "page out of range, view unchanged"),
                }
            }
            Action::Refresh => {
                let report = self.engine.load(&self.filters, true)?;
                for (repo, error) in report.failures() {
                    warn!(repo, "refresh: {}", error);
                }
                self.page = 1;
                self.rebuild();
            }
        }
        Ok(())
    }

    /// The current view model.
    pub fn view(&self) -> &ViewModel {
        &self.view
    }

    /// The active filters.
    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// The shareable fragment encoding of the active filters.
    pub fn fragment(&self) -> String {
        self.filters.to_fragment()
    }

    /// Headline counts over the full collection.
    pub fn stats(&self) -> DashboardStats {
        view::stats(self.engine.repositories(), self.engine.issues())
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    fn filter_changed(&mut self) {
        self.page = 1;
        // Snapshot persistence must not fail an interaction
        if let Err(e) = self.engine.save_snapshot(&self.filters) {
            warn!("snapshot save failed: {}", e);
        }
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.view = build_view(self.engine.issues(), &self.filters, self.page, self.page_size)
            .or_else(|| build_view(self.engine.issues(), &self.filters, 1, self.page_size))
            .unwrap_or_else(|| ViewModel::empty(self.page_size));
    }
}
