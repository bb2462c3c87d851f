//! Paginated email list state.
//!
//! The controller owns the fetched emails and the pagination counters for
//! one set of filters. Fetches are split into [`EmailListController::begin_load`]
//! and [`EmailListController::finish_load`] so the caller can run the request
//! anywhere; each load carries a [`LoadTicket`] whose generation must match
//! the controller's, or its result is dropped.

use crate::api::{ApiError, ApiResult, EmailApi};
use crate::auth::AuthHandler;
use crate::filter::{FilterParams, ListQuery};
use crate::models::{Category, EmailSummary, INBOX, ListResponse};
use crate::scroll::ObserverDeps;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_PER_PAGE: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub generation: u64,
    pub page: u32,
    pub is_initial: bool,
    pub query: ListQuery,
    pub per_page: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// The filters changed while the request was in flight.
    Stale,
    AuthFailed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Removed,
    Replaced,
    /// No email with that id is in the list.
    Missing,
}

pub struct EmailListController {
    filters: FilterParams,
    query: ListQuery,
    per_page: u32,
    emails: Vec<EmailSummary>,
    page: u32,
    total: u64,
    has_more: bool,
    loading: bool,
    loading_more: bool,
    error: Option<String>,
    initial_load_complete: bool,
    generation: u64,
    auth: Arc<dyn AuthHandler>,
}

impl EmailListController {
    pub fn new(filters: FilterParams, per_page: u32, auth: Arc<dyn AuthHandler>) -> Self {
        Self {
            query: filters.resolve(),
            filters,
            per_page: per_page.max(1),
            emails: Vec::new(),
            page: 1,
            total: 0,
            has_more: true,
            loading: false,
            loading_more: false,
            error: None,
            initial_load_complete: false,
            generation: 0,
            auth,
        }
    }

    /// Drops everything fetched so far and starts over at page 1.
    pub fn reset(&mut self) -> LoadTicket {
        self.generation += 1;
        self.page = 1;
        self.emails.clear();
        self.total = 0;
        self.has_more = true;
        self.initial_load_complete = false;
        self.loading_more = false;
        self.error = None;
        debug!(
            "Reset email list (generation {}) for {}",
            self.generation, self.query
        );
        self.begin_load(1, true)
    }

    /// Switches to new filters. Returns `None` if nothing changed.
    pub fn set_filters(&mut self, filters: FilterParams) -> Option<LoadTicket> {
        if filters == self.filters {
            return None;
        }
        info!("Filters changed to {:?}", filters);
        self.query = filters.resolve();
        self.filters = filters;
        Some(self.reset())
    }

    pub fn on_sync_completed(&mut self) -> LoadTicket {
        info!("Sync completed, reloading email list");
        self.reset()
    }

    pub fn begin_load(&mut self, page: u32, is_initial: bool) -> LoadTicket {
        if is_initial {
            self.loading = true;
        } else {
            self.loading_more = true;
        }
        LoadTicket {
            generation: self.generation,
            page,
            is_initial,
            query: self.query.clone(),
            per_page: self.per_page,
        }
    }

    pub fn finish_load(
        &mut self,
        ticket: &LoadTicket,
        result: ApiResult<ListResponse>,
    ) -> LoadOutcome {
        if ticket.generation != self.generation {
            debug!(
                "Dropping page {} from generation {} (current {})",
                ticket.page, ticket.generation, self.generation
            );
            return LoadOutcome::Stale;
        }

        let outcome = match result {
            Ok(response) => {
                let count = response.emails.len();
                if ticket.is_initial {
                    self.emails = response.emails;
                    self.initial_load_complete = true;
                } else {
                    self.emails.extend(response.emails);
                }
                self.total = response.pagination.total;
                self.has_more = response.pagination.has_next;
                self.error = None;
                debug!(
                    "Loaded page {} ({} emails, total {}, has_more {})",
                    ticket.page, count, self.total, self.has_more
                );
                LoadOutcome::Applied
            }
            Err(ApiError::Auth(message)) => {
                warn!("Email list load hit an auth failure: {}", message);
                self.auth.handle_auth_error();
                LoadOutcome::AuthFailed
            }
            Err(e) => {
                warn!("Failed to load page {}: {}", ticket.page, e);
                self.error = Some(format!("Failed to load emails: {}", e));
                LoadOutcome::Failed
            }
        };

        self.loading = false;
        self.loading_more = false;
        outcome
    }

    /// Fetches page `page` through `api` and applies it.
    pub async fn load_page(&mut self, api: &dyn EmailApi, page: u32, is_initial: bool) -> LoadOutcome {
        let ticket = self.begin_load(page, is_initial);
        let result = api.list(&ticket.query, ticket.page, ticket.per_page).await;
        self.finish_load(&ticket, result)
    }

    pub fn can_load_more(&self) -> bool {
        self.initial_load_complete && self.has_more && !self.loading && !self.loading_more
    }

    /// The sentinel at the end of the list came into view.
    pub fn on_sentinel_visible(&mut self) -> Option<LoadTicket> {
        if !self.can_load_more() {
            return None;
        }
        self.page += 1;
        Some(self.begin_load(self.page, false))
    }

    /// Applies a mutation reported for a single email without refetching.
    pub fn reconcile(&mut self, updated: EmailSummary) -> Reconciled {
        let Some(index) = self.emails.iter().position(|e| e.id == updated.id) else {
            debug!("Ignoring update for {} which is not in the list", updated.id);
            return Reconciled::Missing;
        };

        if updated.is_trashed() && !self.query.is_trash() {
            return self.remove_at(index, "trashed");
        }

        let regained_inbox =
            self.query.category == Some(Category::Archive) && updated.has_label(INBOX);
        if !self.query.matches_category_and_label(&updated) || regained_inbox {
            return self.remove_at(index, "no longer matches filters");
        }

        self.emails[index] = updated;
        Reconciled::Replaced
    }

    fn remove_at(&mut self, index: usize, reason: &str) -> Reconciled {
        let removed = self.emails.remove(index);
        self.total = self.total.saturating_sub(1);
        debug!("Removed {} from list: {}", removed.id, reason);
        Reconciled::Removed
    }

    pub fn observer_deps(&self) -> ObserverDeps {
        ObserverDeps {
            initial_load_complete: self.initial_load_complete,
            has_more: self.has_more,
            loading_more: self.loading_more,
            page: self.page,
            generation: self.generation,
        }
    }

    pub fn emails(&self) -> &[EmailSummary] {
        &self.emails
    }

    pub fn filters(&self) -> &FilterParams {
        &self.filters
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_loading_more(&self) -> bool {
        self.loading_more
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn initial_load_complete(&self) -> bool {
        self.initial_load_complete
    }

    pub fn in_trash_view(&self) -> bool {
        self.filters.is_trash()
    }
}
