use crate::api::{ApiResult, EmailApi};
use crate::auth::AuthHandler;
use crate::card::{CardAction, EmailCard};
use crate::config::{Config, matches_key};
use crate::controller::{EmailListController, LoadOutcome, LoadTicket};
use crate::events::SyncEvent;
use crate::filter::{FilterParams, ReadStatus};
use crate::models::{Category, EmailSummary, ListResponse};
use crate::scroll::SentinelObserver;
use crate::search::filter_emails;
use crate::session::{ScrollMemory, SessionStore};
use crate::ui::{UIMode, UIState};
use crossterm::event::{KeyCode, KeyEvent};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Results of background work, delivered back to the UI task.
#[derive(Debug)]
pub enum AppMessage {
    PageLoaded {
        ticket: LoadTicket,
        result: ApiResult<ListResponse>,
    },
    CardFinished {
        action: CardAction,
        result: ApiResult<EmailSummary>,
    },
}

pub struct App {
    pub config: Config,
    pub list: EmailListController,
    pub ui: UIState<'static>,
    api: Arc<dyn EmailApi>,
    auth: Arc<dyn AuthHandler>,
    tx: mpsc::Sender<AppMessage>,
    sync_trigger: Option<mpsc::Sender<()>>,
    observer: SentinelObserver,
    session: SessionStore,
    scroll_memory: ScrollMemory,
}

impl App {
    pub fn new(
        config: Config,
        filters: FilterParams,
        api: Arc<dyn EmailApi>,
        auth: Arc<dyn AuthHandler>,
        tx: mpsc::Sender<AppMessage>,
    ) -> Self {
        let list = EmailListController::new(filters, config.api.per_page, auth.clone());
        let ui = UIState {
            login_url: auth.login_url().to_string(),
            ..UIState::default()
        };
        Self {
            config,
            list,
            ui,
            api,
            auth,
            tx,
            sync_trigger: None,
            observer: SentinelObserver::default(),
            session: SessionStore::default(),
            scroll_memory: ScrollMemory::default(),
        }
    }

    pub fn with_sync_trigger(mut self, trigger: mpsc::Sender<()>) -> Self {
        self.sync_trigger = Some(trigger);
        self
    }

    /// Shows the list, or the sign-in screen when there is no token yet.
    pub fn start(&mut self) {
        if !self.auth.is_authenticated() {
            self.ui.mode = UIMode::Authentication;
            return;
        }
        self.reload();
    }

    pub fn reload(&mut self) {
        let ticket = self.list.reset();
        self.ui.reset_list_position();
        self.spawn_load(ticket);
    }

    fn spawn_load(&self, ticket: LoadTicket) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = api.list(&ticket.query, ticket.page, ticket.per_page).await;
            if tx.send(AppMessage::PageLoaded { ticket, result }).await.is_err() {
                debug!("UI gone before page load finished");
            }
        });
    }

    fn spawn_card_action(&self, email: EmailSummary, action: CardAction) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        let in_trash = self.list.in_trash_view();
        tokio::spawn(async move {
            let result = EmailCard::new(&email, in_trash)
                .perform(api.as_ref(), &action)
                .await;
            if tx.send(AppMessage::CardFinished { action, result }).await.is_err() {
                debug!("UI gone before card action finished");
            }
        });
    }

    pub fn handle_message(&mut self, message: AppMessage) {
        match message {
            AppMessage::PageLoaded { ticket, result } => {
                if self.list.finish_load(&ticket, result) == LoadOutcome::AuthFailed {
                    self.ui.mode = UIMode::Authentication;
                }
            }
            AppMessage::CardFinished { action, result } => match result {
                Ok(updated) => {
                    self.list.reconcile(updated);
                    self.ui.toasts.success(action.describe());
                }
                Err(e) => {
                    warn!("{:?} failed: {}", action, e);
                    if e.is_auth() {
                        self.auth.handle_auth_error();
                        self.ui.mode = UIMode::Authentication;
                    } else {
                        self.ui.toasts.error(format!("Could not update email: {}", e));
                    }
                }
            },
        }
        let visible = self.visible_len();
        self.ui.clamp_selection(visible);
    }

    pub fn handle_sync_event(&mut self, event: SyncEvent) {
        if let SyncEvent::Completed { .. } = event {
            if self.ui.mode == UIMode::Authentication {
                return;
            }
            let ticket = self.list.on_sync_completed();
            self.spawn_load(ticket);
        }
    }

    /// Runs once after every frame: drives infinite scroll and scroll restore.
    pub fn after_render(&mut self) {
        if !matches!(self.ui.mode, UIMode::Browsing | UIMode::Searching) {
            return;
        }
        if let Some(offset) = self
            .scroll_memory
            .restore(&mut self.session, self.list.initial_load_complete())
        {
            debug!("Restoring list offset {}", offset);
            self.ui.apply_scroll(offset);
        }

        self.observer.sync(self.list.observer_deps());
        if self.observer.notify(self.ui.sentinel_visible) {
            if let Some(ticket) = self.list.on_sentinel_visible() {
                self.spawn_load(ticket);
            }
        }
    }

    pub fn tick(&mut self) {
        self.ui.toasts.prune(Instant::now());
    }

    fn visible_len(&self) -> usize {
        filter_emails(self.list.emails(), &self.ui.search_term).len()
    }

    fn selected_email(&self) -> Option<EmailSummary> {
        filter_emails(self.list.emails(), &self.ui.search_term)
            .get(self.ui.selected)
            .map(|e| (*e).clone())
    }

    /// The email shown in the detail view, if it is still in the list.
    fn detail_email(&self) -> Option<EmailSummary> {
        let id = self.ui.detail_id.as_deref()?;
        self.list.emails().iter().find(|e| e.id == id).cloned()
    }

    fn run_action(&mut self, action: CardAction) {
        if let Some(email) = self.selected_email() {
            self.run_action_on(email, action);
        }
    }

    fn run_detail_action(&mut self, action: CardAction) {
        match self.detail_email() {
            Some(email) => self.run_action_on(email, action),
            None => debug!("Detail email left the list; ignoring {:?}", action),
        }
    }

    fn run_action_on(&mut self, email: EmailSummary, action: CardAction) {
        if !EmailCard::new(&email, self.list.in_trash_view()).allows(&action) {
            return;
        }
        self.spawn_card_action(email, action);
    }

    fn open_detail(&mut self) {
        let Some(email) = self.selected_email() else {
            return;
        };
        self.scroll_memory
            .save(&mut self.session, self.ui.list_state.offset());
        self.observer.unmount();
        self.ui.detail_id = Some(email.id.clone());
        self.ui.mode = UIMode::Detail;
        if !email.is_read {
            self.spawn_card_action(email, CardAction::MarkRead);
        }
    }

    fn close_detail(&mut self) {
        self.ui.mode = UIMode::Browsing;
        self.ui.detail_id = None;
    }

    fn change_filters(&mut self, filters: FilterParams) {
        if let Some(ticket) = self.list.set_filters(filters) {
            self.ui.reset_list_position();
            self.spawn_load(ticket);
        }
    }

    fn cycle_category(&mut self, forward: bool) {
        let options = &Category::FILTERABLE;
        let current = options
            .iter()
            .position(|c| c.as_ref() == self.list.filters().category.as_ref())
            .unwrap_or(0);
        let next = if forward {
            (current + 1) % options.len()
        } else {
            (current + options.len() - 1) % options.len()
        };
        let mut filters = self.list.filters().clone();
        filters.category = options[next].clone();
        self.change_filters(filters);
    }

    fn cycle_status(&mut self) {
        let mut filters = self.list.filters().clone();
        filters.status = match filters.status {
            None => Some(ReadStatus::Unread),
            Some(ReadStatus::Unread) => Some(ReadStatus::Read),
            Some(ReadStatus::Read) => None,
        };
        self.change_filters(filters);
    }

    fn request_sync(&mut self) {
        match &self.sync_trigger {
            Some(trigger) => {
                if trigger.try_send(()).is_ok() {
                    self.ui.toasts.success("Syncing…");
                }
            }
            None => self.ui.toasts.error("Sync is disabled"),
        }
    }

    /// Returns `true` when the user asked to quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.ui.mode {
            UIMode::Authentication => self.handle_auth_key(key),
            UIMode::Searching => {
                self.handle_search_key(key);
                false
            }
            UIMode::Recategorizing => {
                self.handle_picker_key(key);
                false
            }
            UIMode::Detail => {
                let bindings = self.config.keybindings.clone();
                if matches_key(key, &bindings.quit) {
                    return true;
                }
                if matches_key(key, &bindings.back) {
                    self.close_detail();
                } else if matches_key(key, &bindings.archive) {
                    self.run_detail_action(CardAction::Archive);
                    self.close_detail();
                } else if matches_key(key, &bindings.trash) {
                    self.run_detail_action(CardAction::Trash);
                    self.close_detail();
                }
                false
            }
            UIMode::Browsing => self.handle_browsing_key(key),
        }
    }

    fn handle_browsing_key(&mut self, key: KeyEvent) -> bool {
        let bindings = self.config.keybindings.clone();
        if matches_key(key, &bindings.quit) {
            return true;
        }

        if self.list.error().is_some() {
            if matches_key(key, &bindings.reload) {
                self.reload();
            }
            return false;
        }

        if matches_key(key, &bindings.move_down) {
            let len = self.visible_len();
            if self.ui.selected + 1 < len {
                self.ui.selected += 1;
            }
        } else if matches_key(key, &bindings.move_up) {
            self.ui.selected = self.ui.selected.saturating_sub(1);
        } else if matches_key(key, &bindings.open) {
            self.open_detail();
        } else if matches_key(key, &bindings.search) {
            self.ui.mode = UIMode::Searching;
        } else if matches_key(key, &bindings.archive) {
            self.run_action(CardAction::Archive);
        } else if matches_key(key, &bindings.trash) {
            self.run_action(CardAction::Trash);
        } else if matches_key(key, &bindings.restore) {
            self.run_action(CardAction::Restore);
        } else if matches_key(key, &bindings.toggle_read) {
            if let Some(email) = self.selected_email() {
                let action = EmailCard::new(&email, self.list.in_trash_view()).toggle_read_action();
                self.spawn_card_action(email, action);
            }
        } else if matches_key(key, &bindings.recategorize) {
            if self.selected_email().is_some() && !self.list.in_trash_view() {
                self.ui.category_choice = 0;
                self.ui.mode = UIMode::Recategorizing;
            }
        } else if matches_key(key, &bindings.next_category) {
            self.cycle_category(true);
        } else if matches_key(key, &bindings.prev_category) {
            self.cycle_category(false);
        } else if matches_key(key, &bindings.cycle_status) {
            self.cycle_status();
        } else if matches_key(key, &bindings.reload) {
            self.reload();
        } else if matches_key(key, &bindings.sync) {
            self.request_sync();
        }
        false
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.ui.mode = UIMode::Browsing,
            KeyCode::Esc => {
                self.ui.search.select_all();
                self.ui.search.cut();
                self.set_search_term(String::new());
                self.ui.mode = UIMode::Browsing;
            }
            _ => {
                self.ui.search.input(key);
                let term = self.ui.search.lines().join(" ");
                self.set_search_term(term);
            }
        }
    }

    fn set_search_term(&mut self, term: String) {
        if term != self.ui.search_term {
            self.ui.search_term = term;
            self.ui.reset_list_position();
        }
    }

    fn handle_picker_key(&mut self, key: KeyEvent) {
        let bindings = &self.config.keybindings;
        let count = Category::ASSIGNABLE.len();
        if matches_key(key, &bindings.move_down) {
            self.ui.category_choice = (self.ui.category_choice + 1) % count;
        } else if matches_key(key, &bindings.move_up) {
            self.ui.category_choice = (self.ui.category_choice + count - 1) % count;
        } else if key.code == KeyCode::Enter {
            let category = Category::ASSIGNABLE[self.ui.category_choice].clone();
            self.ui.mode = UIMode::Browsing;
            self.run_action(CardAction::Recategorize(category));
        } else if key.code == KeyCode::Esc {
            self.ui.mode = UIMode::Browsing;
        }
    }

    fn handle_auth_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => return true,
            KeyCode::Enter => {
                let token = self.ui.token_input.lines().join("");
                match self.auth.sign_in(&token) {
                    Ok(()) => {
                        self.ui.token_input.select_all();
                        self.ui.token_input.cut();
                        self.ui.mode = UIMode::Browsing;
                        self.reload();
                    }
                    Err(e) => self.ui.toasts.error(e.to_string()),
                }
            }
            _ => {
                self.ui.token_input.input(key);
            }
        }
        false
    }
}
