use crate::card::EmailCard;
use crate::controller::EmailListController;
use crate::models::{Category, EmailSummary};
use crate::scroll;
use crate::search::filter_emails;
use crate::sync::SyncState;
use crate::toast::{ToastKind, Toasts};
use chrono::Local;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use std::sync::{Arc, Mutex};
use tui_textarea::TextArea;

/// Rows taken by one email in the list.
pub const ITEM_HEIGHT: usize = 3;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum UIMode {
    #[default]
    Browsing,
    Searching,
    Detail,
    Recategorizing,
    Authentication,
}

pub struct UIState<'a> {
    pub mode: UIMode,
    /// Index into the search-filtered list.
    pub selected: usize,
    pub list_state: ListState,
    pub search: TextArea<'a>,
    pub search_term: String,
    pub detail_id: Option<String>,
    pub category_choice: usize,
    pub token_input: TextArea<'a>,
    pub login_url: String,
    pub toasts: Toasts,
    pub sync_state: Arc<Mutex<SyncState>>,
    /// Filled in by [`render`].
    pub viewport_rows: usize,
    pub sentinel_visible: bool,
}

impl<'a> Default for UIState<'a> {
    fn default() -> Self {
        let mut search = TextArea::default();
        search.set_cursor_line_style(Style::default());
        search.set_placeholder_text("Search subject, sender or snippet");
        let mut token_input = TextArea::default();
        token_input.set_cursor_line_style(Style::default());
        token_input.set_mask_char('•');

        Self {
            mode: UIMode::Browsing,
            selected: 0,
            list_state: ListState::default(),
            search,
            search_term: String::new(),
            detail_id: None,
            category_choice: 0,
            token_input,
            login_url: String::new(),
            toasts: Toasts::default(),
            sync_state: Arc::new(Mutex::new(SyncState::default())),
            viewport_rows: 0,
            sentinel_visible: false,
        }
    }
}

impl<'a> UIState<'a> {
    pub fn clamp_selection(&mut self, visible_len: usize) {
        if visible_len == 0 {
            self.selected = 0;
        } else if self.selected >= visible_len {
            self.selected = visible_len - 1;
        }
    }

    /// Puts the list back at a remembered offset.
    pub fn apply_scroll(&mut self, offset: usize) {
        *self.list_state.offset_mut() = offset;
        if self.selected < offset {
            self.selected = offset;
        }
    }

    pub fn reset_list_position(&mut self) {
        self.selected = 0;
        *self.list_state.offset_mut() = 0;
    }
}

pub fn render(f: &mut Frame, state: &mut UIState<'_>, list: &EmailListController) {
    if state.mode == UIMode::Authentication {
        render_authentication(f, state);
        return;
    }

    let show_search = state.mode == UIMode::Searching || !state.search_term.is_empty();
    let mut constraints = vec![Constraint::Length(3)];
    if show_search {
        constraints.push(Constraint::Length(3));
    }
    constraints.push(Constraint::Min(3));
    constraints.push(Constraint::Length(1));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(f.area());

    render_filter_bar(f, chunks[0], list);

    let mut next = 1;
    if show_search {
        let style = if state.mode == UIMode::Searching {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        state.search.set_block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Search ")
                .border_style(style),
        );
        f.render_widget(&state.search, chunks[next]);
        next += 1;
    }
    let main = chunks[next];
    let status = chunks[next + 1];

    if state.mode == UIMode::Detail {
        state.sentinel_visible = false;
        render_detail(f, main, state, list);
    } else if let Some(error) = list.error() {
        state.sentinel_visible = false;
        render_error(f, main, error);
    } else {
        render_list(f, main, state, list);
    }

    if state.mode == UIMode::Recategorizing {
        render_category_picker(f, state);
    }

    render_status_line(f, status, state);
}

fn render_filter_bar(f: &mut Frame, area: Rect, list: &EmailListController) {
    let count = if list.is_loading() {
        "loading…".to_string()
    } else {
        format!(
            "{} of {} emails  ·  page {}",
            list.emails().len(),
            list.total(),
            list.page()
        )
    };
    let text = format!(" {}  |  {}", list.filters().describe(), count);
    let bar = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Filters [Tab/Shift-Tab category, f status] ")
            .border_style(Style::default().fg(Color::Gray)),
    );
    f.render_widget(bar, area);
}

fn render_list(f: &mut Frame, area: Rect, state: &mut UIState<'_>, list: &EmailListController) {
    let visible = filter_emails(list.emails(), &state.search_term);
    state.clamp_selection(visible.len());

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Emails ")
        .border_style(Style::default().fg(Color::Yellow));

    if visible.is_empty() {
        state.sentinel_visible = false;
        let (text, style) = if list.is_loading() {
            ("⏳ Loading emails…".to_string(), Style::default().fg(Color::Yellow))
        } else if !state.search_term.is_empty() {
            (
                format!("No emails match \"{}\"", state.search_term),
                Style::default().fg(Color::DarkGray),
            )
        } else {
            ("No emails".to_string(), Style::default().fg(Color::DarkGray))
        };
        let p = Paragraph::new(text)
            .block(block)
            .style(style)
            .wrap(Wrap { trim: true });
        f.render_widget(p, area);
        return;
    }

    let width = area.width.saturating_sub(3) as usize;
    let in_trash = list.in_trash_view();
    let mut items: Vec<ListItem> = visible
        .iter()
        .enumerate()
        .map(|(i, email)| card_item(email, i == state.selected, in_trash, width))
        .collect();

    if list.has_more() {
        let text = if list.is_loading_more() {
            "  ⏳ Loading more…"
        } else {
            "  ⋯"
        };
        items.push(ListItem::new(text).style(Style::default().fg(Color::DarkGray)));
    } else {
        items.push(ListItem::new("  — end —").style(Style::default().fg(Color::DarkGray)));
    }

    state.list_state.select(Some(state.selected));
    f.render_stateful_widget(List::new(items).block(block), area, &mut state.list_state);

    state.viewport_rows = (area.height.saturating_sub(2) as usize) / ITEM_HEIGHT;
    state.sentinel_visible =
        scroll::sentinel_visible(visible.len(), state.list_state.offset(), state.viewport_rows);
}

fn card_item<'a>(email: &EmailSummary, selected: bool, in_trash: bool, width: usize) -> ListItem<'a> {
    let sender = email.from_address.as_deref().unwrap_or("Unknown");
    let subject = email.subject.as_deref().unwrap_or("(No Subject)");
    let snippet = email.snippet.as_deref().unwrap_or("");
    let time_str = email
        .received_at
        .with_timezone(&Local)
        .format("%b %d %Y @ %-I:%M%p")
        .to_string();

    let mut style = if selected {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    if !email.is_read {
        style = style.add_modifier(Modifier::BOLD);
    }

    let indicator = if selected { "█" } else { " " };
    let card = EmailCard::new(email, in_trash);
    let marker = if card.allows(&crate::card::CardAction::MarkRead) {
        "●"
    } else {
        " "
    };

    let line1 = truncate(&format!("{} {}  ·  {}", marker, sender, time_str), width);
    let line2 = truncate(
        &format!("  {}  [{}]", subject, email.category.display_name()),
        width,
    );
    let line3 = truncate(&format!("  {}", snippet), width);

    ListItem::new(format!(
        "{}{}\n{}{}\n{}{}",
        indicator, line1, indicator, line2, indicator, line3
    ))
    .style(style)
}

fn truncate(s: &str, len: usize) -> String {
    if s.chars().count() > len {
        let truncated: String = s.chars().take(len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    } else {
        s.to_string()
    }
}

fn render_detail(f: &mut Frame, area: Rect, state: &UIState<'_>, list: &EmailListController) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Email [Esc back] ")
        .border_style(Style::default().fg(Color::Yellow));

    let email = state
        .detail_id
        .as_deref()
        .and_then(|id| list.emails().iter().find(|e| e.id == id));

    let content = match email {
        Some(email) => {
            let labels: Vec<String> = email
                .labels
                .iter()
                .map(|l| label_display_name(l))
                .collect();
            format!(
                "From: {}\nDate: {}\nSubject: {}\nCategory: {}\nLabels: {}\n\n{}",
                email.from_address.as_deref().unwrap_or("Unknown"),
                email.received_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                email.subject.as_deref().unwrap_or("(No Subject)"),
                email.category.display_name(),
                labels.join(", "),
                email.snippet.as_deref().unwrap_or("")
            )
        }
        None => "This email is no longer in the current view.".to_string(),
    };

    f.render_widget(
        Paragraph::new(content).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

pub fn label_display_name(label: &str) -> String {
    let name = label.strip_prefix("CATEGORY_").unwrap_or(label);
    inflections::case::to_title_case(&name.to_lowercase())
}

fn render_error(f: &mut Frame, area: Rect, error: &str) {
    let text = format!("{}\n\nPress r to reload.", error);
    let p = Paragraph::new(text)
        .style(Style::default().fg(Color::Red))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Something went wrong ")
                .border_style(Style::default().fg(Color::Red)),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}

fn render_category_picker(f: &mut Frame, state: &UIState<'_>) {
    let area = centered_rect(30, 40, f.area());
    f.render_widget(Clear, area);

    let items: Vec<ListItem> = Category::ASSIGNABLE
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let style = if i == state.category_choice {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(c.display_name()).style(style)
        })
        .collect();

    let picker = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Move to [Enter/Esc] ")
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(picker, area);
}

fn render_status_line(f: &mut Frame, area: Rect, state: &UIState<'_>) {
    if let Some(toast) = state.toasts.latest() {
        let color = match toast.kind {
            ToastKind::Success => Color::Green,
            ToastKind::Error => Color::Red,
        };
        f.render_widget(
            Paragraph::new(format!(" {}", toast.message)).style(Style::default().fg(color)),
            area,
        );
        return;
    }

    let sync = match state.sync_state.lock() {
        Ok(sync) if sync.in_progress => "syncing…".to_string(),
        Ok(sync) => match (&sync.last_error, sync.last_completed) {
            (Some(_), _) => "sync failed".to_string(),
            (None, Some(at)) => format!("synced {}", at.with_timezone(&Local).format("%H:%M")),
            (None, None) => String::new(),
        },
        Err(_) => String::new(),
    };
    let hints = " / search  a archive  d trash  space read  c move  s sync  q quit";
    f.render_widget(
        Paragraph::new(format!("{}   {}", hints, sync)).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

fn render_authentication(f: &mut Frame, state: &mut UIState<'_>) {
    let area = centered_rect(60, 50, f.area());
    f.render_widget(Clear, area);

    let block = Block::default()
        .title(" Authentication Required ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(inner);

    let msg = Paragraph::new("Your session has expired or you are not signed in. Sign in at the URL below and paste the API token here:")
        .wrap(Wrap { trim: true });
    f.render_widget(msg, chunks[0]);

    let url_p = Paragraph::new(state.login_url.as_str())
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::UNDERLINED),
        )
        .block(Block::default().borders(Borders::ALL).title(" URL "))
        .wrap(Wrap { trim: false });
    f.render_widget(url_p, chunks[1]);

    state
        .token_input
        .set_block(Block::default().borders(Borders::ALL).title(" Token [Enter] "));
    f.render_widget(&state.token_input, chunks[2]);

    let footer = Paragraph::new("Press Esc to quit.")
        .style(Style::default().fg(Color::Gray))
        .wrap(Wrap { trim: true });
    f.render_widget(footer, chunks[3]);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_long_lines() {
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("short", 8), "short");
    }

    #[test]
    fn test_label_display_name() {
        assert_eq!(label_display_name("CATEGORY_PROMOTIONS"), "Promotions");
        assert_eq!(label_display_name("INBOX"), "Inbox");
    }

    #[test]
    fn test_apply_scroll_keeps_selection_on_screen() {
        let mut state = UIState::default();
        state.selected = 2;
        state.apply_scroll(842);
        assert_eq!(state.list_state.offset(), 842);
        assert_eq!(state.selected, 842);
    }

    #[test]
    fn test_clamp_selection() {
        let mut state = UIState::default();
        state.selected = 9;
        state.clamp_selection(3);
        assert_eq!(state.selected, 2);
        state.clamp_selection(0);
        assert_eq!(state.selected, 0);
    }
}
