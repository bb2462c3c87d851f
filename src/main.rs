mod api;
mod app;
mod auth;
mod card;
mod config;
mod controller;
mod events;
mod filter;
mod labels;
mod models;
mod scroll;
mod search;
mod session;
mod sync;
mod toast;
mod ui;

use crate::api::{EmailApi, HttpEmailApi};
use crate::app::{App, AppMessage};
use crate::auth::{AuthHandler, KeyringAuth};
use crate::config::Config;
use crate::events::{SyncBus, SyncSubscription};
use crate::filter::FilterParams;
use crate::sync::{SyncService, SyncState};
use anyhow::Context;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "gsift.log";

struct Args {
    debug: bool,
    reset_token: bool,
    filter: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let mut args = Args {
            debug: false,
            reset_token: false,
            filter: None,
        };
        let mut iter = std::env::args().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--debug" => args.debug = true,
                "--reset-token" => args.reset_token = true,
                "--filter" => args.filter = iter.next(),
                other => {
                    if let Some(value) = other.strip_prefix("--filter=") {
                        args.filter = Some(value.to_string());
                    }
                }
            }
        }
        args
    }
}

fn init_logging(debug: bool) -> anyhow::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_FILE)
        .with_context(|| format!("failed to open {}", LOG_FILE))?;
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Handle token reset
    if args.reset_token {
        auth::RingStorage
            .clear_token()
            .context("failed to clear stored token")?;
        println!("Token cleared. Please restart without --reset-token to sign in again.");
        return Ok(());
    }

    init_logging(args.debug)?;
    info!("Starting gsift");

    let config = Config::load();
    let filters = args
        .filter
        .as_deref()
        .map(FilterParams::from_query)
        .unwrap_or_default();

    let auth: Arc<dyn AuthHandler> = Arc::new(KeyringAuth::load(
        &config.api.login_url,
        config.api.open_browser_on_auth_error,
    ));
    let api: Arc<dyn EmailApi> = Arc::new(
        HttpEmailApi::new(&config.api.base_url, auth.clone())
            .context("failed to set up API client")?,
    );

    // Shared sync state for UI awareness
    let sync_state = Arc::new(Mutex::new(SyncState::default()));
    let bus = SyncBus::default();
    let sync_events = bus.subscribe();

    let (tx, rx) = mpsc::channel::<AppMessage>(64);
    let mut app = App::new(config.clone(), filters, api.clone(), auth.clone(), tx);
    app.ui.sync_state = sync_state.clone();

    if config.sync.enabled {
        let (trigger_tx, trigger_rx) = mpsc::channel::<()>(4);
        let interval = Some(config.sync.interval_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        SyncService::new(api, auth, bus, sync_state).spawn(interval, trigger_rx);
        app = app.with_sync_trigger(trigger_tx);
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app, rx, sync_events).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        error!("Exiting with error: {:#}", e);
    }
    info!("Shutting down");
    result
}

async fn run<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut rx: mpsc::Receiver<AppMessage>,
    mut sync_events: SyncSubscription,
) -> anyhow::Result<()> {
    let mut input = EventStream::new();
    let mut tick = tokio::time::interval(Duration::from_millis(250));

    app.start();

    loop {
        terminal.draw(|f| ui::render(f, &mut app.ui, &app.list))?;
        app.after_render();

        tokio::select! {
            event = input.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    if app.handle_key(key) {
                        break;
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            Some(message) = rx.recv() => app.handle_message(message),
            Some(event) = sync_events.recv() => app.handle_sync_event(event),
            _ = tick.tick() => app.tick(),
        }
    }
    Ok(())
}
