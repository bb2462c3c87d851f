use crate::api::{ApiError, EmailApi};
use crate::auth::AuthHandler;
use crate::events::{SyncBus, SyncEvent};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// What the status line shows about background sync.
#[derive(Debug, Default, Clone)]
pub struct SyncState {
    pub in_progress: bool,
    pub last_completed: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Asks the backend to sync and announces the result on the [`SyncBus`].
pub struct SyncService {
    api: Arc<dyn EmailApi>,
    auth: Arc<dyn AuthHandler>,
    bus: SyncBus,
    state: Arc<Mutex<SyncState>>,
}

impl SyncService {
    pub fn new(
        api: Arc<dyn EmailApi>,
        auth: Arc<dyn AuthHandler>,
        bus: SyncBus,
        state: Arc<Mutex<SyncState>>,
    ) -> Self {
        Self {
            api,
            auth,
            bus,
            state,
        }
    }

    pub async fn sync_once(&self) -> Result<(), ApiError> {
        if !self.auth.is_authenticated() {
            return Ok(());
        }
        if let Ok(mut state) = self.state.lock() {
            state.in_progress = true;
        }
        self.bus.publish(SyncEvent::Started);

        let result = self.api.sync().await;

        let event = match &result {
            Ok(_) => {
                let synced_at = Utc::now();
                info!("Backend sync completed");
                if let Ok(mut state) = self.state.lock() {
                    state.last_completed = Some(synced_at);
                    state.last_error = None;
                }
                SyncEvent::Completed { synced_at }
            }
            Err(e) => {
                warn!("Backend sync failed: {}", e);
                if e.is_auth() {
                    self.auth.handle_auth_error();
                }
                if let Ok(mut state) = self.state.lock() {
                    state.last_error = Some(e.to_string());
                }
                SyncEvent::Failed {
                    error: e.to_string(),
                }
            }
        };
        if let Ok(mut state) = self.state.lock() {
            state.in_progress = false;
        }
        self.bus.publish(event);
        result.map(|_| ())
    }

    /// Syncs every `interval`, and immediately whenever `trigger` fires.
    pub fn spawn(self, interval: Option<Duration>, mut trigger: mpsc::Receiver<()>) {
        tokio::spawn(async move {
            let mut ticker = interval.map(tokio::time::interval);
            if let Some(ticker) = ticker.as_mut() {
                // The first tick is immediate; the list loads on its own at startup.
                ticker.tick().await;
            }
            loop {
                tokio::select! {
                    _ = async {
                        match ticker.as_mut() {
                            Some(t) => { t.tick().await; }
                            None => std::future::pending::<()>().await,
                        }
                    } => {}
                    received = trigger.recv() => {
                        if received.is_none() {
                            break;
                        }
                        // Collapse a burst of manual triggers into one sync.
                        while trigger.try_recv().is_ok() {}
                    }
                }
                if let Err(e) = self.sync_once().await {
                    debug!("Sync loop continuing after failure: {}", e);
                }
            }
        });
    }
}
