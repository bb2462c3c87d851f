//! Sync-completed notifications between the sync poller and the list.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Started,
    Completed { synced_at: DateTime<Utc> },
    Failed { error: String },
}

#[derive(Clone)]
pub struct SyncBus {
    sender: broadcast::Sender<SyncEvent>,
}

impl SyncBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns how many subscribers saw the event.
    pub fn publish(&self, event: SyncEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// The subscription ends when the returned handle is dropped.
    pub fn subscribe(&self) -> SyncSubscription {
        SyncSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SyncBus {
    fn default() -> Self {
        Self::new(16)
    }
}

pub struct SyncSubscription {
    receiver: broadcast::Receiver<SyncEvent>,
}

impl SyncSubscription {
    /// Waits for the next event. Lagged events are skipped; `None` once the
    /// bus is gone.
    pub async fn recv(&mut self) -> Option<SyncEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<SyncEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_completed() {
        let bus = SyncBus::new(4);
        let mut sub = bus.subscribe();
        let at = Utc::now();
        assert_eq!(bus.publish(SyncEvent::Completed { synced_at: at }), 1);
        assert_eq!(sub.recv().await, Some(SyncEvent::Completed { synced_at: at }));
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus = SyncBus::default();
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.publish(SyncEvent::Started), 0);
    }

    #[test]
    fn test_lagging_subscriber_skips_to_newest() {
        let bus = SyncBus::new(2);
        let mut sub = bus.subscribe();
        bus.publish(SyncEvent::Started);
        bus.publish(SyncEvent::Failed {
            error: "one".to_string(),
        });
        bus.publish(SyncEvent::Failed {
            error: "two".to_string(),
        });
        assert_eq!(
            sub.try_recv(),
            Some(SyncEvent::Failed {
                error: "one".to_string()
            })
        );
        assert_eq!(
            sub.try_recv(),
            Some(SyncEvent::Failed {
                error: "two".to_string()
            })
        );
        assert_eq!(sub.try_recv(), None);
    }
}
