//! Infinite-scroll trigger.
//!
//! The list ends in a sentinel row. [`SentinelObserver`] decides whether the
//! sentinel becoming visible should ask the controller for another page. It
//! is rebuilt every time the inputs it depends on change, and disconnected
//! when the list goes away.

use tracing::trace;

/// Inputs the observer is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverDeps {
    pub initial_load_complete: bool,
    pub has_more: bool,
    pub loading_more: bool,
    pub page: u32,
    pub generation: u64,
}

impl ObserverDeps {
    fn wants_observer(&self) -> bool {
        self.initial_load_complete && self.has_more && !self.loading_more
    }
}

#[derive(Debug, Default)]
pub struct SentinelObserver {
    deps: Option<ObserverDeps>,
    connected: bool,
    fired: bool,
    rebuilds: u64,
}

impl SentinelObserver {
    /// Rebuilds the observer if `deps` differ from the last snapshot.
    pub fn sync(&mut self, deps: ObserverDeps) {
        if self.deps == Some(deps) {
            return;
        }
        self.disconnect();
        self.deps = Some(deps);
        self.rebuilds += 1;
        if deps.wants_observer() {
            trace!("Observing sentinel for page {}", deps.page + 1);
            self.connected = true;
        }
    }

    /// Reports the sentinel's visibility. Returns `true` at most once per
    /// observer instance, on the first visible report.
    pub fn notify(&mut self, visible: bool) -> bool {
        if !self.connected || !visible || self.fired {
            return false;
        }
        self.fired = true;
        true
    }

    pub fn disconnect(&mut self) {
        self.connected = false;
        self.fired = false;
    }

    /// Forgets the last snapshot so the next [`sync`](Self::sync) rebuilds.
    pub fn unmount(&mut self) {
        self.disconnect();
        self.deps = None;
    }

    #[cfg(test)]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    #[cfg(test)]
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }
}

/// Whether the sentinel row sits inside the viewport. The sentinel is the
/// row just past the last email.
pub fn sentinel_visible(len: usize, offset: usize, viewport_rows: usize) -> bool {
    viewport_rows > 0 && offset + viewport_rows > len
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(page: u32) -> ObserverDeps {
        ObserverDeps {
            initial_load_complete: true,
            has_more: true,
            loading_more: false,
            page,
            generation: 1,
        }
    }

    #[test]
    fn test_not_connected_before_initial_load() {
        let mut observer = SentinelObserver::default();
        observer.sync(ObserverDeps {
            initial_load_complete: false,
            ..deps(1)
        });
        assert!(!observer.notify(true));
    }

    #[test]
    fn test_fires_once_until_deps_change() {
        let mut observer = SentinelObserver::default();
        observer.sync(deps(1));
        assert!(!observer.notify(false));
        assert!(observer.notify(true));
        assert!(!observer.notify(true));

        observer.sync(deps(1));
        assert!(!observer.notify(true));

        observer.sync(deps(2));
        assert_eq!(observer.rebuilds(), 2);
        assert!(observer.notify(true));
    }

    #[test]
    fn test_no_observer_while_loading_more_or_exhausted() {
        let mut observer = SentinelObserver::default();
        observer.sync(ObserverDeps {
            loading_more: true,
            ..deps(2)
        });
        assert!(!observer.is_connected());

        observer.sync(ObserverDeps {
            has_more: false,
            ..deps(3)
        });
        assert!(!observer.notify(true));
    }

    #[test]
    fn test_unmount_disconnects() {
        let mut observer = SentinelObserver::default();
        observer.sync(deps(1));
        observer.unmount();
        assert!(!observer.is_connected());
        assert!(!observer.notify(true));

        observer.sync(deps(1));
        assert!(observer.notify(true));
    }

    #[test]
    fn test_sentinel_visibility() {
        assert!(!sentinel_visible(50, 0, 20));
        assert!(sentinel_visible(50, 31, 20));
        assert!(sentinel_visible(0, 0, 5));
        assert!(!sentinel_visible(0, 0, 0));
    }
}
