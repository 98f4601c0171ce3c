//! Connectivity flag fed by the platform's network listener.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Event pushed by the platform adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityEvent {
    Online,
    Offline,
}

/// Single-writer, many-reader online flag.
///
/// Advisory only: callers still handle network failures when the flag
/// says online.
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    online_tx: Arc<watch::Sender<bool>>,
}

impl NetworkMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (online_tx, _) = watch::channel(initially_online);
        Self {
            online_tx: Arc::new(online_tx),
        }
    }

    pub fn is_online(&self) -> bool {
        *self.online_tx.borrow()
    }

    /// Update the flag. Returns true if the state changed.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.online_tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            if online {
                tracing::info!("Network connectivity restored");
            } else {
                tracing::warn!("Network connectivity lost; working offline");
            }
        }
        changed
    }

    pub fn apply(&self, event: ConnectivityEvent) -> bool {
        self.set_online(event == ConnectivityEvent::Online)
    }

    /// Receiver notified on every connectivity change.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online_tx.subscribe()
    }

    /// Read-only view of the flag for components that must not change it.
    pub fn status(&self) -> NetworkStatus {
        NetworkStatus {
            online_rx: self.online_tx.subscribe(),
        }
    }
}

/// Reader half of [`NetworkMonitor`].
#[derive(Debug, Clone)]
pub struct NetworkStatus {
    online_rx: watch::Receiver<bool>,
}

impl NetworkStatus {
    pub fn is_online(&self) -> bool {
        *self.online_rx.borrow()
    }

    /// Wait until the flag changes and return the new value. `None` once the
    /// monitor is gone.
    pub async fn changed(&mut self) -> Option<bool> {
        self.online_rx.changed().await.ok()?;
        Some(*self.online_rx.borrow_and_update())
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_online_reports_transitions_only() {
        let monitor = NetworkMonitor::new(true);

        assert!(!monitor.set_online(true));
        assert!(monitor.apply(ConnectivityEvent::Offline));
        assert!(!monitor.is_online());
        assert!(!monitor.apply(ConnectivityEvent::Offline));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn subscribers_see_changes() {
        let monitor = NetworkMonitor::new(false);
        let mut receiver = monitor.subscribe();
        let writer = monitor.clone();

        let handle = tokio::spawn(async move {
            receiver.changed().await.unwrap();
            *receiver.borrow()
        });
        writer.set_online(true);

        assert!(handle.await.unwrap());
        assert!(monitor.is_online());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn status_follows_the_monitor() {
        let monitor = NetworkMonitor::new(true);
        let mut status = monitor.status();
        assert!(status.is_online());

        let handle = tokio::spawn(async move { status.changed().await });
        monitor.apply(ConnectivityEvent::Offline);

        assert_eq!(handle.await.unwrap(), Some(false));
        assert!(!monitor.status().is_online());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn status_outlives_the_monitor() {
        let monitor = NetworkMonitor::new(false);
        let mut status = monitor.status();
        drop(monitor);

        assert!(!status.is_online());
        assert_eq!(status.changed().await, None);
    }
}
