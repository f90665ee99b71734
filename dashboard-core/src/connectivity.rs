//! Connectivity reporting.
//!
//! A [`ConnectivityProbe`] answers "are we online, and over what" synchronously
//! and vends [`ConnectivityEvents`] subscriptions for live changes.

use parking_lot::RwLock;
use std::{fmt::Debug, sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::model::{ConnectionClass, NetworkStatus};

const EVENT_BUFFER: usize = 16;

pub trait ConnectivityProbe: Send + Sync + Debug {
    /// Fresh reading, never a value cached by the caller.
    fn current_status(&self) -> NetworkStatus;

    fn events(&self) -> ConnectivityEvents;
}

/// Live stream of connectivity changes.
///
/// Dropping or calling [`ConnectivityEvents::cancel`] ends delivery.
#[derive(Debug)]
pub struct ConnectivityEvents {
    rx: Option<broadcast::Receiver<NetworkStatus>>,
}

impl ConnectivityEvents {
    pub fn new(rx: broadcast::Receiver<NetworkStatus>) -> Self {
        Self { rx: Some(rx) }
    }

    /// Next status, or `None` once the source is gone or the stream cancelled.
    /// Missed events from a lagging receiver are skipped.
    pub async fn next(&mut self) -> Option<NetworkStatus> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(status) => return Some(status),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "connectivity subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.rx = None;
                    return None;
                }
            }
        }
    }

    pub fn cancel(&mut self) {
        self.rx = None;
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.is_none()
    }
}

/// Probe whose status is set from the outside.
///
/// Platform glue (or a test) calls [`ManualProbe::set_status`]; subscribers
/// receive every change.
#[derive(Debug)]
pub struct ManualProbe {
    status: RwLock<NetworkStatus>,
    tx: broadcast::Sender<NetworkStatus>,
}

impl ManualProbe {
    pub fn new(initial: NetworkStatus) -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        Self { status: RwLock::new(initial), tx }
    }

    /// Record a new status and notify subscribers if it changed.
    pub fn set_status(&self, status: NetworkStatus) {
        let changed = {
            let mut current = self.status.write();
            let changed = *current != status;
            *current = status;
            changed
        };
        if changed {
            self.publish(status);
        }
    }

    /// Notify subscribers even when the status is unchanged.
    pub fn publish(&self, status: NetworkStatus) {
        *self.status.write() = status;
        // No receivers is fine.
        let _ = self.tx.send(status);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl ConnectivityProbe for ManualProbe {
    fn current_status(&self) -> NetworkStatus {
        *self.status.read()
    }

    fn events(&self) -> ConnectivityEvents {
        ConnectivityEvents::new(self.tx.subscribe())
    }
}

/// Keeps a [`ManualProbe`] current by periodically opening a TCP connection
/// to a well-known host.
#[derive(Debug)]
pub struct ReachabilityMonitor {
    token: CancellationToken,
}

impl ReachabilityMonitor {
    /// Spawn the polling task. Must be called from within a tokio runtime.
    pub fn spawn(
        probe: Arc<ManualProbe>,
        host: String,
        class: ConnectionClass,
        interval: Duration,
    ) -> Self {
        let token = CancellationToken::new();
        let task_token = token.clone();

        tokio::spawn(async move {
            loop {
                let status = tokio::select! {
                    _ = task_token.cancelled() => break,
                    status = probe_reachability(&host, class, interval) => status,
                };

                if probe.current_status() != status {
                    tracing::info!(host = %host, connected = status.connected, "reachability changed");
                }
                probe.set_status(status);

                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            tracing::debug!("reachability monitor stopped");
        });

        Self { token }
    }

    pub fn stop(&self) {
        self.token.cancel();
    }
}

impl Drop for ReachabilityMonitor {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// One TCP connect attempt against `host` ("name:port").
pub async fn probe_reachability(
    host: &str,
    class: ConnectionClass,
    timeout: Duration,
) -> NetworkStatus {
    match tokio::time::timeout(timeout, tokio::net::TcpStream::connect(host)).await {
        Ok(Ok(_)) => NetworkStatus::online(class),
        Ok(Err(e)) => {
            tracing::debug!(host, "reachability check failed: {e}");
            NetworkStatus::OFFLINE
        }
        Err(_) => {
            tracing::debug!(host, "reachability check timed out");
            NetworkStatus::OFFLINE
        }
    }
}
