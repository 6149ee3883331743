//! Process-wide single-flight gate for post downloads.

use tokio::sync::{Mutex, MutexGuard};

/// At most one gated download runs at a time.
///
/// Share one gate (behind an `Arc`) between every [`Downloader`](super::Downloader)
/// that should be serialized. Waiters are served in FIFO order.
#[derive(Debug, Default)]
pub struct DownloadGate {
    lock: Mutex<()>,
}

impl DownloadGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the gate; it reopens when the guard drops.
    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    pub fn is_busy(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}
