//! Request throttling for the upstream API.
//!
//! Every upstream call goes through one [`RequestThrottle`]. Calls are
//! serialized, and after each completed call the gate stays closed for the
//! configured spacing. The cooldown runs on a detached task that owns the
//! gate, so the caller that just finished gets its response right away and
//! only the *next* caller waits.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::sleep;

/// Shared gate enforcing a minimum spacing between upstream requests.
#[derive(Debug)]
pub struct RequestThrottle {
    gate: Arc<Mutex<()>>,
    spacing: Duration,
}

impl RequestThrottle {
    pub fn new(spacing: Duration) -> Self {
        Self {
            gate: Arc::new(Mutex::new(())),
            spacing,
        }
    }

    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Run `request` while holding the gate, then start the cooldown.
    ///
    /// The cooldown also starts when the returned future is dropped before
    /// the request finishes.
    pub async fn run<F, T>(&self, request: F) -> T
    where
        F: Future<Output = T>,
    {
        let guard = Arc::clone(&self.gate).lock_owned().await;
        let _cooldown = Cooldown {
            guard: Some(guard),
            spacing: self.spacing,
        };
        request.await
    }
}

/// Holds the gate for one request and releases it after `spacing` on drop.
struct Cooldown {
    guard: Option<OwnedMutexGuard<()>>,
    spacing: Duration,
}

impl Drop for Cooldown {
    fn drop(&mut self) {
        let Some(guard) = self.guard.take() else {
            return;
        };
        if self.spacing.is_zero() {
            return;
        }

        // Outside a runtime there is nobody left to wait for the gate.
        let Ok(handle) = Handle::try_current() else {
            return;
        };
        let spacing = self.spacing;
        handle.spawn(async move {
            sleep(spacing).await;
            drop(guard);
        });
    }
}
