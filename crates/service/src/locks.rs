//! Per-entity mutual exclusion inside one process.
//!
//! Keys are service request, service or report ids. Lifecycle mutations on the
//! same request run one at a time, and accepts on one service also queue on
//! the service id. Unrelated ids never wait on each other. Entries are dropped
//! again once no caller holds or waits for them.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct RequestLocks {
    inner: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl RequestLocks {
    pub fn new() -> Self { Self::default() }

    /// Wait for exclusive access to `id`.
    pub async fn acquire(&self, id: Uuid) -> RequestGuard {
        let slot = self
            .inner
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = slot.lock_owned().await;
        RequestGuard { id, guard: Some(guard), map: Arc::clone(&self.inner) }
    }

    /// Number of requests currently tracked.
    pub fn tracked(&self) -> usize { self.inner.len() }
}

pub struct RequestGuard {
    id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
    map: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        // Release first so our own Arc no longer counts.
        self.guard.take();
        self.map.remove_if(&self.id, |_, slot| Arc::strong_count(slot) == 1);
    }
}
