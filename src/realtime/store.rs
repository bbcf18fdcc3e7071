//! Live status map.
//!
//! One entry per agent (or execution) id, always the most recently received
//! update. Written only by the hub task; read through cheap `Arc` snapshots
//! or a `watch` subscription that wakes on every change.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use openautomate_types::{StatusChannel, StatusUpdate};

pub type StatusMap = HashMap<String, StatusUpdate>;

/// Reactive id → latest status mapping for one channel.
#[derive(Clone)]
pub struct StatusStore {
    channel: StatusChannel,
    inner: Arc<StoreInner>,
}

struct StoreInner {
    tx: watch::Sender<Arc<StatusMap>>,
    closed: AtomicBool,
}

impl StatusStore {
    pub fn new(channel: StatusChannel) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(StatusMap::new()));
        Self {
            channel,
            inner: Arc::new(StoreInner {
                tx,
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn channel(&self) -> StatusChannel {
        self.channel
    }

    /// Merge one update. Last writer wins.
    ///
    /// Returns `false` when the update was dropped: store closed, or the
    /// update carries no key for this channel.
    pub fn apply(&self, update: StatusUpdate) -> bool {
        let Some(key) = update.key(self.channel).map(str::to_string) else {
            return false;
        };
        // The closed check runs under the watch lock, so it cannot interleave with `close`.
        let closed = &self.inner.closed;
        self.inner.tx.send_if_modified(|map| {
            if closed.load(Ordering::SeqCst) {
                return false;
            }
            Arc::make_mut(map).insert(key, update);
            true
        })
    }

    pub fn get(&self, key: &str) -> Option<StatusUpdate> {
        self.inner.tx.borrow().get(key).cloned()
    }

    pub fn snapshot(&self) -> Arc<StatusMap> {
        self.inner.tx.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receiver that observes every change. Call `changed().await` to wait.
    pub fn subscribe(&self) -> watch::Receiver<Arc<StatusMap>> {
        self.inner.tx.subscribe()
    }

    /// Stop accepting updates. Existing entries stay readable.
    ///
    /// Once this returns, no `apply` can land.
    pub fn close(&self) {
        let closed = &self.inner.closed;
        self.inner.tx.send_if_modified(|_| {
            closed.store(true, Ordering::SeqCst);
            false
        });
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for StatusStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusStore")
            .field("channel", &self.channel)
            .field("entries", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
