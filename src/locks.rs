//! Per-key async mutual exclusion.
//!
//! [`KeyedLocks`] hands out one `tokio::sync::Mutex` per key so writers for
//! the same document hash run one at a time while different hashes proceed
//! concurrently. Guards may be held across `.await` points. Entries whose
//! mutex nobody holds or waits on are pruned on the next acquire.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.retain(|k, m| k == key || Arc::strong_count(m) > 1);
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        mutex.lock_owned().await
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
