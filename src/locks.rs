//! Per-binding single flight.
//!
//! The reconciler assumes at most one lifecycle operation in flight per
//! resource instance. [`BindingLocks`] enforces that when the orchestrator
//! drives several operations concurrently: callers take the lock for a key
//! (type name plus id, or plus name before an id exists) and hold the guard
//! for the whole operation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

/// Lock table keyed by binding.
#[derive(Debug, Default)]
pub struct BindingLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of one lifecycle operation.
#[derive(Debug)]
pub struct BindingGuard {
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl BindingGuard {
    /// The key this guard holds.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl BindingLocks {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Key for an instance that already has a remote id.
    pub fn id_key(resource_type: &str, id: &str) -> String {
        format!("{}:{}", resource_type, id)
    }

    /// Key for an instance that is only known by name.
    pub fn name_key(resource_type: &str, name: &str) -> String {
        format!("{}:name:{}", resource_type, name)
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: String) -> BindingGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries nobody holds or waits on are only referenced by the table.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        if lock.try_lock().is_err() {
            debug!(key = %key, "Waiting for in-flight operation on the same resource");
        }
        BindingGuard {
            key,
            _guard: lock.lock_owned().await,
        }
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no key is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
