//! Registry of cancellation handles for in-flight requests

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

struct Registration {
    /// Distinguishes a re-used key (de-dup keys repeat over time)
    generation: u64,
    token: CancellationToken,
}

/// Maps request keys to their cancellation tokens
///
/// Entries are created through [`InFlightRegistry::register`] and removed
/// either by cancellation or by dropping the returned guard, whichever
/// comes first. The second removal attempt is a no-op.
#[derive(Default)]
pub struct InFlightRegistry {
    entries: Mutex<HashMap<String, Registration>>,
    next_generation: AtomicU64,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Registration>> {
        // A panic while holding the lock leaves the map itself consistent
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a fresh token under `key`
    ///
    /// If the key is somehow already taken the older request is cancelled,
    /// so no handle is ever orphaned.
    pub fn register(self: &Arc<Self>, key: String) -> RegistrationGuard {
        let token = CancellationToken::new();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        let previous = self.lock().insert(
            key.clone(),
            Registration {
                generation,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            tracing::warn!(key = %key, "Request key re-registered while in flight, cancelling older request");
            previous.token.cancel();
        }

        tracing::debug!(key = %key, "Request registered");

        RegistrationGuard {
            registry: Arc::clone(self),
            key,
            generation,
            token,
        }
    }

    /// Cancel and remove every entry
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<(String, Registration)> = self.lock().drain().collect();
        for (key, registration) in &drained {
            tracing::debug!(key = %key, "Request cancelled");
            registration.token.cancel();
        }
        drained.len()
    }

    /// Cancel and remove entries whose key contains `pattern`
    pub fn cancel_matching(&self, pattern: &str) -> usize {
        let mut matched = Vec::new();
        {
            let mut entries = self.lock();
            let keys: Vec<String> = entries
                .keys()
                .filter(|key| key.contains(pattern))
                .cloned()
                .collect();
            for key in keys {
                if let Some(registration) = entries.remove(&key) {
                    matched.push((key, registration));
                }
            }
        }

        for (key, registration) in &matched {
            tracing::debug!(key = %key, pattern = %pattern, "Request cancelled by pattern");
            registration.token.cancel();
        }
        matched.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn deregister(&self, key: &str, generation: u64) {
        let mut entries = self.lock();
        if entries
            .get(key)
            .is_some_and(|registration| registration.generation == generation)
        {
            entries.remove(key);
            tracing::debug!(key = %key, "Request deregistered");
        }
    }
}

/// Keeps a registry entry alive for the lifetime of one request
///
/// Dropping the guard deregisters the entry, which covers success, error,
/// timeout and the request future being dropped mid-flight.
pub struct RegistrationGuard {
    registry: Arc<InFlightRegistry>,
    key: String,
    generation: u64,
    token: CancellationToken,
}

impl RegistrationGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        self.registry.deregister(&self.key, self.generation);
    }
}
