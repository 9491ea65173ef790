// ─── Keyed Guard ───
// One live entry per key. Used twice: install records keyed by item id and
// running sessions keyed by bundle id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::warn;

/// Proof of ownership of a registry slot.
///
/// Tokens carry the generation they were issued for, so a late `release`
/// from a finished operation never evicts a newer entry under the same key.
#[derive(Debug, PartialEq, Eq)]
pub struct GuardToken {
    key: String,
    generation: u64,
}

impl GuardToken {
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Returned by `acquire` when the key is already held by a live entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyHeld;

struct Slot<V> {
    generation: u64,
    value: V,
}

pub struct KeyedGuard<V> {
    slots: Mutex<HashMap<String, Slot<V>>>,
    next_generation: AtomicU64,
}

impl<V> Default for KeyedGuard<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> KeyedGuard<V> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot<V>>> {
        // A panic while holding the lock cannot leave a slot half-written:
        // every critical section is a single map operation.
        self.slots.lock().unwrap_or_else(|poisoned| {
            warn!("registry lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Insert `value` under `key` unless an entry already exists.
    pub fn acquire(&self, key: &str, value: V) -> Result<GuardToken, AlreadyHeld> {
        self.acquire_unless_live(key, value, |_| true)
    }

    /// Like `acquire`, but an existing entry for which `is_live` returns
    /// false is purged and replaced in the same critical section.
    pub fn acquire_unless_live(
        &self,
        key: &str,
        value: V,
        is_live: impl FnOnce(&V) -> bool,
    ) -> Result<GuardToken, AlreadyHeld> {
        let mut slots = self.lock();
        if let Some(existing) = slots.get(key) {
            if is_live(&existing.value) {
                return Err(AlreadyHeld);
            }
            slots.remove(key);
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        slots.insert(key.to_string(), Slot { generation, value });
        Ok(GuardToken {
            key: key.to_string(),
            generation,
        })
    }

    /// Remove the entry owned by `token`. Returns `None` when the slot was
    /// already removed or now belongs to a newer acquisition.
    pub fn release(&self, token: &GuardToken) -> Option<V> {
        let mut slots = self.lock();
        match slots.get(&token.key) {
            Some(slot) if slot.generation == token.generation => {
                slots.remove(&token.key).map(|slot| slot.value)
            }
            _ => None,
        }
    }

    /// Unconditionally drop whatever is stored under `key`.
    pub fn remove(&self, key: &str) -> Option<V> {
        self.lock().remove(key).map(|slot| slot.value)
    }

    /// Mutate the entry owned by `token`. Returns false if the token is stale.
    pub fn update(&self, token: &GuardToken, f: impl FnOnce(&mut V)) -> bool {
        let mut slots = self.lock();
        match slots.get_mut(&token.key) {
            Some(slot) if slot.generation == token.generation => {
                f(&mut slot.value);
                true
            }
            _ => false,
        }
    }

    pub fn with<R>(&self, key: &str, f: impl FnOnce(&V) -> R) -> Option<R> {
        self.lock().get(key).map(|slot| f(&slot.value))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map every entry while holding the lock once.
    pub fn snapshot<R>(&self, mut f: impl FnMut(&str, &V) -> Option<R>) -> Vec<R> {
        self.lock()
            .iter()
            .filter_map(|(key, slot)| f(key, &slot.value))
            .collect()
    }
}
