use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-user latest-known display name, reconciled from captured mentions.
///
/// Writes are idempotent: storing the value already present is a no-op and
/// does not bump the change counter. Entries live for the process lifetime;
/// `clear` is only called on integration teardown.
#[derive(Default)]
pub struct NicknameCache {
    names: RwLock<HashMap<String, String>>,
    updates: AtomicU64,
}

impl NicknameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `nickname` for `user_id` unless it is already the stored value.
    ///
    /// Returns `true` when an observable update happened.
    pub fn update(&self, user_id: &str, nickname: &str) -> bool {
        let mut guard = match self.names.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("nickname cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        if guard.get(user_id).is_some_and(|cur| cur == nickname) {
            return false;
        }
        guard.insert(user_id.to_string(), nickname.to_string());
        self.updates.fetch_add(1, Ordering::Relaxed);
        true
    }

    pub fn get(&self, user_id: &str) -> Option<String> {
        let guard = match self.names.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("nickname cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.get(user_id).cloned()
    }

    /// Number of observable updates since construction.
    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        let guard = match self.names.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("nickname cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all entries (teardown).
    pub fn clear(&self) {
        let mut guard = match self.names.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("nickname cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.clear();
    }
}

impl std::fmt::Debug for NicknameCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NicknameCache")
            .field("len", &self.len())
            .field("updates", &self.update_count())
            .finish()
    }
}
