use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use nickcap_api::event::{MessageId, RawPayload};

struct StoredPayload {
    payload: RawPayload,
    stored_at: Instant,
}

/// Concurrency-safe correlation buffer: raw payloads keyed by message id,
/// held until the enrichment join consumes them.
///
/// The store owns the synchronization discipline — callers never lock.
/// Entries outlive their usefulness fast (normalization follows the raw
/// delivery almost immediately), so anything older than `ttl` is treated as
/// absent and swept on the next insert to bound memory under sustained
/// delivery without matching consumption.
pub struct CorrelationStore {
    entries: Mutex<HashMap<MessageId, StoredPayload>>,
    ttl: Duration,
}

impl CorrelationStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Unconditional upsert. A second `put` for the same id overwrites the
    /// first (last-writer-wins).
    pub fn put(&self, id: MessageId, payload: RawPayload) {
        let now = Instant::now();
        let mut guard = self.lock();
        guard.retain(|_, e| now.duration_since(e.stored_at) < self.ttl);
        guard.insert(
            id,
            StoredPayload {
                payload,
                stored_at: now,
            },
        );
    }

    /// Atomic read-then-delete. `None` is a normal outcome: the payload was
    /// never stashed, already consumed, or expired. No payload is ever
    /// returned to two takers.
    pub fn take(&self, id: &str) -> Option<RawPayload> {
        let mut guard = self.lock();
        let entry = guard.remove(id)?;
        if entry.stored_at.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.payload)
    }

    /// Remove all entries (teardown).
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<MessageId, StoredPayload>> {
        match self.entries.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("correlation store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl std::fmt::Debug for CorrelationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationStore")
            .field("len", &self.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn payload(tag: i64) -> RawPayload {
        let mut map = RawPayload::new();
        map.insert("tag".into(), serde_json::json!(tag));
        map
    }

    fn store() -> CorrelationStore {
        CorrelationStore::new(Duration::from_secs(5))
    }

    #[test]
    fn put_then_take_consumes_exactly_once() {
        let store = store();
        store.put("m1".into(), payload(1));

        let taken = store.take("m1").unwrap();
        assert_eq!(taken.get("tag"), Some(&serde_json::json!(1)));
        assert!(store.take("m1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn take_on_never_inserted_id_is_a_no_op() {
        let store = store();
        store.put("m1".into(), payload(1));
        assert!(store.take("other").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn second_put_overwrites_first() {
        let store = store();
        store.put("m1".into(), payload(1));
        store.put("m1".into(), payload(2));

        assert_eq!(store.len(), 1);
        let taken = store.take("m1").unwrap();
        assert_eq!(taken.get("tag"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn expired_entries_are_absent_and_swept() {
        let store = CorrelationStore::new(Duration::from_millis(10));
        store.put("m1".into(), payload(1));
        std::thread::sleep(Duration::from_millis(25));

        assert!(store.take("m1").is_none());

        // A later put sweeps whatever expired entries remain.
        store.put("m2".into(), payload(2));
        std::thread::sleep(Duration::from_millis(25));
        store.put("m3".into(), payload(3));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clear_empties_the_store() {
        let store = store();
        store.put("m1".into(), payload(1));
        store.put("m2".into(), payload(2));
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn concurrent_puts_with_distinct_keys_lose_nothing() {
        let store = Arc::new(store());
        let mut handles = Vec::new();
        for t in 0..8 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    store.put(format!("m-{t}-{i}"), payload(i));
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.len(), 800);
        for t in 0..8 {
            for i in 0..100 {
                assert!(store.take(&format!("m-{t}-{i}")).is_some());
            }
        }
    }

    #[test]
    fn concurrent_takers_on_same_key_see_one_winner() {
        for _ in 0..50 {
            let store = Arc::new(store());
            store.put("m1".into(), payload(1));

            let mut handles = Vec::new();
            for _ in 0..8 {
                let store = store.clone();
                handles.push(std::thread::spawn(move || store.take("m1").is_some()));
            }

            let winners = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|won| *won)
                .count();
            assert_eq!(winners, 1);
        }
    }
}
