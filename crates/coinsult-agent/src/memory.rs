//! Thread-scoped conversation memory.
//!
//! Lives in process memory only. A new store is an empty store, which is how a
//! restart looks to a thread.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::state::ConversationState;

/// Last completed state per thread, plus a per-thread turn lock
#[derive(Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, ConversationState>>,
    turn_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the thread's last saved state
    pub fn load(&self, thread_id: &str) -> Option<ConversationState> {
        self.slots.lock().get(thread_id).cloned()
    }

    pub fn save(&self, thread_id: &str, state: ConversationState) {
        self.slots.lock().insert(thread_id.to_string(), state);
    }

    pub fn contains(&self, thread_id: &str) -> bool {
        self.slots.lock().contains_key(thread_id)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Lock that serializes turns on one thread. Created on first use and
    /// removed when the last handle for the thread is dropped.
    pub(crate) fn turn_lock(&self, thread_id: &str) -> TurnLock<'_> {
        let mut locks = self.turn_locks.lock();
        let lock = Arc::clone(locks.entry(thread_id.to_string()).or_default());
        TurnLock {
            store: self,
            thread_id: thread_id.to_string(),
            lock,
        }
    }

    #[cfg(test)]
    pub(crate) fn turn_lock_count(&self) -> usize {
        self.turn_locks.lock().len()
    }
}

/// Handle to one thread's turn lock
pub(crate) struct TurnLock<'a> {
    store: &'a MemoryStore,
    thread_id: String,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl TurnLock<'_> {
    /// Wait for earlier turns on the thread to finish
    pub(crate) async fn acquire(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

impl Drop for TurnLock<'_> {
    fn drop(&mut self) {
        // Handles are only cloned under the map lock, so the count is stable here.
        let mut locks = self.store.turn_locks.lock();
        let last = locks
            .get(&self.thread_id)
            .is_some_and(|entry| Arc::ptr_eq(entry, &self.lock) && Arc::strong_count(&self.lock) == 2);
        if last {
            locks.remove(&self.thread_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let store = MemoryStore::new();
        assert!(store.load("a").is_none());

        let mut state = ConversationState::new("a");
        state.coin = "bitcoin".into();
        store.save("a", state);

        assert_eq!(store.load("a").unwrap().coin, "bitcoin");
        assert!(store.load("b").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_new_store_forgets_everything() {
        let store = MemoryStore::new();
        store.save("a", ConversationState::new("a"));
        let restarted = MemoryStore::new();
        assert!(!restarted.contains("a"));
        assert!(restarted.is_empty());
    }

    #[test]
    fn test_turn_lock_is_shared_per_thread() {
        let store = MemoryStore::new();
        let a1 = store.turn_lock("a");
        let a2 = store.turn_lock("a");
        let b = store.turn_lock("b");
        assert!(Arc::ptr_eq(&a1.lock, &a2.lock));
        assert!(!Arc::ptr_eq(&a1.lock, &b.lock));
        assert_eq!(store.turn_lock_count(), 2);
    }

    #[test]
    fn test_turn_lock_removed_with_last_handle() {
        let store = MemoryStore::new();
        let a1 = store.turn_lock("a");
        let a2 = store.turn_lock("a");
        let b = store.turn_lock("b");

        drop(a1);
        assert_eq!(store.turn_lock_count(), 2);
        drop(a2);
        assert_eq!(store.turn_lock_count(), 1);
        drop(b);
        assert_eq!(store.turn_lock_count(), 0);
    }

    #[tokio::test]
    async fn test_turn_lock_blocks_second_holder() {
        let store = MemoryStore::new();
        let first = store.turn_lock("a");
        let second = store.turn_lock("a");

        let guard = first.acquire().await;
        assert!(second.lock.try_lock().is_err());
        drop(guard);
        assert!(second.lock.try_lock().is_ok());
    }
}
