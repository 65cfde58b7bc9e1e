//! Keyed mutual exclusion.
//!
//! One mutex per key, created on first use and dropped once no caller holds or
//! waits on it.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug)]
pub struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Copy,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`.
    ///
    /// A panic inside another holder does not wedge the key: the guard only
    /// protects `()`, so a poisoned mutex is recovered. The slot is released on
    /// unwind as well as on return.
    pub fn with<T>(&self, key: K, f: impl FnOnce() -> T) -> T {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key).or_default())
        };
        let release = Release { locks: self, key, slot };

        // Dropped before `release`, so the key is unlocked before it is pruned.
        let _guard = release.slot.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Number of keys currently tracked.
    pub fn tracked(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Prunes a key's slot when its last user leaves.
struct Release<'a, K: Eq + Hash> {
    locks: &'a KeyedLocks<K>,
    key: K,
    slot: Arc<Mutex<()>>,
}

impl<K: Eq + Hash> Drop for Release<'_, K> {
    fn drop(&mut self) {
        let mut slots = self.locks.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // Map entry plus our clone: nobody else is holding or waiting.
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    #[test]
    fn same_key_is_serialized() {
        let locks = Arc::new(KeyedLocks::<u32>::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    for _ in 0..50 {
                        locks.with(7, || {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            inside.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn idle_keys_are_released() {
        let locks = KeyedLocks::<u32>::new();
        assert_eq!(locks.with(1, || 42), 42);
        locks.with(2, || locks.tracked());
        assert_eq!(locks.tracked(), 0);
    }

    #[test]
    fn distinct_keys_nest() {
        let locks = KeyedLocks::<u32>::new();
        let value = locks.with(1, || locks.with(2, || locks.tracked()));
        assert_eq!(value, 2);
    }

    #[test]
    fn panicking_holder_does_not_wedge_the_key() {
        let locks = Arc::new(KeyedLocks::<u32>::new());
        let cloned = Arc::clone(&locks);
        let joined = thread::spawn(move || cloned.with(3, || panic!("boom"))).join();
        assert!(joined.is_err());
        assert_eq!(locks.tracked(), 0);

        assert_eq!(locks.with(3, || "ok"), "ok");
        assert_eq!(locks.tracked(), 0);
    }

    #[test]
    fn nested_unwind_releases_both_slots() {
        let locks = KeyedLocks::<u32>::new();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            locks.with(4, || locks.with(5, || panic!("inner")))
        }));
        assert!(outcome.is_err());
        assert_eq!(locks.tracked(), 0);
    }
}
