use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub fetched_at: Instant,
}

#[derive(Debug)]
struct Slot<V> {
    entry: Option<CacheEntry<V>>,
    generation: u64,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self { entry: None, generation: 0 }
    }
}

/// Query results keyed by `K`, each stamped with its fetch time.
///
/// Every key carries a generation that `invalidate` bumps; a fetch records the
/// generation it started under and `insert_if_current` refuses to store its
/// result once the key has been invalidated since.
#[derive(Debug)]
pub struct QueryCache<K, V> {
    slots: Mutex<HashMap<K, Slot<V>>>,
    stale_after: Duration,
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(stale_after: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            stale_after,
        }
    }

    pub fn get(&self, key: &K) -> Option<CacheEntry<V>> {
        self.slots.lock().get(key).and_then(|slot| slot.entry.clone())
    }

    /// Value younger than the staleness window.
    pub fn get_fresh(&self, key: &K) -> Option<V> {
        self.get(key)
            .filter(|entry| !self.is_entry_stale(entry))
            .map(|entry| entry.value)
    }

    /// Absent entries count as stale.
    pub fn is_stale(&self, key: &K) -> bool {
        self.get(key).map_or(true, |entry| self.is_entry_stale(&entry))
    }

    fn is_entry_stale(&self, entry: &CacheEntry<V>) -> bool {
        entry.fetched_at.elapsed() >= self.stale_after
    }

    pub fn generation(&self, key: &K) -> u64 {
        self.slots.lock().get(key).map_or(0, |slot| slot.generation)
    }

    pub fn insert(&self, key: K, value: V) {
        let mut slots = self.slots.lock();
        slots.entry(key).or_default().entry = Some(CacheEntry {
            value,
            fetched_at: Instant::now(),
        });
    }

    /// Store `value` only if `key` was not invalidated after `generation` was read.
    pub fn insert_if_current(&self, key: K, generation: u64, value: V) -> bool {
        let mut slots = self.slots.lock();
        let slot = slots.entry(key).or_default();
        if slot.generation != generation {
            return false;
        }
        slot.entry = Some(CacheEntry {
            value,
            fetched_at: Instant::now(),
        });
        true
    }

    pub fn invalidate(&self, key: &K) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(key) {
            slot.entry = None;
            slot.generation += 1;
        } else {
            slots.insert(key.clone(), Slot { entry: None, generation: 1 });
        }
    }
}
