//! Budgeted lazy materialization.
//!
//! Items are built on demand with [`MaterializeQueue::request`], or queued
//! with [`MaterializeQueue::enqueue`] and filled in the background a few at a
//! time by [`MaterializeQueue::tick`]. Each key is materialized at most once.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;

/// Work queue of keys waiting to be materialized, plus the finished values.
#[derive(Debug, Clone)]
pub struct MaterializeQueue<K, V> {
    ready: HashMap<K, V>,
    pending: VecDeque<K>,
    /// Keys in `pending` that still need work; requested keys leave this set
    queued: HashSet<K>,
}

impl<K, V> Default for MaterializeQueue<K, V> {
    fn default() -> Self {
        Self { ready: HashMap::new(), pending: VecDeque::new(), queued: HashSet::new() }
    }
}

impl<K, V> MaterializeQueue<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the value for `key`, building it now if needed.
    pub fn request<F>(&mut self, key: K, build: F) -> &V
    where
        F: FnOnce(&K) -> V,
    {
        self.queued.remove(&key);
        self.ready.entry(key).or_insert_with_key(build)
    }

    /// Queue `key` for background work. Returns `false` if it is already
    /// ready or queued.
    pub fn enqueue(&mut self, key: K) -> bool {
        if self.ready.contains_key(&key) || self.queued.contains(&key) {
            return false;
        }
        self.queued.insert(key.clone());
        self.pending.push_back(key);
        true
    }

    /// Materialize up to `budget` queued keys in FIFO order. Returns `true`
    /// once nothing is left to do.
    pub fn tick<F>(&mut self, budget: usize, mut build: F) -> bool
    where
        F: FnMut(&K) -> V,
    {
        let mut done = 0;
        while done < budget {
            let Some(key) = self.pending.pop_front() else { break };
            // Already served by `request`
            if !self.queued.remove(&key) {
                continue;
            }
            let value = build(&key);
            self.ready.insert(key, value);
            done += 1;
        }
        if done > 0 {
            log::debug!("materialized {} item(s), {} pending", done, self.queued.len());
        }
        self.is_drained()
    }

    /// Fraction of known keys that are ready, in `[0, 1]`. An empty queue
    /// reports `1.0`.
    pub fn progress(&self) -> f32 {
        let total = self.ready.len() + self.queued.len();
        if total == 0 {
            1.0
        } else {
            self.ready.len() as f32 / total as f32
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.ready.get(key)
    }

    pub fn is_ready(&self, key: &K) -> bool {
        self.ready.contains_key(key)
    }

    pub fn is_drained(&self) -> bool {
        self.queued.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.queued.len()
    }

    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// Forget one materialized value so it is rebuilt on next request.
    pub fn invalidate(&mut self, key: &K) -> Option<V> {
        self.ready.remove(key)
    }

    pub fn clear(&mut self) {
        self.ready.clear();
        self.pending.clear();
        self.queued.clear();
    }
}
