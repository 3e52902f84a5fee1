//! Bounded-recency shuffle
//!
//! Serves items from a pre-permuted `pending` order and remembers the last
//! `H` items served. A new cycle is built only from items outside that
//! window, so for a catalog larger than `H` no item repeats within any
//! `H + 1` consecutive results. Catalogs of `H` items or fewer fall back to
//! permuting everything, the only case where a repeat can come early.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// Default anti-repetition window
pub const DEFAULT_SHUFFLE_HISTORY: usize = 3;

/// Shuffle order with an anti-repetition window
#[derive(Debug, Clone)]
pub struct ShuffleQueue<T> {
    /// Every item, deduplicated, in catalog order
    catalog: Vec<T>,

    /// Items not yet served in this cycle
    pending: VecDeque<T>,

    /// Last served items (most recent = back)
    recent: VecDeque<T>,

    /// Window size
    capacity: usize,

    rng: StdRng,
}

impl<T: Clone + Eq + Hash> ShuffleQueue<T> {
    /// Create an empty queue with a randomly seeded generator
    pub fn new(capacity: usize) -> Self {
        Self::with_rng(capacity, StdRng::from_entropy())
    }

    /// Create an empty queue with a fixed seed
    pub fn with_seed(capacity: usize, seed: u64) -> Self {
        Self::with_rng(capacity, StdRng::seed_from_u64(seed))
    }

    /// Create an empty queue with the given generator
    pub fn with_rng(capacity: usize, rng: StdRng) -> Self {
        Self {
            catalog: Vec::new(),
            pending: VecDeque::new(),
            recent: VecDeque::with_capacity(capacity),
            capacity,
            rng,
        }
    }

    /// Replace the catalog and start over
    ///
    /// Duplicates are dropped, keeping the first occurrence.
    pub fn set_catalog(&mut self, items: impl IntoIterator<Item = T>) {
        let mut seen = HashSet::new();
        self.catalog = items
            .into_iter()
            .filter(|item| seen.insert(item.clone()))
            .collect();
        self.pending.clear();
        self.recent.clear();
    }

    /// Serve the next item, `None` only for an empty catalog
    pub fn next(&mut self) -> Option<T> {
        if self.catalog.is_empty() {
            return None;
        }
        if self.pending.is_empty() {
            self.refill();
        }
        let item = self.pending.pop_front()?;
        self.remember(item.clone());
        Some(item)
    }

    /// Record an item that was started outside the shuffle order
    pub fn mark_played(&mut self, item: &T) {
        if !self.catalog.contains(item) {
            return;
        }
        self.pending.retain(|pending| pending != item);
        self.remember(item.clone());
    }

    /// Drop the current cycle but keep the recency window
    pub fn reshuffle(&mut self) {
        self.pending.clear();
    }

    /// Items served most recently, oldest first
    pub fn recent(&self) -> impl Iterator<Item = &T> {
        self.recent.iter()
    }

    /// Items left in the current cycle
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Window size
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Catalog size
    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    fn refill(&mut self) {
        let mut order: Vec<T> = self
            .catalog
            .iter()
            .filter(|item| !self.recent.contains(item))
            .cloned()
            .collect();

        if order.is_empty() {
            // Catalog no larger than the window: repeats are unavoidable
            order.clone_from(&self.catalog);
        }

        order.shuffle(&mut self.rng);
        self.pending = order.into();
    }

    fn remember(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        self.recent.retain(|recent| recent != &item);
        if self.recent.len() >= self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(item);
    }
}
