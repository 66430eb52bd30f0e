//! Skip List Module
//!
//! Probabilistic ordered structure backing the expiry index.
//!
//! Nodes live in a slot arena and link to each other by index. Each node is
//! assigned a level by repeated coin flips; level 0 chains every node in
//! non-decreasing key order, higher levels chain a sparser subset.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Maximum number of levels a node can participate in.
pub const MAX_LEVEL: usize = 16;

/// Probability of promoting a node one more level.
const PROMOTE_P: f64 = 0.5;

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: Option<V>,
    forward: Vec<Option<usize>>,
}

// == Skip List ==
/// Multi-level ordered list with expected O(log n) insert, remove and find-min.
///
/// Equal keys are kept in insertion order.
#[derive(Debug)]
pub struct SkipList<K, V> {
    head: [Option<usize>; MAX_LEVEL],
    nodes: Vec<Node<K, V>>,
    free: Vec<usize>,
    level: usize,
    len: usize,
    rng: StdRng,
}

impl<K: Ord, V> SkipList<K, V> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic level assignment, for tests.
    #[cfg(test)]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            head: [None; MAX_LEVEL],
            nodes: Vec::new(),
            free: Vec::new(),
            level: 1,
            len: 0,
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // == Insert ==
    /// Inserts `value` under `key`, after any existing equal keys.
    pub fn insert(&mut self, key: K, value: V) {
        let mut update = [None; MAX_LEVEL];
        let mut at = None;
        for level in (0..self.level).rev() {
            while let Some(next) = self.forward(at, level) {
                if self.nodes[next].key <= key {
                    at = Some(next);
                } else {
                    break;
                }
            }
            update[level] = at;
        }

        let height = self.random_level();
        if height > self.level {
            // update[level..height] is already None, i.e. the head
            self.level = height;
        }

        let node = Node {
            key,
            value: Some(value),
            forward: vec![None; height],
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };

        for (level, pred) in update.iter().enumerate().take(height) {
            self.nodes[slot].forward[level] = self.forward(*pred, level);
            self.set_forward(*pred, level, Some(slot));
        }
        self.len += 1;
    }

    // == Remove ==
    /// Removes the earliest-inserted node with `key` and returns its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let mut update = [None; MAX_LEVEL];
        let mut at = None;
        for level in (0..self.level).rev() {
            while let Some(next) = self.forward(at, level) {
                if self.nodes[next].key < *key {
                    at = Some(next);
                } else {
                    break;
                }
            }
            update[level] = at;
        }

        let target = self.forward(update[0], 0)?;
        if self.nodes[target].key != *key {
            return None;
        }

        for (level, pred) in update.iter().enumerate().take(self.nodes[target].forward.len()) {
            if self.forward(*pred, level) == Some(target) {
                let next = self.nodes[target].forward[level];
                self.set_forward(*pred, level, next);
            }
        }

        Some(self.release(target))
    }

    // == Find Minimum ==
    /// Returns the smallest key and its value.
    pub fn first(&self) -> Option<(&K, &V)> {
        let node = &self.nodes[self.head[0]?];
        node.value.as_ref().map(|value| (&node.key, value))
    }

    /// Removes and returns the smallest key's value.
    pub fn pop_first(&mut self) -> Option<V> {
        let first = self.head[0]?;
        for level in 0..self.nodes[first].forward.len() {
            self.head[level] = self.nodes[first].forward[level];
        }
        Some(self.release(first))
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        std::iter::successors(self.head[0], move |&slot| self.nodes[slot].forward[0]).filter_map(
            move |slot| {
                let node = &self.nodes[slot];
                node.value.as_ref().map(|value| (&node.key, value))
            },
        )
    }

    fn release(&mut self, slot: usize) -> V {
        let node = &mut self.nodes[slot];
        node.forward.clear();
        let value = node.value.take();
        self.free.push(slot);
        self.len -= 1;

        while self.level > 1 && self.head[self.level - 1].is_none() {
            self.level -= 1;
        }

        match value {
            Some(value) => value,
            // A linked slot always holds a value; freed slots are never linked.
            None => unreachable!("skip list slot {} linked without a value", slot),
        }
    }

    fn forward(&self, at: Option<usize>, level: usize) -> Option<usize> {
        match at {
            Some(slot) => self.nodes[slot].forward[level],
            None => self.head[level],
        }
    }

    fn set_forward(&mut self, at: Option<usize>, level: usize, to: Option<usize>) {
        match at {
            Some(slot) => self.nodes[slot].forward[level] = to,
            None => self.head[level] = to,
        }
    }

    fn random_level(&mut self) -> usize {
        let mut level = 1;
        while level < MAX_LEVEL && self.rng.gen_bool(PROMOTE_P) {
            level += 1;
        }
        level
    }
}

impl<K: Ord, V> Default for SkipList<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
