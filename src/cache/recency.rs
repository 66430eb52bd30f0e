//! Recency List Module
//!
//! Least Recently Used ordering for capacity eviction.

use std::collections::HashMap;

use crate::cache::RecencyHandle;

#[derive(Debug)]
struct Node {
    handle: RecencyHandle,
    key: String,
    prev: Option<usize>,
    next: Option<usize>,
}

// == Recency List ==
/// Doubly linked list of keys ordered by access time, stored in a slot arena.
///
/// - Front = Most recently used
/// - Back = Least recently used
///
/// Every operation addresses nodes through the [`RecencyHandle`] given at
/// insertion, so moves and removals are O(1).
#[derive(Debug, Default)]
pub struct RecencyList {
    nodes: Vec<Node>,
    free: Vec<usize>,
    slots: HashMap<RecencyHandle, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl RecencyList {
    // == Constructor ==
    /// Creates a new empty recency list.
    pub fn new() -> Self {
        Self::default()
    }

    // == Push Front ==
    /// Inserts `key` as most recently used under `handle`.
    ///
    /// A handle that is already tracked is moved to the front instead.
    pub fn push_front(&mut self, handle: RecencyHandle, key: String) {
        if self.move_to_front(handle) {
            return;
        }

        let node = Node {
            handle,
            key,
            prev: None,
            next: None,
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

        self.slots.insert(handle, slot);
        self.link_front(slot);
    }

    // == Move To Front ==
    /// Marks a handle as recently used. Returns false for unknown handles.
    pub fn move_to_front(&mut self, handle: RecencyHandle) -> bool {
        let Some(&slot) = self.slots.get(&handle) else {
            return false;
        };

        if self.head != Some(slot) {
            self.unlink(slot);
            self.link_front(slot);
        }
        true
    }

    // == Remove ==
    /// Removes a handle and returns its key.
    pub fn remove(&mut self, handle: RecencyHandle) -> Option<String> {
        let slot = self.slots.remove(&handle)?;
        self.unlink(slot);
        self.free.push(slot);
        Some(std::mem::take(&mut self.nodes[slot].key))
    }

    // == Peek Back ==
    /// Returns the least recently used key without removing it.
    pub fn back(&self) -> Option<&str> {
        self.tail.map(|slot| self.nodes[slot].key.as_str())
    }

    // == Pop Back ==
    /// Removes and returns the least recently used key.
    #[allow(dead_code)]
    pub fn pop_back(&mut self) -> Option<String> {
        let slot = self.tail?;
        let handle = self.nodes[slot].handle;
        self.remove(handle)
    }

    // == Length ==
    /// Returns the number of tracked keys.
    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[allow(dead_code)]
    pub fn contains(&self, handle: RecencyHandle) -> bool {
        self.slots.contains_key(&handle)
    }

    /// Keys from most to least recently used.
    pub fn iter(&self) -> impl Iterator<Item = (RecencyHandle, &str)> + '_ {
        std::iter::successors(self.head, move |&slot| self.nodes[slot].next)
            .map(move |slot| (self.nodes[slot].handle, self.nodes[slot].key.as_str()))
    }

    fn link_front(&mut self, slot: usize) {
        self.nodes[slot].prev = None;
        self.nodes[slot].next = self.head;
        match self.head {
            Some(old) => self.nodes[old].prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = (self.nodes[slot].prev, self.nodes[slot].next);
        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }
        self.nodes[slot].prev = None;
        self.nodes[slot].next = None;
    }
}
