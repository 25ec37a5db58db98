//! Arena-backed doubly linked list with stable node handles.
//!
//! Nodes live in a slot vector and link to each other by index. A
//! [`NodeRef`] carries the owning list's id and the slot generation, so a
//! handle from another list or to a slot that was freed and reused is
//! rejected instead of unlinking the wrong entry.

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

static NEXT_LIST_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to a node pushed into a [`LinkedList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    list: u64,
    index: usize,
    generation: u64,
}

/// Rejected node operation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ListError {
    /// Handle belongs to a different list.
    #[error("node belongs to another list")]
    ForeignNode,

    /// Node was already removed.
    #[error("node is no longer in the list")]
    StaleNode,
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
struct Slot<V> {
    generation: u64,
    entry: Option<Entry<V>>,
}

/// FIFO-ordered list with O(1) push, head lookup and removal by handle.
#[derive(Debug)]
pub struct LinkedList<V> {
    id: u64,
    slots: Vec<Slot<V>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<V> LinkedList<V> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            id: NEXT_LIST_ID.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Number of linked nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the list is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append `value` at the tail.
    pub fn push(&mut self, value: V) -> NodeRef {
        let entry = Entry {
            value,
            prev: self.tail,
            next: None,
        };

        let index = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.generation += 1;
                slot.entry = Some(entry);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                self.slots.len() - 1
            }
        };

        match self.tail {
            Some(tail) => {
                if let Some(tail) = self.slots[tail].entry.as_mut() {
                    tail.next = Some(index);
                }
            }
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;

        self.node_ref(index)
    }

    /// Handle of the head node.
    pub fn head(&self) -> Option<NodeRef> {
        self.head.map(|index| self.node_ref(index))
    }

    /// Mutable access to a linked node's value.
    pub fn get_mut(&mut self, node: NodeRef) -> Option<&mut V> {
        let index = self.check(node).ok()?;
        self.slots[index].entry.as_mut().map(|entry| &mut entry.value)
    }

    /// Unlink `node` and return its value.
    ///
    /// Relative order of the remaining nodes is unchanged.
    ///
    /// # Errors
    ///
    /// - [`ListError::ForeignNode`] if `node` came from another list
    /// - [`ListError::StaleNode`] if `node` was already removed
    pub fn remove(&mut self, node: NodeRef) -> Result<V, ListError> {
        let index = self.check(node)?;
        let entry = self.slots[index].entry.take().ok_or(ListError::StaleNode)?;

        match entry.prev {
            Some(prev) => {
                if let Some(prev) = self.slots[prev].entry.as_mut() {
                    prev.next = entry.next;
                }
            }
            None => self.head = entry.next,
        }
        match entry.next {
            Some(next) => {
                if let Some(next) = self.slots[next].entry.as_mut() {
                    next.prev = entry.prev;
                }
            }
            None => self.tail = entry.prev,
        }

        self.free.push(index);
        self.len -= 1;
        Ok(entry.value)
    }

    /// Remove every node except the head, returning their values in order.
    pub fn truncate_after_head(&mut self) -> Vec<V> {
        let mut removed = Vec::with_capacity(self.len.saturating_sub(1));
        let Some(head) = self.head else {
            return removed;
        };

        while let Some(next) = self.slots[head].entry.as_ref().and_then(|e| e.next) {
            match self.remove(self.node_ref(next)) {
                Ok(value) => removed.push(value),
                Err(_) => break,
            }
        }

        removed
    }

    /// Iterate values from head to tail.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    fn node_ref(&self, index: usize) -> NodeRef {
        NodeRef {
            list: self.id,
            index,
            generation: self.slots[index].generation,
        }
    }

    fn check(&self, node: NodeRef) -> Result<usize, ListError> {
        if node.list != self.id {
            return Err(ListError::ForeignNode);
        }
        match self.slots.get(node.index) {
            Some(slot) if slot.generation == node.generation && slot.entry.is_some() => {
                Ok(node.index)
            }
            _ => Err(ListError::StaleNode),
        }
    }
}

impl<V> Default for LinkedList<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Head-to-tail iterator over list values.
pub struct Iter<'a, V> {
    list: &'a LinkedList<V>,
    cursor: Option<usize>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.list.slots[self.cursor?].entry.as_ref()?;
        self.cursor = entry.next;
        Some(&entry.value)
    }
}
