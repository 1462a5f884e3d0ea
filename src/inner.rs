//! The slab-backed node table of the trie.

use std::ops::{Index, IndexMut};

use ipnet::IpNet;

/// Index of the root node (`::/0`). The root is created with the table and
/// never released.
pub(crate) const ROOT: usize = 0;

/// Initial table capacity. Trie workloads allocate in bursts, so the first
/// growth chunk is sized for a few hundred prefixes up front.
const FIRST_CHUNK: usize = 200;

/// A single trie node, addressed by its index in the [`Table`].
///
/// A node either stores a value (a *prefix node*) or only gives structure
/// to the trie. `prefix` caches the canonical, family-unmapped form of the
/// key and is present exactly while `value` is.
#[derive(Clone)]
pub(crate) struct Node<T> {
    pub(crate) left: Option<usize>,
    pub(crate) right: Option<usize>,
    pub(crate) parent: Option<usize>,
    pub(crate) value: Option<T>,
    pub(crate) prefix: Option<IpNet>,
}

impl<T> Node<T> {
    fn cleared() -> Self {
        Node {
            left: None,
            right: None,
            parent: None,
            value: None,
            prefix: None,
        }
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// A growable arena of nodes with a free-list of harvested slots.
///
/// The arena only grows; releasing a node clears it and queues its slot for
/// reuse, so delete-heavy workloads cause no allocator traffic. Memory is
/// returned to the system only when the table is dropped.
#[derive(Clone)]
pub(crate) struct Table<T> {
    nodes: Vec<Node<T>>,
    free: Vec<usize>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        let mut nodes = Vec::with_capacity(FIRST_CHUNK);
        nodes.push(Node::cleared());
        Self {
            nodes,
            free: Vec::new(),
        }
    }
}

impl<T> Table<T> {
    /// Number of slots ever allocated, live or free.
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Number of slots currently on the free-list.
    #[cfg(test)]
    pub(crate) fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Hand out a cleared node linked to `parent`, reusing a harvested slot
    /// when one is available.
    pub(crate) fn acquire(&mut self, parent: usize) -> usize {
        let idx = match self.free.pop() {
            Some(idx) => idx,
            None => {
                self.nodes.push(Node::cleared());
                self.nodes.len() - 1
            }
        };
        self.nodes[idx].parent = Some(parent);
        idx
    }

    /// Clear a node (dropping its payload) and queue the slot for reuse.
    /// The caller must have unlinked it from the trie.
    pub(crate) fn release(&mut self, idx: usize) {
        debug_assert_ne!(idx, ROOT);
        self.nodes[idx] = Node::cleared();
        self.free.push(idx);
    }

    /// Drop all nodes but keep the allocation, leaving a fresh root.
    pub(crate) fn reset(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.nodes.push(Node::cleared());
    }

    pub(crate) fn child(&self, idx: usize, right: bool) -> Option<usize> {
        if right {
            self.nodes[idx].right
        } else {
            self.nodes[idx].left
        }
    }

    pub(crate) fn set_child(&mut self, idx: usize, child: usize, right: bool) {
        if right {
            self.nodes[idx].right = Some(child);
        } else {
            self.nodes[idx].left = Some(child);
        }
    }

    /// Remove the link from `parent` to `child`, whichever side it is on.
    pub(crate) fn detach(&mut self, parent: usize, child: usize) {
        if self.nodes[parent].right == Some(child) {
            self.nodes[parent].right = None;
        } else {
            debug_assert_eq!(self.nodes[parent].left, Some(child));
            self.nodes[parent].left = None;
        }
    }

    pub(crate) fn into_nodes(self) -> Vec<Node<T>> {
        self.nodes
    }
}

impl<T> Index<usize> for Table<T> {
    type Output = Node<T>;

    fn index(&self, index: usize) -> &Node<T> {
        &self.nodes[index]
    }
}

impl<T> IndexMut<usize> for Table<T> {
    fn index_mut(&mut self, index: usize) -> &mut Node<T> {
        &mut self.nodes[index]
    }
}
