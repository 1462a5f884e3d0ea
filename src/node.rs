//! Borrowed node handles.

use ipnet::IpNet;

use crate::LpmTrie;

/// A read-only view of a trie node, returned by
/// [`find_node`](LpmTrie::find_node).
///
/// The handle borrows the trie, so it can only exist while no writer does:
/// a node can never be harvested under a live handle.
#[derive(PartialEq)]
pub struct NodeRef<'a, T> {
    trie: &'a LpmTrie<T>,
    idx: usize,
}

impl<T> Clone for NodeRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeRef<'_, T> {}

impl<'a, T> NodeRef<'a, T> {
    pub(crate) fn new(trie: &'a LpmTrie<T>, idx: usize) -> Self {
        Self { trie, idx }
    }

    /// The value stored at this node, if any.
    pub fn value(&self) -> Option<&'a T> {
        self.trie.table[self.idx].value.as_ref()
    }

    /// The prefix stored at this node. IPv4-mapped prefixes are reported in
    /// their 4-byte form. `None` on nodes that only give structure to the
    /// trie.
    pub fn prefix(&self) -> Option<IpNet> {
        self.trie.table[self.idx].prefix
    }

    /// The immediate ancestor on the descent path, one bit up.
    pub fn tree_parent(&self) -> Option<NodeRef<'a, T>> {
        self.trie.table[self.idx]
            .parent
            .map(|idx| NodeRef::new(self.trie, idx))
    }

    /// The nearest ancestor that stores a value.
    pub fn parent(&self) -> Option<NodeRef<'a, T>> {
        let mut idx = self.idx;
        while let Some(up) = self.trie.table[idx].parent {
            if self.trie.table[up].value.is_some() {
                return Some(NodeRef::new(self.trie, up));
            }
            idx = up;
        }
        None
    }

    /// Every ancestor that stores a value, nearest first.
    pub fn parents(&self) -> Vec<NodeRef<'a, T>> {
        let mut out = Vec::new();
        let mut cur = *self;
        while let Some(up) = cur.parent() {
            out.push(up);
            cur = up;
        }
        out
    }
}
