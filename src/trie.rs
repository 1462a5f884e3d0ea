//! The longest-prefix-match trie engine.

use std::net::{IpAddr, Ipv4Addr};

use ipnet::IpNet;

use crate::bits::{mask_from_len, BitCursor, V4_MAPPED_BITS, V4_OFFSET};
use crate::error::{Result, TrieError};
use crate::inner::{Table, ROOT};
use crate::node::NodeRef;
use crate::parse::Route;

/// A longest-prefix-match map over IPv4 and IPv6 prefixes.
///
/// The map is a uni-bit radix trie over 128-bit keys: every edge consumes a
/// single key bit (0 = left, 1 = right), so the path from the root to a node
/// spells the node's prefix. IPv4 prefixes live inside the IPv4-mapped range
/// `::ffff:0:0/96`; a shortcut to the depth-96 node on that path is kept so
/// IPv4 operations skip the constant part of their descent.
///
/// Lookups ([`find`](Self::find) and friends) return the value of the most
/// specific stored prefix covering the queried address. Mutation comes in
/// two removal flavors: [`remove`](Self::remove) takes out a single prefix,
/// [`remove_subtree`](Self::remove_subtree) takes out a prefix together with
/// everything it contains.
///
/// Readers borrow the trie shared and writers exclusively, which is exactly
/// the single-writer / many-reader discipline the structure needs; wrap it
/// in a [`std::sync::RwLock`] to share it across threads.
///
/// ```
/// # use lpm_trie::LpmTrie;
/// let mut trie = LpmTrie::new();
/// trie.insert("10.0.0.0/8", "rfc1918")?;
/// trie.insert("10.9.0.0/16", "lab")?;
/// assert_eq!(trie.find("10.9.1.2")?, Some(&"lab"));
/// assert_eq!(trie.find("10.250.0.1")?, Some(&"rfc1918"));
/// assert_eq!(trie.find("192.0.2.1")?, None);
/// # Ok::<(), lpm_trie::TrieError>(())
/// ```
#[derive(Clone)]
pub struct LpmTrie<T> {
    pub(crate) table: Table<T>,
    /// The node at depth 96 on the IPv4-mapped path. Created eagerly and
    /// never released.
    pub(crate) v4_root: usize,
    /// Deepest valued node on the root → shortcut path, so that descents
    /// starting at the shortcut see prefixes covering the mapped range.
    spine_best: Option<(u8, usize)>,
    count: usize,
}

impl<T> Default for LpmTrie<T> {
    fn default() -> Self {
        let mut trie = Self {
            table: Table::default(),
            v4_root: ROOT,
            spine_best: None,
            count: 0,
        };
        trie.v4_root = trie.build_spine();
        trie
    }
}

impl<T> LpmTrie<T> {
    /// Create an empty trie.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a trie with a dense IPv4 subtree preallocated down to `bits`
    /// bits (clamped to 8), trading memory for first-insert latency.
    pub fn with_preallocated(bits: u8) -> Self {
        let mut trie = Self::new();
        for len in 1..=bits.min(8) {
            let step = 1u64 << (32 - len);
            let mut key = 0u64;
            while key < 1 << 32 {
                let route = Route::from_v4(Ipv4Addr::from(key as u32), len);
                trie.ensure_path(trie.v4_root, route.cursor_at(V4_OFFSET));
                key += step;
            }
        }
        trie
    }

    /// Number of stored prefixes.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if no prefix is stored.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Store a value, failing with [`TrieError::NodeBusy`] if the prefix
    /// already holds one.
    ///
    /// ```
    /// # use lpm_trie::{LpmTrie, TrieError};
    /// let mut trie = LpmTrie::new();
    /// trie.insert("192.168.1.0/24", 1)?;
    /// assert_eq!(trie.insert("192.168.1.0/24", 2), Err(TrieError::NodeBusy));
    /// assert_eq!(trie.find("192.168.1.1")?, Some(&1));
    /// # Ok::<(), lpm_trie::TrieError>(())
    /// ```
    pub fn insert(&mut self, cidr: &str, value: T) -> Result<()> {
        self.insert_route(&cidr.parse()?, value)
    }

    /// [`insert`](Self::insert) for an already-parsed prefix.
    pub fn insert_net(&mut self, net: IpNet, value: T) -> Result<()> {
        self.insert_route(&Route::from_net(net), value)
    }

    /// Store a value, overwriting and returning whatever the prefix held
    /// before.
    ///
    /// ```
    /// # use lpm_trie::LpmTrie;
    /// let mut trie = LpmTrie::new();
    /// assert_eq!(trie.set("192.168.1.0/24", 1)?, None);
    /// assert_eq!(trie.set("192.168.1.0/24", 2)?, Some(1));
    /// # Ok::<(), lpm_trie::TrieError>(())
    /// ```
    pub fn set(&mut self, cidr: &str, value: T) -> Result<Option<T>> {
        Ok(self.set_route(&cidr.parse()?, value))
    }

    /// [`set`](Self::set) for an already-parsed prefix.
    pub fn set_net(&mut self, net: IpNet, value: T) -> Option<T> {
        self.set_route(&Route::from_net(net), value)
    }

    /// Remove a single prefix and return its value.
    ///
    /// Fails with [`TrieError::NotFound`] if the prefix was never stored.
    /// More specific prefixes below it are left untouched.
    ///
    /// ```
    /// # use lpm_trie::LpmTrie;
    /// let mut trie = LpmTrie::new();
    /// trie.insert("10.0.0.0/8", 1)?;
    /// trie.insert("10.1.0.0/16", 2)?;
    /// assert_eq!(trie.remove("10.0.0.0/8")?, Some(1));
    /// assert_eq!(trie.find("10.1.2.3")?, Some(&2));
    /// assert_eq!(trie.find("10.2.0.1")?, None);
    /// # Ok::<(), lpm_trie::TrieError>(())
    /// ```
    pub fn remove(&mut self, cidr: &str) -> Result<Option<T>> {
        self.remove_route(&cidr.parse()?)
    }

    /// [`remove`](Self::remove) for an already-parsed prefix.
    pub fn remove_net(&mut self, net: IpNet) -> Result<Option<T>> {
        self.remove_route(&Route::from_net(net))
    }

    /// Remove a prefix together with every prefix it contains.
    ///
    /// ```
    /// # use lpm_trie::LpmTrie;
    /// let mut trie = LpmTrie::new();
    /// trie.insert("10.0.0.0/8", 1)?;
    /// trie.insert("10.1.0.0/16", 2)?;
    /// trie.insert("11.0.0.0/8", 3)?;
    /// trie.remove_subtree("10.0.0.0/8")?;
    /// assert_eq!(trie.find("10.1.2.3")?, None);
    /// assert_eq!(trie.find("11.1.2.3")?, Some(&3));
    /// # Ok::<(), lpm_trie::TrieError>(())
    /// ```
    pub fn remove_subtree(&mut self, cidr: &str) -> Result<()> {
        self.remove_subtree_route(&cidr.parse()?)
    }

    /// [`remove_subtree`](Self::remove_subtree) for an already-parsed
    /// prefix.
    pub fn remove_subtree_net(&mut self, net: IpNet) -> Result<()> {
        self.remove_subtree_route(&Route::from_net(net))
    }

    /// Longest-prefix match: the value of the most specific stored prefix
    /// covering the query. A bare address matches as a host route; a `/len`
    /// suffix bounds how deep the match may go.
    pub fn find(&self, cidr: &str) -> Result<Option<&T>> {
        Ok(self.find_route(&cidr.parse()?))
    }

    /// [`find`](Self::find) for an already-parsed prefix.
    pub fn find_net(&self, net: IpNet) -> Option<&T> {
        self.find_route(&Route::from_net(net))
    }

    /// [`find`](Self::find) for a single address.
    pub fn find_addr(&self, addr: IpAddr) -> Option<&T> {
        self.find_route(&Route::from_addr(addr))
    }

    /// Longest-prefix match returning a handle to the matched node, from
    /// which the stored prefix and the chain of covering prefixes can be
    /// read.
    ///
    /// ```
    /// # use lpm_trie::LpmTrie;
    /// let mut trie = LpmTrie::new();
    /// trie.insert("10.0.0.0/8", 1)?;
    /// trie.insert("10.1.0.0/16", 2)?;
    /// let node = trie.find_node("10.1.2.3")?.unwrap();
    /// assert_eq!(node.prefix(), Some("10.1.0.0/16".parse()?));
    /// assert_eq!(node.parent().unwrap().value(), Some(&1));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn find_node(&self, cidr: &str) -> Result<Option<NodeRef<'_, T>>> {
        Ok(self.find_node_route(&cidr.parse()?))
    }

    /// [`find_node`](Self::find_node) for an already-parsed prefix.
    pub fn find_node_net(&self, net: IpNet) -> Option<NodeRef<'_, T>> {
        self.find_node_route(&Route::from_net(net))
    }

    /// Drop every stored prefix but keep the allocated node storage.
    pub fn clear(&mut self) {
        self.table.reset();
        self.count = 0;
        self.spine_best = None;
        self.v4_root = self.build_spine();
    }

    fn insert_route(&mut self, route: &Route, value: T) -> Result<()> {
        let idx = self.ensure_route(route);
        if self.table[idx].value.is_some() {
            return Err(TrieError::NodeBusy);
        }
        self.write_slot(idx, route, Some(value));
        Ok(())
    }

    fn set_route(&mut self, route: &Route, value: T) -> Option<T> {
        let idx = self.ensure_route(route);
        self.write_slot(idx, route, Some(value))
    }

    fn remove_route(&mut self, route: &Route) -> Result<Option<T>> {
        let idx = self.locate(route).ok_or(TrieError::NotFound)?;
        if idx == ROOT || idx == self.v4_root || !self.table[idx].is_leaf() {
            // interior node (or one that must survive): only the value can
            // go away, and the structure stays.
            if self.table[idx].value.is_none() {
                return Err(TrieError::NotFound);
            }
            return Ok(self.clear_slot(idx, route));
        }
        let value = self.clear_slot(idx, route);
        self.prune_up(idx);
        Ok(value)
    }

    fn remove_subtree_route(&mut self, route: &Route) -> Result<()> {
        let idx = self.locate(route).ok_or(TrieError::NotFound)?;
        if idx == ROOT || idx == self.v4_root {
            // the root and the shortcut survive; only their subtrees drain.
            let children = [self.table[idx].left.take(), self.table[idx].right.take()];
            for child in children.into_iter().flatten() {
                self.drain(child);
            }
            self.clear_slot(idx, route);
            if idx == ROOT {
                self.v4_root = self.build_spine();
                self.recompute_spine_best();
            }
            return Ok(());
        }
        let Some(parent) = self.table[idx].parent else {
            return Err(TrieError::NotFound);
        };
        self.table.detach(parent, idx);
        self.drain(idx);
        self.prune_up(parent);
        if route.covers_v4_spine() {
            // the drained range contained the shortcut; restore it.
            self.v4_root = self.build_spine();
            self.recompute_spine_best();
        }
        Ok(())
    }

    fn find_route(&self, route: &Route) -> Option<&T> {
        let best = self.lookup_route(route)?;
        self.table[best].value.as_ref()
    }

    fn find_node_route(&self, route: &Route) -> Option<NodeRef<'_, T>> {
        let best = self.lookup_route(route)?;
        Some(NodeRef::new(self, best))
    }

    /// Choose the descent origin for a route and run the LPM lookup. IPv4
    /// routes start at the shortcut, seeded with the best covering prefix
    /// above it, so the result is identical to a descent from the true
    /// root.
    pub(crate) fn lookup_route(&self, route: &Route) -> Option<usize> {
        if route.v4 {
            let seed = self.spine_best.map(|(_, idx)| idx);
            self.lookup_from(self.v4_root, route.cursor_at(V4_OFFSET), seed)
        } else {
            self.lookup_from(ROOT, route.cursor_at(0), None)
        }
    }

    /// LPM descent from `start`: remember the deepest valued node on the
    /// way down, including the node the descent ends on.
    pub(crate) fn lookup_from(
        &self,
        start: usize,
        mut cursor: BitCursor,
        seed: Option<usize>,
    ) -> Option<usize> {
        let mut idx = start;
        let mut best = seed;
        loop {
            if self.table[idx].value.is_some() {
                best = Some(idx);
            }
            let Some(bit) = cursor.next() else { break };
            let Some(child) = self.table.child(idx, bit) else {
                break;
            };
            idx = child;
        }
        best
    }

    /// Strict walk to the exact node for `route`; `None` when the path is
    /// incomplete.
    fn locate(&self, route: &Route) -> Option<usize> {
        let (mut idx, mut cursor) = self.origin(route);
        while let Some(bit) = cursor.next() {
            idx = self.table.child(idx, bit)?;
        }
        Some(idx)
    }

    fn origin(&self, route: &Route) -> (usize, BitCursor) {
        if route.v4 {
            (self.v4_root, route.cursor_at(V4_OFFSET))
        } else {
            (ROOT, route.cursor_at(0))
        }
    }

    fn ensure_route(&mut self, route: &Route) -> usize {
        let (start, cursor) = self.origin(route);
        self.ensure_path(start, cursor)
    }

    /// Walk from `start`, creating any missing nodes along the masked key
    /// bits, and return the node at the end of the path.
    fn ensure_path(&mut self, start: usize, mut cursor: BitCursor) -> usize {
        let mut idx = start;
        while let Some(bit) = cursor.peek() {
            match self.table.child(idx, bit) {
                Some(child) => {
                    cursor.advance();
                    idx = child;
                }
                None => break,
            }
        }
        while let Some(bit) = cursor.next() {
            let child = self.table.acquire(idx);
            self.table.set_child(idx, child, bit);
            idx = child;
        }
        idx
    }

    /// Create (or re-create) the transit nodes down to the IPv4 shortcut
    /// and return its index.
    fn build_spine(&mut self) -> usize {
        self.ensure_path(
            ROOT,
            BitCursor::new(V4_MAPPED_BITS, mask_from_len(V4_OFFSET)),
        )
    }

    /// Put `value` on the node, maintaining the prefix cache, the count,
    /// and the spine seed. Returns the previous value.
    fn write_slot(&mut self, idx: usize, route: &Route, value: Option<T>) -> Option<T> {
        let has = value.is_some();
        let node = &mut self.table[idx];
        let old = node.value.take();
        node.value = value;
        node.prefix = has.then(|| route.prefix());
        match (old.is_some(), has) {
            (false, true) => self.count += 1,
            (true, false) => self.count -= 1,
            _ => {}
        }
        if has && route.covers_v4_spine() {
            self.note_spine_value(route.depth, idx);
        }
        old
    }

    fn clear_slot(&mut self, idx: usize, route: &Route) -> Option<T> {
        let old = self.write_slot(idx, route, None);
        if route.covers_v4_spine() && self.spine_best.map_or(false, |(_, i)| i == idx) {
            self.recompute_spine_best();
        }
        old
    }

    /// Walk the parent chain from `idx`, harvesting nodes left with no
    /// value and no children. Stops at the root, at the shortcut, and at
    /// the first node still in use.
    fn prune_up(&mut self, mut idx: usize) {
        loop {
            if idx == ROOT || idx == self.v4_root {
                return;
            }
            let node = &self.table[idx];
            if node.value.is_some() || !node.is_leaf() {
                return;
            }
            let Some(parent) = node.parent else { return };
            self.table.detach(parent, idx);
            self.table.release(idx);
            idx = parent;
        }
    }

    /// Return every node of the subtree rooted at `idx` to the free-list.
    /// The caller must already have detached `idx` from its parent.
    fn drain(&mut self, idx: usize) {
        let mut stack = vec![idx];
        while let Some(i) = stack.pop() {
            let node = &self.table[i];
            if node.value.is_some() {
                self.count -= 1;
            }
            if let Some(left) = node.left {
                stack.push(left);
            }
            if let Some(right) = node.right {
                stack.push(right);
            }
            self.table.release(i);
        }
    }

    fn note_spine_value(&mut self, depth: u8, idx: usize) {
        if self.spine_best.map_or(true, |(d, _)| d <= depth) {
            self.spine_best = Some((depth, idx));
        }
    }

    /// Re-derive the deepest valued node on the root → shortcut path by
    /// walking it once. Only needed after a removal on that path.
    fn recompute_spine_best(&mut self) {
        let mut cursor = BitCursor::new(V4_MAPPED_BITS, mask_from_len(V4_OFFSET - 1));
        let mut idx = ROOT;
        let mut best = None;
        loop {
            if self.table[idx].value.is_some() {
                best = Some((cursor.depth(), idx));
            }
            let Some(bit) = cursor.next() else { break };
            let Some(child) = self.table.child(idx, bit) else {
                break;
            };
            idx = child;
        }
        self.spine_best = best;
    }
}

impl<T> Extend<(IpNet, T)> for LpmTrie<T> {
    fn extend<I: IntoIterator<Item = (IpNet, T)>>(&mut self, iter: I) {
        for (net, value) in iter {
            self.set_net(net, value);
        }
    }
}

impl<T> FromIterator<(IpNet, T)> for LpmTrie<T> {
    fn from_iter<I: IntoIterator<Item = (IpNet, T)>>(iter: I) -> Self {
        let mut trie = Self::new();
        trie.extend(iter);
        trie
    }
}

impl<T: PartialEq> PartialEq for LpmTrie<T> {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for LpmTrie<T> {}
