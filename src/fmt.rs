//! Formatting implementations for the trie.

use std::fmt::{Debug, Formatter, Result};

use crate::{LpmTrie, NodeRef};

impl<T: Debug> Debug for LpmTrie<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<T: Debug> Debug for NodeRef<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_struct("NodeRef")
            .field("prefix", &self.prefix())
            .field("value", &self.value())
            .finish()
    }
}
