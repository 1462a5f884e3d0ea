//! This crate provides a longest-prefix-match map for IP prefixes. IPv4 and
//! IPv6 prefixes live in the same map: every key is projected into a shared
//! 128-bit space, with IPv4 occupying the IPv4-mapped range `::ffff:0:0/96`.
//!
//! # Description of the Trie
//!
//! The map is a uni-bit radix trie: each edge consumes exactly one key bit
//! (0 = left, 1 = right), so a node's position alone spells its prefix and
//! the trie needs no rebalancing. A node either stores a value — making it a
//! *prefix node* — or exists only to give structure to the trie. Nodes are
//! kept in a slab with a free-list, so the churn of inserting and removing
//! leaves costs no allocator traffic.
//!
//! Because all IPv4 keys share the same 96 leading bits, the trie keeps a
//! shortcut to the node at depth 96 of that path and starts IPv4 descents
//! there. The shortcut is only an optimization: a descent from the true
//! root over the mapped key yields the same result.
//!
//! # Operations on the trie
//!
//! - [`LpmTrie::insert`] stores a value and refuses to replace an existing
//!   one; [`LpmTrie::set`] overwrites and hands the old value back.
//! - [`LpmTrie::find`] performs a longest-prefix match: the value of the
//!   most specific stored prefix covering the query.
//!   [`LpmTrie::find_node`] additionally hands out a [`NodeRef`] from which
//!   the matched prefix and the chain of covering prefixes can be read.
//! - [`LpmTrie::remove`] takes out exactly one prefix, leaving everything
//!   below it intact. [`LpmTrie::remove_subtree`] takes out a prefix
//!   together with every prefix it contains.
//! - [`LpmTrie::walk_v4`] and [`LpmTrie::walk_v6`] visit the stored
//!   prefixes of one address family in address order.
//!
//! Each operation exists in a textual form taking CIDR strings (`"10.0.0.0/8"`,
//! `"dead::/16"`, a bare address meaning a host route) and in a structured
//! form over [`ipnet::IpNet`] / [`std::net::IpAddr`].
//!
//! ```
//! use lpm_trie::{LpmTrie, TrieError};
//!
//! let mut trie = LpmTrie::new();
//! trie.insert("192.168.0.0/16", "site")?;
//! trie.insert("192.168.7.0/24", "lab")?;
//!
//! assert_eq!(trie.find("192.168.7.42")?, Some(&"lab"));
//! assert_eq!(trie.find("192.168.1.1")?, Some(&"site"));
//! assert_eq!(trie.find("10.0.0.1")?, None);
//!
//! assert_eq!(trie.remove("192.168.7.0/24")?, Some("lab"));
//! assert_eq!(trie.find("192.168.7.42")?, Some(&"site"));
//! # Ok::<(), TrieError>(())
//! ```

mod bits;
mod error;
mod fmt;
mod inner;
mod node;
mod parse;
mod trie;
mod walk;

#[cfg(feature = "serde")]
mod serde;

#[cfg(test)]
mod fuzzing;

pub use error::{Result, TrieError};
pub use node::NodeRef;
pub use trie::LpmTrie;
pub use walk::{IntoIter, Iter, Keys, Values};
