//! Errors surfaced by the trie.

use std::error::Error;
use std::fmt;

/// The error kinds returned by trie operations.
///
/// All of them are non-fatal: a failed operation leaves the trie exactly as
/// it was before the call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrieError {
    /// The address, mask, or prefix length could not be understood.
    BadIp,
    /// An insert without overwrite targeted a prefix that already stores a
    /// value.
    NodeBusy,
    /// A removal targeted a prefix that is not stored.
    NotFound,
}

impl fmt::Display for TrieError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrieError::BadIp => f.write_str("bad IP address or mask"),
            TrieError::NodeBusy => f.write_str("node busy"),
            TrieError::NotFound => f.write_str("no such node"),
        }
    }
}

impl Error for TrieError {}

/// Result alias with [`TrieError`] as the default error type.
pub type Result<T, E = TrieError> = std::result::Result<T, E>;
