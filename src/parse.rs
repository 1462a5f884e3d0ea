//! Normalization of caller inputs into 128-bit key/mask routes.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

use crate::bits::{mask_from_len, BitCursor, V4_MAPPED_BITS, V4_OFFSET};
use crate::error::{Result, TrieError};

/// A normalized lookup or update target.
///
/// Every input form collapses into a 128-bit key/mask pair plus the address
/// family it belongs to. IPv4 inputs are projected into the IPv4-mapped
/// range, so `depth` counts from the true root: an IPv4 `/24` has depth 120.
/// IPv6 inputs that lie inside `::ffff:0:0/96` with a prefix length of at
/// least 96 are canonicalized to IPv4, which keeps the family split exact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Route {
    pub(crate) key: u128,
    pub(crate) mask: u128,
    pub(crate) depth: u8,
    pub(crate) v4: bool,
}

impl Route {
    pub(crate) fn from_v4(addr: Ipv4Addr, len: u8) -> Self {
        debug_assert!(len <= 32);
        let depth = V4_OFFSET + len;
        Route {
            key: V4_MAPPED_BITS | u32::from(addr) as u128,
            mask: mask_from_len(depth),
            depth,
            v4: true,
        }
    }

    pub(crate) fn from_v6(addr: Ipv6Addr, len: u8) -> Self {
        debug_assert!(len <= 128);
        if len >= V4_OFFSET {
            if let Some(v4) = addr.to_ipv4_mapped() {
                return Self::from_v4(v4, len - V4_OFFSET);
            }
        }
        Route {
            key: u128::from(addr),
            mask: mask_from_len(len),
            depth: len,
            v4: false,
        }
    }

    pub(crate) fn from_net(net: IpNet) -> Self {
        match net {
            IpNet::V4(n) => Self::from_v4(n.addr(), n.prefix_len()),
            IpNet::V6(n) => Self::from_v6(n.addr(), n.prefix_len()),
        }
    }

    /// A bare address is a host route: `/32` or `/128`.
    pub(crate) fn from_addr(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(a) => Self::from_v4(a, 32),
            IpAddr::V6(a) => Self::from_v6(a, 128),
        }
    }

    /// The canonical prefix stored on a node for this route, with
    /// IPv4-mapped keys reported in their 4-byte form.
    pub(crate) fn prefix(&self) -> IpNet {
        let bits = self.key & self.mask;
        if self.v4 {
            let addr = Ipv4Addr::from(bits as u32);
            IpNet::V4(Ipv4Net::new(addr, self.depth - V4_OFFSET).unwrap())
        } else {
            IpNet::V6(Ipv6Net::new(Ipv6Addr::from(bits), self.depth).unwrap())
        }
    }

    /// A cursor over this route's masked key bits, resumed at depth `pos`.
    pub(crate) fn cursor_at(&self, pos: u8) -> BitCursor {
        BitCursor::starting_at(self.key, self.mask, pos)
    }

    /// Whether this route lies on (or above) the path from the root to the
    /// IPv4 shortcut, i.e. whether it covers the IPv4-mapped range.
    pub(crate) fn covers_v4_spine(&self) -> bool {
        !self.v4 && self.depth <= V4_OFFSET && (self.key ^ V4_MAPPED_BITS) & self.mask == 0
    }
}

impl FromStr for Route {
    type Err = TrieError;

    /// Parse a textual CIDR. A `.` anywhere selects the IPv4 form
    /// `a.b.c.d[/len]`; everything else is IPv6. A missing `/len` means a
    /// host route.
    fn from_str(s: &str) -> Result<Self> {
        let (addr, len) = match s.split_once('/') {
            Some((addr, len)) => (addr, Some(len.parse::<u8>().map_err(|_| TrieError::BadIp)?)),
            None => (s, None),
        };
        if s.contains('.') {
            let addr = Ipv4Addr::from_str(addr).map_err(|_| TrieError::BadIp)?;
            let len = len.unwrap_or(32);
            if len > 32 {
                return Err(TrieError::BadIp);
            }
            Ok(Self::from_v4(addr, len))
        } else {
            let addr = Ipv6Addr::from_str(addr).map_err(|_| TrieError::BadIp)?;
            let len = len.unwrap_or(128);
            if len > 128 {
                return Err(TrieError::BadIp);
            }
            Ok(Self::from_v6(addr, len))
        }
    }
}
