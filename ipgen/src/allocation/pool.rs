// IpGen: Compiling IP Network Topologies into Addressing and Routing Policy
// Copyright (C) 2021  Tibor Schneider
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Prefix pools and the registry of taken prefixes.

use super::{AllocationError, PoolSettings};
use crate::domains::DomainId;
use crate::topology::{AddressFamily, NodeId};

use ipnet::IpNet;
use log::*;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Numeric value of an address
pub(crate) fn addr_to_u128(addr: IpAddr) -> u128 {
    match addr {
        IpAddr::V4(a) => u32::from(a) as u128,
        IpAddr::V6(a) => u128::from(a),
    }
}

/// Address of the family with the given numeric value. IPv4 values are truncated to 32 bits.
pub(crate) fn u128_to_addr(family: AddressFamily, value: u128) -> IpAddr {
    match family {
        AddressFamily::Ipv4 => IpAddr::V4(Ipv4Addr::from(value as u32)),
        AddressFamily::Ipv6 => IpAddr::V6(Ipv6Addr::from(value)),
    }
}

/// Number of addresses in a prefix of the given length. Returns `None` if the number does not
/// fit into a `u128` (i.e., for `::/0`).
pub(crate) fn block_size(family: AddressFamily, prefix_len: u8) -> Option<u128> {
    let bits = family.max_prefix_len().checked_sub(prefix_len)?;
    1u128.checked_shl(bits as u32)
}

/// Number of usable host addresses in a prefix of the given length. Numbering starts at offset
/// 1, and the last IPv4 address is reserved for the broadcast.
pub(crate) fn capacity(family: AddressFamily, prefix_len: u8) -> u128 {
    let size = block_size(family, prefix_len).unwrap_or(u128::MAX);
    match family {
        AddressFamily::Ipv4 => size.saturating_sub(2),
        AddressFamily::Ipv6 => size.saturating_sub(1),
    }
}

/// Number of usable host addresses in a prefix.
pub(crate) fn host_capacity(net: &IpNet) -> u128 {
    capacity(AddressFamily::of(net), net.prefix_len())
}

/// Longest prefix length whose capacity holds `needed` addresses.
pub(crate) fn fitting_prefix_len(family: AddressFamily, needed: usize) -> Option<u8> {
    (0..=family.max_prefix_len()).rev().find(|len| capacity(family, *len) >= needed as u128)
}

/// Returns `true` if the two prefixes share at least one address
pub fn overlaps(a: &IpNet, b: &IpNet) -> bool {
    a.contains(b) || b.contains(a)
}

/// Owner of a registered prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixOwner {
    /// The prefix of a broadcast domain
    Domain(DomainId),
    /// The loopback of a node
    Loopback(NodeId),
}

impl fmt::Display for PrefixOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefixOwner::Domain(d) => write!(f, "domain {}", d),
            PrefixOwner::Loopback(n) => write!(f, "loopback of node {}", n.index()),
        }
    }
}

/// All prefixes which are taken, either statically or by a previous draw.
#[derive(Debug, Clone, Default)]
pub struct PrefixRegistry {
    entries: Vec<(IpNet, PrefixOwner)>,
}

impl PrefixRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a prefix. Overlapping prefixes are only allowed if they belong to the same owner.
    pub fn register(&mut self, prefix: IpNet, owner: PrefixOwner) -> Result<(), AllocationError> {
        let prefix = prefix.trunc();
        if let Some((other, other_owner)) =
            self.entries.iter().find(|(net, o)| *o != owner && overlaps(net, &prefix))
        {
            return Err(AllocationError::OverlappingPrefix {
                prefix,
                owner,
                other: *other,
                other_owner: *other_owner,
            });
        }
        if !self.entries.contains(&(prefix, owner)) {
            trace!("Registered {} for {}", prefix, owner);
            self.entries.push((prefix, owner));
        }
        Ok(())
    }

    /// Returns the first registered prefix overlapping with the given one.
    pub fn find_overlap(&self, prefix: &IpNet) -> Option<&(IpNet, PrefixOwner)> {
        self.entries.iter().find(|(net, _)| overlaps(net, prefix))
    }

    /// Iterate over all registered prefixes, in registration order
    pub fn iter(&self) -> impl Iterator<Item = &(IpNet, PrefixOwner)> {
        self.entries.iter()
    }
}

/// A cursor over the address space of one pool. Prefixes are drawn monotonically: a prefix is
/// never handed out twice, and prefixes which overlap with a registered prefix are skipped.
#[derive(Debug, Clone)]
pub struct AllocationPool {
    family: AddressFamily,
    base: IpNet,
    prefix_len: u8,
    cursor: u128,
}

impl AllocationPool {
    /// Create a new pool from its settings
    pub fn new(settings: &PoolSettings) -> Result<Self, AllocationError> {
        let base = settings.base.trunc();
        let family = AddressFamily::of(&base);
        if settings.prefix_len < base.prefix_len() || settings.prefix_len > family.max_prefix_len()
        {
            return Err(AllocationError::InvalidPool { base, prefix_len: settings.prefix_len });
        }
        Ok(Self { family, base, prefix_len: settings.prefix_len, cursor: 0 })
    }

    /// Family of the pool
    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// Default prefix length of each draw
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// The address space of the pool
    pub fn base(&self) -> IpNet {
        self.base
    }

    /// Draw the next free prefix of the default length.
    pub fn next(&mut self, registry: &PrefixRegistry) -> Result<IpNet, AllocationError> {
        self.draw(self.prefix_len, registry)
    }

    /// Draw the next free prefix with the given length. Prefixes shorter than the pool are not
    /// possible, the length is clamped to the pool length in that case. The drawn prefix is not
    /// registered, this is left to the caller.
    pub fn draw(
        &mut self,
        prefix_len: u8,
        registry: &PrefixRegistry,
    ) -> Result<IpNet, AllocationError> {
        let prefix_len = prefix_len.max(self.base.prefix_len());
        let pool = self.base;
        let exhausted = || AllocationError::PoolExhausted { pool, prefix_len };
        let block = block_size(self.family, prefix_len).ok_or_else(exhausted)?;
        let pool_size = block_size(self.family, self.base.prefix_len()).unwrap_or(u128::MAX);
        let base = addr_to_u128(self.base.network());

        // align the cursor to the requested block size
        let mut offset = match self.cursor % block {
            0 => self.cursor,
            rem => self.cursor.checked_add(block - rem).ok_or_else(exhausted)?,
        };

        loop {
            match offset.checked_add(block) {
                Some(end) if end <= pool_size => {}
                _ => return Err(exhausted()),
            }
            let addr = u128_to_addr(self.family, base + offset);
            let candidate = IpNet::new(addr, prefix_len).map_err(|_| exhausted())?;
            offset += block;
            match registry.find_overlap(&candidate) {
                Some((other, owner)) => {
                    trace!("Skipping {}, overlaps with {} of {}", candidate, other, owner);
                    // continue after the registered prefix, aligned to the block size
                    let other_end = addr_to_u128(other.broadcast())
                        .checked_add(1)
                        .ok_or_else(exhausted)?
                        .saturating_sub(base);
                    if other_end > offset {
                        offset = match other_end % block {
                            0 => other_end,
                            rem => other_end.checked_add(block - rem).ok_or_else(exhausted)?,
                        };
                    }
                }
                None => {
                    self.cursor = offset;
                    return Ok(candidate);
                }
            }
        }
    }
}
