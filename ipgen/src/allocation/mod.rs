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

//! # Address Allocation
//!
//! Assigns IPv4 and IPv6 prefixes to every broadcast domain, addresses to every host and router
//! interface and loopback addresses to every router. Both families are handled independently,
//! each with its own pools, which live for exactly one call of [`allocate`].
//!
//! The allocation proceeds in the following steps, for each enabled family:
//!
//! 1. Declared [`Subnet`]s are resolved to the broadcast domain they cover.
//! 2. All static prefixes (declared subnets, static interface addresses and static loopbacks) are
//!    registered, such that no dynamic draw can ever overlap with them.
//! 3. Every domain (in declaration order) receives either its static prefix, its declared prefix,
//!    or a fresh prefix from the link pool. Interfaces without a static address are numbered
//!    from the start of that prefix.
//! 4. Every router (in declaration order) receives a loopback address, unless it declares a
//!    static one.
//!
//! Finally, hosts get a default route towards the first router of their domain.

mod allocator;
pub mod pool;
mod subnet;

pub use allocator::{allocate, Addressing};
pub use pool::{AllocationPool, PrefixOwner, PrefixRegistry};
pub use subnet::Subnet;

use crate::domains::DomainId;
use crate::topology::{AddressFamily, TopologyError};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use std::net::{Ipv4Addr, Ipv6Addr};
use thiserror::Error;

/// Default pool for IPv4 link prefixes
pub const DEFAULT_V4_LINK_POOL: Ipv4Net = Ipv4Net::new_assert(Ipv4Addr::new(192, 168, 0, 0), 16);
/// Default prefix length of an IPv4 link prefix
pub const DEFAULT_V4_LINK_PREFIX_LEN: u8 = 24;
/// Default pool for IPv6 link prefixes
pub const DEFAULT_V6_LINK_POOL: Ipv6Net =
    Ipv6Net::new_assert(Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 0), 8);
/// Default prefix length of an IPv6 link prefix
pub const DEFAULT_V6_LINK_PREFIX_LEN: u8 = 48;
/// Default pool for IPv4 loopbacks
pub const DEFAULT_V4_LOOPBACK_POOL: Ipv4Net = Ipv4Net::new_assert(Ipv4Addr::new(10, 0, 0, 0), 16);
/// Default pool for IPv6 loopbacks
pub const DEFAULT_V6_LOOPBACK_POOL: Ipv6Net =
    Ipv6Net::new_assert(Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 0), 16);

/// A pool of prefixes, from which prefixes of the default length are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// The address space of the pool
    pub base: IpNet,
    /// Default prefix length of each draw
    pub prefix_len: u8,
}

impl PoolSettings {
    /// Create new pool settings
    pub fn new(base: impl Into<IpNet>, prefix_len: u8) -> Self {
        Self { base: base.into(), prefix_len }
    }
}

/// Compile-wide addressing options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationSettings {
    /// Enable IPv4 in the whole network
    pub use_v4: bool,
    /// Enable IPv6 in the whole network
    pub use_v6: bool,
    /// Run the automatic allocation. If disabled, only static addresses are used.
    pub allocate_ips: bool,
    /// IPv4 pool for broadcast domains
    pub v4_links: PoolSettings,
    /// IPv6 pool for broadcast domains
    pub v6_links: PoolSettings,
    /// IPv4 pool for router loopbacks
    pub v4_loopbacks: PoolSettings,
    /// IPv6 pool for router loopbacks
    pub v6_loopbacks: PoolSettings,
}

impl Default for AllocationSettings {
    fn default() -> Self {
        Self {
            use_v4: true,
            use_v6: true,
            allocate_ips: true,
            v4_links: PoolSettings::new(DEFAULT_V4_LINK_POOL, DEFAULT_V4_LINK_PREFIX_LEN),
            v6_links: PoolSettings::new(DEFAULT_V6_LINK_POOL, DEFAULT_V6_LINK_PREFIX_LEN),
            v4_loopbacks: PoolSettings::new(DEFAULT_V4_LOOPBACK_POOL, 32),
            v6_loopbacks: PoolSettings::new(DEFAULT_V6_LOOPBACK_POOL, 128),
        }
    }
}

impl AllocationSettings {
    /// Returns `true` if the family is enabled
    pub fn uses(&self, family: AddressFamily) -> bool {
        match family {
            AddressFamily::Ipv4 => self.use_v4,
            AddressFamily::Ipv6 => self.use_v6,
        }
    }

    /// All enabled families, in processing order
    pub fn families(&self) -> Vec<AddressFamily> {
        AddressFamily::ALL.iter().copied().filter(|af| self.uses(*af)).collect()
    }

    /// Link pool of the family
    pub fn link_pool(&self, family: AddressFamily) -> &PoolSettings {
        match family {
            AddressFamily::Ipv4 => &self.v4_links,
            AddressFamily::Ipv6 => &self.v6_links,
        }
    }

    /// Loopback pool of the family
    pub fn loopback_pool(&self, family: AddressFamily) -> &PoolSettings {
        match family {
            AddressFamily::Ipv4 => &self.v4_loopbacks,
            AddressFamily::Ipv6 => &self.v6_loopbacks,
        }
    }
}

/// Errors raised during address allocation. Any of them aborts the allocation, no partial
/// addressing is returned.
#[derive(Error, Debug, PartialEq)]
pub enum AllocationError {
    /// The declared subnet cannot hold every address of its domain
    #[error("Subnet {prefix} is too small: {needed} addresses needed, {available} available")]
    UndersizedSubnet {
        /// The declared prefix
        prefix: IpNet,
        /// Number of addresses the domain needs
        needed: usize,
        /// Number of usable host addresses in the prefix
        available: u128,
    },
    /// Two declared subnets overlap
    #[error("Declared subnets {0} and {1} overlap")]
    OverlappingSubnets(IpNet, IpNet),
    /// A static prefix overlaps with a prefix of a different owner
    #[error("Prefix {prefix} of {owner} overlaps with {other} of {other_owner}")]
    OverlappingPrefix {
        /// The prefix that was registered
        prefix: IpNet,
        /// Owner of the prefix that was registered
        owner: PrefixOwner,
        /// The already registered prefix
        other: IpNet,
        /// Owner of the already registered prefix
        other_owner: PrefixOwner,
    },
    /// A static address of a partially static domain lies outside of its declared subnet
    #[error("Static address {address} is outside of the declared subnet {prefix}")]
    StaticOutsideSubnet {
        /// The static address
        address: IpNet,
        /// The declared subnet of the domain
        prefix: IpNet,
    },
    /// Some interfaces of the domain are static, but no subnet is declared for it.
    #[error("Domain {domain} is partially static for {family} but has no declared subnet")]
    PartiallyStaticDomain {
        /// The domain
        domain: DomainId,
        /// The family
        family: AddressFamily,
    },
    /// No free prefix is left in the pool
    #[error("Pool {pool} has no free /{prefix_len} prefix left")]
    PoolExhausted {
        /// The address space of the pool
        pool: IpNet,
        /// The requested prefix length
        prefix_len: u8,
    },
    /// The nodes and links of a subnet declaration do not share a broadcast domain
    #[error("Subnet {0} does not correspond to a single broadcast domain")]
    SubnetNotInLan(IpNet),
    /// Two declared subnets of the same family resolve to the same domain
    #[error("Domain {domain} has more than one declared {family} subnet")]
    DuplicateDomainSubnet {
        /// The domain
        domain: DomainId,
        /// The family
        family: AddressFamily,
    },
    /// The pool settings are inconsistent
    #[error("Invalid pool {base} with prefix length {prefix_len}")]
    InvalidPool {
        /// The address space of the pool
        base: IpNet,
        /// The default prefix length
        prefix_len: u8,
    },
    /// The topology is inconsistent
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),
}
