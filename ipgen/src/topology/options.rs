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

//! # Declarative options
//!
//! Every concern that can be configured on a node, a link or an interface has its own struct with
//! sensible defaults. The options are validated when they are attached to the topology, such that
//! the compile pass only ever sees consistent values.

use crate::topology::{AddressFamily, TopologyError};

use ipnet::IpNet;
use std::net::IpAddr;

/// Minimal (and default) IGP metric of a link
pub const MIN_IGP_METRIC: u32 = 1;
/// Default OSPF area of a link
pub const DEFAULT_IGP_AREA: &str = "0.0.0.0";
/// Default bridge priority of a switch
pub const DEFAULT_STP_PRIORITY: u16 = 32768;

/// IGP hints of a link or interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgpOptions {
    /// Metric (cost) of the interface
    pub metric: u32,
    /// Area of the interface
    pub area: String,
    /// If set, no adjacency is established over this interface
    pub passive: bool,
}

impl Default for IgpOptions {
    fn default() -> Self {
        Self { metric: MIN_IGP_METRIC, area: String::from(DEFAULT_IGP_AREA), passive: false }
    }
}

impl IgpOptions {
    /// Check that the metric is valid.
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.metric < MIN_IGP_METRIC {
            return Err(TopologyError::InvalidOption(format!(
                "IGP metric must be at least {}, got {}",
                MIN_IGP_METRIC, self.metric
            )));
        }
        Ok(())
    }
}

/// Addressing options of a single interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressingOptions {
    /// Static addresses (with prefix length) of the interface, of either family.
    pub addresses: Vec<IpNet>,
    /// Number of IPv4 addresses to allocate on the interface
    pub v4_width: usize,
    /// Number of IPv6 addresses to allocate on the interface
    pub v6_width: usize,
    /// The router sends IPv6 router advertisements on this interface. Hosts in the same domain
    /// then configure their IPv6 default route on their own.
    pub router_advertisement: bool,
}

impl Default for AddressingOptions {
    fn default() -> Self {
        Self { addresses: Vec::new(), v4_width: 1, v6_width: 1, router_advertisement: false }
    }
}

impl AddressingOptions {
    /// Number of addresses the interface needs in the given family
    pub fn width(&self, family: AddressFamily) -> usize {
        match family {
            AddressFamily::Ipv4 => self.v4_width,
            AddressFamily::Ipv6 => self.v6_width,
        }
    }

    /// Iterate over the static addresses of a family
    pub fn static_addresses(&self, family: AddressFamily) -> impl Iterator<Item = &IpNet> {
        self.addresses.iter().filter(move |a| AddressFamily::of(a) == family)
    }

    /// Returns `true` if the interface carries at least one static address of the family.
    pub fn has_static(&self, family: AddressFamily) -> bool {
        self.static_addresses(family).next().is_some()
    }

    /// Check that the widths are valid
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.v4_width == 0 || self.v6_width == 0 {
            return Err(TopologyError::InvalidOption(String::from(
                "address width must be at least 1",
            )));
        }
        Ok(())
    }
}

/// Per-node defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeOptions {
    /// Enable IPv4 on this node
    pub use_v4: bool,
    /// Enable IPv6 on this node
    pub use_v6: bool,
    /// Static loopback addresses (routers only). A family without a static loopback receives one
    /// from the loopback pool.
    pub lo_addresses: Vec<IpNet>,
    /// Static default gateways. A host with a static default gateway of a family does not receive
    /// an automatic default route for that family.
    pub default_routes: Vec<IpAddr>,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self { use_v4: true, use_v6: true, lo_addresses: Vec::new(), default_routes: Vec::new() }
    }
}

impl NodeOptions {
    /// Returns `true` if the node has the family enabled
    pub fn uses(&self, family: AddressFamily) -> bool {
        match family {
            AddressFamily::Ipv4 => self.use_v4,
            AddressFamily::Ipv6 => self.use_v6,
        }
    }

    /// Returns `true` if the node declares a static default gateway for the family
    pub fn has_default_route(&self, family: AddressFamily) -> bool {
        self.default_routes.iter().any(|gw| AddressFamily::of_addr(gw) == family)
    }
}

/// Spanning tree options of a switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StpOptions {
    /// Bridge priority. Lower values win the root election.
    pub priority: u16,
}

impl Default for StpOptions {
    fn default() -> Self {
        Self { priority: DEFAULT_STP_PRIORITY }
    }
}

impl StpOptions {
    /// The bridge priority is configured in steps of 4096
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.priority % 4096 != 0 {
            return Err(TopologyError::InvalidOption(format!(
                "STP priority must be a multiple of 4096, got {}",
                self.priority
            )));
        }
        Ok(())
    }
}
