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


//! # Partially Static Network

use super::ExampleNetwork;
use crate::allocation::Subnet;
use crate::topology::{NodeOptions, NodeRole, Topology};
use crate::{Error, Overlays};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use std::net::{Ipv4Addr, Ipv6Addr};

/// # Partially Static Network
/// Two of the LANs are addressed statically, the remaining addresses are allocated.
///
/// ```text
/// h1 -- r1 -- r2 -- s2 -- h3
///       |
///       s1 -- h2
///       |
///       h4
/// ```
///
/// - r1 has the static IPv6 loopback `2042:1::1/64`.
/// - The link r1 -- r2 uses the declared subnets `192.168.0.0/24` and `fc00::/64`.
/// - r2 and h3 carry static addresses in `192.168.1.0/24` and `fc00:1::/64`.
pub struct PartialStaticNet {}

impl ExampleNetwork for PartialStaticNet {
    fn build() -> Result<(Topology, Overlays), Error> {
        let mut t = Topology::new();

        let r1_options = NodeOptions {
            lo_addresses: vec![v6(Ipv6Addr::new(0x2042, 1, 0, 0, 0, 0, 0, 1), 64)],
            ..Default::default()
        };
        let r1 = t.add_node("r1", NodeRole::Router, r1_options)?;
        let r2 = t.add_router("r2")?;
        let s1 = t.add_switch("s1")?;
        let s2 = t.add_switch("s2")?;
        let h1 = t.add_host("h1")?;
        let h2 = t.add_host("h2")?;
        let h3 = t.add_host("h3")?;
        let h4 = t.add_host("h4")?;

        let links =
            t.add_links(&[(h1, r1), (r1, r2), (r1, s1), (s1, h2), (s1, h4), (r2, s2), (s2, h3)])?;
        let (l_r1r2, l_r2s2, l_s2h3) = (links[1], links[5], links[6]);

        t.add_static_address(l_r2s2, r2, v4(Ipv4Addr::new(192, 168, 1, 1), 24))?;
        t.add_static_address(l_r2s2, r2, v6(Ipv6Addr::new(0xfc00, 1, 0, 0, 0, 0, 0, 1), 64))?;
        t.add_static_address(l_s2h3, h3, v4(Ipv4Addr::new(192, 168, 1, 2), 24))?;
        t.add_static_address(l_s2h3, h3, v6(Ipv6Addr::new(0xfc00, 1, 0, 0, 0, 0, 0, 2), 64))?;

        let subnet = Subnet::on_link(
            l_r1r2,
            vec![
                v4(Ipv4Addr::new(192, 168, 0, 0), 24),
                v6(Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 0), 64),
            ],
        );

        Ok((t, Overlays { subnets: vec![subnet], bgp: Default::default() }))
    }
}

fn v4(addr: Ipv4Addr, len: u8) -> IpNet {
    IpNet::V4(Ipv4Net::new_assert(addr, len))
}

fn v6(addr: Ipv6Addr, len: u8) -> IpNet {
    IpNet::V6(Ipv6Net::new_assert(addr, len))
}
