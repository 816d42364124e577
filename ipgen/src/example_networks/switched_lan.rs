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


//! # Switched LAN

use super::ExampleNetwork;
use crate::topology::{AddressingOptions, StpOptions, Topology};
use crate::{Error, Overlays};

/// # Switched LAN
/// Two routers share a LAN built from a switch loop and a hub. A second link between the routers
/// forms its own domain, and r2 serves a stub LAN with a single host.
///
/// ```text
///        r1 ----------- r2 -- h4
///        |              |
///        s1 ---- s2 --- s3 -- h3
///         \      |     /
///          +-----|----+
///                |
///               hub -- h1
///                |
///                h2
/// ```
///
/// - s1 is the spanning tree root (priority 4096).
/// - The port of s2 towards s3 has a spanning tree cost of 10.
/// - r1 sends IPv6 router advertisements into the LAN, such that h1, h2 and h3 configure their
///   IPv6 default route themselves.
pub struct SwitchedLan {}

impl ExampleNetwork for SwitchedLan {
    fn build() -> Result<(Topology, Overlays), Error> {
        let mut t = Topology::new();

        let r1 = t.add_router("r1")?;
        let r2 = t.add_router("r2")?;
        let s1 = t.add_switch("s1")?;
        let s2 = t.add_switch("s2")?;
        let s3 = t.add_switch("s3")?;
        let hub = t.add_hub("hub")?;
        let h1 = t.add_host("h1")?;
        let h2 = t.add_host("h2")?;
        let h3 = t.add_host("h3")?;
        let h4 = t.add_host("h4")?;

        let links = t.add_links(&[
            (r1, s1),
            (s1, s2),
            (s2, s3),
            (s3, s1),
            (s2, hub),
            (hub, h1),
            (hub, h2),
            (s3, h3),
            (r2, s3),
            (r1, r2),
            (r2, h4),
        ])?;

        t.set_stp(s1, StpOptions { priority: 4096 })?;
        t.set_stp_cost(links[2], s2, 10)?;
        t.set_addressing(
            links[0],
            r1,
            AddressingOptions { router_advertisement: true, ..Default::default() },
        )?;
        t.set_link_bandwidth(links[9], 100)?;

        Ok((t, Overlays::default()))
    }
}
