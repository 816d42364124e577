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


//! # Route Reflector Network

use super::ExampleNetwork;
use crate::allocation::Subnet;
use crate::policy::{AccessList, AsOverlay, BgpOverlay, BgpRouterOptions, MatchRef, Redistribute};
use crate::topology::{IgpOptions, Topology};
use crate::{Error, Overlays};

use ipnet::{IpNet, Ipv6Net};
use std::net::Ipv6Addr;

/// # Route Reflector Network
/// AS1 is dual-homed to AS2. Inside AS1, as1r1 reflects the routes of all other routers.
///
/// ```text
///         AS1       |   AS2
///   as1r1 ---- as1r2 --- as2r1 -- as2h1
///     | 2           |      |
///   as1r3 ---- as1r4 --- as2r2
///                   |
/// ```
///
/// The following sessions are declared:
/// - as1r1 --> as1r2, as1r3, as1r4 (route reflector)
/// - as1r2 --- as2r1 (eBGP)
/// - as1r4 --- as2r2 (eBGP)
/// - as2r1 --- as2r2 (iBGP Peer)
///
/// The link as1r1 -- as1r3 has an IGP metric of 2. The LAN of as2h1 uses the declared IPv6
/// subnet `dead:beef::/32`, which both routers of AS2 announce. as1r4 lowers the local
/// preference of routes from as2r2 to 80, such that AS1 prefers the link via as1r2.
pub struct RouteReflectorNet {}

impl ExampleNetwork for RouteReflectorNet {
    fn build() -> Result<(Topology, Overlays), Error> {
        let mut t = Topology::new();

        let as1r1 = t.add_router("as1r1")?;
        let as1r2 = t.add_router("as1r2")?;
        let as1r3 = t.add_router("as1r3")?;
        let as1r4 = t.add_router("as1r4")?;
        let as2r1 = t.add_router("as2r1")?;
        let as2r2 = t.add_router("as2r2")?;
        let as2h1 = t.add_host("as2h1")?;

        let links = t.add_links(&[
            (as1r1, as1r2),
            (as1r1, as1r3),
            (as1r3, as1r4),
            (as1r2, as1r4),
            (as1r2, as2r1),
            (as1r4, as2r2),
            (as2r1, as2r2),
            (as2r1, as2h1),
        ])?;
        t.set_link_igp(links[1], IgpOptions { metric: 2, ..Default::default() })?;

        let beef = Ipv6Net::new_assert(Ipv6Addr::new(0xdead, 0xbeef, 0, 0, 0, 0, 0, 0), 32);
        let beef = IpNet::V6(beef);
        let subnet = Subnet::new(vec![as2r1, as2h1], vec![beef]);

        let mut bgp = BgpOverlay::new();
        bgp.add_as(
            AsOverlay::new(1, vec![as1r1, as1r2, as1r3, as1r4])
                .access_list(AccessList::any("all")),
        )
        .add_as(AsOverlay::full_mesh(2, vec![as2r1, as2r2]))
        .set_rr(as1r1, vec![as1r2, as1r3, as1r4])
        .bgp_session(as1r2, as2r1)
        .bgp_session(as1r4, as2r2)
        .set_local_pref(as1r4, as2r2, 80, vec![MatchRef::AccessList("all".into())]);

        for r in [as1r1, as1r2, as1r3, as1r4].iter() {
            bgp.set_router_options(
                *r,
                BgpRouterOptions {
                    redistribute: vec![Redistribute::Ospf, Redistribute::Connected],
                    ..Default::default()
                },
            );
        }
        for r in [as2r1, as2r2].iter() {
            bgp.set_router_options(
                *r,
                BgpRouterOptions { networks: vec![beef], ..Default::default() },
            );
        }

        Ok((t, Overlays { subnets: vec![subnet], bgp }))
    }
}
