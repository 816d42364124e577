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


//! # Simple BGP Network

use super::ExampleNetwork;
use crate::policy::{AsOverlay, BgpOverlay, BgpRouterOptions, Redistribute};
use crate::topology::Topology;
use crate::{Error, Overlays};

/// # Simple BGP Network
/// Three ASes in a chain. AS2 has two routers, connected in an iBGP full mesh.
///
/// ```text
/// h1 -- as1r1 -- as2r1 -- as2r2 -- as3r1 -- h3
///                  |        |
///                 h2a      h2b
/// ```
///
/// The following sessions are declared:
/// - as1r1 --- as2r1 (eBGP)
/// - as2r1 --- as2r2 (iBGP Peer)
/// - as3r1 --- as2r2 (eBGP)
///
/// Every router redistributes its connected prefixes and announces its loopbacks.
pub struct SimpleBgpNet {}

impl ExampleNetwork for SimpleBgpNet {
    fn build() -> Result<(Topology, Overlays), Error> {
        let mut t = Topology::new();

        // add routers
        let as1r1 = t.add_router("as1r1")?;
        let as2r1 = t.add_router("as2r1")?;
        let as2r2 = t.add_router("as2r2")?;
        let as3r1 = t.add_router("as3r1")?;

        // add hosts
        let h1 = t.add_host("h1")?;
        let h2a = t.add_host("h2a")?;
        let h2b = t.add_host("h2b")?;
        let h3 = t.add_host("h3")?;

        // add links
        t.add_links(&[
            (as1r1, as2r1),
            (as2r1, as2r2),
            (as3r1, as2r2),
            (as1r1, h1),
            (as2r1, h2a),
            (as2r2, h2b),
            (as3r1, h3),
        ])?;

        let mut bgp = BgpOverlay::new();
        bgp.add_as(AsOverlay::new(1, vec![as1r1]))
            .add_as(AsOverlay::full_mesh(2, vec![as2r1, as2r2]))
            .add_as(AsOverlay::new(3, vec![as3r1]))
            .bgp_session(as1r1, as2r1)
            .bgp_session(as3r1, as2r2);

        for r in [as1r1, as2r1, as2r2, as3r1].iter() {
            bgp.set_router_options(
                *r,
                BgpRouterOptions {
                    networks: Vec::new(),
                    advertise_loopback: true,
                    redistribute: vec![Redistribute::Connected],
                    igp_passive: Vec::new(),
                },
            );
        }

        Ok((t, Overlays { subnets: Vec::new(), bgp }))
    }
}
