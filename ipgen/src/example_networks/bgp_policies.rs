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


//! # BGP Policies Network

use super::ExampleNetwork;
use crate::policy::{AsOverlay, BgpOverlay, BgpRouterOptions, Redistribute};
use crate::topology::Topology;
use crate::{Error, Overlays};

/// # BGP Policies Network
/// Five ASes. AS1 to AS4 connect with shared-cost peerings, and all of them buy transit from
/// AS5. Every router has a single test host attached.
///
/// ```text
///       as1r1 ------------+
///         | =             |
///       as2r1 --------> as5r1
///         |              ^ ^
///       as2r2            | |
///         | =            | |
///       as3r1 -----------+ |
///         | =              |
///       as4r1 -------------+
/// ```
///
/// The following sessions are declared:
/// - as1r1 --- as2r1 (shared cost)
/// - as3r1 --- as2r2 (shared cost)
/// - as3r1 --- as4r1 (shared cost)
/// - as1r1 --> as5r1 (client / provider)
/// - as2r1 --> as5r1 (client / provider)
/// - as3r1 --> as5r1 (client / provider)
/// - as4r1 --> as5r1 (client / provider)
/// - as2r1 --- as2r2 (iBGP Peer)
///
/// Routes from clients are preferred over routes from shared-cost peers, which are preferred over
/// routes from the provider. Routes learned from a shared-cost peer or a provider are never
/// announced to another shared-cost peer or provider.
pub struct BgpPoliciesNet {}

impl ExampleNetwork for BgpPoliciesNet {
    fn build() -> Result<(Topology, Overlays), Error> {
        let mut t = Topology::new();

        let as1r1 = t.add_router("as1r1")?;
        let as2r1 = t.add_router("as2r1")?;
        let as2r2 = t.add_router("as2r2")?;
        let as3r1 = t.add_router("as3r1")?;
        let as4r1 = t.add_router("as4r1")?;
        let as5r1 = t.add_router("as5r1")?;
        let routers = [as1r1, as2r1, as2r2, as3r1, as4r1, as5r1];

        t.add_links(&[
            (as1r1, as2r1),
            (as2r1, as2r2),
            (as3r1, as2r2),
            (as3r1, as4r1),
            (as5r1, as1r1),
            (as5r1, as2r1),
            (as5r1, as3r1),
            (as5r1, as4r1),
        ])?;

        // test hosts
        for r in routers.iter() {
            let name = format!("h{}", t.get_node_name(*r)?);
            let h = t.add_host(name)?;
            t.add_link(*r, h)?;
        }

        let mut bgp = BgpOverlay::new();
        bgp.add_as(AsOverlay::new(1, vec![as1r1]))
            .add_as(AsOverlay::full_mesh(2, vec![as2r1, as2r2]))
            .add_as(AsOverlay::new(3, vec![as3r1]))
            .add_as(AsOverlay::new(4, vec![as4r1]))
            .add_as(AsOverlay::new(5, vec![as5r1]))
            .shared_cost(as1r1, as2r1)
            .shared_cost(as3r1, as2r2)
            .shared_cost(as3r1, as4r1)
            .client_provider(as1r1, as5r1)
            .client_provider(as2r1, as5r1)
            .client_provider(as3r1, as5r1)
            .client_provider(as4r1, as5r1);

        for r in routers.iter() {
            bgp.set_router_options(
                *r,
                BgpRouterOptions {
                    redistribute: vec![Redistribute::Connected],
                    ..Default::default()
                },
            );
        }

        Ok((t, Overlays { subnets: Vec::new(), bgp }))
    }
}
