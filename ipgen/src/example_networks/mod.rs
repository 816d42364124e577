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


//! Networks for testing and demonstration
//!
//! Every example declares a [`Topology`] together with its [`Overlays`]. Compile them with
//! [`compile`](crate::compile) to obtain the addressing and the BGP configuration.

use crate::topology::Topology;
use crate::{Error, Overlays};

mod simple_bgp;
pub use simple_bgp::SimpleBgpNet;

mod bgp_policies;
pub use bgp_policies::BgpPoliciesNet;

mod partial_static;
pub use partial_static::PartialStaticNet;

mod switched_lan;
pub use switched_lan::SwitchedLan;

mod route_reflector;
pub use route_reflector::RouteReflectorNet;

/// Trait for easier access to example networks.
pub trait ExampleNetwork {
    /// Declare the topology and its overlays
    fn build() -> Result<(Topology, Overlays), Error>;
}
