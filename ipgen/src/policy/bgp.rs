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

//! Module containing definitions for BGP sessions and router configurations

use crate::policy::lists::ListSet;
use crate::policy::route_map::{Route, RouteMap, RouteMapDirection};
use crate::topology::{AddressFamily, AsId, InterfaceId, NodeId};

use ipnet::IpNet;
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

/// Type of a BGP session, seen from the local router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BgpSessionType {
    /// iBGP session with a peer (or from a client with a Route Reflector)
    IBgpPeer,
    /// iBGP session from a Route Reflector with a client
    IBgpClient,
    /// eBGP session
    EBgp,
}

impl BgpSessionType {
    /// returns true if the session type is EBgp
    pub fn is_ebgp(&self) -> bool {
        matches!(self, Self::EBgp)
    }

    /// returns true if the session type is IBgp
    pub fn is_ibgp(&self) -> bool {
        !self.is_ebgp()
    }
}

impl fmt::Display for BgpSessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::IBgpPeer => "iBGP",
            Self::IBgpClient => "iBGP RR client",
            Self::EBgp => "eBGP",
        })
    }
}

/// Protocols whose routes are redistributed into BGP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Redistribute {
    /// Directly connected prefixes
    Connected,
    /// Static routes
    Static,
    /// OSPF routes
    Ospf,
}

/// BGP options of a single router
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BgpRouterOptions {
    /// Prefixes announced by the router
    pub networks: Vec<IpNet>,
    /// Also announce the loopback addresses of the router
    pub advertise_loopback: bool,
    /// Redistributed protocols
    pub redistribute: Vec<Redistribute>,
    /// Interfaces towards directly connected eBGP peers, on which the IGP stays passive
    pub igp_passive: Vec<InterfaceId>,
}

/// A resolved BGP neighbor of a router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgpNeighbor {
    /// The peer
    pub peer: NodeId,
    /// Name of the peer
    pub name: String,
    /// AS of the peer
    pub remote_as: AsId,
    /// Type of the session, from the local point of view
    pub session_type: BgpSessionType,
    /// Address of the peer, per family
    pub addresses: BTreeMap<AddressFamily, IpAddr>,
    /// Local address of the session, per family
    pub local_addresses: BTreeMap<AddressFamily, IpAddr>,
    /// The session is established over more than one hop
    pub ebgp_multihop: bool,
    /// Announce routes with the local router as next hop
    pub next_hop_self: bool,
}

impl BgpNeighbor {
    /// Families in which the session is activated, i.e., families with a peer address.
    pub fn families(&self) -> impl Iterator<Item = AddressFamily> + '_ {
        self.addresses.keys().copied()
    }

    /// Returns `true` if the session is activated for the family
    pub fn is_active(&self, family: AddressFamily) -> bool {
        self.addresses.contains_key(&family)
    }

    /// Returns `true` if the local router is a route reflector for this peer
    pub fn is_rr_client(&self) -> bool {
        self.session_type == BgpSessionType::IBgpClient
    }
}

/// BGP configuration of a single router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgpRouterConfig {
    /// The router
    pub router: NodeId,
    /// AS of the router
    pub asn: AsId,
    /// Router ID (the IPv4 loopback, if any)
    pub router_id: Option<IpAddr>,
    /// Neighbors, in the order in which the sessions were declared
    pub neighbors: Vec<BgpNeighbor>,
    /// Route-maps, in the order of neighbors, families and directions
    pub route_maps: Vec<RouteMap>,
    /// Lists referred to by the route-maps
    pub lists: ListSet,
    /// Announced prefixes
    pub networks: Vec<IpNet>,
    /// Redistributed protocols
    pub redistribute: Vec<Redistribute>,
    /// Interfaces towards directly connected eBGP peers, on which the IGP stays passive
    pub igp_passive: Vec<InterfaceId>,
}

impl BgpRouterConfig {
    /// Returns the neighbor configuration of a peer
    pub fn neighbor(&self, peer: NodeId) -> Option<&BgpNeighbor> {
        self.neighbors.iter().find(|n| n.peer == peer)
    }

    /// Returns the route-map bound to the session
    pub fn route_map(
        &self,
        peer: NodeId,
        family: AddressFamily,
        direction: RouteMapDirection,
    ) -> Option<&RouteMap> {
        self.route_maps
            .iter()
            .find(|m| m.neighbor == peer && m.family == family && m.direction == direction)
    }

    /// Evaluate the route-map bound to the session on a route. Sessions without route-map (or
    /// inactive families) deny everything.
    pub fn apply(
        &self,
        peer: NodeId,
        direction: RouteMapDirection,
        route: Route,
    ) -> Option<Route> {
        let family = AddressFamily::of(&route.prefix);
        self.route_map(peer, family, direction)?.apply(route, &self.lists)
    }
}
