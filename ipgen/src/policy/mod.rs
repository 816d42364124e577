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

//! # BGP Policies
//!
//! This module expands the declarative [`BgpOverlay`] (AS memberships, peerings, route
//! reflectors and policy directives) into per-router BGP configurations: neighbors with their
//! session parameters, and ordered route-maps bound to each (neighbor, family, direction).
//!
//! User directives always come first, in declaration order (or at their explicit order). The
//! defaults of the peering role are synthesized after them, and every route-map is terminated by
//! a permit-all entry at order [`DEFAULT_POLICY_ORDER`].
//! Only deny directives end the evaluation early; set and permit directives continue, so the
//! role defaults apply to every accepted route.

pub mod bgp;
pub mod lists;
pub mod overlay;
mod resolver;
pub mod route_map;

pub use bgp::{BgpNeighbor, BgpRouterConfig, BgpRouterOptions, BgpSessionType, Redistribute};
pub use lists::{
    AccessList, AccessListEntry, Community, CommunityList, ListSet, PrefixList, PrefixListEntry,
    ResolvedCommunityList,
};
pub use overlay::{
    AsOverlay, BgpOverlay, MatchRef, PeerRelation, Peering, PeeringRole, PolicyAction,
    PolicyDirective, RouteReflector,
};
pub use resolver::{resolve_policies, PolicyResolution, FROM_PEERS_LIST, FROM_UP_LIST};
pub use route_map::{
    OnMatch, Route, RouteMap, RouteMapBuilder, RouteMapDirection, RouteMapEntry, RouteMapMatch,
    RouteMapSet, RouteMapState, DEFAULT_POLICY_ORDER, ORDER_STEP, SYNTHESIZED_ORDER_BASE,
};

use crate::topology::{AsId, TopologyError};
use thiserror::Error;

/// Errors raised while resolving the BGP overlay
#[derive(Error, Debug, PartialEq)]
pub enum PolicyError {
    /// Only routers can be part of an AS
    #[error("Node {0} is not a router")]
    NotARouter(String),
    /// The same AS number is declared twice
    #[error("AS {0} is declared twice")]
    DuplicateAs(AsId),
    /// A router is member of two ASes
    #[error("Router {router} is part of both AS {first} and AS {second}")]
    MultipleAs {
        /// Name of the router
        router: String,
        /// The first AS
        first: AsId,
        /// The second AS
        second: AsId,
    },
    /// A router used in a session or directive is not part of any AS
    #[error("Router {0} is not part of any AS")]
    RouterWithoutAs(String),
    /// A router cannot peer with itself
    #[error("Router {0} cannot peer with itself")]
    SelfPeering(String),
    /// An eBGP session between routers that do not share a link
    #[error("eBGP peering between {0} and {1}, which are not directly connected")]
    PeeringWithoutLink(String, String),
    /// Peering roles describe relations between ASes
    #[error("Peering between {0} and {1} has a role, but both are in the same AS")]
    RoleOnIBgp(String, String),
    /// The same session is declared twice, with different roles
    #[error("Conflicting peering declarations between {0} and {1}")]
    ConflictingPeering(String, String),
    /// A directive refers to a session that is not declared
    #[error("Directive on {router} refers to {peer}, which is not a BGP neighbor")]
    NoSession {
        /// Name of the router
        router: String,
        /// Name of the peer
        peer: String,
    },
    /// A directive matches on a list that is not declared in the AS of the router
    #[error("List {list} used on {router} is not declared")]
    UnknownMatchList {
        /// Name of the list
        list: String,
        /// Name of the router
        router: String,
    },
    /// A declared list uses a name reserved for the synthesized lists
    #[error("List name {list} of AS {asn} is reserved")]
    ReservedListName {
        /// Name of the list
        list: String,
        /// The AS
        asn: AsId,
    },
    /// Two directives claim the same slot of a route-map
    #[error("Route-map {route_map} has two entries with order {order}")]
    ConflictingDirectives {
        /// Name of the route-map
        route_map: String,
        /// The order
        order: usize,
    },
    /// The order is reserved for the synthesized entries
    #[error("Order {order} of route-map {route_map} is reserved for default policies")]
    ReservedOrder {
        /// Name of the route-map
        route_map: String,
        /// The order
        order: usize,
    },
    /// The topology is inconsistent
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),
}
