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

//! # BGP overlay declarations
//!
//! The overlay holds the AS memberships, the peerings and the policy directives. It never
//! touches the topology. All derived facts are computed by the resolver in one pass.

use crate::policy::bgp::BgpRouterOptions;
use crate::policy::lists::{AccessList, Community, CommunityList, PrefixList};
use crate::policy::route_map::RouteMapDirection;
use crate::topology::{AddressFamily, AsId, NodeId};

use std::collections::BTreeMap;

/// An autonomous system: a set of routers sharing one AS number, together with the lists its
/// directives can match on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsOverlay {
    /// AS number
    pub asn: AsId,
    /// Member routers
    pub routers: Vec<NodeId>,
    /// Establish an iBGP full mesh among the routers
    pub full_mesh: bool,
    /// Access lists of the AS
    pub access_lists: Vec<AccessList>,
    /// Prefix lists of the AS
    pub prefix_lists: Vec<PrefixList>,
    /// Community lists of the AS
    pub community_lists: Vec<CommunityList>,
}

impl AsOverlay {
    /// Create a new AS
    pub fn new(asn: u32, routers: Vec<NodeId>) -> Self {
        Self {
            asn: AsId(asn),
            routers,
            full_mesh: false,
            access_lists: Vec::new(),
            prefix_lists: Vec::new(),
            community_lists: Vec::new(),
        }
    }

    /// Create a new AS whose routers form an iBGP full mesh
    pub fn full_mesh(asn: u32, routers: Vec<NodeId>) -> Self {
        Self { full_mesh: true, ..Self::new(asn, routers) }
    }

    /// Add an access list
    pub fn access_list(mut self, list: AccessList) -> Self {
        self.access_lists.push(list);
        self
    }

    /// Add a prefix list
    pub fn prefix_list(mut self, list: PrefixList) -> Self {
        self.prefix_lists.push(list);
        self
    }

    /// Add a community list
    pub fn community_list(mut self, list: CommunityList) -> Self {
        self.community_lists.push(list);
        self
    }

    /// Returns `true` if a list of any kind with the given name exists
    pub fn has_list(&self, name: &str) -> bool {
        self.access_lists.iter().any(|l| l.name == name)
            || self.prefix_lists.iter().any(|l| l.name == name)
            || self.community_lists.iter().any(|l| l.name == name)
    }
}

/// Business relationship of a peering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeeringRole {
    /// No relationship, routes are exchanged without filtering
    Plain,
    /// Shared-cost peering. Routes are only exchanged between the peers and their clients.
    SharedCost,
    /// The first router of the peering is the client of the second one, the provider.
    ClientProvider,
}

/// A declared BGP session between two routers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peering {
    /// First router
    pub a: NodeId,
    /// Second router (the provider, for [`PeeringRole::ClientProvider`])
    pub b: NodeId,
    /// Relationship
    pub role: PeeringRole,
    /// The session may span multiple hops (eBGP only)
    pub multihop: bool,
}

/// Relationship of a peer, seen from the local router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerRelation {
    /// No relationship
    Plain,
    /// The peer is a shared-cost peer
    SharedCost,
    /// The peer is the provider of the local router
    Provider,
    /// The peer is a client of the local router
    Client,
}

impl Peering {
    /// Relationship of the other end of the peering, seen from `local`.
    pub fn relation_of_peer(&self, local: NodeId) -> PeerRelation {
        match self.role {
            PeeringRole::Plain => PeerRelation::Plain,
            PeeringRole::SharedCost => PeerRelation::SharedCost,
            PeeringRole::ClientProvider if local == self.a => PeerRelation::Provider,
            PeeringRole::ClientProvider => PeerRelation::Client,
        }
    }

    /// Returns the other end of the peering, if `local` is part of it
    pub fn other(&self, local: NodeId) -> Option<NodeId> {
        if local == self.a {
            Some(self.b)
        } else if local == self.b {
            Some(self.a)
        } else {
            None
        }
    }
}

/// A route reflector with its clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteReflector {
    /// The route reflector
    pub rr: NodeId,
    /// Its clients
    pub clients: Vec<NodeId>,
}

/// Match condition of a directive, referring to a list of the AS by name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatchRef {
    /// Match the prefix against an access list
    AccessList(String),
    /// Match the prefix against a prefix list
    PrefixList(String),
    /// Match the next hop against an access list
    NextHop(String),
    /// Match the communities against a community list
    Community(String),
}

impl MatchRef {
    /// Name of the referenced list
    pub fn name(&self) -> &str {
        match self {
            Self::AccessList(n) | Self::PrefixList(n) | Self::NextHop(n) | Self::Community(n) => n,
        }
    }
}

/// Action of a directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyAction {
    /// Permit and set the local preference
    SetLocalPref(u32),
    /// Permit and set the MED
    SetMed(u32),
    /// Permit and attach a community
    SetCommunity(Community),
    /// Permit
    Permit,
    /// Deny
    Deny,
}

/// A declared policy intent on one session of a router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDirective {
    /// The router on which the route-map is configured
    pub router: NodeId,
    /// The peer of the session
    pub peer: NodeId,
    /// Direction
    pub direction: RouteMapDirection,
    /// Families, empty means all active families
    pub families: Vec<AddressFamily>,
    /// What to do with matching routes
    pub action: PolicyAction,
    /// Match conditions, connected in an and
    pub matching: Vec<MatchRef>,
    /// Explicit order. Without it, the entry is placed after the previous one.
    pub order: Option<usize>,
}

impl PolicyDirective {
    /// Create a new directive for all families, without match condition
    pub fn new(
        router: NodeId,
        peer: NodeId,
        direction: RouteMapDirection,
        action: PolicyAction,
    ) -> Self {
        Self {
            router,
            peer,
            direction,
            families: Vec::new(),
            action,
            matching: Vec::new(),
            order: None,
        }
    }

    /// Add match conditions
    pub fn matching(mut self, matching: Vec<MatchRef>) -> Self {
        self.matching.extend(matching);
        self
    }

    /// Restrict the directive to a family
    pub fn family(mut self, family: AddressFamily) -> Self {
        self.families.push(family);
        self
    }

    /// Set an explicit order
    pub fn order(mut self, order: usize) -> Self {
        self.order = Some(order);
        self
    }

    /// Returns `true` if the directive applies to the family
    pub fn applies_to(&self, family: AddressFamily) -> bool {
        self.families.is_empty() || self.families.contains(&family)
    }
}

/// # BGP Overlay
/// Declarative description of the BGP setup of the network.
///
/// ```
/// # use ipgen::topology::Topology;
/// # use ipgen::policy::*;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # let mut t = Topology::new();
/// # let as1r1 = t.add_router("as1r1")?;
/// # let as2r1 = t.add_router("as2r1")?;
/// # t.add_link(as1r1, as2r1)?;
/// let mut bgp = BgpOverlay::new();
/// bgp.add_as(AsOverlay::new(1, vec![as1r1]).access_list(AccessList::any("all")))
///     .add_as(AsOverlay::new(2, vec![as2r1]))
///     .client_provider(as1r1, as2r1)
///     .set_local_pref(as1r1, as2r1, 80, vec![MatchRef::AccessList("all".into())]);
/// assert_eq!(bgp.peerings().len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BgpOverlay {
    ases: Vec<AsOverlay>,
    peerings: Vec<Peering>,
    route_reflectors: Vec<RouteReflector>,
    directives: Vec<PolicyDirective>,
    router_options: BTreeMap<NodeId, BgpRouterOptions>,
}

impl BgpOverlay {
    /// Create an empty overlay
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an AS
    pub fn add_as(&mut self, as_overlay: AsOverlay) -> &mut Self {
        self.ases.push(as_overlay);
        self
    }

    /// Declare a BGP session
    pub fn add_peering(&mut self, peering: Peering) -> &mut Self {
        self.peerings.push(peering);
        self
    }

    /// Declare a plain BGP session (eBGP or iBGP, depending on the AS of the routers).
    pub fn bgp_session(&mut self, a: NodeId, b: NodeId) -> &mut Self {
        self.add_peering(Peering { a, b, role: PeeringRole::Plain, multihop: false })
    }

    /// Declare a shared-cost eBGP session
    pub fn shared_cost(&mut self, a: NodeId, b: NodeId) -> &mut Self {
        self.add_peering(Peering { a, b, role: PeeringRole::SharedCost, multihop: false })
    }

    /// Declare an eBGP session where `client` buys transit from `provider`
    pub fn client_provider(&mut self, client: NodeId, provider: NodeId) -> &mut Self {
        self.add_peering(Peering {
            a: client,
            b: provider,
            role: PeeringRole::ClientProvider,
            multihop: false,
        })
    }

    /// Declare `rr` as route reflector for the clients, with one iBGP session per client.
    pub fn set_rr(&mut self, rr: NodeId, clients: Vec<NodeId>) -> &mut Self {
        self.route_reflectors.push(RouteReflector { rr, clients });
        self
    }

    /// Add a policy directive
    pub fn add_directive(&mut self, directive: PolicyDirective) -> &mut Self {
        self.directives.push(directive);
        self
    }

    /// Set the local preference of routes received by `router` from `from_peer`.
    pub fn set_local_pref(
        &mut self,
        router: NodeId,
        from_peer: NodeId,
        local_pref: u32,
        matching: Vec<MatchRef>,
    ) -> &mut Self {
        self.add_directive(
            PolicyDirective::new(
                router,
                from_peer,
                RouteMapDirection::Incoming,
                PolicyAction::SetLocalPref(local_pref),
            )
            .matching(matching),
        )
    }

    /// Set the MED of routes sent by `router` to `to_peer`.
    pub fn set_med(
        &mut self,
        router: NodeId,
        to_peer: NodeId,
        med: u32,
        matching: Vec<MatchRef>,
    ) -> &mut Self {
        self.add_directive(
            PolicyDirective::new(
                router,
                to_peer,
                RouteMapDirection::Outgoing,
                PolicyAction::SetMed(med),
            )
            .matching(matching),
        )
    }

    /// Attach a community to routes exchanged between `router` and `peer`.
    pub fn set_community(
        &mut self,
        router: NodeId,
        peer: NodeId,
        direction: RouteMapDirection,
        community: impl Into<Community>,
        matching: Vec<MatchRef>,
    ) -> &mut Self {
        self.add_directive(
            PolicyDirective::new(
                router,
                peer,
                direction,
                PolicyAction::SetCommunity(community.into()),
            )
            .matching(matching),
        )
    }

    /// Deny matching routes exchanged between `router` and `peer`.
    pub fn deny(
        &mut self,
        router: NodeId,
        peer: NodeId,
        direction: RouteMapDirection,
        matching: Vec<MatchRef>,
    ) -> &mut Self {
        self.add_directive(
            PolicyDirective::new(router, peer, direction, PolicyAction::Deny).matching(matching),
        )
    }

    /// Permit matching routes exchanged between `router` and `peer`.
    pub fn permit(
        &mut self,
        router: NodeId,
        peer: NodeId,
        direction: RouteMapDirection,
        matching: Vec<MatchRef>,
    ) -> &mut Self {
        self.add_directive(
            PolicyDirective::new(router, peer, direction, PolicyAction::Permit).matching(matching),
        )
    }

    /// Set the BGP options of a router
    pub fn set_router_options(&mut self, router: NodeId, options: BgpRouterOptions) -> &mut Self {
        self.router_options.insert(router, options);
        self
    }

    /// Declared ASes
    pub fn ases(&self) -> &[AsOverlay] {
        &self.ases
    }

    /// Declared peerings
    pub fn peerings(&self) -> &[Peering] {
        &self.peerings
    }

    /// Declared route reflectors
    pub fn route_reflectors(&self) -> &[RouteReflector] {
        &self.route_reflectors
    }

    /// Declared directives
    pub fn directives(&self) -> &[PolicyDirective] {
        &self.directives
    }

    /// BGP options of a router
    pub fn router_options(&self, router: NodeId) -> Option<&BgpRouterOptions> {
        self.router_options.get(&router)
    }
}
