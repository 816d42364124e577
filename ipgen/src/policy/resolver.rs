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

//! Resolution of the BGP overlay into per-router configurations

use crate::allocation::Addressing;
use crate::domains::DomainMap;
use crate::policy::bgp::{BgpNeighbor, BgpRouterConfig, BgpSessionType};
use crate::policy::lists::{ListSet, ResolvedCommunityList};
use crate::policy::overlay::{
    AsOverlay, BgpOverlay, MatchRef, PeerRelation, Peering, PeeringRole, PolicyAction,
    PolicyDirective,
};
use crate::policy::route_map::{
    RouteMap, RouteMapBuilder, RouteMapDirection, RouteMapEntry, RouteMapMatch, RouteMapState,
    DEFAULT_POLICY_ORDER, ORDER_STEP, SYNTHESIZED_ORDER_BASE,
};
use crate::policy::PolicyError;
use crate::topology::{AddressFamily, NodeId, NodeRole, Topology};

use itertools::Itertools;
use log::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::IpAddr;

/// Community list matching routes learned from shared-cost peers
pub const FROM_PEERS_LIST: &str = "from-peers";
/// Community list matching routes learned from providers
pub const FROM_UP_LIST: &str = "from-up";

const FROM_PEERS_COMMUNITY: u32 = 1;
const FROM_CLIENTS_COMMUNITY: u32 = 2;
const FROM_UP_COMMUNITY: u32 = 3;

const SHARED_COST_LOCAL_PREF: u32 = 150;
const PROVIDER_LOCAL_PREF: u32 = 100;
const CLIENT_LOCAL_PREF: u32 = 200;

/// Resolved BGP configuration of all routers that are part of an AS
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyResolution {
    routers: BTreeMap<NodeId, BgpRouterConfig>,
}

impl PolicyResolution {
    /// Returns the configuration of a router
    pub fn get(&self, router: NodeId) -> Option<&BgpRouterConfig> {
        self.routers.get(&router)
    }

    /// Iterate over all router configurations
    pub fn iter(&self) -> impl Iterator<Item = &BgpRouterConfig> {
        self.routers.values()
    }

    /// Number of BGP routers
    pub fn len(&self) -> usize {
        self.routers.len()
    }

    /// Returns `true` if no router runs BGP
    pub fn is_empty(&self) -> bool {
        self.routers.is_empty()
    }
}

/// Resolve the BGP overlay.
///
/// Sessions are collected from the declared peerings, the route reflectors and the full-mesh
/// ASes (in this order). The same session may be declared more than once, as long as all
/// declarations agree. Every directive must refer to a declared session, and to lists declared in
/// the AS of its router.
pub fn resolve_policies(
    topo: &Topology,
    domains: &DomainMap,
    addressing: &Addressing,
    overlay: &BgpOverlay,
) -> Result<PolicyResolution, PolicyError> {
    let as_of = as_memberships(topo, overlay)?;
    let sessions = collect_sessions(topo, domains, overlay, &as_of)?;
    check_directives(topo, overlay, &as_of, &sessions)?;

    let route_reflectors: HashSet<NodeId> =
        overlay.route_reflectors().iter().map(|rr| rr.rr).collect();

    info!("Resolving BGP policies of {} routers", as_of.len());
    let mut result = PolicyResolution::default();

    for router in topo.nodes_with_role(NodeRole::Router) {
        let as_overlay = match as_of.get(&router.id()) {
            Some(idx) => &overlay.ases()[*idx],
            None => continue,
        };
        let router_sessions: Vec<&Peering> =
            sessions.iter().filter(|s| s.other(router.id()).is_some()).collect();
        let has_ebgp = router_sessions.iter().any(|s| {
            s.other(router.id()).and_then(|p| as_of.get(&p)) != as_of.get(&router.id())
        });

        let mut config = BgpRouterConfig {
            router: router.id(),
            asn: as_overlay.asn,
            router_id: addressing.loopback(router.id(), AddressFamily::Ipv4),
            neighbors: Vec::new(),
            route_maps: Vec::new(),
            lists: resolve_lists(as_overlay),
            networks: Vec::new(),
            redistribute: Vec::new(),
            igp_passive: Vec::new(),
        };

        for session in router_sessions {
            let peer = match session.other(router.id()) {
                Some(peer) => peer,
                None => continue,
            };
            let peer_as = match as_of.get(&peer) {
                Some(idx) => &overlay.ases()[*idx],
                None => continue,
            };
            let ebgp = peer_as.asn != as_overlay.asn;
            let session_type = if ebgp {
                BgpSessionType::EBgp
            } else if route_reflectors.contains(&router.id()) && !route_reflectors.contains(&peer)
            {
                BgpSessionType::IBgpClient
            } else {
                BgpSessionType::IBgpPeer
            };

            let neighbor = make_neighbor(
                topo,
                domains,
                addressing,
                router.id(),
                peer,
                peer_as,
                session_type,
                has_ebgp,
            )?;
            debug!(
                "{} neighbor {} of {}, active for {:?}",
                session_type,
                neighbor.name,
                router.name(),
                neighbor.families().collect::<Vec<_>>()
            );

            // no IGP adjacency towards other ASes
            let direct = domains.shared_interfaces(topo, router.id(), peer);
            if let Some((local, _)) = direct.filter(|_| ebgp) {
                if !config.igp_passive.contains(&local) {
                    config.igp_passive.push(local);
                }
            }

            let relation = session.relation_of_peer(router.id());
            if matches!(relation, PeerRelation::SharedCost | PeerRelation::Provider) {
                add_role_lists(&mut config.lists, as_overlay);
            }

            for family in neighbor.families() {
                for direction in [RouteMapDirection::Incoming, RouteMapDirection::Outgoing].iter() {
                    let directives = overlay.directives().iter().filter(|d| {
                        d.router == router.id()
                            && d.peer == peer
                            && d.direction == *direction
                            && d.applies_to(family)
                    });
                    config.route_maps.push(build_route_map(
                        as_overlay,
                        &neighbor,
                        family,
                        *direction,
                        relation,
                        directives,
                    )?);
                }
            }
            config.neighbors.push(neighbor);
        }

        if let Some(options) = overlay.router_options(router.id()) {
            let loopbacks = addressing.loopbacks(router.id()).iter().map(|l| l.trunc());
            let advertised = if options.advertise_loopback { Some(loopbacks) } else { None };
            for prefix in options.networks.iter().copied().chain(advertised.into_iter().flatten()) {
                if !config.networks.contains(&prefix) {
                    config.networks.push(prefix);
                }
            }
            config.redistribute = options.redistribute.clone();
        }

        result.routers.insert(router.id(), config);
    }

    Ok(result)
}

/// Map every AS member to the index of its AS
fn as_memberships(
    topo: &Topology,
    overlay: &BgpOverlay,
) -> Result<HashMap<NodeId, usize>, PolicyError> {
    let mut as_of: HashMap<NodeId, usize> = HashMap::new();
    let mut seen = HashSet::new();
    for (idx, as_overlay) in overlay.ases().iter().enumerate() {
        if !seen.insert(as_overlay.asn) {
            return Err(PolicyError::DuplicateAs(as_overlay.asn));
        }
        for reserved in [FROM_PEERS_LIST, FROM_UP_LIST].iter() {
            if as_overlay.has_list(reserved) {
                return Err(PolicyError::ReservedListName {
                    list: reserved.to_string(),
                    asn: as_overlay.asn,
                });
            }
        }
        for router in as_overlay.routers.iter() {
            let node = topo.get_node(*router)?;
            if !node.role().is_router() {
                return Err(PolicyError::NotARouter(node.name().to_string()));
            }
            if let Some(prev) = as_of.insert(*router, idx) {
                return Err(PolicyError::MultipleAs {
                    router: node.name().to_string(),
                    first: overlay.ases()[prev].asn,
                    second: as_overlay.asn,
                });
            }
        }
    }
    Ok(as_of)
}

/// Collect and validate all sessions, without duplicates
fn collect_sessions(
    topo: &Topology,
    domains: &DomainMap,
    overlay: &BgpOverlay,
    as_of: &HashMap<NodeId, usize>,
) -> Result<Vec<Peering>, PolicyError> {
    let plain =
        |a: NodeId, b: NodeId| Peering { a, b, role: PeeringRole::Plain, multihop: false };
    let declared = overlay.peerings().iter().copied();
    let reflected = overlay
        .route_reflectors()
        .iter()
        .flat_map(|rr| rr.clients.iter().map(move |c| plain(rr.rr, *c)));
    let meshed = overlay
        .ases()
        .iter()
        .filter(|a| a.full_mesh)
        .flat_map(|a| a.routers.iter().tuple_combinations().map(|(x, y)| plain(*x, *y)));

    let mut sessions: Vec<Peering> = Vec::new();
    let mut index: HashMap<(NodeId, NodeId), usize> = HashMap::new();

    for session in declared.chain(reflected).chain(meshed) {
        let name_a = topo.get_node_name(session.a)?.to_string();
        let name_b = topo.get_node_name(session.b)?.to_string();
        if session.a == session.b {
            return Err(PolicyError::SelfPeering(name_a));
        }
        let key = if session.a < session.b {
            (session.a, session.b)
        } else {
            (session.b, session.a)
        };
        if let Some(idx) = index.get(&key) {
            let existing = &sessions[*idx];
            let same = existing.role == session.role
                && existing.multihop == session.multihop
                && (existing.role != PeeringRole::ClientProvider || existing.a == session.a);
            if !same {
                return Err(PolicyError::ConflictingPeering(name_a, name_b));
            }
            continue;
        }

        let as_a = match as_of.get(&session.a) {
            Some(idx) => *idx,
            None => return Err(PolicyError::RouterWithoutAs(name_a)),
        };
        let as_b = match as_of.get(&session.b) {
            Some(idx) => *idx,
            None => return Err(PolicyError::RouterWithoutAs(name_b)),
        };
        if as_a == as_b {
            if session.role != PeeringRole::Plain {
                return Err(PolicyError::RoleOnIBgp(name_a, name_b));
            }
        } else if !session.multihop
            && domains.shared_interfaces(topo, session.a, session.b).is_none()
        {
            return Err(PolicyError::PeeringWithoutLink(name_a, name_b));
        }

        index.insert(key, sessions.len());
        sessions.push(session);
    }

    Ok(sessions)
}

/// Every directive must refer to a declared session and to declared lists
fn check_directives(
    topo: &Topology,
    overlay: &BgpOverlay,
    as_of: &HashMap<NodeId, usize>,
    sessions: &[Peering],
) -> Result<(), PolicyError> {
    for directive in overlay.directives() {
        let router = topo.get_node_name(directive.router)?.to_string();
        let as_overlay = match as_of.get(&directive.router) {
            Some(idx) => &overlay.ases()[*idx],
            None => return Err(PolicyError::RouterWithoutAs(router)),
        };
        if !sessions.iter().any(|s| s.other(directive.router) == Some(directive.peer)) {
            let peer = topo.get_node_name(directive.peer)?.to_string();
            return Err(PolicyError::NoSession { router, peer });
        }
        for m in directive.matching.iter() {
            let declared = match m {
                MatchRef::AccessList(n) | MatchRef::NextHop(n) => {
                    as_overlay.access_lists.iter().any(|l| &l.name == n)
                }
                MatchRef::PrefixList(n) => as_overlay.prefix_lists.iter().any(|l| &l.name == n),
                MatchRef::Community(n) => as_overlay.community_lists.iter().any(|l| &l.name == n),
            };
            if !declared {
                return Err(PolicyError::UnknownMatchList {
                    list: m.name().to_string(),
                    router: router.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Build the neighbor entry. Sessions between directly connected routers use the interfaces
/// of the shared domain (eBGP), or the loopbacks (iBGP). If the preferred addresses are missing,
/// the other kind is used. A family without addresses on both ends is not activated.
#[allow(clippy::too_many_arguments)]
fn make_neighbor(
    topo: &Topology,
    domains: &DomainMap,
    addressing: &Addressing,
    router: NodeId,
    peer: NodeId,
    peer_as: &AsOverlay,
    session_type: BgpSessionType,
    router_has_ebgp: bool,
) -> Result<BgpNeighbor, PolicyError> {
    let name = topo.get_node_name(peer)?.to_string();
    let direct = domains.shared_interfaces(topo, router, peer);
    let mut addresses = BTreeMap::new();
    let mut local_addresses = BTreeMap::new();

    for family in addressing.families().iter().copied() {
        let via_link = direct.and_then(|(local, remote)| {
            Some((
                addressing.first_address(local, family)?,
                addressing.first_address(remote, family)?,
            ))
        });
        let loopbacks = (addressing.loopback(router, family), addressing.loopback(peer, family));
        let via_loopback = match loopbacks {
            (Some(l), Some(r)) => Some((l, r)),
            _ => None,
        };
        let pair: Option<(IpAddr, IpAddr)> = if session_type.is_ebgp() {
            via_link.or(via_loopback)
        } else {
            via_loopback.or(via_link)
        };
        match pair {
            Some((local, remote)) => {
                local_addresses.insert(family, local);
                addresses.insert(family, remote);
            }
            None => warn!(
                "Session between {} and {} is not activated for {}: no addresses",
                topo.get_node_name(router)?,
                name,
                family
            ),
        }
    }

    Ok(BgpNeighbor {
        peer,
        name,
        remote_as: peer_as.asn,
        session_type,
        addresses,
        local_addresses,
        ebgp_multihop: session_type.is_ebgp() && direct.is_none(),
        next_hop_self: session_type.is_ibgp() && router_has_ebgp,
    })
}

/// All lists declared in the AS, with the communities rendered for it
fn resolve_lists(as_overlay: &AsOverlay) -> ListSet {
    ListSet {
        access_lists: as_overlay
            .access_lists
            .iter()
            .map(|l| (l.name.clone(), l.clone()))
            .collect(),
        prefix_lists: as_overlay
            .prefix_lists
            .iter()
            .map(|l| (l.name.clone(), l.clone()))
            .collect(),
        community_lists: as_overlay
            .community_lists
            .iter()
            .map(|l| (l.name.clone(), ResolvedCommunityList::resolve(l, as_overlay.asn)))
            .collect(),
    }
}

/// Add the community lists used by the default export filters
fn add_role_lists(lists: &mut ListSet, as_overlay: &AsOverlay) {
    let role_lists = [(FROM_PEERS_LIST, FROM_PEERS_COMMUNITY), (FROM_UP_LIST, FROM_UP_COMMUNITY)];
    for (name, value) in role_lists.iter() {
        lists.community_lists.entry(name.to_string()).or_insert_with(|| ResolvedCommunityList {
            name: name.to_string(),
            community: format!("{}:{}", as_overlay.asn, value),
            action: RouteMapState::Allow,
        });
    }
}

/// Build the route-map of one session, family and direction: the user entries (in declaration
/// order), followed by the defaults of the peering role and the final permit-all.
///
/// Set directives continue with the next entry, and permit directives skip the remaining user
/// entries, such that every accepted route still passes the defaults of the role. The role sets
/// its own local-pref on import, so the local-pref directives are repeated after it.
fn build_route_map<'a>(
    as_overlay: &AsOverlay,
    neighbor: &BgpNeighbor,
    family: AddressFamily,
    direction: RouteMapDirection,
    relation: PeerRelation,
    directives: impl Iterator<Item = &'a PolicyDirective>,
) -> Result<RouteMap, PolicyError> {
    let name = RouteMap::make_name(&neighbor.name, family, direction);
    let mut entries: Vec<RouteMapEntry> = Vec::new();
    let mut local_prefs: Vec<(usize, Vec<RouteMapMatch>, u32)> = Vec::new();
    let mut last = 0;

    for directive in directives {
        let mut builder = RouteMapBuilder::new();
        let mut available = true;
        for m in directive.matching.iter() {
            let (cond, supported) = match m {
                MatchRef::AccessList(n) => (
                    RouteMapMatch::AccessList(n.clone()),
                    access_list_supports(as_overlay, n, family),
                ),
                MatchRef::NextHop(n) => (
                    RouteMapMatch::NextHop(n.clone()),
                    access_list_supports(as_overlay, n, family),
                ),
                MatchRef::PrefixList(n) => (
                    RouteMapMatch::PrefixList(n.clone()),
                    as_overlay.prefix_lists.iter().any(|l| &l.name == n && l.supports(family)),
                ),
                MatchRef::Community(n) => (RouteMapMatch::Community(n.clone()), true),
            };
            available &= supported;
            builder.cond(cond);
        }
        if !available {
            debug!("Skipping directive on {}: its lists have no {} entries", name, family);
            continue;
        }

        let order = directive.order.unwrap_or(last + ORDER_STEP);
        if order >= SYNTHESIZED_ORDER_BASE {
            return Err(PolicyError::ReservedOrder { route_map: name, order });
        }
        if entries.iter().any(|e| e.order() == order) {
            return Err(PolicyError::ConflictingDirectives { route_map: name, order });
        }
        last = last.max(order);

        builder.order(order);
        match &directive.action {
            PolicyAction::SetLocalPref(lp) => builder.allow().set_local_pref(*lp).continue_next(),
            PolicyAction::SetMed(med) => builder.allow().set_med(*med).continue_next(),
            PolicyAction::SetCommunity(c) => {
                builder.allow().set_community(c.resolve(as_overlay.asn)).continue_next()
            }
            PolicyAction::Permit => builder.allow().continue_at(SYNTHESIZED_ORDER_BASE),
            PolicyAction::Deny => builder.deny(),
        };
        let entry = builder.build();
        if let PolicyAction::SetLocalPref(lp) = &directive.action {
            local_prefs.push((order, entry.conds().to_vec(), *lp));
        }
        entries.push(entry);
    }

    let community = |value: u32| format!("{}:{}", as_overlay.asn, value);
    let mut synthesized = RouteMapBuilder::new();
    synthesized.order(SYNTHESIZED_ORDER_BASE);
    let import_default = match relation {
        PeerRelation::SharedCost => Some((FROM_PEERS_COMMUNITY, SHARED_COST_LOCAL_PREF)),
        PeerRelation::Provider => Some((FROM_UP_COMMUNITY, PROVIDER_LOCAL_PREF)),
        PeerRelation::Client => Some((FROM_CLIENTS_COMMUNITY, CLIENT_LOCAL_PREF)),
        _ => None,
    };
    match (direction, import_default) {
        (RouteMapDirection::Incoming, Some((tag, local_pref))) => {
            synthesized.allow().set_community(community(tag)).set_local_pref(local_pref);
            if !local_prefs.is_empty() {
                synthesized.continue_next();
            }
            entries.push(synthesized.build());

            local_prefs.sort_by_key(|(order, _, _)| *order);
            for (i, (_, conds, lp)) in local_prefs.into_iter().enumerate() {
                let order = SYNTHESIZED_ORDER_BASE + (i + 1) * ORDER_STEP;
                if order >= DEFAULT_POLICY_ORDER {
                    return Err(PolicyError::ReservedOrder { route_map: name, order });
                }
                let mut repeated = RouteMapBuilder::new();
                repeated.order(order).allow().set_local_pref(lp).continue_next();
                for cond in conds {
                    repeated.cond(cond);
                }
                entries.push(repeated.build());
            }
        }
        _ => {}
    }
    match (direction, relation) {
        (RouteMapDirection::Outgoing, PeerRelation::SharedCost)
        | (RouteMapDirection::Outgoing, PeerRelation::Provider) => {
            entries.push(synthesized.deny().match_community(FROM_PEERS_LIST).build());
            entries.push(
                RouteMapBuilder::new()
                    .order(SYNTHESIZED_ORDER_BASE + ORDER_STEP)
                    .deny()
                    .match_community(FROM_UP_LIST)
                    .build(),
            );
        }
        _ => {}
    }
    entries.push(RouteMapEntry::permit_all(DEFAULT_POLICY_ORDER));
    entries.sort_by_key(|e| e.order());

    for entry in entries.iter() {
        trace!("{} {} {}", name, entry.state(), entry.order());
    }

    Ok(RouteMap { name, neighbor: neighbor.peer, family, direction, entries })
}

fn access_list_supports(as_overlay: &AsOverlay, name: &str, family: AddressFamily) -> bool {
    as_overlay.access_lists.iter().any(|l| l.name == name && l.supports(family))
}
