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

//! # Broadcast domains
//!
//! A broadcast domain is the maximal set of host and router interfaces that reach each other
//! through switches and hubs only. Domains are discovered once per compile pass and stored in a
//! [`DomainMap`], a side table indexed by [`InterfaceId`].

use crate::topology::{AddressFamily, InterfaceId, NodeId, NodeRole, Topology, TopologyError};

use log::*;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Identifier of a broadcast domain. Domains are numbered in the order in which their first
/// interface was declared.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct DomainId(pub usize);

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}", self.0)
    }
}

/// A set of host and router interfaces sharing one layer 2 segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastDomain {
    id: DomainId,
    interfaces: Vec<InterfaceId>,
}

impl BroadcastDomain {
    /// Identifier of the domain
    pub fn id(&self) -> DomainId {
        self.id
    }

    /// Interfaces of the domain, sorted by declaration order
    pub fn interfaces(&self) -> &[InterfaceId] {
        &self.interfaces
    }

    /// Returns `true` if the interface is part of this domain
    pub fn contains(&self, itf: InterfaceId) -> bool {
        self.interfaces.binary_search(&itf).is_ok()
    }

    /// Interfaces of the domain that belong to a router
    pub fn routers<'a>(&'a self, topo: &'a Topology) -> impl Iterator<Item = InterfaceId> + 'a {
        self.interfaces
            .iter()
            .copied()
            .filter(move |i| matches!(topo.interface_role(*i), Ok(NodeRole::Router)))
    }

    /// Interfaces whose node has the address family enabled
    pub fn family_interfaces<'a>(
        &'a self,
        topo: &'a Topology,
        family: AddressFamily,
    ) -> impl Iterator<Item = InterfaceId> + 'a {
        self.interfaces.iter().copied().filter(move |i| {
            topo.get_interface(*i)
                .and_then(|itf| topo.get_node(itf.node()))
                .map(|n| n.options().uses(family))
                .unwrap_or(false)
        })
    }

    /// Returns `true` if at least one interface of the domain uses the family
    pub fn uses_family(&self, topo: &Topology, family: AddressFamily) -> bool {
        self.family_interfaces(topo, family).next().is_some()
    }

    /// Number of addresses the domain needs in the family: the sum of the address widths of
    /// every interface using that family.
    pub fn addresses_needed(&self, topo: &Topology, family: AddressFamily) -> usize {
        self.family_interfaces(topo, family)
            .filter_map(|i| topo.get_interface(i).ok())
            .map(|itf| itf.addressing().width(family))
            .sum()
    }

    /// Interfaces using the family that carry a static address of that family
    pub fn static_interfaces<'a>(
        &'a self,
        topo: &'a Topology,
        family: AddressFamily,
    ) -> impl Iterator<Item = InterfaceId> + 'a {
        self.family_interfaces(topo, family).filter(move |i| {
            topo.get_interface(*i).map(|itf| itf.addressing().has_static(family)).unwrap_or(false)
        })
    }

    /// Every interface using the family has a static address. A domain which does not use the
    /// family at all is not considered static.
    pub fn is_fully_static(&self, topo: &Topology, family: AddressFamily) -> bool {
        self.uses_family(topo, family)
            && self.family_interfaces(topo, family).count()
                == self.static_interfaces(topo, family).count()
    }

    /// Some, but not all, interfaces using the family have a static address.
    pub fn is_partially_static(&self, topo: &Topology, family: AddressFamily) -> bool {
        self.static_interfaces(topo, family).next().is_some()
            && !self.is_fully_static(topo, family)
    }
}

/// Mapping of every host and router interface to its broadcast domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainMap {
    domains: Vec<BroadcastDomain>,
    by_interface: BTreeMap<InterfaceId, DomainId>,
}

impl DomainMap {
    /// Returns the domain
    pub fn get(&self, id: DomainId) -> Option<&BroadcastDomain> {
        self.domains.get(id.0)
    }

    /// Returns the domain of an interface. Switch and hub ports have no domain.
    pub fn domain_of(&self, itf: InterfaceId) -> Option<DomainId> {
        self.by_interface.get(&itf).copied()
    }

    /// Iterate over all domains, in allocation order
    pub fn iter(&self) -> impl Iterator<Item = &BroadcastDomain> {
        self.domains.iter()
    }

    /// Number of domains
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Returns `true` if there are no domains
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Find a domain in which every given node has at least one interface. If several domains
    /// qualify, the first one (in allocation order) is returned.
    pub fn common_domain(&self, topo: &Topology, nodes: &[NodeId]) -> Option<DomainId> {
        let (first, rest) = nodes.split_first()?;
        let candidates = self.domains_of_node(topo, *first);
        candidates.into_iter().find(|d| {
            rest.iter().all(|n| self.domains_of_node(topo, *n).contains(d))
        })
    }

    /// Returns the pair of interfaces by which `a` and `b` are directly connected (the same
    /// domain), if any.
    pub fn shared_interfaces(
        &self,
        topo: &Topology,
        a: NodeId,
        b: NodeId,
    ) -> Option<(InterfaceId, InterfaceId)> {
        let domain = self.common_domain(topo, &[a, b])?;
        let on = |n: NodeId| {
            topo.get_node(n)
                .ok()?
                .interfaces()
                .iter()
                .copied()
                .find(|i| self.domain_of(*i) == Some(domain))
        };
        Some((on(a)?, on(b)?))
    }

    /// All domains in which the node has an interface, without duplicates, in ascending order.
    pub fn domains_of_node(&self, topo: &Topology, node: NodeId) -> Vec<DomainId> {
        let mut result: Vec<DomainId> = topo
            .get_node(node)
            .map(|n| n.interfaces().iter().filter_map(|i| self.domain_of(*i)).collect())
            .unwrap_or_default();
        result.sort();
        result.dedup();
        result
    }
}

/// Partition all host and router interfaces into broadcast domains.
///
/// Interfaces are visited in declaration order. Starting from every interface which is not yet
/// part of a domain, the exploration follows links through switches and hubs until it reaches
/// host or router interfaces. Router to router links thus form a domain of two interfaces.
pub fn find_broadcast_domains(topo: &Topology) -> Result<DomainMap, TopologyError> {
    let mut map = DomainMap::default();

    for origin in topo.interfaces() {
        let role = topo.get_node(origin.node())?.role();
        if role.is_relay() || map.by_interface.contains_key(&origin.id()) {
            continue;
        }

        let id = DomainId(map.domains.len());
        let mut members: Vec<InterfaceId> = vec![origin.id()];
        let mut visited_relays: HashSet<NodeId> = HashSet::new();
        let mut to_visit: Vec<InterfaceId> = vec![topo.peer(origin.id())?];

        while let Some(itf) = to_visit.pop() {
            let node = topo.get_node(topo.get_interface(itf)?.node())?;
            if node.role().is_domain_boundary() {
                members.push(itf);
                continue;
            }
            if !visited_relays.insert(node.id()) {
                continue;
            }
            trace!("Domain {} crosses {} {}", id, node.role(), node.name());
            for port in node.interfaces() {
                let peer = topo.peer(*port)?;
                let peer_node = topo.get_interface(peer)?.node();
                if topo.interface_role(peer)?.is_domain_boundary()
                    || !visited_relays.contains(&peer_node)
                {
                    to_visit.push(peer);
                }
            }
        }

        members.sort();
        members.dedup();
        for itf in members.iter() {
            map.by_interface.insert(*itf, id);
        }
        debug!("Domain {} with {} interface(s)", id, members.len());
        map.domains.push(BroadcastDomain { id, interfaces: members });
    }

    info!("Found {} broadcast domains", map.domains.len());
    Ok(map)
}
