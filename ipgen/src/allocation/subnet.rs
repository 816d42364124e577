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

//! Subnet declarations

use super::pool::overlaps;
use super::{AllocationError, PrefixOwner, PrefixRegistry};
use crate::domains::{DomainId, DomainMap};
use crate::topology::{AddressFamily, LinkId, NodeId, Topology};

use ipnet::IpNet;
use log::*;
use std::collections::BTreeMap;

/// A user-declared prefix for the broadcast domain shared by the listed nodes and links. The
/// listed nodes, together with the host and router endpoints of the listed links, must all have
/// an interface in one common domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subnet {
    /// Nodes of the subnet
    pub nodes: Vec<NodeId>,
    /// Links of the subnet
    pub links: Vec<LinkId>,
    /// Declared prefixes, of either family (at most one per family)
    pub prefixes: Vec<IpNet>,
}

impl Subnet {
    /// Declare a subnet over the given nodes
    pub fn new(nodes: Vec<NodeId>, prefixes: Vec<IpNet>) -> Self {
        Self { nodes, links: Vec::new(), prefixes }
    }

    /// Declare a subnet over a single link
    pub fn on_link(link: LinkId, prefixes: Vec<IpNet>) -> Self {
        Self { nodes: Vec::new(), links: vec![link], prefixes }
    }

    /// All nodes that must share the domain: the listed nodes plus the host and router
    /// endpoints of the listed links.
    fn members(&self, topo: &Topology) -> Result<Vec<NodeId>, AllocationError> {
        let mut members = self.nodes.clone();
        for link in self.links.iter() {
            let (a, b) = topo.link_interfaces(*link)?;
            for itf in [a, b].iter() {
                if topo.interface_role(*itf)?.is_domain_boundary() {
                    members.push(topo.get_interface(*itf)?.node());
                }
            }
        }
        members.sort();
        members.dedup();
        Ok(members)
    }

    /// Resolve the subnet to its broadcast domain
    pub fn resolve(
        &self,
        topo: &Topology,
        domains: &DomainMap,
    ) -> Result<Option<DomainId>, AllocationError> {
        let members = self.members(topo)?;
        Ok(domains.common_domain(topo, &members))
    }
}

/// Resolve every declared prefix of the family to its domain, and register it. The result maps
/// each domain to its declared prefix.
pub(super) fn resolve_subnets(
    topo: &Topology,
    domains: &DomainMap,
    subnets: &[Subnet],
    family: AddressFamily,
    registry: &mut PrefixRegistry,
) -> Result<BTreeMap<DomainId, IpNet>, AllocationError> {
    let mut declared: BTreeMap<DomainId, IpNet> = BTreeMap::new();

    for subnet in subnets.iter() {
        for prefix in subnet.prefixes.iter().filter(|p| AddressFamily::of(p) == family) {
            let prefix = prefix.trunc();
            if let Some(other) = declared.values().find(|other| overlaps(other, &prefix)) {
                return Err(AllocationError::OverlappingSubnets(*other, prefix));
            }
            let domain = subnet
                .resolve(topo, domains)?
                .ok_or(AllocationError::SubnetNotInLan(prefix))?;
            if declared.contains_key(&domain) {
                return Err(AllocationError::DuplicateDomainSubnet { domain, family });
            }
            debug!("Declared subnet {} resolves to domain {}", prefix, domain);
            registry.register(prefix, PrefixOwner::Domain(domain))?;
            declared.insert(domain, prefix);
        }
    }

    Ok(declared)
}
