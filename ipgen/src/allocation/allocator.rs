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

//! The allocator itself, and its result.

use super::pool::{addr_to_u128, fitting_prefix_len, host_capacity, u128_to_addr, AllocationPool};
use super::subnet::resolve_subnets;
use super::{AllocationError, AllocationSettings, PrefixOwner, PrefixRegistry, Subnet};
use crate::domains::{BroadcastDomain, DomainId, DomainMap};
use crate::topology::{AddressFamily, InterfaceId, NodeId, NodeRole, Topology};

use ipnet::IpNet;
use log::*;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use std::net::IpAddr;

/// Result of the address allocation. All tables are ordered, such that two allocations of the
/// same topology compare (and print) identically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Addressing {
    families: Vec<AddressFamily>,
    interfaces: BTreeMap<InterfaceId, Vec<IpNet>>,
    prefixes: BTreeMap<(DomainId, AddressFamily), IpNet>,
    loopbacks: BTreeMap<NodeId, Vec<IpNet>>,
    default_routes: BTreeMap<(NodeId, AddressFamily), IpAddr>,
    owners: BTreeMap<IpAddr, NodeId>,
}

impl Addressing {
    /// Enabled address families
    pub fn families(&self) -> &[AddressFamily] {
        &self.families
    }

    /// All addresses of an interface, IPv4 first.
    pub fn addresses(&self, itf: InterfaceId) -> &[IpNet] {
        self.interfaces.get(&itf).map(|a| a.as_slice()).unwrap_or_default()
    }

    /// Addresses of an interface in the given family
    pub fn addresses_of(
        &self,
        itf: InterfaceId,
        family: AddressFamily,
    ) -> impl Iterator<Item = &IpNet> {
        self.addresses(itf).iter().filter(move |a| AddressFamily::of(a) == family)
    }

    /// First address of an interface in the given family
    pub fn first_address(&self, itf: InterfaceId, family: AddressFamily) -> Option<IpAddr> {
        self.addresses_of(itf, family).next().map(|a| a.addr())
    }

    /// The prefix of a domain in the given family
    pub fn prefix(&self, domain: DomainId, family: AddressFamily) -> Option<IpNet> {
        self.prefixes.get(&(domain, family)).copied()
    }

    /// Loopback addresses of a node
    pub fn loopbacks(&self, node: NodeId) -> &[IpNet] {
        self.loopbacks.get(&node).map(|a| a.as_slice()).unwrap_or_default()
    }

    /// First loopback address of a node in the given family
    pub fn loopback(&self, node: NodeId, family: AddressFamily) -> Option<IpAddr> {
        self.loopbacks(node).iter().find(|a| AddressFamily::of(a) == family).map(|a| a.addr())
    }

    /// Default gateway of a node in the given family
    pub fn default_route(&self, node: NodeId, family: AddressFamily) -> Option<IpAddr> {
        self.default_routes.get(&(node, family)).copied()
    }

    /// Returns the node owning the address, either on an interface or as loopback.
    pub fn node_for_ip(&self, addr: &IpAddr) -> Option<NodeId> {
        self.owners.get(addr).copied()
    }

    /// Iterate over all interface addresses
    pub fn iter_interfaces(&self) -> impl Iterator<Item = (InterfaceId, &[IpNet])> {
        self.interfaces.iter().map(|(i, a)| (*i, a.as_slice()))
    }

    /// Iterate over all domain prefixes
    pub fn iter_prefixes(&self) -> impl Iterator<Item = (DomainId, AddressFamily, IpNet)> + '_ {
        self.prefixes.iter().map(|((d, af), p)| (*d, *af, *p))
    }

    /// Iterate over all loopbacks
    pub fn iter_loopbacks(&self) -> impl Iterator<Item = (NodeId, &[IpNet])> {
        self.loopbacks.iter().map(|(n, a)| (*n, a.as_slice()))
    }

    /// Iterate over all default routes
    pub fn iter_default_routes(
        &self,
    ) -> impl Iterator<Item = (NodeId, AddressFamily, IpAddr)> + '_ {
        self.default_routes.iter().map(|((n, af), gw)| (*n, *af, *gw))
    }

    fn add_interface_address(&mut self, topo: &Topology, itf: InterfaceId, addr: IpNet) {
        if let Ok(i) = topo.get_interface(itf) {
            self.owners.insert(addr.addr(), i.node());
        }
        self.interfaces.entry(itf).or_default().push(addr);
    }

    fn add_loopback(&mut self, node: NodeId, addr: IpNet) {
        self.owners.insert(addr.addr(), node);
        self.loopbacks.entry(node).or_default().push(addr);
    }
}

/// Allocate addresses for the whole topology.
///
/// Allocation is deterministic: Domains are visited in the order of their first declared
/// interface, and routers in the order in which they were declared. Running the allocation twice
/// on the same topology yields identical results. If any error occurs, nothing is returned.
pub fn allocate(
    topo: &Topology,
    domains: &DomainMap,
    subnets: &[Subnet],
    settings: &AllocationSettings,
) -> Result<Addressing, AllocationError> {
    let mut addressing = Addressing { families: settings.families(), ..Default::default() };

    for family in settings.families() {
        info!("Allocating {} addresses", family);
        let mut registry = PrefixRegistry::new();

        let declared = if settings.allocate_ips {
            resolve_subnets(topo, domains, subnets, family, &mut registry)?
        } else {
            let mut prefixes = subnets.iter().flat_map(|s| s.prefixes.iter());
            if prefixes.any(|p| AddressFamily::of(p) == family) {
                warn!("Automatic allocation is disabled, ignoring declared {} subnets", family);
            }
            BTreeMap::new()
        };

        register_static(topo, domains, family, &mut registry)?;

        let mut link_pool = AllocationPool::new(settings.link_pool(family))?;
        for domain in domains.iter() {
            if domain.uses_family(topo, family) {
                allocate_domain(
                    topo,
                    domain,
                    family,
                    declared.get(&domain.id()).copied(),
                    settings.allocate_ips,
                    &mut link_pool,
                    &mut registry,
                    &mut addressing,
                )?;
            }
        }

        let mut lo_pool = AllocationPool::new(settings.loopback_pool(family))?;
        for router in topo.nodes_with_role(NodeRole::Router) {
            if !router.options().uses(family) {
                continue;
            }
            let statics: Vec<IpNet> = router
                .options()
                .lo_addresses
                .iter()
                .filter(|a| AddressFamily::of(a) == family)
                .copied()
                .collect();
            if !statics.is_empty() {
                statics.into_iter().for_each(|a| addressing.add_loopback(router.id(), a));
            } else if settings.allocate_ips {
                let prefix = lo_pool.next(&registry)?;
                registry.register(prefix, PrefixOwner::Loopback(router.id()))?;
                let addr = if prefix.prefix_len() == family.max_prefix_len() {
                    prefix
                } else {
                    let host = u128_to_addr(family, addr_to_u128(prefix.network()) + 1);
                    IpNet::new(host, prefix.prefix_len()).map_err(|_| {
                        AllocationError::InvalidPool {
                            base: settings.loopback_pool(family).base,
                            prefix_len: prefix.prefix_len(),
                        }
                    })?
                };
                debug!("Loopback {} for {}", addr, router.name());
                addressing.add_loopback(router.id(), addr);
            }
        }
    }

    set_default_routes(topo, domains, &mut addressing);

    Ok(addressing)
}

/// Register every static interface prefix and static loopback of the family.
fn register_static(
    topo: &Topology,
    domains: &DomainMap,
    family: AddressFamily,
    registry: &mut PrefixRegistry,
) -> Result<(), AllocationError> {
    for domain in domains.iter() {
        for itf in domain.static_interfaces(topo, family) {
            for addr in topo.get_interface(itf)?.addressing().static_addresses(family) {
                registry.register(*addr, PrefixOwner::Domain(domain.id()))?;
            }
        }
    }
    for router in topo.nodes_with_role(NodeRole::Router) {
        if router.options().uses(family) {
            let statics = router.options().lo_addresses.iter();
            for lo in statics.filter(|a| AddressFamily::of(a) == family) {
                registry.register(*lo, PrefixOwner::Loopback(router.id()))?;
            }
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn allocate_domain(
    topo: &Topology,
    domain: &BroadcastDomain,
    family: AddressFamily,
    declared: Option<IpNet>,
    allocate_ips: bool,
    pool: &mut AllocationPool,
    registry: &mut PrefixRegistry,
    addressing: &mut Addressing,
) -> Result<(), AllocationError> {
    // static addresses are always kept
    let mut taken: HashSet<IpAddr> = HashSet::new();
    let mut statics: Vec<IpNet> = Vec::new();
    for itf in domain.static_interfaces(topo, family) {
        for addr in topo.get_interface(itf)?.addressing().static_addresses(family) {
            taken.insert(addr.addr());
            statics.push(*addr);
            addressing.add_interface_address(topo, itf, *addr);
        }
    }
    let first_static = statics.first().map(|addr| addr.trunc());

    if domain.is_fully_static(topo, family) {
        if let Some(prefix) = first_static {
            addressing.prefixes.insert((domain.id(), family), prefix);
        }
        trace!("Domain {} is fully static for {}", domain.id(), family);
        return Ok(());
    }
    if !allocate_ips {
        return Ok(());
    }

    let needed = domain.addresses_needed(topo, family);
    let prefix = match declared {
        Some(prefix) => {
            if let Some(address) = statics.iter().find(|a| !prefix.contains(&a.addr())) {
                return Err(AllocationError::StaticOutsideSubnet { address: *address, prefix });
            }
            let available = host_capacity(&prefix);
            if (needed as u128) > available {
                return Err(AllocationError::UndersizedSubnet { prefix, needed, available });
            }
            prefix
        }
        None if first_static.is_some() => {
            return Err(AllocationError::PartiallyStaticDomain { domain: domain.id(), family })
        }
        None => {
            // the pool cannot hand out anything larger than itself
            let len = fitting_prefix_len(family, needed).unwrap_or(0);
            if len < pool.base().prefix_len() {
                return Err(AllocationError::PoolExhausted { pool: pool.base(), prefix_len: len });
            }
            let prefix = pool.draw(len.min(pool.prefix_len()), registry)?;
            registry.register(prefix, PrefixOwner::Domain(domain.id()))?;
            prefix
        }
    };
    debug!("Domain {} receives {}", domain.id(), prefix);
    addressing.prefixes.insert((domain.id(), family), prefix);

    let base = addr_to_u128(prefix.network());
    let mut hosts = (1..=host_capacity(&prefix))
        .map(|offset| u128_to_addr(family, base + offset))
        .filter(|addr| !taken.contains(addr));

    let statics: HashSet<InterfaceId> = domain.static_interfaces(topo, family).collect();
    for itf in domain.family_interfaces(topo, family) {
        if statics.contains(&itf) {
            continue;
        }
        for _ in 0..topo.get_interface(itf)?.addressing().width(family) {
            let addr = hosts.next().ok_or(AllocationError::UndersizedSubnet {
                prefix,
                needed,
                available: host_capacity(&prefix),
            })?;
            let addr = IpNet::new(addr, prefix.prefix_len()).map_err(|_| {
                AllocationError::UndersizedSubnet { prefix, needed, available: 0 }
            })?;
            trace!("{} receives {}", topo.get_interface(itf)?.name(), addr);
            addressing.add_interface_address(topo, itf, addr);
        }
    }

    Ok(())
}

/// Record a default route for every host interface in a domain with a router. The first router
/// interface of the domain (with an address in that family) is the gateway. Hosts with a static
/// default route are skipped, and so are IPv6 hosts in a domain with router advertisements.
fn set_default_routes(topo: &Topology, domains: &DomainMap, addressing: &mut Addressing) {
    for domain in domains.iter() {
        for family in addressing.families.clone() {
            let gateway = match domain
                .routers(topo)
                .find_map(|itf| addressing.first_address(itf, family))
            {
                Some(gw) => gw,
                None => continue,
            };
            let advertised = family == AddressFamily::Ipv6
                && domain.routers(topo).any(|itf| {
                    topo.get_interface(itf)
                        .map(|i| i.addressing().router_advertisement)
                        .unwrap_or(false)
                });
            if advertised {
                trace!("Domain {} uses router advertisements", domain.id());
                continue;
            }

            for itf in domain.family_interfaces(topo, family) {
                let node = match topo.get_interface(itf).and_then(|i| topo.get_node(i.node())) {
                    Ok(node) if node.role().is_host() => node,
                    _ => continue,
                };
                if node.options().has_default_route(family)
                    || addressing.first_address(itf, family).is_none()
                {
                    continue;
                }
                if let Entry::Vacant(e) = addressing.default_routes.entry((node.id(), family)) {
                    debug!("Default {} route of {} via {}", family, node.name(), gateway);
                    e.insert(gateway);
                }
            }
        }
    }
}
