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

//! # Compile pass
//!
//! Runs broadcast-domain detection, address allocation and policy resolution over a frozen
//! topology, in this order. Every derived structure is owned by the returned [`Compilation`];
//! nothing is written back into the topology, so compiling twice yields the same result.

use crate::allocation::{allocate, Addressing, AllocationSettings, Subnet};
use crate::config::{Config, ConfigExpr};
use crate::domains::{find_broadcast_domains, DomainMap};
use crate::policy::{resolve_policies, BgpOverlay, PolicyResolution};
use crate::topology::{IgpOptions, InterfaceId, Topology};
use crate::Error;

use log::*;

/// Compile-wide settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileSettings {
    /// Addressing settings (families, pools, automatic allocation)
    pub allocation: AllocationSettings,
}

/// All overlays applied on top of the topology
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlays {
    /// Declared subnets
    pub subnets: Vec<Subnet>,
    /// BGP setup
    pub bgp: BgpOverlay,
}

/// Result of a compile pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compilation {
    /// Broadcast domains
    pub domains: DomainMap,
    /// Assigned addresses, prefixes and default routes
    pub addressing: Addressing,
    /// Resolved BGP configuration of every AS member
    pub policies: PolicyResolution,
}

/// Compile the topology and its overlays. Any error aborts the whole pass.
pub fn compile(
    topo: &Topology,
    overlays: &Overlays,
    settings: &CompileSettings,
) -> Result<Compilation, Error> {
    info!("Compiling a topology with {} nodes", topo.num_nodes());
    let domains = find_broadcast_domains(topo)?;
    let addressing = allocate(topo, &domains, &overlays.subnets, &settings.allocation)?;
    let policies = resolve_policies(topo, &domains, &addressing, &overlays.bgp)?;
    info!("Compiled {} domains and {} BGP routers", domains.len(), policies.len());
    Ok(Compilation { domains, addressing, policies })
}

impl Compilation {
    /// Effective IGP options of an interface. Interfaces towards directly connected eBGP peers are
    /// always passive.
    pub fn igp_options(&self, topo: &Topology, itf: InterfaceId) -> Result<IgpOptions, Error> {
        let mut options = topo.get_interface(itf)?.igp().clone();
        options.passive |= self.policies.iter().any(|bgp| bgp.igp_passive.contains(&itf));
        Ok(options)
    }

    /// Flatten the compilation into a keyed configuration.
    pub fn config(&self, topo: &Topology) -> Result<Config, Error> {
        let mut c = Config::new();

        for (itf, addresses) in self.addressing.iter_interfaces() {
            let node = topo.get_interface(itf)?.node();
            let addresses = addresses.to_vec();
            c.add(ConfigExpr::InterfaceAddress { node, interface: itf, addresses })?;
        }

        for (domain, family, prefix) in self.addressing.iter_prefixes() {
            let d = match self.domains.get(domain) {
                Some(d) => d,
                None => continue,
            };
            let itf = match d.routers(topo).next().or_else(|| d.interfaces().first().copied()) {
                Some(itf) => itf,
                None => continue,
            };
            let node = topo.get_interface(itf)?.node();
            c.add(ConfigExpr::DomainPrefix { node, domain, family, prefix })?;
        }

        for (router, addresses) in self.addressing.iter_loopbacks() {
            c.add(ConfigExpr::Loopback { router, addresses: addresses.to_vec() })?;
        }

        for (node, family, gateway) in self.addressing.iter_default_routes() {
            c.add(ConfigExpr::DefaultRoute { node, family, gateway })?;
        }

        for bgp in self.policies.iter() {
            for itf in bgp.igp_passive.iter() {
                c.add(ConfigExpr::IgpPassive { node: bgp.router, interface: *itf })?;
            }
            for neighbor in bgp.neighbors.iter() {
                c.add(ConfigExpr::BgpNeighbor { router: bgp.router, neighbor: neighbor.clone() })?;
            }
            for map in bgp.route_maps.iter() {
                for entry in map.entries.iter() {
                    c.add(ConfigExpr::BgpRouteMapEntry {
                        router: bgp.router,
                        neighbor: map.neighbor,
                        family: map.family,
                        direction: map.direction,
                        name: map.name.clone(),
                        entry: entry.clone(),
                    })?;
                }
            }
            for prefix in bgp.networks.iter() {
                c.add(ConfigExpr::BgpNetwork { router: bgp.router, prefix: *prefix })?;
            }
        }

        Ok(c)
    }
}
