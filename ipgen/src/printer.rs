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

//! # Helper (printer) functions
//! Module containing helper functions to get formatted strings of the compiled configuration,
//! with the names of the nodes and interfaces inserted.

use crate::config::{Config, ConfigExpr, ConfigModifier, ConfigPatch};
use crate::policy::{BgpNeighbor, OnMatch, Route, RouteMap, RouteMapEntry};
use crate::topology::{Topology, TopologyError};

use itertools::Itertools;

/// Returns a single route-map entry, in the form `permit 10: match [...] set [...]`, followed by
/// the exit policy if the entry does not end the evaluation.
pub fn route_map_entry(entry: &RouteMapEntry) -> String {
    let mut result = format!("{} {}", entry.state(), entry.order());
    if !entry.conds().is_empty() {
        result.push_str(&format!(": match [{}]", entry.conds().iter().join(", ")));
    }
    if !entry.actions().is_empty() {
        result.push_str(&format!(" set [{}]", entry.actions().iter().join(", ")));
    }
    if entry.on_match() != OnMatch::Exit {
        result.push_str(&format!(" {}", entry.on_match()));
    }
    result
}

/// Returns all lines of a route-map, the name first
pub fn route_map(map: &RouteMap) -> Vec<String> {
    std::iter::once(format!("route-map {}", map.name))
        .chain(map.entries.iter().map(|e| format!("  {}", route_map_entry(e))))
        .collect()
}

/// Returns a formatted string of a BGP neighbor
pub fn bgp_neighbor(neighbor: &BgpNeighbor) -> String {
    let mut result = format!(
        "neighbor {} (AS {}, {}) [{}]",
        neighbor.name,
        neighbor.remote_as,
        neighbor.session_type,
        neighbor.addresses.values().join(", ")
    );
    if neighbor.ebgp_multihop {
        result.push_str(" ebgp-multihop");
    }
    if neighbor.next_hop_self {
        result.push_str(" next-hop-self");
    }
    result
}

/// Returns a formatted string for a route
pub fn route(r: &Route) -> String {
    let mut result = format!("prefix: {}, next hop: {}", r.prefix, r.next_hop);
    if let Some(local_pref) = r.local_pref {
        result.push_str(&format!(", local pref: {}", local_pref))
    }
    if let Some(med) = r.med {
        result.push_str(&format!(", MED: {}", med))
    }
    if !r.communities.is_empty() {
        result.push_str(&format!(", communities: {}", r.communities.iter().join(" ")))
    }
    result
}

/// Returns the config expr as a string, where all node and interface names are inserted.
pub fn config_expr(topo: &Topology, expr: &ConfigExpr) -> Result<String, TopologyError> {
    Ok(match expr {
        ConfigExpr::InterfaceAddress { interface, addresses, .. } => format!(
            "Address: {}: {}",
            topo.get_interface(*interface)?.name(),
            addresses.iter().join(", ")
        ),
        ConfigExpr::DomainPrefix { node, domain, family, prefix } => format!(
            "Prefix: {} ({}, {}): {}",
            domain,
            family,
            topo.get_node_name(*node)?,
            prefix
        ),
        ConfigExpr::Loopback { router, addresses } => format!(
            "Loopback: {}: {}",
            topo.get_node_name(*router)?,
            addresses.iter().join(", ")
        ),
        ConfigExpr::DefaultRoute { node, family, gateway } => {
            format!("Default route: {} ({}) via {}", topo.get_node_name(*node)?, family, gateway)
        }
        ConfigExpr::IgpPassive { interface, .. } => {
            format!("IGP passive: {}", topo.get_interface(*interface)?.name())
        }
        ConfigExpr::BgpNeighbor { router, neighbor } => {
            format!("BGP: {}: {}", topo.get_node_name(*router)?, bgp_neighbor(neighbor))
        }
        ConfigExpr::BgpRouteMapEntry { router, name, entry, .. } => format!(
            "Route-map: {}: {} {}",
            topo.get_node_name(*router)?,
            name,
            route_map_entry(entry)
        ),
        ConfigExpr::BgpNetwork { router, prefix } => {
            format!("BGP network: {}: {}", topo.get_node_name(*router)?, prefix)
        }
    })
}

/// Returns the config modifier as a string, where all names are inserted.
pub fn config_modifier(
    topo: &Topology,
    modifier: &ConfigModifier,
) -> Result<String, TopologyError> {
    Ok(match modifier {
        ConfigModifier::Insert(e) => format!("INSERT {}", config_expr(topo, e)?),
        ConfigModifier::Remove(e) => format!("REMOVE {}", config_expr(topo, e)?),
        ConfigModifier::Update { from: a, to: b } => {
            format!("MODIFY {} --> {}", config_expr(topo, a)?, config_expr(topo, b)?)
        }
    })
}

/// Returns one line per expression of the configuration, ordered by key.
pub fn config(topo: &Topology, config: &Config) -> Result<Vec<String>, TopologyError> {
    config.iter().map(|e| config_expr(topo, e)).collect()
}

/// Returns one line per modifier of the patch
pub fn config_patch(topo: &Topology, patch: &ConfigPatch) -> Result<Vec<String>, TopologyError> {
    patch.modifiers.iter().map(|m| config_modifier(topo, m)).collect()
}
