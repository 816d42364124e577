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


//! JSON snapshot of a compiled topology, keyed by node name.

use ipgen::topology::{AddressFamily, NodeRole, Topology, TopologyError};
use ipgen::Compilation;

use serde::Serialize;
use std::collections::BTreeMap;

/// Addresses of one interface. The same entry is stored under the interface name and under the
/// name of the node on the other side of the link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceEntry {
    /// Main address (IPv4 first)
    pub ip: Option<String>,
    /// All addresses
    pub ips: Vec<String>,
    /// Name of the interface
    pub name: String,
    /// Bandwidth in Mbit/s, -1 if unlimited
    pub bw: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeEntry {
    #[serde(rename = "type")]
    pub role: String,
    pub interfaces: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routerid: Option<String>,
    #[serde(flatten)]
    pub entries: BTreeMap<String, InterfaceEntry>,
}

pub type TopologyDb = BTreeMap<String, NodeEntry>;

/// Build the snapshot. Hubs are not part of it.
pub fn snapshot(topo: &Topology, result: &Compilation) -> Result<TopologyDb, TopologyError> {
    let mut db = TopologyDb::new();
    for node in topo.nodes().filter(|n| n.role() != NodeRole::Hub) {
        let mut entry = NodeEntry {
            role: node.role().to_string(),
            interfaces: Vec::new(),
            routerid: result
                .addressing
                .loopback(node.id(), AddressFamily::Ipv4)
                .map(|a| a.to_string()),
            entries: BTreeMap::new(),
        };
        for itf in node.interfaces().iter().copied() {
            let interface = topo.get_interface(itf)?;
            let addresses = result.addressing.addresses(itf);
            let itf_entry = InterfaceEntry {
                ip: addresses.first().map(|a| a.to_string()),
                ips: addresses.iter().map(|a| a.to_string()).collect(),
                name: interface.name().to_string(),
                bw: interface.bandwidth().map(i64::from).unwrap_or(-1),
            };
            let neighbor = topo.get_interface(topo.peer(itf)?)?.node();
            entry.entries.insert(topo.get_node_name(neighbor)?.to_string(), itf_entry.clone());
            entry.entries.insert(interface.name().to_string(), itf_entry);
            entry.interfaces.push(interface.name().to_string());
        }
        db.insert(node.name().to_string(), entry);
    }
    Ok(db)
}
