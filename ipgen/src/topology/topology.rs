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

//! # Topology graph
//!
//! The topology is an arena of nodes (petgraph nodes) and links (petgraph edges). Each link owns
//! exactly two interfaces, one per endpoint, which are stored in a separate table indexed by
//! [`InterfaceId`]. Nothing derived during compilation is stored in here; derived facts live in
//! side-tables keyed by the same identifiers.

use crate::topology::options::{AddressingOptions, IgpOptions, NodeOptions, StpOptions};
use crate::topology::{InterfaceId, LinkId, NodeId, NodeRole, TopologyError, TopologyGraph};

use ipnet::IpNet;
use log::*;
use std::collections::HashMap;

/// A declared node
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    id: NodeId,
    role: NodeRole,
    options: NodeOptions,
    stp: Option<StpOptions>,
    interfaces: Vec<InterfaceId>,
}

impl Node {
    /// Name of the node
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of the node
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Role of the node
    pub fn role(&self) -> NodeRole {
        self.role
    }

    /// Per-node options
    pub fn options(&self) -> &NodeOptions {
        &self.options
    }

    /// Spanning tree options (switches only)
    pub fn stp(&self) -> Option<&StpOptions> {
        self.stp.as_ref()
    }

    /// Interfaces of the node, in declaration order
    pub fn interfaces(&self) -> &[InterfaceId] {
        &self.interfaces
    }
}

/// A link between two interfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    interfaces: (InterfaceId, InterfaceId),
}

impl Link {
    /// Both interfaces of the link
    pub fn interfaces(&self) -> (InterfaceId, InterfaceId) {
        self.interfaces
    }
}

/// A single interface of a node, attached to exactly one link.
#[derive(Debug, Clone)]
pub struct Interface {
    id: InterfaceId,
    name: String,
    node: NodeId,
    link: LinkId,
    addressing: AddressingOptions,
    igp: IgpOptions,
    stp_cost: Option<u32>,
    bandwidth: Option<u32>,
}

impl Interface {
    /// Identifier of the interface
    pub fn id(&self) -> InterfaceId {
        self.id
    }

    /// Name of the interface, e.g. `r1-eth0`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node owning the interface
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Link the interface is attached to
    pub fn link(&self) -> LinkId {
        self.link
    }

    /// Addressing options
    pub fn addressing(&self) -> &AddressingOptions {
        &self.addressing
    }

    /// IGP options
    pub fn igp(&self) -> &IgpOptions {
        &self.igp
    }

    /// Spanning tree port cost (switch ports only)
    pub fn stp_cost(&self) -> Option<u32> {
        self.stp_cost
    }

    /// Bandwidth of the interface in Mbit/s. `None` means unlimited.
    pub fn bandwidth(&self) -> Option<u32> {
        self.bandwidth
    }
}

/// # Topology struct
/// Holds all declared nodes, links and interfaces. The topology is built once, and then handed
/// (immutably) to the compile pass. Since every derived structure is a side table, the compile
/// pass can be restarted from the same topology at any time.
///
/// ```rust
/// use ipgen::topology::Topology;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut t = Topology::new();
///     let r1 = t.add_router("r1")?;
///     let r2 = t.add_router("r2")?;
///     let s1 = t.add_switch("s1")?;
///     t.add_link(r1, s1)?;
///     t.add_link(r2, s1)?;
///     assert_eq!(t.get_node_id("r2")?, r2);
///     assert_eq!(t.get_node(s1)?.interfaces().len(), 2);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Topology {
    graph: TopologyGraph,
    interfaces: Vec<Interface>,
    links: Vec<LinkId>,
    names: HashMap<String, NodeId>,
}

impl Topology {
    /// Generate an empty topology
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new node with the given role and options. The name must be unique.
    pub fn add_node<S: Into<String>>(
        &mut self,
        name: S,
        role: NodeRole,
        options: NodeOptions,
    ) -> Result<NodeId, TopologyError> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(TopologyError::DuplicateName(name));
        }
        Self::check_node_options(&name, role, &options)?;
        let stp = if role == NodeRole::Switch { Some(StpOptions::default()) } else { None };
        let id = self.graph.add_node(Node {
            name: name.clone(),
            id: NodeId::end(),
            role,
            options,
            stp,
            interfaces: Vec::new(),
        });
        self.graph[id].id = id;
        self.names.insert(name, id);
        Ok(id)
    }

    /// Add a new router with default options
    pub fn add_router<S: Into<String>>(&mut self, name: S) -> Result<NodeId, TopologyError> {
        self.add_node(name, NodeRole::Router, NodeOptions::default())
    }

    /// Add a new host with default options
    pub fn add_host<S: Into<String>>(&mut self, name: S) -> Result<NodeId, TopologyError> {
        self.add_node(name, NodeRole::Host, NodeOptions::default())
    }

    /// Add a new switch
    pub fn add_switch<S: Into<String>>(&mut self, name: S) -> Result<NodeId, TopologyError> {
        self.add_node(name, NodeRole::Switch, NodeOptions::default())
    }

    /// Add a new hub
    pub fn add_hub<S: Into<String>>(&mut self, name: S) -> Result<NodeId, TopologyError> {
        self.add_node(name, NodeRole::Hub, NodeOptions::default())
    }

    /// Create a link between two different nodes. One new interface is created on each node,
    /// named `<node>-eth<N>`, where `N` counts the interfaces of that node.
    pub fn add_link(&mut self, a: NodeId, b: NodeId) -> Result<LinkId, TopologyError> {
        self.get_node(a)?;
        self.get_node(b)?;
        if a == b {
            return Err(TopologyError::SelfLink(self.graph[a].name.clone()));
        }

        let itf_a = InterfaceId(self.interfaces.len());
        let itf_b = InterfaceId(self.interfaces.len() + 1);
        let link = self.graph.add_edge(a, b, Link { interfaces: (itf_a, itf_b) });
        self.links.push(link);

        for (itf, node) in [(itf_a, a), (itf_b, b)].iter() {
            let n = &mut self.graph[*node];
            let name = format!("{}-eth{}", n.name, n.interfaces.len());
            n.interfaces.push(*itf);
            trace!("Created interface {}", name);
            self.interfaces.push(Interface {
                id: *itf,
                name,
                node: *node,
                link,
                addressing: AddressingOptions::default(),
                igp: IgpOptions::default(),
                stp_cost: None,
                bandwidth: None,
            });
        }

        Ok(link)
    }

    /// Create several links at once, returning their ids in the same order.
    pub fn add_links(&mut self, links: &[(NodeId, NodeId)]) -> Result<Vec<LinkId>, TopologyError> {
        links.iter().map(|(a, b)| self.add_link(*a, *b)).collect()
    }

    /// Replace the options of a node.
    pub fn set_node_options(
        &mut self,
        node: NodeId,
        options: NodeOptions,
    ) -> Result<(), TopologyError> {
        let n = self.get_node(node)?;
        Self::check_node_options(&n.name, n.role, &options)?;
        self.graph[node].options = options;
        Ok(())
    }

    /// Set the spanning tree options of a switch.
    pub fn set_stp(&mut self, node: NodeId, stp: StpOptions) -> Result<(), TopologyError> {
        let n = self.get_node(node)?;
        if n.role != NodeRole::Switch {
            return Err(TopologyError::OptionNotApplicable {
                option: "stp",
                node: n.name.clone(),
                role: n.role,
            });
        }
        stp.validate()?;
        self.graph[node].stp = Some(stp);
        Ok(())
    }

    /// Set the IGP options of a link, applied on both interfaces.
    pub fn set_link_igp(&mut self, link: LinkId, igp: IgpOptions) -> Result<(), TopologyError> {
        igp.validate()?;
        let (a, b) = self.link_interfaces(link)?;
        self.interfaces[a.0].igp = igp.clone();
        self.interfaces[b.0].igp = igp;
        Ok(())
    }

    /// Set the bandwidth of a link (in Mbit/s), applied on both interfaces.
    pub fn set_link_bandwidth(&mut self, link: LinkId, bw: u32) -> Result<(), TopologyError> {
        let (a, b) = self.link_interfaces(link)?;
        self.interfaces[a.0].bandwidth = Some(bw);
        self.interfaces[b.0].bandwidth = Some(bw);
        Ok(())
    }

    /// Override the IGP options on the interface of `node` on `link`.
    pub fn set_igp(
        &mut self,
        link: LinkId,
        node: NodeId,
        igp: IgpOptions,
    ) -> Result<(), TopologyError> {
        igp.validate()?;
        let itf = self.interface_on(node, link)?;
        self.interfaces[itf.0].igp = igp;
        Ok(())
    }

    /// Set the addressing options on the interface of `node` on `link`.
    pub fn set_addressing(
        &mut self,
        link: LinkId,
        node: NodeId,
        addressing: AddressingOptions,
    ) -> Result<(), TopologyError> {
        addressing.validate()?;
        let itf = self.interface_on(node, link)?;
        let n = &self.graph[node];
        if n.role.is_relay() && !addressing.addresses.is_empty() {
            return Err(TopologyError::AddressOnRelay(self.interfaces[itf.0].name.clone()));
        }
        if addressing.router_advertisement && !n.role.is_router() {
            return Err(TopologyError::OptionNotApplicable {
                option: "router_advertisement",
                node: n.name.clone(),
                role: n.role,
            });
        }
        self.interfaces[itf.0].addressing = addressing;
        Ok(())
    }

    /// Add a static address on the interface of `node` on `link`.
    pub fn add_static_address(
        &mut self,
        link: LinkId,
        node: NodeId,
        address: IpNet,
    ) -> Result<(), TopologyError> {
        let itf = self.interface_on(node, link)?;
        let mut addressing = self.interfaces[itf.0].addressing.clone();
        addressing.addresses.push(address);
        self.set_addressing(link, node, addressing)
    }

    /// Set the spanning tree cost on the port of the switch `node` on `link`.
    pub fn set_stp_cost(
        &mut self,
        link: LinkId,
        node: NodeId,
        cost: u32,
    ) -> Result<(), TopologyError> {
        let itf = self.interface_on(node, link)?;
        let n = &self.graph[node];
        if n.role != NodeRole::Switch {
            return Err(TopologyError::OptionNotApplicable {
                option: "stp_cost",
                node: n.name.clone(),
                role: n.role,
            });
        }
        self.interfaces[itf.0].stp_cost = Some(cost);
        Ok(())
    }

    /// Returns a reference to the node
    pub fn get_node(&self, node: NodeId) -> Result<&Node, TopologyError> {
        self.graph.node_weight(node).ok_or(TopologyError::NodeNotFound(node))
    }

    /// Returns the node id of the node with the given name
    pub fn get_node_id(&self, name: impl AsRef<str>) -> Result<NodeId, TopologyError> {
        self.names
            .get(name.as_ref())
            .copied()
            .ok_or_else(|| TopologyError::NodeNameNotFound(name.as_ref().to_string()))
    }

    /// Returns the name of the node
    pub fn get_node_name(&self, node: NodeId) -> Result<&str, TopologyError> {
        Ok(self.get_node(node)?.name())
    }

    /// Returns a reference to the interface
    pub fn get_interface(&self, itf: InterfaceId) -> Result<&Interface, TopologyError> {
        self.interfaces.get(itf.0).ok_or(TopologyError::InterfaceNotFound(itf))
    }

    /// Returns the role of the node owning the interface
    pub fn interface_role(&self, itf: InterfaceId) -> Result<NodeRole, TopologyError> {
        Ok(self.get_node(self.get_interface(itf)?.node)?.role)
    }

    /// Returns the interface of `node` attached to `link`.
    pub fn interface_on(&self, node: NodeId, link: LinkId) -> Result<InterfaceId, TopologyError> {
        let (a, b) = self.link_interfaces(link)?;
        if self.interfaces[a.0].node == node {
            Ok(a)
        } else if self.interfaces[b.0].node == node {
            Ok(b)
        } else {
            Err(TopologyError::NotAnEndpoint { node: self.get_node_name(node)?.to_string(), link })
        }
    }

    /// Returns both interfaces of a link
    pub fn link_interfaces(
        &self,
        link: LinkId,
    ) -> Result<(InterfaceId, InterfaceId), TopologyError> {
        self.graph
            .edge_weight(link)
            .map(|l| l.interfaces)
            .ok_or(TopologyError::LinkNotFound(link))
    }

    /// Returns the interface on the other side of the link.
    pub fn peer(&self, itf: InterfaceId) -> Result<InterfaceId, TopologyError> {
        let (a, b) = self.link_interfaces(self.get_interface(itf)?.link)?;
        Ok(if a == itf { b } else { a })
    }

    /// Iterate over all nodes, in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_indices().map(move |n| &self.graph[n])
    }

    /// Iterate over all nodes with the given role, in declaration order.
    pub fn nodes_with_role(&self, role: NodeRole) -> impl Iterator<Item = &Node> {
        self.nodes().filter(move |n| n.role == role)
    }

    /// Iterate over all interfaces, in declaration order.
    pub fn interfaces(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.iter()
    }

    /// All links, in declaration order.
    pub fn links(&self) -> &[LinkId] {
        &self.links
    }

    /// Number of nodes in the topology
    pub fn num_nodes(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns a reference to the underlying graph
    pub fn graph(&self) -> &TopologyGraph {
        &self.graph
    }

    fn check_node_options(
        name: &str,
        role: NodeRole,
        options: &NodeOptions,
    ) -> Result<(), TopologyError> {
        if !options.lo_addresses.is_empty() && !role.is_router() {
            return Err(TopologyError::LoopbackOnNonRouter(name.to_string()));
        }
        Ok(())
    }
}
