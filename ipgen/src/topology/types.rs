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

//! Module containing all type definitions of the topology graph

use crate::topology::topology::{Link, Node};

use ipnet::IpNet;
use petgraph::prelude::*;
use petgraph::stable_graph::StableGraph;
use std::fmt;
use std::net::IpAddr;
use thiserror::Error;

type IndexType = u32;
/// Node Identification (and index into the graph)
pub type NodeId = NodeIndex<IndexType>;
/// Link Identification (and index of the edge in the graph)
pub type LinkId = EdgeIndex<IndexType>;
/// Topology graph. Nodes carry the declared node, edges carry the two interfaces of the link.
pub type TopologyGraph = StableGraph<Node, Link, Undirected, IndexType>;

/// Interface Identification. Interfaces are numbered in the order in which they are declared,
/// which is also the order in which they are visited during compilation.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct InterfaceId(pub usize);

/// AS Number
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct AsId(pub u32);

impl fmt::Display for AsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of a node in the topology. Hosts and routers terminate a broadcast domain, switches and
/// hubs relay frames between their ports.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub enum NodeRole {
    /// End host running a network stack
    Host,
    /// Layer 3 router
    Router,
    /// Learning switch (optionally running STP)
    Switch,
    /// Hub, repeating every frame on all ports
    Hub,
}

impl NodeRole {
    /// Returns `true` if the node terminates a broadcast domain (host or router).
    pub fn is_domain_boundary(&self) -> bool {
        matches!(self, Self::Host | Self::Router)
    }

    /// Returns `true` if the node transparently relays frames (switch or hub).
    pub fn is_relay(&self) -> bool {
        !self.is_domain_boundary()
    }

    /// Returns `true` if the node is a router
    pub fn is_router(&self) -> bool {
        matches!(self, Self::Router)
    }

    /// Returns `true` if the node is a host
    pub fn is_host(&self) -> bool {
        matches!(self, Self::Host)
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Host => "host",
            Self::Router => "router",
            Self::Switch => "switch",
            Self::Hub => "hub",
        })
    }
}

/// Address family. Both families are handled independently during allocation and policy
/// resolution.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub enum AddressFamily {
    /// IPv4
    Ipv4,
    /// IPv6
    Ipv6,
}

impl AddressFamily {
    /// Both families, in the order in which they are processed.
    pub const ALL: [AddressFamily; 2] = [AddressFamily::Ipv4, AddressFamily::Ipv6];

    /// Returns the family of a prefix
    pub fn of(net: &IpNet) -> Self {
        match net {
            IpNet::V4(_) => Self::Ipv4,
            IpNet::V6(_) => Self::Ipv6,
        }
    }

    /// Returns the family of an address
    pub fn of_addr(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Self::Ipv4,
            IpAddr::V6(_) => Self::Ipv6,
        }
    }

    /// Number of bits in an address of this family
    pub fn max_prefix_len(&self) -> u8 {
        match self {
            Self::Ipv4 => 32,
            Self::Ipv6 => 128,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
        })
    }
}

/// Topology errors, raised while declaring the graph. They describe an ill-formed graph.
#[derive(Error, Debug, PartialEq)]
pub enum TopologyError {
    /// A node with the same name already exists
    #[error("A node named {0} already exists")]
    DuplicateName(String),
    /// Node is not present in the topology
    #[error("Node was not found in topology: {0:?}")]
    NodeNotFound(NodeId),
    /// Node name is not present in the topology
    #[error("Node name was not found in topology: {0}")]
    NodeNameNotFound(String),
    /// Link is not present in the topology
    #[error("Link was not found in topology: {0:?}")]
    LinkNotFound(LinkId),
    /// Interface is not present in the topology
    #[error("Interface was not found in topology: {0:?}")]
    InterfaceNotFound(InterfaceId),
    /// A link must connect two different nodes
    #[error("Cannot connect node {0} to itself")]
    SelfLink(String),
    /// The node is not an endpoint of the link
    #[error("Node {node} is not an endpoint of link {link:?}")]
    NotAnEndpoint {
        /// Name of the node
        node: String,
        /// The link
        link: LinkId,
    },
    /// Switch and hub ports never carry an address
    #[error("Interface {0} belongs to a switch or hub and cannot carry an address")]
    AddressOnRelay(String),
    /// Only routers have a configurable loopback
    #[error("Node {0} is not a router, it cannot have loopback addresses")]
    LoopbackOnNonRouter(String),
    /// The option is attached to a node of the wrong role
    #[error("Option {option} cannot be set on {role} {node}")]
    OptionNotApplicable {
        /// Name of the option
        option: &'static str,
        /// Name of the node
        node: String,
        /// Role of the node
        role: NodeRole,
    },
    /// Option value is out of range
    #[error("Invalid option: {0}")]
    InvalidOption(String),
}
