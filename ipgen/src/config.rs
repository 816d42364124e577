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

//! # Compiled Configuration
//! The result of a compile pass can be flattened into a [`Config`]: a set of keyed expressions,
//! each corresponding to one line (or block) of a node configuration. There are several different
//! structs in this module. Here is an overview:
//!
//! - [`Config`]: Network-wide configuration. The datastructure is a collection of several
//!   [`ConfigExpr`].
//! - [`ConfigExpr`]: Single configuration expression.
//! - [`ConfigPatch`]: Difference between two [`Config`] structs. The datastructure is a collection
//!   of several [`ConfigModifier`].
//! - [`ConfigModifier`]: A modification of a single [`ConfigExpr`] in a configuration. A
//!   modification can either be an insertion of a new expression, a removal of an existing
//!   expression, or a modification of an existing expression.
//!
//! Comparing two compiled configurations shows how the generated configuration changes when the
//! topology is edited. An unchanged topology always produces an empty patch.
//!
//! # Example Usage
//!
//! ```rust
//! use ipgen::config::{Config, ConfigError, ConfigExpr::Loopback};
//! use ipgen::topology::Topology;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut t = Topology::new();
//!     let r0 = t.add_router("r0")?;
//!     let r1 = t.add_router("r1")?;
//!
//!     let mut c1 = Config::new();
//!     let mut c2 = Config::new();
//!
//!     c1.add(Loopback { router: r0, addresses: vec!["10.0.0.1/32".parse()?] })?;
//!     c2.add(Loopback { router: r0, addresses: vec!["10.0.0.2/32".parse()?] })?;
//!     c2.add(Loopback { router: r1, addresses: vec!["10.0.0.1/32".parse()?] })?;
//!
//!     // the same key cannot be added twice
//!     let duplicate = Loopback { router: r1, addresses: vec![] };
//!     assert!(matches!(c2.add(duplicate), Err(ConfigError::ConfigExprOverload(_))));
//!
//!     // Compute the patch (difference between c1 and c2)
//!     let patch = c1.get_diff(&c2);
//!     assert_eq!(patch.modifiers.len(), 2);
//!     assert!(c2.get_diff(&c2).is_empty());
//!
//!     Ok(())
//! }
//! ```

use crate::domains::DomainId;
use crate::policy::{BgpNeighbor, RouteMapDirection, RouteMapEntry};
use crate::topology::{AddressFamily, InterfaceId, NodeId};

use ipnet::IpNet;
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use thiserror::Error;

/// Configuration Errors
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    /// The added expression would overwrite an existing expression
    #[error("The new ConfigExpr would overwrite an existing one: {0:?}")]
    ConfigExprOverload(ConfigExprKey),
}

/// # Network Configuration
/// This struct represents the compiled configuration of a network. It is made up of several
/// *unique* [`ConfigExpr`]: a configuration cannot have two expressions with the same key. The
/// expressions are ordered by their key, such that iterating over the configuration is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// All lines of configuration
    pub(crate) expr: BTreeMap<ConfigExprKey, ConfigExpr>,
}

impl Config {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single configuration expression. This fails if a similar expression already exists.
    pub fn add(&mut self, expr: ConfigExpr) -> Result<(), ConfigError> {
        let key = expr.key();
        if self.expr.contains_key(&key) {
            return Err(ConfigError::ConfigExprOverload(key));
        }
        self.expr.insert(key, expr);
        Ok(())
    }

    /// returns a ConfigPatch containing the difference between self and other. The removals come
    /// first, followed by the insertions and the updates.
    pub fn get_diff(&self, other: &Self) -> ConfigPatch {
        let mut patch = ConfigPatch::new();
        let self_keys: BTreeSet<&ConfigExprKey> = self.expr.keys().collect();
        let other_keys: BTreeSet<&ConfigExprKey> = other.expr.keys().collect();

        // expressions missing in other (must be removed)
        for (_, e) in self.expr.iter().filter(|(k, _)| !other_keys.contains(k)) {
            patch.add(ConfigModifier::Remove(e.clone()));
        }

        // expressions missing in self (must be inserted)
        for (_, e) in other.expr.iter().filter(|(k, _)| !self_keys.contains(k)) {
            patch.add(ConfigModifier::Insert(e.clone()));
        }

        // expressions which have changed
        for (k, self_e) in self.expr.iter() {
            match other.expr.get(k) {
                Some(other_e) if other_e != self_e => patch
                    .add(ConfigModifier::Update { from: self_e.clone(), to: other_e.clone() }),
                _ => {}
            }
        }
        patch
    }

    /// Returns the number of config expressions in the config.
    pub fn len(&self) -> usize {
        self.expr.len()
    }

    /// Returns `true` if the config is empty
    pub fn is_empty(&self) -> bool {
        self.expr.is_empty()
    }

    /// Returns an iterator over all expressions in the configuration, ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = &ConfigExpr> {
        self.expr.values()
    }

    /// Returns all expressions configured on the node
    pub fn of_node(&self, node: NodeId) -> impl Iterator<Item = &ConfigExpr> {
        self.expr.values().filter(move |e| e.node() == node)
    }
}

/// # Single configuration expression
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigExpr {
    /// Addresses of an interface
    InterfaceAddress {
        /// Node owning the interface
        node: NodeId,
        /// The interface
        interface: InterfaceId,
        /// All addresses, IPv4 first
        addresses: Vec<IpNet>,
    },
    /// Prefix of a broadcast domain. It is configured on the first router of the domain, or on
    /// the first node if there is no router.
    DomainPrefix {
        /// Node on which the prefix is announced
        node: NodeId,
        /// The domain
        domain: DomainId,
        /// Family of the prefix
        family: AddressFamily,
        /// The prefix
        prefix: IpNet,
    },
    /// Loopback addresses of a router
    Loopback {
        /// The router
        router: NodeId,
        /// All loopback addresses
        addresses: Vec<IpNet>,
    },
    /// Default route of a host
    DefaultRoute {
        /// The host
        node: NodeId,
        /// Family of the route
        family: AddressFamily,
        /// The gateway
        gateway: IpAddr,
    },
    /// The IGP forms no adjacency over this interface
    IgpPassive {
        /// Node owning the interface
        node: NodeId,
        /// The interface
        interface: InterfaceId,
    },
    /// A BGP neighbor
    BgpNeighbor {
        /// The router
        router: NodeId,
        /// The resolved neighbor
        neighbor: BgpNeighbor,
    },
    /// A single entry of a route-map
    BgpRouteMapEntry {
        /// The router
        router: NodeId,
        /// The neighbor to which the route-map is bound
        neighbor: NodeId,
        /// Family of the session
        family: AddressFamily,
        /// Direction of the route-map
        direction: RouteMapDirection,
        /// Name of the route-map
        name: String,
        /// The entry
        entry: RouteMapEntry,
    },
    /// A BGP network statement
    BgpNetwork {
        /// The router
        router: NodeId,
        /// Announced prefix
        prefix: IpNet,
    },
}

impl ConfigExpr {
    /// Returns the key of the config expression.
    pub fn key(&self) -> ConfigExprKey {
        match self {
            Self::InterfaceAddress { interface, .. } => {
                ConfigExprKey::InterfaceAddress { interface: *interface }
            }
            Self::DomainPrefix { domain, family, .. } => {
                ConfigExprKey::DomainPrefix { domain: *domain, family: *family }
            }
            Self::Loopback { router, .. } => ConfigExprKey::Loopback { router: *router },
            Self::DefaultRoute { node, family, .. } => {
                ConfigExprKey::DefaultRoute { node: *node, family: *family }
            }
            Self::IgpPassive { interface, .. } => {
                ConfigExprKey::IgpPassive { interface: *interface }
            }
            Self::BgpNeighbor { router, neighbor } => {
                ConfigExprKey::BgpNeighbor { router: *router, peer: neighbor.peer }
            }
            Self::BgpRouteMapEntry { router, neighbor, family, direction, entry, .. } => {
                ConfigExprKey::BgpRouteMapEntry {
                    router: *router,
                    neighbor: *neighbor,
                    family: *family,
                    direction: *direction,
                    order: entry.order(),
                }
            }
            Self::BgpNetwork { router, prefix } => {
                ConfigExprKey::BgpNetwork { router: *router, prefix: *prefix }
            }
        }
    }

    /// Returns the node on which the expression is configured.
    pub fn node(&self) -> NodeId {
        match self {
            Self::InterfaceAddress { node, .. }
            | Self::DomainPrefix { node, .. }
            | Self::DefaultRoute { node, .. }
            | Self::IgpPassive { node, .. } => *node,
            Self::Loopback { router, .. }
            | Self::BgpNeighbor { router, .. }
            | Self::BgpRouteMapEntry { router, .. }
            | Self::BgpNetwork { router, .. } => *router,
        }
    }
}

/// # Key for Config Expressions
/// Key for a single configuration expression, where the value is missing. Two expressions with
/// the same key describe the same configuration field, and cannot be part of the same
/// [`Config`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigExprKey {
    /// Addresses of an interface
    InterfaceAddress {
        /// The interface
        interface: InterfaceId,
    },
    /// Prefix of a domain
    DomainPrefix {
        /// The domain
        domain: DomainId,
        /// The family
        family: AddressFamily,
    },
    /// Loopback of a router
    Loopback {
        /// The router
        router: NodeId,
    },
    /// Default route of a node
    DefaultRoute {
        /// The node
        node: NodeId,
        /// The family
        family: AddressFamily,
    },
    /// Passive IGP interface
    IgpPassive {
        /// The interface
        interface: InterfaceId,
    },
    /// BGP neighbor
    BgpNeighbor {
        /// The router
        router: NodeId,
        /// The peer
        peer: NodeId,
    },
    /// Route-map entry
    BgpRouteMapEntry {
        /// The router
        router: NodeId,
        /// The neighbor to which the route-map is bound
        neighbor: NodeId,
        /// Family of the session
        family: AddressFamily,
        /// Direction of the route-map
        direction: RouteMapDirection,
        /// Order of the entry
        order: usize,
    },
    /// BGP network statement
    BgpNetwork {
        /// The router
        router: NodeId,
        /// Announced prefix
        prefix: IpNet,
    },
}

/// # Config Modifier
/// A single change between two configurations: an expression was inserted, removed, or its value
/// changed.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigModifier {
    /// Insert a new expression
    Insert(ConfigExpr),
    /// Remove an existing expression
    Remove(ConfigExpr),
    /// Change a config expression
    Update {
        /// Original configuration expression
        from: ConfigExpr,
        /// New configuration expression, which replaces the `from` expression.
        to: ConfigExpr,
    },
}

/// # Config Patch
/// The difference between two configurations, as an ordered list of `ConfigModifiers`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigPatch {
    /// List of all modifiers, in the order in which they are applied.
    pub modifiers: Vec<ConfigModifier>,
}

impl ConfigPatch {
    /// Create an empty patch
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new modifier to the patch
    pub fn add(&mut self, modifier: ConfigModifier) {
        self.modifiers.push(modifier);
    }

    /// Returns `true` if the patch contains no modifier
    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }
}
