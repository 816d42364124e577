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

#![deny(missing_docs)]

//! # IpGen: Compiling IP Network Topologies into Addressing and Routing Policy
//! This is a library that takes a declarative description of an IP network (hosts, routers,
//! switches, hubs and the links between them), and derives the configuration of every node:
//! which interfaces share a broadcast domain, which prefixes and addresses every domain, interface
//! and loopback receives, and how BGP peering relationships and policy intents translate into
//! ordered route-maps.
//!
//! ## Structure
//!
//! This library is structured in the following way:
//!
//! - **[`Topology`](topology)**: Declaration of the network. See the main structure
//!   [`Topology`](topology::Topology), and the option structs in
//!   [`options`](topology::options).
//!
//! - **[`Domains`](domains)**: Partition of all host and router interfaces into broadcast
//!   domains, see [`find_broadcast_domains`](domains::find_broadcast_domains).
//!
//! - **[`Allocation`](allocation)**: Assignment of IPv4 and IPv6 prefixes to domains and
//!   loopbacks, honoring static addresses and declared [`Subnets`](allocation::Subnet). See
//!   [`allocate`](allocation::allocate).
//!
//! - **[`Policy`](policy)**: Resolution of the [`BgpOverlay`](policy::BgpOverlay) into
//!   per-router [`BgpRouterConfig`](policy::BgpRouterConfig), with neighbors and route-maps.
//!
//! - **[`Config`](config)**: The flattened, keyed configuration, which can be compared between
//!   two compile passes.
//!
//! - **[`Example Networks`](example_networks)**: Collection of declared networks, used for
//!   testing and demonstration.
//!
//! ## Usage
//!
//! ```rust
//! use ipgen::{compile, CompileSettings, Overlays};
//! use ipgen::example_networks::{ExampleNetwork, SimpleBgpNet};
//!
//! fn main() -> Result<(), ipgen::Error> {
//!     let (topo, overlays) = SimpleBgpNet::build()?;
//!     let result = compile(&topo, &overlays, &CompileSettings::default())?;
//!     let config = result.config(&topo)?;
//!     assert!(!config.is_empty());
//!     Ok(())
//! }
//! ```

pub mod allocation;
mod compile;
pub mod config;
pub mod domains;
mod error;
pub mod example_networks;
pub mod policy;
pub mod printer;
pub mod topology;

pub use compile::{compile, Compilation, CompileSettings, Overlays};
pub use error::Error;

#[cfg(test)]
mod test;
