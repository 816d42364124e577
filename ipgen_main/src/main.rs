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


use ipgen::allocation::AllocationSettings;
use ipgen::example_networks::*;
use ipgen::policy::{Route, RouteMapDirection};
use ipgen::topology::{AddressFamily, Topology};
use ipgen::{compile, printer, Compilation, CompileSettings, Overlays};

use clap::{Parser, ValueEnum};
use ipnet::{Ipv4Net, Ipv6Net};
use log::*;
use std::error::Error;

mod topology_db;
use topology_db::snapshot;

fn main() -> Result<(), Box<dyn Error>> {
    // initialize the env logger
    pretty_env_logger::init();
    // run clap
    let args = CommandLineArguments::parse();

    let (topo, overlays) = args.network.build()?;
    let settings = args.settings();
    let result = compile(&topo, &overlays, &settings)?;
    let config = result.config(&topo)?;

    info!(
        "Configuration of {:?} ({} expressions):\n    {}",
        args.network,
        config.len(),
        printer::config(&topo, &config)?.join("\n    ")
    );

    if args.check {
        check_policies(&topo, &result)?;
    }

    if let Some(json_filename) = args.json {
        let db = snapshot(&topo, &result)?;
        std::fs::write(&json_filename, serde_json::to_string(&db)?)?;
        info!("Topology snapshot written to {}", json_filename);
    }

    Ok(())
}

/// Evaluate the route-maps on all announced networks, along every session, and log the result.
fn check_policies(topo: &Topology, result: &Compilation) -> Result<(), Box<dyn Error>> {
    for router in result.policies.iter() {
        let name = topo.get_node_name(router.router)?;
        for neighbor in router.neighbors.iter() {
            let peer = match result.policies.get(neighbor.peer) {
                Some(peer) => peer,
                None => continue,
            };
            for prefix in router.networks.iter() {
                let family = AddressFamily::of(prefix);
                let next_hop = match neighbor.local_addresses.get(&family) {
                    Some(nh) => *nh,
                    None => continue,
                };
                let route = Route::new(*prefix, next_hop);
                let received = router
                    .apply(neighbor.peer, RouteMapDirection::Outgoing, route)
                    .and_then(|r| peer.apply(router.router, RouteMapDirection::Incoming, r));
                match received {
                    Some(r) => info!(
                        "{} -> {}: accepted ({})",
                        name,
                        neighbor.name,
                        printer::route(&r)
                    ),
                    None => info!("{} -> {}: {} filtered", name, neighbor.name, prefix),
                }
            }
        }
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[clap(name = "IpGen", author = "Tibor Schneider")]
/// Compile one of the bundled example networks into addresses and BGP policies
struct CommandLineArguments {
    /// Network to compile
    #[clap(value_enum)]
    network: NetworkSelection,
    /// Disable IPv4
    #[clap(long = "no-v4")]
    no_v4: bool,
    /// Disable IPv6
    #[clap(long = "no-v6")]
    no_v6: bool,
    /// Only use static addresses
    #[clap(long = "static-only")]
    static_only: bool,
    /// IPv4 pool for broadcast domains
    #[clap(long)]
    v4_pool: Option<Ipv4Net>,
    /// IPv6 pool for broadcast domains
    #[clap(long)]
    v6_pool: Option<Ipv6Net>,
    /// Default IPv4 prefix length of broadcast domains
    #[clap(long)]
    v4_prefix_len: Option<u8>,
    /// Default IPv6 prefix length of broadcast domains
    #[clap(long)]
    v6_prefix_len: Option<u8>,
    /// Evaluate the route-maps on all announced networks
    #[clap(short = 'c', long)]
    check: bool,
    /// Write a JSON snapshot of the topology to the file
    #[clap(long = "json")]
    json: Option<String>,
}

impl CommandLineArguments {
    fn settings(&self) -> CompileSettings {
        let mut allocation = AllocationSettings {
            use_v4: !self.no_v4,
            use_v6: !self.no_v6,
            allocate_ips: !self.static_only,
            ..Default::default()
        };
        if let Some(pool) = self.v4_pool {
            allocation.v4_links.base = pool.into();
        }
        if let Some(pool) = self.v6_pool {
            allocation.v6_links.base = pool.into();
        }
        if let Some(len) = self.v4_prefix_len {
            allocation.v4_links.prefix_len = len;
        }
        if let Some(len) = self.v6_prefix_len {
            allocation.v6_links.prefix_len = len;
        }
        CompileSettings { allocation }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum NetworkSelection {
    /// Three ASes, with hosts attached to every router
    SimpleBgp,
    /// Five ASes with shared-cost and client-provider peerings
    BgpPolicies,
    /// Switched network with static addresses and a declared subnet
    PartialStatic,
    /// Switched LAN with a loop and a hub
    SwitchedLan,
    /// AS with a route reflector
    RouteReflector,
}

impl NetworkSelection {
    fn build(&self) -> Result<(Topology, Overlays), ipgen::Error> {
        match self {
            Self::SimpleBgp => SimpleBgpNet::build(),
            Self::BgpPolicies => BgpPoliciesNet::build(),
            Self::PartialStatic => PartialStaticNet::build(),
            Self::SwitchedLan => SwitchedLan::build(),
            Self::RouteReflector => RouteReflectorNet::build(),
        }
    }
}
