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


//! Test the partition of interfaces into broadcast domains.

use crate::domains::*;
use crate::example_networks::*;
use crate::topology::*;

use maplit::hashset;
use std::collections::HashSet;

/// Collect the interface names of a domain
fn names(t: &Topology, d: &BroadcastDomain) -> HashSet<String> {
    d.interfaces().iter().map(|i| t.get_interface(*i).unwrap().name().to_string()).collect()
}

#[test]
fn switch_and_router_link() {
    let mut t = Topology::new();
    let r1 = t.add_router("r1").unwrap();
    let r2 = t.add_router("r2").unwrap();
    let r3 = t.add_router("r3").unwrap();
    let s1 = t.add_switch("s1").unwrap();
    t.add_links(&[(r1, s1), (r2, s1), (r1, r3)]).unwrap();

    let domains = find_broadcast_domains(&t).unwrap();
    assert_eq!(domains.len(), 2);

    let d0 = domains.get(DomainId(0)).unwrap();
    let d1 = domains.get(DomainId(1)).unwrap();
    assert_eq!(names(&t, d0), hashset! {"r1-eth0".to_string(), "r2-eth0".to_string()});
    assert_eq!(names(&t, d1), hashset! {"r1-eth1".to_string(), "r3-eth0".to_string()});

    // switch ports are not part of any domain
    let s1_ports = t.get_node(s1).unwrap().interfaces().to_vec();
    assert!(s1_ports.iter().all(|p| domains.domain_of(*p).is_none()));

    assert_eq!(domains.common_domain(&t, &[r1, r2]), Some(DomainId(0)));
    assert_eq!(domains.common_domain(&t, &[r1, r3]), Some(DomainId(1)));
    assert_eq!(domains.common_domain(&t, &[r2, r3]), None);
    assert_eq!(domains.domains_of_node(&t, r1), vec![DomainId(0), DomainId(1)]);
    assert!(domains.shared_interfaces(&t, r2, r3).is_none());
    let (a, b) = domains.shared_interfaces(&t, r3, r1).unwrap();
    assert_eq!(t.get_interface(a).unwrap().name(), "r3-eth0");
    assert_eq!(t.get_interface(b).unwrap().name(), "r1-eth1");
}

#[test]
fn switch_loop_and_hub() {
    let (t, _) = SwitchedLan::build().unwrap();
    let domains = find_broadcast_domains(&t).unwrap();
    assert_eq!(domains.len(), 3);

    let lan = domains.get(DomainId(0)).unwrap();
    assert_eq!(
        names(&t, lan),
        hashset! {
            "r1-eth0".to_string(),
            "h1-eth0".to_string(),
            "h2-eth0".to_string(),
            "h3-eth0".to_string(),
            "r2-eth0".to_string(),
        }
    );
    assert_eq!(lan.routers(&t).count(), 2);
    assert_eq!(lan.addresses_needed(&t, AddressFamily::Ipv4), 5);

    let r1 = t.get_node_id("r1").unwrap();
    let r2 = t.get_node_id("r2").unwrap();
    let h4 = t.get_node_id("h4").unwrap();
    assert_eq!(domains.common_domain(&t, &[r1, r2]), Some(DomainId(0)));
    assert_eq!(domains.common_domain(&t, &[r2, h4]), Some(DomainId(2)));
    assert_eq!(domains.get(DomainId(1)).unwrap().interfaces().len(), 2);
}

#[test]
fn hub_chain() {
    // two hubs in a row, with a switch in between, still form a single domain
    let mut t = Topology::new();
    let h1 = t.add_host("h1").unwrap();
    let h2 = t.add_host("h2").unwrap();
    let r1 = t.add_router("r1").unwrap();
    let hub1 = t.add_hub("hub1").unwrap();
    let hub2 = t.add_hub("hub2").unwrap();
    let s1 = t.add_switch("s1").unwrap();
    t.add_links(&[(h1, hub1), (hub1, s1), (s1, hub2), (hub2, h2), (hub2, r1)]).unwrap();

    let domains = find_broadcast_domains(&t).unwrap();
    assert_eq!(domains.len(), 1);
    assert_eq!(domains.common_domain(&t, &[h1, h2, r1]), Some(DomainId(0)));
}

#[test]
fn isolated_relays() {
    // a switch without any host or router yields no domain at all
    let mut t = Topology::new();
    let s1 = t.add_switch("s1").unwrap();
    let s2 = t.add_switch("s2").unwrap();
    t.add_link(s1, s2).unwrap();
    let domains = find_broadcast_domains(&t).unwrap();
    assert!(domains.is_empty());
}

#[test]
fn partition() {
    for (t, _) in vec![
        SimpleBgpNet::build().unwrap(),
        BgpPoliciesNet::build().unwrap(),
        PartialStaticNet::build().unwrap(),
        SwitchedLan::build().unwrap(),
        RouteReflectorNet::build().unwrap(),
    ] {
        let domains = find_broadcast_domains(&t).unwrap();

        // every host and router interface is in exactly one domain
        let mut seen: HashSet<InterfaceId> = HashSet::new();
        for d in domains.iter() {
            for itf in d.interfaces() {
                assert!(seen.insert(*itf));
                assert_eq!(domains.domain_of(*itf), Some(d.id()));
            }
        }
        let expected: HashSet<InterfaceId> = t
            .interfaces()
            .filter(|i| t.interface_role(i.id()).unwrap().is_domain_boundary())
            .map(|i| i.id())
            .collect();
        assert_eq!(seen, expected);

        // running the detection twice yields the same domains
        assert_eq!(domains, find_broadcast_domains(&t).unwrap());
    }
}
