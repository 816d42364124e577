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


//! Test the address allocation, the pools and the handling of declared subnets.

use crate::allocation::pool::{fitting_prefix_len, overlaps};
use crate::allocation::*;
use crate::domains::{find_broadcast_domains, DomainId};
use crate::example_networks::*;
use crate::topology::*;

use ipnet::IpNet;
use std::net::IpAddr;

fn net(s: &str) -> IpNet {
    s.parse().unwrap()
}

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

fn v4_only() -> AllocationSettings {
    AllocationSettings { use_v6: false, ..Default::default() }
}

fn run(
    t: &Topology,
    subnets: &[Subnet],
    settings: &AllocationSettings,
) -> Result<Addressing, AllocationError> {
    let domains = find_broadcast_domains(t).unwrap();
    allocate(t, &domains, subnets, settings)
}

#[test]
fn pool_draws() {
    let mut registry = PrefixRegistry::new();
    registry.register(net("10.0.0.64/26"), PrefixOwner::Domain(DomainId(0))).unwrap();
    let mut pool = AllocationPool::new(&PoolSettings::new(net("10.0.0.0/24"), 26)).unwrap();

    assert_eq!(pool.next(&registry), Ok(net("10.0.0.0/26")));
    assert_eq!(pool.next(&registry), Ok(net("10.0.0.128/26")));
    assert_eq!(pool.draw(28, &registry), Ok(net("10.0.0.192/28")));
    // the cursor is aligned to the requested size
    assert_eq!(pool.draw(27, &registry), Ok(net("10.0.0.224/27")));
    assert_eq!(
        pool.next(&registry),
        Err(AllocationError::PoolExhausted { pool: net("10.0.0.0/24"), prefix_len: 26 })
    );
}

#[test]
fn pool_skips_large_prefixes() {
    let d0 = PrefixOwner::Domain(DomainId(0));
    let settings = PoolSettings::new(net("fc00::/8"), 48);

    // the cursor jumps over the registered prefix at once
    let mut registry = PrefixRegistry::new();
    registry.register(net("fc00::1/20"), d0).unwrap();
    let mut pool = AllocationPool::new(&settings).unwrap();
    assert_eq!(pool.next(&registry), Ok(net("fc00:1000::/48")));
    assert_eq!(pool.next(&registry), Ok(net("fc00:1000:1::/48")));

    let mut registry = PrefixRegistry::new();
    registry.register(net("fc00::/9"), d0).unwrap();
    let mut pool = AllocationPool::new(&settings).unwrap();
    assert_eq!(pool.next(&registry), Ok(net("fc80::/48")));

    // a registered prefix covering the whole pool
    let mut registry = PrefixRegistry::new();
    registry.register(net("fc00::/7"), d0).unwrap();
    let mut pool = AllocationPool::new(&settings).unwrap();
    assert_eq!(
        pool.next(&registry),
        Err(AllocationError::PoolExhausted { pool: net("fc00::/8"), prefix_len: 48 })
    );
}

#[test]
fn large_static_v6_prefix() {
    let mut t = Topology::new();
    let r1 = t.add_router("r1").unwrap();
    let r2 = t.add_router("r2").unwrap();
    let r3 = t.add_router("r3").unwrap();
    let links = t.add_links(&[(r1, r2), (r2, r3)]).unwrap();
    t.add_static_address(links[0], r1, net("fc00::1/20")).unwrap();
    t.add_static_address(links[0], r2, net("fc00::2/20")).unwrap();

    let a = run(&t, &[], &AllocationSettings::default()).unwrap();
    assert_eq!(a.prefix(DomainId(0), AddressFamily::Ipv6), Some(net("fc00::/20")));
    assert_eq!(a.prefix(DomainId(1), AddressFamily::Ipv6), Some(net("fc00:1000::/48")));
}

#[test]
fn pool_settings() {
    assert_eq!(
        AllocationPool::new(&PoolSettings::new(net("10.0.0.0/24"), 16)).unwrap_err(),
        AllocationError::InvalidPool { base: net("10.0.0.0/24"), prefix_len: 16 }
    );
    assert!(AllocationPool::new(&PoolSettings::new(net("10.0.0.0/24"), 33)).is_err());
    let pool = AllocationPool::new(&PoolSettings::new(net("fc00::1/8"), 48)).unwrap();
    assert_eq!(pool.family(), AddressFamily::Ipv6);
    assert_eq!(pool.prefix_len(), 48);

    assert_eq!(fitting_prefix_len(AddressFamily::Ipv4, 1), Some(30));
    assert_eq!(fitting_prefix_len(AddressFamily::Ipv4, 2), Some(30));
    assert_eq!(fitting_prefix_len(AddressFamily::Ipv4, 3), Some(29));
    assert_eq!(fitting_prefix_len(AddressFamily::Ipv4, 300), Some(23));
    assert_eq!(fitting_prefix_len(AddressFamily::Ipv6, 2), Some(126));
}

#[test]
fn registry_owners() {
    let mut registry = PrefixRegistry::new();
    let d0 = PrefixOwner::Domain(DomainId(0));
    let d1 = PrefixOwner::Domain(DomainId(1));

    registry.register(net("10.0.0.1/24"), d0).unwrap();
    // the same owner may register overlapping prefixes
    registry.register(net("10.0.0.2/24"), d0).unwrap();
    assert_eq!(registry.iter().count(), 1);
    assert_eq!(
        registry.register(net("10.0.0.128/25"), d1),
        Err(AllocationError::OverlappingPrefix {
            prefix: net("10.0.0.128/25"),
            owner: d1,
            other: net("10.0.0.0/24"),
            other_owner: d0,
        })
    );
    assert!(registry.find_overlap(&net("10.0.1.0/24")).is_none());
    assert!(overlaps(&net("10.0.0.0/8"), &net("10.1.0.0/16")));
    assert!(!overlaps(&net("10.0.0.0/16"), &net("10.1.0.0/16")));
}

#[test]
fn declared_subnet_is_skipped_by_pool() {
    let mut t = Topology::new();
    let r1 = t.add_router("r1").unwrap();
    let r2 = t.add_router("r2").unwrap();
    let r3 = t.add_router("r3").unwrap();
    let h1 = t.add_host("h1").unwrap();
    let links = t.add_links(&[(r1, r2), (r2, r3), (r3, h1)]).unwrap();

    let declared = net("10.12.0.0/24");
    let subnets = vec![Subnet::on_link(links[0], vec![declared])];
    let settings = AllocationSettings {
        v4_links: PoolSettings::new(net("10.12.0.0/16"), 24),
        ..v4_only()
    };
    let a = run(&t, &subnets, &settings).unwrap();

    let r1_itf = t.interface_on(r1, links[0]).unwrap();
    let r2_itf = t.interface_on(r2, links[0]).unwrap();
    assert_eq!(a.addresses(r1_itf), &[net("10.12.0.1/24")]);
    assert_eq!(a.addresses(r2_itf), &[net("10.12.0.2/24")]);
    assert_eq!(a.prefix(DomainId(0), AddressFamily::Ipv4), Some(declared));

    // the following domains never reuse the declared subnet
    assert_eq!(a.prefix(DomainId(1), AddressFamily::Ipv4), Some(net("10.12.1.0/24")));
    assert_eq!(a.prefix(DomainId(2), AddressFamily::Ipv4), Some(net("10.12.2.0/24")));
    for (_, _, prefix) in a.iter_prefixes().filter(|(d, _, _)| *d != DomainId(0)) {
        assert!(!overlaps(&prefix, &declared));
    }

    // no IPv6 at all
    assert!(a.prefix(DomainId(0), AddressFamily::Ipv6).is_none());
    assert_eq!(a.families(), &[AddressFamily::Ipv4]);

    // the router of the stub domain is the default gateway of the host
    assert_eq!(a.default_route(h1, AddressFamily::Ipv4), Some(ip("10.12.2.1")));
    assert_eq!(a.default_route(r3, AddressFamily::Ipv4), None);
    assert_eq!(a.node_for_ip(&ip("10.12.0.2")), Some(r2));

    // one loopback per router, none for hosts
    let loopbacks: Vec<IpAddr> =
        [r1, r2, r3].iter().map(|r| a.loopback(*r, AddressFamily::Ipv4).unwrap()).collect();
    assert_ne!(loopbacks[0], loopbacks[1]);
    assert_ne!(loopbacks[1], loopbacks[2]);
    assert_ne!(loopbacks[0], loopbacks[2]);
    for lo in loopbacks.iter() {
        assert!(net("10.0.0.0/16").contains(lo));
    }
    assert!(a.loopbacks(h1).is_empty());
}

#[test]
fn undersized_subnet() {
    let mut t = Topology::new();
    let r1 = t.add_router("r1").unwrap();
    let r2 = t.add_router("r2").unwrap();
    let h1 = t.add_host("h1").unwrap();
    let s1 = t.add_switch("s1").unwrap();
    t.add_links(&[(r1, s1), (r2, s1), (h1, s1)]).unwrap();

    let subnets = vec![Subnet::new(vec![r1, r2, h1], vec![net("10.0.0.0/30")])];
    assert_eq!(
        run(&t, &subnets, &v4_only()),
        Err(AllocationError::UndersizedSubnet {
            prefix: net("10.0.0.0/30"),
            needed: 3,
            available: 2
        })
    );

    let subnets = vec![Subnet::new(vec![r1, r2, h1], vec![net("10.0.0.0/29")])];
    assert!(run(&t, &subnets, &v4_only()).is_ok());
}

#[test]
fn invalid_subnets() {
    let mut t = Topology::new();
    let r1 = t.add_router("r1").unwrap();
    let r2 = t.add_router("r2").unwrap();
    let r3 = t.add_router("r3").unwrap();
    let links = t.add_links(&[(r1, r2), (r2, r3)]).unwrap();

    // r1 and r3 share no domain
    let subnets = vec![Subnet::new(vec![r1, r3], vec![net("10.0.0.0/24")])];
    assert_eq!(
        run(&t, &subnets, &v4_only()),
        Err(AllocationError::SubnetNotInLan(net("10.0.0.0/24")))
    );

    // overlapping declarations
    let subnets = vec![
        Subnet::on_link(links[0], vec![net("10.0.0.0/24")]),
        Subnet::on_link(links[1], vec![net("10.0.0.0/25")]),
    ];
    assert_eq!(
        run(&t, &subnets, &v4_only()),
        Err(AllocationError::OverlappingSubnets(net("10.0.0.0/24"), net("10.0.0.0/25")))
    );

    // two declarations for the same domain
    let subnets = vec![
        Subnet::on_link(links[0], vec![net("10.0.0.0/24")]),
        Subnet::new(vec![r1, r2], vec![net("10.1.0.0/24")]),
    ];
    assert_eq!(
        run(&t, &subnets, &v4_only()),
        Err(AllocationError::DuplicateDomainSubnet {
            domain: DomainId(0),
            family: AddressFamily::Ipv4
        })
    );

    // one declaration per family is fine
    let subnets = vec![Subnet::on_link(links[0], vec![net("10.0.0.0/24"), net("fc00:12::/64")])];
    let a = run(&t, &subnets, &AllocationSettings::default()).unwrap();
    assert_eq!(a.prefix(DomainId(0), AddressFamily::Ipv6), Some(net("fc00:12::/64")));
}

#[test]
fn partially_static_domain() {
    let mut t = Topology::new();
    let r1 = t.add_router("r1").unwrap();
    let h1 = t.add_host("h1").unwrap();
    let options = NodeOptions { default_routes: vec![ip("10.0.0.254")], ..Default::default() };
    let h2 = t.add_node("h2", NodeRole::Host, options).unwrap();
    let s1 = t.add_switch("s1").unwrap();
    let links = t.add_links(&[(r1, s1), (s1, h1), (s1, h2)]).unwrap();
    t.add_static_address(links[1], h1, net("10.0.0.5/24")).unwrap();

    // without declared subnet, the domain cannot be completed
    assert_eq!(
        run(&t, &[], &v4_only()),
        Err(AllocationError::PartiallyStaticDomain {
            domain: DomainId(0),
            family: AddressFamily::Ipv4
        })
    );

    // with a declared subnet, the remaining addresses are allocated around the static one
    let subnets = vec![Subnet::new(vec![r1, h1, h2], vec![net("10.0.0.0/24")])];
    let a = run(&t, &subnets, &v4_only()).unwrap();
    let itf = |node, link| t.interface_on(node, link).unwrap();
    assert_eq!(a.addresses(itf(r1, links[0])), &[net("10.0.0.1/24")]);
    assert_eq!(a.addresses(itf(h1, links[1])), &[net("10.0.0.5/24")]);
    assert_eq!(a.addresses(itf(h2, links[2])), &[net("10.0.0.2/24")]);

    // static addresses must lie inside the declared subnet
    let subnets = vec![Subnet::new(vec![r1, h1, h2], vec![net("10.1.0.0/24")])];
    assert_eq!(
        run(&t, &subnets, &v4_only()),
        Err(AllocationError::StaticOutsideSubnet {
            address: net("10.0.0.5/24"),
            prefix: net("10.1.0.0/24"),
        })
    );

    // h2 has a static default route
    assert_eq!(a.default_route(h1, AddressFamily::Ipv4), Some(ip("10.0.0.1")));
    assert_eq!(a.default_route(h2, AddressFamily::Ipv4), None);
}

#[test]
fn overlapping_static_addresses() {
    let mut t = Topology::new();
    let r1 = t.add_router("r1").unwrap();
    let r2 = t.add_router("r2").unwrap();
    let r3 = t.add_router("r3").unwrap();
    let links = t.add_links(&[(r1, r2), (r2, r3)]).unwrap();
    t.add_static_address(links[0], r1, net("10.0.0.1/24")).unwrap();
    t.add_static_address(links[0], r2, net("10.0.0.2/24")).unwrap();
    t.add_static_address(links[1], r2, net("10.0.0.5/24")).unwrap();
    t.add_static_address(links[1], r3, net("10.0.0.6/24")).unwrap();

    assert!(matches!(
        run(&t, &[], &v4_only()),
        Err(AllocationError::OverlappingPrefix {
            owner: PrefixOwner::Domain(DomainId(1)),
            other_owner: PrefixOwner::Domain(DomainId(0)),
            ..
        })
    ));
}

#[test]
fn pool_exhausted() {
    let mut t = Topology::new();
    let r1 = t.add_router("r1").unwrap();
    let r2 = t.add_router("r2").unwrap();
    let r3 = t.add_router("r3").unwrap();
    t.add_links(&[(r1, r2), (r2, r3)]).unwrap();

    let settings =
        AllocationSettings { v4_links: PoolSettings::new(net("10.0.0.0/30"), 30), ..v4_only() };
    assert_eq!(
        run(&t, &[], &settings),
        Err(AllocationError::PoolExhausted { pool: net("10.0.0.0/30"), prefix_len: 30 })
    );

    // a domain larger than the whole pool
    let mut t = Topology::new();
    let r1 = t.add_router("r1").unwrap();
    let h1 = t.add_host("h1").unwrap();
    let h2 = t.add_host("h2").unwrap();
    let s1 = t.add_switch("s1").unwrap();
    t.add_links(&[(r1, s1), (h1, s1), (h2, s1)]).unwrap();
    assert_eq!(
        run(&t, &[], &settings),
        Err(AllocationError::PoolExhausted { pool: net("10.0.0.0/30"), prefix_len: 29 })
    );
}

#[test]
fn wide_interfaces() {
    let mut t = Topology::new();
    let r1 = t.add_router("r1").unwrap();
    let r2 = t.add_router("r2").unwrap();
    let r3 = t.add_router("r3").unwrap();
    let links = t.add_links(&[(r1, r2), (r2, r3)]).unwrap();
    let wide = AddressingOptions { v4_width: 300, v6_width: 2, ..Default::default() };
    t.set_addressing(links[0], r1, wide).unwrap();

    let a = run(&t, &[], &AllocationSettings::default()).unwrap();

    // the domain needs 301 addresses, which does not fit into the default /24
    assert_eq!(a.prefix(DomainId(0), AddressFamily::Ipv4), Some(net("192.168.0.0/23")));
    assert_eq!(a.prefix(DomainId(1), AddressFamily::Ipv4), Some(net("192.168.2.0/24")));

    let r1_itf = t.interface_on(r1, links[0]).unwrap();
    let r2_itf = t.interface_on(r2, links[0]).unwrap();
    assert_eq!(a.addresses_of(r1_itf, AddressFamily::Ipv4).count(), 300);
    assert_eq!(a.addresses_of(r1_itf, AddressFamily::Ipv6).count(), 2);
    assert_eq!(a.first_address(r2_itf, AddressFamily::Ipv4), Some(ip("192.168.1.45")));
    // IPv4 addresses come first
    assert_eq!(AddressFamily::of(&a.addresses(r2_itf)[0]), AddressFamily::Ipv4);
    assert_eq!(AddressFamily::of(&a.addresses(r2_itf)[1]), AddressFamily::Ipv6);
}

#[test]
fn disabled_family() {
    let mut t = Topology::new();
    let r1 = t.add_router("r1").unwrap();
    let no_v6 = NodeOptions { use_v6: false, ..Default::default() };
    let no_v4 = NodeOptions { use_v4: false, ..Default::default() };
    let h1 = t.add_node("h1", NodeRole::Host, no_v6).unwrap();
    let r2 = t.add_node("r2", NodeRole::Router, no_v4).unwrap();
    let links = t.add_links(&[(r1, h1), (r1, r2)]).unwrap();

    let a = run(&t, &[], &AllocationSettings::default()).unwrap();
    let h1_itf = t.interface_on(h1, links[0]).unwrap();
    let r2_itf = t.interface_on(r2, links[1]).unwrap();
    assert_eq!(a.addresses_of(h1_itf, AddressFamily::Ipv4).count(), 1);
    assert_eq!(a.addresses_of(h1_itf, AddressFamily::Ipv6).count(), 0);
    assert_eq!(a.addresses_of(r2_itf, AddressFamily::Ipv4).count(), 0);
    assert_eq!(a.addresses_of(r2_itf, AddressFamily::Ipv6).count(), 1);
    assert!(a.loopback(r2, AddressFamily::Ipv4).is_none());
    assert!(a.loopback(r2, AddressFamily::Ipv6).is_some());
    assert!(a.default_route(h1, AddressFamily::Ipv6).is_none());
}

#[test]
fn partial_static_network() {
    let (t, overlays) = PartialStaticNet::build().unwrap();
    let a = run(&t, &overlays.subnets, &AllocationSettings::default()).unwrap();
    let n = |name: &str| t.get_node_id(name).unwrap();
    let itf = |name: &str| t.interfaces().find(|i| i.name() == name).unwrap().id();

    // static LAN
    assert_eq!(a.addresses(itf("r2-eth1")), &[net("192.168.1.1/24"), net("fc00:1::1/64")]);
    assert_eq!(a.addresses(itf("h3-eth0")), &[net("192.168.1.2/24"), net("fc00:1::2/64")]);
    assert_eq!(a.prefix(DomainId(3), AddressFamily::Ipv4), Some(net("192.168.1.0/24")));
    assert_eq!(a.default_route(n("h3"), AddressFamily::Ipv4), Some(ip("192.168.1.1")));
    assert_eq!(a.default_route(n("h3"), AddressFamily::Ipv6), Some(ip("fc00:1::1")));

    // declared subnet
    assert_eq!(a.addresses(itf("r1-eth1")), &[net("192.168.0.1/24"), net("fc00::1/64")]);
    assert_eq!(a.addresses(itf("r2-eth0")), &[net("192.168.0.2/24"), net("fc00::2/64")]);

    // allocated domains skip both the declared and the static prefixes
    assert_eq!(a.prefix(DomainId(0), AddressFamily::Ipv4), Some(net("192.168.2.0/24")));
    assert_eq!(a.prefix(DomainId(2), AddressFamily::Ipv4), Some(net("192.168.3.0/24")));
    assert_eq!(a.prefix(DomainId(0), AddressFamily::Ipv6), Some(net("fc00:0:1::/48")));
    assert_eq!(a.prefix(DomainId(2), AddressFamily::Ipv6), Some(net("fc00:0:2::/48")));
    assert_eq!(a.first_address(itf("h2-eth0"), AddressFamily::Ipv4), Some(ip("192.168.3.2")));
    assert_eq!(a.default_route(n("h4"), AddressFamily::Ipv4), Some(ip("192.168.3.1")));

    // static loopback of r1
    assert_eq!(a.loopback(n("r1"), AddressFamily::Ipv6), Some(ip("2042:1::1")));
    assert!(a.loopback(n("r1"), AddressFamily::Ipv4).is_some());
}

#[test]
fn static_only() {
    let (t, overlays) = PartialStaticNet::build().unwrap();
    let settings = AllocationSettings { allocate_ips: false, ..Default::default() };
    let a = run(&t, &overlays.subnets, &settings).unwrap();
    let itf = |name: &str| t.interfaces().find(|i| i.name() == name).unwrap().id();

    assert_eq!(a.addresses(itf("h3-eth0")), &[net("192.168.1.2/24"), net("fc00:1::2/64")]);
    assert!(a.addresses(itf("r1-eth0")).is_empty());
    assert!(a.addresses(itf("r1-eth1")).is_empty());
    assert!(a.prefix(DomainId(0), AddressFamily::Ipv4).is_none());
    assert_eq!(a.prefix(DomainId(3), AddressFamily::Ipv4), Some(net("192.168.1.0/24")));

    let r1 = t.get_node_id("r1").unwrap();
    let r2 = t.get_node_id("r2").unwrap();
    assert_eq!(a.loopbacks(r1), &[net("2042:1::1/64")]);
    assert!(a.loopbacks(r2).is_empty());
}
