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


//! Test the declaration of topologies, and the validation of their options.

use crate::topology::options::DEFAULT_IGP_AREA;
use crate::topology::*;

use ipnet::IpNet;

#[test]
fn interface_names() {
    let mut t = Topology::new();
    let r1 = t.add_router("r1").unwrap();
    let r2 = t.add_router("r2").unwrap();
    let s1 = t.add_switch("s1").unwrap();

    let l1 = t.add_link(r1, r2).unwrap();
    let l2 = t.add_link(r1, s1).unwrap();

    let (a, b) = t.link_interfaces(l1).unwrap();
    assert_eq!(t.get_interface(a).unwrap().name(), "r1-eth0");
    assert_eq!(t.get_interface(b).unwrap().name(), "r2-eth0");
    let r1_eth1 = t.interface_on(r1, l2).unwrap();
    assert_eq!(t.get_interface(r1_eth1).unwrap().name(), "r1-eth1");
    assert_eq!(t.get_interface(t.peer(r1_eth1).unwrap()).unwrap().name(), "s1-eth0");

    assert_eq!(t.get_node(r1).unwrap().interfaces().len(), 2);
    assert_eq!(t.links(), &[l1, l2]);
    assert_eq!(t.interface_role(r1_eth1).unwrap(), NodeRole::Router);
}

#[test]
fn node_lookup() {
    let mut t = Topology::new();
    let r1 = t.add_router("r1").unwrap();
    let h1 = t.add_host("h1").unwrap();
    let hub = t.add_hub("hub").unwrap();

    assert_eq!(t.get_node_id("r1"), Ok(r1));
    assert_eq!(t.get_node_id("h1"), Ok(h1));
    assert_eq!(t.get_node_name(hub), Ok("hub"));
    assert_eq!(t.get_node_id("r2"), Err(TopologyError::NodeNameNotFound("r2".to_string())));
    assert_eq!(t.num_nodes(), 3);
    assert_eq!(t.nodes_with_role(NodeRole::Hub).map(|n| n.id()).collect::<Vec<_>>(), vec![hub]);
    assert_eq!(t.nodes().map(|n| n.name()).collect::<Vec<_>>(), vec!["r1", "h1", "hub"]);
}

#[test]
fn ill_formed_graph() {
    let mut t = Topology::new();
    let r1 = t.add_router("r1").unwrap();
    let r2 = t.add_router("r2").unwrap();
    let r3 = t.add_router("r3").unwrap();

    assert_eq!(t.add_router("r1"), Err(TopologyError::DuplicateName("r1".to_string())));
    assert_eq!(t.add_link(r1, r1), Err(TopologyError::SelfLink("r1".to_string())));

    let l = t.add_link(r1, r2).unwrap();
    assert_eq!(
        t.interface_on(r3, l),
        Err(TopologyError::NotAnEndpoint { node: "r3".to_string(), link: l })
    );
}

#[test]
fn loopback_only_on_routers() {
    let mut t = Topology::new();
    let lo: IpNet = "10.0.0.1/32".parse().unwrap();
    let options = NodeOptions { lo_addresses: vec![lo], ..Default::default() };

    assert!(t.add_node("r1", NodeRole::Router, options.clone()).is_ok());
    assert_eq!(
        t.add_node("h1", NodeRole::Host, options.clone()),
        Err(TopologyError::LoopbackOnNonRouter("h1".to_string()))
    );
    let h1 = t.add_host("h1").unwrap();
    assert_eq!(
        t.set_node_options(h1, options),
        Err(TopologyError::LoopbackOnNonRouter("h1".to_string()))
    );
}

#[test]
fn addressing_options() {
    let mut t = Topology::new();
    let r1 = t.add_router("r1").unwrap();
    let h1 = t.add_host("h1").unwrap();
    let s1 = t.add_switch("s1").unwrap();
    let l1 = t.add_link(r1, s1).unwrap();
    let l2 = t.add_link(s1, h1).unwrap();
    let addr: IpNet = "10.0.0.1/24".parse().unwrap();

    // switch ports never carry an address
    assert_eq!(
        t.add_static_address(l1, s1, addr),
        Err(TopologyError::AddressOnRelay("s1-eth0".to_string()))
    );

    // router advertisements are sent by routers only
    let ra = AddressingOptions { router_advertisement: true, ..Default::default() };
    assert!(t.set_addressing(l1, r1, ra.clone()).is_ok());
    assert_eq!(
        t.set_addressing(l2, h1, ra),
        Err(TopologyError::OptionNotApplicable {
            option: "router_advertisement",
            node: "h1".to_string(),
            role: NodeRole::Host
        })
    );

    // static addresses accumulate
    t.add_static_address(l2, h1, addr).unwrap();
    t.add_static_address(l2, h1, "fc00::2/64".parse().unwrap()).unwrap();
    let itf = t.get_interface(t.interface_on(h1, l2).unwrap()).unwrap();
    assert!(itf.addressing().has_static(AddressFamily::Ipv4));
    assert!(itf.addressing().has_static(AddressFamily::Ipv6));
    assert_eq!(itf.addressing().static_addresses(AddressFamily::Ipv4).count(), 1);

    // the interface on the router kept the router advertisement
    let itf = t.get_interface(t.interface_on(r1, l1).unwrap()).unwrap();
    assert!(itf.addressing().router_advertisement);
    assert!(!itf.addressing().has_static(AddressFamily::Ipv4));
}

#[test]
fn igp_and_stp_options() {
    let mut t = Topology::new();
    let r1 = t.add_router("r1").unwrap();
    let r2 = t.add_router("r2").unwrap();
    let s1 = t.add_switch("s1").unwrap();
    let l1 = t.add_link(r1, r2).unwrap();
    let l2 = t.add_link(r1, s1).unwrap();

    // metric must be at least 1
    assert!(matches!(
        t.set_link_igp(l1, IgpOptions { metric: 0, ..Default::default() }),
        Err(TopologyError::InvalidOption(_))
    ));
    t.set_link_igp(l1, IgpOptions { metric: 5, ..Default::default() }).unwrap();
    t.set_igp(l1, r2, IgpOptions { metric: 7, passive: true, ..Default::default() }).unwrap();
    let (a, b) = t.link_interfaces(l1).unwrap();
    assert_eq!(t.get_interface(a).unwrap().igp().metric, 5);
    assert_eq!(t.get_interface(b).unwrap().igp().metric, 7);
    assert!(t.get_interface(b).unwrap().igp().passive);
    assert_eq!(t.get_interface(a).unwrap().igp().area, DEFAULT_IGP_AREA);

    // bandwidth is set on both ends
    t.set_link_bandwidth(l1, 100).unwrap();
    assert_eq!(t.get_interface(a).unwrap().bandwidth(), Some(100));
    assert_eq!(t.get_interface(b).unwrap().bandwidth(), Some(100));

    // stp options only on switches
    assert_eq!(t.get_node(s1).unwrap().stp(), Some(&StpOptions::default()));
    assert_eq!(t.get_node(r1).unwrap().stp(), None);
    assert!(matches!(
        t.set_stp(s1, StpOptions { priority: 1000 }),
        Err(TopologyError::InvalidOption(_))
    ));
    t.set_stp(s1, StpOptions { priority: 8192 }).unwrap();
    assert_eq!(t.get_node(s1).unwrap().stp().map(|s| s.priority), Some(8192));
    assert!(matches!(
        t.set_stp(r1, StpOptions::default()),
        Err(TopologyError::OptionNotApplicable { option: "stp", .. })
    ));
    t.set_stp_cost(l2, s1, 4).unwrap();
    assert_eq!(t.get_interface(t.interface_on(s1, l2).unwrap()).unwrap().stp_cost(), Some(4));
    assert!(t.set_stp_cost(l2, r1, 4).is_err());
}
