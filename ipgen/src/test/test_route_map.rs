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


use crate::policy::route_map::RouteMapMatch as Match;
use crate::policy::route_map::RouteMapSet as Set;
use crate::policy::route_map::RouteMapState::*;
use crate::policy::route_map::*;
use crate::policy::{AccessList, Community, CommunityList, ListSet, PrefixList};
use crate::policy::ResolvedCommunityList;
use crate::printer;
use crate::topology::{AddressFamily, AsId};

use ipnet::IpNet;
use maplit::btreemap;
use std::net::IpAddr;

fn net(s: &str) -> IpNet {
    s.parse().unwrap()
}

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

fn get_lists() -> ListSet {
    let tagged = CommunityList::new("tagged", Community::Local(10));
    ListSet {
        access_lists: btreemap! {
            "internal".to_string() => AccessList::new("internal")
                .deny(net("10.0.0.0/24"))
                .permit(net("10.0.0.0/8")),
            "neighbors".to_string() => AccessList::new("neighbors").permit(net("192.168.0.0/16")),
        },
        prefix_lists: btreemap! {
            "customers".to_string() => PrefixList::new("customers", AddressFamily::Ipv6)
                .deny(net("2001:db8::/32"))
                .entry(Allow, net("2001:db8::/32"), Some(48), Some(56)),
        },
        community_lists: btreemap! {
            "tagged".to_string() => ResolvedCommunityList::resolve(&tagged, AsId(65000)),
        },
    }
}

#[test]
fn simple_matches() {
    let lists = get_lists();
    let default_route = Route::new(net("10.1.0.0/16"), ip("192.168.0.1"));

    // Match on an access list, first matching entry decides
    let map = RouteMapBuilder::new().order(10).deny().match_access_list("internal").build();
    let mut route = default_route.clone();
    assert_eq!(map.apply(route.clone(), &lists).0, true);
    route.prefix = net("10.0.0.0/25");
    assert_eq!(map.apply(route.clone(), &lists).0, false);
    route.prefix = net("172.16.0.0/16");
    assert_eq!(map.apply(route.clone(), &lists).0, false);
    route.prefix = net("2001:db8::/32");
    assert_eq!(map.apply(route.clone(), &lists).0, false);

    // Match on the next hop
    let map = RouteMapBuilder::new().order(10).deny().match_next_hop("neighbors").build();
    let mut route = default_route.clone();
    assert_eq!(map.apply(route.clone(), &lists).0, true);
    route.next_hop = ip("10.0.0.1");
    assert_eq!(map.apply(route.clone(), &lists).0, false);

    // Match on a prefix list with a length range
    let map = RouteMapBuilder::new().order(10).deny().match_prefix_list("customers").build();
    let mut route = default_route.clone();
    route.prefix = net("2001:db8:1::/48");
    assert_eq!(map.apply(route.clone(), &lists).0, true);
    route.prefix = net("2001:db8:1:100::/56");
    assert_eq!(map.apply(route.clone(), &lists).0, true);
    route.prefix = net("2001:db8:1:100::/64");
    assert_eq!(map.apply(route.clone(), &lists).0, false);
    route.prefix = net("2001:db8::/32");
    assert_eq!(map.apply(route.clone(), &lists).0, false);
    route.prefix = net("2001:db9::/48");
    assert_eq!(map.apply(route.clone(), &lists).0, false);

    // Match on a community, rendered for the AS
    let map = RouteMapBuilder::new().order(10).deny().match_community("tagged").build();
    let route = default_route.clone();
    assert_eq!(map.apply(route.clone(), &lists).0, false);
    assert_eq!(map.apply(route.clone().with_community("65000:10"), &lists).0, true);
    assert_eq!(map.apply(route.with_community("10"), &lists).0, false);

    // Unknown lists never match
    let map = RouteMapBuilder::new().order(10).deny().match_access_list("unknown").build();
    assert_eq!(map.apply(default_route.clone(), &lists).0, false);

    // Conditions are connected in an and
    let map = RouteMapBuilder::new()
        .order(10)
        .deny()
        .match_access_list("internal")
        .match_next_hop("neighbors")
        .build();
    let mut route = default_route.clone();
    assert_eq!(map.apply(route.clone(), &lists).0, true);
    route.next_hop = ip("10.0.0.1");
    assert_eq!(map.apply(route.clone(), &lists).0, false);

    // No condition matches everything
    let map = RouteMapEntry::permit_all(DEFAULT_POLICY_ORDER);
    let expected = default_route.clone();
    assert_eq!(map.apply(default_route, &lists), (true, Some(expected)));
}

#[test]
fn overwrite() {
    let lists = get_lists();
    let default_route = Route::new(net("10.1.0.0/16"), ip("192.168.0.1"));

    let map = RouteMapBuilder::new()
        .order(10)
        .allow()
        .set_local_pref(200)
        .set_med(5)
        .set_community("65000:20")
        .build();
    assert_eq!(
        map.actions(),
        &[Set::LocalPref(200), Set::Med(5), Set::Community("65000:20".to_string())]
    );
    let route = map.apply(default_route.clone(), &lists).1.unwrap();
    assert_eq!(route.local_pref, Some(200));
    assert_eq!(route.local_pref(), 200);
    assert_eq!(route.med, Some(5));
    assert_eq!(route.communities, vec!["65000:20".to_string()]);

    // communities are additive and not duplicated
    let route = map.apply(route.with_community("65000:30"), &lists).1.unwrap();
    assert_eq!(route.communities, vec!["65000:20".to_string(), "65000:30".to_string()]);

    // deny entries drop the route, their set actions are discarded
    let map = RouteMapBuilder::new().order(10).deny().set_local_pref(200).build();
    assert!(map.actions().is_empty());
    assert_eq!(map.apply(default_route.clone(), &lists), (true, None));

    // entries that do not match leave the route untouched
    let map = RouteMapBuilder::new()
        .order(10)
        .allow()
        .match_community("tagged")
        .set_local_pref(200)
        .build();
    assert_eq!(map.apply(default_route.clone(), &lists), (false, Some(default_route.clone())));
    assert_eq!(default_route.local_pref(), 100);
}

#[test]
fn first_match() {
    let lists = get_lists();
    let entries = vec![
        RouteMapBuilder::new()
            .order(10)
            .allow()
            .match_access_list("internal")
            .set_local_pref(50)
            .build(),
        RouteMapBuilder::new().order(20).deny().match_community("tagged").build(),
        RouteMapBuilder::new()
            .order(SYNTHESIZED_ORDER_BASE)
            .allow()
            .set_local_pref(150)
            .build(),
    ];
    let map = RouteMap {
        name: RouteMap::make_name("r2", AddressFamily::Ipv4, RouteMapDirection::Incoming),
        neighbor: 1.into(),
        family: AddressFamily::Ipv4,
        direction: RouteMapDirection::Incoming,
        entries,
    };
    assert_eq!(map.name, "r2-ipv4-in");
    assert_eq!(map.user_entries().count(), 2);
    assert_eq!(map.synthesized_entries().count(), 1);
    assert_eq!(map.entry(20).unwrap().conds(), &[Match::Community("tagged".to_string())]);
    assert!(map.entry(30).is_none());

    // the first entry matches, even if the route is tagged
    let route = Route::new(net("10.1.0.0/16"), ip("192.168.0.1")).with_community("65000:10");
    assert_eq!(map.apply(route, &lists).unwrap().local_pref, Some(50));

    // the second entry denies tagged routes
    let route = Route::new(net("172.16.0.0/16"), ip("192.168.0.1")).with_community("65000:10");
    assert_eq!(map.apply(route, &lists), None);

    // the last entry catches all other routes
    let route = Route::new(net("172.16.0.0/16"), ip("192.168.0.1"));
    assert_eq!(map.apply(route, &lists).unwrap().local_pref, Some(150));

    // without a catch-all, unmatched routes are denied
    let mut map = map;
    map.entries.pop();
    let route = Route::new(net("172.16.0.0/16"), ip("192.168.0.1"));
    assert_eq!(map.apply(route, &lists), None);
}

#[test]
fn continued_entries() {
    let lists = get_lists();
    let map = |entries: Vec<RouteMapEntry>| RouteMap {
        name: "r2-ipv4-out".to_string(),
        neighbor: 1.into(),
        family: AddressFamily::Ipv4,
        direction: RouteMapDirection::Outgoing,
        entries,
    };
    let route = Route::new(net("10.1.0.0/16"), ip("192.168.0.1"));
    let deny_tagged = RouteMapBuilder::new()
        .order(SYNTHESIZED_ORDER_BASE)
        .deny()
        .match_community("tagged")
        .build();

    // both set actions apply
    let map_next = map(vec![
        RouteMapBuilder::new().order(10).allow().set_med(50).continue_next().build(),
        RouteMapBuilder::new()
            .order(20)
            .allow()
            .set_community("65000:42")
            .continue_next()
            .build(),
        deny_tagged.clone(),
        RouteMapEntry::permit_all(DEFAULT_POLICY_ORDER),
    ]);
    let out = map_next.apply(route.clone(), &lists).unwrap();
    assert_eq!(out.med, Some(50));
    assert_eq!(out.communities, vec!["65000:42".to_string()]);

    // a continued entry does not skip a later deny
    assert_eq!(map_next.apply(route.clone().with_community("65000:10"), &lists), None);

    // goto skips the entries in between
    let map_goto = map(vec![
        RouteMapBuilder::new().order(10).allow().continue_at(SYNTHESIZED_ORDER_BASE).build(),
        RouteMapBuilder::new().order(20).deny().build(),
        deny_tagged.clone(),
        RouteMapEntry::permit_all(DEFAULT_POLICY_ORDER),
    ]);
    assert!(map_goto.apply(route.clone(), &lists).is_some());
    assert_eq!(map_goto.apply(route.clone().with_community("65000:10"), &lists), None);

    // without a later match, the route is accepted with the actions applied so far
    let map_open =
        map(vec![RouteMapBuilder::new().order(10).allow().set_med(7).continue_next().build()]);
    assert_eq!(map_open.apply(route.clone(), &lists).unwrap().med, Some(7));

    // deny entries always end the evaluation
    let deny = RouteMapBuilder::new().order(10).deny().continue_next().build();
    assert_eq!(deny.on_match(), OnMatch::Exit);
}

#[test]
fn rendering() {
    let entry = RouteMapBuilder::new()
        .order(10)
        .state(Allow)
        .cond(Match::PrefixList("customers".to_string()))
        .add_set(Set::Community("65000:1".to_string()))
        .build();
    assert_eq!(entry.state(), Allow);
    assert!(!entry.is_synthesized());
    assert_eq!(entry.conds()[0].list_name(), "customers");
    assert_eq!(entry.conds()[0].to_string(), "ip address prefix-list customers");
    assert_eq!(entry.actions()[0].to_string(), "community 65000:1 additive");
    assert_eq!(Set::LocalPref(80).to_string(), "local-preference 80");
    assert_eq!(Deny.to_string(), "deny");
    assert_eq!(RouteMapDirection::Outgoing.to_string(), "out");
    assert_eq!(
        printer::route_map_entry(&entry),
        "permit 10: match [ip address prefix-list customers] set [community 65000:1 additive]"
    );

    let entry = RouteMapBuilder::new().order(20).allow().set_med(5).continue_next().build();
    assert_eq!(printer::route_map_entry(&entry), "permit 20 set [metric 5] on-match next");
    let entry = RouteMapBuilder::new().order(30).allow().continue_at(60000).build();
    assert_eq!(entry.on_match().to_string(), "on-match goto 60000");
}

#[test]
#[should_panic]
fn builder_backwards_goto() {
    RouteMapBuilder::new().order(20).allow().continue_at(10).build();
}

#[test]
#[should_panic]
fn builder_without_state() {
    RouteMapBuilder::new().order(10).build();
}
