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

//! # Route-Maps
//!
//! This module contains the resolved route-map entries, as they are handed to the renderer, and
//! an evaluator to check them offline against a [`Route`].

use crate::policy::lists::ListSet;
use crate::topology::{AddressFamily, NodeId};

use ipnet::IpNet;
use std::fmt;
use std::net::IpAddr;

/// Order of the permit-all entry that terminates every route-map.
pub const DEFAULT_POLICY_ORDER: usize = 65535;
/// Orders at or above this value are reserved for synthesized entries.
pub const SYNTHESIZED_ORDER_BASE: usize = 60000;
/// Step between two consecutive entries without an explicit order.
pub const ORDER_STEP: usize = 10;

/// A route, as seen by a route-map. Only the attributes a route-map can match on or modify are
/// present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Destination prefix
    pub prefix: IpNet,
    /// Next hop of the route
    pub next_hop: IpAddr,
    /// LOCAL-PREF (`None` means the default of 100)
    pub local_pref: Option<u32>,
    /// MED (`None` means the default of 0)
    pub med: Option<u32>,
    /// Communities attached to the route
    pub communities: Vec<String>,
}

impl Route {
    /// Create a new route without any optional attributes
    pub fn new(prefix: IpNet, next_hop: IpAddr) -> Self {
        Self { prefix, next_hop, local_pref: None, med: None, communities: Vec::new() }
    }

    /// Attach a community
    pub fn with_community(mut self, community: impl Into<String>) -> Self {
        self.communities.push(community.into());
        self
    }

    /// Effective local preference
    pub fn local_pref(&self) -> u32 {
        self.local_pref.unwrap_or(100)
    }
}

/// # Route-Map entry
/// A single `permit` or `deny` clause of a route-map, with its sequence number. A matching permit
/// entry ends the evaluation, unless its [`OnMatch`] policy continues with a later entry. Use the
/// [`RouteMapBuilder`] to create one:
///
/// ```
/// # use ipgen::policy::route_map::*;
/// let entry = RouteMapBuilder::new()
///     .order(10)
///     .allow()
///     .match_access_list("internal")
///     .set_local_pref(80)
///     .build();
/// assert_eq!(entry.order(), 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMapEntry {
    /// In which order should the entries be checked. Lower values are checked earlier.
    pub(crate) order: usize,
    /// Either Allow or Deny.
    pub(crate) state: RouteMapState,
    /// Match statements of the entry, connected in an and
    pub(crate) conds: Vec<RouteMapMatch>,
    /// Set actions of the entry
    pub(crate) set: Vec<RouteMapSet>,
    /// What happens after a permit entry matched
    pub(crate) on_match: OnMatch,
}

impl RouteMapEntry {
    /// Generate a new route-map entry
    pub(crate) fn new(
        order: usize,
        state: RouteMapState,
        conds: Vec<RouteMapMatch>,
        set: Vec<RouteMapSet>,
        on_match: OnMatch,
    ) -> Self {
        Self { order, state, conds, set, on_match }
    }

    /// Permit-all entry
    pub fn permit_all(order: usize) -> Self {
        Self::new(order, RouteMapState::Allow, vec![], vec![], OnMatch::Exit)
    }

    /// Apply the entry on a route. The first value tells if the entry matched. If it matched and
    /// the state is `Deny`, the route is dropped (`None`). Otherwise, the set actions are applied.
    pub fn apply(&self, mut route: Route, lists: &ListSet) -> (bool, Option<Route>) {
        match self.matches(&route, lists) {
            true => {
                if self.state.is_deny() {
                    (true, None)
                } else {
                    self.set.iter().for_each(|s| s.apply(&mut route));
                    (true, Some(route))
                }
            }
            false => (false, Some(route)),
        }
    }

    /// Returns the order of the entry.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Returns the state, either Allow or Deny.
    pub fn state(&self) -> RouteMapState {
        self.state
    }

    /// Return a reference to the conditions
    pub fn conds(&self) -> &[RouteMapMatch] {
        &self.conds
    }

    /// Return a reference to the actions
    pub fn actions(&self) -> &[RouteMapSet] {
        &self.set
    }

    /// Returns the exit policy of the entry
    pub fn on_match(&self) -> OnMatch {
        self.on_match
    }

    /// Returns wether the entry matches the route
    pub fn matches(&self, route: &Route, lists: &ListSet) -> bool {
        self.conds.iter().all(|c| c.matches(route, lists))
    }

    /// Returns `true` if the entry was synthesized from the peering role
    pub fn is_synthesized(&self) -> bool {
        self.order >= SYNTHESIZED_ORDER_BASE
    }
}

/// # Route Map Builder
///
/// Convenience type to build a route-map entry. You are required to at least call `order` and
/// `state` once on the builder, before you can call `build`. If you don't add any match statement,
/// the entry matches on any route.
#[derive(Debug, Default)]
pub struct RouteMapBuilder {
    order: Option<usize>,
    state: Option<RouteMapState>,
    conds: Vec<RouteMapMatch>,
    set: Vec<RouteMapSet>,
    on_match: OnMatch,
}

impl RouteMapBuilder {
    /// Create an empty RouteMapBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the order of the entry.
    pub fn order(&mut self, order: usize) -> &mut Self {
        self.order = Some(order);
        self
    }

    /// Set the state of the entry.
    pub fn state(&mut self, state: RouteMapState) -> &mut Self {
        self.state = Some(state);
        self
    }

    /// Set the state of the entry to allow.
    pub fn allow(&mut self) -> &mut Self {
        self.state = Some(RouteMapState::Allow);
        self
    }

    /// Set the state of the entry to deny.
    pub fn deny(&mut self) -> &mut Self {
        self.state = Some(RouteMapState::Deny);
        self
    }

    /// Add a match condition to the entry.
    pub fn cond(&mut self, cond: RouteMapMatch) -> &mut Self {
        self.conds.push(cond);
        self
    }

    /// Match the prefix against an access list
    pub fn match_access_list(&mut self, name: impl Into<String>) -> &mut Self {
        self.conds.push(RouteMapMatch::AccessList(name.into()));
        self
    }

    /// Match the prefix against a prefix list
    pub fn match_prefix_list(&mut self, name: impl Into<String>) -> &mut Self {
        self.conds.push(RouteMapMatch::PrefixList(name.into()));
        self
    }

    /// Match the next hop against an access list
    pub fn match_next_hop(&mut self, name: impl Into<String>) -> &mut Self {
        self.conds.push(RouteMapMatch::NextHop(name.into()));
        self
    }

    /// Match the communities against a community list
    pub fn match_community(&mut self, name: impl Into<String>) -> &mut Self {
        self.conds.push(RouteMapMatch::Community(name.into()));
        self
    }

    /// Add a set expression to the entry.
    pub fn add_set(&mut self, set: RouteMapSet) -> &mut Self {
        self.set.push(set);
        self
    }

    /// Add a set expression, overwriting the Local-Pref
    pub fn set_local_pref(&mut self, local_pref: u32) -> &mut Self {
        self.set.push(RouteMapSet::LocalPref(local_pref));
        self
    }

    /// Add a set expression, overwriting the MED
    pub fn set_med(&mut self, med: u32) -> &mut Self {
        self.set.push(RouteMapSet::Med(med));
        self
    }

    /// Add a set expression, attaching a community
    pub fn set_community(&mut self, community: impl Into<String>) -> &mut Self {
        self.set.push(RouteMapSet::Community(community.into()));
        self
    }

    /// Continue with the next entry after the entry matched (`on-match next`).
    pub fn continue_next(&mut self) -> &mut Self {
        self.on_match = OnMatch::Next;
        self
    }

    /// Continue with the first entry whose order is at least `order` (`on-match goto`).
    pub fn continue_at(&mut self, order: usize) -> &mut Self {
        self.on_match = OnMatch::Goto(order);
        self
    }

    /// Build the route-map entry.
    ///
    /// # Panics
    /// The function panics in the following cases:
    /// - The order is not set (`order` was not called),
    /// - The state is not set (neither `state`, `allow` nor `deny` were called),
    /// - The entry would jump backwards (`continue_at` with an order not above the own order).
    pub fn build(&self) -> RouteMapEntry {
        let order = match self.order {
            Some(o) => o,
            None => panic!("Order was not set for a Route-Map!"),
        };
        let state = match self.state {
            Some(s) => s,
            None => panic!("State was not set for a Route-Map!"),
        };
        if let OnMatch::Goto(target) = self.on_match {
            if target <= order {
                panic!("Route-Map entry {} cannot continue at {}!", order, target);
            }
        }
        let conds = self.conds.clone();
        let (set, on_match) = if state.is_deny() {
            (vec![], OnMatch::Exit)
        } else {
            (self.set.clone(), self.on_match)
        };
        RouteMapEntry::new(order, state, conds, set, on_match)
    }
}

/// State of a route map, which can either be allow or deny
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteMapState {
    /// Set the state to allow
    Allow,
    /// Set the state to deny
    Deny,
}

impl RouteMapState {
    /// Returns `true` if the state is set to `Allow`.
    pub fn is_allow(&self) -> bool {
        self == &Self::Allow
    }

    /// Returns `true` if the state is set to `Deny`.
    pub fn is_deny(&self) -> bool {
        self == &Self::Deny
    }
}

impl fmt::Display for RouteMapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Allow => "permit",
            Self::Deny => "deny",
        })
    }
}

/// Exit policy of a permit entry that matched a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OnMatch {
    /// The route is accepted, no further entry is evaluated
    Exit,
    /// Evaluation continues with the next entry
    Next,
    /// Evaluation continues with the first entry whose order is at least this value
    Goto(usize),
}

impl Default for OnMatch {
    fn default() -> Self {
        Self::Exit
    }
}

impl fmt::Display for OnMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exit => f.write_str("on-match exit"),
            Self::Next => f.write_str("on-match next"),
            Self::Goto(order) => write!(f, "on-match goto {}", order),
        }
    }
}

/// Match statement of a route-map entry, referring to a list of the router by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteMapMatch {
    /// The prefix is permitted by the access list
    AccessList(String),
    /// The prefix is permitted by the prefix list
    PrefixList(String),
    /// The next hop is permitted by the access list
    NextHop(String),
    /// A community of the route is permitted by the community list
    Community(String),
}

impl RouteMapMatch {
    /// Returns true if the route matches the expression. Unknown lists never match.
    pub fn matches(&self, route: &Route, lists: &ListSet) -> bool {
        match self {
            Self::AccessList(name) => {
                lists.access_lists.get(name).map(|l| l.matches(&route.prefix)).unwrap_or(false)
            }
            Self::PrefixList(name) => {
                lists.prefix_lists.get(name).map(|l| l.matches(&route.prefix)).unwrap_or(false)
            }
            Self::NextHop(name) => lists
                .access_lists
                .get(name)
                .map(|l| l.matches_addr(&route.next_hop))
                .unwrap_or(false),
            Self::Community(name) => lists
                .community_lists
                .get(name)
                .map(|l| l.matches(&route.communities))
                .unwrap_or(false),
        }
    }

    /// Name of the referenced list
    pub fn list_name(&self) -> &str {
        match self {
            Self::AccessList(n) | Self::PrefixList(n) | Self::NextHop(n) | Self::Community(n) => n,
        }
    }
}

impl fmt::Display for RouteMapMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessList(n) => write!(f, "ip address {}", n),
            Self::PrefixList(n) => write!(f, "ip address prefix-list {}", n),
            Self::NextHop(n) => write!(f, "ip next-hop {}", n),
            Self::Community(n) => write!(f, "community {}", n),
        }
    }
}

/// Set action, if a route-map entry matches
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteMapSet {
    /// overwrite the local preference
    LocalPref(u32),
    /// overwrite the MED attribute
    Med(u32),
    /// attach a community (additive)
    Community(String),
}

impl RouteMapSet {
    /// Apply the set statement to a route
    pub fn apply(&self, route: &mut Route) {
        match self {
            Self::LocalPref(lp) => route.local_pref = Some(*lp),
            Self::Med(med) => route.med = Some(*med),
            Self::Community(c) => {
                if !route.communities.contains(c) {
                    route.communities.push(c.clone())
                }
            }
        }
    }
}

impl fmt::Display for RouteMapSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalPref(lp) => write!(f, "local-preference {}", lp),
            Self::Med(med) => write!(f, "metric {}", med),
            Self::Community(c) => write!(f, "community {} additive", c),
        }
    }
}

/// Direction of the Route Map
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RouteMapDirection {
    /// Incoming Route Map
    Incoming,
    /// Outgoing Route Map
    Outgoing,
}

impl fmt::Display for RouteMapDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Incoming => "in",
            Self::Outgoing => "out",
        })
    }
}

/// # Route-Map
/// All entries bound to one (neighbor, family, direction), sorted by their order. Evaluation is
/// first-match, and a route matching no entry is denied. A matching permit entry with an
/// [`OnMatch::Next`] or [`OnMatch::Goto`] policy applies its actions and continues. If no later
/// entry matches, the route is accepted with the actions applied so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMap {
    /// Name of the route-map, `<peer>-<family>-<in|out>`
    pub name: String,
    /// The neighbor to which the route-map is bound
    pub neighbor: NodeId,
    /// Address family of the session
    pub family: AddressFamily,
    /// Direction
    pub direction: RouteMapDirection,
    /// Entries, sorted by order
    pub entries: Vec<RouteMapEntry>,
}

impl RouteMap {
    /// Name of a route-map for the given session
    pub fn make_name(peer: &str, family: AddressFamily, direction: RouteMapDirection) -> String {
        format!("{}-{}-{}", peer, family, direction)
    }

    /// Returns the entry with the given order
    pub fn entry(&self, order: usize) -> Option<&RouteMapEntry> {
        self.entries.iter().find(|e| e.order == order)
    }

    /// Entries that were declared by the user
    pub fn user_entries(&self) -> impl Iterator<Item = &RouteMapEntry> {
        self.entries.iter().filter(|e| !e.is_synthesized())
    }

    /// Entries synthesized from the peering role, including the final permit-all
    pub fn synthesized_entries(&self) -> impl Iterator<Item = &RouteMapEntry> {
        self.entries.iter().filter(|e| e.is_synthesized())
    }

    /// Apply the route-map. Returns `None` if the route is denied.
    pub fn apply(&self, route: Route, lists: &ListSet) -> Option<Route> {
        let mut route = route;
        let mut permitted = false;
        let mut skip_below = 0;
        for entry in self.entries.iter() {
            if entry.order < skip_below {
                continue;
            }
            match entry.apply(route, lists) {
                (true, None) => return None,
                (true, Some(r)) => match entry.on_match {
                    OnMatch::Exit => return Some(r),
                    OnMatch::Next => {
                        permitted = true;
                        route = r;
                    }
                    OnMatch::Goto(order) => {
                        permitted = true;
                        skip_below = order;
                        route = r;
                    }
                },
                (false, Some(r)) => route = r,
                (false, None) => return None,
            }
        }
        if permitted {
            Some(route)
        } else {
            None
        }
    }
}
