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

//! # Match lists
//!
//! Access lists, prefix lists and community lists are declared per AS, and referenced by name
//! from policy directives. Every list is first-match: the action of the first matching entry
//! decides, and a value matching no entry is denied.

use crate::policy::route_map::RouteMapState;
use crate::topology::{AddressFamily, AsId};

use ipnet::IpNet;
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

/// A BGP community. Bare numbers are namespaced under the AS number of the router they are
/// configured on, while strings are taken as is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Community {
    /// Community value local to the AS, rendered as `<asn>:<value>`
    Local(u32),
    /// Pre-formed community, rendered as is
    Raw(String),
}

impl Community {
    /// Render the community for the given AS
    pub fn resolve(&self, asn: AsId) -> String {
        match self {
            Self::Local(value) => format!("{}:{}", asn, value),
            Self::Raw(s) => s.clone(),
        }
    }
}

impl From<u32> for Community {
    fn from(value: u32) -> Self {
        Self::Local(value)
    }
}

impl From<&str> for Community {
    fn from(s: &str) -> Self {
        Self::Raw(s.to_string())
    }
}

impl From<String> for Community {
    fn from(s: String) -> Self {
        Self::Raw(s)
    }
}

impl fmt::Display for Community {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(value) => write!(f, "<asn>:{}", value),
            Self::Raw(s) => f.write_str(s),
        }
    }
}

/// Entry of an access list. An entry without a prefix matches anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessListEntry {
    /// Permit or deny
    pub action: RouteMapState,
    /// Matched prefix, `None` means `any`
    pub prefix: Option<IpNet>,
}

/// # Access list
/// Matches prefixes (and next hops) by containment.
///
/// ```
/// # use ipgen::policy::AccessList;
/// # use ipgen::topology::AddressFamily;
/// let acl = AccessList::new("internal").permit("10.0.0.0/8".parse().unwrap()).deny_any();
/// assert!(acl.matches(&"10.2.0.0/16".parse().unwrap()));
/// assert!(!acl.matches(&"11.0.0.0/8".parse().unwrap()));
/// assert!(acl.supports(AddressFamily::Ipv6));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessList {
    /// Name of the list
    pub name: String,
    /// Entries, in evaluation order
    pub entries: Vec<AccessListEntry>,
}

impl AccessList {
    /// Create an empty access list
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), entries: Vec::new() }
    }

    /// Create an access list matching everything
    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name).permit_any()
    }

    /// Add a permit entry
    pub fn permit(mut self, prefix: IpNet) -> Self {
        self.entries.push(AccessListEntry { action: RouteMapState::Allow, prefix: Some(prefix) });
        self
    }

    /// Add a deny entry
    pub fn deny(mut self, prefix: IpNet) -> Self {
        self.entries.push(AccessListEntry { action: RouteMapState::Deny, prefix: Some(prefix) });
        self
    }

    /// Add a permit entry matching anything
    pub fn permit_any(mut self) -> Self {
        self.entries.push(AccessListEntry { action: RouteMapState::Allow, prefix: None });
        self
    }

    /// Add a deny entry matching anything
    pub fn deny_any(mut self) -> Self {
        self.entries.push(AccessListEntry { action: RouteMapState::Deny, prefix: None });
        self
    }

    /// Returns `true` if the list has at least one entry applicable to the family
    pub fn supports(&self, family: AddressFamily) -> bool {
        self.entries
            .iter()
            .any(|e| e.prefix.map(|p| AddressFamily::of(&p) == family).unwrap_or(true))
    }

    /// Returns `true` if the prefix is permitted by the list
    pub fn matches(&self, prefix: &IpNet) -> bool {
        self.entries
            .iter()
            .find(|e| e.prefix.map(|p| p.contains(prefix)).unwrap_or(true))
            .map(|e| e.action.is_allow())
            .unwrap_or(false)
    }

    /// Returns `true` if the address is permitted by the list
    pub fn matches_addr(&self, addr: &IpAddr) -> bool {
        self.matches(&IpNet::from(*addr))
    }
}

/// Entry of a prefix list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixListEntry {
    /// Permit or deny
    pub action: RouteMapState,
    /// Matched prefix
    pub prefix: IpNet,
    /// Minimal prefix length of the matched route
    pub ge: Option<u8>,
    /// Maximal prefix length of the matched route
    pub le: Option<u8>,
}

impl PrefixListEntry {
    /// Returns `true` if the route prefix falls into the entry. Without `ge` and `le`, only the
    /// exact prefix matches.
    pub fn covers(&self, route: &IpNet) -> bool {
        if !self.prefix.contains(route) {
            return false;
        }
        let len = route.prefix_len();
        match (self.ge, self.le) {
            (None, None) => len == self.prefix.prefix_len(),
            (ge, le) => {
                len >= ge.unwrap_or_else(|| self.prefix.prefix_len())
                    && len <= le.unwrap_or_else(|| self.prefix.max_prefix_len())
            }
        }
    }
}

/// # Prefix list
/// Matches route prefixes of a single family, optionally with a range of prefix lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixList {
    /// Name of the list
    pub name: String,
    /// Family of the list
    pub family: AddressFamily,
    /// Entries, in evaluation order
    pub entries: Vec<PrefixListEntry>,
}

impl PrefixList {
    /// Create an empty prefix list
    pub fn new(name: impl Into<String>, family: AddressFamily) -> Self {
        Self { name: name.into(), family, entries: Vec::new() }
    }

    /// Add an entry
    pub fn entry(
        mut self,
        action: RouteMapState,
        prefix: IpNet,
        ge: Option<u8>,
        le: Option<u8>,
    ) -> Self {
        self.entries.push(PrefixListEntry { action, prefix, ge, le });
        self
    }

    /// Add a permit entry matching the exact prefix
    pub fn permit(self, prefix: IpNet) -> Self {
        self.entry(RouteMapState::Allow, prefix, None, None)
    }

    /// Add a deny entry matching the exact prefix
    pub fn deny(self, prefix: IpNet) -> Self {
        self.entry(RouteMapState::Deny, prefix, None, None)
    }

    /// Returns `true` if the list is of the given family
    pub fn supports(&self, family: AddressFamily) -> bool {
        self.family == family
    }

    /// Returns `true` if the route prefix is permitted by the list
    pub fn matches(&self, route: &IpNet) -> bool {
        self.entries
            .iter()
            .find(|e| e.covers(route))
            .map(|e| e.action.is_allow())
            .unwrap_or(false)
    }
}

/// # Community list
/// Matches routes carrying a community.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunityList {
    /// Name of the list
    pub name: String,
    /// Matched community
    pub community: Community,
    /// Permit or deny
    pub action: RouteMapState,
}

impl CommunityList {
    /// Create a community list permitting the given community
    pub fn new(name: impl Into<String>, community: impl Into<Community>) -> Self {
        Self { name: name.into(), community: community.into(), action: RouteMapState::Allow }
    }
}

/// A community list whose community is rendered for a specific AS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommunityList {
    /// Name of the list
    pub name: String,
    /// Community, formed as `<asn>:<value>` or passed through
    pub community: String,
    /// Permit or deny
    pub action: RouteMapState,
}

impl ResolvedCommunityList {
    /// Resolve a community list for the AS
    pub fn resolve(list: &CommunityList, asn: AsId) -> Self {
        Self {
            name: list.name.clone(),
            community: list.community.resolve(asn),
            action: list.action,
        }
    }

    /// Returns `true` if any of the communities is permitted by the list
    pub fn matches(&self, communities: &[String]) -> bool {
        self.action.is_allow() && communities.iter().any(|c| c == &self.community)
    }
}

/// All lists of one router, keyed by name. Route-map entries refer to these lists by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSet {
    /// Access lists
    pub access_lists: BTreeMap<String, AccessList>,
    /// Prefix lists
    pub prefix_lists: BTreeMap<String, PrefixList>,
    /// Community lists
    pub community_lists: BTreeMap<String, ResolvedCommunityList>,
}

impl ListSet {
    /// Returns `true` if there are no lists
    pub fn is_empty(&self) -> bool {
        self.access_lists.is_empty()
            && self.prefix_lists.is_empty()
            && self.community_lists.is_empty()
    }
}
