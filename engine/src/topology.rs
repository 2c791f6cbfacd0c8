// Copyright (C) 2024 The Failover Engine Authors
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

//! # TopologyView
//!
//! Read-only projection of the external topology, host-location, and
//! cycle-catalogue collaborators (LLDP discovery, link measurement,
//! access-table learning — all out of scope here, see spec §1). The engine
//! never mutates a `TopologyView`; the topology collaborator swaps the
//! whole view atomically when the underlying network changes, so it is
//! handed to the engine wrapped in a shared, immutable handle (`Arc`) — see
//! §9's note on snapshot-by-reference sharing.

use crate::graph::AdjacencyGraph;
use crate::types::{CycleCatalogue, Host, Port, SwitchId};
use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;

/// Read-only snapshot of everything the flow programmer and dispatcher need
/// to know about the current topology.
#[derive(Debug, Clone)]
pub struct TopologyView {
    graph: AdjacencyGraph,
    link_to_port: HashMap<(SwitchId, SwitchId), (Port, Port)>,
    access_ports: HashMap<SwitchId, HashSet<Port>>,
    access_table: HashMap<(SwitchId, Port), Host>,
    cycles: CycleCatalogue,
}

impl TopologyView {
    /// Build a view from its constituent parts. Called by the (external)
    /// topology collaborator whenever LLDP/host-learning events settle.
    pub fn new(
        graph: AdjacencyGraph,
        link_to_port: HashMap<(SwitchId, SwitchId), (Port, Port)>,
        access_ports: HashMap<SwitchId, HashSet<Port>>,
        access_table: HashMap<(SwitchId, Port), Host>,
        cycles: CycleCatalogue,
    ) -> Self {
        Self {
            graph,
            link_to_port,
            access_ports,
            access_table,
            cycles,
        }
    }

    /// The undirected adjacency graph of switches.
    pub fn graph(&self) -> &AdjacencyGraph {
        &self.graph
    }

    /// The current cycle catalogue.
    pub fn cycles(&self) -> &CycleCatalogue {
        &self.cycles
    }

    /// Look up the `(src_port, dst_port)` pair for the link `src -> dst`.
    /// Mirrors `get_port_pair_from_link` in the original: the link map is
    /// keyed in one orientation, so the reverse is tried and swapped if
    /// needed, exactly as adjacency in an undirected graph would demand.
    pub fn link_ports(&self, src: SwitchId, dst: SwitchId) -> Option<(Port, Port)> {
        if let Some(&ports) = self.link_to_port.get(&(src, dst)) {
            return Some(ports);
        }
        self.link_to_port
            .get(&(dst, src))
            .map(|&(a, b)| (b, a))
    }

    /// All access ports known for `dpid`.
    pub fn access_ports_of(&self, dpid: SwitchId) -> Option<&HashSet<Port>> {
        self.access_ports.get(&dpid)
    }

    /// All `(dpid, port)` access ports in the topology.
    pub fn all_access_ports(&self) -> impl Iterator<Item = (SwitchId, Port)> + '_ {
        self.access_ports
            .iter()
            .flat_map(|(&dpid, ports)| ports.iter().map(move |&p| (dpid, p)))
    }

    /// True if `(dpid, port)` already has a learned host (i.e. is present in
    /// the access table), used by ARP flooding to avoid re-flooding ports
    /// whose host is already known.
    pub fn has_learned_host(&self, dpid: SwitchId, port: Port) -> bool {
        self.access_table.contains_key(&(dpid, port))
    }

    /// Find the `(switch, port)` a host with IP `ip` is attached to.
    pub fn locate(&self, ip: Ipv4Addr) -> Option<(SwitchId, Port)> {
        self.access_table
            .values()
            .find(|h| h.ipv4 == ip)
            .map(|h| (h.switch, h.port))
    }

    /// Look up the access port toward the host with IP `ip`, regardless of
    /// which switch it is attached to. Mirrors the original's `get_port`.
    pub fn access_port_for(&self, ip: Ipv4Addr) -> Option<Port> {
        self.locate(ip).map(|(_, port)| port)
    }

    /// The learned MAC/host record at `(dpid, port)`, if any.
    pub fn host_at(&self, dpid: SwitchId, port: Port) -> Option<&Host> {
        self.access_table.get(&(dpid, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::{hashmap, hashset};

    fn sw(id: u64) -> SwitchId {
        SwitchId(id)
    }

    #[test]
    fn link_ports_found_in_either_orientation() {
        let view = TopologyView::new(
            AdjacencyGraph::new(),
            hashmap! { (sw(1), sw(2)) => (Port(1), Port(2)) },
            HashMap::new(),
            HashMap::new(),
            CycleCatalogue::default(),
        );
        assert_eq!(view.link_ports(sw(1), sw(2)), Some((Port(1), Port(2))));
        assert_eq!(view.link_ports(sw(2), sw(1)), Some((Port(2), Port(1))));
        assert_eq!(view.link_ports(sw(1), sw(3)), None);
    }

    #[test]
    fn locate_finds_host_by_ip() {
        let host = Host {
            ipv4: "10.0.0.1".parse().unwrap(),
            mac: crate::types::MacAddr([0; 6]),
            switch: sw(1),
            port: Port(3),
        };
        let view = TopologyView::new(
            AdjacencyGraph::new(),
            HashMap::new(),
            hashmap! { sw(1) => hashset!{ Port(3) } },
            hashmap! { (sw(1), Port(3)) => host },
            CycleCatalogue::default(),
        );
        assert_eq!(view.locate("10.0.0.1".parse().unwrap()), Some((sw(1), Port(3))));
        assert_eq!(view.locate("10.0.0.2".parse().unwrap()), None);
        assert!(view.has_learned_host(sw(1), Port(3)));
        assert!(!view.has_learned_host(sw(1), Port(4)));
    }
}
