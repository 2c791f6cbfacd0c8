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

//! # ReactiveDispatcher
//!
//! The event loop entry point (spec §4.3, §5): one [`InboundEvent`] in,
//! zero or more [`crate::openflow::OfMessage`] out via the
//! [`crate::gateway::MessageGateway`]. Handling is synchronous and runs to
//! completion before the next event; nothing here ever panics on
//! attacker- or network-controlled input, and every internal `Result::Err`
//! is logged and swallowed at this boundary, per the best-effort,
//! reconverging design of §5/§7 — a dropped or misrouted packet is
//! corrected by the next packet of the same flow.

use crate::flow_programmer::{self, ProgrammingPlan};
use crate::frame::{ArpPacket, EtherFrame, Ipv4Header};
use crate::gateway::MessageGateway;
use crate::openflow::OfMessage;
use crate::path_oracle::PathOracle;
use crate::registry::SwitchRegistry;
use crate::topology::TopologyView;
use crate::types::{BufferId, EthType, FlowTuple, Port, SwitchId, WeightMode};
use arc_swap::ArcSwap;

use crate::group_id::GroupIdAllocator;

/// Whether a switch's session just opened or closed, mirroring Ryu's
/// `MAIN_DISPATCHER`/`DEAD_DISPATCHER` state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DpState {
    /// The switch completed its handshake and is ready for flow programming.
    Up,
    /// The switch's connection was lost.
    Down,
}

/// Everything the dispatcher reacts to. The transport layer (out of scope,
/// §1) decodes raw OpenFlow messages into these before calling
/// [`ReactiveDispatcher::handle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// `OFPT_PACKET_IN`.
    PacketIn {
        /// The switch the packet arrived at.
        dp: SwitchId,
        /// The port it arrived on.
        in_port: Port,
        /// The buffer id the switch assigned it, or [`BufferId::NO_BUFFER`].
        buffer_id: BufferId,
        /// The raw packet bytes (always present; when buffered, still
        /// carried so ARP/IPv4 header fields can be read without a
        /// round-trip to the switch).
        data: Vec<u8>,
    },
    /// A switch connected or disconnected.
    StateChange {
        /// The switch.
        dp: SwitchId,
        /// Its new state.
        state: DpState,
    },
    /// `OFPT_ERROR`, observed only.
    Error {
        /// The switch that reported it.
        dp: SwitchId,
        /// OpenFlow error type code.
        err_type: u16,
        /// OpenFlow error code.
        err_code: u16,
    },
}

/// The reactive forwarding core: wires a [`PathOracle`] and a
/// [`MessageGateway`] together and drives them from [`InboundEvent`]s.
///
/// `topology` is swapped wholesale by the (out-of-scope) topology
/// collaborator whenever LLDP/host-learning settle; [`ArcSwap`] lets
/// packet-in handling read the current snapshot without blocking on
/// whatever thread is publishing the next one.
pub struct ReactiveDispatcher<G, O> {
    registry: SwitchRegistry,
    topology: ArcSwap<TopologyView>,
    oracle: O,
    gateway: G,
    gids: GroupIdAllocator,
    weight: WeightMode,
}

impl<G: MessageGateway, O: PathOracle> ReactiveDispatcher<G, O> {
    /// Build a dispatcher over an initial topology snapshot.
    pub fn new(topology: TopologyView, oracle: O, gateway: G, weight: WeightMode) -> Self {
        ReactiveDispatcher {
            registry: SwitchRegistry::new(),
            topology: ArcSwap::from_pointee(topology),
            oracle,
            gateway,
            gids: GroupIdAllocator::new(),
            weight,
        }
    }

    /// Publish a new topology snapshot, replacing the one packet-in
    /// handling currently sees.
    pub fn update_topology(&self, view: TopologyView) {
        self.topology.store(std::sync::Arc::new(view));
    }

    /// The set of switches with an open session.
    pub fn registry(&self) -> &SwitchRegistry {
        &self.registry
    }

    /// Handle one inbound event to completion. Never panics on
    /// network-controlled input.
    pub fn handle(&self, ev: InboundEvent) {
        match ev {
            InboundEvent::PacketIn { dp, in_port, buffer_id, data } => {
                self.handle_packet_in(dp, in_port, buffer_id, data);
            }
            InboundEvent::StateChange { dp, state } => match state {
                DpState::Up => self.registry.register(dp),
                DpState::Down => self.registry.unregister(dp),
            },
            InboundEvent::Error { dp, err_type, err_code } => {
                log::warn!("switch {} reported error type={} code={}", dp, err_type, err_code);
            }
        }
    }

    fn handle_packet_in(&self, dp: SwitchId, in_port: Port, buffer_id: BufferId, data: Vec<u8>) {
        let frame = match EtherFrame::parse(&data) {
            Some(f) => f,
            None => {
                log::debug!("packet-in from {} too short to contain an Ethernet header", dp);
                return;
            }
        };
        match frame.eth_type {
            EthType::Arp => self.handle_arp(dp, in_port, buffer_id, frame.payload, &data),
            EthType::Ipv4 => self.handle_ipv4(dp, in_port, buffer_id, frame.payload, &data),
            EthType::Other(_) => {}
        }
    }

    fn handle_arp(&self, dp: SwitchId, in_port: Port, buffer_id: BufferId, payload: &[u8], raw: &[u8]) {
        let packet = match ArpPacket::parse(payload) {
            Some(p) => p,
            None => {
                log::debug!("packet-in from {} claimed ARP but failed to parse", dp);
                return;
            }
        };
        let view = self.topology.load_full();

        match view.locate(packet.target_ip) {
            Some((target_dp, target_port)) if target_dp == dp => {
                let data = if buffer_id.is_buffered() { None } else { Some(raw.to_vec()) };
                let msg = flow_programmer::packet_out(dp, buffer_id, in_port, target_port, data);
                self.send(dp, msg);
            }
            _ => {
                for (a_dp, a_port) in view.all_access_ports() {
                    if a_dp == dp && a_port == in_port {
                        continue;
                    }
                    if view.has_learned_host(a_dp, a_port) {
                        continue;
                    }
                    let (buf, data) = if a_dp == dp {
                        (buffer_id, if buffer_id.is_buffered() { None } else { Some(raw.to_vec()) })
                    } else {
                        (BufferId::NO_BUFFER, Some(raw.to_vec()))
                    };
                    let msg = flow_programmer::packet_out(a_dp, buf, in_port, a_port, data);
                    self.send(a_dp, msg);
                }
            }
        }
    }

    fn handle_ipv4(&self, dp: SwitchId, in_port: Port, buffer_id: BufferId, payload: &[u8], raw: &[u8]) {
        let header = match Ipv4Header::parse(payload) {
            Some(h) => h,
            None => {
                log::debug!("packet-in from {} claimed IPv4 but failed to parse", dp);
                return;
            }
        };
        let view = self.topology.load_full();

        let (src_dp, _) = match view.locate(header.src) {
            Some(v) => v,
            None => {
                log::debug!("no known location for source host {}", header.src);
                return;
            }
        };
        let (dst_dp, _) = match view.locate(header.dst) {
            Some(v) => v,
            None => {
                log::debug!("no known location for destination host {}", header.dst);
                return;
            }
        };

        let flow = FlowTuple {
            eth_type: EthType::Ipv4,
            ipv4_src: header.src,
            ipv4_dst: header.dst,
            in_port,
        };
        let data = if buffer_id.is_buffered() { None } else { Some(raw.to_vec()) };

        if src_dp == dst_dp {
            match flow_programmer::program_same_switch(&view, flow, in_port, buffer_id, data) {
                Ok(plan) => self.emit(&plan),
                Err(e) => log::warn!("same-switch programming for {} failed: {}", flow.ipv4_dst, e),
            }
            return;
        }

        let pair = self.oracle.paths(src_dp, dst_dp, self.weight);
        if pair.primary.is_empty() {
            log::warn!("Path error!");
            return;
        }

        let (gid_fwd, _) = self.gids.next_pair();
        let plan = match flow_programmer::program_round_trip(&view, &pair.primary, pair.backup.as_ref(), flow, gid_fwd) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("round-trip programming for {} -> {} failed: {}", flow.ipv4_src, flow.ipv4_dst, e);
                return;
            }
        };
        self.emit(&plan);

        let first_dp = pair.primary.first().expect("checked non-empty above");
        let second = pair.primary.0[1];
        match view.link_ports(first_dp, second) {
            Some((out_port, _)) => {
                let msg = flow_programmer::packet_out(first_dp, buffer_id, in_port, out_port, data);
                self.send(first_dp, msg);
            }
            None => log::warn!("dpid:{:?} -> dpid:{:?} is not in links", first_dp, second),
        }
    }

    fn emit(&self, plan: &ProgrammingPlan) {
        for msg in &plan.messages {
            let dp = match msg {
                OfMessage::FlowMod(f) => f.dp,
                OfMessage::GroupMod(g) => g.dp,
                OfMessage::PacketOut(p) => p.dp,
                OfMessage::Error(e) => e.dp,
            };
            self.send(dp, msg.clone());
        }
    }

    fn send(&self, dp: SwitchId, msg: OfMessage) {
        if let Err(e) = self.gateway.send(dp, msg) {
            log::warn!("failed to send message to {}: {}", dp, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AdjacencyGraph;
    use crate::types::{CycleCatalogue, Host, MacAddr};
    use std::collections::HashMap;
    use std::sync::mpsc::channel;

    fn sw(id: u64) -> SwitchId {
        SwitchId(id)
    }

    struct StaticOracle(crate::types::Path);
    impl PathOracle for StaticOracle {
        fn paths(&self, _src: SwitchId, _dst: SwitchId, _weight: WeightMode) -> crate::path_oracle::PathPair {
            crate::path_oracle::PathPair {
                primary: self.0.clone(),
                backup: None,
            }
        }
    }

    fn eth_ipv4(dst_mac: [u8; 6], src_mac: [u8; 6], src_ip: [u8; 4], dst_ip: [u8; 4]) -> Vec<u8> {
        let mut data = vec![0u8; 14];
        data[0..6].copy_from_slice(&dst_mac);
        data[6..12].copy_from_slice(&src_mac);
        data[12] = 0x08;
        data[13] = 0x00;
        let mut ip = vec![0u8; 20];
        ip[0] = 0x45;
        ip[12..16].copy_from_slice(&src_ip);
        ip[16..20].copy_from_slice(&dst_ip);
        data.extend_from_slice(&ip);
        data
    }

    #[test]
    fn ipv4_packet_in_between_known_hosts_emits_flow_mods() {
        let mut graph = AdjacencyGraph::new();
        graph.add_edge(sw(1), sw(2), ());
        let mut link_to_port = HashMap::new();
        link_to_port.insert((sw(1), sw(2)), (Port(1), Port(1)));
        let mut access_table = HashMap::new();
        access_table.insert(
            (sw(1), Port(10)),
            Host {
                ipv4: "10.0.0.1".parse().unwrap(),
                mac: MacAddr([1; 6]),
                switch: sw(1),
                port: Port(10),
            },
        );
        access_table.insert(
            (sw(2), Port(10)),
            Host {
                ipv4: "10.0.0.2".parse().unwrap(),
                mac: MacAddr([2; 6]),
                switch: sw(2),
                port: Port(10),
            },
        );
        let view = TopologyView::new(graph, link_to_port, HashMap::new(), access_table, CycleCatalogue::default());

        let oracle = StaticOracle(crate::types::Path(vec![sw(1), sw(2)]));
        let (tx, rx) = channel();
        let gateway = crate::gateway::ChannelGateway::new(tx);
        let dispatcher = ReactiveDispatcher::new(view, oracle, gateway, WeightMode::Hop);

        let data = eth_ipv4([1; 6], [2; 6], [10, 0, 0, 1], [10, 0, 0, 2]);
        dispatcher.handle(InboundEvent::PacketIn {
            dp: sw(1),
            in_port: Port(10),
            buffer_id: BufferId(7),
            data,
        });

        let sent: Vec<_> = rx.try_iter().collect();
        assert!(!sent.is_empty());
        assert!(sent.iter().any(|(_, m)| matches!(m, OfMessage::PacketOut(_))));
    }

    #[test]
    fn state_change_updates_registry() {
        let view = TopologyView::new(
            AdjacencyGraph::new(),
            HashMap::new(),
            HashMap::new(),
            HashMap::new(),
            CycleCatalogue::default(),
        );
        let oracle = StaticOracle(crate::types::Path(Vec::new()));
        let (tx, _rx) = channel();
        let gateway = crate::gateway::ChannelGateway::new(tx);
        let dispatcher = ReactiveDispatcher::new(view, oracle, gateway, WeightMode::Hop);

        dispatcher.handle(InboundEvent::StateChange { dp: sw(5), state: DpState::Up });
        assert!(dispatcher.registry().is_connected(sw(5)));
        dispatcher.handle(InboundEvent::StateChange { dp: sw(5), state: DpState::Down });
        assert!(!dispatcher.registry().is_connected(sw(5)));
    }
}
