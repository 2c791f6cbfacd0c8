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

//! # FlowProgrammer
//!
//! Turns a primary path plus the topology's cycle catalogue into the
//! concrete OpenFlow messages that install it, with fast-failover backup
//! routes at every hop the catalogue can cover (spec §4.2).
//!
//! Every function here is pure: no `MessageGateway` call happens in this
//! module, only [`OfMessage`] values are built and handed back for the
//! dispatcher to send. This is the one subsystem where the original source
//! interleaves classification and emission in a single sprawling walk,
//! appending to two lists (`path_cir`, `cir_dir`) that can drift out of
//! sync with each other; here the walk only ever drives
//! [`crate::classify::classify`]/[`crate::classify::classify_endpoint`] and
//! renders their output, and used cycles are tracked as one
//! `Vec<(usize, Direction)>`, so there is no second list to drift.

use crate::classify::{self, BackupChoice, Direction, EndpointCase, HopCase};
use crate::error::EngineError;
use crate::openflow::{Bucket, FlowMod, GroupMod, OfMessage, OfpAction, OfpMatch, PacketOut};
use crate::topology::TopologyView;
use crate::types::{BufferId, FlowTuple, GroupId, Path, Port, SwitchId};

/// The write-only result of a programming pass: a flat list of messages in
/// emission order. [`FlowProgrammer`] functions never touch the network
/// themselves; a [`crate::gateway::MessageGateway`] sends these.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgrammingPlan {
    /// Messages to send, in the order they should be sent.
    pub messages: Vec<OfMessage>,
}

impl ProgrammingPlan {
    fn push(&mut self, msg: OfMessage) {
        self.messages.push(msg);
    }

    fn extend(&mut self, msgs: Vec<OfMessage>) {
        self.messages.extend(msgs);
    }
}

fn flow_mod(dp: SwitchId, flow: FlowTuple, in_port: Option<Port>, actions: Vec<OfpAction>) -> OfMessage {
    OfMessage::FlowMod(FlowMod::new(
        dp,
        OfpMatch {
            eth_type: flow.eth_type,
            ipv4_src: Some(flow.ipv4_src),
            ipv4_dst: Some(flow.ipv4_dst),
            in_port,
        },
        actions,
    ))
}

fn bucket(watch_port: Port, action: OfpAction) -> Bucket {
    Bucket {
        watch_port,
        watch_group: 0,
        action,
    }
}

fn group_mod(dp: SwitchId, group_id: GroupId, primary: Bucket, secondary: Bucket) -> OfMessage {
    OfMessage::GroupMod(GroupMod {
        dp,
        group_id,
        primary,
        secondary,
    })
}

/// The port on `dp` facing `bp`, looked up via the topology's link table.
fn port_towards(view: &TopologyView, dp: SwitchId, bp: SwitchId) -> Result<Port, EngineError> {
    view.link_ports(dp, bp)
        .map(|(p, _)| p)
        .ok_or(EngineError::MissingLink { src: dp, dst: bp })
}

/// Build the `(OFPT_PACKET_OUT, OFPT_GROUP_MOD)`-shaped action set and
/// the one "return" entry an on-path hop installs when its outgoing edge
/// is covered (Case 01, plus Case 11's forward half): a fast-failover
/// group whose primary bucket is the normal egress, plus the flow entry
/// that sends the matched flow through it, plus an entry that catches
/// traffic re-entering via the normal egress (diverted there by an
/// upstream failover) and bounces it onto the cycle.
fn render_forward_protected(
    dp: SwitchId,
    flow: FlowTuple,
    src_port: Port,
    dst_port: Port,
    bp_port: Port,
    gid: GroupId,
) -> Vec<OfMessage> {
    vec![
        group_mod(
            dp,
            gid,
            bucket(dst_port, OfpAction::Output(dst_port)),
            bucket(bp_port, OfpAction::Output(bp_port)),
        ),
        flow_mod(dp, flow, Some(src_port), vec![OfpAction::Group(gid)]),
        flow_mod(dp, flow, Some(dst_port), vec![OfpAction::Output(bp_port)]),
    ]
}

/// The backward-direction counterpart of [`render_forward_protected`],
/// used when the edge actually covered by the cycle is the one behind
/// `cur` (Case 10, plus Case 11's backward half): the covered edge is an
/// *egress* for the backward direction, so the FF group lives there.
fn render_backward_protected(
    dp: SwitchId,
    back: FlowTuple,
    src_port: Port,
    dst_port: Port,
    bp_port: Port,
    gid: GroupId,
) -> Vec<OfMessage> {
    vec![
        group_mod(
            dp,
            gid,
            bucket(src_port, OfpAction::Output(src_port)),
            bucket(bp_port, OfpAction::Output(bp_port)),
        ),
        flow_mod(dp, back, Some(dst_port), vec![OfpAction::Group(gid)]),
        flow_mod(dp, back, Some(src_port), vec![OfpAction::Output(bp_port)]),
    ]
}

/// Render one interior hop's classification into messages, returning
/// alongside it the `(cycle, direction)` this hop used for backup, if any
/// — the caller folds these into the set that [`stitch_off_path`] later
/// walks.
fn render_interior(
    view: &TopologyView,
    dp: SwitchId,
    flow: FlowTuple,
    back: FlowTuple,
    src_port: Port,
    dst_port: Port,
    gid_fwd: GroupId,
    gid_back: GroupId,
    case: HopCase,
) -> Result<(Vec<OfMessage>, Option<(usize, Direction)>), EngineError> {
    match case {
        HopCase::NoBackup => Ok((
            vec![
                flow_mod(dp, flow, Some(src_port), vec![OfpAction::Output(dst_port)]),
                flow_mod(dp, back, Some(dst_port), vec![OfpAction::Output(src_port)]),
            ],
            None,
        )),
        HopCase::Case10(BackupChoice { cycle, dir, bp }) => {
            let bp_port = port_towards(view, dp, bp)?;
            let mut msgs = vec![
                flow_mod(dp, flow, Some(src_port), vec![OfpAction::Output(dst_port)]),
                flow_mod(dp, flow, Some(bp_port), vec![OfpAction::Output(dst_port)]),
            ];
            msgs.extend(render_backward_protected(dp, back, src_port, dst_port, bp_port, gid_back));
            Ok((msgs, Some((cycle, dir))))
        }
        HopCase::Case01(BackupChoice { cycle, dir, bp }) => {
            let bp_port = port_towards(view, dp, bp)?;
            let mut msgs = render_forward_protected(dp, flow, src_port, dst_port, bp_port, gid_fwd);
            msgs.push(flow_mod(dp, back, Some(bp_port), vec![OfpAction::Output(src_port)]));
            msgs.push(flow_mod(dp, back, Some(dst_port), vec![OfpAction::Output(src_port)]));
            Ok((msgs, Some((cycle, dir))))
        }
        HopCase::Case11 { .. } => {
            let mut msgs = Vec::with_capacity(6);
            msgs.push(group_mod(
                dp,
                gid_fwd,
                bucket(dst_port, OfpAction::Output(dst_port)),
                bucket(src_port, OfpAction::Output(Port::IN_PORT)),
            ));
            msgs.push(flow_mod(dp, flow, Some(src_port), vec![OfpAction::Group(gid_fwd)]));
            msgs.push(flow_mod(dp, flow, Some(dst_port), vec![OfpAction::Output(src_port)]));
            msgs.push(group_mod(
                dp,
                gid_back,
                bucket(src_port, OfpAction::Output(src_port)),
                bucket(dst_port, OfpAction::Output(Port::IN_PORT)),
            ));
            msgs.push(flow_mod(dp, back, Some(dst_port), vec![OfpAction::Group(gid_back)]));
            msgs.push(flow_mod(dp, back, Some(src_port), vec![OfpAction::Output(dst_port)]));
            // Case 11's cycle is not carried into off-path stitching: its
            // secondary buckets bounce onto the ingress port rather than a
            // specific cycle neighbour, so there is no backup next-hop to
            // glue a return path for.
            Ok((msgs, None))
        }
    }
}

/// Program the round-trip (forward + backward) flow along `primary`,
/// installing fast-failover backups at every hop the cycle catalogue
/// covers. `primary` must have at least two switches; a single-switch path
/// is the same-switch fast path, [`program_same_switch`].
///
/// `backup` is the [`crate::path_oracle::PathOracle`]'s alternate path, if
/// it returned one. The cycle-derived fast-failover backups computed here
/// are the engine's only failover mechanism; `backup` has no current
/// consumer and is accepted for forward compatibility with a future
/// explicit-reroute feature.
pub fn program_round_trip(
    view: &TopologyView,
    primary: &Path,
    _backup: Option<&Path>,
    flow: FlowTuple,
    gid_fwd: GroupId,
) -> Result<ProgrammingPlan, EngineError> {
    if primary.is_empty() {
        return Err(EngineError::EmptyPath);
    }
    if primary.len() < 2 {
        return Err(EngineError::DegeneratePath);
    }

    let back = flow.reversed();
    let gid_back = gid_fwd.reverse();
    let cycles = view.cycles();
    let mut plan = ProgrammingPlan::default();
    let mut used: Vec<(usize, Direction)> = Vec::new();

    // s0: only the forward hop (s0, s1) exists.
    let s0 = primary.0[0];
    let s1 = primary.0[1];
    let (out_port, _) = view
        .link_ports(s0, s1)
        .ok_or(EngineError::MissingLink { src: s0, dst: s1 })?;
    // Backward wildcard: always present, regardless of backup coverage,
    // so reverse traffic reaches the access port it came from.
    plan.push(flow_mod(s0, back, None, vec![OfpAction::Output(flow.in_port)]));
    match classify::classify_endpoint(s0, s1, cycles) {
        EndpointCase::NoBackup => {
            plan.push(flow_mod(s0, flow, Some(flow.in_port), vec![OfpAction::Output(out_port)]));
        }
        EndpointCase::Protected(BackupChoice { cycle, dir, bp }) => {
            let bp_port = port_towards(view, s0, bp)?;
            plan.extend(render_forward_protected(s0, flow, flow.in_port, out_port, bp_port, gid_fwd));
            used.push((cycle, dir));
        }
    }

    // Interior hops.
    for i in 1..primary.len() - 1 {
        let prev = primary.0[i - 1];
        let cur = primary.0[i];
        let next = primary.0[i + 1];
        let src_port = view
            .link_ports(prev, cur)
            .ok_or(EngineError::MissingLink { src: prev, dst: cur })?
            .1;
        let dst_port = view
            .link_ports(cur, next)
            .ok_or(EngineError::MissingLink { src: cur, dst: next })?
            .0;
        let case = classify::classify(prev, cur, next, cycles);
        let (msgs, contribution) =
            render_interior(view, cur, flow, back, src_port, dst_port, gid_fwd, gid_back, case)?;
        plan.extend(msgs);
        if let Some(c) = contribution {
            used.push(c);
        }
    }

    // sn: only the backward hop (s_{n-1}, sn) exists.
    let sn = *primary.0.last().unwrap();
    let s_prev = primary.0[primary.len() - 2];
    let src_port = view
        .link_ports(s_prev, sn)
        .ok_or(EngineError::MissingLink { src: s_prev, dst: sn })?
        .1;
    let dst_port = view.access_port_for(flow.ipv4_dst).ok_or(EngineError::MissingAccessPort)?;
    // Forward wildcard: catches traffic that completed the path, or that
    // rejoined it via a cycle, and sends it to the destination host.
    plan.push(flow_mod(sn, flow, None, vec![OfpAction::Output(dst_port)]));
    match classify::classify_endpoint(sn, s_prev, cycles) {
        EndpointCase::NoBackup => {
            plan.push(flow_mod(sn, back, Some(dst_port), vec![OfpAction::Output(src_port)]));
        }
        EndpointCase::Protected(BackupChoice { cycle, dir, bp }) => {
            let bp_port = port_towards(view, sn, bp)?;
            plan.extend(render_backward_protected(sn, back, src_port, dst_port, bp_port, gid_back));
            used.push((cycle, dir));
        }
    }

    plan.extend(stitch_off_path(view, &used, primary, flow)?);

    Ok(plan)
}

/// Install "glue" entries at every off-path vertex of every cycle actually
/// used for backup, so traffic diverted onto the cycle by a failover can
/// walk it and keep moving in the chosen direction (spec §4.2.4).
///
/// Cycles are deduplicated: a cycle used by two different hops (e.g. a
/// Case 10 hop and, elsewhere on the path, a Case 01 hop referencing the
/// same cycle) is stitched only once.
pub fn stitch_off_path(
    view: &TopologyView,
    used: &[(usize, Direction)],
    primary: &Path,
    flow: FlowTuple,
) -> Result<Vec<OfMessage>, EngineError> {
    let back = flow.reversed();
    let mut done: Vec<usize> = Vec::new();
    let mut out = Vec::new();

    for &(cycle_idx, dir) in used {
        if done.contains(&cycle_idx) {
            continue;
        }
        done.push(cycle_idx);
        let cycle = &view.cycles().0[cycle_idx];
        let d = dir.step();

        for (p, &v) in cycle.0.iter().enumerate() {
            if primary.0.contains(&v) {
                continue;
            }
            let predecessor = cycle.neighbour(p, -d);
            let successor = cycle.neighbour(p, d);
            let src_port = view
                .link_ports(predecessor, v)
                .ok_or(EngineError::MissingLink { src: predecessor, dst: v })?
                .1;
            let dst_port = view
                .link_ports(v, successor)
                .ok_or(EngineError::MissingLink { src: v, dst: successor })?
                .0;
            out.push(flow_mod(v, flow, Some(src_port), vec![OfpAction::Output(dst_port)]));
            out.push(flow_mod(v, back, Some(dst_port), vec![OfpAction::Output(src_port)]));
        }
    }

    Ok(out)
}

/// The same-switch fast path (spec §4.2.5): source and destination hosts
/// share a switch, so no cycle backup applies and no group is needed —
/// just the two directions of a plain flow entry plus the packet-out that
/// releases the triggering packet.
pub fn program_same_switch(
    view: &TopologyView,
    flow: FlowTuple,
    in_port: Port,
    buffer: BufferId,
    data: Option<Vec<u8>>,
) -> Result<ProgrammingPlan, EngineError> {
    let (dp, _) = view.locate(flow.ipv4_src).ok_or(EngineError::MissingAccessPort)?;
    let out_port = view.access_port_for(flow.ipv4_dst).ok_or(EngineError::MissingAccessPort)?;
    let back = flow.reversed();

    let mut plan = ProgrammingPlan::default();
    plan.push(flow_mod(dp, flow, Some(in_port), vec![OfpAction::Output(out_port)]));
    plan.push(flow_mod(dp, back, Some(out_port), vec![OfpAction::Output(in_port)]));
    plan.push(packet_out(dp, buffer, in_port, out_port, data));
    Ok(plan)
}

/// Build the `OFPT_PACKET_OUT` that releases the packet which triggered
/// this programming pass (spec §4.2.6): a buffered packet is released by
/// id alone, an unbuffered one must carry its raw bytes.
pub fn packet_out(dp: SwitchId, buffer: BufferId, in_port: Port, out_port: Port, data: Option<Vec<u8>>) -> OfMessage {
    OfMessage::PacketOut(PacketOut {
        dp,
        buffer_id: buffer,
        in_port,
        actions: vec![OfpAction::Output(out_port)],
        data: if buffer.is_buffered() { None } else { data },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AdjacencyGraph;
    use crate::types::{Cycle, CycleCatalogue, EthType, SwitchId};
    use maplit::hashmap;
    use std::collections::HashMap;

    fn sw(id: u64) -> SwitchId {
        SwitchId(id)
    }

    fn flow(src: &str, dst: &str, in_port: u32) -> FlowTuple {
        FlowTuple {
            eth_type: EthType::Ipv4,
            ipv4_src: src.parse().unwrap(),
            ipv4_dst: dst.parse().unwrap(),
            in_port: Port(in_port),
        }
    }

    fn linear_view(links: &[(u64, u64, u32, u32)], cycles: CycleCatalogue) -> TopologyView {
        let mut graph = AdjacencyGraph::new();
        let mut link_to_port = HashMap::new();
        for &(a, b, pa, pb) in links {
            graph.add_edge(sw(a), sw(b), ());
            link_to_port.insert((sw(a), sw(b)), (Port(pa), Port(pb)));
        }
        TopologyView::new(graph, link_to_port, HashMap::new(), HashMap::new(), cycles)
    }

    #[test]
    fn same_switch_path_yields_two_flow_mods_and_one_packet_out() {
        // Boundary scenario #3.
        let mut access = HashMap::new();
        access.insert(
            (sw(1), Port(10)),
            crate::types::Host {
                ipv4: "10.0.0.1".parse().unwrap(),
                mac: crate::types::MacAddr([0; 6]),
                switch: sw(1),
                port: Port(10),
            },
        );
        access.insert(
            (sw(1), Port(20)),
            crate::types::Host {
                ipv4: "10.0.0.2".parse().unwrap(),
                mac: crate::types::MacAddr([0; 6]),
                switch: sw(1),
                port: Port(20),
            },
        );
        let view = TopologyView::new(
            AdjacencyGraph::new(),
            HashMap::new(),
            HashMap::new(),
            access,
            CycleCatalogue::default(),
        );
        let plan = program_same_switch(&view, flow("10.0.0.1", "10.0.0.2", 10), Port(10), BufferId::NO_BUFFER, Some(vec![1, 2, 3])).unwrap();
        let flow_mods = plan
            .messages
            .iter()
            .filter(|m| matches!(m, OfMessage::FlowMod(_)))
            .count();
        let packet_outs = plan
            .messages
            .iter()
            .filter(|m| matches!(m, OfMessage::PacketOut(_)))
            .count();
        let group_mods = plan
            .messages
            .iter()
            .filter(|m| matches!(m, OfMessage::GroupMod(_)))
            .count();
        assert_eq!(flow_mods, 2);
        assert_eq!(packet_outs, 1);
        assert_eq!(group_mods, 0);
    }

    #[test]
    fn full_coverage_triangle_path_installs_four_group_mods_and_no_stitch() {
        // Boundary scenario #4: P=[s0,s1,s2] fully covered by C=[s0,s1,s2].
        let cycles = CycleCatalogue(vec![Cycle(vec![sw(0), sw(1), sw(2)])]);
        let mut access = HashMap::new();
        access.insert(
            (sw(2), Port(99)),
            crate::types::Host {
                ipv4: "10.0.0.2".parse().unwrap(),
                mac: crate::types::MacAddr([0; 6]),
                switch: sw(2),
                port: Port(99),
            },
        );
        let mut graph = AdjacencyGraph::new();
        let mut link_to_port = HashMap::new();
        for &(a, b, pa, pb) in &[(0u64, 1u64, 1u32, 1u32), (1, 2, 2, 2), (0, 2, 3, 3)] {
            graph.add_edge(sw(a), sw(b), ());
            link_to_port.insert((sw(a), sw(b)), (Port(pa), Port(pb)));
        }
        let view = TopologyView::new(graph, link_to_port, HashMap::new(), access, cycles);

        let primary = Path(vec![sw(0), sw(1), sw(2)]);
        let plan = program_round_trip(&view, &primary, None, flow("10.0.0.1", "10.0.0.2", 5), GroupId(2)).unwrap();

        let group_mods = plan
            .messages
            .iter()
            .filter(|m| matches!(m, OfMessage::GroupMod(_)))
            .count();
        // s0 (endpoint, protected) + s1 (Case 11, two groups) + s2 (endpoint, protected) = 4.
        assert_eq!(group_mods, 4);
        // No off-path vertices exist in this 3-vertex cycle, so nothing to stitch.
        assert!(view.cycles().0[0].0.iter().all(|v| primary.0.contains(v)));
    }

    #[test]
    fn link_ports_are_looked_up_symmetrically_for_the_returned_edge() {
        let view = linear_view(&[(1, 2, 10, 11), (2, 3, 12, 13)], CycleCatalogue::default());
        assert_eq!(view.link_ports(sw(2), sw(1)), Some((Port(11), Port(10))));
    }
}
