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

//! The small subset of OpenFlow 1.3 messages this engine consumes and
//! emits (spec §6): `OFPT_FLOW_MOD`, `OFPT_GROUP_MOD`, `OFPT_PACKET_OUT`,
//! and the observed-only `OFPT_ERROR`. The wire codec itself is out of
//! scope; these are the in-memory records a [`crate::gateway::MessageGateway`]
//! serialises and sends.

use crate::types::{BufferId, EthType, GroupId, Port, SwitchId};
use std::net::Ipv4Addr;

/// `OFPMatch`: always matches `eth_type`; `ipv4_src`/`ipv4_dst`/`in_port`
/// are optional. `in_port: None` is the wildcard match used to catch
/// traffic re-entering the path from a cycle detour (§4.2.3); this is an
/// explicit optional type rather than overloading port `0` as a sentinel
/// (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfpMatch {
    /// The ethertype to match.
    pub eth_type: EthType,
    /// Source IPv4 address, if constrained.
    pub ipv4_src: Option<Ipv4Addr>,
    /// Destination IPv4 address, if constrained.
    pub ipv4_dst: Option<Ipv4Addr>,
    /// Ingress port, if constrained (`None` = wildcard).
    pub in_port: Option<Port>,
}

/// A single OpenFlow action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfpAction {
    /// Output the packet on a fixed port.
    Output(Port),
    /// Forward the packet through a fast-failover group.
    Group(GroupId),
}

/// `OFPT_FLOW_MOD`. Always priority 1, no timeouts, a single
/// `OFPIT_APPLY_ACTIONS` instruction carrying `actions` (§6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowMod {
    /// Target switch.
    pub dp: SwitchId,
    /// Match priority; always 1 for this engine.
    pub priority: u16,
    /// Idle timeout in seconds; always 0.
    pub idle_timeout: u16,
    /// Hard timeout in seconds; always 0.
    pub hard_timeout: u16,
    /// The match.
    pub matc: OfpMatch,
    /// The actions to apply.
    pub actions: Vec<OfpAction>,
}

impl FlowMod {
    /// Construct a flow-mod with the fixed priority/timeouts this engine
    /// always uses.
    pub fn new(dp: SwitchId, matc: OfpMatch, actions: Vec<OfpAction>) -> Self {
        FlowMod {
            dp,
            priority: 1,
            idle_timeout: 0,
            hard_timeout: 0,
            matc,
            actions,
        }
    }
}

/// One bucket of a fast-failover group: tried only while `watch_port` is
/// up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// The port this bucket's liveness is tied to.
    pub watch_port: Port,
    /// Unused by this engine; always 0 (no watch-group chaining).
    pub watch_group: u32,
    /// The single output action for this bucket.
    pub action: OfpAction,
}

/// `OFPT_GROUP_MOD` with `command = OFPGC_ADD`, `type = OFPGT_FF`, and
/// exactly two buckets (§6, §8 invariant 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupMod {
    /// Target switch.
    pub dp: SwitchId,
    /// The group id being (re-)installed.
    pub group_id: GroupId,
    /// Primary bucket, used while its watch port is up.
    pub primary: Bucket,
    /// Secondary bucket, used once the primary's watch port is reported
    /// down.
    pub secondary: Bucket,
}

/// `OFPT_PACKET_OUT`: either buffered (switch releases its own buffer) or
/// unbuffered (the raw bytes are attached), per §4.2.6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketOut {
    /// Target switch.
    pub dp: SwitchId,
    /// The buffer id to release, or [`BufferId::NO_BUFFER`].
    pub buffer_id: BufferId,
    /// The port the original packet arrived on.
    pub in_port: Port,
    /// Actions to apply to the released packet.
    pub actions: Vec<OfpAction>,
    /// Raw packet bytes, required when `buffer_id` is
    /// [`BufferId::NO_BUFFER`].
    pub data: Option<Vec<u8>>,
}

/// `OFPT_ERROR`, observed only; the engine never reacts to its contents
/// beyond logging (§4.3, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorMsg {
    /// The switch that reported the error.
    pub dp: SwitchId,
    /// The OpenFlow error type code.
    pub err_type: u16,
    /// The OpenFlow error code within that type.
    pub err_code: u16,
}

/// Any control message this engine may emit (or, for `Error`, observe).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfMessage {
    /// Install or overwrite a flow entry.
    FlowMod(FlowMod),
    /// Install or overwrite a fast-failover group.
    GroupMod(GroupMod),
    /// Release a buffered or unbuffered packet.
    PacketOut(PacketOut),
    /// A switch-reported error (observed only).
    Error(ErrorMsg),
}
