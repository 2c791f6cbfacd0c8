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

//! Module containing all data-model type definitions

use std::fmt;
use std::net::Ipv4Addr;

/// # Switch identification
/// The 64-bit OpenFlow datapath identifier of a live switch. Unique for the
/// lifetime of the switch's connection; the engine never assumes dpids are
/// dense or small.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SwitchId(pub u64);

impl fmt::Display for SwitchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl From<u64> for SwitchId {
    fn from(id: u64) -> Self {
        SwitchId(id)
    }
}

/// # Port number
/// A 32-bit OpenFlow port number local to one switch. `OFPP_LOCAL`,
/// `OFPP_CONTROLLER`, and `OFPP_IN_PORT` are reserved sentinels, never real
/// link/access ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Port(pub u32);

impl Port {
    /// Reserved port representing "the port the packet came in on".
    pub const IN_PORT: Port = Port(0xffff_fff8);
    /// Reserved port representing the switch's local stack.
    pub const LOCAL: Port = Port(0xffff_fffe);
    /// Reserved port representing the controller itself.
    pub const CONTROLLER: Port = Port(0xffff_fffd);
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// # Buffer identification
/// Distinguishes a switch-buffered packet (programming completes with a
/// reference to the buffer) from a raw unbuffered packet (the original
/// bytes must be resent, see §4.2.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferId(pub u32);

impl BufferId {
    /// Sentinel meaning "no buffer id; the raw packet bytes are attached."
    pub const NO_BUFFER: BufferId = BufferId(0xffff_ffff);

    /// True if this buffer id refers to an actual switch-side buffer.
    pub fn is_buffered(&self) -> bool {
        *self != BufferId::NO_BUFFER
    }
}

/// A physical link between two switches, with the port on each end that the
/// link is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    /// Source switch of the (arbitrarily oriented) link record.
    pub src: SwitchId,
    /// Destination switch.
    pub dst: SwitchId,
    /// Port on `src` facing `dst`.
    pub src_port: Port,
    /// Port on `dst` facing `src`.
    pub dst_port: Port,
}

/// A 6-byte Ethernet hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; 6]);

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

/// A host learned from an ARP packet: its address pair and where it is
/// attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Host {
    /// The host's IPv4 address.
    pub ipv4: Ipv4Addr,
    /// The host's MAC address.
    pub mac: MacAddr,
    /// The switch the host is attached to.
    pub switch: SwitchId,
    /// The access port the host is attached to on that switch.
    pub port: Port,
}

/// A simple cycle in the topology graph, in the canonical form of §4.1:
/// starting at its smallest vertex, oriented so the second element is
/// smaller than the last.
///
/// Kept as a plain ordered vector rather than a set: direction and position
/// within the cycle are load-bearing for backup-neighbour selection (§9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle(pub Vec<SwitchId>);

impl Cycle {
    /// Number of vertices in the cycle.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// A cycle is never empty by construction; this is here only to satisfy
    /// clippy's `len_without_is_empty` and documents the invariant.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if `sw` participates in this cycle.
    pub fn contains(&self, sw: SwitchId) -> bool {
        self.0.contains(&sw)
    }

    /// Position of `sw` within the cycle, if present.
    pub fn position(&self, sw: SwitchId) -> Option<usize> {
        self.0.iter().position(|&v| v == sw)
    }

    /// The vertex at position `p + d` modulo the cycle length, where `d` is
    /// `+1` or `-1`. Uses explicit modular arithmetic rather than catching
    /// an index error (§9).
    pub fn neighbour(&self, p: usize, d: i64) -> SwitchId {
        let k = self.0.len() as i64;
        let idx = ((p as i64 + d).rem_euclid(k)) as usize;
        self.0[idx]
    }
}

/// The set of all simple cycles currently known for a topology, in
/// canonical form, with no duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleCatalogue(pub Vec<Cycle>);

impl CycleCatalogue {
    /// Number of cycles in the catalogue.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the catalogue has no cycles.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the cycles.
    pub fn iter(&self) -> std::slice::Iter<'_, Cycle> {
        self.0.iter()
    }
}

/// An ordered sequence of distinct switches, as returned by the
/// [`crate::path_oracle::PathOracle`]. `n = 0` is the same-switch case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path(pub Vec<SwitchId>);

impl Path {
    /// Number of switches on the path.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the path is empty (malformed — see [`crate::EngineError::EmptyPath`]).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first switch on the path.
    pub fn first(&self) -> Option<SwitchId> {
        self.0.first().copied()
    }

    /// The last switch on the path.
    pub fn last(&self) -> Option<SwitchId> {
        self.0.last().copied()
    }
}

/// Ethernet frame type tags the engine cares about; see the `frame` module
/// for the actual byte-level decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EthType {
    /// `0x0806`
    Arp,
    /// `0x0800`
    Ipv4,
    /// Anything else, carried through opaquely.
    Other(u16),
}

impl EthType {
    /// Decode the raw 16-bit ethertype field.
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0x0806 => EthType::Arp,
            0x0800 => EthType::Ipv4,
            other => EthType::Other(other),
        }
    }

    /// Encode back to the raw 16-bit ethertype field.
    pub fn raw(&self) -> u16 {
        match self {
            EthType::Arp => 0x0806,
            EthType::Ipv4 => 0x0800,
            EthType::Other(v) => *v,
        }
    }
}

/// The tuple the flow programmer matches on: ethertype plus the forward
/// direction's source/destination addresses, plus the ingress port the
/// first packet of the flow arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowTuple {
    /// The ethertype to match (always IPv4 in this engine's usage).
    pub eth_type: EthType,
    /// Source IPv4 address.
    pub ipv4_src: Ipv4Addr,
    /// Destination IPv4 address.
    pub ipv4_dst: Ipv4Addr,
    /// The port the triggering packet entered `s0` on.
    pub in_port: Port,
}

impl FlowTuple {
    /// The symmetric reverse-direction tuple: `back_info` in the original
    /// source, `(eth_type, ipv4_dst, ipv4_src)`. `in_port` is not
    /// meaningful in the reverse direction and is carried through unchanged
    /// only so callers can reuse the struct; flow programming never reads
    /// it on the reverse tuple.
    pub fn reversed(&self) -> FlowTuple {
        FlowTuple {
            eth_type: self.eth_type,
            ipv4_src: self.ipv4_dst,
            ipv4_dst: self.ipv4_src,
            in_port: self.in_port,
        }
    }
}

/// Path weighting mode, chosen once at startup (§6) and passed by the
/// dispatcher to the [`crate::path_oracle::PathOracle`] on every IPv4
/// packet-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightMode {
    /// Precomputed hop-count shortest paths.
    Hop,
    /// k-shortest paths by measured link delay.
    Delay,
    /// Best path by measured link bandwidth.
    Bandwidth,
}

/// Monotonically increasing OpenFlow group identifier. Never reused within
/// the controller's lifetime (§3, §9); forward flows use `gid`, reverse
/// flows use `gid + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId(pub u32);

impl GroupId {
    /// The paired reverse-direction group id.
    pub fn reverse(&self) -> GroupId {
        GroupId(self.0 + 1)
    }
}
