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

//! Minimal Ethernet/ARP/IPv4 header reading, covering only the fields the
//! dispatcher needs to classify a packet-in (supplement to the distilled
//! spec, which assumes a [`crate::types::FlowTuple`] materializes from
//! nowhere; the original decodes real packets with `ryu.lib.packet`, which
//! has no equivalent in the teacher's dependency set). No checksum
//! validation, no VLAN tags, no IPv6: this engine only ever needs to know
//! "is this ARP or IPv4, and what are the addresses".

use crate::types::{EthType, MacAddr};
use std::net::Ipv4Addr;

/// A parsed Ethernet header plus a reference to its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EtherFrame<'a> {
    /// Destination MAC.
    pub dst_mac: MacAddr,
    /// Source MAC.
    pub src_mac: MacAddr,
    /// The ethertype field.
    pub eth_type: EthType,
    /// Everything after the 14-byte Ethernet header.
    pub payload: &'a [u8],
}

impl<'a> EtherFrame<'a> {
    /// Parse the 14-byte Ethernet header prefix of `data`. Returns `None`
    /// if `data` is too short to contain one.
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        if data.len() < 14 {
            return None;
        }
        Some(EtherFrame {
            dst_mac: MacAddr([data[0], data[1], data[2], data[3], data[4], data[5]]),
            src_mac: MacAddr([data[6], data[7], data[8], data[9], data[10], data[11]]),
            eth_type: EthType::from_raw(u16::from_be_bytes([data[12], data[13]])),
            payload: &data[14..],
        })
    }
}

/// The ARP opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpOp {
    /// `ARPOP_REQUEST` (1).
    Request,
    /// `ARPOP_REPLY` (2).
    Reply,
    /// Anything else.
    Other(u16),
}

/// The subset of an ARP packet (RFC 826, Ethernet/IPv4 only) the access
/// table and ARP responder need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpPacket {
    /// The opcode.
    pub operation: ArpOp,
    /// Sender hardware address.
    pub sender_mac: MacAddr,
    /// Sender protocol address.
    pub sender_ip: Ipv4Addr,
    /// Target protocol address.
    pub target_ip: Ipv4Addr,
}

impl ArpPacket {
    /// Parse an ARP packet assuming Ethernet (hw len 6) over IPv4
    /// (proto len 4), the only combination this engine ever sees.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        if payload.len() < 28 {
            return None;
        }
        let operation = match u16::from_be_bytes([payload[6], payload[7]]) {
            1 => ArpOp::Request,
            2 => ArpOp::Reply,
            other => ArpOp::Other(other),
        };
        let sender_mac = MacAddr([payload[8], payload[9], payload[10], payload[11], payload[12], payload[13]]);
        let sender_ip = Ipv4Addr::new(payload[14], payload[15], payload[16], payload[17]);
        let target_ip = Ipv4Addr::new(payload[24], payload[25], payload[26], payload[27]);
        Some(ArpPacket {
            operation,
            sender_mac,
            sender_ip,
            target_ip,
        })
    }
}

/// The subset of an IPv4 header the flow programmer needs: just the
/// source and destination addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Header {
    /// Source address.
    pub src: Ipv4Addr,
    /// Destination address.
    pub dst: Ipv4Addr,
}

impl Ipv4Header {
    /// Parse the fixed-offset source/destination fields of an IPv4 header.
    /// Options are ignored; `ihl` is not consulted since nothing past the
    /// addresses is read.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        if payload.len() < 20 {
            return None;
        }
        Some(Ipv4Header {
            src: Ipv4Addr::new(payload[12], payload[13], payload[14], payload[15]),
            dst: Ipv4Addr::new(payload[16], payload[17], payload[18], payload[19]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_an_arp_request_inside_an_ethernet_frame() {
        let mut data = vec![0u8; 14];
        data[12] = 0x08;
        data[13] = 0x06; // ARP
        let mut arp = vec![0u8; 28];
        arp[0] = 0x00;
        arp[1] = 0x01; // hw type ethernet
        arp[2] = 0x08;
        arp[3] = 0x00; // proto type ipv4
        arp[4] = 6;
        arp[5] = 4;
        arp[6] = 0x00;
        arp[7] = 0x01; // request
        arp[8..14].copy_from_slice(&[0x02, 0, 0, 0, 0, 1]);
        arp[14..18].copy_from_slice(&[10, 0, 0, 1]);
        arp[24..28].copy_from_slice(&[10, 0, 0, 2]);
        data.extend_from_slice(&arp);

        let frame = EtherFrame::parse(&data).unwrap();
        assert_eq!(frame.eth_type, EthType::Arp);
        let packet = ArpPacket::parse(frame.payload).unwrap();
        assert_eq!(packet.operation, ArpOp::Request);
        assert_eq!(packet.sender_ip, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(packet.target_ip, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(packet.sender_mac, MacAddr([0x02, 0, 0, 0, 0, 1]));
    }

    #[test]
    fn parses_ipv4_addresses() {
        let mut payload = vec![0u8; 20];
        payload[0] = 0x45; // version/ihl
        payload[12..16].copy_from_slice(&[192, 168, 0, 1]);
        payload[16..20].copy_from_slice(&[192, 168, 0, 2]);
        let header = Ipv4Header::parse(&payload).unwrap();
        assert_eq!(header.src, Ipv4Addr::new(192, 168, 0, 1));
        assert_eq!(header.dst, Ipv4Addr::new(192, 168, 0, 2));
    }

    #[test]
    fn too_short_buffers_are_rejected() {
        assert!(EtherFrame::parse(&[0u8; 10]).is_none());
        assert!(ArpPacket::parse(&[0u8; 10]).is_none());
        assert!(Ipv4Header::parse(&[0u8; 10]).is_none());
    }
}
