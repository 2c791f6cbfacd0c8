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

//! Demo wiring for [`failover_engine`]: parses the `--weight` flag, spins
//! up a small fixed topology, and drives a [`ReactiveDispatcher`] from a
//! channel of inbound events until the channel closes. Actual OpenFlow
//! transport (accepting switch connections, decoding the wire format) is
//! out of scope; a real deployment replaces [`DemoGateway`] and the event
//! source with a transport binding and keeps everything else.

use clap::Clap;
use log::*;

use failover_engine::dispatcher::{DpState, InboundEvent, ReactiveDispatcher};
use failover_engine::gateway::ChannelGateway;
use failover_engine::graph::{enumerate_cycles, AdjacencyGraph};
use failover_engine::path_oracle::CachedHopPathOracle;
use failover_engine::topology::TopologyView;
use failover_engine::types::{BufferId, Host, MacAddr, Port, SwitchId, WeightMode};

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::channel;

#[derive(Clap, Debug)]
#[clap(name = "failover-controller", author = "The Failover Engine Authors")]
struct CommandLineArguments {
    /// Path weighting mode used for every IPv4 flow.
    #[clap(short = 'w', long, default_value = "hop")]
    weight: WeightArg,
}

#[derive(Debug, Clone, Copy)]
enum WeightArg {
    Hop,
    Delay,
    Bandwidth,
}

impl std::str::FromStr for WeightArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hop" => Ok(WeightArg::Hop),
            "delay" => Ok(WeightArg::Delay),
            "bw" | "bandwidth" => Ok(WeightArg::Bandwidth),
            other => Err(format!("unknown weight mode `{}` (expected hop, delay, or bw)", other)),
        }
    }
}

impl From<WeightArg> for WeightMode {
    fn from(w: WeightArg) -> Self {
        match w {
            WeightArg::Hop => WeightMode::Hop,
            WeightArg::Delay => WeightMode::Delay,
            WeightArg::Bandwidth => WeightMode::Bandwidth,
        }
    }
}

/// A three-switch demo topology: `s1 -- s2 -- s3`, each with one access
/// port hosting a single fixed IPv4/MAC pair.
fn demo_topology() -> TopologyView {
    let mut graph = AdjacencyGraph::new();
    graph.add_edge(SwitchId(1), SwitchId(2), ());
    graph.add_edge(SwitchId(2), SwitchId(3), ());

    let mut link_to_port = HashMap::new();
    link_to_port.insert((SwitchId(1), SwitchId(2)), (Port(1), Port(1)));
    link_to_port.insert((SwitchId(2), SwitchId(3)), (Port(2), Port(1)));

    let mut access_ports = HashMap::new();
    access_ports.insert(SwitchId(1), HashSet::from([Port(10)]));
    access_ports.insert(SwitchId(2), HashSet::from([Port(10)]));
    access_ports.insert(SwitchId(3), HashSet::from([Port(10)]));

    let mut access_table = HashMap::new();
    access_table.insert(
        (SwitchId(1), Port(10)),
        Host {
            ipv4: "10.0.0.1".parse().unwrap(),
            mac: MacAddr([0x02, 0, 0, 0, 0, 1]),
            switch: SwitchId(1),
            port: Port(10),
        },
    );
    access_table.insert(
        (SwitchId(3), Port(10)),
        Host {
            ipv4: "10.0.0.3".parse().unwrap(),
            mac: MacAddr([0x02, 0, 0, 0, 0, 3]),
            switch: SwitchId(3),
            port: Port(10),
        },
    );

    let cycles = enumerate_cycles(&graph);
    TopologyView::new(graph, link_to_port, access_ports, access_table, cycles)
}

/// Build the raw bytes of an Ethernet frame carrying an IPv4 header with no
/// payload, the minimum `PacketIn` needs to classify as IPv4.
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

fn main() {
    pretty_env_logger::init();
    let args = CommandLineArguments::parse();
    let weight: WeightMode = args.weight.into();
    info!("starting failover-controller, weight mode = {:?}", weight);

    let topology = demo_topology();
    let oracle = CachedHopPathOracle::new();
    oracle.refresh(topology.graph());

    let (tx, rx) = channel();
    let gateway = ChannelGateway::new(tx);
    let dispatcher = ReactiveDispatcher::new(topology, oracle, gateway, weight);

    for dp in [SwitchId(1), SwitchId(2), SwitchId(3)] {
        dispatcher.handle(InboundEvent::StateChange { dp, state: DpState::Up });
    }
    info!("{} switches registered", dispatcher.registry().connected_switches().len());

    // Stand in for a real transport binding: one IPv4 packet-in from the
    // host behind s1, addressed to the host behind s3.
    let frame = eth_ipv4(
        [0x02, 0, 0, 0, 0, 3],
        [0x02, 0, 0, 0, 0, 1],
        [10, 0, 0, 1],
        [10, 0, 0, 3],
    );
    dispatcher.handle(InboundEvent::PacketIn {
        dp: SwitchId(1),
        in_port: Port(10),
        buffer_id: BufferId::NO_BUFFER,
        data: frame,
    });

    for (dp, msg) in rx.try_iter() {
        debug!("would send to {}: {:?}", dp, msg);
    }
}
