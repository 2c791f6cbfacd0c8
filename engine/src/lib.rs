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

#![deny(missing_docs)]

//! # failover_engine
//!
//! A reactive forwarding core for an OpenFlow 1.3 SDN controller. Given a
//! primary path between two edge switches and a catalogue of simple cycles
//! in the topology, this crate decides what forwarding entries to install at
//! every switch along the path, which cycle neighbour to use as a
//! fast-failover backup next-hop, and what "return-stitch" entries are
//! needed on cycle switches that sit off the path so that a packet diverted
//! around a failed link finds its way back.
//!
//! ## Structure
//!
//! - **[`graph`]**: cycle enumeration over an undirected topology graph.
//! - **[`topology`]**: read-only view of the external topology collaborator
//!   ([`topology::TopologyView`]).
//! - **[`path_oracle`]**: the primary/backup path contract
//!   ([`path_oracle::PathOracle`]), plus a cache-backed reference
//!   implementation for hop-count weighting.
//! - **[`classify`]**: the pure per-hop classification that drives the flow
//!   programmer.
//! - **[`flow_programmer`]**: the hard subsystem — turns a path, a backup
//!   path, and a cycle catalogue into the set of OpenFlow messages that
//!   realise forward, reverse, and failover forwarding.
//! - **[`dispatcher`]**: the event loop that turns packet-in and
//!   state-change events into calls on the above.
//! - **[`openflow`]**: the small subset of OpenFlow 1.3 messages this
//!   engine consumes and emits.
//!
//! None of these components perform their own I/O: [`gateway::MessageGateway`]
//! is the single seam through which control messages leave the crate.

pub mod classify;
pub mod dispatcher;
pub mod error;
pub mod flow_programmer;
pub mod frame;
pub mod gateway;
pub mod graph;
pub mod group_id;
pub mod openflow;
pub mod path_oracle;
pub mod registry;
pub mod topology;
pub mod types;

pub use error::EngineError;
