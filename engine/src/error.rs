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

//! Module containing all error types

use crate::types::SwitchId;
use thiserror::Error;

/// Main error type returned by the engine's pure computations.
///
/// None of these are ever allowed to escape the dispatcher's event loop:
/// every handler matches on `Result<_, EngineError>` at its own boundary,
/// logs, and moves on. The next packet-in (or a subsequent ARP) re-drives
/// the computation, per the best-effort, reconverging design of §5/§7.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The cycle enumerator was asked for a length outside `[3, |V|]`.
    #[error("cycle length {requested} is out of range [3, {max}]")]
    InvalidCycleLength {
        /// The length that was requested.
        requested: usize,
        /// The largest valid length, i.e. the vertex count.
        max: usize,
    },
    /// `link_to_port` has no entry for a link that appears on the path or
    /// on a cycle used for backup.
    #[error("dpid:{src:?} -> dpid:{dst:?} is not in links")]
    MissingLink {
        /// The link's source switch.
        src: SwitchId,
        /// The link's destination switch.
        dst: SwitchId,
    },
    /// `access_table` has no entry for the destination host's IP.
    #[error("no access port found for destination host")]
    MissingAccessPort,
    /// The path returned by the [`crate::path_oracle::PathOracle`] is
    /// missing or empty.
    #[error("Path error!")]
    EmptyPath,
    /// A path of length 1 (a single switch) was handed to the round-trip
    /// programmer; it should have been routed to the same-switch fast path
    /// instead.
    #[error("path of length 1 is not a valid round-trip path")]
    DegeneratePath,
}
