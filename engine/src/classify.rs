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

//! Pure per-hop classification (spec §4.2.1, §4.2.2, §9).
//!
//! The original source interleaves this decision with message emission in
//! one long branching walk, appending to two parallel lists (`path_cir`,
//! `cir_dir`) that can drift out of sync. This module replaces that with a
//! single pure function per hop, returning a tagged [`HopCase`]; a second
//! pure function in [`crate::flow_programmer`] renders the variant into
//! messages. No `IndexError`-style catching: cycle neighbours are always
//! found with explicit modular arithmetic via [`crate::types::Cycle::neighbour`].

use crate::types::{Cycle, CycleCatalogue, SwitchId};

/// Which way a cycle is walked from an on-path switch to reach its backup
/// next-hop (spec §4.2.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Walk the cycle in increasing-index order.
    Cw,
    /// Walk the cycle in decreasing-index order.
    Ccw,
}

impl Direction {
    /// The signed step this direction represents in cycle-index space.
    pub fn step(&self) -> i64 {
        match self {
            Direction::Cw => 1,
            Direction::Ccw => -1,
        }
    }

    /// The opposite direction.
    pub fn flip(&self) -> Direction {
        match self {
            Direction::Cw => Direction::Ccw,
            Direction::Ccw => Direction::Cw,
        }
    }
}

/// A cycle selected to provide backup coverage for one hop, together with
/// the direction chosen and the concrete backup next-hop switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupChoice {
    /// Index of the covering cycle within the catalogue passed to
    /// `classify`/`classify_endpoint`.
    pub cycle: usize,
    /// The direction the cycle is walked from `cur` to reach `bp`.
    pub dir: Direction,
    /// The backup next-hop switch: a cycle-neighbour of `cur` other than
    /// the on-path neighbour whose edge is covered.
    pub bp: SwitchId,
}

/// The classification of one interior on-path hop against the cycle
/// catalogue (spec §4.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HopCase {
    /// Neither the incoming nor the outgoing edge at this hop is covered
    /// by any cycle. Plain forward/back entries only.
    NoBackup,
    /// Only the incoming edge `(prev, cur)` is covered. The edge actually
    /// covered by the cycle is protected in the direction that uses it as
    /// an egress, i.e. the backward direction; see
    /// [`crate::flow_programmer`] for the rendering.
    Case10(BackupChoice),
    /// Only the outgoing edge `(cur, next)` is covered. The forward
    /// direction is protected by an FF group.
    Case01(BackupChoice),
    /// Both edges are covered by the same cycle (three consecutive cycle
    /// vertices). Both directions get an FF group whose secondary bucket
    /// bounces traffic back onto the ingress port.
    Case11 {
        /// Index of the covering cycle.
        cycle: usize,
    },
}

/// The classification of an endpoint hop (`s0` or `sn`), which only ever
/// sees one on-path neighbour (spec §4.2.1: "s0 ... applies only the
/// 10/no-bp case, sn only the 01/no-bp case").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointCase {
    /// No cycle covers the single edge this endpoint has on `P`.
    NoBackup,
    /// The edge is covered; the endpoint's outward direction (forward at
    /// `s0`, backward at `sn`) gets an FF group.
    Protected(BackupChoice),
}

/// True if `a` and `b` are both in `cycle` and are cycle-adjacent (i.e. the
/// edge `(a, b)` is actually one of the cycle's edges, not merely two
/// vertices that happen to both appear in it).
fn edge_in_cycle(cycle: &Cycle, a: SwitchId, b: SwitchId) -> bool {
    match (cycle.position(a), cycle.position(b)) {
        (Some(pa), Some(pb)) => {
            let k = cycle.len() as i64;
            let pa = pa as i64;
            let pb = pb as i64;
            (pb - pa).rem_euclid(k) == 1 || (pa - pb).rem_euclid(k) == 1
        }
        _ => false,
    }
}

/// The first cycle in the catalogue (in catalogue order) whose edges
/// include `(a, b)`.
fn find_cycle_covering_edge(cycles: &CycleCatalogue, a: SwitchId, b: SwitchId) -> Option<(usize, &Cycle)> {
    cycles.iter().enumerate().find(|(_, c)| edge_in_cycle(c, a, b))
}

/// The first cycle covering both `(prev, cur)` and `(cur, next)` as cycle
/// edges, i.e. three consecutive cycle vertices walked in path order.
fn find_cycle_covering_triple(
    cycles: &CycleCatalogue,
    prev: SwitchId,
    cur: SwitchId,
    next: SwitchId,
) -> Option<(usize, &Cycle)> {
    cycles
        .iter()
        .enumerate()
        .find(|(_, c)| edge_in_cycle(c, prev, cur) && edge_in_cycle(c, cur, next))
}

/// Given a cycle, the current switch, and the on-path neighbour whose edge
/// to `cur` is covered by the cycle, compute the direction (§4.2.2) and the
/// resulting backup next-hop: the cycle-neighbour of `cur` that is *not*
/// `on_path_neighbour`.
fn backup_choice(cycle_idx: usize, cycle: &Cycle, cur: SwitchId, on_path_neighbour: SwitchId) -> BackupChoice {
    let p = cycle.position(cur).expect("cur must be in cycle");
    let q = cycle.position(on_path_neighbour).expect("on_path_neighbour must be in cycle");
    let k = cycle.len() as i64;
    // d = +1 if the on-path neighbour sits at (p+1) mod k, else -1.
    let d = if (q as i64 - p as i64).rem_euclid(k) == 1 {
        1
    } else {
        -1
    };
    let dir = if d == 1 { Direction::Cw } else { Direction::Ccw };
    // The backup next-hop walks the cycle opposite to the on-path neighbour.
    let bp = cycle.neighbour(p, -d);
    BackupChoice {
        cycle: cycle_idx,
        dir,
        bp,
    }
}

/// Classify an interior on-path hop `(prev, cur, next)` against the cycle
/// catalogue (spec §4.2.1). Cases are checked in order of specificity:
/// a single cycle covering both edges wins (`Case11`); failing that, a
/// cycle covering only the outgoing edge (`Case01`); failing that, a cycle
/// covering only the incoming edge (`Case10`); otherwise `NoBackup`.
pub fn classify(prev: SwitchId, cur: SwitchId, next: SwitchId, cycles: &CycleCatalogue) -> HopCase {
    if let Some((cycle, _)) = find_cycle_covering_triple(cycles, prev, cur, next) {
        return HopCase::Case11 { cycle };
    }
    if let Some((idx, c)) = find_cycle_covering_edge(cycles, cur, next) {
        return HopCase::Case01(backup_choice(idx, c, cur, next));
    }
    if let Some((idx, c)) = find_cycle_covering_edge(cycles, prev, cur) {
        return HopCase::Case10(backup_choice(idx, c, cur, prev));
    }
    HopCase::NoBackup
}

/// Classify an endpoint hop: `dp` is `s0` or `sn`, `neighbour` is its one
/// on-path neighbour (`s1` or `s_{n-1}` respectively).
pub fn classify_endpoint(dp: SwitchId, neighbour: SwitchId, cycles: &CycleCatalogue) -> EndpointCase {
    match find_cycle_covering_edge(cycles, dp, neighbour) {
        Some((idx, c)) => EndpointCase::Protected(backup_choice(idx, c, dp, neighbour)),
        None => EndpointCase::NoBackup,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sw(id: u64) -> SwitchId {
        SwitchId(id)
    }

    fn cat(cycles: Vec<Vec<u64>>) -> CycleCatalogue {
        CycleCatalogue(
            cycles
                .into_iter()
                .map(|v| Cycle(v.into_iter().map(SwitchId).collect()))
                .collect(),
        )
    }

    #[test]
    fn triangle_on_path_classifies_as_10_11_01() {
        // Boundary scenario #4: P=[s0,s1,s2], C=[s0,s1,s2].
        let cycles = cat(vec![vec![0, 1, 2]]);
        assert_eq!(
            classify_endpoint(sw(0), sw(1), &cycles),
            EndpointCase::Protected(BackupChoice {
                cycle: 0,
                dir: Direction::Cw,
                bp: sw(2)
            })
        );
        assert_eq!(classify(sw(0), sw(1), sw(2), &cycles), HopCase::Case11 { cycle: 0 });
        assert_eq!(
            classify_endpoint(sw(2), sw(1), &cycles),
            EndpointCase::Protected(BackupChoice {
                cycle: 0,
                dir: Direction::Ccw,
                bp: sw(0)
            })
        );
    }

    #[test]
    fn off_path_cycle_vertex_yields_10_then_01() {
        // Boundary scenario #5: P=[s1,s2,s3,s4], C=[s2,s3,s5] covers only
        // (s2,s3); s5 is off-path. (renumbered from spec's s1..s4, s4-off
        // to avoid clashing with 0-based path indices used elsewhere.)
        let cycles = cat(vec![vec![2, 3, 5]]);
        // hop at s2 (prev=s1, cur=s2, next=s3): outgoing edge (2,3) is
        // covered -> Case01.
        match classify(sw(1), sw(2), sw(3), &cycles) {
            HopCase::Case01(bc) => assert_eq!(bc.cycle, 0),
            other => panic!("expected Case01, got {:?}", other),
        }
        // hop at s3 (prev=s2, cur=s3, next=s4): incoming edge (2,3) is
        // covered, outgoing (3,4) is not -> Case10.
        match classify(sw(2), sw(3), sw(4), &cycles) {
            HopCase::Case10(bc) => assert_eq!(bc.cycle, 0),
            other => panic!("expected Case10, got {:?}", other),
        }
    }

    #[test]
    fn disjoint_cycle_yields_no_backup() {
        let cycles = cat(vec![vec![10, 11, 12]]);
        assert_eq!(classify(sw(1), sw(2), sw(3), &cycles), HopCase::NoBackup);
        assert_eq!(classify_endpoint(sw(1), sw(2), &cycles), EndpointCase::NoBackup);
    }

    #[test]
    fn backup_next_hop_is_never_the_on_path_predecessor() {
        // Invariant #2 from spec §8.
        let cycles = cat(vec![vec![1, 2, 3, 4, 5]]);
        if let HopCase::Case10(bc) = classify(sw(1), sw(2), sw(9), &cycles) {
            assert_ne!(bc.bp, sw(1));
            assert_eq!(bc.bp, sw(3));
        } else {
            panic!("expected Case10");
        }
    }
}
