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

//! # PathOracle
//!
//! The engine treats path computation as an external contract (spec §4.4):
//! topology weighting, k-shortest-paths by delay, and bandwidth-aware
//! routing are out of scope here. [`CachedHopPathOracle`] is the one
//! concrete implementation this crate ships, covering the `hop` weight
//! mode so the rest of the engine is exercisable without a fabricated
//! measurement subsystem standing in for `delay`/`bandwidth`.

use crate::graph::AdjacencyGraph;
use crate::types::{Path, SwitchId, WeightMode};
use std::collections::HashMap;
use std::sync::RwLock;

/// The primary path plus, optionally, a distinct alternate the oracle was
/// also able to compute. [`crate::flow_programmer`] does not currently
/// consume `backup`; it is part of the contract for a future explicit
/// reroute feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPair {
    /// The path to program.
    pub primary: Path,
    /// An alternate path, if the oracle found a distinct one.
    pub backup: Option<Path>,
}

/// External path-computation contract. An implementation may be backed by
/// precomputed shortest paths, live delay measurements, or bandwidth
/// telemetry; the engine never cares which.
pub trait PathOracle {
    /// Compute the path pair from `src` to `dst` under `weight`. Returns a
    /// [`PathPair`] with an empty `primary` (see
    /// [`crate::types::Path::is_empty`]) if no path exists.
    fn paths(&self, src: SwitchId, dst: SwitchId, weight: WeightMode) -> PathPair;
}

/// Reference [`PathOracle`] for the `hop` weight mode: all-pairs shortest
/// paths over the unweighted topology graph, computed with
/// `petgraph::algo::astar` (a direct specialisation of Dijkstra's
/// algorithm with a zero heuristic, chosen over the lower-level
/// `petgraph::algo::dijkstra` because it returns the path itself, not just
/// distances), cached behind a `RwLock` and recomputed on demand by
/// [`CachedHopPathOracle::refresh`].
///
/// `delay` and `bandwidth` modes have no real measurement collaborator in
/// this engine (that is an out-of-scope topology concern, §1), so they
/// delegate to the same hop-count cache rather than fabricate one.
#[derive(Debug, Default)]
pub struct CachedHopPathOracle {
    cache: RwLock<HashMap<(SwitchId, SwitchId), Path>>,
}

impl CachedHopPathOracle {
    /// An oracle with an empty cache; call [`Self::refresh`] before use.
    pub fn new() -> Self {
        CachedHopPathOracle {
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Recompute all-pairs shortest paths over `graph` and replace the
    /// cache wholesale. Called whenever the topology collaborator reports
    /// a change and `weight` is (or may become) `hop`.
    pub fn refresh(&self, graph: &AdjacencyGraph) {
        let nodes: Vec<SwitchId> = graph.nodes().collect();
        let mut cache = HashMap::with_capacity(nodes.len() * nodes.len());
        for &src in &nodes {
            for &dst in &nodes {
                if src == dst {
                    continue;
                }
                if let Some((_, path)) = petgraph::algo::astar(graph, src, |n| n == dst, |_| 1u32, |_| 0u32) {
                    cache.insert((src, dst), Path(path));
                }
            }
        }
        *self.cache.write().expect("path oracle cache lock poisoned") = cache;
    }
}

impl PathOracle for CachedHopPathOracle {
    fn paths(&self, src: SwitchId, dst: SwitchId, _weight: WeightMode) -> PathPair {
        let primary = self
            .cache
            .read()
            .expect("path oracle cache lock poisoned")
            .get(&(src, dst))
            .cloned()
            .unwrap_or_else(|| Path(Vec::new()));
        PathPair { primary, backup: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sw(id: u64) -> SwitchId {
        SwitchId(id)
    }

    #[test]
    fn finds_shortest_path_on_a_simple_chain() {
        let mut g = AdjacencyGraph::new();
        g.add_edge(sw(1), sw(2), ());
        g.add_edge(sw(2), sw(3), ());
        g.add_edge(sw(1), sw(4), ());
        g.add_edge(sw(4), sw(3), ());
        let oracle = CachedHopPathOracle::new();
        oracle.refresh(&g);
        let pair = oracle.paths(sw(1), sw(3), WeightMode::Hop);
        assert_eq!(pair.primary.len(), 3);
        assert_eq!(pair.primary.first(), Some(sw(1)));
        assert_eq!(pair.primary.last(), Some(sw(3)));
    }

    #[test]
    fn unreachable_pair_yields_empty_path() {
        let mut g = AdjacencyGraph::new();
        g.add_edge(sw(1), sw(2), ());
        g.add_edge(sw(3), sw(4), ());
        let oracle = CachedHopPathOracle::new();
        oracle.refresh(&g);
        let pair = oracle.paths(sw(1), sw(4), WeightMode::Hop);
        assert!(pair.primary.is_empty());
    }
}
