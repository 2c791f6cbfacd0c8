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

//! # CycleEnumerator
//!
//! Enumerates every simple cycle of length `k`, for each `k` in `[3, |V|]`,
//! of an undirected topology graph, in the canonical form of spec §4.1: a
//! cycle is represented starting at its smallest vertex, oriented so that
//! the second element is smaller than the last.
//!
//! This is called only when the topology collaborator reports a change,
//! never on the packet-in hot path; its worst-case complexity is
//! exponential in `|V|`.

use crate::types::{Cycle, CycleCatalogue, SwitchId};
use petgraph::graphmap::UnGraphMap;

/// Undirected topology graph, keyed directly by [`SwitchId`] (mirroring the
/// original `{dpid: {dpid, ...}}` adjacency dict one-to-one).
pub type AdjacencyGraph = UnGraphMap<SwitchId, ()>;

/// Enumerate every simple cycle of every length `3..=|V|` in `graph`,
/// deduplicated under the canonical orientation.
pub fn enumerate_cycles(graph: &AdjacencyGraph) -> CycleCatalogue {
    let n = graph.node_count();
    let mut cycles = Vec::new();
    for k in 3..=n {
        cycles.extend(enumerate_cycles_of_length(graph, k));
    }
    CycleCatalogue(cycles)
}

/// Enumerate every simple cycle of exactly length `k` in `graph`.
///
/// For every vertex `v` (taken in ascending order, stopping once fewer than
/// `k` vertices remain that could be `> v`), DFS-extends a path rooted at
/// `v`: while the path is shorter than `k - 1`, any unvisited neighbour
/// greater than `v` may be appended (this guarantees `v` ends up the
/// minimum of the cycle); at length `k - 1`, the path may only be closed by
/// a neighbour of the last vertex that is also a neighbour of `v`, greater
/// than the path's second vertex (this picks one of the two rotations that
/// fix `v`, breaking the reflection tie per §4.1).
pub fn enumerate_cycles_of_length(graph: &AdjacencyGraph, k: usize) -> Vec<Cycle> {
    let mut nodes: Vec<SwitchId> = graph.nodes().collect();
    nodes.sort();
    if k < 3 || k > nodes.len() {
        return Vec::new();
    }

    let mut found = Vec::new();
    for &v in &nodes {
        let mut path = vec![v];
        extend(graph, k, v, &mut path, &mut found);
    }
    found
}

fn extend(
    graph: &AdjacencyGraph,
    k: usize,
    root: SwitchId,
    path: &mut Vec<SwitchId>,
    found: &mut Vec<Cycle>,
) {
    if path.len() == k - 1 {
        let last = *path.last().unwrap();
        let second = path[1];
        for u in graph.neighbors(last) {
            if u > second && !path.contains(&u) && graph.contains_edge(root, u) {
                let mut cycle = path.clone();
                cycle.push(u);
                found.push(Cycle(cycle));
            }
        }
        return;
    }

    let last = *path.last().unwrap();
    for u in graph.neighbors(last) {
        if u > root && !path.contains(&u) {
            path.push(u);
            extend(graph, k, root, path, found);
            path.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_from_edges(edges: &[(u64, u64)]) -> AdjacencyGraph {
        let mut g = AdjacencyGraph::new();
        for &(a, b) in edges {
            g.add_edge(SwitchId(a), SwitchId(b), ());
        }
        g
    }

    #[test]
    fn triangle_k3_has_exactly_one_cycle() {
        // Boundary scenario #1: G = K3 on {1,2,3}.
        let g = graph_from_edges(&[(1, 2), (2, 3), (1, 3)]);
        let cat = enumerate_cycles(&g);
        assert_eq!(cat.0, vec![Cycle(vec![SwitchId(1), SwitchId(2), SwitchId(3)])]);
    }

    #[test]
    fn pendant_vertex_does_not_extend_the_triangle() {
        // Boundary scenario #2: G = {1:{2,3}, 2:{1,3}, 3:{1,2,4}, 4:{3}}.
        let g = graph_from_edges(&[(1, 2), (1, 3), (2, 3), (3, 4)]);
        let cat = enumerate_cycles(&g);
        assert_eq!(cat.len(), 1);
        assert_eq!(cat.0[0], Cycle(vec![SwitchId(1), SwitchId(2), SwitchId(3)]));
    }

    #[test]
    fn square_has_exactly_one_cycle_of_length_four() {
        let g = graph_from_edges(&[(1, 2), (2, 3), (3, 4), (4, 1)]);
        let cat = enumerate_cycles(&g);
        assert_eq!(cat.len(), 1);
        assert_eq!(
            cat.0[0],
            Cycle(vec![SwitchId(1), SwitchId(2), SwitchId(3), SwitchId(4)])
        );
    }

    #[test]
    fn disjoint_edges_have_no_cycles() {
        let g = graph_from_edges(&[(1, 2), (3, 4)]);
        let cat = enumerate_cycles(&g);
        assert!(cat.is_empty());
    }

    #[test]
    fn two_overlapping_triangles_sharing_an_edge() {
        // 1-2-3 triangle and 2-3-4 triangle sharing edge (2,3); also forms
        // the outer 4-cycle 1-2-4-3.
        let g = graph_from_edges(&[(1, 2), (2, 3), (1, 3), (2, 4), (3, 4)]);
        let cat = enumerate_cycles(&g);
        let mut as_vecs: Vec<Vec<u64>> = cat.0.iter().map(|c| c.0.iter().map(|s| s.0).collect()).collect();
        as_vecs.sort();
        assert_eq!(
            as_vecs,
            vec![vec![1, 2, 3], vec![1, 2, 4, 3], vec![2, 3, 4]]
        );
    }
}
