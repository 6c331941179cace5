//! Subgraph matching: all embeddings of a pattern graph into a host graph.
//!
//! Pattern edges are matched one at a time in pattern order, so every
//! pattern edge after the first must touch an already matched node (which
//! holds for fragments, as they grow edge by edge). Embeddings sharing a
//! prefix of matched edges come out next to each other.

use bit_set::BitSet;

use crate::{graph::Graph, types::Atoms};

/// One match: host node per pattern node, host edge per pattern edge.
pub(crate) type Match = (Vec<usize>, Vec<usize>);

struct MatchState<'a> {
    pattern: &'a Graph,
    target: &'a Graph,
    node_map: Vec<Option<usize>>,
    edge_map: Vec<usize>,
    target_nodes: BitSet,
    target_edges: BitSet,
    matches: Vec<Match>,
}

impl<'a> MatchState<'a> {
    fn new(pattern: &'a Graph, target: &'a Graph) -> Self {
        Self {
            pattern,
            target,
            node_map: vec![None; pattern.node_count()],
            edge_map: vec![0; pattern.edge_count()],
            target_nodes: BitSet::with_capacity(target.node_count()),
            target_edges: BitSet::with_capacity(target.edge_count()),
            matches: Vec::new(),
        }
    }

    fn node_fits(&self, pattern_node: usize, target_node: usize) -> bool {
        !self.target_nodes.contains(target_node)
            && self.pattern.node_type(pattern_node) == self.target.node_type(target_node)
    }

    fn edge_fits(&self, pattern_edge: usize, target_edge: usize) -> bool {
        !self.target_edges.contains(target_edge)
            && self.pattern.edge_type(pattern_edge) == self.target.edge_type(target_edge)
    }

    fn bind_node(&mut self, p: usize, t: usize) {
        self.node_map[p] = Some(t);
        self.target_nodes.insert(t);
    }

    fn unbind_node(&mut self, p: usize, t: usize) {
        self.node_map[p] = None;
        self.target_nodes.remove(t);
    }

    fn record(&mut self) {
        let nodes = self.node_map.iter().map(|n| n.unwrap_or(usize::MAX)).collect();
        self.matches.push((nodes, self.edge_map.clone()));
    }

    fn try_edge(&mut self, depth: usize, target_edge: usize) {
        self.edge_map[depth] = target_edge;
        self.target_edges.insert(target_edge);
        self.step(depth + 1);
        self.target_edges.remove(target_edge);
    }

    fn step(&mut self, depth: usize) {
        if depth == self.pattern.edge_count() {
            self.record();
            return;
        }
        let pe = self.pattern.edge(depth);
        let (ps, pd) = (pe.src(), pe.dst());
        match (self.node_map[ps], self.node_map[pd]) {
            (Some(ts), Some(td)) => {
                let candidates: Vec<usize> = self.target.node(ts).edges().to_vec();
                for te in candidates {
                    if self.target.edge(te).other(ts) == td && self.edge_fits(depth, te) {
                        self.try_edge(depth, te);
                    }
                }
            }
            (Some(ts), None) => self.grow(depth, ts, pd),
            (None, Some(td)) => self.grow(depth, td, ps),
            (None, None) => {
                for te in 0..self.target.edge_count() {
                    if !self.edge_fits(depth, te) {
                        continue;
                    }
                    let edge = self.target.edge(te);
                    for (a, b) in [(edge.src(), edge.dst()), (edge.dst(), edge.src())] {
                        if self.node_fits(ps, a) && self.node_fits(pd, b) {
                            self.bind_node(ps, a);
                            self.bind_node(pd, b);
                            self.try_edge(depth, te);
                            self.unbind_node(pd, b);
                            self.unbind_node(ps, a);
                        }
                    }
                }
            }
        }
    }

    fn grow(&mut self, depth: usize, from: usize, new: usize) {
        let candidates: Vec<usize> = self.target.node(from).edges().to_vec();
        for te in candidates {
            let t = self.target.edge(te).other(from);
            if self.edge_fits(depth, te) && self.node_fits(new, t) {
                self.bind_node(new, t);
                self.try_edge(depth, te);
                self.unbind_node(new, t);
            }
        }
    }
}

impl Graph {
    /// Return all embeddings of `sub` into this graph. Automorphic images
    /// are distinct embeddings. Patterns containing chain pseudo-nodes are
    /// not matched.
    pub(crate) fn embed(&self, sub: &Graph) -> Vec<Match> {
        if sub.nodes().iter().any(|n| Atoms::is_chain(n.ty())) {
            return Vec::new();
        }
        if sub.edge_count() == 0 {
            if sub.node_count() != 1 {
                return Vec::new();
            }
            return (0..self.node_count())
                .filter(|&n| self.node_type(n) == sub.node_type(0))
                .map(|n| (vec![n], Vec::new()))
                .collect();
        }
        let mut state = MatchState::new(sub, self);
        state.step(0);
        state.matches
    }

    /// Whether `sub` occurs in this graph.
    pub fn contains(&self, sub: &Graph) -> bool {
        !self.embed(sub).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bonds;

    fn path(types: &[u32]) -> Graph {
        let mut g = Graph::new();
        for &t in types {
            g.add_node(t);
        }
        for i in 1..types.len() {
            g.add_edge(i - 1, i, Bonds::SINGLE).unwrap();
        }
        g
    }

    #[test]
    fn symmetric_edge_embeds_twice() {
        let host = path(&[6, 6, 8]);
        let sub = path(&[6, 6]);
        let found = host.embed(&sub);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|(_, e)| e == &vec![0]));
    }

    #[test]
    fn types_must_agree() {
        let host = path(&[6, 6, 8]);
        assert_eq!(host.embed(&path(&[6, 8])).len(), 1);
        assert!(!host.contains(&path(&[8, 8])));
        assert_eq!(host.embed(&path(&[6])).len(), 2);
    }

    #[test]
    fn ring_closure_matches_ring() {
        let mut tri = path(&[6, 6, 6]);
        tri.add_edge(2, 0, Bonds::SINGLE).unwrap();
        let mut host = tri.clone();
        let o = host.add_node(8);
        host.add_edge(0, o, Bonds::SINGLE).unwrap();
        // 3 rotations times 2 directions
        assert_eq!(host.embed(&tri).len(), 6);
        assert!(!path(&[6, 6, 6, 6]).contains(&tri));
    }

    #[test]
    fn shared_prefixes_are_adjacent() {
        let host = path(&[6, 6, 6, 6]);
        let found = host.embed(&path(&[6, 6, 6]));
        for w in found.windows(2) {
            if w[0].1[0] == w[1].1[0] {
                continue;
            }
            // once the first edge changes it never comes back
            assert!(found
                .iter()
                .skip_while(|m| m.1[0] != w[1].1[0])
                .all(|m| m.1[0] != w[0].1[0]));
        }
    }
}
