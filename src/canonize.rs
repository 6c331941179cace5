//! Canonical code words for fragment graphs.
//!
//! A code word starts with the type of the root node (node 0) and has one
//! entry per edge: the smaller node index, the edge type, the type of the
//! node with the larger index and the larger index itself. Nodes are
//! numbered in the order in which the entries first reach them and entries
//! are sorted, which amounts to a breadth-first numbering from the root.
//! The canonical word of a graph is the smallest word over all such
//! numberings.
//!
//! Removing the last entry of a canonical word leaves the canonical word of
//! a connected subgraph. The search relies on this: it extends a fragment
//! only by entries that sort after the entry that created it and drops the
//! results whose word is not canonical.

use std::{cmp::Ordering, iter};

use crate::graph::Graph;

/// One entry of a code word.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CodeEdge {
    pub src: usize,
    pub ty: u32,
    pub dst_ty: u32,
    pub dst: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CodeWord {
    pub root: u32,
    pub edges: Vec<CodeEdge>,
}

/// Outcome of comparing a graph's own code word against all others.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Canonicity {
    /// A smaller word differs within the fixed prefix.
    NonCanonic,
    /// Smaller words exist, but all of them agree on the fixed prefix.
    SuffixReorderable,
    Canonic,
}

/// A renumbering: `nodes[new] = old`, `edges[new] = old`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    pub nodes: Vec<usize>,
    pub edges: Vec<usize>,
}

impl Permutation {
    pub fn is_identity(&self) -> bool {
        self.nodes.iter().enumerate().all(|(i, &n)| i == n)
            && self.edges.iter().enumerate().all(|(i, &e)| i == e)
    }

    /// Reorder per-node and per-edge data of an embedding.
    pub fn apply(&self, nodes: &[usize], edges: &[usize]) -> (Vec<usize>, Vec<usize>) {
        (
            self.nodes.iter().map(|&n| nodes[n]).collect(),
            self.edges.iter().map(|&e| edges[e]).collect(),
        )
    }
}

// Where the numbering search starts.
enum Start<'a> {
    // every node of the smallest type
    Roots,
    // every embedding of a seed structure
    Seed(&'a Graph),
    // the current numbering of the first edges
    Prefix(usize),
}

struct Canonizer<'a> {
    graph: &'a Graph,
    index: Vec<usize>,
    order: Vec<usize>,
    used: Vec<bool>,
    path: Vec<usize>,
    word: Vec<CodeEdge>,
    reference: Option<Vec<CodeEdge>>,
    best: Option<(Vec<usize>, Vec<usize>)>,
    check: bool,
    first_less: Option<usize>,
    stop_below: usize,
}

impl<'a> Canonizer<'a> {
    fn new(graph: &'a Graph, reference: Option<Vec<CodeEdge>>, check: bool) -> Self {
        Self {
            graph,
            index: vec![usize::MAX; graph.node_count()],
            order: Vec::with_capacity(graph.node_count()),
            used: vec![false; graph.edge_count()],
            path: Vec::with_capacity(graph.edge_count()),
            word: Vec::with_capacity(graph.edge_count()),
            reference,
            best: None,
            check,
            first_less: None,
            stop_below: 0,
        }
    }

    fn reset(&mut self) {
        self.index.fill(usize::MAX);
        self.order.clear();
        self.used.fill(false);
        self.path.clear();
        self.word.clear();
    }

    fn number(&mut self, node: usize) {
        self.index[node] = self.order.len();
        self.order.push(node);
    }

    fn done(&self) -> bool {
        self.check && self.first_less.is_some_and(|d| d < self.stop_below)
    }

    fn run(&mut self, start: &Start) {
        match *start {
            Start::Roots => {
                let Some(min) = self.graph.nodes().iter().map(|n| n.ty()).min() else {
                    return;
                };
                for root in 0..self.graph.node_count() {
                    if self.graph.node_type(root) != min {
                        continue;
                    }
                    self.reset();
                    self.number(root);
                    self.descend();
                    if self.done() {
                        return;
                    }
                }
            }
            Start::Seed(seed) => {
                let prefix: Vec<CodeEdge> = (0..seed.edge_count()).map(|e| seed.code_edge(e)).collect();
                for (nodes, edges) in self.graph.embed(seed) {
                    self.reset();
                    for &n in &nodes {
                        self.number(n);
                    }
                    for &e in &edges {
                        self.used[e] = true;
                        self.path.push(e);
                    }
                    self.word.extend_from_slice(&prefix);
                    self.descend();
                    if self.done() {
                        return;
                    }
                }
            }
            Start::Prefix(keep) => {
                self.reset();
                self.number(0);
                for e in 0..keep {
                    let edge = self.graph.edge(e);
                    let (a, b) = (edge.src().min(edge.dst()), edge.src().max(edge.dst()));
                    for n in [a, b] {
                        if self.index[n] == usize::MAX {
                            self.number(n);
                        }
                    }
                    self.used[e] = true;
                    self.path.push(e);
                    self.word.push(self.graph.code_edge(e));
                }
                self.descend();
            }
        }
    }

    // The smallest next entry and every (edge, newly numbered node) giving it.
    fn candidates(&self) -> Option<(CodeEdge, Vec<(usize, Option<usize>)>)> {
        let mut best: Option<CodeEdge> = None;
        let mut cands = Vec::new();
        for (i, &node) in self.order.iter().enumerate() {
            for &e in self.graph.node(node).edges() {
                if self.used[e] {
                    continue;
                }
                let other = self.graph.edge(e).other(node);
                let j = self.index[other];
                let ty = self.graph.edge_type(e);
                let dst_ty = self.graph.node_type(other);
                let (entry, new) = if j == usize::MAX {
                    let dst = self.order.len();
                    (CodeEdge { src: i, ty, dst_ty, dst }, Some(other))
                } else if i < j {
                    (CodeEdge { src: i, ty, dst_ty, dst: j }, None)
                } else {
                    continue;
                };
                match best.map(|b| entry.cmp(&b)) {
                    Some(Ordering::Greater) => continue,
                    Some(Ordering::Equal) => cands.push((e, new)),
                    _ => {
                        best = Some(entry);
                        cands.clear();
                        cands.push((e, new));
                    }
                }
            }
        }
        best.map(|b| (b, cands))
    }

    fn descend(&mut self) {
        let depth = self.word.len();
        if depth == self.graph.edge_count() {
            if !self.check && self.order.len() == self.graph.node_count() {
                self.offer();
            }
            return;
        }
        let Some((entry, cands)) = self.candidates() else {
            return;
        };
        if let Some(reference) = &self.reference {
            let ord = self
                .word
                .iter()
                .chain(iter::once(&entry))
                .cmp(reference[..=depth].iter());
            match ord {
                Ordering::Greater => return,
                Ordering::Less if self.check => {
                    self.first_less = Some(self.first_less.map_or(depth, |d| d.min(depth)));
                    return;
                }
                _ => (),
            }
        }
        for (e, new) in cands {
            self.used[e] = true;
            self.path.push(e);
            self.word.push(entry);
            if let Some(n) = new {
                self.number(n);
            }
            self.descend();
            if let Some(n) = new {
                self.order.pop();
                self.index[n] = usize::MAX;
            }
            self.word.pop();
            self.path.pop();
            self.used[e] = false;
            if self.done() {
                return;
            }
        }
    }

    fn offer(&mut self) {
        let better = match &self.reference {
            None => true,
            Some(reference) => self.word < *reference,
        };
        if better {
            self.reference = Some(self.word.clone());
            self.best = Some((self.order.clone(), self.path.clone()));
        }
    }
}

impl Graph {
    /// The code word entry of edge `e` under the current numbering.
    pub fn code_edge(&self, e: usize) -> CodeEdge {
        let edge = self.edge(e);
        let (src, dst) = (edge.src().min(edge.dst()), edge.src().max(edge.dst()));
        CodeEdge {
            src,
            ty: edge.ty(),
            dst_ty: self.node_type(dst),
            dst,
        }
    }

    /// The code word of the current numbering and edge order.
    pub fn code_word(&self) -> CodeWord {
        CodeWord {
            root: self.nodes().first().map_or(0, |n| n.ty()),
            edges: (0..self.edge_count()).map(|e| self.code_edge(e)).collect(),
        }
    }

    fn start<'s>(&self, keep: usize, seed: Option<&'s Graph>) -> Start<'s> {
        match seed {
            Some(seed) if keep <= seed.edge_count() => Start::Seed(seed),
            _ if keep == 0 => Start::Roots,
            _ => Start::Prefix(keep.min(self.edge_count())),
        }
    }

    /// Check whether the current code word is minimal. Smaller words that
    /// first differ at an entry below `fixed` make the graph non-canonic.
    /// With a seed, only numberings starting with a seed embedding count.
    pub fn is_canonic(&self, fixed: usize, seed: Option<&Graph>) -> Canonicity {
        let Some(root) = self.nodes().first().map(|n| n.ty()) else {
            return Canonicity::Canonic;
        };
        let start = self.start(0, seed);
        if let Start::Roots = start {
            if self.nodes().iter().any(|n| n.ty() < root) {
                return Canonicity::NonCanonic;
            }
        }
        let own = self.code_word().edges;
        let mut canonizer = Canonizer::new(self, Some(own), true);
        canonizer.stop_below = fixed;
        canonizer.run(&start);
        match canonizer.first_less {
            None => Canonicity::Canonic,
            Some(d) if d < fixed => Canonicity::NonCanonic,
            Some(_) => Canonicity::SuffixReorderable,
        }
    }

    /// Find the numbering with the smallest code word that keeps the
    /// first `keep` edges (and the nodes they reach) in place.
    pub fn canonical_map(&self, keep: usize, seed: Option<&Graph>) -> Option<Permutation> {
        let mut canonizer = Canonizer::new(self, None, false);
        canonizer.run(&self.start(keep, seed));
        let (nodes, edges) = canonizer.best?;
        Some(Permutation { nodes, edges })
    }

    /// The canonical code word.
    pub fn canonical_word(&self, seed: Option<&Graph>) -> CodeWord {
        match self.canonical_map(0, seed) {
            Some(perm) => self.map(&perm).code_word(),
            None => self.code_word(),
        }
    }

    /// Return a copy renumbered by `perm`. Every edge is stored with its
    /// smaller node index as source.
    pub fn map(&self, perm: &Permutation) -> Graph {
        let mut index = vec![0; self.node_count()];
        for (new, &old) in perm.nodes.iter().enumerate() {
            index[old] = new;
        }
        let mut out = Graph::with_capacity(self.node_count(), self.edge_count());
        for &old in &perm.nodes {
            out.add_node(self.node_type(old));
        }
        for &old in &perm.edges {
            let edge = self.edge(old);
            let (a, b) = (index[edge.src()], index[edge.dst()]);
            if let Ok(e) = out.add_edge(a.min(b), a.max(b), edge.ty()) {
                out.edges[e].flags = edge.flags;
            }
        }
        out
    }

    /// Renumber to the smallest code word keeping the first `keep` edges.
    /// Returns the applied permutation, or `None` if nothing changed.
    pub fn make_canonic(&mut self, keep: usize, seed: Option<&Graph>) -> Option<Permutation> {
        if self.edge_count() <= keep {
            return None;
        }
        let perm = self.canonical_map(keep, seed)?;
        if perm.is_identity() {
            return None;
        }
        let mapped = self.map(&perm);
        // an automorphism leaves the word (and the graph) as it is
        if mapped.code_word() == self.code_word() {
            return None;
        }
        *self = mapped;
        Some(perm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const C: u32 = 6;
    const N: u32 = 7;
    const O: u32 = 8;
    const S: u32 = 1;

    fn build(types: &[u32], edges: &[(usize, usize)]) -> Graph {
        let mut g = Graph::new();
        for &t in types {
            g.add_node(t);
        }
        for &(a, b) in edges {
            g.add_edge(a, b, S).unwrap();
        }
        g
    }

    #[test]
    fn numbering_does_not_matter() {
        let a = build(&[C, C, O], &[(0, 1), (1, 2)]);
        let b = build(&[O, C, C], &[(0, 1), (1, 2)]);
        assert_eq!(a.canonical_word(None), b.canonical_word(None));
        assert_eq!(a.canonical_word(None).root, C);
        let c = build(&[C, O, C], &[(0, 1), (0, 2)]);
        assert_ne!(a.canonical_word(None), c.canonical_word(None));
    }

    #[test]
    fn canonic_after_make_canonic() {
        let mut g = build(&[O, C, N, C], &[(0, 1), (1, 2), (1, 3)]);
        assert_eq!(g.is_canonic(0, None), Canonicity::NonCanonic);
        assert!(g.make_canonic(0, None).is_some());
        assert_eq!(g.is_canonic(g.edge_count(), None), Canonicity::Canonic);
        assert_eq!(g.node_type(0), C);
        // a second call is a no-op
        let before = g.clone();
        assert!(g.make_canonic(0, None).is_none());
        assert_eq!(g, before);
    }

    #[test]
    fn suffix_reorder_is_distinguished() {
        // C-C with O and N hanging off the second carbon, O first
        let g = build(&[C, C, O, N], &[(0, 1), (1, 2), (1, 3)]);
        // rooting at the other carbon gives a smaller second entry
        assert_eq!(g.is_canonic(1, None), Canonicity::SuffixReorderable);
        assert_eq!(g.is_canonic(2, None), Canonicity::NonCanonic);

        let mut h = g.clone();
        let perm = h.make_canonic(1, None).unwrap();
        assert_eq!(perm.edges[0], 0);
        // N now precedes O, but the root is still not the best one
        assert_eq!(h.node_type(2), N);
        assert_eq!(h.is_canonic(1, None), Canonicity::SuffixReorderable);
    }

    #[test]
    fn permutation_moves_embeddings() {
        let mut g = build(&[O, C], &[(0, 1)]);
        let perm = g.make_canonic(0, None).unwrap();
        let (nodes, edges) = perm.apply(&[10, 11], &[5]);
        assert_eq!(nodes, vec![11, 10]);
        assert_eq!(edges, vec![5]);
        assert_eq!(g.node_type(0), C);
    }

    #[test]
    fn rings_are_canonized() {
        let a = build(&[C, C, C, O], &[(0, 1), (1, 2), (2, 0), (2, 3)]);
        let b = build(&[O, C, C, C], &[(0, 1), (1, 2), (2, 3), (3, 1)]);
        assert_eq!(a.canonical_word(None), b.canonical_word(None));
    }

    #[test]
    fn seed_prefix_is_kept() {
        let seed = build(&[O], &[]);
        let g = build(&[C, O], &[(0, 1)]);
        let word = g.canonical_word(Some(&seed));
        assert_eq!(word.root, O);
        assert_eq!(g.canonical_word(None).root, C);
        let mut h = g.clone();
        h.make_canonic(0, Some(&seed));
        assert_eq!(h.is_canonic(1, Some(&seed)), Canonicity::Canonic);
    }
}
