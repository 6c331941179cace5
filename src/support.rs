//! Support measures beyond the number of supporting graphs.
//!
//! Counting graphs ignores how often a fragment occurs inside one graph.
//! The other measures count occurrences without letting overlapping
//! embeddings inflate the count: the minimum image measure takes, over all
//! fragment nodes, the smallest number of distinct host nodes a fragment
//! node is mapped to; the independent set measures count a maximum set of
//! pairwise non-overlapping embeddings per graph. Two embeddings overlap if
//! they share a host node. For the harmful variant the overlap must also
//! relate the two embeddings to each other: some fragment node is mapped
//! into the shared host nodes by both. This covers embeddings that differ
//! only by an automorphism of the overlap, such as the same host edge
//! mapped in opposite directions, and it carries over to every extension
//! of the fragment, so support never grows.

use std::{borrow::Cow, collections::HashSet};

use bit_set::BitSet;

use crate::{
    config::{SupportKind, SupportType},
    embedding::Embedding,
    graph::Graph,
};

/// Conflicts between the embeddings into one host graph.
pub struct OverlapGraph {
    graph: Vec<BitSet>,
}

impl OverlapGraph {
    pub fn new(embs: &[&Embedding], conflict: impl Fn(&Embedding, &Embedding) -> bool) -> Self {
        let size = embs.len();

        // Initialize an empty graph
        let mut graph: Vec<BitSet> = Vec::with_capacity(size);
        for _ in 0..size {
            graph.push(BitSet::with_capacity(size));
        }

        // Populate graph
        for (idx1, a) in embs.iter().enumerate() {
            for (idx2, b) in embs[idx1 + 1..].iter().enumerate() {
                let idx2 = idx2 + idx1 + 1;
                if conflict(a, b) {
                    graph[idx1].insert(idx2);
                    graph[idx2].insert(idx1);
                }
            }
        }

        Self { graph }
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn degree(&self, v: usize, subgraph: &BitSet) -> usize {
        self.graph[v].intersection(subgraph).count()
    }

    pub fn are_adjacent(&self, v: usize, u: usize) -> bool {
        self.graph[v].contains(u)
    }

    fn all(&self) -> BitSet {
        (0..self.len()).collect()
    }

    /// Size of an independent set built by repeatedly taking a vertex of
    /// minimum degree and dropping its neighbours.
    pub fn greedy_mis(&self) -> usize {
        let mut subgraph = self.all();
        let mut size = 0;
        loop {
            let next = subgraph.iter().min_by_key(|&v| self.degree(v, &subgraph));
            let Some(v) = next else {
                break;
            };
            subgraph.difference_with(&self.graph[v]);
            subgraph.remove(v);
            size += 1;
        }
        size
    }

    /// Size of a maximum independent set (branch and bound).
    pub fn exact_mis(&self) -> usize {
        let mut best = 0;
        self.mis_search(self.all(), 0, &mut best);
        best
    }

    fn mis_search(&self, mut subgraph: BitSet, mut size: usize, best: &mut usize) {
        // isolated vertices belong to every maximum set
        let isolated: Vec<usize> = subgraph
            .iter()
            .filter(|&v| self.degree(v, &subgraph) == 0)
            .collect();
        for v in isolated {
            subgraph.remove(v);
            size += 1;
        }
        if size + subgraph.len() <= *best {
            return;
        }
        let Some(v) = subgraph.iter().max_by_key(|&v| self.degree(v, &subgraph)) else {
            *best = size;
            return;
        };

        // Take v
        let mut with = subgraph.clone();
        with.difference_with(&self.graph[v]);
        with.remove(v);
        self.mis_search(with, size + 1, best);

        // Leave v out
        subgraph.remove(v);
        self.mis_search(subgraph, size, best);
    }

    fn mis(&self, exact: bool) -> usize {
        if exact {
            self.exact_mis()
        } else {
            self.greedy_mis()
        }
    }
}

fn overlaps(a: &Embedding, b: &Embedding) -> bool {
    a.nodes.iter().any(|n| b.nodes.contains(n))
}

fn harmful(a: &Embedding, b: &Embedding) -> bool {
    a.nodes
        .iter()
        .zip(&b.nodes)
        .any(|(n, m)| b.nodes.contains(n) && a.nodes.contains(m))
}

/// Per-group support of a fragment with the embeddings `embs`, which must
/// be sorted by host graph.
pub fn compute(kind: SupportType, frag: &Graph, embs: &[Cow<'_, Embedding>]) -> [usize; 2] {
    let mut support = [0; 2];
    match kind.kind {
        SupportKind::Graphs => {
            let mut last = None;
            for emb in embs {
                if last != Some(emb.graph) {
                    support[emb.group.index()] += 1;
                    last = Some(emb.graph);
                }
            }
        }
        SupportKind::MinImage => {
            for (g, slot) in support.iter_mut().enumerate() {
                *slot = (0..frag.node_count())
                    .map(|i| {
                        embs.iter()
                            .filter(|e| e.group.index() == g)
                            .map(|e| (e.graph, e.nodes[i]))
                            .collect::<HashSet<_>>()
                            .len()
                    })
                    .min()
                    .unwrap_or(0);
            }
        }
        SupportKind::MisOverlap | SupportKind::MisHarmful => {
            for run in embs.chunk_by(|a, b| a.graph == b.graph) {
                let refs: Vec<&Embedding> = run.iter().map(|e| e.as_ref()).collect();
                let overlap = if kind.kind == SupportKind::MisOverlap {
                    OverlapGraph::new(&refs, overlaps)
                } else {
                    OverlapGraph::new(&refs, harmful)
                };
                support[run[0].group.index()] += overlap.mis(kind.exact);
            }
        }
    }
    support
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{graph::Group, types::Bonds};

    fn emb(graph: usize, nodes: &[usize]) -> Cow<'static, Embedding> {
        Cow::Owned(Embedding::new(graph, Group::Focus, nodes.to_vec(), vec![0; nodes.len() - 1]))
    }

    fn edge(a: u32, b: u32) -> Graph {
        let mut g = Graph::new();
        g.add_node(a);
        g.add_node(b);
        g.add_edge(0, 1, Bonds::SINGLE).unwrap();
        g
    }

    fn all_embeddings(host: &Graph, frag: &Graph) -> Vec<Cow<'static, Embedding>> {
        host.embed(frag)
            .into_iter()
            .map(|(nodes, edges)| Cow::Owned(Embedding::new(0, Group::Focus, nodes, edges)))
            .collect()
    }

    #[test]
    fn graph_counts() {
        let embs = vec![emb(0, &[0, 1]), emb(0, &[1, 2]), emb(1, &[0, 1])];
        let s = compute(SupportType::default(), &edge(6, 8), &embs);
        assert_eq!(s, [2, 0]);
    }

    #[test]
    fn min_image() {
        // C-C in a chain of three carbons: both edges, both directions
        let embs = vec![emb(0, &[0, 1]), emb(0, &[1, 0]), emb(0, &[1, 2]), emb(0, &[2, 1])];
        let kind = SupportType {
            kind: SupportKind::MinImage,
            exact: false,
        };
        assert_eq!(compute(kind, &edge(6, 6), &embs), [3, 0]);
    }

    #[test]
    fn independent_sets() {
        // a path 0-1-2-3: the middle edge overlaps both outer ones
        let embs = vec![emb(0, &[0, 1]), emb(0, &[1, 2]), emb(0, &[2, 3])];
        let refs: Vec<&Embedding> = embs.iter().map(|e| e.as_ref()).collect();
        let g = OverlapGraph::new(&refs, overlaps);
        assert!(g.are_adjacent(0, 1) && !g.are_adjacent(0, 2));
        assert_eq!(g.greedy_mis(), 2);
        assert_eq!(g.exact_mis(), 2);
        let kind = SupportType {
            kind: SupportKind::MisOverlap,
            exact: true,
        };
        assert_eq!(compute(kind, &edge(6, 8), &embs), [2, 0]);
    }

    #[test]
    fn harmful_overlap() {
        // C-O twice through the same carbon
        let a = Embedding::new(0, Group::Focus, vec![0, 1], vec![0]);
        let b = Embedding::new(0, Group::Focus, vec![0, 2], vec![1]);
        assert!(harmful(&a, &b));

        // the same edge in both directions
        let c = Embedding::new(0, Group::Focus, vec![1, 0], vec![0]);
        assert!(harmful(&a, &c));

        // C-C-C twice in a chain of five carbons, sharing only the end
        // node in different roles
        let a = Embedding::new(0, Group::Focus, vec![0, 1, 2], vec![0, 1]);
        let b = Embedding::new(0, Group::Focus, vec![2, 3, 4], vec![2, 3]);
        assert!(overlaps(&a, &b));
        assert!(!harmful(&a, &b));
    }

    #[test]
    fn harmful_support_never_grows() {
        // N-N and C=N-N in C=N-N=C
        let mut host = Graph::new();
        for t in [6, 7, 7, 6] {
            host.add_node(t);
        }
        host.add_edge(0, 1, Bonds::DOUBLE).unwrap();
        host.add_edge(1, 2, Bonds::SINGLE).unwrap();
        host.add_edge(2, 3, Bonds::DOUBLE).unwrap();
        let kind = SupportType {
            kind: SupportKind::MisHarmful,
            exact: true,
        };

        let nn = edge(7, 7);
        let embs = all_embeddings(&host, &nn);
        assert_eq!(embs.len(), 2);
        assert_eq!(compute(kind, &nn, &embs), [1, 0]);

        let mut cnn = edge(7, 7);
        cnn.add_node(6);
        cnn.add_edge(2, 0, Bonds::DOUBLE).unwrap();
        let embs = all_embeddings(&host, &cnn);
        assert_eq!(embs.len(), 2);
        assert_eq!(compute(kind, &cnn, &embs), [1, 0]);
    }

    #[test]
    fn exact_on_longer_path() {
        let embs: Vec<Cow<Embedding>> = (0..5).map(|i| emb(0, &[i, i + 1])).collect();
        let refs: Vec<&Embedding> = embs.iter().map(|e| e.as_ref()).collect();
        let g = OverlapGraph::new(&refs, overlaps);
        assert_eq!(g.exact_mis(), 3);
        assert!(g.greedy_mis() <= 3);
        assert_eq!(g.len(), 5);
    }
}
