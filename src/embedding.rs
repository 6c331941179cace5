//! Embeddings: occurrences of a fragment in a host graph.
//!
//! An [`Embedding`] maps fragment node `i` to host node `nodes[i]` and
//! fragment edge `j` to host edge `edges[j]`. Embeddings of a child fragment
//! are built by extending the embeddings of its base, so the first edges of
//! a child embedding are those of the base embedding it came from.
//!
//! A chain pseudo-node is mapped to the first atom of the chain; the two
//! fragment edges at the pseudo-node are mapped to the first and the last
//! bond of the chain. The atoms and bonds in between are not stored and are
//! recovered by walking along the chain.

use bit_set::BitSet;

use crate::{
    canonize::CodeEdge,
    graph::{Graph, Group},
    types::Atoms,
};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Embedding {
    /// Index of the host graph in the database.
    pub graph: usize,
    pub group: Group,
    pub nodes: Vec<usize>,
    pub edges: Vec<usize>,
}

impl Embedding {
    pub fn new(graph: usize, group: Group, nodes: Vec<usize>, edges: Vec<usize>) -> Self {
        Self {
            graph,
            group,
            nodes,
            edges,
        }
    }

    /// Grow this embedding by the code word entry `entry`, where a
    /// destination index equal to the fragment's node count stands for a
    /// new node. Returns `None` if the host graph has no unused edge (and
    /// node) of the right types at that position.
    pub fn extend(&self, host: &Graph, entry: &CodeEdge) -> Option<Embedding> {
        let src = *self.nodes.get(entry.src)?;
        let new = entry.dst == self.nodes.len();
        let target = if new {
            None
        } else {
            Some(*self.nodes.get(entry.dst)?)
        };
        for &e in host.node(src).edges() {
            if host.edge_type(e) != entry.ty || self.edges.contains(&e) {
                continue;
            }
            let other = host.edge(e).other(src);
            match target {
                Some(t) if t == other => (),
                Some(_) => continue,
                None => {
                    if host.node_type(other) != entry.dst_ty || self.nodes.contains(&other) {
                        continue;
                    }
                }
            }
            let mut nodes = self.nodes.clone();
            if new {
                nodes.push(other);
            }
            let mut edges = self.edges.clone();
            edges.push(e);
            return Some(Embedding::new(self.graph, self.group, nodes, edges));
        }
        None
    }

    /// All ways to grow this embedding by `entry` (one per matching host
    /// edge).
    pub fn extend_all(&self, host: &Graph, entry: &CodeEdge) -> Vec<Embedding> {
        let Some(&src) = self.nodes.get(entry.src) else {
            return Vec::new();
        };
        let new = entry.dst == self.nodes.len();
        let mut out = Vec::new();
        for &e in host.node(src).edges() {
            if host.edge_type(e) != entry.ty || self.edges.contains(&e) {
                continue;
            }
            let other = host.edge(e).other(src);
            let fits = if new {
                host.node_type(other) == entry.dst_ty && !self.nodes.contains(&other)
            } else {
                self.nodes.get(entry.dst) == Some(&other)
            };
            if fits {
                let mut nodes = self.nodes.clone();
                if new {
                    nodes.push(other);
                }
                let mut edges = self.edges.clone();
                edges.push(e);
                out.push(Embedding::new(self.graph, self.group, nodes, edges));
            }
        }
        out
    }

    /// The number of leading edges two embeddings have in common. Two
    /// embeddings of sibling fragments that come from the same base
    /// embedding share at least the base's edges.
    pub fn common(&self, other: &Embedding) -> usize {
        if self.graph != other.graph {
            return 0;
        }
        self.edges
            .iter()
            .zip(&other.edges)
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Whether both embeddings extend the same embedding of a base fragment
    /// with `n_nodes` nodes and `n_edges` edges.
    pub fn shares_base(&self, other: &Embedding, n_nodes: usize, n_edges: usize) -> bool {
        self.common(other) >= n_edges
            && self.nodes.len() >= n_nodes
            && other.nodes.len() >= n_nodes
            && self.nodes[..n_nodes] == other.nodes[..n_nodes]
    }

    /// The embedding of the first `n_nodes` nodes and `n_edges` edges.
    pub fn truncated(&self, n_nodes: usize, n_edges: usize) -> Embedding {
        Embedding::new(
            self.graph,
            self.group,
            self.nodes[..n_nodes.min(self.nodes.len())].to_vec(),
            self.edges[..n_edges.min(self.edges.len())].to_vec(),
        )
    }
}

/// The host atoms and bonds strictly inside the chain that fragment node
/// `node` (a chain pseudo-node) stands for, walking from its first atom
/// until the bond mapped to the second fragment edge at the pseudo-node.
pub fn chain_interior(
    frag: &Graph,
    emb: &Embedding,
    host: &Graph,
    node: usize,
) -> (Vec<usize>, Vec<usize>) {
    let mut atoms = vec![emb.nodes[node]];
    let mut bonds = Vec::new();
    let incident = frag.node(node).edges();
    let (Some(&first), Some(&last)) = (incident.first(), incident.last()) else {
        return (atoms, bonds);
    };
    let mut at = emb.nodes[node];
    // the bond leaving the first atom outwards may have either fragment index
    let (first, last) = (emb.edges[first], emb.edges[last]);
    let touches = |e: usize| host.edge(e).src() == at || host.edge(e).dst() == at;
    let (mut via, last) = if touches(first) { (first, last) } else { (last, first) };
    // at most one step per host bond
    for _ in 0..host.edge_count() {
        let Some(next) = host.node(at).edges().iter().copied().find(|&e| e != via) else {
            break;
        };
        if next == last {
            break;
        }
        bonds.push(next);
        at = host.edge(next).other(at);
        atoms.push(at);
        via = next;
    }
    (atoms, bonds)
}

/// Marks the host nodes and edges used by one embedding, chain interiors
/// included. Lives only as long as one round of extension generation.
pub struct EmbeddingIndex {
    node_of: Vec<Option<usize>>,
    edges: BitSet,
    interior: BitSet,
}

impl EmbeddingIndex {
    pub fn new(frag: &Graph, emb: &Embedding, host: &Graph) -> Self {
        let mut node_of = vec![None; host.node_count()];
        for (i, &n) in emb.nodes.iter().enumerate() {
            node_of[n] = Some(i);
        }
        let mut edges = BitSet::with_capacity(host.edge_count());
        edges.extend(emb.edges.iter().copied());
        let mut interior = BitSet::new();
        for i in 0..frag.node_count() {
            if Atoms::is_chain(frag.node_type(i)) {
                let (atoms, bonds) = chain_interior(frag, emb, host, i);
                interior.extend(atoms.into_iter().skip(1));
                edges.extend(bonds);
            }
        }
        Self {
            node_of,
            edges,
            interior,
        }
    }

    /// The fragment node mapped to host node `n`.
    pub fn node_of(&self, n: usize) -> Option<usize> {
        self.node_of[n]
    }

    /// Whether host node `n` is used, as a mapped node or inside a chain.
    pub fn uses_node(&self, n: usize) -> bool {
        self.node_of[n].is_some() || self.interior.contains(n)
    }

    pub fn uses_edge(&self, e: usize) -> bool {
        self.edges.contains(e)
    }

    pub fn in_chain(&self, n: usize) -> bool {
        self.interior.contains(n)
    }
}
