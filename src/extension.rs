//! Generation of fragment extensions from single embeddings.
//!
//! An extension grows a fragment by one indivisible step: a single edge
//! (possibly to a new node), a whole ring, or a variable-length carbon
//! chain. Each extension is described by the code word entries it appends
//! to the fragment (in fragment numbering, new nodes numbered after the
//! existing ones), so equal extensions found in different embeddings or
//! host graphs get equal keys and end up in the same child fragment.

use bit_set::BitSet;

use crate::{
    canonize::CodeEdge,
    config::RingMode,
    embedding::{Embedding, EmbeddingIndex},
    graph::{Graph, NamedGraph},
    types::{Atoms, Bonds},
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExtensionKind {
    Edge,
    Ring,
    Chain,
}

/// Identifies an extension independently of the embedding it came from.
///
/// Keys sort by their entries first, which is the order in which sibling
/// fragments are processed; on equal entries single edges come first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExtensionKey {
    pub entries: Vec<CodeEdge>,
    pub kind: ExtensionKind,
}

impl ExtensionKey {
    pub fn first(&self) -> Option<&CodeEdge> {
        self.entries.first()
    }

    /// Number of nodes the extension adds to a fragment with `n` nodes.
    pub fn new_nodes(&self, n: usize) -> usize {
        self.entries
            .iter()
            .map(|e| e.dst + 1)
            .max()
            .map_or(0, |m| m.saturating_sub(n))
    }
}

/// One extension of one embedding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Extension {
    pub key: ExtensionKey,
    /// The extended embedding.
    pub embedding: Embedding,
}

impl Extension {
    pub fn kind(&self) -> ExtensionKind {
        self.key.kind
    }
}

// What one round of generation produces.
#[derive(Debug, Copy, Clone)]
struct Scope<'k> {
    anchor: Option<&'k CodeEdge>,
    exclude: bool,
    ring_exts: bool,
    chains: bool,
}

/// Enumerates the extensions of fragment embeddings in the host graphs.
pub struct Extender<'a> {
    hosts: &'a [NamedGraph],
    excluded: &'a BitSet,
    rings: RingMode,
    chain_atom: Option<u32>,
}

impl<'a> Extender<'a> {
    /// `excluded` holds node types that are never added to a fragment,
    /// `chain_atom` the node type of chain atoms if chains are enabled.
    /// Chains are not subject to `excluded`: their atoms are not fragment
    /// nodes.
    pub fn new(
        hosts: &'a [NamedGraph],
        excluded: &'a BitSet,
        rings: RingMode,
        chain_atom: Option<u32>,
    ) -> Self {
        Self {
            hosts,
            excluded,
            rings,
            chain_atom,
        }
    }

    pub fn host(&self, emb: &Embedding) -> &'a Graph {
        &self.hosts[emb.graph].graph
    }

    /// Extensions that create child fragments. With an `anchor` (the entry
    /// that created the fragment) only extensions whose first entry sorts
    /// after it are generated. Ring edges are added as whole rings when the
    /// ring mode extends rings.
    pub fn children(
        &self,
        frag: &Graph,
        emb: &Embedding,
        anchor: Option<&CodeEdge>,
    ) -> Vec<Extension> {
        let scope = Scope {
            anchor,
            exclude: true,
            ring_exts: self.rings.extends_rings(),
            chains: self.chain_atom.is_some(),
        };
        let mut out = self.generate(frag, emb, scope);
        out.sort();
        out.dedup();
        out
    }

    /// Keys of every extension of `emb` that a closed fragment must not
    /// have: all node types count, ring edges count as whole rings if rings
    /// are handled at all, chains do not count.
    pub fn closure_keys(&self, frag: &Graph, emb: &Embedding) -> Vec<ExtensionKey> {
        let scope = Scope {
            anchor: None,
            exclude: false,
            ring_exts: self.rings != RingMode::None,
            chains: false,
        };
        let mut keys: Vec<ExtensionKey> = self
            .generate(frag, emb, scope)
            .into_iter()
            .map(|ext| ext.key)
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    fn excludes(&self, scope: Scope, ty: u32) -> bool {
        scope.exclude && self.excluded.contains(ty as usize)
    }

    fn generate(&self, frag: &Graph, emb: &Embedding, scope: Scope) -> Vec<Extension> {
        let host = self.host(emb);
        let index = EmbeddingIndex::new(frag, emb, host);
        let mut out = Vec::new();
        for i in 0..frag.node_count() {
            // chains are never extended from their pseudo-node
            if Atoms::is_chain(frag.node_type(i)) {
                continue;
            }
            let u = emb.nodes[i];
            for &e in host.node(u).edges() {
                if index.uses_edge(e) {
                    continue;
                }
                let v = host.edge(e).other(u);
                if index.in_chain(v) {
                    continue;
                }
                if host.edge(e).is_ring() && scope.ring_exts {
                    self.rings_from(frag, emb, &index, i, e, scope, &mut out);
                    continue;
                }
                self.edge_from(frag, emb, &index, i, e, scope, &mut out);
                if scope.chains {
                    self.chain_from(frag, emb, &index, i, e, scope, &mut out);
                }
            }
        }
        out
    }

    fn admits(scope: Scope, first: &CodeEdge) -> bool {
        scope.anchor.map_or(true, |a| first > a)
    }

    #[allow(clippy::too_many_arguments)]
    fn edge_from(
        &self,
        frag: &Graph,
        emb: &Embedding,
        index: &EmbeddingIndex,
        i: usize,
        e: usize,
        scope: Scope,
        out: &mut Vec<Extension>,
    ) {
        let host = self.host(emb);
        let n = frag.node_count();
        let v = host.edge(e).other(emb.nodes[i]);
        let ty = host.edge_type(e);
        let entry = match index.node_of(v) {
            // ring closures are generated from their smaller end
            Some(j) if j > i => CodeEdge {
                src: i,
                ty,
                dst_ty: frag.node_type(j),
                dst: j,
            },
            Some(_) => return,
            None => {
                let dst_ty = host.node_type(v);
                if self.excludes(scope, dst_ty) {
                    return;
                }
                CodeEdge {
                    src: i,
                    ty,
                    dst_ty,
                    dst: n,
                }
            }
        };
        if !Self::admits(scope, &entry) {
            return;
        }
        let mut nodes = emb.nodes.clone();
        if entry.dst == n {
            nodes.push(v);
        }
        let mut edges = emb.edges.clone();
        edges.push(e);
        out.push(Extension {
            key: ExtensionKey {
                entries: vec![entry],
                kind: ExtensionKind::Edge,
            },
            embedding: Embedding::new(emb.graph, emb.group, nodes, edges),
        });
    }

    #[allow(clippy::too_many_arguments)]
    fn rings_from(
        &self,
        frag: &Graph,
        emb: &Embedding,
        index: &EmbeddingIndex,
        i: usize,
        e: usize,
        scope: Scope,
        out: &mut Vec<Extension>,
    ) {
        let host = self.host(emb);
        let n = frag.node_count();
        let u = emb.nodes[i];
        let mut rings = host.edge(e).rings();
        while rings != 0 {
            let bit = rings & rings.wrapping_neg();
            rings &= !bit;
            let Some(walk) = host.ring_walk(u, e, bit) else {
                continue;
            };
            // host nodes added by this ring, in walk order
            let mut added: Vec<usize> = Vec::new();
            let mut entries = Vec::new();
            let mut edges = emb.edges.clone();
            let mut at = u;
            let mut valid = true;
            for &f in &walk {
                let w = host.edge(f).other(at);
                if !index.uses_edge(f) {
                    let local = |h: usize, added: &[usize]| {
                        index
                            .node_of(h)
                            .or_else(|| added.iter().position(|&x| x == h).map(|p| n + p))
                    };
                    let Some(a) = local(at, &added) else {
                        valid = false;
                        break;
                    };
                    let b = match local(w, &added) {
                        Some(b) => b,
                        None => {
                            if index.in_chain(w) || self.excludes(scope, host.node_type(w)) {
                                valid = false;
                                break;
                            }
                            added.push(w);
                            n + added.len() - 1
                        }
                    };
                    let (src, dst) = (a.min(b), a.max(b));
                    let dst_ty = if dst < n {
                        frag.node_type(dst)
                    } else {
                        host.node_type(added[dst - n])
                    };
                    entries.push(CodeEdge {
                        src,
                        ty: host.edge_type(f),
                        dst_ty,
                        dst,
                    });
                    edges.push(f);
                }
                at = w;
            }
            if !valid || entries.first().map_or(true, |first| !Self::admits(scope, first)) {
                continue;
            }
            let mut nodes = emb.nodes.clone();
            nodes.extend_from_slice(&added);
            out.push(Extension {
                key: ExtensionKey {
                    entries,
                    kind: ExtensionKind::Ring,
                },
                embedding: Embedding::new(emb.graph, emb.group, nodes, edges),
            });
        }
    }

    fn is_chain_atom(&self, host: &Graph, n: usize) -> bool {
        let Some(c) = self.chain_atom else {
            return false;
        };
        let node = host.node(n);
        host.node_type(n) == c
            && node.degree() == 2
            && node.edges().iter().all(|&f| host.edge_type(f) == Bonds::SINGLE)
    }

    #[allow(clippy::too_many_arguments)]
    fn chain_from(
        &self,
        frag: &Graph,
        emb: &Embedding,
        index: &EmbeddingIndex,
        i: usize,
        e: usize,
        scope: Scope,
        out: &mut Vec<Extension>,
    ) {
        let Some(c) = self.chain_atom else {
            return;
        };
        let host = self.host(emb);
        let n = frag.node_count();
        let u = emb.nodes[i];
        let first = host.edge(e).other(u);
        // a chain is a maximal run of chain atoms, so it is the same from
        // both of its ends
        if self.is_chain_atom(host, u)
            || host.edge_type(e) != Bonds::SINGLE
            || index.uses_node(first)
            || !self.is_chain_atom(host, first)
        {
            return;
        }
        let (mut at, mut via) = (first, e);
        let mut end = None;
        for _ in 0..host.node_count() {
            let Some(next) = host.node(at).edges().iter().copied().find(|&f| f != via) else {
                return;
            };
            let w = host.edge(next).other(at);
            if index.uses_node(w) && self.is_chain_atom(host, w) {
                return;
            }
            if !self.is_chain_atom(host, w) {
                end = Some((next, w));
                break;
            }
            (at, via) = (w, next);
        }
        let Some((last, z)) = end else {
            return;
        };
        if index.uses_node(z) || self.excludes(scope, host.node_type(z)) {
            return;
        }
        let entries = vec![
            CodeEdge {
                src: i,
                ty: host.edge_type(e),
                dst_ty: Atoms::CHAIN | c,
                dst: n,
            },
            CodeEdge {
                src: n,
                ty: host.edge_type(last),
                dst_ty: host.node_type(z),
                dst: n + 1,
            },
        ];
        if !Self::admits(scope, &entries[0]) {
            return;
        }
        let mut nodes = emb.nodes.clone();
        nodes.extend([first, z]);
        let mut edges = emb.edges.clone();
        edges.extend([e, last]);
        out.push(Extension {
            key: ExtensionKey {
                entries,
                kind: ExtensionKind::Chain,
            },
            embedding: Embedding::new(emb.graph, emb.group, nodes, edges),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Group;

    const S: u32 = Bonds::SINGLE;
    const C: u32 = 0;
    const N: u32 = 1;
    const O: u32 = 2;

    fn named(g: Graph) -> Vec<NamedGraph> {
        vec![NamedGraph::new("g", 1.0, Group::Focus, g)]
    }

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

    fn single(t: u32) -> Graph {
        build(&[t], &[])
    }

    #[test]
    fn single_edges_from_one_node() {
        // N-C-O
        let hosts = named(build(&[N, C, O], &[(0, 1), (1, 2)]));
        let none = BitSet::new();
        let ext = Extender::new(&hosts, &none, RingMode::None, None);
        let emb = Embedding::new(0, Group::Focus, vec![1], vec![]);
        let found = ext.children(&single(C), &emb, None);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|x| x.kind() == ExtensionKind::Edge));
        assert_eq!(found[0].key.entries[0].dst_ty, N);
        assert_eq!(found[1].embedding.nodes, vec![1, 2]);
    }

    #[test]
    fn anchor_and_exclusion_restrict() {
        let hosts = named(build(&[N, C, O], &[(0, 1), (1, 2)]));
        let mut excluded = BitSet::new();
        excluded.insert(N as usize);
        let ext = Extender::new(&hosts, &excluded, RingMode::None, None);
        let emb = Embedding::new(0, Group::Focus, vec![1], vec![]);
        let found = ext.children(&single(C), &emb, None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key.entries[0].dst_ty, O);
        // excluded types still count for closure
        assert_eq!(ext.closure_keys(&single(C), &emb).len(), 2);

        let none = BitSet::new();
        let ext = Extender::new(&hosts, &none, RingMode::None, None);
        let anchor = CodeEdge {
            src: 0,
            ty: S,
            dst_ty: N,
            dst: 1,
        };
        let found = ext.children(&single(C), &emb, Some(&anchor));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key.entries[0].dst_ty, O);
    }

    #[test]
    fn whole_rings() {
        // a three-ring of carbons with an oxygen attached
        let mut host = build(&[C, C, C, O], &[(0, 1), (1, 2), (2, 0), (0, 3)]);
        host.mark_rings(3, 6);
        let hosts = named(host);
        let none = BitSet::new();
        let ext = Extender::new(&hosts, &none, RingMode::Full, None);
        let emb = Embedding::new(0, Group::Focus, vec![0], vec![]);
        let found = ext.children(&single(C), &emb, None);
        let rings: Vec<_> = found
            .iter()
            .filter(|x| x.kind() == ExtensionKind::Ring)
            .collect();
        // one ring, walked in both directions
        assert_eq!(rings.len(), 2);
        for r in rings {
            assert_eq!(r.key.entries.len(), 3);
            assert_eq!(r.embedding.nodes.len(), 3);
            assert_eq!(r.key.entries[2].src, 0);
            assert_eq!(r.key.entries[2].dst, 2);
        }
        assert_eq!(
            found.iter().filter(|x| x.kind() == ExtensionKind::Edge).count(),
            1
        );
        // ring edges are single edges without ring extensions
        let ext = Extender::new(&hosts, &none, RingMode::Filter, None);
        assert_eq!(ext.children(&single(C), &emb, None).len(), 3);
        // but closure looks at the ring as a whole
        assert_eq!(ext.closure_keys(&single(C), &emb).len(), 2);
    }

    #[test]
    fn variable_chains() {
        // N-C-C-C-O
        let hosts = named(build(&[N, C, C, C, O], &[(0, 1), (1, 2), (2, 3), (3, 4)]));
        let none = BitSet::new();
        let ext = Extender::new(&hosts, &none, RingMode::None, Some(C));
        let emb = Embedding::new(0, Group::Focus, vec![0], vec![]);
        let found = ext.children(&single(N), &emb, None);
        let chain = found
            .iter()
            .find(|x| x.kind() == ExtensionKind::Chain)
            .unwrap();
        assert_eq!(chain.key.entries[0].dst_ty, Atoms::CHAIN | C);
        assert_eq!(chain.key.entries[1].dst_ty, O);
        assert_eq!(chain.embedding.nodes, vec![0, 1, 4]);
        assert_eq!(chain.embedding.edges, vec![0, 3]);
        assert_eq!(chain.key.new_nodes(1), 2);
        // chains never count for closure
        assert_eq!(ext.closure_keys(&single(N), &emb).len(), 1);
    }

    #[test]
    fn chains_run_between_non_chain_atoms() {
        // O-C-C-C-O-C: the chain starts at either oxygen end, never inside
        let host = build(&[O, C, C, C, O, C], &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 5)]);
        let hosts = named(host);
        let mut excluded = BitSet::new();
        excluded.insert(C as usize);
        let ext = Extender::new(&hosts, &excluded, RingMode::None, Some(C));
        let chains = |node: usize, ty: u32| -> Vec<Extension> {
            let emb = Embedding::new(0, Group::Focus, vec![node], vec![]);
            ext.children(&single(ty), &emb, None)
                .into_iter()
                .filter(|x| x.kind() == ExtensionKind::Chain)
                .collect()
        };

        // Both ends see the same three atoms, even with carbon excluded.
        let left = chains(0, O);
        let right = chains(4, O);
        assert_eq!(left.len(), 1);
        assert_eq!(right.len(), 1);
        assert_eq!(left[0].embedding.nodes, vec![0, 1, 4]);
        assert_eq!(right[0].embedding.nodes, vec![4, 3, 0]);
        assert_eq!(left[0].key, right[0].key);

        // A chain atom in the fragment starts no chain.
        let none = BitSet::new();
        let ext = Extender::new(&hosts, &none, RingMode::None, Some(C));
        let emb = Embedding::new(0, Group::Focus, vec![2], vec![]);
        assert!(ext
            .children(&single(C), &emb, None)
            .iter()
            .all(|x| x.kind() != ExtensionKind::Chain));
    }
}
