//! Fragments: the nodes of the search tree.
//!
//! A [`Fragment`] is a pattern graph together with its embeddings into the
//! host graphs, ordered by host graph. The first `supp` slots count the
//! graphs per group that contain the fragment, the last two the embeddings
//! per group; both are only updated by [`Fragment::add`].
//!
//! When a fragment has more than a configured number of embeddings in one
//! host graph, the embeddings of that graph are packed: only the graph and
//! the number of embeddings are kept, and the embeddings are recomputed by
//! subgraph matching when they are needed again.

use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet, HashSet},
};

use crate::{
    canonize::{Canonicity, CodeEdge, CodeWord},
    config::{SupportKind, SupportType},
    embedding::{chain_interior, Embedding},
    extension::{Extender, ExtensionKey, ExtensionKind},
    graph::{Graph, Group, NamedGraph},
    support,
    types::Atoms,
};

/// The embeddings of a fragment in one host graph, or one of them.
#[derive(Debug, Clone)]
pub enum Slot {
    Materialized(Embedding),
    Packed {
        graph: usize,
        group: Group,
        count: usize,
    },
}

impl Slot {
    pub fn graph(&self) -> usize {
        match self {
            Slot::Materialized(emb) => emb.graph,
            Slot::Packed { graph, .. } => *graph,
        }
    }

    pub fn group(&self) -> Group {
        match self {
            Slot::Materialized(emb) => emb.group,
            Slot::Packed { group, .. } => *group,
        }
    }

    pub fn is_materialized(&self) -> bool {
        matches!(self, Slot::Materialized(_))
    }
}

#[derive(Debug, Clone)]
pub struct Fragment {
    pub graph: Graph,
    slots: Vec<Slot>,
    supp: [usize; 4],
    support: [usize; 2],
    flags: u8,
    key: Option<ExtensionKey>,
    fixed: usize,
    cap: usize,
    embedded: bool,
}

impl Fragment {
    /// Reportable (no open rings, chains vary in length).
    pub const VALID: u8 = 0x01;
    /// No extension seen so far keeps the support.
    pub const CLOSED: u8 = 0x02;
    /// The defining extension is perfect.
    pub const PERFECT: u8 = 0x04;
    /// Followed as the only child of its base.
    pub const REVERTED: u8 = 0x08;
    /// The volatile suffix has been reordered.
    pub const ADAPTED: u8 = 0x10;
    /// Some embeddings are packed.
    pub const PACKED: u8 = 0x20;

    /// A fragment to start the search from. `cap` is the number of
    /// embeddings per host graph above which embeddings are packed (0 for
    /// no limit).
    pub fn seed(graph: Graph, cap: usize) -> Self {
        let chains = graph.nodes().iter().any(|n| Atoms::is_chain(n.ty()));
        Self {
            slots: Vec::new(),
            supp: [0; 4],
            support: [0; 2],
            flags: Self::VALID | Self::CLOSED,
            key: None,
            fixed: graph.edge_count(),
            cap: if chains { 0 } else { cap },
            embedded: true,
            graph,
        }
    }

    /// A child of `base` grown by the extension `key`, without embeddings.
    pub fn child(base: &Fragment, key: &ExtensionKey, cap: usize) -> Self {
        let mut graph = base.graph.clone();
        for entry in &key.entries {
            if entry.dst == graph.node_count() {
                graph.add_node(entry.dst_ty);
            }
            let added = graph.add_edge(entry.src, entry.dst, entry.ty);
            debug_assert!(added.is_ok(), "extension entries refer to existing nodes");
        }
        let mut child = Fragment::seed(graph, cap);
        child.key = Some(key.clone());
        child.fixed = if base.has(Self::REVERTED) {
            base.fixed
        } else {
            base.graph.edge_count()
        };
        child
    }

    pub fn has(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    pub fn clear(&mut self, flag: u8) {
        self.flags &= !flag;
    }

    /// Mark this fragment as the only child followed from its base.
    pub fn revert(&mut self) {
        self.flags |= Self::REVERTED;
    }

    /// The extension that created this fragment (none for seeds).
    pub fn key(&self) -> Option<&ExtensionKey> {
        self.key.as_ref()
    }

    pub fn kind(&self) -> Option<ExtensionKind> {
        self.key.as_ref().map(|k| k.kind)
    }

    /// The first code word entry of the defining extension.
    pub fn anchor(&self) -> Option<&CodeEdge> {
        self.key.as_ref().and_then(|k| k.first())
    }

    /// Graphs per group, then embeddings per group.
    pub fn supp(&self) -> [usize; 4] {
        self.supp
    }

    /// Support per group as of the last [`Fragment::compute_support`].
    pub fn support(&self) -> [usize; 2] {
        self.support
    }

    /// Number of leading edges `adapt` keeps in place.
    pub fn fixed(&self) -> usize {
        self.fixed
    }

    pub fn has_chains(&self) -> bool {
        self.graph.nodes().iter().any(|n| Atoms::is_chain(n.ty()))
    }

    /// Append an embedding. Embeddings must arrive ordered by host graph.
    pub fn add(&mut self, emb: Embedding) {
        let g = emb.group.index();
        if self.slots.last().map(Slot::graph) != Some(emb.graph) {
            self.supp[g] += 1;
        }
        self.supp[2 + g] += 1;
        self.push(emb);
    }

    fn push(&mut self, emb: Embedding) {
        if self.slots.last().is_some_and(|s| s.graph() != emb.graph) {
            self.pack();
        }
        self.slots.push(Slot::Materialized(emb));
    }

    /// Pack the embeddings of the last host graph if there are more than
    /// the cap allows. Earlier graphs are packed as the list moves on, so
    /// calling this once all embeddings are added packs everything that
    /// needs packing; further calls do nothing.
    pub fn pack(&mut self) {
        if self.cap == 0 {
            return;
        }
        let Some(graph) = self.slots.last().map(Slot::graph) else {
            return;
        };
        let start = self
            .slots
            .iter()
            .rposition(|s| s.graph() != graph)
            .map_or(0, |p| p + 1);
        let count = self.slots.len() - start;
        if count > self.cap && self.slots[start..].iter().all(Slot::is_materialized) {
            let group = self.slots[start].group();
            self.slots.truncate(start);
            self.slots.push(Slot::Packed {
                graph,
                group,
                count,
            });
            self.flags |= Self::PACKED;
        }
    }

    /// All embeddings, ordered by host graph. Packed embeddings are
    /// recomputed.
    pub fn embeddings<'a>(&'a self, hosts: &[NamedGraph]) -> Vec<Cow<'a, Embedding>> {
        let mut out = Vec::with_capacity(self.supp[2] + self.supp[3]);
        for slot in &self.slots {
            match slot {
                Slot::Materialized(emb) => out.push(Cow::Borrowed(emb)),
                Slot::Packed { graph, group, .. } => {
                    for (nodes, edges) in hosts[*graph].graph.embed(&self.graph) {
                        out.push(Cow::Owned(Embedding::new(*graph, *group, nodes, edges)));
                    }
                }
            }
        }
        out
    }

    /// The host graphs containing this fragment, in order.
    pub fn graphs(&self) -> Vec<usize> {
        let mut graphs: Vec<usize> = self.slots.iter().map(Slot::graph).collect();
        graphs.dedup();
        graphs
    }

    /// Compute the support per group with the given measure.
    pub fn compute_support(&mut self, kind: SupportType, hosts: &[NamedGraph]) -> [usize; 2] {
        self.support = if kind.kind == SupportKind::Graphs {
            [self.supp[0], self.supp[1]]
        } else {
            let mut embs = self.embeddings(hosts);
            embs.sort();
            support::compute(kind, &self.graph, &embs)
        };
        self.support
    }

    /// Whether the defining extension is perfect: it keeps the support, it
    /// is a single edge that does not start a chain, it can be applied to
    /// every embedding of `base` and, if it adds a node, it is a bridge in
    /// every host graph, so that it can be added to any extension of the
    /// base without changing the support.
    pub fn is_perfect(&mut self, base: &Fragment, chain_start: bool, hosts: &[NamedGraph]) -> bool {
        if self.has(Self::PERFECT) {
            return true;
        }
        let Some(key) = &self.key else {
            return false;
        };
        if key.kind != ExtensionKind::Edge || chain_start || self.supp[..2] != base.supp[..2] {
            return false;
        }
        let entry = key.entries[0];
        if entry.dst == base.graph.node_count() {
            let bridges = self.embeddings(hosts).iter().all(|emb| {
                emb.edges
                    .last()
                    .is_some_and(|&e| hosts[emb.graph].graph.edge(e).is_bridge())
            });
            if !bridges {
                return false;
            }
        }
        let everywhere = base
            .embeddings(hosts)
            .iter()
            .all(|emb| emb.extend(&hosts[emb.graph].graph, &entry).is_some());
        if everywhere {
            self.flags |= Self::PERFECT;
        }
        everywhere
    }

    /// Whether no extension occurs in every host graph containing this
    /// fragment. The candidate set starts with the extensions found in the
    /// first graph and shrinks graph by graph.
    pub fn is_closed(&self, extender: &Extender, hosts: &[NamedGraph]) -> bool {
        let embs = self.embeddings(hosts);
        let mut common: Option<HashSet<ExtensionKey>> = None;
        for run in embs.chunk_by(|a, b| a.graph == b.graph) {
            let mut here = HashSet::new();
            for emb in run {
                for key in extender.closure_keys(&self.graph, emb) {
                    if common.as_ref().map_or(true, |c| c.contains(&key)) {
                        here.insert(key);
                    }
                }
            }
            if here.is_empty() {
                return true;
            }
            common = Some(here);
        }
        common.map_or(true, |c| c.is_empty())
    }

    /// Check the code word. With `partial`, smaller words that agree on the
    /// fixed prefix do not make the fragment non-canonic.
    pub fn is_canonic(&self, partial: bool, seed: Option<&Graph>) -> Canonicity {
        let fixed = if partial {
            self.fixed
        } else {
            self.graph.edge_count()
        };
        self.graph.is_canonic(fixed, seed)
    }

    /// Renumber to the smallest code word keeping the first `keep` edges
    /// and remap the stored embeddings. Returns whether anything changed.
    pub fn make_canonic(&mut self, keep: usize, seed: Option<&Graph>) -> bool {
        let Some(perm) = self.graph.make_canonic(keep, seed) else {
            return false;
        };
        for slot in &mut self.slots {
            if let Slot::Materialized(emb) = slot {
                let (nodes, edges) = perm.apply(&emb.nodes, &emb.edges);
                emb.nodes = nodes;
                emb.edges = edges;
            }
        }
        true
    }

    /// Reorder the volatile suffix (the edges after the fixed prefix) and
    /// return the canonical code word. If the reordered fragment is
    /// canonic, its own word is returned without a full canonical search.
    ///
    /// Changes the numbering, so checks comparing embeddings with those of
    /// the base must come first.
    pub fn adapt(&mut self, seed: Option<&Graph>) -> CodeWord {
        if !self.has(Self::ADAPTED) {
            self.flags |= Self::ADAPTED;
            match self.is_canonic(true, seed) {
                Canonicity::Canonic => return self.graph.code_word(),
                _ => {
                    let keep = self.fixed;
                    self.make_canonic(keep, seed);
                }
            }
        }
        match self.graph.is_canonic(0, seed) {
            Canonicity::Canonic => self.graph.code_word(),
            _ => self.graph.canonical_word(seed),
        }
    }

    /// Replace ring extension children by single-edge children holding
    /// the embeddings of their first edge. An edge embedding survives only
    /// if it starts some ring, so single edges that cannot become part of a
    /// closed ring disappear. Must run before the children are packed.
    pub fn merge_exts(children: &mut BTreeMap<ExtensionKey, Fragment>, base: &Fragment, cap: usize) {
        let rings: Vec<ExtensionKey> = children
            .keys()
            .filter(|k| k.kind == ExtensionKind::Ring)
            .cloned()
            .collect();
        let (n, m) = (base.graph.node_count(), base.graph.edge_count());
        let mut merged: BTreeMap<ExtensionKey, Vec<Embedding>> = BTreeMap::new();
        for key in rings {
            let Some(ring) = children.remove(&key) else {
                continue;
            };
            let Some(&first) = key.first() else {
                continue;
            };
            let n_nodes = n + usize::from(first.dst == n);
            let list = merged
                .entry(ExtensionKey {
                    entries: vec![first],
                    kind: ExtensionKind::Edge,
                })
                .or_default();
            for slot in ring.slots {
                if let Slot::Materialized(emb) = slot {
                    list.push(emb.truncated(n_nodes, m + 1));
                }
            }
        }
        for (key, mut embs) in merged {
            embs.sort();
            embs.dedup_by(|a, b| a.shares_base(b, a.nodes.len(), a.edges.len()));
            let mut child = Fragment::child(base, &key, cap);
            for emb in embs {
                child.add(emb);
            }
            child.pack();
            children.insert(key, child);
        }
    }

    /// The host graph and the sorted host edges of the first embedding.
    /// Siblings with equal signatures cover the same host subgraph and are
    /// therefore the same fragment. Chains have no signature.
    pub fn signature(&self, hosts: &[NamedGraph]) -> Option<(usize, Vec<usize>)> {
        if self.has_chains() || self.graph.edge_count() == 0 {
            return None;
        }
        let embs = self.embeddings(hosts);
        let first = embs.first()?;
        let mut edges = first.edges.clone();
        edges.sort_unstable();
        Some((first.graph, edges))
    }

    pub fn is_equiv_to(&self, other: &Fragment, hosts: &[NamedGraph]) -> bool {
        match (self.signature(hosts), other.signature(hosts)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn has_open_rings(&self, min: usize, max: usize) -> bool {
        self.graph.has_open_rings(min, max)
    }

    /// Whether a ring can no longer be closed: a node that restricted
    /// extensions cannot reach any more (its index is below the source of
    /// the anchor) has exactly one ring edge.
    pub fn has_unclosable_rings(&self) -> bool {
        let Some(anchor) = self.anchor() else {
            return false;
        };
        (0..anchor.src.min(self.graph.node_count())).any(|n| {
            self.graph
                .node(n)
                .edges()
                .iter()
                .filter(|&&e| self.graph.edge(e).is_ring())
                .count()
                == 1
        })
    }

    /// Whether every chain occurs with length 1 and with at least one other
    /// length. Otherwise the chain is not variable and the same fragment is
    /// found with plain edges.
    pub fn chains_valid(&self, hosts: &[NamedGraph]) -> bool {
        (0..self.graph.node_count())
            .filter(|&c| Atoms::is_chain(self.graph.node_type(c)))
            .all(|c| {
                let lengths: BTreeSet<usize> = self
                    .slots
                    .iter()
                    .filter_map(|slot| match slot {
                        Slot::Materialized(emb) => Some(emb),
                        Slot::Packed { .. } => None,
                    })
                    .map(|emb| chain_interior(&self.graph, emb, &hosts[emb.graph].graph, c).0.len())
                    .collect();
                lengths.first() == Some(&1) && lengths.len() >= 2
            })
    }

    /// Drop the embeddings, keeping the counters. Fragments with chains
    /// keep theirs, as they cannot be recomputed by matching.
    pub fn unembed(&mut self) {
        if !self.has_chains() {
            self.slots.clear();
            self.embedded = false;
        }
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    /// Recreate the embeddings dropped by [`Fragment::unembed`] from those
    /// of `base`: by extending them for single edges, by matching in the
    /// base's host graphs otherwise.
    pub fn reembed(&mut self, base: &Fragment, hosts: &[NamedGraph]) {
        if self.embedded {
            return;
        }
        let embs: Vec<Embedding> = match &self.key {
            Some(key) if key.kind == ExtensionKind::Edge && key.entries.len() == 1 => {
                let entry = key.entries[0];
                base.embeddings(hosts)
                    .iter()
                    .flat_map(|emb| emb.extend_all(&hosts[emb.graph].graph, &entry))
                    .collect()
            }
            _ => base
                .graphs()
                .into_iter()
                .flat_map(|g| {
                    let group = hosts[g].group;
                    hosts[g]
                        .graph
                        .embed(&self.graph)
                        .into_iter()
                        .map(move |(nodes, edges)| Embedding::new(g, group, nodes, edges))
                })
                .collect(),
        };
        for emb in embs {
            self.push(emb);
        }
        self.pack();
        self.embedded = true;
    }
}

#[cfg(test)]
mod tests {
    use bit_set::BitSet;

    use super::*;
    use crate::{config::RingMode, types::Bonds};

    const S: u32 = Bonds::SINGLE;
    const C: u32 = 0;
    const N: u32 = 1;
    const O: u32 = 2;

    fn build(types: &[u32], edges: &[(usize, usize)]) -> Graph {
        let mut g = Graph::new();
        for &t in types {
            g.add_node(t);
        }
        for &(a, b) in edges {
            g.add_edge(a, b, S).unwrap();
        }
        g.mark_bridges();
        g
    }

    fn hosts(graphs: Vec<Graph>) -> Vec<NamedGraph> {
        graphs
            .into_iter()
            .enumerate()
            .map(|(i, g)| NamedGraph::new(i.to_string(), 1.0, Group::Focus, g))
            .collect()
    }

    fn seed(t: u32, hosts: &[NamedGraph], cap: usize) -> Fragment {
        let mut g = Graph::new();
        g.add_node(t);
        let mut frag = Fragment::seed(g, cap);
        for (i, host) in hosts.iter().enumerate() {
            for n in 0..host.graph.node_count() {
                if host.graph.node_type(n) == t {
                    frag.add(Embedding::new(i, host.group, vec![n], vec![]));
                }
            }
        }
        frag.pack();
        frag
    }

    fn children(
        frag: &Fragment,
        extender: &Extender,
        hosts: &[NamedGraph],
    ) -> BTreeMap<ExtensionKey, Fragment> {
        let mut out: BTreeMap<ExtensionKey, Fragment> = BTreeMap::new();
        for emb in frag.embeddings(hosts) {
            for ext in extender.children(&frag.graph, &emb, None) {
                out.entry(ext.key.clone())
                    .or_insert_with(|| Fragment::child(frag, &ext.key, 0))
                    .add(ext.embedding);
            }
        }
        out
    }

    #[test]
    fn packing_keeps_counts() {
        let hosts = hosts(vec![build(&[C, C, O], &[(0, 1), (1, 2)]), build(&[C, O], &[(0, 1)])]);
        let frag = seed(C, &hosts, 1);
        assert!(frag.has(Fragment::PACKED));
        assert_eq!(frag.supp(), [2, 0, 3, 0]);
        let embs = frag.embeddings(&hosts);
        assert_eq!(embs.len(), 3);
        assert!(matches!(embs[0], Cow::Owned(_)));
        assert!(matches!(embs[2], Cow::Borrowed(_)));
        let unpacked = seed(C, &hosts, 0);
        assert!(!unpacked.has(Fragment::PACKED));
        assert_eq!(unpacked.graphs(), vec![0, 1]);
    }

    #[test]
    fn perfect_and_closed() {
        let hosts = hosts(vec![build(&[C, O], &[(0, 1)]), build(&[N, C, O], &[(0, 1), (1, 2)])]);
        let none = BitSet::new();
        let extender = Extender::new(&hosts, &none, RingMode::None, None);
        let c = seed(C, &hosts, 0);
        assert!(!c.is_closed(&extender, &hosts));
        let mut kids = children(&c, &extender, &hosts);
        assert_eq!(kids.len(), 2);
        let (n_key, o_key) = {
            let mut keys = kids.keys().cloned();
            (keys.next().unwrap(), keys.next().unwrap())
        };
        assert_eq!(n_key.entries[0].dst_ty, N);
        let o = kids.get_mut(&o_key).unwrap();
        assert!(o.is_perfect(&c, false, &hosts));
        assert!(!o.is_perfect(&c, false, &hosts) || o.has(Fragment::PERFECT));
        assert!(o.is_closed(&extender, &hosts));
        let n = kids.get_mut(&n_key).unwrap();
        assert_eq!(n.supp(), [1, 0, 1, 0]);
        assert!(!n.is_perfect(&c, false, &hosts));
    }

    #[test]
    fn canonical_renumbering_moves_embeddings() {
        let hosts = hosts(vec![build(&[O, C], &[(0, 1)])]);
        let none = BitSet::new();
        let extender = Extender::new(&hosts, &none, RingMode::None, None);
        let o = seed(O, &hosts, 0);
        let mut kids = children(&o, &extender, &hosts);
        let (_, mut oc) = kids.pop_first().unwrap();
        assert_eq!(oc.is_canonic(false, None), Canonicity::NonCanonic);
        assert!(oc.make_canonic(0, None));
        assert_eq!(oc.graph.node_type(0), C);
        let embs = oc.embeddings(&hosts);
        assert_eq!(embs[0].nodes, vec![1, 0]);
        assert_eq!(oc.is_canonic(false, None), Canonicity::Canonic);
    }

    #[test]
    fn adapt_yields_canonical_word() {
        let hosts = hosts(vec![build(&[O, C, N], &[(0, 1), (1, 2)])]);
        let none = BitSet::new();
        let extender = Extender::new(&hosts, &none, RingMode::None, None);
        let o = seed(O, &hosts, 0);
        let (_, oc) = children(&o, &extender, &hosts).pop_first().unwrap();
        let (_, mut ocn) = children(&oc, &extender, &hosts).pop_first().unwrap();
        assert_eq!(ocn.fixed(), 1);
        let word = ocn.adapt(None);
        assert_eq!(word, ocn.graph.canonical_word(None));
        assert!(ocn.has(Fragment::ADAPTED));
        // the first edge stays in place
        assert_eq!(ocn.embeddings(&hosts)[0].edges[0], 0);
    }

    #[test]
    fn merged_rings_keep_closable_edges() {
        // a three-ring of carbons with an oxygen attached to one of them,
        // and a lone C-C edge in a second graph
        let mut ring = build(&[C, C, C, O], &[(0, 1), (1, 2), (2, 0), (0, 3)]);
        ring.mark_rings(3, 6);
        let mut chain = build(&[C, C], &[(0, 1)]);
        chain.mark_rings(3, 6);
        let hosts = hosts(vec![ring, chain]);
        let none = BitSet::new();
        let extender = Extender::new(&hosts, &none, RingMode::Merge, None);
        let c = seed(C, &hosts, 0);
        let mut kids = children(&c, &extender, &hosts);
        assert!(kids.keys().any(|k| k.kind == ExtensionKind::Ring));
        Fragment::merge_exts(&mut kids, &c, 1);
        assert!(kids.keys().all(|k| k.kind == ExtensionKind::Edge));
        let ring_edge = kids
            .values()
            .find(|f| f.graph.edge(0).is_ring())
            .unwrap();
        // three ring carbons, two directions each, only in the ring graph
        assert_eq!(ring_edge.supp(), [1, 0, 6, 0]);
        assert!(ring_edge.has(Fragment::PACKED));
        assert_eq!(ring_edge.embeddings(&hosts).len(), 6);
    }

    #[test]
    fn unembed_and_reembed() {
        let hosts = hosts(vec![build(&[C, C, O], &[(0, 1), (1, 2)])]);
        let none = BitSet::new();
        let extender = Extender::new(&hosts, &none, RingMode::None, None);
        let c = seed(C, &hosts, 0);
        let mut kids = children(&c, &extender, &hosts);
        for child in kids.values_mut() {
            let before: Vec<Embedding> =
                child.embeddings(&hosts).into_iter().map(Cow::into_owned).collect();
            child.unembed();
            assert!(!child.is_embedded());
            child.reembed(&c, &hosts);
            let after: Vec<Embedding> =
                child.embeddings(&hosts).into_iter().map(Cow::into_owned).collect();
            assert_eq!(before, after);
        }
    }

    #[test]
    fn unclosable_and_open_rings() {
        let mut g = Graph::new();
        for _ in 0..3 {
            g.add_node(C);
        }
        g.add_edge(0, 1, S | Bonds::RING).unwrap();
        g.add_edge(1, 2, S | Bonds::RING).unwrap();
        let mut frag = Fragment::seed(g, 0);
        assert!(frag.has_open_rings(3, 6));
        assert!(!frag.has_unclosable_rings());
        frag.key = Some(ExtensionKey {
            entries: vec![CodeEdge {
                src: 1,
                ty: S | Bonds::RING,
                dst_ty: C,
                dst: 2,
            }],
            kind: ExtensionKind::Edge,
        });
        // node 0 is frozen with a single ring edge
        assert!(frag.has_unclosable_rings());
    }

    #[test]
    fn chain_lengths_must_vary() {
        // N-C-O and N-C-C-O
        let hosts = hosts(vec![
            build(&[N, C, O], &[(0, 1), (1, 2)]),
            build(&[N, C, C, O], &[(0, 1), (1, 2), (2, 3)]),
        ]);
        let none = BitSet::new();
        let extender = Extender::new(&hosts, &none, RingMode::None, Some(C));
        let n = seed(N, &hosts, 0);
        let kids = children(&n, &extender, &hosts);
        let chain = kids
            .values()
            .find(|f| f.kind() == Some(ExtensionKind::Chain))
            .unwrap();
        assert_eq!(chain.supp(), [2, 0, 2, 0]);
        assert!(chain.chains_valid(&hosts));
        let only_short = hosts[..1].to_vec();
        let n = seed(N, &only_short, 0);
        let extender = Extender::new(&only_short, &none, RingMode::None, Some(C));
        let kids = children(&n, &extender, &only_short);
        let chain = kids
            .values()
            .find(|f| f.kind() == Some(ExtensionKind::Chain))
            .unwrap();
        assert!(!chain.chains_valid(&only_short));
    }
}
