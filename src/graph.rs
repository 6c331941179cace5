//! Attributed graphs: typed nodes and edges in per-graph arenas.
//!
//! Nodes and edges are addressed by their position in the arenas. An edge
//! stores its two endpoints; a node stores the indices of its incident
//! edges. Besides its type an edge carries a 64-bit flag word: the highest
//! bit marks bridges, every other bit stands for one ring found by
//! [`Graph::mark_rings`].

use petgraph::{dot::Dot, Graph as PGraph, Undirected};

use crate::{
    config::TypeMasks,
    error::GraphError,
    types::{Atoms, Bonds, Element},
};

/// The two partitions of the graph database.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Group {
    Focus,
    Complement,
}

impl Group {
    /// Index into per-group counters.
    pub fn index(self) -> usize {
        match self {
            Group::Focus => 0,
            Group::Complement => 1,
        }
    }

    /// Assign a group from a discriminant value: values above `threshold`
    /// are focus graphs unless `invert` is set.
    pub fn from_value(value: f64, threshold: f64, invert: bool) -> Self {
        if (value > threshold) != invert {
            Group::Focus
        } else {
            Group::Complement
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub(crate) ty: u32,
    pub(crate) edges: Vec<usize>,
}

impl Node {
    pub fn ty(&self) -> u32 {
        self.ty
    }

    /// Indices of the incident edges.
    pub fn edges(&self) -> &[usize] {
        &self.edges
    }

    pub fn degree(&self) -> usize {
        self.edges.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub(crate) ty: u32,
    pub(crate) src: usize,
    pub(crate) dst: usize,
    pub(crate) flags: u64,
}

impl Edge {
    pub const BRIDGE: u64 = 1 << 63;
    pub const RINGS: u64 = !Self::BRIDGE;

    pub fn ty(&self) -> u32 {
        self.ty
    }

    pub fn src(&self) -> usize {
        self.src
    }

    pub fn dst(&self) -> usize {
        self.dst
    }

    /// Return the endpoint opposite to `node`.
    pub fn other(&self, node: usize) -> usize {
        if self.src == node {
            self.dst
        } else {
            self.src
        }
    }

    /// Whether the edge type carries the ring flag.
    pub fn is_ring(&self) -> bool {
        self.ty & Bonds::RING != 0
    }

    /// The ring-membership bitmap.
    pub fn rings(&self) -> u64 {
        self.flags & Self::RINGS
    }

    pub fn is_bridge(&self) -> bool {
        self.flags & Self::BRIDGE != 0
    }
}

/// A simple undirected graph with typed nodes and edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    pub(crate) nodes: Vec<Node>,
    pub(crate) edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(nodes),
            edges: Vec::with_capacity(edges),
        }
    }

    /// Add a node of type `ty` and return its index.
    pub fn add_node(&mut self, ty: u32) -> usize {
        self.nodes.push(Node {
            ty,
            edges: Vec::new(),
        });
        self.nodes.len() - 1
    }

    /// Add an edge of type `ty` between `src` and `dst` and return its index.
    /// The edge is registered with both endpoints.
    pub fn add_edge(&mut self, src: usize, dst: usize, ty: u32) -> Result<usize, GraphError> {
        let count = self.nodes.len();
        for index in [src, dst] {
            if index >= count {
                return Err(GraphError::NodeOutOfRange { index, count });
            }
        }
        if src == dst {
            return Err(GraphError::LoopBond { node: src });
        }
        let e = self.edges.len();
        self.edges.push(Edge {
            ty,
            src,
            dst,
            flags: 0,
        });
        self.nodes[src].edges.push(e);
        self.nodes[dst].edges.push(e);
        Ok(e)
    }

    /// Release spare capacity once construction is finished.
    pub fn opt(&mut self) {
        self.nodes.shrink_to_fit();
        self.edges.shrink_to_fit();
        for node in &mut self.nodes {
            node.edges.shrink_to_fit();
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, i: usize) -> &Node {
        &self.nodes[i]
    }

    pub fn edge(&self, i: usize) -> &Edge {
        &self.edges[i]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_type(&self, i: usize) -> u32 {
        self.nodes[i].ty
    }

    pub fn edge_type(&self, i: usize) -> u32 {
        self.edges[i].ty
    }

    /// Return the edge between `a` and `b`, if any.
    pub fn edge_between(&self, a: usize, b: usize) -> Option<usize> {
        self.nodes[a]
            .edges
            .iter()
            .copied()
            .find(|&e| self.edges[e].other(a) == b)
    }

    /// Whether all nodes are reachable from node 0.
    pub fn is_connected(&self) -> bool {
        if self.nodes.is_empty() {
            return true;
        }
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![0];
        seen[0] = true;
        let mut reached = 1;
        while let Some(n) = stack.pop() {
            for &e in &self.nodes[n].edges {
                let m = self.edges[e].other(n);
                if !seen[m] {
                    seen[m] = true;
                    reached += 1;
                    stack.push(m);
                }
            }
        }
        reached == self.nodes.len()
    }

    /// Compute one ring bitmap per edge for all simple rings with a size in
    /// `min..=max`, without touching the graph. Each ring is found exactly
    /// once, from its lowest-index edge. At most 63 rings get a bit.
    pub(crate) fn ring_bits(&self, min: usize, max: usize) -> (Vec<u64>, usize) {
        let mut bits = vec![0u64; self.edges.len()];
        if max < 3 || min > max {
            return (bits, 0);
        }
        let mut found = 0;
        let mut on_path = vec![false; self.nodes.len()];
        let mut path = Vec::with_capacity(max);
        for first in 0..self.edges.len() {
            let Edge { src, dst, .. } = self.edges[first];
            on_path[src] = true;
            on_path[dst] = true;
            path.push(first);
            self.close_rings(
                first, src, dst, min, max, &mut on_path, &mut path, &mut bits, &mut found,
            );
            path.pop();
            on_path[src] = false;
            on_path[dst] = false;
        }
        (bits, found)
    }

    #[allow(clippy::too_many_arguments)]
    fn close_rings(
        &self,
        first: usize,
        target: usize,
        node: usize,
        min: usize,
        max: usize,
        on_path: &mut [bool],
        path: &mut Vec<usize>,
        bits: &mut [u64],
        found: &mut usize,
    ) {
        for &e in &self.nodes[node].edges {
            if e <= first || path.contains(&e) {
                continue;
            }
            let next = self.edges[e].other(node);
            let len = path.len() + 1;
            if next == target {
                if len >= min && len <= max {
                    let bit = if *found < 63 { 1u64 << *found } else { 0 };
                    for &f in path.iter().chain(std::iter::once(&e)) {
                        bits[f] |= bit;
                    }
                    *found += 1;
                }
            } else if !on_path[next] && len < max {
                on_path[next] = true;
                path.push(e);
                self.close_rings(first, target, next, min, max, on_path, path, bits, found);
                path.pop();
                on_path[next] = false;
            }
        }
    }

    /// Flag every edge lying on a simple ring with a size in `min..=max`.
    /// Each ring gets its own bit in the flags of its edges and the ring
    /// flag is set in the edge types. `mark_rings(0, 0)` clears all ring
    /// information. Returns the number of rings found.
    pub fn mark_rings(&mut self, min: usize, max: usize) -> usize {
        let (bits, found) = self.ring_bits(min, max);
        let members = self.ring_members(&bits, max, found);
        for (i, edge) in self.edges.iter_mut().enumerate() {
            edge.flags = (edge.flags & Edge::BRIDGE) | bits[i];
            if members[i] {
                edge.ty |= Bonds::RING;
            } else {
                edge.ty &= !Bonds::RING;
            }
        }
        found
    }

    // Ring membership per edge, including rings beyond the 63 bits.
    fn ring_members(&self, bits: &[u64], max: usize, found: usize) -> Vec<bool> {
        if found <= 63 {
            return bits.iter().map(|&b| b != 0).collect();
        }
        // too many rings for the bitmap: fall back to the plain question
        // whether an edge lies on any short enough cycle
        (0..self.edges.len())
            .map(|e| bits[e] != 0 || self.on_cycle(e, max))
            .collect()
    }

    // Whether edge `e` lies on a cycle of at most `max` edges.
    fn on_cycle(&self, e: usize, max: usize) -> bool {
        let Edge { src, dst, .. } = self.edges[e];
        let mut dist = vec![usize::MAX; self.nodes.len()];
        let mut queue = std::collections::VecDeque::from([dst]);
        dist[dst] = 0;
        while let Some(n) = queue.pop_front() {
            for &f in &self.nodes[n].edges {
                if f == e {
                    continue;
                }
                let m = self.edges[f].other(n);
                if dist[m] == usize::MAX {
                    dist[m] = dist[n] + 1;
                    if m == src {
                        return dist[m] + 1 <= max;
                    }
                    queue.push_back(m);
                }
            }
        }
        false
    }

    /// Flag every bridge, i.e. every edge whose removal disconnects its
    /// component.
    pub fn mark_bridges(&mut self) {
        let n = self.nodes.len();
        let mut order = vec![usize::MAX; n];
        let mut low = vec![0; n];
        let mut bridges = vec![false; self.edges.len()];
        let mut time = 0;
        for root in 0..n {
            if order[root] == usize::MAX {
                self.find_bridges(root, usize::MAX, &mut order, &mut low, &mut time, &mut bridges);
            }
        }
        for (edge, bridge) in self.edges.iter_mut().zip(bridges) {
            if bridge {
                edge.flags |= Edge::BRIDGE;
            } else {
                edge.flags &= !Edge::BRIDGE;
            }
        }
    }

    fn find_bridges(
        &self,
        node: usize,
        via: usize,
        order: &mut [usize],
        low: &mut [usize],
        time: &mut usize,
        bridges: &mut [bool],
    ) {
        order[node] = *time;
        low[node] = *time;
        *time += 1;
        for &e in &self.nodes[node].edges {
            if e == via {
                continue;
            }
            let next = self.edges[e].other(node);
            if order[next] == usize::MAX {
                self.find_bridges(next, e, order, low, time, bridges);
                low[node] = low[node].min(low[next]);
                if low[next] > order[node] {
                    bridges[e] = true;
                }
            } else {
                low[node] = low[node].min(order[next]);
            }
        }
    }

    /// Walk the ring `bit` starting with edge `first` leaving `from`.
    /// Returns the ring's edges in walk order, or `None` if the ring cannot
    /// be followed back to `from`.
    pub(crate) fn ring_walk(&self, from: usize, first: usize, bit: u64) -> Option<Vec<usize>> {
        let mut ring = vec![first];
        let mut node = self.edges[first].other(from);
        let mut last = first;
        while node != from {
            let next = self.nodes[node]
                .edges
                .iter()
                .copied()
                .find(|&e| e != last && self.edges[e].flags & bit != 0)?;
            ring.push(next);
            if ring.len() > 63 {
                return None;
            }
            node = self.edges[next].other(node);
            last = next;
        }
        Some(ring)
    }

    /// Convert alternating single/double six-rings into aromatic rings.
    ///
    /// A ring qualifies if the bonds at positions 0, 2, 4 have one type and
    /// those at positions 1, 3, 5 the other, one of them single and one
    /// double. All qualifying rings are found before any bond is retyped, so
    /// fused systems are judged on the original bonds. Existing ring marks
    /// are cleared. Returns the number of converted rings.
    pub fn aromatize(&mut self) -> usize {
        self.mark_rings(6, 6);
        let mut convert = vec![false; self.edges.len()];
        let mut count = 0;
        for e in 0..self.edges.len() {
            let mut rings = self.edges[e].rings();
            while rings != 0 {
                let bit = rings & rings.wrapping_neg();
                rings &= !bit;
                // handle each ring once, from its lowest edge
                if (0..e).any(|f| self.edges[f].flags & bit != 0) {
                    continue;
                }
                let Some(ring) = self.ring_walk(self.edges[e].src, e, bit) else {
                    continue;
                };
                if ring.len() != 6 {
                    continue;
                }
                let t: Vec<u32> = ring.iter().map(|&f| Bonds::bond(self.edges[f].ty)).collect();
                let alternating = t[0] == t[2]
                    && t[2] == t[4]
                    && t[1] == t[3]
                    && t[3] == t[5]
                    && ((t[0] == Bonds::SINGLE && t[1] == Bonds::DOUBLE)
                        || (t[0] == Bonds::DOUBLE && t[1] == Bonds::SINGLE));
                if alternating {
                    for &f in &ring {
                        convert[f] = true;
                    }
                    count += 1;
                }
            }
        }
        for (e, convert) in convert.into_iter().enumerate() {
            if convert {
                let Edge { src, dst, .. } = self.edges[e];
                self.edges[e].ty = Bonds::AROMATIC | (self.edges[e].ty & Bonds::RING);
                self.nodes[src].ty |= Atoms::AROMATIC;
                self.nodes[dst].ty |= Atoms::AROMATIC;
            }
        }
        self.mark_rings(0, 0);
        count
    }

    /// Replace aromatic bonds by alternating single and double bonds.
    ///
    /// Every atom with aromatic bonds receives exactly one double bond,
    /// except oxygen, sulfur and selenium, atoms that already carry a double
    /// bond and nitrogen or phosphorus with three neighbours. Returns `false`
    /// (leaving the graph unchanged) if no such assignment exists.
    pub fn kekulize(&mut self) -> bool {
        let aromatic: Vec<bool> = self
            .edges
            .iter()
            .map(|e| Bonds::bond(e.ty) == Bonds::AROMATIC)
            .collect();
        let need: Vec<bool> = (0..self.nodes.len())
            .map(|n| self.needs_double(n, &aromatic))
            .collect();
        let mut matched = vec![false; self.nodes.len()];
        let mut double = vec![false; self.edges.len()];
        if !self.match_doubles(0, &aromatic, &need, &mut matched, &mut double) {
            return false;
        }
        for e in 0..self.edges.len() {
            if aromatic[e] {
                let ring = self.edges[e].ty & Bonds::RING;
                let bond = if double[e] { Bonds::DOUBLE } else { Bonds::SINGLE };
                self.edges[e].ty = bond | ring;
                let Edge { src, dst, .. } = self.edges[e];
                self.nodes[src].ty &= !Atoms::AROMATIC;
                self.nodes[dst].ty &= !Atoms::AROMATIC;
            }
        }
        true
    }

    fn needs_double(&self, n: usize, aromatic: &[bool]) -> bool {
        let node = &self.nodes[n];
        if !node.edges.iter().any(|&e| aromatic[e]) {
            return false;
        }
        if node
            .edges
            .iter()
            .any(|&e| Bonds::bond(self.edges[e].ty) == Bonds::DOUBLE)
        {
            return false;
        }
        match Atoms::element(node.ty) {
            Some(Element::Oxygen | Element::Sulfur | Element::Selenium) => false,
            Some(Element::Nitrogen | Element::Phosphorus) => {
                node.degree() < 3 && Atoms::charge(node.ty) == 0
            }
            _ => true,
        }
    }

    fn match_doubles(
        &self,
        from: usize,
        aromatic: &[bool],
        need: &[bool],
        matched: &mut [bool],
        double: &mut [bool],
    ) -> bool {
        let Some(n) = (from..self.nodes.len()).find(|&n| need[n] && !matched[n]) else {
            return true;
        };
        for &e in &self.nodes[n].edges {
            let m = self.edges[e].other(n);
            if !aromatic[e] || !need[m] || matched[m] {
                continue;
            }
            matched[n] = true;
            matched[m] = true;
            double[e] = true;
            if self.match_doubles(n + 1, aromatic, need, matched, double) {
                return true;
            }
            double[e] = false;
            matched[m] = false;
            matched[n] = false;
        }
        false
    }

    /// Apply type masks. Nodes incident to a ring edge and ring edges use the
    /// ring masks; the ring flag of an edge type is always kept.
    pub fn mask_types(&mut self, masks: &TypeMasks) {
        for n in 0..self.nodes.len() {
            let in_ring = self.nodes[n].edges.iter().any(|&e| self.edges[e].is_ring());
            let mask = if in_ring { masks.ring_atom } else { masks.atom };
            self.nodes[n].ty &= mask;
        }
        for edge in &mut self.edges {
            let ring = edge.ty & Bonds::RING;
            let mask = if ring != 0 { masks.ring_bond } else { masks.bond };
            edge.ty = (edge.ty & !Bonds::RING & mask) | ring;
        }
    }

    /// Return a copy keeping only the nodes for which `keep` holds (and the
    /// edges between them). Node order, edge order and edge flags are
    /// preserved.
    pub fn trimmed(&self, keep: impl Fn(u32) -> bool) -> Graph {
        let mut map = vec![usize::MAX; self.nodes.len()];
        let mut out = Graph::with_capacity(self.nodes.len(), self.edges.len());
        for (i, node) in self.nodes.iter().enumerate() {
            if keep(node.ty) {
                map[i] = out.add_node(node.ty);
            }
        }
        for edge in &self.edges {
            let (s, d) = (map[edge.src], map[edge.dst]);
            if s == usize::MAX || d == usize::MAX {
                continue;
            }
            if let Ok(e) = out.add_edge(s, d, edge.ty) {
                out.edges[e].flags = edge.flags;
            }
        }
        out.opt();
        out
    }

    /// Replace every node type `t` by `f(t)`.
    pub fn recode(&mut self, f: impl Fn(u32) -> u32) {
        for node in &mut self.nodes {
            node.ty = f(node.ty);
        }
    }

    /// Whether some ring-flagged edge does not lie on a ring of this graph
    /// with a size in `min..=max`, i.e. whether a ring is still open.
    pub fn has_open_rings(&self, min: usize, max: usize) -> bool {
        let (bits, found) = self.ring_bits(min, max);
        self.edges.iter().enumerate().any(|(e, edge)| {
            edge.is_ring() && bits[e] == 0 && (found <= 63 || !self.on_cycle(e, max))
        })
    }

    /// Return a copy whose node indices follow the order in which the nodes
    /// first appear along the edge list. Nodes without edges come last.
    pub fn normalized(&self) -> Graph {
        let mut map = vec![usize::MAX; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());
        for edge in &self.edges {
            for n in [edge.src, edge.dst] {
                if map[n] == usize::MAX {
                    map[n] = order.len();
                    order.push(n);
                }
            }
        }
        for n in 0..self.nodes.len() {
            if map[n] == usize::MAX {
                map[n] = order.len();
                order.push(n);
            }
        }
        let mut out = Graph::with_capacity(self.nodes.len(), self.edges.len());
        for &n in &order {
            out.add_node(self.nodes[n].ty);
        }
        for edge in &self.edges {
            if let Ok(e) = out.add_edge(map[edge.src], map[edge.dst], edge.ty) {
                out.edges[e].flags = edge.flags;
            }
        }
        out
    }

    /// Convert to a petgraph graph with node and edge types as weights.
    pub fn to_petgraph(&self) -> PGraph<u32, u32, Undirected> {
        let mut g = PGraph::with_capacity(self.nodes.len(), self.edges.len());
        let ix: Vec<_> = self.nodes.iter().map(|n| g.add_node(n.ty)).collect();
        for edge in &self.edges {
            g.add_edge(ix[edge.src], ix[edge.dst], edge.ty);
        }
        g
    }

    /// Return a pretty-printable representation of this graph.
    pub fn info(&self) -> String {
        let g = self.to_petgraph();
        let dot = Dot::new(&g);
        format!("{dot:?}")
    }
}

/// A host graph of the database.
#[derive(Debug, Clone)]
pub struct NamedGraph {
    pub id: String,
    pub value: f64,
    pub group: Group,
    pub graph: Graph,
}

impl NamedGraph {
    pub fn new(id: impl Into<String>, value: f64, group: Group, graph: Graph) -> Self {
        Self {
            id: id.into(),
            value,
            group,
            graph,
        }
    }
}
