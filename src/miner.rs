//! The search driver.
//!
//! A [`Miner`] holds the host graphs and a [`MinerConfig`]. [`Miner::run`]
//! prepares the graphs (exclusion, aromatization, ring and bridge marking,
//! type masking, trimming of infrequent types, recoding), then runs a
//! depth-first search from every seed and hands each accepted fragment to a
//! [`FragmentSink`].
//!
//! Duplicate fragments are avoided in one of two ways. In canonical mode a
//! fragment is only extended by extensions sorting after the one that
//! created it, and only children with a canonical code word are followed.
//! Otherwise every child is extended without restriction and looked up in a
//! repository of canonical code words, one per seed.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    io::{self, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use bit_set::BitSet;
use tracing::{debug, info, trace};

use crate::{
    canonize::{Canonicity, CodeWord},
    config::{MinerConfig, PerfectPruning, RingMode, SupportKind},
    embedding::Embedding,
    error::{ConfigError, MineError},
    extension::{Extender, ExtensionKey, ExtensionKind},
    fragment::Fragment,
    graph::{Graph, Group, NamedGraph},
    smiles::{Notation, Smiles},
    types::{Atoms, Bonds, Recoder},
};

/// A reported fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Found {
    /// Running number, starting at 1.
    pub id: usize,
    /// The fragment in SMILES, chains written as `*` (which parses back as
    /// a chain node).
    pub description: String,
    pub nodes: usize,
    pub edges: usize,
    /// Support in the focus and the complement group.
    pub support: [usize; 2],
    /// Support as a fraction of the group sizes.
    pub relative: [f64; 2],
    /// Number of embeddings per group.
    pub embeddings: [usize; 2],
}

/// Receives the fragments found by a run.
pub trait FragmentSink {
    fn report(&mut self, found: &Found) -> io::Result<()>;
}

/// Collects fragments in memory.
#[derive(Debug, Default)]
pub struct VecSink {
    pub found: Vec<Found>,
}

impl FragmentSink for VecSink {
    fn report(&mut self, found: &Found) -> io::Result<()> {
        self.found.push(found.clone());
        Ok(())
    }
}

/// Writes fragments as CSV records
/// `id,description,nodes,edges,s_abs,s_rel,c_abs,c_rel`.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(out: W) -> io::Result<Self> {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record([
            "id",
            "description",
            "nodes",
            "edges",
            "s_abs",
            "s_rel",
            "c_abs",
            "c_rel",
        ])?;
        Ok(Self { writer })
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl<W: Write> FragmentSink for CsvSink<W> {
    fn report(&mut self, found: &Found) -> io::Result<()> {
        self.writer.write_record([
            found.id.to_string(),
            found.description.clone(),
            found.nodes.to_string(),
            found.edges.to_string(),
            found.support[0].to_string(),
            format!("{:.4}", found.relative[0]),
            found.support[1].to_string(),
            format!("{:.4}", found.relative[1]),
        ])?;
        Ok(())
    }
}

/// Counters of one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stats {
    /// Child fragments created.
    pub created: usize,
    /// Children below the minimum support.
    pub support_pruned: usize,
    /// Children dropped for a non-canonical code word.
    pub non_canonic: usize,
    /// Siblings skipped because of a perfect extension.
    pub perfect_pruned: usize,
    /// Siblings skipped as equivalent to an earlier one.
    pub equiv_pruned: usize,
    /// Children found in the repository.
    pub repository_hits: usize,
    pub reported: usize,
    /// Frequent fragments not reported because they are not closed.
    pub closed_rejections: usize,
    /// Frequent fragments not reported because of open rings or chains
    /// that do not vary in length.
    pub invalid_rejections: usize,
    pub max_depth: usize,
}

/// Mines the fragments of a graph database.
pub struct Miner {
    config: MinerConfig,
    graphs: Vec<NamedGraph>,
    stop: Arc<AtomicBool>,
}

impl Miner {
    pub fn new(config: MinerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            graphs: Vec::new(),
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    /// Add a host graph; its group follows from `value`, the threshold and
    /// the invert flag.
    pub fn add_graph(&mut self, id: impl Into<String>, value: f64, graph: Graph) {
        let group = Group::from_value(value, self.config.threshold, self.config.invert);
        self.graphs.push(NamedGraph::new(id, value, group, graph));
    }

    /// Add a host graph with its group already assigned.
    pub fn add_named(&mut self, graph: NamedGraph) {
        self.graphs.push(graph);
    }

    pub fn graphs(&self) -> &[NamedGraph] {
        &self.graphs
    }

    /// A flag that stops a running search once set. The search checks it
    /// between search tree nodes.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Mine the fragments and report them to `sink`.
    pub fn run(&mut self, sink: &mut dyn FragmentSink) -> Result<Stats, MineError> {
        self.config.validate()?;
        let mut sizes = [0; 2];
        for g in &self.graphs {
            sizes[g.group.index()] += 1;
        }
        info!(
            "mining {} graphs ({} focus, {} complement)",
            self.graphs.len(),
            sizes[0],
            sizes[1]
        );

        let prepared = Prepared::new(&self.config, &self.graphs, sizes)?;
        let mut search = Search {
            config: &self.config,
            hosts: &prepared.hosts,
            recoder: &prepared.recoder,
            sizes,
            seed: None,
            repository: HashSet::new(),
            sink,
            stop: &self.stop,
            stats: Stats::default(),
            error: None,
        };

        match &prepared.seed {
            Some(seed) => {
                let excluded = BitSet::new();
                let extender = Extender::new(
                    &prepared.hosts,
                    &excluded,
                    self.config.extensions.ring,
                    prepared.chain_atom,
                );
                search.seed = Some(seed);
                search.start(seed.clone(), &extender)?;
            }
            None => {
                let mut excluded = BitSet::new();
                for code in 0..prepared.seeds {
                    if search.stopped() {
                        break;
                    }
                    let extender = Extender::new(
                        &prepared.hosts,
                        &excluded,
                        self.config.extensions.ring,
                        prepared.chain_atom,
                    );
                    let mut seed = Graph::new();
                    seed.add_node(code);
                    search.start(seed, &extender)?;
                    excluded.insert(code as usize);
                }
            }
        }

        let stats = search.stats;
        info!(
            "reported {} fragments ({} created, {} infrequent, {} non-canonic, {} repository hits, {} not closed)",
            stats.reported,
            stats.created,
            stats.support_pruned,
            stats.non_canonic,
            stats.repository_hits,
            stats.closed_rejections
        );
        debug!("{stats:?}");
        Ok(stats)
    }
}

/// Host graphs ready for mining.
struct Prepared {
    hosts: Vec<NamedGraph>,
    recoder: Recoder,
    /// Number of node types usable as seeds (the lowest codes).
    seeds: u32,
    chain_atom: Option<u32>,
    seed: Option<Graph>,
}

impl Prepared {
    fn new(config: &MinerConfig, graphs: &[NamedGraph], sizes: [usize; 2]) -> Result<Self, MineError> {
        let ex_node = config.ex_node_types()?;
        let ex_seed = config.ex_seed_types()?;

        // Exclude, aromatize, mark rings and mask.
        let mut hosts: Vec<NamedGraph> = graphs
            .iter()
            .map(|g| {
                let graph = prepare(&g.graph, config, &ex_node);
                NamedGraph::new(g.id.clone(), g.value, g.group, graph)
            })
            .collect();

        // Count types: graphs containing them, and focus support.
        let per_graph = config.support.kind == SupportKind::Graphs;
        let mut counts: HashMap<u32, (usize, usize)> = HashMap::new();
        for host in &hosts {
            let mut seen = HashSet::new();
            for node in host.graph.nodes() {
                let entry = counts.entry(node.ty()).or_default();
                let first = seen.insert(node.ty());
                if first {
                    entry.0 += 1;
                }
                if host.group == Group::Focus && (first || !per_graph) {
                    entry.1 += 1;
                }
            }
        }
        let min = config.min_support.lower_bound(sizes[0]);
        counts.retain(|_, (_, focus)| *focus >= min);
        debug!("{} frequent node types", counts.len());

        // Trim infrequent types, then mark bridges on what is left.
        for host in &mut hosts {
            host.graph = host.graph.trimmed(|t| counts.contains_key(&t));
            host.graph.mark_bridges();
        }

        let last: Vec<u32> = counts
            .keys()
            .copied()
            .filter(|&t| ex_seed.contains(&(t & Atoms::ELEMENT_MASK)))
            .collect();
        let recoder = Recoder::new(counts.iter().map(|(&t, &(graphs, _))| (t, graphs)), &last);
        for host in &mut hosts {
            host.graph.recode(|t| recoder.encode(t).unwrap_or(t));
        }
        let seeds = (recoder.len() - last.len()) as u32;

        let chain_atom = if config.extensions.chains {
            let carbon = Atoms::CARBON & config.masks.atom;
            recoder.encode(carbon)
        } else {
            None
        };

        let seed = match config.seed_graph()? {
            None => None,
            Some(raw) => {
                let mut graph = prepare(&raw, config, &ex_node).normalized();
                if graph.nodes().iter().any(|n| recoder.encode(n.ty()).is_none()) {
                    info!("seed contains infrequent node types, nothing to mine");
                    graph = Graph::new();
                }
                graph.recode(|t| recoder.encode(t).unwrap_or(t));
                Some(graph)
            }
        };

        Ok(Self {
            hosts,
            recoder,
            seeds,
            chain_atom,
            seed,
        })
    }
}

fn prepare(graph: &Graph, config: &MinerConfig, ex_node: &[u32]) -> Graph {
    let mut graph = if ex_node.is_empty() {
        graph.clone()
    } else {
        graph.trimmed(|t| !ex_node.contains(&(t & Atoms::ELEMENT_MASK)))
    };
    if config.aromatize {
        graph.aromatize();
    }
    if config.max_ring > 0 {
        graph.mark_rings(config.min_ring, config.max_ring);
    }
    graph.mask_types(&config.masks);
    graph
}

struct Search<'a> {
    config: &'a MinerConfig,
    hosts: &'a [NamedGraph],
    recoder: &'a Recoder,
    sizes: [usize; 2],
    seed: Option<&'a Graph>,
    repository: HashSet<CodeWord>,
    sink: &'a mut dyn FragmentSink,
    stop: &'a AtomicBool,
    stats: Stats,
    error: Option<io::Error>,
}

impl Search<'_> {
    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
            || self.error.is_some()
            || self.config.max_output.is_some_and(|n| self.stats.reported >= n)
    }

    fn start(&mut self, seed: Graph, extender: &Extender) -> Result<(), MineError> {
        if seed.node_count() == 0 {
            return Ok(());
        }
        let mut frag = Fragment::seed(seed, self.config.max_embs);
        for (i, host) in self.hosts.iter().enumerate() {
            for (nodes, edges) in host.graph.embed(&frag.graph) {
                frag.add(Embedding::new(i, host.group, nodes, edges));
            }
        }
        frag.pack();
        let support = frag.compute_support(self.config.support, self.hosts);
        debug!(
            "seed {} in {} focus and {} complement graphs",
            self.describe(&frag.graph),
            support[0],
            support[1]
        );
        if support[0] < self.config.min_support.lower_bound(self.sizes[0]) {
            return Ok(());
        }
        self.repository.clear();
        if !self.config.canonical_mode() {
            let word = frag.adapt(self.seed);
            self.repository.insert(word);
        }
        self.grow(&mut frag, extender, 0);
        match self.error.take() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    fn describe(&self, graph: &Graph) -> String {
        let mut decoded = graph.clone();
        decoded.recode(|t| self.recoder.decode(t));
        Smiles.describe(&decoded)
    }

    /// Whether the child clears the closed flag of its base when it has
    /// the same support: single ring edges do not, as the ring they start
    /// may not close everywhere.
    fn closes_base(&self, child: &Fragment) -> bool {
        match child.key() {
            None => false,
            Some(key) => match key.kind {
                ExtensionKind::Chain => false,
                ExtensionKind::Ring => true,
                ExtensionKind::Edge => {
                    !(self.config.extensions.ring.closed_rings()
                        && key.first().is_some_and(|e| e.ty & Bonds::RING != 0))
                }
            },
        }
    }

    fn children(&mut self, frag: &Fragment, extender: &Extender) -> BTreeMap<ExtensionKey, Fragment> {
        let mut children: BTreeMap<ExtensionKey, Fragment> = BTreeMap::new();
        let n = frag.graph.node_count();
        if n >= self.config.max_size {
            return children;
        }
        let anchor = if self.config.canonical_mode() {
            frag.anchor()
        } else {
            None
        };
        let merge = self.config.extensions.ring == RingMode::Merge;
        for emb in frag.embeddings(self.hosts) {
            for ext in extender.children(&frag.graph, &emb, anchor) {
                if n + ext.key.new_nodes(n) > self.config.max_size {
                    continue;
                }
                let cap = if merge && ext.kind() == ExtensionKind::Ring {
                    0
                } else {
                    self.config.max_embs
                };
                children
                    .entry(ext.key.clone())
                    .or_insert_with(|| Fragment::child(frag, &ext.key, cap))
                    .add(ext.embedding);
            }
        }
        if merge {
            Fragment::merge_exts(&mut children, frag, self.config.max_embs);
        }
        for child in children.values_mut() {
            child.pack();
        }
        self.stats.created += children.len();
        children
    }

    /// Find the first perfect extension among the children and drop the
    /// siblings it makes redundant.
    fn prune_perfect(&mut self, frag: &Fragment, children: &mut BTreeMap<ExtensionKey, Fragment>) {
        let chain_starts: Vec<_> = children
            .keys()
            .filter(|k| k.kind == ExtensionKind::Chain)
            .filter_map(|k| k.first().copied())
            .collect();
        let mut perfect = None;
        for (key, child) in children.iter_mut() {
            let Some(entry) = key.first() else {
                continue;
            };
            let chain_start = chain_starts.iter().any(|c| {
                c.src == entry.src
                    && c.ty == entry.ty
                    && c.dst == entry.dst
                    && c.dst_ty == entry.dst_ty | Atoms::CHAIN
            });
            if child.is_perfect(frag, chain_start, self.hosts) {
                perfect = Some(key.clone());
                break;
            }
        }
        let Some(perfect) = perfect else {
            return;
        };
        let before = children.len();
        match self.config.perfect_pruning {
            PerfectPruning::None => (),
            PerfectPruning::Partial => {
                children.retain(|key, _| *key <= perfect);
            }
            PerfectPruning::Full => {
                children.retain(|key, _| *key == perfect);
                if let Some(child) = children.get_mut(&perfect) {
                    child.revert();
                }
            }
        }
        self.stats.perfect_pruned += before - children.len();
    }

    fn report(&mut self, frag: &Fragment, extender: &Extender) {
        let config = self.config;
        if frag.graph.node_count() < config.min_size {
            return;
        }
        let support = frag.support();
        if support[1] > config.max_support.upper_bound(self.sizes[1]) {
            return;
        }
        let rings = config.extensions.ring;
        let open = rings.closed_rings() && frag.has_open_rings(config.min_ring, config.max_ring);
        if !frag.has(Fragment::VALID) || open || (frag.has_chains() && !frag.chains_valid(self.hosts)) {
            self.stats.invalid_rejections += 1;
            return;
        }
        if config.closed_only && !(frag.has(Fragment::CLOSED) && frag.is_closed(extender, self.hosts)) {
            self.stats.closed_rejections += 1;
            return;
        }

        self.stats.reported += 1;
        let supp = frag.supp();
        let relative = |g: usize| {
            if self.sizes[g] == 0 {
                0.0
            } else {
                support[g] as f64 / self.sizes[g] as f64
            }
        };
        let found = Found {
            id: self.stats.reported,
            description: self.describe(&frag.graph),
            nodes: frag.graph.node_count(),
            edges: frag.graph.edge_count(),
            support,
            relative: [relative(0), relative(1)],
            embeddings: [supp[2], supp[3]],
        };
        trace!("{} {:?}", found.description, found.support);
        if let Err(err) = self.sink.report(&found) {
            self.error = Some(err);
        }
    }

    fn grow(&mut self, frag: &mut Fragment, extender: &Extender, depth: usize) {
        if self.stopped() {
            return;
        }
        self.stats.max_depth = self.stats.max_depth.max(depth);
        let config = self.config;

        let mut children = self.children(frag, extender);
        for child in children.values() {
            if child.supp()[..2] == frag.supp()[..2] && self.closes_base(child) {
                frag.clear(Fragment::CLOSED);
            }
        }
        let min = config.min_support.lower_bound(self.sizes[0]);
        let before = children.len();
        children.retain(|_, child| child.compute_support(config.support, self.hosts)[0] >= min);
        self.stats.support_pruned += before - children.len();

        self.report(frag, extender);
        if self.stopped() {
            return;
        }

        if config.prunes_perfect() {
            self.prune_perfect(frag, &mut children);
        }
        if config.unembed_siblings {
            for child in children.values_mut() {
                child.unembed();
            }
        }

        let mut signatures = HashSet::new();
        for (_, mut child) in children {
            if self.stopped() {
                return;
            }
            child.reembed(frag, self.hosts);
            let signature = if config.equiv_pruning {
                child.signature(self.hosts)
            } else {
                None
            };
            if signature.as_ref().is_some_and(|s| signatures.contains(s)) {
                self.stats.equiv_pruned += 1;
                continue;
            }
            if config.canonical_mode() {
                if child.is_canonic(false, self.seed) != Canonicity::Canonic {
                    self.stats.non_canonic += 1;
                    continue;
                }
            } else {
                let word = child.adapt(self.seed);
                if !self.repository.insert(word) {
                    self.stats.repository_hits += 1;
                    continue;
                }
            }
            if config.prunes_unclosable() && child.has_unclosable_rings() {
                continue;
            }
            if let Some(signature) = signature {
                signatures.insert(signature);
            }
            self.grow(&mut child, extender, depth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Threshold;

    fn miner(config: MinerConfig, data: &[(&str, f64)]) -> Miner {
        let mut miner = Miner::new(config).unwrap();
        for (i, (smiles, value)) in data.iter().enumerate() {
            miner.add_graph(i.to_string(), *value, Smiles.parse(smiles).unwrap());
        }
        miner
    }

    fn found(miner: &mut Miner) -> Vec<(String, [usize; 2])> {
        let mut sink = VecSink::default();
        miner.run(&mut sink).unwrap();
        sink.found
            .into_iter()
            .map(|f| (f.description, f.support))
            .collect()
    }

    #[test]
    fn ethanol_and_ethylamine() {
        let config = MinerConfig {
            min_support: Threshold::Absolute(1),
            max_support: Threshold::Relative(1.0),
            ..Default::default()
        };
        let mut miner = miner(config, &[("CCO", 1.0), ("CCN", 0.0)]);
        let found = found(&mut miner);
        // oxygen is the rarer type, so its seed comes first
        assert_eq!(found, vec![("OCC".to_string(), [1, 0]), ("CC".to_string(), [1, 1])]);
    }

    #[test]
    fn output_cap_and_stop_flag() {
        let config = MinerConfig {
            min_support: Threshold::Absolute(1),
            max_support: Threshold::Relative(1.0),
            closed_only: false,
            max_output: Some(2),
            ..Default::default()
        };
        let mut miner = miner(config, &[("CCOCN", 1.0)]);
        assert_eq!(found(&mut miner).len(), 2);

        miner.stop_handle().store(true, Ordering::Relaxed);
        let mut sink = VecSink::default();
        let stats = miner.run(&mut sink).unwrap();
        assert!(sink.found.is_empty());
        assert_eq!(stats.reported, 0);
    }

    #[test]
    fn complement_support_limits_output() {
        let config = MinerConfig {
            min_support: Threshold::Absolute(1),
            max_support: Threshold::Absolute(0),
            ..Default::default()
        };
        let mut miner = miner(config, &[("CCO", 1.0), ("CCN", 0.0)]);
        assert_eq!(found(&mut miner), vec![("OCC".to_string(), [1, 0])]);
    }

    #[test]
    fn csv_report() {
        let config = MinerConfig {
            min_support: Threshold::Absolute(1),
            max_support: Threshold::Relative(1.0),
            ..Default::default()
        };
        let mut miner = miner(config, &[("CCO", 1.0), ("CCN", 0.0)]);
        let mut out = Vec::new();
        {
            let mut sink = CsvSink::new(&mut out).unwrap();
            miner.run(&mut sink).unwrap();
            sink.flush().unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("id,description,nodes,edges,s_abs,s_rel,c_abs,c_rel"));
        assert_eq!(lines.next(), Some("1,OCC,3,2,1,1.0000,0,0.0000"));
        assert_eq!(lines.next(), Some("2,CC,2,1,1,1.0000,1,1.0000"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn seed_restricts_fragments() {
        let config = MinerConfig {
            min_support: Threshold::Absolute(2),
            max_support: Threshold::Relative(1.0),
            closed_only: false,
            seed: Some("CO".into()),
            ..Default::default()
        };
        let mut miner = miner(config, &[("CCO", 1.0), ("OCCO", 1.0), ("CC", 1.0)]);
        let mut sink = VecSink::default();
        miner.run(&mut sink).unwrap();
        assert!(sink.found.iter().all(|f| f.description.contains('O')));
        assert!(sink.found.iter().any(|f| f.nodes == 2 && f.support == [2, 0]));
        assert!(sink.found.iter().any(|f| f.nodes == 3 && f.support == [2, 0]));
        assert!(sink.found.iter().all(|f| f.nodes <= 3));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = MinerConfig {
            min_size: 4,
            max_size: 3,
            ..Default::default()
        };
        assert!(Miner::new(config).is_err());
    }
}
