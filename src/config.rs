//! Mining parameters.
//!
//! A [`MinerConfig`] collects every option of a mining run: support
//! thresholds, fragment size bounds, ring sizes, type masks, the kinds of
//! extensions to generate and the pruning strategies to apply. It is plain
//! data with a [`Default`] impl; [`MinerConfig::validate`] checks it before
//! any mining work starts.

use clap::ValueEnum;

use crate::{
    error::ConfigError,
    graph::Graph,
    smiles::{Notation, Smiles},
    types::{Atoms, Bonds, TypeMgr},
};

/// A support threshold, relative to the size of a group or absolute.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Threshold {
    Relative(f64),
    Absolute(usize),
}

const EPSILON: f64 = 1e-12;

impl Threshold {
    /// The smallest acceptable support in a group of `size` graphs (at
    /// least 1).
    pub fn lower_bound(self, size: usize) -> usize {
        match self {
            Threshold::Relative(f) => ((f * size as f64 - EPSILON).ceil().max(0.0) as usize).max(1),
            Threshold::Absolute(n) => n.max(1),
        }
    }

    /// The largest acceptable support in a group of `size` graphs.
    pub fn upper_bound(self, size: usize) -> usize {
        match self {
            Threshold::Relative(f) => (f * size as f64 + EPSILON).floor().max(0.0) as usize,
            Threshold::Absolute(n) => n,
        }
    }

    fn check(self, allow_zero: bool) -> Result<(), ConfigError> {
        match self {
            Threshold::Relative(f) if !(0.0..=1.0).contains(&f) => {
                Err(ConfigError::SupportOutOfRange(f))
            }
            Threshold::Absolute(0) if !allow_zero => Err(ConfigError::ZeroSupport),
            _ => Ok(()),
        }
    }
}

/// How rings enter the search.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default, ValueEnum)]
pub enum RingMode {
    /// Ring edges are ordinary edges.
    #[default]
    None,
    /// Rings are added as a whole; fragments never contain half rings.
    Full,
    /// Ring extensions are merged into single-edge extensions by their
    /// first edge; only fragments with closed rings are reported.
    Merge,
    /// Edges are added one at a time; only fragments with closed rings are
    /// reported.
    Filter,
}

impl RingMode {
    /// Whether ring extensions are generated.
    pub fn extends_rings(self) -> bool {
        matches!(self, RingMode::Full | RingMode::Merge)
    }

    /// Whether fragments with open rings are kept out of the output.
    pub fn closed_rings(self) -> bool {
        matches!(self, RingMode::Merge | RingMode::Filter)
    }
}

/// The extension kinds to generate besides single edges.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ExtensionKinds {
    pub ring: RingMode,
    /// Variable-length carbon chains.
    pub chains: bool,
}

/// Perfect-extension pruning strategy.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default, ValueEnum)]
pub enum PerfectPruning {
    None,
    /// Skip the siblings following a perfect extension.
    Partial,
    /// Follow only the perfect extension.
    #[default]
    Full,
}

/// How the support of a fragment is counted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default, ValueEnum)]
pub enum SupportKind {
    /// Number of graphs containing the fragment.
    #[default]
    Graphs,
    /// Minimum number of distinct images of a fragment node.
    MinImage,
    /// Maximum independent set of the embedding overlap graph.
    MisOverlap,
    /// Maximum independent set of the harmful overlap graph.
    MisHarmful,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct SupportType {
    pub kind: SupportKind,
    /// Compute independent sets exactly instead of greedily.
    pub exact: bool,
}

/// How aromatic bonds are treated when matching bond types.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum AromaticBonds {
    /// Aromatic bonds match only aromatic bonds.
    Keep,
    /// Aromatic bonds match double bonds.
    Upgrade,
    /// Aromatic bonds match single bonds.
    Downgrade,
}

/// Masks applied to node and edge types before mining. Ring atoms (atoms
/// with an incident ring bond) and ring bonds use the ring masks.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TypeMasks {
    pub atom: u32,
    pub bond: u32,
    pub ring_atom: u32,
    pub ring_bond: u32,
}

impl Default for TypeMasks {
    fn default() -> Self {
        Self {
            atom: Atoms::ELEMENT_MASK,
            bond: Bonds::BOND_MASK,
            ring_atom: Atoms::ELEMENT_MASK,
            ring_bond: Bonds::BOND_MASK,
        }
    }
}

impl TypeMasks {
    /// Ignore atom types, everywhere or in rings only.
    pub fn ignore_atoms(mut self, rings_only: bool) -> Self {
        if !rings_only {
            self.atom = 0;
        }
        self.ring_atom = 0;
        self
    }

    pub fn match_charge(mut self) -> Self {
        self.atom |= Atoms::CHARGE_MASK;
        self.ring_atom |= Atoms::CHARGE_MASK;
        self
    }

    pub fn match_aromaticity(mut self) -> Self {
        self.atom |= Atoms::AROMATIC;
        self.ring_atom |= Atoms::AROMATIC;
        self
    }

    pub fn aromatic_bonds(mut self, mode: AromaticBonds) -> Self {
        let mask = match mode {
            AromaticBonds::Keep => return self,
            AromaticBonds::Upgrade => Bonds::UPGRADE,
            AromaticBonds::Downgrade => Bonds::DOWNGRADE,
        };
        self.bond &= mask;
        self.ring_bond &= mask;
        self
    }

    /// Ignore bond types, everywhere or in rings only.
    pub fn ignore_bonds(mut self, rings_only: bool) -> Self {
        if !rings_only {
            self.bond &= Bonds::SAME_TYPE;
        }
        self.ring_bond &= Bonds::SAME_TYPE;
        self
    }
}

/// All parameters of a mining run.
#[derive(Debug, Clone, PartialEq)]
pub struct MinerConfig {
    /// Minimum support in the focus group.
    pub min_support: Threshold,
    /// Maximum support in the complement group.
    pub max_support: Threshold,
    /// Discriminant value splitting focus from complement graphs.
    pub threshold: f64,
    /// Graphs with a value at most `threshold` form the focus group.
    pub invert: bool,
    /// Minimum fragment size (nodes) for a fragment to be reported.
    pub min_size: usize,
    /// Maximum fragment size (nodes).
    pub max_size: usize,
    pub min_ring: usize,
    /// Maximum ring size; 0 disables ring marking.
    pub max_ring: usize,
    /// Node types removed from the graphs before mining.
    pub ex_node: Vec<String>,
    /// Node types never used as seeds.
    pub ex_seed: Vec<String>,
    /// Substructure every fragment has to contain, in SMILES.
    pub seed: Option<String>,
    pub masks: TypeMasks,
    pub extensions: ExtensionKinds,
    pub canonic_pruning: bool,
    pub perfect_pruning: PerfectPruning,
    pub equiv_pruning: bool,
    pub unclosable_pruning: bool,
    /// Report closed fragments only.
    pub closed_only: bool,
    /// Convert Kekulé six-rings to aromatic rings before mining.
    pub aromatize: bool,
    /// Drop the embeddings of siblings until they are processed.
    pub unembed_siblings: bool,
    pub support: SupportType,
    /// Embeddings per graph kept before a fragment packs them; 0 keeps all.
    pub max_embs: usize,
    /// Stop after this many reported fragments.
    pub max_output: Option<usize>,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            min_support: Threshold::Relative(0.1),
            max_support: Threshold::Relative(0.02),
            threshold: 0.5,
            invert: false,
            min_size: 1,
            max_size: usize::MAX,
            min_ring: 0,
            max_ring: 0,
            ex_node: vec!["H".to_string()],
            ex_seed: Vec::new(),
            seed: None,
            masks: TypeMasks::default(),
            extensions: ExtensionKinds::default(),
            canonic_pruning: true,
            perfect_pruning: PerfectPruning::Full,
            equiv_pruning: false,
            unclosable_pruning: true,
            closed_only: true,
            aromatize: false,
            unembed_siblings: false,
            support: SupportType::default(),
            max_embs: 0,
            max_output: None,
        }
    }
}

impl MinerConfig {
    /// Check the parameters for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.min_support.check(false)?;
        self.max_support.check(true)?;
        if self.min_size > self.max_size {
            return Err(ConfigError::SizeRange {
                min: self.min_size,
                max: self.max_size,
            });
        }
        if self.max_ring > 0
            && (self.min_ring < 3 || self.min_ring > self.max_ring || self.max_ring > 63)
        {
            return Err(ConfigError::RingRange {
                min: self.min_ring,
                max: self.max_ring,
            });
        }
        if self.extensions.ring != RingMode::None && self.max_ring == 0 {
            return Err(ConfigError::RingsDisabled);
        }
        self.ex_node_types()?;
        self.ex_seed_types()?;
        self.seed_graph()?;
        Ok(())
    }

    fn resolve(names: &[String]) -> Result<Vec<u32>, ConfigError> {
        names
            .iter()
            .map(|name| {
                Atoms
                    .code(name)
                    .ok_or_else(|| ConfigError::UnknownType(name.clone()))
            })
            .collect()
    }

    /// Element codes of the excluded node types.
    pub fn ex_node_types(&self) -> Result<Vec<u32>, ConfigError> {
        Self::resolve(&self.ex_node)
    }

    /// Element codes of the types excluded as seeds.
    pub fn ex_seed_types(&self) -> Result<Vec<u32>, ConfigError> {
        Self::resolve(&self.ex_seed)
    }

    /// The parsed seed structure, if any.
    pub fn seed_graph(&self) -> Result<Option<Graph>, ConfigError> {
        match &self.seed {
            None => Ok(None),
            Some(text) => Ok(Some(Smiles.parse(text)?)),
        }
    }

    /// Whether duplicates are avoided by restricted extensions and code
    /// word checks. Otherwise every fragment is looked up in a repository
    /// of canonical code words. Whole rings and chains add several code
    /// word entries at once, which need not be the last ones of the
    /// canonical word, so they always use the repository.
    pub fn canonical_mode(&self) -> bool {
        self.canonic_pruning
            && self.extensions.ring != RingMode::Full
            && !self.extensions.chains
            && self.perfect_pruning != PerfectPruning::Full
    }

    /// Whether perfect extensions prune the search at all.
    pub fn prunes_perfect(&self) -> bool {
        self.closed_only
            && self.perfect_pruning != PerfectPruning::None
            && self.support.kind == SupportKind::Graphs
    }

    /// Whether fragments with unclosable rings are pruned.
    pub fn prunes_unclosable(&self) -> bool {
        self.unclosable_pruning && self.extensions.ring.closed_rings() && self.canonical_mode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = MinerConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert!(!config.canonical_mode());
        assert!(config.prunes_perfect());
    }

    #[test]
    fn thresholds() {
        assert_eq!(Threshold::Relative(0.1).lower_bound(25), 3);
        assert_eq!(Threshold::Relative(0.5).lower_bound(4), 2);
        assert_eq!(Threshold::Relative(0.0).lower_bound(4), 1);
        assert_eq!(Threshold::Relative(0.02).upper_bound(100), 2);
        assert_eq!(Threshold::Relative(1.0).upper_bound(3), 3);
        assert_eq!(Threshold::Absolute(7).upper_bound(3), 7);
    }

    #[test]
    fn rejects_bad_parameters() {
        let config = MinerConfig {
            min_support: Threshold::Relative(1.5),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::SupportOutOfRange(1.5)));

        let config = MinerConfig {
            min_support: Threshold::Absolute(0),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroSupport));

        let config = MinerConfig {
            min_size: 5,
            max_size: 2,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::SizeRange { .. })));

        let config = MinerConfig {
            extensions: ExtensionKinds {
                ring: RingMode::Merge,
                chains: false,
            },
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::RingsDisabled));

        let config = MinerConfig {
            min_ring: 7,
            max_ring: 5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::RingRange { .. })));

        let config = MinerConfig {
            ex_node: vec!["Xx".into()],
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::UnknownType("Xx".into())));

        let config = MinerConfig {
            seed: Some("C(".into()),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Seed(_))));
    }

    #[test]
    fn mask_helpers() {
        let masks = TypeMasks::default().match_charge().ignore_bonds(true);
        assert_eq!(masks.atom & Atoms::CHARGE_MASK, Atoms::CHARGE_MASK);
        assert_eq!(Bonds::DOUBLE & masks.ring_bond, Bonds::SINGLE & masks.ring_bond);
        assert_ne!(Bonds::DOUBLE & masks.bond, Bonds::SINGLE & masks.bond);
        let masks = TypeMasks::default().aromatic_bonds(AromaticBonds::Downgrade);
        assert_eq!(Bonds::AROMATIC & masks.bond, Bonds::SINGLE);
        assert_eq!(TypeMasks::default().ignore_atoms(false).atom, 0);
    }

    #[test]
    fn search_modes() {
        let mut config = MinerConfig {
            perfect_pruning: PerfectPruning::Partial,
            ..Default::default()
        };
        assert!(config.canonical_mode());
        config.extensions.ring = RingMode::Full;
        assert!(!config.canonical_mode());
        config.extensions.ring = RingMode::Filter;
        assert!(config.prunes_unclosable());
        config.extensions.chains = true;
        assert!(!config.canonical_mode());
    }
}
