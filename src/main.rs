use std::{io, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser};
use fragment_miner::{
    config::{
        AromaticBonds, ExtensionKinds, MinerConfig, PerfectPruning, RingMode, SupportKind,
        SupportType, Threshold, TypeMasks,
    },
    loader,
    miner::{CsvSink, Miner},
    smiles::Smiles,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input file with lines `id,value,smiles`
    path: PathBuf,

    /// Minimum support in the focus group (a fraction, or an absolute count
    /// with --absolute)
    #[arg(short = 's', long, default_value_t = 0.1)]
    min_support: f64,

    /// Maximum support in the complement group
    #[arg(short = 'S', long, default_value_t = 0.02)]
    max_support: f64,

    /// Read the support thresholds as numbers of graphs
    #[arg(long)]
    absolute: bool,

    /// Graphs with a value above the threshold form the focus group
    #[arg(short, long, default_value_t = 0.5)]
    threshold: f64,

    /// Graphs with a value up to the threshold form the focus group
    #[arg(short, long)]
    invert: bool,

    /// Minimum fragment size (nodes) to report
    #[arg(short = 'm', long, default_value_t = 1)]
    min_size: usize,

    /// Maximum fragment size (nodes)
    #[arg(short = 'n', long)]
    max_size: Option<usize>,

    /// Node types to remove before mining
    #[arg(short = 'x', long, value_delimiter = ',', default_value = "H")]
    ex_node: Vec<String>,

    /// Node types never used as seeds
    #[arg(short = 'y', long, value_delimiter = ',')]
    ex_seed: Vec<String>,

    /// Substructure (SMILES) all fragments contain
    #[arg(short = 'j', long)]
    seed: Option<String>,

    #[command(flatten)]
    search: SearchArgs,

    #[command(flatten)]
    types: TypeArgs,

    /// Stop after this many fragments
    #[arg(long)]
    max_output: Option<usize>,

    /// More log output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// How rings enter the search
    #[arg(long, value_enum, default_value_t = RingMode::None)]
    rings: RingMode,

    /// Smallest ring size to mark
    #[arg(long, default_value_t = 0)]
    min_ring: usize,

    /// Largest ring size to mark (0 for no rings)
    #[arg(long, default_value_t = 0)]
    max_ring: usize,

    /// Add variable-length carbon chains
    #[arg(long)]
    chains: bool,

    /// Perfect extension pruning
    #[arg(long, value_enum, default_value_t = PerfectPruning::Full)]
    perfect: PerfectPruning,

    /// Detect duplicates through a repository only
    #[arg(long)]
    no_canonic: bool,

    /// Skip siblings equivalent to an earlier one
    #[arg(long)]
    equiv: bool,

    /// Keep fragments with rings that cannot be closed any more
    #[arg(long)]
    no_unclosable: bool,

    /// Report all frequent fragments, not only closed ones
    #[arg(long)]
    all: bool,

    /// Support measure
    #[arg(long, value_enum, default_value_t = SupportKind::Graphs)]
    support: SupportKind,

    /// Compute independent sets exactly
    #[arg(long)]
    exact: bool,

    /// Embeddings per graph before they are packed (0 for no limit)
    #[arg(long, default_value_t = 0)]
    max_embs: usize,

    /// Drop sibling embeddings until the sibling is processed
    #[arg(long)]
    unembed: bool,
}

#[derive(Args, Debug)]
struct TypeArgs {
    /// Convert Kekulé six-rings to aromatic rings
    #[arg(short, long)]
    aromatize: bool,

    /// Ignore atom types (everywhere, or in rings with --rings-only)
    #[arg(long)]
    ignore_atoms: bool,

    /// Ignore bond types (everywhere, or in rings with --rings-only)
    #[arg(long)]
    ignore_bonds: bool,

    /// Restrict --ignore-atoms and --ignore-bonds to rings
    #[arg(long)]
    rings_only: bool,

    /// Match formal charges
    #[arg(long)]
    charge: bool,

    /// Match atom aromaticity
    #[arg(long)]
    aromaticity: bool,

    /// Treatment of aromatic bonds
    #[arg(long, value_enum, default_value_t = AromaticBonds::Keep)]
    aromatic_bonds: AromaticBonds,
}

impl Cli {
    fn config(&self) -> MinerConfig {
        let threshold = |v: f64| {
            if self.absolute {
                Threshold::Absolute(v as usize)
            } else {
                Threshold::Relative(v)
            }
        };

        let mut masks = TypeMasks::default().aromatic_bonds(self.types.aromatic_bonds);
        if self.types.charge {
            masks = masks.match_charge();
        }
        if self.types.aromaticity {
            masks = masks.match_aromaticity();
        }
        if self.types.ignore_atoms {
            masks = masks.ignore_atoms(self.types.rings_only);
        }
        if self.types.ignore_bonds {
            masks = masks.ignore_bonds(self.types.rings_only);
        }

        MinerConfig {
            min_support: threshold(self.min_support),
            max_support: threshold(self.max_support),
            threshold: self.threshold,
            invert: self.invert,
            min_size: self.min_size,
            max_size: self.max_size.unwrap_or(usize::MAX),
            min_ring: self.search.min_ring,
            max_ring: self.search.max_ring,
            ex_node: self.ex_node.clone(),
            ex_seed: self.ex_seed.clone(),
            seed: self.seed.clone(),
            masks,
            extensions: ExtensionKinds {
                ring: self.search.rings,
                chains: self.search.chains,
            },
            canonic_pruning: !self.search.no_canonic,
            perfect_pruning: self.search.perfect,
            equiv_pruning: self.search.equiv,
            unclosable_pruning: !self.search.no_unclosable,
            closed_only: !self.search.all,
            aromatize: self.types.aromatize,
            unembed_siblings: self.search.unembed,
            support: SupportType {
                kind: self.search.support,
                exact: self.search.exact,
            },
            max_embs: self.search.max_embs,
            max_output: self.max_output,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut miner = Miner::new(cli.config()).context("Invalid mining parameters")?;
    let loaded = loader::load(&cli.path, &Smiles)
        .with_context(|| format!("Failed to load {:?}", cli.path))?;
    for record in loaded.records {
        miner.add_graph(record.id, record.value, record.graph);
    }

    let stdout = io::stdout();
    let mut sink = CsvSink::new(stdout.lock()).context("Failed to write report")?;
    miner.run(&mut sink).context("Mining failed")?;
    sink.flush().context("Failed to write report")?;
    Ok(())
}
