//! Reading molecule databases.
//!
//! The input has one molecule per line: `id,value,smiles`. Blank lines and
//! lines starting with `#` are ignored. Lines with the wrong number of
//! fields, a value that is not a number or a description that does not
//! parse are skipped and counted; a file that cannot be read at all is an
//! error.

use std::{fs::File, io::Read, path::Path};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info};

use crate::{error::LoadError, graph::Graph, smiles::Notation};

/// One molecule of the input.
#[derive(Debug, Clone)]
pub struct Record {
    pub id: String,
    pub value: f64,
    pub graph: Graph,
}

#[derive(Debug, Default)]
pub struct Loaded {
    /// The molecules, in input order.
    pub records: Vec<Record>,
    /// Number of malformed lines.
    pub skipped: usize,
}

/// Read a database from `input`, parsing descriptions with `notation`.
pub fn read(input: impl Read, notation: &(impl Notation + Sync)) -> Result<Loaded, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);
    let mut lines = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        lines.push((line, record));
    }

    let parsed: Vec<Result<Record, String>> = lines
        .par_iter()
        .map(|(line, fields)| {
            if fields.len() != 3 {
                return Err(format!("line {line}: expected 3 fields, found {}", fields.len()));
            }
            let value: f64 = fields[1]
                .parse()
                .map_err(|_| format!("line {line}: invalid value '{}'", &fields[1]))?;
            let graph = notation
                .parse(&fields[2])
                .map_err(|err| format!("line {line}: {err}"))?;
            Ok(Record {
                id: fields[0].to_string(),
                value,
                graph,
            })
        })
        .collect();

    let mut loaded = Loaded::default();
    for result in parsed {
        match result {
            Ok(record) => loaded.records.push(record),
            Err(reason) => {
                debug!("skipping {reason}");
                loaded.skipped += 1;
            }
        }
    }
    info!(
        "loaded {} molecules ({} lines skipped)",
        loaded.records.len(),
        loaded.skipped
    );
    Ok(loaded)
}

/// Read a database file.
pub fn load(path: &Path, notation: &(impl Notation + Sync)) -> Result<Loaded, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read(file, notation)
}
