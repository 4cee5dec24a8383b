//! Error taxonomy for the reconstruction core
//!
//! Empty or missing hit tables are not errors: every stage treats them as "no hits".
//! Contig double-assignment is not represented here either, because `ClusterMap::claim`
//! makes it impossible to express.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// A row that cannot be interpreted, most often a subject id without the `|` delimiter
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("cluster '{0}' is referenced but does not exist")]
    MissingCluster(String),

    #[error("contig '{0}' is referenced but not present in the assembly")]
    UnknownContig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReconError>;
