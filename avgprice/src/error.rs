use std::path::PathBuf;

use thiserror::Error;

use crate::core::{aggregate::IntegrityError, key::CompositeKey, record::ParseError};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("input file {path:?} not found")]
    InputNotFound { path: PathBuf },

    #[error("couldn't read input file {path:?}: {source}")]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record on line {line} (chunk #{chunk}): {source}")]
    MalformedRecord {
        line: usize,
        chunk: usize,
        #[source]
        source: ParseError,
    },

    #[error("worker for chunk #{chunk} failed: {reason}")]
    WorkerFailure { chunk: usize, reason: String },

    #[error("aggregate for {key} is inconsistent: {source}")]
    IntegrityViolation {
        key: CompositeKey,
        #[source]
        source: IntegrityError,
    },

    #[error("couldn't write output file {path:?}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("couldn't encode output row: {0}")]
    Csv(#[from] csv::Error),

    #[error("bad config file {path:?}: {reason}")]
    Config { path: PathBuf, reason: String },
}
