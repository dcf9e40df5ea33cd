//! Application-level errors (wraps domain errors)

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::DomainError;

/// The two kinds of line-oriented input a batch reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFile {
    Structure,
    Filter,
}

impl fmt::Display for InputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFile::Structure => f.write_str("structure file"),
            InputFile::Filter => f.write_str("filter file"),
        }
    }
}

/// Application errors wrap domain errors and add batch-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("no talent tree found in {0}")]
    NoTrees(PathBuf),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("cannot read {input} {path}")]
    ReadInput {
        input: InputFile,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write results to {path}")]
    WriteResults {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
