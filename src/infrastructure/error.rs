//! Infrastructure-level errors (wraps application errors)

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::application::ApplicationError;

#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    /// Needed to locate `.ttm.toml` when no `--config-dir` is given.
    #[error("cannot resolve the working directory")]
    WorkingDirectory(#[source] io::Error),

    #[error("config already exists: {0}")]
    ConfigExists(PathBuf),

    #[error("cannot write config template to {path}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type InfraResult<T> = Result<T, InfraError>;
