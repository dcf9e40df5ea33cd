//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent structural violations of talent trees,
/// filters and solver limits. They are independent of I/O concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("malformed tree string in record {record}: {message}")]
    Parse { record: usize, message: String },

    #[error("talent tree contains a cycle")]
    CycleDetected,

    #[error("tree expands to {count} talents, at most {limit} can be solved")]
    TooManyTalents { count: usize, limit: usize },

    #[error("talent {child} is listed as child of {parent} but does not list it as parent")]
    InconsistentLinks { parent: i32, child: i32 },

    #[error("expanded talent key {key} of talent {index} collides with an existing talent")]
    KeyCollision { key: i64, index: i32 },

    #[error("unknown talent index: {0}")]
    UnknownTalent(i32),

    #[error("invalid filter: {message}")]
    InvalidFilter { message: String },

    #[error("invalid skillset: {message}")]
    InvalidSkillset { message: String },

    #[error("preset trees are not available: {0}")]
    PresetUnavailable(String),
}

impl DomainError {
    pub(crate) fn parse(record: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            record,
            message: message.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
