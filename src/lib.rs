//! Talent tree manager core.
//!
//! Parses talent trees from their text form, expands multi-point talents
//! into single-point chains, compiles the result into a bit-indexed DAG and
//! enumerates every valid allocation of a point budget.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
