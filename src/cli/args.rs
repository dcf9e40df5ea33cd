//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Talent tree manager: enumerate every valid point allocation of talent trees
#[derive(Parser, Debug)]
#[command(name = "ttm")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub debug: u8,

    /// Directory holding .ttm.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Solve every tree of a structure file
    Solve {
        /// One tree string per line
        #[arg(long, value_hint = ValueHint::FilePath)]
        structure_file: PathBuf,

        /// One filter line per tree, paired by line order
        #[arg(long, value_hint = ValueHint::FilePath)]
        filter_file: Option<PathBuf>,

        /// Write accepted masks here, one per line, blank line between trees
        #[arg(long, value_hint = ValueHint::FilePath)]
        output_file: Option<PathBuf>,

        /// Points to spend
        #[arg(long)]
        target_talent_count: u32,

        /// Solve seeds and trees in parallel
        #[arg(long, conflicts_with = "sequential")]
        parallel: bool,

        /// Solve on the current thread only
        #[arg(long)]
        sequential: bool,

        /// Enumerate every point count from 1 up to the target
        #[arg(long)]
        all_counts: bool,

        /// Visit ceiling per seed
        #[arg(long)]
        max_visits: Option<u64>,

        /// Write skillset lines instead of masks
        #[arg(long)]
        skillsets: bool,
    },

    /// Validate every tree of a structure file
    Check {
        /// One tree string per line
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Render trees of a structure file
    Show {
        /// One tree string per line
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,

        /// Show the single-point expansion
        #[arg(long)]
        expanded: bool,
    },

    /// Reconstruct the skillset of a mask for the first tree of a file
    Decode {
        /// One tree string per line
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,

        /// Mask as printed by `solve`
        #[arg(long)]
        mask: u64,

        /// Filter file whose first line selects switch variants
        #[arg(long, value_hint = ValueHint::FilePath)]
        filter_file: Option<PathBuf>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective settings
    Show,
    /// Write a commented config template
    Init {
        /// Create the global config instead of the local .ttm.toml
        #[arg(short, long)]
        global: bool,
    },
    /// Print the global config path
    Path,
}
