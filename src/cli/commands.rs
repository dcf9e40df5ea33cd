//! Command dispatch
//!
//! Each handler returns the process exit code; errors bubble up as
//! [`CliError`] and are mapped to exit codes by the caller.

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::services::{SolveRequest, SolvedTree};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{expand, SearchMode, TreeNodeConvert};
use crate::exitcode;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::FileSystem;
use crate::infrastructure::{InfraError, InfraResult};

pub fn execute_command(cli: &Cli) -> CliResult<i32> {
    let Some(command) = &cli.command else {
        return Ok(exitcode::OK);
    };
    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(exitcode::OK);
    }

    let settings = Settings::load(cli.config_dir.as_deref())?;
    debug!("settings: {:?}", settings);
    let container = ServiceContainer::new(settings);

    match command {
        Commands::Solve {
            structure_file,
            filter_file,
            output_file,
            target_talent_count,
            parallel,
            sequential,
            all_counts,
            max_visits,
            skillsets,
        } => {
            if *target_talent_count == 0 {
                return Err(CliError::InvalidArgs(
                    "--target-talent-count must be at least 1".to_string(),
                ));
            }
            require_file(&container, structure_file)?;
            if let Some(filter_file) = filter_file {
                require_file(&container, filter_file)?;
            }
            let mut request =
                SolveRequest::from_settings(structure_file.clone(), *target_talent_count, &container.settings);
            request.filter_file = filter_file.clone();
            request.output_file = output_file.clone();
            if *parallel {
                request.options.parallel = true;
            }
            if *sequential {
                request.options.parallel = false;
            }
            if *all_counts {
                request.options.mode = SearchMode::All;
            }
            if let Some(max_visits) = max_visits {
                request.options.max_visits = *max_visits;
            }
            request.print_skillsets |= *skillsets;
            cmd_solve(&container, &request)
        }
        Commands::Check { file } => cmd_check(&container, file),
        Commands::Show { file, expanded } => cmd_show(&container, file, *expanded),
        Commands::Decode {
            file,
            mask,
            filter_file,
        } => cmd_decode(&container, file, *mask, filter_file.as_deref()),
        Commands::Config { command } => cmd_config(&container, command, cli.config_dir.as_deref()),
        Commands::Completion { .. } => Ok(exitcode::OK),
    }
}

#[instrument(skip(container))]
fn cmd_solve(container: &ServiceContainer, request: &SolveRequest) -> CliResult<i32> {
    let report = container.solver.solve_batch(request)?;

    for skipped in &report.skipped {
        output::line_skipped(skipped.line, &skipped.reason);
    }
    for solved in &report.solved {
        print_solved(solved);
    }
    if let Some(path) = &request.output_file {
        output::file_done("Written", path);
    }

    if report.any_truncated() {
        output::partial_results();
        return Ok(exitcode::PARTIAL);
    }
    if report.solved.is_empty() {
        return Ok(exitcode::DATAERR);
    }
    Ok(exitcode::OK)
}

fn print_solved(solved: &SolvedTree) {
    let info = &solved.info;
    output::tree_heading(&solved.tree.name, solved.line, info.dag.len());
    match info.mode {
        SearchMode::Single => {
            let n = info.target as usize;
            let weighted = info.weighted_counts.get(n).copied().unwrap_or(0);
            output::point_count(n, info.combinations().len(), weighted, None);
        }
        SearchMode::All => {
            for (n, bucket) in info.all_combinations.iter().enumerate().skip(1) {
                let weighted = info.weighted_counts.get(n).copied().unwrap_or(0);
                let filtered = info
                    .filtered_combinations
                    .as_ref()
                    .and_then(|table| table.get(n))
                    .map(Vec::len);
                output::point_count(n, bucket.len(), weighted, filtered);
            }
        }
    }
    if info.safety_guard_triggered {
        output::guard_hit(info.visits);
    }
    output::search_stats(info.visits, info.elapsed);
}

#[instrument(skip(container))]
fn cmd_check(container: &ServiceContainer, file: &Path) -> CliResult<i32> {
    let trees = container.solver.load_trees(file)?;
    let mut failed = 0;
    for (line, parsed) in trees {
        match parsed {
            Ok(tree) => output::tree_valid(line, &tree),
            Err(e) => {
                failed += 1;
                output::tree_invalid(line, &e);
            }
        }
    }
    Ok(if failed > 0 { exitcode::DATAERR } else { exitcode::OK })
}

#[instrument(skip(container))]
fn cmd_show(container: &ServiceContainer, file: &Path, expanded: bool) -> CliResult<i32> {
    let mut code = exitcode::OK;
    for (line, parsed) in container.solver.load_trees(file)? {
        let tree = match parsed {
            Ok(tree) => tree,
            Err(e) => {
                output::line_skipped(line, &e);
                code = exitcode::DATAERR;
                continue;
            }
        };
        let rendered = if expanded {
            match expand(&tree) {
                Ok(e) => e.tree().to_tree_string(),
                Err(e) => {
                    output::line_skipped(line, &e);
                    code = exitcode::DATAERR;
                    continue;
                }
            }
        } else {
            tree.to_tree_string()
        };
        output::data(&rendered);
    }
    Ok(code)
}

#[instrument(skip(container))]
fn cmd_decode(container: &ServiceContainer, file: &Path, mask: u64, filter_file: Option<&Path>) -> CliResult<i32> {
    let decoded = container.solver.decode(file, mask, filter_file)?;
    output::decoded_heading(&decoded.tree.name, decoded.skillset.points_spent);
    output::data(&decoded.skillset.to_line(&decoded.tree));
    output::detail(&decoded.talent_string);
    output::detail(&format!("slots: {}", decoded.slots.iter().join(",")));
    Ok(exitcode::OK)
}

fn require_file(container: &ServiceContainer, path: &Path) -> CliResult<()> {
    if container.fs.is_file(path) {
        Ok(())
    } else {
        Err(CliError::Usage(format!("not a file: {}", path.display())))
    }
}

fn local_config_file(config_dir: Option<&Path>) -> CliResult<PathBuf> {
    let dir = match config_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().map_err(InfraError::WorkingDirectory)?,
    };
    Ok(local_config_path(&dir))
}

/// Write the commented settings template, never replacing an existing file.
pub fn write_config_template(fs: &dyn FileSystem, path: &Path) -> InfraResult<()> {
    if fs.exists(path) {
        return Err(InfraError::ConfigExists(path.to_path_buf()));
    }
    fs.write(path, &Settings::template())
        .map_err(|source| InfraError::ConfigWrite {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("wrote config template to {}", path.display());
    Ok(())
}

fn cmd_config(container: &ServiceContainer, command: &ConfigCommands, config_dir: Option<&Path>) -> CliResult<i32> {
    match command {
        ConfigCommands::Show => output::data(&container.settings.to_toml()?),
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path()
                    .ok_or_else(|| CliError::Usage("no config directory available on this platform".to_string()))?
            } else {
                local_config_file(config_dir)?
            };
            write_config_template(container.fs.as_ref(), &path)?;
            output::file_done("Created", &path);
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::config_location("global", &path),
                None => output::detail("global: no config directory available on this platform"),
            }
            output::config_location("local", &local_config_file(config_dir)?);
        }
    }
    Ok(exitcode::OK)
}
