//! Batch solver service
//!
//! Reads a structure file (one tree string per line) and an optional filter
//! file (one filter line per tree, paired by line order), solves every tree
//! and writes the accepted masks.
//!
//! A tree that fails to parse, compile or pair with its filter is skipped
//! with a warning; the remaining trees are still solved.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult, InputFile, IoResultExt};
use crate::config::Settings;
use crate::domain::{
    compile, expand, parse_tree, positional_indices, search, talent_string, CompiledFilter, DomainResult, SearchMode,
    SearchOptions, SkillsetFilter, TalentSkillset, TalentTree, TreeDagInfo,
};
use crate::infrastructure::traits::FileSystem;

/// Input of one batch run.
#[derive(Debug, Clone)]
pub struct SolveRequest {
    pub structure_file: PathBuf,
    pub filter_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub target: u32,
    pub options: SearchOptions,
    /// Write skillset lines instead of raw masks
    pub print_skillsets: bool,
}

impl SolveRequest {
    /// Request with search options taken from `settings`.
    pub fn from_settings(structure_file: PathBuf, target: u32, settings: &Settings) -> Self {
        Self {
            structure_file,
            filter_file: None,
            output_file: None,
            target,
            options: settings.search_options(),
            print_skillsets: settings.output.print_skillsets,
        }
    }
}

/// A tree that was solved.
#[derive(Debug, Clone)]
pub struct SolvedTree {
    /// 1-based line in the structure file
    pub line: usize,
    pub tree: TalentTree,
    pub filter: Option<CompiledFilter>,
    pub info: TreeDagInfo,
}

impl SolvedTree {
    /// Masks to report: the filtered table when there is one.
    pub fn accepted_masks(&self) -> Vec<u64> {
        match (&self.info.filtered_combinations, self.info.mode) {
            (Some(table), _) => table.iter().flatten().copied().collect(),
            (None, SearchMode::Single) => self.info.combinations().to_vec(),
            (None, SearchMode::All) => self.info.all_combinations.iter().flatten().copied().collect(),
        }
    }
}

/// A tree that was skipped, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTree {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub solved: Vec<SolvedTree>,
    pub skipped: Vec<SkippedTree>,
}

impl BatchReport {
    pub fn any_truncated(&self) -> bool {
        self.solved.iter().any(|s| s.info.is_truncated())
    }
}

/// A mask mapped back onto the first tree of a structure file.
#[derive(Debug, Clone)]
pub struct DecodedMask {
    /// The tree with the skillset applied
    pub tree: TalentTree,
    pub skillset: TalentSkillset,
    pub talent_string: String,
    /// Row/column slot of every set bit, ascending by bit
    pub slots: Vec<usize>,
}

/// Service solving batches of talent trees.
pub struct SolverService {
    fs: Arc<dyn FileSystem>,
}

impl SolverService {
    /// Create a new solver service.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Read the non-empty lines of a file with their 1-based line numbers.
    fn read_lines(&self, path: &Path, input: InputFile) -> ApplicationResult<Vec<(usize, String)>> {
        let content = self.fs.read_to_string(path).reading(input, path)?;
        Ok(content
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim().to_string()))
            .filter(|(_, l)| !l.is_empty())
            .collect())
    }

    /// Parse every tree line of a structure file.
    #[instrument(level = "debug", skip(self))]
    pub fn load_trees(&self, path: &Path) -> ApplicationResult<Vec<(usize, DomainResult<TalentTree>)>> {
        let lines = self.read_lines(path, InputFile::Structure)?;
        if lines.is_empty() {
            return Err(ApplicationError::NoTrees(path.to_path_buf()));
        }
        Ok(lines
            .into_iter()
            .map(|(line, rep)| (line, parse_tree(&rep)))
            .collect())
    }

    /// Parse every filter line of a filter file.
    #[instrument(level = "debug", skip(self))]
    pub fn load_filters(&self, path: &Path) -> ApplicationResult<Vec<DomainResult<SkillsetFilter>>> {
        let lines = self.read_lines(path, InputFile::Filter)?;
        Ok(lines
            .into_iter()
            .map(|(_, l)| SkillsetFilter::parse_line(&l))
            .collect())
    }

    /// Expand, compile and search one tree.
    pub fn solve_tree(
        tree: &TalentTree,
        filter: Option<&SkillsetFilter>,
        target: u32,
        options: &SearchOptions,
    ) -> DomainResult<(TreeDagInfo, Option<CompiledFilter>)> {
        let dag = compile(expand(tree)?)?;
        let compiled = filter
            .map(|f| CompiledFilter::compile(f, tree, &dag))
            .transpose()?;
        let info = search(dag, compiled.as_ref(), target, options);
        Ok((info, compiled))
    }

    /// Solve every tree of the request. Trees run in parallel.
    #[instrument(level = "debug", skip(self, request), fields(structure = %request.structure_file.display()))]
    pub fn solve_batch(&self, request: &SolveRequest) -> ApplicationResult<BatchReport> {
        let trees = self.load_trees(&request.structure_file)?;
        let filters = match &request.filter_file {
            Some(path) => Some(self.load_filters(path)?),
            None => None,
        };
        if let Some(filters) = &filters {
            if filters.len() != trees.len() {
                warn!(
                    "{} filter lines for {} trees, unmatched trees are solved without filter",
                    filters.len(),
                    trees.len()
                );
            }
        }

        let outcomes: Vec<Result<SolvedTree, SkippedTree>> = trees
            .into_par_iter()
            .enumerate()
            .map(|(position, (line, parsed))| {
                let skip = |reason: String| SkippedTree { line, reason };
                let tree = parsed.map_err(|e| skip(e.to_string()))?;
                let filter = match filters.as_ref().and_then(|f| f.get(position)) {
                    Some(Ok(filter)) => Some(filter),
                    Some(Err(e)) => return Err(skip(e.to_string())),
                    None => None,
                };
                let (info, compiled) = Self::solve_tree(&tree, filter, request.target, &request.options)
                    .map_err(|e| skip(e.to_string()))?;
                Ok(SolvedTree {
                    line,
                    tree,
                    filter: compiled,
                    info,
                })
            })
            .collect();

        let mut report = BatchReport::default();
        for outcome in outcomes {
            match outcome {
                Ok(solved) => {
                    debug!(
                        "line {}: '{}' -> {} masks",
                        solved.line,
                        solved.tree.name,
                        solved.accepted_masks().len()
                    );
                    report.solved.push(solved);
                }
                Err(skipped) => {
                    warn!("skipping tree on line {}: {}", skipped.line, skipped.reason);
                    report.skipped.push(skipped);
                }
            }
        }

        if let Some(path) = &request.output_file {
            self.write_output(path, &report, request.print_skillsets)?;
        }
        info!(
            "solved {} trees, skipped {}",
            report.solved.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Render the report: one entry per line, a blank line between trees.
    pub fn render_output(report: &BatchReport, print_skillsets: bool) -> ApplicationResult<String> {
        let mut blocks = Vec::with_capacity(report.solved.len());
        for solved in &report.solved {
            let mut lines = Vec::new();
            for mask in solved.accepted_masks() {
                if print_skillsets {
                    let skillset =
                        TalentSkillset::reconstruct(&solved.tree, &solved.info.dag, mask, solved.filter.as_ref())?;
                    lines.push(skillset.to_line(&solved.tree));
                } else {
                    lines.push(mask.to_string());
                }
            }
            blocks.push(lines.join("\n"));
        }
        let mut out = blocks.join("\n\n");
        if !out.is_empty() {
            out.push('\n');
        }
        Ok(out)
    }

    pub fn write_output(&self, path: &Path, report: &BatchReport, print_skillsets: bool) -> ApplicationResult<()> {
        let content = Self::render_output(report, print_skillsets)?;
        self.fs.write(path, &content).writing_results(path)?;
        debug!("wrote {} bytes to {}", content.len(), path.display());
        Ok(())
    }

    /// Reconstruct the skillset of `mask` for the first tree of a structure file.
    #[instrument(level = "debug", skip(self))]
    pub fn decode(&self, structure_file: &Path, mask: u64, filter_file: Option<&Path>) -> ApplicationResult<DecodedMask> {
        let (_, first) = self
            .load_trees(structure_file)?
            .into_iter()
            .next()
            .ok_or_else(|| ApplicationError::NoTrees(structure_file.to_path_buf()))?;
        let mut tree = first?;
        let dag = compile(expand(&tree)?)?;

        let filter = match filter_file {
            Some(path) => match self.load_filters(path)?.into_iter().next() {
                Some(parsed) => Some(CompiledFilter::compile(&parsed?, &tree, &dag)?),
                None => None,
            },
            None => None,
        };

        let skillset = TalentSkillset::reconstruct(&tree, &dag, mask, filter.as_ref())?;
        let slots = positional_indices(&tree, &dag)?
            .into_iter()
            .enumerate()
            .filter(|&(bit, _)| mask & (1u64 << bit) != 0)
            .map(|(_, slot)| slot)
            .collect();
        skillset.apply(&mut tree)?;
        Ok(DecodedMask {
            talent_string: talent_string(&tree),
            tree,
            skillset,
            slots,
        })
    }
}
