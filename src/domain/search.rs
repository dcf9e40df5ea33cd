//! Exhaustive enumeration of point allocations over a compiled DAG.
//!
//! Every mask is built by adding positions in strictly ascending order, so
//! each valid allocation is produced exactly once. Candidates are the roots
//! plus the children of every selected talent, kept sorted and
//! de-duplicated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::domain::dag::TreeDag;
use crate::domain::filter::CompiledFilter;

/// Default ceiling for visited search states.
pub const DEFAULT_MAX_VISITS: u64 = 500_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Only allocations spending exactly the target, filtered inline
    #[default]
    Single,
    /// Allocations for every point count from 1 up to the target
    All,
}

/// Limits and switches for one search.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub mode: SearchMode,
    pub max_visits: u64,
    pub parallel: bool,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            mode: SearchMode::Single,
            max_visits: DEFAULT_MAX_VISITS,
            parallel: true,
            cancel: None,
        }
    }
}

/// Result of a search together with the DAG it ran on.
#[derive(Debug, Clone)]
pub struct TreeDagInfo {
    pub dag: TreeDag,
    pub mode: SearchMode,
    pub target: u32,
    /// Masks per point count; index `n` holds allocations spending `n` points
    pub all_combinations: Vec<Vec<u64>>,
    /// Post-hoc filtered copy of `all_combinations` (all-counts mode with a filter)
    pub filtered_combinations: Option<Vec<Vec<u64>>>,
    /// Per point count, masks counted with a factor 2 for every switch talent
    pub weighted_counts: Vec<u64>,
    pub safety_guard_triggered: bool,
    pub cancelled: bool,
    pub visits: u64,
    pub elapsed: Duration,
}

impl TreeDagInfo {
    /// Masks spending exactly the target.
    pub fn combinations(&self) -> &[u64] {
        self.all_combinations
            .get(self.target as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of masks across all point counts.
    pub fn combination_count(&self) -> usize {
        self.all_combinations.iter().map(Vec::len).sum()
    }

    pub fn is_truncated(&self) -> bool {
        self.safety_guard_triggered || self.cancelled
    }
}

#[derive(Debug, Default)]
struct SeedResult {
    buckets: Vec<Vec<u64>>,
    weights: Vec<u64>,
    visits: u64,
    guard: bool,
    cancelled: bool,
}

struct Searcher<'a> {
    dag: &'a TreeDag,
    filter: Option<&'a CompiledFilter>,
    mode: SearchMode,
    max_visits: u64,
    cancel: Option<&'a AtomicBool>,
    result: SeedResult,
}

impl<'a> Searcher<'a> {
    fn new(dag: &'a TreeDag, filter: Option<&'a CompiledFilter>, target: u32, options: &'a SearchOptions) -> Self {
        let buckets = bucket_count(dag, target);
        Self {
            dag,
            filter: filter.filter(|f| !f.is_empty()),
            mode: options.mode,
            max_visits: options.max_visits,
            cancel: options.cancel.as_deref(),
            result: SeedResult {
                buckets: vec![Vec::new(); buckets],
                weights: vec![0; buckets],
                ..Default::default()
            },
        }
    }

    fn stopped(&self) -> bool {
        self.result.guard || self.result.cancelled
    }

    #[allow(clippy::too_many_arguments)]
    fn visit(
        &mut self,
        position: usize,
        visited: u64,
        slot: usize,
        weight: u64,
        spent: u32,
        left: u32,
        candidates: &[usize],
    ) {
        if self.stopped() {
            return;
        }
        self.result.visits += 1;
        if self.result.visits > self.max_visits {
            self.result.guard = true;
            return;
        }
        if self.cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
            self.result.cancelled = true;
            return;
        }

        let visited = visited | (1u64 << position);
        let spent = spent + 1;
        let left = left - 1;
        let weight = weight.saturating_mul(u64::from(self.dag.minimal_tree_dag[position].weight));

        match self.mode {
            SearchMode::Single => {
                if left == 0 {
                    if self.filter.map_or(true, |f| f.matches(visited)) {
                        self.record(spent, visited, weight);
                    }
                    return;
                }
                if self.dag.len() - position - 1 < left as usize {
                    return;
                }
                if self.filter.is_some_and(|f| !f.can_complete(visited, position)) {
                    return;
                }
            }
            SearchMode::All => {
                self.record(spent, visited, weight);
                if left == 0 {
                    return;
                }
            }
        }

        let mut next = candidates.to_vec();
        for &child in &self.dag.minimal_tree_dag[position].children {
            if let Err(at) = next.binary_search(&child) {
                next.insert(at, child);
            }
        }

        for i in slot..next.len() {
            let candidate = next[i];
            if candidate > position && spent >= self.dag.sorted_talents[candidate].points_required {
                self.visit(candidate, visited, i + 1, weight, spent, left, &next);
                if self.stopped() {
                    return;
                }
            }
        }
    }

    fn record(&mut self, spent: u32, mask: u64, weight: u64) {
        let bucket = spent as usize;
        self.result.buckets[bucket].push(mask);
        self.result.weights[bucket] = self.result.weights[bucket].saturating_add(weight);
    }
}

/// No mask can spend more points than there are positions.
fn bucket_count(dag: &TreeDag, target: u32) -> usize {
    (target as usize).min(dag.len()) + 1
}

/// Enumerate allocations of `target` points over `dag`.
///
/// Each zero-requirement root is an independent seed; seeds run on the rayon
/// pool when `options.parallel` is set and their results are concatenated
/// in seed order, so the output does not depend on scheduling.
#[instrument(level = "debug", skip(dag, filter, options), fields(positions = dag.len()))]
pub fn search(dag: TreeDag, filter: Option<&CompiledFilter>, target: u32, options: &SearchOptions) -> TreeDagInfo {
    let started = Instant::now();
    let roots = dag.root_indices.clone();
    let seeds: Vec<(usize, usize)> = roots
        .iter()
        .enumerate()
        .filter(|&(_, &p)| dag.sorted_talents[p].points_required == 0)
        .map(|(slot, &p)| (slot, p))
        .collect();

    let run_seed = |&(slot, position): &(usize, usize)| {
        let mut searcher = Searcher::new(&dag, filter, target, options);
        searcher.visit(position, 0, slot + 1, 1, 0, target, &roots);
        searcher.result
    };

    let results: Vec<SeedResult> = if target == 0 {
        Vec::new()
    } else if options.parallel {
        seeds.par_iter().map(run_seed).collect()
    } else {
        seeds.iter().map(run_seed).collect()
    };

    let buckets = bucket_count(&dag, target);
    let mut all_combinations: Vec<Vec<u64>> = vec![Vec::new(); buckets];
    let mut weighted_counts = vec![0u64; buckets];
    let mut visits = 0;
    let mut guard = false;
    let mut cancelled = false;
    for result in results {
        for (n, (masks, weight)) in result.buckets.into_iter().zip(result.weights).enumerate() {
            all_combinations[n].extend(masks);
            weighted_counts[n] = weighted_counts[n].saturating_add(weight);
        }
        visits += result.visits;
        guard |= result.guard;
        cancelled |= result.cancelled;
    }

    let filtered_combinations = match (options.mode, filter) {
        (SearchMode::All, Some(f)) => Some(f.filter_table(&all_combinations)),
        _ => None,
    };

    let info = TreeDagInfo {
        dag,
        mode: options.mode,
        target,
        all_combinations,
        filtered_combinations,
        weighted_counts,
        safety_guard_triggered: guard,
        cancelled,
        visits,
        elapsed: started.elapsed(),
    };
    if guard {
        warn!("safety guard triggered after {} visits, result is partial", visits);
    }
    if cancelled {
        debug!("search cancelled after {} visits", visits);
    }
    info!(
        "{} combinations for {} points in {:?}",
        info.combination_count(),
        target,
        info.elapsed
    );
    info
}
