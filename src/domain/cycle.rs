//! Cycle detection on talent graphs.
//!
//! All entry points reduce their input to a compact adjacency list and run a
//! three-colour depth-first search on it with an explicit stack.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::talent::{Talent, TalentId};
use crate::domain::tree::TalentTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Colour {
    Unvisited,
    InProgress,
    Done,
}

/// Minimal graph used only to answer "is there a cycle?".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleCheckGraph {
    children: Vec<Vec<usize>>,
}

impl CycleCheckGraph {
    pub fn new(children: Vec<Vec<usize>>) -> Self {
        Self { children }
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Graph over every talent of `tree`, nodes numbered by ascending key.
    pub fn from_tree(tree: &TalentTree) -> Self {
        let (graph, _) = Self::with_positions(tree);
        graph
    }

    /// Graph of `tree` plus one detached candidate node wired to the given
    /// parent and child indices. The tree itself is not touched.
    pub fn with_candidate(tree: &TalentTree, parents: &[i32], children: &[i32]) -> DomainResult<Self> {
        let (mut graph, positions) = Self::with_positions(tree);
        let candidate = graph.children.len();
        let lookup = |index: &i32| positions.get(index).copied().ok_or(DomainError::UnknownTalent(*index));

        let candidate_children = children.iter().map(lookup).collect::<DomainResult<Vec<_>>>()?;
        graph.children.push(candidate_children);
        for parent in parents {
            let position = lookup(parent)?;
            graph.children[position].push(candidate);
        }
        Ok(graph)
    }

    /// Graph built from a raw tree string. Edges come from both the parent
    /// and the child index fields, the same way the codec links them.
    pub fn from_tree_string(tree_rep: &str) -> DomainResult<Self> {
        let mut records: Vec<(usize, i32, Vec<i32>, Vec<i32>)> = Vec::new();
        for (record, part) in tree_rep.split(';').enumerate().skip(1) {
            if part.is_empty() {
                continue;
            }
            let fields: Vec<&str> = part.split(':').collect();
            if fields.len() < 12 {
                return Err(DomainError::parse(
                    record,
                    format!("expected 12 fields, found {}", fields.len()),
                ));
            }
            let index = parse_index(record, fields[0])?;
            let parents = index_field(record, fields[10])?;
            let children = index_field(record, fields[11])?;
            records.push((record, index, parents, children));
        }

        let positions: BTreeMap<i32, usize> = records
            .iter()
            .enumerate()
            .map(|(position, (_, index, _, _))| (*index, position))
            .collect();
        let mut graph = vec![Vec::new(); records.len()];
        for (position, (record, _, parents, children)) in records.iter().enumerate() {
            for c in children {
                let child = positions
                    .get(c)
                    .copied()
                    .ok_or_else(|| DomainError::parse(*record, format!("unknown child index {c}")))?;
                graph[position].push(child);
            }
            for p in parents {
                let parent = positions
                    .get(p)
                    .copied()
                    .ok_or_else(|| DomainError::parse(*record, format!("unknown parent index {p}")))?;
                graph[parent].push(position);
            }
        }
        Ok(Self { children: graph })
    }

    fn with_positions(tree: &TalentTree) -> (Self, BTreeMap<i32, usize>) {
        // Every arena entry, not only what the roots reach: a cycle with no
        // root in front of it must still show up here.
        let mut talents: Vec<(TalentId, &Talent)> = tree.talents().collect();
        talents.sort_by_key(|(_, talent)| talent.key);

        let slots: HashMap<TalentId, usize> = talents
            .iter()
            .enumerate()
            .map(|(position, (id, _))| (*id, position))
            .collect();
        let mut positions = BTreeMap::new();
        for (position, (_, talent)) in talents.iter().enumerate() {
            positions.entry(talent.index).or_insert(position);
        }
        let children = talents
            .iter()
            .map(|(_, talent)| {
                talent
                    .children()
                    .iter()
                    .filter_map(|child| slots.get(child).copied())
                    .collect()
            })
            .collect();
        (Self { children }, positions)
    }

    /// Three-colour DFS over every component.
    #[instrument(level = "trace", skip(self), fields(nodes = self.children.len()))]
    pub fn has_cycle(&self) -> bool {
        let mut colour = vec![Colour::Unvisited; self.children.len()];
        for start in 0..self.children.len() {
            if colour[start] != Colour::Unvisited {
                continue;
            }
            // (node, next child slot to look at)
            let mut stack = vec![(start, 0usize)];
            colour[start] = Colour::InProgress;
            while let Some(frame) = stack.last_mut() {
                let (node, next) = *frame;
                match self.children[node].get(next) {
                    Some(&child) => {
                        frame.1 += 1;
                        match colour.get(child) {
                            Some(Colour::InProgress) => {
                                debug!("cycle through node {}", child);
                                return true;
                            }
                            Some(Colour::Unvisited) => {
                                colour[child] = Colour::InProgress;
                                stack.push((child, 0));
                            }
                            _ => {}
                        }
                    }
                    None => {
                        colour[node] = Colour::Done;
                        stack.pop();
                    }
                }
            }
        }
        false
    }
}

fn index_field(record: usize, field: &str) -> DomainResult<Vec<i32>> {
    field
        .split(',')
        .filter(|c| !c.is_empty())
        .map(|c| parse_index(record, c))
        .collect()
}

fn parse_index(record: usize, field: &str) -> DomainResult<i32> {
    field
        .trim()
        .parse()
        .map_err(|_| DomainError::parse(record, format!("invalid talent index '{field}'")))
}

impl TalentTree {
    pub fn has_cycle(&self) -> bool {
        CycleCheckGraph::from_tree(self).has_cycle()
    }

    /// Whether wiring a new talent to `parents` and `children` would close a cycle.
    pub fn would_insert_cycle(&self, parents: &[i32], children: &[i32]) -> DomainResult<bool> {
        Ok(CycleCheckGraph::with_candidate(self, parents, children)?.has_cycle())
    }
}

/// Cycle check on a raw tree string, before anything is materialized.
pub fn tree_string_has_cycle(tree_rep: &str) -> DomainResult<bool> {
    Ok(CycleCheckGraph::from_tree_string(tree_rep)?.has_cycle())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_self_loop_when_checking_then_cycle() {
        assert!(CycleCheckGraph::new(vec![vec![0]]).has_cycle());
    }

    #[test]
    fn given_diamond_when_checking_then_no_cycle() {
        let graph = CycleCheckGraph::new(vec![vec![1, 2], vec![3], vec![3], vec![]]);
        assert!(!graph.has_cycle());
    }

    #[test]
    fn given_cycle_in_second_component_when_checking_then_found() {
        let graph = CycleCheckGraph::new(vec![vec![1], vec![], vec![3], vec![4], vec![2]]);
        assert!(graph.has_cycle());
    }

    #[test]
    fn given_long_chain_when_checking_then_no_stack_overflow() {
        let n = 100_000;
        let children = (0..n).map(|i| if i + 1 < n { vec![i + 1] } else { vec![] }).collect();
        assert!(!CycleCheckGraph::new(children).has_cycle());
    }
}
