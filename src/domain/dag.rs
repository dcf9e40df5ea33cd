//! Compilation of an expanded tree into the dense, bit-indexed DAG the
//! search runs on.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::normalize::ExpandedTree;
use crate::domain::talent::{TalentId, TalentType};
use crate::domain::tree::TalentTree;

/// Bits available in a skillset mask.
pub const MAX_DAG_TALENTS: usize = 64;

/// Talent data the search and the exporters need, per sorted position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedTalent {
    pub key: i64,
    pub index: i32,
    pub expansion_index: u32,
    pub talent_type: TalentType,
    pub points_required: u32,
}

/// One row of the minimal DAG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DagNode {
    /// 2 for switch talents, 1 otherwise
    pub weight: u8,
    /// Sorted positions of the children, ascending
    pub children: Vec<usize>,
}

/// Topologically sorted expanded tree. Position `i` is bit `i` of a mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeDag {
    pub sorted_talents: Vec<SortedTalent>,
    pub minimal_tree_dag: Vec<DagNode>,
    pub root_indices: Vec<usize>,
    /// `max_talent_points` of the tree before expansion
    pub original_max_talent_points: u32,
}

impl TreeDag {
    pub fn len(&self) -> usize {
        self.sorted_talents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted_talents.is_empty()
    }

    /// Mask with every valid position set.
    pub fn full_mask(&self) -> u64 {
        match self.len() {
            MAX_DAG_TALENTS => u64::MAX,
            n => (1u64 << n) - 1,
        }
    }

    /// Sorted position of chain element `expansion_index` of talent `index`.
    pub fn position_of(&self, index: i32, expansion_index: u32) -> Option<usize> {
        self.sorted_talents
            .iter()
            .position(|t| t.index == index && t.expansion_index == expansion_index)
    }
}

/// Kahn's algorithm over the owned working copy.
///
/// The working set is kept ordered by ascending `points_required` so talents
/// that unlock earlier get lower positions. Ties keep insertion order, and
/// the initial roots enter ordered by key.
#[instrument(level = "debug", skip(expanded))]
pub fn compile(expanded: ExpandedTree) -> DomainResult<TreeDag> {
    let original_max_talent_points = expanded.original_max_talent_points();
    let mut tree = expanded.into_inner();
    let count = tree.len();
    if count > MAX_DAG_TALENTS {
        return Err(DomainError::TooManyTalents {
            count,
            limit: MAX_DAG_TALENTS,
        });
    }

    let roots: Vec<TalentId> = tree.roots().to_vec();
    let mut working: Vec<TalentId> = Vec::with_capacity(count);
    for &root in &roots {
        enqueue(&tree, &mut working, root)?;
    }

    let mut sorted: Vec<TalentId> = Vec::with_capacity(count);
    while !working.is_empty() {
        let id = working.remove(0);
        sorted.push(id);
        let children = tree.talent(id)?.children().to_vec();
        for child in children {
            consume_edge(&mut tree, id, child)?;
            if tree.talent(child)?.parents().is_empty() {
                enqueue(&tree, &mut working, child)?;
            }
        }
    }

    if sorted.len() != count {
        debug!("kahn emitted {} of {} talents", sorted.len(), count);
        return Err(DomainError::CycleDetected);
    }

    let positions: HashMap<TalentId, usize> = sorted.iter().enumerate().map(|(p, &id)| (id, p)).collect();
    let mut sorted_talents = Vec::with_capacity(count);
    let mut minimal_tree_dag = Vec::with_capacity(count);
    for &id in &sorted {
        let talent = tree.talent(id)?;
        let mut children: Vec<usize> = talent
            .children()
            .iter()
            .filter_map(|c| positions.get(c).copied())
            .collect();
        children.sort_unstable();
        minimal_tree_dag.push(DagNode {
            weight: talent.talent_type.weight(),
            children,
        });
        sorted_talents.push(SortedTalent {
            key: talent.key(),
            index: talent.index,
            expansion_index: talent.expansion_index,
            talent_type: talent.talent_type,
            points_required: talent.points_required,
        });
    }
    let mut root_indices: Vec<usize> = roots.iter().filter_map(|r| positions.get(r).copied()).collect();
    root_indices.sort_unstable();

    debug!("compiled DAG with {} positions, {} roots", count, root_indices.len());
    Ok(TreeDag {
        sorted_talents,
        minimal_tree_dag,
        root_indices,
        original_max_talent_points,
    })
}

/// Insert behind every queued talent with a lower or equal requirement.
fn enqueue(tree: &TalentTree, working: &mut Vec<TalentId>, id: TalentId) -> DomainResult<()> {
    let required = tree.talent(id)?.points_required;
    let at = working.partition_point(|&w| tree.get(w).map_or(0, |t| t.points_required) <= required);
    working.insert(at, id);
    Ok(())
}

fn consume_edge(tree: &mut TalentTree, parent: TalentId, child: TalentId) -> DomainResult<()> {
    let parent_index = tree.talent(parent)?.index;
    let child_talent = tree.talent(child)?;
    let mut parents = child_talent.parents().to_vec();
    match parents.iter().position(|&p| p == parent) {
        Some(slot) => {
            parents.remove(slot);
            tree.set_parents(child, parents);
            Ok(())
        }
        None => Err(DomainError::InconsistentLinks {
            parent: parent_index,
            child: child_talent.index,
        }),
    }
}

/// Row/column-ordered compact index of every bit.
///
/// Original talents are sorted by `(row, column, index)` and numbered
/// consecutively, a talent with `max_points = k` taking `k` slots. Bit `i`
/// maps to the slot of its talent plus its chain position.
pub fn positional_indices(tree: &TalentTree, dag: &TreeDag) -> DomainResult<Vec<usize>> {
    let mut talents: Vec<_> = tree.ordered_talents().map(|(_, t)| t).collect();
    talents.sort_by_key(|t| (t.row, t.column, t.index));

    let mut base: BTreeMap<i32, usize> = BTreeMap::new();
    let mut next = 0usize;
    for talent in talents {
        base.insert(talent.index, next);
        next += talent.max_points as usize;
    }

    dag.sorted_talents
        .iter()
        .map(|t| {
            base.get(&t.index)
                .map(|slot| slot + t.expansion_index as usize)
                .ok_or(DomainError::UnknownTalent(t.index))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::normalize::expand;
    use crate::domain::talent::Talent;

    #[test]
    fn given_equal_requirements_when_sorting_then_insertion_order_kept() {
        let mut tree = TalentTree::new("t");
        let a = tree.add_talent(Talent::new(0, "a", 1));
        let b = tree.add_talent(Talent::new(1, "b", 1));
        let c = tree.add_talent(Talent::new(2, "c", 1));
        tree.link(a, c);
        tree.link(b, c);
        tree.recompute();

        let dag = compile(expand(&tree).unwrap()).unwrap();
        let order: Vec<i32> = dag.sorted_talents.iter().map(|t| t.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert_eq!(dag.root_indices, vec![0, 1]);
        assert_eq!(dag.full_mask(), 0b111);
    }

    #[test]
    fn given_gated_root_when_sorting_then_placed_after_ungated_children() {
        let mut tree = TalentTree::new("t");
        tree.add_talent(Talent::new(0, "gated", 1).with_points_required(2));
        let a = tree.add_talent(Talent::new(1, "a", 1));
        let b = tree.add_talent(Talent::new(2, "b", 1));
        tree.link(a, b);
        tree.recompute();

        let dag = compile(expand(&tree).unwrap()).unwrap();
        let order: Vec<i32> = dag.sorted_talents.iter().map(|t| t.index).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert_eq!(dag.root_indices, vec![0, 2]);
    }
}
