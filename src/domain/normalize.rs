//! Expansion of multi-point talents into single-point chains and back.

use std::collections::BTreeSet;

use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::talent::{expansion_key, Talent, TalentId};
use crate::domain::tree::TalentTree;

/// A disposable working copy in which every talent has `max_points == 1`.
///
/// Only [`expand`] produces this type, and the DAG compiler only accepts it,
/// so the tree a user edits can never be consumed by accident.
#[derive(Debug, Clone)]
pub struct ExpandedTree {
    tree: TalentTree,
    original_max_talent_points: u32,
}

impl ExpandedTree {
    pub fn tree(&self) -> &TalentTree {
        &self.tree
    }

    /// `max_talent_points` of the tree before expansion, used for key arithmetic.
    pub fn original_max_talent_points(&self) -> u32 {
        self.original_max_talent_points
    }

    pub(crate) fn into_inner(self) -> TalentTree {
        self.tree
    }
}

/// Expand a copy of `tree`; the input is left untouched.
///
/// Chain keys are `(index + 1) * M + position - 1` with `M` the tree's
/// `max_talent_points`, so they only stay clear of the plain indices when
/// indices are compact. A tree with gaps (index 16 next to a two point
/// talent at index 1 with `M = 8`) can map a chain element onto an existing
/// index; that fails with [`DomainError::KeyCollision`] and nothing is
/// overwritten.
#[instrument(level = "debug", skip(tree), fields(tree = %tree.name))]
pub fn expand(tree: &TalentTree) -> DomainResult<ExpandedTree> {
    let mut work = tree.clone();
    let max_talent_points = work.max_talent_points();
    let mut keys: BTreeSet<i64> = work.ordered_talents().map(|(_, t)| t.key()).collect();

    for id in work.ordered_ids() {
        let head = work.talent(id)?;
        if head.max_points <= 1 {
            continue;
        }
        expand_talent(&mut work, id, max_talent_points, &mut keys)?;
    }

    work.recompute();
    debug!(
        "expanded '{}' to {} single-point talents",
        work.name,
        work.node_count()
    );
    Ok(ExpandedTree {
        tree: work,
        original_max_talent_points: max_talent_points,
    })
}

fn expand_talent(
    tree: &mut TalentTree,
    head_id: TalentId,
    max_talent_points: u32,
    keys: &mut BTreeSet<i64>,
) -> DomainResult<()> {
    let head = tree.talent(head_id)?.clone();
    let allocated = head.points;

    let mut tail = head_id;
    for position in 1..head.max_points {
        let key = expansion_key(head.index, position, max_talent_points);
        if !keys.insert(key) {
            return Err(DomainError::KeyCollision { key, index: head.index });
        }
        let mut element = Talent::new(head.index, head.name.clone(), 1)
            .with_type(head.talent_type)
            .with_position(head.row, head.column);
        element.switch_name = head.switch_name.clone();
        element.descriptions = head.descriptions.clone();
        element.talent_switch = head.talent_switch;
        element.points = u32::from(position < allocated);
        element.is_expanded = true;
        element.expansion_index = position;
        element.key = key;

        let id = tree.add_talent(element);
        tree.link(tail, id);
        tail = id;
    }

    // the tail of the chain takes over the original children
    for &child in head.children() {
        tree.replace_parent(child, head_id, tail)?;
    }
    let mut head_children: Vec<TalentId> = tree.talent(head_id)?.children().to_vec();
    head_children.retain(|c| !head.children().contains(c));
    tree.set_children(head_id, head_children);
    tree.set_children(tail, head.children().to_vec());

    if let Some(t) = tree.get_mut(head_id) {
        t.max_points = 1;
        t.points = u32::from(allocated > 0);
        t.is_expanded = true;
        t.expansion_index = 0;
    }
    Ok(())
}

/// Collapse every chain of an expanded tree back into one multi-point talent.
#[instrument(level = "debug", skip(expanded))]
pub fn contract(expanded: ExpandedTree) -> DomainResult<TalentTree> {
    let mut tree = expanded.into_inner();

    for id in tree.ordered_ids() {
        let Some(head) = tree.get(id) else {
            continue;
        };
        if !head.is_expanded || head.expansion_index != 0 {
            continue;
        }
        contract_chain(&mut tree, id)?;
    }

    tree.recompute();
    debug!("contracted '{}' to {} talents", tree.name, tree.node_count());
    Ok(tree)
}

fn contract_chain(tree: &mut TalentTree, head_id: TalentId) -> DomainResult<()> {
    let index = tree.talent(head_id)?.index;
    let mut chain = vec![head_id];
    let mut current = head_id;
    loop {
        let talent = tree.talent(current)?;
        let next = match talent.children() {
            [only] => *only,
            _ => break,
        };
        let candidate = tree.talent(next)?;
        if candidate.index != index || !candidate.is_expanded || candidate.expansion_index == 0 {
            break;
        }
        chain.push(next);
        current = next;
    }

    let tail = current;
    let points: u32 = chain
        .iter()
        .filter_map(|&id| tree.get(id))
        .map(|t| t.points)
        .sum();
    let tail_children = tree.talent(tail)?.children().to_vec();
    for &child in &tail_children {
        tree.replace_parent(child, tail, head_id)?;
    }
    tree.set_children(head_id, tail_children);
    for &id in &chain[1..] {
        tree.set_parents(id, Vec::new());
        tree.remove(id);
    }

    if let Some(head) = tree.get_mut(head_id) {
        head.points = points;
        head.max_points = chain.len() as u32;
        head.is_expanded = false;
        head.expansion_index = 0;
    }
    Ok(())
}
