//! Arena-based talent tree.
//!
//! Talents live in a generational arena and reference each other through
//! [`TalentId`] handles, so nodes can be replaced during expansion and
//! contraction without aliasing problems.

use std::collections::{BTreeMap, HashSet};

use generational_arena::Arena;
use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::talent::{Talent, TalentId};

/// A talent tree (a DAG despite the name) and its metadata.
///
/// The tree owns every talent. Roots, the ordered talent map and the derived
/// counters are recomputed by [`TalentTree::recompute`] after every
/// structural edit.
#[derive(Debug, Clone)]
pub struct TalentTree {
    /// `custom` for fully specified trees, otherwise a preset identifier
    pub preset: String,
    pub name: String,
    pub description: String,
    pub loadout_description: String,
    pub unspent_points: i32,
    pub spent_points: i32,
    arena: Arena<Talent>,
    roots: Vec<TalentId>,
    ordered: BTreeMap<i64, TalentId>,
    node_count: usize,
    max_talent_points: u32,
    max_id: i32,
}

impl Default for TalentTree {
    fn default() -> Self {
        Self::new("defaultTree")
    }
}

impl TalentTree {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            preset: "custom".to_string(),
            name: name.into(),
            description: String::new(),
            loadout_description: String::new(),
            unspent_points: 0,
            spent_points: 0,
            arena: Arena::new(),
            roots: Vec::new(),
            ordered: BTreeMap::new(),
            node_count: 0,
            max_talent_points: 0,
            max_id: 0,
        }
    }

    /// Add a detached talent. Call [`TalentTree::recompute`] once linking is done.
    pub fn add_talent(&mut self, talent: Talent) -> TalentId {
        self.arena.insert(talent)
    }

    /// Connect `parent -> child` in both directions. Existing edges are kept once.
    pub fn link(&mut self, parent: TalentId, child: TalentId) {
        if !self.arena.contains(parent) || !self.arena.contains(child) {
            return;
        }
        if let Some(p) = self.arena.get_mut(parent) {
            if !p.children.contains(&child) {
                p.children.push(child);
            }
        }
        if let Some(c) = self.arena.get_mut(child) {
            if !c.parents.contains(&parent) {
                c.parents.push(parent);
            }
        }
    }

    pub(crate) fn remove(&mut self, id: TalentId) -> Option<Talent> {
        self.arena.remove(id)
    }

    pub fn get(&self, id: TalentId) -> Option<&Talent> {
        self.arena.get(id)
    }

    pub fn get_mut(&mut self, id: TalentId) -> Option<&mut Talent> {
        self.arena.get_mut(id)
    }

    /// Look up a talent, treating a dangling handle as an unknown talent.
    pub(crate) fn talent(&self, id: TalentId) -> DomainResult<&Talent> {
        self.arena.get(id).ok_or(DomainError::UnknownTalent(-1))
    }

    pub fn by_key(&self, key: i64) -> Option<TalentId> {
        self.ordered.get(&key).copied()
    }

    pub fn by_index(&self, index: i32) -> Option<TalentId> {
        self.by_key(i64::from(index))
    }

    pub fn roots(&self) -> &[TalentId] {
        &self.roots
    }

    /// All talents in canonical order (ascending key).
    pub fn ordered_talents(&self) -> impl Iterator<Item = (TalentId, &Talent)> + '_ {
        self.ordered
            .values()
            .filter_map(move |&id| self.arena.get(id).map(|t| (id, t)))
    }

    /// Every talent in the arena, reachable from a root or not, in arena order.
    pub fn talents(&self) -> impl Iterator<Item = (TalentId, &Talent)> + '_ {
        self.arena.iter()
    }

    pub fn ordered_ids(&self) -> Vec<TalentId> {
        self.ordered.values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Sum of `max_points` over all talents.
    pub fn max_talent_points(&self) -> u32 {
        self.max_talent_points
    }

    /// One past the highest talent index.
    pub fn max_id(&self) -> i32 {
        self.max_id
    }

    /// Points currently allocated across all talents.
    pub fn allocated_points(&self) -> u32 {
        self.arena.iter().map(|(_, t)| t.points).sum()
    }

    /// Length of the longest root-to-leaf path.
    #[instrument(level = "trace", skip(self))]
    pub fn depth(&self) -> usize {
        let mut memo = BTreeMap::new();
        self.roots
            .iter()
            .map(|&root| self.calculate_depth(root, &mut memo))
            .max()
            .unwrap_or(0)
    }

    fn calculate_depth(&self, id: TalentId, memo: &mut BTreeMap<i64, usize>) -> usize {
        let Some(talent) = self.get(id) else {
            return 0;
        };
        if let Some(&depth) = memo.get(&talent.key) {
            return depth;
        }
        let depth = 1 + talent
            .children
            .iter()
            .map(|&child| self.calculate_depth(child, memo))
            .max()
            .unwrap_or(0);
        memo.insert(talent.key, depth);
        depth
    }

    /// Recompute roots, the ordered talent map and derived counters.
    #[instrument(level = "trace", skip(self))]
    pub fn recompute(&mut self) {
        for (_, talent) in self.arena.iter_mut() {
            if !talent.is_expanded || talent.expansion_index == 0 {
                talent.key = i64::from(talent.index);
            }
        }

        let mut roots: Vec<TalentId> = self
            .arena
            .iter()
            .filter(|(_, t)| t.parents.is_empty())
            .map(|(id, _)| id)
            .collect();
        roots.sort_by_key(|&id| self.arena[id].key);
        self.roots = roots;

        self.ordered.clear();
        let mut seen = HashSet::new();
        let mut stack: Vec<TalentId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(talent) = self.arena.get(id) {
                self.ordered.insert(talent.key, id);
                for &child in talent.children.iter().rev() {
                    stack.push(child);
                }
            }
        }

        self.node_count = self.ordered.len();
        self.max_talent_points = self.ordered_talents().map(|(_, t)| t.max_points).sum();
        self.max_id = self
            .ordered_talents()
            .map(|(_, t)| t.index + 1)
            .max()
            .unwrap_or(0);
        debug!(
            "recompute: {} talents, {} roots, {} max points",
            self.node_count,
            self.roots.len(),
            self.max_talent_points
        );
    }

    /// Insert a new talent wired to existing talents by index.
    ///
    /// The edit is validated on a throwaway graph first, so a rejected
    /// insertion leaves the tree untouched.
    pub fn insert_talent(
        &mut self,
        talent: Talent,
        parents: &[i32],
        children: &[i32],
    ) -> DomainResult<TalentId> {
        if self.by_index(talent.index).is_some() {
            return Err(DomainError::parse(
                0,
                format!("talent index {} already exists", talent.index),
            ));
        }
        let parent_ids = self.resolve_indices(parents)?;
        let child_ids = self.resolve_indices(children)?;
        if self.would_insert_cycle(parents, children)? {
            return Err(DomainError::CycleDetected);
        }

        let id = self.add_talent(talent);
        for parent in parent_ids {
            self.link(parent, id);
        }
        for child in child_ids {
            self.link(id, child);
        }
        self.recompute();
        Ok(id)
    }

    pub(crate) fn resolve_indices(&self, indices: &[i32]) -> DomainResult<Vec<TalentId>> {
        indices
            .iter()
            .map(|&index| self.by_index(index).ok_or(DomainError::UnknownTalent(index)))
            .collect()
    }

    pub(crate) fn replace_parent(&mut self, child: TalentId, old: TalentId, new: TalentId) -> DomainResult<()> {
        let parent_index = self.talent(old)?.index;
        let talent = self.arena.get_mut(child).ok_or(DomainError::UnknownTalent(-1))?;
        match talent.parents.iter_mut().find(|p| **p == old) {
            Some(slot) => {
                *slot = new;
                Ok(())
            }
            None => Err(DomainError::InconsistentLinks {
                parent: parent_index,
                child: talent.index,
            }),
        }
    }

    pub(crate) fn set_children(&mut self, id: TalentId, children: Vec<TalentId>) {
        if let Some(talent) = self.arena.get_mut(id) {
            talent.children = children;
        }
    }

    pub(crate) fn set_parents(&mut self, id: TalentId, parents: Vec<TalentId>) {
        if let Some(talent) = self.arena.get_mut(id) {
            talent.parents = parents;
        }
    }

    /// Reset every allocation to zero points.
    pub fn clear_points(&mut self) {
        for (_, talent) in self.arena.iter_mut() {
            talent.points = 0;
        }
        self.spent_points = 0;
    }
}
