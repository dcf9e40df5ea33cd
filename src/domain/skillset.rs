//! Skillsets: sparse per-talent point assignments, reconstructed from masks.

use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;

use crate::domain::codec::escape;
use crate::domain::dag::TreeDag;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::filter::{CompiledFilter, FilterRule, SkillsetFilter};
use crate::domain::talent::{expansion_key, TalentSwitch};
use crate::domain::tree::TalentTree;

/// Points per original talent index. Switch talents hold their variant id
/// (1 or 2) instead of a point count.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TalentSkillset {
    pub name: String,
    pub assigned: BTreeMap<i32, u32>,
    pub points_spent: u32,
}

impl TalentSkillset {
    /// Map a mask back onto the talents of the original tree.
    ///
    /// Every talent of `tree` appears in the result, unselected ones with 0.
    pub fn reconstruct(
        tree: &TalentTree,
        dag: &TreeDag,
        mask: u64,
        filter: Option<&CompiledFilter>,
    ) -> DomainResult<Self> {
        if mask & !dag.full_mask() != 0 {
            return Err(DomainError::InvalidSkillset {
                message: format!("mask {mask:#x} sets bits beyond the {} talents of the tree", dag.len()),
            });
        }

        let max_talent_points = dag.original_max_talent_points;
        let mut by_key: HashMap<i64, i32> = HashMap::new();
        for (_, talent) in tree.ordered_talents() {
            for position in 0..talent.max_points {
                by_key.insert(expansion_key(talent.index, position, max_talent_points), talent.index);
            }
        }

        let mut assigned: BTreeMap<i32, u32> = tree.ordered_talents().map(|(_, t)| (t.index, 0)).collect();
        for (bit, sorted) in dag.sorted_talents.iter().enumerate() {
            if mask & (1u64 << bit) == 0 {
                continue;
            }
            let index = *by_key.get(&sorted.key).ok_or(DomainError::UnknownTalent(sorted.index))?;
            let talent = tree
                .by_index(index)
                .and_then(|id| tree.get(id))
                .ok_or(DomainError::UnknownTalent(index))?;
            let entry = assigned.entry(index).or_insert(0);
            if talent.is_switch() {
                let variant = filter
                    .and_then(|f| f.switch_choice(index))
                    .or(Some(talent.talent_switch).filter(|s| *s != TalentSwitch::Unset))
                    .unwrap_or(TalentSwitch::First);
                *entry = variant.code() as u32;
            } else {
                *entry += 1;
            }
        }

        Ok(Self {
            name: format!("{}_{mask:x}", tree.name),
            assigned,
            points_spent: mask.count_ones(),
        })
    }

    /// `name:p1:p2:...;` in canonical talent order of `tree`.
    pub fn to_line(&self, tree: &TalentTree) -> String {
        let values = tree
            .ordered_talents()
            .map(|(_, t)| self.assigned.get(&t.index).copied().unwrap_or(0))
            .join(":");
        format!("{}:{};", escape(&self.name), values)
    }

    /// Parse a line written by [`TalentSkillset::to_line`].
    pub fn parse_line(line: &str, tree: &TalentTree) -> DomainResult<Self> {
        let filter = SkillsetFilter::parse_line(line).map_err(|e| DomainError::InvalidSkillset {
            message: e.to_string(),
        })?;
        let rules = filter.rules_by_index(tree).map_err(|e| DomainError::InvalidSkillset {
            message: e.to_string(),
        })?;

        let mut assigned = BTreeMap::new();
        let mut points_spent = 0;
        for (index, rule) in rules {
            let value = match rule {
                FilterRule::Unconstrained => 0,
                FilterRule::Exact(n) => n,
                other => {
                    return Err(DomainError::InvalidSkillset {
                        message: format!("talent {index}: '{other}' is not a point count"),
                    })
                }
            };
            let talent = tree
                .by_index(index)
                .and_then(|id| tree.get(id))
                .ok_or(DomainError::UnknownTalent(index))?;
            points_spent += if talent.is_switch() { u32::from(value > 0) } else { value };
            assigned.insert(index, value);
        }
        Ok(Self {
            name: filter.name,
            assigned,
            points_spent,
        })
    }

    /// Write the assignment into `tree`, replacing any previous allocation.
    pub fn apply(&self, tree: &mut TalentTree) -> DomainResult<()> {
        tree.clear_points();
        for id in tree.ordered_ids() {
            let Some(talent) = tree.get_mut(id) else {
                continue;
            };
            let value = self.assigned.get(&talent.index).copied().unwrap_or(0);
            if talent.is_switch() {
                let variant = TalentSwitch::from_code(value as i32).ok_or_else(|| DomainError::InvalidSkillset {
                    message: format!("switch talent {} has no variant {value}", talent.index),
                })?;
                talent.points = u32::from(variant != TalentSwitch::Unset);
                if variant != TalentSwitch::Unset {
                    talent.talent_switch = variant;
                }
            } else if value > talent.max_points {
                return Err(DomainError::InvalidSkillset {
                    message: format!(
                        "talent {} has {} max points, skillset assigns {value}",
                        talent.index, talent.max_points
                    ),
                });
            } else {
                talent.points = value;
            }
        }
        tree.spent_points = tree.allocated_points() as i32;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dag::compile;
    use crate::domain::normalize::expand;
    use crate::domain::talent::{Talent, TalentType};

    fn tree_with_switch() -> TalentTree {
        let mut tree = TalentTree::new("s");
        let a = tree.add_talent(Talent::new(0, "a", 2));
        let b = tree.add_talent(Talent::new(1, "b", 1).with_type(TalentType::Switch));
        tree.link(a, b);
        tree.recompute();
        tree
    }

    #[test]
    fn given_full_mask_when_reconstructing_then_points_and_default_variant() {
        let tree = tree_with_switch();
        let dag = compile(expand(&tree).unwrap()).unwrap();
        let skillset = TalentSkillset::reconstruct(&tree, &dag, dag.full_mask(), None).unwrap();
        assert_eq!(skillset.assigned.get(&0), Some(&2));
        assert_eq!(skillset.assigned.get(&1), Some(&1));
        assert_eq!(skillset.points_spent, 3);
    }

    #[test]
    fn given_bits_beyond_dag_when_reconstructing_then_rejected() {
        let tree = tree_with_switch();
        let dag = compile(expand(&tree).unwrap()).unwrap();
        assert!(TalentSkillset::reconstruct(&tree, &dag, 1 << 10, None).is_err());
    }

    #[test]
    fn given_skillset_line_when_parsing_then_applies_to_tree() {
        let mut tree = tree_with_switch();
        let skillset = TalentSkillset::parse_line("mine:1:2;", &tree).unwrap();
        assert_eq!(skillset.points_spent, 2);
        skillset.apply(&mut tree).unwrap();
        let switch = tree.get(tree.by_index(1).unwrap()).unwrap();
        assert_eq!(switch.talent_switch, TalentSwitch::Second);
        assert_eq!(tree.spent_points, 2);
        assert_eq!(skillset.to_line(&tree), "mine:1:2;");
    }
}
