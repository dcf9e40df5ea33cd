//! Skillset filters: per-talent constraints on which masks are accepted.
//!
//! A filter line pairs one rule with every talent of a tree in canonical
//! order: `name:v1:v2:...[;]`. Each value is an integer, optionally followed
//! by `,group` for the group rules:
//!
//! | value | rule                    |
//! |-------|-------------------------|
//! | `0`   | unconstrained           |
//! | `n>0` | exactly `n` points      |
//! | `-1`  | excluded                |
//! | `-2`  | at least one of group   |
//! | `-3`  | exactly one of group    |

use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;

use crate::domain::codec::{escape, unescape};
use crate::domain::dag::TreeDag;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::talent::TalentSwitch;
use crate::domain::tree::TalentTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterRule {
    #[default]
    Unconstrained,
    /// Exactly this many points; for switch talents the variant (1 or 2)
    Exact(u32),
    Excluded,
    AnyOf(u32),
    ExactlyOneOf(u32),
}

impl FilterRule {
    fn parse_segment(segment: &str) -> DomainResult<Self> {
        let invalid = |message: String| DomainError::InvalidFilter { message };
        let (value, group) = match segment.split_once(',') {
            Some((v, g)) => (v, Some(g)),
            None => (segment, None),
        };
        let value: i64 = value
            .trim()
            .parse()
            .map_err(|_| invalid(format!("'{segment}' is not a filter value")))?;
        let group = group
            .map(|g| g.trim().parse::<u32>())
            .transpose()
            .map_err(|_| invalid(format!("'{segment}' has an invalid group id")))?;

        match (value, group) {
            (-2, g) => Ok(Self::AnyOf(g.unwrap_or(0))),
            (-3, g) => Ok(Self::ExactlyOneOf(g.unwrap_or(0))),
            (_, Some(_)) => Err(invalid(format!("'{segment}': only -2 and -3 take a group"))),
            (0, None) => Ok(Self::Unconstrained),
            (-1, None) => Ok(Self::Excluded),
            (n, None) if n > 0 => u32::try_from(n)
                .map(Self::Exact)
                .map_err(|_| invalid(format!("'{segment}' is out of range"))),
            (n, None) => Err(invalid(format!("unknown filter value {n}"))),
        }
    }
}

impl fmt::Display for FilterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconstrained => write!(f, "0"),
            Self::Exact(n) => write!(f, "{n}"),
            Self::Excluded => write!(f, "-1"),
            Self::AnyOf(0) => write!(f, "-2"),
            Self::AnyOf(g) => write!(f, "-2,{g}"),
            Self::ExactlyOneOf(0) => write!(f, "-3"),
            Self::ExactlyOneOf(g) => write!(f, "-3,{g}"),
        }
    }
}

/// Filter as written by a user, one rule per talent in canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SkillsetFilter {
    pub name: String,
    pub rules: Vec<FilterRule>,
}

impl SkillsetFilter {
    pub fn parse_line(line: &str) -> DomainResult<Self> {
        let line = line.trim();
        let line = line.strip_suffix(';').unwrap_or(line);
        if line.is_empty() {
            return Err(DomainError::InvalidFilter {
                message: "empty filter line".to_string(),
            });
        }
        let mut segments = line.split(':');
        let name = unescape(segments.next().unwrap_or_default());
        let rules = segments.map(FilterRule::parse_segment).collect::<DomainResult<Vec<_>>>()?;
        Ok(Self { name, rules })
    }

    pub fn to_line(&self) -> String {
        format!(
            "{}:{};",
            escape(&self.name),
            self.rules.iter().map(|r| r.to_string()).join(":")
        )
    }

    /// Pair every rule with the talent index it applies to.
    pub fn rules_by_index(&self, tree: &TalentTree) -> DomainResult<BTreeMap<i32, FilterRule>> {
        if self.rules.len() != tree.node_count() {
            return Err(DomainError::InvalidFilter {
                message: format!(
                    "filter '{}' has {} values, tree '{}' has {} talents",
                    self.name,
                    self.rules.len(),
                    tree.name,
                    tree.node_count()
                ),
            });
        }
        Ok(tree
            .ordered_talents()
            .map(|(_, t)| t.index)
            .zip(self.rules.iter().copied())
            .collect())
    }
}

/// Candidate bits and the bits that must stay clear when that candidate is chosen.
pub type ExactlyOneCandidate = (u64, u64);

/// Filter lowered to bit masks over the sorted positions of a DAG.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompiledFilter {
    pub include: u64,
    pub exclude: u64,
    pub or_masks: Vec<u64>,
    pub exactly_one_groups: Vec<Vec<ExactlyOneCandidate>>,
    switch_choices: BTreeMap<i32, TalentSwitch>,
}

impl CompiledFilter {
    /// Compile against the original tree and the DAG compiled from its expansion.
    pub fn compile(filter: &SkillsetFilter, tree: &TalentTree, dag: &TreeDag) -> DomainResult<Self> {
        let rules = filter.rules_by_index(tree)?;
        let mut compiled = Self::default();
        let mut any_of: BTreeMap<u32, u64> = BTreeMap::new();
        let mut exactly_one: BTreeMap<u32, Vec<u64>> = BTreeMap::new();

        for (_, talent) in tree.ordered_talents() {
            let rule = rules.get(&talent.index).copied().unwrap_or_default();
            let chain: Vec<u64> = (0..talent.max_points)
                .map(|j| {
                    dag.position_of(talent.index, j)
                        .map(|p| 1u64 << p)
                        .ok_or(DomainError::UnknownTalent(talent.index))
                })
                .collect::<DomainResult<_>>()?;
            let all_bits = chain.iter().fold(0, |acc, b| acc | b);

            match rule {
                FilterRule::Unconstrained => {}
                FilterRule::Exact(n) if talent.is_switch() => {
                    let variant = TalentSwitch::from_code(n as i32)
                        .filter(|s| *s != TalentSwitch::Unset)
                        .ok_or_else(|| DomainError::InvalidFilter {
                            message: format!("switch talent {} has no variant {n}", talent.index),
                        })?;
                    compiled.include |= all_bits;
                    compiled.switch_choices.insert(talent.index, variant);
                }
                FilterRule::Exact(n) => {
                    if n > talent.max_points {
                        return Err(DomainError::InvalidFilter {
                            message: format!(
                                "talent {} has {} max points, filter asks for {n}",
                                talent.index, talent.max_points
                            ),
                        });
                    }
                    for (j, bit) in chain.iter().enumerate() {
                        if (j as u32) < n {
                            compiled.include |= bit;
                        } else {
                            compiled.exclude |= bit;
                        }
                    }
                }
                FilterRule::Excluded => compiled.exclude |= all_bits,
                FilterRule::AnyOf(group) => {
                    *any_of.entry(group).or_default() |= chain.first().copied().unwrap_or(0);
                }
                FilterRule::ExactlyOneOf(group) => exactly_one.entry(group).or_default().push(all_bits),
            }
        }

        compiled.or_masks = any_of.into_values().collect();
        compiled.exactly_one_groups = exactly_one
            .into_values()
            .map(|members| {
                let union = members.iter().fold(0, |acc, m| acc | m);
                members.iter().map(|&m| (m, union & !m)).collect()
            })
            .collect();
        Ok(compiled)
    }

    pub fn is_empty(&self) -> bool {
        self.include == 0 && self.exclude == 0 && self.or_masks.is_empty() && self.exactly_one_groups.is_empty()
    }

    pub fn matches(&self, mask: u64) -> bool {
        if mask & self.exclude != 0 || mask & self.include != self.include {
            return false;
        }
        if self.or_masks.iter().any(|&m| mask & m == 0) {
            return false;
        }
        self.exactly_one_groups.iter().all(|group| {
            group
                .iter()
                .filter(|&&(candidate, rest)| mask & candidate == candidate && mask & rest == 0)
                .count()
                == 1
        })
    }

    /// Whether a partial mask whose next bit will be above `position` can still pass.
    pub(crate) fn can_complete(&self, visited: u64, position: usize) -> bool {
        if visited & self.exclude != 0 {
            return false;
        }
        let settled = if position >= 63 { u64::MAX } else { (1u64 << (position + 1)) - 1 };
        self.include & settled & !visited == 0
    }

    /// Switch variant forced by the filter for a switch talent.
    pub fn switch_choice(&self, index: i32) -> Option<TalentSwitch> {
        self.switch_choices.get(&index).copied()
    }

    /// Apply the predicate to every bucket of a per-point-count table.
    pub fn filter_table(&self, table: &[Vec<u64>]) -> Vec<Vec<u64>> {
        table
            .iter()
            .map(|bucket| bucket.iter().copied().filter(|&m| self.matches(m)).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_group_segments_when_parsing_then_groups_assigned() {
        let filter = SkillsetFilter::parse_line("f:0:3:-1:-2,4:-3;").unwrap();
        assert_eq!(
            filter.rules,
            vec![
                FilterRule::Unconstrained,
                FilterRule::Exact(3),
                FilterRule::Excluded,
                FilterRule::AnyOf(4),
                FilterRule::ExactlyOneOf(0),
            ]
        );
        assert_eq!(filter.to_line(), "f:0:3:-1:-2,4:-3;");
    }

    #[test]
    fn given_group_on_plain_value_when_parsing_then_rejected() {
        assert!(SkillsetFilter::parse_line("f:1,2").is_err());
        assert!(SkillsetFilter::parse_line("f:-7").is_err());
    }

    #[test]
    fn given_exactly_one_group_when_matching_then_only_single_member_passes() {
        let filter = CompiledFilter {
            exactly_one_groups: vec![vec![(0b001, 0b110), (0b110, 0b001)]],
            ..Default::default()
        };
        assert!(filter.matches(0b001));
        assert!(filter.matches(0b110));
        assert!(!filter.matches(0b111));
        assert!(!filter.matches(0b010));
        assert!(!filter.matches(0));
    }

    #[test]
    fn given_include_below_position_when_unset_then_cannot_complete() {
        let filter = CompiledFilter {
            include: 0b010,
            ..Default::default()
        };
        assert!(filter.can_complete(0b001, 0));
        assert!(!filter.can_complete(0b001, 1));
        assert!(filter.can_complete(0b011, 1));
    }
}
