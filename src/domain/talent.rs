//! Talent nodes: the vertices of a talent tree.

use std::fmt;

use generational_arena::Index;

/// Stable handle of a talent inside its tree's arena.
pub type TalentId = Index;

/// Kind of a talent node. The numeric codes are part of the tree grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TalentType {
    #[default]
    Active,
    Passive,
    /// Two variants sharing a single point slot.
    Switch,
}

impl TalentType {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Active),
            1 => Some(Self::Passive),
            2 => Some(Self::Switch),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Active => 0,
            Self::Passive => 1,
            Self::Switch => 2,
        }
    }

    /// Number of distinct loadouts one selected point of this type stands for.
    pub fn weight(self) -> u8 {
        match self {
            Self::Switch => 2,
            _ => 1,
        }
    }
}

/// Selected variant of a switch talent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TalentSwitch {
    #[default]
    Unset,
    First,
    Second,
}

impl TalentSwitch {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Unset),
            1 => Some(Self::First),
            2 => Some(Self::Second),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Unset => 0,
            Self::First => 1,
            Self::Second => 2,
        }
    }
}

/// A single talent node.
///
/// Parent and child lists are non-owning handles into the arena of the tree
/// that owns this talent. They are only mutated through [`TalentTree`] so
/// both directions stay in sync.
///
/// [`TalentTree`]: crate::domain::TalentTree
#[derive(Debug, Clone, PartialEq)]
pub struct Talent {
    /// Caller-assigned index, shared by every element of an expanded chain
    pub index: i32,
    pub name: String,
    pub switch_name: String,
    pub descriptions: Vec<String>,
    pub talent_type: TalentType,
    pub row: i32,
    pub column: i32,
    pub points: u32,
    pub max_points: u32,
    /// Points that must already be spent in the tree before this talent unlocks
    pub points_required: u32,
    pub talent_switch: TalentSwitch,
    /// Set on every element of a chain created by expansion
    pub is_expanded: bool,
    /// Position inside an expanded chain, 0 for the head
    pub expansion_index: u32,
    /// Key of this talent in the ordered talent map
    pub(crate) key: i64,
    pub(crate) parents: Vec<TalentId>,
    pub(crate) children: Vec<TalentId>,
}

impl Talent {
    pub fn new(index: i32, name: impl Into<String>, max_points: u32) -> Self {
        Self {
            index,
            name: name.into(),
            switch_name: String::new(),
            descriptions: vec![String::new()],
            talent_type: TalentType::Active,
            row: 1,
            column: 1,
            points: 0,
            max_points,
            points_required: 0,
            talent_switch: TalentSwitch::Unset,
            is_expanded: false,
            expansion_index: 0,
            key: i64::from(index),
            parents: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_type(mut self, talent_type: TalentType) -> Self {
        self.talent_type = talent_type;
        self
    }

    pub fn with_points_required(mut self, points_required: u32) -> Self {
        self.points_required = points_required;
        self
    }

    pub fn with_position(mut self, row: i32, column: i32) -> Self {
        self.row = row;
        self.column = column;
        self
    }

    pub fn key(&self) -> i64 {
        self.key
    }

    pub fn parents(&self) -> &[TalentId] {
        &self.parents
    }

    pub fn children(&self) -> &[TalentId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_switch(&self) -> bool {
        self.talent_type == TalentType::Switch
    }

    /// Name of the currently selected variant.
    pub fn display_name(&self) -> &str {
        if self.is_switch() && self.talent_switch == TalentSwitch::Second {
            &self.switch_name
        } else {
            &self.name
        }
    }
}

impl fmt::Display for Talent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}/{})",
            self.index,
            self.display_name(),
            self.points,
            self.max_points
        )
    }
}

/// Key of chain element `position` of the talent `index` after expansion.
///
/// The head keeps the original index, further elements are placed above
/// every possible original index using the pre-expansion maximum talent
/// points of the tree. Exporters rely on this exact arithmetic to map bit
/// positions back to talents.
pub fn expansion_key(index: i32, position: u32, max_talent_points: u32) -> i64 {
    if position == 0 {
        i64::from(index)
    } else {
        (i64::from(index) + 1) * i64::from(max_talent_points) + i64::from(position - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_head_position_when_computing_key_then_returns_index() {
        assert_eq!(expansion_key(5, 0, 20), 5);
    }

    #[test]
    fn given_chain_positions_when_computing_keys_then_follow_offset_formula() {
        assert_eq!(expansion_key(5, 1, 20), 120);
        assert_eq!(expansion_key(5, 2, 20), 121);
        assert_eq!(expansion_key(0, 1, 7), 7);
    }

    #[test]
    fn given_unknown_type_code_when_decoding_then_none() {
        assert_eq!(TalentType::from_code(3), None);
        assert_eq!(TalentType::from_code(2), Some(TalentType::Switch));
        assert_eq!(TalentSwitch::from_code(-1), None);
    }
}
