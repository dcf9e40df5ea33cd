//! Domain layer: talent trees and the configuration solver
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod codec;
pub mod cycle;
pub mod dag;
pub mod display;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod search;
pub mod skillset;
pub mod talent;
pub mod tree;

pub use codec::{parse_custom_tree, parse_tree, talent_string, tree_to_string, validate_tree_string};
pub use cycle::{tree_string_has_cycle, CycleCheckGraph};
pub use dag::{compile, positional_indices, DagNode, SortedTalent, TreeDag, MAX_DAG_TALENTS};
pub use display::TreeNodeConvert;
pub use error::{DomainError, DomainResult};
pub use filter::{CompiledFilter, FilterRule, SkillsetFilter};
pub use normalize::{contract, expand, ExpandedTree};
pub use search::{search, SearchMode, SearchOptions, TreeDagInfo, DEFAULT_MAX_VISITS};
pub use skillset::TalentSkillset;
pub use talent::{expansion_key, Talent, TalentId, TalentSwitch, TalentType};
pub use tree::TalentTree;
