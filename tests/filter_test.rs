//! Tests for filter lines and their compilation to bit masks.

use rstest::rstest;

use ttm::domain::{
    compile, expand, parse_tree, CompiledFilter, DomainError, FilterRule, SkillsetFilter, TalentSwitch, TalentTree,
    TreeDag,
};
use ttm::util::testing::MIXED_TREE;

fn mixed() -> (TalentTree, TreeDag) {
    let tree = parse_tree(MIXED_TREE).unwrap();
    let dag = compile(expand(&tree).unwrap()).unwrap();
    (tree, dag)
}

fn compiled(line: &str) -> Result<CompiledFilter, DomainError> {
    let (tree, dag) = mixed();
    CompiledFilter::compile(&SkillsetFilter::parse_line(line)?, &tree, &dag)
}

#[rstest]
#[case("mine:0:0:0:0", "mine:0:0:0:0;")]
#[case("mine:2:-1:1:0;", "mine:2:-1:1:0;")]
#[case("  grp:-2,0:-3,7:-2:0 ", "grp:-2:-3,7:-2:0;")]
fn given_filter_line_when_round_tripping_then_normalized(#[case] line: &str, #[case] expected: &str) {
    let filter = SkillsetFilter::parse_line(line).unwrap();
    assert_eq!(filter.to_line(), expected);
}

#[rstest]
#[case::empty("")]
#[case::only_terminator(";")]
#[case::not_a_number("f:x")]
#[case::unknown_sentinel("f:-4")]
#[case::group_on_exact("f:2,1")]
#[case::bad_group("f:-2,a")]
fn given_invalid_line_when_parsing_then_invalid_filter(#[case] line: &str) {
    assert!(matches!(
        SkillsetFilter::parse_line(line),
        Err(DomainError::InvalidFilter { .. })
    ));
}

#[test]
fn given_wrong_value_count_when_compiling_then_rejected() {
    assert!(matches!(compiled("f:0:0:0"), Err(DomainError::InvalidFilter { .. })));
    assert!(matches!(compiled("f:0:0:0:0:0"), Err(DomainError::InvalidFilter { .. })));
}

#[test]
fn given_unconstrained_filter_when_compiling_then_empty_and_accepts_everything() {
    let filter = compiled("f:0:0:0:0").unwrap();
    assert!(filter.is_empty());
    assert!(filter.matches(0));
    assert!(filter.matches(u64::MAX));
}

#[test]
fn given_exact_points_on_chain_when_compiling_then_prefix_included_rest_excluded() {
    let filter = compiled("f:1:0:0:2").unwrap();

    // Root head, Finisher first two ranks
    assert_eq!(filter.include, 0b0110001);
    // Root second rank, Finisher third rank
    assert_eq!(filter.exclude, 0b1000010);
}

#[test]
fn given_exact_above_max_when_compiling_then_rejected() {
    assert!(matches!(compiled("f:3:0:0:0"), Err(DomainError::InvalidFilter { .. })));
}

#[test]
fn given_switch_variant_when_compiling_then_bit_included_and_choice_recorded() {
    let filter = compiled("f:0:0:2:0").unwrap();

    assert_eq!(filter.include, 0b0001000);
    assert_eq!(filter.switch_choice(2), Some(TalentSwitch::Second));
    assert_eq!(filter.switch_choice(1), None);
}

#[test]
fn given_unknown_switch_variant_when_compiling_then_rejected() {
    assert!(matches!(compiled("f:0:0:3:0"), Err(DomainError::InvalidFilter { .. })));
}

#[test]
fn given_any_of_groups_when_compiling_then_one_mask_per_group() {
    let filter = compiled("f:-2,1:-2:-2:-2,1").unwrap();

    // group 0: Focus, Stance; group 1: Root head, Finisher head
    assert_eq!(filter.or_masks, vec![0b0001100, 0b0010001]);
    assert!(filter.matches(0b0010111));
    assert!(!filter.matches(0b0000011));
}

#[test]
fn given_exactly_one_group_on_multi_point_talent_when_compiling_then_all_ranks_are_candidate() {
    let filter = compiled("f:-3:0:0:-3").unwrap();

    assert_eq!(
        filter.exactly_one_groups,
        vec![vec![(0b0000011, 0b1110000), (0b1110000, 0b0000011)]]
    );
    assert!(filter.matches(0b0000011));
    assert!(!filter.matches(0b0000001));
    assert!(!filter.matches(0b1110011));
}

#[test]
fn given_filter_rules_when_pairing_with_tree_then_keyed_by_index() {
    let (tree, _) = mixed();
    let filter = SkillsetFilter::parse_line("f:0:-1:2:-3,4").unwrap();

    let rules = filter.rules_by_index(&tree).unwrap();

    assert_eq!(rules.get(&1), Some(&FilterRule::Excluded));
    assert_eq!(rules.get(&2), Some(&FilterRule::Exact(2)));
    assert_eq!(rules.get(&3), Some(&FilterRule::ExactlyOneOf(4)));
}
