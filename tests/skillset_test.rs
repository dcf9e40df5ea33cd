//! Tests for reconstructing skillsets from masks and applying them to trees.

use ttm::domain::{
    compile, expand, parse_tree, search, talent_string, CompiledFilter, DomainError, SearchOptions, SkillsetFilter,
    TalentSkillset, TalentSwitch, TalentTree, TreeDag,
};
use ttm::util::testing::MIXED_TREE;

fn mixed() -> (TalentTree, TreeDag) {
    let tree = parse_tree(MIXED_TREE).unwrap();
    let dag = compile(expand(&tree).unwrap()).unwrap();
    (tree, dag)
}

#[test]
fn given_mask_with_switch_when_reconstructing_then_variant_defaults_to_first() {
    let (tree, dag) = mixed();

    // Root x2, Stance
    let skillset = TalentSkillset::reconstruct(&tree, &dag, 0b0001011, None).unwrap();

    assert_eq!(skillset.name, "mixed_b");
    assert_eq!(skillset.points_spent, 3);
    assert_eq!(skillset.to_line(&tree), "mixed_b:2:0:1:0;");
}

#[test]
fn given_filter_choosing_variant_when_reconstructing_then_variant_from_filter() {
    let (tree, dag) = mixed();
    let filter = CompiledFilter::compile(&SkillsetFilter::parse_line("f:0:0:2:0").unwrap(), &tree, &dag).unwrap();

    let skillset = TalentSkillset::reconstruct(&tree, &dag, 0b0001011, Some(&filter)).unwrap();

    assert_eq!(skillset.assigned.get(&2), Some(&2));
}

#[test]
fn given_tree_with_stored_variant_when_reconstructing_then_stored_variant_used() {
    let (mut tree, dag) = mixed();
    let stance = tree.by_index(2).unwrap();
    tree.get_mut(stance).unwrap().talent_switch = TalentSwitch::Second;

    let skillset = TalentSkillset::reconstruct(&tree, &dag, 0b0001011, None).unwrap();

    assert_eq!(skillset.assigned.get(&2), Some(&2));
}

#[test]
fn given_every_search_result_when_reconstructing_then_points_match_target() {
    let (tree, dag) = mixed();
    let info = search(dag.clone(), None, 5, &SearchOptions::default());

    for &mask in info.combinations() {
        let skillset = TalentSkillset::reconstruct(&tree, &dag, mask, None).unwrap();
        let total: u32 = skillset
            .assigned
            .iter()
            .map(|(&index, &value)| if index == 2 { u32::from(value > 0) } else { value })
            .sum();
        assert_eq!(total, 5, "mask {mask:#b}");
        assert_eq!(skillset.assigned.len(), 4);
    }
}

#[test]
fn given_mask_beyond_dag_when_reconstructing_then_invalid_skillset() {
    let (tree, dag) = mixed();
    assert!(matches!(
        TalentSkillset::reconstruct(&tree, &dag, 1 << 7, None),
        Err(DomainError::InvalidSkillset { .. })
    ));
}

#[test]
fn given_reconstructed_skillset_when_applying_then_tree_reflects_allocation() {
    let (mut tree, dag) = mixed();
    let skillset = TalentSkillset::reconstruct(&tree, &dag, 0b0001011, None).unwrap();

    skillset.apply(&mut tree).unwrap();

    assert_eq!(tree.spent_points, 3);
    assert_eq!(talent_string(&tree), "0:2;1:0;2[1]:1;3:0;");
}

#[test]
fn given_skillset_line_when_parsing_then_round_trips() {
    let (tree, _) = mixed();

    let skillset = TalentSkillset::parse_line("burst:2:1:0:3;", &tree).unwrap();

    assert_eq!(skillset.points_spent, 6);
    assert_eq!(skillset.to_line(&tree), "burst:2:1:0:3;");
}

#[test]
fn given_group_sentinel_in_skillset_line_when_parsing_then_rejected() {
    let (tree, _) = mixed();
    assert!(matches!(
        TalentSkillset::parse_line("bad:2:-2:0:0;", &tree),
        Err(DomainError::InvalidSkillset { .. })
    ));
}

#[test]
fn given_points_above_max_when_applying_then_rejected() {
    let (mut tree, _) = mixed();
    let skillset = TalentSkillset::parse_line("big:5:0:0:0;", &tree).unwrap();
    assert!(matches!(
        skillset.apply(&mut tree),
        Err(DomainError::InvalidSkillset { .. })
    ));
}
