//! Tests for compiling expanded trees into the bit-indexed DAG.

use ttm::domain::{
    compile, expand, parse_tree, positional_indices, DomainError, Talent, TalentTree, MAX_DAG_TALENTS,
};
use ttm::util::testing::{CHAIN_TREE, MIXED_TREE};

fn wide_tree(talents: i32, max_points: u32) -> TalentTree {
    let mut tree = TalentTree::new("wide");
    for index in 0..talents {
        tree.add_talent(Talent::new(index, format!("t{index}"), max_points));
    }
    tree.recompute();
    tree
}

#[test]
fn given_mixed_tree_when_compiling_then_children_sit_above_parents() {
    let tree = parse_tree(MIXED_TREE).unwrap();
    let dag = compile(expand(&tree).unwrap()).unwrap();

    assert_eq!(dag.len(), 7);
    for (position, node) in dag.minimal_tree_dag.iter().enumerate() {
        for &child in &node.children {
            assert!(child > position, "{child} is not above {position}");
        }
    }
}

#[test]
fn given_mixed_tree_when_compiling_then_order_follows_requirements() {
    let tree = parse_tree(MIXED_TREE).unwrap();
    let dag = compile(expand(&tree).unwrap()).unwrap();

    let order: Vec<(i32, u32)> = dag
        .sorted_talents
        .iter()
        .map(|t| (t.index, t.expansion_index))
        .collect();
    assert_eq!(order, vec![(0, 0), (0, 1), (1, 0), (2, 0), (3, 0), (3, 1), (3, 2)]);
    assert_eq!(dag.root_indices, vec![0]);
    assert_eq!(dag.original_max_talent_points, 7);

    let weights: Vec<u8> = dag.minimal_tree_dag.iter().map(|n| n.weight).collect();
    assert_eq!(weights, vec![1, 1, 1, 2, 1, 1, 1]);
}

#[test]
fn given_chain_tree_when_compiling_then_requirements_carried_over() {
    let tree = parse_tree(CHAIN_TREE).unwrap();
    let dag = compile(expand(&tree).unwrap()).unwrap();

    let required: Vec<u32> = dag.sorted_talents.iter().map(|t| t.points_required).collect();
    assert_eq!(required, vec![0, 1, 2]);
    assert_eq!(dag.full_mask(), 0b111);
}

#[test]
fn given_exactly_sixty_four_positions_when_compiling_then_accepted() {
    let dag = compile(expand(&wide_tree(32, 2)).unwrap()).unwrap();
    assert_eq!(dag.len(), MAX_DAG_TALENTS);
    assert_eq!(dag.full_mask(), u64::MAX);
}

#[test]
fn given_more_than_sixty_four_positions_when_compiling_then_too_many_talents() {
    let err = compile(expand(&wide_tree(13, 5)).unwrap()).unwrap_err();
    assert_eq!(
        err,
        DomainError::TooManyTalents {
            count: 65,
            limit: MAX_DAG_TALENTS
        }
    );
}

#[test]
fn given_mixed_tree_when_mapping_positions_then_row_column_order() {
    let tree = parse_tree(MIXED_TREE).unwrap();
    let dag = compile(expand(&tree).unwrap()).unwrap();

    // rows/columns: Root (0,1), Focus (1,0), Stance (1,2), Finisher (2,1)
    let positions = positional_indices(&tree, &dag).unwrap();
    assert_eq!(positions, vec![0, 1, 2, 3, 4, 5, 6]);
}

#[test]
fn given_column_before_index_when_mapping_positions_then_slots_follow_layout() {
    let mut tree = TalentTree::new("layout");
    tree.add_talent(Talent::new(0, "right", 1).with_position(0, 5));
    tree.add_talent(Talent::new(1, "left", 2).with_position(0, 1));
    tree.recompute();
    let dag = compile(expand(&tree).unwrap()).unwrap();

    let positions = positional_indices(&tree, &dag).unwrap();
    let by_talent: Vec<(i32, u32, usize)> = dag
        .sorted_talents
        .iter()
        .zip(&positions)
        .map(|(t, &p)| (t.index, t.expansion_index, p))
        .collect();
    assert!(by_talent.contains(&(1, 0, 0)));
    assert!(by_talent.contains(&(1, 1, 1)));
    assert!(by_talent.contains(&(0, 0, 2)));
}
