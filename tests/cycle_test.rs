//! Tests for cycle detection on trees, candidate insertions and raw strings.

use rstest::rstest;

use ttm::domain::{parse_tree, tree_string_has_cycle, CycleCheckGraph, DomainError, Talent, TalentTree};
use ttm::util::testing::{CHAIN_TREE, MIXED_TREE};

#[rstest]
#[case(CHAIN_TREE)]
#[case(MIXED_TREE)]
fn given_valid_tree_when_checking_then_no_cycle(#[case] rep: &str) {
    assert!(!tree_string_has_cycle(rep).unwrap());
    let tree = parse_tree(rep).unwrap();
    assert!(!tree.has_cycle());
    assert!(!CycleCheckGraph::from_tree(&tree).has_cycle());
}

#[test]
fn given_back_edge_in_string_when_checking_then_cycle_found() {
    let rep = "custom:t:::0:0;0:a::0:0:0:0:1:0:0::1;1:b::0:1:0:0:1:0:0::2;2:c::0:2:0:0:1:0:0::0;";
    assert!(tree_string_has_cycle(rep).unwrap());
}

#[test]
fn given_parents_field_closing_loop_in_string_when_checking_then_cycle_found() {
    // a lists b as child, b only appears as a's parent
    let rep = "custom:t:::0:0;0:a::0:0:0:0:1:0:0:1:1;1:b::0:1:0:0:1:0:0::;";
    assert!(tree_string_has_cycle(rep).unwrap());
}

#[test]
fn given_loop_unreachable_from_any_root_when_checking_tree_then_cycle_found() {
    // Arrange
    let mut tree = TalentTree::new("detached");
    tree.add_talent(Talent::new(0, "root", 1));
    let a = tree.add_talent(Talent::new(1, "a", 1));
    let b = tree.add_talent(Talent::new(2, "b", 1));
    tree.link(a, b);
    tree.link(b, a);
    tree.recompute();

    // Act
    let graph = CycleCheckGraph::from_tree(&tree);

    // Assert
    assert_eq!(graph.len(), tree.len());
    assert!(graph.has_cycle());
    assert!(tree.has_cycle());
}

#[test]
fn given_detached_loop_when_inserting_candidate_then_existing_cycle_reported() {
    let mut tree = TalentTree::new("detached");
    tree.add_talent(Talent::new(0, "root", 1));
    let a = tree.add_talent(Talent::new(1, "a", 1));
    let b = tree.add_talent(Talent::new(2, "b", 1));
    tree.link(a, b);
    tree.link(b, a);
    tree.recompute();

    assert!(tree.would_insert_cycle(&[0], &[]).unwrap());
}

#[test]
fn given_cycle_in_second_component_when_checking_then_found() {
    let graph = CycleCheckGraph::new(vec![vec![1], vec![], vec![3], vec![2]]);
    assert!(graph.has_cycle());
}

#[test]
fn given_candidate_closing_loop_when_inserting_then_rejected_and_tree_unchanged() {
    let mut tree = parse_tree(CHAIN_TREE).unwrap();
    let before = tree.node_count();

    // parent C and child A would close A -> B -> C -> new -> A
    assert!(tree.would_insert_cycle(&[2], &[0]).unwrap());
    let err = tree.insert_talent(Talent::new(3, "loop", 1), &[2], &[0]).unwrap_err();

    assert_eq!(err, DomainError::CycleDetected);
    assert_eq!(tree.node_count(), before);
    assert!(tree.by_index(3).is_none());
}

#[test]
fn given_candidate_extending_chain_when_inserting_then_linked() {
    let mut tree = parse_tree(CHAIN_TREE).unwrap();

    assert!(!tree.would_insert_cycle(&[2], &[]).unwrap());
    tree.insert_talent(Talent::new(3, "D", 1), &[2], &[]).unwrap();

    assert_eq!(tree.node_count(), 4);
    assert_eq!(tree.depth(), 4);
    let d = tree.get(tree.by_index(3).unwrap()).unwrap();
    assert_eq!(d.parents().len(), 1);
}

#[test]
fn given_unknown_parent_when_inserting_then_unknown_talent() {
    let mut tree = parse_tree(CHAIN_TREE).unwrap();
    let err = tree.insert_talent(Talent::new(3, "D", 1), &[42], &[]).unwrap_err();
    assert_eq!(err, DomainError::UnknownTalent(42));
}
