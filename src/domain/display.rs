//! Terminal rendering of talent trees with `termtree`.
//!
//! Talents with several parents appear once below each parent.

use termtree::Tree;

use crate::domain::talent::TalentId;
use crate::domain::tree::TalentTree;

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

impl TreeNodeConvert for TalentTree {
    fn to_tree_string(&self) -> Tree<String> {
        fn build(tree: &TalentTree, id: TalentId, depth: usize) -> Tree<String> {
            let Some(talent) = tree.get(id) else {
                return Tree::new("?".to_string());
            };
            let mut label = talent.to_string();
            if talent.points_required > 0 {
                label.push_str(&format!(" [req {}]", talent.points_required));
            }
            if talent.is_expanded {
                label.push_str(&format!(" #{}", talent.expansion_index));
            }
            let mut node = Tree::new(label);
            // depth is bounded by the node count on acyclic trees
            if depth < tree.len() {
                for &child in talent.children() {
                    node.push(build(tree, child, depth + 1));
                }
            }
            node
        }

        let title = format!(
            "{} ({} talents, {} points)",
            self.name,
            self.node_count(),
            self.max_talent_points()
        );
        let leaves: Vec<_> = self.roots().iter().map(|&root| build(self, root, 0)).collect();
        Tree::new(title).with_leaves(leaves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::talent::Talent;

    #[test]
    fn given_small_tree_when_rendering_then_children_nested() {
        let mut tree = TalentTree::new("demo");
        let a = tree.add_talent(Talent::new(0, "root", 1));
        let b = tree.add_talent(Talent::new(1, "leaf", 2).with_points_required(1));
        tree.link(a, b);
        tree.recompute();

        let rendered = tree.to_tree_string().to_string();
        assert!(rendered.starts_with("demo (2 talents, 3 points)"));
        assert!(rendered.contains("0 root (0/1)"));
        assert!(rendered.contains("1 leaf (0/2) [req 1]"));
    }
}
