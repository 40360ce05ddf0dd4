use std::collections::{HashMap, HashSet};

use crate::tree::ThreadTree;

/// One visible line of the nested view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRow {
    pub id: String,
    pub depth: usize,
    pub descendant_count: usize,
    pub collapsed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldOutcome {
    Collapsed { replies: usize },
    Expanded,
    NoReplies,
    UnknownPost,
}

/// Fold state for the hierarchical view. Folds are keyed by post id so
/// they survive the tree growing underneath them.
#[derive(Debug, Clone, Default)]
pub struct HierarchicalView {
    collapsed: HashSet<String>,
}

impl HierarchicalView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_fold(&mut self, tree: &ThreadTree, id: &str) -> FoldOutcome {
        if !tree.contains(id) {
            return FoldOutcome::UnknownPost;
        }
        if self.collapsed.remove(id) {
            return FoldOutcome::Expanded;
        }
        let replies = tree.descendant_count(id);
        if replies == 0 {
            return FoldOutcome::NoReplies;
        }
        self.collapsed.insert(id.to_string());
        FoldOutcome::Collapsed { replies }
    }

    pub fn collapse(&mut self, id: &str) -> bool {
        self.collapsed.insert(id.to_string())
    }

    pub fn expand(&mut self, id: &str) -> bool {
        self.collapsed.remove(id)
    }

    pub fn expand_all(&mut self) -> bool {
        let had_folds = !self.collapsed.is_empty();
        self.collapsed.clear();
        had_folds
    }

    pub fn is_collapsed(&self, id: &str) -> bool {
        self.collapsed.contains(id)
    }

    /// Pre-order rows with the replies of collapsed posts hidden.
    pub fn visible_rows(&self, tree: &ThreadTree) -> Vec<ThreadRow> {
        let order = tree.hierarchical_order();
        let sizes = subtree_sizes(tree, &order);
        let mut rows = Vec::new();
        let mut hidden_depths: Vec<usize> = Vec::new();

        for &(id, depth) in &order {
            while hidden_depths.last().is_some_and(|hidden| *hidden >= depth) {
                hidden_depths.pop();
            }
            if !hidden_depths.is_empty() {
                continue;
            }

            let collapsed = self.collapsed.contains(id);
            if collapsed {
                hidden_depths.push(depth);
            }
            rows.push(ThreadRow {
                id: id.to_string(),
                depth,
                descendant_count: sizes.get(id).copied().unwrap_or_default(),
                collapsed,
            });
        }

        rows
    }
}

/// Descendant counts for every post, filled children-first by walking the
/// pre-order sequence backwards.
fn subtree_sizes<'a>(
    tree: &ThreadTree,
    order: &[(&'a str, usize)],
) -> HashMap<&'a str, usize> {
    let mut sizes: HashMap<&'a str, usize> = HashMap::with_capacity(order.len());
    for &(id, _) in order.iter().rev() {
        let total: usize = tree
            .children_of(id)
            .iter()
            .filter_map(|child| sizes.get(child.as_str()).map(|count| count + 1))
            .sum();
        sizes.insert(id, total);
    }
    sizes
}
