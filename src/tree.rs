use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::chronology::ChronologicalIndex;
use crate::error::{Result, ThreadError};
use crate::post::{LoadState, Post, PostNode};

/// Ids touched by a single upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub inserted: Vec<String>,
    pub updated: Vec<String>,
}

impl UpsertSummary {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty()
    }
}

/// Canonical storage for one thread, anchored at a single root post.
///
/// Nodes are admitted top-down only: a reply batch is rejected unless its
/// parent is already known, so every node stays reachable from the root and
/// a node's depth is fixed the moment it is admitted.
#[derive(Debug, Clone, Default)]
pub struct ThreadTree {
    root_id: Option<String>,
    nodes: HashMap<String, PostNode>,
    index: ChronologicalIndex,
}

impl ThreadTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_root(&mut self, mut post: Post) -> Result<UpsertSummary> {
        post.parent_id = None;
        let mut summary = UpsertSummary::default();

        let current_root = self.root_id.clone();
        match current_root.as_deref() {
            Some(existing) if existing != post.id => {
                return Err(ThreadError::InvalidRoot {
                    existing: existing.to_string(),
                    attempted: post.id,
                });
            }
            Some(existing) => {
                let node = self
                    .nodes
                    .get_mut(existing)
                    .ok_or_else(|| ThreadError::UnknownNode(existing.to_string()))?;
                if node.post_mut().merge_from(&post) {
                    summary.updated.push(post.id.clone());
                }
            }
            None => {
                self.root_id = Some(post.id.clone());
                summary.inserted.push(post.id.clone());
                self.nodes.insert(post.id.clone(), PostNode::new(post, 0));
            }
        }

        self.reindex(&summary);
        debug!(
            inserted = summary.inserted.len(),
            updated = summary.updated.len(),
            "upserted thread root"
        );
        Ok(summary)
    }

    /// Admits a batch of direct replies to `parent_id`.
    ///
    /// A post that is already known keeps its original parent; only its
    /// payload is merged. `complete` marks the parent as fully loaded.
    pub fn upsert_replies<I>(
        &mut self,
        parent_id: &str,
        posts: I,
        complete: bool,
    ) -> Result<UpsertSummary>
    where
        I: IntoIterator<Item = Post>,
    {
        let parent_depth = match self.nodes.get(parent_id) {
            Some(parent) => parent.depth(),
            None => {
                warn!(parent = parent_id, "rejecting reply batch for unknown parent");
                return Err(ThreadError::UnknownParent(parent_id.to_string()));
            }
        };

        let mut summary = UpsertSummary::default();
        let mut attach = Vec::new();

        for mut post in posts {
            if let Some(existing) = self.nodes.get_mut(&post.id) {
                if existing.post_mut().merge_from(&post) && !summary.updated.contains(&post.id) {
                    summary.updated.push(post.id.clone());
                }
                if existing.parent_id() == Some(parent_id) {
                    attach.push(post.id);
                } else {
                    debug!(
                        post = %post.id,
                        parent = parent_id,
                        "post already attached elsewhere, keeping original parent"
                    );
                }
                continue;
            }

            post.parent_id = Some(parent_id.to_string());
            summary.inserted.push(post.id.clone());
            attach.push(post.id.clone());
            self.nodes
                .insert(post.id.clone(), PostNode::new(post, parent_depth + 1));
        }

        if let Some(parent) = self.nodes.get_mut(parent_id) {
            for id in &attach {
                parent.push_child(id);
            }
            if complete {
                parent.set_load_state(LoadState::Loaded);
            } else if matches!(
                parent.load_state(),
                LoadState::Unloaded | LoadState::Failed
            ) {
                parent.set_load_state(LoadState::Loading);
            }
        }

        self.reindex(&summary);
        debug!(
            parent = parent_id,
            inserted = summary.inserted.len(),
            updated = summary.updated.len(),
            complete,
            "upserted reply batch"
        );
        Ok(summary)
    }

    /// Merges a fresh copy of an already known post. Parent links, children
    /// and load states are left alone.
    pub fn refresh_post(&mut self, post: Post) -> Result<UpsertSummary> {
        let node = self
            .nodes
            .get_mut(&post.id)
            .ok_or_else(|| ThreadError::UnknownNode(post.id.clone()))?;
        let mut summary = UpsertSummary::default();
        if node.post_mut().merge_from(&post) {
            summary.updated.push(post.id.clone());
        }
        self.reindex(&summary);
        Ok(summary)
    }

    fn reindex(&mut self, summary: &UpsertSummary) {
        let nodes = &self.nodes;
        let touched = summary
            .inserted
            .iter()
            .chain(summary.updated.iter())
            .filter_map(|id| nodes.get(id).map(|node| (id.as_str(), node.timestamp())));
        self.index.notify_inserted(touched);
    }

    pub fn mark_loading(&mut self, id: &str) -> Result<()> {
        self.set_load_state(id, LoadState::Loading)
    }

    pub fn mark_failed(&mut self, id: &str) -> Result<()> {
        self.set_load_state(id, LoadState::Failed)
    }

    fn set_load_state(&mut self, id: &str, state: LoadState) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| ThreadError::UnknownNode(id.to_string()))?;
        if node.set_load_state(state) {
            debug!(post = id, state = state.as_str(), "load state changed");
        }
        Ok(())
    }

    pub fn get_node(&self, id: &str) -> Option<&PostNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn children_of(&self, id: &str) -> &[String] {
        self.nodes
            .get(id)
            .map(|node| node.child_ids())
            .unwrap_or(&[])
    }

    pub fn depth_of(&self, id: &str) -> Result<usize> {
        self.nodes
            .get(id)
            .map(|node| node.depth())
            .ok_or_else(|| ThreadError::UnknownNode(id.to_string()))
    }

    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).and_then(|node| node.parent_id())
    }

    pub fn root_id(&self) -> Option<&str> {
        self.root_id.as_deref()
    }

    pub fn root(&self) -> Option<&PostNode> {
        self.root_id.as_deref().and_then(|id| self.nodes.get(id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of known replies below `id`, at any depth.
    pub fn descendant_count(&self, id: &str) -> usize {
        let mut total = 0;
        let mut stack: Vec<&str> = self.children_of(id).iter().map(String::as_str).collect();
        while let Some(next) = stack.pop() {
            total += 1;
            stack.extend(self.children_of(next).iter().map(String::as_str));
        }
        total
    }

    /// Pre-order walk from the root following `child_ids`, with depths.
    pub fn hierarchical_order(&self) -> Vec<(&str, usize)> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let Some(root) = self.root() else {
            return order;
        };
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            order.push((node.id(), node.depth()));
            stack.extend(
                node.child_ids()
                    .iter()
                    .rev()
                    .filter_map(|child| self.nodes.get(child)),
            );
        }
        order
    }

    pub fn sequence(&self) -> Arc<[String]> {
        self.index.sequence()
    }

    pub fn index(&self) -> &ChronologicalIndex {
        &self.index
    }
}
