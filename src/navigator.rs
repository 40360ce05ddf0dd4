//! Cursor over a thread's chronological view.
//!
//! The navigator owns the tree so it can place the cursor on the root as soon
//! as the root is known. Moves never wrap: they report whether they moved and
//! leave looping to the caller (see [`crate::slideshow`]).

use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, ThreadError};
use crate::post::{LoadState, Post};
use crate::tree::{ThreadTree, UpsertSummary};

/// Structural metadata about the node under the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentNode {
    pub id: String,
    pub parent_id: Option<String>,
    pub depth: usize,
    pub child_count: usize,
    pub load_state: LoadState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorChange {
    pub previous: Option<String>,
    pub current: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&CursorChange)>;

#[derive(Default)]
pub struct ThreadNavigator {
    tree: ThreadTree,
    cursor: Option<String>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl ThreadNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tree(tree: ThreadTree) -> Self {
        let mut navigator = Self {
            tree,
            ..Self::default()
        };
        navigator.cursor = navigator.tree.root_id().map(str::to_string);
        navigator
    }

    pub fn tree(&self) -> &ThreadTree {
        &self.tree
    }

    pub fn upsert_root(&mut self, post: Post) -> Result<UpsertSummary> {
        let summary = self.tree.upsert_root(post)?;
        if self.cursor.is_none() {
            self.move_to_root();
        }
        Ok(summary)
    }

    pub fn upsert_replies<I>(
        &mut self,
        parent_id: &str,
        posts: I,
        complete: bool,
    ) -> Result<UpsertSummary>
    where
        I: IntoIterator<Item = Post>,
    {
        self.tree.upsert_replies(parent_id, posts, complete)
    }

    pub fn refresh_post(&mut self, post: Post) -> Result<UpsertSummary> {
        self.tree.refresh_post(post)
    }

    pub fn mark_loading(&mut self, id: &str) -> Result<()> {
        self.tree.mark_loading(id)
    }

    pub fn mark_failed(&mut self, id: &str) -> Result<()> {
        self.tree.mark_failed(id)
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn sequence(&self) -> Arc<[String]> {
        self.tree.sequence()
    }

    /// Zero-based index of the cursor and the sequence length.
    pub fn position(&self) -> Option<(usize, usize)> {
        let cursor = self.cursor.as_deref()?;
        let index = self.tree.index().index_of(cursor)?;
        Some((index, self.tree.index().len()))
    }

    pub fn move_to_next(&mut self) -> bool {
        self.step(1)
    }

    pub fn move_to_prev(&mut self) -> bool {
        self.step(-1)
    }

    fn step(&mut self, delta: isize) -> bool {
        let Some((index, _)) = self.position() else {
            return false;
        };
        let Some(target) = index
            .checked_add_signed(delta)
            .and_then(|next| self.tree.index().get(next))
            .map(str::to_string)
        else {
            return false;
        };
        self.set_cursor(target);
        true
    }

    pub fn move_to(&mut self, id: &str) -> Result<()> {
        if !self.tree.contains(id) {
            debug!(post = id, "ignoring move to unknown post");
            return Err(ThreadError::UnknownNode(id.to_string()));
        }
        self.set_cursor(id.to_string());
        Ok(())
    }

    pub fn move_to_root(&mut self) -> bool {
        let Some(root) = self.tree.root_id().map(str::to_string) else {
            return false;
        };
        self.set_cursor(root);
        true
    }

    pub fn current_post(&self) -> Option<&Post> {
        let cursor = self.cursor.as_deref()?;
        self.tree.get_node(cursor).map(|node| node.post())
    }

    pub fn current_depth(&self) -> Option<usize> {
        let cursor = self.cursor.as_deref()?;
        self.tree.depth_of(cursor).ok()
    }

    pub fn current_node(&self) -> Option<CurrentNode> {
        let cursor = self.cursor.as_deref()?;
        let node = self.tree.get_node(cursor)?;
        Some(CurrentNode {
            id: node.id().to_string(),
            parent_id: node.parent_id().map(str::to_string),
            depth: node.depth(),
            child_count: node.child_ids().len(),
            load_state: node.load_state(),
        })
    }

    /// Registers `listener` to run after every cursor change.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&CursorChange) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    fn set_cursor(&mut self, target: String) {
        if self.cursor.as_deref() == Some(target.as_str()) {
            return;
        }
        debug!(from = ?self.cursor, to = %target, "cursor moved");
        let change = CursorChange {
            previous: self.cursor.replace(target.clone()),
            current: target,
        };
        for (_, listener) in &mut self.listeners {
            listener(&change);
        }
    }
}

impl std::fmt::Debug for ThreadNavigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadNavigator")
            .field("tree", &self.tree)
            .field("cursor", &self.cursor)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn post(id: &str, secs: i64) -> Post {
        Post::new(id, Utc.timestamp_opt(secs, 0).unwrap())
    }

    fn sample() -> ThreadNavigator {
        let mut nav = ThreadNavigator::new();
        nav.upsert_root(post("R", 0)).unwrap();
        nav.upsert_replies("R", [post("A", 5), post("B", 2)], true)
            .unwrap();
        nav.upsert_replies("B", [post("C", 1)], true).unwrap();
        nav
    }

    #[test]
    fn cursor_starts_unset_then_lands_on_root() {
        let mut nav = ThreadNavigator::new();
        assert_eq!(nav.cursor(), None);
        assert!(!nav.move_to_next());
        assert!(!nav.move_to_prev());
        assert!(!nav.move_to_root());
        assert!(nav.current_post().is_none());

        nav.upsert_root(post("R", 0)).unwrap();
        assert_eq!(nav.cursor(), Some("R"));
        assert_eq!(nav.current_depth(), Some(0));
    }

    #[test]
    fn wrapping_a_prebuilt_tree_starts_at_root() {
        let mut tree = ThreadTree::new();
        tree.upsert_root(post("R", 0)).unwrap();
        tree.upsert_replies("R", [post("A", 1)], true).unwrap();
        let mut nav = ThreadNavigator::with_tree(tree);
        assert_eq!(nav.cursor(), Some("R"));
        assert!(nav.move_to_next());
        assert_eq!(nav.position(), Some((1, 2)));
    }

    #[test]
    fn root_then_next_reaches_earliest_reply() {
        let mut nav = sample();
        assert!(nav.move_to_root());
        assert!(nav.move_to_next());
        assert_eq!(nav.cursor(), Some("C"));
        assert_eq!(nav.current_depth(), Some(2));
        assert_eq!(nav.position(), Some((1, 4)));
        assert_eq!(
            nav.current_node(),
            Some(CurrentNode {
                id: "C".into(),
                parent_id: Some("B".into()),
                depth: 2,
                child_count: 0,
                load_state: LoadState::Unloaded,
            })
        );
    }

    #[test]
    fn next_then_prev_round_trips() {
        let mut nav = sample();
        nav.move_to("B").unwrap();
        assert!(nav.move_to_next());
        assert!(nav.move_to_prev());
        assert_eq!(nav.cursor(), Some("B"));
    }

    #[test]
    fn no_wraparound_at_either_end() {
        let mut nav = sample();
        nav.move_to("A").unwrap();
        assert!(!nav.move_to_next());
        assert_eq!(nav.cursor(), Some("A"));

        nav.move_to_root();
        assert!(!nav.move_to_prev());
        assert_eq!(nav.cursor(), Some("R"));
    }

    #[test]
    fn move_to_unknown_keeps_cursor() {
        let mut nav = sample();
        nav.move_to("B").unwrap();
        assert_eq!(
            nav.move_to("unknown"),
            Err(ThreadError::UnknownNode("unknown".into()))
        );
        assert_eq!(nav.cursor(), Some("B"));
    }

    #[test]
    fn move_to_root_is_idempotent() {
        let mut nav = sample();
        nav.move_to("A").unwrap();
        assert!(nav.move_to_root());
        assert!(nav.move_to_root());
        assert_eq!(nav.cursor(), Some("R"));
    }

    #[test]
    fn growth_extends_a_finished_walk() {
        let mut nav = sample();
        nav.move_to("A").unwrap();
        assert!(!nav.move_to_next());

        nav.upsert_replies("C", [post("D", 9)], true).unwrap();
        assert_eq!(nav.cursor(), Some("A"));
        assert!(nav.move_to_next());
        assert_eq!(nav.cursor(), Some("D"));
        assert_eq!(nav.current_depth(), Some(3));
    }

    #[test]
    fn listeners_see_effective_moves_only() {
        let mut nav = sample();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = nav.subscribe(move |change| sink.borrow_mut().push(change.clone()));

        nav.move_to_root();
        nav.move_to_next();
        let _ = nav.move_to("missing");
        nav.move_to("A").unwrap();
        assert!(!nav.move_to_next());

        assert_eq!(
            *seen.borrow(),
            vec![
                CursorChange {
                    previous: Some("R".into()),
                    current: "C".into()
                },
                CursorChange {
                    previous: Some("C".into()),
                    current: "A".into()
                },
            ]
        );

        assert!(nav.unsubscribe(id));
        assert!(!nav.unsubscribe(id));
        nav.move_to_root();
        assert_eq!(seen.borrow().len(), 2);
    }
}
