use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single post as delivered by a fetch batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub reply_count_hint: u32,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl Post {
    pub fn new(id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            timestamp,
            reply_count_hint: 0,
            author: String::new(),
            text: String::new(),
            url: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_reply_count_hint(mut self, hint: u32) -> Self {
        self.reply_count_hint = hint;
        self
    }

    /// Overwrites the mutable payload with `other`, keeping `id` and
    /// `parent_id`. Returns whether anything changed.
    pub(crate) fn merge_from(&mut self, other: &Post) -> bool {
        let mut changed = false;
        if self.timestamp != other.timestamp {
            self.timestamp = other.timestamp;
            changed = true;
        }
        if self.reply_count_hint != other.reply_count_hint {
            self.reply_count_hint = other.reply_count_hint;
            changed = true;
        }
        if self.author != other.author {
            self.author.clone_from(&other.author);
            changed = true;
        }
        if self.text != other.text {
            self.text.clone_from(&other.text);
            changed = true;
        }
        if self.url != other.url {
            self.url.clone_from(&other.url);
            changed = true;
        }
        changed
    }
}

/// Whether a node's replies have been fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

impl LoadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadState::Unloaded => "unloaded",
            LoadState::Loading => "loading",
            LoadState::Loaded => "loaded",
            LoadState::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostNode {
    post: Post,
    child_ids: Vec<String>,
    load_state: LoadState,
    depth: usize,
}

impl PostNode {
    pub(crate) fn new(post: Post, depth: usize) -> Self {
        Self {
            post,
            child_ids: Vec::new(),
            load_state: LoadState::Unloaded,
            depth,
        }
    }

    pub fn id(&self) -> &str {
        &self.post.id
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.post.parent_id.as_deref()
    }

    pub fn post(&self) -> &Post {
        &self.post
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.post.timestamp
    }

    pub fn reply_count_hint(&self) -> u32 {
        self.post.reply_count_hint
    }

    pub fn child_ids(&self) -> &[String] {
        &self.child_ids
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_root(&self) -> bool {
        self.post.parent_id.is_none()
    }

    /// The hint says more replies exist than we hold and no complete batch
    /// has been seen since.
    pub fn has_unfetched_replies(&self) -> bool {
        self.load_state != LoadState::Loaded
            && self.post.reply_count_hint as usize > self.child_ids.len()
    }

    pub(crate) fn post_mut(&mut self) -> &mut Post {
        &mut self.post
    }

    pub(crate) fn push_child(&mut self, id: &str) -> bool {
        if self.child_ids.iter().any(|existing| existing == id) {
            return false;
        }
        self.child_ids.push(id.to_string());
        true
    }

    pub(crate) fn set_load_state(&mut self, state: LoadState) -> bool {
        if self.load_state == state {
            return false;
        }
        self.load_state = state;
        true
    }
}
