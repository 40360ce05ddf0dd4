use std::collections::VecDeque;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::navigator::ThreadNavigator;
use crate::post::Post;

pub const HN_API_BASE: &str = "https://hacker-news.firebaseio.com/v0/";
pub const HN_ITEM_URL: &str = "https://news.ycombinator.com/item";

/// A post together with the ids of its direct replies, which the tree only
/// learns about once those replies are fetched themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedItem {
    pub post: Post,
    pub reply_ids: Vec<String>,
}

pub trait ReplySource {
    /// `Ok(None)` means the item exists but should not be shown (deleted or
    /// dead).
    fn fetch_item(&self, id: &str) -> Result<Option<FetchedItem>>;
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub user_agent: String,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: Url,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("hackernews client user agent required");
        }

        let mut base = config
            .base_url
            .unwrap_or_else(|| HN_API_BASE.to_string());
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).with_context(|| format!("invalid base url {base}"))?;

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(20)))
                .build()?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
        })
    }

    pub fn get_item(&self, id: &str) -> Result<Option<Item>> {
        let url = self
            .base_url
            .join(&format!("item/{id}.json"))
            .with_context(|| format!("build item url for {id}"))?;
        let item: Option<Item> = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()?
            .error_for_status()?
            .json()
            .with_context(|| format!("decode item {id}"))?;
        Ok(item)
    }
}

pub struct HackerNewsSource {
    client: Client,
}

impl HackerNewsSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl ReplySource for HackerNewsSource {
    fn fetch_item(&self, id: &str) -> Result<Option<FetchedItem>> {
        match self.client.get_item(id)? {
            Some(item) => Ok(item.into_fetched()),
            None => Err(anyhow!("item {id} does not exist")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub by: Option<String>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub dead: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub parent: Option<i64>,
    #[serde(default)]
    pub kids: Option<Vec<i64>>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl Item {
    pub fn into_fetched(self) -> Option<FetchedItem> {
        if self.deleted || self.dead {
            return None;
        }

        let reply_ids: Vec<String> = self
            .kids
            .unwrap_or_default()
            .iter()
            .map(|kid| kid.to_string())
            .collect();
        let text = match (self.title, self.text) {
            (Some(title), Some(text)) if !text.is_empty() => format!("{title}\n\n{text}"),
            (Some(title), _) => title,
            (None, text) => text.unwrap_or_default(),
        };
        let timestamp = self
            .time
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .unwrap_or_default();
        let is_story = self.item_type == "story";
        let url = self
            .url
            .or_else(|| is_story.then(|| format!("{}?id={}", HN_ITEM_URL, self.id)));

        Some(FetchedItem {
            post: Post {
                id: self.id.to_string(),
                parent_id: self.parent.map(|parent| parent.to_string()),
                timestamp,
                reply_count_hint: reply_ids.len() as u32,
                author: self.by.unwrap_or_default(),
                text,
                url,
            },
            reply_ids,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub posts: usize,
    pub failed: Vec<String>,
    pub truncated: Vec<String>,
}

/// Walks a thread breadth-first, pushing each parent's replies into the
/// navigator as one batch.
pub struct ThreadLoader<'a> {
    source: &'a dyn ReplySource,
    max_depth: usize,
    max_replies_per_node: usize,
}

impl<'a> ThreadLoader<'a> {
    pub fn new(source: &'a dyn ReplySource, max_depth: usize, max_replies_per_node: usize) -> Self {
        Self {
            source,
            max_depth,
            max_replies_per_node,
        }
    }

    pub fn load(&self, navigator: &mut ThreadNavigator, root_id: &str) -> Result<LoadReport> {
        let root = self
            .source
            .fetch_item(root_id)
            .with_context(|| format!("fetch root item {root_id}"))?
            .ok_or_else(|| anyhow!("item {root_id} is deleted or unavailable"))?;

        navigator.upsert_root(root.post)?;
        let mut report = LoadReport {
            posts: 1,
            ..LoadReport::default()
        };
        self.load_below(navigator, root_id.to_string(), root.reply_ids, 0, &mut report)?;
        Ok(report)
    }

    /// Fetches `levels` more levels of replies under an already known post.
    pub fn load_replies(
        &self,
        navigator: &mut ThreadNavigator,
        id: &str,
        levels: usize,
    ) -> Result<LoadReport> {
        let depth = navigator.tree().depth_of(id)?;
        let mut report = LoadReport::default();
        if levels == 0 {
            return Ok(report);
        }

        navigator.mark_loading(id)?;
        let refreshed = match self.source.fetch_item(id) {
            Ok(Some(item)) => item,
            Ok(None) => {
                navigator.upsert_replies(id, Vec::new(), true)?;
                return Ok(report);
            }
            Err(err) => {
                warn!(post = id, error = %err, "failed to refresh post");
                navigator.mark_failed(id)?;
                report.failed.push(id.to_string());
                return Ok(report);
            }
        };

        navigator.refresh_post(refreshed.post)?;

        let limit = ThreadLoader {
            source: self.source,
            max_depth: depth + levels,
            max_replies_per_node: self.max_replies_per_node,
        };
        limit.load_below(navigator, id.to_string(), refreshed.reply_ids, depth, &mut report)?;
        Ok(report)
    }

    fn load_below(
        &self,
        navigator: &mut ThreadNavigator,
        start: String,
        reply_ids: Vec<String>,
        start_depth: usize,
        report: &mut LoadReport,
    ) -> Result<()> {
        let mut queue = VecDeque::from([(start, reply_ids, start_depth)]);

        while let Some((parent, reply_ids, depth)) = queue.pop_front() {
            if depth >= self.max_depth {
                continue;
            }
            if reply_ids.is_empty() {
                navigator.upsert_replies(&parent, Vec::new(), true)?;
                continue;
            }

            navigator.mark_loading(&parent)?;
            let truncated = reply_ids.len() > self.max_replies_per_node;
            let mut batch = Vec::new();
            let mut failures = 0usize;

            for reply_id in reply_ids.iter().take(self.max_replies_per_node) {
                match self.source.fetch_item(reply_id) {
                    Ok(Some(item)) => {
                        queue.push_back((item.post.id.clone(), item.reply_ids, depth + 1));
                        batch.push(item.post);
                    }
                    Ok(None) => debug!(post = %reply_id, "skipping deleted reply"),
                    Err(err) => {
                        warn!(post = %reply_id, error = %err, "failed to fetch reply");
                        failures += 1;
                    }
                }
            }

            report.posts += batch.len();
            let complete = failures == 0 && !truncated;
            navigator.upsert_replies(&parent, batch, complete)?;
            if failures > 0 {
                navigator.mark_failed(&parent)?;
                report.failed.push(parent);
            } else if truncated {
                report.truncated.push(parent);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    use crate::post::LoadState;

    #[derive(Default)]
    struct MockSource {
        items: HashMap<String, Item>,
        failing: HashSet<String>,
    }

    impl MockSource {
        fn add(&mut self, id: i64, parent: Option<i64>, time: i64, kids: &[i64]) {
            self.items.insert(
                id.to_string(),
                Item {
                    id,
                    item_type: (if parent.is_some() { "comment" } else { "story" }).into(),
                    by: Some(format!("user{id}")),
                    time: Some(time),
                    text: Some(format!("text {id}")),
                    dead: false,
                    deleted: false,
                    parent,
                    kids: (!kids.is_empty()).then(|| kids.to_vec()),
                    url: None,
                    title: parent.is_none().then(|| "Show HN: thing".to_string()),
                },
            );
        }
    }

    impl ReplySource for MockSource {
        fn fetch_item(&self, id: &str) -> Result<Option<FetchedItem>> {
            if self.failing.contains(id) {
                bail!("simulated failure for {id}");
            }
            let item = self
                .items
                .get(id)
                .cloned()
                .ok_or_else(|| anyhow!("no item {id}"))?;
            Ok(item.into_fetched())
        }
    }

    fn thread() -> MockSource {
        let mut source = MockSource::default();
        source.add(1, None, 100, &[2, 3]);
        source.add(2, Some(1), 150, &[4]);
        source.add(3, Some(1), 120, &[]);
        source.add(4, Some(2), 110, &[5]);
        source.add(5, Some(4), 200, &[]);
        source
    }

    #[test]
    fn decodes_api_payload() {
        let item: Item = serde_json::from_str(
            r#"{"by":"dang","id":42,"kids":[43,44],"parent":7,"text":"hi","time":1700000000,"type":"comment"}"#,
        )
        .unwrap();
        let fetched = item.into_fetched().unwrap();
        assert_eq!(fetched.post.id, "42");
        assert_eq!(fetched.post.parent_id.as_deref(), Some("7"));
        assert_eq!(fetched.post.reply_count_hint, 2);
        assert_eq!(fetched.post.timestamp.timestamp(), 1_700_000_000);
        assert_eq!(fetched.reply_ids, ["43", "44"]);
        assert_eq!(fetched.post.url, None);
    }

    #[test]
    fn deleted_items_are_hidden() {
        let item: Item =
            serde_json::from_str(r#"{"id":9,"deleted":true,"type":"comment","parent":1}"#).unwrap();
        assert!(item.into_fetched().is_none());
    }

    #[test]
    fn loads_whole_thread_in_chronological_order() {
        let source = thread();
        let mut nav = ThreadNavigator::new();
        let report = ThreadLoader::new(&source, 8, 200).load(&mut nav, "1").unwrap();

        assert_eq!(report.posts, 5);
        assert!(report.failed.is_empty());
        assert_eq!(nav.cursor(), Some("1"));
        assert_eq!(nav.sequence().to_vec(), ["1", "4", "3", "2", "5"]);
        assert_eq!(nav.tree().depth_of("5").unwrap(), 3);
        assert_eq!(
            nav.tree().get_node("1").unwrap().load_state(),
            LoadState::Loaded
        );
        assert!(nav.current_post().unwrap().text.starts_with("Show HN"));
    }

    #[test]
    fn depth_limit_leaves_deeper_replies_unloaded() {
        let source = thread();
        let mut nav = ThreadNavigator::new();
        ThreadLoader::new(&source, 1, 200).load(&mut nav, "1").unwrap();

        assert_eq!(nav.tree().len(), 3);
        let node = nav.tree().get_node("2").unwrap();
        assert_eq!(node.load_state(), LoadState::Unloaded);
        assert!(node.has_unfetched_replies());

        let report = ThreadLoader::new(&source, 1, 200)
            .load_replies(&mut nav, "2", 1)
            .unwrap();
        assert_eq!(report.posts, 1);
        assert_eq!(nav.tree().children_of("2"), ["4".to_string()]);
        assert!(!nav.tree().contains("5"));
        assert_eq!(
            nav.tree().get_node("2").unwrap().load_state(),
            LoadState::Loaded
        );
    }

    #[test]
    fn failures_mark_the_parent_and_keep_going() {
        let mut source = thread();
        source.failing.insert("3".into());
        let mut nav = ThreadNavigator::new();
        let report = ThreadLoader::new(&source, 8, 200).load(&mut nav, "1").unwrap();

        assert_eq!(report.failed, ["1"]);
        assert_eq!(nav.tree().get_node("1").unwrap().load_state(), LoadState::Failed);
        assert!(nav.tree().contains("5"));
    }

    #[test]
    fn refreshing_a_reply_keeps_the_parent_failure() {
        let mut source = thread();
        source.failing.insert("3".into());
        let mut nav = ThreadNavigator::new();
        ThreadLoader::new(&source, 1, 200).load(&mut nav, "1").unwrap();
        assert_eq!(nav.tree().get_node("1").unwrap().load_state(), LoadState::Failed);

        let report = ThreadLoader::new(&source, 1, 200)
            .load_replies(&mut nav, "2", 1)
            .unwrap();
        assert_eq!(report.posts, 1);
        assert_eq!(nav.tree().get_node("1").unwrap().load_state(), LoadState::Failed);
        assert_eq!(nav.tree().get_node("2").unwrap().load_state(), LoadState::Loaded);
        assert_eq!(nav.tree().children_of("1"), ["2".to_string()]);
    }

    #[test]
    fn zero_levels_leaves_the_post_untouched() {
        let source = thread();
        let mut nav = ThreadNavigator::new();
        ThreadLoader::new(&source, 1, 200).load(&mut nav, "1").unwrap();

        let report = ThreadLoader::new(&source, 1, 200)
            .load_replies(&mut nav, "2", 0)
            .unwrap();
        assert_eq!(report, LoadReport::default());
        assert_eq!(
            nav.tree().get_node("2").unwrap().load_state(),
            LoadState::Unloaded
        );
        assert!(!nav.tree().contains("4"));
    }

    #[test]
    fn truncated_batches_stay_incomplete() {
        let source = thread();
        let mut nav = ThreadNavigator::new();
        let report = ThreadLoader::new(&source, 1, 1).load(&mut nav, "1").unwrap();

        assert_eq!(report.truncated, ["1"]);
        assert_eq!(nav.tree().children_of("1"), ["2".to_string()]);
        assert_eq!(nav.tree().get_node("1").unwrap().load_state(), LoadState::Loading);
    }

    #[test]
    fn missing_root_is_an_error() {
        let source = MockSource::default();
        let mut nav = ThreadNavigator::new();
        assert!(ThreadLoader::new(&source, 8, 200).load(&mut nav, "1").is_err());
        assert!(nav.tree().is_empty());
    }

    #[test]
    fn client_requires_user_agent() {
        assert!(Client::new(ClientConfig::default()).is_err());
    }
}
