use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::hackernews::HN_API_BASE;

const DEFAULT_ENV_PREFIX: &str = "HN_THREAD";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub hackernews: HackerNewsConfig,
    #[serde(default)]
    pub thread: ThreadConfig,
    #[serde(default)]
    pub slideshow: SlideshowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HackerNewsConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for HackerNewsConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            base_url: default_base_url(),
            timeout: default_timeout(),
        }
    }
}

fn default_user_agent() -> String {
    format!("hn-thread/{}", crate::VERSION)
}

fn default_base_url() -> String {
    HN_API_BASE.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThreadConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_max_replies_per_node")]
    pub max_replies_per_node: usize,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_replies_per_node: default_max_replies_per_node(),
        }
    }
}

fn default_max_depth() -> usize {
    8
}

fn default_max_replies_per_node() -> usize {
    200
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlideshowConfig {
    #[serde(default = "default_autoplay_interval", with = "humantime_serde")]
    pub autoplay_interval: Duration,
}

impl Default for SlideshowConfig {
    fn default() -> Self {
        Self {
            autoplay_interval: default_autoplay_interval(),
        }
    }
}

fn default_autoplay_interval() -> Duration {
    crate::slideshow::DEFAULT_AUTOPLAY_INTERVAL
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.hackernews.user_agent.trim().is_empty() {
        base.hackernews.user_agent = other.hackernews.user_agent;
    }
    if !other.hackernews.base_url.trim().is_empty() {
        base.hackernews.base_url = other.hackernews.base_url;
    }
    if !other.hackernews.timeout.is_zero() {
        base.hackernews.timeout = other.hackernews.timeout;
    }

    if other.thread.max_depth != 0 {
        base.thread.max_depth = other.thread.max_depth;
    }
    if other.thread.max_replies_per_node != 0 {
        base.thread.max_replies_per_node = other.thread.max_replies_per_node;
    }

    if !other.slideshow.autoplay_interval.is_zero() {
        base.slideshow.autoplay_interval = other.slideshow.autoplay_interval;
    }

    base
}

fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "hackernews.user_agent" if !value.trim().is_empty() => cfg.hackernews.user_agent = value,
        "hackernews.base_url" if !value.trim().is_empty() => cfg.hackernews.base_url = value,
        "hackernews.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.hackernews.timeout = duration;
            }
        }
        "thread.max_depth" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.thread.max_depth = parsed;
            }
        }
        "thread.max_replies_per_node" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.thread.max_replies_per_node = parsed;
            }
        }
        "slideshow.autoplay_interval" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.slideshow.autoplay_interval = duration;
            }
        }
        _ => {}
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("hn-thread").join("config.yaml"))
}
