use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use tracing::{info, warn};

use crate::config;
use crate::hackernews::{self, HackerNewsSource, ThreadLoader};
use crate::hierarchy::HierarchicalView;
use crate::navigator::ThreadNavigator;
use crate::post::{LoadState, PostNode};
use crate::slideshow::{SlideCommand, Slideshow};
use crate::tree::ThreadTree;

const WRAP_WIDTH: usize = 88;
const INPUT_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Tree,
    Slideshow,
}

#[derive(Debug, Clone, Default)]
pub struct Options {
    pub item_id: String,
    pub mode: Mode,
    pub config_file: Option<PathBuf>,
}

pub fn run(options: Options) -> Result<()> {
    let cfg = config::load(config::LoadOptions {
        config_file: options.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;

    let client = hackernews::Client::new(hackernews::ClientConfig {
        user_agent: cfg.hackernews.user_agent.clone(),
        base_url: Some(cfg.hackernews.base_url.clone()),
        timeout: Some(cfg.hackernews.timeout),
        http_client: None,
    })
    .context("create hackernews client")?;
    let source = HackerNewsSource::new(client);

    let mut navigator = ThreadNavigator::new();
    let loader = ThreadLoader::new(
        &source,
        cfg.thread.max_depth,
        cfg.thread.max_replies_per_node,
    );
    let report = loader
        .load(&mut navigator, &options.item_id)
        .with_context(|| format!("load thread {}", options.item_id))?;
    info!(posts = report.posts, "thread loaded");
    if !report.failed.is_empty() {
        warn!(parents = ?report.failed, "some replies could not be fetched");
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match options.mode {
        Mode::Tree => render_tree(&mut out, navigator.tree(), &HierarchicalView::new())?,
        Mode::Slideshow if io::stdin().is_terminal() => {
            let slideshow = Slideshow::new(cfg.slideshow.autoplay_interval);
            run_interactive(&mut out, &mut navigator, slideshow)?;
        }
        Mode::Slideshow => render_chronological(&mut out, &mut navigator)?,
    }
    out.flush()?;
    Ok(())
}

pub fn render_tree<W: Write>(
    out: &mut W,
    tree: &ThreadTree,
    view: &HierarchicalView,
) -> Result<()> {
    for row in view.visible_rows(tree) {
        let Some(node) = tree.get_node(&row.id) else {
            continue;
        };
        let indent = "  ".repeat(row.depth);
        let fold = if row.collapsed {
            format!(" [+{} hidden]", row.descendant_count)
        } else {
            String::new()
        };
        writeln!(out, "{indent}{}{fold}", header(node))?;
        write_body(out, node, &indent)?;
    }
    Ok(())
}

/// Prints every post in time order, leaving the cursor where it started.
pub fn render_chronological<W: Write>(out: &mut W, navigator: &mut ThreadNavigator) -> Result<()> {
    let start = navigator.cursor().map(str::to_string);
    let sequence = navigator.sequence();
    for id in sequence.iter() {
        navigator.move_to(id)?;
        write_slide(out, navigator)?;
    }
    if let Some(start) = start {
        navigator.move_to(&start)?;
    }
    Ok(())
}

pub fn write_slide<W: Write>(out: &mut W, navigator: &ThreadNavigator) -> Result<()> {
    let Some(node) = navigator
        .cursor()
        .and_then(|id| navigator.tree().get_node(id))
    else {
        return Ok(());
    };
    let marker = if node.is_root() { "#" } else { ">" };
    writeln!(
        out,
        "{marker} [{}] depth {} · {}",
        Slideshow::label(navigator),
        node.depth(),
        header(node)
    )?;
    write_body(out, node, "  ")?;
    Ok(())
}

fn header(node: &PostNode) -> String {
    let author = if node.post().author.trim().is_empty() {
        "[deleted]"
    } else {
        node.post().author.as_str()
    };
    let when = node.timestamp().format("%Y-%m-%d %H:%M");
    let replies = node.child_ids().len();
    let suffix = if replies == 1 { "reply" } else { "replies" };
    let pending = match node.load_state() {
        LoadState::Loading => " (loading)",
        LoadState::Failed => " (failed to load)",
        _ if node.has_unfetched_replies() => " (more)",
        _ => "",
    };
    format!("{author} · {when} · {replies} {suffix}{pending}")
}

fn write_body<W: Write>(out: &mut W, node: &PostNode, indent: &str) -> Result<()> {
    let body_indent = format!("{indent}  ");
    let options = textwrap::Options::new(WRAP_WIDTH)
        .initial_indent(&body_indent)
        .subsequent_indent(&body_indent);
    for paragraph in node.post().text.lines() {
        for line in textwrap::wrap(paragraph, &options) {
            writeln!(out, "{line}")?;
        }
    }
    if let Some(url) = &node.post().url {
        writeln!(out, "{body_indent}{url}")?;
    }
    writeln!(out)?;
    Ok(())
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn run_interactive<W: Write>(
    out: &mut W,
    navigator: &mut ThreadNavigator,
    mut slideshow: Slideshow,
) -> Result<()> {
    writeln!(
        out,
        "j/n next · k/p previous · r first post · space autoplay · q quit"
    )?;
    write_slide(out, navigator)?;
    out.flush()?;

    let input = spawn_stdin_reader();
    loop {
        match input.recv_timeout(INPUT_POLL) {
            Ok(line) => {
                let trimmed = line.trim_end_matches(['\r', '\n']);
                if trimmed.trim() == "q" {
                    break;
                }
                let key = if trimmed.is_empty() {
                    'j'
                } else {
                    trimmed.chars().next().unwrap_or('j')
                };
                let Some(command) = SlideCommand::from_key(key) else {
                    writeln!(out, "unknown command {trimmed:?}")?;
                    out.flush()?;
                    continue;
                };
                let moved = slideshow.apply(navigator, command, Instant::now());
                if command == SlideCommand::ToggleAutoplay {
                    let state = if slideshow.autoplay() { "on" } else { "off" };
                    writeln!(out, "autoplay {state}")?;
                }
                if moved {
                    write_slide(out, navigator)?;
                }
                out.flush()?;
            }
            Err(RecvTimeoutError::Timeout) => {
                if slideshow.tick(navigator, Instant::now()) {
                    write_slide(out, navigator)?;
                    out.flush()?;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(())
}
