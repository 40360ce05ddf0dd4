#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod chronology;
pub mod config;
pub mod error;
pub mod hackernews;
pub mod hierarchy;
pub mod navigator;
pub mod post;
pub mod slideshow;
pub mod tree;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
pub use chronology::ChronologicalIndex;
pub use error::ThreadError;
pub use navigator::ThreadNavigator;
pub use post::{LoadState, Post, PostNode};
pub use tree::ThreadTree;
