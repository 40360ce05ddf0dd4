//! Looping slideshow policy on top of [`ThreadNavigator`].
//!
//! The navigator refuses to move past either end; the slideshow turns that
//! refusal into a jump to the opposite end and adds an autoplay timer.

use std::time::{Duration, Instant};

use crate::navigator::ThreadNavigator;

pub const DEFAULT_AUTOPLAY_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideCommand {
    Next,
    Prev,
    Root,
    ToggleAutoplay,
}

impl SlideCommand {
    pub fn from_key(key: char) -> Option<Self> {
        match key {
            'j' | 'n' => Some(SlideCommand::Next),
            'k' | 'p' => Some(SlideCommand::Prev),
            'r' => Some(SlideCommand::Root),
            ' ' => Some(SlideCommand::ToggleAutoplay),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Slideshow {
    interval: Duration,
    autoplay: bool,
    last_advance: Option<Instant>,
}

impl Default for Slideshow {
    fn default() -> Self {
        Self::new(DEFAULT_AUTOPLAY_INTERVAL)
    }
}

impl Slideshow {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            autoplay: false,
            last_advance: None,
        }
    }

    pub fn autoplay(&self) -> bool {
        self.autoplay
    }

    /// Advances, looping back to the first post after the last one.
    pub fn next(&mut self, navigator: &mut ThreadNavigator) -> bool {
        if navigator.move_to_next() {
            return true;
        }
        let sequence = navigator.sequence();
        match sequence.first() {
            Some(first) if navigator.cursor() != Some(first.as_str()) => {
                navigator.move_to(first).is_ok()
            }
            _ => false,
        }
    }

    /// Steps back, looping to the last post before the first one.
    pub fn prev(&mut self, navigator: &mut ThreadNavigator) -> bool {
        if navigator.move_to_prev() {
            return true;
        }
        let sequence = navigator.sequence();
        match sequence.last() {
            Some(last) if navigator.cursor() != Some(last.as_str()) => {
                navigator.move_to(last).is_ok()
            }
            _ => false,
        }
    }

    pub fn restart(&mut self, navigator: &mut ThreadNavigator) -> bool {
        navigator.move_to_root()
    }

    pub fn toggle_autoplay(&mut self, now: Instant) -> bool {
        self.autoplay = !self.autoplay;
        self.last_advance = self.autoplay.then_some(now);
        self.autoplay
    }

    /// Advances once if autoplay is on and a full interval has elapsed.
    pub fn tick(&mut self, navigator: &mut ThreadNavigator, now: Instant) -> bool {
        if !self.autoplay {
            return false;
        }
        let due = self
            .last_advance
            .map_or(true, |last| now.saturating_duration_since(last) >= self.interval);
        if !due {
            return false;
        }
        self.last_advance = Some(now);
        self.next(navigator)
    }

    pub fn apply(
        &mut self,
        navigator: &mut ThreadNavigator,
        command: SlideCommand,
        now: Instant,
    ) -> bool {
        match command {
            SlideCommand::Next => self.next(navigator),
            SlideCommand::Prev => self.prev(navigator),
            SlideCommand::Root => self.restart(navigator),
            SlideCommand::ToggleAutoplay => {
                self.toggle_autoplay(now);
                false
            }
        }
    }

    /// Fraction of the sequence already shown, in `[0, 1]`.
    pub fn progress(navigator: &ThreadNavigator) -> f64 {
        match navigator.position() {
            Some((index, total)) if total > 1 => index as f64 / (total - 1) as f64,
            _ => 0.0,
        }
    }

    pub fn label(navigator: &ThreadNavigator) -> String {
        match navigator.position() {
            Some((index, total)) => format!("{} / {}", index + 1, total),
            None => "0 / 0".to_string(),
        }
    }
}
