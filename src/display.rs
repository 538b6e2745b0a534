//! Time label rendering
//!
//! Turns countdown values into the `MM:SS` text shown next to the buttons.

use chrono::TimeDelta;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::countdown::{Clock, Countdown, CountdownObserver, CountdownState};

/// Format as `MM:SS`. Seconds are floored; negative values show as `00:00`.
pub fn format_clock(value: TimeDelta) -> String {
    let secs = value.num_seconds().max(0);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

pub fn format_duration(value: Duration) -> String {
    format_clock(TimeDelta::from_std(value).unwrap_or(TimeDelta::MAX))
}

/// Label text for the current countdown state: the configured duration
/// while reset, the remaining time while started, zero once finished.
pub fn label_text<C: Clock>(countdown: &Countdown<C>) -> String {
    match countdown.state() {
        CountdownState::Reset => format_duration(countdown.duration()),
        CountdownState::Started => format_clock(countdown.remaining()),
        CountdownState::Finished => format_clock(TimeDelta::zero()),
    }
}

/// Countdown observer backing the on-screen time label.
#[derive(Debug)]
pub struct TimeLabel {
    text: Mutex<String>,
    updates: AtomicUsize,
    finishes: AtomicUsize,
}

impl TimeLabel {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            text: Mutex::new(initial.into()),
            updates: AtomicUsize::new(0),
            finishes: AtomicUsize::new(0),
        }
    }

    pub fn text(&self) -> String {
        self.text.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Replace the text, returning whether it changed.
    pub fn set_text(&self, text: String) -> bool {
        let mut current = self.text.lock().unwrap_or_else(|e| e.into_inner());
        if *current == text {
            return false;
        }
        *current = text;
        true
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::Relaxed)
    }

    pub fn finish_count(&self) -> usize {
        self.finishes.load(Ordering::Relaxed)
    }
}

impl CountdownObserver for TimeLabel {
    fn countdown_did_update(&self, remaining: Duration) {
        self.updates.fetch_add(1, Ordering::Relaxed);
        let text = format_duration(remaining);
        if self.set_text(text.clone()) {
            log::info!("Time remaining: {}", text);
        }
    }

    fn countdown_did_finish(&self) {
        self.finishes.fetch_add(1, Ordering::Relaxed);
        self.set_text(format_clock(TimeDelta::zero()));
        log::info!("Finished");
    }
}
