//! Human-readable status output

use std::cell::RefCell;

/// Receives milestone messages. Implementations may render or discard them.
pub trait StatusSink {
    fn post(&self, line: &str);
}

/// Forwards milestones to the tracing subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn post(&self, line: &str) {
        tracing::info!(target: "arsense_core::status", "{}", line);
    }
}

/// Newline-joined transcript, the backing store for an on-screen debug panel
#[derive(Debug, Default)]
pub struct StatusBoard {
    text: RefCell<String>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line, optionally clearing the transcript first
    pub fn post_with_reset(&self, line: &str, reset: bool) {
        let mut text = self.text.borrow_mut();
        if reset {
            text.clear();
        }
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(line);
        tracing::info!(target: "arsense_core::status", "{}", line);
    }

    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.text.borrow().lines().map(str::to_string).collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.text.borrow().contains(needle)
    }
}

impl StatusSink for StatusBoard {
    fn post(&self, line: &str) {
        self.post_with_reset(line, false);
    }
}
