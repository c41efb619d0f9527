//! Log and highlight callbacks
//!
//! The engine reports through an [`EngineObserver`] while it steps. Callbacks
//! are fire-and-forget and never influence control flow.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Receiver for engine log lines and block highlights
pub trait EngineObserver {
    /// A human-readable log line.
    fn on_log(&mut self, _message: &str) {}

    /// The block currently being stepped, or `None` to clear the highlight.
    fn on_highlight(&mut self, _block_id: Option<&str>) {}
}

/// Observer that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl EngineObserver for NullObserver {}

impl<T: EngineObserver + ?Sized> EngineObserver for Rc<RefCell<T>> {
    fn on_log(&mut self, message: &str) {
        self.borrow_mut().on_log(message);
    }

    fn on_highlight(&mut self, block_id: Option<&str>) {
        self.borrow_mut().on_highlight(block_id);
    }
}

/// Bounded log history plus the current highlight
#[derive(Debug, Clone)]
pub struct LogBuffer {
    lines: VecDeque<String>,
    capacity: usize,
    highlighted: Option<String>,
}

impl LogBuffer {
    pub const DEFAULT_CAPACITY: usize = 200;

    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
            highlighted: None,
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.highlighted.as_deref()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl EngineObserver for LogBuffer {
    fn on_log(&mut self, message: &str) {
        self.push(message);
    }

    fn on_highlight(&mut self, block_id: Option<&str>) {
        self.highlighted = block_id.map(str::to_string);
    }
}
