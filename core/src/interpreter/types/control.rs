//! Thread, frame and step result types

use super::ast::Block;
use std::fmt;

/* ===================== Step Result ===================== */

/// Result of stepping a single command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Command fully executed; move to the next command in the frame.
    Advance,
    /// Command changed the frame stack itself (pushed a body, broke out of a
    /// loop, stopped). The instruction pointer is left alone.
    Stay,
    /// Command still in progress; step it again next tick.
    Pending,
}

/* ===================== Frames ===================== */

/// Frame kind - what happens when the instruction pointer runs off the end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Plain sequence: pops when exhausted.
    Seq,
    /// Counted loop: wraps until `iteration == times`, then pops.
    Repeat { iteration: u64, times: u64 },
    /// Wraps forever.
    Forever,
}

impl FrameKind {
    pub fn is_loop(&self) -> bool {
        matches!(self, FrameKind::Repeat { .. } | FrameKind::Forever)
    }
}

/// Execution frame - one per nested body being executed
#[derive(Debug, Clone)]
pub struct Frame {
    pub kind: FrameKind,
    pub commands: Block,
    /// Index of the next command to step
    pub ip: usize,
}

impl Frame {
    pub fn seq(commands: Block) -> Self {
        Self {
            kind: FrameKind::Seq,
            commands,
            ip: 0,
        }
    }

    pub fn repeat(commands: Block, times: u64) -> Self {
        Self {
            kind: FrameKind::Repeat { iteration: 0, times },
            commands,
            ip: 0,
        }
    }

    pub fn forever(commands: Block) -> Self {
        Self {
            kind: FrameKind::Forever,
            commands,
            ip: 0,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.ip >= self.commands.len()
    }
}

/* ===================== Timed Actions ===================== */

/// In-flight timed action of one thread
#[derive(Debug, Clone, PartialEq)]
pub struct ActionState {
    pub kind: ActionKind,
    /// Seconds elapsed since the action started
    pub elapsed: f64,
    /// Total seconds the action takes
    pub duration: f64,
    /// Last tick whose delta was added to `elapsed`. Starts at the tick the
    /// action began in, which contributes nothing.
    pub advanced_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionKind {
    Move {
        steps: f64,
        start_x: f64,
        start_y: f64,
    },
    Turn {
        degrees: f64,
        start_rotation: f64,
    },
    Wait,
}

impl ActionState {
    pub fn new(kind: ActionKind, duration: f64, started_at: u64) -> Self {
        Self {
            kind,
            elapsed: 0.0,
            duration,
            advanced_at: started_at,
        }
    }

    /// Add the tick delta, at most once per tick.
    pub fn advance(&mut self, tick: u64, dt: f64) {
        if self.advanced_at != tick {
            self.advanced_at = tick;
            self.elapsed += dt;
        }
    }

    /// Completion fraction in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).min(1.0)
        }
    }
}

/* ===================== Threads ===================== */

/// Engine-unique thread identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(pub u64);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One cooperative execution fiber
#[derive(Debug, Clone, Default)]
pub struct Thread {
    pub id: ThreadId,
    /// Id of the script or handler this thread runs
    pub origin: String,
    pub frames: Vec<Frame>,
    pub action: Option<ActionState>,
    pub finished: bool,
    /// Threads spawned by a pending broadcast-and-wait
    pub waiting_on: Option<Vec<ThreadId>>,
    /// Tick during which the thread was created; it is stepped from the next one.
    pub born_tick: u64,
}

impl Thread {
    pub fn new(id: ThreadId, origin: impl Into<String>, commands: Block, born_tick: u64) -> Self {
        Self {
            id,
            origin: origin.into(),
            frames: vec![Frame::seq(commands)],
            action: None,
            finished: false,
            waiting_on: None,
            born_tick,
        }
    }

    /// Index of the nearest enclosing loop frame, searching from the top.
    pub fn nearest_loop(&self) -> Option<usize> {
        self.frames.iter().rposition(|f| f.kind.is_loop())
    }

    /// Mark finished and drop all execution state.
    pub fn finish(&mut self) {
        self.finished = true;
        self.frames.clear();
        self.action = None;
        self.waiting_on = None;
    }
}
