//! Engine state and lifecycle
//!
//! The engine holds everything one run needs:
//! - the loaded program and its handler table
//! - the bound sprite
//! - the variable store
//! - the live threads and their frame stacks
//! - tick and safety counters
//!
//! Several engines can coexist; nothing here is process-global.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::expressions::{read_var, Variables};
use super::observer::{EngineObserver, NullObserver};
use super::types::{Program, Thread, ThreadId};
use crate::config::EngineConfig;
use crate::stage::SharedSprite;

/* ===================== Engine ===================== */

/// Cooperative multi-script interpreter
pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) program: Option<Arc<Program>>,
    pub(crate) sprite: Option<SharedSprite>,
    pub(crate) vars: Variables,
    /// Live threads in creation order
    pub(crate) threads: Vec<Thread>,
    pub(crate) running: bool,
    /// Whether the host owes us another tick
    pub(crate) tick_pending: bool,
    pub(crate) tick_count: u64,
    pub(crate) last_tick: Duration,
    pub(crate) ops_window_start: Duration,
    pub(crate) ops_this_second: u64,
    next_thread_id: u64,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) observer: Box<dyn EngineObserver>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            program: None,
            sprite: None,
            vars: Variables::new(),
            threads: Vec::new(),
            running: false,
            tick_pending: false,
            tick_count: 0,
            last_tick: Duration::ZERO,
            ops_window_start: Duration::ZERO,
            ops_this_second: 0,
            next_thread_id: 1,
            clock: Box::new(SystemClock::new()),
            observer: Box::new(NullObserver),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_observer(mut self, observer: impl EngineObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /* ===================== Lifecycle ===================== */

    /// Store a compiled program and its handler table
    pub fn load_program(&mut self, program: Program) {
        debug!(
            scripts = program.scripts.len(),
            handlers = program.handler_count(),
            "program loaded"
        );
        self.program = Some(Arc::new(program));
    }

    /// Attach the sprite the program drives
    pub fn bind_runtime(&mut self, sprite: SharedSprite) {
        self.sprite = Some(sprite);
    }

    /// Start every script on a fresh thread.
    ///
    /// Fails soft: without a program, a sprite, or any start scripts this
    /// logs and returns without running.
    pub fn start(&mut self) {
        let program = match self.program.clone() {
            Some(program) if self.sprite.is_some() => program,
            _ => {
                warn!("start requested without a program or sprite");
                self.notify("Engine: missing program/runtime.");
                return;
            }
        };

        if program.scripts.is_empty() {
            info!("no start scripts");
            self.notify("No start scripts found.");
            return;
        }

        self.threads.clear();
        for script in &program.scripts {
            let id = self.alloc_thread_id();
            self.threads.push(Thread::new(
                id,
                script.id.as_str(),
                Arc::clone(&script.commands),
                self.tick_count,
            ));
        }

        let now = self.clock.now();
        self.last_tick = now;
        self.ops_window_start = now;
        self.ops_this_second = 0;
        self.running = true;
        self.tick_pending = true;

        info!(threads = self.threads.len(), "engine started");
        let message = format!("Engine started ({} script(s)).", self.threads.len());
        self.notify(&message);
    }

    /// Halt everything. Safe to call at any time, any number of times.
    pub fn stop(&mut self) {
        if self.running {
            debug!(threads = self.threads.len(), "engine stopping");
        }
        self.running = false;
        self.tick_pending = false;
        self.observer.on_highlight(None);

        for thread in &mut self.threads {
            thread.finish();
        }
        self.threads.clear();
    }

    /* ===================== Introspection ===================== */

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// True while the engine expects the host to call `tick` again
    pub fn is_tick_pending(&self) -> bool {
        self.tick_pending
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn program(&self) -> Option<&Program> {
        self.program.as_deref()
    }

    pub fn sprite(&self) -> Option<&SharedSprite> {
        self.sprite.as_ref()
    }

    pub fn variables(&self) -> &Variables {
        &self.vars
    }

    /// Current value of a variable (0 when unset)
    pub fn variable(&self, name: &str) -> f64 {
        read_var(&self.vars, name)
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn live_thread_count(&self) -> usize {
        self.threads.iter().filter(|t| !t.finished).count()
    }

    pub fn ops_this_second(&self) -> u64 {
        self.ops_this_second
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /* ===================== Internals ===================== */

    pub(crate) fn alloc_thread_id(&mut self) -> ThreadId {
        let id = ThreadId(self.next_thread_id);
        self.next_thread_id += 1;
        id
    }

    /// Whether a thread with this id is still alive
    pub(crate) fn is_live(&self, id: ThreadId) -> bool {
        self.threads.iter().any(|t| t.id == id && !t.finished)
    }

    /// Spawn one thread per handler registered for `message`
    pub(crate) fn spawn_handlers(&mut self, message: &str) -> Vec<ThreadId> {
        let Some(program) = self.program.clone() else {
            return Vec::new();
        };

        let mut spawned = Vec::new();
        for handler in program.handlers_for(message) {
            let id = self.alloc_thread_id();
            debug!(thread = %id, handler = %handler.id, message, "spawning handler");
            self.threads.push(Thread::new(
                id,
                handler.id.as_str(),
                Arc::clone(&handler.commands),
                self.tick_count,
            ));
            spawned.push(id);
        }
        spawned
    }

    pub(crate) fn notify(&mut self, message: &str) {
        self.observer.on_log(message);
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("running", &self.running)
            .field("threads", &self.threads.len())
            .field("tick_count", &self.tick_count)
            .field("ops_this_second", &self.ops_this_second)
            .finish_non_exhaustive()
    }
}
