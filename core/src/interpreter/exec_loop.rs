//! Tick loop
//!
//! This module contains `tick()` - the heart of the scheduler. The host calls
//! it once per display refresh. Each tick steps live threads round-robin,
//! one command at a time, until every thread is suspended, the step budget
//! runs out, or the engine stops.
//!
//! ## Function Organization
//! 1. tick() - per-frame driver
//! 2. step_thread() - one step of one thread
//! 3. finish_body() / pop_frame() - frame exhaustion and unwinding

use std::time::Duration;

use tracing::{info, trace, warn};

use super::engine::Engine;
use super::types::{FrameKind, Step, Thread};

/// What a call to [`Engine::tick`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to do: the engine is not running or no tick was requested.
    Idle,
    /// Threads remain; the next tick has been requested.
    Continue,
    /// The engine stopped during this tick.
    Stopped,
}

/* ===================== Public API ===================== */

impl Engine {
    /// Run one display-refresh worth of scheduling
    pub fn tick(&mut self) -> TickOutcome {
        if !self.running || !self.tick_pending {
            return TickOutcome::Idle;
        }
        self.tick_pending = false;
        self.tick_count += 1;

        let now = self.clock.now();
        let dt = now
            .saturating_sub(self.last_tick)
            .min(self.config.max_frame_delta())
            .as_secs_f64();
        self.last_tick = now;

        if now.saturating_sub(self.ops_window_start) >= Duration::from_secs(1) {
            self.ops_window_start = now;
            self.ops_this_second = 0;
        }

        let budget = self.config.max_steps_per_tick;
        let mut steps = 0u64;

        'passes: while self.running && steps < budget {
            self.threads.retain(|t| !t.finished);

            if self.threads.is_empty() {
                info!("all scripts finished");
                self.notify("All scripts finished.");
                self.stop();
                break;
            }

            let mut progressed = false;
            // Threads spawned during this pass land past `pass_len`
            let pass_len = self.threads.len();

            for index in 0..pass_len {
                let eligible = {
                    let thread = &self.threads[index];
                    !thread.finished && thread.born_tick < self.tick_count
                };
                if !eligible {
                    continue;
                }
                if steps >= budget {
                    break 'passes;
                }

                steps += 1;
                self.ops_this_second += 1;
                if self.ops_this_second > self.config.max_ops_per_second {
                    warn!(
                        ops = self.ops_this_second,
                        limit = self.config.max_ops_per_second,
                        "ops/second ceiling exceeded, stopping"
                    );
                    self.notify("Safety stop: too many operations/sec (possible infinite loop).");
                    self.stop();
                    break 'passes;
                }

                let mut thread = std::mem::take(&mut self.threads[index]);
                progressed |= self.step_thread(&mut thread, dt);

                if !self.running {
                    break 'passes;
                }
                self.threads[index] = thread;
            }

            if !progressed {
                trace!(steps, "every thread is waiting");
                break;
            }
        }

        if self.running {
            self.tick_pending = true;
            TickOutcome::Continue
        } else {
            TickOutcome::Stopped
        }
    }
}

/* ===================== Thread Stepping ===================== */

impl Engine {
    /// Execute one step of a thread. Returns whether it made progress.
    ///
    /// The thread has been taken out of `self.threads` for the duration of
    /// the step; anything it spawns is appended behind it.
    pub(crate) fn step_thread(&mut self, thread: &mut Thread, dt: f64) -> bool {
        let Some(frame) = thread.frames.last() else {
            thread.finished = true;
            return true;
        };

        if frame.is_exhausted() {
            finish_body(thread);
            return true;
        }

        let block = frame.commands.clone();
        let command = &block[frame.ip];

        match self.step_command(thread, command, dt) {
            Step::Advance => {
                if let Some(frame) = thread.frames.last_mut() {
                    frame.ip += 1;
                }
                true
            }
            Step::Stay => true,
            Step::Pending => false,
        }
    }
}

/* ===================== Frame Unwinding ===================== */

/// The top frame ran off the end of its body: wrap a loop or pop.
pub(crate) fn finish_body(thread: &mut Thread) {
    let Some(frame) = thread.frames.last_mut() else {
        thread.finished = true;
        return;
    };

    match frame.kind {
        FrameKind::Seq => pop_frame(thread),
        FrameKind::Repeat { iteration, times } => {
            let iteration = iteration + 1;
            if iteration >= times {
                pop_frame(thread);
            } else {
                frame.kind = FrameKind::Repeat { iteration, times };
                frame.ip = 0;
            }
        }
        FrameKind::Forever => frame.ip = 0,
    }
}

/// Pop the top frame and move the parent past the command that pushed it.
/// Popping the root frame finishes the thread.
pub(crate) fn pop_frame(thread: &mut Thread) {
    thread.frames.pop();
    match thread.frames.last_mut() {
        Some(parent) => parent.ip += 1,
        None => thread.finished = true,
    }
}
