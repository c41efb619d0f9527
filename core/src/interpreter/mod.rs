//! # Interpreter - Cooperative Multi-Script Engine
//!
//! Runs a compiled [`Program`] against a bound sprite.
//!
//! ## Core Principles
//!
//! 1. **Fibers, not threads**: every running script is a [`Thread`] record
//!    with its own frame stack; no OS threads, no recursion.
//! 2. **Command-level stepping**: the scheduler advances one command of one
//!    thread at a time, round-robin, inside [`Engine::tick`].
//! 3. **Explicit suspension**: a timed action or a pending broadcast-and-wait
//!    reports [`Step::Pending`] and is stepped again next tick.
//! 4. **Fail soft**: nothing in here returns an error. Misuse is logged and
//!    skipped; a runaway loop trips the ops/second ceiling and stops the run.

pub mod clock;
pub mod engine;
pub mod exec_loop;
pub mod expressions;
pub mod observer;
pub mod statements;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used items
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::Engine;
pub use exec_loop::TickOutcome;
pub use expressions::{evaluate, Variables};
pub use observer::{EngineObserver, LogBuffer, NullObserver};
pub use types::{Command, CommandKind, Expr, Program, Script, Step, Thread, ThreadId, Val};
