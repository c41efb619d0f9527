//! Type definitions for the interpreter
//!
//! - Program tree (Program, Script, Command, Expr)
//! - Runtime values (Val)
//! - Scheduling state (Thread, Frame, ActionState, Step)

pub mod ast;
pub mod control;
pub mod values;

// Re-export all types for convenient access
pub use ast::{ArithOp, Block, CmpOp, Command, CommandKind, Expr, Handler, LogicOp, Program, Script};
pub use control::{ActionKind, ActionState, Frame, FrameKind, Step, Thread, ThreadId};
pub use values::Val;
