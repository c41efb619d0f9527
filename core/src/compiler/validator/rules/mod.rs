//! Validation Rules
//!
//! Each file in this module contains one validation rule:
//!
//! - `loop_control.rs` - `break`/`continue` with no enclosing loop
//! - `unreachable_code.rs` - Commands after a block that never falls through
//! - `unhandled_broadcast.rs` - Messages nobody receives, receivers nobody can reach
//! - `unset_variable.rs` - Variables read but never written

mod loop_control;
mod unhandled_broadcast;
mod unreachable_code;
mod unset_variable;

pub use loop_control::LoopControlRule;
pub use unhandled_broadcast::UnhandledBroadcastRule;
pub use unreachable_code::UnreachableCodeRule;
pub use unset_variable::UnsetVariableRule;
