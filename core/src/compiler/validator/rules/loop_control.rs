//! Rule: Loop Control
//!
//! Reports an error when `break` or `continue` has no enclosing `repeat` or
//! `forever` in its own script. The engine skips such blocks with a warning.
//!
//! Loops do not reach across scripts: a `break` in a handler never exits a
//! loop in the script that broadcast to it.

use crate::interpreter::types::{Command, CommandKind, Program};

use super::super::{child_bodies, top_level_bodies, ValidationError, ValidationRule};

pub struct LoopControlRule;

impl ValidationRule for LoopControlRule {
    fn id(&self) -> &'static str {
        "loop-control"
    }

    fn description(&self) -> &'static str {
        "break and continue must be inside a loop"
    }

    fn validate(&self, program: &Program) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for body in top_level_bodies(program) {
            check(body, false, &mut errors, self.id());
        }
        errors
    }
}

fn check(commands: &[Command], in_loop: bool, errors: &mut Vec<ValidationError>, rule_id: &'static str) {
    for command in commands {
        match command.kind {
            CommandKind::Break if !in_loop => errors.push(ValidationError::error(
                &command.block_id,
                "'break' is not inside a loop and will be skipped",
                rule_id,
            )),
            CommandKind::Continue if !in_loop => errors.push(ValidationError::error(
                &command.block_id,
                "'continue' is not inside a loop and will be skipped",
                rule_id,
            )),
            _ => {}
        }
        for (body, is_loop) in child_bodies(command) {
            check(body, in_loop || is_loop, errors, rule_id);
        }
    }
}
