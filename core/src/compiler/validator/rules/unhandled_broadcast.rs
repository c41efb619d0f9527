//! Rule: Unhandled Broadcast
//!
//! Reports a warning when a broadcast names a literal message that no
//! `when I receive` handler listens for, and when a handler's message is
//! not a literal (such handlers are filed under the empty message).
//!
//! Broadcasts with a computed message are not checked.

use crate::interpreter::types::{CommandKind, Program};

use super::super::{top_level_bodies, walk, ValidationError, ValidationRule};

pub struct UnhandledBroadcastRule;

impl ValidationRule for UnhandledBroadcastRule {
    fn id(&self) -> &'static str {
        "unhandled-broadcast"
    }

    fn description(&self) -> &'static str {
        "Broadcast messages should have a receiver"
    }

    fn validate(&self, program: &Program) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for body in top_level_bodies(program) {
            walk(body, &mut |command| {
                let CommandKind::Broadcast { message, .. } = &command.kind else {
                    return;
                };
                let Some(text) = message.as_str_literal() else {
                    return;
                };
                if program.handlers_for(text).is_empty() {
                    errors.push(ValidationError::warning(
                        &command.block_id,
                        format!("no handler receives \"{}\"", text),
                        self.id(),
                    ));
                }
            });
        }

        for handler in program.handlers_for("") {
            errors.push(ValidationError::warning(
                &handler.id,
                "handler message is empty or not a text literal; it only receives \"\"",
                self.id(),
            ));
        }

        errors
    }
}
