//! Rule: Unreachable Code
//!
//! Reports a warning for commands that follow a block which never falls
//! through to its successor in the same list:
//!
//! - `stop all`, `stop this script`
//! - `forever`
//! - `break`, `continue`
//!
//! Only the first unreachable command of a list is reported.

use crate::interpreter::types::{Command, CommandKind, Program};

use super::super::{child_bodies, top_level_bodies, ValidationError, ValidationRule};

pub struct UnreachableCodeRule;

impl ValidationRule for UnreachableCodeRule {
    fn id(&self) -> &'static str {
        "unreachable-code"
    }

    fn description(&self) -> &'static str {
        "Blocks after stop, forever, break or continue never run"
    }

    fn validate(&self, program: &Program) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for body in top_level_bodies(program) {
            check(body, &mut errors, self.id());
        }
        errors
    }
}

fn check(commands: &[Command], errors: &mut Vec<ValidationError>, rule_id: &'static str) {
    let mut terminator: Option<&Command> = None;

    for command in commands {
        if let Some(term) = terminator {
            errors.push(ValidationError::warning(
                &command.block_id,
                format!("unreachable: follows '{}'", term.kind.name()),
                rule_id,
            ));
            break;
        }
        if never_falls_through(&command.kind) {
            terminator = Some(command);
        }
    }

    for command in commands {
        for (body, _) in child_bodies(command) {
            check(body, errors, rule_id);
        }
    }
}

fn never_falls_through(kind: &CommandKind) -> bool {
    matches!(
        kind,
        CommandKind::StopAll
            | CommandKind::StopThis
            | CommandKind::Forever { .. }
            | CommandKind::Break
            | CommandKind::Continue
    )
}
