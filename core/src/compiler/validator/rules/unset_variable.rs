//! Rule: Unset Variable
//!
//! Reports a hint when a variable is read but no `set` or `change` block
//! anywhere in the program writes it. Such reads always yield 0.

use std::collections::BTreeSet;

use crate::interpreter::types::{Command, CommandKind, Expr, Program};

use super::super::{child_bodies, top_level_bodies, ValidationError, ValidationRule};

pub struct UnsetVariableRule;

impl ValidationRule for UnsetVariableRule {
    fn id(&self) -> &'static str {
        "unset-variable"
    }

    fn description(&self) -> &'static str {
        "Variables should be written before they are read"
    }

    fn validate(&self, program: &Program) -> Vec<ValidationError> {
        // Phase 1: collect writes, and reads with the first block reading each name
        let mut written: BTreeSet<&str> = BTreeSet::new();
        let mut reads: Vec<(&str, &str)> = Vec::new();

        for body in top_level_bodies(program) {
            scan(body, &mut written, &mut reads);
        }

        // Phase 2: report each unwritten name once
        let mut reported: BTreeSet<&str> = BTreeSet::new();
        let mut errors = Vec::new();
        for (name, block_id) in reads {
            if written.contains(name) || !reported.insert(name) {
                continue;
            }
            errors.push(ValidationError::hint(
                block_id,
                format!("variable '{}' is never set and always reads as 0", name),
                self.id(),
            ));
        }
        errors
    }
}

fn scan<'p>(
    commands: &'p [Command],
    written: &mut BTreeSet<&'p str>,
    reads: &mut Vec<(&'p str, &'p str)>,
) {
    for command in commands {
        if let CommandKind::SetVar { name, .. } | CommandKind::ChangeVar { name, .. } = &command.kind {
            written.insert(name.as_str());
        }
        for expr in expressions(&command.kind) {
            collect_reads(expr, &command.block_id, reads);
        }
        for (body, _) in child_bodies(command) {
            scan(body, written, reads);
        }
    }
}

fn expressions(kind: &CommandKind) -> Vec<&Expr> {
    match kind {
        CommandKind::Move { steps } => vec![steps],
        CommandKind::Turn { degrees } => vec![degrees],
        CommandKind::Wait { seconds } => vec![seconds],
        CommandKind::Repeat { times, .. } => vec![times],
        CommandKind::If { cond, .. } | CommandKind::IfElse { cond, .. } => vec![cond],
        CommandKind::SetVar { value, .. } => vec![value],
        CommandKind::ChangeVar { delta, .. } => vec![delta],
        CommandKind::Broadcast { message, .. } => vec![message],
        _ => Vec::new(),
    }
}

fn collect_reads<'p>(expr: &'p Expr, block_id: &'p str, reads: &mut Vec<(&'p str, &'p str)>) {
    match expr {
        Expr::Var { name } => reads.push((name, block_id)),
        Expr::Bin { left, right, .. }
        | Expr::Cmp { left, right, .. }
        | Expr::Logic { left, right, .. } => {
            collect_reads(left, block_id, reads);
            collect_reads(right, block_id, reads);
        }
        _ => {}
    }
}
