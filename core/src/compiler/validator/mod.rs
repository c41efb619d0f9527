//! Program Validation
//!
//! A rule-based lint pass over a compiled [`Program`]. The engine runs any
//! program it is given; findings here only tell the author about blocks
//! that will be skipped, never run, or do nothing.
//!
//! # Usage
//!
//! ```ignore
//! use stagehand_core::compiler::{compile, validator::validate_program};
//!
//! let program = compile(&workspace);
//! for finding in validate_program(&program) {
//!     eprintln!("{}", finding);
//! }
//! ```
//!
//! # Adding a New Rule
//!
//! 1. Create a new file in `validator/rules/`
//! 2. Implement `ValidationRule` for your struct
//! 3. Add it to the `Validator::new()` constructor

pub mod rules;

use serde::Serialize;

use crate::interpreter::types::{Command, CommandKind, Program};

// ============================================================================
// Validation Error Types
// ============================================================================

/// A finding produced by validation, anchored to the block it concerns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    /// Source block id
    pub block_id: String,
    /// Human-readable message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Which rule produced this finding
    pub rule_id: &'static str,
}

/// Severity levels for validation findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The block cannot do what it says
    Error,
    /// Probably a mistake
    Warning,
    /// Worth knowing
    Hint,
}

impl ValidationError {
    pub fn error(block_id: &str, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self::new(block_id, message, Severity::Error, rule_id)
    }

    pub fn warning(block_id: &str, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self::new(block_id, message, Severity::Warning, rule_id)
    }

    pub fn hint(block_id: &str, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self::new(block_id, message, Severity::Hint, rule_id)
    }

    fn new(
        block_id: &str,
        message: impl Into<String>,
        severity: Severity,
        rule_id: &'static str,
    ) -> Self {
        Self {
            block_id: block_id.to_string(),
            message: message.into(),
            severity,
            rule_id,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Hint => "hint",
        };
        write!(
            f,
            "{} at block '{}': {} [{}]",
            severity, self.block_id, self.message, self.rule_id
        )
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// ValidationRule Trait
// ============================================================================

/// One check over a compiled program
pub trait ValidationRule: Send + Sync {
    /// Unique identifier for this rule (e.g., "loop-control")
    fn id(&self) -> &'static str;

    /// Human-readable description of what this rule checks
    fn description(&self) -> &'static str;

    /// Run the check. Empty vector means no findings.
    fn validate(&self, program: &Program) -> Vec<ValidationError>;
}

// ============================================================================
// Validator - Runs All Rules
// ============================================================================

pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    /// Create a validator with all built-in rules.
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(rules::LoopControlRule),
                Box::new(rules::UnreachableCodeRule),
                Box::new(rules::UnhandledBroadcastRule),
                Box::new(rules::UnsetVariableRule),
            ],
        }
    }

    /// Run all rules and collect their findings.
    pub fn validate(&self, program: &Program) -> Vec<ValidationError> {
        self.rules
            .iter()
            .flat_map(|rule| rule.validate(program))
            .collect()
    }

    pub fn rules(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.rules.iter().map(|r| (r.id(), r.description()))
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Traversal
// ============================================================================

/// Every top-level command list: scripts first, then handlers.
pub(crate) fn top_level_bodies(program: &Program) -> impl Iterator<Item = &[Command]> {
    program
        .scripts
        .iter()
        .chain(program.handlers.values().flatten())
        .map(|script| &*script.commands)
}

/// Nested bodies of a control command, with whether each is a loop body.
pub(crate) fn child_bodies(command: &Command) -> Vec<(&[Command], bool)> {
    match &command.kind {
        CommandKind::Repeat { body, .. } | CommandKind::Forever { body } => vec![(&**body, true)],
        CommandKind::If { body, .. } => vec![(&**body, false)],
        CommandKind::IfElse {
            then_body,
            else_body,
            ..
        } => vec![(&**then_body, false), (&**else_body, false)],
        _ => Vec::new(),
    }
}

/// Visit every command, depth first, in program order.
pub(crate) fn walk<'p>(commands: &'p [Command], visit: &mut impl FnMut(&'p Command)) {
    for command in commands {
        visit(command);
        for (body, _) in child_bodies(command) {
            walk(body, visit);
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Validate a program with the built-in rules.
pub fn validate_program(program: &Program) -> Vec<ValidationError> {
    Validator::new().validate(program)
}

/// Whether any finding is error-severity.
pub fn has_errors(program: &Program) -> bool {
    validate_program(program).iter().any(|e| e.is_error())
}
