//! # Compiler - Block Graph to Program
//!
//! Walks a [`BlockGraph`] and produces the [`Program`] the engine runs.
//!
//! - Each top-level `bp_start` node becomes a script whose commands are the
//!   chain hanging below it.
//! - Each top-level `bp_when_receive` node becomes a handler, grouped by its
//!   message. Only literal messages name a handler; anything else is filed
//!   under `""`.
//! - Statement blocks compile to commands, value blocks to expressions.
//!   Unwired inputs fall back to a default literal and unknown block types
//!   are skipped.
//!
//! Compilation never fails: whatever the graph holds, a program comes out.

pub mod graph;
pub mod validator;
pub mod workspace;

use tracing::{debug, trace};

use crate::interpreter::types::{
    ArithOp, CmpOp, Command, CommandKind, Expr, LogicOp, Program, Script,
};

pub use graph::BlockGraph;
pub use workspace::{JsonWorkspace, WorkspaceError};

/* ===================== Public API ===================== */

/// Compile a block graph into a program
pub fn compile<G: BlockGraph>(graph: &G) -> Program {
    let compiler = Compiler { graph };
    let mut program = Program::default();

    for node in graph.top_level() {
        match graph.node_type(node) {
            "bp_start" => {
                let commands = compiler.chain(graph.next(node));
                program
                    .scripts
                    .push(Script::new(graph.node_id(node), commands));
            }
            "bp_when_receive" => {
                let message = compiler.handler_message(node);
                let commands = compiler.chain(graph.input_target(node, "DO"));
                program
                    .handlers
                    .entry(message)
                    .or_default()
                    .push(Script::new(graph.node_id(node), commands));
            }
            other => trace!(block = graph.node_id(node), kind = other, "loose top-level block ignored"),
        }
    }

    debug!(
        scripts = program.scripts.len(),
        handlers = program.handler_count(),
        "compiled workspace"
    );
    program
}

/* ===================== Compiler ===================== */

struct Compiler<'g, G: BlockGraph> {
    graph: &'g G,
}

impl<'g, G: BlockGraph> Compiler<'g, G> {
    /// Compile a statement chain starting at `first`
    fn chain(&self, first: Option<G::Node>) -> Vec<Command> {
        let mut out = Vec::new();
        let mut cursor = first;
        while let Some(node) = cursor {
            if let Some(command) = self.statement(node) {
                out.push(command);
            }
            cursor = self.graph.next(node);
        }
        out
    }

    fn body(&self, node: G::Node, input: &str) -> Vec<Command> {
        self.chain(self.graph.input_target(node, input))
    }

    fn statement(&self, node: G::Node) -> Option<Command> {
        let kind = match self.graph.node_type(node) {
            "bp_move" => CommandKind::Move {
                steps: self.input_or(node, "STEPS", Expr::num(0.0)),
            },
            "bp_turn" => CommandKind::Turn {
                degrees: self.input_or(node, "DEG", Expr::num(0.0)),
            },
            "bp_wait" => CommandKind::Wait {
                seconds: self.input_or(node, "SECS", Expr::num(0.0)),
            },

            "bp_repeat" => CommandKind::Repeat {
                times: self.input_or(node, "TIMES", Expr::num(0.0)),
                body: self.body(node, "DO").into(),
            },
            "bp_forever" => CommandKind::Forever {
                body: self.body(node, "DO").into(),
            },
            "bp_if" => CommandKind::If {
                cond: self.input_or(node, "COND", Expr::bool(false)),
                body: self.body(node, "DO").into(),
            },
            "bp_if_else" => CommandKind::IfElse {
                cond: self.input_or(node, "COND", Expr::bool(false)),
                then_body: self.body(node, "DO").into(),
                else_body: self.body(node, "ELSE").into(),
            },

            "variables_set" => CommandKind::SetVar {
                name: self.field(node, "VAR"),
                value: self.input_or(node, "VALUE", Expr::num(0.0)),
            },
            "math_change" => CommandKind::ChangeVar {
                name: self.field(node, "VAR"),
                delta: self.input_or(node, "DELTA", Expr::num(1.0)),
            },
            "bp_delete_var" => CommandKind::DeleteVar {
                name: self.field(node, "VAR"),
            },

            "bp_broadcast" => CommandKind::Broadcast {
                message: self.message(node),
                wait: false,
            },
            "bp_broadcast_wait" => CommandKind::Broadcast {
                message: self.message(node),
                wait: true,
            },

            "bp_break" => CommandKind::Break,
            "bp_continue" => CommandKind::Continue,
            // `bp_stop` is the single stop block of older workspaces
            "bp_stop_all" | "bp_stop" => CommandKind::StopAll,
            "bp_stop_this" => CommandKind::StopThis,

            other => {
                trace!(block = self.graph.node_id(node), kind = other, "unknown statement block skipped");
                return None;
            }
        };
        Some(Command::new(self.graph.node_id(node), kind))
    }

    /* ===================== Values ===================== */

    fn input_or(&self, node: G::Node, input: &str, fallback: Expr) -> Expr {
        self.graph
            .input_target(node, input)
            .and_then(|target| self.value(target))
            .unwrap_or(fallback)
    }

    fn value(&self, node: G::Node) -> Option<Expr> {
        let expr = match self.graph.node_type(node) {
            "math_number" => Expr::num(parse_number(self.graph.field(node, "NUM"))),
            "logic_boolean" => Expr::bool(self.graph.field(node, "BOOL") == Some("TRUE")),
            "text" => Expr::str(self.field(node, "TEXT")),
            "variables_get" => Expr::var(self.field(node, "VAR")),

            "math_arithmetic" => {
                let op = match self.graph.field(node, "OP") {
                    Some("MINUS") => ArithOp::Sub,
                    Some("MULTIPLY") => ArithOp::Mul,
                    Some("DIVIDE") => ArithOp::Div,
                    _ => ArithOp::Add,
                };
                Expr::bin(
                    op,
                    self.input_or(node, "A", Expr::num(0.0)),
                    self.input_or(node, "B", Expr::num(0.0)),
                )
            }
            "logic_compare" => {
                let op = match self.graph.field(node, "OP") {
                    Some("LT") => CmpOp::Lt,
                    Some("GT") => CmpOp::Gt,
                    _ => CmpOp::Eq,
                };
                Expr::cmp(
                    op,
                    self.input_or(node, "A", Expr::num(0.0)),
                    self.input_or(node, "B", Expr::num(0.0)),
                )
            }
            "logic_operation" => {
                let op = match self.graph.field(node, "OP") {
                    Some("OR") => LogicOp::Or,
                    _ => LogicOp::And,
                };
                Expr::logic(
                    op,
                    self.input_or(node, "A", Expr::bool(false)),
                    self.input_or(node, "B", Expr::bool(false)),
                )
            }

            other => {
                trace!(block = self.graph.node_id(node), kind = other, "unknown value block skipped");
                return None;
            }
        };
        Some(expr)
    }

    /// Message of a broadcast or receive block: the wired `MSG` input, else
    /// the text of a `MSG` field, else `""`.
    fn message(&self, node: G::Node) -> Expr {
        if let Some(expr) = self
            .graph
            .input_target(node, "MSG")
            .and_then(|target| self.value(target))
        {
            return expr;
        }
        match self.graph.field(node, "MSG") {
            Some(text) => Expr::str(text),
            None => Expr::str(""),
        }
    }

    /// Handler key: the message if it is a string literal, otherwise `""`
    fn handler_message(&self, node: G::Node) -> String {
        let message = self.message(node);
        match message.as_str_literal() {
            Some(text) => text.to_string(),
            None => {
                debug!(block = self.graph.node_id(node), "non-literal handler message filed under \"\"");
                String::new()
            }
        }
    }

    fn field(&self, node: G::Node, name: &str) -> String {
        self.graph.field(node, name).unwrap_or_default().to_string()
    }
}

/// Numeric field text; blank or non-numeric reads as 0
fn parse_number(text: Option<&str>) -> f64 {
    text.map(str::trim)
        .and_then(|t| t.parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}
