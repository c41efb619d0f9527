//! Program, command and expression trees
//!
//! This is the handoff artifact between the compiler and the engine. It is
//! plain data: no references back into the block graph it came from.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A command list shared immutably between the program and running frames.
pub type Block = Arc<[Command]>;

/* ===================== Program ===================== */

/// A compiled program: start scripts plus broadcast handlers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub scripts: Vec<Script>,
    /// Handlers grouped by message, in graph traversal order within a message.
    #[serde(default)]
    pub handlers: BTreeMap<String, Vec<Handler>>,
}

impl Program {
    /// Handlers registered for `message` (empty when none).
    pub fn handlers_for(&self, message: &str) -> &[Handler] {
        self.handlers
            .get(message)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }
}

/// A top-level command sequence. Scripts start unconditionally; handlers
/// share the same shape and start when their message is broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub id: String,
    pub commands: Block,
}

pub type Handler = Script;

impl Script {
    pub fn new(id: impl Into<String>, commands: Vec<Command>) -> Self {
        Self {
            id: id.into(),
            commands: commands.into(),
        }
    }
}

/* ===================== Commands ===================== */

/// One instruction, tagged with the id of the block it was compiled from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(default)]
    pub block_id: String,
    #[serde(flatten)]
    pub kind: CommandKind,
}

impl Command {
    pub fn new(block_id: impl Into<String>, kind: CommandKind) -> Self {
        Self {
            block_id: block_id.into(),
            kind,
        }
    }
}

/// Command variants. Control commands own their nested bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandKind {
    Move {
        steps: Expr,
    },
    Turn {
        degrees: Expr,
    },
    Wait {
        seconds: Expr,
    },
    Repeat {
        times: Expr,
        body: Block,
    },
    Forever {
        body: Block,
    },
    If {
        cond: Expr,
        body: Block,
    },
    IfElse {
        cond: Expr,
        then_body: Block,
        else_body: Block,
    },
    SetVar {
        name: String,
        value: Expr,
    },
    ChangeVar {
        name: String,
        delta: Expr,
    },
    DeleteVar {
        name: String,
    },
    Broadcast {
        message: Expr,
        #[serde(default)]
        wait: bool,
    },
    Break,
    Continue,
    StopAll,
    StopThis,
    /// Tag this build does not know; executes as a no-op.
    #[serde(other)]
    Unsupported,
}

impl CommandKind {
    /// Short name used in logs and validation messages.
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Move { .. } => "move",
            CommandKind::Turn { .. } => "turn",
            CommandKind::Wait { .. } => "wait",
            CommandKind::Repeat { .. } => "repeat",
            CommandKind::Forever { .. } => "forever",
            CommandKind::If { .. } => "if",
            CommandKind::IfElse { .. } => "if_else",
            CommandKind::SetVar { .. } => "set_var",
            CommandKind::ChangeVar { .. } => "change_var",
            CommandKind::DeleteVar { .. } => "delete_var",
            CommandKind::Broadcast { .. } => "broadcast",
            CommandKind::Break => "break",
            CommandKind::Continue => "continue",
            CommandKind::StopAll => "stop_all",
            CommandKind::StopThis => "stop_this",
            CommandKind::Unsupported => "unsupported",
        }
    }
}

/* ===================== Expressions ===================== */

/// Value expression. Side-effect free.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    Num {
        value: f64,
    },
    Bool {
        value: bool,
    },
    Str {
        value: String,
    },
    Var {
        name: String,
    },
    Bin {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Cmp {
        op: CmpOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logic {
        op: LogicOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Tag this build does not know; evaluates to 0.
    #[serde(other)]
    Unsupported,
}

impl Expr {
    pub fn num(value: f64) -> Self {
        Expr::Num { value }
    }

    pub fn bool(value: bool) -> Self {
        Expr::Bool { value }
    }

    pub fn str(value: impl Into<String>) -> Self {
        Expr::Str {
            value: value.into(),
        }
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var { name: name.into() }
    }

    pub fn bin(op: ArithOp, left: Expr, right: Expr) -> Self {
        Expr::Bin {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn cmp(op: CmpOp, left: Expr, right: Expr) -> Self {
        Expr::Cmp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn logic(op: LogicOp, left: Expr, right: Expr) -> Self {
        Expr::Logic {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// The literal string, if this is a `str` literal.
    pub fn as_str_literal(&self) -> Option<&str> {
        match self {
            Expr::Str { value } => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicOp {
    And,
    Or,
}
