//! Expression evaluation
//!
//! Pure and total: every expression evaluates to a value against a
//! variable snapshot. Nothing here can fail or mutate state.

use std::collections::HashMap;

use super::types::values::finite_or_zero;
use super::types::{ArithOp, CmpOp, Expr, LogicOp, Val};

/// Variable store: name to number. Absent names read as 0.
pub type Variables = HashMap<String, f64>;

/// Read a variable, defaulting to 0 when unset
pub fn read_var(vars: &Variables, name: &str) -> f64 {
    vars.get(name).copied().unwrap_or(0.0)
}

/// Evaluate an expression to a value
pub fn evaluate(expr: &Expr, vars: &Variables) -> Val {
    match expr {
        Expr::Num { value } => Val::Num(finite_or_zero(*value)),

        Expr::Bool { value } => Val::Bool(*value),

        Expr::Str { value } => Val::Str(value.clone()),

        Expr::Var { name } => Val::Num(read_var(vars, name)),

        Expr::Bin { op, left, right } => {
            let a = evaluate(left, vars).to_number();
            let b = evaluate(right, vars).to_number();
            Val::Num(finite_or_zero(arith(*op, a, b)))
        }

        Expr::Cmp { op, left, right } => {
            let a = evaluate(left, vars).to_number();
            let b = evaluate(right, vars).to_number();
            Val::Bool(match op {
                CmpOp::Eq => a == b,
                CmpOp::Lt => a < b,
                CmpOp::Gt => a > b,
            })
        }

        Expr::Logic { op, left, right } => {
            let a = evaluate(left, vars).is_truthy();
            let b = evaluate(right, vars).is_truthy();
            Val::Bool(match op {
                LogicOp::And => a && b,
                LogicOp::Or => a || b,
            })
        }

        Expr::Unsupported => Val::Num(0.0),
    }
}

/// Evaluate and coerce to a number
pub fn eval_number(expr: &Expr, vars: &Variables) -> f64 {
    evaluate(expr, vars).to_number()
}

/// Evaluate and coerce by truthiness
pub fn eval_condition(expr: &Expr, vars: &Variables) -> bool {
    evaluate(expr, vars).is_truthy()
}

fn arith(op: ArithOp, a: f64, b: f64) -> f64 {
    match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => {
            if b == 0.0 {
                0.0
            } else {
                a / b
            }
        }
    }
}
