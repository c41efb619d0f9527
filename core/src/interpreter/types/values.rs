//! Runtime value types

use std::fmt;

/// Value produced by evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Num(f64),
    Bool(bool),
    Str(String),
}

impl Val {
    /// Numeric view of the value. Anything that does not read as a finite
    /// number becomes 0.
    pub fn to_number(&self) -> f64 {
        let n = match self {
            Val::Num(n) => *n,
            Val::Bool(true) => 1.0,
            Val::Bool(false) => 0.0,
            Val::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().unwrap_or(0.0)
                }
            }
        };
        finite_or_zero(n)
    }

    /// Check if value is truthy (for conditions and logic operators)
    pub fn is_truthy(&self) -> bool {
        match self {
            Val::Num(n) => *n != 0.0 && !n.is_nan(),
            Val::Bool(b) => *b,
            Val::Str(s) => !s.is_empty(),
        }
    }
}

/// Message-string form: used when a value names a broadcast.
impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Num(n) => write!(f, "{}", n),
            Val::Bool(b) => write!(f, "{}", b),
            Val::Str(s) => f.write_str(s),
        }
    }
}

pub(crate) fn finite_or_zero(n: f64) -> f64 {
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_number_coercions() {
        assert_eq!(Val::Num(2.5).to_number(), 2.5);
        assert_eq!(Val::Num(f64::NAN).to_number(), 0.0);
        assert_eq!(Val::Num(f64::INFINITY).to_number(), 0.0);
        assert_eq!(Val::Bool(true).to_number(), 1.0);
        assert_eq!(Val::Str(" 12 ".into()).to_number(), 12.0);
        assert_eq!(Val::Str("".into()).to_number(), 0.0);
        assert_eq!(Val::Str("go".into()).to_number(), 0.0);
    }

    #[test]
    fn test_truthiness() {
        assert!(Val::Num(-1.0).is_truthy());
        assert!(!Val::Num(0.0).is_truthy());
        assert!(!Val::Num(f64::NAN).is_truthy());
        assert!(Val::Str("x".into()).is_truthy());
        assert!(!Val::Str(String::new()).is_truthy());
        assert!(!Val::Bool(false).is_truthy());
    }

    #[test]
    fn test_display_as_message() {
        assert_eq!(Val::Num(5.0).to_string(), "5");
        assert_eq!(Val::Num(2.5).to_string(), "2.5");
        assert_eq!(Val::Bool(true).to_string(), "true");
        assert_eq!(Val::Str("go".into()).to_string(), "go");
    }
}
