//! The closed set of function-symbol behaviors.
//!
//! Symbol kinds are fixed, so operations are a tagged enum rather than an
//! open trait hierarchy: arity and evaluation dispatch are the only
//! polymorphism a symbol set needs. Arithmetic follows IEEE 754 — division
//! by zero, log of a negative and overflow all flow through as
//! `NaN`/`Infinity` and are never surfaced as errors.

use serde::{Deserialize, Serialize};

/// Truth threshold for the logical operations: inputs at or above it count
/// as true, and results are rendered as exactly 1.0 / 0.0.
const LOGICAL_TRUE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Min,
    Max,
    Neg,
    Abs,
    Sqrt,
    Exp,
    Ln,
    Sin,
    Cos,
    Tan,
    And,
    Or,
    Not,
    Nand,
    Nor,
    Xor,
}

impl Op {
    /// Number of child expressions this operation consumes.
    pub fn arity(self) -> usize {
        match self {
            Op::Neg | Op::Abs | Op::Sqrt | Op::Exp | Op::Ln | Op::Sin | Op::Cos | Op::Tan => 1,
            Op::Not => 1,
            _ => 2,
        }
    }

    /// Whether this operation belongs to the logical problem kind. A symbol
    /// set must be homogeneous: all logical or all arithmetic.
    pub fn is_logical(self) -> bool {
        matches!(self, Op::And | Op::Or | Op::Not | Op::Nand | Op::Nor | Op::Xor)
    }

    /// Stable name used in configuration and human-readable renderings.
    pub fn name(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Pow => "pow",
            Op::Min => "min",
            Op::Max => "max",
            Op::Neg => "neg",
            Op::Abs => "abs",
            Op::Sqrt => "sqrt",
            Op::Exp => "exp",
            Op::Ln => "ln",
            Op::Sin => "sin",
            Op::Cos => "cos",
            Op::Tan => "tan",
            Op::And => "and",
            Op::Or => "or",
            Op::Not => "not",
            Op::Nand => "nand",
            Op::Nor => "nor",
            Op::Xor => "xor",
        }
    }

    /// Apply the operation to already-evaluated child values.
    /// `args.len()` must equal `self.arity()`.
    pub fn apply(self, args: &[f64]) -> f64 {
        debug_assert_eq!(args.len(), self.arity());
        match self {
            Op::Add => args[0] + args[1],
            Op::Sub => args[0] - args[1],
            Op::Mul => args[0] * args[1],
            Op::Div => args[0] / args[1],
            Op::Pow => args[0].powf(args[1]),
            Op::Min => args[0].min(args[1]),
            Op::Max => args[0].max(args[1]),
            Op::Neg => -args[0],
            Op::Abs => args[0].abs(),
            Op::Sqrt => args[0].sqrt(),
            Op::Exp => args[0].exp(),
            Op::Ln => args[0].ln(),
            Op::Sin => args[0].sin(),
            Op::Cos => args[0].cos(),
            Op::Tan => args[0].tan(),
            Op::And => logical(truthy(args[0]) && truthy(args[1])),
            Op::Or => logical(truthy(args[0]) || truthy(args[1])),
            Op::Not => logical(!truthy(args[0])),
            Op::Nand => logical(!(truthy(args[0]) && truthy(args[1]))),
            Op::Nor => logical(!(truthy(args[0]) || truthy(args[1]))),
            Op::Xor => logical(truthy(args[0]) ^ truthy(args[1])),
        }
    }

    /// Render a call on already-rendered child expressions. Binary
    /// arithmetic uses parenthesized infix, everything else prefix form.
    pub fn render(self, args: &[String]) -> String {
        match self {
            Op::Add | Op::Sub | Op::Mul | Op::Div => {
                format!("({} {} {})", args[0], self.name(), args[1])
            }
            _ if self.arity() == 1 => format!("{}({})", self.name(), args[0]),
            _ => format!("{}({}, {})", self.name(), args[0], args[1]),
        }
    }
}

fn truthy(value: f64) -> bool {
    value >= LOGICAL_TRUE
}

fn logical(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}
