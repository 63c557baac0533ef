use crate::error::{KarvaError, Result};
use crate::functions::ops::Op;
use std::collections::HashMap;

/// Explicit name → operation registry.
///
/// Function names coming from configuration are resolved here exactly once,
/// at symbol-set build time; an unregistered name is a fatal configuration
/// error, not a runtime lookup failure.
pub struct FunctionRegistry {
    functions: HashMap<&'static str, Op>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };
        registry.register_arithmetic();
        registry.register_logical();
        registry
    }

    pub fn get(&self, name: &str) -> Option<Op> {
        self.functions.get(name).copied()
    }

    /// Resolve a configured function name, failing fast on unknown names.
    pub fn resolve(&self, name: &str) -> Result<Op> {
        self.get(name)
            .ok_or_else(|| KarvaError::Configuration(format!("unknown function symbol {name:?}")))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.functions.keys().copied()
    }

    fn register_arithmetic(&mut self) {
        for op in [
            Op::Add,
            Op::Sub,
            Op::Mul,
            Op::Div,
            Op::Pow,
            Op::Min,
            Op::Max,
            Op::Neg,
            Op::Abs,
            Op::Sqrt,
            Op::Exp,
            Op::Ln,
            Op::Sin,
            Op::Cos,
            Op::Tan,
        ] {
            self.functions.insert(op.name(), op);
        }
    }

    fn register_logical(&mut self) {
        for op in [Op::And, Op::Or, Op::Not, Op::Nand, Op::Nor, Op::Xor] {
            self.functions.insert(op.name(), op);
        }
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
