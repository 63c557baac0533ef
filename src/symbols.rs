//! Symbol catalog shared by every genome in a run.
//!
//! A [`SymbolSet`] is built once from configuration and read-only afterward,
//! so it is safely shared across evaluation threads. It assigns stable ids
//! (functions first, then terminals, then the optional constant-terminal),
//! precomputes the cumulative weight tables used for weighted sampling, and
//! carries Ferreira's head-composition probability.

use crate::config::{ConfigSection, ConstantConfig, SymbolConfig};
use crate::error::{KarvaError, Result};
use crate::functions::{FunctionRegistry, Op};
use crate::sampling::{pick_from_distribution, CHECK_BOUNDARY};
use rand::Rng;

/// The closed set of symbol kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    Function { op: Op },
    /// A variable bound to data column `column` of the training/testing split.
    Terminal { column: usize },
    /// The synthetic terminal whose value comes from a chromosome's
    /// constant pool via the Dc array.
    ConstantTerminal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub weight: u32,
    pub kind: SymbolKind,
}

impl Symbol {
    pub fn arity(&self) -> usize {
        match &self.kind {
            SymbolKind::Function { op } => op.arity(),
            _ => 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.arity() == 0
    }

    pub fn op(&self) -> Option<Op> {
        match &self.kind {
            SymbolKind::Function { op } => Some(*op),
            _ => None,
        }
    }
}

/// Immutable symbol catalog with weighted-sampling support.
#[derive(Debug, Clone)]
pub struct SymbolSet {
    symbols: Vec<Symbol>,
    num_functions: usize,
    /// Terminal count including the constant-terminal when present.
    num_terminals: usize,
    cumulative_all: Vec<f64>,
    cumulative_terminals: Vec<f64>,
    cumulative_functions: Vec<f64>,
    probability_of_choosing_function: f64,
    constant_terminal: Option<usize>,
    constants: Option<ConstantConfig>,
    logical: bool,
}

impl SymbolSet {
    /// Build the catalog from configuration, resolving function names
    /// through the registry. Fails fast on an empty terminal list, unknown
    /// function names, or a mix of logical and arithmetic functions.
    pub fn build(config: &SymbolConfig, registry: &FunctionRegistry) -> Result<Self> {
        config.validate()?;

        let mut symbols = Vec::with_capacity(config.functions.len() + config.terminals.len() + 1);
        for spec in &config.functions {
            let op = registry.resolve(&spec.name)?;
            symbols.push(Symbol {
                name: spec.name.clone(),
                weight: spec.weight,
                kind: SymbolKind::Function { op },
            });
        }
        let num_functions = symbols.len();

        let logical = symbols[0].op().map(Op::is_logical).unwrap_or(false);
        for symbol in &symbols {
            let op = symbol.op().expect("function symbols carry ops");
            if op.is_logical() != logical {
                return Err(KarvaError::Configuration(format!(
                    "function {:?} mixes {} into a {} symbol set",
                    symbol.name,
                    if op.is_logical() { "logic" } else { "arithmetic" },
                    if logical { "logical" } else { "non-logical" },
                )));
            }
        }

        for (column, name) in config.terminals.iter().enumerate() {
            symbols.push(Symbol {
                name: name.clone(),
                weight: 1,
                kind: SymbolKind::Terminal { column },
            });
        }
        let plain_terminals = config.terminals.len();

        let constant_terminal = config.constants.as_ref().map(|_| {
            symbols.push(Symbol {
                name: "C".to_string(),
                weight: 1,
                kind: SymbolKind::ConstantTerminal,
            });
            symbols.len() - 1
        });
        let num_terminals = symbols.len() - num_functions;

        // The constant-terminal is excluded from the composition heuristic.
        let probability_of_choosing_function = if num_functions < plain_terminals {
            2.0 / 3.0
        } else {
            1.0 / 2.0
        };

        let cumulative_all = cumulative_weights(symbols.iter());
        let cumulative_functions = cumulative_weights(symbols[..num_functions].iter());
        let cumulative_terminals = cumulative_weights(symbols[num_functions..].iter());

        log::debug!(
            "symbol set built: {num_functions} functions, {num_terminals} terminals, p(function) = {probability_of_choosing_function}"
        );

        Ok(Self {
            symbols,
            num_functions,
            num_terminals,
            cumulative_all,
            cumulative_terminals,
            cumulative_functions,
            probability_of_choosing_function,
            constant_terminal,
            constants: config.constants.clone(),
            logical,
        })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn num_functions(&self) -> usize {
        self.num_functions
    }

    pub fn num_terminals(&self) -> usize {
        self.num_terminals
    }

    pub fn is_logical(&self) -> bool {
        self.logical
    }

    pub fn symbol(&self, id: usize) -> &Symbol {
        &self.symbols[id]
    }

    /// Bounds-checked lookup for ids coming from mutated or deserialized
    /// genomes.
    pub fn symbol_checked(&self, id: usize) -> Result<&Symbol> {
        self.symbols
            .get(id)
            .ok_or_else(|| KarvaError::Generation(format!("symbol id {id} out of range")))
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Id of the constant-terminal, when constants are enabled.
    pub fn constant_terminal(&self) -> Option<usize> {
        self.constant_terminal
    }

    pub fn constants(&self) -> Option<&ConstantConfig> {
        self.constants.as_ref()
    }

    pub fn max_arity(&self) -> usize {
        self.symbols[..self.num_functions]
            .iter()
            .map(Symbol::arity)
            .max()
            .unwrap_or(0)
    }

    pub fn probability_of_choosing_function(&self) -> f64 {
        self.probability_of_choosing_function
    }

    /// Sample a function id from the function weight distribution.
    pub fn choose_function_symbol<R: Rng>(&self, rng: &mut R) -> usize {
        pick_from_distribution(&self.cumulative_functions, rng.gen::<f64>(), CHECK_BOUNDARY)
    }

    /// Sample a terminal id (constant-terminal included) from the terminal
    /// weight distribution.
    pub fn choose_terminal_symbol<R: Rng>(&self, rng: &mut R) -> usize {
        self.num_functions
            + pick_from_distribution(&self.cumulative_terminals, rng.gen::<f64>(), CHECK_BOUNDARY)
    }

    /// Sample any symbol id from the full weight distribution.
    pub fn choose_any_symbol<R: Rng>(&self, rng: &mut R) -> usize {
        pick_from_distribution(&self.cumulative_all, rng.gen::<f64>(), CHECK_BOUNDARY)
    }

    /// Head/tail grammar rule: head positions draw function-vs-terminal by
    /// the composition probability, tail positions always draw a terminal.
    /// Both comparisons are strict.
    pub fn choose_symbol<R: Rng>(&self, rng: &mut R, gene_position: usize, head_size: usize) -> usize {
        if gene_position < head_size {
            if rng.gen::<f64>() < self.probability_of_choosing_function {
                self.choose_function_symbol(rng)
            } else {
                self.choose_terminal_symbol(rng)
            }
        } else {
            self.choose_terminal_symbol(rng)
        }
    }
}

fn cumulative_weights<'a>(symbols: impl Iterator<Item = &'a Symbol>) -> Vec<f64> {
    let weights: Vec<f64> = symbols.map(|s| f64::from(s.weight)).collect();
    let total: f64 = weights.iter().sum();
    let mut running = 0.0;
    weights
        .iter()
        .map(|w| {
            running += w;
            running / total
        })
        .collect()
}
