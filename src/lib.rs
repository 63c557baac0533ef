//! # karva
//!
//! Core data representations for gene expression programming (GEP) and
//! genetic programming (GP): symbol catalogs, Karva-notation linear
//! genomes, expression-tree decoding and evaluation, and lossless genotype
//! serialization.
//!
//! The crate deliberately stops at the representation layer. Breeding
//! operators, fitness functions and the generational loop are callers: they
//! supply one random-number stream per worker thread, mutate genomes
//! through the cache-invalidating accessors, and ask for evaluation results
//! and serialized genotypes.
//!
//! ```no_run
//! use karva::config::{ExpressionConfig, GenomeConfig};
//! use karva::data::{DataSplit, TerminalData};
//! use karva::functions::FunctionRegistry;
//! use karva::genome::Chromosome;
//! use karva::symbols::SymbolSet;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! # fn main() -> karva::error::Result<()> {
//! let config = ExpressionConfig::default();
//! let registry = FunctionRegistry::new();
//! let set = SymbolSet::build(&config.symbols, &registry)?;
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let mut chromosome = Chromosome::new(&config.genome, &set, &registry)?;
//! chromosome.reset(&set, &mut rng);
//!
//! let data = TerminalData::training_only(vec![vec![1.0, 2.0, 3.0]])?;
//! let value = chromosome.eval(&set, &data, DataSplit::Training, 0)?;
//! println!("{} = {value}", chromosome.to_math_string(&set)?);
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod data;
pub mod error;
pub mod functions;
pub mod genome;
pub mod genotype;
pub mod gp;
pub mod individual;
pub mod sampling;
pub mod symbols;
pub mod tree;

pub use config::ExpressionConfig;
pub use data::{DataSplit, TerminalData};
pub use error::{KarvaError, Result};
pub use functions::{FunctionRegistry, Op};
pub use genome::Chromosome;
pub use gp::{GpNode, GpTree};
pub use individual::{ChromosomeSummary, Individual};
pub use symbols::{Symbol, SymbolKind, SymbolSet};
pub use tree::ExprNode;
