//! The linear genome: one or more Karva-notation genes plus the optional
//! constant machinery (Dc index arrays and per-gene constant pools).
//!
//! A chromosome's shape is fixed at construction by the run's
//! [`GenomeConfig`]; breeding operators mutate gene content in place through
//! the accessors here, which invalidate the cached parsed trees. The caches
//! are rebuilt lazily on the next evaluation or rendering.

use crate::config::{ConfigSection, GenomeConfig};
use crate::data::{DataSplit, TerminalData};
use crate::error::{KarvaError, Result};
use crate::functions::{FunctionRegistry, Op};
use crate::symbols::SymbolSet;
use crate::tree::{parse_gene, ExprNode};
use rand::Rng;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
pub struct Chromosome {
    pub(crate) head_size: usize,
    pub(crate) tail_size: usize,
    /// Symbol ids, `genes[g][position]`.
    pub(crate) genes: Vec<Vec<usize>>,
    /// Constant-pool indices, one per tail position, when constants are on.
    pub(crate) dc: Option<Vec<Vec<usize>>>,
    /// Constant pools, `constants[g][slot]`.
    pub(crate) constants: Option<Vec<Vec<f64>>>,
    pub(crate) linking: Op,
    pub(crate) classification_threshold: Option<f64>,
    /// Lazily parsed expression per gene; `None` after any mutation.
    parsed: Vec<Option<ExprNode>>,
}

impl Chromosome {
    /// Allocate a chromosome of the configured shape. Content is zeroed;
    /// call [`Chromosome::reset`] before first use.
    pub fn new(config: &GenomeConfig, set: &SymbolSet, registry: &FunctionRegistry) -> Result<Self> {
        config.validate()?;
        let linking = registry.resolve(&config.linking_function)?;
        if linking.arity() != 2 {
            return Err(KarvaError::Configuration(format!(
                "linking function {:?} must be binary",
                config.linking_function
            )));
        }

        let derived = GenomeConfig::derived_tail(config.head_size, set.max_arity());
        if config.tail_size < derived {
            log::warn!(
                "tail size {} is below {derived}; genes may fail to decode",
                config.tail_size
            );
        }

        let gene_size = config.gene_size();
        let num_genes = config.genes_per_chromosome;
        let (dc, constants) = match set.constants() {
            Some(pool) => (
                Some(vec![vec![0usize; config.tail_size]; num_genes]),
                Some(vec![vec![0.0f64; pool.per_gene]; num_genes]),
            ),
            None => (None, None),
        };

        Ok(Self {
            head_size: config.head_size,
            tail_size: config.tail_size,
            genes: vec![vec![0usize; gene_size]; num_genes],
            dc,
            constants,
            linking,
            classification_threshold: config.classification_threshold,
            parsed: vec![None; num_genes],
        })
    }

    pub fn head_size(&self) -> usize {
        self.head_size
    }

    pub fn tail_size(&self) -> usize {
        self.tail_size
    }

    pub fn gene_size(&self) -> usize {
        self.head_size + self.tail_size
    }

    pub fn num_genes(&self) -> usize {
        self.genes.len()
    }

    pub fn linking(&self) -> Op {
        self.linking
    }

    /// Randomly populate every gene respecting the head/tail grammar:
    /// position 0 is always a function, head positions draw by the
    /// composition probability, tail positions draw terminals only.
    ///
    /// Constant pools are refilled too. Integer-mode constants cover the
    /// configured range inclusively (`gen_range(0..range) + lower` with
    /// `range = upper - lower + 1`); float constants use
    /// `lower + u01 * (upper - lower)`, which never reaches the upper
    /// limit. That inclusive/exclusive asymmetry is inherited behavior and
    /// is kept as is.
    pub fn reset<R: Rng>(&mut self, set: &SymbolSet, rng: &mut R) {
        let head_size = self.head_size;
        for gene in &mut self.genes {
            gene[0] = set.choose_function_symbol(rng);
            for position in 1..gene.len() {
                gene[position] = set.choose_symbol(rng, position, head_size);
            }
        }

        if let (Some(dc), Some(constants), Some(pool)) =
            (&mut self.dc, &mut self.constants, set.constants())
        {
            for gene_constants in constants.iter_mut() {
                for slot in gene_constants.iter_mut() {
                    *slot = if pool.integer_mode {
                        let range = (pool.upper - pool.lower + 1.0) as u64;
                        rng.gen_range(0..range) as f64 + pool.lower
                    } else {
                        pool.lower + rng.gen::<f64>() * (pool.upper - pool.lower)
                    };
                }
            }
            for gene_dc in dc.iter_mut() {
                for entry in gene_dc.iter_mut() {
                    *entry = rng.gen_range(0..pool.per_gene);
                }
            }
        }

        self.invalidate();
    }

    pub fn gene(&self, gene: usize) -> &[usize] {
        &self.genes[gene]
    }

    /// Mutable gene access for breeding operators. Drops that gene's cached
    /// parse.
    pub fn gene_mut(&mut self, gene: usize) -> &mut Vec<usize> {
        self.parsed[gene] = None;
        &mut self.genes[gene]
    }

    pub fn dc(&self, gene: usize) -> Option<&[usize]> {
        self.dc.as_ref().map(|dc| dc[gene].as_slice())
    }

    pub fn dc_mut(&mut self, gene: usize) -> Option<&mut Vec<usize>> {
        self.parsed[gene] = None;
        self.dc.as_mut().map(|dc| &mut dc[gene])
    }

    pub fn constants(&self, gene: usize) -> Option<&[f64]> {
        self.constants.as_ref().map(|c| c[gene].as_slice())
    }

    pub fn constants_mut(&mut self, gene: usize) -> Option<&mut Vec<f64>> {
        self.parsed[gene] = None;
        self.constants.as_mut().map(|c| &mut c[gene])
    }

    /// Drop every cached parse. Required after any mutation that bypasses
    /// the `_mut` accessors.
    pub fn invalidate(&mut self) {
        for slot in &mut self.parsed {
            *slot = None;
        }
    }

    /// Parse (or fetch the cached parse of) one gene.
    pub fn parsed_gene(&mut self, gene: usize, set: &SymbolSet) -> Result<&ExprNode> {
        if self.parsed[gene].is_none() {
            let tree = parse_gene(
                &self.genes[gene],
                self.dc.as_ref().map(|dc| dc[gene].as_slice()),
                self.constants.as_ref().map(|c| c[gene].as_slice()),
                set,
            )?;
            self.parsed[gene] = Some(tree);
        }
        Ok(self.parsed[gene].as_ref().expect("cache filled above"))
    }

    /// Evaluate the chromosome over one data row.
    ///
    /// Gene 0's result seeds the linking chain; each further gene's result
    /// is folded in left-to-right through the linking function. Evaluation
    /// aborts with NaN as soon as a linking step yields NaN — but within a
    /// single gene's subtree there is no short-circuit, every child is
    /// evaluated before its parent applies. The asymmetry is deliberate and
    /// load-bearing for downstream fitness code.
    pub fn eval(
        &mut self,
        set: &SymbolSet,
        data: &TerminalData,
        split: DataSplit,
        row: usize,
    ) -> Result<f64> {
        let num_genes = self.genes.len();
        let mut result = self.parsed_gene(0, set)?.eval(data, split, row);
        for gene in 1..num_genes {
            let next = self.parsed_gene(gene, set)?.eval(data, split, row);
            result = self.linking.apply(&[result, next]);
            if result.is_nan() {
                return Ok(f64::NAN);
            }
        }
        if let Some(threshold) = self.classification_threshold {
            result = if result >= threshold { 1.0 } else { 0.0 };
        }
        Ok(result)
    }

    /// Total node count over all parsed genes.
    pub fn size(&mut self, set: &SymbolSet) -> Result<usize> {
        let mut total = 0;
        for gene in 0..self.genes.len() {
            total += self.parsed_gene(gene, set)?.node_count();
        }
        Ok(total)
    }

    /// Structural hash: a rotate-left-by-one XOR fold over every gene entry
    /// from a fixed seed. Consistent with equality, nothing more.
    pub fn structural_hash(&self) -> u64 {
        let mut hash: u64 = 0x9e37_79b9_7f4a_7c15;
        for gene in &self.genes {
            for &id in gene {
                hash = hash.rotate_left(1) ^ id as u64;
            }
        }
        hash
    }
}

impl PartialEq for Chromosome {
    /// Structural equality: gene arrays, Dc arrays and constant pools,
    /// element-wise. Constants compare exactly, not by tolerance.
    fn eq(&self, other: &Self) -> bool {
        self.genes == other.genes && self.dc == other.dc && self.constants == other.constants
    }
}

impl Hash for Chromosome {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.structural_hash());
    }
}
