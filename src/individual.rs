//! A multi-chromosome individual.
//!
//! Vector-function problems evolve one chromosome per dependent variable;
//! the individual aggregates evaluation, sizing, equality and genotype
//! serialization over its chromosomes. Breeding and fitness live outside
//! this crate and drive these operations per individual.

use crate::config::GenomeConfig;
use crate::data::{DataSplit, TerminalData};
use crate::error::Result;
use crate::functions::FunctionRegistry;
use crate::genome::Chromosome;
use crate::symbols::SymbolSet;
use rand::Rng;
use serde::Serialize;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
pub struct Individual {
    chromosomes: Vec<Chromosome>,
}

/// Reporting snapshot of one chromosome's decoded form.
#[derive(Debug, Clone, Serialize)]
pub struct ChromosomeSummary {
    pub karva: String,
    pub expression: String,
    pub size: usize,
}

impl Individual {
    pub fn new(config: &GenomeConfig, set: &SymbolSet, registry: &FunctionRegistry) -> Result<Self> {
        let chromosomes = (0..config.chromosomes_per_individual)
            .map(|_| Chromosome::new(config, set, registry))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { chromosomes })
    }

    pub fn num_chromosomes(&self) -> usize {
        self.chromosomes.len()
    }

    pub fn chromosome(&self, index: usize) -> &Chromosome {
        &self.chromosomes[index]
    }

    pub fn chromosome_mut(&mut self, index: usize) -> &mut Chromosome {
        &mut self.chromosomes[index]
    }

    pub fn reset<R: Rng>(&mut self, set: &SymbolSet, rng: &mut R) {
        for chromosome in &mut self.chromosomes {
            chromosome.reset(set, rng);
        }
    }

    /// Evaluate every chromosome over one row: one output per dependent
    /// variable.
    pub fn eval(
        &mut self,
        set: &SymbolSet,
        data: &TerminalData,
        split: DataSplit,
        row: usize,
    ) -> Result<Vec<f64>> {
        self.chromosomes
            .iter_mut()
            .map(|c| c.eval(set, data, split, row))
            .collect()
    }

    /// Total decoded node count across chromosomes.
    pub fn size(&mut self, set: &SymbolSet) -> Result<usize> {
        let mut total = 0;
        for chromosome in &mut self.chromosomes {
            total += chromosome.size(set)?;
        }
        Ok(total)
    }

    pub fn genotype_to_string(&self) -> String {
        self.chromosomes
            .iter()
            .map(Chromosome::genotype_to_string)
            .collect()
    }

    pub fn parse_genotype(&mut self, text: &str) -> Result<()> {
        let mut cursor = 0usize;
        for chromosome in &mut self.chromosomes {
            cursor = chromosome.parse_genotype(text, cursor)?;
        }
        Ok(())
    }

    pub fn write_genotype(&self, out: &mut Vec<u8>) {
        for chromosome in &self.chromosomes {
            chromosome.write_genotype(out);
        }
    }

    pub fn read_genotype(&mut self, bytes: &[u8]) -> Result<()> {
        let mut cursor = 0usize;
        for chromosome in &mut self.chromosomes {
            cursor += chromosome.read_genotype(&bytes[cursor..])?;
        }
        Ok(())
    }

    pub fn summaries(&mut self, set: &SymbolSet) -> Result<Vec<ChromosomeSummary>> {
        let count = self.chromosomes.len();
        let mut summaries = Vec::with_capacity(count);
        for index in 0..count {
            let karva = self.chromosomes[index].to_karva_string(set);
            let expression = self.chromosomes[index].to_math_string(set)?;
            let size = self.chromosomes[index].size(set)?;
            summaries.push(ChromosomeSummary {
                karva,
                expression,
                size,
            });
        }
        Ok(summaries)
    }
}

impl PartialEq for Individual {
    fn eq(&self, other: &Self) -> bool {
        self.chromosomes == other.chromosomes
    }
}

impl Hash for Individual {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for chromosome in &self.chromosomes {
            chromosome.hash(state);
        }
    }
}
