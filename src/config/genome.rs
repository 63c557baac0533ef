use super::traits::ConfigSection;
use crate::error::KarvaError;
use serde::{Deserialize, Serialize};

/// Shape of every chromosome in a run: gene geometry, gene count per
/// chromosome, chromosome count per individual, and how multi-gene results
/// are linked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeConfig {
    pub head_size: usize,
    pub tail_size: usize,
    pub genes_per_chromosome: usize,
    pub chromosomes_per_individual: usize,
    /// Registry name of the function linking multi-gene results.
    pub linking_function: String,
    /// When set, chromosome output is thresholded to exactly 0 or 1 by
    /// `value >= threshold`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_threshold: Option<f64>,
}

impl Default for GenomeConfig {
    fn default() -> Self {
        Self {
            head_size: 7,
            tail_size: 8,
            genes_per_chromosome: 1,
            chromosomes_per_individual: 1,
            linking_function: "+".to_string(),
            classification_threshold: None,
        }
    }
}

impl GenomeConfig {
    /// Total gene length.
    pub fn gene_size(&self) -> usize {
        self.head_size + self.tail_size
    }

    /// The tail size that guarantees a head of `head_size` always decodes
    /// within the gene: `head * (max_arity - 1) + 1`.
    pub fn derived_tail(head_size: usize, max_arity: usize) -> usize {
        head_size * (max_arity.saturating_sub(1)) + 1
    }
}

impl ConfigSection for GenomeConfig {
    fn section_name() -> &'static str {
        "genome"
    }

    fn validate(&self) -> Result<(), KarvaError> {
        if self.head_size < 1 {
            return Err(KarvaError::Configuration(
                "head_size must be at least 1".to_string(),
            ));
        }
        if self.tail_size < 1 {
            return Err(KarvaError::Configuration(
                "tail_size must be at least 1".to_string(),
            ));
        }
        if self.genes_per_chromosome < 1 {
            return Err(KarvaError::Configuration(
                "genes_per_chromosome must be at least 1".to_string(),
            ));
        }
        if self.chromosomes_per_individual < 1 {
            return Err(KarvaError::Configuration(
                "chromosomes_per_individual must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_tail() {
        // Binary functions: tail = head + 1.
        assert_eq!(GenomeConfig::derived_tail(7, 2), 8);
        // Unary-only sets need a single trailing terminal.
        assert_eq!(GenomeConfig::derived_tail(7, 1), 1);
    }

    #[test]
    fn test_validate_rejects_zero_head() {
        let config = GenomeConfig {
            head_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
