//! Terminal data binding.
//!
//! Data ingestion lives outside this crate; callers hand each terminal its
//! training column and, optionally, a disjoint testing column as plain
//! `Vec<f64>` rows. All columns of a split share one row index space.

use crate::error::{KarvaError, Result};

/// Which bound column a terminal reads during evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSplit {
    Training,
    Testing,
}

/// Column-major storage for terminal values, one column per terminal.
#[derive(Debug, Clone, Default)]
pub struct TerminalData {
    training: Vec<Vec<f64>>,
    testing: Vec<Vec<f64>>,
}

impl TerminalData {
    /// Build from training columns only.
    pub fn training_only(training: Vec<Vec<f64>>) -> Result<Self> {
        Self::new(training, Vec::new())
    }

    pub fn new(training: Vec<Vec<f64>>, testing: Vec<Vec<f64>>) -> Result<Self> {
        check_rectangular(&training, "training")?;
        check_rectangular(&testing, "testing")?;
        if !testing.is_empty() && testing.len() != training.len() {
            return Err(KarvaError::Configuration(format!(
                "testing data has {} columns, training has {}",
                testing.len(),
                training.len()
            )));
        }
        Ok(Self { training, testing })
    }

    pub fn columns(&self) -> usize {
        self.training.len()
    }

    pub fn rows(&self, split: DataSplit) -> usize {
        let columns = match split {
            DataSplit::Training => &self.training,
            DataSplit::Testing => &self.testing,
        };
        columns.first().map_or(0, Vec::len)
    }

    pub fn value(&self, split: DataSplit, column: usize, row: usize) -> f64 {
        match split {
            DataSplit::Training => self.training[column][row],
            DataSplit::Testing => self.testing[column][row],
        }
    }
}

fn check_rectangular(columns: &[Vec<f64>], label: &str) -> Result<()> {
    if let Some(first) = columns.first() {
        for (index, column) in columns.iter().enumerate() {
            if column.len() != first.len() {
                return Err(KarvaError::Configuration(format!(
                    "{label} column {index} has {} rows, expected {}",
                    column.len(),
                    first.len()
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_lookup() {
        let data = TerminalData::new(
            vec![vec![1.0, 2.0], vec![3.0, 4.0]],
            vec![vec![9.0, 8.0], vec![7.0, 6.0]],
        )
        .unwrap();
        assert_eq!(data.value(DataSplit::Training, 1, 0), 3.0);
        assert_eq!(data.value(DataSplit::Testing, 0, 1), 8.0);
        assert_eq!(data.rows(DataSplit::Training), 2);
    }

    #[test]
    fn test_ragged_columns_rejected() {
        assert!(TerminalData::training_only(vec![vec![1.0], vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_column_count_mismatch_rejected() {
        assert!(TerminalData::new(vec![vec![1.0]], vec![vec![1.0], vec![2.0]]).is_err());
    }
}
