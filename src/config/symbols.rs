use super::traits::ConfigSection;
use crate::error::KarvaError;
use serde::{Deserialize, Serialize};

/// One configured function symbol: a registry name plus a selection weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

impl FunctionSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: 1,
        }
    }

    pub fn weighted(name: impl Into<String>, weight: u32) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// Random-constant pool settings for one gene.
///
/// Float constants are drawn as `lower + u01 * (upper - lower)`, which makes
/// the upper limit exclusive; integer constants are drawn over
/// `upper - lower + 1` values, which makes it inclusive. The asymmetry is
/// inherited behavior and deliberately left as is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstantConfig {
    pub per_gene: usize,
    pub lower: f64,
    pub upper: f64,
    #[serde(default)]
    pub integer_mode: bool,
}

impl Default for ConstantConfig {
    fn default() -> Self {
        Self {
            per_gene: 5,
            lower: -10.0,
            upper: 10.0,
            integer_mode: false,
        }
    }
}

/// Symbol-set definition: which functions and terminals exist, with what
/// weights, and whether a constant-terminal is appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolConfig {
    pub functions: Vec<FunctionSpec>,
    /// Terminal names, one per bound data column, in column order.
    pub terminals: Vec<String>,
    /// Enables the synthetic constant-terminal and its pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constants: Option<ConstantConfig>,
}

impl Default for SymbolConfig {
    fn default() -> Self {
        Self {
            functions: vec![
                FunctionSpec::new("+"),
                FunctionSpec::new("-"),
                FunctionSpec::new("*"),
                FunctionSpec::new("/"),
            ],
            terminals: vec!["x".to_string()],
            constants: None,
        }
    }
}

impl ConfigSection for SymbolConfig {
    fn section_name() -> &'static str {
        "symbols"
    }

    fn validate(&self) -> Result<(), KarvaError> {
        if self.terminals.is_empty() {
            return Err(KarvaError::Configuration(
                "symbol set needs at least one terminal".to_string(),
            ));
        }
        if self.functions.is_empty() {
            return Err(KarvaError::Configuration(
                "symbol set needs at least one function".to_string(),
            ));
        }
        for spec in &self.functions {
            if spec.weight < 1 {
                return Err(KarvaError::Configuration(format!(
                    "function {:?} has weight {}, minimum is 1",
                    spec.name, spec.weight
                )));
            }
        }
        if let Some(constants) = &self.constants {
            if constants.per_gene == 0 {
                return Err(KarvaError::Configuration(
                    "constants.per_gene must be at least 1".to_string(),
                ));
            }
            if constants.lower > constants.upper {
                return Err(KarvaError::Configuration(format!(
                    "constants range [{}, {}] is inverted",
                    constants.lower, constants.upper
                )));
            }
        }
        Ok(())
    }
}
