pub mod genome;
pub mod symbols;
pub mod traits;

pub use genome::GenomeConfig;
pub use symbols::{ConstantConfig, FunctionSpec, SymbolConfig};
pub use traits::ConfigSection;

use crate::error::{KarvaError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Aggregate configuration for the expression engine: the symbol set and the
/// genome shape. Loads and saves as TOML or JSON, dispatching on the file
/// extension.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpressionConfig {
    pub symbols: SymbolConfig,
    pub genome: GenomeConfig,
}

impl ExpressionConfig {
    pub fn validate(&self) -> Result<()> {
        self.symbols.validate()?;
        self.genome.validate()?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| KarvaError::Configuration(format!("failed to read config: {e}")))?;

        let config: Self = if has_extension(path, "json") {
            serde_json::from_str(&contents)
                .map_err(|e| KarvaError::Configuration(format!("failed to parse config: {e}")))?
        } else {
            toml::from_str(&contents)
                .map_err(|e| KarvaError::Configuration(format!("failed to parse config: {e}")))?
        };

        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let rendered = if has_extension(path, "json") {
            serde_json::to_string_pretty(self)
                .map_err(|e| KarvaError::Configuration(format!("failed to serialize: {e}")))?
        } else {
            toml::to_string_pretty(self)
                .map_err(|e| KarvaError::Configuration(format!("failed to serialize: {e}")))?
        };

        std::fs::write(path, rendered)
            .map_err(|e| KarvaError::Configuration(format!("failed to write config: {e}")))?;
        Ok(())
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        assert!(ExpressionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_no_terminals_rejected() {
        let mut config = ExpressionConfig::default();
        config.symbols.terminals.clear();
        assert!(matches!(
            config.validate(),
            Err(KarvaError::Configuration(_))
        ));
    }

    #[test]
    fn test_inverted_constants_range_rejected() {
        let mut config = ExpressionConfig::default();
        config.symbols.constants = Some(ConstantConfig {
            per_gene: 5,
            lower: 3.0,
            upper: -3.0,
            integer_mode: false,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = ExpressionConfig::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        let back: ExpressionConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(back.genome.head_size, config.genome.head_size);
        assert_eq!(back.symbols.terminals, config.symbols.terminals);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = ExpressionConfig::default();
        let rendered = serde_json::to_string(&config).unwrap();
        let back: ExpressionConfig = serde_json::from_str(&rendered).unwrap();
        assert_eq!(back.symbols.functions.len(), config.symbols.functions.len());
    }
}
