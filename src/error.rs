use thiserror::Error;

#[derive(Error, Debug)]
pub enum KarvaError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Decode error at position {position}: {message}")]
    Decode { message: String, position: usize },

    #[error("Genotype error: {0}")]
    Genotype(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, KarvaError>;
