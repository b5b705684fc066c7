use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Configuration error in {stage} at '{key}': {reason}")]
    Config {
        stage:  &'static str,
        key:    String,
        reason: String,
    },

    #[error("Degenerate input in {stage}: column '{column}' {reason}")]
    DegenerateInput {
        stage:  &'static str,
        column: String,
        reason: String,
    },

    #[error("Sampling error: requested {requested} rows but only {available} are available")]
    Sampling { requested: usize, available: usize },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SimError {
    pub fn config(stage: &'static str, key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            stage,
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn degenerate(stage: &'static str, column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DegenerateInput {
            stage,
            column: column.into(),
            reason: reason.into(),
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

pub type SimResult<T> = Result<T, SimError>;
