use thiserror::Error;

/// Errores del modelo de dominio (parseo y valores fuera de catálogo).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid structure '{input}' at position {position}: {reason}")]
    InvalidStructure { input: String, position: usize, reason: String },

    #[error("unknown calculation mode '{0}'")]
    UnknownMode(String),

    #[error("unknown workflow type '{0}'")]
    UnknownWorkflowType(String),

    #[error("unknown notation '{0}'")]
    UnknownNotation(String),

    #[error("unknown job status code {0}")]
    UnknownStatus(i64),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Serialization(e.to_string())
    }
}
