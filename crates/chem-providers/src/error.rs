use thiserror::Error;

/// Fallos en la frontera con el servicio de cómputo remoto.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Red, timeout, 5xx, 429. Se reintenta.
    #[error("transient service failure: {0}")]
    Transient(String),

    /// Se agotaron los reintentos de un fallo transitorio.
    #[error("service still failing after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    /// 4xx del servicio. Nunca se reintenta; código y mensaje remotos tal cual.
    #[error("request rejected by compute service ({code}): {message}")]
    Rejected { code: u16, message: String },

    #[error("not found: {id}")]
    NotFound { id: String },

    #[error("could not decode service response: {0}")]
    Decode(String),

    /// URL base inutilizable; no depende del servicio, no se reintenta.
    #[error("invalid service endpoint: {0}")]
    Endpoint(String),
}

impl ServiceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Transient(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_is_retryable() {
        assert!(ServiceError::Transient("503".into()).is_retryable());
        assert!(!ServiceError::Rejected { code: 401, message: "bad key".into() }.is_retryable());
        assert!(!ServiceError::RetriesExhausted { attempts: 3, last: "503".into() }.is_retryable());
        assert!(ServiceError::NotFound { id: "x".into() }.is_not_found());
    }

    #[test]
    fn rejection_message_keeps_remote_code() {
        let err = ServiceError::Rejected { code: 422, message: "invalid method".into() };
        assert_eq!(err.to_string(), "request rejected by compute service (422): invalid method");
    }
}
