//! Errores del núcleo de seguimiento de trabajos y jerarquía.

use chem_providers::ServiceError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum JobError {
    #[error(transparent)]
    Service(ServiceError),
    #[error("not found: {id}")]
    NotFound { id: String },
    /// Mover `node` bajo `new_parent` cerraría un ciclo.
    #[error("moving {node} under {new_parent} would create a cycle")]
    Cycle { node: String, new_parent: String },
    #[error("parent folder {id} does not exist")]
    InvalidParent { id: String },
}

impl From<ServiceError> for JobError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound { id } => JobError::NotFound { id },
            other => JobError::Service(other),
        }
    }
}

impl JobError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, JobError::NotFound { .. })
    }
}
