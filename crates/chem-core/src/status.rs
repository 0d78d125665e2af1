//! Instantánea del estado de un trabajo.
use chem_domain::JobStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lectura puntual de un estado remoto. Puede estar obsoleta en cuanto se
/// usa: el servicio sigue avanzando el trabajo por su cuenta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub id: String,
    pub status: JobStatus,
    pub code: i64,
    pub description: String,
    pub is_finished: bool,
    pub is_successful: bool,
    pub is_failed: bool,
    pub is_running: bool,
    pub is_stopped: bool,
    pub observed_at: DateTime<Utc>,
}

impl StatusSnapshot {
    pub fn new(id: &str, status: JobStatus) -> Self {
        Self { id: id.to_string(),
               status,
               code: status.code(),
               description: status.description().to_string(),
               is_finished: status.is_terminal(),
               is_successful: status == JobStatus::Completed,
               is_failed: status == JobStatus::Failed,
               is_running: status == JobStatus::Running,
               is_stopped: status == JobStatus::Stopped,
               observed_at: Utc::now() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_follow_status() {
        let done = StatusSnapshot::new("w", JobStatus::Completed);
        assert!(done.is_finished && done.is_successful && !done.is_failed);
        assert_eq!(done.description, "COMPLETED_OK");

        let waiting = StatusSnapshot::new("w", JobStatus::AwaitingQueue);
        assert!(!waiting.is_finished && !waiting.is_running);
        assert_eq!(waiting.code, 5);
    }
}
