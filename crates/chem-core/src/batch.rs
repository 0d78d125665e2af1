//! Consulta de estado en lote.
//!
//! Fan-out concurrente acotado y barrera al final: el resultado tiene la
//! misma longitud y orden que la entrada, y un identificador inválido nunca
//! hace fallar el lote.
use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::JobError;
use crate::status::StatusSnapshot;
use crate::tracker::JobTracker;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchOutcome {
    Status { snapshot: StatusSnapshot },
    NotFound,
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub id: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
    /// Conteo por descripción de estado, más `NOT_FOUND` y `ERROR`.
    pub summary: IndexMap<String, usize>,
}

impl BatchReport {
    fn new(entries: Vec<BatchEntry>) -> Self {
        let mut summary = IndexMap::new();
        for entry in &entries {
            let key = match &entry.outcome {
                BatchOutcome::Status { snapshot } => snapshot.description.clone(),
                BatchOutcome::NotFound => "NOT_FOUND".to_string(),
                BatchOutcome::Error { .. } => "ERROR".to_string(),
            };
            *summary.entry(key).or_insert(0) += 1;
        }
        Self { entries, summary }
    }

    pub fn finished(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(&e.outcome, BatchOutcome::Status { snapshot } if snapshot.is_finished))
            .count()
    }
}

pub struct BatchStatusAggregator<'t> {
    tracker: &'t JobTracker,
    concurrency: usize,
}

impl<'t> BatchStatusAggregator<'t> {
    pub fn new(tracker: &'t JobTracker, concurrency: usize) -> Self {
        Self { tracker,
               concurrency: concurrency.max(1) }
    }

    pub async fn status_of(&self, ids: &[String]) -> BatchReport {
        let entries = stream::iter(ids.iter().cloned())
            .map(|id| async move {
                let outcome = match self.tracker.get_status(&id).await {
                    Ok(snapshot) => BatchOutcome::Status { snapshot },
                    Err(JobError::NotFound { .. }) => BatchOutcome::NotFound,
                    Err(err) => BatchOutcome::Error { message: err.to_string() },
                };
                BatchEntry { id, outcome }
            })
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await;
        BatchReport::new(entries)
    }
}
