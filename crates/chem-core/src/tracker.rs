//! Seguimiento del ciclo de vida de un trabajo remoto.
//!
//! El tracker no conduce transiciones: sólo las observa con `get_status`.
//! Una vez visto un estado terminal para un identificador, las lecturas
//! siguientes devuelven ese mismo estado aunque el servicio informe otra cosa.
use chem_domain::{JobStatus, Workflow, WorkflowPatch, WorkflowType};
use chem_policies::Accepted;
use chem_providers::{ComputeService, ServiceError, Submission};
use dashmap::DashMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::cache::StatusCache;
use crate::errors::JobError;
use crate::status::StatusSnapshot;

/// Ritmo de sondeo en `wait_for_result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    /// Siempre `poll_interval`.
    #[default]
    Fixed,
    /// Empieza en `poll_interval` y crece un 50 % por sondeo hasta `max_interval`.
    Adaptive,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitOptions {
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub cadence: Cadence,
    pub max_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self { poll_interval: Duration::from_secs(5),
               timeout: Duration::from_secs(600),
               cadence: Cadence::Fixed,
               max_interval: Duration::from_secs(30) }
    }
}

/// Intervalo de sondeo mínimo; valores menores se elevan a éste.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

impl WaitOptions {
    /// Copia con `poll_interval >= MIN_POLL_INTERVAL` y `max_interval >= poll_interval`.
    pub fn clamped(&self) -> Self {
        let poll_interval = self.poll_interval.max(MIN_POLL_INTERVAL);
        Self { poll_interval,
               max_interval: self.max_interval.max(poll_interval),
               ..*self }
    }

    fn next_interval(&self, current: Duration) -> Duration {
        match self.cadence {
            Cadence::Fixed => self.poll_interval,
            Cadence::Adaptive => current.mul_f64(1.5).min(self.max_interval).max(self.poll_interval),
        }
    }
}

/// Resultado de esperar un trabajo. Agotar el tiempo no es un error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WaitOutcome {
    Finished {
        snapshot: StatusSnapshot,
        result: Value,
        polls: u32,
    },
    /// El trabajo sigue en curso; el remoto no se toca.
    Pending {
        last: Option<StatusSnapshot>,
        polls: u32,
        waited_secs: f64,
    },
    /// Señal externa de parada; sólo se detiene el sondeo local.
    Cancelled { last: Option<StatusSnapshot>, polls: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StopOutcome {
    StopRequested { previous: StatusSnapshot },
    /// Ya estaba terminado; no se envía nada.
    AlreadyTerminal { snapshot: StatusSnapshot },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submitted {
    pub id: String,
    pub workflow_type: WorkflowType,
    pub name: String,
    pub fingerprint: String,
}

pub struct JobTracker {
    service: Arc<dyn ComputeService>,
    terminal: DashMap<String, JobStatus>,
    cache: Option<StatusCache>,
}

impl JobTracker {
    pub fn new(service: Arc<dyn ComputeService>) -> Self {
        Self { service,
               terminal: DashMap::new(),
               cache: None }
    }

    pub fn with_cache(mut self, cache: StatusCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn service(&self) -> &Arc<dyn ComputeService> {
        &self.service
    }

    /// Sólo acepta solicitudes que ya pasaron el validador.
    pub async fn submit(&self, accepted: &Accepted) -> Result<Submitted, JobError> {
        let request = accepted.request();
        let submission = Submission { workflow_type: request.workflow_type,
                                      name: request.name.clone(),
                                      folder_id: request.folder_id.clone(),
                                      payload: accepted.payload() };
        let id = self.service.submit(&submission).await?;
        info!("submitted {} workflow '{}' as {id}", request.workflow_type, request.name);
        Ok(Submitted { id,
                       workflow_type: request.workflow_type,
                       name: request.name.clone(),
                       fingerprint: accepted.fingerprint().to_string() })
    }

    /// Una lectura en vivo.
    pub async fn get_status(&self, id: &str) -> Result<StatusSnapshot, JobError> {
        let code = self.service.get_status(id).await?;
        let snapshot = self.observe(id, code)?;
        if let Some(cache) = &self.cache {
            cache.record(&snapshot);
        }
        Ok(snapshot)
    }

    /// Último estado visto, sin ir al servicio. Puede estar obsoleto.
    pub fn cached_status(&self, id: &str) -> Option<StatusSnapshot> {
        self.cache.as_ref().and_then(|cache| cache.get(id))
    }

    fn observe(&self, id: &str, code: i64) -> Result<StatusSnapshot, JobError> {
        let reported =
            JobStatus::from_code(code).map_err(|e| JobError::Service(ServiceError::Decode(e.to_string())))?;
        let memo = self.terminal.get(id).map(|entry| *entry.value());
        let status = match memo {
            Some(terminal) if terminal != reported => {
                warn!("{id}: service reported {reported} after terminal {terminal}; keeping {terminal}");
                terminal
            }
            Some(terminal) => terminal,
            None => {
                if reported.is_terminal() {
                    self.terminal.insert(id.to_string(), reported);
                }
                reported
            }
        };
        Ok(StatusSnapshot::new(id, status))
    }

    pub async fn get_result(&self, id: &str) -> Result<Value, JobError> {
        Ok(self.service.get_result(id).await?)
    }

    /// Duerme, consulta y repite hasta ver un estado terminal o agotar
    /// `timeout`. Nunca sondea más rápido que `poll_interval`.
    pub async fn wait_for_result(&self,
                                 id: &str,
                                 options: &WaitOptions,
                                 cancel: &CancellationToken)
                                 -> Result<WaitOutcome, JobError> {
        let options = &options.clamped();
        let started = Instant::now();
        let deadline = started + options.timeout;
        let mut interval = options.poll_interval;
        let mut last = None;
        let mut polls = 0;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let final_nap = remaining < interval;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("{id}: wait cancelled after {polls} polls");
                    return Ok(WaitOutcome::Cancelled { last, polls });
                }
                _ = tokio::time::sleep(interval.min(remaining)) => {}
            }
            if final_nap {
                break;
            }

            let snapshot = self.get_status(id).await?;
            polls += 1;
            debug!("{id}: poll {polls} -> {}", snapshot.description);
            if snapshot.is_finished {
                let result = self.service.get_result(id).await?;
                return Ok(WaitOutcome::Finished { snapshot, result, polls });
            }
            last = Some(snapshot);
            if Instant::now() >= deadline {
                break;
            }
            interval = options.next_interval(interval);
        }
        info!("{id}: still pending after {:?}", options.timeout);
        Ok(WaitOutcome::Pending { last,
                                  polls,
                                  waited_secs: started.elapsed().as_secs_f64() })
    }

    /// Detener un trabajo terminado no es un error.
    pub async fn stop(&self, id: &str) -> Result<StopOutcome, JobError> {
        let previous = self.get_status(id).await?;
        if previous.is_finished {
            return Ok(StopOutcome::AlreadyTerminal { snapshot: previous });
        }
        match self.service.stop(id).await {
            Ok(()) => {
                info!("{id}: stop requested while {}", previous.description);
                Ok(StopOutcome::StopRequested { previous })
            }
            // Pudo terminar entre la lectura y la orden.
            Err(err @ ServiceError::Rejected { .. }) => {
                let current = self.get_status(id).await?;
                if current.is_finished {
                    Ok(StopOutcome::AlreadyTerminal { snapshot: current })
                } else {
                    Err(err.into())
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn delete(&self, id: &str) -> Result<(), JobError> {
        self.service.delete(id).await?;
        self.terminal.remove(id);
        if let Some(cache) = &self.cache {
            cache.forget(id);
        }
        info!("deleted workflow {id}");
        Ok(())
    }

    pub async fn retrieve(&self, id: &str) -> Result<Workflow, JobError> {
        Ok(self.service.retrieve_workflow(id).await?)
    }

    /// Registro completo recién leído junto con su estado, que pasa por el
    /// mismo memo terminal que `get_status`.
    pub async fn fetch_latest(&self, id: &str) -> Result<(Workflow, StatusSnapshot), JobError> {
        let mut workflow = self.service.retrieve_workflow(id).await?;
        let snapshot = self.observe(id, workflow.status.code())?;
        workflow.status = snapshot.status;
        if let Some(cache) = &self.cache {
            cache.record(&snapshot);
        }
        Ok((workflow, snapshot))
    }

    /// Borra resultados y datos del workflow; el registro se conserva.
    pub async fn delete_data(&self, id: &str) -> Result<(), JobError> {
        self.service.delete_data(id).await?;
        info!("deleted data of workflow {id}");
        Ok(())
    }

    /// Moléculas de un cálculo individual dentro de un workflow.
    pub async fn calculation_molecules(&self, calculation_id: &str) -> Result<Vec<Value>, JobError> {
        Ok(self.service.calculation_molecules(calculation_id).await?)
    }

    /// Cambia nombre, notas y marcas. Mover de carpeta es cosa de la jerarquía.
    pub async fn update(&self, id: &str, patch: &WorkflowPatch) -> Result<Workflow, JobError> {
        let patch = WorkflowPatch { parent_id: None,
                                    ..patch.clone() };
        Ok(self.service.update_workflow(id, &patch).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chem_adapters::RequestDraft;
    use chem_policies::Validator;
    use chem_providers::InMemoryComputeService;
    use serde_json::json;

    fn accepted() -> Accepted {
        let draft: RequestDraft = serde_json::from_value(json!({
                                      "name": "water",
                                      "molecule": "O",
                                      "multiplicities": "1"
                                  })).unwrap();
        Validator::new().validate(draft.normalize().unwrap()).into_result().unwrap()
    }

    fn tracker_with(service: Arc<InMemoryComputeService>) -> JobTracker {
        JobTracker::new(service)
    }

    #[tokio::test]
    async fn submit_returns_id_and_fingerprint() {
        let service = Arc::new(InMemoryComputeService::new());
        let tracker = tracker_with(service.clone());
        let accepted = accepted();
        let submitted = tracker.submit(&accepted).await.unwrap();
        assert_eq!(submitted.fingerprint, accepted.fingerprint());
        assert_eq!(service.peek_status(&submitted.id), Some(JobStatus::Queued));
    }

    #[tokio::test]
    async fn terminal_status_is_sticky_even_if_service_regresses() {
        let service = Arc::new(InMemoryComputeService::new());
        let tracker = tracker_with(service.clone());
        let id = tracker.submit(&accepted()).await.unwrap().id;

        service.set_status(&id, JobStatus::Completed).unwrap();
        assert!(tracker.get_status(&id).await.unwrap().is_successful);

        service.set_status(&id, JobStatus::Running).unwrap();
        let again = tracker.get_status(&id).await.unwrap();
        assert_eq!(again.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn stop_on_terminal_job_reports_status() {
        let service = Arc::new(InMemoryComputeService::new());
        let tracker = tracker_with(service.clone());
        let id = tracker.submit(&accepted()).await.unwrap().id;
        service.set_status(&id, JobStatus::Failed).unwrap();

        let outcome = tracker.stop(&id).await.unwrap();
        assert!(matches!(outcome, StopOutcome::AlreadyTerminal { ref snapshot } if snapshot.is_failed));
        assert_eq!(service.calls("stop"), 0);
    }

    #[tokio::test]
    async fn stop_running_job_requests_stop() {
        let service = Arc::new(InMemoryComputeService::new());
        let tracker = tracker_with(service.clone());
        let id = tracker.submit(&accepted()).await.unwrap().id;
        service.set_status(&id, JobStatus::Running).unwrap();

        let outcome = tracker.stop(&id).await.unwrap();
        assert!(matches!(outcome, StopOutcome::StopRequested { ref previous } if previous.is_running));
        assert_eq!(service.peek_status(&id), Some(JobStatus::Stopped));
    }

    #[tokio::test]
    async fn cache_is_opt_in() {
        let service = Arc::new(InMemoryComputeService::new());
        let plain = JobTracker::new(service.clone());
        let id = plain.submit(&accepted()).await.unwrap().id;
        plain.get_status(&id).await.unwrap();
        assert!(plain.cached_status(&id).is_none());

        let cached = JobTracker::new(service).with_cache(StatusCache::new());
        cached.get_status(&id).await.unwrap();
        assert_eq!(cached.cached_status(&id).map(|s| s.status), Some(JobStatus::Queued));
        cached.delete(&id).await.unwrap();
        assert!(cached.cached_status(&id).is_none());
    }

    #[tokio::test]
    async fn fetch_latest_respects_terminal_memo() {
        let service = Arc::new(InMemoryComputeService::new());
        let tracker = tracker_with(service.clone());
        let id = tracker.submit(&accepted()).await.unwrap().id;
        service.set_status(&id, JobStatus::Failed).unwrap();
        let (workflow, snapshot) = tracker.fetch_latest(&id).await.unwrap();
        assert!(snapshot.is_failed);
        assert_eq!(workflow.name, "water");

        service.set_status(&id, JobStatus::Running).unwrap();
        let (workflow, snapshot) = tracker.fetch_latest(&id).await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(workflow.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn delete_data_keeps_the_record() {
        let service = Arc::new(InMemoryComputeService::new());
        let tracker = tracker_with(service.clone());
        let id = tracker.submit(&accepted()).await.unwrap().id;
        service.set_result(&id, json!({"energy": -76.4})).unwrap();

        tracker.delete_data(&id).await.unwrap();

        assert_eq!(tracker.get_result(&id).await.unwrap()["data"], Value::Null);
        assert!(tracker.retrieve(&id).await.is_ok());
        assert!(tracker.delete_data("missing").await.unwrap_err().is_not_found());
    }

    #[test]
    fn zero_poll_interval_is_raised_to_the_minimum() {
        let options = WaitOptions { poll_interval: Duration::ZERO,
                                    max_interval: Duration::ZERO,
                                    ..Default::default() }.clamped();
        assert_eq!(options.poll_interval, MIN_POLL_INTERVAL);
        assert_eq!(options.max_interval, MIN_POLL_INTERVAL);
        assert_eq!(WaitOptions::default().clamped(), WaitOptions::default());
    }

    #[test]
    fn adaptive_cadence_grows_to_cap() {
        let options = WaitOptions { poll_interval: Duration::from_secs(2),
                                    max_interval: Duration::from_secs(4),
                                    cadence: Cadence::Adaptive,
                                    ..Default::default() };
        let second = options.next_interval(options.poll_interval);
        assert_eq!(second, Duration::from_secs(3));
        assert_eq!(options.next_interval(second), Duration::from_secs(4));
        let fixed = WaitOptions::default();
        assert_eq!(fixed.next_interval(Duration::from_secs(9)), fixed.poll_interval);
    }
}
