//! Reintentos con backoff exponencial acotado.
//!
//! Sólo los fallos transitorios se reintentan; rechazos, `NotFound` y errores
//! de decodificación salen de inmediato.
use async_trait::async_trait;
use chem_domain::{Folder, FolderFilter, FolderPatch, NewFolder, Page, PageOf, Project, ProjectFilter, Workflow,
                  WorkflowFilter, WorkflowPatch};
use log::warn;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

use crate::error::ServiceError;
use crate::service::{ComputeService, Submission};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Intentos totales, incluido el primero.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3,
               base_delay: Duration::from_secs(1),
               multiplier: 2.0,
               max_delay: Duration::from_secs(30) }
    }
}

impl RetryPolicy {
    /// Sin reintentos.
    pub fn none() -> Self {
        Self { max_attempts: 1,
               ..Self::default() }
    }

    /// Espera antes del intento `attempt + 1` (attempt empieza en 1).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.saturating_sub(1) as i32);
        let millis = self.base_delay.as_millis() as f64 * factor;
        Duration::from_millis(millis.min(self.max_delay.as_millis() as f64) as u64)
    }

    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, ServiceError>
        where F: FnMut() -> Fut + Send,
              Fut: Future<Output = Result<T, ServiceError>> + Send,
              T: Send
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call().await {
                Err(err) if err.is_retryable() => {
                    if attempt >= attempts {
                        if attempts == 1 {
                            return Err(err);
                        }
                        warn!("{operation}: giving up after {attempt} attempts: {err}");
                        return Err(ServiceError::RetriesExhausted { attempts: attempt,
                                                                    last: err.to_string() });
                    }
                    let delay = self.delay_after(attempt);
                    warn!("{operation}: attempt {attempt}/{attempts} failed ({err}); retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

/// Decorador que aplica [`RetryPolicy`] a cada operación del servicio.
pub struct RetryingService<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: ComputeService> RetryingService<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait]
impl<S: ComputeService> ComputeService for RetryingService<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn submit(&self, submission: &Submission) -> Result<String, ServiceError> {
        self.policy.run("submit", || self.inner.submit(submission)).await
    }

    async fn get_status(&self, id: &str) -> Result<i64, ServiceError> {
        self.policy.run("get_status", || self.inner.get_status(id)).await
    }

    async fn get_result(&self, id: &str) -> Result<Value, ServiceError> {
        self.policy.run("get_result", || self.inner.get_result(id)).await
    }

    async fn retrieve_workflow(&self, id: &str) -> Result<Workflow, ServiceError> {
        self.policy.run("retrieve_workflow", || self.inner.retrieve_workflow(id)).await
    }

    async fn update_workflow(&self, id: &str, patch: &WorkflowPatch) -> Result<Workflow, ServiceError> {
        self.policy.run("update_workflow", || self.inner.update_workflow(id, patch)).await
    }

    async fn stop(&self, id: &str) -> Result<(), ServiceError> {
        self.policy.run("stop", || self.inner.stop(id)).await
    }

    async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        self.policy.run("delete", || self.inner.delete(id)).await
    }

    async fn delete_data(&self, id: &str) -> Result<(), ServiceError> {
        self.policy.run("delete_data", || self.inner.delete_data(id)).await
    }

    async fn calculation_molecules(&self, calculation_id: &str) -> Result<Vec<Value>, ServiceError> {
        self.policy.run("calculation_molecules", || self.inner.calculation_molecules(calculation_id)).await
    }

    async fn list_workflows(&self, filter: &WorkflowFilter, page: Page) -> Result<PageOf<Workflow>, ServiceError> {
        self.policy.run("list_workflows", || self.inner.list_workflows(filter, page)).await
    }

    async fn create_folder(&self, folder: &NewFolder) -> Result<Folder, ServiceError> {
        self.policy.run("create_folder", || self.inner.create_folder(folder)).await
    }

    async fn retrieve_folder(&self, id: &str) -> Result<Folder, ServiceError> {
        self.policy.run("retrieve_folder", || self.inner.retrieve_folder(id)).await
    }

    async fn update_folder(&self, id: &str, patch: &FolderPatch) -> Result<Folder, ServiceError> {
        self.policy.run("update_folder", || self.inner.update_folder(id, patch)).await
    }

    async fn delete_folder(&self, id: &str) -> Result<(), ServiceError> {
        self.policy.run("delete_folder", || self.inner.delete_folder(id)).await
    }

    async fn list_folders(&self, filter: &FolderFilter, page: Page) -> Result<PageOf<Folder>, ServiceError> {
        self.policy.run("list_folders", || self.inner.list_folders(filter, page)).await
    }

    async fn create_project(&self, name: &str) -> Result<Project, ServiceError> {
        self.policy.run("create_project", || self.inner.create_project(name)).await
    }

    async fn retrieve_project(&self, id: &str) -> Result<Project, ServiceError> {
        self.policy.run("retrieve_project", || self.inner.retrieve_project(id)).await
    }

    async fn update_project(&self, id: &str, name: &str) -> Result<Project, ServiceError> {
        self.policy.run("update_project", || self.inner.update_project(id, name)).await
    }

    async fn delete_project(&self, id: &str) -> Result<(), ServiceError> {
        self.policy.run("delete_project", || self.inner.delete_project(id)).await
    }

    async fn list_projects(&self, filter: &ProjectFilter, page: Page) -> Result<PageOf<Project>, ServiceError> {
        self.policy.run("list_projects", || self.inner.list_projects(filter, page)).await
    }

    async fn default_project(&self) -> Result<Project, ServiceError> {
        self.policy.run("default_project", || self.inner.default_project()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_and_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
        assert_eq!(policy.delay_after(10), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_then_success() {
        let mut failures = 2;
        let started = tokio::time::Instant::now();
        let out = RetryPolicy::default().run("op", || {
                                             let fail = failures > 0;
                                             failures -= 1;
                                             async move {
                                                 if fail {
                                                     Err(ServiceError::Transient("503".into()))
                                                 } else {
                                                     Ok(7)
                                                 }
                                             }
                                         })
                                        .await;
        assert_eq!(out, Ok(7));
        // 1 s + 2 s de espera
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_is_not_retried() {
        let mut calls = 0;
        let out: Result<(), _> = RetryPolicy::default().run("op", || {
                                                           calls += 1;
                                                           async { Err(ServiceError::Rejected { code: 400, message: "bad".into() }) }
                                                       })
                                                      .await;
        assert_eq!(calls, 1);
        assert!(matches!(out, Err(ServiceError::Rejected { code: 400, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_escalates() {
        let mut calls = 0;
        let out: Result<(), _> = RetryPolicy::default().run("op", || {
                                                           calls += 1;
                                                           async { Err(ServiceError::Transient("timeout".into())) }
                                                       })
                                                      .await;
        assert_eq!(calls, 3);
        assert!(matches!(out, Err(ServiceError::RetriesExhausted { attempts: 3, .. })));
    }
}
