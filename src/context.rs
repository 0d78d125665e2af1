//! Contexto explícito de la aplicación: validador, servicio con reintentos,
//! tracker y jerarquía. Se construye una vez al arrancar; no hay sesión global.
use chem_core::{HierarchyManager, JobTracker, StatusCache, WaitOptions};
use chem_domain::JobStatus;
use chem_policies::Validator;
use chem_providers::{ComputeService, HttpComputeService, InMemoryComputeService, RetryingService, ServiceError};
use log::info;
use std::sync::Arc;

use crate::config::{AppConfig, ServiceMode};
use crate::errors::CoreError;

pub struct ChemContext {
    pub validator: Validator,
    pub tracker: JobTracker,
    pub hierarchy: HierarchyManager,
    pub wait_defaults: WaitOptions,
    pub batch_concurrency: usize,
}

impl ChemContext {
    pub fn from_config(config: &AppConfig) -> Result<Self, CoreError> {
        let service: Arc<dyn ComputeService> = match config.service_mode {
            ServiceMode::Http => {
                let api_key = config.api_key
                                    .as_deref()
                                    .ok_or_else(|| CoreError::Config("CHEM_API_KEY no definido".into()))?;
                let http = HttpComputeService::new(&config.service_url, api_key, config.http_timeout)
                    .map_err(|e| match e {
                        ServiceError::Endpoint(_) => CoreError::Config(e.to_string()),
                        other => CoreError::Internal(other.to_string()),
                    })?;
                info!("compute service: {} (max {} attempts)", config.service_url, config.retry.max_attempts);
                Arc::new(RetryingService::new(http, config.retry))
            }
            ServiceMode::Memory => {
                info!("compute service: in-memory simulation");
                let memory = InMemoryComputeService::new().with_default_script(vec![JobStatus::Running,
                                                                                    JobStatus::Completed]);
                Arc::new(RetryingService::new(memory, config.retry))
            }
        };
        Ok(Self::with_service(service, config))
    }

    /// Contexto sobre un servicio ya construido (pruebas, integraciones).
    pub fn with_service(service: Arc<dyn ComputeService>, config: &AppConfig) -> Self {
        let mut tracker = JobTracker::new(service.clone());
        if config.status_cache {
            tracker = tracker.with_cache(StatusCache::new());
        }
        Self { validator: Validator::new(),
               tracker,
               hierarchy: HierarchyManager::new(service),
               wait_defaults: config.wait,
               batch_concurrency: config.batch_concurrency }
    }
}
