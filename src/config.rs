//! Configuración central de la aplicación.
//! Carga variables de entorno (.env una sola vez) y produce un `AppConfig`
//! inmutable que luego se convierte en el `ChemContext` explícito.
use chem_core::{Cadence, WaitOptions};
use chem_providers::RetryPolicy;
use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::CoreError;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

pub const DEFAULT_SERVICE_URL: &str = "https://api.rowansci.com";

/// Backend del servicio de cómputo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceMode {
    Http,
    /// Servicio simulado en memoria, sin red.
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub service_url: String,
    pub api_key: Option<String>,
    pub service_mode: ServiceMode,
    pub http_timeout: Duration,
    pub retry: RetryPolicy,
    pub wait: WaitOptions,
    pub batch_concurrency: usize,
    pub status_cache: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { service_url: DEFAULT_SERVICE_URL.to_string(),
               api_key: None,
               service_mode: ServiceMode::Http,
               http_timeout: Duration::from_secs(30),
               retry: RetryPolicy::default(),
               wait: WaitOptions::default(),
               batch_concurrency: 8,
               status_cache: true }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T, CoreError> {
    match lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| CoreError::Config(format!("{name} tiene un valor inválido: '{raw}'"))),
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: bool) -> Result<bool, CoreError> {
    match lookup(name).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(CoreError::Config(format!("{name} debe ser booleano, no '{v}'"))),
        },
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, CoreError> {
        // asegura que .env se haya cargado
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Igual que [`Self::from_env`] pero con una fuente de variables arbitraria.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let defaults = Self::default();
        let service_mode = match lookup("CHEM_SERVICE_MODE").map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("http") => ServiceMode::Http,
            Some("memory") => ServiceMode::Memory,
            Some(other) => {
                return Err(CoreError::Config(format!("CHEM_SERVICE_MODE debe ser 'http' o 'memory', no '{other}'")))
            }
        };
        let retry = RetryPolicy { max_attempts: parsed(&lookup, "CHEM_RETRY_MAX_ATTEMPTS", defaults.retry.max_attempts)?,
                                  base_delay: Duration::from_millis(parsed(&lookup, "CHEM_RETRY_BASE_MS", 1000)?),
                                  multiplier: parsed(&lookup, "CHEM_RETRY_MULTIPLIER", defaults.retry.multiplier)?,
                                  max_delay: Duration::from_millis(parsed(&lookup, "CHEM_RETRY_MAX_DELAY_MS", 30_000)?) };
        let wait = WaitOptions { poll_interval: Duration::from_secs(parsed(&lookup, "CHEM_POLL_INTERVAL_SECS", 5)?),
                                 timeout: Duration::from_secs(parsed(&lookup, "CHEM_WAIT_TIMEOUT_SECS", 600)?),
                                 cadence: Cadence::Fixed,
                                 max_interval: Duration::from_secs(parsed(&lookup, "CHEM_POLL_MAX_INTERVAL_SECS", 30)?) };
        Ok(Self { service_url: parsed(&lookup, "CHEM_SERVICE_URL", defaults.service_url)?,
                  api_key: lookup("CHEM_API_KEY").filter(|k| !k.trim().is_empty()),
                  service_mode,
                  http_timeout: Duration::from_secs(parsed(&lookup, "CHEM_HTTP_TIMEOUT_SECS", 30)?),
                  retry,
                  wait,
                  batch_concurrency: parsed(&lookup, "CHEM_BATCH_CONCURRENCY", defaults.batch_concurrency)?,
                  status_cache: flag(&lookup, "CHEM_STATUS_CACHE", defaults.status_cache)? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.wait.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn reads_overrides() {
        let config = AppConfig::from_lookup(lookup(&[("CHEM_SERVICE_MODE", "memory"),
                                                     ("CHEM_API_KEY", "k-123"),
                                                     ("CHEM_RETRY_MAX_ATTEMPTS", "5"),
                                                     ("CHEM_POLL_INTERVAL_SECS", "2"),
                                                     ("CHEM_STATUS_CACHE", "off")])).unwrap();
        assert_eq!(config.service_mode, ServiceMode::Memory);
        assert_eq!(config.api_key.as_deref(), Some("k-123"));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.wait.poll_interval, Duration::from_secs(2));
        assert!(!config.status_cache);
    }

    #[test]
    fn invalid_numbers_name_the_variable() {
        let err = AppConfig::from_lookup(lookup(&[("CHEM_BATCH_CONCURRENCY", "lots")])).unwrap_err();
        assert!(err.to_string().contains("CHEM_BATCH_CONCURRENCY"));
        let err = AppConfig::from_lookup(lookup(&[("CHEM_SERVICE_MODE", "grpc")])).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }
}
