//! Frontera con el servicio de cómputo remoto.
//!
//! `ComputeService` es el contrato; `HttpComputeService` lo implementa sobre
//! la API REST y `InMemoryComputeService` lo simula. `RetryingService`
//! añade reintentos con backoff a cualquiera de los dos.
pub mod error;
pub mod http;
pub mod memory;
pub mod retry;
pub mod service;

pub use error::ServiceError;
pub use http::{classify_status, HttpComputeService};
pub use memory::InMemoryComputeService;
pub use retry::{RetryPolicy, RetryingService};
pub use service::{ComputeService, Submission};
