//! chemjobs: capa de aplicación sobre el núcleo de trabajos químicos.
//!
//! - `config`: `AppConfig` desde variables de entorno (.env).
//! - `context`: `ChemContext`, el objeto explícito con validador, tracker y jerarquía.
//! - `tools`: herramientas con nombre y respuesta estructurada.
//! - `errors`: `CoreError` de arranque y `ToolError` de cara al llamador.
//!
//! El binario `chemjobs` sirve las herramientas por stdio, una petición JSON
//! por línea.

pub mod config;
pub mod context;
pub mod errors;
pub mod tools;

pub use config::{AppConfig, ServiceMode};
pub use context::ChemContext;
pub use errors::{CoreError, ErrorKind, ToolError};
pub use tools::{invoke, invoke_contained, ToolResponse, TOOLS};
