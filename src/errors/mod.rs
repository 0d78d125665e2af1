//! Errores de la capa de aplicación.
//!
//! `CoreError` cubre arranque y configuración. `ToolError` es la forma que
//! ve quien invoca herramientas: `{error, explanation, suggested_fix}`.
pub mod core_error;
pub mod tool_error;

pub use core_error::CoreError;
pub use tool_error::{ErrorKind, ToolError};
