//! Capa de invocación de herramientas.
//!
//! Cada operación pública del núcleo es una herramienta con nombre y
//! argumentos nombrados. `invoke` siempre devuelve un [`ToolResponse`]:
//! `{"status": "ok", "result": ...}` o el triple de error.
pub mod args;
pub mod folders;
pub mod jobs;
pub mod projects;

use chem_adapters::RequestDraft;
use chem_domain::CalculationMode;
use log::{debug, error, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::context::ChemContext;
use crate::errors::ToolError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResponse {
    Ok { result: Value },
    Error(ToolError),
}

impl ToolResponse {
    pub fn is_ok(&self) -> bool {
        matches!(self, ToolResponse::Ok { .. })
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            ToolResponse::Ok { result } => Some(result),
            ToolResponse::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ToolError> {
        match self {
            ToolResponse::Ok { .. } => None,
            ToolResponse::Error(err) => Some(err),
        }
    }
}

impl From<Result<Value, ToolError>> for ToolResponse {
    fn from(outcome: Result<Value, ToolError>) -> Self {
        match outcome {
            Ok(result) => ToolResponse::Ok { result },
            Err(err) => ToolResponse::Error(err),
        }
    }
}

/// Nombre y descripción de una línea de cada herramienta.
pub const TOOLS: [(&str, &str); 28] =
    [("validate_request", "Normalize and check a chemistry request without submitting it"),
     ("submit_workflow", "Validate a chemistry request and submit it to the compute service"),
     ("workflow_get_status", "Read the current status of a workflow"),
     ("workflow_wait_for_result", "Poll a workflow until it finishes or the timeout elapses"),
     ("workflow_stop", "Stop a queued or running workflow"),
     ("workflow_delete", "Delete a workflow"),
     ("workflow_delete_data", "Delete a workflow's results but keep its record"),
     ("workflow_fetch_latest", "Fetch a workflow record together with a fresh status reading"),
     ("retrieve_calculation_molecules", "Fetch the molecules produced by one calculation"),
     ("workflow_batch_status", "Read the status of many workflows at once"),
     ("retrieve_workflow", "Fetch a workflow record with its parameters"),
     ("list_workflows", "List workflows with filters and pagination"),
     ("workflow_update", "Change a workflow's name, notes, starred or public flags"),
     ("workflow_move", "Move a workflow into another folder or the root"),
     ("create_folder", "Create a folder"),
     ("retrieve_folder", "Fetch a folder record"),
     ("update_folder", "Change a folder's name, notes, starred or public flags"),
     ("move_folder", "Move a folder under another folder or the root"),
     ("delete_folder", "Delete a folder and everything inside it"),
     ("list_folders", "List folders with filters and pagination"),
     ("create_project", "Create a project"),
     ("retrieve_project", "Fetch a project record"),
     ("update_project", "Rename a project"),
     ("delete_project", "Delete a project and everything it contains"),
     ("list_projects", "List projects with an optional name filter"),
     ("get_default_project", "Fetch the project that receives workflows submitted without a folder"),
     ("list_modes", "List calculation modes and their convergence thresholds"),
     ("list_tools", "List the available tools")];

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::internal(format!("cannot serialize result: {e}")))
}

fn parse_args<T: DeserializeOwned>(tool: &str, raw: Value) -> Result<T, ToolError> {
    let raw = if raw.is_null() { json!({}) } else { raw };
    serde_json::from_value(raw).map_err(|e| ToolError::malformed_arguments(tool, &e))
}

fn list_modes() -> Value {
    let mut modes: Vec<Value> = CalculationMode::ALL.iter()
                                                    .map(|mode| {
                                                        let t = mode.thresholds();
                                                        json!({
                                                            "mode": mode.as_str(),
                                                            "energy_delta": t.energy_delta,
                                                            "max_gradient": t.max_gradient,
                                                            "rms_gradient": t.rms_gradient,
                                                        })
                                                    })
                                                    .collect();
    modes.push(json!({ "mode": "auto", "note": "no tier; the compute service chooses" }));
    json!({ "modes": modes })
}

fn list_tools() -> Value {
    let tools: Vec<Value> = TOOLS.iter()
                                 .map(|(name, description)| json!({ "name": name, "description": description }))
                                 .collect();
    json!({ "tools": tools })
}

async fn dispatch(ctx: &ChemContext, name: &str, raw: Value, cancel: &CancellationToken) -> Result<Value, ToolError> {
    match name {
        "validate_request" => jobs::validate_request(ctx, parse_args::<RequestDraft>(name, raw)?),
        "submit_workflow" => jobs::submit_workflow(ctx, parse_args::<RequestDraft>(name, raw)?).await,
        "workflow_get_status" => jobs::get_status(ctx, parse_args(name, raw)?).await,
        "workflow_wait_for_result" => jobs::wait_for_result(ctx, parse_args(name, raw)?, cancel).await,
        "workflow_stop" => jobs::stop(ctx, parse_args(name, raw)?).await,
        "workflow_delete" => jobs::delete(ctx, parse_args(name, raw)?).await,
        "workflow_delete_data" => jobs::delete_data(ctx, parse_args(name, raw)?).await,
        "workflow_fetch_latest" => jobs::fetch_latest(ctx, parse_args(name, raw)?).await,
        "retrieve_calculation_molecules" => jobs::calculation_molecules(ctx, parse_args(name, raw)?).await,
        "workflow_batch_status" => jobs::batch_status(ctx, parse_args(name, raw)?).await,
        "retrieve_workflow" => jobs::retrieve(ctx, parse_args(name, raw)?).await,
        "list_workflows" => jobs::list(ctx, parse_args(name, raw)?).await,
        "workflow_update" => jobs::update(ctx, parse_args(name, raw)?).await,
        "workflow_move" => jobs::move_workflow(ctx, parse_args(name, raw)?).await,
        "create_folder" => folders::create(ctx, parse_args(name, raw)?).await,
        "retrieve_folder" => folders::retrieve(ctx, parse_args(name, raw)?).await,
        "update_folder" => folders::update(ctx, parse_args(name, raw)?).await,
        "move_folder" => folders::move_folder(ctx, parse_args(name, raw)?).await,
        "delete_folder" => folders::delete(ctx, parse_args(name, raw)?).await,
        "list_folders" => folders::list(ctx, parse_args(name, raw)?).await,
        "create_project" => projects::create(ctx, parse_args(name, raw)?).await,
        "retrieve_project" => projects::retrieve(ctx, parse_args(name, raw)?).await,
        "update_project" => projects::update(ctx, parse_args(name, raw)?).await,
        "delete_project" => projects::delete(ctx, parse_args(name, raw)?).await,
        "list_projects" => projects::list(ctx, parse_args(name, raw)?).await,
        "get_default_project" => projects::default_project(ctx).await,
        "list_modes" => Ok(list_modes()),
        "list_tools" => Ok(list_tools()),
        other => Err(ToolError::unknown_tool(other)),
    }
}

/// Ejecuta una herramienta. Nunca falla: los errores vuelven como datos.
pub async fn invoke(ctx: &ChemContext, name: &str, args: Value, cancel: &CancellationToken) -> ToolResponse {
    let response = ToolResponse::from(dispatch(ctx, name, args, cancel).await);
    match &response {
        ToolResponse::Ok { .. } => debug!("{name}: ok"),
        ToolResponse::Error(err) => warn!("{name}: {err}"),
    }
    response
}

/// Corre `handler` en su propia tarea; un pánico o una cancelación de la
/// tarea vuelven como `internal_error` en lugar de perder la respuesta.
pub async fn contained<F>(tool: &str, handler: F) -> ToolResponse
    where F: Future<Output = ToolResponse> + Send + 'static
{
    match tokio::spawn(handler).await {
        Ok(response) => response,
        Err(join_error) => {
            error!("{tool}: handler aborted: {join_error}");
            ToolResponse::Error(ToolError::internal(format!("tool '{tool}' aborted before answering")))
        }
    }
}

/// [`invoke`] aislado en su tarea; es lo que usa el servidor por petición.
pub async fn invoke_contained(ctx: Arc<ChemContext>, name: String, args: Value, cancel: CancellationToken) -> ToolResponse {
    let tool = name.clone();
    contained(&tool, async move { invoke(&ctx, &name, args, &cancel).await }).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_has_unique_names() {
        let mut names: Vec<&str> = TOOLS.iter().map(|(n, _)| *n).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), TOOLS.len());
    }

    #[test]
    fn response_serializes_with_status_tag() {
        let ok = ToolResponse::Ok { result: json!({"x": 1}) };
        assert_eq!(serde_json::to_value(&ok).unwrap(), json!({"status": "ok", "result": {"x": 1}}));
        let err = ToolResponse::Error(ToolError::unknown_tool("nope"));
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "unknown_tool");
    }

    #[test]
    fn modes_include_auto_and_thresholds() {
        let value = list_modes();
        let modes = value["modes"].as_array().unwrap();
        assert_eq!(modes.len(), 6);
        assert_eq!(modes[0]["mode"], "reckless");
        assert!(modes[0]["energy_delta"].is_number());
    }

    #[tokio::test]
    async fn panicking_handler_still_answers() {
        let explode = || -> ToolResponse { panic!("boom") };
        let response = contained("explode", async move { explode() }).await;
        let err = response.error().expect("error response");
        assert_eq!(err.error, crate::errors::ErrorKind::InternalError);
        assert!(err.explanation.contains("explode"));

        let fine = contained("fine", async { ToolResponse::Ok { result: json!(1) } }).await;
        assert!(fine.is_ok());
    }
}
