//! Herramientas sobre workflows: validación, envío, estado, espera y registro.
use chem_adapters::canonical::to_string_list;
use chem_adapters::RequestDraft;
use chem_core::{BatchStatusAggregator, WaitOptions};
use chem_domain::{JobStatus, NodeRef, Page, WorkflowFilter, WorkflowPatch, WorkflowType};
use chem_policies::Accepted;
use serde_json::{json, Value};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::args::{BatchArgs, CalculationIdArgs, ListWorkflowsArgs, MoveWorkflowArgs, StatusArgs, UpdateWorkflowArgs,
                  WaitArgs, WorkflowIdArgs};
use super::to_json;
use crate::context::ChemContext;
use crate::errors::{ErrorKind, ToolError};

/// Normaliza y valida; nada llega al servicio si esto falla.
fn accept(ctx: &ChemContext, draft: RequestDraft) -> Result<Accepted, ToolError> {
    let request = draft.normalize().map_err(ToolError::from_issues)?;
    ctx.validator.validate(request).into_result().map_err(ToolError::from_issues)
}

pub fn validate_request(ctx: &ChemContext, draft: RequestDraft) -> Result<Value, ToolError> {
    Ok(accept(ctx, draft)?.summary())
}

pub async fn submit_workflow(ctx: &ChemContext, draft: RequestDraft) -> Result<Value, ToolError> {
    let accepted = accept(ctx, draft)?;
    let submitted = ctx.tracker.submit(&accepted).await?;
    let mut result = accepted.summary();
    if let Value::Object(map) = &mut result {
        map.insert("workflow_id".into(), json!(submitted.id));
        map.insert("name".into(), json!(submitted.name));
    }
    Ok(result)
}

pub async fn get_status(ctx: &ChemContext, args: StatusArgs) -> Result<Value, ToolError> {
    if args.use_cache {
        if let Some(snapshot) = ctx.tracker.cached_status(&args.workflow_id) {
            let mut value = to_json(&snapshot)?;
            if let Value::Object(map) = &mut value {
                map.insert("cached".into(), json!(true));
            }
            return Ok(value);
        }
    }
    to_json(&ctx.tracker.get_status(&args.workflow_id).await?)
}

pub async fn wait_for_result(ctx: &ChemContext, args: WaitArgs, cancel: &CancellationToken) -> Result<Value, ToolError> {
    let defaults = ctx.wait_defaults;
    let poll_interval = args.poll_interval.map_or(defaults.poll_interval, Duration::from_secs);
    if poll_interval.is_zero() {
        return Err(ToolError::new(ErrorKind::MalformedFieldError,
                                  "poll_interval must be at least 1 second",
                                  "poll_interval: 5"));
    }
    let options = WaitOptions { poll_interval,
                                timeout: args.timeout.map_or(defaults.timeout, Duration::from_secs),
                                cadence: args.cadence.unwrap_or(defaults.cadence),
                                max_interval: defaults.max_interval.max(poll_interval) };
    to_json(&ctx.tracker.wait_for_result(&args.workflow_id, &options, cancel).await?)
}

pub async fn stop(ctx: &ChemContext, args: WorkflowIdArgs) -> Result<Value, ToolError> {
    to_json(&ctx.tracker.stop(&args.workflow_id).await?)
}

pub async fn delete(ctx: &ChemContext, args: WorkflowIdArgs) -> Result<Value, ToolError> {
    ctx.tracker.delete(&args.workflow_id).await?;
    Ok(json!({ "workflow_id": args.workflow_id, "deleted": true }))
}

/// Sólo borra resultados; el workflow sigue listado.
pub async fn delete_data(ctx: &ChemContext, args: WorkflowIdArgs) -> Result<Value, ToolError> {
    ctx.tracker.delete_data(&args.workflow_id).await?;
    Ok(json!({ "workflow_id": args.workflow_id, "data_deleted": true }))
}

/// Registro completo más el estado recién leído.
pub async fn fetch_latest(ctx: &ChemContext, args: WorkflowIdArgs) -> Result<Value, ToolError> {
    let (workflow, snapshot) = ctx.tracker.fetch_latest(&args.workflow_id).await?;
    let mut value = to_json(&workflow)?;
    if let Value::Object(map) = &mut value {
        map.insert("status_code".into(), json!(snapshot.code));
        map.insert("status_description".into(), json!(snapshot.description));
        map.insert("is_finished".into(), json!(snapshot.is_finished));
        map.insert("is_successful".into(), json!(snapshot.is_successful));
        map.insert("is_failed".into(), json!(snapshot.is_failed));
    }
    Ok(value)
}

const MOLECULE_FIELDS: [&str; 7] = ["smiles", "name", "charge", "multiplicity", "energy", "coordinates", "properties"];

/// Recorta cada molécula a los campos útiles y descarta los nulos.
fn trim_molecule(molecule: Value) -> Value {
    match molecule {
        Value::Object(fields) => Value::Object(fields.into_iter()
                                                    .filter(|(k, v)| MOLECULE_FIELDS.contains(&k.as_str()) && !v.is_null())
                                                    .collect()),
        other => other,
    }
}

pub async fn calculation_molecules(ctx: &ChemContext, args: CalculationIdArgs) -> Result<Value, ToolError> {
    let molecules: Vec<Value> = ctx.tracker
                                   .calculation_molecules(&args.calculation_id)
                                   .await?
                                   .into_iter()
                                   .map(trim_molecule)
                                   .collect();
    Ok(json!({ "calculation_id": args.calculation_id, "count": molecules.len(), "molecules": molecules }))
}

pub async fn batch_status(ctx: &ChemContext, args: BatchArgs) -> Result<Value, ToolError> {
    let ids = to_string_list("workflow_ids", &args.workflow_ids).map_err(|issue| ToolError::from_issues(vec![issue]))?;
    let report = BatchStatusAggregator::new(&ctx.tracker, ctx.batch_concurrency).status_of(&ids).await;
    to_json(&report)
}

pub async fn retrieve(ctx: &ChemContext, args: WorkflowIdArgs) -> Result<Value, ToolError> {
    let workflow = ctx.tracker.retrieve(&args.workflow_id).await?;
    let mut value = to_json(&workflow)?;
    if let Value::Object(map) = &mut value {
        map.insert("status_description".into(), json!(workflow.status.description()));
    }
    Ok(value)
}

pub async fn list(ctx: &ChemContext, args: ListWorkflowsArgs) -> Result<Value, ToolError> {
    let status = args.status
                     .map(JobStatus::from_code)
                     .transpose()
                     .map_err(|e| ToolError::new(ErrorKind::MalformedFieldError, e.to_string(), "status: 2"))?;
    let workflow_type = args.workflow_type
                            .as_deref()
                            .map(str::parse::<WorkflowType>)
                            .transpose()
                            .map_err(|e| {
                                let valid: Vec<&str> = WorkflowType::ALL.iter().map(|t| t.as_str()).collect();
                                ToolError::new(ErrorKind::MalformedFieldError,
                                               format!("{e}; valid types: {}", valid.join(", ")),
                                               "workflow_type: basic_calculation")
                            })?;
    let filter = WorkflowFilter { parent_id: args.parent_id,
                                  name_contains: args.name_contains,
                                  public: args.public,
                                  starred: args.starred,
                                  status,
                                  workflow_type };
    let page = Page { page: args.page,
                      size: args.size };
    to_json(&ctx.hierarchy.list_workflows(&filter, page).await?)
}

pub async fn update(ctx: &ChemContext, args: UpdateWorkflowArgs) -> Result<Value, ToolError> {
    if args.name.is_none() && args.notes.is_none() && args.starred.is_none() && args.public.is_none() {
        return Err(ToolError::new(ErrorKind::MalformedFieldError,
                                  "nothing to update",
                                  "pass at least one of name, notes, starred, public"));
    }
    let patch = WorkflowPatch { name: args.name,
                                notes: args.notes,
                                starred: args.starred,
                                public: args.public,
                                parent_id: None };
    to_json(&ctx.tracker.update(&args.workflow_id, &patch).await?)
}

pub async fn move_workflow(ctx: &ChemContext, args: MoveWorkflowArgs) -> Result<Value, ToolError> {
    let node = NodeRef::Workflow(args.workflow_id);
    ctx.hierarchy.move_node(&node, args.parent_id.as_deref()).await?;
    Ok(json!({ "moved": node, "parent_id": args.parent_id }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn molecules_keep_only_known_non_null_fields() {
        let trimmed = trim_molecule(json!({
            "smiles": "O",
            "energy": -76.4,
            "charge": null,
            "internal_id": 7,
        }));
        assert_eq!(trimmed, json!({"smiles": "O", "energy": -76.4}));
        assert_eq!(trim_molecule(json!("raw")), json!("raw"));
    }
}
