//! Herramientas de proyectos.
use chem_domain::{Page, ProjectFilter};
use serde_json::{json, Value};

use super::args::{CreateProjectArgs, ListProjectsArgs, ProjectIdArgs, UpdateProjectArgs};
use super::to_json;
use crate::context::ChemContext;
use crate::errors::{ErrorKind, ToolError};

fn named(name: &str) -> Result<&str, ToolError> {
    match name.trim() {
        "" => Err(ToolError::new(ErrorKind::MalformedFieldError, "project name is empty", "name: \"Screening\"")),
        trimmed => Ok(trimmed),
    }
}

pub async fn create(ctx: &ChemContext, args: CreateProjectArgs) -> Result<Value, ToolError> {
    to_json(&ctx.hierarchy.create_project(named(&args.name)?).await?)
}

pub async fn retrieve(ctx: &ChemContext, args: ProjectIdArgs) -> Result<Value, ToolError> {
    to_json(&ctx.hierarchy.retrieve_project(&args.project_id).await?)
}

pub async fn update(ctx: &ChemContext, args: UpdateProjectArgs) -> Result<Value, ToolError> {
    to_json(&ctx.hierarchy.rename_project(&args.project_id, named(&args.name)?).await?)
}

/// Cascada remota: carpetas, workflows y estructuras del proyecto.
pub async fn delete(ctx: &ChemContext, args: ProjectIdArgs) -> Result<Value, ToolError> {
    ctx.hierarchy.delete_project(&args.project_id).await?;
    Ok(json!({ "project_id": args.project_id, "deleted": true }))
}

pub async fn list(ctx: &ChemContext, args: ListProjectsArgs) -> Result<Value, ToolError> {
    let filter = ProjectFilter { name_contains: args.name_contains };
    let page = Page { page: args.page,
                      size: args.size };
    to_json(&ctx.hierarchy.list_projects(&filter, page).await?)
}

pub async fn default_project(ctx: &ChemContext) -> Result<Value, ToolError> {
    to_json(&ctx.hierarchy.default_project().await?)
}
