//! Herramientas de carpetas.
use chem_domain::{FolderFilter, FolderPatch, NewFolder, NodeRef, Page};
use serde_json::{json, Value};

use super::args::{CreateFolderArgs, FolderIdArgs, ListFoldersArgs, MoveFolderArgs, UpdateFolderArgs};
use super::to_json;
use crate::context::ChemContext;
use crate::errors::{ErrorKind, ToolError};

pub async fn create(ctx: &ChemContext, args: CreateFolderArgs) -> Result<Value, ToolError> {
    if args.name.trim().is_empty() {
        return Err(ToolError::new(ErrorKind::MalformedFieldError, "folder name is empty", "name: \"Project A\""));
    }
    let folder = NewFolder { name: args.name,
                             parent_id: args.parent_id,
                             notes: args.notes,
                             starred: args.starred,
                             public: args.public };
    to_json(&ctx.hierarchy.create_folder(&folder).await?)
}

pub async fn retrieve(ctx: &ChemContext, args: FolderIdArgs) -> Result<Value, ToolError> {
    to_json(&ctx.hierarchy.retrieve_folder(&args.folder_id).await?)
}

pub async fn update(ctx: &ChemContext, args: UpdateFolderArgs) -> Result<Value, ToolError> {
    if args.name.is_none() && args.notes.is_none() && args.starred.is_none() && args.public.is_none() {
        return Err(ToolError::new(ErrorKind::MalformedFieldError,
                                  "nothing to update",
                                  "pass at least one of name, notes, starred, public"));
    }
    let patch = FolderPatch { name: args.name,
                              notes: args.notes,
                              starred: args.starred,
                              public: args.public,
                              parent_id: None };
    to_json(&ctx.hierarchy.update_folder(&args.folder_id, &patch).await?)
}

pub async fn move_folder(ctx: &ChemContext, args: MoveFolderArgs) -> Result<Value, ToolError> {
    let node = NodeRef::Folder(args.folder_id);
    ctx.hierarchy.move_node(&node, args.parent_id.as_deref()).await?;
    Ok(json!({ "moved": node, "parent_id": args.parent_id }))
}

/// Cascada: borra subcarpetas y workflows contenidos.
pub async fn delete(ctx: &ChemContext, args: FolderIdArgs) -> Result<Value, ToolError> {
    let report = ctx.hierarchy.delete(&NodeRef::Folder(args.folder_id.clone())).await?;
    let mut value = to_json(&report)?;
    if let Value::Object(map) = &mut value {
        map.insert("folder_id".into(), json!(args.folder_id));
    }
    Ok(value)
}

pub async fn list(ctx: &ChemContext, args: ListFoldersArgs) -> Result<Value, ToolError> {
    let filter = FolderFilter { parent_id: args.parent_id,
                                name_contains: args.name_contains,
                                public: args.public,
                                starred: args.starred };
    let page = Page { page: args.page,
                      size: args.size };
    to_json(&ctx.hierarchy.list_folders(&filter, page).await?)
}
