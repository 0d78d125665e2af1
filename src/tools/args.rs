//! Argumentos de herramientas: todos nombrados y con valores por defecto.
use chem_adapters::FlexibleValue;
use chem_core::Cadence;
use serde::Deserialize;

fn default_size() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowIdArgs {
    #[serde(alias = "workflow_uuid", alias = "id")]
    pub workflow_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusArgs {
    #[serde(alias = "workflow_uuid", alias = "id")]
    pub workflow_id: String,
    /// Devuelve la última lectura guardada en vez de consultar al servicio.
    #[serde(default)]
    pub use_cache: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaitArgs {
    #[serde(alias = "workflow_uuid", alias = "id")]
    pub workflow_id: String,
    /// Segundos entre sondeos.
    #[serde(default)]
    pub poll_interval: Option<u64>,
    /// Segundos antes de devolver `pending`.
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub cadence: Option<Cadence>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchArgs {
    #[serde(alias = "workflow_uuids", alias = "ids")]
    pub workflow_ids: FlexibleValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListWorkflowsArgs {
    #[serde(alias = "parent_uuid")]
    pub parent_id: Option<String>,
    pub name_contains: Option<String>,
    pub starred: Option<bool>,
    pub public: Option<bool>,
    #[serde(alias = "object_status")]
    pub status: Option<i64>,
    #[serde(alias = "object_type")]
    pub workflow_type: Option<String>,
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateWorkflowArgs {
    #[serde(alias = "workflow_uuid", alias = "id")]
    pub workflow_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub starred: Option<bool>,
    #[serde(default)]
    pub public: Option<bool>,
}

/// `parent_id` ausente o `null` mueve a la raíz.
#[derive(Debug, Clone, Deserialize)]
pub struct MoveWorkflowArgs {
    #[serde(alias = "workflow_uuid", alias = "id")]
    pub workflow_id: String,
    #[serde(default, alias = "parent_uuid")]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFolderArgs {
    pub name: String,
    #[serde(default, alias = "parent_uuid")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub starred: bool,
    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FolderIdArgs {
    #[serde(alias = "folder_uuid", alias = "id")]
    pub folder_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateFolderArgs {
    #[serde(alias = "folder_uuid", alias = "id")]
    pub folder_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub starred: Option<bool>,
    #[serde(default)]
    pub public: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveFolderArgs {
    #[serde(alias = "folder_uuid", alias = "id")]
    pub folder_id: String,
    #[serde(default, alias = "parent_uuid")]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListFoldersArgs {
    #[serde(alias = "parent_uuid")]
    pub parent_id: Option<String>,
    pub name_contains: Option<String>,
    pub starred: Option<bool>,
    pub public: Option<bool>,
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalculationIdArgs {
    #[serde(alias = "calculation_uuid", alias = "id")]
    pub calculation_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProjectArgs {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectIdArgs {
    #[serde(alias = "project_uuid", alias = "id")]
    pub project_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProjectArgs {
    #[serde(alias = "project_uuid", alias = "id")]
    pub project_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListProjectsArgs {
    pub name_contains: Option<String>,
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
}
