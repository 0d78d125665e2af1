//! Contrato del servicio de cómputo remoto.
//!
//! El servicio es dueño del estado de workflows y carpetas; el núcleo sólo
//! observa. Toda operación puede fallar con [`ServiceError`].
use async_trait::async_trait;
use chem_domain::{Folder, FolderFilter, FolderPatch, NewFolder, Page, PageOf, Project, ProjectFilter, Workflow,
                  WorkflowFilter, WorkflowPatch, WorkflowType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ServiceError;

/// Lo que se envía al crear un workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub workflow_type: WorkflowType,
    pub name: String,
    pub folder_id: Option<String>,
    /// Documento completo (molécula, método, tareas, umbrales, ...).
    pub payload: Value,
}

#[async_trait]
pub trait ComputeService: Send + Sync {
    fn name(&self) -> &str;

    /// Crea el workflow remoto y devuelve su identificador.
    async fn submit(&self, submission: &Submission) -> Result<String, ServiceError>;
    /// Código de estado crudo (0..=5).
    async fn get_status(&self, id: &str) -> Result<i64, ServiceError>;
    async fn get_result(&self, id: &str) -> Result<Value, ServiceError>;
    async fn retrieve_workflow(&self, id: &str) -> Result<Workflow, ServiceError>;
    async fn update_workflow(&self, id: &str, patch: &WorkflowPatch) -> Result<Workflow, ServiceError>;
    async fn stop(&self, id: &str) -> Result<(), ServiceError>;
    async fn delete(&self, id: &str) -> Result<(), ServiceError>;
    /// Borra resultados y datos; el registro del workflow queda.
    async fn delete_data(&self, id: &str) -> Result<(), ServiceError>;
    /// Moléculas (geometrías, energías) de un cálculo individual.
    async fn calculation_molecules(&self, calculation_id: &str) -> Result<Vec<Value>, ServiceError>;
    async fn list_workflows(&self, filter: &WorkflowFilter, page: Page) -> Result<PageOf<Workflow>, ServiceError>;

    async fn create_folder(&self, folder: &NewFolder) -> Result<Folder, ServiceError>;
    async fn retrieve_folder(&self, id: &str) -> Result<Folder, ServiceError>;
    async fn update_folder(&self, id: &str, patch: &FolderPatch) -> Result<Folder, ServiceError>;
    /// Borra sólo la carpeta; la cascada la decide quien llama.
    async fn delete_folder(&self, id: &str) -> Result<(), ServiceError>;
    async fn list_folders(&self, filter: &FolderFilter, page: Page) -> Result<PageOf<Folder>, ServiceError>;

    async fn create_project(&self, name: &str) -> Result<Project, ServiceError>;
    async fn retrieve_project(&self, id: &str) -> Result<Project, ServiceError>;
    async fn update_project(&self, id: &str, name: &str) -> Result<Project, ServiceError>;
    /// El servicio borra en cascada carpetas, workflows y estructuras.
    async fn delete_project(&self, id: &str) -> Result<(), ServiceError>;
    async fn list_projects(&self, filter: &ProjectFilter, page: Page) -> Result<PageOf<Project>, ServiceError>;
    /// Proyecto donde caen los workflows enviados sin carpeta.
    async fn default_project(&self) -> Result<Project, ServiceError>;
}
