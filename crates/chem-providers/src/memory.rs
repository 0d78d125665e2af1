//! Servicio de cómputo simulado en memoria.
//!
//! Determinista y sin red: sirve para pruebas y para el modo `memory` del
//! binario. Permite guionar la secuencia de estados de cada workflow,
//! inyectar fallos transitorios o rechazos y contar llamadas por operación.
use async_trait::async_trait;
use chem_domain::{Folder, FolderFilter, FolderPatch, JobStatus, NewFolder, Page, PageOf, Project, ProjectFilter,
                  Workflow, WorkflowFilter, WorkflowPatch};
use chrono::Utc;
use indexmap::IndexMap;
use log::debug;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::service::{ComputeService, Submission};

struct StoredWorkflow {
    record: Workflow,
    /// Estados que devolverán las próximas lecturas, en orden.
    script: VecDeque<JobStatus>,
    result: Value,
}

#[derive(Default)]
struct State {
    workflows: IndexMap<String, StoredWorkflow>,
    folders: IndexMap<String, Folder>,
    projects: IndexMap<String, Project>,
    /// Id del proyecto por defecto, creado en la primera consulta.
    default_project: Option<String>,
    molecules: HashMap<String, Vec<Value>>,
    default_script: Vec<JobStatus>,
    fail_next: u32,
    reject_next: Option<(u16, String)>,
    calls: HashMap<&'static str, u32>,
}

impl State {
    fn workflow(&mut self, id: &str) -> Result<&mut StoredWorkflow, ServiceError> {
        self.workflows.get_mut(id).ok_or_else(|| ServiceError::NotFound { id: id.to_string() })
    }

    fn folder(&mut self, id: &str) -> Result<&mut Folder, ServiceError> {
        self.folders.get_mut(id).ok_or_else(|| ServiceError::NotFound { id: id.to_string() })
    }

    fn project(&mut self, id: &str) -> Result<&mut Project, ServiceError> {
        self.projects.get_mut(id).ok_or_else(|| ServiceError::NotFound { id: id.to_string() })
    }

    fn insert_project(&mut self, name: &str) -> Project {
        let project = Project { id: Uuid::new_v4().to_string(),
                                name: name.to_string(),
                                created_at: Some(Utc::now()) };
        self.projects.insert(project.id.clone(), project.clone());
        project
    }

    fn ensure_folder(&self, id: &Option<String>) -> Result<(), ServiceError> {
        match id {
            Some(id) if !self.folders.contains_key(id) => Err(ServiceError::NotFound { id: id.clone() }),
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct InMemoryComputeService {
    state: Mutex<State>,
}

fn paginate<T: Clone>(items: Vec<T>, page: Page) -> PageOf<T> {
    let size = page.size.max(1) as usize;
    let start = page.page as usize * size;
    let has_more = items.len() > start + size;
    PageOf { items: items.into_iter().skip(start).take(size).collect(),
             page: page.page,
             size: page.size,
             has_more }
}

impl InMemoryComputeService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Los workflows nuevos recorren estos estados en lecturas sucesivas.
    pub fn with_default_script(self, script: Vec<JobStatus>) -> Self {
        self.lock().default_script = script;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Contabiliza la llamada y aplica fallos inyectados.
    fn enter(&self, operation: &'static str) -> Result<MutexGuard<'_, State>, ServiceError> {
        let mut state = self.lock();
        *state.calls.entry(operation).or_insert(0) += 1;
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(ServiceError::Transient(format!("{operation}: simulated 503 service unavailable")));
        }
        if let Some((code, message)) = state.reject_next.take() {
            return Err(ServiceError::Rejected { code, message });
        }
        Ok(state)
    }

    pub fn fail_next(&self, n: u32) {
        self.lock().fail_next = n;
    }

    pub fn reject_next(&self, code: u16, message: &str) {
        self.lock().reject_next = Some((code, message.to_string()));
    }

    pub fn calls(&self, operation: &str) -> u32 {
        self.lock().calls.get(operation).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.lock().calls.values().sum()
    }

    /// Reemplaza el guion de estados de un workflow existente.
    pub fn script(&self, id: &str, statuses: Vec<JobStatus>) -> Result<(), ServiceError> {
        self.lock().workflow(id)?.script = statuses.into();
        Ok(())
    }

    /// Fija el estado actual sin pasar por el guion (simula al servicio).
    pub fn set_status(&self, id: &str, status: JobStatus) -> Result<(), ServiceError> {
        let mut state = self.lock();
        let stored = state.workflow(id)?;
        stored.script.clear();
        stored.record.status = status;
        if status.is_terminal() {
            stored.record.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn set_result(&self, id: &str, result: Value) -> Result<(), ServiceError> {
        self.lock().workflow(id)?.result = result;
        Ok(())
    }

    /// Moléculas que devolverá `calculation_molecules` para ese cálculo.
    pub fn set_calculation_molecules(&self, calculation_id: &str, molecules: Vec<Value>) {
        self.lock().molecules.insert(calculation_id.to_string(), molecules);
    }

    /// Estado actual sin avanzar el guion ni contar la llamada.
    pub fn peek_status(&self, id: &str) -> Option<JobStatus> {
        self.lock().workflows.get(id).map(|w| w.record.status)
    }

    pub fn workflow_count(&self) -> usize {
        self.lock().workflows.len()
    }

    pub fn folder_count(&self) -> usize {
        self.lock().folders.len()
    }

    pub fn project_count(&self) -> usize {
        self.lock().projects.len()
    }
}

#[async_trait]
impl ComputeService for InMemoryComputeService {
    fn name(&self) -> &str {
        "memory"
    }

    async fn submit(&self, submission: &Submission) -> Result<String, ServiceError> {
        let mut state = self.enter("submit")?;
        state.ensure_folder(&submission.folder_id)?;
        let id = Uuid::new_v4().to_string();
        let record = Workflow { id: id.clone(),
                                workflow_type: submission.workflow_type,
                                status: JobStatus::Queued,
                                parent_id: submission.folder_id.clone(),
                                name: submission.name.clone(),
                                notes: String::new(),
                                starred: false,
                                public: false,
                                created_at: Utc::now(),
                                completed_at: None,
                                parameters: submission.payload.clone(),
                                credits_charged: None };
        let script = state.default_script.iter().copied().collect();
        state.workflows.insert(id.clone(),
                               StoredWorkflow { record,
                                                script,
                                                result: Value::Null });
        debug!("memory service: submitted {} workflow {id}", submission.workflow_type);
        Ok(id)
    }

    async fn get_status(&self, id: &str) -> Result<i64, ServiceError> {
        let mut state = self.enter("get_status")?;
        let stored = state.workflow(id)?;
        // Un estado terminal no vuelve a cambiar.
        if !stored.record.status.is_terminal() {
            if let Some(next) = stored.script.pop_front() {
                stored.record.status = next;
                if next.is_terminal() {
                    stored.record.completed_at = Some(Utc::now());
                }
            }
        }
        Ok(stored.record.status.code())
    }

    async fn get_result(&self, id: &str) -> Result<Value, ServiceError> {
        let mut state = self.enter("get_result")?;
        let stored = state.workflow(id)?;
        Ok(json!({
            "uuid": stored.record.id,
            "status": stored.record.status.code(),
            "data": stored.result,
        }))
    }

    async fn retrieve_workflow(&self, id: &str) -> Result<Workflow, ServiceError> {
        let mut state = self.enter("retrieve_workflow")?;
        Ok(state.workflow(id)?.record.clone())
    }

    async fn update_workflow(&self, id: &str, patch: &WorkflowPatch) -> Result<Workflow, ServiceError> {
        let mut state = self.enter("update_workflow")?;
        if let Some(parent) = &patch.parent_id {
            state.ensure_folder(parent)?;
        }
        let record = &mut state.workflow(id)?.record;
        if let Some(name) = &patch.name {
            record.name = name.clone();
        }
        if let Some(notes) = &patch.notes {
            record.notes = notes.clone();
        }
        if let Some(starred) = patch.starred {
            record.starred = starred;
        }
        if let Some(public) = patch.public {
            record.public = public;
        }
        if let Some(parent) = &patch.parent_id {
            record.parent_id = parent.clone();
        }
        Ok(record.clone())
    }

    async fn stop(&self, id: &str) -> Result<(), ServiceError> {
        let mut state = self.enter("stop")?;
        let stored = state.workflow(id)?;
        if !stored.record.status.is_terminal() {
            stored.script.clear();
            stored.record.status = JobStatus::Stopped;
            stored.record.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let mut state = self.enter("delete")?;
        state.workflows
             .shift_remove(id)
             .map(|_| ())
             .ok_or_else(|| ServiceError::NotFound { id: id.to_string() })
    }

    async fn delete_data(&self, id: &str) -> Result<(), ServiceError> {
        let mut state = self.enter("delete_data")?;
        let stored = state.workflow(id)?;
        stored.result = Value::Null;
        stored.record.parameters = Value::Null;
        Ok(())
    }

    async fn calculation_molecules(&self, calculation_id: &str) -> Result<Vec<Value>, ServiceError> {
        let state = self.enter("calculation_molecules")?;
        state.molecules
             .get(calculation_id)
             .cloned()
             .ok_or_else(|| ServiceError::NotFound { id: calculation_id.to_string() })
    }

    async fn list_workflows(&self, filter: &WorkflowFilter, page: Page) -> Result<PageOf<Workflow>, ServiceError> {
        let state = self.enter("list_workflows")?;
        let items = state.workflows
                         .values()
                         .map(|w| &w.record)
                         .filter(|w| filter.matches(w))
                         .cloned()
                         .collect();
        Ok(paginate(items, page))
    }

    async fn create_folder(&self, folder: &NewFolder) -> Result<Folder, ServiceError> {
        let mut state = self.enter("create_folder")?;
        state.ensure_folder(&folder.parent_id)?;
        let record = Folder { id: Uuid::new_v4().to_string(),
                              name: folder.name.clone(),
                              parent_id: folder.parent_id.clone(),
                              public: folder.public,
                              starred: folder.starred,
                              notes: folder.notes.clone(),
                              created_at: Utc::now() };
        state.folders.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn retrieve_folder(&self, id: &str) -> Result<Folder, ServiceError> {
        let mut state = self.enter("retrieve_folder")?;
        Ok(state.folder(id)?.clone())
    }

    async fn update_folder(&self, id: &str, patch: &FolderPatch) -> Result<Folder, ServiceError> {
        let mut state = self.enter("update_folder")?;
        if let Some(parent) = &patch.parent_id {
            state.ensure_folder(parent)?;
        }
        let folder = state.folder(id)?;
        if let Some(name) = &patch.name {
            folder.name = name.clone();
        }
        if let Some(notes) = &patch.notes {
            folder.notes = notes.clone();
        }
        if let Some(starred) = patch.starred {
            folder.starred = starred;
        }
        if let Some(public) = patch.public {
            folder.public = public;
        }
        if let Some(parent) = &patch.parent_id {
            folder.parent_id = parent.clone();
        }
        Ok(folder.clone())
    }

    async fn delete_folder(&self, id: &str) -> Result<(), ServiceError> {
        let mut state = self.enter("delete_folder")?;
        let owner = Some(id.to_string());
        let occupied = state.folders.values().any(|f| f.parent_id == owner)
                       || state.workflows.values().any(|w| w.record.parent_id == owner);
        if occupied {
            return Err(ServiceError::Rejected { code: 409,
                                                message: format!("folder {id} is not empty") });
        }
        state.folders
             .shift_remove(id)
             .map(|_| ())
             .ok_or_else(|| ServiceError::NotFound { id: id.to_string() })
    }

    async fn list_folders(&self, filter: &FolderFilter, page: Page) -> Result<PageOf<Folder>, ServiceError> {
        let state = self.enter("list_folders")?;
        let items = state.folders.values().filter(|f| filter.matches(f)).cloned().collect();
        Ok(paginate(items, page))
    }

    async fn create_project(&self, name: &str) -> Result<Project, ServiceError> {
        let mut state = self.enter("create_project")?;
        Ok(state.insert_project(name))
    }

    async fn retrieve_project(&self, id: &str) -> Result<Project, ServiceError> {
        let mut state = self.enter("retrieve_project")?;
        Ok(state.project(id)?.clone())
    }

    async fn update_project(&self, id: &str, name: &str) -> Result<Project, ServiceError> {
        let mut state = self.enter("update_project")?;
        let project = state.project(id)?;
        project.name = name.to_string();
        Ok(project.clone())
    }

    async fn delete_project(&self, id: &str) -> Result<(), ServiceError> {
        let mut state = self.enter("delete_project")?;
        if state.default_project.as_deref() == Some(id) {
            return Err(ServiceError::Rejected { code: 409,
                                                message: format!("project {id} is the default project") });
        }
        state.projects
             .shift_remove(id)
             .map(|_| ())
             .ok_or_else(|| ServiceError::NotFound { id: id.to_string() })
    }

    async fn list_projects(&self, filter: &ProjectFilter, page: Page) -> Result<PageOf<Project>, ServiceError> {
        let state = self.enter("list_projects")?;
        let items = state.projects.values().filter(|p| filter.matches(p)).cloned().collect();
        Ok(paginate(items, page))
    }

    async fn default_project(&self) -> Result<Project, ServiceError> {
        let mut state = self.enter("default_project")?;
        if let Some(project) = state.default_project.clone().and_then(|id| state.projects.get(&id).cloned()) {
            return Ok(project);
        }
        let project = state.insert_project("Default project");
        state.default_project = Some(project.id.clone());
        Ok(project)
    }
}
