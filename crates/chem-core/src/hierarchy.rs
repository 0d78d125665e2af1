//! Árbol de carpetas y workflows.
//!
//! Antes de mover una carpeta se recorre la cadena de padres del destino; si
//! aparece la propia carpeta, el movimiento se rechaza con `Cycle`. Borrar
//! una carpeta arrastra todo su contenido.
use chem_domain::{Folder, FolderFilter, FolderPatch, NewFolder, NodeRef, Page, PageOf, Project, ProjectFilter,
                  Workflow, WorkflowFilter, WorkflowPatch};
use chem_providers::ComputeService;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::JobError;

/// Tamaño de página al recorrer el contenido de una carpeta.
const WALK_PAGE_SIZE: u32 = 100;
/// Corte del recorrido si el remoto ignora `page` o nunca deja de anunciar más.
const MAX_WALK_PAGES: u32 = 1000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionReport {
    pub folders_deleted: usize,
    pub workflows_deleted: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderListing {
    pub folders: PageOf<Folder>,
    pub workflows: PageOf<Workflow>,
}

pub struct HierarchyManager {
    service: Arc<dyn ComputeService>,
}

impl HierarchyManager {
    pub fn new(service: Arc<dyn ComputeService>) -> Self {
        Self { service }
    }

    async fn ensure_parent(&self, parent: Option<&str>) -> Result<(), JobError> {
        match parent {
            None => Ok(()),
            Some(id) => match self.service.retrieve_folder(id).await {
                Ok(_) => Ok(()),
                Err(err) if err.is_not_found() => Err(JobError::InvalidParent { id: id.to_string() }),
                Err(err) => Err(err.into()),
            },
        }
    }

    pub async fn create_folder(&self, folder: &NewFolder) -> Result<Folder, JobError> {
        self.ensure_parent(folder.parent_id.as_deref()).await?;
        let created = self.service.create_folder(folder).await?;
        info!("created folder '{}' ({})", created.name, created.id);
        Ok(created)
    }

    pub async fn retrieve_folder(&self, id: &str) -> Result<Folder, JobError> {
        Ok(self.service.retrieve_folder(id).await?)
    }

    /// Nombre, notas y marcas. El padre sólo cambia con [`Self::move_node`].
    pub async fn update_folder(&self, id: &str, patch: &FolderPatch) -> Result<Folder, JobError> {
        let patch = FolderPatch { parent_id: None,
                                  ..patch.clone() };
        Ok(self.service.update_folder(id, &patch).await?)
    }

    /// `new_parent = None` mueve a la raíz.
    pub async fn move_node(&self, node: &NodeRef, new_parent: Option<&str>) -> Result<(), JobError> {
        self.ensure_parent(new_parent).await?;
        let parent_id = Some(new_parent.map(str::to_string));
        match node {
            NodeRef::Workflow(id) => {
                let patch = WorkflowPatch { parent_id,
                                            ..Default::default() };
                self.service.update_workflow(id, &patch).await?;
            }
            NodeRef::Folder(id) => {
                if let Some(target) = new_parent {
                    self.check_acyclic(id, target).await?;
                }
                let patch = FolderPatch { parent_id,
                                          ..Default::default() };
                self.service.update_folder(id, &patch).await?;
            }
        }
        info!("moved {node} under {}", new_parent.unwrap_or("root"));
        Ok(())
    }

    /// Sube desde `target` hasta la raíz; encontrar `folder` es un ciclo.
    async fn check_acyclic(&self, folder: &str, target: &str) -> Result<(), JobError> {
        let cycle = || JobError::Cycle { node: folder.to_string(),
                                         new_parent: target.to_string() };
        let mut seen = HashSet::new();
        let mut current = Some(target.to_string());
        while let Some(id) = current {
            if id == folder {
                return Err(cycle());
            }
            if !seen.insert(id.clone()) {
                // El remoto ya tiene un ciclo por encima del destino.
                warn!("parent chain of {target} loops at {id}");
                return Err(cycle());
            }
            current = self.service.retrieve_folder(&id).await?.parent_id;
        }
        Ok(())
    }

    /// Borrado en cascada. Peligroso pero no es un error: confirmar antes.
    pub async fn delete(&self, node: &NodeRef) -> Result<DeletionReport, JobError> {
        let root = match node {
            NodeRef::Workflow(id) => {
                self.service.delete(id).await?;
                return Ok(DeletionReport { folders_deleted: 0,
                                           workflows_deleted: 1 });
            }
            NodeRef::Folder(id) => self.service.retrieve_folder(id).await?,
        };

        // Primero se recoge todo el subárbol; luego se borra de las hojas hacia arriba.
        let mut folders = vec![root.id.clone()];
        let mut seen: HashSet<String> = folders.iter().cloned().collect();
        let mut workflows = Vec::new();
        let mut next = 0;
        while next < folders.len() {
            let parent = folders[next].clone();
            next += 1;
            workflows.extend(self.all_workflows_in(&parent).await?.into_iter().map(|w| w.id));
            for child in self.all_folders_in(&parent).await? {
                if !seen.insert(child.id.clone()) {
                    // Una carpeta alcanzable dos veces: el remoto tiene un ciclo.
                    warn!("folder {} reappears under {parent}; refusing to delete {}", child.id, root.id);
                    return Err(JobError::Cycle { node: child.id,
                                                 new_parent: parent });
                }
                folders.push(child.id);
            }
        }

        let mut report = DeletionReport::default();
        for id in &workflows {
            self.service.delete(id).await?;
            report.workflows_deleted += 1;
        }
        for id in folders.iter().rev() {
            self.service.delete_folder(id).await?;
            report.folders_deleted += 1;
        }
        info!("deleted folder {} with {} subfolders and {} workflows",
              root.id,
              report.folders_deleted - 1,
              report.workflows_deleted);
        Ok(report)
    }

    async fn all_folders_in(&self, parent: &str) -> Result<Vec<Folder>, JobError> {
        let filter = FolderFilter { parent_id: Some(parent.to_string()),
                                    ..Default::default() };
        let mut page = Page { page: 0,
                              size: WALK_PAGE_SIZE };
        let mut out: Vec<Folder> = Vec::new();
        let mut ids = HashSet::new();
        loop {
            let batch = self.service.list_folders(&filter, page).await?;
            let before = out.len();
            out.extend(batch.items.into_iter().filter(|f| ids.insert(f.id.clone())));
            if !batch.has_more || out.len() == before || page.page >= MAX_WALK_PAGES {
                return Ok(out);
            }
            page.page += 1;
        }
    }

    async fn all_workflows_in(&self, parent: &str) -> Result<Vec<Workflow>, JobError> {
        let filter = WorkflowFilter { parent_id: Some(parent.to_string()),
                                      ..Default::default() };
        let mut page = Page { page: 0,
                              size: WALK_PAGE_SIZE };
        let mut out: Vec<Workflow> = Vec::new();
        let mut ids = HashSet::new();
        loop {
            let batch = self.service.list_workflows(&filter, page).await?;
            let before = out.len();
            out.extend(batch.items.into_iter().filter(|w| ids.insert(w.id.clone())));
            if !batch.has_more || out.len() == before || page.page >= MAX_WALK_PAGES {
                return Ok(out);
            }
            page.page += 1;
        }
    }

    pub async fn list_folders(&self, filter: &FolderFilter, page: Page) -> Result<PageOf<Folder>, JobError> {
        Ok(self.service.list_folders(filter, page).await?)
    }

    pub async fn list_workflows(&self, filter: &WorkflowFilter, page: Page) -> Result<PageOf<Workflow>, JobError> {
        Ok(self.service.list_workflows(filter, page).await?)
    }

    pub async fn create_project(&self, name: &str) -> Result<Project, JobError> {
        let created = self.service.create_project(name).await?;
        info!("created project '{}' ({})", created.name, created.id);
        Ok(created)
    }

    pub async fn retrieve_project(&self, id: &str) -> Result<Project, JobError> {
        Ok(self.service.retrieve_project(id).await?)
    }

    pub async fn rename_project(&self, id: &str, name: &str) -> Result<Project, JobError> {
        Ok(self.service.update_project(id, name).await?)
    }

    /// Irreversible: el servicio se lleva todo lo que cuelga del proyecto.
    pub async fn delete_project(&self, id: &str) -> Result<(), JobError> {
        self.service.delete_project(id).await?;
        warn!("deleted project {id} and everything it contained");
        Ok(())
    }

    pub async fn list_projects(&self, filter: &ProjectFilter, page: Page) -> Result<PageOf<Project>, JobError> {
        Ok(self.service.list_projects(filter, page).await?)
    }

    pub async fn default_project(&self) -> Result<Project, JobError> {
        Ok(self.service.default_project().await?)
    }

    /// Contenido directo de una carpeta (ambas listas con la misma página).
    pub async fn list(&self, parent: &str, page: Page) -> Result<FolderListing, JobError> {
        let folders = FolderFilter { parent_id: Some(parent.to_string()),
                                     ..Default::default() };
        let workflows = WorkflowFilter { parent_id: Some(parent.to_string()),
                                         ..Default::default() };
        Ok(FolderListing { folders: self.service.list_folders(&folders, page).await?,
                           workflows: self.service.list_workflows(&workflows, page).await? })
    }
}
