//! Registros remotos: workflows (trabajos) y carpetas.
//!
//! El servicio de cómputo es el dueño de estos registros; aquí sólo se
//! describen sus formas canónicas.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DomainError;

/// Catálogo cerrado de tipos de workflow aceptados por el servicio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    Admet,
    BasicCalculation,
    Bde,
    ConformerSearch,
    Descriptors,
    Docking,
    ElectronicProperties,
    Fukui,
    HydrogenBondBasicity,
    Irc,
    MolecularDynamics,
    MultistageOpt,
    Pka,
    RedoxPotential,
    Scan,
    Solubility,
    SpinStates,
    Tautomers,
}

impl WorkflowType {
    pub const ALL: [WorkflowType; 18] = [WorkflowType::Admet,
                                         WorkflowType::BasicCalculation,
                                         WorkflowType::Bde,
                                         WorkflowType::ConformerSearch,
                                         WorkflowType::Descriptors,
                                         WorkflowType::Docking,
                                         WorkflowType::ElectronicProperties,
                                         WorkflowType::Fukui,
                                         WorkflowType::HydrogenBondBasicity,
                                         WorkflowType::Irc,
                                         WorkflowType::MolecularDynamics,
                                         WorkflowType::MultistageOpt,
                                         WorkflowType::Pka,
                                         WorkflowType::RedoxPotential,
                                         WorkflowType::Scan,
                                         WorkflowType::Solubility,
                                         WorkflowType::SpinStates,
                                         WorkflowType::Tautomers];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowType::Admet => "admet",
            WorkflowType::BasicCalculation => "basic_calculation",
            WorkflowType::Bde => "bde",
            WorkflowType::ConformerSearch => "conformer_search",
            WorkflowType::Descriptors => "descriptors",
            WorkflowType::Docking => "docking",
            WorkflowType::ElectronicProperties => "electronic_properties",
            WorkflowType::Fukui => "fukui",
            WorkflowType::HydrogenBondBasicity => "hydrogen_bond_basicity",
            WorkflowType::Irc => "irc",
            WorkflowType::MolecularDynamics => "molecular_dynamics",
            WorkflowType::MultistageOpt => "multistage_opt",
            WorkflowType::Pka => "pka",
            WorkflowType::RedoxPotential => "redox_potential",
            WorkflowType::Scan => "scan",
            WorkflowType::Solubility => "solubility",
            WorkflowType::SpinStates => "spin_states",
            WorkflowType::Tautomers => "tautomers",
        }
    }

    /// Los workflows de estados de espín trabajan con varias multiplicidades;
    /// el resto con una sola.
    pub fn is_multi_state(self) -> bool {
        matches!(self, WorkflowType::SpinStates)
    }
}

impl FromStr for WorkflowType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase().replace('-', "_");
        WorkflowType::ALL.into_iter()
                         .find(|t| t.as_str() == lowered)
                         .ok_or(DomainError::UnknownWorkflowType(s.to_string()))
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Estado de un trabajo remoto.
///
/// Transiciones observables:
/// - `AwaitingQueue` -> `Queued` (se libera cupo)
/// - `Queued` -> `Running`
/// - `Running` -> `Completed` | `Failed` | `Stopped`
///
/// Los estados terminales no transicionan más. El núcleo sólo observa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Stopped,
    AwaitingQueue,
}

impl JobStatus {
    pub fn code(self) -> i64 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Running => 1,
            JobStatus::Completed => 2,
            JobStatus::Failed => 3,
            JobStatus::Stopped => 4,
            JobStatus::AwaitingQueue => 5,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, DomainError> {
        match code {
            0 => Ok(JobStatus::Queued),
            1 => Ok(JobStatus::Running),
            2 => Ok(JobStatus::Completed),
            3 => Ok(JobStatus::Failed),
            4 => Ok(JobStatus::Stopped),
            5 => Ok(JobStatus::AwaitingQueue),
            other => Err(DomainError::UnknownStatus(other)),
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED_OK",
            JobStatus::Failed => "FAILED",
            JobStatus::Stopped => "STOPPED",
            JobStatus::AwaitingQueue => "AWAITING_QUEUE",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Stopped)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Un trabajo asíncrono remoto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub workflow_type: WorkflowType,
    pub status: JobStatus,
    pub parent_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub notes: String,
    pub starred: bool,
    pub public: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Parámetros enviados (forma canónica de la solicitud).
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub credits_charged: Option<f64>,
}

/// Contenedor de workflows y otras carpetas. `parent_id = None` es la raíz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub public: bool,
    pub starred: bool,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// Referencia a un nodo del árbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum NodeRef {
    Folder(String),
    Workflow(String),
}

impl NodeRef {
    pub fn id(&self) -> &str {
        match self {
            NodeRef::Folder(id) | NodeRef::Workflow(id) => id,
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Folder(id) => write!(f, "folder {id}"),
            NodeRef::Workflow(id) => write!(f, "workflow {id}"),
        }
    }
}

/// Paginación 0-indexada.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page: u32,
    pub size: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self { page: 0, size: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageOf<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    /// `true` si probablemente hay más páginas.
    pub has_more: bool,
}

/// Filtros de listado de workflows. `None` = sin filtrar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowFilter {
    pub parent_id: Option<String>,
    pub name_contains: Option<String>,
    pub public: Option<bool>,
    pub starred: Option<bool>,
    pub status: Option<JobStatus>,
    pub workflow_type: Option<WorkflowType>,
}

impl WorkflowFilter {
    pub fn matches(&self, w: &Workflow) -> bool {
        self.parent_id.as_ref().map_or(true, |p| w.parent_id.as_ref() == Some(p))
        && self.name_contains
               .as_ref()
               .map_or(true, |n| w.name.to_lowercase().contains(&n.to_lowercase()))
        && self.public.map_or(true, |p| w.public == p)
        && self.starred.map_or(true, |s| w.starred == s)
        && self.status.map_or(true, |s| w.status == s)
        && self.workflow_type.map_or(true, |t| w.workflow_type == t)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderFilter {
    pub parent_id: Option<String>,
    pub name_contains: Option<String>,
    pub public: Option<bool>,
    pub starred: Option<bool>,
}

impl FolderFilter {
    pub fn matches(&self, f: &Folder) -> bool {
        self.parent_id.as_ref().map_or(true, |p| f.parent_id.as_ref() == Some(p))
        && self.name_contains
               .as_ref()
               .map_or(true, |n| f.name.to_lowercase().contains(&n.to_lowercase()))
        && self.public.map_or(true, |p| f.public == p)
        && self.starred.map_or(true, |s| f.starred == s)
    }
}

/// Cambios parciales de un workflow; `None` conserva el valor actual.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowPatch {
    pub name: Option<String>,
    pub notes: Option<String>,
    pub starred: Option<bool>,
    pub public: Option<bool>,
    /// `Some(None)` mueve a la raíz.
    pub parent_id: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderPatch {
    pub name: Option<String>,
    pub notes: Option<String>,
    pub starred: Option<bool>,
    pub public: Option<bool>,
    pub parent_id: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFolder {
    pub name: String,
    pub parent_id: Option<String>,
    pub notes: String,
    pub starred: bool,
    pub public: bool,
}
