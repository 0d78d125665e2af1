// chem-domain library entry point
pub mod elements;
pub mod error;
pub mod hashing;
pub mod issue;
pub mod mode;
pub mod molecule;
pub mod project;
pub mod request;
pub mod structure;
pub mod workflow;

pub use elements::{element_class, ElementClass};
pub use error::DomainError;
pub use issue::{IssueKind, ValidationIssue};
pub use mode::{CalculationMode, ConvergenceThresholds};
pub use molecule::{Molecule, NotationKind};
pub use project::{Project, ProjectFilter};
pub use request::ChemistryRequest;
pub use structure::{parse_structure, Structure};
pub use workflow::{Folder, FolderFilter, FolderPatch, JobStatus, NewFolder, NodeRef, Page, PageOf, Workflow,
                   WorkflowFilter, WorkflowPatch, WorkflowType};
