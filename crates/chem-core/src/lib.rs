//! chem-core: seguimiento de trabajos, estado en lote y jerarquía de carpetas.
//!
//! Todo pasa por un [`chem_providers::ComputeService`] compartido; el núcleo
//! sólo guarda vistas efímeras (memo de estados terminales y una caché
//! consultiva opcional).
pub mod batch;
pub mod cache;
pub mod errors;
pub mod hierarchy;
pub mod status;
pub mod tracker;

pub use batch::{BatchEntry, BatchOutcome, BatchReport, BatchStatusAggregator};
pub use cache::StatusCache;
pub use errors::JobError;
pub use hierarchy::{DeletionReport, FolderListing, HierarchyManager};
pub use status::StatusSnapshot;
pub use tracker::{Cadence, JobTracker, StopOutcome, Submitted, WaitOptions, WaitOutcome, MIN_POLL_INTERVAL};
