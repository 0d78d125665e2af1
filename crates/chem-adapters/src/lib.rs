//! chem-adapters: normalización de parámetros de entrada.
//!
//! Convierte campos heterogéneos (texto libre, JSON, valores nativos) en una
//! `ChemistryRequest` tipada. No valida química; eso es de `chem-policies`.

pub mod aliases;
pub mod canonical;
pub mod draft;
pub mod flexible;

pub use aliases::canonical_method;
pub use draft::{RequestDraft, MAX_ABS_CHARGE, MAX_MULTIPLICITY};
pub use flexible::FlexibleValue;
