//! chem-policies: validador de sanidad química.
//!
//! Reglas deterministas que aceptan o rechazan una `ChemistryRequest` antes
//! de cualquier llamada de red, con explicación y ejemplo corregido:
//! - notación (grafo covalente vs fragmentos cargados),
//! - paridad de electrones vs multiplicidades (con valores por defecto),
//! - combinaciones de tareas riesgosas (sólo advertencias).

pub mod ligands;
pub mod notation;
pub mod parity;
pub mod risk;
pub mod validator;

pub use notation::{classify_notation, Notation, NotationClassifier, NotationReport, RuleBasedClassifier};
pub use parity::{required_parity, Parity};
pub use risk::RiskRule;
pub use validator::{Accepted, DefaultAssignment, Validator, Verdict};
