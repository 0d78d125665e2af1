//! Solicitud de cálculo ya normalizada.
//!
//! El normalizador la construye, el validador la acepta o rechaza y sólo la
//! versión aceptada llega al servicio de cómputo. Una vez aceptada no se
//! vuelve a modificar.
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::hashing::hash_value;
use crate::mode::CalculationMode;
use crate::molecule::Molecule;
use crate::workflow::WorkflowType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChemistryRequest {
    pub workflow_type: WorkflowType,
    pub name: String,
    pub molecule: Molecule,
    /// `None`: se usa la suma de cargas formales de la cadena.
    pub charge: Option<i32>,
    /// Conjunto ordenado; vacío significa "que el validador asigne".
    pub multiplicities: IndexSet<u32>,
    pub method: String,
    pub engine: String,
    pub tasks: IndexSet<String>,
    pub solvent: Option<String>,
    pub mode: Option<CalculationMode>,
    pub folder_id: Option<String>,
    /// 0 = sin límite.
    pub max_credits: u32,
}

impl ChemistryRequest {
    pub fn has_task(&self, task: &str) -> bool {
        self.tasks.iter().any(|t| t.eq_ignore_ascii_case(task))
    }

    /// Documento que se envía al servicio remoto.
    ///
    /// `effective_charge` es la carga que el validador usó para el conteo de
    /// electrones (la declarada o la formal).
    pub fn to_payload(&self, effective_charge: i32) -> Value {
        let multiplicities: Vec<u32> = self.multiplicities.iter().copied().collect();
        let mut data = Map::new();
        data.insert("method".into(), json!(self.method));
        data.insert("engine".into(), json!(self.engine));
        data.insert("tasks".into(), json!(self.tasks.iter().collect::<Vec<_>>()));
        if let Some(mode) = self.mode {
            data.insert("mode".into(), json!(mode.as_str()));
            data.insert("convergence".into(), json!(mode.thresholds()));
        }
        if let Some(solvent) = &self.solvent {
            data.insert("solvent".into(), json!(solvent));
        }
        if self.workflow_type.is_multi_state() {
            data.insert("multiplicities".into(), json!(multiplicities));
        }

        let mut payload = json!({
            "workflow_type": self.workflow_type.as_str(),
            "name": self.name,
            "initial_molecule": {
                "smiles": self.molecule.structure(),
                "notation": self.molecule.notation(),
                "charge": effective_charge,
                "multiplicity": multiplicities.first().copied().unwrap_or(1),
            },
            "workflow_data": Value::Object(data),
        });
        if let Some(folder) = &self.folder_id {
            payload["folder_uuid"] = json!(folder);
        }
        if self.max_credits > 0 {
            payload["max_credits"] = json!(self.max_credits);
        }
        payload
    }

    /// Huella estable: mismo contenido ⇒ misma huella, sin importar el orden
    /// de serialización de los campos.
    pub fn fingerprint(&self, effective_charge: i32) -> String {
        hash_value(&self.to_payload(effective_charge))
    }
}
