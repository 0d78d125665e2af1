//! Combinaciones de tareas que suelen fallar río abajo.
//!
//! Sólo producen advertencias: la solicitud sigue adelante con la
//! recomendación adjunta.
use chem_domain::structure::Structure;
use chem_domain::{CalculationMode, ChemistryRequest, IssueKind, ValidationIssue};

/// Contrato de reglas de riesgo.
pub trait RiskRule: Send + Sync {
    fn id(&self) -> &'static str;
    fn assess(&self, request: &ChemistryRequest, structure: &Structure) -> Option<ValidationIssue>;
}

const SECOND_DERIVATIVE_TASKS: [&str; 2] = ["frequencies", "hessian"];

fn second_derivative_tasks(request: &ChemistryRequest) -> Vec<&str> {
    SECOND_DERIVATIVE_TASKS.iter().copied().filter(|t| request.has_task(t)).collect()
}

fn without_tasks(request: &ChemistryRequest, drop: &[&str]) -> String {
    let mut kept: Vec<String> = request.tasks
                                       .iter()
                                       .filter(|t| !drop.iter().any(|d| t.eq_ignore_ascii_case(d)))
                                       .map(|t| format!("\"{t}\""))
                                       .collect();
    if kept.is_empty() {
        kept.push("\"optimize\"".into());
    }
    format!("tasks: [{}]", kept.join(", "))
}

/// Análisis vibracional sobre complejos de coordinación.
pub struct FrequenciesOnMetalComplex;

impl RiskRule for FrequenciesOnMetalComplex {
    fn id(&self) -> &'static str {
        "frequencies_on_metal_complex"
    }

    fn assess(&self, request: &ChemistryRequest, structure: &Structure) -> Option<ValidationIssue> {
        let tasks = second_derivative_tasks(request);
        let metals = structure.metal_centers();
        if tasks.is_empty() || metals.is_empty() {
            return None;
        }
        let metal = &structure.atoms[metals[0]].symbol;
        Some(ValidationIssue::new(IssueKind::RiskyTaskCombination,
                                  format!("{} on a {metal} coordination complex frequently fails downstream; run the optimization alone first",
                                          tasks.join("/")),
                                  without_tasks(request, &tasks)).on_field("tasks"))
    }
}

/// Frecuencias con umbrales de convergencia demasiado laxos.
pub struct RecklessFrequencies;

impl RiskRule for RecklessFrequencies {
    fn id(&self) -> &'static str {
        "reckless_frequencies"
    }

    fn assess(&self, request: &ChemistryRequest, _structure: &Structure) -> Option<ValidationIssue> {
        let tasks = second_derivative_tasks(request);
        if tasks.is_empty() || request.mode != Some(CalculationMode::Reckless) {
            return None;
        }
        Some(ValidationIssue::new(IssueKind::RiskyTaskCombination,
                                  format!("{} with mode 'reckless' converges too loosely and produces spurious imaginary modes",
                                          tasks.join("/")),
                                  "mode: careful").on_field("mode"))
    }
}

pub fn default_rules() -> Vec<Box<dyn RiskRule>> {
    vec![Box::new(FrequenciesOnMetalComplex), Box::new(RecklessFrequencies)]
}
