//! Borrador de solicitud y su normalización a `ChemistryRequest`.
//!
//! Función pura: sin red, sin estado. Todos los problemas de lectura de
//! campos se acumulan para que el llamador los corrija de una sola vez.
use chem_domain::{CalculationMode, ChemistryRequest, Molecule, NotationKind, ValidationIssue, WorkflowType};
use indexmap::IndexSet;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::aliases::{canonical_method, DEFAULT_ENGINE, DEFAULT_METHOD, DEFAULT_TASKS};
use crate::canonical::{to_int, to_opt_string, to_positive_int_list, to_string_list};
use crate::flexible::FlexibleValue;

/// Campos tal como llegan del llamador. Todos son opcionales salvo
/// `molecule`, y todos aceptan texto, JSON o valores nativos.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestDraft {
    pub workflow_type: Option<FlexibleValue>,
    pub name: Option<FlexibleValue>,
    pub molecule: Option<FlexibleValue>,
    pub notation: Option<FlexibleValue>,
    pub charge: Option<FlexibleValue>,
    pub multiplicities: Option<FlexibleValue>,
    pub method: Option<FlexibleValue>,
    pub engine: Option<FlexibleValue>,
    pub tasks: Option<FlexibleValue>,
    pub solvent: Option<FlexibleValue>,
    pub mode: Option<FlexibleValue>,
    pub folder_id: Option<FlexibleValue>,
    pub max_credits: Option<FlexibleValue>,
}

/// Acumulador de problemas: cada lectura fallida queda registrada y devuelve
/// `None` para que el resto de campos se sigan leyendo.
#[derive(Default)]
struct Issues(Vec<ValidationIssue>);

impl Issues {
    fn take<T>(&mut self, result: Result<T, ValidationIssue>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(issue) => {
                self.0.push(issue);
                None
            }
        }
    }
}

fn read<T>(issues: &mut Issues,
           field: &str,
           raw: &Option<FlexibleValue>,
           f: impl Fn(&str, &FlexibleValue) -> Result<Option<T>, ValidationIssue>)
           -> Option<T> {
    raw.as_ref().and_then(|v| issues.take(f(field, v)).flatten())
}

fn read_list<T>(issues: &mut Issues,
                field: &str,
                raw: &Option<FlexibleValue>,
                f: impl Fn(&str, &FlexibleValue) -> Result<Vec<T>, ValidationIssue>)
                -> Option<Vec<T>> {
    match raw {
        None => Some(Vec::new()),
        Some(v) => issues.take(f(field, v)),
    }
}

fn parse_catalogue<T: std::str::FromStr>(issues: &mut Issues,
                                         field: &str,
                                         raw: Option<String>,
                                         valid: &[&str])
                                         -> Option<Option<T>> {
    match raw {
        None => Some(None),
        Some(text) => match text.parse::<T>() {
            Ok(v) => Some(Some(v)),
            Err(_) => {
                issues.0.push(ValidationIssue::malformed(field,
                                                         format!("unknown {field} '{text}'; valid values: {}",
                                                                 valid.join(", ")),
                                                         valid.first().copied().unwrap_or_default()));
                None
            }
        },
    }
}

/// Acepta también el documento `{"smiles": "..."}` que devuelven otros
/// servicios de búsqueda de moléculas.
fn structure_field(raw: &Option<FlexibleValue>) -> Option<FlexibleValue> {
    let object = match raw {
        Some(FlexibleValue::ParsedScalar(Value::Object(obj))) => Some(obj.clone()),
        Some(FlexibleValue::Raw(text)) if text.trim_start().starts_with('{') => {
            serde_json::from_str::<Map<String, Value>>(text).ok()
        }
        _ => None,
    };
    match object {
        Some(obj) => obj.get("smiles").cloned().map(FlexibleValue::from),
        None => raw.clone(),
    }
}

/// Mayor carga neta aceptada en valor absoluto.
pub const MAX_ABS_CHARGE: i64 = 1000;
/// Mayor multiplicidad de espín aceptada.
pub const MAX_MULTIPLICITY: u32 = 101;

fn bounded_charge(issues: &mut Issues, value: i64) -> Option<i32> {
    if value.unsigned_abs() > MAX_ABS_CHARGE.unsigned_abs() {
        issues.0.push(ValidationIssue::malformed("charge",
                                                 format!("charge {value} is outside -{MAX_ABS_CHARGE}..={MAX_ABS_CHARGE}"),
                                                 "0"));
        return None;
    }
    narrow::<i32>(issues, "charge", value)
}

fn bounded_multiplicities(issues: &mut Issues, values: Vec<u32>) -> Option<Vec<u32>> {
    let too_large: Vec<String> = values.iter().filter(|m| **m > MAX_MULTIPLICITY).map(u32::to_string).collect();
    if !too_large.is_empty() {
        issues.0.push(ValidationIssue::malformed("multiplicities",
                                                 format!("multiplicities [{}] exceed {MAX_MULTIPLICITY}",
                                                         too_large.join(", ")),
                                                 "[1, 3, 5]"));
        return None;
    }
    Some(values)
}

fn narrow<T: TryFrom<i64>>(issues: &mut Issues, field: &str, value: i64) -> Option<T> {
    issues.take(T::try_from(value).map_err(|_| {
                                      ValidationIssue::malformed(field, format!("{field} {value} is out of range"), "0")
                                  }))
}

impl RequestDraft {
    /// Normaliza el borrador. Devuelve todos los `malformed-field` a la vez.
    pub fn normalize(&self) -> Result<ChemistryRequest, Vec<ValidationIssue>> {
        let mut issues = Issues::default();

        let workflow_names: Vec<&str> = WorkflowType::ALL.iter().map(|t| t.as_str()).collect();
        let workflow_type = read(&mut issues, "workflow_type", &self.workflow_type, to_opt_string);
        let workflow_type = parse_catalogue::<WorkflowType>(&mut issues, "workflow_type", workflow_type, &workflow_names)
            .map(|t| t.unwrap_or(WorkflowType::BasicCalculation));

        let notation_names = ["covalent", "fragmented", "ionic"];
        let notation = read(&mut issues, "notation", &self.notation, to_opt_string);
        let notation = parse_catalogue::<NotationKind>(&mut issues, "notation", notation, &notation_names);

        let structure = read(&mut issues, "molecule", &structure_field(&self.molecule), to_opt_string);
        let molecule = match (structure, notation) {
            (Some(s), Some(notation)) => issues.take(Molecule::new(&s, notation).map_err(|e| {
                                                        ValidationIssue::malformed("molecule", e.to_string(), "CCO")
                                                    })),
            (None, _) => {
                issues.0.push(ValidationIssue::malformed("molecule",
                                                         "a structural string is required",
                                                         "[Cl-].[Cl-].[Cl-].[Cl-].[Cu+2]"));
                None
            }
            (Some(_), None) => None,
        };

        let mode_names: Vec<&str> = std::iter::once("auto").chain(CalculationMode::ALL.iter().map(|m| m.as_str()))
                                                           .collect();
        let mode = read(&mut issues, "mode", &self.mode, to_opt_string);
        let mode = match mode {
            None => Some(None),
            Some(text) => match CalculationMode::parse_optional(&text) {
                Ok(m) => Some(m),
                Err(_) => {
                    issues.0.push(ValidationIssue::malformed("mode",
                                                             format!("unknown mode '{text}'; valid values: {}",
                                                                     mode_names.join(", ")),
                                                             "rapid"));
                    None
                }
            },
        };

        let charge = read(&mut issues, "charge", &self.charge, to_int);
        let charge = charge.and_then(|c| bounded_charge(&mut issues, c));

        let multiplicities = read_list(&mut issues, "multiplicities", &self.multiplicities, to_positive_int_list);
        let multiplicities = multiplicities.and_then(|m| bounded_multiplicities(&mut issues, m));
        let tasks = read_list(&mut issues, "tasks", &self.tasks, to_string_list);
        let name = read(&mut issues, "name", &self.name, to_opt_string);
        let method = read(&mut issues, "method", &self.method, to_opt_string);
        let engine = read(&mut issues, "engine", &self.engine, to_opt_string);
        let solvent = read(&mut issues, "solvent", &self.solvent, to_opt_string);
        let folder_id = read(&mut issues, "folder_id", &self.folder_id, to_opt_string);
        let max_credits = read(&mut issues, "max_credits", &self.max_credits, to_int);
        let max_credits = max_credits.and_then(|c| narrow::<u32>(&mut issues, "max_credits", c));

        if !issues.0.is_empty() {
            debug!("request draft rejected with {} malformed field(s)", issues.0.len());
            return Err(issues.0);
        }
        // Sin problemas registrados, todos los campos obligatorios existen.
        let (Some(workflow_type), Some(molecule), Some(mode), Some(multiplicities), Some(tasks)) =
            (workflow_type, molecule, mode, multiplicities, tasks)
        else {
            return Err(vec![ValidationIssue::malformed("request", "incomplete request", "{\"molecule\": \"CCO\"}")]);
        };

        let mut tasks: IndexSet<String> = tasks.into_iter().map(|t| t.to_ascii_lowercase()).collect();
        if tasks.is_empty() {
            tasks = DEFAULT_TASKS.iter().map(|t| t.to_string()).collect();
        }

        Ok(ChemistryRequest { workflow_type,
                              name: name.unwrap_or_else(|| format!("{} workflow", workflow_type.as_str())),
                              molecule,
                              charge,
                              multiplicities: multiplicities.into_iter().collect(),
                              method: canonical_method(method.as_deref().unwrap_or(DEFAULT_METHOD)),
                              engine: engine.map(|e| e.to_ascii_lowercase())
                                            .unwrap_or_else(|| DEFAULT_ENGINE.to_string()),
                              tasks,
                              solvent,
                              mode,
                              folder_id,
                              max_credits: max_credits.unwrap_or(0) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chem_domain::IssueKind;
    use serde_json::json;

    fn draft(value: serde_json::Value) -> RequestDraft {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let request = draft(json!({"molecule": "CCO"})).normalize().unwrap();
        assert_eq!(request.workflow_type, WorkflowType::BasicCalculation);
        assert_eq!(request.method, "uma_m_omol");
        assert_eq!(request.engine, "omol25");
        assert_eq!(request.tasks.iter().collect::<Vec<_>>(), vec!["optimize"]);
        assert!(request.multiplicities.is_empty());
        assert_eq!(request.charge, None);
        assert_eq!(request.mode, None);
        assert_eq!(request.max_credits, 0);
    }

    #[test]
    fn flexible_fields_are_canonicalized() {
        let request = draft(json!({
                              "workflow_type": "spin-states",
                              "molecule": "[Cl-].[Cl-].[Cl-].[Cl-].[Cu+2]",
                              "charge": "-2",
                              "multiplicities": "2, 4, 4",
                              "method": "GFN2_XTB",
                              "tasks": "[\"Optimize\", \"frequencies\"]",
                              "mode": "Rapid",
                              "max_credits": 10
                          })).normalize()
                             .unwrap();
        assert_eq!(request.workflow_type, WorkflowType::SpinStates);
        assert_eq!(request.charge, Some(-2));
        assert_eq!(request.multiplicities.iter().copied().collect::<Vec<_>>(), vec![2, 4]);
        assert_eq!(request.method, "gfn2-xtb");
        assert!(request.has_task("optimize") && request.has_task("frequencies"));
        assert_eq!(request.mode, Some(CalculationMode::Rapid));
        assert_eq!(request.molecule.notation(), NotationKind::Fragmented);
        assert_eq!(request.max_credits, 10);
    }

    #[test]
    fn smiles_document_is_accepted_as_molecule() {
        let request = draft(json!({"molecule": {"smiles": "O", "charge": 0}})).normalize().unwrap();
        assert_eq!(request.molecule.structure(), "O");
        let request = draft(json!({"molecule": "{\"smiles\": \"CC\"}"})).normalize().unwrap();
        assert_eq!(request.molecule.structure(), "CC");
    }

    #[test]
    fn all_malformed_fields_are_reported_together() {
        let issues = draft(json!({
                             "workflow_type": "quantum_magic",
                             "molecule": "CCO",
                             "multiplicities": "one, three",
                             "mode": "turbo"
                         })).normalize()
                            .unwrap_err();
        let fields: Vec<&str> = issues.iter().filter_map(|i| i.field.as_deref()).collect();
        assert_eq!(fields, vec!["workflow_type", "mode", "multiplicities"]);
        assert!(issues.iter().all(|i| i.kind == IssueKind::MalformedField));
        assert!(issues[0].explanation.contains("spin_states"));
        assert!(issues[1].explanation.contains("meticulous"));
    }

    #[test]
    fn missing_molecule_is_malformed() {
        let issues = draft(json!({"method": "gfn2-xtb"})).normalize().unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field.as_deref(), Some("molecule"));
    }

    #[test]
    fn out_of_range_numbers_are_malformed() {
        let issues = draft(json!({"molecule": "O", "max_credits": -5})).normalize().unwrap_err();
        assert_eq!(issues[0].field.as_deref(), Some("max_credits"));
    }
}
