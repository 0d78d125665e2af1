//! Validador de sanidad química.
//!
//! Etapas en orden: campos, notación, paridad, riesgos. La primera etapa con
//! problemas corta la validación, pero dentro de una etapa se acumulan todos.
//! Los riesgos nunca rechazan.
use chem_domain::structure::Structure;
use chem_domain::{element_class, CalculationMode, ChemistryRequest, ElementClass, IssueKind, NotationKind,
                  ValidationIssue, WorkflowType};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::notation::{Notation, NotationClassifier, RuleBasedClassifier};
use crate::parity::{check_multiplicities, class_parity, required_parity};
use crate::risk::{default_rules, RiskRule};

/// Multiplicidades asignadas por el validador cuando el llamador no dio
/// ninguna. Siempre se informa en la respuesta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultAssignment {
    pub multiplicities: Vec<u32>,
    pub auto_assigned: bool,
    pub element_class: ElementClass,
    pub electron_count: i64,
    pub note: String,
}

/// Solicitud aceptada. Sólo el validador la construye, así que una solicitud
/// rechazada no puede llegar al servicio de cómputo.
#[derive(Debug, Clone)]
pub struct Accepted {
    request: ChemistryRequest,
    warnings: Vec<ValidationIssue>,
    defaults: Option<DefaultAssignment>,
    notation: Notation,
    effective_charge: i32,
    electron_count: i64,
    fingerprint: String,
}

impl Accepted {
    pub fn request(&self) -> &ChemistryRequest {
        &self.request
    }

    pub fn warnings(&self) -> &[ValidationIssue] {
        &self.warnings
    }

    pub fn defaults(&self) -> Option<&DefaultAssignment> {
        self.defaults.as_ref()
    }

    pub fn notation(&self) -> Notation {
        self.notation
    }

    pub fn effective_charge(&self) -> i32 {
        self.effective_charge
    }

    pub fn electron_count(&self) -> i64 {
        self.electron_count
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Documento de envío al servicio remoto.
    pub fn payload(&self) -> Value {
        self.request.to_payload(self.effective_charge)
    }

    /// Resumen para el llamador (incluye advertencias y valores por defecto).
    pub fn summary(&self) -> Value {
        json!({
            "accepted": true,
            "workflow_type": self.request.workflow_type,
            "molecule": self.request.molecule.structure(),
            "notation": self.notation,
            "charge": self.effective_charge,
            "electron_count": self.electron_count,
            "multiplicities": self.request.multiplicities,
            "method": self.request.method,
            "engine": self.request.engine,
            "tasks": self.request.tasks,
            "mode": self.request.mode,
            "convergence": self.request.mode.map(CalculationMode::thresholds),
            "warnings": self.warnings,
            "defaults": self.defaults,
            "fingerprint": self.fingerprint,
        })
    }
}

#[derive(Debug, Clone)]
pub enum Verdict {
    Accepted(Accepted),
    Rejected(Vec<ValidationIssue>),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted(_))
    }

    /// Problemas del rechazo (vacío si fue aceptada).
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            Verdict::Accepted(_) => &[],
            Verdict::Rejected(issues) => issues,
        }
    }

    pub fn into_result(self) -> Result<Accepted, Vec<ValidationIssue>> {
        match self {
            Verdict::Accepted(a) => Ok(a),
            Verdict::Rejected(issues) => Err(issues),
        }
    }
}

pub struct Validator {
    classifier: Box<dyn NotationClassifier>,
    risk_rules: Vec<Box<dyn RiskRule>>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

fn reject(request: &ChemistryRequest, stage: &str, issues: Vec<ValidationIssue>) -> Verdict {
    info!("request '{}' rejected at {stage} stage: {}",
          request.name,
          issues.iter().map(|i| i.kind.as_str()).collect::<Vec<_>>().join(", "));
    Verdict::Rejected(issues)
}

impl Validator {
    pub fn new() -> Self {
        Self { classifier: Box::new(RuleBasedClassifier),
               risk_rules: default_rules() }
    }

    pub fn with_classifier(mut self, classifier: Box<dyn NotationClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_risk_rule(mut self, rule: Box<dyn RiskRule>) -> Self {
        self.risk_rules.push(rule);
        self
    }

    pub fn validate(&self, mut request: ChemistryRequest) -> Verdict {
        let issues = field_issues(&request);
        if !issues.is_empty() {
            return reject(&request, "field", issues);
        }

        let (notation, structure) = match self.check_notation(&request) {
            Ok(found) => found,
            Err(issues) => return reject(&request, "notation", issues),
        };

        let effective_charge = request.charge.unwrap_or_else(|| structure.formal_charge());
        let electrons = structure.electron_count(effective_charge);
        let mut defaults = None;
        if request.multiplicities.is_empty() && electrons >= 0 {
            let assignment = default_multiplicities(&request, &structure, electrons);
            request.multiplicities = assignment.multiplicities.iter().copied().collect();
            defaults = Some(assignment);
        } else {
            let declared: Vec<u32> = request.multiplicities.iter().copied().collect();
            let issues = check_multiplicities(electrons, &declared);
            if !issues.is_empty() {
                return reject(&request, "parity", issues);
            }
        }

        let warnings: Vec<ValidationIssue> =
            self.risk_rules.iter().filter_map(|rule| rule.assess(&request, &structure)).collect();

        let fingerprint = request.fingerprint(effective_charge);
        debug!("request '{}' accepted ({} electrons, {} warning(s), classifier {})",
               request.name,
               electrons,
               warnings.len(),
               self.classifier.id());
        Verdict::Accepted(Accepted { request,
                                     warnings,
                                     defaults,
                                     notation,
                                     effective_charge,
                                     electron_count: electrons,
                                     fingerprint })
    }

    fn check_notation(&self, request: &ChemistryRequest) -> Result<(Notation, Structure), Vec<ValidationIssue>> {
        let report = self.classifier.classify(request.molecule.structure(), request.charge);
        let mut issues = Vec::new();
        match report.notation {
            Notation::Ambiguous => {
                issues.push(ValidationIssue::new(IssueKind::BadNotation,
                                                 report.reason
                                                       .clone()
                                                       .unwrap_or_else(|| "structural string is ambiguous".into()),
                                                 report.suggestion.clone().unwrap_or_else(|| "CCO".into()))
                            .on_field("molecule"));
            }
            Notation::Fragmented if request.molecule.notation() == NotationKind::Covalent => {
                issues.push(ValidationIssue::new(IssueKind::BadNotation,
                                                 "notation declared covalent but the string contains separate fragments",
                                                 "notation: fragmented").on_field("notation"));
            }
            _ => {}
        }
        if !issues.is_empty() {
            return Err(issues);
        }
        request.molecule.parse().map(|s| (report.notation, s)).map_err(|e| {
                                                                  vec![ValidationIssue::new(IssueKind::BadNotation,
                                                                                            e.to_string(),
                                                                                            "CCO").on_field("molecule")]
                                                              })
    }
}

/// Problemas de combinación de campos que no dependen de la química.
fn field_issues(request: &ChemistryRequest) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if request.workflow_type == WorkflowType::Irc && request.mode == Some(CalculationMode::Reckless) {
        issues.push(ValidationIssue::malformed("mode",
                                               "mode 'reckless' is not supported for irc workflows",
                                               "mode: careful"));
    }
    if !request.workflow_type.is_multi_state() && request.multiplicities.len() > 1 {
        let first = request.multiplicities.first().copied().unwrap_or(1);
        issues.push(ValidationIssue::malformed("multiplicities",
                                               format!("{} runs a single spin state; use spin_states to compare several",
                                                       request.workflow_type),
                                               format!("multiplicities: [{first}]")));
    }
    issues
}

/// Clase química dominante: un metal de electrones impares manda sobre uno
/// par, y cualquier metal sobre el grupo principal.
fn dominant_class(structure: &Structure) -> ElementClass {
    let classes: Vec<ElementClass> =
        structure.metal_centers().iter().map(|&i| element_class(structure.atoms[i].atomic_number)).collect();
    if classes.contains(&ElementClass::OddElectronMetal) {
        ElementClass::OddElectronMetal
    } else if classes.contains(&ElementClass::EvenElectronMetal) {
        ElementClass::EvenElectronMetal
    } else {
        ElementClass::MainGroup
    }
}

fn default_multiplicities(request: &ChemistryRequest, structure: &Structure, electrons: i64) -> DefaultAssignment {
    let class = dominant_class(structure);
    let required = required_parity(electrons);
    let count = if request.workflow_type.is_multi_state() { 3 } else { 1 };
    let multiplicities = required.lowest(count);
    let mut note = format!("no multiplicities given; auto-assigned the {} lowest {} values for {electrons} electrons",
                           count,
                           required.as_str());
    if class_parity(class) != required {
        note.push_str(" (the net charge overrides the element-class default)");
    }
    DefaultAssignment { multiplicities,
                        auto_assigned: true,
                        element_class: class,
                        electron_count: electrons,
                        note }
}
