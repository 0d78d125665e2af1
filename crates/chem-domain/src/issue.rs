//! Problemas detectados antes de enviar una solicitud.
//!
//! Son datos, no errores: el validador los acumula y el llamador decide.
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    BadNotation,
    BadParity,
    RiskyTaskCombination,
    MalformedField,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::BadNotation => "bad-notation",
            IssueKind::BadParity => "bad-parity",
            IssueKind::RiskyTaskCombination => "risky-task-combination",
            IssueKind::MalformedField => "malformed-field",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Un problema con explicación y un ejemplo corregido concreto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    /// Campo de la solicitud afectado, si aplica.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub explanation: String,
    pub example: String,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind, explanation: impl Into<String>, example: impl Into<String>) -> Self {
        Self { kind,
               field: None,
               explanation: explanation.into(),
               example: example.into() }
    }

    pub fn malformed(field: &str, explanation: impl Into<String>, example: impl Into<String>) -> Self {
        Self::new(IssueKind::MalformedField, explanation, example).on_field(field)
    }

    pub fn on_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    pub fn is_warning(&self) -> bool {
        self.kind == IssueKind::RiskyTaskCombination
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "[{}] {}: {} (e.g. {})", self.kind, field, self.explanation, self.example),
            None => write!(f, "[{}] {} (e.g. {})", self.kind, self.explanation, self.example),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_kebab_case() {
        let issue = ValidationIssue::malformed("tasks", "not a list", "[\"optimize\"]");
        let v = serde_json::to_value(&issue).unwrap();
        assert_eq!(v["kind"], "malformed-field");
        assert_eq!(v["field"], "tasks");
        assert!(!issue.is_warning());
        assert_eq!(issue.to_string(), "[malformed-field] tasks: not a list (e.g. [\"optimize\"])");
    }
}
