use chem_core::JobError;
use chem_domain::{IssueKind, ValidationIssue};
use chem_providers::ServiceError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Clase de error visible para quien invoca una herramienta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    MalformedFieldError,
    TransientServiceError,
    RemoteRejectionError,
    NotFoundError,
    CycleError,
    UnknownTool,
    InternalError,
}

/// Respuesta de error estructurada; nunca se lanza, siempre se devuelve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    pub error: ErrorKind,
    pub explanation: String,
    pub suggested_fix: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<ValidationIssue>,
}

impl ToolError {
    pub fn new(error: ErrorKind, explanation: impl Into<String>, suggested_fix: impl Into<String>) -> Self {
        Self { error,
               explanation: explanation.into(),
               suggested_fix: suggested_fix.into(),
               issues: Vec::new() }
    }

    /// Rechazo del normalizador o del validador. Si todos los problemas son
    /// de formato de campo, se informa como `malformed_field_error`.
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        let error = if issues.iter().all(|i| i.kind == IssueKind::MalformedField) {
            ErrorKind::MalformedFieldError
        } else {
            ErrorKind::ValidationError
        };
        let explanation = issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
        let mut fixes: Vec<&str> = Vec::new();
        for issue in &issues {
            if !fixes.contains(&issue.example.as_str()) {
                fixes.push(&issue.example);
            }
        }
        let suggested_fix = fixes.join("; ");
        Self { error,
               explanation,
               suggested_fix,
               issues }
    }

    pub fn malformed_arguments(tool: &str, err: &serde_json::Error) -> Self {
        Self::new(ErrorKind::MalformedFieldError,
                  format!("invalid arguments for {tool}: {err}"),
                  format!("call list_tools to see the parameters {tool} accepts"))
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::new(ErrorKind::UnknownTool,
                  format!("no tool named '{name}'"),
                  "call list_tools to see the available tool names")
    }

    pub fn internal(explanation: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, explanation, "report this failure; the request itself may be fine")
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.error, self.explanation)
    }
}

impl From<ServiceError> for ToolError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Transient(_) | ServiceError::RetriesExhausted { .. } => {
                ToolError::new(ErrorKind::TransientServiceError,
                               err.to_string(),
                               "the compute service is temporarily unavailable; retry later")
            }
            ServiceError::Rejected { code, ref message } => {
                let fix = match code {
                    401 | 403 => "check that CHEM_API_KEY holds a valid key",
                    402 => "raise max_credits or add credits to the account",
                    _ => "correct the request according to the service message",
                };
                ToolError::new(ErrorKind::RemoteRejectionError,
                               format!("compute service rejected the request ({code}): {message}"),
                               fix)
            }
            ServiceError::NotFound { id } => JobError::NotFound { id }.into(),
            ServiceError::Decode(_) | ServiceError::Endpoint(_) => ToolError::internal(err.to_string()),
        }
    }
}

impl From<JobError> for ToolError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Service(inner) => inner.into(),
            JobError::NotFound { id } => {
                ToolError::new(ErrorKind::NotFoundError,
                               format!("nothing with id {id}"),
                               "look up the identifier with list_workflows, list_folders or list_projects")
            }
            JobError::Cycle { ref node, ref new_parent } => {
                ToolError::new(ErrorKind::CycleError,
                               format!("cannot move {node} under {new_parent}: {new_parent} is inside {node}"),
                               "choose a destination outside the folder's own subtree, or parent_id: null for the root")
            }
            JobError::InvalidParent { id } => {
                ToolError::new(ErrorKind::NotFoundError,
                               format!("parent folder {id} does not exist"),
                               "create the folder first with create_folder, or pass parent_id: null for the root")
            }
        }
    }
}
