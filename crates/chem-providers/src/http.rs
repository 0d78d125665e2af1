//! Cliente HTTP del servicio de cómputo.
//!
//! Traduce las operaciones de [`ComputeService`] a la API REST remota y
//! clasifica las respuestas en [`ServiceError`]. No reintenta: para eso se
//! envuelve en [`crate::retry::RetryingService`].
use async_trait::async_trait;
use chem_domain::{Folder, FolderFilter, FolderPatch, JobStatus, NewFolder, Page, PageOf, Project, ProjectFilter,
                  Workflow, WorkflowFilter, WorkflowPatch, WorkflowType};
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;

use crate::error::ServiceError;
use crate::service::{ComputeService, Submission};

const API_KEY_HEADER: &str = "X-API-KEY";

pub struct HttpComputeService {
    client: Client,
    base: Url,
    api_key: String,
}

/// Traduce un código HTTP a error; `None` si la respuesta es exitosa.
pub fn classify_status(status: u16, body: &str, id: &str) -> Option<ServiceError> {
    match status {
        200..=299 => None,
        404 => Some(ServiceError::NotFound { id: id.to_string() }),
        408 | 429 | 500..=599 => Some(ServiceError::Transient(format!("HTTP {status}: {}", remote_message(body)))),
        code => Some(ServiceError::Rejected { code,
                                              message: remote_message(body) }),
    }
}

/// Mensaje legible del cuerpo de error remoto (`detail`, `message` o el cuerpo).
fn remote_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let field = parsed.as_ref().and_then(|v| {
                                   ["detail", "message", "error"].iter().find_map(|k| match v.get(*k) {
                                                                          Some(Value::String(s)) => Some(s.clone()),
                                                                          Some(Value::Null) | None => None,
                                                                          Some(other) => Some(other.to_string()),
                                                                      })
                               });
    match field {
        Some(message) => message,
        None if body.trim().is_empty() => "empty response body".to_string(),
        None => body.trim().to_string(),
    }
}

fn transport_error(err: reqwest::Error) -> ServiceError {
    if err.is_decode() {
        ServiceError::Decode(err.to_string())
    } else {
        ServiceError::Transient(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct RemoteWorkflow {
    uuid: String,
    object_type: String,
    #[serde(default)]
    object_status: Option<i64>,
    #[serde(default)]
    parent_uuid: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    starred: bool,
    #[serde(default)]
    public: bool,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    object_data: Value,
    #[serde(default)]
    credits_charged: Option<f64>,
}

impl TryFrom<RemoteWorkflow> for Workflow {
    type Error = ServiceError;

    fn try_from(remote: RemoteWorkflow) -> Result<Self, Self::Error> {
        let decode = |e: chem_domain::DomainError| ServiceError::Decode(e.to_string());
        let workflow_type: WorkflowType = remote.object_type.parse().map_err(decode)?;
        let status = JobStatus::from_code(remote.object_status.unwrap_or(0)).map_err(decode)?;
        Ok(Workflow { id: remote.uuid,
                      workflow_type,
                      status,
                      parent_id: remote.parent_uuid,
                      name: remote.name.unwrap_or_default(),
                      notes: remote.notes.unwrap_or_default(),
                      starred: remote.starred,
                      public: remote.public,
                      created_at: remote.created_at.unwrap_or_else(Utc::now),
                      completed_at: remote.completed_at,
                      parameters: remote.object_data,
                      credits_charged: remote.credits_charged })
    }
}

#[derive(Debug, Deserialize)]
struct RemoteFolder {
    uuid: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    parent_uuid: Option<String>,
    #[serde(default)]
    public: bool,
    #[serde(default)]
    starred: bool,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl From<RemoteFolder> for Folder {
    fn from(remote: RemoteFolder) -> Self {
        Folder { id: remote.uuid,
                 name: remote.name.unwrap_or_default(),
                 parent_id: remote.parent_uuid,
                 public: remote.public,
                 starred: remote.starred,
                 notes: remote.notes.unwrap_or_default(),
                 created_at: remote.created_at.unwrap_or_else(Utc::now) }
    }
}

#[derive(Debug, Deserialize)]
struct RemoteProject {
    uuid: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl From<RemoteProject> for Project {
    fn from(remote: RemoteProject) -> Self {
        Project { id: remote.uuid,
                  name: remote.name.unwrap_or_default(),
                  created_at: remote.created_at }
    }
}

/// Listados paginados: `{"items": [...]}` (o la clave del recurso:
/// `workflows`, `folders`, `projects`) o directamente un arreglo.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Wrapped {
        #[serde(alias = "workflows", alias = "folders", alias = "projects")]
        items: Vec<T>,
        #[serde(default)]
        num_pages: Option<u32>,
    },
    Bare(Vec<T>),
}

impl<T> Listing<T> {
    fn into_page<U>(self, page: Page, convert: impl Fn(T) -> Result<U, ServiceError>) -> Result<PageOf<U>, ServiceError> {
        let (items, num_pages) = match self {
            Listing::Wrapped { items, num_pages } => (items, num_pages),
            Listing::Bare(items) => (items, None),
        };
        let has_more = match num_pages {
            Some(n) => page.page + 1 < n,
            None => items.len() as u32 >= page.size,
        };
        let items = items.into_iter().map(convert).collect::<Result<Vec<_>, _>>()?;
        Ok(PageOf { items,
                    page: page.page,
                    size: page.size,
                    has_more })
    }
}

fn patch_body(name: &Option<String>,
              notes: &Option<String>,
              starred: Option<bool>,
              public: Option<bool>,
              parent_id: &Option<Option<String>>)
              -> Value {
    let mut body = Map::new();
    if let Some(name) = name {
        body.insert("name".into(), json!(name));
    }
    if let Some(notes) = notes {
        body.insert("notes".into(), json!(notes));
    }
    if let Some(starred) = starred {
        body.insert("starred".into(), json!(starred));
    }
    if let Some(public) = public {
        body.insert("public".into(), json!(public));
    }
    if let Some(parent) = parent_id {
        body.insert("parent_uuid".into(), json!(parent));
    }
    Value::Object(body)
}

fn page_query(page: Page) -> Vec<(&'static str, String)> {
    vec![("page", page.page.to_string()), ("size", page.size.to_string())]
}

impl HttpComputeService {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let base = Url::parse(base_url).map_err(|e| ServiceError::Endpoint(format!("'{base_url}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ServiceError::Endpoint(format!("'{base_url}' cannot carry a path")));
        }
        let client = Client::builder().timeout(timeout)
                                      .build()
                                      .map_err(|e| ServiceError::Transient(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client,
                  base,
                  api_key: api_key.to_string() })
    }

    /// URL de un recurso; cada segmento se codifica aparte, así un id con
    /// `/` o `?` no cambia de ruta.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.client.request(method, self.endpoint(segments)).header(API_KEY_HEADER, &self.api_key)
    }

    /// Envía y devuelve el cuerpo crudo de una respuesta exitosa.
    async fn send(&self, builder: RequestBuilder, id: &str) -> Result<String, ServiceError> {
        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        debug!("compute service answered {status} for {id}");
        match classify_status(status.as_u16(), &body, id) {
            Some(err) => Err(err),
            None => Ok(body),
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder, id: &str) -> Result<T, ServiceError> {
        let body = self.send(builder, id).await?;
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body).map_err(|e| ServiceError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ComputeService for HttpComputeService {
    fn name(&self) -> &str {
        "http"
    }

    async fn submit(&self, submission: &Submission) -> Result<String, ServiceError> {
        let created: Value = self.send_json(self.request(Method::POST, &["workflow"]).json(&submission.payload),
                                            &submission.name)
                                 .await?;
        created.get("uuid")
               .and_then(Value::as_str)
               .map(str::to_string)
               .ok_or_else(|| ServiceError::Decode(format!("workflow creation returned no uuid: {created}")))
    }

    async fn get_status(&self, id: &str) -> Result<i64, ServiceError> {
        let workflow: Value = self.send_json(self.request(Method::GET, &["workflow", id]), id).await?;
        workflow.get("object_status")
                .and_then(Value::as_i64)
                .ok_or_else(|| ServiceError::Decode(format!("workflow {id} has no object_status")))
    }

    async fn get_result(&self, id: &str) -> Result<Value, ServiceError> {
        let workflow: Value = self.send_json(self.request(Method::GET, &["workflow", id]), id).await?;
        Ok(json!({
            "uuid": id,
            "status": workflow.get("object_status").cloned().unwrap_or(Value::Null),
            "data": workflow.get("object_data").cloned().unwrap_or(Value::Null),
        }))
    }

    async fn retrieve_workflow(&self, id: &str) -> Result<Workflow, ServiceError> {
        let remote: RemoteWorkflow = self.send_json(self.request(Method::GET, &["workflow", id]), id).await?;
        remote.try_into()
    }

    async fn update_workflow(&self, id: &str, patch: &WorkflowPatch) -> Result<Workflow, ServiceError> {
        let body = patch_body(&patch.name, &patch.notes, patch.starred, patch.public, &patch.parent_id);
        let remote: RemoteWorkflow =
            self.send_json(self.request(Method::PATCH, &["workflow", id]).json(&body), id).await?;
        remote.try_into()
    }

    async fn stop(&self, id: &str) -> Result<(), ServiceError> {
        self.send(self.request(Method::POST, &["workflow", id, "stop"]), id).await.map(|_| ())
    }

    async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        self.send(self.request(Method::DELETE, &["workflow", id]), id).await.map(|_| ())
    }

    async fn delete_data(&self, id: &str) -> Result<(), ServiceError> {
        self.send(self.request(Method::POST, &["workflow", id, "delete_workflow_data"]), id).await.map(|_| ())
    }

    async fn calculation_molecules(&self, calculation_id: &str) -> Result<Vec<Value>, ServiceError> {
        let builder = self.request(Method::GET, &["calculation", calculation_id, "molecules"]);
        let listing: Listing<Value> = self.send_json(builder, calculation_id).await?;
        Ok(match listing {
            Listing::Wrapped { items, .. } | Listing::Bare(items) => items,
        })
    }

    async fn list_workflows(&self, filter: &WorkflowFilter, page: Page) -> Result<PageOf<Workflow>, ServiceError> {
        let mut query = page_query(page);
        if let Some(parent) = &filter.parent_id {
            query.push(("parent_uuid", parent.clone()));
        }
        if let Some(name) = &filter.name_contains {
            query.push(("name_contains", name.clone()));
        }
        if let Some(public) = filter.public {
            query.push(("public", public.to_string()));
        }
        if let Some(starred) = filter.starred {
            query.push(("starred", starred.to_string()));
        }
        if let Some(status) = filter.status {
            query.push(("object_status", status.code().to_string()));
        }
        if let Some(kind) = filter.workflow_type {
            query.push(("object_type", kind.as_str().to_string()));
        }
        let listing: Listing<RemoteWorkflow> =
            self.send_json(self.request(Method::GET, &["workflow"]).query(&query), "workflow list").await?;
        listing.into_page(page, Workflow::try_from)
    }

    async fn create_folder(&self, folder: &NewFolder) -> Result<Folder, ServiceError> {
        let body = json!({
            "name": folder.name,
            "parent_uuid": folder.parent_id,
            "notes": folder.notes,
            "starred": folder.starred,
            "public": folder.public,
        });
        let remote: RemoteFolder = self.send_json(self.request(Method::POST, &["folder"]).json(&body), &folder.name).await?;
        Ok(remote.into())
    }

    async fn retrieve_folder(&self, id: &str) -> Result<Folder, ServiceError> {
        let remote: RemoteFolder = self.send_json(self.request(Method::GET, &["folder", id]), id).await?;
        Ok(remote.into())
    }

    async fn update_folder(&self, id: &str, patch: &FolderPatch) -> Result<Folder, ServiceError> {
        let body = patch_body(&patch.name, &patch.notes, patch.starred, patch.public, &patch.parent_id);
        let remote: RemoteFolder =
            self.send_json(self.request(Method::PATCH, &["folder", id]).json(&body), id).await?;
        Ok(remote.into())
    }

    async fn delete_folder(&self, id: &str) -> Result<(), ServiceError> {
        self.send(self.request(Method::DELETE, &["folder", id]), id).await.map(|_| ())
    }

    async fn list_folders(&self, filter: &FolderFilter, page: Page) -> Result<PageOf<Folder>, ServiceError> {
        let mut query = page_query(page);
        if let Some(parent) = &filter.parent_id {
            query.push(("parent_uuid", parent.clone()));
        }
        if let Some(name) = &filter.name_contains {
            query.push(("name_contains", name.clone()));
        }
        if let Some(public) = filter.public {
            query.push(("public", public.to_string()));
        }
        if let Some(starred) = filter.starred {
            query.push(("starred", starred.to_string()));
        }
        let listing: Listing<RemoteFolder> =
            self.send_json(self.request(Method::GET, &["folder"]).query(&query), "folder list").await?;
        listing.into_page(page, |f| Ok(Folder::from(f)))
    }

    async fn create_project(&self, name: &str) -> Result<Project, ServiceError> {
        let body = json!({ "name": name });
        let remote: RemoteProject = self.send_json(self.request(Method::POST, &["project"]).json(&body), name).await?;
        Ok(remote.into())
    }

    async fn retrieve_project(&self, id: &str) -> Result<Project, ServiceError> {
        let remote: RemoteProject = self.send_json(self.request(Method::GET, &["project", id]), id).await?;
        Ok(remote.into())
    }

    async fn update_project(&self, id: &str, name: &str) -> Result<Project, ServiceError> {
        let body = json!({ "name": name });
        let remote: RemoteProject =
            self.send_json(self.request(Method::PATCH, &["project", id]).json(&body), id).await?;
        Ok(remote.into())
    }

    async fn delete_project(&self, id: &str) -> Result<(), ServiceError> {
        self.send(self.request(Method::DELETE, &["project", id]), id).await.map(|_| ())
    }

    async fn list_projects(&self, filter: &ProjectFilter, page: Page) -> Result<PageOf<Project>, ServiceError> {
        let mut query = page_query(page);
        if let Some(name) = &filter.name_contains {
            query.push(("name_contains", name.clone()));
        }
        let listing: Listing<RemoteProject> =
            self.send_json(self.request(Method::GET, &["project"]).query(&query), "project list").await?;
        listing.into_page(page, |p| Ok(Project::from(p)))
    }

    async fn default_project(&self) -> Result<Project, ServiceError> {
        let remote: RemoteProject =
            self.send_json(self.request(Method::GET, &["project", "default"]), "default project").await?;
        Ok(remote.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_codes_are_not_errors() {
        assert_eq!(classify_status(200, "{}", "w1"), None);
        assert_eq!(classify_status(204, "", "w1"), None);
    }

    #[test]
    fn missing_resources_map_to_not_found() {
        assert_eq!(classify_status(404, "{\"detail\":\"nope\"}", "w1"),
                   Some(ServiceError::NotFound { id: "w1".into() }));
    }

    #[test]
    fn throttling_and_server_errors_are_transient() {
        for code in [408, 429, 500, 502, 503] {
            let err = classify_status(code, "", "w1").unwrap();
            assert!(err.is_retryable(), "{code} should be retryable");
        }
    }

    #[test]
    fn client_errors_keep_remote_message() {
        let err = classify_status(401, "{\"detail\": \"Invalid API key\"}", "w1").unwrap();
        assert_eq!(err, ServiceError::Rejected { code: 401, message: "Invalid API key".into() });
        let err = classify_status(422, "method not supported", "w1").unwrap();
        assert_eq!(err, ServiceError::Rejected { code: 422, message: "method not supported".into() });
        assert!(!err.is_retryable());
    }

    #[test]
    fn remote_workflow_converts_to_domain_record() {
        let remote: RemoteWorkflow = serde_json::from_value(json!({
                                         "uuid": "abc",
                                         "object_type": "spin_states",
                                         "object_status": 2,
                                         "parent_uuid": "f1",
                                         "name": "Mn screen",
                                         "object_data": {"energies": [1.0]}
                                     })).unwrap();
        let workflow = Workflow::try_from(remote).unwrap();
        assert_eq!(workflow.workflow_type, WorkflowType::SpinStates);
        assert_eq!(workflow.status, JobStatus::Completed);
        assert_eq!(workflow.parent_id.as_deref(), Some("f1"));
    }

    #[test]
    fn listing_accepts_wrapped_or_bare_arrays() {
        let wrapped: Listing<RemoteFolder> =
            serde_json::from_value(json!({"items": [{"uuid": "f1", "name": "a"}], "num_pages": 3})).unwrap();
        let page = wrapped.into_page(Page { page: 0, size: 10 }, |f| Ok(Folder::from(f))).unwrap();
        assert!(page.has_more);
        assert_eq!(page.items[0].id, "f1");

        let bare: Listing<RemoteFolder> = serde_json::from_value(json!([{"uuid": "f2"}])).unwrap();
        let page = bare.into_page(Page { page: 0, size: 10 }, |f| Ok(Folder::from(f))).unwrap();
        assert!(!page.has_more);
    }

    fn service(base: &str) -> HttpComputeService {
        HttpComputeService::new(base, "key", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn ids_are_encoded_as_single_path_segments() {
        let service = service("https://api.example.org/api/v2/");
        let url = service.endpoint(&["workflow", "a/b?c", "stop"]);
        assert_eq!(url.as_str(), "https://api.example.org/api/v2/workflow/a%2Fb%3Fc/stop");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn base_without_trailing_slash_keeps_its_path() {
        let url = service("https://api.example.org/api/v2").endpoint(&["project", "default"]);
        assert_eq!(url.as_str(), "https://api.example.org/api/v2/project/default");
    }

    #[test]
    fn unusable_base_urls_are_rejected() {
        for base in ["not a url", "mailto:chem@example.org"] {
            let err = HttpComputeService::new(base, "key", Duration::from_secs(5)).err();
            assert!(matches!(err, Some(ServiceError::Endpoint(_))), "{base}");
        }
    }

    #[test]
    fn listing_accepts_resource_named_keys() {
        let listing: Listing<RemoteProject> =
            serde_json::from_value(json!({"projects": [{"uuid": "p1", "name": "Default project"}]})).unwrap();
        let page = listing.into_page(Page { page: 0, size: 10 }, |p| Ok(Project::from(p))).unwrap();
        assert_eq!(page.items[0].name, "Default project");
    }

    #[test]
    fn patch_body_only_carries_present_fields() {
        let body = patch_body(&Some("renamed".into()), &None, Some(true), None, &Some(None));
        assert_eq!(body, json!({"name": "renamed", "starred": true, "parent_uuid": null}));
    }
}
