use chem_core::{BatchOutcome, BatchStatusAggregator, HierarchyManager, JobError, JobTracker};
use chem_domain::{FolderPatch, JobStatus, NewFolder, NodeRef, Page, ProjectFilter, WorkflowType};
use chem_providers::{ComputeService, InMemoryComputeService, Submission};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn folder(name: &str, parent: Option<&str>) -> NewFolder {
    NewFolder { name: name.to_string(),
                parent_id: parent.map(str::to_string),
                notes: String::new(),
                starred: false,
                public: false }
}

async fn workflow_in(service: &InMemoryComputeService, parent: Option<&str>) -> String {
    service.submit(&Submission { workflow_type: WorkflowType::Pka,
                                 name: "acetic acid".into(),
                                 folder_id: parent.map(str::to_string),
                                 payload: json!({"initial_molecule": {"smiles": "CC(=O)O"}}) })
           .await
           .unwrap()
}

#[tokio::test]
async fn batch_isolates_unknown_identifiers() {
    let service = Arc::new(InMemoryComputeService::new());
    let a = workflow_in(&service, None).await;
    let c = workflow_in(&service, None).await;
    service.set_status(&c, JobStatus::Completed).unwrap();
    let tracker = JobTracker::new(service.clone());

    let ids = vec![a.clone(), "does-not-exist".to_string(), c.clone()];
    let report = BatchStatusAggregator::new(&tracker, 4).status_of(&ids).await;

    assert_eq!(report.entries.len(), 3);
    assert_eq!(report.entries[0].id, a);
    assert!(matches!(&report.entries[0].outcome, BatchOutcome::Status { snapshot } if snapshot.status == JobStatus::Queued));
    assert_eq!(report.entries[1].outcome, BatchOutcome::NotFound);
    assert!(matches!(&report.entries[2].outcome, BatchOutcome::Status { snapshot } if snapshot.is_successful));
    assert_eq!(report.summary.get("NOT_FOUND"), Some(&1));
    assert_eq!(report.finished(), 1);
}

#[tokio::test]
async fn batch_reports_service_errors_per_item() {
    let service = Arc::new(InMemoryComputeService::new());
    let a = workflow_in(&service, None).await;
    let b = workflow_in(&service, None).await;
    let tracker = JobTracker::new(service.clone());
    service.fail_next(1);

    let report = BatchStatusAggregator::new(&tracker, 1).status_of(&[a, b]).await;

    assert!(matches!(report.entries[0].outcome, BatchOutcome::Error { .. }));
    assert!(matches!(report.entries[1].outcome, BatchOutcome::Status { .. }));
    let json = serde_json::to_value(&report.entries[0]).unwrap();
    assert_eq!(json["outcome"], "error");
}

#[tokio::test]
async fn moving_folder_under_its_descendant_is_a_cycle() {
    let service = Arc::new(InMemoryComputeService::new());
    let manager = HierarchyManager::new(service.clone());
    let top = manager.create_folder(&folder("top", None)).await.unwrap();
    let mid = manager.create_folder(&folder("mid", Some(&top.id))).await.unwrap();
    let leaf = manager.create_folder(&folder("leaf", Some(&mid.id))).await.unwrap();

    let err = manager.move_node(&NodeRef::Folder(top.id.clone()), Some(&leaf.id)).await.unwrap_err();
    assert_eq!(err, JobError::Cycle { node: top.id.clone(), new_parent: leaf.id.clone() });
    assert!(matches!(manager.move_node(&NodeRef::Folder(mid.id.clone()), Some(&mid.id)).await,
                     Err(JobError::Cycle { .. })));

    // el árbol no cambió
    assert_eq!(manager.retrieve_folder(&top.id).await.unwrap().parent_id, None);
    assert_eq!(manager.retrieve_folder(&mid.id).await.unwrap().parent_id, Some(top.id.clone()));
    assert_eq!(service.calls("update_folder"), 0);

    manager.move_node(&NodeRef::Folder(leaf.id.clone()), None).await.unwrap();
    assert_eq!(manager.retrieve_folder(&leaf.id).await.unwrap().parent_id, None);
}

#[tokio::test]
async fn missing_parents_are_rejected() {
    let service = Arc::new(InMemoryComputeService::new());
    let manager = HierarchyManager::new(service.clone());
    let err = manager.create_folder(&folder("orphan", Some("nowhere"))).await.unwrap_err();
    assert_eq!(err, JobError::InvalidParent { id: "nowhere".into() });

    let id = workflow_in(&service, None).await;
    let err = manager.move_node(&NodeRef::Workflow(id), Some("nowhere")).await.unwrap_err();
    assert!(matches!(err, JobError::InvalidParent { .. }));
}

#[tokio::test]
async fn deleting_a_folder_cascades_to_descendants() {
    let service = Arc::new(InMemoryComputeService::new());
    let manager = HierarchyManager::new(service.clone());
    let top = manager.create_folder(&folder("top", None)).await.unwrap();
    let child = manager.create_folder(&folder("child", Some(&top.id))).await.unwrap();
    let keep = manager.create_folder(&folder("keep", None)).await.unwrap();
    workflow_in(&service, Some(&top.id)).await;
    workflow_in(&service, Some(&child.id)).await;
    workflow_in(&service, Some(&child.id)).await;
    let survivor = workflow_in(&service, Some(&keep.id)).await;

    let report = manager.delete(&NodeRef::Folder(top.id.clone())).await.unwrap();

    assert_eq!(report.folders_deleted, 2);
    assert_eq!(report.workflows_deleted, 3);
    assert_eq!(service.folder_count(), 1);
    assert_eq!(service.workflow_count(), 1);
    assert!(service.peek_status(&survivor).is_some());
    assert!(manager.retrieve_folder(&top.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn listing_a_folder_returns_direct_children_only() {
    let service = Arc::new(InMemoryComputeService::new());
    let manager = HierarchyManager::new(service.clone());
    let top = manager.create_folder(&folder("top", None)).await.unwrap();
    let child = manager.create_folder(&folder("child", Some(&top.id))).await.unwrap();
    workflow_in(&service, Some(&top.id)).await;
    workflow_in(&service, Some(&child.id)).await;

    let listing = manager.list(&top.id, Default::default()).await.unwrap();
    assert_eq!(listing.folders.items.len(), 1);
    assert_eq!(listing.workflows.items.len(), 1);
}

#[tokio::test]
async fn deleting_inside_a_remote_parent_loop_is_a_cycle() {
    let service = Arc::new(InMemoryComputeService::new());
    let manager = HierarchyManager::new(service.clone());
    let a = manager.create_folder(&folder("a", None)).await.unwrap();
    let b = manager.create_folder(&folder("b", Some(&a.id))).await.unwrap();
    // El remoto acepta cerrar el lazo a -> b -> a sin pasar por el gestor.
    service.update_folder(&a.id,
                          &FolderPatch { parent_id: Some(Some(b.id.clone())),
                                         ..Default::default() })
           .await
           .unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(5), manager.delete(&NodeRef::Folder(a.id.clone()))).await;

    let err = outcome.expect("walk terminates").unwrap_err();
    assert!(matches!(err, JobError::Cycle { .. }), "{err:?}");
    assert_eq!(service.folder_count(), 2);
}

#[tokio::test]
async fn cascade_walks_past_the_first_listing_page() {
    let service = Arc::new(InMemoryComputeService::new());
    let manager = HierarchyManager::new(service.clone());
    let bulk = manager.create_folder(&folder("bulk", None)).await.unwrap();
    for _ in 0..230 {
        workflow_in(&service, Some(&bulk.id)).await;
    }

    let report = manager.delete(&NodeRef::Folder(bulk.id)).await.unwrap();

    assert_eq!(report.workflows_deleted, 230);
    assert_eq!(service.workflow_count(), 0);
}

#[tokio::test]
async fn projects_can_be_renamed_but_the_default_one_stays() {
    let service = Arc::new(InMemoryComputeService::new());
    let hierarchy = HierarchyManager::new(service.clone());

    let default = hierarchy.default_project().await.unwrap();
    let screening = hierarchy.create_project("Screening").await.unwrap();
    let renamed = hierarchy.rename_project(&screening.id, "Spin screening").await.unwrap();
    assert_eq!(renamed.name, "Spin screening");

    let all = hierarchy.list_projects(&ProjectFilter::default(), Page::default()).await.unwrap();
    assert_eq!(all.items.len(), 2);

    assert!(matches!(hierarchy.delete_project(&default.id).await, Err(JobError::Service(_))));
    hierarchy.delete_project(&screening.id).await.unwrap();
    assert!(hierarchy.retrieve_project(&screening.id).await.unwrap_err().is_not_found());
}
