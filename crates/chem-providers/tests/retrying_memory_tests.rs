use chem_domain::{JobStatus, WorkflowType};
use chem_providers::{ComputeService, InMemoryComputeService, RetryPolicy, RetryingService, ServiceError, Submission};
use serde_json::json;
use std::time::Duration;

fn submission() -> Submission {
    Submission { workflow_type: WorkflowType::SpinStates,
                 name: "Mn(II) spin ladder".into(),
                 folder_id: None,
                 payload: json!({"initial_molecule": {"smiles": "[Mn+2].[Cl-].[Cl-]"}}) }
}

fn retrying() -> RetryingService<InMemoryComputeService> {
    RetryingService::new(InMemoryComputeService::new(), RetryPolicy::default())
}

#[tokio::test(start_paused = true)]
async fn two_transient_failures_then_success_creates_one_job() {
    let service = retrying();
    service.inner().fail_next(2);
    let started = tokio::time::Instant::now();

    let id = service.submit(&submission()).await.expect("third attempt succeeds");

    assert_eq!(service.inner().calls("submit"), 3);
    assert_eq!(service.inner().workflow_count(), 1);
    assert_eq!(started.elapsed(), Duration::from_secs(3));
    assert_eq!(service.inner().peek_status(&id), Some(JobStatus::Queued));
}

#[tokio::test(start_paused = true)]
async fn exhausted_budget_reports_attempts_and_cause() {
    let service = retrying();
    service.inner().fail_next(10);

    let err = service.submit(&submission()).await.unwrap_err();

    match err {
        ServiceError::RetriesExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(last.contains("503"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(service.inner().workflow_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn authentication_rejection_surfaces_on_first_attempt() {
    let service = retrying();
    service.inner().reject_next(401, "Invalid API key");

    let err = service.submit(&submission()).await.unwrap_err();

    assert_eq!(err, ServiceError::Rejected { code: 401, message: "Invalid API key".into() });
    assert_eq!(service.inner().calls("submit"), 1);
}

#[tokio::test]
async fn stopping_a_finished_job_is_a_no_op() {
    let service = InMemoryComputeService::new();
    let id = service.submit(&submission()).await.unwrap();
    service.set_status(&id, JobStatus::Completed).unwrap();

    service.stop(&id).await.unwrap();

    assert_eq!(service.get_status(&id).await.unwrap(), JobStatus::Completed.code());
}

#[tokio::test]
async fn unknown_identifiers_are_not_found() {
    let service = retrying();
    assert!(service.get_status("nope").await.unwrap_err().is_not_found());
    assert_eq!(service.inner().calls("get_status"), 1);
}
