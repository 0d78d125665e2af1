use chem_adapters::RequestDraft;
use chem_core::{Cadence, JobTracker, WaitOptions, WaitOutcome};
use chem_domain::JobStatus;
use chem_policies::{Accepted, Validator};
use chem_providers::InMemoryComputeService;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn accepted() -> Accepted {
    let draft: RequestDraft = serde_json::from_value(json!({
                                  "name": "ethanol opt",
                                  "molecule": "CCO",
                                  "tasks": "optimize"
                              })).unwrap();
    Validator::new().validate(draft.normalize().unwrap()).into_result().unwrap()
}

fn options(poll: u64, timeout: u64) -> WaitOptions {
    WaitOptions { poll_interval: Duration::from_secs(poll),
                  timeout: Duration::from_secs(timeout),
                  ..Default::default() }
}

#[tokio::test(start_paused = true)]
async fn running_forever_times_out_as_pending_without_touching_job() {
    let service = Arc::new(InMemoryComputeService::new());
    let tracker = JobTracker::new(service.clone());
    let id = tracker.submit(&accepted()).await.unwrap().id;
    service.set_status(&id, JobStatus::Running).unwrap();
    let started = tokio::time::Instant::now();

    let outcome = tracker.wait_for_result(&id, &options(1, 3), &CancellationToken::new()).await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(3));
    match outcome {
        WaitOutcome::Pending { last, polls, .. } => {
            assert!(polls <= 4);
            assert_eq!(last.map(|s| s.status), Some(JobStatus::Running));
        }
        other => panic!("expected pending, got {other:?}"),
    }
    assert!(service.calls("get_status") <= 4);
    assert_eq!(service.calls("stop"), 0);
    assert_eq!(service.peek_status(&id), Some(JobStatus::Running));
}

#[tokio::test(start_paused = true)]
async fn finishes_when_terminal_state_is_observed() {
    let service = Arc::new(InMemoryComputeService::new());
    let tracker = JobTracker::new(service.clone());
    let id = tracker.submit(&accepted()).await.unwrap().id;
    service.set_result(&id, json!({"energy": -154.1})).unwrap();
    service.script(&id, vec![JobStatus::Running, JobStatus::Running, JobStatus::Completed]).unwrap();

    let outcome = tracker.wait_for_result(&id, &options(2, 60), &CancellationToken::new()).await.unwrap();

    match outcome {
        WaitOutcome::Finished { snapshot, result, polls } => {
            assert!(snapshot.is_successful);
            assert_eq!(polls, 3);
            assert_eq!(result["data"]["energy"], json!(-154.1));
        }
        other => panic!("expected finished, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_polling_immediately() {
    let service = Arc::new(InMemoryComputeService::new());
    let tracker = JobTracker::new(service.clone());
    let id = tracker.submit(&accepted()).await.unwrap().id;
    service.set_status(&id, JobStatus::Running).unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(2500)).await;
        trigger.cancel();
    });

    let outcome = tracker.wait_for_result(&id, &options(1, 60), &cancel).await.unwrap();

    assert!(matches!(outcome, WaitOutcome::Cancelled { polls: 2, .. }));
    assert_eq!(service.calls("get_status"), 2);
    assert_eq!(service.calls("stop"), 0);
    assert_eq!(service.peek_status(&id), Some(JobStatus::Running));
}

#[tokio::test(start_paused = true)]
async fn adaptive_cadence_polls_less_often_over_time() {
    let service = Arc::new(InMemoryComputeService::new());
    let tracker = JobTracker::new(service.clone());
    let id = tracker.submit(&accepted()).await.unwrap().id;
    service.set_status(&id, JobStatus::Running).unwrap();

    let adaptive = WaitOptions { cadence: Cadence::Adaptive,
                                 max_interval: Duration::from_secs(8),
                                 ..options(2, 40) };
    tracker.wait_for_result(&id, &adaptive, &CancellationToken::new()).await.unwrap();
    let adaptive_polls = service.calls("get_status");

    tracker.wait_for_result(&id, &options(2, 40), &CancellationToken::new()).await.unwrap();
    let fixed_polls = service.calls("get_status") - adaptive_polls;

    assert_eq!(fixed_polls, 20);
    assert!(adaptive_polls < fixed_polls);
}

#[tokio::test(start_paused = true)]
async fn zero_poll_interval_polls_at_the_minimum_rate() {
    let service = Arc::new(InMemoryComputeService::new());
    let tracker = JobTracker::new(service.clone());
    let id = tracker.submit(&accepted()).await.unwrap().id;
    service.set_status(&id, JobStatus::Running).unwrap();

    let outcome = tracker.wait_for_result(&id, &options(0, 5), &CancellationToken::new()).await.unwrap();

    assert!(matches!(outcome, WaitOutcome::Pending { polls, .. } if polls <= 6));
    assert!(service.calls("get_status") <= 6);
}
