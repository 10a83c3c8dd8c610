use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::common::{
    candidate, harness, investigation, utc, FailingTargets, ScriptedSearch, StalledSearch,
};
use crate::monitoring::investigations::memory::{
    InMemoryInvestigationRepository, InMemoryListingRepository,
};
use crate::monitoring::investigations::repository::InvestigationRepository;
use crate::monitoring::investigations::runner::InvestigationRunner;
use crate::monitoring::investigations::scheduler::{
    InvestigationScheduler, JobCallback, JobTrigger, RunDisposition, TokioJobTrigger,
};
use crate::monitoring::investigations::{InvestigationId, InvestigationStatus, ScheduleKind};

#[tokio::test]
async fn register_persists_the_computed_anchor() {
    let harness = harness();
    let anchor = utc(2030, 6, 1, 9, 0);
    let registered = harness
        .scheduler
        .register(investigation("inv-register", ScheduleKind::Custom, anchor, &["ebay"]))
        .expect("register succeeds");

    assert_eq!(registered.scheduled_start_time, anchor);
    assert_eq!(registered.status, InvestigationStatus::Scheduled);

    let stored = harness
        .investigations
        .get(&InvestigationId("inv-register".to_string()))
        .expect("repo lookup")
        .expect("investigation persisted");
    assert_eq!(stored.scheduled_start_time, anchor);
}

#[tokio::test]
async fn successful_run_completes_and_reschedules() {
    let harness = harness();
    harness.search.stage(
        "ebay",
        vec![candidate(
            "Tot Tower Dresser ABC123",
            "https://ebay.com/item/1",
            Some(35.0),
        )],
    );

    let before = Utc::now();
    harness
        .investigations
        .save(investigation(
            "inv-daily",
            ScheduleKind::Daily,
            before - chrono::Duration::hours(1),
            &["ebay"],
        ))
        .expect("seed investigation");

    let id = InvestigationId("inv-daily".to_string());
    let disposition = harness.scheduler.run(&id).await.expect("run succeeds");

    match disposition {
        RunDisposition::Completed { summary, next_fire } => {
            assert_eq!(summary.listings_found, 1);
            assert_eq!(summary.listings_queued, 1);
            assert!(summary.failures.is_empty());
            let next_fire = next_fire.expect("daily schedules loop");
            assert!(next_fire > before);
        }
        other => panic!("expected completed disposition, got {other:?}"),
    }

    let stored = harness
        .investigations
        .get(&id)
        .expect("repo lookup")
        .expect("investigation present");
    // Re-registered for the next pass.
    assert_eq!(stored.status, InvestigationStatus::Scheduled);
    assert!(stored.start_time.is_some());
    assert!(stored.end_time.is_some());
    assert_eq!(stored.listings_found, 1);
    assert_eq!(stored.listings_queued, 1);
}

#[tokio::test]
async fn custom_schedule_fires_once() {
    let harness = harness();
    harness
        .investigations
        .save(investigation(
            "inv-custom",
            ScheduleKind::Custom,
            Utc::now() - chrono::Duration::minutes(5),
            &["ebay"],
        ))
        .expect("seed investigation");

    let id = InvestigationId("inv-custom".to_string());
    let disposition = harness.scheduler.run(&id).await.expect("run succeeds");

    match disposition {
        RunDisposition::Completed { next_fire, .. } => assert!(next_fire.is_none()),
        other => panic!("expected completed disposition, got {other:?}"),
    }

    let stored = harness
        .investigations
        .get(&id)
        .expect("repo lookup")
        .expect("investigation present");
    assert_eq!(stored.status, InvestigationStatus::Completed);
}

#[tokio::test]
async fn stale_timer_skips_non_runnable_investigations() {
    let harness = harness();
    let mut cancelled = investigation(
        "inv-stale",
        ScheduleKind::Daily,
        Utc::now(),
        &["ebay"],
    );
    cancelled.status = InvestigationStatus::Cancelled;
    harness
        .investigations
        .save(cancelled)
        .expect("seed investigation");

    let id = InvestigationId("inv-stale".to_string());
    let disposition = harness.scheduler.run(&id).await.expect("run returns");

    assert!(matches!(disposition, RunDisposition::SkippedStale));
    let stored = harness
        .investigations
        .get(&id)
        .expect("repo lookup")
        .expect("investigation present");
    assert_eq!(stored.status, InvestigationStatus::Cancelled);
}

#[tokio::test]
async fn timer_for_a_deleted_investigation_is_a_no_op() {
    let harness = harness();
    let disposition = harness
        .scheduler
        .run(&InvestigationId("inv-ghost".to_string()))
        .await
        .expect("run returns");
    assert!(matches!(disposition, RunDisposition::SkippedStale));
}

#[tokio::test]
async fn runner_failure_marks_failed_and_never_reschedules() {
    let investigations = Arc::new(InMemoryInvestigationRepository::default());
    let listings = Arc::new(InMemoryListingRepository::default());
    let runner = Arc::new(InvestigationRunner::new(
        Arc::new(ScriptedSearch::default()),
        listings,
        Arc::new(FailingTargets),
        Duration::from_millis(250),
    ));
    let scheduler = InvestigationScheduler::new(
        investigations.clone(),
        Arc::new(TokioJobTrigger::new()),
        runner,
    );

    investigations
        .save(investigation(
            "inv-broken",
            ScheduleKind::Daily,
            Utc::now(),
            &["ebay"],
        ))
        .expect("seed investigation");

    let id = InvestigationId("inv-broken".to_string());
    let disposition = scheduler.run(&id).await.expect("run returns");
    assert!(matches!(disposition, RunDisposition::Failed));

    let stored = investigations
        .get(&id)
        .expect("repo lookup")
        .expect("investigation present");
    assert_eq!(stored.status, InvestigationStatus::Failed);
    assert!(stored.end_time.is_some());

    // A stray timer firing later finds FAILED and refuses to run.
    let again = scheduler.run(&id).await.expect("run returns");
    assert!(matches!(again, RunDisposition::SkippedStale));
}

#[tokio::test]
async fn search_outage_on_one_marketplace_is_partial() {
    let harness = harness();
    harness.search.stage(
        "ebay",
        vec![candidate(
            "Tot Tower Dresser ABC123",
            "https://ebay.com/item/1",
            Some(35.0),
        )],
    );
    harness.search.fail("craigslist");

    harness
        .investigations
        .save(investigation(
            "inv-partial",
            ScheduleKind::Custom,
            Utc::now() - chrono::Duration::minutes(1),
            &["ebay", "craigslist"],
        ))
        .expect("seed investigation");

    let id = InvestigationId("inv-partial".to_string());
    let disposition = harness.scheduler.run(&id).await.expect("run succeeds");

    match disposition {
        RunDisposition::Completed { summary, .. } => {
            assert_eq!(summary.listings_found, 1);
            assert_eq!(summary.failures.len(), 1);
            assert_eq!(summary.failures[0].marketplace_id.0, "craigslist");
        }
        other => panic!("expected completed disposition, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn search_timeout_is_recorded_as_partial_failure() {
    let investigations = Arc::new(InMemoryInvestigationRepository::default());
    let listings = Arc::new(InMemoryListingRepository::default());
    let targets = Arc::new(super::common::seeded_targets());
    let runner = Arc::new(InvestigationRunner::new(
        Arc::new(StalledSearch),
        listings,
        targets,
        Duration::from_millis(250),
    ));
    let scheduler = InvestigationScheduler::new(
        investigations.clone(),
        Arc::new(TokioJobTrigger::new()),
        runner,
    );

    investigations
        .save(investigation(
            "inv-slow",
            ScheduleKind::Custom,
            Utc::now(),
            &["ebay"],
        ))
        .expect("seed investigation");

    let id = InvestigationId("inv-slow".to_string());
    let disposition = scheduler.run(&id).await.expect("run returns");

    match disposition {
        RunDisposition::Completed { summary, .. } => {
            assert_eq!(summary.listings_found, 0);
            assert_eq!(summary.failures.len(), 1);
            assert!(summary.failures[0].error.contains("timed out"));
        }
        other => panic!("expected completed disposition, got {other:?}"),
    }
}

#[tokio::test]
async fn cancel_removes_the_timer_and_marks_cancelled() {
    let harness = harness();
    harness
        .scheduler
        .register(investigation(
            "inv-cancel",
            ScheduleKind::Custom,
            utc(2030, 1, 1, 0, 0),
            &["ebay"],
        ))
        .expect("register succeeds");

    let id = InvestigationId("inv-cancel".to_string());
    let cancelled = harness.scheduler.cancel(&id).expect("cancel succeeds");
    assert_eq!(cancelled.status, InvestigationStatus::Cancelled);

    // The timer is already gone; a second unregister finds nothing.
    assert!(!harness.scheduler.unregister(&id));
}

#[tokio::test]
async fn unregister_without_a_timer_is_a_no_op() {
    let harness = harness();
    assert!(!harness.scheduler.unregister(&InvestigationId("inv-none".to_string())));
}

#[tokio::test]
async fn timer_fires_and_completes_end_to_end() {
    let harness = harness();
    harness.search.stage(
        "ebay",
        vec![candidate(
            "Tot Tower Dresser ABC123",
            "https://ebay.com/item/1",
            Some(35.0),
        )],
    );

    harness
        .scheduler
        .register(investigation(
            "inv-live",
            ScheduleKind::Custom,
            Utc::now() + chrono::Duration::milliseconds(50),
            &["ebay"],
        ))
        .expect("register succeeds");

    tokio::time::sleep(Duration::from_millis(800)).await;

    let stored = harness
        .investigations
        .get(&InvestigationId("inv-live".to_string()))
        .expect("repo lookup")
        .expect("investigation present");
    assert_eq!(stored.status, InvestigationStatus::Completed);
    assert_eq!(stored.listings_found, 1);
}

#[tokio::test]
async fn rescheduling_the_same_job_id_replaces_the_previous_timer() {
    let trigger = TokioJobTrigger::new();
    let fired = Arc::new(AtomicU32::new(0));

    for _ in 0..2 {
        let fired = fired.clone();
        let callback: JobCallback = Arc::new(move || {
            let fired = fired.clone();
            Box::pin(async move {
                fired.fetch_add(1, Ordering::SeqCst);
            })
        });
        trigger.schedule(
            "job-duplicate",
            Utc::now() + chrono::Duration::milliseconds(50),
            callback,
        );
    }

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancelling_a_pending_job_prevents_the_callback() {
    let trigger = TokioJobTrigger::new();
    let fired = Arc::new(AtomicU32::new(0));

    let callback: JobCallback = {
        let fired = fired.clone();
        Arc::new(move || {
            let fired = fired.clone();
            Box::pin(async move {
                fired.fetch_add(1, Ordering::SeqCst);
            })
        })
    };
    let handle = trigger.schedule(
        "job-cancel",
        Utc::now() + chrono::Duration::milliseconds(100),
        callback,
    );

    assert!(handle.cancel());
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}
