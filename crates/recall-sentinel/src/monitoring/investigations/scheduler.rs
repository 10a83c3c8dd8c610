use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::domain::{
    Investigation, InvestigationId, InvestigationStatus, RunSummary, ScheduleKind,
};
use super::recurrence::next_run;
use super::repository::{InvestigationRepository, RepositoryError};
use super::runner::InvestigationRunner;

pub type JobFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
pub type JobCallback = Arc<dyn Fn() -> JobFuture + Send + Sync>;

/// Opaque handle to a scheduled one-shot job. Cancellation reports whether
/// anything was actually cancelled instead of being swallowed.
pub struct JobHandle {
    job_id: String,
    canceller: Box<dyn Fn() -> bool + Send + Sync>,
}

impl JobHandle {
    pub fn new(
        job_id: impl Into<String>,
        canceller: impl Fn() -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            canceller: Box::new(canceller),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// True when a live job was cancelled; false when it already fired.
    pub fn cancel(&self) -> bool {
        (self.canceller)()
    }
}

/// Timer backend contract. One persistent job identity per investigation:
/// scheduling a job id that is already live replaces the previous timer.
pub trait JobTrigger: Send + Sync {
    fn schedule(&self, job_id: &str, fire_at: DateTime<Utc>, callback: JobCallback) -> JobHandle;

    /// Remove a pending job; false when nothing was pending under the id.
    fn cancel(&self, job_id: &str) -> bool;
}

/// Tokio-backed trigger: each scheduled job is a task sleeping until its
/// fire time.
#[derive(Default)]
pub struct TokioJobTrigger {
    jobs: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl TokioJobTrigger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobTrigger for TokioJobTrigger {
    fn schedule(&self, job_id: &str, fire_at: DateTime<Utc>, callback: JobCallback) -> JobHandle {
        let delay = (fire_at - Utc::now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback().await;
        });
        let abort = task.abort_handle();

        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        jobs.retain(|_, handle| !handle.is_finished());
        if let Some(previous) = jobs.insert(job_id.to_string(), task) {
            previous.abort();
        }

        JobHandle::new(job_id, move || {
            if abort.is_finished() {
                false
            } else {
                abort.abort();
                true
            }
        })
    }

    fn cancel(&self, job_id: &str) -> bool {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        match jobs.remove(job_id) {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }
}

/// Error enumeration for scheduler operations.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// How a timer-initiated run resolved.
#[derive(Debug)]
pub enum RunDisposition {
    /// The timer was stale: the investigation is gone, cancelled, or
    /// otherwise not in a runnable state.
    SkippedStale,
    Completed {
        summary: RunSummary,
        /// Present when the investigation was re-registered for another pass.
        next_fire: Option<DateTime<Utc>>,
    },
    Failed,
}

/// Owns investigation lifecycle transitions driven by timer events. State
/// for a single investigation moves SCHEDULED → RUNNING → terminal, and only
/// through this type once the investigation is SCHEDULED.
pub struct InvestigationScheduler {
    investigations: Arc<dyn InvestigationRepository>,
    trigger: Arc<dyn JobTrigger>,
    runner: Arc<InvestigationRunner>,
}

impl InvestigationScheduler {
    pub fn new(
        investigations: Arc<dyn InvestigationRepository>,
        trigger: Arc<dyn JobTrigger>,
        runner: Arc<InvestigationRunner>,
    ) -> Arc<Self> {
        Arc::new(Self {
            investigations,
            trigger,
            runner,
        })
    }

    /// Compute the next fire time from the investigation's anchor, persist
    /// it, and install a one-shot timer. Re-registering an id replaces any
    /// existing timer, so at most one timer exists per investigation.
    pub fn register(
        self: &Arc<Self>,
        mut investigation: Investigation,
    ) -> Result<Investigation, SchedulerError> {
        let now = Utc::now();
        let next_fire = next_run(
            investigation.scheduled_start_time,
            investigation.schedule_kind,
            now,
        );
        investigation.scheduled_start_time = next_fire;
        investigation.status = InvestigationStatus::Scheduled;
        self.investigations.save(investigation.clone())?;

        let scheduler = Arc::clone(self);
        let investigation_id = investigation.investigation_id.clone();
        let callback: JobCallback = Arc::new(move || {
            let scheduler = Arc::clone(&scheduler);
            let id = investigation_id.clone();
            Box::pin(async move {
                if let Err(error) = scheduler.run(&id).await {
                    error!(investigation = %id.0, %error, "scheduled run aborted");
                }
            }) as JobFuture
        });
        self.trigger
            .schedule(&investigation.investigation_id.0, next_fire, callback);

        info!(
            investigation = %investigation.investigation_id.0,
            schedule = investigation.schedule_kind.label(),
            fire_at = %next_fire,
            "investigation registered"
        );
        Ok(investigation)
    }

    /// Remove the pending timer; false when none was pending.
    pub fn unregister(&self, investigation_id: &InvestigationId) -> bool {
        self.trigger.cancel(&investigation_id.0)
    }

    /// The only cancellation path: drop the timer, then mark CANCELLED. An
    /// in-flight run observes the status at its next check and skips
    /// rescheduling.
    pub fn cancel(
        &self,
        investigation_id: &InvestigationId,
    ) -> Result<Investigation, SchedulerError> {
        self.unregister(investigation_id);
        let mut investigation = self
            .investigations
            .get(investigation_id)?
            .ok_or(RepositoryError::NotFound)?;
        investigation.status = InvestigationStatus::Cancelled;
        self.investigations.save(investigation.clone())?;
        info!(investigation = %investigation_id.0, "investigation cancelled");
        Ok(investigation)
    }

    /// One timer-initiated pass. Errors returned here are repository
    /// failures around the state transitions; a runner failure is absorbed
    /// into the FAILED state instead.
    pub async fn run(
        self: &Arc<Self>,
        investigation_id: &InvestigationId,
    ) -> Result<RunDisposition, SchedulerError> {
        let Some(mut investigation) = self.investigations.get(investigation_id)? else {
            warn!(investigation = %investigation_id.0, "timer fired for unknown investigation");
            return Ok(RunDisposition::SkippedStale);
        };
        if !investigation.status.accepts_run() {
            info!(
                investigation = %investigation_id.0,
                status = investigation.status.label(),
                "stale timer fired; skipping run"
            );
            return Ok(RunDisposition::SkippedStale);
        }

        investigation.status = InvestigationStatus::Running;
        investigation.start_time = Some(Utc::now());
        self.investigations.save(investigation.clone())?;

        let result = self.runner.execute(&investigation).await;

        // Reload so a cancellation issued during the pass is observed.
        let mut investigation = self
            .investigations
            .get(investigation_id)?
            .unwrap_or(investigation);
        investigation.end_time = Some(Utc::now());

        match result {
            Ok(summary) => {
                investigation.listings_found = summary.listings_found;
                investigation.listings_queued = summary.listings_queued;
                let cancelled = investigation.status == InvestigationStatus::Cancelled;
                if !cancelled {
                    investigation.status = InvestigationStatus::Completed;
                }
                self.investigations.save(investigation.clone())?;
                info!(
                    investigation = %investigation_id.0,
                    listings_found = summary.listings_found,
                    listings_queued = summary.listings_queued,
                    failures = summary.failures.len(),
                    "investigation run completed"
                );

                if !cancelled && investigation.schedule_kind != ScheduleKind::Custom {
                    let registered = self.register(investigation)?;
                    return Ok(RunDisposition::Completed {
                        summary,
                        next_fire: Some(registered.scheduled_start_time),
                    });
                }
                Ok(RunDisposition::Completed {
                    summary,
                    next_fire: None,
                })
            }
            Err(error) => {
                investigation.status = InvestigationStatus::Failed;
                self.investigations.save(investigation)?;
                error!(
                    investigation = %investigation_id.0,
                    %error,
                    "investigation run failed; not rescheduling"
                );
                Ok(RunDisposition::Failed)
            }
        }
    }
}
