use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::monitoring::classification::{
    ClassificationOutcome, ConfigStoreError, ConfigValidationError, Incident,
    RiskClassificationConfig, RiskClassifier, RiskConfigStore, RiskLevel,
};

use super::domain::{
    Investigation, InvestigationId, InvestigationStatus, MarketplaceId, ScheduleKind, TargetId,
};
use super::repository::{InvestigationRepository, RepositoryError};
use super::scheduler::{InvestigationScheduler, SchedulerError};

static INVESTIGATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_investigation_id() -> InvestigationId {
    let id = INVESTIGATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    InvestigationId(format!("inv-{id:06}"))
}

/// Request payload for opening an investigation on an explicit cadence.
#[derive(Debug, Clone, Deserialize)]
pub struct InvestigationRequest {
    pub target_ids: Vec<TargetId>,
    pub marketplace_ids: Vec<MarketplaceId>,
    #[serde(default)]
    pub region_ids: BTreeMap<MarketplaceId, Vec<String>>,
    pub schedule_kind: ScheduleKind,
    pub scheduled_start_time: DateTime<Utc>,
}

/// Scope for risk-driven monitoring; the cadence is chosen from the
/// classification outcome rather than supplied by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringScope {
    pub target_ids: Vec<TargetId>,
    pub marketplace_ids: Vec<MarketplaceId>,
    #[serde(default)]
    pub region_ids: BTreeMap<MarketplaceId, Vec<String>>,
}

/// What risk-driven monitoring decided: the classification and the
/// investigation it opened.
#[derive(Debug, Clone, Serialize)]
pub struct MonitoringDecision {
    pub outcome: ClassificationOutcome,
    pub investigation: Investigation,
}

/// Error raised by the monitoring service.
#[derive(Debug, thiserror::Error)]
pub enum MonitoringServiceError {
    #[error(transparent)]
    ConfigStore(#[from] ConfigStoreError),
    #[error(transparent)]
    Validation(#[from] ConfigValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Service composing the risk classifier, config store, investigation
/// repository, and scheduler into the risk-driven monitoring pipeline.
pub struct MonitoringService {
    risk_configs: Arc<dyn RiskConfigStore>,
    investigations: Arc<dyn InvestigationRepository>,
    scheduler: Arc<InvestigationScheduler>,
}

impl MonitoringService {
    pub fn new(
        risk_configs: Arc<dyn RiskConfigStore>,
        investigations: Arc<dyn InvestigationRepository>,
        scheduler: Arc<InvestigationScheduler>,
    ) -> Self {
        Self {
            risk_configs,
            investigations,
            scheduler,
        }
    }

    pub fn scheduler(&self) -> &Arc<InvestigationScheduler> {
        &self.scheduler
    }

    /// Classify an incident against the active rule configuration.
    pub fn classify(
        &self,
        incident: &Incident,
    ) -> Result<ClassificationOutcome, MonitoringServiceError> {
        let config = self.risk_configs.load()?;
        let classifier = RiskClassifier::new(config)?;
        Ok(classifier.classify(incident))
    }

    /// Open and register an investigation on an explicit schedule.
    pub fn open_investigation(
        &self,
        request: InvestigationRequest,
    ) -> Result<Investigation, MonitoringServiceError> {
        let investigation = Investigation {
            investigation_id: next_investigation_id(),
            target_ids: request.target_ids,
            marketplace_ids: request.marketplace_ids,
            region_ids: request.region_ids,
            schedule_kind: request.schedule_kind,
            scheduled_start_time: request.scheduled_start_time,
            start_time: None,
            end_time: None,
            status: InvestigationStatus::Scheduled,
            listings_found: 0,
            listings_queued: 0,
        };
        Ok(self.scheduler.register(investigation)?)
    }

    /// Risk-driven entry point: classify, pick the cadence the level calls
    /// for, and open the investigation. HIGH risk starts immediately on a
    /// daily loop.
    pub fn monitor(
        &self,
        incident: &Incident,
        scope: MonitoringScope,
    ) -> Result<MonitoringDecision, MonitoringServiceError> {
        let outcome = self.classify(incident)?;
        let (schedule_kind, anchor) = cadence_for(&outcome.level, Utc::now());

        let investigation = self.open_investigation(InvestigationRequest {
            target_ids: scope.target_ids,
            marketplace_ids: scope.marketplace_ids,
            region_ids: scope.region_ids,
            schedule_kind,
            scheduled_start_time: anchor,
        })?;

        Ok(MonitoringDecision {
            outcome,
            investigation,
        })
    }

    pub fn get(&self, id: &InvestigationId) -> Result<Investigation, MonitoringServiceError> {
        let investigation = self
            .investigations
            .get(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(investigation)
    }

    pub fn cancel(&self, id: &InvestigationId) -> Result<Investigation, MonitoringServiceError> {
        Ok(self.scheduler.cancel(id)?)
    }

    /// Replace the active rule configuration; the store rejects invalid
    /// configs before anything is persisted.
    pub fn update_risk_config(
        &self,
        config: RiskClassificationConfig,
    ) -> Result<(), MonitoringServiceError> {
        self.risk_configs.save(config)?;
        Ok(())
    }
}

/// Cadence policy: HIGH risk is searched daily starting now; MEDIUM weekly
/// within the hour; anything else monthly starting tomorrow.
fn cadence_for(level: &RiskLevel, now: DateTime<Utc>) -> (ScheduleKind, DateTime<Utc>) {
    match level.name() {
        "HIGH" => (ScheduleKind::Daily, now + Duration::seconds(1)),
        "MEDIUM" => (ScheduleKind::Weekly, now + Duration::hours(1)),
        _ => (ScheduleKind::Monthly, now + Duration::days(1)),
    }
}
