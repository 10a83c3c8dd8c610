use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::monitoring::classification::RiskClassificationConfig;
use crate::monitoring::investigations::memory::{
    InMemoryInvestigationRepository, InMemoryListingRepository, InMemoryRiskConfigStore,
    InMemoryTargetRepository,
};
use crate::monitoring::investigations::repository::{
    RepositoryError, TargetRepository,
};
use crate::monitoring::investigations::runner::{
    InvestigationRunner, MarketplaceSearch, SearchError,
};
use crate::monitoring::investigations::scheduler::{InvestigationScheduler, TokioJobTrigger};
use crate::monitoring::investigations::service::MonitoringService;
use crate::monitoring::investigations::{
    CandidateListing, Investigation, InvestigationId, InvestigationStatus, MarketplaceId,
    RecallTarget, ScheduleKind, TargetId,
};

pub(super) fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn target() -> RecallTarget {
    RecallTarget {
        target_id: TargetId("tgt-dresser".to_string()),
        product_name: "Tot Tower Dresser".to_string(),
        model_numbers: vec!["ABC123".to_string(), "TD-9000".to_string()],
        manufacturer: Some("Acme Kids".to_string()),
    }
}

pub(super) fn candidate(title: &str, url: &str, price: Option<f64>) -> CandidateListing {
    CandidateListing {
        title: title.to_string(),
        description: None,
        price,
        url: url.to_string(),
        seller: Some("resale-shop".to_string()),
        image_url: None,
    }
}

pub(super) fn investigation(
    id: &str,
    kind: ScheduleKind,
    anchor: DateTime<Utc>,
    marketplaces: &[&str],
) -> Investigation {
    Investigation {
        investigation_id: InvestigationId(id.to_string()),
        target_ids: vec![target().target_id],
        marketplace_ids: marketplaces
            .iter()
            .map(|name| MarketplaceId(name.to_string()))
            .collect(),
        region_ids: BTreeMap::new(),
        schedule_kind: kind,
        scheduled_start_time: anchor,
        start_time: None,
        end_time: None,
        status: InvestigationStatus::Scheduled,
        listings_found: 0,
        listings_queued: 0,
    }
}

/// Deterministic marketplace search: fixed results per marketplace, optional
/// scripted outages.
#[derive(Default)]
pub(super) struct ScriptedSearch {
    results: Mutex<HashMap<MarketplaceId, Vec<CandidateListing>>>,
    failing: Mutex<HashSet<MarketplaceId>>,
}

impl ScriptedSearch {
    pub(super) fn stage(&self, marketplace: &str, candidates: Vec<CandidateListing>) {
        self.results
            .lock()
            .expect("results lock")
            .insert(MarketplaceId(marketplace.to_string()), candidates);
    }

    pub(super) fn fail(&self, marketplace: &str) {
        self.failing
            .lock()
            .expect("failing lock")
            .insert(MarketplaceId(marketplace.to_string()));
    }
}

#[async_trait]
impl MarketplaceSearch for ScriptedSearch {
    async fn search(
        &self,
        marketplace_id: &MarketplaceId,
        _query: &str,
        _target: &RecallTarget,
    ) -> Result<Vec<CandidateListing>, SearchError> {
        if self
            .failing
            .lock()
            .expect("failing lock")
            .contains(marketplace_id)
        {
            return Err(SearchError::Backend("scripted outage".to_string()));
        }
        Ok(self
            .results
            .lock()
            .expect("results lock")
            .get(marketplace_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Search that never answers within any reasonable per-call budget.
pub(super) struct StalledSearch;

#[async_trait]
impl MarketplaceSearch for StalledSearch {
    async fn search(
        &self,
        _marketplace_id: &MarketplaceId,
        _query: &str,
        _target: &RecallTarget,
    ) -> Result<Vec<CandidateListing>, SearchError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}

/// Target store whose every call fails, for driving the FAILED transition.
pub(super) struct FailingTargets;

impl TargetRepository for FailingTargets {
    fn get(&self, _id: &TargetId) -> Result<Option<RecallTarget>, RepositoryError> {
        Err(RepositoryError::Unavailable("scripted outage".to_string()))
    }

    fn save(&self, _target: RecallTarget) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("scripted outage".to_string()))
    }
}

pub(super) fn seeded_targets() -> InMemoryTargetRepository {
    let targets = InMemoryTargetRepository::default();
    targets.save(target()).expect("seed target");
    targets
}

pub(super) struct Harness {
    pub(super) investigations: Arc<InMemoryInvestigationRepository>,
    pub(super) search: Arc<ScriptedSearch>,
    pub(super) scheduler: Arc<InvestigationScheduler>,
}

pub(super) fn harness() -> Harness {
    let investigations = Arc::new(InMemoryInvestigationRepository::default());
    let listings = Arc::new(InMemoryListingRepository::default());
    let targets = Arc::new(seeded_targets());

    let search = Arc::new(ScriptedSearch::default());
    let runner = Arc::new(InvestigationRunner::new(
        search.clone(),
        listings.clone(),
        targets.clone(),
        Duration::from_millis(250),
    ));
    let scheduler = InvestigationScheduler::new(
        investigations.clone(),
        Arc::new(TokioJobTrigger::new()),
        runner,
    );

    Harness {
        investigations,
        search,
        scheduler,
    }
}

pub(super) fn service_harness() -> (MonitoringService, Harness) {
    let harness = harness();
    let configs = Arc::new(
        InMemoryRiskConfigStore::new(RiskClassificationConfig::standard())
            .expect("standard config valid"),
    );
    let service = MonitoringService::new(
        configs,
        harness.investigations.clone(),
        harness.scheduler.clone(),
    );
    (service, harness)
}
