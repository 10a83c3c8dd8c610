use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;

use recall_sentinel::monitoring::classification::RiskClassificationConfig;
use recall_sentinel::monitoring::investigations::{
    CandidateListing, InMemoryInvestigationRepository, InMemoryListingRepository,
    InMemoryRiskConfigStore, InMemoryTargetRepository, InvestigationRunner,
    InvestigationScheduler, MarketplaceId, MarketplaceSearch, MonitoringService, RecallTarget,
    SearchError, TargetId, TargetRepository, TokioJobTrigger,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Recall targets seeded into the default wiring.
pub(crate) fn demo_targets() -> Vec<RecallTarget> {
    vec![
        RecallTarget {
            target_id: TargetId("tgt-dresser".to_string()),
            product_name: "Tot Tower Dresser".to_string(),
            model_numbers: vec!["ABC123".to_string()],
            manufacturer: Some("Acme Kids".to_string()),
        },
        RecallTarget {
            target_id: TargetId("tgt-nightlight".to_string()),
            product_name: "Glow Buddy Night Light".to_string(),
            model_numbers: vec!["GB-550".to_string()],
            manufacturer: Some("Lumen Labs".to_string()),
        },
    ]
}

/// Fixed-catalog marketplace search standing in for a real scraper or
/// provider API. The runner only depends on the [`MarketplaceSearch`]
/// contract, so swapping in a live implementation is a wiring change.
pub(crate) struct CatalogMarketplaceSearch {
    catalog: Vec<(MarketplaceId, CandidateListing)>,
}

impl CatalogMarketplaceSearch {
    pub(crate) fn with_demo_listings() -> Self {
        let ebay = MarketplaceId("ebay".to_string());
        let craigslist = MarketplaceId("craigslist".to_string());
        Self {
            catalog: vec![
                (
                    ebay.clone(),
                    CandidateListing {
                        title: "Tot Tower Dresser ABC123".to_string(),
                        description: Some("Acme Kids dresser, barely used".to_string()),
                        price: Some(40.0),
                        url: "https://ebay.com/item/1".to_string(),
                        seller: Some("resale-shop".to_string()),
                        image_url: None,
                    },
                ),
                (
                    ebay.clone(),
                    CandidateListing {
                        title: "Toddler dresser tower, must go".to_string(),
                        description: None,
                        price: Some(3.0),
                        url: "https://ebay.com/item/2".to_string(),
                        seller: None,
                        image_url: None,
                    },
                ),
                (
                    ebay,
                    CandidateListing {
                        title: "Glow Buddy Night Light GB-550".to_string(),
                        description: Some("Lumen Labs nursery light".to_string()),
                        price: Some(12.0),
                        url: "https://ebay.com/item/3".to_string(),
                        seller: Some("nursery-closeouts".to_string()),
                        image_url: None,
                    },
                ),
                (
                    craigslist,
                    CandidateListing {
                        title: "Acme Kids Tot Tower Dresser".to_string(),
                        description: Some("Model ABC123, pickup only".to_string()),
                        price: Some(25.0),
                        url: "https://craigslist.org/item/9".to_string(),
                        seller: None,
                        image_url: None,
                    },
                ),
            ],
        }
    }

    pub(crate) fn catalog(&self) -> &[(MarketplaceId, CandidateListing)] {
        &self.catalog
    }
}

#[async_trait]
impl MarketplaceSearch for CatalogMarketplaceSearch {
    async fn search(
        &self,
        marketplace_id: &MarketplaceId,
        _query: &str,
        _target: &RecallTarget,
    ) -> Result<Vec<CandidateListing>, SearchError> {
        Ok(self
            .catalog
            .iter()
            .filter(|(marketplace, _)| marketplace == marketplace_id)
            .map(|(_, listing)| listing.clone())
            .collect())
    }
}

/// In-memory wiring of the monitoring pipeline, shared by the server and the
/// CLI demo. Every collaborator arrives by injection; a persistent
/// deployment swaps the repositories without touching the core.
pub(crate) struct Pipeline {
    pub(crate) service: Arc<MonitoringService>,
    pub(crate) listings: Arc<InMemoryListingRepository>,
    pub(crate) search: Arc<CatalogMarketplaceSearch>,
}

pub(crate) fn build_pipeline(search_timeout: Duration) -> Pipeline {
    let investigations = Arc::new(InMemoryInvestigationRepository::default());
    let listings = Arc::new(InMemoryListingRepository::default());
    let targets = Arc::new(InMemoryTargetRepository::default());
    for target in demo_targets() {
        // Seeding an in-memory store cannot fail.
        let _ = targets.save(target);
    }

    let search = Arc::new(CatalogMarketplaceSearch::with_demo_listings());
    let runner = Arc::new(InvestigationRunner::new(
        search.clone(),
        listings.clone(),
        targets,
        search_timeout,
    ));
    let scheduler = InvestigationScheduler::new(
        investigations.clone(),
        Arc::new(TokioJobTrigger::new()),
        runner,
    );
    let configs = Arc::new(InMemoryRiskConfigStore::standard());
    let service = Arc::new(MonitoringService::new(
        configs,
        investigations.clone(),
        scheduler,
    ));

    Pipeline {
        service,
        listings,
        search,
    }
}

/// Risk configuration used by the default wiring.
pub(crate) fn default_risk_config() -> RiskClassificationConfig {
    RiskClassificationConfig::standard()
}
