use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use tracing::warn;

use super::domain::{
    CandidateListing, Investigation, InvestigationListing, ListingId, ListingProvenance,
    MarketplaceFailure, MarketplaceId, MarketplaceListing, RecallTarget, RunSummary,
};
use super::matching::score_listing;
use super::repository::{ListingRepository, RepositoryError, TargetRepository};

/// Listings scoring at or above this bar are queued for human review.
const REVIEW_QUEUE_THRESHOLD: f64 = 0.5;

/// Error enumeration for marketplace search failures. Recorded per call in
/// the run summary; never fatal to the investigation.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search timed out after {0:?}")]
    Timeout(Duration),
    #[error("marketplace search failed: {0}")]
    Backend(String),
}

/// Marketplace search collaborator. A real scraper, a provider API, or a
/// stub; the runner only depends on this contract.
#[async_trait]
pub trait MarketplaceSearch: Send + Sync {
    async fn search(
        &self,
        marketplace_id: &MarketplaceId,
        query: &str,
        target: &RecallTarget,
    ) -> Result<Vec<CandidateListing>, SearchError>;
}

static LISTING_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_listing_id() -> ListingId {
    let id = LISTING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ListingId(format!("lst-{id:06}"))
}

/// Executes one investigation pass: search every target on every marketplace,
/// score the candidates, merge-upsert them into the canonical store, and link
/// them to the investigation.
pub struct InvestigationRunner {
    search: Arc<dyn MarketplaceSearch>,
    listings: Arc<dyn ListingRepository>,
    targets: Arc<dyn TargetRepository>,
    search_timeout: Duration,
}

impl InvestigationRunner {
    pub fn new(
        search: Arc<dyn MarketplaceSearch>,
        listings: Arc<dyn ListingRepository>,
        targets: Arc<dyn TargetRepository>,
        search_timeout: Duration,
    ) -> Self {
        Self {
            search,
            listings,
            targets,
            search_timeout,
        }
    }

    /// Marketplace passes run concurrently; a timeout or search error on one
    /// call is recorded as a partial failure and does not disturb siblings.
    /// Counters are recomputed from join records at the end, never
    /// incremented along the way.
    pub async fn execute(&self, investigation: &Investigation) -> Result<RunSummary, RepositoryError> {
        let targets = self.resolve_targets(investigation)?;

        let passes = investigation
            .marketplace_ids
            .iter()
            .map(|marketplace_id| self.marketplace_pass(investigation, marketplace_id, &targets));
        let mut failures = Vec::new();
        for result in join_all(passes).await {
            failures.extend(result?);
        }

        let counts = self.listings.count_links(&investigation.investigation_id)?;
        Ok(RunSummary {
            listings_found: counts.found,
            listings_queued: counts.queued,
            failures,
        })
    }

    fn resolve_targets(
        &self,
        investigation: &Investigation,
    ) -> Result<Vec<RecallTarget>, RepositoryError> {
        let mut targets = Vec::with_capacity(investigation.target_ids.len());
        for target_id in &investigation.target_ids {
            match self.targets.get(target_id)? {
                Some(target) => targets.push(target),
                None => warn!(
                    investigation = %investigation.investigation_id.0,
                    target = %target_id.0,
                    "investigation references unknown target; skipping"
                ),
            }
        }
        Ok(targets)
    }

    async fn marketplace_pass(
        &self,
        investigation: &Investigation,
        marketplace_id: &MarketplaceId,
        targets: &[RecallTarget],
    ) -> Result<Vec<MarketplaceFailure>, RepositoryError> {
        let mut failures = Vec::new();

        for target in targets {
            let call = self
                .search
                .search(marketplace_id, &target.product_name, target);
            let outcome = match tokio::time::timeout(self.search_timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(SearchError::Timeout(self.search_timeout)),
            };

            match outcome {
                Ok(candidates) => {
                    for candidate in candidates {
                        self.ingest_candidate(investigation, marketplace_id, target, candidate)?;
                    }
                }
                Err(error) => {
                    warn!(
                        investigation = %investigation.investigation_id.0,
                        marketplace = %marketplace_id.0,
                        target = %target.target_id.0,
                        %error,
                        "marketplace search failed; continuing with siblings"
                    );
                    failures.push(MarketplaceFailure {
                        marketplace_id: marketplace_id.clone(),
                        target_id: target.target_id.clone(),
                        error: error.to_string(),
                    });
                }
            }
        }

        Ok(failures)
    }

    fn ingest_candidate(
        &self,
        investigation: &Investigation,
        marketplace_id: &MarketplaceId,
        target: &RecallTarget,
        candidate: CandidateListing,
    ) -> Result<(), RepositoryError> {
        let scored = score_listing(
            target,
            &candidate.title,
            candidate.description.as_deref(),
            candidate.price,
        );
        let now = Utc::now();

        let canonical = self.listings.upsert(MarketplaceListing {
            listing_id: next_listing_id(),
            marketplace_id: marketplace_id.clone(),
            listing_url: candidate.url,
            title: candidate.title,
            description: candidate.description,
            image_url: candidate.image_url,
            seller: candidate.seller,
            price: candidate.price,
            match_score: scored.score,
            match_reasons: scored.reasons,
            first_seen: now,
            last_seen: now,
        })?;

        let mut metadata = std::collections::BTreeMap::new();
        metadata.insert("target_id".to_string(), target.target_id.0.clone());
        metadata.insert("query".to_string(), target.product_name.clone());

        self.listings.link_to_investigation(InvestigationListing {
            investigation_id: investigation.investigation_id.clone(),
            listing_id: canonical.listing_id.clone(),
            provenance: ListingProvenance {
                added_by: "investigation-runner".to_string(),
                source: marketplace_id.0.clone(),
                metadata,
            },
            queued_for_review: canonical.match_score >= REVIEW_QUEUE_THRESHOLD,
            linked_at: now,
        })
    }
}
