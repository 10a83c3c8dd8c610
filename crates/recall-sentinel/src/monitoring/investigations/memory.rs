//! In-memory implementations of the persistence collaborators, used by the
//! test suites and the API service's default wiring. Interchangeable with a
//! database-backed implementation behind the same traits.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use crate::monitoring::classification::{
    ConfigStoreError, RiskClassificationConfig, RiskConfigStore,
};

use super::domain::{
    Investigation, InvestigationId, InvestigationListing, ListingId, ListingKey,
    MarketplaceListing, RecallTarget, TargetId,
};
use super::repository::{
    InvestigationRepository, LinkCounts, ListingRepository, RepositoryError, TargetRepository,
};

fn poisoned<E>(_: E) -> RepositoryError {
    RepositoryError::Unavailable("store mutex poisoned".to_string())
}

#[derive(Default)]
pub struct InMemoryInvestigationRepository {
    records: Mutex<HashMap<InvestigationId, Investigation>>,
}

impl InvestigationRepository for InMemoryInvestigationRepository {
    fn get(&self, id: &InvestigationId) -> Result<Option<Investigation>, RepositoryError> {
        let guard = self.records.lock().map_err(poisoned)?;
        Ok(guard.get(id).cloned())
    }

    fn save(&self, investigation: Investigation) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().map_err(poisoned)?;
        guard.insert(investigation.investigation_id.clone(), investigation);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryListingRepository {
    listings: Mutex<HashMap<ListingKey, MarketplaceListing>>,
    links: Mutex<HashMap<(InvestigationId, ListingId), InvestigationListing>>,
}

impl ListingRepository for InMemoryListingRepository {
    fn get_by_key(&self, key: &ListingKey) -> Result<Option<MarketplaceListing>, RepositoryError> {
        let guard = self.listings.lock().map_err(poisoned)?;
        Ok(guard.get(key).cloned())
    }

    fn upsert(&self, listing: MarketplaceListing) -> Result<MarketplaceListing, RepositoryError> {
        let mut guard = self.listings.lock().map_err(poisoned)?;
        match guard.get_mut(&listing.key()) {
            Some(existing) => {
                existing.merge_from(&listing, Utc::now());
                Ok(existing.clone())
            }
            None => {
                guard.insert(listing.key(), listing.clone());
                Ok(listing)
            }
        }
    }

    fn link_to_investigation(&self, link: InvestigationListing) -> Result<(), RepositoryError> {
        let mut guard = self.links.lock().map_err(poisoned)?;
        guard.insert(
            (link.investigation_id.clone(), link.listing_id.clone()),
            link,
        );
        Ok(())
    }

    fn count_links(
        &self,
        investigation_id: &InvestigationId,
    ) -> Result<LinkCounts, RepositoryError> {
        let guard = self.links.lock().map_err(poisoned)?;
        let mut counts = LinkCounts::default();
        for link in guard.values() {
            if &link.investigation_id == investigation_id {
                counts.found += 1;
                if link.queued_for_review {
                    counts.queued += 1;
                }
            }
        }
        Ok(counts)
    }
}

#[derive(Default)]
pub struct InMemoryTargetRepository {
    targets: Mutex<HashMap<TargetId, RecallTarget>>,
}

impl TargetRepository for InMemoryTargetRepository {
    fn get(&self, id: &TargetId) -> Result<Option<RecallTarget>, RepositoryError> {
        let guard = self.targets.lock().map_err(poisoned)?;
        Ok(guard.get(id).cloned())
    }

    fn save(&self, target: RecallTarget) -> Result<(), RepositoryError> {
        let mut guard = self.targets.lock().map_err(poisoned)?;
        guard.insert(target.target_id.clone(), target);
        Ok(())
    }
}

pub struct InMemoryRiskConfigStore {
    config: Mutex<RiskClassificationConfig>,
}

impl InMemoryRiskConfigStore {
    /// Rejects invalid seeds; `load` only ever hands out validated configs.
    pub fn new(config: RiskClassificationConfig) -> Result<Self, ConfigStoreError> {
        config.validate()?;
        Ok(Self {
            config: Mutex::new(config),
        })
    }

    pub fn standard() -> Self {
        Self {
            config: Mutex::new(RiskClassificationConfig::standard()),
        }
    }
}

impl RiskConfigStore for InMemoryRiskConfigStore {
    fn load(&self) -> Result<RiskClassificationConfig, ConfigStoreError> {
        let guard = self
            .config
            .lock()
            .map_err(|_| ConfigStoreError::Unavailable("config mutex poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, config: RiskClassificationConfig) -> Result<(), ConfigStoreError> {
        config.validate()?;
        let mut guard = self
            .config
            .lock()
            .map_err(|_| ConfigStoreError::Unavailable("config mutex poisoned".to_string()))?;
        *guard = config;
        Ok(())
    }
}
