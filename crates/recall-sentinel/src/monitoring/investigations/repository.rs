use super::domain::{
    Investigation, InvestigationId, InvestigationListing, ListingKey, MarketplaceListing,
    RecallTarget, TargetId,
};

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction for investigations. Implementations must provide
/// atomic per-record read-modify-write (row locking or optimistic
/// versioning); the scheduler does not lock on its own.
pub trait InvestigationRepository: Send + Sync {
    fn get(&self, id: &InvestigationId) -> Result<Option<Investigation>, RepositoryError>;
    fn save(&self, investigation: Investigation) -> Result<(), RepositoryError>;
}

/// Counters derived from join records. Never incremented in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkCounts {
    pub found: u64,
    pub queued: u64,
}

/// Canonical listing store keyed by `(marketplace_id, listing_url)`.
pub trait ListingRepository: Send + Sync {
    fn get_by_key(&self, key: &ListingKey) -> Result<Option<MarketplaceListing>, RepositoryError>;

    /// Merge-upsert under the canonical dedup policy
    /// ([`MarketplaceListing::merge_from`]); returns the canonical row.
    /// Re-upserting an identical listing is a no-op beyond timestamp refresh.
    fn upsert(&self, listing: MarketplaceListing) -> Result<MarketplaceListing, RepositoryError>;

    /// Link a canonical listing to an investigation, keeping provenance.
    /// Linking the same pair again replaces the previous join record.
    fn link_to_investigation(&self, link: InvestigationListing) -> Result<(), RepositoryError>;

    fn count_links(&self, investigation_id: &InvestigationId)
        -> Result<LinkCounts, RepositoryError>;
}

/// Lookup for the recall targets an investigation's scope references.
pub trait TargetRepository: Send + Sync {
    fn get(&self, id: &TargetId) -> Result<Option<RecallTarget>, RepositoryError>;
    fn save(&self, target: RecallTarget) -> Result<(), RepositoryError>;
}
