//! Scheduled marketplace investigations: recurrence, execution, listing
//! dedup and match scoring, and the service facade gluing them to risk
//! classification.

pub mod domain;
pub mod matching;
pub mod memory;
pub mod recurrence;
pub mod repository;
pub mod router;
pub mod runner;
pub mod scheduler;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    CandidateListing, Investigation, InvestigationId, InvestigationListing, InvestigationStatus,
    InvestigationStatusView, ListingId, ListingKey, ListingProvenance, MarketplaceFailure,
    MarketplaceId, MarketplaceListing, RecallTarget, RunSummary, ScheduleKind, TargetId,
};
pub use matching::{score_listing, MatchOutcome};
pub use memory::{
    InMemoryInvestigationRepository, InMemoryListingRepository, InMemoryRiskConfigStore,
    InMemoryTargetRepository,
};
pub use recurrence::next_run;
pub use repository::{
    InvestigationRepository, LinkCounts, ListingRepository, RepositoryError, TargetRepository,
};
pub use router::monitoring_router;
pub use runner::{InvestigationRunner, MarketplaceSearch, SearchError};
pub use scheduler::{
    InvestigationScheduler, JobCallback, JobFuture, JobHandle, JobTrigger, RunDisposition,
    SchedulerError, TokioJobTrigger,
};
pub use service::{
    InvestigationRequest, MonitoringDecision, MonitoringScope, MonitoringService,
    MonitoringServiceError,
};
