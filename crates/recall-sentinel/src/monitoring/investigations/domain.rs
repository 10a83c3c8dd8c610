use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for investigations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InvestigationId(pub String);

/// Identifier wrapper for recall targets under monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub String);

/// Identifier wrapper for a marketplace (e.g. "ebay", "amazon").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarketplaceId(pub String);

/// Identifier wrapper for canonical listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListingId(pub String);

/// Recurrence cadence of an investigation. CUSTOM fires once at its anchor
/// unless manually reset; every other kind loops perpetually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Custom,
}

impl ScheduleKind {
    pub const fn label(self) -> &'static str {
        match self {
            ScheduleKind::Daily => "daily",
            ScheduleKind::Weekly => "weekly",
            ScheduleKind::Biweekly => "biweekly",
            ScheduleKind::Monthly => "monthly",
            ScheduleKind::Custom => "custom",
        }
    }
}

/// Lifecycle state of an investigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestigationStatus {
    Scheduled,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl InvestigationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            InvestigationStatus::Scheduled => "scheduled",
            InvestigationStatus::Running => "running",
            InvestigationStatus::Completed => "completed",
            InvestigationStatus::Failed => "failed",
            InvestigationStatus::Cancelled => "cancelled",
        }
    }

    /// States in which a firing timer is allowed to start a pass. Anything
    /// else means the timer is stale (investigation cancelled or deleted).
    pub const fn accepts_run(self) -> bool {
        matches!(
            self,
            InvestigationStatus::Scheduled | InvestigationStatus::Running
        )
    }
}

/// A scheduled, recurring unit of work searching marketplaces for listings
/// related to one or more recall targets. Owned by the scheduler for
/// lifecycle transitions once SCHEDULED.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investigation {
    pub investigation_id: InvestigationId,
    pub target_ids: Vec<TargetId>,
    pub marketplace_ids: Vec<MarketplaceId>,
    /// Optional region restriction per marketplace.
    #[serde(default)]
    pub region_ids: BTreeMap<MarketplaceId, Vec<String>>,
    pub schedule_kind: ScheduleKind,
    /// Next-fire anchor. Advanced by whole schedule periods; never set to an
    /// arbitrary wall-clock instant by the scheduler.
    pub scheduled_start_time: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: InvestigationStatus,
    /// Derived counters, recomputed from join records at the end of a run.
    pub listings_found: u64,
    pub listings_queued: u64,
}

impl Investigation {
    pub fn status_view(&self) -> InvestigationStatusView {
        InvestigationStatusView {
            investigation_id: self.investigation_id.clone(),
            status: self.status.label(),
            schedule: self.schedule_kind.label(),
            scheduled_start_time: self.scheduled_start_time,
            start_time: self.start_time,
            end_time: self.end_time,
            listings_found: self.listings_found,
            listings_queued: self.listings_queued,
        }
    }
}

/// Sanitized representation of an investigation's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct InvestigationStatusView {
    pub investigation_id: InvestigationId,
    pub status: &'static str,
    pub schedule: &'static str,
    pub scheduled_start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub listings_found: u64,
    pub listings_queued: u64,
}

/// The recall side of match scoring: what a listing is compared against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecallTarget {
    pub target_id: TargetId,
    pub product_name: String,
    #[serde(default)]
    pub model_numbers: Vec<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
}

/// Dedup key for canonical listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListingKey {
    pub marketplace_id: MarketplaceId,
    pub listing_url: String,
}

/// Canonical stored representation of a marketplace item, unique by
/// `(marketplace_id, listing_url)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketplaceListing {
    pub listing_id: ListingId,
    pub marketplace_id: MarketplaceId,
    pub listing_url: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub seller: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    pub match_score: f64,
    #[serde(default)]
    pub match_reasons: Vec<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl MarketplaceListing {
    pub fn key(&self) -> ListingKey {
        ListingKey {
            marketplace_id: self.marketplace_id.clone(),
            listing_url: self.listing_url.clone(),
        }
    }

    /// Dedup merge policy: non-empty incoming fields fill or refresh the
    /// canonical row, while `match_score`/`match_reasons` only move when the
    /// incoming score is strictly greater. A weaker rescan never regresses
    /// the recorded match quality.
    pub fn merge_from(&mut self, incoming: &MarketplaceListing, now: DateTime<Utc>) {
        if !incoming.title.is_empty() {
            self.title = incoming.title.clone();
        }
        if incoming.description.is_some() {
            self.description = incoming.description.clone();
        }
        if incoming.image_url.is_some() {
            self.image_url = incoming.image_url.clone();
        }
        if incoming.seller.is_some() {
            self.seller = incoming.seller.clone();
        }
        if incoming.price.is_some() {
            self.price = incoming.price;
        }
        if incoming.match_score > self.match_score {
            self.match_score = incoming.match_score;
            self.match_reasons = incoming.match_reasons.clone();
        }
        self.last_seen = now;
    }
}

/// Raw search result from a marketplace search collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateListing {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    pub url: String,
    #[serde(default)]
    pub seller: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Provenance recorded on a listing/investigation link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingProvenance {
    pub added_by: String,
    pub source: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Join record linking an investigation to a canonical listing. A listing
/// may be referenced by many investigations without being duplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationListing {
    pub investigation_id: InvestigationId,
    pub listing_id: ListingId,
    pub provenance: ListingProvenance,
    /// Set when the match score clears the review-queue bar.
    pub queued_for_review: bool,
    pub linked_at: DateTime<Utc>,
}

/// One marketplace search call that did not produce results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketplaceFailure {
    pub marketplace_id: MarketplaceId,
    pub target_id: TargetId,
    pub error: String,
}

/// Result of one investigation pass. Failures are partial: marketplaces that
/// answered still contribute their listings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub listings_found: u64,
    pub listings_queued: u64,
    #[serde(default)]
    pub failures: Vec<MarketplaceFailure>,
}
