//! Risk-driven monitoring pipeline.
//!
//! Classification turns an incident's statistics into a risk level; the
//! level picks an investigation cadence; the scheduler fires recurring
//! marketplace searches whose results are deduplicated, match-scored, and
//! linked back to the investigation for review.

pub mod classification;
pub mod investigations;
