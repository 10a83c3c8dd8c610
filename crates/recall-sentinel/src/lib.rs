//! Recall monitoring backend.
//!
//! Ingests recall/ban records, classifies their risk with a data-driven rule
//! engine, schedules recurring marketplace investigations at a cadence the
//! risk level calls for, and scores and deduplicates the listings those
//! investigations surface.

pub mod config;
pub mod error;
pub mod monitoring;
pub mod telemetry;
