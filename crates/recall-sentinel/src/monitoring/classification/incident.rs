use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Well-known statistic paths used by the standard ruleset. Configs are free
/// to reference any path an ingesting surface records.
pub mod fields {
    pub const INJURIES: &str = "injuries";
    pub const DEATHS: &str = "deaths";
    pub const INCIDENTS: &str = "incidents";
    pub const UNITS_AFFECTED: &str = "units_affected";
}

/// Generic record being risk-classified. Statistics are keyed by logical
/// field path rather than carried as struct fields, so the same engine can
/// classify whatever shape an import surface produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    #[serde(default)]
    pub stats: BTreeMap<String, f64>,
    #[serde(default)]
    pub hazard_descriptions: Vec<String>,
}

impl Incident {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stat(mut self, path: &str, value: f64) -> Self {
        self.stats.insert(path.to_string(), value);
        self
    }

    pub fn with_hazard(mut self, description: &str) -> Self {
        self.hazard_descriptions.push(description.to_string());
        self
    }

    /// Resolve a statistic by logical path. Absent paths are not an error;
    /// rules referencing them simply do not match.
    pub fn stat(&self, path: &str) -> Option<f64> {
        self.stats.get(path).copied()
    }

    pub fn units_affected(&self) -> f64 {
        self.stat(fields::UNITS_AFFECTED).unwrap_or(0.0)
    }

    /// Case-folded concatenation of every hazard description, the haystack
    /// for keyword rules.
    pub fn hazard_text(&self) -> String {
        self.hazard_descriptions
            .iter()
            .map(|description| description.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
