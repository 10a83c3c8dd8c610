//! Data-driven risk classification for incoming recall/ban records.
//!
//! The engine evaluates a validated [`RiskClassificationConfig`] against an
//! [`Incident`] in a fixed pass order: force-level rules short-circuit
//! numeric scoring entirely, ordinary field rules and keyword rules
//! accumulate, the units-affected step function tops the score up, and the
//! capped total maps onto the configured level ladder.

mod config;
mod incident;
mod rules;

pub use config::{
    ComparisonOp, ConfigStoreError, ConfigValidationError, KeywordRule, QuantityThreshold,
    RiskClassificationConfig, RiskConfigStore, RiskLevelDef, ScoreRule,
};
pub use incident::{fields, Incident};

use serde::{Deserialize, Serialize};

/// Discrete risk tier selected for an incident. Levels are configuration
/// data, not a closed enum; the standard ruleset ships HIGH/MEDIUM/LOW.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RiskLevel(pub String);

impl RiskLevel {
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Which family of rule produced a score contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Field,
    Keyword,
    Quantity,
    ForceLevel,
}

/// Discrete contribution to a classification, allowing transparent audits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub kind: RuleKind,
    pub contribution: f64,
    pub notes: String,
}

/// Classification output: the selected level, the capped score, and the
/// contribution trail that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationOutcome {
    pub level: RiskLevel,
    pub score: f64,
    pub components: Vec<ScoreComponent>,
}

/// Stateless evaluator applying one validated rule configuration.
pub struct RiskClassifier {
    config: RiskClassificationConfig,
}

impl RiskClassifier {
    /// Validation happens here, at load time. `classify` itself never fails:
    /// a rule referencing a field the incident lacks simply does not match.
    pub fn new(config: RiskClassificationConfig) -> Result<Self, ConfigValidationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RiskClassificationConfig {
        &self.config
    }

    pub fn classify(&self, incident: &Incident) -> ClassificationOutcome {
        if let Some(forced) = rules::find_forced_level(incident, &self.config) {
            return ClassificationOutcome {
                level: RiskLevel(forced.to_string()),
                score: 0.0,
                components: vec![ScoreComponent {
                    kind: RuleKind::ForceLevel,
                    contribution: 0.0,
                    notes: format!("force-level rule assigned '{forced}'"),
                }],
            };
        }

        let (components, raw_total) = rules::accumulate_score(incident, &self.config);
        let score = raw_total.min(self.config.max_total_score);

        ClassificationOutcome {
            level: self.map_level(score),
            score,
            components,
        }
    }

    /// First level (by priority descending) whose threshold the score meets;
    /// the configured default when none do.
    fn map_level(&self, score: f64) -> RiskLevel {
        self.config
            .levels_by_priority()
            .into_iter()
            .find(|level| level.score_threshold <= score)
            .map(|level| RiskLevel(level.name.clone()))
            .unwrap_or_else(|| RiskLevel(self.config.default_level.clone()))
    }
}
