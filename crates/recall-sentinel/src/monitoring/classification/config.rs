use serde::{Deserialize, Serialize};

/// Named severity tier in the classification ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskLevelDef {
    pub name: String,
    pub score_threshold: f64,
    pub priority: i32,
}

/// Comparison applied by a field rule against an incident statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Ne,
    IsNull,
    IsNotNull,
}

impl ComparisonOp {
    /// Presence checks carry no comparison value; every other operator needs one.
    pub fn requires_value(self) -> bool {
        !matches!(self, ComparisonOp::IsNull | ComparisonOp::IsNotNull)
    }
}

/// Field-comparison rule. With `force_level` set it bypasses numeric scoring
/// and assigns the named level outright; otherwise it contributes to the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoreRule {
    pub field_path: String,
    pub operator: ComparisonOp,
    #[serde(default)]
    pub comparison_value: Option<f64>,
    #[serde(default)]
    pub base_contribution: f64,
    #[serde(default)]
    pub per_unit_contribution: Option<f64>,
    #[serde(default)]
    pub max_contribution: Option<f64>,
    #[serde(default)]
    pub force_level: Option<String>,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

/// Substring rule over the concatenated hazard descriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeywordRule {
    pub keywords: Vec<String>,
    pub score_per_match: f64,
    pub max_contribution: f64,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

/// One step of the units-affected step function. Only the highest threshold
/// at or below the incident's unit count applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuantityThreshold {
    pub threshold: f64,
    pub score_contribution: f64,
}

fn enabled_default() -> bool {
    true
}

fn max_total_score_default() -> f64 {
    1.0
}

/// Rule configuration consumed by the risk classifier. Immutable once loaded
/// for a classification call; mutated only through a validated save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskClassificationConfig {
    pub risk_levels: Vec<RiskLevelDef>,
    #[serde(default)]
    pub score_rules: Vec<ScoreRule>,
    #[serde(default)]
    pub keyword_rules: Vec<KeywordRule>,
    #[serde(default)]
    pub quantity_thresholds: Vec<QuantityThreshold>,
    pub default_level: String,
    #[serde(default = "max_total_score_default")]
    pub max_total_score: f64,
}

impl RiskClassificationConfig {
    /// Rejects configs the classifier must never see. The classifier itself
    /// never fails at call time; everything it relies on is checked here.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.risk_levels.is_empty() {
            return Err(ConfigValidationError::NoRiskLevels);
        }

        let mut seen = std::collections::BTreeSet::new();
        for level in &self.risk_levels {
            if !seen.insert(level.name.as_str()) {
                return Err(ConfigValidationError::DuplicateLevelName {
                    name: level.name.clone(),
                });
            }
        }

        let ordered = self.levels_by_priority();
        for pair in ordered.windows(2) {
            if pair[1].score_threshold > pair[0].score_threshold {
                return Err(ConfigValidationError::NonMonotonicThresholds {
                    higher: pair[0].name.clone(),
                    lower: pair[1].name.clone(),
                });
            }
        }

        if !seen.contains(self.default_level.as_str()) {
            return Err(ConfigValidationError::UnknownDefaultLevel {
                name: self.default_level.clone(),
            });
        }

        for rule in &self.score_rules {
            if rule.operator.requires_value() && rule.comparison_value.is_none() {
                return Err(ConfigValidationError::MissingComparisonValue {
                    field_path: rule.field_path.clone(),
                });
            }
            if let Some(forced) = &rule.force_level {
                if !seen.contains(forced.as_str()) {
                    return Err(ConfigValidationError::UnknownForceLevel {
                        name: forced.clone(),
                    });
                }
            }
        }

        for rule in &self.keyword_rules {
            if rule.keywords.is_empty() {
                return Err(ConfigValidationError::EmptyKeywordRule);
            }
        }

        if !self.max_total_score.is_finite() || self.max_total_score <= 0.0 {
            return Err(ConfigValidationError::InvalidScoreCeiling {
                ceiling: self.max_total_score,
            });
        }

        Ok(())
    }

    /// Levels sorted by priority descending; validation guarantees thresholds
    /// are non-increasing in this order.
    pub fn levels_by_priority(&self) -> Vec<&RiskLevelDef> {
        let mut ordered: Vec<&RiskLevelDef> = self.risk_levels.iter().collect();
        ordered.sort_by(|a, b| b.priority.cmp(&a.priority));
        ordered
    }

    /// Shipped default ruleset: a death forces HIGH, injuries score per unit,
    /// hazard keywords and units-affected brackets top the score up.
    pub fn standard() -> Self {
        Self {
            risk_levels: vec![
                RiskLevelDef {
                    name: "HIGH".to_string(),
                    score_threshold: 0.6,
                    priority: 3,
                },
                RiskLevelDef {
                    name: "MEDIUM".to_string(),
                    score_threshold: 0.3,
                    priority: 2,
                },
                RiskLevelDef {
                    name: "LOW".to_string(),
                    score_threshold: 0.0,
                    priority: 1,
                },
            ],
            score_rules: vec![
                ScoreRule {
                    field_path: "deaths".to_string(),
                    operator: ComparisonOp::Gt,
                    comparison_value: Some(0.0),
                    base_contribution: 0.0,
                    per_unit_contribution: None,
                    max_contribution: None,
                    force_level: Some("HIGH".to_string()),
                    enabled: true,
                },
                ScoreRule {
                    field_path: "injuries".to_string(),
                    operator: ComparisonOp::Gt,
                    comparison_value: Some(0.0),
                    base_contribution: 0.0,
                    per_unit_contribution: Some(0.05),
                    max_contribution: Some(0.4),
                    force_level: None,
                    enabled: true,
                },
                ScoreRule {
                    field_path: "incidents".to_string(),
                    operator: ComparisonOp::Gte,
                    comparison_value: Some(10.0),
                    base_contribution: 0.1,
                    per_unit_contribution: None,
                    max_contribution: None,
                    force_level: None,
                    enabled: true,
                },
            ],
            keyword_rules: vec![KeywordRule {
                keywords: vec![
                    "fire".to_string(),
                    "burn".to_string(),
                    "choking".to_string(),
                    "laceration".to_string(),
                    "lead".to_string(),
                    "entrapment".to_string(),
                ],
                score_per_match: 0.05,
                max_contribution: 0.15,
                enabled: true,
            }],
            quantity_thresholds: vec![
                QuantityThreshold {
                    threshold: 10_000.0,
                    score_contribution: 0.02,
                },
                QuantityThreshold {
                    threshold: 100_000.0,
                    score_contribution: 0.05,
                },
                QuantityThreshold {
                    threshold: 500_000.0,
                    score_contribution: 0.10,
                },
            ],
            default_level: "LOW".to_string(),
            max_total_score: 1.0,
        }
    }
}

/// Load/save-time rejection reasons; none of these reach the classifier.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("config declares no risk levels")]
    NoRiskLevels,
    #[error("duplicate risk level name '{name}'")]
    DuplicateLevelName { name: String },
    #[error("score thresholds must not increase as priority falls ('{higher}' < '{lower}')")]
    NonMonotonicThresholds { higher: String, lower: String },
    #[error("default level '{name}' is not a declared risk level")]
    UnknownDefaultLevel { name: String },
    #[error("force level '{name}' is not a declared risk level")]
    UnknownForceLevel { name: String },
    #[error("rule on '{field_path}' needs a comparison value for its operator")]
    MissingComparisonValue { field_path: String },
    #[error("keyword rule declares no keywords")]
    EmptyKeywordRule,
    #[error("max_total_score must be a positive finite number, got {ceiling}")]
    InvalidScoreCeiling { ceiling: f64 },
}

/// Storage abstraction for the active rule configuration. Implementations
/// must validate before persisting; `load` only ever returns configs that
/// passed [`RiskClassificationConfig::validate`].
pub trait RiskConfigStore: Send + Sync {
    fn load(&self) -> Result<RiskClassificationConfig, ConfigStoreError>;
    fn save(&self, config: RiskClassificationConfig) -> Result<(), ConfigStoreError>;
}

/// Error enumeration for config store failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigStoreError {
    #[error(transparent)]
    Invalid(#[from] ConfigValidationError),
    #[error("config store unavailable: {0}")]
    Unavailable(String),
}
