use super::config::{ComparisonOp, RiskClassificationConfig, ScoreRule};
use super::incident::Incident;
use super::{RuleKind, ScoreComponent};

/// First enabled force-level rule whose predicate matches, in declared config
/// order. Ties between overlapping force rules are a configuration
/// responsibility; the engine takes the first match.
pub(crate) fn find_forced_level<'a>(
    incident: &Incident,
    config: &'a RiskClassificationConfig,
) -> Option<&'a str> {
    config
        .score_rules
        .iter()
        .filter(|rule| rule.enabled)
        .filter(|rule| rule.force_level.is_some())
        .find(|rule| predicate_matches(rule, incident.stat(&rule.field_path)))
        .and_then(|rule| rule.force_level.as_deref())
}

/// Passes 2-4 of the scoring algorithm: field rules, keyword rules, and the
/// units-affected step function. Returns the audit trail alongside the raw
/// (uncapped) total.
pub(crate) fn accumulate_score(
    incident: &Incident,
    config: &RiskClassificationConfig,
) -> (Vec<ScoreComponent>, f64) {
    let mut components = Vec::new();
    let mut total = 0.0;

    for rule in config
        .score_rules
        .iter()
        .filter(|rule| rule.enabled && rule.force_level.is_none())
    {
        let value = incident.stat(&rule.field_path);
        if !predicate_matches(rule, value) {
            continue;
        }

        let mut contribution = rule.base_contribution;
        if let (Some(per_unit), Some(value)) = (rule.per_unit_contribution, value) {
            contribution += per_unit * value;
        }
        if let Some(cap) = rule.max_contribution {
            contribution = contribution.min(cap);
        }

        components.push(ScoreComponent {
            kind: RuleKind::Field,
            contribution,
            notes: format!("field rule on '{}' matched", rule.field_path),
        });
        total += contribution;
    }

    let hazard_text = incident.hazard_text();
    for rule in config.keyword_rules.iter().filter(|rule| rule.enabled) {
        let hits = rule
            .keywords
            .iter()
            .filter(|keyword| hazard_text.contains(&keyword.to_lowercase()))
            .count();
        if hits == 0 {
            continue;
        }

        let contribution = (hits as f64 * rule.score_per_match).min(rule.max_contribution);
        components.push(ScoreComponent {
            kind: RuleKind::Keyword,
            contribution,
            notes: format!("{hits} hazard keyword hit(s)"),
        });
        total += contribution;
    }

    // Step function: only the highest bracket at or below the unit count.
    let units = incident.units_affected();
    let bracket = config
        .quantity_thresholds
        .iter()
        .filter(|step| step.threshold <= units)
        .max_by(|a, b| a.threshold.total_cmp(&b.threshold));
    if let Some(step) = bracket {
        components.push(ScoreComponent {
            kind: RuleKind::Quantity,
            contribution: step.score_contribution,
            notes: format!("units affected >= {}", step.threshold),
        });
        total += step.score_contribution;
    }

    (components, total)
}

/// A predicate against a missing field never matches, with the sole exception
/// of `is_null`, which matches precisely when the field is absent.
fn predicate_matches(rule: &ScoreRule, value: Option<f64>) -> bool {
    match rule.operator {
        ComparisonOp::IsNull => return value.is_none(),
        ComparisonOp::IsNotNull => return value.is_some(),
        _ => {}
    }

    let (Some(value), Some(expected)) = (value, rule.comparison_value) else {
        return false;
    };
    match rule.operator {
        ComparisonOp::Gt => value > expected,
        ComparisonOp::Gte => value >= expected,
        ComparisonOp::Lt => value < expected,
        ComparisonOp::Lte => value <= expected,
        ComparisonOp::Eq => value == expected,
        ComparisonOp::Ne => value != expected,
        ComparisonOp::IsNull | ComparisonOp::IsNotNull => false,
    }
}
