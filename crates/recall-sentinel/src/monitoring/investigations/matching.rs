use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::RecallTarget;

const MODEL_EXACT_WEIGHT: f64 = 0.35;
const MODEL_PARTIAL_WEIGHT: f64 = 0.25;
/// A partial model hit needs at least this many characters to count; shorter
/// fragments match half the catalog.
const MODEL_PARTIAL_MIN_LEN: usize = 4;
const NAME_SIMILARITY_WEIGHT: f64 = 0.30;
const NAME_SIMILARITY_FLOOR: f64 = 0.5;
const TOKEN_OVERLAP_WEIGHT: f64 = 0.20;
const TOKEN_OVERLAP_FLOOR: f64 = 0.2;
const MANUFACTURER_WEIGHT: f64 = 0.10;
const SUSPICIOUS_PRICE_BOUND: f64 = 5.0;
const SUSPICIOUS_PRICE_PENALTY: f64 = 0.8;
const PRICE_PRESENT_BONUS: f64 = 0.05;

/// Match score plus the contributing rules in evaluation order, surfaced to
/// reviewers alongside the listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub score: f64,
    pub reasons: Vec<String>,
}

/// Score a candidate listing against a recall target. Weighted, additive
/// heuristic over normalized text; the result is capped to `[0, 1]`.
pub fn score_listing(
    target: &RecallTarget,
    title: &str,
    description: Option<&str>,
    price: Option<f64>,
) -> MatchOutcome {
    let mut score = 0.0;
    let mut reasons = Vec::new();

    let listing_text = match description {
        Some(description) => format!("{title} {description}"),
        None => title.to_string(),
    };
    let listing_lower = listing_text.to_lowercase();
    let listing_compact = compact(&listing_text);

    // Model numbers: an exact hit ends the model pass; otherwise the first
    // partial hit takes the weaker weight.
    let mut partial_model = None;
    for model in &target.model_numbers {
        let model_compact = compact(model);
        if model_compact.is_empty() {
            continue;
        }
        if listing_compact.contains(&model_compact) {
            score += MODEL_EXACT_WEIGHT;
            reasons.push(format!("Model number match: {model}"));
            partial_model = None;
            break;
        }
        if partial_model.is_none() && model_compact.len() >= MODEL_PARTIAL_MIN_LEN {
            let prefix = &model_compact[..MODEL_PARTIAL_MIN_LEN];
            if listing_compact.contains(prefix) {
                partial_model = Some(model.clone());
            }
        }
    }
    if let Some(model) = partial_model {
        score += MODEL_PARTIAL_WEIGHT;
        reasons.push(format!("Partial model number match: {model}"));
    }

    let name_lower = target.product_name.to_lowercase();
    let title_lower = title.to_lowercase();
    let similarity = strsim::normalized_levenshtein(&name_lower, &title_lower);
    if similarity > NAME_SIMILARITY_FLOOR {
        score += similarity * NAME_SIMILARITY_WEIGHT;
        reasons.push(format!("Product name similarity: {similarity:.2}"));
    }

    let name_tokens = tokens(&name_lower);
    let listing_tokens = tokens(&listing_lower);
    let overlap = jaccard(&name_tokens, &listing_tokens);
    if overlap > TOKEN_OVERLAP_FLOOR {
        score += overlap * TOKEN_OVERLAP_WEIGHT;
        reasons.push(format!("Keyword overlap: {overlap:.2}"));
    }

    if let Some(manufacturer) = &target.manufacturer {
        if !manufacturer.is_empty() && listing_lower.contains(&manufacturer.to_lowercase()) {
            score += MANUFACTURER_WEIGHT;
            reasons.push(format!("Manufacturer match: {manufacturer}"));
        }
    }

    if let Some(price) = price {
        if price > 0.0 {
            if price < SUSPICIOUS_PRICE_BOUND {
                score *= SUSPICIOUS_PRICE_PENALTY;
                reasons.push(format!("Suspiciously low price: {price:.2}"));
            }
            score += PRICE_PRESENT_BONUS;
            reasons.push("Price listed".to_string());
        }
    }

    MatchOutcome {
        score: score.min(1.0),
        reasons,
    }
}

/// Lowercased alphanumerics only; separator and casing noise in model
/// numbers ("ABC-123" vs "abc123") must not defeat a verbatim match.
fn compact(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

fn tokens(value: &str) -> BTreeSet<String> {
    value
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}
