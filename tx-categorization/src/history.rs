//! Historical Pattern Learner (spec component C8)
//!
//! Finds categorised transactions similar to a target one, by exact or
//! fuzzy description match and by amount proximity, and aggregates them into
//! a category suggestion with a confidence score.

use crate::config::Config;
use rust_decimal::prelude::ToPrimitive;
use std::collections::{HashMap, HashSet};
use tx_core::types::{CategoryId, ProcessingStatus, Transaction, TransactionId};

/// How a historical transaction matched the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchType {
    /// Amount-range match only, the weakest signal
    AmountRange,
    /// Token-set Jaccard similarity above the fuzzy threshold
    Fuzzy,
    /// Identical normalized description
    Exact,
}

/// One historical transaction matched against the target
#[derive(Debug, Clone)]
pub struct SimilarityMatch {
    /// The matching historical transaction
    pub transaction_id: TransactionId,
    /// Its effective category
    pub category_id: CategoryId,
    /// That category's name
    pub category_name: String,
    /// How it matched
    pub match_type: MatchType,
    /// Raw match score in `[0, 100]`
    pub score: f64,
    /// `score`, doubled when the candidate carries a manual override
    pub weighted_score: f64,
    /// Whether the candidate carries a manual override
    pub manual_override: bool,
}

/// A category suggestion aggregated from a set of similarity matches
#[derive(Debug, Clone)]
pub struct CategorySuggestion {
    /// Suggested category
    pub category_id: CategoryId,
    /// That category's name
    pub category_name: String,
    /// Confidence in `[0, 100]`
    pub confidence: u8,
}

fn tokenize(description: &str) -> HashSet<&str> {
    description.split_whitespace().collect()
}

fn jaccard(a: &str, b: &str) -> f64 {
    let ta = tokenize(a);
    let tb = tokenize(b);
    if ta.is_empty() && tb.is_empty() {
        return 1.0;
    }
    let intersection = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Find historical transactions similar to `target`
///
/// `history` is the candidate pool; the caller is responsible for already
/// restricting it to `CATEGORISED` transactions within `lookback_days` of
/// `target.transaction_date` (that's a Result Store query, not this
/// function's job).
pub fn find_similar(
    target: &Transaction,
    history: &[Transaction],
    config: &Config,
    limit: usize,
) -> Vec<SimilarityMatch> {
    let target_amount = target.gbp_amount_value.to_f64().unwrap_or(0.0).abs();

    let mut best_by_candidate: HashMap<TransactionId, SimilarityMatch> = HashMap::new();

    for candidate in history {
        if candidate.processing_status != ProcessingStatus::Categorised {
            continue;
        }
        let Some(category_id) = candidate.effective_category_id() else {
            continue;
        };
        let category_name = candidate
            .effective_category_name()
            .unwrap_or_default()
            .to_string();

        let best_for_candidate = score_candidate(target, candidate, target_amount, config).map(
            |(match_type, score)| {
                let manual_override = candidate.has_manual_override();
                let weighted_score = if manual_override { score * 2.0 } else { score };
                SimilarityMatch {
                    transaction_id: candidate.id,
                    category_id,
                    category_name,
                    match_type,
                    score,
                    weighted_score,
                    manual_override,
                }
            },
        );

        if let Some(candidate_match) = best_for_candidate {
            best_by_candidate
                .entry(candidate.id)
                .and_modify(|existing| {
                    if candidate_match.match_type > existing.match_type {
                        *existing = candidate_match.clone();
                    }
                })
                .or_insert(candidate_match);
        }
    }

    let mut matches: Vec<SimilarityMatch> = best_by_candidate.into_values().collect();
    matches.sort_by(|a, b| b.weighted_score.partial_cmp(&a.weighted_score).unwrap());
    matches.truncate(limit);
    matches
}

fn score_candidate(
    target: &Transaction,
    candidate: &Transaction,
    target_amount: f64,
    config: &Config,
) -> Option<(MatchType, f64)> {
    if target.description == candidate.description {
        return Some((MatchType::Exact, 100.0));
    }

    let similarity = jaccard(&target.description, &candidate.description);
    if similarity * 100.0 >= config.fuzzy_threshold as f64 {
        return Some((MatchType::Fuzzy, similarity * 100.0));
    }

    if target_amount > 0.0 {
        let candidate_amount = candidate.gbp_amount_value.to_f64().unwrap_or(0.0).abs();
        let relative_diff = (target_amount - candidate_amount).abs() / target_amount;
        if relative_diff <= config.amount_tolerance {
            let score = (1.0 - relative_diff / config.amount_tolerance) * 100.0;
            return Some((MatchType::AmountRange, score));
        }
    }

    None
}

/// Aggregate weighted scores by category and return the strongest one
///
/// Confidence blends the winning category's share of total weighted score,
/// its average match quality, and a +10 bonus when any of its matches carry
/// a manual override; the result is capped to `[0, 100]`.
pub fn suggest_category(matches: &[SimilarityMatch]) -> Option<CategorySuggestion> {
    if matches.is_empty() {
        return None;
    }

    let mut totals: HashMap<CategoryId, (f64, f64, usize, bool, String)> = HashMap::new();
    let grand_total: f64 = matches.iter().map(|m| m.weighted_score).sum();

    for m in matches {
        let entry = totals
            .entry(m.category_id)
            .or_insert((0.0, 0.0, 0, false, m.category_name.clone()));
        entry.0 += m.weighted_score;
        entry.1 += m.score;
        entry.2 += 1;
        entry.3 |= m.manual_override;
    }

    let (winning_category, (weighted_total, score_total, count, has_manual, name)) = totals
        .into_iter()
        .max_by(|a, b| a.1 .0.partial_cmp(&b.1 .0).unwrap())?;

    let agreement_ratio = if grand_total > 0.0 {
        weighted_total / grand_total
    } else {
        0.0
    };
    let average_quality = score_total / count as f64;
    let manual_bonus = if has_manual { 10.0 } else { 0.0 };

    let confidence = (agreement_ratio * 50.0 + average_quality * 0.5 + manual_bonus)
        .clamp(0.0, 100.0);

    Some(CategorySuggestion {
        category_id: winning_category,
        category_name: name,
        confidence: confidence.round() as u8,
    })
}
