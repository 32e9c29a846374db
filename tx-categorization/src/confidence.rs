//! Confidence Calculator (spec component C9)
//!
//! Blends the AI categorizer's own confidence with the historical pattern
//! learner's suggestion into one final score, rewarding agreement between
//! the two and penalising disagreement.

use crate::config::Config;
use crate::history::{CategorySuggestion, SimilarityMatch};
use tx_core::types::CategoryId;

/// Inputs to the confidence blend
pub struct Inputs<'a> {
    /// Confidence the AI Port returned for its own suggestion, `[0, 100]`
    pub ai_confidence: u8,
    /// Category the AI Port suggested
    pub ai_category_id: CategoryId,
    /// Every historical match found for this transaction
    pub historical_matches: &'a [SimilarityMatch],
    /// The historical learner's own aggregated suggestion, if any
    pub historical_suggestion: Option<&'a CategorySuggestion>,
}

/// The blended score and the components that produced it
#[derive(Debug, Clone, Copy)]
pub struct Breakdown {
    /// Normalised AI confidence component
    pub ai_score: f64,
    /// Damped historical-match component
    pub historical_score: f64,
    /// Points added for AI/historical agreement
    pub consensus_bonus: f64,
    /// Points subtracted for AI/historical disagreement
    pub conflict_penalty: f64,
    /// `clamp(ai_score * ai_weight + historical_score * historical_weight + consensus - conflict, 0, 100)`
    pub final_score: u8,
}

fn damping_factor(match_count: usize) -> f64 {
    match match_count {
        0 => 0.0,
        1 => 0.7,
        2 => 0.85,
        _ => 1.0,
    }
}

/// Blend the AI and historical signals for one transaction
pub fn calculate(inputs: &Inputs<'_>, config: &Config) -> Breakdown {
    let ai_score = inputs.ai_confidence as f64;

    // Theoretical max per match is 200 (manual-override doubling); average
    // against that ceiling so historical_score lands on the same [0,100]
    // scale as ai_score before damping pulls it down for thin evidence.
    let historical_score = if inputs.historical_matches.is_empty() {
        0.0
    } else {
        let average_weighted: f64 = inputs
            .historical_matches
            .iter()
            .map(|m| m.weighted_score)
            .sum::<f64>()
            / inputs.historical_matches.len() as f64;
        (average_weighted / 200.0 * 100.0) * damping_factor(inputs.historical_matches.len())
    };

    let mut consensus_bonus = 0.0;
    let mut conflict_penalty = 0.0;

    if inputs.historical_matches.len() >= config.min_matches {
        if let Some(suggestion) = inputs.historical_suggestion {
            let manual_backing = inputs
                .historical_matches
                .iter()
                .filter(|m| m.category_id == suggestion.category_id && m.manual_override)
                .count();

            if suggestion.category_id == inputs.ai_category_id {
                consensus_bonus = config.consensus_bonus + (manual_backing as f64 * 5.0).min(10.0);
            } else {
                let scale = if manual_backing > 0 { 1.5 } else { 1.0 };
                conflict_penalty = config.conflict_penalty * scale;
            }
        }
    }

    let final_score = (ai_score * config.ai_weight + historical_score * config.historical_weight
        + consensus_bonus
        - conflict_penalty)
        .clamp(0.0, 100.0);

    Breakdown {
        ai_score,
        historical_score,
        consensus_bonus,
        conflict_penalty,
        final_score: final_score.round() as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tx_core::types::TransactionId;

    fn matches_for(category_id: CategoryId, manual: bool, count: usize) -> Vec<SimilarityMatch> {
        (0..count)
            .map(|_| SimilarityMatch {
                transaction_id: TransactionId::new(),
                category_id,
                category_name: "Groceries".to_string(),
                match_type: crate::history::MatchType::Exact,
                score: 100.0,
                weighted_score: if manual { 200.0 } else { 100.0 },
                manual_override: manual,
            })
            .collect()
    }

    #[test]
    fn consensus_between_ai_and_history_adds_bonus() {
        let category = CategoryId::new();
        let matches = matches_for(category, true, 3);
        let suggestion = CategorySuggestion {
            category_id: category,
            category_name: "Groceries".to_string(),
            confidence: 90,
        };
        let inputs = Inputs {
            ai_confidence: 80,
            ai_category_id: category,
            historical_matches: &matches,
            historical_suggestion: Some(&suggestion),
        };
        let breakdown = calculate(&inputs, &Config::default());
        assert!(breakdown.consensus_bonus > 0.0);
        assert_eq!(breakdown.conflict_penalty, 0.0);
    }

    #[test]
    fn conflict_between_ai_and_history_applies_penalty() {
        let category_a = CategoryId::new();
        let category_b = CategoryId::new();
        let matches = matches_for(category_b, true, 3);
        let suggestion = CategorySuggestion {
            category_id: category_b,
            category_name: "Dining".to_string(),
            confidence: 90,
        };
        let inputs = Inputs {
            ai_confidence: 80,
            ai_category_id: category_a,
            historical_matches: &matches,
            historical_suggestion: Some(&suggestion),
        };
        let breakdown = calculate(&inputs, &Config::default());
        assert_eq!(breakdown.consensus_bonus, 0.0);
        // manual-backed conflict is scaled x1.5
        assert_eq!(breakdown.conflict_penalty, Config::default().conflict_penalty * 1.5);
    }

    #[test]
    fn below_min_matches_skips_consensus_logic_entirely() {
        let category = CategoryId::new();
        let matches = matches_for(category, false, 1);
        let suggestion = CategorySuggestion {
            category_id: category,
            category_name: "Groceries".to_string(),
            confidence: 90,
        };
        let inputs = Inputs {
            ai_confidence: 80,
            ai_category_id: category,
            historical_matches: &matches,
            historical_suggestion: Some(&suggestion),
        };
        let breakdown = calculate(&inputs, &Config::default());
        assert_eq!(breakdown.consensus_bonus, 0.0);
        assert_eq!(breakdown.conflict_penalty, 0.0);
    }

    #[test]
    fn final_score_is_clamped_to_one_hundred() {
        let category = CategoryId::new();
        let matches = matches_for(category, true, 3);
        let suggestion = CategorySuggestion {
            category_id: category,
            category_name: "Groceries".to_string(),
            confidence: 100,
        };
        let inputs = Inputs {
            ai_confidence: 100,
            ai_category_id: category,
            historical_matches: &matches,
            historical_suggestion: Some(&suggestion),
        };
        let breakdown = calculate(&inputs, &Config::default());
        assert_eq!(breakdown.final_score, 100);
    }
}
