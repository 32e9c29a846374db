//! AI Categorizer (spec component C10)
//!
//! Sends eligible transactions to the AI categorization port in batches,
//! biasing each batch with historical context from C8, and writes the
//! result (or a failure) back onto each transaction.

use crate::config::Config;
use crate::confidence::{self, Inputs};
use crate::history;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tx_core::status;
use tx_core::types::{Category, CategoryId, ProcessingStatus, Transaction, TransactionId};
use tx_ports::types::{
    AiCategorizationRequest, AiCategorizationResult, AiCategoryInfo, AiSimilarTransaction,
    AiTransactionRequest,
};
use tx_ports::{retry, AICategorizationPort, RetryOutcome, RetryPolicy};

/// How many historical matches feed the confidence blend for one
/// transaction, independent of `context_size` (which caps the AI's own
/// prompt context instead)
const HISTORY_MATCH_LIMIT: usize = 20;

/// Categorizes batches of normalised transactions against the AI Port
pub struct Categorizer<'a> {
    port: &'a (dyn AICategorizationPort + Send + Sync),
    config: &'a Config,
    policy: RetryPolicy,
}

impl<'a> Categorizer<'a> {
    /// Build a categorizer around `port`, with a retry policy derived from
    /// `config`'s backoff settings
    pub fn new(port: &'a (dyn AICategorizationPort + Send + Sync), config: &'a Config) -> Self {
        let policy = RetryPolicy {
            max_attempts: config.max_attempts,
            base_delay: std::time::Duration::from_secs(config.backoff_base_seconds),
            cap: std::time::Duration::from_secs(config.backoff_cap_seconds),
            ..RetryPolicy::default()
        };
        Self { port, config, policy }
    }

    /// Categorize every eligible transaction in `transactions`
    ///
    /// `history` is the candidate pool the historical pattern learner draws
    /// context from; the caller restricts it to `CATEGORISED` rows within
    /// `lookback_days` (a Result Store query, not this function's job).
    /// Transactions already carrying a manual override, or (absent
    /// `allow_recategorisation`) an AI assignment, pass through unchanged.
    /// Returns every transaction passed in, eligible or not, with eligible
    /// ones moved to `Categorised` or `Error`.
    pub async fn categorize(
        &self,
        transactions: Vec<Transaction>,
        active_categories: &[Category],
        history: &[Transaction],
        now: DateTime<Utc>,
    ) -> crate::Result<Vec<Transaction>> {
        let active: Vec<&Category> = active_categories.iter().filter(|c| c.is_active).collect();
        if active.is_empty() {
            return Err(crate::Error::NoActiveCategories);
        }
        for tx in &transactions {
            if tx.processing_status == ProcessingStatus::Unprocessed {
                return Err(crate::Error::NotNormalised(tx.id));
            }
        }

        let category_infos: Vec<AiCategoryInfo> = active
            .iter()
            .map(|c| AiCategoryInfo {
                id: c.id,
                name: c.name.clone(),
                description: c.description.clone(),
                examples: c.examples.clone(),
            })
            .collect();

        let history_by_id: HashMap<TransactionId, &Transaction> =
            history.iter().map(|t| (t.id, t)).collect();

        let eligible_indices: Vec<usize> = transactions
            .iter()
            .enumerate()
            .filter(|(_, tx)| {
                tx.category_manual_id.is_none()
                    && (tx.category_ai_id.is_none() || self.config.allow_recategorisation)
            })
            .map(|(i, _)| i)
            .collect();

        let mut transactions = transactions;

        for batch_indices in eligible_indices.chunks(self.config.batch_size) {
            let batch_requests: Vec<AiTransactionRequest> = batch_indices
                .iter()
                .map(|&i| {
                    let tx = &transactions[i];
                    AiTransactionRequest {
                        id: tx.id,
                        description: tx.description.clone(),
                        gbp_amount: tx.gbp_amount_value,
                        transaction_date: tx.transaction_date,
                    }
                })
                .collect();

            let context = self.build_context(batch_indices, &transactions, history, &history_by_id);

            let request = AiCategorizationRequest {
                transactions: batch_requests,
                categories: category_infos.clone(),
                context,
            };

            let outcome = retry(|| self.port.categorize_batch(request.clone()), &self.policy).await;

            match outcome {
                Ok(batch_results) => {
                    let mut by_id: HashMap<TransactionId, AiCategorizationResult> =
                        batch_results.into_iter().map(|r| (r.transaction_id, r)).collect();
                    for &i in batch_indices {
                        let tx = &mut transactions[i];
                        match by_id.remove(&tx.id) {
                            Some(result) if result.confidence_score <= 100 => {
                                let historical_matches =
                                    history::find_similar(tx, history, self.config, HISTORY_MATCH_LIMIT);
                                let suggestion = history::suggest_category(&historical_matches);
                                let breakdown = confidence::calculate(
                                    &Inputs {
                                        ai_confidence: result.confidence_score,
                                        ai_category_id: result.category_id,
                                        historical_matches: &historical_matches,
                                        historical_suggestion: suggestion.as_ref(),
                                    },
                                    self.config,
                                );
                                tx.category_ai_id = Some(result.category_id);
                                tx.category_ai_name = Some(result.category_name);
                                tx.category_confidence_score = Some(breakdown.final_score);
                                tx.error_message = None;
                                status::mark_categorised(tx, now)?;
                            }
                            Some(_) => {
                                status::mark_error(
                                    tx,
                                    "AI categorization returned an out-of-range confidence score",
                                    now,
                                )?;
                            }
                            None => {
                                status::mark_error(tx, "No categorization result", now)?;
                            }
                        }
                    }
                }
                Err(outcome) => {
                    let message = describe_failure(&outcome);
                    for &i in batch_indices {
                        status::mark_error(&mut transactions[i], message.clone(), now)?;
                    }
                }
            }
        }

        Ok(transactions)
    }

    /// Historical context for one batch: every distinct `(description,
    /// category)` pair found across the batch's transactions, capped at
    /// `context_size * batch_size`.
    fn build_context(
        &self,
        batch_indices: &[usize],
        transactions: &[Transaction],
        history: &[Transaction],
        history_by_id: &HashMap<TransactionId, &Transaction>,
    ) -> Option<Vec<AiSimilarTransaction>> {
        if history.is_empty() {
            return None;
        }

        let limit = self.config.context_size * batch_indices.len().max(1);
        let mut seen: HashSet<(String, CategoryId)> = HashSet::new();
        let mut context = Vec::new();

        'batch: for &i in batch_indices {
            let target = &transactions[i];
            let matches = history::find_similar(target, history, self.config, self.config.context_size);
            for m in matches {
                let Some(historical) = history_by_id.get(&m.transaction_id) else {
                    continue;
                };
                let key = (historical.description.clone(), m.category_id);
                if !seen.insert(key) {
                    continue;
                }
                context.push(AiSimilarTransaction {
                    description: historical.description.clone(),
                    category_id: m.category_id,
                    category_name: m.category_name.clone(),
                    was_manual_override: m.manual_override,
                    confidence_score: historical.category_confidence_score,
                });
                if context.len() >= limit {
                    break 'batch;
                }
            }
        }

        if context.is_empty() {
            None
        } else {
            Some(context)
        }
    }
}

fn describe_failure(outcome: &RetryOutcome<tx_ports::PortError>) -> String {
    match outcome {
        RetryOutcome::Exhausted { attempts, last } => {
            format!("AI categorization port failed after {attempts} attempts: {last}")
        }
        RetryOutcome::NonRetryable(last) => {
            format!("AI categorization port failed: {last}")
        }
    }
}
