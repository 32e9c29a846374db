//! Wire-shape types exchanged with external collaborators (spec §6)
//!
//! These are `serde`-derived request/response structs; no concrete HTTP
//! client lives here; one stays an external collaborator.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tx_core::types::{CategoryId, TransactionId};

/// Filter applied by `ResultStore::query`
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Restrict to transactions with this processing status
    pub status: Option<tx_core::types::ProcessingStatus>,
    /// Restrict to transactions with (or without) a manual override
    pub has_manual_override: Option<bool>,
    /// Restrict to transactions on or after this instant
    pub from: Option<DateTime<Utc>>,
    /// Restrict to transactions before this instant
    pub to: Option<DateTime<Utc>>,
}

/// Field-level changes applied to one transaction by `ResultStore::update`
#[derive(Debug, Clone, Default)]
pub struct TransactionFieldChanges {
    /// New AI category assignment
    pub category_ai_id: Option<Option<CategoryId>>,
    /// New AI category name
    pub category_ai_name: Option<Option<String>>,
    /// New AI confidence score
    pub category_confidence_score: Option<Option<u8>>,
    /// New manual category assignment
    pub category_manual_id: Option<Option<CategoryId>>,
    /// New manual category name
    pub category_manual_name: Option<Option<String>>,
    /// New processing status
    pub processing_status: Option<tx_core::types::ProcessingStatus>,
    /// New error message
    pub error_message: Option<Option<String>>,
}

/// One transaction as sent to the AI categorization port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiTransactionRequest {
    /// Transaction id
    pub id: TransactionId,
    /// Normalized description
    pub description: String,
    /// Amount in GBP
    pub gbp_amount: Decimal,
    /// When the transaction occurred
    pub transaction_date: DateTime<Utc>,
}

/// One active category offered to the AI categorization port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiCategoryInfo {
    /// Category id
    pub id: CategoryId,
    /// Category name
    pub name: String,
    /// Category description
    pub description: String,
    /// Example descriptions
    pub examples: Vec<String>,
}

/// One historical match offered as context to the AI categorization port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiSimilarTransaction {
    /// Description of the historical transaction
    pub description: String,
    /// Category it was assigned
    pub category_id: CategoryId,
    /// Name of that category
    pub category_name: String,
    /// Whether that assignment was a manual override
    pub was_manual_override: bool,
    /// Confidence score it was assigned, if known
    pub confidence_score: Option<u8>,
}

/// Full request payload sent to the AI categorization port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiCategorizationRequest {
    /// Transactions to categorize
    pub transactions: Vec<AiTransactionRequest>,
    /// Categories the AI may choose among
    pub categories: Vec<AiCategoryInfo>,
    /// Optional historical context to bias the model
    pub context: Option<Vec<AiSimilarTransaction>>,
}

/// One result returned by the AI categorization port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiCategorizationResult {
    /// Which transaction this result is for
    pub transaction_id: TransactionId,
    /// Assigned category
    pub category_id: CategoryId,
    /// Assigned category's name
    pub category_name: String,
    /// Confidence score, expected in `[0, 100]`
    pub confidence_score: u8,
}
