use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::TransactionStatus;

// Request structs for JSON payloads
#[derive(Deserialize)]
pub struct QuoteRequest {
    pub source_currency: String,
    pub source_amount: Decimal,
    pub target_currency: Option<String>,
}

#[derive(Deserialize)]
pub struct PaymentRequest {
    pub client_id: String,
    pub freelancer_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub recipient_phone: String,
    pub idempotency_key: Option<String>,
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub status: TransactionStatus,
    pub transaction_id: Uuid,
    pub message: String,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackOutcome {
    Paid,
    Unpaid,
}

/// Posted by the webhook translation layer when the rail reports the true
/// outcome of a payout that timed out.
#[derive(Deserialize)]
pub struct DisbursementCallback {
    pub transaction_id: Uuid,
    pub outcome: CallbackOutcome,
    pub provider_reference: Option<String>,
}

// Error response struct
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
