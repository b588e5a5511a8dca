use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Processing,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Failed)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Processing => "processing",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Which leg failed and how. Recorded alongside `failed` so a timed-out
/// payout is distinguishable from a clean rejection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ConnectorUnavailable,
    ConnectorRejected,
    AuthFailure,
    PayoutRejected,
    PayoutTimeout,
    /// Caller cancelled before the connector leg committed.
    Aborted,
}

/// Out-of-band resolution state for payouts whose external outcome was not
/// confirmed synchronously. The transaction status itself never leaves a
/// terminal state; this field carries what reconciliation later learned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReconciliationState {
    NotRequired,
    Pending,
    ConfirmedPaid { provider_reference: String },
    ConfirmedUnpaid,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub client_id: String,
    pub freelancer_id: String,
    pub source_amount: Money,
    pub destination_amount: Money,
    pub exchange_rate: Decimal,
    pub status: TransactionStatus,
    pub failure: Option<FailureKind>,
    pub reconciliation: ReconciliationState,
    /// Provider id reported by the connector leg.
    pub connector_reference: Option<String>,
    /// Reference assigned by the disbursement provider.
    pub external_reference: Option<String>,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
