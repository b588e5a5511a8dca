use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::PaymentError;
use crate::models::{FailureKind, ReconciliationState, Transaction, TransactionStatus};
use crate::money::Money;

/// Fields for a new ledger row. The ledger assigns id, status and timestamps.
#[derive(Clone, Debug)]
pub struct NewTransaction {
    pub client_id: String,
    pub freelancer_id: String,
    pub source_amount: Money,
    pub destination_amount: Money,
    pub exchange_rate: Decimal,
    pub idempotency_key: Option<String>,
}

/// Outcome of [`Ledger::create`]: a fresh row, or the row a previously-seen
/// idempotency key already maps to.
#[derive(Clone, Debug)]
pub enum CreateOutcome {
    Created(Transaction),
    Existing(Transaction),
}

/// Field updates applied together with a state transition. `None` leaves the
/// stored value untouched.
#[derive(Clone, Debug, Default)]
pub struct TransitionFields {
    pub failure: Option<FailureKind>,
    pub connector_reference: Option<String>,
    pub external_reference: Option<String>,
    pub reconciliation: Option<ReconciliationState>,
}

/// The true external outcome of a payout that previously timed out.
#[derive(Clone, Debug)]
pub enum ReconciledOutcome {
    Paid { provider_reference: String },
    Unpaid,
}

/// Durable record of transactions and their lifecycle state. All mutating
/// operations on a single transaction are atomic with respect to each other.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Insert a new row in `processing`. When the idempotency key already
    /// maps to a row, that row is returned instead of creating a duplicate.
    async fn create(&self, new: NewTransaction) -> Result<CreateOutcome, PaymentError>;

    /// Compare-and-set transition: succeeds only while the current status is
    /// in `from`. Terminal states never transition again.
    async fn transition(
        &self,
        id: Uuid,
        from: &[TransactionStatus],
        to: TransactionStatus,
        fields: TransitionFields,
    ) -> Result<Transaction, PaymentError>;

    async fn get(&self, id: Uuid) -> Result<Transaction, PaymentError>;

    /// Newest-first, bounded.
    async fn list(&self, limit: usize) -> Result<Vec<Transaction>, PaymentError>;

    /// Record the reconciled outcome on a row whose reconciliation state is
    /// pending. Does not change `status`.
    async fn resolve_reconciliation(
        &self,
        id: Uuid,
        outcome: ReconciledOutcome,
    ) -> Result<Transaction, PaymentError>;
}

pub mod in_memory;
