use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::TransactionStatus;
use crate::money::Currency;

#[derive(Error, Debug, Serialize)]
pub enum PaymentError {
    /// Input rejected before any external call or ledger write
    #[error("Invalid input for `{0}`: {1}")]
    InvalidInput(String, String),

    /// The (source, target) pair has no configured rate
    #[error("Currency pair {0}/{1} is not supported")]
    UnsupportedCurrencyPair(Currency, Currency),

    /// Amounts in different currencies cannot be combined
    #[error("Cannot combine amounts in {0} and {1}")]
    CurrencyMismatch(Currency, Currency),

    #[error("Amount out of representable range")]
    AmountOutOfRange,

    /// Transient connector failure; safe to retry
    #[error("Connector unavailable: {0}")]
    ConnectorUnavailable(String),

    /// Connector refused the transfer; retrying will not help
    #[error("Connector rejected transfer: {0}")]
    ConnectorRejected(String),

    /// Disbursement session was refused; refreshed and retried once, then terminal
    #[error("Disbursement authentication failed: {0}")]
    AuthFailure(String),

    #[error("Payout rejected: {0}")]
    PayoutRejected(String),

    /// The rail may have accepted the payout but never confirmed it; the
    /// external outcome is unknown until reconciled out-of-band
    #[error("Payout timed out awaiting confirmation: {0}")]
    PayoutTimeout(String),

    #[error("Transaction {0} not found")]
    TransactionNotFound(Uuid),

    /// Compare-and-set transition refused; terminal states never change
    #[error("Invalid transition for transaction {id}: {from} -> {to}")]
    InvalidTransition {
        id: Uuid,
        from: TransactionStatus,
        to: TransactionStatus,
    },

    #[error("Transaction {0} is not awaiting reconciliation")]
    NotAwaitingReconciliation(Uuid),

    /// Ledger failure; always surfaced, never swallowed
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
