use async_trait::async_trait;
use uuid::Uuid;

use crate::error::PaymentError;
use crate::money::Money;

/// One asset transfer/exchange through the settlement network. The
/// transaction id doubles as the idempotency key on the wire.
#[derive(Clone, Debug)]
pub struct TransferRequest {
    pub transaction_id: Uuid,
    pub source_amount: Money,
    /// Amount the connector is expected to deliver, in the target currency.
    pub destination_amount: Money,
    /// Where the converted value lands; a phone-linked wallet address.
    pub destination_account: String,
}

#[derive(Clone, Debug)]
pub struct TransferReceipt {
    pub provider_id: String,
    /// What the connector actually delivered; the payout leg disburses this.
    pub settled_amount: Money,
}

/// Capability trait over the settlement network.
///
/// Failure contract: network/timeout problems surface as
/// [`PaymentError::ConnectorUnavailable`] (retryable), protocol rejections as
/// [`PaymentError::ConnectorRejected`] (terminal).
#[async_trait]
pub trait ConnectorClient: Send + Sync {
    async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, PaymentError>;
}

pub mod open_payments;
pub mod simulated;
