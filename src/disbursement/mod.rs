use async_trait::async_trait;
use uuid::Uuid;

use crate::error::PaymentError;
use crate::money::Money;

#[derive(Clone, Debug)]
pub struct PayoutRequest {
    pub transaction_id: Uuid,
    pub amount: Money,
    pub recipient_phone: String,
}

#[derive(Clone, Debug)]
pub struct PayoutReceipt {
    /// Reference assigned by the disbursement provider.
    pub provider_reference: String,
}

/// Capability trait over the mobile-money payout rail.
///
/// Failure contract: [`PaymentError::AuthFailure`] means the session was
/// refused (refresh and retry once); [`PaymentError::PayoutRejected`] is a
/// clean terminal rejection; [`PaymentError::PayoutTimeout`] means the rail
/// may have accepted the payout but never confirmed it.
#[async_trait]
pub trait DisbursementClient: Send + Sync {
    /// Drop the cached session and authenticate again.
    async fn refresh_session(&self) -> Result<(), PaymentError>;

    async fn payout(&self, request: &PayoutRequest) -> Result<PayoutReceipt, PaymentError>;
}

pub mod mpesa;
pub mod simulated;
