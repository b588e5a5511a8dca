use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::disbursement::{DisbursementClient, PayoutReceipt, PayoutRequest};
use crate::error::PaymentError;

/// Scripted outcome for one payout call. An empty script accepts.
#[derive(Clone, Debug)]
pub enum PayoutOutcome {
    Accept,
    Reject(String),
    Timeout,
    /// Session token refused; the next call proceeds normally after refresh.
    SessionExpired,
    /// Accept after a delay; exercises completion despite caller cancellation.
    DelayedAccept(Duration),
}

#[derive(Default)]
struct Inner {
    script: Mutex<VecDeque<PayoutOutcome>>,
    payout_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
}

/// Deterministic disbursement double with call counters.
#[derive(Clone, Default)]
pub struct SimulatedDisbursement {
    inner: Arc<Inner>,
}

impl SimulatedDisbursement {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enqueue(&self, outcome: PayoutOutcome) {
        self.inner.script.lock().await.push_back(outcome);
    }

    pub fn payout_calls(&self) -> usize {
        self.inner.payout_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.inner.refresh_calls.load(Ordering::SeqCst)
    }

    fn receipt(request: &PayoutRequest) -> PayoutReceipt {
        PayoutReceipt {
            provider_reference: format!("AG_{}", request.transaction_id.simple()),
        }
    }
}

#[async_trait]
impl DisbursementClient for SimulatedDisbursement {
    async fn refresh_session(&self) -> Result<(), PaymentError> {
        self.inner.refresh_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn payout(&self, request: &PayoutRequest) -> Result<PayoutReceipt, PaymentError> {
        self.inner.payout_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .inner
            .script
            .lock()
            .await
            .pop_front()
            .unwrap_or(PayoutOutcome::Accept);

        match outcome {
            PayoutOutcome::Accept => Ok(Self::receipt(request)),
            PayoutOutcome::Reject(reason) => Err(PaymentError::PayoutRejected(reason)),
            PayoutOutcome::Timeout => Err(PaymentError::PayoutTimeout(
                "no confirmation within wait window".to_string(),
            )),
            PayoutOutcome::SessionExpired => {
                Err(PaymentError::AuthFailure("session token expired".to_string()))
            }
            PayoutOutcome::DelayedAccept(delay) => {
                tokio::time::sleep(delay).await;
                Ok(Self::receipt(request))
            }
        }
    }
}
