use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::connector::{ConnectorClient, TransferReceipt, TransferRequest};
use crate::error::PaymentError;

/// Scripted outcome for one transfer call. An empty script delivers.
#[derive(Clone, Debug)]
pub enum TransferOutcome {
    Deliver,
    Unavailable(String),
    Rejected(String),
    /// Never responds; exercises call timeouts and caller cancellation.
    Stall,
}

#[derive(Default)]
struct Inner {
    script: Mutex<VecDeque<TransferOutcome>>,
    calls: AtomicUsize,
}

/// Deterministic connector double: settles exactly the requested destination
/// amount, consuming scripted outcomes in order.
#[derive(Clone, Default)]
pub struct SimulatedConnector {
    inner: Arc<Inner>,
}

impl SimulatedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enqueue(&self, outcome: TransferOutcome) {
        self.inner.script.lock().await.push_back(outcome);
    }

    pub fn transfer_calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectorClient for SimulatedConnector {
    async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, PaymentError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .inner
            .script
            .lock()
            .await
            .pop_front()
            .unwrap_or(TransferOutcome::Deliver);

        match outcome {
            TransferOutcome::Deliver => Ok(TransferReceipt {
                provider_id: format!("ilp-{}", request.transaction_id.simple()),
                settled_amount: request.destination_amount,
            }),
            TransferOutcome::Unavailable(reason) => Err(PaymentError::ConnectorUnavailable(reason)),
            TransferOutcome::Rejected(reason) => Err(PaymentError::ConnectorRejected(reason)),
            TransferOutcome::Stall => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(PaymentError::ConnectorUnavailable("stalled".to_string()))
            }
        }
    }
}
