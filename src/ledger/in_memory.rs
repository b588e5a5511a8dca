use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::PaymentError;
use crate::ledger::{CreateOutcome, Ledger, NewTransaction, ReconciledOutcome, TransitionFields};
use crate::models::{ReconciliationState, Transaction, TransactionStatus};

#[derive(Default)]
struct LedgerState {
    rows: HashMap<Uuid, Transaction>,
    // idempotency key -> transaction id
    idempotency: HashMap<String, Uuid>,
    // insertion order, newest last
    order: Vec<Uuid>,
}

/// In-memory ledger. A single lock over all state makes create/transition/
/// reconciliation mutually atomic; clones share the same underlying store.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn create(&self, new: NewTransaction) -> Result<CreateOutcome, PaymentError> {
        let mut state = self.state.lock().await;

        if let Some(key) = &new.idempotency_key {
            if let Some(existing_id) = state.idempotency.get(key) {
                let row = state
                    .rows
                    .get(existing_id)
                    .cloned()
                    .ok_or_else(|| PaymentError::Storage("idempotency index out of sync".to_string()))?;
                return Ok(CreateOutcome::Existing(row));
            }
        }

        let now = Utc::now();
        let row = Transaction {
            id: Uuid::new_v4(),
            client_id: new.client_id,
            freelancer_id: new.freelancer_id,
            source_amount: new.source_amount,
            destination_amount: new.destination_amount,
            exchange_rate: new.exchange_rate,
            status: TransactionStatus::Processing,
            failure: None,
            reconciliation: ReconciliationState::NotRequired,
            connector_reference: None,
            external_reference: None,
            idempotency_key: new.idempotency_key.clone(),
            created_at: now,
            updated_at: now,
        };

        if let Some(key) = new.idempotency_key {
            state.idempotency.insert(key, row.id);
        }
        state.order.push(row.id);
        state.rows.insert(row.id, row.clone());

        Ok(CreateOutcome::Created(row))
    }

    async fn transition(
        &self,
        id: Uuid,
        from: &[TransactionStatus],
        to: TransactionStatus,
        fields: TransitionFields,
    ) -> Result<Transaction, PaymentError> {
        let mut state = self.state.lock().await;
        let row = state
            .rows
            .get_mut(&id)
            .ok_or(PaymentError::TransactionNotFound(id))?;

        // terminal states never transition, whatever the caller expected
        if row.status.is_terminal() || !from.contains(&row.status) {
            return Err(PaymentError::InvalidTransition {
                id,
                from: row.status,
                to,
            });
        }

        row.status = to;
        if let Some(failure) = fields.failure {
            row.failure = Some(failure);
        }
        if let Some(reference) = fields.connector_reference {
            row.connector_reference = Some(reference);
        }
        if let Some(reference) = fields.external_reference {
            row.external_reference = Some(reference);
        }
        if let Some(reconciliation) = fields.reconciliation {
            row.reconciliation = reconciliation;
        }
        row.updated_at = Utc::now();

        Ok(row.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Transaction, PaymentError> {
        let state = self.state.lock().await;
        state
            .rows
            .get(&id)
            .cloned()
            .ok_or(PaymentError::TransactionNotFound(id))
    }

    async fn list(&self, limit: usize) -> Result<Vec<Transaction>, PaymentError> {
        let state = self.state.lock().await;
        Ok(state
            .order
            .iter()
            .rev()
            .take(limit)
            .filter_map(|id| state.rows.get(id).cloned())
            .collect())
    }

    async fn resolve_reconciliation(
        &self,
        id: Uuid,
        outcome: ReconciledOutcome,
    ) -> Result<Transaction, PaymentError> {
        let mut state = self.state.lock().await;
        let row = state
            .rows
            .get_mut(&id)
            .ok_or(PaymentError::TransactionNotFound(id))?;

        if row.reconciliation != ReconciliationState::Pending {
            return Err(PaymentError::NotAwaitingReconciliation(id));
        }

        match outcome {
            ReconciledOutcome::Paid { provider_reference } => {
                row.external_reference = Some(provider_reference.clone());
                row.reconciliation = ReconciliationState::ConfirmedPaid { provider_reference };
            }
            ReconciledOutcome::Unpaid => {
                row.reconciliation = ReconciliationState::ConfirmedUnpaid;
            }
        }
        row.updated_at = Utc::now();

        Ok(row.clone())
    }
}
