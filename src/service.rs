use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::connector::{ConnectorClient, TransferReceipt, TransferRequest};
use crate::disbursement::{DisbursementClient, PayoutReceipt, PayoutRequest};
use crate::error::PaymentError;
use crate::ledger::{
    CreateOutcome, Ledger, NewTransaction, ReconciledOutcome, TransitionFields,
};
use crate::models::{FailureKind, PricedQuote, ReconciliationState, Transaction, TransactionStatus};
use crate::money::{Currency, Money};
use crate::quote::QuoteEngine;

const MAX_LIST_LIMIT: usize = 100;

#[derive(Clone, Debug)]
pub struct SettlementSettings {
    /// Currency every payment settles into.
    pub settlement_currency: Currency,
    /// Attempt ceiling for the connector leg.
    pub connector_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    /// Bounded wait for each external call.
    pub call_timeout: Duration,
}

impl Default for SettlementSettings {
    fn default() -> Self {
        Self {
            settlement_currency: Currency::Kes,
            connector_attempts: 3,
            backoff_base: Duration::from_millis(200),
            backoff_cap: Duration::from_secs(2),
            call_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PaymentOrder {
    pub client_id: String,
    pub freelancer_id: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub recipient_phone: String,
    pub idempotency_key: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PaymentReceipt {
    pub transaction_id: Uuid,
    pub status: TransactionStatus,
    pub message: String,
}

/// Coordinates one settlement: quote, ledger entry, connector transfer,
/// mobile-money payout, terminal transition. Leg failures come back as a
/// `failed` receipt, never as an error; errors are reserved for validation,
/// quoting and ledger problems.
pub struct SettlementService<L, C, D> {
    quotes: QuoteEngine,
    ledger: L,
    connector: C,
    disbursement: D,
    settings: SettlementSettings,
}

impl<L, C, D> SettlementService<L, C, D>
where
    L: Ledger + Clone + 'static,
    C: ConnectorClient + 'static,
    D: DisbursementClient + 'static,
{
    pub fn new(
        quotes: QuoteEngine,
        ledger: L,
        connector: C,
        disbursement: D,
        settings: SettlementSettings,
    ) -> Self {
        Self {
            quotes,
            ledger,
            connector,
            disbursement,
            settings,
        }
    }

    /// Quote-only path; no ledger write.
    pub fn get_quote(
        &self,
        source: Currency,
        target: Option<Currency>,
        amount: Decimal,
    ) -> Result<PricedQuote, PaymentError> {
        let amount = Money::from_decimal(amount, source)?;
        let target = target.unwrap_or(self.settings.settlement_currency);
        self.quotes.quote(source, target, amount)
    }

    pub async fn get_transaction(&self, id: Uuid) -> Result<Transaction, PaymentError> {
        self.ledger.get(id).await
    }

    pub async fn list_transactions(&self, limit: usize) -> Result<Vec<Transaction>, PaymentError> {
        self.ledger.list(limit.clamp(1, MAX_LIST_LIMIT)).await
    }

    /// Settle one payment end to end.
    pub async fn process(self: Arc<Self>, order: PaymentOrder) -> Result<PaymentReceipt, PaymentError> {
        validate_identifier("client_id", &order.client_id)?;
        validate_identifier("freelancer_id", &order.freelancer_id)?;
        validate_phone(&order.recipient_phone)?;

        let amount = Money::from_decimal(order.amount, order.currency)?;
        let quote = self
            .quotes
            .quote(order.currency, self.settings.settlement_currency, amount)?;

        let created = self
            .ledger
            .create(NewTransaction {
                client_id: order.client_id.clone(),
                freelancer_id: order.freelancer_id.clone(),
                source_amount: quote.source_amount,
                destination_amount: quote.destination_amount,
                exchange_rate: quote.effective_rate,
                idempotency_key: order.idempotency_key.clone(),
            })
            .await?;

        let tx = match created {
            CreateOutcome::Existing(existing) => {
                info!(transaction_id = %existing.id, status = %existing.status,
                    "idempotent replay; returning recorded outcome");
                return Ok(PaymentReceipt {
                    transaction_id: existing.id,
                    status: existing.status,
                    message: "duplicate request; returning recorded outcome".to_string(),
                });
            }
            CreateOutcome::Created(tx) => tx,
        };
        info!(transaction_id = %tx.id, amount = %tx.source_amount,
            destination = %tx.destination_amount, "settlement opened");

        // Until the connector leg commits, a dropped invocation must still
        // leave the row terminal; the guard fails it from its destructor.
        let mut guard = AbortGuard::new(self.ledger.clone(), tx.id);

        match self.transfer_with_retry(&tx, &order.recipient_phone).await {
            Ok(transfer) => {
                guard.disarm();
                // Money may now move on the payout rail: run the rest to
                // completion even if the caller goes away.
                let service = Arc::clone(&self);
                let phone = order.recipient_phone.clone();
                let handle =
                    tokio::spawn(async move { service.settle_payout(tx.id, transfer, phone).await });
                match handle.await {
                    Ok(receipt) => receipt,
                    Err(join_err) => {
                        Err(PaymentError::Internal(format!("payout task aborted: {join_err}")))
                    }
                }
            }
            Err(err) => {
                let receipt = self.record_failure(tx.id, err, None).await;
                guard.disarm();
                receipt
            }
        }
    }

    /// Record the true outcome of a payout that previously timed out. The
    /// row's terminal status stays as it is; only the reconciliation state
    /// and provider reference change.
    pub async fn report_async_result(
        &self,
        transaction_id: Uuid,
        outcome: ReconciledOutcome,
    ) -> Result<Transaction, PaymentError> {
        let row = self
            .ledger
            .resolve_reconciliation(transaction_id, outcome)
            .await?;
        info!(transaction_id = %row.id, reconciliation = ?row.reconciliation,
            "recorded reconciled payout outcome");
        Ok(row)
    }

    async fn transfer_with_retry(
        &self,
        tx: &Transaction,
        destination_account: &str,
    ) -> Result<TransferReceipt, PaymentError> {
        let request = TransferRequest {
            transaction_id: tx.id,
            source_amount: tx.source_amount,
            destination_amount: tx.destination_amount,
            destination_account: destination_account.to_string(),
        };

        let mut delay = self.settings.backoff_base;
        let mut last = PaymentError::ConnectorUnavailable("no attempts made".to_string());
        for attempt in 1..=self.settings.connector_attempts {
            let result = match timeout(self.settings.call_timeout, self.connector.transfer(&request))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(PaymentError::ConnectorUnavailable(
                    "transfer timed out".to_string(),
                )),
            };

            match result {
                Ok(receipt) => return Ok(receipt),
                Err(err @ PaymentError::ConnectorUnavailable(_)) => {
                    warn!(transaction_id = %tx.id, attempt, error = %err,
                        "connector unavailable");
                    last = err;
                }
                Err(err) => return Err(err),
            }

            if attempt < self.settings.connector_attempts {
                sleep(delay).await;
                delay = (delay * 2).min(self.settings.backoff_cap);
            }
        }
        Err(last)
    }

    async fn settle_payout(
        self: Arc<Self>,
        transaction_id: Uuid,
        transfer: TransferReceipt,
        recipient_phone: String,
    ) -> Result<PaymentReceipt, PaymentError> {
        let request = PayoutRequest {
            transaction_id,
            amount: transfer.settled_amount,
            recipient_phone,
        };

        let mut result = self.call_payout(&request).await;
        if matches!(result, Err(PaymentError::AuthFailure(_))) {
            warn!(transaction_id = %transaction_id,
                "disbursement session refused; refreshing and retrying once");
            result = match self.disbursement.refresh_session().await {
                Ok(()) => self.call_payout(&request).await,
                Err(refresh_err) => Err(refresh_err),
            };
        }

        match result {
            Ok(receipt) => {
                let row = self
                    .ledger
                    .transition(
                        transaction_id,
                        &[TransactionStatus::Processing],
                        TransactionStatus::Completed,
                        TransitionFields {
                            connector_reference: Some(transfer.provider_id),
                            external_reference: Some(receipt.provider_reference),
                            ..Default::default()
                        },
                    )
                    .await?;
                info!(transaction_id = %row.id, reference = ?row.external_reference,
                    "settlement completed");
                Ok(PaymentReceipt {
                    transaction_id: row.id,
                    status: row.status,
                    message: "payment settled and disbursed".to_string(),
                })
            }
            Err(err) => {
                self.record_failure(transaction_id, err, Some(transfer.provider_id))
                    .await
            }
        }
    }

    async fn call_payout(&self, request: &PayoutRequest) -> Result<PayoutReceipt, PaymentError> {
        match timeout(self.settings.call_timeout, self.disbursement.payout(request)).await {
            Ok(result) => result,
            Err(_) => Err(PaymentError::PayoutTimeout(
                "no confirmation within the wait window".to_string(),
            )),
        }
    }

    /// Write a leg failure to the ledger, then hand the failed receipt back.
    /// Ledger errors propagate; a leg failure is never swallowed without a
    /// matching ledger write.
    async fn record_failure(
        &self,
        transaction_id: Uuid,
        err: PaymentError,
        connector_reference: Option<String>,
    ) -> Result<PaymentReceipt, PaymentError> {
        let (kind, reconciliation) = match &err {
            PaymentError::ConnectorUnavailable(_) => (FailureKind::ConnectorUnavailable, None),
            PaymentError::ConnectorRejected(_) => (FailureKind::ConnectorRejected, None),
            PaymentError::AuthFailure(_) => (FailureKind::AuthFailure, None),
            PaymentError::PayoutRejected(_) => (FailureKind::PayoutRejected, None),
            PaymentError::PayoutTimeout(_) => {
                (FailureKind::PayoutTimeout, Some(ReconciliationState::Pending))
            }
            // storage/internal problems are errors, not settlement outcomes
            _ => return Err(err),
        };

        error!(transaction_id = %transaction_id, error = %err, "settlement leg failed");
        let row = self
            .ledger
            .transition(
                transaction_id,
                &[TransactionStatus::Processing],
                TransactionStatus::Failed,
                TransitionFields {
                    failure: Some(kind),
                    connector_reference,
                    reconciliation,
                    ..Default::default()
                },
            )
            .await?;

        Ok(PaymentReceipt {
            transaction_id: row.id,
            status: row.status,
            message: err.to_string(),
        })
    }
}

/// Fails the row from its destructor if the owning invocation is dropped
/// before the connector leg commits.
struct AbortGuard<L: Ledger + Clone + 'static> {
    ledger: L,
    transaction_id: Uuid,
    armed: bool,
}

impl<L: Ledger + Clone + 'static> AbortGuard<L> {
    fn new(ledger: L, transaction_id: Uuid) -> Self {
        Self {
            ledger,
            transaction_id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<L: Ledger + Clone + 'static> Drop for AbortGuard<L> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let ledger = self.ledger.clone();
        let transaction_id = self.transaction_id;
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let result = ledger
                    .transition(
                        transaction_id,
                        &[TransactionStatus::Processing],
                        TransactionStatus::Failed,
                        TransitionFields {
                            failure: Some(FailureKind::Aborted),
                            ..Default::default()
                        },
                    )
                    .await;
                match result {
                    Ok(_) => warn!(transaction_id = %transaction_id,
                        "invocation dropped before transfer committed; transaction failed"),
                    Err(err) => error!(transaction_id = %transaction_id, error = %err,
                        "could not fail abandoned transaction"),
                }
            });
        }
    }
}

fn validate_identifier(field: &str, value: &str) -> Result<(), PaymentError> {
    if value.trim().is_empty() {
        return Err(PaymentError::InvalidInput(
            field.to_string(),
            format!("{field} cannot be empty"),
        ));
    }
    Ok(())
}

fn validate_phone(raw: &str) -> Result<(), PaymentError> {
    let digits = raw.trim().trim_start_matches('+');
    if digits.len() < 9 || digits.len() > 15 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(PaymentError::InvalidInput(
            "recipient_phone".to_string(),
            format!("`{raw}` is not a valid payout phone number"),
        ));
    }
    Ok(())
}
