use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::error::PaymentError;
use crate::ledger::{
    CreateOutcome, Ledger, NewTransaction, ReconciledOutcome, TransitionFields,
};
use crate::ledger::in_memory::InMemoryLedger;
use crate::models::{FailureKind, ReconciliationState, TransactionStatus};
use crate::money::{Currency, Money};

fn new_transaction(idempotency_key: Option<&str>) -> NewTransaction {
    NewTransaction {
        client_id: "client-1".to_string(),
        freelancer_id: "freelancer-1".to_string(),
        source_amount: Money::from_minor_units(100_000, Currency::Usd),
        destination_amount: Money::from_minor_units(12_729_983, Currency::Kes),
        exchange_rate: dec!(128.8525),
        idempotency_key: idempotency_key.map(String::from),
    }
}

fn created(outcome: CreateOutcome) -> crate::models::Transaction {
    match outcome {
        CreateOutcome::Created(tx) => tx,
        CreateOutcome::Existing(tx) => panic!("expected a new row, got existing {}", tx.id),
    }
}

#[tokio::test]
async fn create_assigns_id_and_starts_processing() {
    let ledger = InMemoryLedger::new();

    let tx = created(ledger.create(new_transaction(None)).await.unwrap());

    assert_eq!(tx.status, TransactionStatus::Processing);
    assert_eq!(tx.reconciliation, ReconciliationState::NotRequired);
    assert!(tx.failure.is_none());
    assert!(tx.external_reference.is_none());
    assert_eq!(tx.created_at, tx.updated_at);
}

#[tokio::test]
async fn duplicate_idempotency_key_returns_existing_row() {
    let ledger = InMemoryLedger::new();

    let first = created(ledger.create(new_transaction(Some("abc"))).await.unwrap());
    let second = ledger.create(new_transaction(Some("abc"))).await.unwrap();

    match second {
        CreateOutcome::Existing(tx) => assert_eq!(tx.id, first.id),
        CreateOutcome::Created(_) => panic!("duplicate key created a second row"),
    }
    assert_eq!(ledger.list(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn transition_is_compare_and_set() {
    let ledger = InMemoryLedger::new();
    let tx = created(ledger.create(new_transaction(None)).await.unwrap());

    // wrong expected state
    let refused = ledger
        .transition(
            tx.id,
            &[TransactionStatus::Completed],
            TransactionStatus::Failed,
            TransitionFields::default(),
        )
        .await;
    assert!(matches!(
        refused,
        Err(PaymentError::InvalidTransition { .. })
    ));

    let completed = ledger
        .transition(
            tx.id,
            &[TransactionStatus::Processing],
            TransactionStatus::Completed,
            TransitionFields {
                external_reference: Some("AG_123".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(completed.status, TransactionStatus::Completed);
    assert_eq!(completed.external_reference.as_deref(), Some("AG_123"));
}

#[tokio::test]
async fn terminal_states_never_transition_again() {
    let ledger = InMemoryLedger::new();
    let tx = created(ledger.create(new_transaction(None)).await.unwrap());

    ledger
        .transition(
            tx.id,
            &[TransactionStatus::Processing],
            TransactionStatus::Failed,
            TransitionFields {
                failure: Some(FailureKind::PayoutRejected),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let reopened = ledger
        .transition(
            tx.id,
            &[TransactionStatus::Processing, TransactionStatus::Failed],
            TransactionStatus::Completed,
            TransitionFields::default(),
        )
        .await;
    // even a caller that names the terminal state cannot leave it unchanged:
    // the ledger row stays failed
    match reopened {
        Ok(row) => panic!("terminal row transitioned to {}", row.status),
        Err(PaymentError::InvalidTransition { .. }) => {}
        Err(other) => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn concurrent_transitions_let_exactly_one_caller_win() {
    let ledger = InMemoryLedger::new();
    let tx = created(ledger.create(new_transaction(None)).await.unwrap());

    let complete = {
        let ledger = ledger.clone();
        tokio::spawn(async move {
            ledger
                .transition(
                    tx.id,
                    &[TransactionStatus::Processing],
                    TransactionStatus::Completed,
                    TransitionFields::default(),
                )
                .await
        })
    };
    let fail = {
        let ledger = ledger.clone();
        tokio::spawn(async move {
            ledger
                .transition(
                    tx.id,
                    &[TransactionStatus::Processing],
                    TransactionStatus::Failed,
                    TransitionFields::default(),
                )
                .await
        })
    };

    let outcomes = [complete.await.unwrap(), fail.await.unwrap()];
    let wins = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(wins, 1);

    let row = ledger.get(tx.id).await.unwrap();
    assert!(row.status.is_terminal());
}

#[tokio::test]
async fn get_unknown_id_is_not_found() {
    let ledger = InMemoryLedger::new();
    assert!(matches!(
        ledger.get(Uuid::new_v4()).await,
        Err(PaymentError::TransactionNotFound(_))
    ));
}

#[tokio::test]
async fn list_is_newest_first_and_bounded() {
    let ledger = InMemoryLedger::new();
    let first = created(ledger.create(new_transaction(None)).await.unwrap());
    let second = created(ledger.create(new_transaction(None)).await.unwrap());
    let third = created(ledger.create(new_transaction(None)).await.unwrap());

    let listed = ledger.list(2).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, third.id);
    assert_eq!(listed[1].id, second.id);
    assert_ne!(listed[1].id, first.id);
}

#[tokio::test]
async fn reconciliation_only_resolves_pending_rows() {
    let ledger = InMemoryLedger::new();
    let tx = created(ledger.create(new_transaction(None)).await.unwrap());

    // not pending yet
    let premature = ledger
        .resolve_reconciliation(
            tx.id,
            ReconciledOutcome::Paid {
                provider_reference: "AG_LATE".to_string(),
            },
        )
        .await;
    assert!(matches!(
        premature,
        Err(PaymentError::NotAwaitingReconciliation(_))
    ));

    ledger
        .transition(
            tx.id,
            &[TransactionStatus::Processing],
            TransactionStatus::Failed,
            TransitionFields {
                failure: Some(FailureKind::PayoutTimeout),
                reconciliation: Some(ReconciliationState::Pending),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let resolved = ledger
        .resolve_reconciliation(
            tx.id,
            ReconciledOutcome::Paid {
                provider_reference: "AG_LATE".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(resolved.status, TransactionStatus::Failed);
    assert_eq!(resolved.external_reference.as_deref(), Some("AG_LATE"));
    assert_eq!(
        resolved.reconciliation,
        ReconciliationState::ConfirmedPaid {
            provider_reference: "AG_LATE".to_string()
        }
    );

    // a second callback finds nothing pending
    let again = ledger
        .resolve_reconciliation(tx.id, ReconciledOutcome::Unpaid)
        .await;
    assert!(matches!(
        again,
        Err(PaymentError::NotAwaitingReconciliation(_))
    ));
}
