// src/tests/mod.rs

mod ledger_tests;
mod quote_tests;

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;

use crate::connector::simulated::SimulatedConnector;
use crate::disbursement::simulated::SimulatedDisbursement;
use crate::ledger::in_memory::InMemoryLedger;
use crate::money::Currency;
use crate::quote::QuoteEngine;
use crate::service::{PaymentOrder, SettlementService, SettlementSettings};

type TestService = SettlementService<InMemoryLedger, SimulatedConnector, SimulatedDisbursement>;

fn fast_settings() -> SettlementSettings {
    SettlementSettings {
        settlement_currency: Currency::Kes,
        connector_attempts: 3,
        backoff_base: Duration::from_millis(1),
        backoff_cap: Duration::from_millis(4),
        call_timeout: Duration::from_millis(250),
    }
}

fn test_service(
    connector: SimulatedConnector,
    disbursement: SimulatedDisbursement,
) -> (Arc<TestService>, InMemoryLedger) {
    let ledger = InMemoryLedger::new();
    let service = Arc::new(SettlementService::new(
        QuoteEngine::default(),
        ledger.clone(),
        connector,
        disbursement,
        fast_settings(),
    ));
    (service, ledger)
}

fn usd_order(idempotency_key: Option<&str>) -> PaymentOrder {
    PaymentOrder {
        client_id: "client-1".to_string(),
        freelancer_id: "freelancer-1".to_string(),
        amount: dec!(1000),
        currency: Currency::Usd,
        recipient_phone: "0712345678".to_string(),
        idempotency_key: idempotency_key.map(String::from),
    }
}
