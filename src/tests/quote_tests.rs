use rust_decimal_macros::dec;

use crate::error::PaymentError;
use crate::money::{Currency, Money};
use crate::quote::QuoteEngine;

#[test]
fn prices_usd_to_kes_with_documented_fee_order() {
    let engine = QuoteEngine::default();
    let amount = Money::from_decimal(dec!(1000), Currency::Usd).unwrap();

    let quote = engine.quote(Currency::Usd, Currency::Kes, amount).unwrap();

    assert_eq!(quote.mid_rate, dec!(129.50));
    assert_eq!(quote.effective_rate, dec!(128.8525));
    assert_eq!(quote.spread, dec!(0.6475));
    assert_eq!(quote.connector_fee.to_decimal(), dec!(2.05));
    assert_eq!(quote.platform_fee.to_decimal(), dec!(10.00));
    // (1000 - 2.05 - 10.00) * 128.8525 = 127299.827375, rounded once
    assert_eq!(quote.destination_amount.to_decimal(), dec!(127299.83));
    assert_eq!(quote.destination_amount.currency(), Currency::Kes);
}

#[test]
fn quoting_is_deterministic() {
    let engine = QuoteEngine::default();
    let amount = Money::from_decimal(dec!(250.75), Currency::Eur).unwrap();

    let first = engine.quote(Currency::Eur, Currency::Kes, amount).unwrap();
    let second = engine.quote(Currency::Eur, Currency::Kes, amount).unwrap();

    assert_eq!(first, second);
}

#[test]
fn spread_only_ever_reduces_the_rate() {
    let engine = QuoteEngine::default();
    for source in [Currency::Usd, Currency::Eur] {
        let amount = Money::from_decimal(dec!(100), source).unwrap();
        let quote = engine.quote(source, Currency::Kes, amount).unwrap();
        assert!(quote.effective_rate <= quote.mid_rate);
    }
}

#[test]
fn destination_is_monotonic_in_source_amount() {
    let engine = QuoteEngine::default();
    let mut previous = None;
    for amount in [dec!(10), dec!(100), dec!(1000), dec!(5000)] {
        let amount = Money::from_decimal(amount, Currency::Usd).unwrap();
        let quote = engine.quote(Currency::Usd, Currency::Kes, amount).unwrap();
        if let Some(previous) = previous {
            assert!(quote.destination_amount.minor_units() >= previous);
        }
        previous = Some(quote.destination_amount.minor_units());
    }
}

#[test]
fn unconfigured_pairs_are_refused() {
    let engine = QuoteEngine::default();

    let usd = Money::from_decimal(dec!(100), Currency::Usd).unwrap();
    assert!(matches!(
        engine.quote(Currency::Usd, Currency::Eur, usd),
        Err(PaymentError::UnsupportedCurrencyPair(Currency::Usd, Currency::Eur))
    ));

    let kes = Money::from_decimal(dec!(100), Currency::Kes).unwrap();
    assert!(matches!(
        engine.quote(Currency::Kes, Currency::Usd, kes),
        Err(PaymentError::UnsupportedCurrencyPair(Currency::Kes, Currency::Usd))
    ));
}

#[test]
fn non_positive_amounts_are_refused() {
    let engine = QuoteEngine::default();
    let zero = Money::from_decimal(dec!(0), Currency::Usd).unwrap();
    assert!(matches!(
        engine.quote(Currency::Usd, Currency::Kes, zero),
        Err(PaymentError::InvalidInput(_, _))
    ));
}

#[test]
fn amounts_that_do_not_cover_fees_are_refused() {
    let engine = QuoteEngine::default();
    // fees on 0.01 USD exceed the amount itself
    let dust = Money::from_decimal(dec!(0.01), Currency::Usd).unwrap();
    assert!(matches!(
        engine.quote(Currency::Usd, Currency::Kes, dust),
        Err(PaymentError::InvalidInput(_, _))
    ));
}

#[test]
fn quotes_serialize_with_uppercase_currency_codes() {
    let engine = QuoteEngine::default();
    let amount = Money::from_decimal(dec!(1000), Currency::Usd).unwrap();
    let quote = engine.quote(Currency::Usd, Currency::Kes, amount).unwrap();

    let json = serde_json::to_value(quote).unwrap();
    assert_eq!(json["source_currency"], "USD");
    assert_eq!(json["target_currency"], "KES");
    assert_eq!(json["destination_amount"]["minor_units"], 12_729_983_i64);
}

#[test]
fn amount_currency_must_match_the_source() {
    let engine = QuoteEngine::default();
    let usd = Money::from_decimal(dec!(100), Currency::Usd).unwrap();
    assert!(matches!(
        engine.quote(Currency::Eur, Currency::Kes, usd),
        Err(PaymentError::CurrencyMismatch(_, _))
    ));
}
