use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::PaymentError;
use crate::models::PricedQuote;
use crate::money::{round_rate, Currency, Money};

/// Mid-market rates for the configured currency pairs. Only pairs present
/// here can be priced.
#[derive(Clone, Debug)]
pub struct RateTable {
    mid_rates: HashMap<(Currency, Currency), Decimal>,
}

impl RateTable {
    pub fn new() -> Self {
        Self {
            mid_rates: HashMap::new(),
        }
    }

    pub fn set_mid_rate(&mut self, source: Currency, target: Currency, mid_rate: Decimal) {
        self.mid_rates.insert((source, target), mid_rate);
    }

    pub fn mid_rate(&self, source: Currency, target: Currency) -> Option<Decimal> {
        self.mid_rates.get(&(source, target)).copied()
    }
}

impl Default for RateTable {
    fn default() -> Self {
        let mut table = Self::new();
        table.set_mid_rate(Currency::Usd, Currency::Kes, dec!(129.50));
        table.set_mid_rate(Currency::Eur, Currency::Kes, dec!(140.20));
        table
    }
}

/// Fee configuration: spread retained as margin, the connector's network fee
/// and the platform's own fee, all expressed against the source amount.
#[derive(Clone, Debug)]
pub struct FeeSchedule {
    /// Fraction shaved off the mid rate.
    pub spread: Decimal,
    pub connector_fee_rate: Decimal,
    pub connector_fee_fixed: Decimal,
    pub platform_fee_rate: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            spread: dec!(0.005),
            connector_fee_rate: dec!(0.002),
            connector_fee_fixed: dec!(0.05),
            platform_fee_rate: dec!(0.01),
        }
    }
}

/// Prices cross-currency payments. Pure and deterministic for a fixed
/// configuration; safe to call concurrently.
#[derive(Clone, Debug)]
pub struct QuoteEngine {
    rates: RateTable,
    fees: FeeSchedule,
}

impl QuoteEngine {
    pub fn new(rates: RateTable, fees: FeeSchedule) -> Self {
        Self { rates, fees }
    }

    /// Price `amount` from `source` into `target`.
    ///
    /// Fee-order rule: the connector fee and the platform fee are both
    /// deducted in the source currency, then the single rate conversion is
    /// applied to the net. Each monetary field is rounded exactly once.
    pub fn quote(
        &self,
        source: Currency,
        target: Currency,
        amount: Money,
    ) -> Result<PricedQuote, PaymentError> {
        if amount.currency() != source {
            return Err(PaymentError::CurrencyMismatch(amount.currency(), source));
        }
        if !amount.is_positive() {
            return Err(PaymentError::InvalidInput(
                "source_amount".to_string(),
                "amount must be positive".to_string(),
            ));
        }

        let mid_rate = self
            .rates
            .mid_rate(source, target)
            .ok_or(PaymentError::UnsupportedCurrencyPair(source, target))?;

        let effective_rate = round_rate(mid_rate * (Decimal::ONE - self.fees.spread));
        let spread = mid_rate - effective_rate;

        let source_decimal = amount.to_decimal();
        let connector_fee = Money::from_decimal_rounded(
            source_decimal * self.fees.connector_fee_rate + self.fees.connector_fee_fixed,
            source,
        )?;
        let platform_fee =
            Money::from_decimal_rounded(source_decimal * self.fees.platform_fee_rate, source)?;

        let net = amount.checked_sub(connector_fee)?.checked_sub(platform_fee)?;
        if !net.is_positive() {
            return Err(PaymentError::InvalidInput(
                "source_amount".to_string(),
                "amount does not cover fees".to_string(),
            ));
        }

        let destination_amount =
            Money::from_decimal_rounded(net.to_decimal() * effective_rate, target)?;

        Ok(PricedQuote {
            source_currency: source,
            target_currency: target,
            source_amount: amount,
            mid_rate,
            effective_rate,
            spread,
            connector_fee,
            platform_fee,
            destination_amount,
        })
    }
}

impl Default for QuoteEngine {
    fn default() -> Self {
        Self::new(RateTable::default(), FeeSchedule::default())
    }
}
