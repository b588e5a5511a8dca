use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::{Currency, Money};

/// A priced quote. Ephemeral: computed on demand, never persisted.
///
/// `effective_rate = mid_rate * (1 - spread_fraction)` at rate precision;
/// `destination_amount = (source_amount - connector_fee - platform_fee) *
/// effective_rate`, with both fees in the source currency and every monetary
/// field rounded exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricedQuote {
    pub source_currency: Currency,
    pub target_currency: Currency,
    pub source_amount: Money,
    pub mid_rate: Decimal,
    pub effective_rate: Decimal,
    /// How much of the rate was shaved off, in rate units.
    pub spread: Decimal,
    pub connector_fee: Money,
    pub platform_fee: Money,
    pub destination_amount: Money,
}
