use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::PaymentError;

/// Decimal places for currency amounts. Every supported currency uses
/// 2-decimal minor units.
pub const AMOUNT_SCALE: u32 = 2;
/// Decimal places for exchange rates.
pub const RATE_SCALE: u32 = 4;

const MINOR_PER_UNIT: i64 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Kes,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Kes => "KES",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "KES" => Ok(Currency::Kes),
            other => Err(PaymentError::InvalidInput(
                "currency".to_string(),
                format!("unknown currency `{other}`"),
            )),
        }
    }
}

/// Round a currency amount to minor-unit precision. The single rounding rule
/// for the whole pipeline; every computed monetary field passes through it
/// exactly once.
pub fn round_amount(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Round an exchange rate to rate precision, same strategy as [`round_amount`].
pub fn round_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// A monetary amount: integer minor units plus a currency code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    minor_units: i64,
    currency: Currency,
}

impl Money {
    pub fn from_minor_units(minor_units: i64, currency: Currency) -> Self {
        Self {
            minor_units,
            currency,
        }
    }

    /// Convert a decimal amount that must already be at minor-unit
    /// granularity; finer input is a validation error, never rounded away.
    pub fn from_decimal(amount: Decimal, currency: Currency) -> Result<Self, PaymentError> {
        let scaled = amount
            .checked_mul(dec!(100))
            .ok_or(PaymentError::AmountOutOfRange)?;
        if !scaled.fract().is_zero() {
            return Err(PaymentError::InvalidInput(
                "amount".to_string(),
                format!("{amount} {currency} is finer than minor-unit granularity"),
            ));
        }
        let minor_units = scaled.to_i64().ok_or(PaymentError::AmountOutOfRange)?;
        Ok(Self {
            minor_units,
            currency,
        })
    }

    /// Convert a computed decimal amount, applying the rounding rule once.
    pub fn from_decimal_rounded(amount: Decimal, currency: Currency) -> Result<Self, PaymentError> {
        let rounded = round_amount(amount);
        let minor_units = rounded
            .checked_mul(dec!(100))
            .and_then(|scaled| scaled.to_i64())
            .ok_or(PaymentError::AmountOutOfRange)?;
        Ok(Self {
            minor_units,
            currency,
        })
    }

    pub fn minor_units(&self) -> i64 {
        self.minor_units
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.minor_units, AMOUNT_SCALE)
    }

    pub fn is_positive(&self) -> bool {
        self.minor_units > 0
    }

    /// Whole currency units with the sub-unit part truncated, never rounded
    /// up. Used where a payout rail only accepts whole units.
    pub fn whole_units_truncated(&self) -> i64 {
        self.minor_units / MINOR_PER_UNIT
    }

    pub fn checked_add(self, other: Money) -> Result<Money, PaymentError> {
        if self.currency != other.currency {
            return Err(PaymentError::CurrencyMismatch(self.currency, other.currency));
        }
        let minor_units = self
            .minor_units
            .checked_add(other.minor_units)
            .ok_or(PaymentError::AmountOutOfRange)?;
        Ok(Self {
            minor_units,
            currency: self.currency,
        })
    }

    pub fn checked_sub(self, other: Money) -> Result<Money, PaymentError> {
        if self.currency != other.currency {
            return Err(PaymentError::CurrencyMismatch(self.currency, other.currency));
        }
        let minor_units = self
            .minor_units
            .checked_sub(other.minor_units)
            .ok_or(PaymentError::AmountOutOfRange)?;
        Ok(Self {
            minor_units,
            currency: self.currency,
        })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.to_decimal(), self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_decimal_rejects_sub_minor_precision() {
        let result = Money::from_decimal(dec!(10.005), Currency::Usd);
        assert!(matches!(result, Err(PaymentError::InvalidInput(_, _))));
    }

    #[test]
    fn from_decimal_accepts_exact_cents() {
        let money = Money::from_decimal(dec!(1000.50), Currency::Usd).unwrap();
        assert_eq!(money.minor_units(), 100_050);
        assert_eq!(money.to_decimal(), dec!(1000.50));
    }

    #[test]
    fn rounded_conversion_applies_rule_once() {
        let money = Money::from_decimal_rounded(dec!(127299.827375), Currency::Kes).unwrap();
        assert_eq!(money.to_decimal(), dec!(127299.83));
    }

    #[test]
    fn whole_units_truncate_toward_zero() {
        let money = Money::from_minor_units(12_729_983, Currency::Kes);
        assert_eq!(money.whole_units_truncated(), 127_299);
    }

    #[test]
    fn mixed_currency_arithmetic_is_refused() {
        let usd = Money::from_minor_units(100, Currency::Usd);
        let kes = Money::from_minor_units(100, Currency::Kes);
        assert!(matches!(
            usd.checked_sub(kes),
            Err(PaymentError::CurrencyMismatch(_, _))
        ));
    }
}
