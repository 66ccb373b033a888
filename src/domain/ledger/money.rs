//! Money: ISO currency codes and major/minor unit conversion.
//!
//! The ledger stores decimal major units (`19.00`); payment providers speak
//! integer minor units (`1900`). Conversions round half away from zero.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::TransactionError;

/// Currencies with no minor unit.
const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "BIF", "CLP", "DJF", "GNF", "JPY", "KMF", "KRW", "MGA", "PYG", "RWF", "UGX", "VND", "VUV",
    "XAF", "XOF", "XPF",
];

/// Currencies whose minor unit is a thousandth.
const THREE_DECIMAL_CURRENCIES: &[&str] = &["BHD", "JOD", "KWD", "OMR", "TND"];

/// Scale at which the ledger records amounts.
pub const LEDGER_SCALE: u32 = 2;

/// Upper-case three-letter ISO 4217 code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Validates and upper-cases a currency code.
    pub fn new(code: &str) -> Result<Self, TransactionError> {
        let code = code.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(TransactionError::InvalidCurrency(code.to_string()));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-case form expected by the payment provider API.
    pub fn to_provider_code(&self) -> String {
        self.0.to_ascii_lowercase()
    }

    /// Number of decimal places in one major unit.
    pub fn minor_unit_exponent(&self) -> u32 {
        let code = self.0.as_str();
        if ZERO_DECIMAL_CURRENCIES.contains(&code) {
            0
        } else if THREE_DECIMAL_CURRENCIES.contains(&code) {
            3
        } else {
            2
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Currency {
    type Error = TransactionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Currency::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

/// Rejects negative amounts and rounds to ledger precision.
pub fn normalize_amount(amount: Decimal) -> Result<Decimal, TransactionError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(TransactionError::InvalidAmount(format!(
            "amount must not be negative, got {}",
            amount
        )));
    }
    Ok(amount.round_dp_with_strategy(LEDGER_SCALE, RoundingStrategy::MidpointAwayFromZero))
}

/// Converts a major-unit amount to the provider's integer minor units.
pub fn to_minor_units(amount: Decimal, currency: &Currency) -> Result<i64, TransactionError> {
    let factor = Decimal::from(10_i64.pow(currency.minor_unit_exponent()));
    amount
        .checked_mul(factor)
        .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|rounded| rounded.to_i64())
        .ok_or_else(|| {
            TransactionError::InvalidAmount(format!(
                "{} {} does not fit in minor units",
                amount, currency
            ))
        })
}

/// Converts provider minor units back to a major-unit amount.
pub fn from_minor_units(minor: i64, currency: &Currency) -> Decimal {
    Decimal::new(minor, currency.minor_unit_exponent())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn currency(code: &str) -> Currency {
        Currency::new(code).unwrap()
    }

    #[test]
    fn currency_codes_are_uppercased() {
        assert_eq!(currency("pln").as_str(), "PLN");
        assert_eq!(currency("usd").to_provider_code(), "usd");
    }

    #[test]
    fn currency_rejects_malformed_codes() {
        assert!(Currency::new("US").is_err());
        assert!(Currency::new("EURO").is_err());
        assert!(Currency::new("U5D").is_err());
    }

    #[test]
    fn two_decimal_currency_multiplies_by_hundred() {
        assert_eq!(to_minor_units(dec!(19.00), &currency("PLN")).unwrap(), 1900);
        assert_eq!(to_minor_units(dec!(5), &currency("USD")).unwrap(), 500);
    }

    #[test]
    fn zero_decimal_currency_is_not_scaled() {
        assert_eq!(to_minor_units(dec!(500), &currency("JPY")).unwrap(), 500);
        assert_eq!(from_minor_units(500, &currency("JPY")), dec!(500));
    }

    #[test]
    fn three_decimal_currency_multiplies_by_thousand() {
        assert_eq!(to_minor_units(dec!(1.234), &currency("KWD")).unwrap(), 1234);
        assert_eq!(from_minor_units(1234, &currency("KWD")), dec!(1.234));
    }

    #[test]
    fn conversion_rounds_half_away_from_zero() {
        assert_eq!(to_minor_units(dec!(0.125), &currency("USD")).unwrap(), 13);
        assert_eq!(to_minor_units(dec!(0.5), &currency("JPY")).unwrap(), 1);
    }

    #[test]
    fn minor_units_convert_back_to_the_cent() {
        assert_eq!(from_minor_units(1900, &currency("PLN")), dec!(19.00));
        assert_eq!(from_minor_units(1, &currency("EUR")), dec!(0.01));
    }

    #[test]
    fn normalize_rounds_to_cents() {
        assert_eq!(normalize_amount(dec!(10.005)).unwrap(), dec!(10.01));
        assert_eq!(normalize_amount(dec!(0)).unwrap(), dec!(0));
    }

    #[test]
    fn normalize_rejects_negative_amounts() {
        assert!(matches!(
            normalize_amount(dec!(-1.00)),
            Err(TransactionError::InvalidAmount(_))
        ));
    }

    proptest! {
        #[test]
        fn cents_survive_a_round_trip(cents in 0i64..10_000_000_000) {
            let usd = currency("USD");
            let amount = from_minor_units(cents, &usd);
            prop_assert_eq!(to_minor_units(amount, &usd).unwrap(), cents);
        }

        #[test]
        fn major_amounts_survive_a_round_trip(cents in 0i64..10_000_000_000) {
            let pln = currency("PLN");
            let amount = Decimal::new(cents, 2);
            let minor = to_minor_units(amount, &pln).unwrap();
            prop_assert_eq!(from_minor_units(minor, &pln), amount);
        }
    }
}
