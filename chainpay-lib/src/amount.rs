//! Fixed-point amounts.
//!
//! Logical payments are denominated in an 18-decimal canonical unit;
//! concrete transfers use the minimal units of the chosen asset. Both are
//! stored as `u128` integers. Never use floating point for amounts.
//!
//! # Example
//!
//! ```
//! use chainpay_lib::amount::LogicalAmount;
//!
//! let five = LogicalAmount::parse("5.0000005").unwrap();
//! let usdc = five.to_asset_units(6).unwrap();
//! assert_eq!(usdc.value(), 5_000_001); // round half up
//! ```

use crate::{ChainpayError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decimals of the canonical logical unit.
pub const CANONICAL_DECIMALS: u8 = 18;

fn pow10(exp: u32) -> Option<u128> {
    10u128.checked_pow(exp)
}

/// Render `value` as a decimal string with `decimals` fractional digits,
/// trailing zeros trimmed.
fn format_fixed(value: u128, decimals: u8) -> String {
    let Some(unit) = pow10(u32::from(decimals)) else {
        return value.to_string();
    };
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = usize::from(decimals));
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Amount of the abstract payment asset, in 18-decimal canonical units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicalAmount(u128);

impl LogicalAmount {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Create from raw canonical units (1.0 == 10^18).
    pub const fn from_canonical_units(units: u128) -> Self {
        Self(units)
    }

    /// Create from a whole number of logical units.
    pub fn from_whole(whole: u64) -> Self {
        // 2^64 * 10^18 < 2^128
        Self(u128::from(whole) * 1_000_000_000_000_000_000)
    }

    /// Parse a decimal string such as `"5"` or `"12.345"`.
    ///
    /// # Errors
    ///
    /// Fails for negative values, more than 18 fractional digits, or
    /// values too large for the canonical representation.
    pub fn parse(s: &str) -> Result<Self> {
        let decimal = Decimal::from_str(s.trim())
            .map_err(|e| ChainpayError::invalid_amount(s, e.to_string()))?;
        Self::from_decimal(decimal).map_err(|err| match err {
            ChainpayError::InvalidAmount { reason, .. } => ChainpayError::invalid_amount(s, reason),
            other => other,
        })
    }

    /// Convert from a [`Decimal`].
    pub fn from_decimal(decimal: Decimal) -> Result<Self> {
        if decimal.is_sign_negative() && !decimal.is_zero() {
            return Err(ChainpayError::invalid_amount(
                decimal.to_string(),
                "must not be negative",
            ));
        }
        let scale = decimal.scale();
        if scale > u32::from(CANONICAL_DECIMALS) {
            return Err(ChainpayError::invalid_amount(
                decimal.to_string(),
                format!("more than {} decimal places", CANONICAL_DECIMALS),
            ));
        }
        let mantissa = decimal.mantissa().unsigned_abs();
        pow10(u32::from(CANONICAL_DECIMALS) - scale)
            .and_then(|factor| mantissa.checked_mul(factor))
            .map(Self)
            .ok_or(ChainpayError::AmountOverflow {
                decimals: CANONICAL_DECIMALS,
            })
    }

    /// Raw canonical units.
    pub const fn canonical_units(&self) -> u128 {
        self.0
    }

    /// Returns true for a zero amount.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Convert into the minimal units of an asset with `decimals` precision.
    ///
    /// Narrowing rounds half up; widening is exact.
    pub fn to_asset_units(&self, decimals: u8) -> Result<TokenAmount> {
        let overflow = ChainpayError::AmountOverflow { decimals };
        if decimals <= CANONICAL_DECIMALS {
            let divisor =
                pow10(u32::from(CANONICAL_DECIMALS - decimals)).ok_or(ChainpayError::Internal(
                    "canonical divisor out of range".into(),
                ))?;
            let quotient = self.0 / divisor;
            let remainder = self.0 % divisor;
            // remainder < divisor <= 10^18, so doubling cannot overflow
            if remainder * 2 >= divisor {
                quotient.checked_add(1).map(TokenAmount).ok_or(overflow)
            } else {
                Ok(TokenAmount(quotient))
            }
        } else {
            pow10(u32::from(decimals - CANONICAL_DECIMALS))
                .and_then(|factor| self.0.checked_mul(factor))
                .map(TokenAmount)
                .ok_or(overflow)
        }
    }
}

impl fmt::Display for LogicalAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_fixed(self.0, CANONICAL_DECIMALS))
    }
}

impl FromStr for LogicalAmount {
    type Err = ChainpayError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for LogicalAmount {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for LogicalAmount {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Amount in an asset's minimal units (e.g. 10^-6 USDC, wei).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAmount(u128);

impl TokenAmount {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Create from minimal units.
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// Minimal units.
    pub const fn value(&self) -> u128 {
        self.0
    }

    /// Human-readable value for an asset with `decimals` precision.
    pub fn format_units(&self, decimals: u8) -> String {
        format_fixed(self.0, decimals)
    }
}

impl From<u64> for TokenAmount {
    fn from(value: u64) -> Self {
        Self(u128::from(value))
    }
}

impl From<u128> for TokenAmount {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for TokenAmount {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.trim()
            .parse::<u128>()
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_five_dollars_to_six_decimals() {
        let amount = LogicalAmount::parse("5.00").unwrap();
        assert_eq!(amount.canonical_units(), 5_000_000_000_000_000_000);
        assert_eq!(amount.to_asset_units(6).unwrap().value(), 5_000_000);
    }

    #[test]
    fn test_round_half_up_boundaries() {
        let up = LogicalAmount::from_decimal(dec!(5.0000005)).unwrap();
        assert_eq!(up.to_asset_units(6).unwrap().value(), 5_000_001);

        let down = LogicalAmount::from_decimal(dec!(5.00000049)).unwrap();
        assert_eq!(down.to_asset_units(6).unwrap().value(), 5_000_000);

        let just_below = LogicalAmount::parse("5.000000499999999999").unwrap();
        assert_eq!(just_below.to_asset_units(6).unwrap().value(), 5_000_000);
    }

    #[test]
    fn test_same_and_wider_precision() {
        let amount = LogicalAmount::parse("1.5").unwrap();
        assert_eq!(
            amount.to_asset_units(18).unwrap().value(),
            1_500_000_000_000_000_000
        );
        assert_eq!(
            amount.to_asset_units(20).unwrap().value(),
            150_000_000_000_000_000_000
        );
        assert_eq!(amount.to_asset_units(0).unwrap().value(), 2);
    }

    #[test]
    fn test_widening_overflow() {
        let amount = LogicalAmount::from_canonical_units(u128::MAX / 2);
        assert!(matches!(
            amount.to_asset_units(30),
            Err(ChainpayError::AmountOverflow { decimals: 30 })
        ));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(LogicalAmount::parse("-1").is_err());
        assert!(LogicalAmount::parse("abc").is_err());
        assert!(LogicalAmount::parse("1.0000000000000000001").is_err());
        assert!(LogicalAmount::parse(" 7 ").is_ok());
    }

    #[test]
    fn test_display() {
        assert_eq!(LogicalAmount::parse("5.00").unwrap().to_string(), "5");
        assert_eq!(
            LogicalAmount::parse("0.000000000000000001")
                .unwrap()
                .to_string(),
            "0.000000000000000001"
        );
        assert_eq!(TokenAmount::new(5_000_001).format_units(6), "5.000001");
        assert_eq!(TokenAmount::new(42).format_units(0), "42");
    }

    #[test]
    fn test_serde_as_strings() {
        let amount = LogicalAmount::parse("12.5").unwrap();
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"12.5\"");
        let back: LogicalAmount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amount);

        let units: TokenAmount = serde_json::from_str("\"1000000\"").unwrap();
        assert_eq!(units.value(), 1_000_000);
    }
}
