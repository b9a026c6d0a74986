//! On-chain integer amounts.
//!
//! Share counts, collateral, funding and fee factors are integers on
//! chain. Callers hand them over as machine integers, numeric strings
//! (`"1000"`, `"1e+18"`, `"0x0de0b6b3a7640000"`) or high-precision
//! decimals; everything is normalized into [`Amount`] before the
//! calculator sees it. Values with a fractional part are rejected.

use std::fmt;
use std::str::FromStr;

use num_bigint::{BigInt, BigUint};
use num_traits::{Signed, ToPrimitive, Zero};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::decimal::BigDecimal;
use super::error::LmsrError;

/// Signed arbitrary-size integer amount.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(BigInt);

impl Amount {
    pub fn zero() -> Self {
        Self(BigInt::zero())
    }

    pub fn as_bigint(&self) -> &BigInt {
        &self.0
    }

    pub fn into_bigint(self) -> BigInt {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// Parses `text`, reporting failures against `argument`.
    pub fn parse_named(argument: &str, text: &str) -> Result<Self, LmsrError> {
        let value: BigDecimal = text.parse().map_err(|err| relabel(err, argument))?;
        Self::from_decimal_named(argument, &value)
    }

    /// Converts an integral decimal, reporting failures against `argument`.
    pub fn from_decimal_named(argument: &str, value: &BigDecimal) -> Result<Self, LmsrError> {
        value
            .to_bigint()
            .map(Self)
            .ok_or_else(|| LmsrError::invalid(argument, value, "amount must be an integer"))
    }

    /// Interprets the amount as an outcome index.
    pub fn to_index(&self, argument: &str) -> Result<usize, LmsrError> {
        self.0
            .to_usize()
            .ok_or_else(|| LmsrError::invalid(argument, self, "index must be a non-negative integer"))
    }
}

fn relabel(err: LmsrError, argument: &str) -> LmsrError {
    match err {
        LmsrError::InvalidArgument { value, reason, .. } => LmsrError::InvalidArgument {
            argument: argument.to_string(),
            value,
            reason,
        },
        other => other,
    }
}

impl FromStr for Amount {
    type Err = LmsrError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse_named("value", text)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<BigInt> for Amount {
    fn from(value: BigInt) -> Self {
        Self(value)
    }
}

impl From<BigUint> for Amount {
    fn from(value: BigUint) -> Self {
        Self(BigInt::from(value))
    }
}

impl From<&Amount> for BigDecimal {
    fn from(value: &Amount) -> Self {
        Self::from(&value.0)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Amount {
                fn from(value: $t) -> Self {
                    Self(BigInt::from(value))
                }
            }
        )*
    };
}

impl_from_int!(i32, i64, i128, u32, u64, u128, usize);

impl TryFrom<&BigDecimal> for Amount {
    type Error = LmsrError;

    fn try_from(value: &BigDecimal) -> Result<Self, Self::Error> {
        Self::from_decimal_named("value", value)
    }
}

impl TryFrom<rust_decimal::Decimal> for Amount {
    type Error = LmsrError;

    fn try_from(value: rust_decimal::Decimal) -> Result<Self, Self::Error> {
        Self::try_from(&BigDecimal::from(value))
    }
}

impl TryFrom<f64> for Amount {
    type Error = LmsrError;

    /// Uses the shortest decimal form, so `1e18` maps to exactly 10^18.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        let decimal = BigDecimal::from_f64(value)
            .ok_or_else(|| LmsrError::invalid("value", value, "amount must be finite"))?;
        Self::try_from(&decimal)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

struct AmountVisitor;

impl Visitor<'_> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer or a numeric string")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Amount, E> {
        Ok(Amount::from(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Amount, E> {
        Ok(Amount::from(value))
    }

    fn visit_i128<E: de::Error>(self, value: i128) -> Result<Amount, E> {
        Ok(Amount::from(value))
    }

    fn visit_u128<E: de::Error>(self, value: u128) -> Result<Amount, E> {
        Ok(Amount::from(value))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Amount, E> {
        Amount::try_from(value).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Amount, E> {
        value.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

/// Deserializes an outcome index given as a number or a numeric string.
pub fn deserialize_index<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    let amount = Amount::deserialize(deserializer)?;
    amount.to_index("outcome_token_index").map_err(de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parses_numeric_strings() {
        assert_eq!("1000".parse::<Amount>().unwrap(), Amount::from(1000));
        assert_eq!("1e+18".parse::<Amount>().unwrap(), Amount::from(10u64.pow(18)));
        assert_eq!("-2.5e17".parse::<Amount>().unwrap(), Amount::from(-250_000_000_000_000_000i64));
        assert_eq!("0x0de0b6b3a7640000".parse::<Amount>().unwrap(), Amount::from(10u64.pow(18)));
    }

    #[test]
    fn test_rejects_fractional_and_malformed_input() {
        let err = Amount::parse_named("funding", "1.5").unwrap_err();
        assert_eq!(err.argument(), Some("funding"));

        let err = Amount::parse_named("outcome_token_count", "lots").unwrap_err();
        assert_eq!(err.argument(), Some("outcome_token_count"));
        assert!(err.to_string().contains("lots"));
    }

    #[test]
    fn test_converts_decimals_and_floats() {
        assert_eq!(Amount::try_from(dec!(42)).unwrap(), Amount::from(42));
        assert!(Amount::try_from(dec!(42.5)).is_err());
        assert_eq!(Amount::try_from(1e18).unwrap(), Amount::from(10u64.pow(18)));
        assert_eq!(Amount::try_from(2.5e17).unwrap(), Amount::from(250_000_000_000_000_000u64));
        assert!(Amount::try_from(f64::NAN).is_err());
    }

    #[test]
    fn test_serde_accepts_numbers_and_strings() {
        let values: Vec<Amount> = serde_json::from_str(r#"[7, "-3", 1e18, "0x10"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Amount::from(7),
                Amount::from(-3),
                Amount::from(10u64.pow(18)),
                Amount::from(16)
            ]
        );
        assert_eq!(serde_json::to_string(&Amount::from(-3)).unwrap(), r#""-3""#);
        assert!(serde_json::from_str::<Amount>("0.5").is_err());
    }

    #[test]
    fn test_index_conversion() {
        assert_eq!(Amount::from(3).to_index("i").unwrap(), 3);
        assert!(Amount::from(-1).to_index("i").is_err());
    }
}
