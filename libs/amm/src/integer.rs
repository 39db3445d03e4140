//! Token amounts and liquidity are arbitrary-size integers carried as
//! base-10 text on the wire.

use num_bigint::BigInt;
use num_traits::Signed;

use crate::decimal::Decimal;
use crate::error::{AmmError, Result};

/// Parse a base-10 integer that must be strictly positive
pub fn parse_positive(text: &str, err: AmmError) -> Result<BigInt> {
    match text.parse::<BigInt>() {
        Ok(value) if value.is_positive() => Ok(value),
        _ => Err(err),
    }
}

pub fn decimal_to_integer(value: &Decimal, round_up: bool) -> Result<BigInt> {
    value.to_integer(round_up)
}

pub fn integer_to_decimal(value: &BigInt) -> Decimal {
    Decimal::from_integer(value)
}

/// `#[serde(with = "crate::integer::text")]` for `BigInt` fields
pub mod text {
    use num_bigint::BigInt;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_positive() {
        assert_eq!(
            parse_positive("1000000", AmmError::InvalidAmount).unwrap(),
            BigInt::from(1_000_000)
        );
        assert_eq!(parse_positive("0", AmmError::InvalidAmount).unwrap_err(), AmmError::InvalidAmount);
        assert_eq!(parse_positive("-5", AmmError::InvalidLiquidity).unwrap_err(), AmmError::InvalidLiquidity);
        assert_eq!(parse_positive("1.5", AmmError::InvalidAmount).unwrap_err(), AmmError::InvalidAmount);
    }

    #[test]
    fn test_decimal_conversions() {
        let amount = BigInt::from(42);
        assert_eq!(integer_to_decimal(&amount), "42".parse::<Decimal>().unwrap());
        let value: Decimal = "41.0001".parse().unwrap();
        assert_eq!(decimal_to_integer(&value, false).unwrap(), BigInt::from(41));
        assert_eq!(decimal_to_integer(&value, true).unwrap(), amount);
    }
}
