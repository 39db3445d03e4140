use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AmmError;

/// Which way a swap moves the square-root price, or which side a position
/// is willing to provide.
///
/// Paying token X in pushes the price `Down`; paying token Y in pushes it
/// `Up`. A position restricted to `Up` only ever sells X, one restricted
/// to `Down` only ever sells Y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceDirection {
    Up,
    Down,
    Both,
}

impl PriceDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceDirection::Up => "up",
            PriceDirection::Down => "down",
            PriceDirection::Both => "both",
        }
    }
}

impl FromStr for PriceDirection {
    type Err = AmmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(PriceDirection::Up),
            "down" => Ok(PriceDirection::Down),
            "both" => Ok(PriceDirection::Both),
            _ => Err(AmmError::InvalidPriceDirection),
        }
    }
}

impl fmt::Display for PriceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for direction in [PriceDirection::Up, PriceDirection::Down, PriceDirection::Both] {
            assert_eq!(direction.as_str().parse::<PriceDirection>().unwrap(), direction);
        }
        assert_eq!("sideways".parse::<PriceDirection>().unwrap_err(), AmmError::InvalidPriceDirection);
        assert_eq!("UP".parse::<PriceDirection>().unwrap_err(), AmmError::InvalidPriceDirection);
    }
}
