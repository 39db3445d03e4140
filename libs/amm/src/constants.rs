//! Engine-wide constants

use crate::decimal::Decimal;

/// Longest pool chain the router will consider
pub const MAX_POOL_PATH_LENGTH: usize = 3;

/// Supported pool fee ratios
pub const FEE_TIER_1_PERCENT: &str = "0.01";
pub const FEE_TIER_30_BPS: &str = "0.003";
pub const FEE_TIER_10_BPS: &str = "0.001";
pub const FEE_TIER_5_BPS: &str = "0.0005";

pub const FEE_TIERS: [&str; 4] = [
    FEE_TIER_1_PERCENT,
    FEE_TIER_30_BPS,
    FEE_TIER_10_BPS,
    FEE_TIER_5_BPS,
];

/// Lowest admissible square-root price, 2^-64 at 32 significant digits
pub fn full_range_low_sqrt_price() -> Decimal {
    Decimal::new(54_210_108_624_275_221_700_372_640_043_498_u128, -51)
}

/// Highest admissible square-root price, 2^64
pub fn full_range_high_sqrt_price() -> Decimal {
    Decimal::new(18_446_744_073_709_551_616_u128, 0)
}

/// A position's high/low square-root price ratio must exceed this
pub fn min_sqrt_price_factor() -> Decimal {
    Decimal::new(100_005, -5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_text() {
        assert_eq!(
            full_range_low_sqrt_price().to_string(),
            "5.4210108624275221700372640043498E-20"
        );
        assert_eq!(full_range_high_sqrt_price().to_string(), "18446744073709551616");
        assert_eq!(min_sqrt_price_factor().to_string(), "1.00005");
    }

    #[test]
    fn test_fee_tiers_parse() {
        for tier in FEE_TIERS {
            let fee: Decimal = tier.parse().unwrap();
            assert!(fee.is_positive() && fee < Decimal::one());
        }
    }
}
