//! Concentrated-liquidity swap mathematics
//!
//! ## Purpose
//!
//! Closed-form relations between square-root price, liquidity and token
//! amounts for a single constant-liquidity segment, plus the fee helpers
//! shared by positions, pools and the router.
//!
//! ## Rounding Discipline
//!
//! Every intermediate step rounds in whichever direction favours the
//! liquidity provider: amounts the trader pays round up, amounts the trader
//! receives round down, and liquidity bought by a deposit rounds down.
//! Converting to integers follows the same rule (ceiling for inputs, floor
//! for outputs).
//!
//! ## Conventions
//!
//! Prices are expressed as Y per X. Token X in moves the square-root price
//! down, token Y in moves it up.

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};
use tracing::debug;

use crate::decimal::{Decimal, BASE, ROUND_DOWN, ROUND_UP};
use crate::direction::PriceDirection;
use crate::error::{AmmError, Result};

/// Whether an amount is being added to or withdrawn from the segment's
/// reserves. Only additions (exact-input swaps) are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveChange {
    Add,
    Remove,
}

/// Input and output needed to move one segment from a start price to an end price
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentAmounts {
    pub amount_in: BigInt,
    pub amount_out: BigInt,
    pub amount_in_exact: Decimal,
    pub amount_out_exact: Decimal,
}

/// Square root of a textual price, half-up at 32 digits
pub fn sqrt_price(price: &str) -> Result<Decimal> {
    let price: Decimal = price.parse()?;
    BASE.sqrt(&price)
}

/// Square a square-root price back into a price, half-up at 32 digits
pub fn sqrt_price_to_price(sqrt_price: &Decimal) -> String {
    BASE.mul(sqrt_price, sqrt_price).to_string()
}

/// Price after token X is added: `L*s / (L + a*s)`, rounded up
pub fn new_sqrt_price_from_amount_x(
    start: &Decimal,
    liquidity: &BigInt,
    amount: &BigInt,
    change: ReserveChange,
) -> Result<Decimal> {
    if change == ReserveChange::Remove {
        return Err(AmmError::NotImplemented);
    }
    let liquidity = Decimal::from_integer(liquidity);
    let amount = Decimal::from_integer(amount);

    let numerator = ROUND_UP.mul(start, &liquidity);
    let scaled_amount = ROUND_DOWN.mul(start, &amount);
    let denominator = ROUND_DOWN.add(&scaled_amount, &liquidity);
    ROUND_UP.quo(&numerator, &denominator)
}

/// Price after token Y is added: `s + a/L`, rounded down
pub fn new_sqrt_price_from_amount_y(
    start: &Decimal,
    liquidity: &BigInt,
    amount: &BigInt,
    change: ReserveChange,
) -> Result<Decimal> {
    if change == ReserveChange::Remove {
        return Err(AmmError::NotImplemented);
    }
    let liquidity = Decimal::from_integer(liquidity);
    let amount = Decimal::from_integer(amount);

    let step = ROUND_DOWN.quo(&amount, &liquidity)?;
    Ok(ROUND_DOWN.add(&step, start))
}

/// Output and end price for an exact input within one segment of constant
/// liquidity. Returns `(amount_out, end_sqrt_price)`.
pub fn swap_out(
    start: &Decimal,
    liquidity: &BigInt,
    amount_in: &BigInt,
    token_in_is_x: bool,
) -> Result<(BigInt, Decimal)> {
    let l = Decimal::from_integer(liquidity);
    if token_in_is_x {
        let end = new_sqrt_price_from_amount_x(start, liquidity, amount_in, ReserveChange::Add)?;
        let delta = ROUND_DOWN.sub(start, &end);
        let out = ROUND_DOWN.mul(&l, &delta);
        Ok((out.to_integer(false)?, end))
    } else {
        let end = new_sqrt_price_from_amount_y(start, liquidity, amount_in, ReserveChange::Add)?;
        let inv_start = ROUND_DOWN.quo(&Decimal::one(), start)?;
        let inv_end = ROUND_UP.quo(&Decimal::one(), &end)?;
        let delta = ROUND_DOWN.sub(&inv_start, &inv_end);
        let out = ROUND_DOWN.mul(&l, &delta);
        Ok((out.to_integer(false)?, end))
    }
}

/// Amounts required to move a segment from `start` to `end`.
/// An upward move takes Y and pays X; a downward move takes X and pays Y.
pub fn swap_amount(start: &Decimal, end: &Decimal, liquidity: &BigInt) -> Result<SegmentAmounts> {
    if start == end {
        return Err(AmmError::InvalidPrice);
    }
    let l = Decimal::from_integer(liquidity);

    let (amount_in_exact, amount_out_exact) = if start < end {
        let delta = ROUND_UP.sub(end, start);
        let amount_in = ROUND_UP.mul(&l, &delta);

        let inv_start = ROUND_DOWN.quo(&Decimal::one(), start)?;
        let inv_end = ROUND_UP.quo(&Decimal::one(), end)?;
        let inv_delta = ROUND_DOWN.sub(&inv_start, &inv_end);
        (amount_in, ROUND_DOWN.mul(&l, &inv_delta))
    } else {
        let inv_end = ROUND_UP.quo(&Decimal::one(), end)?;
        let inv_start = ROUND_DOWN.quo(&Decimal::one(), start)?;
        let inv_delta = ROUND_UP.sub(&inv_end, &inv_start);
        let amount_in = ROUND_UP.mul(&l, &inv_delta);

        let delta = ROUND_DOWN.sub(start, end);
        (amount_in, ROUND_DOWN.mul(&l, &delta))
    };

    Ok(SegmentAmounts {
        amount_in: amount_in_exact.to_integer(true)?,
        amount_out: amount_out_exact.to_integer(false)?,
        amount_in_exact,
        amount_out_exact,
    })
}

/// Token amounts needed to fund `liquidity` over `[low, high]` at `current`.
/// Each non-zero leg carries one extra unit. Returns `(amount_x, amount_y)`.
pub fn liquidity_to_amount(
    liquidity: &BigInt,
    low: &Decimal,
    current: &Decimal,
    high: &Decimal,
    direction: PriceDirection,
) -> Result<(BigInt, BigInt)> {
    if !liquidity.is_positive() {
        return Err(AmmError::InvalidLiquidity);
    }
    let amount_x = || -> Result<BigInt> {
        let leg = swap_amount(high, current, liquidity).map_err(|_| AmmError::InvalidPrice)?;
        Ok(leg.amount_in + 1)
    };
    let amount_y = || -> Result<BigInt> {
        let leg = swap_amount(low, current, liquidity).map_err(|_| AmmError::InvalidPrice)?;
        Ok(leg.amount_in + 1)
    };

    match direction {
        PriceDirection::Up => Ok((amount_x()?, BigInt::zero())),
        PriceDirection::Down => Ok((BigInt::zero(), amount_y()?)),
        PriceDirection::Both if current == low => Ok((amount_x()?, BigInt::zero())),
        PriceDirection::Both if current == high => Ok((BigInt::zero(), amount_y()?)),
        PriceDirection::Both => Ok((amount_x()?, amount_y()?)),
    }
}

/// Liquidity bought by depositing `amount_y` below the current price
pub fn liquidity_from_amount_y(
    low: &Decimal,
    current: &Decimal,
    _high: &Decimal,
    amount_y: &BigInt,
) -> Result<BigInt> {
    if !amount_y.is_positive() {
        return Err(AmmError::InvalidAmount);
    }
    if current == low {
        return Err(AmmError::InvalidPrice);
    }
    let width = ROUND_UP.sub(current, low);
    let liquidity = ROUND_DOWN.quo(&Decimal::from_integer(amount_y), &width)?;
    liquidity.to_integer(false)
}

/// Liquidity bought by depositing `amount_x` above the current price
pub fn liquidity_from_amount_x(
    _low: &Decimal,
    current: &Decimal,
    high: &Decimal,
    amount_x: &BigInt,
) -> Result<BigInt> {
    if !amount_x.is_positive() {
        return Err(AmmError::InvalidAmount);
    }
    if current == high {
        return Err(AmmError::InvalidPrice);
    }
    let product = ROUND_DOWN.mul(current, high);
    let width = ROUND_UP.sub(high, current);
    let per_unit = ROUND_DOWN.quo(&product, &width)?;
    let liquidity = ROUND_DOWN.mul(&Decimal::from_integer(amount_x), &per_unit);
    liquidity.to_integer(false)
}

/// Full-range style liquidity `sqrt(x * y)`, rounded down
pub fn liquidity_from_amount(amount_x: &BigInt, amount_y: &BigInt) -> Result<BigInt> {
    if !amount_x.is_positive() || !amount_y.is_positive() {
        return Err(AmmError::InvalidAmount);
    }
    let product = BASE.mul(&Decimal::from_integer(amount_x), &Decimal::from_integer(amount_y));
    BASE.sqrt(&product)?.to_integer(false)
}

/// X leg matching a Y deposit over the same range
pub fn amount_x_from_amount_y(
    low: &Decimal,
    current: &Decimal,
    high: &Decimal,
    amount_y: &BigInt,
) -> Result<BigInt> {
    let liquidity = liquidity_from_amount_y(low, current, high, amount_y)?;
    let (amount_x, _) = liquidity_to_amount(&liquidity, low, current, high, PriceDirection::Both)?;
    Ok(amount_x)
}

/// Y leg matching an X deposit over the same range
pub fn amount_y_from_amount_x(
    low: &Decimal,
    current: &Decimal,
    high: &Decimal,
    amount_x: &BigInt,
) -> Result<BigInt> {
    let liquidity = liquidity_from_amount_x(low, current, high, amount_x)?;
    let (_, amount_y) = liquidity_to_amount(&liquidity, low, current, high, PriceDirection::Both)?;
    Ok(amount_y)
}

/// `dividend / divisor > minimum` with the quotient rounded down.
/// A failed division counts as "not greater".
pub fn quotient_greater_than(dividend: &Decimal, divisor: &Decimal, minimum: &Decimal) -> bool {
    match ROUND_DOWN.quo(dividend, divisor) {
        Ok(quotient) => quotient > *minimum,
        Err(err) => {
            debug!(%dividend, %divisor, error = %err, "quotient comparison failed");
            false
        }
    }
}

/// Fee-adjusted spot price at a square-root price, as plain text.
///
/// `Down` quotes Y received per X paid; `Up` quotes X received per Y paid.
pub fn sqrt_price_to_price_with_fee(
    sqrt_price: &Decimal,
    fee_ratio: &Decimal,
    direction: PriceDirection,
) -> Result<String> {
    let price = BASE.mul(sqrt_price, sqrt_price);
    let keep = BASE.sub(&Decimal::one(), fee_ratio);
    let quoted = match direction {
        PriceDirection::Down => BASE.mul(&price, &keep),
        PriceDirection::Up => {
            let reciprocal = BASE.quo(&Decimal::one(), &price)?;
            BASE.mul(&reciprocal, &keep)
        }
        PriceDirection::Both => return Err(AmmError::InvalidPriceDirection),
    };
    Ok(quoted.to_plain_string())
}

/// `amount_in * fee_ratio`, rounded in the requested direction
pub fn fee_for(amount_in: &BigInt, fee_ratio: &Decimal, round_up: bool) -> Result<BigInt> {
    let fee = ROUND_UP.mul(&Decimal::from_integer(amount_in), fee_ratio);
    fee.to_integer(round_up)
}

/// Rounded-up fee that must exceed one unit for the swap to be admissible
pub fn checked_fee(amount_in: &BigInt, fee_ratio: &Decimal) -> Result<BigInt> {
    let fee = fee_for(amount_in, fee_ratio, true).map_err(|_| AmmError::InvalidFee)?;
    if fee <= BigInt::one() {
        debug!(%amount_in, %fee, "swap too small to carry a fee");
        return Err(AmmError::InvalidAmount);
    }
    Ok(fee)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn int(s: &str) -> BigInt {
        s.parse().unwrap()
    }

    #[test]
    fn test_fee_rounding() {
        let fee = d("0.003");
        assert_eq!(fee_for(&int("1000"), &fee, true).unwrap(), int("3"));
        assert_eq!(fee_for(&int("1000"), &fee, false).unwrap(), int("3"));
        assert_eq!(fee_for(&int("1"), &fee, true).unwrap(), int("1"));
        assert_eq!(fee_for(&int("1"), &fee, false).unwrap(), int("0"));
    }

    #[test]
    fn test_checked_fee_rejects_dust() {
        let fee = d("0.003");
        assert_eq!(checked_fee(&int("1"), &fee).unwrap_err(), AmmError::InvalidAmount);
        assert_eq!(checked_fee(&int("333"), &fee).unwrap_err(), AmmError::InvalidAmount);
        assert_eq!(checked_fee(&int("1000"), &fee).unwrap(), int("3"));
    }

    #[test]
    fn test_quotient_greater_than() {
        let min = d("1.00005");
        assert!(!quotient_greater_than(&d("1.00015"), &d("1.0001000025000002"), &min));
        assert!(quotient_greater_than(
            &d("1.0005501375206283"),
            &d("1.0005001125150024"),
            &min
        ));
        assert!(!quotient_greater_than(&d("1"), &d("2"), &min));
        assert!(!quotient_greater_than(&d("1"), &d("0"), &min));
    }

    #[test]
    fn test_liquidity_from_amount() {
        let liquidity =
            liquidity_from_amount(&int("10000000000000000000"), &int("20000000000")).unwrap();
        assert_eq!(liquidity, int("447213595499957"));
        assert_eq!(
            liquidity_from_amount(&int("0"), &int("1")).unwrap_err(),
            AmmError::InvalidAmount
        );
    }

    #[test]
    fn test_sqrt_price_round_trip() {
        let s = sqrt_price("4").unwrap();
        assert_eq!(s, d("2"));
        assert_eq!(sqrt_price_to_price(&s), "4");
        assert_eq!(sqrt_price("-1").unwrap_err(), AmmError::InvalidNumber);
        assert_eq!(sqrt_price("x").unwrap_err(), AmmError::InvalidNumber);
    }

    #[test]
    fn test_new_sqrt_price_moves_the_right_way() {
        let start = d("2");
        let liquidity = int("1000000");
        let amount = int("1000");

        let after_x =
            new_sqrt_price_from_amount_x(&start, &liquidity, &amount, ReserveChange::Add).unwrap();
        assert!(after_x < start);
        let after_y =
            new_sqrt_price_from_amount_y(&start, &liquidity, &amount, ReserveChange::Add).unwrap();
        assert_eq!(after_y, d("2.001"));

        assert_eq!(
            new_sqrt_price_from_amount_x(&start, &liquidity, &amount, ReserveChange::Remove)
                .unwrap_err(),
            AmmError::NotImplemented
        );
        assert_eq!(
            new_sqrt_price_from_amount_y(&start, &liquidity, &amount, ReserveChange::Remove)
                .unwrap_err(),
            AmmError::NotImplemented
        );
    }

    #[test]
    fn test_swap_amount_rounds_in_favour_of_pool() {
        let liquidity = int("1000000000");
        let up = swap_amount(&d("1"), &d("1.1"), &liquidity).unwrap();
        assert_eq!(up.amount_in, int("100000000"));
        assert!(up.amount_out_exact <= d("90909090.909090909090909090909091"));
        assert_eq!(up.amount_out, int("90909090"));

        let down = swap_amount(&d("1.1"), &d("1"), &liquidity).unwrap();
        assert_eq!(down.amount_in, int("90909091"));
        assert_eq!(down.amount_out, int("100000000"));

        assert_eq!(
            swap_amount(&d("1"), &d("1"), &liquidity).unwrap_err(),
            AmmError::InvalidPrice
        );
    }

    #[test]
    fn test_swap_out_within_segment() {
        let liquidity = int("1000000000");
        let (out, end) = swap_out(&d("1"), &liquidity, &int("100000000"), false).unwrap();
        assert_eq!(end, d("1.1"));
        assert!(out <= int("90909090"));
        assert!(out >= int("90909089"));

        // the rounded-up input overshoots the segment end by a hair
        let (out, end) = swap_out(&d("1.1"), &liquidity, &int("90909091"), true).unwrap();
        assert!(end < d("1"));
        assert_eq!(out, int("100000000"));
    }

    #[test]
    fn test_liquidity_to_amount_by_direction() {
        let (low, current, high) = (d("1"), d("1.5"), d("2"));
        let liquidity = int("1000000");

        let (x, y) = liquidity_to_amount(&liquidity, &low, &current, &high, PriceDirection::Both)
            .unwrap();
        assert!(x.is_positive() && y.is_positive());
        // y = L * (1.5 - 1) + 1
        assert_eq!(y, int("500001"));

        let (x_up, y_up) =
            liquidity_to_amount(&liquidity, &low, &current, &high, PriceDirection::Up).unwrap();
        assert_eq!((x_up, y_up), (x.clone(), BigInt::zero()));

        let (x_down, y_down) =
            liquidity_to_amount(&liquidity, &low, &current, &high, PriceDirection::Down).unwrap();
        assert_eq!((x_down, y_down), (BigInt::zero(), y));

        let (x_edge, y_edge) =
            liquidity_to_amount(&liquidity, &low, &low, &high, PriceDirection::Both).unwrap();
        assert!(x_edge.is_positive());
        assert!(y_edge.is_zero());

        assert_eq!(
            liquidity_to_amount(&BigInt::zero(), &low, &current, &high, PriceDirection::Both)
                .unwrap_err(),
            AmmError::InvalidLiquidity
        );
    }

    #[test]
    fn test_liquidity_from_single_sided_amounts() {
        let (low, current, high) = (d("1"), d("1.5"), d("2"));
        assert_eq!(
            liquidity_from_amount_y(&low, &current, &high, &int("500000")).unwrap(),
            int("1000000")
        );
        assert_eq!(
            liquidity_from_amount_y(&low, &low, &high, &int("500000")).unwrap_err(),
            AmmError::InvalidPrice
        );
        // x = L * (1/1.5 - 1/2) => L = x * 1.5 * 2 / 0.5
        assert_eq!(
            liquidity_from_amount_x(&low, &current, &high, &int("1000")).unwrap(),
            int("6000")
        );
        assert_eq!(
            liquidity_from_amount_x(&low, &high, &high, &int("1000")).unwrap_err(),
            AmmError::InvalidPrice
        );
    }

    #[test]
    fn test_matching_deposit_legs() {
        let (low, current, high) = (d("1"), d("1.5"), d("2"));
        let x = amount_x_from_amount_y(&low, &current, &high, &int("500000")).unwrap();
        // L = 1_000_000, x = L * (1/1.5 - 1/2) rounded up, plus one
        assert_eq!(x, int("166668"));
        let y = amount_y_from_amount_x(&low, &current, &high, &int("1000")).unwrap();
        assert_eq!(y, int("3001"));
    }

    #[test]
    fn test_spot_price_with_fee() {
        let fee = d("0.003");
        assert_eq!(
            sqrt_price_to_price_with_fee(&d("2"), &fee, PriceDirection::Down).unwrap(),
            "3.988"
        );
        assert_eq!(
            sqrt_price_to_price_with_fee(&d("2"), &fee, PriceDirection::Up).unwrap(),
            "0.24925"
        );
        assert_eq!(
            sqrt_price_to_price_with_fee(&d("2"), &fee, PriceDirection::Both).unwrap_err(),
            AmmError::InvalidPriceDirection
        );
    }
}
