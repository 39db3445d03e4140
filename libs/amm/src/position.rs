//! Liquidity positions
//!
//! ## Purpose
//!
//! A [`Position`] is one provider's liquidity over a square-root price
//! range inside a pool. It is the unit that actually trades: pools split a
//! swap across positions and each position settles its share independently
//! against its own current price.
//!
//! ## Invariants
//!
//! - `low < high`, `low <= current <= high`, and the range lies within
//!   `[2^-64, 2^64]`.
//! - `high / low` exceeds 1.00005, so no range is degenerate.
//! - `liquidity > 0`.
//! - Only `current_sqrt_price` ever changes after construction, and only
//!   through a successful non-dry-run swap.

use num_bigint::BigInt;
use num_traits::Signed;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{full_range_high_sqrt_price, full_range_low_sqrt_price, min_sqrt_price_factor};
use crate::decimal::Decimal;
use crate::direction::PriceDirection;
use crate::error::{AmmError, Result};
use crate::identity::{normalize_account, PoolId, PositionId};
use crate::math::{checked_fee, quotient_greater_than, sqrt_price_to_price, swap_out};

/// Result of settling one position's share of a swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapOutput {
    #[serde(rename = "lpID")]
    pub position_id: PositionId,
    pub token_in: String,
    #[serde(with = "crate::integer::text")]
    pub amount_in: BigInt,
    pub token_out: String,
    #[serde(with = "crate::integer::text")]
    pub amount_out: BigInt,
    #[serde(with = "crate::integer::text")]
    pub fee: BigInt,
    pub start_sqrt_price: Decimal,
    pub end_sqrt_price: Decimal,
    pub is_dry_run: bool,
}

/// Liquidity provided by one account over a price range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    #[serde(rename = "poolID")]
    pool_id: PoolId,
    #[serde(rename = "tokenX")]
    token_x: String,
    #[serde(rename = "tokenY")]
    token_y: String,
    fee_ratio: Decimal,
    #[serde(rename = "accID")]
    owner: String,
    low_sqrt_price: Decimal,
    current_sqrt_price: Decimal,
    high_sqrt_price: Decimal,
    #[serde(with = "crate::integer::text")]
    liquidity: BigInt,
    price_direction: PriceDirection,
}

impl Position {
    /// Validate and construct a position. The owner is normalized.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool_id: &PoolId,
        token_x: &str,
        token_y: &str,
        fee_ratio: Decimal,
        owner: &str,
        low_sqrt_price: Decimal,
        current_sqrt_price: Decimal,
        high_sqrt_price: Decimal,
        liquidity: BigInt,
        price_direction: PriceDirection,
    ) -> Result<Self> {
        let position = Self {
            pool_id: pool_id.clone(),
            token_x: token_x.to_string(),
            token_y: token_y.to_string(),
            fee_ratio,
            owner: normalize_account(owner)?,
            low_sqrt_price,
            current_sqrt_price,
            high_sqrt_price,
            liquidity,
            price_direction,
        };
        position.validate()?;
        Ok(position)
    }

    /// Re-check every construction invariant, e.g. after deserializing
    pub fn validate(&self) -> Result<()> {
        if PoolId::derive(&self.token_x, &self.token_y, &self.fee_ratio) != self.pool_id {
            return Err(AmmError::InvalidPool);
        }
        if normalize_account(&self.owner)? != self.owner {
            return Err(AmmError::InvalidAddress(self.owner.clone()));
        }
        if !self.liquidity.is_positive() {
            return Err(AmmError::InvalidLiquidity);
        }

        let (low, current, high) =
            (&self.low_sqrt_price, &self.current_sqrt_price, &self.high_sqrt_price);
        if current < low || current > high || low >= high {
            return Err(AmmError::InvalidPrice);
        }
        if *low < full_range_low_sqrt_price() || *high > full_range_high_sqrt_price() {
            return Err(AmmError::InvalidPrice);
        }
        if !quotient_greater_than(high, low, &min_sqrt_price_factor()) {
            return Err(AmmError::InvalidPrice);
        }
        Ok(())
    }

    pub fn id(&self) -> PositionId {
        PositionId::derive(
            &self.pool_id,
            &self.owner,
            &self.low_sqrt_price,
            &self.high_sqrt_price,
            self.price_direction.as_str(),
        )
    }

    pub fn pool_id(&self) -> &PoolId {
        &self.pool_id
    }

    pub fn token_x(&self) -> &str {
        &self.token_x
    }

    pub fn token_y(&self) -> &str {
        &self.token_y
    }

    pub fn fee_ratio(&self) -> &Decimal {
        &self.fee_ratio
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn low_sqrt_price(&self) -> &Decimal {
        &self.low_sqrt_price
    }

    pub fn current_sqrt_price(&self) -> &Decimal {
        &self.current_sqrt_price
    }

    pub fn high_sqrt_price(&self) -> &Decimal {
        &self.high_sqrt_price
    }

    pub fn liquidity(&self) -> &BigInt {
        &self.liquidity
    }

    pub fn price_direction(&self) -> PriceDirection {
        self.price_direction
    }

    pub fn low_price(&self) -> String {
        sqrt_price_to_price(&self.low_sqrt_price)
    }

    pub fn current_price(&self) -> String {
        sqrt_price_to_price(&self.current_sqrt_price)
    }

    pub fn high_price(&self) -> String {
        sqrt_price_to_price(&self.high_sqrt_price)
    }

    pub fn has_token(&self, token: &str) -> bool {
        token == self.token_x || token == self.token_y
    }

    /// Whether this position still has inventory to sell when the price
    /// moves in `direction`, and is willing to.
    pub fn can_supply(&self, direction: PriceDirection) -> bool {
        match direction {
            PriceDirection::Up => {
                self.price_direction != PriceDirection::Down
                    && self.current_sqrt_price < self.high_sqrt_price
            }
            PriceDirection::Down => {
                self.price_direction != PriceDirection::Up
                    && self.current_sqrt_price > self.low_sqrt_price
            }
            PriceDirection::Both => false,
        }
    }

    /// Where this position's price ends if the pool price moves to `target`,
    /// clamped to the range. `None` when the move does not reach the position.
    pub fn segment_end(&self, direction: PriceDirection, target: &Decimal) -> Option<Decimal> {
        match direction {
            PriceDirection::Up if *target > self.current_sqrt_price => {
                Some(target.min(&self.high_sqrt_price).clone())
            }
            PriceDirection::Down if *target < self.current_sqrt_price => {
                Some(target.max(&self.low_sqrt_price).clone())
            }
            _ => None,
        }
    }

    /// Quote a swap against this position without touching its state
    pub fn simulate(&self, token_in: &str, token_out: &str, amount_in: &BigInt) -> Result<SwapOutput> {
        if token_in == token_out || !self.has_token(token_in) || !self.has_token(token_out) {
            return Err(AmmError::InvalidToken);
        }
        if !amount_in.is_positive() {
            return Err(AmmError::InvalidAmount);
        }

        let fee = checked_fee(amount_in, &self.fee_ratio)?;
        let net_in = amount_in - &fee;

        let token_in_is_x = token_in == self.token_x;
        let (amount_out, end_sqrt_price) = if token_in_is_x {
            if self.price_direction == PriceDirection::Up {
                return Err(AmmError::InvalidToken);
            }
            let (out, end) = swap_out(&self.current_sqrt_price, &self.liquidity, &net_in, true)?;
            if end < self.low_sqrt_price {
                return Err(AmmError::OutOfRange);
            }
            (out, end)
        } else {
            if self.price_direction == PriceDirection::Down {
                return Err(AmmError::InvalidToken);
            }
            let (out, end) = swap_out(&self.current_sqrt_price, &self.liquidity, &net_in, false)?;
            if end > self.high_sqrt_price {
                return Err(AmmError::OutOfRange);
            }
            (out, end)
        };

        Ok(SwapOutput {
            position_id: self.id(),
            token_in: token_in.to_string(),
            amount_in: amount_in.clone(),
            token_out: token_out.to_string(),
            amount_out,
            fee,
            start_sqrt_price: self.current_sqrt_price.clone(),
            end_sqrt_price,
            is_dry_run: true,
        })
    }

    /// Execute a swap. The current price only moves when `dry_run` is false.
    pub fn swap(
        &mut self,
        token_in: &str,
        token_out: &str,
        amount_in: &BigInt,
        dry_run: bool,
    ) -> Result<SwapOutput> {
        let mut output = self.simulate(token_in, token_out, amount_in)?;
        output.is_dry_run = dry_run;
        if !dry_run {
            debug!(
                position = %output.position_id,
                from = %self.current_sqrt_price,
                to = %output.end_sqrt_price,
                "position price moved"
            );
            self.current_sqrt_price = output.end_sqrt_price.clone();
        }
        Ok(output)
    }

    /// Whether the position would pay at least `amount_out` for this input
    pub fn verify_swap(
        &self,
        token_in: &str,
        token_out: &str,
        amount_in: &BigInt,
        amount_out: &BigInt,
    ) -> Result<bool> {
        let output = self.simulate(token_in, token_out, amount_in)?;
        Ok(output.amount_out >= *amount_out)
    }

    pub(crate) fn restore_sqrt_price(&mut self, sqrt_price: Decimal) {
        self.current_sqrt_price = sqrt_price;
    }
}
