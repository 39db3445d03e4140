//! Pools and pool-level swap execution
//!
//! ## Purpose
//!
//! A [`Pool`] is a token pair with a fee tier that owns every position
//! trading that pair at that fee. A pool swap proceeds in two phases:
//!
//! 1. **Walk**: aggregate the positions into ticks and consume liquidity
//!    interval by interval until the net input is spent, which fixes the
//!    pool's end price.
//! 2. **Allocate**: give each position the gross input that moves its own
//!    price to that end price (clamped to its range), reconcile the integer
//!    rounding drift against the requested amount, and settle each position.
//!
//! ## Atomicity
//!
//! A live swap either settles every allocated position or, on the first
//! failure, restores every touched position to its pre-swap price.

use std::collections::BTreeMap;

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::decimal::{Decimal, BASE, ROUND_DOWN, ROUND_UP};
use crate::direction::PriceDirection;
use crate::error::{AmmError, Result};
use crate::identity::{PoolId, PositionId};
use crate::math::{checked_fee, sqrt_price_to_price_with_fee, swap_amount, swap_out};
use crate::position::{Position, SwapOutput};
use crate::settlement::summary_swap_outputs;
use crate::tick::{aggregate_ticks, Tick};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    #[serde(rename = "tokenXTag")]
    token_x: String,
    #[serde(rename = "tokenYTag")]
    token_y: String,
    fee_ratio: Decimal,
    #[serde(skip)]
    positions: BTreeMap<PositionId, Position>,
}

/// Per-position gross inputs decided by the allocation phase
#[derive(Debug, Clone)]
struct SwapPlan {
    allocations: Vec<(PositionId, BigInt)>,
}

impl Pool {
    /// A pool over `(token_x, token_y)` with `token_x < token_y`.
    /// The fee ratio must lie in `[0, 1)`.
    pub fn new(token_x: &str, token_y: &str, fee_ratio: &str) -> Result<Self> {
        let fee_ratio: Decimal = fee_ratio.parse().map_err(|_| AmmError::InvalidFee)?;
        if fee_ratio.is_negative() || fee_ratio >= Decimal::one() {
            return Err(AmmError::InvalidFee);
        }
        if token_x >= token_y {
            return Err(AmmError::InvalidToken);
        }
        Ok(Self {
            token_x: token_x.to_string(),
            token_y: token_y.to_string(),
            fee_ratio,
            positions: BTreeMap::new(),
        })
    }

    pub fn id(&self) -> PoolId {
        PoolId::derive(&self.token_x, &self.token_y, &self.fee_ratio)
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

    pub fn has_token(&self, token: &str) -> bool {
        token == self.token_x || token == self.token_y
    }

    /// The pool's other token, if `token` belongs to it
    pub fn counter_token(&self, token: &str) -> Option<&str> {
        if token == self.token_x {
            Some(&self.token_y)
        } else if token == self.token_y {
            Some(&self.token_x)
        } else {
            None
        }
    }

    /// Insert or replace a position. It must belong to this pool.
    pub fn add_position(&mut self, position: Position) -> Result<PositionId> {
        if *position.pool_id() != self.id() {
            return Err(AmmError::InvalidPool);
        }
        let id = position.id();
        if self.positions.insert(id.clone(), position).is_some() {
            debug!(pool = %self.id(), position = %id, "position replaced");
        }
        Ok(id)
    }

    pub fn remove_position(&mut self, id: &PositionId) -> Option<Position> {
        self.positions.remove(id)
    }

    pub fn position(&self, id: &PositionId) -> Option<&Position> {
        self.positions.get(id)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    fn eligible<'a>(
        &'a self,
        excluded: &'a [PositionId],
    ) -> impl Iterator<Item = (&'a PositionId, &'a Position)> + 'a {
        self.positions
            .iter()
            .filter(move |(id, _)| !excluded.contains(id))
    }

    /// Liquidity ticks for a price move, ignoring `excluded` positions
    pub fn ticks(&self, direction: PriceDirection, excluded: &[PositionId]) -> Result<Vec<Tick>> {
        aggregate_ticks(self.eligible(excluded).map(|(_, position)| position), direction)
    }

    fn swap_direction(&self, token_in: &str, token_out: &str) -> Result<PriceDirection> {
        if token_in == token_out || !self.has_token(token_in) || !self.has_token(token_out) {
            return Err(AmmError::InvalidToken);
        }
        Ok(if token_in == self.token_x {
            PriceDirection::Down
        } else {
            PriceDirection::Up
        })
    }

    fn plan_swap(
        &self,
        token_in: &str,
        token_out: &str,
        amount_in: &BigInt,
        excluded: &[PositionId],
    ) -> Result<SwapPlan> {
        let direction = self.swap_direction(token_in, token_out)?;
        if !amount_in.is_positive() {
            return Err(AmmError::InvalidAmount);
        }
        let fee = checked_fee(amount_in, &self.fee_ratio)?;
        let net_in = amount_in - &fee;

        let ticks = self.ticks(direction, excluded)?;
        let (end_sqrt_price, amount_out) =
            walk_ticks(&ticks, &net_in, direction == PriceDirection::Down)?;
        if !amount_out.is_positive() {
            return Err(AmmError::InvalidAmount);
        }

        let keep = ROUND_DOWN.sub(&Decimal::one(), &self.fee_ratio);
        let mut allocations: BTreeMap<PositionId, BigInt> = BTreeMap::new();
        let mut total = BigInt::zero();
        for (id, position) in self.eligible(excluded) {
            if !position.can_supply(direction) {
                continue;
            }
            let Some(segment_end) = position.segment_end(direction, &end_sqrt_price) else {
                continue;
            };
            let segment = swap_amount(position.current_sqrt_price(), &segment_end, position.liquidity())?;
            let gross = ROUND_UP.quo(&segment.amount_in_exact, &keep)?;
            let allocated = gross.to_integer(false)?;
            if !allocated.is_positive() || checked_fee(&allocated, &self.fee_ratio).is_err() {
                debug!(position = %id, %allocated, "allocation too small, skipped");
                continue;
            }
            total += &allocated;
            allocations.insert(id.clone(), allocated);
        }
        if allocations.is_empty() {
            return Err(AmmError::NoPath);
        }

        let drift = &total - amount_in;
        if !drift.is_zero() {
            let adjusted = allocations.iter().find_map(|(id, allocated)| {
                let candidate = allocated - &drift;
                let position = self.positions.get(id)?;
                match position.simulate(token_in, token_out, &candidate) {
                    Ok(_) => Some((id.clone(), candidate)),
                    Err(err) => {
                        debug!(position = %id, %candidate, error = %err, "drift adjustment rejected");
                        None
                    }
                }
            });
            match adjusted {
                Some((id, candidate)) => {
                    allocations.insert(id, candidate);
                }
                None => warn!(
                    pool = %self.id(),
                    %amount_in,
                    %total,
                    "allocation drift could not be reconciled"
                ),
            }
        }

        Ok(SwapPlan {
            allocations: allocations.into_iter().collect(),
        })
    }

    /// Quote a swap across every eligible position without moving any price
    pub fn simulate_swap(
        &self,
        token_in: &str,
        token_out: &str,
        amount_in: &BigInt,
        excluded: &[PositionId],
    ) -> Result<Vec<SwapOutput>> {
        let plan = self.plan_swap(token_in, token_out, amount_in, excluded)?;
        plan.allocations
            .iter()
            .map(|(id, allocated)| {
                let position = self.positions.get(id).ok_or(AmmError::NoPosition)?;
                position.simulate(token_in, token_out, allocated)
            })
            .collect()
    }

    /// Execute a swap across the pool. With `dry_run` nothing moves;
    /// otherwise every allocated position settles or none does.
    pub fn execute_swap(
        &mut self,
        token_in: &str,
        token_out: &str,
        amount_in: &BigInt,
        excluded: &[PositionId],
        dry_run: bool,
    ) -> Result<Vec<SwapOutput>> {
        if dry_run {
            return self.simulate_swap(token_in, token_out, amount_in, excluded);
        }
        let plan = self.plan_swap(token_in, token_out, amount_in, excluded)?;

        let snapshot: Vec<(PositionId, Decimal)> = plan
            .allocations
            .iter()
            .filter_map(|(id, _)| {
                self.positions
                    .get(id)
                    .map(|position| (id.clone(), position.current_sqrt_price().clone()))
            })
            .collect();

        let mut outputs = Vec::with_capacity(plan.allocations.len());
        for (id, allocated) in &plan.allocations {
            let result = match self.positions.get_mut(id) {
                Some(position) => position.swap(token_in, token_out, allocated, false),
                None => Err(AmmError::NoPosition),
            };
            match result {
                Ok(output) => outputs.push(output),
                Err(err) => {
                    warn!(pool = %self.id(), position = %id, error = %err, "pool swap failed, rolling back");
                    self.restore(&snapshot);
                    return Err(err);
                }
            }
        }
        Ok(outputs)
    }

    /// Settle one position directly, bypassing allocation
    pub(crate) fn swap_position(
        &mut self,
        id: &PositionId,
        token_in: &str,
        token_out: &str,
        amount_in: &BigInt,
    ) -> Result<SwapOutput> {
        let position = self.positions.get_mut(id).ok_or(AmmError::NoPosition)?;
        position.swap(token_in, token_out, amount_in, false)
    }

    pub(crate) fn restore(&mut self, snapshot: &[(PositionId, Decimal)]) {
        for (id, sqrt_price) in snapshot {
            if let Some(position) = self.positions.get_mut(id) {
                position.restore_sqrt_price(sqrt_price.clone());
            }
        }
    }

    /// Fee-adjusted marginal price at the best tick for `direction`
    pub fn spot_price_with_fee(&self, direction: PriceDirection) -> Result<String> {
        let ticks = self.ticks(direction, &[])?;
        let best = ticks.first().ok_or(AmmError::NoPosition)?;
        sqrt_price_to_price_with_fee(&best.sqrt_price, &self.fee_ratio, direction)
    }

    /// Effective price of a dry-run swap of `reference_amount`, as out/in.
    /// `Down` sells X for Y; `Up` sells Y for X.
    pub fn current_price(&self, direction: PriceDirection, reference_amount: &BigInt) -> Result<String> {
        let (token_in, token_out) = match direction {
            PriceDirection::Down => (&self.token_x, &self.token_y),
            PriceDirection::Up => (&self.token_y, &self.token_x),
            PriceDirection::Both => return Err(AmmError::InvalidPriceDirection),
        };
        let outputs = self.simulate_swap(token_in, token_out, reference_amount, &[])?;
        let amount_out: BigInt = outputs.iter().map(|output| &output.amount_out).sum();
        let price = BASE.quo(
            &Decimal::from_integer(&amount_out),
            &Decimal::from_integer(reference_amount),
        )?;
        Ok(price.to_plain_string())
    }
}

/// Consume ticks in order until `amount_in` is spent.
/// Returns the end square-root price and the total output.
fn walk_ticks(ticks: &[Tick], amount_in: &BigInt, token_in_is_x: bool) -> Result<(Decimal, BigInt)> {
    let mut remaining = amount_in.clone();
    let mut amount_out = BigInt::zero();
    let mut liquidity = BigInt::zero();

    for (i, tick) in ticks.iter().enumerate() {
        let Some(next) = ticks.get(i + 1) else {
            break;
        };
        liquidity += &tick.liquidity;
        if liquidity.is_zero() {
            continue;
        }

        let segment = swap_amount(&tick.sqrt_price, &next.sqrt_price, &liquidity)?;
        if remaining <= segment.amount_in {
            let (out, end) = swap_out(&tick.sqrt_price, &liquidity, &remaining, token_in_is_x)?;
            amount_out += out;
            return Ok((end, amount_out));
        }
        amount_out += segment.amount_out;
        remaining -= segment.amount_in;
    }

    debug!(%amount_in, %remaining, "liquidity exhausted before input was spent");
    Err(AmmError::OutOfRange)
}

/// Chain single-pool swaps along `pools`, feeding each pool's output into
/// the next. Returns every position output and the final amount out.
pub fn pools_swap(
    pools: &[&Pool],
    token_in: &str,
    token_out: &str,
    amount_in: &BigInt,
    excluded: &[PositionId],
) -> Result<(Vec<SwapOutput>, BigInt)> {
    if pools.is_empty() {
        return Err(AmmError::InvalidPoolPaths);
    }

    let mut outputs = Vec::new();
    let mut hop_token = token_in.to_string();
    let mut hop_amount = amount_in.clone();
    for pool in pools {
        let next_token = pool
            .counter_token(&hop_token)
            .ok_or(AmmError::InvalidPoolPaths)?
            .to_string();
        let hop_outputs = pool.simulate_swap(&hop_token, &next_token, &hop_amount, excluded)?;
        let summary = summary_swap_outputs(&hop_outputs)?;
        outputs.extend(hop_outputs);
        hop_token = summary.token_out;
        hop_amount = summary.amount_out;
    }

    if hop_token != token_out {
        return Err(AmmError::InvalidPoolPaths);
    }
    Ok((outputs, hop_amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::sqrt_price;

    const ETH: &str = "ethereum-eth-0x0000000000000000000000000000000000000000";
    const USDT: &str = "ethereum-usdt-0xdac17f958d2ee523a2206206994597c13d831ec7";
    const OWNER: &str = "0x911F42b0229c15bBB38D648B7Aa7CA480eD977d6";
    const OTHER_OWNER: &str = "0x61EbF673c200646236B2c53465bcA0699455d5FA";

    fn eth_usdt_pool() -> Pool {
        let mut pool = Pool::new(ETH, USDT, "0.003").unwrap();
        let position = Position::new(
            &pool.id(),
            ETH,
            USDT,
            pool.fee_ratio().clone(),
            OWNER,
            sqrt_price("1E-9").unwrap(),
            sqrt_price("3E-9").unwrap(),
            sqrt_price("5E-9").unwrap(),
            "273861278752583".parse().unwrap(),
            PriceDirection::Both,
        )
        .unwrap();
        pool.add_position(position).unwrap();
        pool
    }

    fn add_second_position(pool: &mut Pool) -> PositionId {
        let position = Position::new(
            &pool.id(),
            ETH,
            USDT,
            pool.fee_ratio().clone(),
            OTHER_OWNER,
            sqrt_price("2E-9").unwrap(),
            sqrt_price("3E-9").unwrap(),
            sqrt_price("4E-9").unwrap(),
            "173861278752583".parse().unwrap(),
            PriceDirection::Both,
        )
        .unwrap();
        pool.add_position(position).unwrap()
    }

    #[test]
    fn test_new_pool_validates_fee() {
        assert_eq!(Pool::new(ETH, USDT, "1").unwrap_err(), AmmError::InvalidFee);
        assert_eq!(Pool::new(ETH, USDT, "-0.1").unwrap_err(), AmmError::InvalidFee);
        assert_eq!(Pool::new(ETH, USDT, "fee").unwrap_err(), AmmError::InvalidFee);
        assert_eq!(Pool::new(ETH, ETH, "0.003").unwrap_err(), AmmError::InvalidToken);
    }

    #[test]
    fn test_new_pool_requires_ordered_tokens() {
        assert_eq!(Pool::new("usdt", "eth", "0.003").unwrap_err(), AmmError::InvalidToken);
        assert_eq!(Pool::new(USDT, ETH, "0.003").unwrap_err(), AmmError::InvalidToken);
        assert!(Pool::new("eth", "usdt", "0.003").is_ok());
        assert!(Pool::new(ETH, USDT, "0").is_ok());
    }

    #[test]
    fn test_swap_y_for_x_spends_exact_input() {
        let mut pool = eth_usdt_pool();
        let amount_in = BigInt::from(1_000_000);
        let outputs = pool.execute_swap(USDT, ETH, &amount_in, &[], false).unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].amount_in, amount_in);
        assert!(outputs[0].amount_out.is_positive());
        assert!(!outputs[0].is_dry_run);
    }

    #[test]
    fn test_swap_beyond_depth_is_out_of_range() {
        let mut pool = eth_usdt_pool();
        let before: Vec<Position> = pool.positions().cloned().collect();
        let err = pool
            .execute_swap(ETH, USDT, &"100000000000000000000".parse().unwrap(), &[], false)
            .unwrap_err();
        assert_eq!(err, AmmError::OutOfRange);
        let after: Vec<Position> = pool.positions().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_dry_run_matches_live_and_moves_nothing() {
        let mut pool = eth_usdt_pool();
        add_second_position(&mut pool);
        let amount_in = BigInt::from(5_000_000);

        let quoted = pool.execute_swap(USDT, ETH, &amount_in, &[], true).unwrap();
        let unchanged: Vec<Position> = pool.positions().cloned().collect();
        assert!(quoted.iter().all(|output| output.is_dry_run));

        let live = pool.execute_swap(USDT, ETH, &amount_in, &[], false).unwrap();
        assert_eq!(quoted.len(), live.len());
        for (q, l) in quoted.iter().zip(&live) {
            assert_eq!(q.amount_in, l.amount_in);
            assert_eq!(q.amount_out, l.amount_out);
        }
        let moved: Vec<Position> = pool.positions().cloned().collect();
        assert_ne!(unchanged, moved);
    }

    #[test]
    fn test_allocation_spreads_across_positions() {
        let mut pool = eth_usdt_pool();
        add_second_position(&mut pool);
        let amount_in = BigInt::from(50_000_000);
        let outputs = pool.simulate_swap(USDT, ETH, &amount_in, &[]).unwrap();
        assert_eq!(outputs.len(), 2);
        let total_in: BigInt = outputs.iter().map(|o| &o.amount_in).sum();
        assert_eq!(total_in, amount_in);
    }

    #[test]
    fn test_excluded_positions_are_ignored() {
        let mut pool = eth_usdt_pool();
        let second = add_second_position(&mut pool);
        let outputs = pool
            .simulate_swap(USDT, ETH, &BigInt::from(50_000_000), &[second.clone()])
            .unwrap();
        assert_eq!(outputs.len(), 1);
        assert_ne!(outputs[0].position_id, second);
    }

    #[test]
    fn test_swap_rejections() {
        let pool = eth_usdt_pool();
        assert_eq!(
            pool.simulate_swap(USDT, USDT, &BigInt::from(1_000_000), &[]).unwrap_err(),
            AmmError::InvalidToken
        );
        assert_eq!(
            pool.simulate_swap(USDT, ETH, &BigInt::from(0), &[]).unwrap_err(),
            AmmError::InvalidAmount
        );
        assert_eq!(
            pool.simulate_swap(USDT, ETH, &BigInt::from(10), &[]).unwrap_err(),
            AmmError::InvalidAmount
        );
        let empty = Pool::new(ETH, USDT, "0.003").unwrap();
        assert_eq!(
            empty.simulate_swap(USDT, ETH, &BigInt::from(1_000_000), &[]).unwrap_err(),
            AmmError::NoPosition
        );
    }

    #[test]
    fn test_add_position_checks_pool() {
        let mut other = Pool::new(ETH, USDT, "0.01").unwrap();
        let pool = eth_usdt_pool();
        let position = pool.positions().next().unwrap().clone();
        assert_eq!(other.add_position(position).unwrap_err(), AmmError::InvalidPool);
    }

    #[test]
    fn test_prices() {
        let pool = eth_usdt_pool();
        let spot: Decimal = pool.spot_price_with_fee(PriceDirection::Down).unwrap().parse().unwrap();
        // about 3E-9 * 0.997
        assert!(spot > "0.0000000029909".parse::<Decimal>().unwrap());
        assert!(spot < "0.0000000029911".parse::<Decimal>().unwrap());

        let quoted: Decimal = pool
            .current_price(PriceDirection::Up, &BigInt::from(100_000))
            .unwrap()
            .parse()
            .unwrap();
        assert!(quoted.is_positive());
        assert_eq!(
            pool.current_price(PriceDirection::Both, &BigInt::from(100_000)).unwrap_err(),
            AmmError::InvalidPriceDirection
        );
    }

    #[test]
    fn test_pools_swap_requires_connected_path() {
        let pool = eth_usdt_pool();
        assert_eq!(
            pools_swap(&[], USDT, ETH, &BigInt::from(1_000_000), &[]).unwrap_err(),
            AmmError::InvalidPoolPaths
        );
        assert_eq!(
            pools_swap(&[&pool], USDT, "btc", &BigInt::from(1_000_000), &[]).unwrap_err(),
            AmmError::InvalidPoolPaths
        );
        let (outputs, amount_out) =
            pools_swap(&[&pool], USDT, ETH, &BigInt::from(1_000_000), &[]).unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(amount_out, outputs[0].amount_out);
    }
}
