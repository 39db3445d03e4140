//! Registry of pools and positions
//!
//! ## Purpose
//!
//! The [`Registry`] is the single mutable state of a running router: every
//! configured pool, every live position, the owner and token indices, and
//! the router fee policy. It answers swap queries with settlement paths and
//! applies settled paths back onto positions.
//!
//! ## Ownership
//!
//! Pools own their positions. The registry keeps only id-level indices
//! (`position -> pool`, `owner -> positions`, `token -> pools`), so there is
//! exactly one copy of each position and every mutation goes through its
//! pool. Iteration order is deterministic (sorted ids).
//!
//! ## Settlement Flow
//!
//! ```text
//! query(trader, in, out, amount) -> [Path]       dry-run only
//! verify(trader, [Path])                           dry-run re-execution
//! update(trader, [Path])                           verify, then live, all-or-nothing
//! ```

use std::collections::{BTreeMap, HashMap};

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use tracing::{debug, error, info, warn};

use crate::constants::MAX_POOL_PATH_LENGTH;
use crate::decimal::Decimal;
use crate::direction::PriceDirection;
use crate::error::{AmmError, Result};
use crate::identity::{normalize_account, PoolId, PositionId};
use crate::integer::parse_positive;
use crate::math::{checked_fee, fee_for};
use crate::messages::{LiquidityAdd, LiquidityRemove, SwapQuery};
use crate::pool::{pools_swap, Pool};
use crate::position::{Position, SwapOutput};
use crate::routing::TokenGraph;
use crate::settlement::{paths_to_swap_inputs, swap_outputs_to_paths, Path, SwapInput};

/// Router-level fee charged on top of position fees
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterFee {
    recipient: Option<String>,
    ratio: Decimal,
}

impl RouterFee {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Fee paid to `recipient`; the ratio must lie in `[0, 1)`
    pub fn new(recipient: &str, ratio: &str) -> Result<Self> {
        let recipient = normalize_account(recipient)?;
        let ratio: Decimal = ratio.parse().map_err(|_| AmmError::InvalidFee)?;
        if ratio.is_negative() || ratio >= Decimal::one() {
            return Err(AmmError::InvalidFee);
        }
        Ok(Self { recipient: Some(recipient), ratio })
    }

    pub fn recipient(&self) -> Option<&str> {
        self.recipient.as_deref()
    }

    pub fn ratio(&self) -> &Decimal {
        &self.ratio
    }

    pub fn is_enabled(&self) -> bool {
        self.recipient.is_some() && self.ratio.is_positive()
    }
}

#[derive(Debug, Clone)]
pub struct Registry {
    pools: BTreeMap<PoolId, Pool>,
    position_pools: BTreeMap<PositionId, PoolId>,
    owner_positions: HashMap<String, Vec<PositionId>>,
    graph: TokenGraph,
    router_fee: RouterFee,
    max_pool_path_length: usize,
    price_query_amounts: HashMap<String, BigInt>,
}

impl Registry {
    pub fn new(pools: impl IntoIterator<Item = Pool>, router_fee: RouterFee) -> Self {
        let mut registry = Self {
            pools: BTreeMap::new(),
            position_pools: BTreeMap::new(),
            owner_positions: HashMap::new(),
            graph: TokenGraph::new(),
            router_fee,
            max_pool_path_length: MAX_POOL_PATH_LENGTH,
            price_query_amounts: HashMap::new(),
        };
        for pool in pools {
            let pool_id = pool.id();
            if registry.pools.contains_key(&pool_id) {
                warn!(pool = %pool_id, "duplicate pool ignored");
                continue;
            }
            registry.graph.insert(pool_id.clone(), pool.token_x(), pool.token_y());
            for position in pool.positions() {
                let id = position.id();
                registry
                    .owner_positions
                    .entry(position.owner().to_string())
                    .or_default()
                    .push(id.clone());
                registry.position_pools.insert(id, pool_id.clone());
            }
            registry.pools.insert(pool_id, pool);
        }
        info!(
            pools = registry.pools.len(),
            router_fee_enabled = registry.router_fee.is_enabled(),
            "registry initialized"
        );
        registry
    }

    pub fn with_max_pool_path_length(mut self, max_pool_path_length: usize) -> Self {
        self.max_pool_path_length = max_pool_path_length;
        self
    }

    /// Reference input amounts used by [`Registry::current_price`], per token
    pub fn with_price_query_amounts(mut self, amounts: HashMap<String, BigInt>) -> Self {
        self.price_query_amounts = amounts;
        self
    }

    pub fn router_fee(&self) -> &RouterFee {
        &self.router_fee
    }

    pub fn pool(&self, pool_id: &PoolId) -> Option<&Pool> {
        self.pools.get(pool_id)
    }

    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.values()
    }

    pub fn find_pool(&self, token_x: &str, token_y: &str, fee_ratio: &Decimal) -> Option<&Pool> {
        self.pools.get(&PoolId::derive(token_x, token_y, fee_ratio))
    }

    pub fn position(&self, id: &PositionId) -> Option<&Position> {
        let pool_id = self.position_pools.get(id)?;
        self.pools.get(pool_id)?.position(id)
    }

    pub fn all_positions(&self) -> impl Iterator<Item = &Position> {
        self.pools.values().flat_map(Pool::positions)
    }

    pub fn positions_in_pool(&self, pool_id: &PoolId) -> Result<Vec<&Position>> {
        let pool = self.pools.get(pool_id).ok_or(AmmError::NoPool)?;
        Ok(pool.positions().collect())
    }

    pub fn positions_of(&self, owner: &str) -> Result<Vec<&Position>> {
        let owner = normalize_account(owner)?;
        Ok(self
            .owner_positions
            .get(&owner)
            .into_iter()
            .flatten()
            .filter_map(|id| self.position(id))
            .collect())
    }

    /// Create a position from an add-liquidity request
    pub fn add_liquidity(&mut self, owner: &str, msg: &LiquidityAdd) -> Result<PositionId> {
        let pool_id = PoolId::derive(&msg.token_x, &msg.token_y, &msg.fee_ratio);
        if !self.pools.contains_key(&pool_id) {
            return Err(AmmError::NoPool);
        }
        let liquidity = parse_positive(&msg.liquidity, AmmError::InvalidLiquidity)?;
        let direction: PriceDirection = msg.price_direction.parse()?;
        let position = Position::new(
            &pool_id,
            &msg.token_x,
            &msg.token_y,
            msg.fee_ratio.clone(),
            owner,
            msg.low_sqrt_price.clone(),
            msg.current_sqrt_price.clone(),
            msg.high_sqrt_price.clone(),
            liquidity,
            direction,
        )?;
        self.add_position(position)
    }

    /// Insert an already-built position. A position with the same id is replaced.
    pub fn add_position(&mut self, position: Position) -> Result<PositionId> {
        position.validate()?;
        let pool_id = position.pool_id().clone();
        let owner = position.owner().to_string();
        let pool = self.pools.get_mut(&pool_id).ok_or(AmmError::NoPool)?;
        let id = pool.add_position(position)?;

        if self.position_pools.insert(id.clone(), pool_id.clone()).is_none() {
            self.owner_positions.entry(owner.clone()).or_default().push(id.clone());
        }
        info!(position_id = %id, pool = %pool_id, owner = %owner, "liquidity added");
        Ok(id)
    }

    /// Remove the position a remove-liquidity request identifies
    pub fn remove_liquidity(&mut self, owner: &str, msg: &LiquidityRemove) -> Result<Position> {
        let owner = normalize_account(owner)?;
        let pool_id = PoolId::derive(&msg.token_x, &msg.token_y, &msg.fee_ratio);
        if !self.pools.contains_key(&pool_id) {
            return Err(AmmError::NoPool);
        }
        let direction: PriceDirection = msg.price_direction.parse()?;
        let id = PositionId::derive(
            &pool_id,
            &owner,
            &msg.low_sqrt_price,
            &msg.high_sqrt_price,
            direction.as_str(),
        );
        self.remove_by_id(&id)
    }

    pub fn remove_by_id(&mut self, id: &PositionId) -> Result<Position> {
        let pool_id = self.position_pools.remove(id).ok_or(AmmError::NoPosition)?;
        let position = self
            .pools
            .get_mut(&pool_id)
            .and_then(|pool| pool.remove_position(id))
            .ok_or(AmmError::NoPosition)?;

        if let Some(ids) = self.owner_positions.get_mut(position.owner()) {
            ids.retain(|owned| owned != id);
            if ids.is_empty() {
                self.owner_positions.remove(position.owner());
            }
        }
        info!(position_id = %id, pool = %pool_id, owner = %position.owner(), "liquidity removed");
        Ok(position)
    }

    /// Remove every position owned by `owner`
    pub fn remove_by_address(&mut self, owner: &str) -> Result<Vec<Position>> {
        let owner = normalize_account(owner)?;
        let ids = self.owner_positions.get(&owner).cloned().unwrap_or_default();
        ids.iter().map(|id| self.remove_by_id(id)).collect()
    }

    pub fn find_pool_paths(&self, token_in: &str, token_out: &str) -> Result<Vec<Vec<PoolId>>> {
        self.graph
            .find_paths(token_in, token_out, self.max_pool_path_length)
    }

    fn ensure_not_provider(&self, trader: &str) -> Result<()> {
        match self.owner_positions.get(trader) {
            Some(ids) if !ids.is_empty() => Err(AmmError::InvalidSelfTradeUser),
            _ => Ok(()),
        }
    }

    pub fn swap_outputs_to_paths(&self, trader: &str, outputs: &[SwapOutput]) -> Result<Vec<Path>> {
        swap_outputs_to_paths(trader, outputs, |id| self.position(id).map(Position::owner))
    }

    /// Best settlement path for an exact-input swap, all dry-run
    pub fn query(&self, msg: &SwapQuery) -> Result<Vec<Path>> {
        let trader = normalize_account(&msg.address)?;
        self.ensure_not_provider(&trader)?;
        let mut amount_in = parse_positive(&msg.amount_in, AmmError::InvalidAmount)?;

        let routes = self.find_pool_paths(&msg.token_in, &msg.token_out)?;

        let router_fee = if self.router_fee.is_enabled() {
            let fee = fee_for(&amount_in, &self.router_fee.ratio, true)?;
            amount_in -= &fee;
            Some(fee)
        } else {
            None
        };

        let mut best: Option<(Vec<SwapOutput>, BigInt)> = None;
        let mut failures = Vec::new();
        for route in &routes {
            let pools: Option<Vec<&Pool>> = route.iter().map(|id| self.pools.get(id)).collect();
            let Some(pools) = pools else {
                failures.push(AmmError::NoPool);
                continue;
            };
            match pools_swap(&pools, &msg.token_in, &msg.token_out, &amount_in, &[]) {
                Ok((outputs, amount_out)) => {
                    if best.as_ref().map_or(true, |(_, best_out)| amount_out > *best_out) {
                        best = Some((outputs, amount_out));
                    }
                }
                Err(err) => {
                    debug!(route = ?route, error = %err, "route rejected");
                    failures.push(err);
                }
            }
        }

        let Some((outputs, amount_out)) = best else {
            let all_too_small = !failures.is_empty()
                && failures.iter().all(|err| *err == AmmError::InvalidAmount);
            return Err(if all_too_small { AmmError::InvalidAmount } else { AmmError::NoPath });
        };

        let mut paths = self.swap_outputs_to_paths(&trader, &outputs)?;
        if let (Some(fee), Some(recipient)) = (router_fee, self.router_fee.recipient()) {
            paths.push(Path {
                position_id: None,
                from: trader.clone(),
                to: recipient.to_string(),
                token_tag: msg.token_in.clone(),
                amount: fee.to_string(),
            });
        }
        debug!(
            trader = %trader,
            token_in = %msg.token_in,
            token_out = %msg.token_out,
            %amount_out,
            legs = paths.len(),
            "query answered"
        );
        Ok(paths)
    }

    fn verify_path_fee(&self, trader: &str, paths: &[Path]) -> Result<()> {
        let recipient = self.router_fee.recipient().ok_or(AmmError::InvalidPathFee)?;
        let (first, fee_leg) = match (paths.first(), paths.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(AmmError::InvalidPathFee),
        };
        let token_in = &first.token_tag;

        let same_account = |account: &str, expected: &str| {
            normalize_account(account).is_ok_and(|normalized| normalized == expected)
        };
        if !fee_leg.is_fee_leg()
            || !same_account(&fee_leg.from, trader)
            || !same_account(&fee_leg.to, recipient)
            || fee_leg.token_tag != *token_in
        {
            return Err(AmmError::InvalidPathFee);
        }

        let mut paid = BigInt::zero();
        for path in paths {
            if path.token_tag == *token_in && same_account(&path.from, trader) {
                paid += parse_positive(&path.amount, AmmError::InvalidPathFee)?;
            }
        }
        let required = checked_fee(&paid, &self.router_fee.ratio).map_err(|_| AmmError::InvalidPathFee)?;
        let offered = parse_positive(&fee_leg.amount, AmmError::InvalidPathFee)?;
        if offered < required {
            debug!(%offered, %required, "router fee leg too small");
            return Err(AmmError::InvalidPathFee);
        }
        Ok(())
    }

    fn check_settlement(&self, trader: &str, paths: &[Path]) -> Result<BTreeMap<PositionId, SwapInput>> {
        let trader = normalize_account(trader)?;
        self.ensure_not_provider(&trader)?;
        if self.router_fee.is_enabled() {
            self.verify_path_fee(&trader, paths)?;
        }
        let inputs = paths_to_swap_inputs(&trader, paths)?;
        for input in inputs.values() {
            let position = self.position(&input.position_id).ok_or(AmmError::NoPosition)?;
            let output = position.simulate(&input.token_in, &input.token_out, &input.amount_in)?;
            if output.token_out != input.token_out || output.amount_out < input.amount_out {
                return Err(AmmError::InvalidPath);
            }
        }
        Ok(inputs)
    }

    /// Check a proposed settlement without mutating anything
    pub fn verify(&self, trader: &str, paths: &[Path]) -> Result<()> {
        self.check_settlement(trader, paths).map(|_| ())
    }

    /// Verify, then apply a settlement to every implicated position.
    /// On any failure all touched positions are restored.
    pub fn update(&mut self, trader: &str, paths: &[Path]) -> Result<Vec<SwapOutput>> {
        let inputs = self.check_settlement(trader, paths)?;

        let mut snapshot: BTreeMap<PoolId, Vec<(PositionId, Decimal)>> = BTreeMap::new();
        for id in inputs.keys() {
            if let Some(position) = self.position(id) {
                snapshot
                    .entry(position.pool_id().clone())
                    .or_default()
                    .push((id.clone(), position.current_sqrt_price().clone()));
            }
        }

        let mut outputs = Vec::with_capacity(inputs.len());
        for input in inputs.values() {
            match self.settle(input) {
                Ok(output) => outputs.push(output),
                Err(err) => {
                    error!(position_id = %input.position_id, error = %err, "settlement rejected, rolling back");
                    for (pool_id, prices) in &snapshot {
                        if let Some(pool) = self.pools.get_mut(pool_id) {
                            pool.restore(prices);
                        }
                    }
                    return Err(err);
                }
            }
        }
        info!(trader = %trader, positions = outputs.len(), "settlement applied");
        Ok(outputs)
    }

    fn settle(&mut self, input: &SwapInput) -> Result<SwapOutput> {
        let pool_id = self
            .position_pools
            .get(&input.position_id)
            .ok_or(AmmError::NoPosition)?;
        let pool = self.pools.get_mut(pool_id).ok_or(AmmError::NoPool)?;
        let output = pool.swap_position(&input.position_id, &input.token_in, &input.token_out, &input.amount_in)?;
        if output.token_out != input.token_out || output.amount_out < input.amount_out {
            return Err(AmmError::InvalidPath);
        }
        Ok(output)
    }

    /// Effective price of a reference-sized dry-run swap through one pool
    pub fn current_price(&self, pool_id: &PoolId, direction: PriceDirection) -> Result<String> {
        let pool = self.pools.get(pool_id).ok_or(AmmError::NoPool)?;
        let token_in = match direction {
            PriceDirection::Down => pool.token_x(),
            PriceDirection::Up => pool.token_y(),
            PriceDirection::Both => return Err(AmmError::InvalidPriceDirection),
        };
        let amount = self
            .price_query_amounts
            .get(token_in)
            .ok_or(AmmError::InvalidToken)?;
        pool.current_price(direction, amount)
    }

    pub fn spot_price_with_fee(&self, pool_id: &PoolId, direction: PriceDirection) -> Result<String> {
        let pool = self.pools.get(pool_id).ok_or(AmmError::NoPool)?;
        pool.spot_price_with_fee(direction)
    }
}
