//! Aggregated liquidity ticks
//!
//! A pool's depth is the sum of its positions' liquidity. Each position
//! contributes `+L` at the price where it starts trading and `-L` at the
//! price where it runs out; walking the resulting ticks in order gives the
//! active liquidity over every price interval.

use std::collections::BTreeMap;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::decimal::Decimal;
use crate::direction::PriceDirection;
use crate::error::{AmmError, Result};
use crate::position::Position;

/// Net liquidity change at a square-root price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tick {
    pub sqrt_price: Decimal,
    #[serde(with = "crate::integer::text")]
    pub liquidity: BigInt,
}

/// Build the tick list for a swap moving the price in `direction`.
///
/// Positions that cannot supply that side are skipped. Numerically equal
/// prices merge into one tick. The result is ascending for `Up` and
/// descending for `Down`.
pub fn aggregate_ticks<'a>(
    positions: impl IntoIterator<Item = &'a Position>,
    direction: PriceDirection,
) -> Result<Vec<Tick>> {
    if direction == PriceDirection::Both {
        return Err(AmmError::InvalidPriceDirection);
    }

    let mut deltas: BTreeMap<Decimal, BigInt> = BTreeMap::new();
    for position in positions {
        if !position.can_supply(direction) {
            continue;
        }
        let exhausted_at = match direction {
            PriceDirection::Up => position.high_sqrt_price(),
            _ => position.low_sqrt_price(),
        };
        *deltas.entry(position.current_sqrt_price().clone()).or_default() += position.liquidity();
        *deltas.entry(exhausted_at.clone()).or_default() -= position.liquidity();
    }

    if deltas.is_empty() {
        return Err(AmmError::NoPosition);
    }

    let ticks = deltas
        .into_iter()
        .map(|(sqrt_price, liquidity)| Tick { sqrt_price, liquidity });
    Ok(match direction {
        PriceDirection::Down => ticks.rev().collect(),
        _ => ticks.collect(),
    })
}
