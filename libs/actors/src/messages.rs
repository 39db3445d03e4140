//! Mailbox requests understood by the registry actor
//!
//! Every request carries a oneshot reply channel. The actor answers each
//! request exactly once, in mailbox order.

use amm::{
    LiquidityAdd, LiquidityRemove, Path, PoolId, Position, PositionId, PriceDirection, Registry,
    Result, SwapOutput, SwapQuery,
};
use tokio::sync::oneshot;

pub type Reply<T> = oneshot::Sender<Result<T>>;

#[derive(Debug)]
pub enum RegistryRequest {
    AddLiquidity {
        owner: String,
        msg: LiquidityAdd,
        reply: Reply<PositionId>,
    },
    RemoveLiquidity {
        owner: String,
        msg: LiquidityRemove,
        reply: Reply<Position>,
    },
    RemoveById {
        id: PositionId,
        reply: Reply<Position>,
    },
    RemoveByAddress {
        owner: String,
        reply: Reply<Vec<Position>>,
    },
    Query {
        msg: SwapQuery,
        reply: Reply<Vec<Path>>,
    },
    Verify {
        trader: String,
        paths: Vec<Path>,
        reply: Reply<()>,
    },
    Update {
        trader: String,
        paths: Vec<Path>,
        reply: Reply<Vec<SwapOutput>>,
    },
    PositionsOf {
        owner: String,
        reply: Reply<Vec<Position>>,
    },
    CurrentPrice {
        pool_id: PoolId,
        direction: PriceDirection,
        reply: Reply<String>,
    },
    /// Stop the actor and hand the registry back
    Shutdown {
        reply: oneshot::Sender<Registry>,
    },
}

impl RegistryRequest {
    pub fn name(&self) -> &'static str {
        match self {
            RegistryRequest::AddLiquidity { .. } => "add_liquidity",
            RegistryRequest::RemoveLiquidity { .. } => "remove_liquidity",
            RegistryRequest::RemoveById { .. } => "remove_by_id",
            RegistryRequest::RemoveByAddress { .. } => "remove_by_address",
            RegistryRequest::Query { .. } => "query",
            RegistryRequest::Verify { .. } => "verify",
            RegistryRequest::Update { .. } => "update",
            RegistryRequest::PositionsOf { .. } => "positions_of",
            RegistryRequest::CurrentPrice { .. } => "current_price",
            RegistryRequest::Shutdown { .. } => "shutdown",
        }
    }
}
