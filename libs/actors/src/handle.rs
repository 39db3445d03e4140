//! Cloneable async front end to the registry actor

use std::sync::Arc;

use amm::{
    LiquidityAdd, LiquidityRemove, Path, PoolId, Position, PositionId, PriceDirection, Registry,
    SwapOutput, SwapQuery,
};
use tokio::sync::{mpsc, oneshot};

use crate::error::{ActorError, Result};
use crate::messages::{RegistryRequest, Reply};
use crate::system::{ActorStats, StatsSnapshot};

#[derive(Debug, Clone)]
pub struct RegistryHandle {
    sender: mpsc::Sender<RegistryRequest>,
    stats: Arc<ActorStats>,
}

impl RegistryHandle {
    pub(crate) fn new(sender: mpsc::Sender<RegistryRequest>, stats: Arc<ActorStats>) -> Self {
        Self { sender, stats }
    }

    async fn call<T>(&self, build: impl FnOnce(Reply<T>) -> RegistryRequest) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(build(reply))
            .await
            .map_err(|_| ActorError::MailboxClosed)?;
        let result = response.await.map_err(|_| ActorError::ReplyDropped)?;
        Ok(result?)
    }

    pub async fn add_liquidity(&self, owner: &str, msg: LiquidityAdd) -> Result<PositionId> {
        let owner = owner.to_string();
        self.call(|reply| RegistryRequest::AddLiquidity { owner, msg, reply })
            .await
    }

    pub async fn remove_liquidity(&self, owner: &str, msg: LiquidityRemove) -> Result<Position> {
        let owner = owner.to_string();
        self.call(|reply| RegistryRequest::RemoveLiquidity { owner, msg, reply })
            .await
    }

    pub async fn remove_by_id(&self, id: PositionId) -> Result<Position> {
        self.call(|reply| RegistryRequest::RemoveById { id, reply }).await
    }

    pub async fn remove_by_address(&self, owner: &str) -> Result<Vec<Position>> {
        let owner = owner.to_string();
        self.call(|reply| RegistryRequest::RemoveByAddress { owner, reply })
            .await
    }

    pub async fn query(&self, msg: SwapQuery) -> Result<Vec<Path>> {
        self.call(|reply| RegistryRequest::Query { msg, reply }).await
    }

    pub async fn verify(&self, trader: &str, paths: Vec<Path>) -> Result<()> {
        let trader = trader.to_string();
        self.call(|reply| RegistryRequest::Verify { trader, paths, reply })
            .await
    }

    pub async fn update(&self, trader: &str, paths: Vec<Path>) -> Result<Vec<SwapOutput>> {
        let trader = trader.to_string();
        self.call(|reply| RegistryRequest::Update { trader, paths, reply })
            .await
    }

    pub async fn positions_of(&self, owner: &str) -> Result<Vec<Position>> {
        let owner = owner.to_string();
        self.call(|reply| RegistryRequest::PositionsOf { owner, reply })
            .await
    }

    pub async fn current_price(&self, pool_id: PoolId, direction: PriceDirection) -> Result<String> {
        self.call(|reply| RegistryRequest::CurrentPrice {
            pool_id,
            direction,
            reply,
        })
        .await
    }

    /// Stop the actor after every request queued ahead of this one and
    /// return the final registry state
    pub async fn shutdown(&self) -> Result<Registry> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(RegistryRequest::Shutdown { reply })
            .await
            .map_err(|_| ActorError::MailboxClosed)?;
        response.await.map_err(|_| ActorError::ReplyDropped)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
