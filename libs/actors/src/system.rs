//! Registry Actor Core
//!
//! One tokio task owns the [`Registry`] and drains a bounded mailbox. Each
//! request runs to completion before the next is taken, so no registry
//! operation ever observes another half-applied. Callers talk to the task
//! through a cloneable [`RegistryHandle`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use amm::{Registry, Result as AmmResult};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::handle::RegistryHandle;
use crate::messages::{RegistryRequest, Reply};

/// Default mailbox depth
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1024;

/// Counters shared between the actor task and its handles
#[derive(Debug, Default)]
pub struct ActorStats {
    pub requests_processed: AtomicU64,
    pub requests_rejected: AtomicU64,
    pub total_processing_time_ns: AtomicU64,
}

/// Point-in-time copy of [`ActorStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub requests_processed: u64,
    pub requests_rejected: u64,
    pub avg_processing_time_ns: u64,
}

impl ActorStats {
    pub fn record_request(&self, duration: Duration, rejected: bool) {
        self.requests_processed.fetch_add(1, Ordering::Relaxed);
        if rejected {
            self.requests_rejected.fetch_add(1, Ordering::Relaxed);
        }
        let nanos = saturating_u64(duration.as_nanos());
        let _ = self
            .total_processing_time_ns
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |total| {
                Some(total.saturating_add(nanos))
            });
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let processed = self.requests_processed.load(Ordering::Relaxed);
        let total = self.total_processing_time_ns.load(Ordering::Relaxed);
        StatsSnapshot {
            requests_processed: processed,
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
            avg_processing_time_ns: if processed == 0 { 0 } else { total / processed },
        }
    }
}

pub struct RegistryActor {
    registry: Registry,
    mailbox: mpsc::Receiver<RegistryRequest>,
    stats: Arc<ActorStats>,
}

impl RegistryActor {
    /// Spawn the actor on the current runtime
    pub fn spawn(registry: Registry) -> (RegistryHandle, JoinHandle<()>) {
        Self::spawn_with_capacity(registry, DEFAULT_MAILBOX_CAPACITY)
    }

    pub fn spawn_with_capacity(registry: Registry, capacity: usize) -> (RegistryHandle, JoinHandle<()>) {
        let (sender, mailbox) = mpsc::channel(capacity.max(1));
        let stats = Arc::new(ActorStats::default());
        let actor = Self {
            registry,
            mailbox,
            stats: Arc::clone(&stats),
        };
        let task = tokio::spawn(actor.run());
        (RegistryHandle::new(sender, stats), task)
    }

    async fn run(mut self) {
        info!(pools = self.registry.pools().count(), "registry actor started");
        while let Some(request) = self.mailbox.recv().await {
            let name = request.name();
            let started = Instant::now();
            match self.handle(request) {
                Flow::Continue { rejected } => {
                    self.stats.record_request(started.elapsed(), rejected);
                }
                Flow::Stop(reply) => {
                    info!("registry actor shutting down");
                    if reply.send(self.registry).is_err() {
                        warn!("shutdown requester went away before the registry was returned");
                    }
                    return;
                }
            }
            debug!(request = name, elapsed_us = saturating_u64(started.elapsed().as_micros()), "request handled");
        }
        info!("registry actor stopped, all handles dropped");
    }

    fn handle(&mut self, request: RegistryRequest) -> Flow {
        let registry = &mut self.registry;
        let rejected = match request {
            RegistryRequest::AddLiquidity { owner, msg, reply } => {
                respond(reply, registry.add_liquidity(&owner, &msg))
            }
            RegistryRequest::RemoveLiquidity { owner, msg, reply } => {
                respond(reply, registry.remove_liquidity(&owner, &msg))
            }
            RegistryRequest::RemoveById { id, reply } => respond(reply, registry.remove_by_id(&id)),
            RegistryRequest::RemoveByAddress { owner, reply } => {
                respond(reply, registry.remove_by_address(&owner))
            }
            RegistryRequest::Query { msg, reply } => respond(reply, registry.query(&msg)),
            RegistryRequest::Verify { trader, paths, reply } => {
                respond(reply, registry.verify(&trader, &paths))
            }
            RegistryRequest::Update { trader, paths, reply } => {
                respond(reply, registry.update(&trader, &paths))
            }
            RegistryRequest::PositionsOf { owner, reply } => {
                let owned = registry
                    .positions_of(&owner)
                    .map(|positions| positions.into_iter().cloned().collect());
                respond(reply, owned)
            }
            RegistryRequest::CurrentPrice { pool_id, direction, reply } => {
                respond(reply, registry.current_price(&pool_id, direction))
            }
            RegistryRequest::Shutdown { reply } => return Flow::Stop(reply),
        };
        Flow::Continue { rejected }
    }
}

fn saturating_u64(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

enum Flow {
    Continue { rejected: bool },
    Stop(oneshot::Sender<Registry>),
}

fn respond<T>(reply: Reply<T>, result: AmmResult<T>) -> bool {
    let rejected = result.is_err();
    if let Err(err) = &result {
        debug!(error = %err, "request rejected");
    }
    if reply.send(result).is_err() {
        debug!("requester dropped before reply");
    }
    rejected
}
