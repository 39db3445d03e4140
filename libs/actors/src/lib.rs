//! Registry Actor
//!
//! Serializes access to the AMM [`amm::Registry`] behind a single tokio
//! task. Service front ends hold a [`RegistryHandle`] and await replies;
//! the registry itself never needs a lock.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  mpsc   ┌──────────────────────┐
//! │ RegistryHandle   │────────►│ RegistryActor task   │
//! │ (cloneable)      │         │  owns Registry       │
//! │                  │◄────────│  one request at a    │
//! └──────────────────┘ oneshot │  time, FIFO          │
//!                              └──────────────────────┘
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use actors::RegistryActor;
//! use amm::{Registry, RouterFee};
//!
//! # async fn demo() -> Result<(), actors::ActorError> {
//! let (handle, task) = RegistryActor::spawn(Registry::new(Vec::new(), RouterFee::disabled()));
//! let registry = handle.shutdown().await?;
//! # let _ = (registry, task);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod handle;
pub mod messages;
pub mod system;

pub use error::{ActorError, Result};
pub use handle::RegistryHandle;
pub use messages::RegistryRequest;
pub use system::{ActorStats, RegistryActor, StatsSnapshot, DEFAULT_MAILBOX_CAPACITY};
