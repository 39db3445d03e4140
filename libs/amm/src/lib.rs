//! # Sluice AMM - Concentrated Liquidity Engine
//!
//! ## Purpose
//!
//! Pricing, routing and settlement core for a concentrated-liquidity market
//! maker. Liquidity providers commit capital over square-root price ranges;
//! traders ask for the best exact-input route across pools and receive a
//! list of transfer legs that, once settled externally, are applied back
//! onto the positions they touch.
//!
//! ## Integration Points
//!
//! - **Input Sources**: add/remove-liquidity requests from providers, swap
//!   queries and signed settlement proposals from traders
//! - **Output Destinations**: settlement path lists for an external ledger,
//!   price quotes for display
//! - **Configuration**: pool set, router fee and reference amounts supplied
//!   by `sluice-config`
//! - **Concurrency**: the [`Registry`] is single-owner state; `sluice-actors`
//!   serializes access to it
//!
//! ## Architecture Role
//!
//! ```text
//! decimal ─► math ─► position ─► tick ─► pool ─► routing ─► registry
//!                                   settlement ──────────────┘
//! ```
//!
//! - [`decimal`]: 32-digit arbitrary-precision decimals with explicit rounding
//! - [`math`]: single-segment swap formulas and fee helpers
//! - [`position`]: one provider's range and its per-position swap
//! - [`tick`]: aggregation of positions into liquidity breakpoints
//! - [`pool`]: tick walk, allocation across positions, reconciliation
//! - [`routing`]: depth-first pool path discovery
//! - [`settlement`]: conversion between swap outputs and transfer legs
//! - [`registry`]: the mutable state tying the above together
//!
//! ## Precision Profile
//!
//! - Square-root prices carry 32 significant digits across `[2^-64, 2^64]`
//! - Token amounts and liquidity are unbounded integers
//! - Every rounding step favours the liquidity provider

pub mod constants;
pub mod decimal;
pub mod direction;
pub mod error;
pub mod identity;
pub mod integer;
pub mod math;
pub mod messages;
pub mod pool;
pub mod position;
pub mod registry;
pub mod routing;
pub mod settlement;
pub mod tick;

pub use decimal::{Context, Decimal, Rounding, BASE, PRECISION, ROUND_DOWN, ROUND_UP};
pub use direction::PriceDirection;
pub use error::{AmmError, Result};
pub use identity::{normalize_account, text_hash, PoolId, PositionId};
pub use messages::{LiquidityAdd, LiquidityRemove, SwapQuery};
pub use pool::{pools_swap, Pool};
pub use position::{Position, SwapOutput};
pub use registry::{Registry, RouterFee};
pub use routing::TokenGraph;
pub use settlement::{Path, SwapInput, SwapSummary};
pub use tick::{aggregate_ticks, Tick};

pub use num_bigint::BigInt;
