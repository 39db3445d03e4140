//! # Sluice Configuration
//!
//! Configuration loading and startup state for Sluice services.
//!
//! ## Features
//!
//! - **Router Configuration**: TOML base file, environment overlay and
//!   `SLUICE_` environment variables layered through the `config` crate
//! - **Chain Presets**: the pool set and price-query reference amounts for
//!   each supported chain id
//! - **Bootstrap**: one call from configuration to a ready `Registry`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use sluice_config::{build_registry, RouterConfig};
//!
//! let config = RouterConfig::load(Path::new("config/router.toml"), Some("staging"))?;
//! let registry = build_registry(&config)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod presets;
pub mod settings;

pub use presets::{chain_pools, default_price_query_amounts, PRICE_QUERY_AMOUNTS};
pub use settings::{
    build_registry, default_config_path, load_registry, PoolConfig, PriceQueryAmount, RouterConfig,
    RouterFeeConfig,
};
