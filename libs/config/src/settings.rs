//! Router Configuration Module
//!
//! Loads the router's configuration from a TOML file, an optional
//! environment overlay and `SLUICE_` prefixed environment variables, then
//! turns it into a ready [`Registry`].
//!
//! ```toml
//! chain_id = 1
//! log_level = "info"
//! max_pool_path_length = 3
//!
//! [router_fee]
//! recipient = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
//! ratio = "0.0005"
//!
//! [[pools]]
//! x = "ethereum-eth-0x0000000000000000000000000000000000000000"
//! y = "ethereum-usdt-0xdac17f958d2ee523a2206206994597c13d831ec7"
//! fee_ratio = "0.003"
//!
//! [[price_query_amounts]]
//! token = "ethereum-eth-0x0000000000000000000000000000000000000000"
//! amount = "100000000000000"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use amm::constants::MAX_POOL_PATH_LENGTH;
use amm::{Pool, Registry, RouterFee};

use crate::presets::{chain_pools, default_price_query_amounts};

/// Main router configuration structure
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RouterConfig {
    /// Chain whose preset pools are used when `pools` is empty
    pub chain_id: Option<i64>,

    pub router_fee: RouterFeeConfig,

    /// Explicit pool list; overrides the chain preset
    pub pools: Vec<PoolConfig>,

    /// Extra or overriding reference amounts for price quotes
    pub price_query_amounts: Vec<PriceQueryAmount>,

    pub max_pool_path_length: usize,

    pub log_level: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct RouterFeeConfig {
    pub recipient: Option<String>,
    pub ratio: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PoolConfig {
    pub x: String,
    pub y: String,
    pub fee_ratio: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PriceQueryAmount {
    pub token: String,
    pub amount: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            chain_id: None,
            router_fee: RouterFeeConfig::default(),
            pools: Vec::new(),
            price_query_amounts: Vec::new(),
            max_pool_path_length: MAX_POOL_PATH_LENGTH,
            log_level: "info".to_string(),
        }
    }
}

impl RouterConfig {
    /// Load configuration from a file with environment overrides.
    ///
    /// The environment overlay lives next to the base file at
    /// `environments/<environment>.toml`.
    pub fn load(base_path: &Path, environment: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder().add_source(File::from(base_path).required(true));

        if let Some(env) = environment {
            let env_file = base_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default()
                .join("environments")
                .join(format!("{env}.toml"));

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("SLUICE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Configured pools, or the chain preset when none are listed
    pub fn resolve_pools(&self) -> Result<Vec<Pool>> {
        if !self.pools.is_empty() {
            return self
                .pools
                .iter()
                .map(|pool| {
                    Pool::new(&pool.x, &pool.y, &pool.fee_ratio)
                        .with_context(|| format!("invalid pool {}/{} at fee {}", pool.x, pool.y, pool.fee_ratio))
                })
                .collect();
        }
        match self.chain_id {
            Some(chain_id) => chain_pools(chain_id),
            None => bail!("configuration lists no pools and no chain_id"),
        }
    }

    pub fn resolve_router_fee(&self) -> Result<RouterFee> {
        match (&self.router_fee.recipient, &self.router_fee.ratio) {
            (Some(recipient), Some(ratio)) => {
                RouterFee::new(recipient, ratio).context("invalid router fee")
            }
            (None, None) => Ok(RouterFee::disabled()),
            _ => bail!("router_fee needs both recipient and ratio"),
        }
    }

    /// Preset reference amounts overlaid with the configured ones
    pub fn resolve_price_query_amounts(&self) -> Result<HashMap<String, BigInt>> {
        let mut amounts = default_price_query_amounts()?;
        for entry in &self.price_query_amounts {
            let amount: BigInt = entry
                .amount
                .parse()
                .with_context(|| format!("invalid reference amount for {}", entry.token))?;
            amounts.insert(entry.token.clone(), amount);
        }
        Ok(amounts)
    }
}

/// Build the registry a router instance starts from
pub fn build_registry(config: &RouterConfig) -> Result<Registry> {
    let pools = config.resolve_pools()?;
    let router_fee = config.resolve_router_fee()?;
    let amounts = config.resolve_price_query_amounts()?;
    info!(
        pools = pools.len(),
        chain_id = ?config.chain_id,
        max_pool_path_length = config.max_pool_path_length,
        "bootstrapping registry"
    );
    Ok(Registry::new(pools, router_fee)
        .with_max_pool_path_length(config.max_pool_path_length)
        .with_price_query_amounts(amounts))
}

/// Convenience function to load configuration and build the registry
pub fn load_registry(base_path: &Path, environment: Option<&str>) -> Result<(RouterConfig, Registry)> {
    let config = RouterConfig::load(base_path, environment)?;
    let registry = build_registry(&config)?;
    Ok((config, registry))
}

/// Default configuration file location
pub fn default_config_path() -> PathBuf {
    PathBuf::from("config/router.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::tokens;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_explicit_pools() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("router.toml");

        let config_content = r#"
log_level = "debug"
max_pool_path_length = 2

[router_fee]
recipient = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"
ratio = "0.0005"

[[pools]]
x = "eth"
y = "usdt"
fee_ratio = "0.003"

[[pools]]
x = "usdc"
y = "usdt"
fee_ratio = "0.0005"

[[price_query_amounts]]
token = "usdt"
amount = "100000"
"#;

        fs::write(&config_path, config_content).unwrap();

        let config = RouterConfig::load(&config_path, None).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.max_pool_path_length, 2);
        assert_eq!(config.pools.len(), 2);

        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.pools().count(), 2);
        assert_eq!(
            registry.router_fee().recipient(),
            Some("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed")
        );
        let amounts = config.resolve_price_query_amounts().unwrap();
        assert_eq!(amounts["usdt"], BigInt::from(100_000));
        assert!(amounts.contains_key(tokens::ETH));
    }

    #[test]
    fn test_chain_preset_and_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("router.toml");
        fs::write(&config_path, "chain_id = 5\n").unwrap();

        let config = RouterConfig::load(&config_path, None).unwrap();
        assert_eq!(config.max_pool_path_length, MAX_POOL_PATH_LENGTH);
        assert_eq!(config.log_level, "info");

        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.pools().count(), 3);
        assert!(!registry.router_fee().is_enabled());
    }

    #[test]
    fn test_environment_overlay() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("router.toml");
        fs::write(&config_path, "chain_id = 1\nlog_level = \"info\"\n").unwrap();
        fs::create_dir(dir.path().join("environments")).unwrap();
        fs::write(
            dir.path().join("environments").join("staging.toml"),
            "chain_id = 5\nlog_level = \"trace\"\n",
        )
        .unwrap();

        let config = RouterConfig::load(&config_path, Some("staging")).unwrap();
        assert_eq!(config.chain_id, Some(5));
        assert_eq!(config.log_level, "trace");

        let missing = RouterConfig::load(&config_path, Some("absent")).unwrap();
        assert_eq!(missing.chain_id, Some(1));
    }

    #[test]
    fn test_rejections() {
        let unknown_chain = RouterConfig {
            chain_id: Some(7),
            ..RouterConfig::default()
        };
        assert!(build_registry(&unknown_chain).is_err());

        assert!(build_registry(&RouterConfig::default()).is_err());

        let half_fee = RouterConfig {
            chain_id: Some(1),
            router_fee: RouterFeeConfig {
                recipient: None,
                ratio: Some("0.001".to_string()),
            },
            ..RouterConfig::default()
        };
        assert!(build_registry(&half_fee).is_err());

        let bad_pool = RouterConfig {
            pools: vec![PoolConfig {
                x: "eth".to_string(),
                y: "eth".to_string(),
                fee_ratio: "0.003".to_string(),
            }],
            ..RouterConfig::default()
        };
        assert!(build_registry(&bad_pool).is_err());
    }

    #[test]
    fn test_missing_file_fails() {
        let dir = tempdir().unwrap();
        assert!(RouterConfig::load(&dir.path().join("absent.toml"), None).is_err());
    }
}
