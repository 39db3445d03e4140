//! Per-chain pool presets and reference amounts
//!
//! A deployment that does not list its pools explicitly gets the preset
//! pool set for its chain id. The reference-amount table sizes the dry-run
//! swap behind `Registry::current_price`: roughly one tenth of a display
//! unit of each token.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use num_bigint::BigInt;
use once_cell::sync::Lazy;

use amm::constants::{FEE_TIER_30_BPS, FEE_TIER_5_BPS};
use amm::Pool;

/// Token tags used by the presets
pub mod tokens {
    pub const AR: &str =
        "arweave,ethereum-ar-AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA,0x4fadc7a98f2dc96510e42dd1a74141eeae0c1543";
    pub const ARDRIVE: &str = "arweave-ardrive--8A6RexFkpfWwuyVO98wzSFZh0d6VJuI-buTJvlwOJQ";
    pub const ETH: &str = "ethereum-eth-0x0000000000000000000000000000000000000000";
    pub const USDC: &str = "ethereum-usdc-0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
    pub const USDT: &str = "ethereum-usdt-0xdac17f958d2ee523a2206206994597c13d831ec7";
    pub const ACNH: &str = "everpay-acnh-0x72247989079da354c9f0a6886b965bcc86550f8a";
    pub const ANS: &str = "ethereum-ans-0x937efa4a5ff9d65785691b70a1136aaf8ada7e62";
    pub const U: &str = "arweave-u-KTzTXT_ANmF84fWEKHzWURD1LWd9QaFR9yfYUwH2Lxw";
    pub const STAMP: &str = "arweave-stamp-TlqASNDLA1Uh8yFiH-BzR_1FDag4s735F3PoUFEv2Mo";
    pub const MAP: &str = "ethereum-map-0x9e976f211daea0d652912ab99b0dc21a7fd728e4";
    pub const BSC_USDT: &str = "bsc-usdt-0x55d398326f99059ff775485246999027b3197955";

    // Testnet
    pub const TEST_USDC: &str = "ethereum-usdc-0xb7a4f3e9097c08da09517b5ab877f7a917224ede";
    pub const TEST_USDT: &str = "ethereum-usdt-0xd85476c906b5301e8e9eb58d174a6f96b9dfc5ee";
    pub const TEST_AR: &str =
        "arweave,ethereum-ar-AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA,0xcc9141efa8c20c7df0778748255b1487957811be";
    pub const TAR: &str = "bsc-tar-0xf1458ee7e9a2096bce7a21c160840a3a291bcb55";
    pub const TUSDC: &str = "bsc-tusdc-0xf17a50ecc5fe5f476de2da5481cdd0f0ffef7712";
    pub const TARDRIVE: &str = "bsc-tardrive-0xf4233b165f1b8da4f9aa94abc35c9ad2a7612979";
    pub const TEST_ACNH: &str = "everpay-acnh-0xac4cbc2009cf9ad96c2e1a4b34b1c8cb312fbce4";
}

pub const MAINNET_CHAIN_ID: i64 = 1;
pub const TESTNET_CHAIN_ID: i64 = 5;

use tokens::*;

const MAINNET_POOLS: &[(&str, &str, &str)] = &[
    (AR, ARDRIVE, FEE_TIER_30_BPS),
    (ETH, USDC, FEE_TIER_30_BPS),
    (AR, ETH, FEE_TIER_30_BPS),
    (USDC, USDT, FEE_TIER_5_BPS),
    (AR, USDC, FEE_TIER_30_BPS),
    (USDC, ACNH, FEE_TIER_5_BPS),
    (AR, ANS, FEE_TIER_30_BPS),
    (AR, U, FEE_TIER_30_BPS),
    (AR, STAMP, FEE_TIER_30_BPS),
    (ETH, MAP, FEE_TIER_30_BPS),
    (BSC_USDT, USDC, FEE_TIER_5_BPS),
];

const TESTNET_POOLS: &[(&str, &str, &str)] = &[
    (TUSDC, TEST_ACNH, FEE_TIER_30_BPS),
    (TAR, TARDRIVE, FEE_TIER_30_BPS),
    (TAR, TUSDC, FEE_TIER_30_BPS),
];

/// Reference input amount per token tag, in base units
pub static PRICE_QUERY_AMOUNTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (ETH, "100000000000000"),
        (USDC, "100000"),
        (AR, "10000000000"),
        (USDT, "100000"),
        (ARDRIVE, "100000000000000000"),
        (ACNH, "10000000"),
        (ANS, "100000000000000000"),
        (U, "100000"),
        (STAMP, "100000000000"),
        (MAP, "1000000000000000000"),
        (BSC_USDT, "100000000000000000"),
        (TEST_USDC, "100000"),
        (TEST_USDT, "100000"),
        (TEST_AR, "10000000000"),
        (TUSDC, "100000"),
        (TAR, "10000000000"),
        (TARDRIVE, "100000000000000000"),
        (TEST_ACNH, "10000000"),
    ])
});

/// Preset pools for a chain id. Unknown chains are a configuration error.
pub fn chain_pools(chain_id: i64) -> Result<Vec<Pool>> {
    let table = match chain_id {
        MAINNET_CHAIN_ID => MAINNET_POOLS,
        TESTNET_CHAIN_ID => TESTNET_POOLS,
        other => bail!("no pool preset for chain id {other}"),
    };
    table
        .iter()
        .map(|(x, y, fee)| {
            Pool::new(x, y, fee).with_context(|| format!("invalid preset pool {x}/{y} at fee {fee}"))
        })
        .collect()
}

/// The reference-amount table as engine integers
pub fn default_price_query_amounts() -> Result<HashMap<String, BigInt>> {
    PRICE_QUERY_AMOUNTS
        .iter()
        .map(|(token, amount)| {
            let amount: BigInt = amount
                .parse()
                .with_context(|| format!("invalid reference amount for {token}"))?;
            Ok((token.to_string(), amount))
        })
        .collect()
}
