//! Inbound request payloads for the registry

use serde::{Deserialize, Serialize};

use crate::decimal::Decimal;

/// Provide liquidity over a square-root price range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityAdd {
    #[serde(rename = "tokenX")]
    pub token_x: String,
    #[serde(rename = "tokenY")]
    pub token_y: String,
    pub fee_ratio: Decimal,
    pub low_sqrt_price: Decimal,
    pub current_sqrt_price: Decimal,
    pub high_sqrt_price: Decimal,
    pub liquidity: String,
    pub price_direction: String,
}

/// Withdraw the position identified by pool, range and direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityRemove {
    #[serde(rename = "tokenX")]
    pub token_x: String,
    #[serde(rename = "tokenY")]
    pub token_y: String,
    pub fee_ratio: Decimal,
    pub low_sqrt_price: Decimal,
    pub high_sqrt_price: Decimal,
    pub price_direction: String,
}

/// Ask for the best settlement path for an exact-input swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuery {
    pub address: String,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: String,
}
