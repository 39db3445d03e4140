//! Content-derived identifiers and account normalization
//!
//! Pool and position ids are signed-message keccak hashes of a canonical
//! text description, so any node that knows a pool's tokens and fee (or a
//! position's range and owner) derives the same id without coordination.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::decimal::Decimal;
use crate::error::{AmmError, Result};

/// Identifier of a pool: hash of its token pair and fee ratio
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(String);

/// Identifier of a liquidity position: hash of pool, owner, range and direction
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionId(String);

impl PoolId {
    pub fn derive(token_x: &str, token_y: &str, fee_ratio: &Decimal) -> Self {
        let canonical = format!(
            "TokenXTag:{token_x}\nTokenYTag:{token_y}\nFeeRatio:{}",
            fee_ratio.to_plain_string()
        );
        Self(text_hash(canonical.as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PositionId {
    pub fn derive(
        pool_id: &PoolId,
        owner: &str,
        low_sqrt_price: &Decimal,
        high_sqrt_price: &Decimal,
        direction: &str,
    ) -> Self {
        let canonical = format!(
            "PoolID:{}\nAddress:{owner}\nLowSqrtPrice:{}\nHighSqrtPrice:{}\nPriceDirection:{direction}",
            pool_id.as_str(),
            low_sqrt_price.to_plain_string(),
            high_sqrt_price.to_plain_string(),
        );
        Self(text_hash(canonical.as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PoolId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for PositionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keccak-256 of the Ethereum signed-message envelope, as `0x` + 64 hex chars
pub fn text_hash(data: &[u8]) -> String {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", data.len()).as_bytes());
    hasher.update(data);
    format!("0x{}", hex::encode(hasher.finalize()))
}

/// Canonical form of an account id.
///
/// Ethereum addresses come back EIP-55 checksummed regardless of input case;
/// 43-character base64url Arweave ids pass through unchanged.
pub fn normalize_account(account: &str) -> Result<String> {
    if let Some(body) = account.strip_prefix("0x").or_else(|| account.strip_prefix("0X")) {
        if body.len() == 40 && body.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Ok(checksum_address(&body.to_ascii_lowercase()));
        }
    } else if is_arweave_id(account) {
        return Ok(account.to_string());
    }
    Err(AmmError::InvalidAddress(account.to_string()))
}

fn is_arweave_id(account: &str) -> bool {
    account.len() == 43
        && account
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn checksum_address(lower_hex: &str) -> String {
    let hash = Keccak256::digest(lower_hex.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower_hex.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}
