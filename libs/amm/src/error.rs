//! Error taxonomy for the AMM core
//!
//! Every failure surfaced by the engine maps onto one variant here. The
//! `Display` form of each variant is its stable wire code (`err_*`), which
//! is what the router service hands back to callers.

use thiserror::Error;

/// Result alias used throughout the AMM core
pub type Result<T> = std::result::Result<T, AmmError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmmError {
    #[error("err_invalid_pool")]
    InvalidPool,

    #[error("err_no_pool")]
    NoPool,

    #[error("err_no_lp")]
    NoPosition,

    #[error("err_no_path")]
    NoPath,

    #[error("err_invalid_amount")]
    InvalidAmount,

    #[error("err_out_of_range")]
    OutOfRange,

    #[error("err_invalid_token")]
    InvalidToken,

    #[error("err_invalid_number")]
    InvalidNumber,

    #[error("err_no_implement")]
    NotImplemented,

    #[error("err_invalid_path")]
    InvalidPath,

    #[error("err_invalid_swapouts")]
    InvalidSwapOutputs,

    #[error("err_invalid_pool_paths")]
    InvalidPoolPaths,

    #[error("err_invalid_swap_user")]
    InvalidSelfTradeUser,

    #[error("err_invalid_path_fee")]
    InvalidPathFee,

    #[error("err_fee_too_small")]
    FeeTooSmall,

    #[error("err_invalid_price")]
    InvalidPrice,

    #[error("err_invalid_liquidity")]
    InvalidLiquidity,

    #[error("err_invalid_price_direction")]
    InvalidPriceDirection,

    #[error("err_invalid_fee")]
    InvalidFee,

    #[error("err_invalid_address: {0}")]
    InvalidAddress(String),

    #[error("err_division_by_zero")]
    DivisionByZero,
}

impl AmmError {
    /// Stable machine-readable code, without any attached detail
    pub fn code(&self) -> &'static str {
        match self {
            AmmError::InvalidPool => "err_invalid_pool",
            AmmError::NoPool => "err_no_pool",
            AmmError::NoPosition => "err_no_lp",
            AmmError::NoPath => "err_no_path",
            AmmError::InvalidAmount => "err_invalid_amount",
            AmmError::OutOfRange => "err_out_of_range",
            AmmError::InvalidToken => "err_invalid_token",
            AmmError::InvalidNumber => "err_invalid_number",
            AmmError::NotImplemented => "err_no_implement",
            AmmError::InvalidPath => "err_invalid_path",
            AmmError::InvalidSwapOutputs => "err_invalid_swapouts",
            AmmError::InvalidPoolPaths => "err_invalid_pool_paths",
            AmmError::InvalidSelfTradeUser => "err_invalid_swap_user",
            AmmError::InvalidPathFee => "err_invalid_path_fee",
            AmmError::FeeTooSmall => "err_fee_too_small",
            AmmError::InvalidPrice => "err_invalid_price",
            AmmError::InvalidLiquidity => "err_invalid_liquidity",
            AmmError::InvalidPriceDirection => "err_invalid_price_direction",
            AmmError::InvalidFee => "err_invalid_fee",
            AmmError::InvalidAddress(_) => "err_invalid_address",
            AmmError::DivisionByZero => "err_division_by_zero",
        }
    }
}
