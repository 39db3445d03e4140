//! Pool path discovery
//!
//! Tokens are nodes and pools are edges. A route from one token to another
//! is a sequence of distinct pools where each pool shares a token with the
//! next; routes are enumerated depth-first up to a maximum number of hops.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{AmmError, Result};
use crate::identity::PoolId;

/// Adjacency index from token tag to the pools that trade it
#[derive(Debug, Clone, Default)]
pub struct TokenGraph {
    token_pools: HashMap<String, Vec<PoolId>>,
    pool_tokens: HashMap<PoolId, (String, String)>,
}

impl TokenGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pool's edge. Re-inserting a known pool is a no-op.
    pub fn insert(&mut self, pool_id: PoolId, token_x: &str, token_y: &str) {
        if self.pool_tokens.contains_key(&pool_id) {
            return;
        }
        for token in [token_x, token_y] {
            self.token_pools
                .entry(token.to_string())
                .or_default()
                .push(pool_id.clone());
        }
        self.pool_tokens
            .insert(pool_id, (token_x.to_string(), token_y.to_string()));
    }

    pub fn pools_of(&self, token: &str) -> &[PoolId] {
        self.token_pools.get(token).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pool_count(&self) -> usize {
        self.pool_tokens.len()
    }

    /// Every route of at most `max_len` distinct pools from `token_in` to `token_out`
    pub fn find_paths(&self, token_in: &str, token_out: &str, max_len: usize) -> Result<Vec<Vec<PoolId>>> {
        if token_in == token_out {
            return Err(AmmError::InvalidToken);
        }

        let mut routes = Vec::new();
        let mut current = Vec::new();
        self.walk(token_in, token_out, max_len, &mut current, &mut routes);
        if routes.is_empty() {
            debug!(token_in, token_out, max_len, "no pool route");
            return Err(AmmError::NoPool);
        }
        Ok(routes)
    }

    fn walk(
        &self,
        token: &str,
        target: &str,
        max_len: usize,
        current: &mut Vec<PoolId>,
        routes: &mut Vec<Vec<PoolId>>,
    ) {
        if current.len() >= max_len {
            return;
        }
        for pool_id in self.pools_of(token) {
            if current.contains(pool_id) {
                continue;
            }
            let Some((x, y)) = self.pool_tokens.get(pool_id) else {
                continue;
            };
            let next = if x == token { y } else { x };

            current.push(pool_id.clone());
            if next == target {
                routes.push(current.clone());
            } else {
                self.walk(next, target, max_len, current, routes);
            }
            current.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> TokenGraph {
        let mut graph = TokenGraph::new();
        graph.insert(PoolId::from("1"), "eth", "usdt");
        graph.insert(PoolId::from("2"), "usdc", "usdt");
        graph.insert(PoolId::from("3"), "eth", "wbtc");
        graph.insert(PoolId::from("4"), "usdt", "wbtc");
        graph
    }

    fn ids(route: &[&str]) -> Vec<PoolId> {
        route.iter().map(|id| PoolId::from(*id)).collect()
    }

    #[test]
    fn test_finds_all_short_routes() {
        let graph = sample_graph();
        let mut routes = graph.find_paths("usdc", "eth", 3).unwrap();
        routes.sort();
        assert_eq!(routes, vec![ids(&["2", "1"]), ids(&["2", "4", "3"])]);
    }

    #[test]
    fn test_respects_max_length() {
        let graph = sample_graph();
        let routes = graph.find_paths("usdc", "eth", 2).unwrap();
        assert_eq!(routes, vec![ids(&["2", "1"])]);
        assert_eq!(graph.find_paths("usdc", "eth", 1).unwrap_err(), AmmError::NoPool);
    }

    #[test]
    fn test_routes_never_reuse_a_pool() {
        let graph = sample_graph();
        for route in graph.find_paths("eth", "usdt", 3).unwrap() {
            let mut unique = route.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), route.len());
        }
    }

    #[test]
    fn test_rejects_same_token_and_unknown_tokens() {
        let graph = sample_graph();
        assert_eq!(graph.find_paths("eth", "eth", 3).unwrap_err(), AmmError::InvalidToken);
        assert_eq!(graph.find_paths("eth", "doge", 3).unwrap_err(), AmmError::NoPool);
    }

    #[test]
    fn test_duplicate_insert_is_ignored() {
        let mut graph = sample_graph();
        graph.insert(PoolId::from("1"), "eth", "usdt");
        assert_eq!(graph.pool_count(), 4);
        assert_eq!(graph.pools_of("eth").len(), 2);
    }
}
