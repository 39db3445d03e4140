//! End-to-end scenarios across pools, positions, routing and settlement
//!
//! These drive the public API the way the router service does: build pools,
//! add provider positions, quote a swap, check the quote and then apply it.

use std::collections::HashMap;

use amm::math::sqrt_price;
use amm::{
    aggregate_ticks, AmmError, BigInt, Decimal, LiquidityAdd, Pool, PoolId, Position, PriceDirection,
    Registry, RouterFee, SwapQuery, TokenGraph,
};

const ETH: &str = "ethereum-eth-0x0000000000000000000000000000000000000000";
const USDT: &str = "ethereum-usdt-0xd85476c906b5301e8e9eb58d174a6f96b9dfc5ee";
const USDC: &str = "ethereum-usdc-0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

const LP: &str = "0x61EbF673c200646236B2c53465bcA0699455d5FA";
const OTHER_LP: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
const TRADER: &str = "0x911F42b0229c15bBB38D648B7Aa7CA480eD977d6";

fn d(text: &str) -> Decimal {
    text.parse().unwrap()
}

fn position_in(pool: &Pool, owner: &str, low: &str, current: &str, high: &str, liquidity: &str) -> Position {
    Position::new(
        &pool.id(),
        pool.token_x(),
        pool.token_y(),
        pool.fee_ratio().clone(),
        owner,
        sqrt_price(low).unwrap(),
        sqrt_price(current).unwrap(),
        sqrt_price(high).unwrap(),
        liquidity.parse().unwrap(),
        PriceDirection::Both,
    )
    .unwrap()
}

fn eth_usdt_registry() -> Registry {
    let pool = Pool::new(ETH, USDT, "0.003").unwrap();
    let mut registry = Registry::new([pool], RouterFee::disabled());
    let add = LiquidityAdd {
        token_x: ETH.to_string(),
        token_y: USDT.to_string(),
        fee_ratio: d("0.003"),
        low_sqrt_price: d("0.000044721359549995793928183473374626"),
        current_sqrt_price: d("0.000054792195750516611345696978280080"),
        high_sqrt_price: d("0.000063245553203367586639977870888654"),
        liquidity: "50000000000000000".to_string(),
        price_direction: "both".to_string(),
    };
    registry.add_liquidity(LP, &add).unwrap();
    registry
}

fn swap_query(token_in: &str, token_out: &str, amount_in: &str) -> SwapQuery {
    SwapQuery {
        address: TRADER.to_string(),
        token_in: token_in.to_string(),
        token_out: token_out.to_string(),
        amount_in: amount_in.to_string(),
    }
}

#[test]
fn single_pool_swap_and_out_of_range_reverse() {
    let mut pool = Pool::new(ETH, USDT, "0.003").unwrap();
    let position = position_in(&pool, LP, "1E-9", "3E-9", "5E-9", "273861278752583");
    pool.add_position(position).unwrap();

    let quoted = pool
        .simulate_swap(USDT, ETH, &BigInt::from(1_000_000), &[])
        .unwrap();
    assert_eq!(quoted.len(), 1);
    assert!(quoted[0].is_dry_run);
    assert!(quoted[0].amount_out > BigInt::from(0));

    let before: Vec<Position> = pool.positions().cloned().collect();
    let err = pool
        .execute_swap(ETH, USDT, &"100000000000000000000".parse().unwrap(), &[], false)
        .unwrap_err();
    assert_eq!(err, AmmError::OutOfRange);
    let after: Vec<Position> = pool.positions().cloned().collect();
    assert_eq!(before, after);
}

#[test]
fn overlapping_positions_aggregate_into_descending_ticks() {
    let mut pool = Pool::new(ETH, USDT, "0.003").unwrap();
    pool.add_position(position_in(&pool, LP, "1E-9", "3E-9", "5E-9", "300"))
        .unwrap();
    pool.add_position(position_in(&pool, OTHER_LP, "2E-9", "3E-9", "4E-9", "200"))
        .unwrap();

    let ticks = aggregate_ticks(pool.positions(), PriceDirection::Down).unwrap();
    let prices: Vec<Decimal> = ticks.iter().map(|tick| tick.sqrt_price.clone()).collect();
    assert_eq!(
        prices,
        vec![
            sqrt_price("3E-9").unwrap(),
            sqrt_price("2E-9").unwrap(),
            sqrt_price("1E-9").unwrap(),
        ]
    );
    let liquidity: Vec<BigInt> = ticks.iter().map(|tick| tick.liquidity.clone()).collect();
    assert_eq!(
        liquidity,
        vec![BigInt::from(500), BigInt::from(-200), BigInt::from(-300)]
    );

    let net: BigInt = liquidity.iter().sum();
    assert_eq!(net, BigInt::from(0));
}

#[test]
fn routes_through_shared_token() {
    let mut graph = TokenGraph::new();
    graph.insert(PoolId::from("eth-usdt"), "eth", "usdt");
    graph.insert(PoolId::from("usdc-usdt"), "usdc", "usdt");
    graph.insert(PoolId::from("eth-wbtc"), "eth", "wbtc");
    graph.insert(PoolId::from("usdt-wbtc"), "usdt", "wbtc");

    let routes = graph.find_paths("usdc", "eth", 3).unwrap();
    assert!(!routes.is_empty());
    assert!(routes.iter().all(|route| route.len() <= 3));
    assert!(routes
        .iter()
        .all(|route| route[0] == PoolId::from("usdc-usdt")));

    assert_eq!(graph.find_paths("eth", "eth", 3).unwrap_err(), AmmError::InvalidToken);
}

#[test]
fn registry_quote_verify_update() {
    let mut registry = eth_usdt_registry();

    let small = registry.query(&swap_query(USDT, ETH, "1000000")).unwrap();
    assert_eq!(small.len(), 2);

    assert_eq!(
        registry.query(&swap_query(USDT, ETH, "1")).unwrap_err(),
        AmmError::InvalidAmount
    );

    let paths = registry.query(&swap_query(USDT, ETH, "1000000000")).unwrap();
    registry.verify(TRADER, &paths).unwrap();
    let outputs = registry.update(TRADER, &paths).unwrap();
    assert_eq!(outputs.len(), 1);
    assert!(!outputs[0].is_dry_run);
    assert_eq!(outputs[0].amount_in.to_string(), paths[0].amount);

    let position = registry.all_positions().next().unwrap();
    assert_eq!(position.current_sqrt_price(), &outputs[0].end_sqrt_price);
}

#[test]
fn multi_hop_settlement_touches_both_pools() {
    let usdc_usdt = Pool::new(USDC, USDT, "0.0005").unwrap();
    let eth_usdt = Pool::new(ETH, USDT, "0.003").unwrap();
    let stable = position_in(&usdc_usdt, OTHER_LP, "0.81", "1", "1.21", "1000000000000");
    let volatile = position_in(&eth_usdt, LP, "1E-9", "3E-9", "5E-9", "273861278752583");

    let mut registry = Registry::new([usdc_usdt, eth_usdt], RouterFee::disabled())
        .with_price_query_amounts(HashMap::from([(USDC.to_string(), BigInt::from(1_000_000))]));
    registry.add_position(stable).unwrap();
    registry.add_position(volatile).unwrap();

    let paths = registry.query(&swap_query(USDC, ETH, "1000000")).unwrap();
    assert_eq!(paths.len(), 4);
    assert_eq!(paths[0].token_tag, USDC);
    assert_eq!(paths[1].token_tag, USDT);
    assert_eq!(paths[2].token_tag, USDT);
    assert_eq!(paths[3].token_tag, ETH);
    assert_eq!(paths[1].amount, paths[2].amount);

    registry.verify(TRADER, &paths).unwrap();
    let outputs = registry.update(TRADER, &paths).unwrap();
    assert_eq!(outputs.len(), 2);

    let stable_pool = registry.find_pool(USDC, USDT, &d("0.0005")).unwrap().id();
    let price: Decimal = registry
        .current_price(&stable_pool, PriceDirection::Down)
        .unwrap()
        .parse()
        .unwrap();
    assert!(price.is_positive());
}

#[test]
fn failed_update_leaves_every_position_untouched() {
    let mut registry = eth_usdt_registry();
    let mut paths = registry.query(&swap_query(USDT, ETH, "1000000000")).unwrap();
    paths[1].amount = format!("{}0", paths[1].amount);

    let before: Vec<Position> = registry.all_positions().cloned().collect();
    assert_eq!(registry.update(TRADER, &paths).unwrap_err(), AmmError::InvalidPath);
    let after: Vec<Position> = registry.all_positions().cloned().collect();
    assert_eq!(before, after);
}

#[test]
fn providers_cannot_trade_against_the_registry() {
    let registry = eth_usdt_registry();
    let mut query = swap_query(USDT, ETH, "1000000");
    query.address = LP.to_lowercase();
    assert_eq!(registry.query(&query).unwrap_err(), AmmError::InvalidSelfTradeUser);
}
