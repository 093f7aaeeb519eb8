// ===============================
// src/broker.rs
// ===============================
//
// Price/position oracle, fetched exactly once per run. The planner only
// ever sees the finished PortfolioSnapshot; no network call happens
// after planning begins.
//
// Two backends, selected by BROKER_MODE:
// - mock      : deterministic pseudo-prices (hash-seeded, optional
//               jitter) and holdings from MOCK_HOLDINGS — offline runs
// - robinhood : live REST (see broker_robinhood.rs)

use ahash::AHashMap;
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::broker_robinhood;
use crate::config::{BrokerMode, Config};
use crate::domain::{PortfolioSnapshot, Position};
use crate::error::Result;

/// Fetch prices for `symbols` plus the currently held positions.
pub async fn fetch_snapshot(cfg: &Config, symbols: &[String]) -> Result<PortfolioSnapshot> {
    match cfg.broker_mode {
        BrokerMode::Mock => Ok(mock_snapshot(cfg, symbols)),
        BrokerMode::Robinhood => broker_robinhood::fetch_snapshot(cfg, symbols).await,
    }
}

fn mock_snapshot(cfg: &Config, symbols: &[String]) -> PortfolioSnapshot {
    let mut prices: AHashMap<String, f64> = AHashMap::new();
    for sym in symbols {
        prices.insert(sym.clone(), mock_price(sym, cfg.mock_price_jitter));
    }

    let mut positions: AHashMap<String, Position> = AHashMap::new();
    for (sym, equity) in &cfg.mock_holdings {
        let price = *prices
            .entry(sym.clone())
            .or_insert_with(|| mock_price(sym, cfg.mock_price_jitter));
        positions.insert(
            sym.clone(),
            Position {
                price,
                equity: *equity,
            },
        );
    }

    info!(
        prices = prices.len(),
        positions = positions.len(),
        "mock snapshot built"
    );
    PortfolioSnapshot { positions, prices }
}

/// Stable per-symbol pseudo-price in roughly $10..$500, derived from a
/// hash of the symbol so repeated runs agree unless jitter is asked for.
fn mock_price(symbol: &str, jitter: f64) -> f64 {
    let digest = Sha256::digest(symbol.as_bytes());
    let seed = u16::from_be_bytes([digest[0], digest[1]]) as f64 / u16::MAX as f64;
    let base = 10.0 + seed * 490.0;
    if jitter > 0.0 {
        base * (1.0 + rand::thread_rng().gen_range(-jitter..=jitter))
    } else {
        base
    }
}
