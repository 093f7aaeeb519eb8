// ===============================
// src/broker_robinhood.rs
// ===============================
//
// Robinhood REST client:
// - OAuth2 password-grant login (device token derived from the
//   credentials so repeated runs present the same device)
// - paginated /positions/?nonzero=true, instrument urls resolved to
//   ticker symbols concurrently
// - /quotes/ last trade prices for every targeted + held symbol
//
// Credentials come from ROBINHOOD_USERNAME / ROBINHOOD_PASSWORD. This
// module is the only place that talks to the network; everything it
// learns is returned as one immutable PortfolioSnapshot.

use ahash::AHashMap;
use futures_util::future::try_join_all;
use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::config::Config;
use crate::domain::{PortfolioSnapshot, Position};
use crate::error::{AdvisorError, Result};

// Public client id used by the Robinhood web app for the password grant.
const CLIENT_ID: &str = "c82SH0WZOsabOXGP2sxqcj34FxkvfnWRZBKlBjFS";

static HTTP: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

// ---- Minimal wire models ----

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    next: Option<String>,
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RawPosition {
    instrument: String, // url of the instrument resource
    quantity: String,
}

#[derive(Debug, Deserialize)]
struct InstrumentDetail {
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct QuotesResponse {
    results: Vec<Option<Quote>>, // null for unknown symbols
}

#[derive(Debug, Deserialize)]
struct Quote {
    symbol: String,
    last_trade_price: String,
}

pub async fn fetch_snapshot(cfg: &Config, symbols: &[String]) -> Result<PortfolioSnapshot> {
    let base = cfg.robinhood_rest_url.trim_end_matches('/');
    let token = login(base).await?;

    // held quantities keyed by symbol
    let held = fetch_holdings(base, &token).await?;

    // one quote pass for targets + holdings
    let mut wanted: Vec<String> = symbols.to_vec();
    for sym in held.keys() {
        if !wanted.iter().any(|s| s == sym) {
            wanted.push(sym.clone());
        }
    }
    let prices = fetch_quotes(base, &token, &wanted).await?;

    let mut positions: AHashMap<String, Position> = AHashMap::new();
    for (sym, quantity) in held {
        let price = *prices
            .get(&sym)
            .ok_or_else(|| AdvisorError::unavailable(format!("no quote for held {sym}")))?;
        positions.insert(
            sym,
            Position {
                price,
                equity: quantity * price,
            },
        );
    }

    info!(
        prices = prices.len(),
        positions = positions.len(),
        "robinhood snapshot built"
    );
    Ok(PortfolioSnapshot { positions, prices })
}

async fn login(base: &str) -> Result<String> {
    let username = std::env::var("ROBINHOOD_USERNAME")
        .map_err(|_| AdvisorError::invalid("ROBINHOOD_USERNAME missing"))?;
    let password = std::env::var("ROBINHOOD_PASSWORD")
        .map_err(|_| AdvisorError::invalid("ROBINHOOD_PASSWORD missing"))?;

    let body = serde_json::json!({
        "grant_type": "password",
        "client_id": CLIENT_ID,
        "scope": "internal",
        "expires_in": 86400,
        "device_token": device_token(&username, &password),
        "username": username,
        "password": password,
    });

    let rsp = HTTP
        .post(format!("{base}/oauth2/token/"))
        .json(&body)
        .send()
        .await?
        .error_for_status()?;
    let login = rsp.json::<LoginResponse>().await?;
    info!("robinhood login ok");
    Ok(login.access_token)
}

/// Stable device token derived from the credentials, formatted like the
/// uuid the web client would send.
fn device_token(username: &str, password: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(format!("{username}:{password}").as_bytes());
    let h = hex::encode(&digest[..16]);
    format!(
        "{}-{}-{}-{}-{}",
        &h[0..8],
        &h[8..12],
        &h[12..16],
        &h[16..20],
        &h[20..32]
    )
}

/// All nonzero positions, following `next` links, resolved to symbols.
async fn fetch_holdings(base: &str, token: &str) -> Result<AHashMap<String, f64>> {
    let mut raw: Vec<RawPosition> = Vec::new();
    let mut next = Some(format!("{base}/positions/?nonzero=true"));

    while let Some(page_url) = next {
        // next links come back absolute; parse to reject redirects to
        // anywhere unexpected
        let page_url = Url::parse(&page_url)
            .map_err(|e| AdvisorError::unavailable(format!("bad positions page url: {e}")))?;
        let page = HTTP
            .get(page_url)
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?
            .json::<Page<RawPosition>>()
            .await?;
        raw.extend(page.results);
        next = page.next;
    }
    debug!(count = raw.len(), "positions fetched");

    // resolve instrument urls -> symbols concurrently
    let lookups = raw.iter().map(|p| async {
        let detail = HTTP
            .get(&p.instrument)
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?
            .json::<InstrumentDetail>()
            .await?;
        Ok::<InstrumentDetail, AdvisorError>(detail)
    });
    let details = try_join_all(lookups).await?;

    let mut held: AHashMap<String, f64> = AHashMap::new();
    for (pos, detail) in raw.iter().zip(details) {
        let quantity: f64 = pos.quantity.parse().map_err(|_| {
            AdvisorError::unavailable(format!(
                "unparsable quantity '{}' for {}",
                pos.quantity, detail.symbol
            ))
        })?;
        if quantity > 0.0 {
            *held.entry(detail.symbol).or_insert(0.0) += quantity;
        }
    }
    Ok(held)
}

async fn fetch_quotes(base: &str, token: &str, symbols: &[String]) -> Result<AHashMap<String, f64>> {
    let mut prices: AHashMap<String, f64> = AHashMap::new();
    if symbols.is_empty() {
        return Ok(prices);
    }

    let rsp = HTTP
        .get(format!("{base}/quotes/"))
        .query(&[("symbols", symbols.join(","))])
        .bearer_auth(token)
        .send()
        .await?
        .error_for_status()?
        .json::<QuotesResponse>()
        .await?;

    for quote in rsp.results.into_iter().flatten() {
        let price: f64 = quote.last_trade_price.parse().map_err(|_| {
            AdvisorError::unavailable(format!(
                "unparsable quote '{}' for {}",
                quote.last_trade_price, quote.symbol
            ))
        })?;
        prices.insert(quote.symbol, price);
    }

    // a null result slot means the exchange does not know the symbol;
    // planning cannot proceed on a defaulted price
    for sym in symbols {
        if !prices.contains_key(sym) {
            return Err(AdvisorError::unavailable(format!("no quote for {sym}")));
        }
    }
    Ok(prices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_token_is_stable_and_uuid_shaped() {
        let a = device_token("user@example.com", "hunter2");
        let b = device_token("user@example.com", "hunter2");
        assert_eq!(a, b);
        assert_ne!(a, device_token("other@example.com", "hunter2"));

        let parts: Vec<&str> = a.split('-').collect();
        assert_eq!(
            parts.iter().map(|p| p.len()).collect::<Vec<_>>(),
            vec![8, 4, 4, 4, 12]
        );
    }
}
