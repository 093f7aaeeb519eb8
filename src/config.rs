// ===============================
// src/config.rs
// ===============================
//
// All process configuration comes from environment variables (.env is
// honored), collected once into an immutable Config at startup and
// passed by parameter from there on. The core modules never touch the
// environment.
//
// Category precedence is data, not code: CATEGORIES lists category ids
// in priority order, and each id brings its own symbol list, allocation
// percentage and ordered flag:
//
//   CATEGORIES=ETF,STRONG_BUY,BUY
//   ETF=VOO,VTI            ETF_ALLOCATION=50   ETF_ORDERED=true
//   STRONG_BUY=AAPL,MSFT   STRONG_BUY_ALLOCATION=30
//   BUY=KO                 BUY_ALLOCATION=20
//
use std::env;

use dotenvy::dotenv;
use url::Url;

use crate::allocate::PERCENT_TOLERANCE;
use crate::domain::Category;
use crate::error::{AdvisorError, Result};

/// Which brokerage backs the positions/prices snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BrokerMode {
    Mock,
    Robinhood,
}

impl BrokerMode {
    pub fn from_env(key: &str, default_mode: BrokerMode) -> BrokerMode {
        match env::var(key).unwrap_or_default().to_ascii_lowercase().as_str() {
            "mock" => BrokerMode::Mock,
            "robinhood" => BrokerMode::Robinhood,
            _ => default_mode,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BrokerMode::Mock => "mock",
            BrokerMode::Robinhood => "robinhood",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub categories: Vec<Category>,

    // allocation knobs
    pub geometric_ratio: f64,
    pub stock_limit: i64,
    pub min_dollar_amount: f64,
    pub total_amount: f64,
    pub new_amount: f64,

    // broker
    pub broker_mode: BrokerMode,
    pub robinhood_rest_url: String,
    pub mock_holdings: Vec<(String, f64)>,
    pub mock_price_jitter: f64,
}

pub fn load() -> Result<Config> {
    let _ = dotenv();

    let categories = load_categories()?;
    validate_categories(&categories)?;

    let geometric_ratio = parse_or("GEOMETRIC_RATIO", 0.8);
    if geometric_ratio <= 0.0 {
        return Err(AdvisorError::invalid(format!(
            "GEOMETRIC_RATIO must be > 0, got {geometric_ratio}"
        )));
    }

    let stock_limit: i64 = parse_or("STOCK_LIMIT", 0);

    let min_dollar_amount = parse_or("MIN_DOLLAR_AMOUNT", 0.0);
    if min_dollar_amount < 0.0 {
        return Err(AdvisorError::invalid(format!(
            "MIN_DOLLAR_AMOUNT must be >= 0, got {min_dollar_amount}"
        )));
    }

    let total_amount: f64 = env::var("TOTAL_AMOUNT")
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| AdvisorError::invalid("TOTAL_AMOUNT is required"))?;
    if total_amount <= 0.0 {
        return Err(AdvisorError::invalid(format!(
            "TOTAL_AMOUNT must be > 0, got {total_amount}"
        )));
    }

    let new_amount = parse_or("NEW_AMOUNT", 0.0);
    if new_amount < 0.0 {
        return Err(AdvisorError::invalid(format!(
            "NEW_AMOUNT must be >= 0, got {new_amount}"
        )));
    }

    let broker_mode = BrokerMode::from_env("BROKER_MODE", BrokerMode::Mock);
    let robinhood_rest_url = env::var("ROBINHOOD_REST_URL")
        .unwrap_or_else(|_| "https://api.robinhood.com".to_string());
    Url::parse(&robinhood_rest_url)
        .map_err(|e| AdvisorError::invalid(format!("bad ROBINHOOD_REST_URL: {e}")))?;

    let mock_holdings = parse_holdings(&env::var("MOCK_HOLDINGS").unwrap_or_default())?;
    let mock_price_jitter = parse_or("MOCK_PRICE_JITTER", 0.0);

    Ok(Config {
        categories,
        geometric_ratio,
        stock_limit,
        min_dollar_amount,
        total_amount,
        new_amount,
        broker_mode,
        robinhood_rest_url,
        mock_holdings,
        mock_price_jitter,
    })
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn load_categories() -> Result<Vec<Category>> {
    let ids = symbol_list(&env::var("CATEGORIES").unwrap_or_default());
    if ids.is_empty() {
        return Err(AdvisorError::invalid(
            "CATEGORIES must list at least one category id",
        ));
    }

    let mut categories = Vec::with_capacity(ids.len());
    for id in ids {
        let symbols = symbol_list(&env::var(&id).unwrap_or_default());
        let target_percentage: f64 = env::var(format!("{id}_ALLOCATION"))
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| AdvisorError::invalid(format!("{id}_ALLOCATION is required")))?;
        let ordered = env::var(format!("{id}_ORDERED"))
            .map(|v| v.to_ascii_lowercase() == "true")
            .unwrap_or(false);
        categories.push(Category {
            id,
            symbols,
            target_percentage,
            ordered,
        });
    }
    Ok(categories)
}

/// Comma list -> trimmed upper-case symbols, empties dropped.
pub fn symbol_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_ascii_uppercase())
        .collect()
}

/// `SYM:equity` comma list for the mock broker.
pub fn parse_holdings(raw: &str) -> Result<Vec<(String, f64)>> {
    let mut out = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (sym, equity) = item.split_once(':').ok_or_else(|| {
            AdvisorError::invalid(format!("MOCK_HOLDINGS entry '{item}' is not SYM:equity"))
        })?;
        let equity: f64 = equity.trim().parse().map_err(|_| {
            AdvisorError::invalid(format!("MOCK_HOLDINGS equity in '{item}' is not a number"))
        })?;
        if equity < 0.0 {
            return Err(AdvisorError::invalid(format!(
                "MOCK_HOLDINGS equity in '{item}' must be >= 0"
            )));
        }
        out.push((sym.trim().to_ascii_uppercase(), equity));
    }
    Ok(out)
}

/// Boundary validation: fail fast, never silently correct.
pub fn validate_categories(categories: &[Category]) -> Result<()> {
    if categories.is_empty() {
        return Err(AdvisorError::invalid("no categories configured"));
    }
    for cat in categories {
        if cat.symbols.is_empty() {
            return Err(AdvisorError::invalid(format!(
                "category {} has no instruments",
                cat.id
            )));
        }
        if !(0.0..=100.0).contains(&cat.target_percentage) {
            return Err(AdvisorError::invalid(format!(
                "category {} allocation {} is outside [0, 100]",
                cat.id, cat.target_percentage
            )));
        }
    }
    let total: f64 = categories.iter().map(|c| c.target_percentage).sum();
    if (total - 100.0).abs() > PERCENT_TOLERANCE {
        return Err(AdvisorError::invalid(format!(
            "category allocations sum to {total}, expected 100"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(id: &str, symbols: &[&str], pct: f64) -> Category {
        Category {
            id: id.into(),
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            target_percentage: pct,
            ordered: false,
        }
    }

    #[test]
    fn symbol_list_trims_uppercases_and_drops_empties() {
        assert_eq!(symbol_list(" voo, vti ,,aapl"), vec!["VOO", "VTI", "AAPL"]);
        assert!(symbol_list("").is_empty());
        assert!(symbol_list(" , ,").is_empty());
    }

    #[test]
    fn holdings_parse_and_reject_garbage() {
        let h = parse_holdings("voo:1200.50, aapl:300").unwrap();
        assert_eq!(h, vec![("VOO".to_string(), 1200.5), ("AAPL".to_string(), 300.0)]);
        assert!(parse_holdings("voo").is_err());
        assert!(parse_holdings("voo:abc").is_err());
        assert!(parse_holdings("voo:-5").is_err());
        assert!(parse_holdings("").unwrap().is_empty());
    }

    #[test]
    fn category_validation_enforces_the_sum_invariant() {
        let good = vec![cat("A", &["X"], 60.0), cat("B", &["Y"], 40.0)];
        assert!(validate_categories(&good).is_ok());

        // within tolerance
        let close = vec![cat("A", &["X"], 60.004), cat("B", &["Y"], 40.0)];
        assert!(validate_categories(&close).is_ok());

        let off = vec![cat("A", &["X"], 60.0), cat("B", &["Y"], 50.0)];
        assert!(validate_categories(&off).is_err());

        let empty_cat = vec![cat("A", &[], 100.0)];
        assert!(validate_categories(&empty_cat).is_err());

        assert!(validate_categories(&[]).is_err());

        let out_of_range = vec![cat("A", &["X"], 120.0), cat("B", &["Y"], -20.0)];
        assert!(validate_categories(&out_of_range).is_err());
    }
}
