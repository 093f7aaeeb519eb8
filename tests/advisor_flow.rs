// End-to-end advisor flow without any network: category table ->
// combined targets -> limit/floor search -> comparison against a
// hand-built snapshot -> new-cash plan.

use ahash::AHashMap;

use robo_advisor_rust::build_targets;
use robo_advisor_rust::config::{BrokerMode, Config};
use robo_advisor_rust::domain::{Category, PortfolioSnapshot, Position, PriorityList};
use robo_advisor_rust::planner;

fn category(id: &str, symbols: &[&str], pct: f64, ordered: bool) -> Category {
    Category {
        id: id.into(),
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        target_percentage: pct,
        ordered,
    }
}

fn config(categories: Vec<Category>, limit: i64, floor: f64) -> Config {
    Config {
        categories,
        geometric_ratio: 0.8,
        stock_limit: limit,
        min_dollar_amount: floor,
        total_amount: 10_000.0,
        new_amount: 1_000.0,
        broker_mode: BrokerMode::Mock,
        robinhood_rest_url: "https://api.robinhood.com".into(),
        mock_holdings: Vec::new(),
        mock_price_jitter: 0.0,
    }
}

#[test]
fn targets_then_plan_full_flow() {
    let cats = vec![
        category("ETF", &["VOO", "VTI"], 60.0, true),
        category("BUY", &["AAPL", "MSFT"], 40.0, false),
    ];
    let cfg = config(cats.clone(), 3, 2_500.0);

    // combined: VOO 33.33, VTI 26.67, AAPL 20, MSFT 20; the limit-3 trial
    // redistributes {VOO, VTI, AAPL} geometrically and clears the floor
    let targets = build_targets(&cfg).unwrap();
    assert_eq!(targets.len(), 3);
    assert!(!targets.contains("MSFT"));
    assert!((targets.get("VOO").unwrap() - 40.98).abs() < 0.01);
    assert!((targets.get("VTI").unwrap() - 32.79).abs() < 0.01);
    assert!((targets.get("AAPL").unwrap() - 26.23).abs() < 0.01);
    assert!((targets.total() - 100.0).abs() < 1e-6);

    let mut prices: AHashMap<String, f64> = AHashMap::new();
    prices.insert("VOO".into(), 400.0);
    prices.insert("VTI".into(), 220.0);
    prices.insert("AAPL".into(), 150.0);
    let mut positions: AHashMap<String, Position> = AHashMap::new();
    positions.insert(
        "AAPL".into(),
        Position {
            price: 150.0,
            equity: 1_000.0,
        },
    );
    let snapshot = PortfolioSnapshot { positions, prices };

    let comparison = planner::compare(&targets, &snapshot, cfg.total_amount).unwrap();
    let aapl = comparison.get("AAPL").unwrap();
    assert!(aapl.owned);
    assert!((aapl.difference - (2_622.95 - 1_000.0)).abs() < 0.01);
    assert!(!comparison.get("VOO").unwrap().owned);

    let priority = PriorityList::from_categories(&cfg.categories);
    let plan = planner::plan(&comparison, &priority, cfg.new_amount).unwrap();

    // seed VOO (400) and VTI (220); AAPL is held so the remainder buys
    // 2 whole units of it (300), leaving 80 -- below the cheapest price
    assert_eq!(plan.allocations.get("VOO"), Some(400.0));
    assert_eq!(plan.allocations.get("VTI"), Some(220.0));
    assert_eq!(plan.allocations.get("AAPL"), Some(300.0));
    assert!((plan.leftover - 80.0).abs() < 1e-9);
    assert!(plan.leftover < comparison.min_price().unwrap());
    assert!((plan.total_allocated() + plan.leftover - cfg.new_amount).abs() < 1e-9);
}

#[test]
fn tight_floor_shrinks_the_target_set() {
    let cats = vec![
        category("ETF", &["VOO", "VTI"], 60.0, true),
        category("BUY", &["AAPL", "MSFT"], 40.0, false),
    ];
    // a floor of 4400 on 10k cannot hold more than two instruments
    let cfg = config(cats, 0, 4_400.0);
    let targets = build_targets(&cfg).unwrap();
    assert_eq!(targets.len(), 2);
    assert!(targets.contains("VOO"));
    assert!(targets.contains("VTI"));
    assert!((targets.get("VOO").unwrap() - 55.56).abs() < 0.01);
}

#[test]
fn impossible_floor_falls_back_to_one_instrument() {
    let cats = vec![category("ETF", &["VOO", "VTI", "AAPL"], 100.0, true)];
    let cfg = config(cats, 0, 9_999.0);
    let targets = build_targets(&cfg).unwrap();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets.get("VOO"), Some(100.0));
}
