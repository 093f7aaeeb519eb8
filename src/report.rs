// ===============================
// src/report.rs
// ===============================
//
// Console tables are the product output and go to stdout; diagnostics
// stay on tracing. Rows are ranked by value descending and the totals
// row reconciles with the per-row numbers up to display rounding.

use chrono::Local;

use crate::domain::{AllocationMap, InvestmentPlan, PortfolioSnapshot};

pub fn print_allocations(allocations: &AllocationMap, total_amount: f64, title: &str) {
    println!(
        "\n{title}: ${total_amount:.2} (as of {})",
        Local::now().format("%Y-%m-%d %H:%M")
    );
    println!("\nRank | Stock  | Allocation | Dollar Amount");
    println!("------------------------------------------");

    let mut total_percentage = 0.0;
    let mut total_dollars = 0.0;
    for (rank, (symbol, percentage)) in allocations.sorted_desc().iter().enumerate() {
        let dollars = percentage / 100.0 * total_amount;
        println!(
            "{:4} | {:<6} | {:>9.2}% | ${:>11.2}",
            rank + 1,
            symbol,
            percentage,
            dollars
        );
        total_percentage += percentage;
        total_dollars += dollars;
    }
    println!("------------------------------------------");
    println!("Total:        | {total_percentage:>9.2}% | ${total_dollars:>11.2}");
}

pub fn print_plan(plan: &InvestmentPlan, new_amount: f64) {
    println!(
        "\nNEW cash deployment: ${new_amount:.2} (as of {})",
        Local::now().format("%Y-%m-%d %H:%M")
    );
    println!("\nRank | Stock  | Buy Amount");
    println!("--------------------------");

    for (rank, (symbol, dollars)) in plan.allocations.sorted_desc().iter().enumerate() {
        println!("{:4} | {:<6} | ${:>11.2}", rank + 1, symbol, dollars);
    }
    println!("--------------------------");
    println!(
        "Deployed: ${:>11.2}   Leftover: ${:>9.2}",
        plan.total_allocated(),
        plan.leftover
    );
}

pub fn print_positions(snapshot: &PortfolioSnapshot) {
    println!(
        "\nCurrent holdings (as of {})",
        Local::now().format("%Y-%m-%d %H:%M")
    );
    println!("\nStock  | Price        | Equity");
    println!("-------------------------------");

    let mut rows: Vec<(&String, f64, f64)> = snapshot
        .positions
        .iter()
        .map(|(sym, pos)| (sym, pos.price, pos.equity))
        .collect();
    rows.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut total_equity = 0.0;
    for (symbol, price, equity) in rows {
        println!("{symbol:<6} | ${price:>11.2} | ${equity:>11.2}");
        total_equity += equity;
    }
    println!("-------------------------------");
    println!("Total equity: ${total_equity:>11.2}");
}
