// ===============================
// src/main.rs
// ===============================
use clap::{Parser, Subcommand};
use tracing::{error, info};

use robo_advisor_rust::domain::PriorityList;
use robo_advisor_rust::error::Result;
use robo_advisor_rust::{broker, build_targets, config, planner, report};

#[derive(Parser)]
#[command(name = "robo_advisor_rust", about = "Geometric portfolio allocator and new-cash planner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute and print the final target allocation (no network)
    Target,
    /// Fetch and print current holdings
    Positions,
    /// Fetch holdings/prices and plan the deployment of NEW_AMOUNT
    Plan,
}

#[tokio::main]
async fn main() {
    // ---- Logging ----
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command).await {
        error!(%e, "advisor run failed");
        std::process::exit(1);
    }
}

async fn run(command: Command) -> Result<()> {
    // ---- Load config (immutable for the whole run) ----
    let cfg = config::load()?;
    info!(
        broker = cfg.broker_mode.as_str(),
        categories = cfg.categories.len(),
        ratio = cfg.geometric_ratio,
        limit = cfg.stock_limit,
        total = cfg.total_amount,
        new = cfg.new_amount,
        "startup config"
    );

    // ---- Target allocation (pure) ----
    let targets = build_targets(&cfg)?;
    let target_symbols: Vec<String> = targets.iter().map(|(s, _)| s.to_string()).collect();

    match command {
        Command::Target => {
            report::print_allocations(&targets, cfg.total_amount, "TOTAL Portfolio");
        }
        Command::Positions => {
            let snapshot = broker::fetch_snapshot(&cfg, &target_symbols).await?;
            report::print_positions(&snapshot);
        }
        Command::Plan => {
            // One snapshot fetch, then the core runs offline on it.
            let snapshot = broker::fetch_snapshot(&cfg, &target_symbols).await?;
            let priority = PriorityList::from_categories(&cfg.categories);
            let comparison = planner::compare(&targets, &snapshot, cfg.total_amount)?;
            let plan = planner::plan(&comparison, &priority, cfg.new_amount)?;

            report::print_allocations(&targets, cfg.total_amount, "TOTAL Portfolio");
            report::print_plan(&plan, cfg.new_amount);
        }
    }
    Ok(())
}
