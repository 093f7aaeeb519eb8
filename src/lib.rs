// ===============================
// src/lib.rs
// ===============================
//
// Batch robo-advisor: geometric target allocation with a cardinality
// limit and a dollar floor, plus a priority-first planner for deploying
// new cash toward the targets. The core (allocate, limiter, planner) is
// pure and synchronous; broker modules do all the I/O up front.

pub mod allocate;
pub mod broker;
pub mod broker_robinhood;
pub mod config;
pub mod domain;
pub mod error;
pub mod limiter;
pub mod planner;
pub mod report;

use domain::AllocationMap;
use error::Result;

/// Category table -> combined percentages -> limited final targets.
pub fn build_targets(cfg: &config::Config) -> Result<AllocationMap> {
    let combined = allocate::expand_categories(&cfg.categories, cfg.geometric_ratio)?;
    limiter::limit_and_reallocate(
        &combined,
        cfg.stock_limit,
        cfg.geometric_ratio,
        cfg.total_amount,
        cfg.min_dollar_amount,
    )
}
