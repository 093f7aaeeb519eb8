// ===============================
// src/allocate.rs
// ===============================
//
// Target-allocation math:
// - geometric : weight ratio^i per list position, normalized to a total
// - equal     : uniform split (unordered categories)
// - combine   : merge category maps, summing repeated symbols
// - expand_categories : category table -> one portfolio-wide percent map
//
// Everything here is pure; callers validate amounts, we validate shapes.

use crate::domain::{AllocationBuilder, AllocationMap, Category};
use crate::error::{AdvisorError, Result};

/// Tolerance used when checking percentage sums.
pub const PERCENT_TOLERANCE: f64 = 0.01;

/// Geometric-decay allocation over an ordered instrument list.
///
/// Position i (0-indexed) gets weight `ratio^i`, normalized so the map
/// sums to `total_percentage`. `ratio < 1` favors the front of the list,
/// `ratio = 1` is uniform, `ratio > 1` favors the back. A single
/// instrument receives the full percentage regardless of ratio.
pub fn geometric(symbols: &[String], total_percentage: f64, ratio: f64) -> Result<AllocationMap> {
    if symbols.is_empty() {
        return Err(AdvisorError::invalid("cannot allocate over zero instruments"));
    }
    if total_percentage < 0.0 {
        return Err(AdvisorError::invalid(format!(
            "total percentage must be >= 0, got {total_percentage}"
        )));
    }
    if ratio <= 0.0 {
        return Err(AdvisorError::invalid(format!(
            "geometric ratio must be > 0, got {ratio}"
        )));
    }

    let weights: Vec<f64> = (0..symbols.len()).map(|i| ratio.powi(i as i32)).collect();
    let total_weight: f64 = weights.iter().sum();

    let mut builder = AllocationBuilder::new();
    for (sym, w) in symbols.iter().zip(&weights) {
        builder.add(sym, w / total_weight * total_percentage);
    }
    Ok(builder.finalize())
}

/// Equal-weight allocation (unordered categories).
pub fn equal(symbols: &[String], total_percentage: f64) -> Result<AllocationMap> {
    if symbols.is_empty() {
        return Err(AdvisorError::invalid("cannot allocate over zero instruments"));
    }
    if total_percentage < 0.0 {
        return Err(AdvisorError::invalid(format!(
            "total percentage must be >= 0, got {total_percentage}"
        )));
    }
    let share = total_percentage / symbols.len() as f64;
    let mut builder = AllocationBuilder::new();
    for sym in symbols {
        builder.add(sym, share);
    }
    Ok(builder.finalize())
}

/// Merge several allocation maps into one, summing the contribution of
/// any symbol that appears in more than one input. Commutative and
/// associative up to float rounding.
pub fn combine(maps: &[AllocationMap]) -> AllocationMap {
    let mut builder = AllocationBuilder::new();
    for map in maps {
        for (sym, pct) in map.iter() {
            builder.add(sym, pct);
        }
    }
    builder.finalize()
}

/// Expand the category table into one portfolio-wide percentage map.
///
/// Each category contributes its own target percentage, geometrically
/// when ordered and equally otherwise; the combined map sums to 100 when
/// the category percentages do.
pub fn expand_categories(categories: &[Category], ratio: f64) -> Result<AllocationMap> {
    if categories.is_empty() {
        return Err(AdvisorError::invalid("no categories configured"));
    }
    let mut per_category = Vec::with_capacity(categories.len());
    for cat in categories {
        let map = if cat.ordered {
            geometric(&cat.symbols, cat.target_percentage, ratio)?
        } else {
            equal(&cat.symbols, cat.target_percentage)?
        };
        per_category.push(map);
    }
    Ok(combine(&per_category))
}
