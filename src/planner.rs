// ===============================
// src/planner.rs
// ===============================
//
// New-cash deployment:
// 1) classify unheld vs held
// 2) seed unheld positions, one unit each, in priority order
// 3) balance category maxima so earlier categories never trail later ones
// 4) top up the most underweight held positions in whole units
//
// Purchases are whole-unit only; whatever cannot buy a unit is returned
// as leftover. The comparison snapshot is fetched in full before this
// module runs, so everything here is pure and synchronous.

use tracing::debug;

use crate::domain::{
    AllocationBuilder, AllocationMap, Comparison, ComparisonEntry, InvestmentPlan,
    PortfolioSnapshot, PriorityList,
};
use crate::error::{AdvisorError, Result};

/// Derive the per-instrument distance from target.
///
/// `difference` is target dollars minus current equity; an instrument
/// absent from the snapshot's positions is unheld (equity 0, the full
/// target is the difference). A targeted instrument with no price is
/// `DataUnavailable` — a defaulted zero price would corrupt every
/// whole-unit computation downstream.
pub fn compare(
    targets: &AllocationMap,
    snapshot: &PortfolioSnapshot,
    total_amount: f64,
) -> Result<Comparison> {
    if total_amount <= 0.0 {
        return Err(AdvisorError::invalid(format!(
            "total amount must be > 0, got {total_amount}"
        )));
    }

    let mut comparison = Comparison::default();
    for (symbol, pct) in targets.iter() {
        let target_dollars = pct / 100.0 * total_amount;

        let position = snapshot.positions.get(symbol);
        let price = snapshot
            .prices
            .get(symbol)
            .copied()
            .or_else(|| position.map(|p| p.price))
            .ok_or_else(|| AdvisorError::unavailable(format!("no price for {symbol}")))?;
        if price <= 0.0 {
            return Err(AdvisorError::invalid(format!(
                "non-positive price {price} for {symbol}"
            )));
        }

        let (owned, equity) = match position {
            Some(p) => (true, p.equity),
            None => (false, 0.0),
        };
        let difference = if owned {
            target_dollars - equity
        } else {
            target_dollars
        };

        comparison.insert(
            symbol,
            ComparisonEntry {
                difference,
                price,
                equity,
                owned,
            },
        );
    }
    Ok(comparison)
}

/// Deploy `new_amount` of fresh cash toward the targets.
pub fn plan(
    comparison: &Comparison,
    priority: &PriorityList,
    new_amount: f64,
) -> Result<InvestmentPlan> {
    if new_amount < 0.0 {
        return Err(AdvisorError::invalid(format!(
            "new amount must be >= 0, got {new_amount}"
        )));
    }
    for (symbol, entry) in comparison.iter() {
        if entry.price <= 0.0 {
            return Err(AdvisorError::invalid(format!(
                "non-positive price {} for {symbol}",
                entry.price
            )));
        }
    }
    if comparison.is_empty() || new_amount == 0.0 {
        return Ok(InvestmentPlan {
            allocations: AllocationMap::default(),
            leftover: new_amount,
        });
    }

    let mut builder = AllocationBuilder::new();
    let mut remaining = new_amount;

    seed_unheld(comparison, priority, &mut builder, &mut remaining);
    balance_categories(priority, &mut builder, &mut remaining);
    top_up_underweight(comparison, priority, &mut builder, &mut remaining);

    debug!(
        allocated = builder.total(),
        leftover = remaining,
        positions = builder.iter().count(),
        "plan complete"
    );
    Ok(InvestmentPlan {
        allocations: builder.finalize(),
        leftover: remaining,
    })
}

/// Phase 2: one unit for each unheld instrument, walked strictly in
/// priority order. The first unaffordable instrument ends the phase;
/// cheaper instruments further down the list are NOT considered —
/// sequencing outranks cash efficiency here.
fn seed_unheld(
    comparison: &Comparison,
    priority: &PriorityList,
    builder: &mut AllocationBuilder,
    remaining: &mut f64,
) {
    let mut unheld: Vec<(usize, &str, f64)> = comparison
        .iter()
        .enumerate()
        .filter(|(_, (_, e))| !e.owned)
        .map(|(seq, (sym, e))| (seq, sym, e.price))
        .collect();
    // unranked symbols fall after every ranked one, keeping their
    // relative order
    unheld.sort_by_key(|&(seq, sym, _)| (priority.rank(sym), seq));

    for (_, symbol, price) in unheld {
        if *remaining < price {
            debug!(%symbol, price, remaining = *remaining, "seed phase stopped");
            break;
        }
        builder.add(symbol, price);
        *remaining -= price;
    }
}

/// Phase 3: compare the largest single allocation per category, walking
/// category pairs in priority order; whenever an earlier category's
/// maximum does not exceed a later one's, top up the earlier category's
/// max instrument by the shortfall (capped by cash).
fn balance_categories(priority: &PriorityList, builder: &mut AllocationBuilder, remaining: &mut f64) {
    let n = priority.category_count();
    // (max instrument, max amount) per category present in the plan
    let mut maxima: Vec<Option<(String, f64)>> = vec![None; n];
    for (symbol, amount) in builder.iter() {
        if let Some(ci) = priority.category_index(symbol) {
            match &maxima[ci] {
                Some((_, best)) if *best >= amount => {}
                _ => maxima[ci] = Some((symbol.to_string(), amount)),
            }
        }
    }

    'outer: for i in 0..n {
        for j in (i + 1)..n {
            if *remaining <= 0.0 {
                break 'outer;
            }
            let hi = match &maxima[i] {
                Some(m) => m.clone(),
                None => continue,
            };
            let lo = match &maxima[j] {
                Some(m) => m.1,
                None => continue,
            };
            if hi.1 <= lo {
                let top_up = (lo - hi.1).min(*remaining);
                if top_up > 0.0 {
                    debug!(
                        category = priority.category_id(i),
                        symbol = %hi.0,
                        top_up,
                        "balancing category maxima"
                    );
                    builder.add(&hi.0, top_up);
                    *remaining -= top_up;
                    maxima[i] = Some((hi.0, hi.1 + top_up));
                }
            }
        }
    }
}

/// Phase 4: spend what is left on held instruments below target, most
/// underweight first (priority rank breaks ties), whole units only.
fn top_up_underweight(
    comparison: &Comparison,
    priority: &PriorityList,
    builder: &mut AllocationBuilder,
    remaining: &mut f64,
) {
    let cheapest = match comparison.min_price() {
        Some(p) => p,
        None => return,
    };

    let mut underweight: Vec<(usize, &str, &ComparisonEntry)> = comparison
        .iter()
        .enumerate()
        .filter(|(_, (_, e))| e.owned && e.difference > 0.0)
        .map(|(seq, (sym, e))| (seq, sym, e))
        .collect();
    underweight.sort_by(|a, b| {
        b.2.difference
            .partial_cmp(&a.2.difference)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| priority.rank(a.1).cmp(&priority.rank(b.1)))
            .then_with(|| a.0.cmp(&b.0))
    });

    for (_, symbol, entry) in underweight {
        if *remaining < cheapest {
            break;
        }
        let affordable = (*remaining / entry.price).floor();
        let needed = (entry.difference / entry.price).floor();
        let units = affordable.min(needed);
        if units >= 1.0 {
            let dollars = units * entry.price;
            builder.add(symbol, dollars);
            *remaining -= dollars;
        }
    }
}
