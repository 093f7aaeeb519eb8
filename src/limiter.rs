// ===============================
// src/limiter.rs
// ===============================
//
// Cardinality limit + per-position dollar floor.
//
// Greedy worst-first elimination: drop the smallest-weighted instrument
// each round and redistribute geometrically until every retained
// position clears the floor. This finds *a* instrument count satisfying
// the floor, not the maximum one; the search is linear and terminates
// because the limit strictly decreases with a floor at one.

use crate::allocate;
use crate::domain::{AllocationBuilder, AllocationMap};
use crate::error::{AdvisorError, Result};

/// Search state. The limit in `Evaluating` strictly decreases step to
/// step; `Success` and `SingleFallback` are terminal.
#[derive(Debug)]
pub enum LimitSearch {
    Evaluating { limit: usize },
    Success(AllocationMap),
    SingleFallback(String),
}

/// Shrink `allocation` to at most `limit` instruments such that every
/// retained instrument's implied dollar amount clears
/// `min_dollar_amount`, redistributing geometrically (total 100) among
/// the survivors each round.
///
/// `limit <= 0` or `limit >= len` disables the cardinality cap. When the
/// search bottoms out at one instrument it receives 100% unconditionally:
/// a single position can always absorb the full amount, so the floor is
/// not enforced there.
pub fn limit_and_reallocate(
    allocation: &AllocationMap,
    limit: i64,
    ratio: f64,
    total_amount: f64,
    min_dollar_amount: f64,
) -> Result<AllocationMap> {
    let m = allocation.len();
    if m == 0 {
        return Err(AdvisorError::invalid("cannot limit an empty allocation"));
    }
    if total_amount <= 0.0 {
        return Err(AdvisorError::invalid(format!(
            "total amount must be > 0, got {total_amount}"
        )));
    }
    if min_dollar_amount < 0.0 {
        return Err(AdvisorError::invalid(format!(
            "minimum dollar amount must be >= 0, got {min_dollar_amount}"
        )));
    }

    let normalized = if limit <= 0 || limit as usize >= m {
        m
    } else {
        limit as usize
    };

    // Descending by prior percentage, insertion order on ties.
    let mut ranked = allocation.sorted_desc();
    let mut state = LimitSearch::Evaluating { limit: normalized };

    loop {
        state = match state {
            LimitSearch::Evaluating { limit } => step(limit, &mut ranked, ratio, total_amount, min_dollar_amount)?,
            LimitSearch::Success(map) => return Ok(map),
            LimitSearch::SingleFallback(symbol) => {
                let mut builder = AllocationBuilder::new();
                builder.add(&symbol, 100.0);
                return Ok(builder.finalize());
            }
        };
    }
}

/// One `Evaluating` step: retry the geometric redistribution over the
/// top `limit` instruments, or shrink and continue.
fn step(
    limit: usize,
    ranked: &mut Vec<(String, f64)>,
    ratio: f64,
    total_amount: f64,
    min_dollar_amount: f64,
) -> Result<LimitSearch> {
    // Below two instruments the floor cannot be enforced further.
    if limit <= 1 || ranked.len() <= 1 {
        return Ok(LimitSearch::SingleFallback(ranked[0].0.clone()));
    }

    let retained: Vec<String> = ranked.iter().take(limit).map(|(s, _)| s.clone()).collect();

    // Fresh geometric redistribution among the survivors, not a rescale
    // of their old percentages.
    let candidate = allocate::geometric(&retained, 100.0, ratio)?;

    let clears_floor = candidate
        .iter()
        .all(|(_, pct)| pct / 100.0 * total_amount >= min_dollar_amount);

    if clears_floor {
        return Ok(LimitSearch::Success(candidate));
    }

    let next = limit - 1;
    ranked.truncate(next);
    Ok(LimitSearch::Evaluating { limit: next })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AllocationBuilder;

    fn allocation(pairs: &[(&str, f64)]) -> AllocationMap {
        let mut b = AllocationBuilder::new();
        for (s, v) in pairs {
            b.add(s, *v);
        }
        b.finalize()
    }

    #[test]
    fn keeps_top_three_when_floor_clears() {
        let m = allocation(&[("A", 40.0), ("B", 30.0), ("C", 20.0), ("D", 10.0)]);
        let out = limit_and_reallocate(&m, 3, 0.8, 1000.0, 150.0).unwrap();
        assert_eq!(out.len(), 3);
        assert!(!out.contains("D"));
        // geometric redistribution over {A,B,C}: ~40.98 / 32.79 / 26.23
        assert!((out.get("A").unwrap() - 40.98).abs() < 0.01);
        assert!((out.get("B").unwrap() - 32.79).abs() < 0.01);
        assert!((out.get("C").unwrap() - 26.23).abs() < 0.01);
        // implied dollars all clear the 150 floor
        for (_, pct) in out.iter() {
            assert!(pct / 100.0 * 1000.0 >= 150.0);
        }
    }

    #[test]
    fn shrinks_until_floor_clears() {
        let m = allocation(&[("A", 40.0), ("B", 30.0), ("C", 20.0), ("D", 10.0)]);
        // with a 350 floor the 3-instrument trial fails (B, C below 350),
        // the 2-instrument trial gives {55.6, 44.4} -> {556, 444}
        let out = limit_and_reallocate(&m, 3, 0.8, 1000.0, 350.0).unwrap();
        assert_eq!(out.len(), 2);
        assert!((out.get("A").unwrap() - 55.56).abs() < 0.01);
        assert!((out.get("B").unwrap() - 44.44).abs() < 0.01);
    }

    #[test]
    fn nonpositive_or_oversized_limit_is_a_noop_on_cardinality() {
        let m = allocation(&[("A", 50.0), ("B", 30.0), ("C", 20.0)]);
        for limit in [0i64, -3, 3, 99] {
            let out = limit_and_reallocate(&m, limit, 0.8, 1000.0, 0.0).unwrap();
            assert_eq!(out.len(), 3);
            // still re-derived geometrically over the full ranked set
            assert!((out.get("A").unwrap() - 40.98).abs() < 0.01);
        }
    }

    #[test]
    fn falls_back_to_single_instrument_at_full_weight() {
        let m = allocation(&[("A", 60.0), ("B", 40.0)]);
        // floor impossible to satisfy for two instruments
        let out = limit_and_reallocate(&m, 2, 0.8, 1000.0, 900.0).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.get("A"), Some(100.0));
    }

    #[test]
    fn ranking_tie_breaks_by_insertion_order() {
        let m = allocation(&[("B", 25.0), ("A", 25.0), ("C", 50.0)]);
        let out = limit_and_reallocate(&m, 2, 0.8, 1000.0, 0.0).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.contains("C"));
        assert!(out.contains("B")); // inserted before A, wins the tie
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let empty = AllocationBuilder::new().finalize();
        assert!(limit_and_reallocate(&empty, 3, 0.8, 1000.0, 0.0).is_err());

        let m = allocation(&[("A", 100.0)]);
        assert!(limit_and_reallocate(&m, 1, 0.8, 0.0, 0.0).is_err());
        assert!(limit_and_reallocate(&m, 1, 0.8, -50.0, 0.0).is_err());
        assert!(limit_and_reallocate(&m, 1, 0.8, 1000.0, -1.0).is_err());
    }
}
