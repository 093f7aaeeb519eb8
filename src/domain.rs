// ===============================
// src/domain.rs
// ===============================
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// One configured instrument category (e.g. ETF, STRONG_BUY).
///
/// `ordered = true` weights instruments by geometric decay on list
/// position; `false` splits the category percentage equally.
#[derive(Debug, Clone)]
pub struct Category {
    pub id: String,
    pub symbols: Vec<String>,
    pub target_percentage: f64,
    pub ordered: bool,
}

/// Immutable symbol -> value map that remembers insertion order.
///
/// The value is a percentage for target allocations and a dollar amount
/// for investment plans; both stages share the same shape. Insertion
/// order is what makes descending sorts stable across runs, so the map
/// is only constructed through [`AllocationBuilder`].
#[derive(Debug, Clone, Default)]
pub struct AllocationMap {
    entries: Vec<(String, f64)>,
    index: AHashMap<String, usize>,
}

impl AllocationMap {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.index.get(symbol).map(|&i| self.entries[i].1)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.index.contains_key(symbol)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(s, v)| (s.as_str(), *v))
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v).sum()
    }

    /// Entries sorted by value descending; ties keep insertion order
    /// (stable sort), which is the tie-break the limiter relies on.
    pub fn sorted_desc(&self) -> Vec<(String, f64)> {
        let mut out = self.entries.clone();
        out.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        out
    }
}

/// Accumulating builder for [`AllocationMap`].
///
/// `add` sums contributions for repeated symbols (an instrument listed in
/// two categories accumulates both), `finalize` freezes the result.
#[derive(Debug, Default)]
pub struct AllocationBuilder {
    map: AllocationMap,
}

impl AllocationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, symbol: &str, value: f64) {
        match self.map.index.get(symbol) {
            Some(&i) => self.map.entries[i].1 += value,
            None => {
                self.map
                    .index
                    .insert(symbol.to_string(), self.map.entries.len());
                self.map.entries.push((symbol.to_string(), value));
            }
        }
    }

    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.map.get(symbol)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.map.total()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.map.iter()
    }

    pub fn finalize(self) -> AllocationMap {
        self.map
    }
}

/// Category-ordered symbol sequence used to sequence (never weight)
/// new-cash deployment. First occurrence wins when a symbol repeats
/// across categories.
#[derive(Debug, Clone, Default)]
pub struct PriorityList {
    symbols: Vec<String>,
    rank: AHashMap<String, usize>,
    category_of: AHashMap<String, usize>,
    category_ids: Vec<String>,
}

impl PriorityList {
    pub fn from_categories(categories: &[Category]) -> Self {
        let mut out = PriorityList::default();
        for (ci, cat) in categories.iter().enumerate() {
            out.category_ids.push(cat.id.clone());
            for sym in &cat.symbols {
                if !out.rank.contains_key(sym) {
                    out.rank.insert(sym.clone(), out.symbols.len());
                    out.category_of.insert(sym.clone(), ci);
                    out.symbols.push(sym.clone());
                }
            }
        }
        out
    }

    /// Position in the priority sequence; unranked symbols sort after
    /// every ranked one.
    pub fn rank(&self, symbol: &str) -> usize {
        self.rank.get(symbol).copied().unwrap_or(usize::MAX)
    }

    /// Index of the category a symbol was first listed in.
    pub fn category_index(&self, symbol: &str) -> Option<usize> {
        self.category_of.get(symbol).copied()
    }

    pub fn category_count(&self) -> usize {
        self.category_ids.len()
    }

    pub fn category_id(&self, index: usize) -> &str {
        &self.category_ids[index]
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }
}

/// One held position as reported by the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub price: f64,
    pub equity: f64,
}

/// Everything the planner needs from the outside world, fetched once per
/// run before any core function executes. `prices` covers every targeted
/// symbol (held or not); `positions` only what is actually held.
#[derive(Debug, Clone, Default)]
pub struct PortfolioSnapshot {
    pub positions: AHashMap<String, Position>,
    pub prices: AHashMap<String, f64>,
}

/// Per-instrument distance from target.
///
/// `difference` is target dollars minus current equity (the full target
/// when unheld).
#[derive(Debug, Clone, Copy)]
pub struct ComparisonEntry {
    pub difference: f64,
    pub price: f64,
    pub equity: f64,
    pub owned: bool,
}

/// Insertion-ordered comparison map (target-allocation order).
#[derive(Debug, Clone, Default)]
pub struct Comparison {
    entries: Vec<(String, ComparisonEntry)>,
    index: AHashMap<String, usize>,
}

impl Comparison {
    pub fn insert(&mut self, symbol: &str, entry: ComparisonEntry) {
        match self.index.get(symbol) {
            Some(&i) => self.entries[i].1 = entry,
            None => {
                self.index.insert(symbol.to_string(), self.entries.len());
                self.entries.push((symbol.to_string(), entry));
            }
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&ComparisonEntry> {
        self.index.get(symbol).map(|&i| &self.entries[i].1)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ComparisonEntry)> {
        self.entries.iter().map(|(s, e)| (s.as_str(), e))
    }

    /// Cheapest per-unit price across all instruments, if any.
    pub fn min_price(&self) -> Option<f64> {
        self.entries
            .iter()
            .map(|(_, e)| e.price)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }
}

/// Result of one planning run: dollars to deploy per instrument plus the
/// cash that could not be spent (always below the cheapest price, or the
/// whole amount when nothing was purchasable).
#[derive(Debug, Clone)]
pub struct InvestmentPlan {
    pub allocations: AllocationMap,
    pub leftover: f64,
}

impl InvestmentPlan {
    pub fn total_allocated(&self) -> f64 {
        self.allocations.total()
    }
}
