// 📊 Reports - descriptive statistics over a filtered subset
//
// All arithmetic is integer, matching the milk-weight report screen:
//   mean    = total / count (truncating)
//   median  = middle value, or (a + b) / 2 of the two middle values
//   mode    = most frequent value, ties to the first one seen
//   std_dev = floor(sqrt(sum((w - mean)^2) / (n - 1)))
//
// Statistics are computed here, never inside the store.

use crate::entities::Entry;
use crate::error::ReportError;
use crate::query::Filter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// STATISTICS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub count: usize,
    pub total: i64,
    pub mean: i64,
    pub median: i64,
    pub mode: i32,
    /// None with fewer than two values (n - 1 would be zero)
    pub std_dev: Option<i64>,
}

impl Statistics {
    pub fn from_entries(entries: &[Entry]) -> Result<Self, ReportError> {
        let weights: Vec<i32> = entries.iter().map(|e| e.weight).collect();
        Self::from_weights(&weights)
    }

    pub fn from_weights(weights: &[i32]) -> Result<Self, ReportError> {
        if weights.is_empty() {
            return Err(ReportError::NoData);
        }

        let count = weights.len();
        let total: i64 = weights.iter().map(|&w| w as i64).sum();
        let mean = total / count as i64;

        Ok(Statistics {
            count,
            total,
            mean,
            median: median(weights),
            mode: mode(weights),
            std_dev: std_dev(weights, mean),
        })
    }
}

fn median(weights: &[i32]) -> i64 {
    let mut sorted = weights.to_vec();
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] as i64 + sorted[mid] as i64) / 2
    } else {
        sorted[mid] as i64
    }
}

fn mode(weights: &[i32]) -> i32 {
    let mut counts: HashMap<i32, usize> = HashMap::new();
    for &w in weights {
        *counts.entry(w).or_insert(0) += 1;
    }

    // Strictly greater keeps the first value seen on ties
    let mut best = weights[0];
    let mut best_count = 0;
    for &w in weights {
        let count = counts[&w];
        if count > best_count {
            best = w;
            best_count = count;
        }
    }
    best
}

fn std_dev(weights: &[i32], mean: i64) -> Option<i64> {
    if weights.len() < 2 {
        return None;
    }

    // |w - mean| can reach 2^32, so squares need 128 bits
    let sum_sq: i128 = weights
        .iter()
        .map(|&w| {
            let d = (w as i64 - mean) as i128;
            d * d
        })
        .sum();
    let variance = sum_sq / (weights.len() as i128 - 1);

    Some((variance as f64).sqrt().floor() as i64)
}

// ============================================================================
// FARM SHARES (pie / bar chart data)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmShare {
    pub farm_id: String,
    pub total: i64,
    /// Percent of the subset total; 0.0 when that total is 0
    pub percent: f64,
}

/// Per-farm totals, in order of first appearance in `entries`
pub fn farm_shares(entries: &[Entry]) -> Vec<FarmShare> {
    let mut order: Vec<&str> = Vec::new();
    let mut totals: HashMap<&str, i64> = HashMap::new();

    for entry in entries {
        let total = totals.entry(entry.farm_id.as_str()).or_insert_with(|| {
            order.push(entry.farm_id.as_str());
            0
        });
        *total += entry.weight as i64;
    }

    let grand_total: i64 = totals.values().sum();

    order
        .into_iter()
        .map(|farm_id| {
            let total = totals[farm_id];
            let percent = if grand_total == 0 {
                0.0
            } else {
                total as f64 / grand_total as f64 * 100.0
            };
            FarmShare {
                farm_id: farm_id.to_string(),
                total,
                percent,
            }
        })
        .collect()
}

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub scope: String,
    pub filter: Filter,
    pub entries: Vec<Entry>,
    /// None when the subset is empty
    pub statistics: Option<Statistics>,
    pub shares: Vec<FarmShare>,
}

impl Report {
    pub fn build(filter: &Filter, entries: Vec<Entry>) -> Self {
        let statistics = Statistics::from_entries(&entries).ok();
        let shares = farm_shares(&entries);

        Report {
            scope: filter.label(),
            filter: filter.clone(),
            entries,
            statistics,
            shares,
        }
    }

    pub fn has_data(&self) -> bool {
        self.statistics.is_some()
    }

    pub fn summary(&self) -> String {
        let mut out = format!("Report generated for: {}\n", self.scope);

        let Some(stats) = &self.statistics else {
            out.push_str(&format!("{}\n", ReportError::NoData));
            return out;
        };

        out.push_str(&format!("Entries:  {}\n", stats.count));
        out.push_str(&format!("Total:    {}\n", stats.total));
        out.push_str(&format!("Mean:     {}\n", stats.mean));
        out.push_str(&format!("Median:   {}\n", stats.median));
        out.push_str(&format!("Mode:     {}\n", stats.mode));
        match stats.std_dev {
            Some(sd) => out.push_str(&format!("Std dev:  {}\n", sd)),
            None => out.push_str("Std dev:  n/a (fewer than 2 entries)\n"),
        }

        out.push_str("\nWeight by farm:\n");
        for share in &self.shares {
            out.push_str(&format!(
                "  {:<12} {:>10}  {:>5.1}%\n",
                share.farm_id, share.total, share.percent
            ));
        }
        out
    }
}

// ============================================================================
// TESTS
// ============================================================================
