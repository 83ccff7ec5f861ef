// 🔎 Query Filters - select the subset a report is computed over
//
// A report is scoped to one farm, one year, one month of a year,
// or an inclusive date range. `Filter::All` covers the whole store.

use crate::entities::Entry;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// English name for a month number (1-12)
pub fn month_name(month: u32) -> Option<&'static str> {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(i as usize))
        .copied()
}

/// Parse a month given as a number ("3"), full name ("March") or prefix ("mar")
pub fn parse_month(input: &str) -> Option<u32> {
    let trimmed = input.trim();

    if let Ok(n) = trimmed.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }

    let lower = trimmed.to_lowercase();
    if lower.len() < 3 {
        return None;
    }

    MONTH_NAMES
        .iter()
        .position(|name| name.to_lowercase().starts_with(&lower))
        .map(|i| i as u32 + 1)
}

// ============================================================================
// DATE RANGE
// ============================================================================

/// Closed date interval, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Bounds may be given in either order
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// First to last day of the month; None for an invalid year/month
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }?;

        Some(Self {
            start,
            end: next.pred_opt()?,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

// ============================================================================
// FILTER
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Filter {
    #[default]
    All,
    Farm(String),
    Year(i32),
    Month { year: i32, month: u32 },
    Range(DateRange),
}

impl Filter {
    pub fn matches(&self, entry: &Entry) -> bool {
        match self {
            Filter::All => true,
            Filter::Farm(id) => entry.farm_id == *id,
            Filter::Year(year) => entry.date.year() == *year,
            // An out-of-range month matches nothing
            Filter::Month { year, month } => {
                DateRange::month(*year, *month).is_some_and(|range| entry.in_range(&range))
            }
            Filter::Range(range) => entry.in_range(range),
        }
    }

    /// Human-readable scope, used as the report title
    pub fn label(&self) -> String {
        match self {
            Filter::All => "All farms".to_string(),
            Filter::Farm(id) => id.clone(),
            Filter::Year(year) => year.to_string(),
            Filter::Month { year, month } => match month_name(*month) {
                Some(name) => format!("{} {}", name, year),
                None => format!("{}-{}", year, month),
            },
            Filter::Range(range) => format!(
                "{} to {}",
                range.start.format("%Y-%-m-%-d"),
                range.end.format("%Y-%-m-%-d")
            ),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
