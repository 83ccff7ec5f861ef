// 🥛 Entry - one dated milk-weight observation
//
// Identity inside a farm is the date: a farm never holds two entries
// for the same day. Weight is not validated (zero and negative pass).

use crate::query::DateRange;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Single row of the milk-weight data file
///
/// Equality is by value: date, farm id and weight must all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    pub date: NaiveDate,
    pub farm_id: String,
    pub weight: i32,
}

impl Entry {
    pub fn new(date: NaiveDate, farm_id: impl Into<String>, weight: i32) -> Self {
        Entry {
            date,
            farm_id: farm_id.into(),
            weight,
        }
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    /// True when the entry falls in the given month of the given year
    pub fn in_month(&self, month: u32, year: i32) -> bool {
        self.date.year() == year && self.date.month() == month
    }

    pub fn in_range(&self, range: &DateRange) -> bool {
        range.contains(self.date)
    }

    /// Data-file row with the date written in `date_format`
    ///
    /// Readable back by a loader configured with the same format.
    pub fn to_csv_row(&self, date_format: &str) -> String {
        format!(
            "{},{},{}",
            self.date.format(date_format),
            self.farm_id,
            self.weight
        )
    }
}

/// Row in the export's own unpadded form, e.g. `2021-1-5,F1,100`
impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_csv_row("%Y-%-m-%-d"))
    }
}

// ============================================================================
// TESTS
// ============================================================================
