// 🐄 Farm - every entry recorded for one farm id
//
// Invariant: no two entries share a date. Adding at an occupied date
// replaces the weight instead of inserting a second entry (upsert).

use super::entry::Entry;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Farm {
    id: String,
    entries: Vec<Entry>,
}

impl Farm {
    pub fn new(id: impl Into<String>) -> Self {
        Farm {
            id: id.into(),
            entries: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Read-only view; mutation goes through the upsert/remove/edit methods
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry_at(&self, date: NaiveDate) -> Option<&Entry> {
        self.entries.iter().find(|e| e.date == date)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ========================================================================
    // AGGREGATION
    // ========================================================================

    /// Total weight for one month of one year (0 when nothing matches)
    pub fn month_total(&self, month: u32, year: i32) -> i64 {
        self.entries
            .iter()
            .filter(|e| e.in_month(month, year))
            .map(|e| e.weight as i64)
            .sum()
    }

    pub fn total(&self) -> i64 {
        self.entries.iter().map(|e| e.weight as i64).sum()
    }

    // ========================================================================
    // UPSERT / REMOVE / EDIT
    // ========================================================================

    /// Upsert an entry by date
    ///
    /// The stored entry always carries this farm's id.
    pub fn add_entry(&mut self, mut entry: Entry) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.date == entry.date) {
            existing.weight = entry.weight;
            return;
        }

        if entry.farm_id != self.id {
            entry.farm_id = self.id.clone();
        }
        self.entries.push(entry);
    }

    pub fn add(&mut self, date: NaiveDate, weight: i32) {
        let entry = Entry::new(date, self.id.clone(), weight);
        self.add_entry(entry);
    }

    /// Remove the entry equal by value (date, farm id, weight)
    pub fn remove_entry(&mut self, entry: &Entry) -> bool {
        match self.entries.iter().position(|e| e == entry) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn remove_date(&mut self, date: NaiveDate) -> bool {
        match self.entries.iter().position(|e| e.date == date) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Overwrite the weight recorded at `date`; no-op if there is none
    pub fn edit_entry(&mut self, date: NaiveDate, weight: i32) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.date == date) {
            existing.weight = weight;
        }
    }

    /// Move the entry at `old` to `new`, upserting into `new` if occupied
    pub fn redate(&mut self, old: NaiveDate, new: NaiveDate) -> bool {
        if old == new {
            return self.entry_at(old).is_some();
        }

        let Some(index) = self.entries.iter().position(|e| e.date == old) else {
            return false;
        };

        let mut moved = self.entries.remove(index);
        moved.date = new;
        self.add_entry(moved);
        true
    }
}

// ============================================================================
// TESTS
// ============================================================================
