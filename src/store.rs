// 🗄️ Farm Store - in-memory database of every farm, keyed by farm id
//
// The store is the only owner of Farm and Entry values. Callers get
// read-only views or owned snapshots, never a mutable collection.
//
// Empty farms are kept after their last entry goes away; call
// `prune_empty_farms` to drop them.

use crate::entities::{Entry, Farm};
use crate::error::DataLoadError;
use crate::loader::{read_entries, LoaderConfig};
use crate::query::{DateRange, Filter};
use chrono::{Datelike, NaiveDate};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

/// Outcome of one load call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    /// Data rows applied (upserts included)
    pub rows: usize,
    /// Farms that did not exist before this load
    pub new_farms: usize,
}

// ============================================================================
// FARM STORE
// ============================================================================

#[derive(Debug, Default)]
pub struct FarmStore {
    farms: HashMap<String, Farm>,
    config: LoaderConfig,
}

impl FarmStore {
    pub fn new() -> Self {
        FarmStore::default()
    }

    pub fn with_config(config: LoaderConfig) -> Self {
        FarmStore {
            farms: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    // ========================================================================
    // LOADING
    // ========================================================================

    /// Load a CSV file, merging its rows into the current state
    pub fn load_data(&mut self, path: &Path) -> Result<LoadSummary, DataLoadError> {
        let file = File::open(path).map_err(|source| DataLoadError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;

        let summary = self.load_from_reader(BufReader::new(file))?;
        info!(
            "Loaded {} rows from {} ({} new farms)",
            summary.rows,
            path.display(),
            summary.new_farms
        );
        Ok(summary)
    }

    /// Rows before a failing line stay applied; the load is not rolled back
    pub fn load_from_reader<R: Read>(&mut self, reader: R) -> Result<LoadSummary, DataLoadError> {
        let farms_before = self.farms.len();
        let config = self.config.clone();

        let rows = read_entries(reader, &config, |entry| self.add_entry(entry))?;

        Ok(LoadSummary {
            rows,
            new_farms: self.farms.len() - farms_before,
        })
    }

    // ========================================================================
    // LOOKUP
    // ========================================================================

    pub fn farms(&self) -> &HashMap<String, Farm> {
        &self.farms
    }

    pub fn farm(&self, farm_id: &str) -> Option<&Farm> {
        self.farms.get(farm_id)
    }

    /// All farm ids, sorted
    pub fn farm_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.farms.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn farm_count(&self) -> usize {
        self.farms.len()
    }

    pub fn entry_count(&self) -> usize {
        self.farms.values().map(Farm::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }

    // ========================================================================
    // INSERT / REMOVE
    // ========================================================================

    fn farm_mut_or_create(&mut self, farm_id: &str) -> &mut Farm {
        self.farms
            .entry(farm_id.to_string())
            .or_insert_with(|| Farm::new(farm_id))
    }

    /// Upsert into the entry's farm, creating the farm on first reference
    pub fn add_entry(&mut self, entry: Entry) {
        let farm_id = entry.farm_id.clone();
        self.farm_mut_or_create(&farm_id).add_entry(entry);
    }

    pub fn add(&mut self, date: NaiveDate, farm_id: &str, weight: i32) {
        self.farm_mut_or_create(farm_id).add(date, weight);
    }

    /// False when the farm is unknown or holds no equal entry
    pub fn remove_entry(&mut self, entry: &Entry) -> bool {
        match self.farms.get_mut(&entry.farm_id) {
            Some(farm) => farm.remove_entry(entry),
            None => false,
        }
    }

    pub fn remove(&mut self, date: NaiveDate, farm_id: &str) -> bool {
        match self.farms.get_mut(farm_id) {
            Some(farm) => farm.remove_date(date),
            None => false,
        }
    }

    /// Drop farms with no entries; returns how many were removed
    pub fn prune_empty_farms(&mut self) -> usize {
        let before = self.farms.len();
        self.farms.retain(|_, farm| !farm.is_empty());
        before - self.farms.len()
    }

    // ========================================================================
    // EDIT
    // ========================================================================

    /// Replace `entry` with a fresh entry built from all-new values
    ///
    /// Remove + upsert, no identity kept. False only when the entry's
    /// current farm is unknown (nothing is changed then).
    pub fn edit_entry(
        &mut self,
        entry: &Entry,
        new_date: NaiveDate,
        new_farm_id: &str,
        new_weight: i32,
    ) -> bool {
        let Some(farm) = self.farms.get_mut(&entry.farm_id) else {
            warn!("Edit ignored: unknown farm '{}'", entry.farm_id);
            return false;
        };

        farm.remove_entry(entry);
        self.add(new_date, new_farm_id, new_weight);
        true
    }

    /// Change the date of `entry` within its farm
    pub fn edit_date(&mut self, entry: &Entry, new_date: NaiveDate) -> bool {
        match self.farms.get_mut(&entry.farm_id) {
            Some(farm) => farm.redate(entry.date, new_date),
            None => {
                warn!("Edit ignored: unknown farm '{}'", entry.farm_id);
                false
            }
        }
    }

    /// Change the weight of `entry` within its farm
    pub fn edit_weight(&mut self, entry: &Entry, new_weight: i32) -> bool {
        match self.farms.get_mut(&entry.farm_id) {
            Some(farm) => {
                farm.edit_entry(entry.date, new_weight);
                true
            }
            None => {
                warn!("Edit ignored: unknown farm '{}'", entry.farm_id);
                false
            }
        }
    }

    /// Re-key `entry` to another farm
    ///
    /// Removed from the old farm, farm id rewritten, upserted into the new
    /// farm (created if needed). Returns false and changes nothing when the
    /// old farm is unknown or does not hold the entry.
    pub fn move_entry(&mut self, entry: &Entry, new_farm_id: &str) -> bool {
        let removed = match self.farms.get_mut(&entry.farm_id) {
            Some(farm) => farm.remove_entry(entry),
            None => {
                warn!("Move ignored: unknown farm '{}'", entry.farm_id);
                return false;
            }
        };
        if !removed {
            return false;
        }

        let mut moved = entry.clone();
        moved.farm_id = new_farm_id.to_string();
        self.add_entry(moved);
        true
    }

    // ========================================================================
    // QUERIES (owned, sorted snapshots)
    // ========================================================================

    /// Entries matching `filter`, sorted by date, farm id, weight
    pub fn query(&self, filter: &Filter) -> Vec<Entry> {
        let mut entries: Vec<Entry> = match filter {
            Filter::Farm(id) => self
                .farms
                .get(id)
                .map(|farm| farm.entries().to_vec())
                .unwrap_or_default(),
            _ => self
                .farms
                .values()
                .flat_map(Farm::entries)
                .filter(|e| filter.matches(e))
                .cloned()
                .collect(),
        };

        entries.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.farm_id.cmp(&b.farm_id))
                .then_with(|| a.weight.cmp(&b.weight))
        });
        entries
    }

    pub fn all_entries(&self) -> Vec<Entry> {
        self.query(&Filter::All)
    }

    pub fn entries_for_farm(&self, farm_id: &str) -> Vec<Entry> {
        self.query(&Filter::Farm(farm_id.to_string()))
    }

    pub fn entries_for_year(&self, year: i32) -> Vec<Entry> {
        self.query(&Filter::Year(year))
    }

    pub fn entries_for_month(&self, month: u32, year: i32) -> Vec<Entry> {
        self.query(&Filter::Month { year, month })
    }

    /// Inclusive on both ends; bounds may come in either order
    pub fn entries_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<Entry> {
        self.query(&Filter::Range(DateRange::new(start, end)))
    }

    /// Distinct years present in the data, sorted
    pub fn years(&self) -> Vec<i32> {
        self.farms
            .values()
            .flat_map(Farm::entries)
            .map(|e| e.date.year())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct months (1-12) with data in `year`, sorted
    pub fn months(&self, year: i32) -> Vec<u32> {
        self.farms
            .values()
            .flat_map(Farm::entries)
            .filter(|e| e.date.year() == year)
            .map(|e| e.date.month())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

// ============================================================================
// SHARED STORE
// ============================================================================

/// Thread-safe handle: every call runs under a single lock acquisition
#[derive(Debug, Clone, Default)]
pub struct SharedFarmStore {
    inner: Arc<RwLock<FarmStore>>,
}

impl SharedFarmStore {
    pub fn new(store: FarmStore) -> Self {
        SharedFarmStore {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Run `f` with shared access
    pub fn read<T>(&self, f: impl FnOnce(&FarmStore) -> T) -> T {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Run `f` with exclusive access
    pub fn write<T>(&self, f: impl FnOnce(&mut FarmStore) -> T) -> T {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn load_data(&self, path: &Path) -> Result<LoadSummary, DataLoadError> {
        self.write(|store| store.load_data(path))
    }

    pub fn add(&self, date: NaiveDate, farm_id: &str, weight: i32) {
        self.write(|store| store.add(date, farm_id, weight))
    }

    pub fn add_entry(&self, entry: Entry) {
        self.write(|store| store.add_entry(entry))
    }

    pub fn remove(&self, date: NaiveDate, farm_id: &str) -> bool {
        self.write(|store| store.remove(date, farm_id))
    }

    pub fn remove_entry(&self, entry: &Entry) -> bool {
        self.write(|store| store.remove_entry(entry))
    }

    pub fn edit_entry(
        &self,
        entry: &Entry,
        new_date: NaiveDate,
        new_farm_id: &str,
        new_weight: i32,
    ) -> bool {
        self.write(|store| store.edit_entry(entry, new_date, new_farm_id, new_weight))
    }

    pub fn edit_date(&self, entry: &Entry, new_date: NaiveDate) -> bool {
        self.write(|store| store.edit_date(entry, new_date))
    }

    pub fn edit_weight(&self, entry: &Entry, new_weight: i32) -> bool {
        self.write(|store| store.edit_weight(entry, new_weight))
    }

    pub fn move_entry(&self, entry: &Entry, new_farm_id: &str) -> bool {
        self.write(|store| store.move_entry(entry, new_farm_id))
    }

    pub fn query(&self, filter: &Filter) -> Vec<Entry> {
        self.read(|store| store.query(filter))
    }

    pub fn farm_ids(&self) -> Vec<String> {
        self.read(FarmStore::farm_ids)
    }

    /// Owned copy of one farm
    pub fn farm(&self, farm_id: &str) -> Option<Farm> {
        self.read(|store| store.farm(farm_id).cloned())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::thread;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const SAMPLE: &str = "date,farm,weight\n2021-1-5,F1,100\n2021-1-6,F1,200\n2021-2-1,F2,50\n";

    fn sample_store() -> FarmStore {
        let mut store = FarmStore::new();
        store.load_from_reader(SAMPLE.as_bytes()).unwrap();
        store
    }

    #[test]
    fn test_load_sample() {
        let mut store = FarmStore::new();
        let summary = store.load_from_reader(SAMPLE.as_bytes()).unwrap();

        assert_eq!(summary, LoadSummary { rows: 3, new_farms: 2 });
        assert_eq!(store.farms().len(), 2);

        let f1 = store.farm("F1").unwrap();
        assert_eq!(f1.len(), 2);
        assert_eq!(f1.month_total(1, 2021), 300);

        let f2 = store.farm("F2").unwrap();
        assert_eq!(f2.len(), 1);
        assert_eq!(f2.month_total(2, 2021), 50);
        assert_eq!(f2.month_total(1, 2021), 0);
    }

    #[test]
    fn test_load_data_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}\n\n", SAMPLE).unwrap();

        let mut store = FarmStore::new();
        let summary = store.load_data(file.path()).unwrap();

        assert_eq!(summary.rows, 3);
        assert_eq!(store.entry_count(), 3);
    }

    #[test]
    fn test_load_with_blank_first_line() {
        let mut store = FarmStore::new();
        let summary = store
            .load_from_reader("\n2021-1-5,F1,100\n2021-1-6,F1,200\n".as_bytes())
            .unwrap();

        assert_eq!(summary, LoadSummary { rows: 2, new_farms: 1 });
        assert_eq!(store.farm("F1").unwrap().total(), 300);
    }

    #[test]
    fn test_undecodable_row_keeps_earlier_rows() {
        let mut store = FarmStore::new();
        let input: &[u8] = b"date,farm,weight\n2021-1-5,F1,100\n2021-1-6,F\xff1,200\n";

        let err = store.load_from_reader(input).unwrap_err();

        assert!(matches!(err, DataLoadError::Read { line: 3, .. }));
        assert!(!err.is_parse_error());
        assert_eq!(store.entry_count(), 1);
    }

    #[test]
    fn test_shared_load_data() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", SAMPLE).unwrap();
        let shared = SharedFarmStore::default();

        let summary = shared.load_data(file.path()).unwrap();

        assert_eq!(summary, LoadSummary { rows: 3, new_farms: 2 });
        assert_eq!(shared.farm_ids(), vec!["F1".to_string(), "F2".to_string()]);
        assert_eq!(shared.query(&Filter::Month { year: 2021, month: 1 }).len(), 2);

        let missing = file.path().with_extension("gone");
        let err = shared.load_data(&missing).unwrap_err();
        assert!(matches!(err, DataLoadError::FileAccess { .. }));
        assert_eq!(shared.read(FarmStore::entry_count), 3);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.csv");

        let mut store = FarmStore::new();
        let err = store.load_data(&path).unwrap_err();

        assert!(matches!(err, DataLoadError::FileAccess { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn test_failed_load_keeps_earlier_rows() {
        let mut store = FarmStore::new();
        let input = "date,farm,weight\n2021-1-5,F1,100\n2021-1-6,F1,lots\n2021-1-7,F1,300\n";

        let err = store.load_from_reader(input.as_bytes()).unwrap_err();

        assert!(err.is_parse_error());
        assert_eq!(store.entry_count(), 1);
        assert_eq!(store.farm("F1").unwrap().entries()[0].weight, 100);
    }

    #[test]
    fn test_second_load_merges_with_upsert() {
        let mut store = sample_store();
        let update = "date,farm,weight\n2021-1-5,F1,111\n2021-3-1,F3,7\n";

        let summary = store.load_from_reader(update.as_bytes()).unwrap();

        assert_eq!(summary.new_farms, 1);
        assert_eq!(store.entry_count(), 4);
        assert_eq!(store.farm("F1").unwrap().month_total(1, 2021), 311);
    }

    #[test]
    fn test_readd_same_date_replaces_weight() {
        let mut store = FarmStore::new();

        store.add(date(2021, 1, 5), "F1", 100);
        store.add(date(2021, 1, 5), "F1", 250);
        store.add_entry(Entry::new(date(2021, 1, 5), "F1", 400));

        let farm = store.farm("F1").unwrap();
        assert_eq!(farm.len(), 1);
        assert_eq!(farm.entries()[0].weight, 400);
    }

    #[test]
    fn test_remove_unknown_farm_mutates_nothing() {
        let mut store = sample_store();

        assert!(!store.remove(date(2021, 1, 5), "F9"));
        assert_eq!(store.entry_count(), 3);
        assert_eq!(store.farm_count(), 2);
    }

    #[test]
    fn test_remove_known_farm_missing_date() {
        let mut store = sample_store();

        assert!(!store.remove(date(2021, 1, 7), "F1"));
        assert!(store.remove(date(2021, 1, 5), "F1"));
        assert_eq!(store.farm("F1").unwrap().len(), 1);
    }

    #[test]
    fn test_remove_entry_uses_value_equality() {
        let mut store = sample_store();

        let stale = Entry::new(date(2021, 1, 5), "F1", 999);
        assert!(!store.remove_entry(&stale), "different weight is a different entry");

        let exact = Entry::new(date(2021, 1, 5), "F1", 100);
        assert!(store.remove_entry(&exact));
        assert_eq!(store.entry_count(), 2);
    }

    #[test]
    fn test_empty_farm_persists_until_pruned() {
        let mut store = sample_store();

        assert!(store.remove(date(2021, 2, 1), "F2"));
        assert!(store.farm("F2").is_some());
        assert!(store.farm("F2").unwrap().is_empty());
        assert_eq!(store.farm_ids(), vec!["F1", "F2"]);

        assert_eq!(store.prune_empty_farms(), 1);
        assert!(store.farm("F2").is_none());
        assert_eq!(store.prune_empty_farms(), 0);
    }

    #[test]
    fn test_move_entry_rekeys_farm() {
        let mut store = sample_store();
        let entry = store.farm("F1").unwrap().entry_at(date(2021, 1, 5)).unwrap().clone();

        assert!(store.move_entry(&entry, "F3"));

        assert!(!store.farm("F1").unwrap().entries().contains(&entry));
        let f3 = store.farm("F3").unwrap();
        assert_eq!(f3.len(), 1);
        assert_eq!(f3.entries()[0].farm_id, "F3");
        assert_eq!(f3.entries()[0].date, entry.date);
        assert_eq!(f3.entries()[0].weight, entry.weight);
    }

    #[test]
    fn test_move_entry_onto_occupied_date_upserts() {
        let mut store = sample_store();
        store.add(date(2021, 1, 5), "F2", 1);
        let entry = Entry::new(date(2021, 1, 5), "F1", 100);

        assert!(store.move_entry(&entry, "F2"));

        let f2 = store.farm("F2").unwrap();
        assert_eq!(f2.len(), 2);
        assert_eq!(f2.entry_at(date(2021, 1, 5)).unwrap().weight, 100);
    }

    #[test]
    fn test_move_entry_unknown_or_absent() {
        let mut store = sample_store();

        let ghost_farm = Entry::new(date(2021, 1, 5), "F9", 100);
        assert!(!store.move_entry(&ghost_farm, "F1"));

        let ghost_entry = Entry::new(date(2021, 1, 9), "F1", 100);
        assert!(!store.move_entry(&ghost_entry, "F2"));
        assert_eq!(store.entry_count(), 3);
        assert!(store.farm("F9").is_none());
    }

    #[test]
    fn test_edit_entry_replaces_all_fields() {
        let mut store = sample_store();
        let entry = Entry::new(date(2021, 1, 6), "F1", 200);

        assert!(store.edit_entry(&entry, date(2021, 4, 1), "F4", 75));

        assert!(store.farm("F1").unwrap().entry_at(date(2021, 1, 6)).is_none());
        let f4 = store.farm("F4").unwrap();
        assert_eq!(f4.entries(), &[Entry::new(date(2021, 4, 1), "F4", 75)]);
    }

    #[test]
    fn test_edit_entry_unknown_farm() {
        let mut store = sample_store();
        let entry = Entry::new(date(2021, 1, 6), "F9", 200);

        assert!(!store.edit_entry(&entry, date(2021, 4, 1), "F4", 75));
        assert!(store.farm("F4").is_none());
        assert_eq!(store.entry_count(), 3);
    }

    #[test]
    fn test_edit_weight_and_date() {
        let mut store = sample_store();
        let entry = Entry::new(date(2021, 1, 6), "F1", 200);

        assert!(store.edit_weight(&entry, 210));
        assert_eq!(store.farm("F1").unwrap().month_total(1, 2021), 310);

        let edited = Entry::new(date(2021, 1, 6), "F1", 210);
        assert!(store.edit_date(&edited, date(2021, 2, 6)));
        let f1 = store.farm("F1").unwrap();
        assert_eq!(f1.month_total(1, 2021), 100);
        assert_eq!(f1.month_total(2, 2021), 210);

        let unknown = Entry::new(date(2021, 1, 6), "F9", 1);
        assert!(!store.edit_weight(&unknown, 5));
        assert!(!store.edit_date(&unknown, date(2021, 1, 7)));
    }

    #[test]
    fn test_queries_are_sorted_snapshots() {
        let mut store = sample_store();
        store.add(date(2020, 12, 31), "F2", 9);
        store.add(date(2021, 1, 5), "F0", 1);

        let all = store.all_entries();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].date, date(2020, 12, 31));
        assert_eq!(all[1].farm_id, "F0", "same date sorts by farm id");
        assert_eq!(all[2].farm_id, "F1");

        assert_eq!(store.entries_for_year(2021).len(), 4);
        assert_eq!(store.entries_for_month(1, 2021).len(), 3);
        assert_eq!(store.entries_for_farm("F2").len(), 2);
        assert!(store.entries_for_farm("F9").is_empty());
    }

    #[test]
    fn test_range_query_is_inclusive() {
        let store = sample_store();

        let range = store.entries_in_range(date(2021, 1, 6), date(2021, 2, 1));
        assert_eq!(range.len(), 2);

        let reversed = store.entries_in_range(date(2021, 2, 1), date(2021, 1, 6));
        assert_eq!(range, reversed);
    }

    #[test]
    fn test_years_and_months() {
        let mut store = sample_store();
        store.add(date(2019, 7, 1), "F1", 1);

        assert_eq!(store.years(), vec![2019, 2021]);
        assert_eq!(store.months(2021), vec![1, 2]);
        assert!(store.months(2018).is_empty());
    }

    #[test]
    fn test_shared_store_across_threads() {
        let shared = SharedFarmStore::new(FarmStore::new());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = shared.clone();
                thread::spawn(move || {
                    for day in 1..=10 {
                        store.add(date(2021, 1, day), &format!("F{}", i), day as i32);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.farm_ids().len(), 4);
        assert_eq!(shared.read(FarmStore::entry_count), 40);
        assert_eq!(shared.farm("F0").unwrap().total(), 55);

        let entry = Entry::new(date(2021, 1, 1), "F0", 1);
        assert!(shared.move_entry(&entry, "F1"));
        assert_eq!(shared.farm("F0").unwrap().len(), 9);
        assert_eq!(shared.query(&Filter::Farm("F1".into())).len(), 10);
    }
}
