// 📂 CSV Loader - milk-weight rows → entries
//
// Format: one header line (skipped, never validated), then
//   date,farm,weight
// e.g. 2019-1-1,Farm 0,6760
//
// No quoting: a comma always ends a field. Blank lines are skipped.
// Fields are taken raw unless `LoaderConfig::trim` is set.

use crate::entities::Entry;
use crate::error::{DataLoadError, ParseErrorKind};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Read};

/// Date format used by the milk-weight export (month/day not zero-padded)
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// chrono format string for the date column
    pub date_format: String,

    /// Field separator (single byte)
    pub delimiter: u8,

    /// Strip surrounding whitespace from every field (off: fields are raw)
    pub trim: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            delimiter: b',',
            trim: false,
        }
    }
}

impl LoaderConfig {
    pub fn with_date_format(mut self, date_format: impl Into<String>) -> Self {
        self.date_format = date_format.into();
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }
}

// ============================================================================
// ROW PARSING
// ============================================================================

/// Parse one data row; fields past the third are ignored
pub fn parse_record(
    record: &StringRecord,
    config: &LoaderConfig,
) -> Result<Entry, ParseErrorKind> {
    if record.len() < 3 {
        return Err(ParseErrorKind::MissingFields {
            found: record.len(),
        });
    }

    let date_field = &record[0];
    let farm_id = &record[1];
    let weight_field = &record[2];

    if farm_id.is_empty() {
        return Err(ParseErrorKind::MissingFarmId);
    }

    let date = NaiveDate::parse_from_str(date_field, &config.date_format).map_err(|_| {
        ParseErrorKind::InvalidDate {
            value: date_field.to_string(),
        }
    })?;

    let weight = weight_field
        .parse::<i32>()
        .map_err(|_| ParseErrorKind::InvalidWeight {
            value: weight_field.to_string(),
        })?;

    Ok(Entry::new(date, farm_id, weight))
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

/// Stream rows from `reader`, handing each parsed entry to `apply`
///
/// The first physical line is the header and is dropped whatever it
/// holds, blank included. Stops at the first bad row. Entries already
/// handed to `apply` are not taken back. Returns the number of rows applied.
pub fn read_entries<R, F>(
    reader: R,
    config: &LoaderConfig,
    mut apply: F,
) -> Result<usize, DataLoadError>
where
    R: Read,
    F: FnMut(Entry),
{
    let mut reader = BufReader::new(reader);
    let mut header = Vec::new();
    reader
        .read_until(b'\n', &mut header)
        .map_err(|e| DataLoadError::Read {
            line: 1,
            source: csv::Error::from(e),
        })?;

    // csv counts lines from 1 after the header; shift to file lines
    let file_line = |line: u64| line + 1;

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .delimiter(config.delimiter)
        .trim(if config.trim { Trim::All } else { Trim::None })
        .from_reader(reader);

    let mut applied = 0;

    for result in rdr.records() {
        let record = result.map_err(|source| DataLoadError::Read {
            line: file_line(source.position().map(|p| p.line()).unwrap_or(0)),
            source,
        })?;
        let line = file_line(record.position().map(|p| p.line()).unwrap_or(0));

        if is_blank(&record) {
            warn!("Skipping blank line {}", line);
            continue;
        }

        let entry =
            parse_record(&record, config).map_err(|kind| DataLoadError::Parse { line, kind })?;
        debug!("Line {}: {}", line, entry);

        apply(entry);
        applied += 1;
    }

    Ok(applied)
}

// ============================================================================
// TESTS
// ============================================================================
