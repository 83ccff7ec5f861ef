// Milk Weights - Core Library
// In-memory farm/entry store, CSV ingestion and report statistics.
// The CLI in main.rs is a thin consumer of these modules.

pub mod entities;
pub mod error;
pub mod loader;
pub mod query;
pub mod report;
pub mod store;

// Re-export commonly used types
pub use entities::{Entry, Farm};
pub use error::{DataLoadError, ParseErrorKind, ReportError};
pub use loader::{parse_record, read_entries, LoaderConfig, DEFAULT_DATE_FORMAT};
pub use query::{month_name, parse_month, DateRange, Filter, MONTH_NAMES};
pub use report::{farm_shares, FarmShare, Report, Statistics};
pub use store::{FarmStore, LoadSummary, SharedFarmStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
