// Entity Models
//
// Entry is a plain value; Farm owns the entries for one farm id
// and enforces one entry per date.

pub mod entry;
pub mod farm;

pub use entry::Entry;
pub use farm::Farm;
