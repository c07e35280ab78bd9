//! # History
//!
//! Historical range queries over the persisted record log.
//!
//! ```ignore
//! use history::{LogReader, RangeQuery};
//!
//! let reader = LogReader::new("data/telemetry.log");
//! for record in reader.query(RangeQuery::new(start_ms, end_ms))? {
//!     println!("{} {}", record.timestamp(), record.value());
//! }
//! ```

mod error;
mod range;
mod reader;

pub use error::{HistoryError, Result};
pub use range::{parse_bound, parse_window, RangeQuery};
pub use reader::{LogReader, RecordScan, ScanStats};
