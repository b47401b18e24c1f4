//! Display formatting for terminal output
//!
//! Table and detail views over audit records.

pub mod record;

pub use record::{format_record_details, format_record_list};
