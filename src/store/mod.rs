//! SQLite-backed sample store.
//!
//! Holds one row per limiter run. Rows are appended, range-read by
//! observation time and purged by age; they are never updated.

mod connection;
pub mod error;
mod samples;
mod schema;

pub use error::{StoreError, StoreResult};
pub use samples::SampleStore;
