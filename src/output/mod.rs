//! Output module for reporting on the crawl store
//!
//! This module handles reading monitoring counters out of the store and
//! printing them for operators.

pub mod stats;

pub use stats::{load_statistics, print_statistics, StoreStatistics};
