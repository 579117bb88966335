//! Output module for reporting crawl progress
//!
//! This module handles:
//! - Counting recorded URLs by state
//! - Printing progress statistics

pub mod stats;

pub use stats::{
    format_statistics, load_statistics, print_statistics, read_statistics, ProgressStatistics,
};
