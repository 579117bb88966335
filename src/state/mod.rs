//! State module for tracking crawl progress
//!
//! - `PageState`: the recorded status of one page URL (queued, completed, failed)

mod page_state;

pub use page_state::PageState;
