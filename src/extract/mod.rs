//! HTML extraction
//!
//! - [`article`]: title and body text of stored articles, used by the
//!   reprocess pass
//! - [`links`]: link extraction from listing pages, used by discovery

pub mod article;
pub mod links;

pub use article::{extract, Article};
pub use links::{extract_links, path_segments};
