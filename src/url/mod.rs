//! URL handling module
//!
//! This module provides URL normalization (the identity key of a stored
//! document) and the domain helpers used to scope bypass cookies.

mod domain;
mod normalize;

pub use domain::{cookie_domain, domain_matches, extract_domain};
pub use normalize::normalize_url;
