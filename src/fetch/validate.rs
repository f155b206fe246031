//! Anti-bot and emptiness checks applied after a fetch
//!
//! These checks are deliberately separate from fetching: a page that fails
//! them was served, just not the page we wanted, so callers log and skip it
//! instead of retrying.

use crate::fetch::FetchFailureKind;
use thiserror::Error;

/// Substrings that identify an interstitial challenge page
///
/// The HTTP strategy only refreshes its bypass cookie when none of these are
/// present; the browser strategy waits longer when one is.
pub const CHALLENGE_MARKERS: &[&str] = &["challenge-form", "Cloudflare", "cf-browser-verification"];

/// Substrings that mark a page as blocked rather than real content
pub const BLOCK_MARKERS: &[&str] = &[
    "Verify you are human",
    "Checking your browser",
    "Enable JavaScript",
    "Access denied",
];

/// Shortest article body accepted as real content
pub const MIN_BODY_CHARS: usize = 15;

/// Reasons a served page is not accepted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("blocked page marker detected: {marker}")]
    Blocked { marker: &'static str },

    #[error("empty markup")]
    Empty,

    #[error("empty title")]
    EmptyTitle,

    #[error("content too short ({chars} chars)")]
    TooShort { chars: usize },
}

impl ValidationError {
    /// True when the site refused to serve the page (as opposed to serving nothing)
    pub fn is_blocked(&self) -> bool {
        self.kind() == FetchFailureKind::Blocked
    }

    /// Rejected pages are never retried; blocked ones are kept aside
    pub fn kind(&self) -> FetchFailureKind {
        match self {
            Self::Blocked { .. } => FetchFailureKind::Blocked,
            _ => FetchFailureKind::Fatal,
        }
    }
}

/// Returns true when the markup looks like a challenge interstitial
pub fn has_challenge_marker(markup: &str) -> bool {
    CHALLENGE_MARKERS.iter().any(|m| markup.contains(m))
}

/// Returns the first block marker found in `content`
pub fn find_block_marker(content: &str) -> Option<&'static str> {
    BLOCK_MARKERS.iter().copied().find(|m| content.contains(m))
}

/// Validates raw markup before it is persisted
pub fn validate_markup(markup: &str) -> Result<(), ValidationError> {
    if let Some(marker) = find_block_marker(markup) {
        return Err(ValidationError::Blocked { marker });
    }
    if markup.trim().is_empty() {
        return Err(ValidationError::Empty);
    }
    Ok(())
}

/// Validates an extracted article
pub fn validate_article(title: &str, body: &str) -> Result<(), ValidationError> {
    let title = title.trim();
    let body = body.trim();

    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }

    let chars = body.chars().count();
    if chars < MIN_BODY_CHARS {
        return Err(ValidationError::TooShort { chars });
    }

    if let Some(marker) = find_block_marker(body) {
        return Err(ValidationError::Blocked { marker });
    }

    Ok(())
}
