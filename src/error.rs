//! Error types for page sources, lookups, and navigation.

extern crate alloc;

use alloc::string::String;
use core::fmt;

/// Errors produced by `mushaf-stream`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MushafError {
    /// A navigation request fell outside `1..=total`.
    OutOfRange {
        /// Page number as requested by the caller.
        requested: i64,
        /// Number of pages in the collection.
        total: u16,
    },
    /// A sura/aya reference did not resolve to a page.
    Lookup(String),
    /// The source has no such page.
    NotFound {
        /// Requested page number.
        page: u16,
    },
    /// Transport failure reported by a fetch collaborator.
    Network(String),
    /// A payload was malformed or failed validation.
    Decode(String),
    /// Corpus files were malformed or exceeded limits.
    Corpus(String),
    /// Local file access failed.
    Io(String),
}

impl MushafError {
    /// Page the clamp policy would apply for an out-of-range request.
    ///
    /// Returns `None` for every other error kind.
    pub fn clamped(&self) -> Option<u16> {
        match *self {
            Self::OutOfRange { requested, total } => {
                Some(crate::navigation::clamp_page(requested, total))
            }
            _ => None,
        }
    }

    /// Whether the caller may reasonably retry the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Io(_))
    }

    /// Message suitable for showing to a reader.
    ///
    /// Transport failures collapse to one generic line; everything else keeps
    /// its detail.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) | Self::Io(_) => {
                String::from("Error loading Quran pages. Please try again later.")
            }
            other => alloc::format!("{}", other),
        }
    }
}

impl fmt::Display for MushafError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { requested, total } => {
                write!(f, "page {} is outside 1..={}", requested, total)
            }
            Self::Lookup(msg) => write!(f, "reference lookup failed: {}", msg),
            Self::NotFound { page } => write!(f, "page {} not found", page),
            Self::Network(msg) => write!(f, "network error: {}", msg),
            Self::Decode(msg) => write!(f, "decode error: {}", msg),
            Self::Corpus(msg) => write!(f, "corpus error: {}", msg),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for MushafError {}

impl From<serde_json::Error> for MushafError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(alloc::format!("{}", err))
    }
}

impl From<std::io::Error> for MushafError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(alloc::format!("{}", err))
    }
}
