//! Page-addressed Quran verse model, sources, and spread navigation.
//!
//! `mushaf-stream` owns everything up to the verse list of one page:
//! typed [`Verse`]/[`Page`] records validated at the fetch boundary, the
//! [`PageSource`] and [`ReferenceLookup`] collaborator traits, an offline
//! Tanzil [`Corpus`], and the clamp-never-wrap [`navigation`] rules for
//! single and two-page display.
//!
//! Line layout and font fitting live in the `mushaf-stream-render` crate.

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod corpus;
pub mod error;
pub mod model;
pub mod navigation;
pub mod source;
pub mod suras;

pub use corpus::{Corpus, CorpusLimits};
pub use error::MushafError;
pub use model::{
    decode_lookup_json, decode_page_json, encode_page_json, Page, Verse, VerseRef, SURA_COUNT,
    TOTAL_PAGES, TOTAL_VERSES,
};
pub use navigation::{
    advance, clamp_page, go_to_page, next_spread, parse_page_input, resolve_by_reference,
    DisplayMode, NavAction, PageIndex, Spread,
};
pub use source::{ApiRoutes, DirPageSource, MemorySource, PageSource, ReferenceLookup};
pub use suras::{ayah_count, sura_name, validate_reference};
