//! Verse and page records plus validation at the fetch boundary.
//!
//! Wire payloads use the viewer API's camelCase JSON shape:
//!
//! ```json
//! {
//!   "page": 1,
//!   "startVerse": { "sura": 1, "aya": 1 },
//!   "endVerse": { "sura": 1, "aya": 7 },
//!   "verses": [{ "index": 1, "sura": 1, "aya": 1, "text": "..." }]
//! }
//! ```
//!
//! Raw payloads are decoded with `serde` and then validated into [`Page`];
//! nothing downstream sees an unchecked verse.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use serde::{Deserialize, Serialize};

use crate::error::MushafError;
use crate::suras::{ayah_count, validate_reference};

/// Number of pages in the Madani mushaf layout.
pub const TOTAL_PAGES: u16 = 604;
/// Number of suras.
pub const SURA_COUNT: u8 = 114;
/// Number of ayat across all suras.
pub const TOTAL_VERSES: u32 = 6236;

/// A sura/aya reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VerseRef {
    /// Sura id, `1..=114`.
    pub sura: u8,
    /// Aya number within the sura, `>= 1`.
    pub aya: u16,
}

impl VerseRef {
    /// Create a reference without validation.
    pub const fn new(sura: u8, aya: u16) -> Self {
        Self { sura, aya }
    }
}

impl fmt::Display for VerseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.sura, self.aya)
    }
}

/// One verse of text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    /// Global ordinal across the book.
    pub index: u32,
    /// Sura id.
    pub sura: u8,
    /// Aya number within the sura.
    pub aya: u16,
    /// Right-to-left verse text.
    pub text: String,
}

impl Verse {
    /// Reference for this verse.
    pub fn reference(&self) -> VerseRef {
        VerseRef::new(self.sura, self.aya)
    }
}

/// One mushaf page and the verses the source assigned to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Page {
    /// 1-based page number.
    pub number: u16,
    /// Verses in reading order.
    pub verses: Vec<Verse>,
    /// First verse on the page as reported by the source.
    pub start: Option<VerseRef>,
    /// Last verse on the page as reported by the source.
    pub end: Option<VerseRef>,
}

impl Page {
    /// Build and validate a page.
    pub fn new(number: u16, verses: Vec<Verse>) -> Result<Self, MushafError> {
        let start = verses.first().map(Verse::reference);
        let end = verses.last().map(Verse::reference);
        let page = Self {
            number,
            verses,
            start,
            end,
        };
        page.validate()?;
        Ok(page)
    }

    /// Whether the page carries no verses.
    pub fn is_empty(&self) -> bool {
        self.verses.is_empty()
    }

    /// Whether `verse` falls within this page's verse range.
    pub fn contains(&self, verse: VerseRef) -> bool {
        self.verses.iter().any(|v| v.reference() == verse)
    }

    /// Sura ids that appear on this page, in order, deduplicated.
    pub fn suras(&self) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::with_capacity(2);
        for verse in &self.verses {
            if out.last() != Some(&verse.sura) {
                out.push(verse.sura);
            }
        }
        out
    }

    /// Check page-number range and per-verse field validity.
    pub fn validate(&self) -> Result<(), MushafError> {
        if self.number == 0 || self.number > TOTAL_PAGES {
            return Err(MushafError::Decode(alloc::format!(
                "page number {} is outside 1..={}",
                self.number,
                TOTAL_PAGES
            )));
        }
        let mut prev_index: Option<u32> = None;
        for (pos, verse) in self.verses.iter().enumerate() {
            let Some(count) = ayah_count(verse.sura) else {
                return Err(MushafError::Decode(alloc::format!(
                    "verses[{}].sura {} is outside 1..={}",
                    pos,
                    verse.sura,
                    SURA_COUNT
                )));
            };
            if verse.aya == 0 || verse.aya > count {
                return Err(MushafError::Decode(alloc::format!(
                    "verses[{}].aya {} is outside 1..={} for sura {}",
                    pos,
                    verse.aya,
                    count,
                    verse.sura
                )));
            }
            if prev_index.is_some_and(|prev| verse.index < prev) {
                return Err(MushafError::Decode(alloc::format!(
                    "verses[{}].index {} is out of reading order",
                    pos,
                    verse.index
                )));
            }
            prev_index = Some(verse.index);
        }
        self.validate_bounds()
    }

    fn validate_bounds(&self) -> Result<(), MushafError> {
        for (field, bound) in [("startVerse", self.start), ("endVerse", self.end)] {
            if let Some(r) = bound {
                validate_reference(i64::from(r.sura), i64::from(r.aya)).map_err(|err| {
                    MushafError::Decode(alloc::format!("{} {} is invalid: {}", field, r, err))
                })?;
            }
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(MushafError::Decode(alloc::format!(
                    "startVerse {} is after endVerse {}",
                    start,
                    end
                )));
            }
        }
        let first = self.verses.first().map(Verse::reference);
        let last = self.verses.last().map(Verse::reference);
        for (field, bound, actual) in [("startVerse", self.start, first), ("endVerse", self.end, last)]
        {
            if let (Some(bound), Some(actual)) = (bound, actual) {
                if bound != actual {
                    return Err(MushafError::Decode(alloc::format!(
                        "{} {} does not match verse {}",
                        field,
                        bound,
                        actual
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVerseRef {
    sura: u8,
    aya: u16,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPage {
    page: u16,
    #[serde(default)]
    start_verse: Option<RawVerseRef>,
    #[serde(default)]
    end_verse: Option<RawVerseRef>,
    verses: Vec<Verse>,
}

#[derive(Debug, Deserialize)]
struct RawLookup {
    page: u16,
}

/// Decode and validate a page payload.
pub fn decode_page_json(bytes: &[u8]) -> Result<Page, MushafError> {
    let raw: RawPage = serde_json::from_slice(bytes)?;
    let start = raw
        .start_verse
        .map(|r| VerseRef::new(r.sura, r.aya))
        .or_else(|| raw.verses.first().map(Verse::reference));
    let end = raw
        .end_verse
        .map(|r| VerseRef::new(r.sura, r.aya))
        .or_else(|| raw.verses.last().map(Verse::reference));
    let page = Page {
        number: raw.page,
        verses: raw.verses,
        start,
        end,
    };
    page.validate()?;
    Ok(page)
}

/// Decode a reference-lookup payload (`{"page": n}`).
///
/// The page number is returned as-is; range policy belongs to navigation.
pub fn decode_lookup_json(bytes: &[u8]) -> Result<u16, MushafError> {
    let raw: RawLookup = serde_json::from_slice(bytes)?;
    Ok(raw.page)
}

/// Encode a page in the same wire shape [`decode_page_json`] accepts.
pub fn encode_page_json(page: &Page) -> Result<String, MushafError> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Wire<'a> {
        page: u16,
        start_verse: Option<VerseRef>,
        end_verse: Option<VerseRef>,
        verses: &'a [Verse],
    }
    let wire = Wire {
        page: page.number,
        start_verse: page.start,
        end_verse: page.end,
        verses: &page.verses,
    };
    Ok(serde_json::to_string(&wire)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verse(index: u32, sura: u8, aya: u16, text: &str) -> Verse {
        Verse {
            index,
            sura,
            aya,
            text: text.into(),
        }
    }

    #[test]
    fn decode_page_reads_api_shape() {
        let json = br#"{
            "page": 1,
            "startVerse": {"sura": 1, "aya": 1},
            "endVerse": {"sura": 1, "aya": 2},
            "verses": [
                {"index": 1, "sura": 1, "aya": 1, "text": "a b c"},
                {"index": 2, "sura": 1, "aya": 2, "text": "d e"}
            ]
        }"#;
        let page = decode_page_json(json).expect("valid payload");
        assert_eq!(page.number, 1);
        assert_eq!(page.verses.len(), 2);
        assert_eq!(page.start, Some(VerseRef::new(1, 1)));
        assert_eq!(page.end, Some(VerseRef::new(1, 2)));
    }

    #[test]
    fn decode_page_fills_missing_bounds_from_verses() {
        let json = br#"{"page": 2, "verses": [{"index": 8, "sura": 2, "aya": 1, "text": "x"}]}"#;
        let page = decode_page_json(json).expect("valid payload");
        assert_eq!(page.start, Some(VerseRef::new(2, 1)));
        assert_eq!(page.end, Some(VerseRef::new(2, 1)));
    }

    #[test]
    fn decode_page_rejects_bad_bounds() {
        let nonexistent = br#"{
            "page": 1,
            "startVerse": {"sura": 0, "aya": 0},
            "endVerse": {"sura": 200, "aya": 9999},
            "verses": []
        }"#;
        let err = decode_page_json(nonexistent).expect_err("bounds do not exist");
        assert!(matches!(&err, MushafError::Decode(msg) if msg.starts_with("startVerse")));

        let reversed = br#"{
            "page": 1,
            "startVerse": {"sura": 1, "aya": 5},
            "endVerse": {"sura": 1, "aya": 2},
            "verses": []
        }"#;
        assert!(matches!(
            decode_page_json(reversed),
            Err(MushafError::Decode(msg)) if msg.contains("after endVerse")
        ));

        let mismatched = br#"{
            "page": 1,
            "startVerse": {"sura": 1, "aya": 1},
            "endVerse": {"sura": 1, "aya": 7},
            "verses": [
                {"index": 1, "sura": 1, "aya": 1, "text": "a"},
                {"index": 2, "sura": 1, "aya": 2, "text": "b"}
            ]
        }"#;
        assert!(matches!(
            decode_page_json(mismatched),
            Err(MushafError::Decode(msg)) if msg.starts_with("endVerse")
        ));
    }

    #[test]
    fn bounds_on_empty_page_are_kept_when_valid() {
        let json = br#"{
            "page": 3,
            "startVerse": {"sura": 2, "aya": 6},
            "endVerse": {"sura": 2, "aya": 16},
            "verses": []
        }"#;
        let page = decode_page_json(json).expect("valid bounds");
        assert!(page.is_empty());
        assert_eq!(page.start, Some(VerseRef::new(2, 6)));
        assert_eq!(page.end, Some(VerseRef::new(2, 16)));
    }

    #[test]
    fn decode_page_rejects_missing_fields() {
        let json = br#"{"page": 2, "verses": [{"index": 8, "sura": 2, "text": "x"}]}"#;
        assert!(matches!(
            decode_page_json(json),
            Err(MushafError::Decode(_))
        ));
    }

    #[test]
    fn validate_rejects_bad_sura_aya_and_page() {
        assert!(Page::new(0, Vec::new()).is_err());
        assert!(Page::new(605, Vec::new()).is_err());
        assert!(Page::new(1, vec![verse(1, 0, 1, "x")]).is_err());
        assert!(Page::new(1, vec![verse(1, 1, 8, "x")]).is_err());
        assert!(Page::new(1, vec![verse(2, 1, 2, "x"), verse(1, 1, 1, "y")]).is_err());
        assert!(Page::new(1, Vec::new()).is_ok());
    }

    #[test]
    fn suras_lists_each_sura_once() {
        let page = Page::new(
            604,
            vec![
                verse(6227, 112, 4, "a"),
                verse(6228, 113, 1, "b"),
                verse(6229, 113, 2, "c"),
                verse(6233, 114, 1, "d"),
            ],
        )
        .expect("valid page");
        assert_eq!(page.suras(), vec![112, 113, 114]);
        assert!(page.contains(VerseRef::new(113, 2)));
        assert!(!page.contains(VerseRef::new(113, 3)));
    }

    #[test]
    fn lookup_payload_decodes() {
        assert_eq!(decode_lookup_json(br#"{"page": 42}"#), Ok(42));
        assert!(decode_lookup_json(br#"{"pg": 42}"#).is_err());
    }

    #[test]
    fn encoded_page_decodes_to_same_page() {
        let page = Page::new(1, vec![verse(1, 1, 1, "a b")]).expect("valid page");
        let json = encode_page_json(&page).expect("encode");
        assert!(json.contains("\"startVerse\""));
        assert_eq!(decode_page_json(json.as_bytes()), Ok(page));
    }
}
