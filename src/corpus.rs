//! Offline corpus loaded from Tanzil-format XML.
//!
//! Two documents are read:
//!
//! - the text file, `<quran><sura index name><aya index text/></sura></quran>`
//! - the metadata file, whose `<pages>` section lists the first verse of
//!   every page as `<page index="N" sura="S" aya="A"/>`
//!
//! The resulting [`Corpus`] serves pages and reference lookups without a
//! network round trip.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use std::collections::BTreeMap;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::MushafError;
use crate::model::{Page, Verse, VerseRef, TOTAL_PAGES};
use crate::source::{PageSource, ReferenceLookup};
use crate::suras::global_verse_index;

/// Limits for corpus parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CorpusLimits {
    /// Maximum number of verses accepted from the text file.
    pub max_verses: usize,
    /// Maximum UTF-8 byte length of one verse's text.
    pub max_verse_bytes: usize,
    /// Maximum number of page boundaries accepted from the metadata file.
    pub max_pages: usize,
}

impl Default for CorpusLimits {
    fn default() -> Self {
        Self {
            max_verses: 8192,
            max_verse_bytes: 16 * 1024,
            max_pages: 1024,
        }
    }
}

impl CorpusLimits {
    /// Preset for memory-constrained hosts.
    pub fn embedded() -> Self {
        Self {
            max_verses: 6236,
            max_verse_bytes: 4096,
            max_pages: usize::from(TOTAL_PAGES),
        }
    }
}

/// Verses plus page boundaries.
#[derive(Clone, Debug, Default)]
pub struct Corpus {
    verses: Vec<Verse>,
    /// Global verse index of each page's first verse; entry `i` is page `i + 1`.
    page_starts: Vec<u32>,
    sura_names: BTreeMap<u8, String>,
}

impl Corpus {
    /// Parse both documents with default limits.
    pub fn from_xml(text_xml: &[u8], meta_xml: &[u8]) -> Result<Self, MushafError> {
        Self::from_xml_with_limits(text_xml, meta_xml, CorpusLimits::default())
    }

    /// Parse both documents with explicit limits.
    pub fn from_xml_with_limits(
        text_xml: &[u8],
        meta_xml: &[u8],
        limits: CorpusLimits,
    ) -> Result<Self, MushafError> {
        let (verses, sura_names) = parse_quran_text(text_xml, limits)?;
        let page_starts = parse_page_starts(meta_xml, limits)?;
        log::debug!(
            "corpus loaded: {} verses, {} page boundaries",
            verses.len(),
            page_starts.len()
        );
        Ok(Self {
            verses,
            page_starts,
            sura_names,
        })
    }

    /// Read both documents from disk.
    pub fn open(
        text_path: impl AsRef<Path>,
        meta_path: impl AsRef<Path>,
    ) -> Result<Self, MushafError> {
        let text = std::fs::read(text_path.as_ref())?;
        let meta = std::fs::read(meta_path.as_ref())?;
        Self::from_xml(&text, &meta)
    }

    /// Number of verses loaded.
    pub fn verse_count(&self) -> usize {
        self.verses.len()
    }

    /// Number of pages described by the metadata.
    pub fn page_count(&self) -> u16 {
        u16::try_from(self.page_starts.len()).unwrap_or(u16::MAX)
    }

    /// Sura name from the text file, if present.
    pub fn sura_name(&self, sura: u8) -> Option<&str> {
        self.sura_names.get(&sura).map(String::as_str)
    }

    /// Look up a single verse.
    pub fn verse(&self, verse: VerseRef) -> Option<&Verse> {
        let index = global_verse_index(verse)?;
        self.verses
            .binary_search_by_key(&index, |v| v.index)
            .ok()
            .and_then(|pos| self.verses.get(pos))
    }

    fn page_bounds(&self, number: u16) -> Option<(u32, u32)> {
        let slot = usize::from(number).checked_sub(1)?;
        let start = *self.page_starts.get(slot)?;
        let end = self.page_starts.get(slot + 1).copied().unwrap_or(u32::MAX);
        Some((start, end))
    }
}

impl PageSource for Corpus {
    fn fetch_page(&self, number: u16) -> Result<Page, MushafError> {
        let (start, end) = self
            .page_bounds(number)
            .ok_or(MushafError::NotFound { page: number })?;
        let from = self.verses.partition_point(|v| v.index < start);
        let to = self.verses.partition_point(|v| v.index < end);
        let verses = self.verses.get(from..to).unwrap_or_default().to_vec();
        if verses.is_empty() {
            return Err(MushafError::NotFound { page: number });
        }
        Page::new(number, verses)
    }
}

impl ReferenceLookup for Corpus {
    fn lookup_page(&self, sura: u8, aya: u16) -> Result<u16, MushafError> {
        let verse = VerseRef::new(sura, aya);
        let index = global_verse_index(verse)
            .ok_or_else(|| MushafError::Lookup(alloc::format!("{} does not exist", verse)))?;
        let pages_before = self.page_starts.partition_point(|start| *start <= index);
        if pages_before == 0 {
            return Err(MushafError::Lookup(alloc::format!(
                "{} precedes the first page boundary",
                verse
            )));
        }
        u16::try_from(pages_before)
            .map_err(|_| MushafError::Lookup(alloc::format!("{} maps past u16 pages", verse)))
    }
}

fn attr_value(reader: &Reader<&[u8]>, e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| {
            reader
                .decoder()
                .decode(attr.value.as_ref())
                .unwrap_or_default()
                .into_owned()
        })
}

fn numeric_attr<T: core::str::FromStr>(
    reader: &Reader<&[u8]>,
    e: &BytesStart<'_>,
    key: &[u8],
    element: &str,
) -> Result<T, MushafError> {
    let raw = attr_value(reader, e, key).ok_or_else(|| {
        MushafError::Corpus(alloc::format!(
            "<{}> is missing attribute '{}'",
            element,
            String::from_utf8_lossy(key)
        ))
    })?;
    raw.trim().parse().map_err(|_| {
        MushafError::Corpus(alloc::format!(
            "<{}> attribute '{}' is not a number: {}",
            element,
            String::from_utf8_lossy(key),
            raw
        ))
    })
}

type ParsedText = (Vec<Verse>, BTreeMap<u8, String>);

fn parse_quran_text(content: &[u8], limits: CorpusLimits) -> Result<ParsedText, MushafError> {
    let mut reader = Reader::from_reader(content);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::with_capacity(256);
    let mut verses: Vec<Verse> = Vec::with_capacity(1024);
    let mut names = BTreeMap::new();
    let mut current_sura: Option<u8> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"sura" => {
                    let sura: u8 = numeric_attr(&reader, &e, b"index", "sura")?;
                    if let Some(name) = attr_value(&reader, &e, b"name") {
                        names.insert(sura, name);
                    }
                    current_sura = Some(sura);
                }
                b"aya" => {
                    let sura = current_sura.ok_or_else(|| {
                        MushafError::Corpus("<aya> appears outside <sura>".into())
                    })?;
                    let aya: u16 = numeric_attr(&reader, &e, b"index", "aya")?;
                    let text = attr_value(&reader, &e, b"text").unwrap_or_default();
                    if text.len() > limits.max_verse_bytes {
                        return Err(MushafError::Corpus(alloc::format!(
                            "verse {}:{} exceeds max_verse_bytes ({} > {})",
                            sura,
                            aya,
                            text.len(),
                            limits.max_verse_bytes
                        )));
                    }
                    let reference = VerseRef::new(sura, aya);
                    let index = global_verse_index(reference).ok_or_else(|| {
                        MushafError::Corpus(alloc::format!("verse {} does not exist", reference))
                    })?;
                    if verses.len() >= limits.max_verses {
                        return Err(MushafError::Corpus(alloc::format!(
                            "verse count exceeds max_verses ({})",
                            limits.max_verses
                        )));
                    }
                    verses.push(Verse {
                        index,
                        sura,
                        aya,
                        text,
                    });
                }
                _ => {}
            },
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"sura" {
                    current_sura = None;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(MushafError::Corpus(alloc::format!(
                    "text XML parse error: {:?}",
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    verses.sort_by_key(|v| v.index);
    if let Some(dup) = verses.windows(2).find(|w| w[0].index == w[1].index) {
        return Err(MushafError::Corpus(alloc::format!(
            "verse {} appears twice",
            dup[1].reference()
        )));
    }
    Ok((verses, names))
}

fn parse_page_starts(content: &[u8], limits: CorpusLimits) -> Result<Vec<u32>, MushafError> {
    let mut reader = Reader::from_reader(content);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::with_capacity(128);
    let mut in_pages = false;
    let mut starts: BTreeMap<u16, u32> = BTreeMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"pages" {
                    in_pages = true;
                }
            }
            Ok(Event::Empty(e)) if in_pages && e.name().as_ref() == b"page" => {
                let page: u16 = numeric_attr(&reader, &e, b"index", "page")?;
                let sura: u8 = numeric_attr(&reader, &e, b"sura", "page")?;
                let aya: u16 = numeric_attr(&reader, &e, b"aya", "page")?;
                let reference = VerseRef::new(sura, aya);
                let index = global_verse_index(reference).ok_or_else(|| {
                    MushafError::Corpus(alloc::format!(
                        "page {} starts at missing verse {}",
                        page,
                        reference
                    ))
                })?;
                if starts.len() >= limits.max_pages {
                    return Err(MushafError::Corpus(alloc::format!(
                        "page count exceeds max_pages ({})",
                        limits.max_pages
                    )));
                }
                starts.insert(page, index);
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"pages" {
                    in_pages = false;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(MushafError::Corpus(alloc::format!(
                    "metadata XML parse error: {:?}",
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    // Page numbers must be contiguous from 1 and starts strictly increasing.
    let mut out = Vec::with_capacity(starts.len());
    for (expected, (page, start)) in (1u16..).zip(starts) {
        if page != expected {
            return Err(MushafError::Corpus(alloc::format!(
                "page boundaries skip from {} to {}",
                expected.saturating_sub(1),
                page
            )));
        }
        if out.last().is_some_and(|prev| *prev >= start) {
            return Err(MushafError::Corpus(alloc::format!(
                "page {} does not start after page {}",
                page,
                expected.saturating_sub(1)
            )));
        }
        out.push(start);
    }
    Ok(out)
}
