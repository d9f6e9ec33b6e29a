//! Page-fetch and reference-lookup collaborators.
//!
//! The render side never fetches; it consumes [`Page`] values produced by a
//! [`PageSource`]. Transport lives with the host application. This module
//! ships the traits, the API route layout, an in-memory source, and a
//! directory source that reads JSON payloads saved in the API's shape.

extern crate alloc;

use alloc::string::String;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::MushafError;
use crate::model::{decode_page_json, Page, VerseRef, TOTAL_PAGES};

/// Supplies the verses for a page.
pub trait PageSource {
    /// Fetch page `number`.
    ///
    /// Fails with [`MushafError::NotFound`] for pages the source does not
    /// have and [`MushafError::Network`] on transport failure.
    fn fetch_page(&self, number: u16) -> Result<Page, MushafError>;
}

/// Maps a sura/aya reference to the page that holds it.
pub trait ReferenceLookup {
    /// Page number holding `sura:aya`.
    fn lookup_page(&self, sura: u8, aya: u16) -> Result<u16, MushafError>;
}

impl<T: PageSource + ?Sized> PageSource for &T {
    fn fetch_page(&self, number: u16) -> Result<Page, MushafError> {
        (**self).fetch_page(number)
    }
}

impl<T: ReferenceLookup + ?Sized> ReferenceLookup for &T {
    fn lookup_page(&self, sura: u8, aya: u16) -> Result<u16, MushafError> {
        (**self).lookup_page(sura, aya)
    }
}

/// Default API base used by the viewer.
pub const DEFAULT_API_BASE: &str = "http://localhost:3301/api";

/// Endpoint layout of the verse API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRoutes {
    base: String,
}

impl Default for ApiRoutes {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

impl ApiRoutes {
    /// Routes rooted at `base`; a trailing slash is ignored.
    pub fn new(base: impl Into<String>) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        Self { base }
    }

    /// Base URL without trailing slash.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// URL of the page payload.
    pub fn page_url(&self, number: u16) -> String {
        alloc::format!("{}/ayat/page/{}", self.base, number)
    }

    /// URL of the sura/aya to page lookup.
    pub fn lookup_url(&self, verse: VerseRef) -> String {
        alloc::format!("{}/ayat/getpage/{}/aya/{}", self.base, verse.sura, verse.aya)
    }
}

/// In-memory pages and reference index.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    pages: BTreeMap<u16, Page>,
    refs: BTreeMap<VerseRef, u16>,
}

impl MemorySource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a source from pages; later duplicates replace earlier ones.
    pub fn from_pages<I>(pages: I) -> Self
    where
        I: IntoIterator<Item = Page>,
    {
        let mut source = Self::new();
        for page in pages {
            source.insert(page);
        }
        source
    }

    /// Add or replace a page and index its verses.
    pub fn insert(&mut self, page: Page) {
        for verse in &page.verses {
            self.refs.insert(verse.reference(), page.number);
        }
        self.pages.insert(page.number, page);
    }

    /// Number of stored pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether no pages are stored.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl PageSource for MemorySource {
    fn fetch_page(&self, number: u16) -> Result<Page, MushafError> {
        self.pages
            .get(&number)
            .cloned()
            .ok_or(MushafError::NotFound { page: number })
    }
}

impl ReferenceLookup for MemorySource {
    fn lookup_page(&self, sura: u8, aya: u16) -> Result<u16, MushafError> {
        self.refs
            .get(&VerseRef::new(sura, aya))
            .copied()
            .ok_or_else(|| {
                MushafError::Lookup(alloc::format!("{} is not indexed", VerseRef::new(sura, aya)))
            })
    }
}

/// Pages stored as `page-NNN.json` files in one directory.
#[derive(Clone, Debug)]
pub struct DirPageSource {
    root: PathBuf,
}

impl DirPageSource {
    /// Source reading from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory the source reads from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the payload for `number`.
    pub fn page_path(&self, number: u16) -> PathBuf {
        self.root.join(alloc::format!("page-{:03}.json", number))
    }

    fn check_range(number: u16) -> Result<(), MushafError> {
        if number == 0 || number > TOTAL_PAGES {
            return Err(MushafError::NotFound { page: number });
        }
        Ok(())
    }

    fn decode_for(number: u16, bytes: &[u8]) -> Result<Page, MushafError> {
        let page = decode_page_json(bytes)?;
        if page.number != number {
            return Err(MushafError::Decode(alloc::format!(
                "payload for page {} reports page {}",
                number,
                page.number
            )));
        }
        Ok(page)
    }

    /// Fetch a page without blocking the async runtime.
    #[cfg(feature = "async")]
    pub async fn fetch_page_async(&self, number: u16) -> Result<Page, MushafError> {
        Self::check_range(number)?;
        let path = self.page_path(number);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(MushafError::NotFound { page: number })
            }
            Err(err) => return Err(err.into()),
        };
        Self::decode_for(number, &bytes)
    }
}

impl PageSource for DirPageSource {
    fn fetch_page(&self, number: u16) -> Result<Page, MushafError> {
        Self::check_range(number)?;
        let path = self.page_path(number);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(MushafError::NotFound { page: number })
            }
            Err(err) => return Err(err.into()),
        };
        log::debug!("read page {} from {}", number, path.display());
        Self::decode_for(number, &bytes)
    }
}
