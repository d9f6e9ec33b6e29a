use std::path::PathBuf;

use mushaf_stream::{Corpus, DirPageSource};

pub const TEXT_FIXTURE: &str = "tests/fixtures/quran-sample.xml";
pub const META_FIXTURE: &str = "tests/fixtures/quran-sample-meta.xml";
pub const PAGES_FIXTURE: &str = "tests/fixtures/pages";

pub fn fixture_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(relative)
}

/// Al-Fatiha plus Al-Baqarah 1-7, split into three pages at 1:1, 2:1, 2:6.
pub fn sample_corpus() -> Corpus {
    Corpus::open(fixture_path(TEXT_FIXTURE), fixture_path(META_FIXTURE))
        .expect("sample corpus should parse")
}

/// JSON payloads for pages 1-3; `page-004.json` claims to be page 5.
pub fn sample_pages() -> DirPageSource {
    DirPageSource::new(fixture_path(PAGES_FIXTURE))
}
