//! Verse-to-line packing with verse-end marker tracking.

use mushaf_stream::{Page, Verse};
use serde::Serialize;
use smallvec::SmallVec;

/// Lines on every laid-out page.
pub const LINES_PER_PAGE: usize = 15;
/// Baseline words per line.
pub const WORDS_PER_LINE: usize = 9;

const VERSE_GLYPHS: [char; 3] = ['\u{FD3F}', '\u{FD3E}', '\u{06DD}'];

/// What to do when a page packs into more than `lines_per_page` lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum OverflowPolicy {
    /// Keep the first `lines_per_page` lines and drop the rest.
    #[default]
    Truncate,
    /// Raise words-per-line until every word fits in `lines_per_page` lines.
    Redistribute,
}

/// Packing configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ReflowConfig {
    /// Output line count.
    pub lines_per_page: usize,
    /// Words before a line closes.
    pub words_per_line: usize,
    /// Policy for pages that do not fit.
    pub overflow: OverflowPolicy,
}

impl Default for ReflowConfig {
    fn default() -> Self {
        Self {
            lines_per_page: LINES_PER_PAGE,
            words_per_line: WORDS_PER_LINE,
            overflow: OverflowPolicy::Truncate,
        }
    }
}

/// A word plus the verse number it closes, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Word {
    /// Word text.
    pub text: String,
    /// Verse number when this is the verse's last word.
    pub verse_end: Option<u16>,
}

/// Verse-end marker placed after a word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct VerseMarker {
    /// Aya number shown in the marker.
    pub verse_number: u16,
    /// 0-based index of the word the marker follows.
    pub word_position: usize,
}

/// One display line.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Line {
    /// Words joined by single spaces.
    pub text: String,
    /// Words in reading order.
    pub words: Vec<String>,
    /// Markers on this line.
    pub verse_markers: SmallVec<[VerseMarker; 4]>,
}

impl Line {
    /// Padding line.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the line holds no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Number of words.
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    fn push(&mut self, word: Word) {
        if let Some(verse_number) = word.verse_end {
            self.verse_markers.push(VerseMarker {
                verse_number,
                word_position: self.words.len(),
            });
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(&word.text);
        self.words.push(word.text);
    }

    /// Verse number of the marker after word `position`.
    pub fn marker_at(&self, position: usize) -> Option<u16> {
        self.verse_markers
            .iter()
            .find(|m| m.word_position == position)
            .map(|m| m.verse_number)
    }

    /// Line text with `﴿n﴾` after each verse-ending word.
    pub fn display_text(&self) -> String {
        let mut out = String::with_capacity(self.text.len() + self.verse_markers.len() * 8);
        for (pos, word) in self.words.iter().enumerate() {
            if pos > 0 {
                out.push(' ');
            }
            out.push_str(word);
            if let Some(number) = self.marker_at(pos) {
                out.push_str(" \u{FD3F}");
                out.push_str(&number.to_string());
                out.push('\u{FD3E}');
            }
        }
        out
    }
}

/// Fixed-height page of lines.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PageLayout {
    /// Page number when laid out from a [`Page`].
    pub page_number: Option<u16>,
    /// Exactly `lines_per_page` lines.
    pub lines: Vec<Line>,
    /// Words-per-line actually used.
    pub words_per_line: usize,
    /// Words produced from the input verses.
    pub total_words: usize,
    /// Words lost to truncation.
    pub dropped_words: usize,
    /// Suras with verses on the page, in reading order.
    pub suras: Vec<u8>,
}

impl PageLayout {
    /// Whether content was dropped.
    pub fn is_truncated(&self) -> bool {
        self.dropped_words > 0
    }

    /// Lines that carry words.
    pub fn non_empty_lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter().filter(|line| !line.is_empty())
    }

    /// All placed words in reading order.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .flat_map(|line| line.words.iter().map(String::as_str))
    }

    /// `(line_index, marker)` for every marker on the page.
    pub fn markers(&self) -> impl Iterator<Item = (usize, VerseMarker)> + '_ {
        self.lines
            .iter()
            .enumerate()
            .flat_map(|(idx, line)| line.verse_markers.iter().map(move |m| (idx, *m)))
    }
}

fn is_verse_glyph(ch: char) -> bool {
    VERSE_GLYPHS.contains(&ch)
}

/// Whether `token` is made only of ASCII, Arabic-Indic, or extended
/// Arabic-Indic digits.
pub fn is_numeric_token(token: &str) -> bool {
    !token.is_empty()
        && token.chars().all(|ch| {
            ch.is_ascii_digit()
                || ('\u{0660}'..='\u{0669}').contains(&ch)
                || ('\u{06F0}'..='\u{06F9}').contains(&ch)
        })
}

/// Remove verse-end ornaments and collapse whitespace.
pub fn strip_verse_glyphs(text: &str) -> String {
    let spaced: String = text
        .chars()
        .map(|ch| if is_verse_glyph(ch) { ' ' } else { ch })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Words of one verse with ornaments and stray verse numbers removed.
pub fn verse_words(text: &str) -> Vec<String> {
    strip_verse_glyphs(text)
        .split(' ')
        .filter(|token| !token.is_empty() && !is_numeric_token(token))
        .map(str::to_string)
        .collect()
}

/// Flatten verses into words, tagging each verse's last word.
pub fn page_words(verses: &[Verse]) -> Vec<Word> {
    let mut out = Vec::with_capacity(verses.len() * 12);
    for verse in verses {
        let words = verse_words(&verse.text);
        let last = words.len().saturating_sub(1);
        out.extend(words.into_iter().enumerate().map(|(idx, text)| Word {
            text,
            verse_end: (idx == last).then_some(verse.aya),
        }));
    }
    out
}

/// Pack verses into exactly `cfg.lines_per_page` lines.
pub fn reflow_verses(verses: &[Verse], cfg: ReflowConfig) -> PageLayout {
    let lines_per_page = cfg.lines_per_page.max(1);
    let words = page_words(verses);
    let total_words = words.len();

    let mut words_per_line = cfg.words_per_line.max(1);
    if cfg.overflow == OverflowPolicy::Redistribute && total_words > lines_per_page.saturating_mul(words_per_line)
    {
        words_per_line = total_words.div_ceil(lines_per_page);
    }

    let mut lines: Vec<Line> = Vec::with_capacity(lines_per_page);
    let mut current = Line::empty();
    for word in words {
        current.push(word);
        if current.word_count() == words_per_line {
            lines.push(core::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    let mut dropped_words = 0;
    if lines.len() > lines_per_page {
        dropped_words = lines[lines_per_page..].iter().map(Line::word_count).sum();
        lines.truncate(lines_per_page);
        log::warn!(
            "page content exceeds {} lines of {} words; dropped {} of {} words",
            lines_per_page,
            words_per_line,
            dropped_words,
            total_words
        );
    }
    lines.resize_with(lines_per_page, Line::empty);

    let mut suras: Vec<u8> = Vec::new();
    for verse in verses {
        if suras.last() != Some(&verse.sura) {
            suras.push(verse.sura);
        }
    }

    PageLayout {
        page_number: None,
        lines,
        words_per_line,
        total_words,
        dropped_words,
        suras,
    }
}

/// Pack a page's verses.
pub fn reflow_page(page: &Page, cfg: ReflowConfig) -> PageLayout {
    PageLayout {
        page_number: Some(page.number),
        ..reflow_verses(&page.verses, cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verse(aya: u16, text: &str) -> Verse {
        Verse {
            index: u32::from(aya),
            sura: 2,
            aya,
            text: text.to_string(),
        }
    }

    fn words(n: usize, prefix: &str) -> String {
        (0..n)
            .map(|i| format!("{prefix}{i}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn two_five_word_verses_fill_nine_then_one() {
        let verses = [verse(1, &words(5, "a")), verse(2, &words(5, "b"))];
        let layout = reflow_verses(&verses, ReflowConfig::default());
        assert_eq!(layout.lines.len(), LINES_PER_PAGE);
        assert_eq!(layout.lines[0].word_count(), 9);
        assert_eq!(layout.lines[1].word_count(), 1);
        assert!(layout.lines[2..].iter().all(Line::is_empty));
        assert_eq!(
            layout.lines[0].verse_markers.as_slice(),
            &[VerseMarker {
                verse_number: 1,
                word_position: 4
            }]
        );
        assert_eq!(
            layout.lines[1].verse_markers.as_slice(),
            &[VerseMarker {
                verse_number: 2,
                word_position: 0
            }]
        );
        assert_eq!(layout.lines[1].text, "b4");
    }

    #[test]
    fn empty_input_yields_padding_only() {
        let layout = reflow_verses(&[], ReflowConfig::default());
        assert_eq!(layout.lines.len(), LINES_PER_PAGE);
        assert!(layout.lines.iter().all(Line::is_empty));
        assert_eq!(layout.markers().count(), 0);
        assert_eq!(layout.total_words, 0);
    }

    #[test]
    fn glyphs_and_numbers_are_not_words() {
        assert_eq!(
            verse_words("  alpha\u{FD3F}١٢\u{FD3E} beta  12 \u{06DD}٣ ۵ gamma "),
            vec!["alpha", "beta", "gamma"]
        );
        assert!(is_numeric_token("٢٥٥"));
        assert!(is_numeric_token("۱۲"));
        assert!(!is_numeric_token("a1"));
        assert!(!is_numeric_token(""));
        assert_eq!(strip_verse_glyphs("a\u{FD3F}1\u{FD3E}b"), "a 1 b");
    }

    #[test]
    fn verse_without_words_gets_no_marker() {
        let verses = [verse(1, "one two"), verse(2, "\u{FD3F}٢\u{FD3E}"), verse(3, "three")];
        let layout = reflow_verses(&verses, ReflowConfig::default());
        let markers: Vec<u16> = layout.markers().map(|(_, m)| m.verse_number).collect();
        assert_eq!(markers, vec![1, 3]);
    }

    #[test]
    fn truncate_drops_words_past_last_line() {
        let verses = [verse(1, &words(140, "w"))];
        let layout = reflow_verses(&verses, ReflowConfig::default());
        assert_eq!(layout.lines.len(), LINES_PER_PAGE);
        assert_eq!(layout.words().count(), 135);
        assert_eq!(layout.dropped_words, 5);
        assert!(layout.is_truncated());
        assert_eq!(layout.markers().count(), 0);
    }

    #[test]
    fn redistribute_keeps_every_word() {
        let cfg = ReflowConfig {
            overflow: OverflowPolicy::Redistribute,
            ..ReflowConfig::default()
        };
        let verses = [verse(1, &words(140, "w"))];
        let layout = reflow_verses(&verses, cfg);
        assert_eq!(layout.lines.len(), LINES_PER_PAGE);
        assert_eq!(layout.words_per_line, 10);
        assert_eq!(layout.words().count(), 140);
        assert_eq!(layout.dropped_words, 0);
        let last = layout.non_empty_lines().last().expect("content");
        assert_eq!(last.marker_at(last.word_count() - 1), Some(1));
    }

    #[test]
    fn redistribute_with_huge_line_width_does_not_overflow() {
        let cfg = ReflowConfig {
            lines_per_page: 2,
            words_per_line: usize::MAX,
            overflow: OverflowPolicy::Redistribute,
        };
        let layout = reflow_verses(&[verse(1, &words(30, "w"))], cfg);
        assert_eq!(layout.lines.len(), 2);
        assert_eq!(layout.words_per_line, usize::MAX);
        assert_eq!(layout.lines[0].word_count(), 30);
        assert_eq!(layout.dropped_words, 0);
    }

    #[test]
    fn suras_follow_reading_order() {
        let mut verses = vec![verse(285, "a"), verse(286, "b")];
        verses.push(Verse {
            index: 294,
            sura: 3,
            aya: 1,
            text: "c".to_string(),
        });
        let layout = reflow_verses(&verses, ReflowConfig::default());
        assert_eq!(layout.suras, vec![2, 3]);
        assert!(reflow_verses(&[], ReflowConfig::default()).suras.is_empty());
    }

    #[test]
    fn display_text_inserts_ornaments() {
        let layout = reflow_verses(&[verse(7, "x y")], ReflowConfig::default());
        assert_eq!(layout.lines[0].display_text(), "x y \u{FD3F}7\u{FD3E}");
    }

    #[test]
    fn reflow_page_records_page_number() {
        let page = Page::new(2, vec![verse(1, "alif lam mim")]).expect("valid page");
        let layout = reflow_page(&page, ReflowConfig::default());
        assert_eq!(layout.page_number, Some(2));
        assert_eq!(layout.lines[0].marker_at(2), Some(1));
    }
}
