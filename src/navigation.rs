//! Page navigation: clamping, spread pairing, and reference resolution.
//!
//! All functions take the current position explicitly and return the next
//! one; there is no ambient page counter. Page numbers are clamped into
//! `1..=total` and never wrap.
//!
//! # Usage
//!
//! ```rust
//! use mushaf_stream::navigation::{DisplayMode, NavAction, PageIndex};
//! use mushaf_stream::MemorySource;
//!
//! let index = PageIndex::new(604, DisplayMode::Spread);
//! let lookup = MemorySource::new();
//! let next = index.apply(1, NavAction::Next, &lookup).unwrap();
//! assert_eq!(next, 3);
//! assert_eq!(index.spread(next).right, Some(4));
//! ```

extern crate alloc;

use crate::error::MushafError;
use crate::source::ReferenceLookup;
use crate::suras::validate_reference;

/// Clamp an arbitrary request into `1..=total`.
///
/// A `total` of zero is treated as a one-page collection.
pub fn clamp_page(requested: i64, total: u16) -> u16 {
    let upper = i64::from(total.max(1));
    // `clamp` keeps the value inside u16 range, so the conversion is lossless.
    u16::try_from(requested.clamp(1, upper)).unwrap_or(1)
}

/// Accept `requested` only when it is a valid page.
///
/// The error carries enough to apply the clamp policy via
/// [`MushafError::clamped`].
pub fn go_to_page(requested: i64, total: u16) -> Result<u16, MushafError> {
    if requested >= 1 && requested <= i64::from(total) {
        Ok(clamp_page(requested, total))
    } else {
        Err(MushafError::OutOfRange { requested, total })
    }
}

/// Two-page display pair.
///
/// `right` is `None` when `left` is the final page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Spread {
    /// Page shown first in reading order.
    pub left: u16,
    /// Facing page, if one exists.
    pub right: Option<u16>,
}

impl Spread {
    /// Pages in this spread, in reading order.
    pub fn pages(&self) -> impl Iterator<Item = u16> {
        core::iter::once(self.left).chain(self.right)
    }
}

/// Pair `current` with its facing page.
pub fn next_spread(current: u16, total: u16) -> Spread {
    let right = current.checked_add(1).filter(|next| *next <= total);
    Spread {
        left: current,
        right,
    }
}

/// Move by `step` pages, clamped to the collection.
pub fn advance(current: u16, step: i32, total: u16) -> u16 {
    clamp_page(i64::from(current) + i64::from(step), total)
}

/// Resolve a sura/aya reference to a page number.
///
/// The reference is checked against the sura table before the collaborator
/// is consulted. Pages the collaborator reports outside `1..=total` are
/// clamped.
pub fn resolve_by_reference<L>(
    lookup: &L,
    sura: i64,
    aya: i64,
    total: u16,
) -> Result<u16, MushafError>
where
    L: ReferenceLookup + ?Sized,
{
    let verse = validate_reference(sura, aya)?;
    let page = lookup.lookup_page(verse.sura, verse.aya).map_err(|err| match err {
        MushafError::NotFound { .. } => {
            MushafError::Lookup(alloc::format!("no page holds {}", verse))
        }
        other => other,
    })?;
    let clamped = clamp_page(i64::from(page), total);
    if clamped != page {
        log::warn!(
            "lookup for {} returned page {} outside 1..={}, clamped to {}",
            verse,
            page,
            total,
            clamped
        );
    }
    Ok(clamped)
}

/// Parse the "go to page" input box.
pub fn parse_page_input(input: &str, total: u16) -> Result<u16, MushafError> {
    let trimmed = input.trim();
    let requested: i64 = trimmed
        .parse()
        .map_err(|_| MushafError::Decode(alloc::format!("'{}' is not a page number", trimmed)))?;
    go_to_page(requested, total)
}

/// Single page or facing-page display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisplayMode {
    /// One page at a time.
    Single,
    /// Two facing pages.
    #[default]
    Spread,
}

impl DisplayMode {
    /// Pages moved by one previous/next action.
    pub fn step(self) -> i32 {
        match self {
            Self::Single => 1,
            Self::Spread => 2,
        }
    }

    /// Mode for a viewport width; wide screens show spreads.
    pub fn for_viewport(width_px: u32) -> Self {
        if width_px >= 1024 {
            Self::Spread
        } else {
            Self::Single
        }
    }
}

/// User navigation intent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavAction {
    /// Go to page 1.
    First,
    /// Step backward by the mode's step.
    Previous,
    /// Step forward by the mode's step.
    Next,
    /// Go to the final page (or final spread).
    Last,
    /// Jump to a typed page number.
    Jump(i64),
    /// Jump to the page holding a sura/aya.
    Reference {
        /// Sura id.
        sura: i64,
        /// Aya number.
        aya: i64,
    },
}

/// Navigation rules for one collection and display mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageIndex {
    /// Number of pages in the collection.
    pub total_pages: u16,
    /// Active display mode.
    pub mode: DisplayMode,
}

impl Default for PageIndex {
    fn default() -> Self {
        Self::new(crate::model::TOTAL_PAGES, DisplayMode::default())
    }
}

impl PageIndex {
    /// Create an index.
    pub fn new(total_pages: u16, mode: DisplayMode) -> Self {
        Self {
            total_pages: total_pages.max(1),
            mode,
        }
    }

    /// Same index with a different display mode.
    pub fn with_mode(self, mode: DisplayMode) -> Self {
        Self { mode, ..self }
    }

    /// First page of the final view.
    ///
    /// In spread mode this is `total - 1` so the last spread shows two pages.
    pub fn last_start(&self) -> u16 {
        match self.mode {
            DisplayMode::Single => self.total_pages,
            DisplayMode::Spread => self.total_pages.saturating_sub(1).max(1),
        }
    }

    /// Whether a previous action would move.
    pub fn can_go_previous(&self, current: u16) -> bool {
        current > 1
    }

    /// Whether a next action would move past the current view.
    pub fn can_go_next(&self, current: u16) -> bool {
        match self.mode {
            DisplayMode::Single => current < self.total_pages,
            DisplayMode::Spread => next_spread(current, self.total_pages)
                .right
                .is_some_and(|right| right < self.total_pages),
        }
    }

    /// Pages visible when `current` is the first page of the view.
    pub fn spread(&self, current: u16) -> Spread {
        let current = clamp_page(i64::from(current), self.total_pages);
        match self.mode {
            DisplayMode::Single => Spread {
                left: current,
                right: None,
            },
            DisplayMode::Spread => next_spread(current, self.total_pages),
        }
    }

    /// Apply `action` to `current`, returning the new first page.
    ///
    /// Out-of-range jumps and unresolved references are errors; the caller
    /// keeps `current` in that case.
    pub fn apply<L>(&self, current: u16, action: NavAction, lookup: &L) -> Result<u16, MushafError>
    where
        L: ReferenceLookup + ?Sized,
    {
        let next = match action {
            NavAction::First => 1,
            NavAction::Previous => advance(current, -self.mode.step(), self.total_pages),
            NavAction::Next => advance(current, self.mode.step(), self.total_pages),
            NavAction::Last => self.last_start(),
            NavAction::Jump(requested) => go_to_page(requested, self.total_pages)?,
            NavAction::Reference { sura, aya } => {
                resolve_by_reference(lookup, sura, aya, self.total_pages)?
            }
        };
        log::debug!("navigate {:?}: {} -> {}", action, current, next);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    struct FixedLookup(Result<u16, MushafError>);

    impl ReferenceLookup for FixedLookup {
        fn lookup_page(&self, _sura: u8, _aya: u16) -> Result<u16, MushafError> {
            self.0.clone()
        }
    }

    #[test]
    fn go_to_page_accepts_in_range() {
        assert_eq!(go_to_page(300, 604), Ok(300));
        assert_eq!(go_to_page(1, 604), Ok(1));
        assert_eq!(go_to_page(604, 604), Ok(604));
    }

    #[test]
    fn go_to_page_rejects_and_reports_clamp() {
        let low = go_to_page(0, 604).unwrap_err();
        let high = go_to_page(605, 604).unwrap_err();
        assert_eq!(low.clamped(), Some(1));
        assert_eq!(high.clamped(), Some(604));
        assert_eq!(clamp_page(0, 604), 1);
        assert_eq!(clamp_page(-40, 604), 1);
        assert_eq!(clamp_page(605, 604), 604);
        assert_eq!(clamp_page(i64::MAX, 604), 604);
    }

    #[test]
    fn next_spread_omits_page_past_end() {
        assert_eq!(
            next_spread(1, 604),
            Spread {
                left: 1,
                right: Some(2)
            }
        );
        assert_eq!(
            next_spread(603, 604),
            Spread {
                left: 603,
                right: Some(604)
            }
        );
        assert_eq!(
            next_spread(604, 604),
            Spread {
                left: 604,
                right: None
            }
        );
        assert_eq!(next_spread(u16::MAX, u16::MAX).right, None);
    }

    #[test]
    fn advance_clamps_both_directions() {
        assert_eq!(advance(1, -2, 604), 1);
        assert_eq!(advance(2, -2, 604), 1);
        assert_eq!(advance(603, 2, 604), 604);
        assert_eq!(advance(10, 1, 604), 11);
        assert_eq!(advance(10, -1, 604), 9);
    }

    #[test]
    fn resolve_by_reference_validates_before_lookup() {
        let lookup = FixedLookup(Ok(2));
        assert_eq!(resolve_by_reference(&lookup, 2, 1, 604), Ok(2));
        assert!(matches!(
            resolve_by_reference(&lookup, 115, 1, 604),
            Err(MushafError::Lookup(_))
        ));
        assert!(matches!(
            resolve_by_reference(&lookup, 1, 9, 604),
            Err(MushafError::Lookup(_))
        ));
    }

    #[test]
    fn resolve_by_reference_maps_not_found_and_clamps() {
        let missing = FixedLookup(Err(MushafError::NotFound { page: 0 }));
        assert!(matches!(
            resolve_by_reference(&missing, 2, 1, 604),
            Err(MushafError::Lookup(_))
        ));
        let network = FixedLookup(Err(MushafError::Network("down".into())));
        assert!(matches!(
            resolve_by_reference(&network, 2, 1, 604),
            Err(MushafError::Network(_))
        ));
        let wild = FixedLookup(Ok(900));
        assert_eq!(resolve_by_reference(&wild, 2, 1, 604), Ok(604));
    }

    #[test]
    fn parse_page_input_trims_and_validates() {
        assert_eq!(parse_page_input(" 42 ", 604), Ok(42));
        assert!(matches!(
            parse_page_input("abc", 604),
            Err(MushafError::Decode(_))
        ));
        assert!(matches!(
            parse_page_input("0", 604),
            Err(MushafError::OutOfRange { .. })
        ));
    }

    #[test]
    fn spread_index_steps_by_two_and_lands_on_final_pair() {
        let index = PageIndex::new(604, DisplayMode::Spread);
        let lookup = MemorySource::new();
        assert_eq!(index.apply(1, NavAction::Next, &lookup), Ok(3));
        assert_eq!(index.apply(3, NavAction::Previous, &lookup), Ok(1));
        assert_eq!(index.apply(2, NavAction::Previous, &lookup), Ok(1));
        assert_eq!(index.apply(1, NavAction::Last, &lookup), Ok(603));
        assert_eq!(index.spread(603).right, Some(604));
        assert_eq!(index.apply(500, NavAction::First, &lookup), Ok(1));
    }

    #[test]
    fn single_index_steps_by_one() {
        let index = PageIndex::new(604, DisplayMode::Single);
        let lookup = MemorySource::new();
        assert_eq!(index.apply(1, NavAction::Next, &lookup), Ok(2));
        assert_eq!(index.apply(604, NavAction::Next, &lookup), Ok(604));
        assert_eq!(index.apply(10, NavAction::Last, &lookup), Ok(604));
        assert_eq!(index.spread(10).right, None);
    }

    #[test]
    fn jump_rejects_out_of_range_without_moving() {
        let index = PageIndex::default();
        let lookup = MemorySource::new();
        assert_eq!(index.apply(5, NavAction::Jump(300), &lookup), Ok(300));
        assert!(index.apply(5, NavAction::Jump(605), &lookup).is_err());
        assert!(index.apply(5, NavAction::Jump(0), &lookup).is_err());
    }

    #[test]
    fn pager_button_rules() {
        let spread = PageIndex::new(604, DisplayMode::Spread);
        assert!(!spread.can_go_previous(1));
        assert!(spread.can_go_previous(2));
        assert!(spread.can_go_next(601));
        assert!(!spread.can_go_next(603));
        assert!(!spread.can_go_next(604));
        let single = spread.with_mode(DisplayMode::Single);
        assert!(single.can_go_next(603));
        assert!(!single.can_go_next(604));
    }

    #[test]
    fn display_mode_follows_viewport() {
        assert_eq!(DisplayMode::for_viewport(1280), DisplayMode::Spread);
        assert_eq!(DisplayMode::for_viewport(800), DisplayMode::Single);
        assert_eq!(DisplayMode::Spread.step(), 2);
        assert_eq!(DisplayMode::Single.step(), 1);
    }

    #[test]
    fn spread_pages_iterates_in_order() {
        let pages: Vec<u16> = next_spread(10, 604).pages().collect();
        assert_eq!(pages, vec![10, 11]);
        let last: Vec<u16> = next_spread(604, 604).pages().collect();
        assert_eq!(last, vec![604]);
    }
}
