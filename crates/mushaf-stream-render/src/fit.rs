//! Uniform font-size search over a fixed line box.
//!
//! The search is a plain binary search over integer pixel sizes. A size is
//! feasible when every non-empty line fits the box width and the per-line
//! height budget (`box.height / lines_per_page * safety_factor`). The largest
//! feasible size wins; when none is feasible the minimum size is used and a
//! soft [`LayoutOverflow`] is reported.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::engine::RenderEngineError;
use crate::measure::{TextExtent, TextMeasurer};
use crate::reflow::{Line, LINES_PER_PAGE};

/// Cancellation hook polled once per search iteration.
pub trait CancelToken {
    /// Whether the caller no longer wants the result.
    fn is_cancelled(&self) -> bool;
}

/// Never-cancel token for default call paths.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverCancel;

impl CancelToken for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Hands out tokens where only the most recent one stays live.
///
/// Call [`begin`](Self::begin) on every viewport resize; searches running
/// with older tokens stop at their next iteration.
#[derive(Clone, Debug, Default)]
pub struct FitGeneration {
    current: Arc<AtomicU64>,
}

impl FitGeneration {
    /// Fresh generation counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Supersede every outstanding token and return a new live one.
    pub fn begin(&self) -> GenerationToken {
        let id = self.current.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
        GenerationToken {
            id,
            current: Arc::clone(&self.current),
        }
    }

    /// Id of the live generation.
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }
}

/// Token tied to one [`FitGeneration`] id.
#[derive(Clone, Debug)]
pub struct GenerationToken {
    id: u64,
    current: Arc<AtomicU64>,
}

impl GenerationToken {
    /// Generation id this token belongs to.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl CancelToken for GenerationToken {
    fn is_cancelled(&self) -> bool {
        self.current.load(Ordering::Acquire) != self.id
    }
}

/// Inclusive integer font-size bounds in px.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FontSizeRange {
    /// Smallest candidate size.
    pub min_px: u32,
    /// Largest candidate size.
    pub max_px: u32,
}

impl FontSizeRange {
    /// Bounds with `min_px >= 1`; reversed arguments are swapped.
    pub fn new(min_px: u32, max_px: u32) -> Self {
        let (lo, hi) = if min_px <= max_px {
            (min_px, max_px)
        } else {
            (max_px, min_px)
        };
        Self {
            min_px: lo.max(1),
            max_px: hi.max(1),
        }
    }

    /// Bounds for a viewport width, following the reader's breakpoints.
    pub fn for_viewport(width_px: u32) -> Self {
        match width_px {
            0..=639 => Self::new(12, 24),
            640..=767 => Self::new(14, 28),
            768..=1023 => Self::new(16, 32),
            _ => Self::new(18, 40),
        }
    }

    /// Number of candidate sizes, saturating at `u32::MAX`.
    pub fn len(&self) -> u32 {
        if self.is_empty() {
            return 0;
        }
        (self.max_px - self.min_px).saturating_add(1)
    }

    /// Whether the bounds are reversed. Only reachable through a struct
    /// literal; [`new`](Self::new) always yields a non-empty range.
    pub fn is_empty(&self) -> bool {
        self.min_px > self.max_px
    }

    /// Upper bound on search iterations: `floor(log2(len)) + 1`.
    pub fn max_iterations(&self) -> u32 {
        u32::BITS - self.len().leading_zeros()
    }
}

impl Default for FontSizeRange {
    fn default() -> Self {
        Self::new(18, 40)
    }
}

/// Target box for the page's text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct RenderBox {
    /// Available width in px.
    pub width: f32,
    /// Available height in px for all lines together.
    pub height: f32,
}

impl RenderBox {
    /// Box of the given size.
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Search configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FitConfig {
    /// Candidate sizes.
    pub range: FontSizeRange,
    /// Fraction of the per-line height actually usable.
    pub safety_factor: f32,
    /// Lines the box height is shared between, whether or not they carry
    /// words.
    pub lines_per_page: usize,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            range: FontSizeRange::default(),
            safety_factor: 0.96,
            lines_per_page: LINES_PER_PAGE,
        }
    }
}

impl FitConfig {
    /// Config with bounds for a viewport width.
    pub fn for_viewport(width_px: u32) -> Self {
        Self {
            range: FontSizeRange::for_viewport(width_px),
            ..Self::default()
        }
    }

    fn line_height_budget(&self, bx: RenderBox) -> f32 {
        let safety = self.safety_factor.clamp(0.0, 1.0);
        bx.height / self.lines_per_page.max(1) as f32 * safety
    }
}

/// Content that does not fit even at the minimum size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LayoutOverflow {
    /// Worst offending line.
    pub line_index: usize,
    /// Its measured extent at the minimum size.
    pub measured: TextExtent,
    /// Box width it had to fit.
    pub box_width: f32,
    /// Per-line height budget it had to fit.
    pub line_height_budget: f32,
}

/// Search result.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FontFit {
    /// Chosen uniform size.
    pub size_px: u32,
    /// Iterations the search ran.
    pub iterations: u32,
    /// Present when the minimum size still overflowed.
    pub overflow: Option<LayoutOverflow>,
}

impl FontFit {
    /// Whether the page renders without clipping.
    pub fn fits(&self) -> bool {
        self.overflow.is_none()
    }
}

/// Largest-overflow line at `size_px`, measured as the worse of the width
/// and height ratios.
fn worst_overflow(
    lines: &[Line],
    size_px: u32,
    bx: RenderBox,
    budget: f32,
    measurer: &dyn TextMeasurer,
) -> Option<LayoutOverflow> {
    let mut worst: Option<(f32, LayoutOverflow)> = None;
    for (line_index, line) in lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        let measured = measurer.measure(&line.text, size_px);
        if measured.width <= bx.width && measured.height <= budget {
            continue;
        }
        let score = ratio(measured.width, bx.width).max(ratio(measured.height, budget));
        if worst.as_ref().is_none_or(|(r, _)| score > *r) {
            worst = Some((
                score,
                LayoutOverflow {
                    line_index,
                    measured,
                    box_width: bx.width,
                    line_height_budget: budget,
                },
            ));
        }
    }
    worst.map(|(_, overflow)| overflow)
}

fn ratio(value: f32, limit: f32) -> f32 {
    if limit <= 0.0 {
        f32::INFINITY
    } else {
        value / limit
    }
}

fn fits_all(
    lines: &[Line],
    size_px: u32,
    bx: RenderBox,
    budget: f32,
    measurer: &dyn TextMeasurer,
) -> bool {
    lines.iter().filter(|line| !line.is_empty()).all(|line| {
        let measured = measurer.measure(&line.text, size_px);
        measured.width <= bx.width && measured.height <= budget
    })
}

/// Find the largest size at which every line fits `bx`.
pub fn fit_font_size(
    lines: &[Line],
    bx: RenderBox,
    cfg: FitConfig,
    measurer: &dyn TextMeasurer,
) -> FontFit {
    match fit_font_size_with_cancel(lines, bx, cfg, measurer, &NeverCancel) {
        Ok(fit) => fit,
        // NeverCancel cannot trip; fall back to the floor size.
        Err(_) => FontFit {
            size_px: cfg.range.min_px,
            iterations: 0,
            overflow: None,
        },
    }
}

/// [`fit_font_size`] that stops when `cancel` trips.
pub fn fit_font_size_with_cancel(
    lines: &[Line],
    bx: RenderBox,
    cfg: FitConfig,
    measurer: &dyn TextMeasurer,
    cancel: &dyn CancelToken,
) -> Result<FontFit, RenderEngineError> {
    let range = FontSizeRange::new(cfg.range.min_px, cfg.range.max_px);
    let budget = cfg.line_height_budget(bx);
    let mut lo = range.min_px;
    let mut hi = range.max_px;
    let mut best: Option<u32> = None;
    let mut iterations = 0u32;

    while lo <= hi {
        if cancel.is_cancelled() {
            return Err(RenderEngineError::Cancelled);
        }
        iterations += 1;
        let mid = lo + (hi - lo) / 2;
        if fits_all(lines, mid, bx, budget, measurer) {
            log::trace!("font fit: {}px fits", mid);
            best = Some(mid);
            match mid.checked_add(1) {
                Some(next) => lo = next,
                None => break,
            }
        } else {
            log::trace!("font fit: {}px overflows", mid);
            // `mid >= min_px >= 1`, so this never underflows.
            hi = mid - 1;
        }
    }

    let fit = match best {
        Some(size_px) => FontFit {
            size_px,
            iterations,
            overflow: None,
        },
        None => {
            let overflow = worst_overflow(lines, range.min_px, bx, budget, measurer);
            if let Some(o) = &overflow {
                log::warn!(
                    "line {} overflows at minimum {}px ({:.1}x{:.1} in {:.1}x{:.1})",
                    o.line_index,
                    range.min_px,
                    o.measured.width,
                    o.measured.height,
                    o.box_width,
                    o.line_height_budget
                );
            }
            FontFit {
                size_px: range.min_px,
                iterations,
                overflow,
            }
        }
    };
    log::debug!(
        "font fit: {}px after {} iterations in [{}, {}]",
        fit.size_px,
        fit.iterations,
        range.min_px,
        range.max_px
    );
    Ok(fit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflow::{reflow_verses, ReflowConfig};
    use mushaf_stream::Verse;

    /// Every char is `size` px wide and lines are `size` px tall.
    fn mono(text: &str, size: u32) -> TextExtent {
        TextExtent {
            width: text.chars().count() as f32 * size as f32,
            height: size as f32,
        }
    }

    fn line(text: &str) -> Line {
        let verse = Verse {
            index: 1,
            sura: 1,
            aya: 1,
            text: text.to_string(),
        };
        reflow_verses(&[verse], ReflowConfig::default())
            .lines
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    fn page(lines: &[&str]) -> Vec<Line> {
        let mut out: Vec<Line> = lines.iter().map(|t| line(t)).collect();
        out.resize_with(15, Line::empty);
        out
    }

    #[test]
    fn picks_largest_size_that_fits_width() {
        // 10 chars; width 200 allows 20px.
        let lines = page(&["abcde fghi"]);
        let cfg = FitConfig {
            range: FontSizeRange::new(10, 40),
            safety_factor: 1.0,
            ..FitConfig::default()
        };
        let fit = fit_font_size(&lines, RenderBox::new(200.0, 15.0 * 100.0), cfg, &mono);
        assert_eq!(fit.size_px, 20);
        assert!(fit.fits());
    }

    #[test]
    fn height_budget_limits_size() {
        let lines = page(&["ab"]);
        let cfg = FitConfig {
            range: FontSizeRange::new(10, 40),
            safety_factor: 0.5,
            ..FitConfig::default()
        };
        // budget = 600 / 15 * 0.5 = 20
        let fit = fit_font_size(&lines, RenderBox::new(10_000.0, 600.0), cfg, &mono);
        assert_eq!(fit.size_px, 20);
    }

    #[test]
    fn widest_line_governs_whole_page() {
        let lines = page(&["ab", "abcdefghij", "abc"]);
        let cfg = FitConfig {
            range: FontSizeRange::new(1, 100),
            safety_factor: 1.0,
            ..FitConfig::default()
        };
        let fit = fit_font_size(&lines, RenderBox::new(100.0, 10_000.0), cfg, &mono);
        assert_eq!(fit.size_px, 10);
    }

    #[test]
    fn overflow_at_minimum_is_soft() {
        let lines = page(&["short", "muchlongerword"]);
        let cfg = FitConfig {
            range: FontSizeRange::new(10, 20),
            safety_factor: 1.0,
            ..FitConfig::default()
        };
        let fit = fit_font_size(&lines, RenderBox::new(60.0, 10_000.0), cfg, &mono);
        assert_eq!(fit.size_px, 10);
        let overflow = fit.overflow.expect("overflow reported");
        assert_eq!(overflow.line_index, 1);
        assert_eq!(overflow.measured.width, 140.0);
    }

    #[test]
    fn empty_page_takes_maximum() {
        let lines = page(&[]);
        let fit = fit_font_size(&lines, RenderBox::new(1.0, 1.0), FitConfig::default(), &mono);
        assert_eq!(fit.size_px, FontSizeRange::default().max_px);
        assert!(fit.fits());
    }

    #[test]
    fn iteration_bound_matches_range() {
        assert_eq!(FontSizeRange::new(1, 1).max_iterations(), 1);
        assert_eq!(FontSizeRange::new(1, 2).max_iterations(), 2);
        assert_eq!(FontSizeRange::new(1, 16).max_iterations(), 5);
        assert_eq!(FontSizeRange::new(18, 40).max_iterations(), 5);
        let lines = page(&["abc"]);
        for width in [1.0, 30.0, 60.0, 500.0, 5_000.0] {
            let cfg = FitConfig {
                range: FontSizeRange::new(18, 40),
                safety_factor: 1.0,
                ..FitConfig::default()
            };
            let fit = fit_font_size(&lines, RenderBox::new(width, 10_000.0), cfg, &mono);
            assert!(fit.iterations <= cfg.range.max_iterations());
            assert!((18..=40).contains(&fit.size_px));
        }
    }

    #[test]
    fn reversed_range_is_normalized() {
        let range = FontSizeRange::new(30, 10);
        assert_eq!((range.min_px, range.max_px), (10, 30));
        assert_eq!(FontSizeRange::new(0, 0).min_px, 1);
        assert_eq!(FontSizeRange::for_viewport(375), FontSizeRange::new(12, 24));
        assert_eq!(FontSizeRange::for_viewport(1440), FontSizeRange::new(18, 40));
    }

    #[test]
    fn unbounded_range_does_not_overflow() {
        let lines = vec![Line::empty(); 15];
        let cfg = FitConfig {
            range: FontSizeRange::new(1, u32::MAX),
            ..FitConfig::default()
        };
        let fit = fit_font_size(&lines, RenderBox::new(100.0, 100.0), cfg, &mono);
        assert_eq!(fit.size_px, u32::MAX);
        assert!(fit.iterations <= cfg.range.max_iterations());
        assert_eq!(cfg.range.len(), u32::MAX);
    }

    #[test]
    fn reversed_literal_range_is_empty() {
        let range = FontSizeRange {
            min_px: 10,
            max_px: 5,
        };
        assert!(range.is_empty());
        assert_eq!(range.len(), 0);
        assert_eq!(range.max_iterations(), 0);
        assert!(!FontSizeRange::new(10, 5).is_empty());

        let cfg = FitConfig {
            range,
            safety_factor: 1.0,
            ..FitConfig::default()
        };
        let fit = fit_font_size(&page(&["ab"]), RenderBox::new(1_000.0, 10_000.0), cfg, &mono);
        assert_eq!(fit.size_px, 10);
    }

    #[test]
    fn height_budget_ignores_slice_length() {
        let full = page(&["ab"]);
        let words_only: Vec<Line> = full.iter().filter(|l| !l.is_empty()).cloned().collect();
        let cfg = FitConfig {
            range: FontSizeRange::new(1, 400),
            safety_factor: 1.0,
            ..FitConfig::default()
        };
        let bx = RenderBox::new(10_000.0, 1_500.0);
        let a = fit_font_size(&full, bx, cfg, &mono);
        let b = fit_font_size(&words_only, bx, cfg, &mono);
        assert_eq!(a.size_px, 100);
        assert_eq!(a.size_px, b.size_px);
    }

    #[test]
    fn superseded_generation_cancels_search() {
        let generation = FitGeneration::new();
        let stale = generation.begin();
        let live = generation.begin();
        assert!(stale.is_cancelled());
        assert!(!live.is_cancelled());
        assert_eq!(generation.current(), live.id());

        let lines = page(&["abc"]);
        let bx = RenderBox::new(100.0, 100.0);
        let result = fit_font_size_with_cancel(&lines, bx, FitConfig::default(), &mono, &stale);
        assert!(matches!(result, Err(RenderEngineError::Cancelled)));
        let result = fit_font_size_with_cancel(&lines, bx, FitConfig::default(), &mono, &live);
        assert!(result.is_ok());
    }
}
