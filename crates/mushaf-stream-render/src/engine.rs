use mushaf_stream::{MushafError, Page, PageSource, Spread};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::fit::{
    fit_font_size_with_cancel, CancelToken, FitConfig, FontFit, LayoutOverflow, NeverCancel,
    RenderBox,
};
use crate::measure::{HeuristicMeasurer, TextMeasurer};
use crate::reflow::{reflow_page, PageLayout, ReflowConfig};

/// Runtime diagnostics from layout and fitting.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderDiagnostic {
    /// Words were dropped because the page packed past its line count.
    Truncated { page: u16, dropped_words: usize },
    /// No candidate size fit; rendering proceeds at the minimum.
    LayoutOverflow { page: u16, overflow: LayoutOverflow },
    FitCompleted {
        page: u16,
        size_px: u32,
        iterations: u32,
    },
    /// A newer request superseded this one.
    Cancelled { page: u16 },
}

type DiagnosticCallback = Arc<Mutex<Box<dyn FnMut(RenderDiagnostic) + Send + 'static>>>;
type DiagnosticSink = Option<DiagnosticCallback>;

/// Render-engine options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct RenderEngineOptions {
    /// Word packing.
    pub reflow: ReflowConfig,
    /// Font-size search.
    pub fit: FitConfig,
}

impl RenderEngineOptions {
    /// Options for a viewport width.
    pub fn for_viewport(width_px: u32) -> Self {
        Self {
            reflow: ReflowConfig::default(),
            fit: FitConfig::for_viewport(width_px),
        }
    }
}

/// One laid-out page with its fitted size.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderedPage {
    /// Packed lines.
    pub layout: PageLayout,
    /// Size search result for this page alone.
    pub font: FontFit,
}

/// Facing pages sharing one font size.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderedSpread {
    /// First page in reading order.
    pub left: RenderedPage,
    /// Facing page, absent at the end of the book.
    pub right: Option<RenderedPage>,
    /// Size both pages render at: the smaller of the two fits.
    pub font_size_px: u32,
}

impl RenderedSpread {
    /// Pages in reading order.
    pub fn pages(&self) -> impl Iterator<Item = &RenderedPage> {
        core::iter::once(&self.left).chain(self.right.as_ref())
    }
}

/// Packs pages into lines and fits them to a box.
#[derive(Clone)]
pub struct RenderEngine {
    opts: RenderEngineOptions,
    measurer: Arc<dyn TextMeasurer>,
    diagnostic_sink: DiagnosticSink,
}

impl fmt::Debug for RenderEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderEngine")
            .field("opts", &self.opts)
            .field("has_diagnostic_sink", &self.diagnostic_sink.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for RenderEngine {
    fn default() -> Self {
        Self::new(RenderEngineOptions::default())
    }
}

impl RenderEngine {
    /// Engine with the heuristic measurer installed.
    pub fn new(opts: RenderEngineOptions) -> Self {
        Self {
            opts,
            measurer: Arc::new(HeuristicMeasurer::default()),
            diagnostic_sink: None,
        }
    }

    /// Replace the text measurer.
    pub fn with_text_measurer(mut self, measurer: Arc<dyn TextMeasurer>) -> Self {
        self.measurer = measurer;
        self
    }

    /// Register or replace the diagnostics sink.
    pub fn set_diagnostic_sink<F>(&mut self, sink: F)
    where
        F: FnMut(RenderDiagnostic) + Send + 'static,
    {
        self.diagnostic_sink = Some(Arc::new(Mutex::new(Box::new(sink))));
    }

    fn emit_diagnostic(&self, diagnostic: RenderDiagnostic) {
        let Some(sink) = &self.diagnostic_sink else {
            return;
        };
        if let Ok(mut sink) = sink.lock() {
            sink(diagnostic);
        }
    }

    /// Active options.
    pub fn options(&self) -> RenderEngineOptions {
        self.opts
    }

    /// Same engine with the fit bounds for a new viewport width.
    pub fn resized(&self, width_px: u32) -> Self {
        let mut next = self.clone();
        next.opts.fit.range = crate::fit::FontSizeRange::for_viewport(width_px);
        next
    }

    /// Pack a page's verses into lines.
    pub fn layout_page(&self, page: &Page) -> PageLayout {
        let layout = reflow_page(page, self.opts.reflow);
        if layout.is_truncated() {
            self.emit_diagnostic(RenderDiagnostic::Truncated {
                page: page.number,
                dropped_words: layout.dropped_words,
            });
        }
        layout
    }

    /// Pack and fit one page.
    pub fn render_page(&self, page: &Page, bx: RenderBox) -> RenderedPage {
        match self.render_page_with_cancel(page, bx, &NeverCancel) {
            Ok(rendered) => rendered,
            Err(_) => RenderedPage {
                layout: self.layout_page(page),
                font: FontFit {
                    size_px: self.opts.fit.range.min_px,
                    iterations: 0,
                    overflow: None,
                },
            },
        }
    }

    /// [`render_page`](Self::render_page) that stops when `cancel` trips.
    pub fn render_page_with_cancel(
        &self,
        page: &Page,
        bx: RenderBox,
        cancel: &dyn CancelToken,
    ) -> Result<RenderedPage, RenderEngineError> {
        let layout = self.layout_page(page);
        // The box height is shared by every reflowed line, padding included.
        let fit = FitConfig {
            lines_per_page: layout.lines.len(),
            ..self.opts.fit
        };
        let font = match fit_font_size_with_cancel(&layout.lines, bx, fit, &*self.measurer, cancel) {
            Ok(font) => font,
            Err(err) => {
                self.emit_diagnostic(RenderDiagnostic::Cancelled { page: page.number });
                return Err(err);
            }
        };
        if let Some(overflow) = font.overflow {
            self.emit_diagnostic(RenderDiagnostic::LayoutOverflow {
                page: page.number,
                overflow,
            });
        }
        self.emit_diagnostic(RenderDiagnostic::FitCompleted {
            page: page.number,
            size_px: font.size_px,
            iterations: font.iterations,
        });
        Ok(RenderedPage { layout, font })
    }

    /// Pack and fit facing pages to one shared size.
    pub fn render_spread(&self, left: &Page, right: Option<&Page>, bx: RenderBox) -> RenderedSpread {
        let left = self.render_page(left, bx);
        let right = right.map(|page| self.render_page(page, bx));
        Self::join_spread(left, right)
    }

    /// [`render_spread`](Self::render_spread) that stops when `cancel` trips.
    pub fn render_spread_with_cancel(
        &self,
        left: &Page,
        right: Option<&Page>,
        bx: RenderBox,
        cancel: &dyn CancelToken,
    ) -> Result<RenderedSpread, RenderEngineError> {
        let left = self.render_page_with_cancel(left, bx, cancel)?;
        let right = match right {
            Some(page) => Some(self.render_page_with_cancel(page, bx, cancel)?),
            None => None,
        };
        Ok(Self::join_spread(left, right))
    }

    fn join_spread(left: RenderedPage, right: Option<RenderedPage>) -> RenderedSpread {
        let font_size_px = right
            .as_ref()
            .map_or(left.font.size_px, |r| r.font.size_px.min(left.font.size_px));
        RenderedSpread {
            left,
            right,
            font_size_px,
        }
    }

    /// Fetch the pages of `spread` from `source`, then lay them out.
    ///
    /// A missing facing page is dropped rather than failing the spread;
    /// any other fetch error is returned.
    pub fn fetch_and_render<S>(
        &self,
        source: &S,
        spread: Spread,
        bx: RenderBox,
        cancel: &dyn CancelToken,
    ) -> Result<RenderedSpread, RenderEngineError>
    where
        S: PageSource + ?Sized,
    {
        let left = source.fetch_page(spread.left)?;
        let right = match spread.right.map(|n| source.fetch_page(n)) {
            Some(Ok(page)) => Some(page),
            Some(Err(MushafError::NotFound { page })) => {
                log::debug!("facing page {} not available, rendering single", page);
                None
            }
            Some(Err(err)) => return Err(err.into()),
            None => None,
        };
        self.render_spread_with_cancel(&left, right.as_ref(), bx, cancel)
    }
}

/// Render engine error.
#[derive(Debug)]
pub enum RenderEngineError {
    /// A page fetch or lookup failed.
    Source(MushafError),
    /// A newer request superseded this one.
    Cancelled,
}

impl fmt::Display for RenderEngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source(err) => write!(f, "page source failed: {}", err),
            Self::Cancelled => write!(f, "render cancelled"),
        }
    }
}

impl std::error::Error for RenderEngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Source(err) => Some(err),
            Self::Cancelled => None,
        }
    }
}

impl From<MushafError> for RenderEngineError {
    fn from(value: MushafError) -> Self {
        Self::Source(value)
    }
}
