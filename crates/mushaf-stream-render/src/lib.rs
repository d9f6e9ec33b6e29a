//! Line reflow, font fitting, and spread orchestration for `mushaf-stream`.

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

mod engine;
mod fit;
mod measure;
mod reflow;

pub use engine::{
    RenderDiagnostic, RenderEngine, RenderEngineError, RenderEngineOptions, RenderedPage,
    RenderedSpread,
};
pub use fit::{
    fit_font_size, fit_font_size_with_cancel, CancelToken, FitConfig, FitGeneration, FontFit,
    FontSizeRange, GenerationToken, LayoutOverflow, NeverCancel, RenderBox,
};
pub use measure::{HeuristicMeasurer, TextExtent, TextMeasurer};
pub use mushaf_stream::{Page, Spread, Verse};
pub use reflow::{
    is_numeric_token, page_words, reflow_page, reflow_verses, strip_verse_glyphs, verse_words,
    Line, OverflowPolicy, PageLayout, ReflowConfig, VerseMarker, Word, LINES_PER_PAGE,
    WORDS_PER_LINE,
};
