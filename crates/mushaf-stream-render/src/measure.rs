use serde::Serialize;

/// Rendered size of a candidate line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct TextExtent {
    /// Advance width in px.
    pub width: f32,
    /// Line box height in px.
    pub height: f32,
}

/// Measurement hook supplied by the presentation layer.
///
/// The font-fit search calls this once per non-empty line per candidate
/// size, so implementations should be cheap or cache internally.
pub trait TextMeasurer: Send + Sync {
    /// Measure `text` rendered at `font_size_px`.
    fn measure(&self, text: &str, font_size_px: u32) -> TextExtent;
}

impl<F> TextMeasurer for F
where
    F: Fn(&str, u32) -> TextExtent + Send + Sync,
{
    fn measure(&self, text: &str, font_size_px: u32) -> TextExtent {
        self(text, font_size_px)
    }
}

/// Headless width estimate for Arabic-script text.
///
/// Widths come from per-glyph em classes; combining marks (harakat, Quranic
/// annotation signs) take no advance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HeuristicMeasurer {
    /// Line-height multiplier applied to the font size.
    pub line_height: f32,
    /// Extra px between glyphs.
    pub letter_spacing: f32,
}

impl Default for HeuristicMeasurer {
    fn default() -> Self {
        Self {
            line_height: 1.9,
            letter_spacing: 0.0,
        }
    }
}

impl TextMeasurer for HeuristicMeasurer {
    fn measure(&self, text: &str, font_size_px: u32) -> TextExtent {
        let size = font_size_px as f32;
        let mut em_sum = 0.0f32;
        let mut advancing = 0usize;
        for ch in text.chars() {
            let em = glyph_em_width(ch);
            if em > 0.0 {
                advancing += 1;
            }
            em_sum += em;
        }
        let mut width = em_sum * size;
        if advancing > 1 {
            width += (advancing as f32 - 1.0) * self.letter_spacing;
        }
        TextExtent {
            width,
            height: if text.is_empty() {
                0.0
            } else {
                size * self.line_height
            },
        }
    }
}

fn is_combining_mark(ch: char) -> bool {
    matches!(
        ch,
        '\u{0610}'..='\u{061A}'
            | '\u{064B}'..='\u{065F}'
            | '\u{0670}'
            | '\u{06D6}'..='\u{06DC}'
            | '\u{06DF}'..='\u{06E4}'
            | '\u{06E7}'..='\u{06E8}'
            | '\u{06EA}'..='\u{06ED}'
            | '\u{08D3}'..='\u{08FF}'
    )
}

fn glyph_em_width(ch: char) -> f32 {
    if is_combining_mark(ch) {
        return 0.0;
    }
    match ch {
        ' ' | '\u{00A0}' => 0.28,
        // Alef forms, dal, thal, ra, zain, waw
        '\u{0622}' | '\u{0623}' | '\u{0625}' | '\u{0627}' | '\u{0671}' | '\u{062F}'
        | '\u{0630}' | '\u{0631}' | '\u{0632}' | '\u{0648}' | '\u{0624}' => 0.30,
        // Seen, sheen, sad, dad
        '\u{0633}'..='\u{0636}' => 0.82,
        '\u{0640}' => 0.32,
        '\u{FD3E}' | '\u{FD3F}' => 0.42,
        '\u{06DD}' => 0.9,
        '\u{0660}'..='\u{0669}' | '\u{06F0}'..='\u{06F9}' => 0.50,
        '\u{0621}'..='\u{064A}' | '\u{0671}'..='\u{06D3}' => 0.56,
        '.' | ',' | ':' | ';' | '\'' | '"' => 0.23,
        c if c.is_ascii_digit() => 0.52,
        c if c.is_ascii_uppercase() => 0.64,
        c if c.is_ascii_lowercase() => 0.52,
        c if c.is_whitespace() => 0.28,
        _ => 0.56,
    }
}
