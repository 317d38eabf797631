//! Server-side box metrics for the measure phase.
//!
//! Character widths are estimated per character class in em units rather than read
//! from real glyph tables. This is an approximation: the browser that finally prints
//! the HTML may wrap a word differently. Pagination only needs heights that are close,
//! and every block height is rounded up, so estimates err on the side of breaking early.

use serde::{Deserialize, Serialize};

use crate::layout::blocks::{BlockBody, LineRole};

/// Width class of a typeface. Serif faces run slightly narrower than humanist sans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Typeface {
    Serif,
    Sans,
}

impl Typeface {
    fn scale(self) -> f32 {
        match self {
            Typeface::Serif => 0.94,
            Typeface::Sans => 1.0,
        }
    }

    /// CSS `font-family` stack matching this width class.
    pub fn css_stack(self) -> &'static str {
        match self {
            Typeface::Serif => "Georgia, 'Times New Roman', serif",
            Typeface::Sans => "'Helvetica Neue', Arial, sans-serif",
        }
    }
}

/// Size and leading of one text role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_size_px: f32,
    pub line_height_px: f32,
    pub bold: bool,
}

impl TextStyle {
    pub const fn new(font_size_px: f32, line_height_px: f32, bold: bool) -> Self {
        Self {
            font_size_px,
            line_height_px,
            bold,
        }
    }
}

/// Horizontal gap between a title and its dates column (`.entry-head` flex gap).
pub const ENTRY_HEAD_GAP_PX: f32 = 8.0;

/// Geometry of a layout's content column and the style of each line role.
///
/// The HTML layouts emit their CSS from these same values, so measured heights and
/// printed heights come from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutMetrics {
    pub typeface: Typeface,
    pub page_width_px: f32,
    pub padding_x_px: f32,
    pub padding_y_px: f32,
    pub name: TextStyle,
    pub contact: TextStyle,
    pub heading: TextStyle,
    pub title: TextStyle,
    pub meta: TextStyle,
    pub body: TextStyle,
    /// Space below a section heading (rule and margin included).
    pub heading_gap_px: f32,
    /// Left indent applied to bullet lines.
    pub bullet_indent_px: f32,
    /// Vertical space after every block.
    pub block_gap_px: f32,
    /// Width reserved on title lines for right-aligned dates (0 when dates sit on their own line).
    pub dates_column_px: f32,
}

impl LayoutMetrics {
    pub fn content_width_px(&self) -> f32 {
        (self.page_width_px - 2.0 * self.padding_x_px).max(1.0)
    }

    pub fn style_for(&self, role: LineRole) -> TextStyle {
        match role {
            LineRole::Name => self.name,
            LineRole::Contact => self.contact,
            LineRole::Title => self.title,
            LineRole::Meta => self.meta,
            LineRole::Body | LineRole::Bullet => self.body,
        }
    }

    /// Available line width for a role.
    pub fn line_width_px(&self, role: LineRole) -> f32 {
        let width = self.content_width_px();
        match role {
            LineRole::Bullet => (width - self.bullet_indent_px).max(1.0),
            LineRole::Title if self.dates_column_px > 0.0 => {
                (width - self.dates_column_px - ENTRY_HEAD_GAP_PX).max(1.0)
            }
            _ => width,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Text measurement
// ────────────────────────────────────────────────────────────────────────────

/// Approximate advance width of a character, in em.
fn char_width_em(c: char) -> f32 {
    match c {
        ' ' => 0.27,
        'i' | 'j' | 'l' | 'I' | '!' | '|' | '.' | ',' | ':' | ';' | '\'' => 0.25,
        'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '-' => 0.34,
        'm' | 'w' => 0.83,
        'M' | 'W' | '@' | '%' => 0.92,
        'A'..='Z' => 0.66,
        '0'..='9' => 0.56,
        c if c.is_ascii() => 0.52,
        _ => 0.58,
    }
}

/// Measures the rendered width of a string in pixels.
pub fn measure_str(s: &str, style: TextStyle, typeface: Typeface) -> f32 {
    let bold = if style.bold { 1.06 } else { 1.0 };
    let em: f32 = s.chars().map(char_width_em).sum();
    em * style.font_size_px * typeface.scale() * bold
}

/// Estimates how many lines `text` occupies when word-wrapped at `max_width_px`.
///
/// Greedy wrap: a word that does not fit moves to the next line. A single word wider
/// than the line still counts as one line. Empty text occupies no lines.
pub fn estimated_lines(text: &str, style: TextStyle, typeface: Typeface, max_width_px: f32) -> u32 {
    let space = measure_str(" ", style, typeface);
    let mut lines = 0u32;
    let mut current = 0.0_f32;

    for word in text.split_whitespace() {
        let word_w = measure_str(word, style, typeface);
        if lines == 0 {
            lines = 1;
            current = word_w;
        } else if current + space + word_w > max_width_px {
            lines += 1;
            current = word_w;
        } else {
            current += space + word_w;
        }
    }
    lines
}

/// Measure phase for one block: the block's rendered height in whole pixels.
pub fn measure_block(block: &BlockBody, metrics: &LayoutMetrics) -> u32 {
    let mut height = 0.0_f32;

    if let Some(heading) = &block.heading {
        let lines = estimated_lines(
            heading,
            metrics.heading,
            metrics.typeface,
            metrics.content_width_px(),
        )
        .max(1);
        height += lines as f32 * metrics.heading.line_height_px + metrics.heading_gap_px;
    }

    for line in &block.lines {
        let style = metrics.style_for(line.role);
        let lines = estimated_lines(
            &line.text,
            style,
            metrics.typeface,
            metrics.line_width_px(line.role),
        )
        .max(1);
        height += lines as f32 * style.line_height_px;
    }

    if block.dates.is_some() && metrics.dates_column_px <= 0.0 {
        height += metrics.meta.line_height_px;
    }

    height += metrics.block_gap_px;
    height.ceil() as u32
}
