//! HTML resume layouts. All three share the block builder, the metrics model and the
//! paginator; only typography, colors and CSS differ.
//!
//! Output is a standalone HTML document of fixed-size A4 page containers, ready for a
//! headless browser to print.

use askama::Template;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::latex::escape_html;
use crate::layout::{
    arrange, measure_block, resume_blocks, BlockBody, LayoutMetrics, LineRole, Page, PageLayout,
    TextStyle, Typeface, ENTRY_HEAD_GAP_PX,
};
use crate::models::resume::ResumeData;

/// A4 width at 96 DPI, in CSS pixels.
pub const A4_PAGE_WIDTH_PX: f32 = 794.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumeLayout {
    /// Centered serif header, small-caps section rules.
    Classic,
    /// Sans-serif with an accent color; dates on their own line.
    Modern,
    /// Dense sans-serif grid with a right-hand dates column.
    Structured,
}

/// Whether to run the measure phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Paginated,
    /// Skip measurement; render one continuous flow.
    Flow,
}

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub html: String,
    pub page_count: usize,
}

impl ResumeLayout {
    pub const ALL: [ResumeLayout; 3] = [
        ResumeLayout::Classic,
        ResumeLayout::Modern,
        ResumeLayout::Structured,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ResumeLayout::Classic => "classic",
            ResumeLayout::Modern => "modern",
            ResumeLayout::Structured => "structured",
        }
    }

    pub fn metrics(self) -> LayoutMetrics {
        match self {
            ResumeLayout::Classic => LayoutMetrics {
                typeface: Typeface::Serif,
                page_width_px: A4_PAGE_WIDTH_PX,
                padding_x_px: 64.0,
                padding_y_px: 56.0,
                name: TextStyle::new(30.0, 38.0, true),
                contact: TextStyle::new(13.0, 19.0, false),
                heading: TextStyle::new(15.0, 22.0, true),
                title: TextStyle::new(14.5, 21.0, true),
                meta: TextStyle::new(13.5, 19.0, false),
                body: TextStyle::new(13.5, 19.5, false),
                heading_gap_px: 8.0,
                bullet_indent_px: 18.0,
                block_gap_px: 12.0,
                dates_column_px: 150.0,
            },
            ResumeLayout::Modern => LayoutMetrics {
                typeface: Typeface::Sans,
                page_width_px: A4_PAGE_WIDTH_PX,
                padding_x_px: 56.0,
                padding_y_px: 48.0,
                name: TextStyle::new(32.0, 40.0, true),
                contact: TextStyle::new(12.5, 18.0, false),
                heading: TextStyle::new(14.0, 20.0, true),
                title: TextStyle::new(14.0, 20.0, true),
                meta: TextStyle::new(12.5, 18.0, false),
                body: TextStyle::new(13.0, 19.0, false),
                heading_gap_px: 7.0,
                bullet_indent_px: 16.0,
                block_gap_px: 14.0,
                dates_column_px: 0.0,
            },
            ResumeLayout::Structured => LayoutMetrics {
                typeface: Typeface::Sans,
                page_width_px: A4_PAGE_WIDTH_PX,
                padding_x_px: 48.0,
                padding_y_px: 44.0,
                name: TextStyle::new(26.0, 34.0, true),
                contact: TextStyle::new(12.0, 17.0, false),
                heading: TextStyle::new(13.0, 19.0, true),
                title: TextStyle::new(13.5, 19.0, true),
                meta: TextStyle::new(12.5, 17.0, false),
                body: TextStyle::new(12.5, 18.0, false),
                heading_gap_px: 6.0,
                bullet_indent_px: 14.0,
                block_gap_px: 10.0,
                dates_column_px: 130.0,
            },
        }
    }

    fn accent(self) -> &'static str {
        match self {
            ResumeLayout::Classic => "#222222",
            ResumeLayout::Modern => "#1f6feb",
            ResumeLayout::Structured => "#2d3748",
        }
    }

    /// Layout-specific rules appended after the shared stylesheet.
    fn extra_css(self) -> &'static str {
        match self {
            ResumeLayout::Classic => {
                ".block-header{text-align:center}\
                 .section-heading{font-variant:small-caps;letter-spacing:.06em;box-shadow:inset 0 -1px 0 currentColor}"
            }
            ResumeLayout::Modern => {
                ".name{color:var(--accent)}\
                 .section-heading{color:var(--accent);text-transform:uppercase;letter-spacing:.08em}\
                 .dates-line{color:#555}"
            }
            ResumeLayout::Structured => {
                ".section-heading{text-transform:uppercase;letter-spacing:.1em;background:#edf2f7;padding-left:4px}\
                 .dates{color:#4a5568}"
            }
        }
    }
}

impl std::str::FromStr for ResumeLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResumeLayout::ALL
            .into_iter()
            .find(|l| l.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown layout '{s}'"))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Views
// ────────────────────────────────────────────────────────────────────────────

// Text fields hold HTML-dialect escaped markup; the templates emit them with `|safe`.

/// One rendered line (or run of bullets) inside a block.
pub enum LineView {
    Name(String),
    Contact(String),
    /// Title with right-aligned dates in the reserved column.
    EntryHead(String, String),
    Title(String),
    DatesLine(String),
    Meta(String),
    Body(String),
    Bullets(Vec<String>),
}

pub struct BlockView {
    pub kind: String,
    pub id: String,
    pub heading: Option<String>,
    pub lines: Vec<LineView>,
}

pub struct PageView {
    pub number: usize,
    pub overfull: bool,
    pub blocks: Vec<BlockView>,
}

#[derive(Template)]
#[template(path = "resume/document.html")]
pub struct ResumeDocumentTemplate {
    pub title: String,
    pub layout: &'static str,
    pub css: String,
    pub pages: Vec<PageView>,
    /// Set when the measure phase was skipped; `pages` is then empty.
    pub flow: Option<Vec<BlockView>>,
}

// ────────────────────────────────────────────────────────────────────────────
// Rendering
// ────────────────────────────────────────────────────────────────────────────

/// Renders a resume: measure, paginate, then lay out into page containers.
///
/// `page_height_px` is the physical page height; blocks fill the page's content box
/// (page height minus vertical padding).
pub fn render_resume(
    layout: ResumeLayout,
    data: &ResumeData,
    mode: RenderMode,
    page_height_px: u32,
) -> askama::Result<RenderedDocument> {
    let metrics = layout.metrics();
    let blocks = resume_blocks(data);

    let heights: Option<Vec<u32>> = match mode {
        RenderMode::Paginated => Some(
            blocks
                .iter()
                .map(|b| measure_block(&b.content, &metrics))
                .collect(),
        ),
        RenderMode::Flow => None,
    };

    let content_height = content_height_px(&metrics, page_height_px);
    let page_layout = arrange(blocks, heights.as_deref(), content_height);
    let page_count = page_layout.page_count();
    debug!(
        layout = layout.name(),
        pages = page_count,
        content_height,
        "Resume laid out"
    );

    let (pages, flow) = match page_layout {
        PageLayout::Paginated(pages) => (
            pages
                .iter()
                .map(|page| page_view(page, &metrics, content_height))
                .collect(),
            None,
        ),
        PageLayout::Unmeasured(blocks) => (
            Vec::new(),
            Some(
                blocks
                    .iter()
                    .map(|b| block_view(&b.id, &b.content, &metrics))
                    .collect(),
            ),
        ),
    };

    let html = ResumeDocumentTemplate {
        title: escape_html(data.contact.name.trim()).into_owned(),
        layout: layout.name(),
        css: stylesheet(layout, &metrics, page_height_px),
        pages,
        flow,
    }
    .render()?;

    Ok(RenderedDocument { html, page_count })
}

fn content_height_px(metrics: &LayoutMetrics, page_height_px: u32) -> u32 {
    let padding = (2.0 * metrics.padding_y_px).ceil() as u32;
    page_height_px.saturating_sub(padding).max(1)
}

fn font_rule(style: TextStyle) -> String {
    format!(
        "font-size:{}px;line-height:{}px;font-weight:{};margin:0",
        style.font_size_px,
        style.line_height_px,
        if style.bold { 700 } else { 400 }
    )
}

/// Stylesheet generated from the same metrics the measure phase used.
fn stylesheet(layout: ResumeLayout, m: &LayoutMetrics, page_height_px: u32) -> String {
    format!(
        ":root{{--accent:{accent}}}\n\
         @page{{size:A4;margin:0}}\n\
         body{{margin:0;font-family:{family};color:#111}}\n\
         .page,.flow{{width:{width}px;box-sizing:border-box;padding:{py}px {px}px}}\n\
         .page{{height:{height}px;overflow:hidden;page-break-after:always;break-after:page}}\n\
         .page.overfull{{height:auto;overflow:visible}}\n\
         .block{{margin:0 0 {gap}px}}\n\
         .name{{{name}}}\n\
         .contact{{{contact}}}\n\
         .section-heading{{{heading};margin-bottom:{heading_gap}px}}\n\
         .entry-head{{display:flex;justify-content:space-between;gap:{entry_gap}px}}\n\
         .title{{{title}}}\n\
         .dates{{{meta};flex:0 0 {dates_col}px;text-align:right}}\n\
         .meta,.dates-line{{{meta}}}\n\
         .body{{{body}}}\n\
         .bullets{{list-style:disc;margin:0;padding-left:{indent}px}}\n\
         .bullets li{{{body}}}\n\
         {extra}",
        accent = layout.accent(),
        family = m.typeface.css_stack(),
        width = m.page_width_px,
        height = page_height_px,
        px = m.padding_x_px,
        py = m.padding_y_px,
        gap = m.block_gap_px,
        name = font_rule(m.name),
        contact = font_rule(m.contact),
        heading = font_rule(m.heading),
        heading_gap = m.heading_gap_px,
        entry_gap = ENTRY_HEAD_GAP_PX,
        title = font_rule(m.title),
        meta = font_rule(m.meta),
        dates_col = m.dates_column_px,
        body = font_rule(m.body),
        indent = m.bullet_indent_px,
        extra = layout.extra_css(),
    )
}

fn page_view(page: &Page<BlockBody>, m: &LayoutMetrics, content_height: u32) -> PageView {
    PageView {
        number: page.number,
        overfull: page.height_px() > u64::from(content_height),
        blocks: page
            .blocks
            .iter()
            .map(|b| block_view(&b.id, &b.content, m))
            .collect(),
    }
}

fn block_view(id: &str, block: &BlockBody, m: &LayoutMetrics) -> BlockView {
    let mut lines: Vec<LineView> = Vec::with_capacity(block.lines.len());
    for line in &block.lines {
        let text = escape_html(&line.text).into_owned();
        match line.role {
            LineRole::Name => lines.push(LineView::Name(text)),
            LineRole::Contact => lines.push(LineView::Contact(text)),
            LineRole::Meta => lines.push(LineView::Meta(text)),
            LineRole::Body => lines.push(LineView::Body(text)),
            LineRole::Bullet => match lines.last_mut() {
                Some(LineView::Bullets(items)) => items.push(text),
                _ => lines.push(LineView::Bullets(vec![text])),
            },
            LineRole::Title => {
                let dates = block.dates.as_deref().map(|d| escape_html(d).into_owned());
                match dates {
                    Some(dates) if m.dates_column_px > 0.0 => {
                        lines.push(LineView::EntryHead(text, dates));
                    }
                    Some(dates) => {
                        lines.push(LineView::Title(text));
                        lines.push(LineView::DatesLine(dates));
                    }
                    None => lines.push(LineView::Title(text)),
                }
            }
        }
    }

    BlockView {
        kind: format!("{:?}", block.kind).to_lowercase(),
        id: escape_html(id).into_owned(),
        heading: block.heading.as_deref().map(|h| escape_html(h).into_owned()),
        lines,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
