//! Greedy block paginator shared by every resume layout.
//!
//! # Two-phase contract
//! 1. Measure: every block gets a rendered height (see `layout::metrics`).
//! 2. Paginate: `paginate` groups measured blocks into pages, first-fit, in order.
//! 3. Lay out: the renderer wraps each page's blocks in a fixed-size page container.
//!
//! Blocks are atomic. A block taller than a page is never split; it lands alone on
//! its own (overfull) page. When heights are not available yet, `arrange` degrades to
//! a single unpaginated flow instead of refusing to render.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// ISO A4 height (297mm) at 96 DPI, in CSS pixels.
pub const A4_PAGE_HEIGHT_PX: u32 = 1123;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// A block whose height has not been measured yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingBlock<T> {
    pub id: String,
    pub content: T,
}

impl<T> PendingBlock<T> {
    pub fn new(id: impl Into<String>, content: T) -> Self {
        Self {
            id: id.into(),
            content,
        }
    }

    /// Attaches a measured height, producing a block the paginator accepts.
    pub fn measured(self, rendered_height_px: u32) -> ContentBlock<T> {
        ContentBlock {
            id: self.id,
            rendered_height_px,
            content: self.content,
        }
    }
}

/// A measured, atomic unit of document content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock<T> {
    pub id: String,
    pub rendered_height_px: u32,
    pub content: T,
}

/// One output page. `number` is 1-based in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub number: usize,
    pub blocks: Vec<ContentBlock<T>>,
}

impl<T> Page<T> {
    /// Cumulative height of the page's blocks. May exceed the page height only when
    /// the page holds a single oversized block.
    pub fn height_px(&self) -> u64 {
        self.blocks
            .iter()
            .map(|b| u64::from(b.rendered_height_px))
            .sum()
    }
}

/// Result of arranging blocks for rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum PageLayout<T> {
    /// Heights were unavailable; render every block in one flow with no page breaks.
    Unmeasured(Vec<PendingBlock<T>>),
    Paginated(Vec<Page<T>>),
}

impl<T> PageLayout<T> {
    /// Number of physical pages. An unmeasured flow counts as one implicit page
    /// unless there is nothing to show.
    pub fn page_count(&self) -> usize {
        match self {
            PageLayout::Unmeasured(blocks) => usize::from(!blocks.is_empty()),
            PageLayout::Paginated(pages) => pages.len(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Core functions
// ────────────────────────────────────────────────────────────────────────────

/// Partitions measured blocks into pages using greedy first-fit.
///
/// A page is closed only when the next block would overflow it *and* it already holds
/// content, so pages are never empty and input order is preserved exactly.
pub fn paginate<T>(blocks: Vec<ContentBlock<T>>, max_page_height_px: u32) -> Vec<Page<T>> {
    let limit = u64::from(max_page_height_px);
    let mut pages: Vec<Page<T>> = Vec::new();
    let mut current: Vec<ContentBlock<T>> = Vec::new();
    let mut current_height = 0u64;

    for block in blocks {
        let height = u64::from(block.rendered_height_px);
        if current_height + height > limit && !current.is_empty() {
            pages.push(Page {
                number: pages.len() + 1,
                blocks: std::mem::take(&mut current),
            });
            current_height = 0;
        }
        current_height += height;
        current.push(block);
    }

    if !current.is_empty() {
        pages.push(Page {
            number: pages.len() + 1,
            blocks: current,
        });
    }

    pages
}

/// Runs the paginate phase if the measure phase produced one height per block.
///
/// `heights == None` (or a height list that does not line up with the blocks) means
/// measurement has not happened; the blocks are returned as a single flow.
pub fn arrange<T>(
    blocks: Vec<PendingBlock<T>>,
    heights: Option<&[u32]>,
    max_page_height_px: u32,
) -> PageLayout<T> {
    match heights {
        Some(heights) if heights.len() == blocks.len() => {
            let measured: Vec<ContentBlock<T>> = blocks
                .into_iter()
                .zip(heights.iter())
                .map(|(block, &h)| block.measured(h))
                .collect();
            PageLayout::Paginated(paginate(measured, max_page_height_px))
        }
        Some(heights) => {
            debug!(
                blocks = blocks.len(),
                heights = heights.len(),
                "Height count does not match block count; rendering unpaginated"
            );
            PageLayout::Unmeasured(blocks)
        }
        None => {
            debug!(blocks = blocks.len(), "Layout not measured; rendering unpaginated");
            PageLayout::Unmeasured(blocks)
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn block(id: &str, height: u32) -> ContentBlock<()> {
        ContentBlock {
            id: id.to_string(),
            rendered_height_px: height,
            content: (),
        }
    }

    fn ids(pages: &[Page<()>]) -> Vec<Vec<String>> {
        pages
            .iter()
            .map(|p| p.blocks.iter().map(|b| b.id.clone()).collect())
            .collect()
    }

    fn blocks_from(heights: &[u32]) -> Vec<ContentBlock<()>> {
        heights
            .iter()
            .enumerate()
            .map(|(i, &h)| block(&format!("b{i}"), h))
            .collect()
    }

    #[test]
    fn test_empty_input_yields_no_pages() {
        let pages = paginate(Vec::<ContentBlock<()>>::new(), A4_PAGE_HEIGHT_PX);
        assert!(pages.is_empty());
    }

    #[test]
    fn test_blocks_that_fit_share_one_page() {
        let pages = paginate(
            vec![block("header", 200), block("summary", 300), block("skills", 400)],
            A4_PAGE_HEIGHT_PX,
        );
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[0].height_px(), 900);
    }

    #[test]
    fn test_exact_fit_does_not_break() {
        let pages = paginate(vec![block("a", 600), block("b", 523)], 1123);
        assert_eq!(ids(&pages), vec![vec!["a", "b"]]);
    }

    #[test]
    fn test_overflow_starts_new_page() {
        let pages = paginate(
            vec![block("a", 600), block("b", 524), block("c", 100)],
            1123,
        );
        assert_eq!(ids(&pages), vec![vec!["a"], vec!["b", "c"]]);
        assert_eq!(pages[1].number, 2);
    }

    #[test]
    fn test_oversized_single_block_is_isolated() {
        let pages = paginate(vec![block("huge", 5000)], 1123);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].blocks.len(), 1);
        assert_eq!(pages[0].height_px(), 5000);
    }

    #[test]
    fn test_oversized_block_mid_document_gets_own_page() {
        let pages = paginate(
            vec![block("a", 100), block("huge", 2000), block("b", 100)],
            1123,
        );
        assert_eq!(ids(&pages), vec![vec!["a"], vec!["huge"], vec!["b"]]);
    }

    #[test]
    fn test_zero_height_blocks_stay_with_current_page() {
        let pages = paginate(
            vec![block("a", 1123), block("spacer", 0), block("b", 1)],
            1123,
        );
        assert_eq!(ids(&pages), vec![vec!["a", "spacer"], vec!["b"]]);
    }

    proptest! {
        #[test]
        fn test_order_preserved_and_pages_non_empty(
            heights in prop::collection::vec(0u32..3000, 0..64),
            max in 1u32..2000,
        ) {
            let blocks = blocks_from(&heights);
            let expected: Vec<String> = blocks.iter().map(|b| b.id.clone()).collect();

            let pages = paginate(blocks, max);
            let flattened: Vec<String> = pages
                .iter()
                .flat_map(|p| p.blocks.iter().map(|b| b.id.clone()))
                .collect();

            prop_assert_eq!(flattened, expected);
            for (i, page) in pages.iter().enumerate() {
                prop_assert_eq!(page.number, i + 1);
                prop_assert!(!page.blocks.is_empty());
                if page.height_px() > u64::from(max) {
                    // Only a single oversized block may exceed the page.
                    prop_assert_eq!(page.blocks.len(), 1);
                }
            }
        }

        #[test]
        fn test_each_break_is_forced(
            heights in prop::collection::vec(0u32..3000, 0..64),
            max in 1u32..2000,
        ) {
            let pages = paginate(blocks_from(&heights), max);
            for pair in pages.windows(2) {
                let next = u64::from(pair[1].blocks[0].rendered_height_px);
                prop_assert!(pair[0].height_px() + next > u64::from(max));
            }
        }

        #[test]
        fn test_paginate_is_idempotent(
            heights in prop::collection::vec(0u32..3000, 0..64),
            max in 1u32..2000,
        ) {
            prop_assert_eq!(
                paginate(blocks_from(&heights), max),
                paginate(blocks_from(&heights), max)
            );
        }
    }

    #[test]
    fn test_arrange_without_heights_degrades_to_flow() {
        let blocks = vec![PendingBlock::new("a", 1), PendingBlock::new("b", 2)];
        let layout = arrange(blocks.clone(), None, A4_PAGE_HEIGHT_PX);
        assert_eq!(layout, PageLayout::Unmeasured(blocks));
        assert_eq!(layout.page_count(), 1);
    }

    #[test]
    fn test_arrange_with_mismatched_heights_degrades_to_flow() {
        let blocks = vec![PendingBlock::new("a", ()), PendingBlock::new("b", ())];
        let layout = arrange(blocks, Some(&[10]), A4_PAGE_HEIGHT_PX);
        assert!(matches!(layout, PageLayout::Unmeasured(_)));
    }

    #[test]
    fn test_arrange_with_heights_paginates() {
        let blocks = vec![
            PendingBlock::new("a", ()),
            PendingBlock::new("b", ()),
            PendingBlock::new("c", ()),
        ];
        let layout = arrange(blocks, Some(&[700, 700, 100]), A4_PAGE_HEIGHT_PX);
        match layout {
            PageLayout::Paginated(pages) => assert_eq!(ids(&pages), vec![vec!["a"], vec!["b", "c"]]),
            other => panic!("expected paginated layout, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_unmeasured_flow_has_no_pages() {
        let layout: PageLayout<()> = arrange(vec![], None, A4_PAGE_HEIGHT_PX);
        assert_eq!(layout.page_count(), 0);
    }
}
