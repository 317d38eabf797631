// Resume layout: block construction, server-side measurement, pagination.
// Renderers drive the phases in order: measure -> paginate -> lay out.

pub mod blocks;
pub mod handlers;
pub mod metrics;
pub mod paginator;

// Re-export the public API consumed by the renderers and handlers.
pub use blocks::{resume_blocks, BlockBody, LineRole};
pub use metrics::{measure_block, LayoutMetrics, TextStyle, Typeface, ENTRY_HEAD_GAP_PX};
pub use paginator::{arrange, Page, PageLayout, A4_PAGE_HEIGHT_PX};
