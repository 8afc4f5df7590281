//! PDF output: content rendering and final assembly.

pub mod assemble;
pub mod render;
pub mod text;

pub use assemble::{CoverText, DocumentAssembler};
pub use render::{group_entries, ContentLayout, ContentRenderer, PageLayoutRenderer};

/// Points per millimetre.
pub const MM_TO_PT: f32 = 2.83465;

/// A4 in points.
pub const A4_WIDTH: f32 = 595.28;
pub const A4_HEIGHT: f32 = 841.89;

pub fn mm_to_pt(mm: f32) -> f32 {
    mm * MM_TO_PT
}
