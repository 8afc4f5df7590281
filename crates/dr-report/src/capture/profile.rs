//! Capture profiles: per-kind rasterization rules.

use super::raster::RasterOptions;
use crate::layout::classify;
use crate::view::{NodeId, ViewTree};

use image::Rgba;
use serde::Serialize;

/// Scale used for time-series captures regardless of the request.
pub const TIME_SERIES_SCALE: f32 = 1.5;

/// Stacking order given to arc captures.
pub const ARC_Z_INDEX: i32 = 9999;

/// Decoration layers the rasterizer skips for metric panels.
pub const METRIC_IGNORED_LAYERS: &[&str] = &["brush-layer", "overlay-layer"];

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Rendering profile, ordered by detection priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureProfile {
    /// Pie/donut charts.
    Arc,
    TimeSeries,
    Metric,
    Default,
}

impl CaptureProfile {
    /// Rasterizer options for this profile.
    ///
    /// `window` is the capture box, used as the viewport for time series.
    pub fn options(self, scale: f32, window: (u32, u32)) -> RasterOptions {
        let base = RasterOptions::new(scale);
        match self {
            CaptureProfile::Arc => RasterOptions {
                background: Some(WHITE),
                auto_height: true,
                foreign_object_rendering: false,
                z_index: Some(ARC_Z_INDEX),
                ..base
            },
            CaptureProfile::TimeSeries => RasterOptions {
                scale: TIME_SERIES_SCALE,
                background: Some(WHITE),
                window: Some(window),
                ..base
            },
            CaptureProfile::Metric => RasterOptions {
                ignore_classes: METRIC_IGNORED_LAYERS.to_vec(),
                ..base
            },
            CaptureProfile::Default => RasterOptions {
                background: Some(WHITE),
                ..base
            },
        }
    }

    /// Whether captures get the near-white pixel snap afterwards.
    pub fn snaps_near_white(self) -> bool {
        self == CaptureProfile::Default
    }
}

/// Highest-priority profile among the kinds detected in `node`.
pub fn detect_profile(tree: &ViewTree, node: NodeId) -> CaptureProfile {
    classify(tree, node)
        .iter()
        .map(|hit| hit.rule.profile)
        .min()
        .unwrap_or(CaptureProfile::Default)
}
