//! Visualization kinds and their capture geometry.
//!
//! Kinds are detected by structural probes. Probes are ordered and not
//! mutually exclusive: a panel that matches several probes receives each
//! rule's geometry in table order.

use crate::capture::CaptureProfile;
use crate::view::{NodeId, Selector, ViewTree};

use serde::Serialize;

/// Known visualization kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualKind {
    LineChart,
    AreaChart,
    VerticalBar,
    HorizontalBar,
    Pie,
    Heatmap,
    TimeSeries,
    Metric,
    Gauge,
    Goal,
    DataTable,
    TagCloud,
    RegionMap,
}

/// Absolute box a panel is forced into before capture (px).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Geometry {
    pub top: u32,
    pub left: u32,
    pub width: u32,
    pub height: u32,
}

/// Wide chart box.
pub const WIDE_CHART: Geometry = Geometry {
    top: 0,
    left: 0,
    width: 1100,
    height: 450,
};

/// Compact metric/trend box.
pub const COMPACT_BOX: Geometry = Geometry {
    top: 0,
    left: 0,
    width: 520,
    height: 260,
};

/// Large table/tag-cloud box.
pub const LARGE_BOX: Geometry = Geometry {
    top: 0,
    left: 0,
    width: 1100,
    height: 800,
};

/// One row of the kind table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindRule {
    pub kind: VisualKind,
    pub probe: Selector,
    pub geometry: Geometry,
    pub profile: CaptureProfile,
}

const fn rule(
    kind: VisualKind,
    class: &'static str,
    geometry: Geometry,
    profile: CaptureProfile,
) -> KindRule {
    KindRule {
        kind,
        probe: Selector::Class(class),
        geometry,
        profile,
    }
}

/// Kind → {geometry, capture profile}, in probe order.
pub const KIND_TABLE: &[KindRule] = &[
    rule(VisualKind::LineChart, "vis-line", WIDE_CHART, CaptureProfile::Default),
    rule(VisualKind::AreaChart, "vis-area", WIDE_CHART, CaptureProfile::Default),
    rule(VisualKind::VerticalBar, "vis-bar", WIDE_CHART, CaptureProfile::Default),
    rule(VisualKind::HorizontalBar, "vis-horizontal-bar", WIDE_CHART, CaptureProfile::Default),
    rule(VisualKind::Pie, "arc-slice", WIDE_CHART, CaptureProfile::Arc),
    rule(VisualKind::Heatmap, "heatmap-cell", WIDE_CHART, CaptureProfile::Default),
    rule(VisualKind::TimeSeries, "tsvb-timeseries", WIDE_CHART, CaptureProfile::TimeSeries),
    rule(VisualKind::Metric, "metric-value", COMPACT_BOX, CaptureProfile::Metric),
    rule(VisualKind::Gauge, "gauge-arc", COMPACT_BOX, CaptureProfile::Default),
    rule(VisualKind::Goal, "goal-bar", COMPACT_BOX, CaptureProfile::Default),
    rule(VisualKind::DataTable, "data-table", LARGE_BOX, CaptureProfile::Default),
    rule(VisualKind::TagCloud, "tag-cloud", LARGE_BOX, CaptureProfile::Default),
    rule(VisualKind::RegionMap, "region-map", LARGE_BOX, CaptureProfile::Default),
];

/// A probe hit: the rule and the first node inside the panel it matched.
#[derive(Debug, Clone, Copy)]
pub struct KindMatch {
    pub rule: &'static KindRule,
    pub node: NodeId,
}

/// Every rule whose probe matches inside `panel`, in table order.
pub fn classify(tree: &ViewTree, panel: NodeId) -> Vec<KindMatch> {
    KIND_TABLE
        .iter()
        .filter_map(|rule| {
            tree.find_first(panel, rule.probe)
                .map(|node| KindMatch { rule, node })
        })
        .collect()
}
