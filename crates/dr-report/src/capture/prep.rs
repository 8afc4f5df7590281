//! Clone preparation applied before rasterizing.
//!
//! Everything here mutates the capture clone only, never the live panel.

use crate::entry::EntryType;
use crate::layout::kinds::WIDE_CHART;
use crate::view::{names, NodeId, Selector, ViewTree};

/// Horizontal offset that keeps a staged clone out of view.
pub const OFFSCREEN_LEFT: &str = "-10000px";

pub const TOC_FONT: &str = "Helvetica, Arial, sans-serif";
pub const TOC_DIVIDER: &str = "1px solid #d0d0d0";
pub const TITLE_FONT_SIZE: &str = "48px";

const METRIC_ITEM: Selector = Selector::Class("metric-item");
const LEGEND: Selector = Selector::Class("legend");
const DETAILS: Selector = Selector::Tag("details");
const COMPUTED_TRANSFORM: &str = "data-computed-transform";

/// Kind-specific styling of a clone.
pub fn prepare_for_kind(tree: &mut ViewTree, clone: NodeId, kind: EntryType) {
    match kind {
        EntryType::TableOfContents => {
            tree.set_style(clone, "font-family", TOC_FONT);
            for row in tree.find_all(clone, names::TOC_ROW) {
                tree.set_style(row, "border-bottom", TOC_DIVIDER);
                tree.set_style(row, "padding", "6px 0");
            }
        }
        EntryType::Header => {
            for range in tree.find_all(clone, names::DATE_RANGE) {
                tree.set_style(range, "display", "flex");
                tree.set_style(range, "justify-content", "center");
                tree.set_style(range, "text-align", "center");
            }
            for label in tree.find_all(clone, names::SHOW_DATES_LABEL) {
                tree.detach(label);
            }
        }
        EntryType::DashboardTitle => {
            tree.set_style(clone, "font-size", TITLE_FONT_SIZE);
            tree.set_style(clone, "font-weight", "700");
            tree.set_style(clone, "text-align", "center");
        }
        EntryType::Visualization => {
            let body = tree.find_first(clone, names::PANEL_BODY);
            let (width, height) = body
                .and_then(|body| {
                    let style = tree.node(body).style();
                    Some((style.pixels("width")?, style.pixels("height")?))
                })
                .unwrap_or((WIDE_CHART.width, WIDE_CHART.height));
            tree.set_style(clone, "width", &format!("{width}px"));
            tree.set_style(clone, "height", &format!("{height}px"));
        }
        EntryType::VisualizationTitle | EntryType::PageBreak | EntryType::PageFooter => {}
    }
}

/// Move the clone off-screen and undo the hiding done for capture.
///
/// Descendants are made visible only when they carry the capture-hidden
/// marker; layers the dashboard itself hides stay hidden.
pub fn position_offscreen(tree: &mut ViewTree, clone: NodeId) {
    tree.set_style(clone, "position", "absolute");
    tree.set_style(clone, "top", "0px");
    tree.set_style(clone, "left", OFFSCREEN_LEFT);
    tree.set_style(clone, "visibility", "visible");
    for node in tree.subtree(clone) {
        if tree.node(node).attr(names::ATTR_CAPTURE_HIDDEN).is_none() {
            continue;
        }
        tree.put_attr(node, names::ATTR_CAPTURE_HIDDEN, None);
        if node != clone && tree.style(node, "visibility") == Some("hidden") {
            tree.set_style(node, "visibility", "visible");
        }
    }
}

/// Detach decorative nodes inside `scope`. Returns how many were removed.
pub fn strip_decorative(tree: &mut ViewTree, scope: NodeId) -> usize {
    let mut removed = 0;
    for class in names::DECORATIVE {
        for node in tree.find_all(scope, Selector::Class(class)) {
            if node != scope {
                tree.detach(node);
                removed += 1;
            }
        }
    }
    removed
}

/// Rewrite disclosure widgets as plain tables so their content is laid out
/// inline. Returns how many were converted.
pub fn expand_details(tree: &mut ViewTree, scope: NodeId) -> usize {
    let widgets = tree.find_all(scope, DETAILS);
    for widget in &widgets {
        let children = tree.node(*widget).children().to_vec();
        let node = tree.node_mut(*widget);
        node.tag = "table".to_string();
        node.attrs.remove("open");
        for child in children {
            let child = tree.node_mut(child);
            child.tag = if child.tag.eq_ignore_ascii_case("summary") {
                "caption".to_string()
            } else {
                "tr".to_string()
            };
        }
    }
    widgets.len()
}

/// Bake computed transforms of metric items into inline style and force
/// legends opaque.
pub fn bake_metric_transforms(tree: &mut ViewTree, scope: NodeId) {
    for item in tree.find_all(scope, METRIC_ITEM) {
        let transform = tree
            .node(item)
            .attr(COMPUTED_TRANSFORM)
            .or_else(|| tree.style(item, "transform"))
            .map(str::to_string);
        if let Some(transform) = transform {
            tree.set_style(item, "transform", &transform);
        }
    }
    for legend in tree.find_all(scope, LEGEND) {
        tree.set_style(legend, "opacity", "1");
    }
}
