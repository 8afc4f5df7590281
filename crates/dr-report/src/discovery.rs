//! Panel discovery and validation.

use crate::error::{ReportError, Result};
use crate::view::{names, NodeId, ViewTree};

use serde::Serialize;
use tracing::{debug, info};

/// Title used when a panel declares none.
pub const UNTITLED_PANEL: &str = "Untitled visualization";

/// A panel that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelRecord {
    #[serde(skip)]
    pub node: NodeId,
    /// Header node captured as the panel's title image, when present.
    #[serde(skip)]
    pub title_node: Option<NodeId>,
    pub title: String,
    pub id: String,
}

/// Why a panel was left out of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    ExcludedKind,
    Empty,
    NoData,
}

/// Check a single panel.
pub fn validate_panel(tree: &ViewTree, panel: NodeId) -> std::result::Result<(), Rejection> {
    let node = tree.node(panel);
    let excluded_kind = node
        .attr(names::ATTR_PANEL_KIND)
        .is_some_and(|kind| names::EXCLUDED_KINDS.contains(&kind));
    if excluded_kind || tree.find_first(panel, names::NO_PRINT).is_some() {
        return Err(Rejection::ExcludedKind);
    }

    let empty_chart = tree
        .find_all(panel, names::EMPTY_CHART)
        .into_iter()
        .any(|chart| tree.node(chart).children().is_empty());
    if empty_chart {
        return Err(Rejection::Empty);
    }

    let no_data = tree.subtree(panel).into_iter().any(|id| {
        tree.node(id)
            .text
            .as_deref()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case(names::NO_DATA_TEXT))
    });
    if no_data {
        return Err(Rejection::NoData);
    }
    Ok(())
}

/// Display title: declared title, then header text, then the placeholder.
pub fn panel_title(tree: &ViewTree, panel: NodeId) -> String {
    if let Some(title) = tree
        .node(panel)
        .attr(names::ATTR_TITLE)
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return title.to_string();
    }
    tree.find_first(panel, names::PANEL_TITLE)
        .map(|header| tree.text_content(header))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED_PANEL.to_string())
}

fn panel_id(tree: &ViewTree, panel: NodeId, index: usize) -> String {
    let node = tree.node(panel);
    node.attr(names::ATTR_PANEL_ID)
        .or_else(|| node.attr("id"))
        .map(str::to_string)
        .unwrap_or_else(|| format!("panel-{}", index + 1))
}

/// Every panel in the view that is worth printing, in document order.
///
/// Fails with [`ReportError::NoValidPanels`] when nothing survives; the view
/// is never mutated here.
pub fn discover_panels(tree: &ViewTree) -> Result<Vec<PanelRecord>> {
    let candidates = tree.find_all(tree.root(), names::PANEL);
    let mut panels = Vec::new();
    for (index, panel) in candidates.iter().copied().enumerate() {
        match validate_panel(tree, panel) {
            Ok(()) => panels.push(PanelRecord {
                node: panel,
                title_node: tree.find_first(panel, names::PANEL_TITLE),
                title: panel_title(tree, panel),
                id: panel_id(tree, panel, index),
            }),
            Err(reason) => debug!(panel = %panel, ?reason, "Skipping panel"),
        }
    }

    info!(
        candidates = candidates.len(),
        valid = panels.len(),
        "Panel discovery complete"
    );
    if panels.is_empty() {
        return Err(ReportError::NoValidPanels);
    }
    Ok(panels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::ViewNode;

    fn panel(tree: &mut ViewTree, node: ViewNode) -> NodeId {
        let root = tree.root();
        let cell = tree.append(root, ViewNode::new("div").with_class("grid-cell"));
        tree.append(cell, node.with_class("dashboard-panel"))
    }

    #[test]
    fn test_filters_excluded_empty_and_no_data() {
        let mut tree = ViewTree::new();
        let good = panel(&mut tree, ViewNode::new("div").with_attr("data-title", "Requests"));
        panel(&mut tree, ViewNode::new("div").with_attr("data-panel-kind", "markdown"));
        let no_print = panel(&mut tree, ViewNode::new("div"));
        tree.append(no_print, ViewNode::new("div").with_class("no-print"));
        let empty = panel(&mut tree, ViewNode::new("div"));
        tree.append(empty, ViewNode::new("div").with_class("chart-empty"));
        let no_data = panel(&mut tree, ViewNode::new("div"));
        tree.append(no_data, ViewNode::new("p").with_text(" No results found "));

        let panels = discover_panels(&tree).unwrap();
        assert_eq!(panels.len(), 1);
        assert_eq!(panels[0].node, good);
        assert_eq!(panels[0].title, "Requests");
        assert_eq!(panels[0].id, "panel-1");
    }

    #[test]
    fn test_empty_chart_with_content_is_kept() {
        let mut tree = ViewTree::new();
        let p = panel(&mut tree, ViewNode::new("div"));
        let chart = tree.append(p, ViewNode::new("div").with_class("chart-empty"));
        tree.append(chart, ViewNode::new("svg"));
        assert_eq!(discover_panels(&tree).unwrap().len(), 1);
    }

    #[test]
    fn test_title_fallbacks() {
        let mut tree = ViewTree::new();
        let with_header = panel(&mut tree, ViewNode::new("div").with_attr("data-panel-id", "p-9"));
        tree.append(with_header, ViewNode::new("h3").with_class("panel-title").with_text("Disk"));
        let bare = panel(&mut tree, ViewNode::new("div"));

        assert_eq!(panel_title(&tree, with_header), "Disk");
        assert_eq!(panel_title(&tree, bare), UNTITLED_PANEL);
        let panels = discover_panels(&tree).unwrap();
        assert_eq!(panels[0].id, "p-9");
        assert_eq!(panels[1].id, "panel-2");
    }

    #[test]
    fn test_no_valid_panels() {
        let mut tree = ViewTree::new();
        panel(&mut tree, ViewNode::new("div").with_attr("data-panel-kind", "search"));
        let err = discover_panels(&tree).unwrap_err();
        assert!(matches!(err, ReportError::NoValidPanels));
        assert_eq!(tree.style_writes(), 0);
    }
}
