//! Layout normalization prior to capture.
//!
//! Panels are forced into fixed capture geometries so that rasterized output
//! does not depend on the viewer's window size. All panels are restyled in
//! one batch, followed by a single paint-and-settle wait. The returned
//! [`LayoutGuard`] puts every touched style back exactly once, either
//! explicitly via [`LayoutGuard::restore`] or on drop.

pub mod kinds;

pub use kinds::{classify, Geometry, KindMatch, KindRule, VisualKind, KIND_TABLE};

use crate::discovery::PanelRecord;
use crate::view::{names, NodeId, SharedView, ViewTree};

use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, error, info};

/// Wait after the batch restyle before any capture starts.
pub const LAYOUT_SETTLE: Duration = Duration::from_millis(300);

/// Inline style properties saved and restored per touched node.
pub const SNAPSHOT_KEYS: [&str; 6] = ["top", "left", "width", "height", "position", "visibility"];

/// Saved inline style subset of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSnapshot {
    pub node: NodeId,
    pub values: [Option<String>; 6],
    /// Prior value of the capture-hidden marker.
    pub marker: Option<String>,
}

impl StyleSnapshot {
    pub fn take(tree: &ViewTree, node: NodeId) -> Self {
        Self {
            node,
            values: SNAPSHOT_KEYS.map(|key| tree.style(node, key).map(str::to_string)),
            marker: tree.node(node).attr(names::ATTR_CAPTURE_HIDDEN).map(str::to_string),
        }
    }

    pub fn apply(&self, tree: &mut ViewTree) {
        for (key, value) in SNAPSHOT_KEYS.iter().zip(self.values.iter()) {
            tree.put_style(self.node, key, value.as_deref());
        }
        tree.put_attr(self.node, names::ATTR_CAPTURE_HIDDEN, self.marker.as_deref());
    }
}

/// One restyle: a node and the box it is forced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub node: NodeId,
    pub geometry: Geometry,
    pub kind: VisualKind,
}

/// Restyles every recognised panel for capture.
#[derive(Debug, Default, Clone, Copy)]
pub struct LayoutNormalizer;

impl LayoutNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Placements for every probe hit: the panel's grid cell and the panel
    /// body around the matched node, in panel then table order.
    pub fn plan(&self, tree: &ViewTree, panels: &[PanelRecord]) -> Vec<Placement> {
        let mut placements = Vec::new();
        for panel in panels {
            for hit in classify(tree, panel.node) {
                let targets = [
                    tree.closest(panel.node, names::GRID_CELL),
                    tree.closest(hit.node, names::PANEL_BODY),
                ];
                for node in targets.into_iter().flatten() {
                    placements.push(Placement {
                        node,
                        geometry: hit.rule.geometry,
                        kind: hit.rule.kind,
                    });
                }
            }
        }
        placements
    }

    /// Snapshot and restyle every placement, then wait for layout to settle.
    pub async fn normalize(&self, view: &SharedView, panels: &[PanelRecord]) -> LayoutGuard {
        let mut guard = LayoutGuard::new(view.clone());
        {
            let mut tree = view.borrow_mut();
            let placements = self.plan(&tree, panels);
            let mut seen = BTreeSet::new();
            for placement in &placements {
                if seen.insert(placement.node) {
                    guard.snapshots.push(StyleSnapshot::take(&tree, placement.node));
                }
                apply_geometry(&mut tree, placement.node, placement.geometry);
                debug!(node = %placement.node, kind = ?placement.kind, "Applied capture geometry");
            }
            info!(
                panels = panels.len(),
                restyled = guard.snapshots.len(),
                "Layout normalized"
            );
        }

        // One paint cycle, then the settle delay.
        tokio::task::yield_now().await;
        tokio::time::sleep(LAYOUT_SETTLE).await;
        guard
    }
}

fn apply_geometry(tree: &mut ViewTree, node: NodeId, geometry: Geometry) {
    tree.set_style(node, "position", "absolute");
    tree.set_style(node, "top", &format!("{}px", geometry.top));
    tree.set_style(node, "left", &format!("{}px", geometry.left));
    tree.set_style(node, "width", &format!("{}px", geometry.width));
    tree.set_style(node, "height", &format!("{}px", geometry.height));
    tree.set_style(node, "visibility", "hidden");
    tree.put_attr(node, names::ATTR_CAPTURE_HIDDEN, Some("layout"));
}

/// Restores every style touched by [`LayoutNormalizer::normalize`].
#[must_use = "dropping the guard restores the layout immediately"]
pub struct LayoutGuard {
    view: SharedView,
    snapshots: Vec<StyleSnapshot>,
    restored: bool,
}

impl LayoutGuard {
    fn new(view: SharedView) -> Self {
        Self {
            view,
            snapshots: Vec::new(),
            restored: false,
        }
    }

    /// Saved styles, in the order they were taken.
    pub fn snapshots(&self) -> &[StyleSnapshot] {
        &self.snapshots
    }

    /// Put every saved style back.
    pub fn restore(mut self) {
        self.restore_once();
    }

    fn restore_once(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;
        match self.view.try_borrow_mut() {
            Ok(mut tree) => {
                for snapshot in self.snapshots.iter().rev() {
                    snapshot.apply(&mut tree);
                }
                debug!(nodes = self.snapshots.len(), "Layout restored");
            }
            Err(_) => error!("View busy while restoring layout; styles left modified"),
        }
    }
}

impl Drop for LayoutGuard {
    fn drop(&mut self) {
        self.restore_once();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::discover_panels;
    use crate::view::ViewNode;

    fn dashboard() -> SharedView {
        let mut tree = ViewTree::new();
        let root = tree.root();
        let cell = tree.append(
            root,
            ViewNode::new("div")
                .with_class("grid-cell")
                .with_style("width", "33%")
                .with_style("top", "120px"),
        );
        let panel = tree.append(cell, ViewNode::new("div").with_class("dashboard-panel"));
        let body = tree.append(panel, ViewNode::new("div").with_class("panel-body"));
        tree.append(body, ViewNode::new("svg").with_class("vis-line"));
        tree.append(body, ViewNode::new("div").with_class("metric-value"));

        let cell = tree.append(root, ViewNode::new("div").with_class("grid-cell"));
        tree.append(cell, ViewNode::new("div").with_class("dashboard-panel"));
        tree.into_shared()
    }

    #[test]
    fn test_plan_covers_cell_and_body_per_hit() {
        let view = dashboard();
        let tree = view.borrow();
        let panels = discover_panels(&tree).unwrap();
        let plan = LayoutNormalizer::new().plan(&tree, &panels);
        // Two hits on the first panel, each targeting cell and body; the
        // second panel has no recognised kind.
        assert_eq!(plan.len(), 4);
        assert_eq!(plan[0].geometry, kinds::WIDE_CHART);
        assert_eq!(plan[3].geometry, kinds::COMPACT_BOX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_normalize_then_restore_is_exact() {
        let view = dashboard();
        let before = view.borrow().styles();
        let panels = discover_panels(&view.borrow()).unwrap();

        let guard = LayoutNormalizer::new().normalize(&view, &panels).await;
        assert_eq!(guard.snapshots().len(), 2);
        {
            let tree = view.borrow();
            let cell = guard.snapshots()[0].node;
            // Last matching rule wins.
            assert_eq!(tree.style(cell, "width"), Some("520px"));
            assert_eq!(tree.style(cell, "visibility"), Some("hidden"));
            assert_eq!(tree.node(cell).attr(names::ATTR_CAPTURE_HIDDEN), Some("layout"));
        }
        let cell = guard.snapshots()[0].node;
        guard.restore();
        assert_eq!(view.borrow().styles(), before);
        assert!(view.borrow().node(cell).attr(names::ATTR_CAPTURE_HIDDEN).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_restores() {
        let view = dashboard();
        let before = view.borrow().styles();
        let panels = discover_panels(&view.borrow()).unwrap();
        {
            let _guard = LayoutNormalizer::new().normalize(&view, &panels).await;
            assert_ne!(view.borrow().styles(), before);
        }
        assert_eq!(view.borrow().styles(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_normalize_waits_for_settle() {
        let view = dashboard();
        let panels = discover_panels(&view.borrow()).unwrap();
        let start = tokio::time::Instant::now();
        let guard = LayoutNormalizer::new().normalize(&view, &panels).await;
        assert!(start.elapsed() >= LAYOUT_SETTLE);
        drop(guard);
    }
}
