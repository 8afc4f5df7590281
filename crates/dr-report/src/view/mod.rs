//! Dashboard view model.
//!
//! The live dashboard is an arena of [`ViewNode`]s shared on the event loop
//! as [`SharedView`]. Pipeline components query it structurally and mutate
//! inline styles; every mutation is paired with a restore.

pub mod fixture;
pub mod tree;

pub use fixture::{load_view, view_from_json, view_from_spec, CanvasSpec, NodeSpec};
pub use tree::{NodeId, Selector, SharedView, StyleMap, ViewNode, ViewTree};

/// Structural vocabulary of a dashboard view.
pub mod names {
    use super::Selector;

    pub const DASHBOARD_ROOT: Selector = Selector::Class("dashboard-container");
    pub const DASHBOARD_TITLE: Selector = Selector::Class("dashboard-title");
    pub const TIME_RANGE: Selector = Selector::Class("time-range-picker");
    pub const DATE_RANGE: Selector = Selector::Class("date-range");
    pub const SHOW_DATES_LABEL: Selector = Selector::Class("show-dates-label");

    pub const PANEL: Selector = Selector::Class("dashboard-panel");
    pub const GRID_CELL: Selector = Selector::Class("grid-cell");
    pub const PANEL_BODY: Selector = Selector::Class("panel-body");
    pub const PANEL_TITLE: Selector = Selector::Class("panel-title");
    pub const EMPTY_CHART: Selector = Selector::Class("chart-empty");
    pub const NO_PRINT: Selector = Selector::Class("no-print");

    pub const ATTR_PANEL_KIND: &str = "data-panel-kind";
    pub const ATTR_TITLE: &str = "data-title";
    pub const ATTR_PANEL_ID: &str = "data-panel-id";
    pub const ATTR_TENANT: &str = "data-tenant";
    /// Marks nodes hidden by the pipeline while they are being captured.
    /// Only these are made visible again inside a capture clone.
    pub const ATTR_CAPTURE_HIDDEN: &str = "data-capture-hidden";

    /// Off-screen container for nodes built only to be captured.
    pub const SCRATCH: Selector = Selector::Class("report-scratch");
    pub const TOC: Selector = Selector::Class("report-toc");
    pub const TOC_ROW: Selector = Selector::Class("toc-row");
    pub const PAGE_FOOTER: Selector = Selector::Class("page-footer");

    /// Panel kinds that never print.
    pub const EXCLUDED_KINDS: &[&str] = &["markdown", "search"];

    /// Message rendered by panels whose query returned nothing.
    pub const NO_DATA_TEXT: &str = "No results found";

    /// Nodes that never appear in a printed capture.
    pub const DECORATIVE: &[&str] = &[
        "pagination",
        "export-button",
        "legend-toggle",
        "chart-caption",
        "panel-menu",
    ];
}
