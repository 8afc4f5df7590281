//! Pagination planning: page counts, table of contents, footers and the
//! final entry sequence.
//!
//! Every content page holds up to two visualizations, matching the
//! page-break markers after every second panel. The document is cover,
//! contents page, content pages and appendix.

use crate::discovery::PanelRecord;
use crate::entry::VisualizationEntry;
use crate::view::{NodeId, SharedView, ViewNode};

use serde::Serialize;
use tracing::{debug, error};

pub const COVER_TITLE: &str = "Cover Page";
pub const CONTENTS_TITLE: &str = "Report Contents";
pub const APPENDIX_TITLE: &str = "Appendix";

/// Pages that hold visualizations for `panels` panels.
pub fn content_pages(panels: usize) -> usize {
    if panels == 0 {
        0
    } else {
        panels.div_ceil(2)
    }
}

/// Cover + contents + content pages + appendix.
pub fn total_pages(panels: usize) -> usize {
    3 + content_pages(panels)
}

/// One line of the table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub title: String,
    pub page: usize,
}

/// Page-number label for footer slot `index`.
///
/// Without a contents page the displayed numbers shift down by one, so the
/// first slot displays `-1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FooterLabel {
    pub index: usize,
    pub page: i64,
    pub total: i64,
    pub text: String,
}

/// `"{organization} · Page {page} of {total}"`, organization omitted when empty.
pub fn footer_text(organization: &str, page: i64, total: i64) -> String {
    let organization = organization.trim();
    if organization.is_empty() {
        format!("Page {page} of {total}")
    } else {
        format!("{organization} · Page {page} of {total}")
    }
}

/// Contents lines for the given panel titles, in panel order.
pub fn toc_entries<S: AsRef<str>>(titles: &[S]) -> Vec<TocEntry> {
    let total = total_pages(titles.len());
    let mut entries = Vec::with_capacity(titles.len() + 3);
    entries.push(TocEntry {
        title: COVER_TITLE.to_string(),
        page: 1,
    });
    entries.push(TocEntry {
        title: CONTENTS_TITLE.to_string(),
        page: 2,
    });
    for (i, title) in titles.iter().enumerate() {
        entries.push(TocEntry {
            title: title.as_ref().to_string(),
            page: 3 + i / 2,
        });
    }
    entries.push(TocEntry {
        title: APPENDIX_TITLE.to_string(),
        page: total,
    });
    entries
}

/// Labels for every footer slot `0..=total_pages`.
pub fn footer_labels(total_pages: usize, table_of_contents: bool, organization: &str) -> Vec<FooterLabel> {
    let shift = if table_of_contents { 0 } else { 1 };
    (0..=total_pages)
        .map(|index| {
            let page = index as i64 - shift;
            let total = total_pages as i64 - shift;
            FooterLabel {
                index,
                page,
                total,
                text: footer_text(organization, page, total),
            }
        })
        .collect()
}

/// 0-based panel indices followed by a page-break marker: after every second
/// panel, never after the last.
pub fn page_break_positions(panels: usize) -> Vec<usize> {
    (0..panels)
        .filter(|i| (i + 1) % 2 == 0 && i + 1 != panels)
        .collect()
}

/// Everything the report layout is derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationPlan {
    pub panels: usize,
    pub content_pages: usize,
    pub total_pages: usize,
    pub table_of_contents: bool,
    pub toc: Vec<TocEntry>,
    pub footers: Vec<FooterLabel>,
    pub page_breaks: Vec<usize>,
}

/// Captured pieces of one panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelEntries {
    pub title: Option<VisualizationEntry>,
    pub visualization: VisualizationEntry,
}

/// Plans pagination for a set of validated panels.
#[derive(Debug, Clone, Default)]
pub struct PaginationPlanner {
    table_of_contents: bool,
    organization: String,
}

impl PaginationPlanner {
    pub fn new(table_of_contents: bool, organization: impl Into<String>) -> Self {
        Self {
            table_of_contents,
            organization: organization.into(),
        }
    }

    pub fn plan<S: AsRef<str>>(&self, titles: &[S]) -> PaginationPlan {
        let panels = titles.len();
        let total = total_pages(panels);
        PaginationPlan {
            panels,
            content_pages: content_pages(panels),
            total_pages: total,
            table_of_contents: self.table_of_contents,
            toc: toc_entries(titles),
            footers: footer_labels(total, self.table_of_contents, &self.organization),
            page_breaks: page_break_positions(panels),
        }
    }

    pub fn plan_panels(&self, panels: &[PanelRecord]) -> PaginationPlan {
        let titles: Vec<&str> = panels.iter().map(|p| p.title.as_str()).collect();
        self.plan(&titles)
    }

    /// Flatten captured entries into report order: contents, footers, title,
    /// header, then each panel's title and visualization with page-break
    /// markers between pairs of panels.
    pub fn sequence(
        &self,
        toc: VisualizationEntry,
        footers: Vec<VisualizationEntry>,
        title: VisualizationEntry,
        header: VisualizationEntry,
        panels: Vec<PanelEntries>,
    ) -> Vec<VisualizationEntry> {
        let breaks = page_break_positions(panels.len());
        let mut sequence = Vec::with_capacity(footers.len() + panels.len() * 3 + 3);
        sequence.push(toc);
        sequence.extend(footers);
        sequence.push(title);
        sequence.push(header);
        for (i, panel) in panels.into_iter().enumerate() {
            sequence.extend(panel.title);
            sequence.push(panel.visualization);
            if breaks.contains(&i) {
                sequence.push(VisualizationEntry::page_break(i + 1));
            }
        }
        debug!(entries = sequence.len(), "Entry sequence built");
        sequence
    }
}

/// Off-screen container for contents and footer nodes.
///
/// The container is detached from the view when the area is dropped.
pub struct ScratchArea {
    view: SharedView,
    container: NodeId,
}

impl ScratchArea {
    pub fn open(view: &SharedView) -> Self {
        let container = {
            let mut tree = view.borrow_mut();
            let root = tree.root();
            tree.append(
                root,
                ViewNode::new("div")
                    .with_class("report-scratch")
                    .with_style("position", "absolute")
                    .with_style("left", "-10000px")
                    .with_style("top", "0px"),
            )
        };
        Self {
            view: view.clone(),
            container,
        }
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    /// Contents page node: heading plus one row per entry.
    pub fn build_toc(&self, entries: &[TocEntry]) -> NodeId {
        let mut tree = self.view.borrow_mut();
        let toc = tree.append(
            self.container,
            ViewNode::new("div")
                .with_class("report-toc")
                .with_style("width", "1100px"),
        );
        tree.append(toc, ViewNode::new("h2").with_text(CONTENTS_TITLE));
        for entry in entries {
            let row = tree.append(toc, ViewNode::new("div").with_class("toc-row"));
            tree.append(row, ViewNode::new("span").with_class("toc-title").with_text(&entry.title));
            tree.append(
                row,
                ViewNode::new("span")
                    .with_class("toc-page")
                    .with_text(entry.page.to_string()),
            );
        }
        toc
    }

    pub fn build_footer(&self, label: &FooterLabel) -> NodeId {
        let mut tree = self.view.borrow_mut();
        tree.append(
            self.container,
            ViewNode::new("div")
                .with_class("page-footer")
                .with_attr("data-footer-index", label.index.to_string())
                .with_style("width", "1100px")
                .with_style("height", "40px")
                .with_text(&label.text),
        )
    }
}

impl Drop for ScratchArea {
    fn drop(&mut self) {
        match self.view.try_borrow_mut() {
            Ok(mut tree) => tree.detach(self.container),
            Err(_) => error!("View busy; scratch container left attached"),
        }
    }
}
