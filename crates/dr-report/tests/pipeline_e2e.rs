//! End-to-end pipeline runs against in-memory dashboards.

use async_trait::async_trait;
use dr_report::capture::RasterOptions;
use dr_report::pagination::{APPENDIX_TITLE, CONTENTS_TITLE, COVER_TITLE};
use dr_report::view::{names, NodeId, SharedView, ViewNode, ViewTree};
use dr_report::{
    CanvasRasterizer, EntryType, ModalKind, PageLayoutRenderer, PhaseKey, PipelineState,
    ProgressHost, Rasterizer, ReportConfig, ReportError, ReportPipeline, StaticAssets, StaticInfo,
};
use image::{Rgba, RgbaImage};
use lopdf::content::Content;
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct RecordingHost {
    shown: Mutex<Vec<(String, ModalKind, u8)>>,
    hidden: AtomicUsize,
}

impl ProgressHost for RecordingHost {
    fn show_modal(&self, message: &str, kind: ModalKind, percent: u8) {
        self.shown
            .lock()
            .unwrap()
            .push((message.to_string(), kind, percent));
    }

    fn hide_modal(&self) {
        self.hidden.fetch_add(1, Ordering::SeqCst);
    }
}

struct FailingRasterizer;

#[async_trait(?Send)]
impl Rasterizer for FailingRasterizer {
    async fn rasterize(&self, _: &SharedView, _: NodeId, _: &RasterOptions) -> dr_report::Result<RgbaImage> {
        Err(ReportError::Io(std::io::Error::other("renderer crashed")))
    }
}

/// Finishes each capture after the delay named by `data-delay-ms`.
struct DelayedRasterizer;

#[async_trait(?Send)]
impl Rasterizer for DelayedRasterizer {
    async fn rasterize(&self, view: &SharedView, node: NodeId, _: &RasterOptions) -> dr_report::Result<RgbaImage> {
        let delay = {
            let tree = view.borrow();
            tree.subtree(node)
                .into_iter()
                .find_map(|n| tree.node(n).attr("data-delay-ms").and_then(|d| d.parse::<u64>().ok()))
        };
        let Some(delay) = delay else {
            return Err(ReportError::capture("aux", "no delay"));
        };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 200, 255])))
    }
}

fn template() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..2)
        .map(|_| {
            let body = Content { operations: vec![] };
            let contents = doc.add_object(Stream::new(Dictionary::new(), body.encode().unwrap()));
            Object::Reference(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => contents,
                "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(595), Object::Integer(842)],
            }))
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(2),
        }),
    );
    let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog);
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// A dashboard with one line chart per title.
fn dashboard(titles: &[&str]) -> SharedView {
    let mut tree = ViewTree::new();
    let root = tree.root();
    let container = tree.append(
        root,
        ViewNode::new("div")
            .with_class("dashboard-container")
            .with_attr("data-tenant", "Acme"),
    );
    tree.append(container, ViewNode::new("h1").with_class("dashboard-title").with_text("Ops"));
    tree.append(
        container,
        ViewNode::new("div").with_class("time-range-picker").with_text("Last 24 hours"),
    );
    for (i, title) in titles.iter().enumerate() {
        let cell = tree.append(container, ViewNode::new("div").with_class("grid-cell"));
        let panel = tree.append(
            cell,
            ViewNode::new("div")
                .with_class("dashboard-panel")
                .with_attr("data-title", *title)
                .with_attr("data-delay-ms", ((titles.len() - i) * 100).to_string()),
        );
        let body = tree.append(panel, ViewNode::new("div").with_class("panel-body"));
        tree.append(
            body,
            ViewNode::new("canvas")
                .with_class("vis-line")
                .with_canvas(RgbaImage::from_pixel(8, 4, Rgba([30, 90, 160, 255]))),
        );
    }
    tree.into_shared()
}

fn pipeline(rasterizer: Rc<dyn Rasterizer>, host: Arc<RecordingHost>) -> ReportPipeline {
    ReportPipeline::builder()
        .with_rasterizer(rasterizer)
        .with_assets(Rc::new(StaticAssets::new(template())))
        .with_info(Rc::new(StaticInfo::new("Acme", "Ops")))
        .with_renderer(Rc::new(PageLayoutRenderer::new()))
        .with_progress(host)
        .build()
        .unwrap()
}

fn page_count(pdf: &[u8]) -> usize {
    Document::load_mem(pdf).unwrap().get_pages().len()
}

#[tokio::test(start_paused = true)]
async fn test_five_panels_with_contents() {
    let view = dashboard(&["p1", "p2", "p3", "p4", "p5"]);
    let before = view.borrow().styles();
    let host = Arc::new(RecordingHost::default());
    let pipeline = pipeline(Rc::new(CanvasRasterizer::new()), host.clone());
    let config = ReportConfig::new()
        .with_organization("Acme")
        .with_table_of_contents(true);

    let outcome = pipeline.generate(&view, &config).await.unwrap();

    assert_eq!(pipeline.state(), PipelineState::Succeeded);
    assert_eq!(outcome.total_pages(), 6);
    assert_eq!(outcome.plan.footers.len(), 7);
    let toc: Vec<(&str, usize)> = outcome
        .plan
        .toc
        .iter()
        .map(|e| (e.title.as_str(), e.page))
        .collect();
    assert_eq!(
        toc,
        vec![
            (COVER_TITLE, 1),
            (CONTENTS_TITLE, 2),
            ("p1", 3),
            ("p2", 3),
            ("p3", 4),
            ("p4", 4),
            ("p5", 5),
            (APPENDIX_TITLE, 6),
        ]
    );

    // Cover + contents + three content pages + back page.
    assert_eq!(page_count(&outcome.pdf), 6);

    // The view looks exactly as it did before the run.
    assert_eq!(view.borrow().styles(), before);

    let visualizations: Vec<&str> = outcome
        .entries
        .iter()
        .filter(|e| e.kind == EntryType::Visualization)
        .map(|e| e.title.as_str())
        .collect();
    assert_eq!(visualizations, ["p1", "p2", "p3", "p4", "p5"]);
    assert!(outcome
        .entries
        .iter()
        .filter(|e| e.kind == EntryType::Visualization)
        .all(|e| e.has_image()));

    let shown = host.shown.lock().unwrap();
    let last = shown.last().unwrap();
    assert_eq!((last.1, last.2), (ModalKind::Success, 100));
    let loading: Vec<u8> = shown
        .iter()
        .filter(|(_, kind, _)| *kind == ModalKind::Loading)
        .map(|(_, _, p)| *p)
        .collect();
    assert!(loading.windows(2).all(|w| w[0] <= w[1]), "{loading:?}");
    assert_eq!(host.hidden.load(Ordering::SeqCst), 1);
    assert!(outcome.durations.contains_key(&PhaseKey::PdfGeneration));
}

#[tokio::test(start_paused = true)]
async fn test_failed_auxiliary_captures_still_produce_report() {
    // Title, header, contents and footers are text only, which the canvas
    // rasterizer cannot paint.
    let view = dashboard(&["p1", "p2"]);
    let host = Arc::new(RecordingHost::default());
    let pipeline = pipeline(Rc::new(CanvasRasterizer::new()), host);

    let outcome = pipeline
        .generate(&view, &ReportConfig::new())
        .await
        .unwrap();

    let title = outcome
        .entries
        .iter()
        .find(|e| e.kind == EntryType::DashboardTitle)
        .unwrap();
    assert!(!title.has_image());
    assert_eq!(title.title, "Ops");
    let header = outcome
        .entries
        .iter()
        .find(|e| e.kind == EntryType::Header)
        .unwrap();
    assert_eq!(header.title, "Last 24 hours");
    // Cover + contents + one content page holding both panels + back page.
    assert_eq!(page_count(&outcome.pdf), 4);
}

#[tokio::test(start_paused = true)]
async fn test_panel_title_captures() {
    // The first header paints a canvas; the second is text only, so its
    // capture fails and the entry keeps an empty image.
    let view = dashboard(&["p1", "p2"]);
    {
        let mut tree = view.borrow_mut();
        let root = tree.root();
        let panels = tree.find_all(root, names::PANEL);
        tree.append(
            panels[0],
            ViewNode::new("h3")
                .with_class("panel-title")
                .with_canvas(RgbaImage::from_pixel(6, 2, Rgba([10, 10, 10, 255]))),
        );
        tree.append(panels[1], ViewNode::new("h3").with_class("panel-title").with_text("p2"));
    }
    let before = view.borrow().styles();
    let host = Arc::new(RecordingHost::default());
    let pipeline = pipeline(Rc::new(CanvasRasterizer::new()), host);

    let outcome = pipeline
        .generate(&view, &ReportConfig::new())
        .await
        .unwrap();

    assert_eq!(pipeline.state(), PipelineState::Succeeded);
    let titles: Vec<(&str, bool)> = outcome
        .entries
        .iter()
        .filter(|e| e.kind == EntryType::VisualizationTitle)
        .map(|e| (e.title.as_str(), e.has_image()))
        .collect();
    assert_eq!(titles, [("p1", true), ("p2", false)]);
    assert_eq!(view.borrow().styles(), before);

    let tree = view.borrow();
    let marked = tree
        .subtree(tree.root())
        .into_iter()
        .filter(|n| tree.node(*n).attr(names::ATTR_CAPTURE_HIDDEN).is_some())
        .count();
    assert_eq!(marked, 0);
}

#[tokio::test(start_paused = true)]
async fn test_no_valid_panels_leaves_view_untouched() {
    let mut tree = ViewTree::new();
    let root = tree.root();
    let container = tree.append(root, ViewNode::new("div").with_class("dashboard-container"));
    let panel = tree.append(container, ViewNode::new("div").with_class("dashboard-panel"));
    tree.append(panel, ViewNode::new("p").with_text("No results found"));
    let view = tree.into_shared();

    let host = Arc::new(RecordingHost::default());
    let pipeline = pipeline(Rc::new(CanvasRasterizer::new()), host.clone());
    let err = pipeline
        .generate(&view, &ReportConfig::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::NoValidPanels));
    assert_eq!(view.borrow().style_writes(), 0);
    assert_eq!(pipeline.state(), PipelineState::Failed(PhaseKey::DataGathering));

    let shown = host.shown.lock().unwrap();
    let (message, kind, _) = shown.last().unwrap();
    assert_eq!(*kind, ModalKind::Error);
    assert!(message.contains("No printable"));
    assert_eq!(host.hidden.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_dashboard_root_fails_initialization() {
    let view = ViewTree::new().into_shared();
    let host = Arc::new(RecordingHost::default());
    let pipeline = pipeline(Rc::new(CanvasRasterizer::new()), host.clone());

    let err = pipeline
        .generate(&view, &ReportConfig::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::ElementNotFound { .. }));
    assert_eq!(pipeline.state(), PipelineState::Failed(PhaseKey::Initialization));
    assert!(pipeline.phases().history(PhaseKey::DataGathering).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_panel_captures_restore_styles() {
    let view = dashboard(&["p1", "p2", "p3"]);
    let before = view.borrow().styles();
    let host = Arc::new(RecordingHost::default());
    let pipeline = pipeline(Rc::new(FailingRasterizer), host);

    let outcome = pipeline
        .generate(&view, &ReportConfig::new())
        .await
        .unwrap();

    assert!(outcome
        .entries
        .iter()
        .filter(|e| e.kind == EntryType::Visualization)
        .all(|e| !e.has_image()));
    assert!(view.borrow().style_writes() > 0);
    assert_eq!(view.borrow().styles(), before);
}

#[tokio::test(start_paused = true)]
async fn test_out_of_order_completion_keeps_panel_order() {
    // Earlier panels take longer, so captures finish last-to-first.
    let view = dashboard(&["a", "b", "c", "d"]);
    let host = Arc::new(RecordingHost::default());
    let pipeline = pipeline(Rc::new(DelayedRasterizer), host.clone());

    let outcome = pipeline
        .generate(&view, &ReportConfig::new())
        .await
        .unwrap();

    let ids: Vec<&str> = outcome
        .entries
        .iter()
        .filter(|e| e.kind == EntryType::Visualization)
        .map(|e| e.title.as_str())
        .collect();
    assert_eq!(ids, ["a", "b", "c", "d"]);

    let counters: Vec<String> = host
        .shown
        .lock()
        .unwrap()
        .iter()
        .filter(|(m, _, _)| m.starts_with("Capturing visualizations ("))
        .map(|(m, _, _)| m.clone())
        .collect();
    assert_eq!(counters.len(), 4);
    assert_eq!(counters[3], "Capturing visualizations (4/4)...");
}
