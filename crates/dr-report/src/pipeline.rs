//! The phased report pipeline.
//!
//! ```text
//! initialization -> data_gathering -> info_retrieval -> pdf_generation -> success
//! ```
//!
//! Every fatal error lands in one handler that shows an error modal, waits
//! for the auto-dismiss delay, hides the modal and returns the error.

use crate::capture::{CaptureOrchestrator, CaptureRequest, Rasterizer};
use crate::config::ReportConfig;
use crate::discovery::{discover_panels, PanelRecord, UNTITLED_PANEL};
use crate::entry::{EntryType, VisualizationEntry};
use crate::error::{ReportError, Result};
use crate::host::{AssetProvider, InfoResolver, ModalKind, ProgressHost};
use crate::layout::LayoutNormalizer;
use crate::pagination::{PaginationPlan, PaginationPlanner, PanelEntries, ScratchArea};
use crate::pdf::{ContentLayout, ContentRenderer, CoverText, DocumentAssembler};
use crate::phase::{PhaseKey, PhaseOrchestrator};
use crate::view::{names, NodeId, SharedView};

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// How long the error modal stays up before it is hidden.
pub const ERROR_DISMISS_DELAY: Duration = Duration::from_secs(3);

/// How long the success modal stays up before it is hidden.
pub const SUCCESS_DISMISS_DELAY: Duration = Duration::from_millis(1500);

/// Cover-page timestamp format.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// Share of `data_gathering` spent before panel captures start.
const CAPTURE_START: f64 = 0.1;
/// Share of `data_gathering` at which panel captures are done.
const CAPTURE_END: f64 = 0.8;

/// Observable pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "phase", rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Running(PhaseKey),
    Succeeded,
    Failed(PhaseKey),
}

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub pdf: Vec<u8>,
    pub entries: Vec<VisualizationEntry>,
    pub plan: PaginationPlan,
    pub durations: BTreeMap<PhaseKey, Duration>,
}

impl ReportOutcome {
    pub fn total_pages(&self) -> usize {
        self.plan.total_pages
    }
}

/// Collects the pipeline's collaborators.
#[derive(Default)]
pub struct ReportPipelineBuilder {
    rasterizer: Option<Rc<dyn Rasterizer>>,
    assets: Option<Rc<dyn AssetProvider>>,
    info: Option<Rc<dyn InfoResolver>>,
    renderer: Option<Rc<dyn ContentRenderer>>,
    progress: Option<Arc<dyn ProgressHost>>,
}

impl ReportPipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rasterizer(mut self, rasterizer: Rc<dyn Rasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn with_assets(mut self, assets: Rc<dyn AssetProvider>) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn with_info(mut self, info: Rc<dyn InfoResolver>) -> Self {
        self.info = Some(info);
        self
    }

    pub fn with_renderer(mut self, renderer: Rc<dyn ContentRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Optional; without it progress updates are dropped.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressHost>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn build(self) -> Result<ReportPipeline> {
        let rasterizer = self.rasterizer.ok_or(ReportError::MissingDependency("rasterizer"))?;
        let assets = self.assets.ok_or(ReportError::MissingDependency("asset provider"))?;
        let info = self.info.ok_or(ReportError::MissingDependency("info resolver"))?;
        let renderer = self.renderer.ok_or(ReportError::MissingDependency("content renderer"))?;
        Ok(ReportPipeline {
            phases: PhaseOrchestrator::new(self.progress),
            capture: CaptureOrchestrator::new(rasterizer),
            normalizer: LayoutNormalizer::new(),
            assets,
            info,
            renderer,
            state: Cell::new(PipelineState::Idle),
        })
    }
}

/// Anchor nodes located during initialization.
#[derive(Debug, Clone, Copy)]
struct Anchors {
    title: Option<NodeId>,
    header: Option<NodeId>,
}

/// Output of `data_gathering`.
struct Gathered {
    plan: PaginationPlan,
    entries: Vec<VisualizationEntry>,
}

/// Turns a dashboard view into a PDF report.
pub struct ReportPipeline {
    phases: PhaseOrchestrator,
    capture: CaptureOrchestrator,
    normalizer: LayoutNormalizer,
    assets: Rc<dyn AssetProvider>,
    info: Rc<dyn InfoResolver>,
    renderer: Rc<dyn ContentRenderer>,
    state: Cell<PipelineState>,
}

impl ReportPipeline {
    pub fn builder() -> ReportPipelineBuilder {
        ReportPipelineBuilder::new()
    }

    pub fn state(&self) -> PipelineState {
        self.state.get()
    }

    pub fn phases(&self) -> &PhaseOrchestrator {
        &self.phases
    }

    /// Run every phase against `view`.
    pub async fn generate(&self, view: &SharedView, config: &ReportConfig) -> Result<ReportOutcome> {
        match self.run(view, config).await {
            Ok(outcome) => {
                self.state.set(PipelineState::Succeeded);
                Ok(outcome)
            }
            Err(err) => {
                let phase = match self.state.get() {
                    PipelineState::Running(phase) => phase,
                    _ => PhaseKey::Initialization,
                };
                self.fail(phase, err).await
            }
        }
    }

    async fn run(&self, view: &SharedView, config: &ReportConfig) -> Result<ReportOutcome> {
        self.enter(PhaseKey::Initialization);
        let anchors = self
            .phases
            .execute_phase(PhaseKey::Initialization, || self.initialize(view, config))
            .await?;

        self.enter(PhaseKey::DataGathering);
        let gathered = self
            .phases
            .execute_phase(PhaseKey::DataGathering, || self.gather(view, config, anchors))
            .await?;

        self.enter(PhaseKey::InfoRetrieval);
        let cover = self
            .phases
            .execute_phase(PhaseKey::InfoRetrieval, || self.retrieve_info())
            .await?;

        self.enter(PhaseKey::PdfGeneration);
        let pdf = self
            .phases
            .execute_phase(PhaseKey::PdfGeneration, || {
                self.generate_pdf(config, &gathered, &cover)
            })
            .await?;

        self.enter(PhaseKey::Success);
        self.phases
            .execute_phase(PhaseKey::Success, || async { Ok(()) })
            .await?;
        self.phases
            .notify(ModalKind::Success, PhaseKey::Success.message(), 100);
        tokio::time::sleep(SUCCESS_DISMISS_DELAY).await;
        self.phases.dismiss();

        let durations = PhaseKey::ALL
            .iter()
            .filter_map(|phase| {
                let last = self.phases.history(*phase).iter().last().copied();
                last.map(|d| (*phase, d))
            })
            .collect();
        info!(
            pages = gathered.plan.total_pages,
            bytes = pdf.len(),
            "Report generated"
        );
        Ok(ReportOutcome {
            pdf,
            entries: gathered.entries,
            plan: gathered.plan,
            durations,
        })
    }

    fn enter(&self, phase: PhaseKey) {
        self.state.set(PipelineState::Running(phase));
    }

    async fn fail(&self, phase: PhaseKey, err: ReportError) -> Result<ReportOutcome> {
        self.state.set(PipelineState::Failed(phase));
        let message = err
            .user_message()
            .unwrap_or_else(|| phase.failure_message().to_string());
        error!(phase = %phase, error = %err, "Report generation failed");
        self.phases
            .notify(ModalKind::Error, &message, self.phases.last_percent());
        tokio::time::sleep(ERROR_DISMISS_DELAY).await;
        self.phases.dismiss();
        Err(err)
    }

    async fn initialize(&self, view: &SharedView, config: &ReportConfig) -> Result<Anchors> {
        config.validate()?;
        let tree = view.borrow();
        let root = tree.root();
        if tree.find_first(root, names::DASHBOARD_ROOT).is_none() {
            return Err(ReportError::ElementNotFound {
                selector: ".dashboard-container".to_string(),
            });
        }
        Ok(Anchors {
            title: tree.find_first(root, names::DASHBOARD_TITLE),
            header: tree.find_first(root, names::TIME_RANGE),
        })
    }

    async fn gather(&self, view: &SharedView, config: &ReportConfig, anchors: Anchors) -> Result<Gathered> {
        let panels = discover_panels(&view.borrow())?;
        let planner = PaginationPlanner::new(config.allow_table_of_contents, config.organization.clone());
        let plan = planner.plan_panels(&panels);
        self.phases
            .report_with_message(PhaseKey::DataGathering, CAPTURE_START / 2.0, "Preparing visualizations...");

        let layout = self.normalizer.normalize(view, &panels).await;
        let visualizations = self.capture_panels(view, config, &panels).await;
        let titles = self.capture_panel_titles(view, &panels, config.capture_scale).await;
        layout.restore();
        let panel_entries = titles
            .into_iter()
            .zip(visualizations)
            .map(|(title, visualization)| PanelEntries { title, visualization })
            .collect();

        // Auxiliary nodes live in a scratch area for the rest of the phase.
        let scratch = ScratchArea::open(view);
        let scale = config.capture_scale;
        let toc = if config.allow_table_of_contents {
            let node = scratch.build_toc(&plan.toc);
            self.capture_auxiliary(view, Some(node), "table-of-contents", "", EntryType::TableOfContents, scale)
                .await
        } else {
            VisualizationEntry::new("table-of-contents", "", EntryType::TableOfContents, Vec::new())
        };

        let footer_nodes: Vec<(String, String, NodeId)> = plan
            .footers
            .iter()
            .map(|label| (format!("footer-{}", label.index), label.text.clone(), scratch.build_footer(label)))
            .collect();
        let footers = join_all(footer_nodes.iter().map(|(id, text, node)| {
            self.capture_auxiliary(view, Some(*node), id, text, EntryType::PageFooter, scale)
        }))
        .await;
        self.phases.report(PhaseKey::DataGathering, 0.9);

        let (title_text, header_text) = {
            let tree = view.borrow();
            let text = |node: Option<NodeId>| node.map(|n| tree.text_content(n)).unwrap_or_default();
            (text(anchors.title), text(anchors.header))
        };
        let title = self
            .capture_auxiliary(view, anchors.title, "dashboard-title", &title_text, EntryType::DashboardTitle, scale)
            .await;
        let header = self
            .capture_auxiliary(view, anchors.header, "time-range", &header_text, EntryType::Header, scale)
            .await;
        drop(scratch);

        let entries = planner.sequence(toc, footers, title, header, panel_entries);
        Ok(Gathered { plan, entries })
    }

    /// Capture every panel concurrently. Failures leave an empty image.
    async fn capture_panels(
        &self,
        view: &SharedView,
        config: &ReportConfig,
        panels: &[PanelRecord],
    ) -> Vec<VisualizationEntry> {
        let total = panels.len();
        let completed = Cell::new(0usize);
        let on_done = || {
            let done = completed.get() + 1;
            completed.set(done);
            let fraction = CAPTURE_START + (CAPTURE_END - CAPTURE_START) * done as f64 / total as f64;
            self.phases.report_with_message(
                PhaseKey::DataGathering,
                fraction,
                &format!("Capturing visualizations ({done}/{total})..."),
            );
        };

        let captures = panels.iter().map(|panel| {
            let request = CaptureRequest::new(&panel.id)
                .with_scale(config.capture_scale)
                .with_kind(EntryType::Visualization)
                .on_complete(&on_done);
            self.capture.capture(view, panel.node, request)
        });
        let results = join_all(captures).await;

        panels
            .iter()
            .zip(results)
            .map(|(panel, result)| {
                let data = match result {
                    Ok(image) => image.png,
                    Err(err) => {
                        log_degraded(&panel.id, &err);
                        Vec::new()
                    }
                };
                VisualizationEntry::new(panel.id.clone(), panel.title.clone(), EntryType::Visualization, data)
            })
            .collect()
    }

    /// Title entries for titled panels, captured from each panel's header
    /// node. A failed or missing header leaves an empty image.
    async fn capture_panel_titles(
        &self,
        view: &SharedView,
        panels: &[PanelRecord],
        scale: f32,
    ) -> Vec<Option<VisualizationEntry>> {
        let captures = panels.iter().map(|panel| async move {
            if panel.title == UNTITLED_PANEL {
                return None;
            }
            let id = format!("{}-title", panel.id);
            let entry = match panel.title_node {
                Some(node) => {
                    self.capture_auxiliary(view, Some(node), &id, &panel.title, EntryType::VisualizationTitle, scale)
                        .await
                }
                None => VisualizationEntry::new(id, panel.title.clone(), EntryType::VisualizationTitle, Vec::new()),
            };
            Some(entry)
        });
        join_all(captures).await
    }

    /// Capture a non-panel element; failure yields an empty image.
    async fn capture_auxiliary(
        &self,
        view: &SharedView,
        node: Option<NodeId>,
        id: &str,
        title: &str,
        kind: EntryType,
        scale: f32,
    ) -> VisualizationEntry {
        let Some(node) = node else {
            warn!(element = id, "Element not found; using an empty image");
            return VisualizationEntry::new(id, title, kind, Vec::new());
        };
        let request = CaptureRequest::new(id).with_kind(kind).with_scale(scale);
        match self.capture.capture(view, node, request).await {
            Ok(image) => VisualizationEntry::new(id, title, kind, image.png),
            Err(err) => {
                log_degraded(id, &err);
                VisualizationEntry::new(id, title, kind, Vec::new())
            }
        }
    }

    async fn retrieve_info(&self) -> Result<CoverText> {
        let (tenant, dashboard) =
            tokio::try_join!(self.info.tenant_name(), self.info.dashboard_title())?;
        Ok(CoverText {
            tenant,
            dashboard,
            timestamp: Utc::now().format(TIMESTAMP_FORMAT).to_string(),
        })
    }

    async fn generate_pdf(&self, config: &ReportConfig, gathered: &Gathered, cover: &CoverText) -> Result<Vec<u8>> {
        let content = async {
            let layout = ContentLayout {
                table_of_contents: config.allow_table_of_contents,
                toc: gathered.plan.toc.clone(),
                logo: self.assets.logo().await?,
            };
            self.renderer.render(&gathered.entries, &layout).await
        };
        let (template, content) = tokio::try_join!(self.assets.template(), content)?;
        DocumentAssembler::from_config(config).assemble(&template, &content, cover)
    }
}

/// Log a capture that was replaced by an empty image. Capture failures are
/// expected here; anything else points at a broken rasterizer.
fn log_degraded(element: &str, err: &ReportError) {
    if err.is_fatal() {
        error!(element, error = %err, "Unexpected error during capture; using an empty image");
    } else {
        warn!(element, error = %err, "Capture failed; using an empty image");
    }
}
