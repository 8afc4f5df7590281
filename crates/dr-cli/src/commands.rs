//! Subcommand implementations.

use dr_report::view::load_view;
use dr_report::{
    CanvasRasterizer, FileAssets, JsonlProgressHost, PageLayoutRenderer, PaginationPlan,
    PaginationPlanner, PhaseKey, ProgressHost, ReportConfig, ReportOutcome, ReportPipeline, Result,
    TracingProgressHost, ViewInfoResolver,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use tracing::info;

/// Where progress modal updates go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ProgressMode {
    /// JSON lines on stderr.
    Jsonl,
    /// tracing events.
    #[default]
    Log,
    /// Discard progress updates.
    #[value(name = "none")]
    Off,
}

/// Inputs of one `render` run.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub view: PathBuf,
    pub template: PathBuf,
    pub logo: Option<PathBuf>,
    pub output: PathBuf,
    pub progress: ProgressMode,
    pub dump_entries: Option<PathBuf>,
}

/// Printed on stdout after a successful render.
#[derive(Debug, Clone, Serialize)]
pub struct RenderSummary {
    pub output: PathBuf,
    pub total_pages: usize,
    pub entries: usize,
    pub pdf_bytes: usize,
    pub phase_ms: BTreeMap<String, u64>,
}

impl RenderSummary {
    pub fn new(output: PathBuf, outcome: &ReportOutcome) -> Self {
        Self {
            output,
            total_pages: outcome.total_pages(),
            entries: outcome.entries.len(),
            pdf_bytes: outcome.pdf.len(),
            phase_ms: outcome
                .durations
                .iter()
                .map(|(phase, d)| (phase.as_str().to_string(), d.as_millis() as u64))
                .collect(),
        }
    }
}

fn progress_host(mode: ProgressMode) -> Option<Arc<dyn ProgressHost>> {
    match mode {
        ProgressMode::Jsonl => Some(Arc::new(JsonlProgressHost::new(std::io::stderr()))),
        ProgressMode::Log => Some(Arc::new(TracingProgressHost)),
        ProgressMode::Off => None,
    }
}

/// Generate a report from a view fixture and write it to `request.output`.
pub async fn render(config: &ReportConfig, request: &RenderRequest) -> Result<RenderSummary> {
    let view = load_view(&request.view)?.into_shared();

    let mut assets = FileAssets::new(&request.template);
    if let Some(logo) = &request.logo {
        assets = assets.with_logo(logo);
    }
    let mut builder = ReportPipeline::builder()
        .with_rasterizer(Rc::new(CanvasRasterizer::new()))
        .with_assets(Rc::new(assets))
        .with_info(Rc::new(ViewInfoResolver::new(view.clone(), config.organization.clone())))
        .with_renderer(Rc::new(PageLayoutRenderer::new()));
    if let Some(host) = progress_host(request.progress) {
        builder = builder.with_progress(host);
    }
    let pipeline = builder.build()?;

    let outcome = pipeline.generate(&view, config).await?;
    tokio::fs::write(&request.output, &outcome.pdf).await?;
    if let Some(path) = &request.dump_entries {
        tokio::fs::write(path, serde_json::to_vec_pretty(&outcome.entries)?).await?;
    }
    info!(
        output = %request.output.display(),
        pages = outcome.total_pages(),
        pdf_ms = outcome
            .durations
            .get(&PhaseKey::PdfGeneration)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0),
        "Report written"
    );
    Ok(RenderSummary::new(request.output.clone(), &outcome))
}

/// Pagination plan for `panels` placeholder panels.
pub fn plan(panels: usize, table_of_contents: bool, organization: &str) -> PaginationPlan {
    let titles: Vec<String> = (1..=panels).map(|i| format!("Panel {i}")).collect();
    PaginationPlanner::new(table_of_contents, organization).plan(&titles)
}
