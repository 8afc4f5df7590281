//! Phased dashboard-to-PDF report pipeline.
//!
//! Turns a live dashboard view into a multi-page PDF: a branded cover, an
//! optional table of contents, two visualizations per content page with
//! footers, and a closing back page.
//!
//! # Phases
//!
//! - Initialization: validate configuration, locate the dashboard root
//! - Data gathering: discover panels, normalize layout, capture every element
//! - Info retrieval: tenant name, dashboard title, timestamp
//! - PDF generation: render content pages, merge into the template
//! - Success: confirm and dismiss the progress modal
//!
//! # Example
//!
//! ```no_run
//! use dr_report::{
//!     view::load_view, CanvasRasterizer, FileAssets, PageLayoutRenderer, ReportConfig,
//!     ReportPipeline, ViewInfoResolver,
//! };
//! use std::path::Path;
//! use std::rc::Rc;
//!
//! # async fn run() -> dr_report::Result<()> {
//! let view = load_view(Path::new("dashboard.json"))?.into_shared();
//! let config = ReportConfig::new().with_organization("Acme");
//! let pipeline = ReportPipeline::builder()
//!     .with_rasterizer(Rc::new(CanvasRasterizer::new()))
//!     .with_assets(Rc::new(FileAssets::new("template.pdf")))
//!     .with_info(Rc::new(ViewInfoResolver::new(view.clone(), "Acme")))
//!     .with_renderer(Rc::new(PageLayoutRenderer::new()))
//!     .build()?;
//! let outcome = pipeline.generate(&view, &config).await?;
//! std::fs::write("report.pdf", &outcome.pdf)?;
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod discovery;
pub mod entry;
pub mod error;
pub mod host;
pub mod layout;
pub mod pagination;
pub mod pdf;
pub mod phase;
pub mod pipeline;
pub mod view;

pub use capture::{CanvasRasterizer, CaptureOrchestrator, CaptureProfile, CaptureRequest, Rasterizer};
pub use config::{FontFaces, ReportConfig, TextPosition, TextPositions};
pub use discovery::{discover_panels, PanelRecord};
pub use entry::{EntryType, VisualizationEntry};
pub use error::{ReportError, Result};
pub use host::{
    AssetProvider, FileAssets, InfoResolver, JsonlProgressHost, ModalKind, ProgressHost,
    StaticAssets, StaticInfo, TracingProgressHost, ViewInfoResolver,
};
pub use layout::LayoutNormalizer;
pub use pagination::{PaginationPlan, PaginationPlanner};
pub use pdf::{ContentRenderer, DocumentAssembler, PageLayoutRenderer};
pub use phase::{PhaseKey, PhaseOrchestrator};
pub use pipeline::{PipelineState, ReportOutcome, ReportPipeline, ReportPipelineBuilder};
