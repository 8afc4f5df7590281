//! Capture of a single view element into a PNG.
//!
//! The live element is never rasterized directly. It is hidden, deep-cloned
//! into an off-screen position, prepared for its kind and profile, and the
//! clone is rasterized. [`CaptureScope`] undoes all of that on every exit
//! path and fires the completion callback exactly once.

pub mod prep;
pub mod profile;
pub mod raster;

pub use profile::{detect_profile, CaptureProfile, TIME_SERIES_SCALE};
pub use raster::{
    decode_png, encode_png, snap_near_white, CanvasRasterizer, RasterOptions, Rasterizer,
};

use crate::entry::EntryType;
use crate::error::{ReportError, Result};
use crate::layout::kinds::WIDE_CHART;
use crate::view::{names, NodeId, SharedView, ViewTree};

use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, error};

/// Wait between staging the clone and rasterizing it.
pub const CAPTURE_SETTLE: Duration = Duration::from_millis(500);

/// Scale used when the caller does not ask for one.
pub const DEFAULT_SCALE: f32 = 1.5;

/// Parameters of one capture.
#[derive(Clone, Copy)]
pub struct CaptureRequest<'a> {
    /// Name used in logs and errors.
    pub label: &'a str,
    /// Forced profile; detected from the element when absent.
    pub profile: Option<CaptureProfile>,
    pub scale: f32,
    pub kind: Option<EntryType>,
    /// Invoked once when the capture finishes, successful or not.
    pub on_complete: Option<&'a dyn Fn()>,
}

impl<'a> CaptureRequest<'a> {
    pub fn new(label: &'a str) -> Self {
        Self {
            label,
            profile: None,
            scale: DEFAULT_SCALE,
            kind: None,
            on_complete: None,
        }
    }

    pub fn with_profile(mut self, profile: CaptureProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_kind(mut self, kind: EntryType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn on_complete(mut self, callback: &'a dyn Fn()) -> Self {
        self.on_complete = Some(callback);
        self
    }
}

/// Result of a successful capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub profile: CaptureProfile,
}

/// Captures view elements through a [`Rasterizer`].
#[derive(Clone)]
pub struct CaptureOrchestrator {
    rasterizer: Rc<dyn Rasterizer>,
}

impl CaptureOrchestrator {
    pub fn new(rasterizer: Rc<dyn Rasterizer>) -> Self {
        Self { rasterizer }
    }

    pub async fn capture(
        &self,
        view: &SharedView,
        node: NodeId,
        request: CaptureRequest<'_>,
    ) -> Result<CapturedImage> {
        let mut scope = CaptureScope::enter(view.clone(), node, request.on_complete);
        let profile = {
            let mut tree = view.borrow_mut();
            let profile = request
                .profile
                .unwrap_or_else(|| detect_profile(&tree, node));
            scope.stage(&mut tree, request.kind);
            profile
        };
        debug!(element = request.label, ?profile, "Capture staged");

        tokio::time::sleep(CAPTURE_SETTLE).await;

        let (clone, window) = {
            let mut tree = view.borrow_mut();
            let mut clone = scope.stage_late(&mut tree);
            match profile {
                CaptureProfile::Arc => {
                    clone = scope.stage(&mut tree, request.kind);
                    let expanded = prep::expand_details(&mut tree, clone);
                    debug!(element = request.label, expanded, "Re-cloned arc chart");
                }
                CaptureProfile::Metric => prep::bake_metric_transforms(&mut tree, clone),
                CaptureProfile::TimeSeries | CaptureProfile::Default => {}
            }
            (clone, capture_box(&tree, clone))
        };

        let options = profile.options(request.scale, window);
        let mut image = self
            .rasterizer
            .rasterize(view, clone, &options)
            .await
            .map_err(|err| as_capture_failure(request.label, err))?;
        if profile.snaps_near_white() {
            snap_near_white(&mut image);
        }
        let png = encode_png(&image).map_err(|err| as_capture_failure(request.label, err))?;
        debug!(
            element = request.label,
            width = image.width(),
            height = image.height(),
            bytes = png.len(),
            "Capture complete"
        );

        Ok(CapturedImage {
            png,
            width: image.width(),
            height: image.height(),
            profile,
        })
    }
}

fn capture_box(tree: &ViewTree, clone: NodeId) -> (u32, u32) {
    let style = tree.node(clone).style();
    (
        style.pixels("width").unwrap_or(WIDE_CHART.width),
        style.pixels("height").unwrap_or(WIDE_CHART.height),
    )
}

fn as_capture_failure(label: &str, err: ReportError) -> ReportError {
    match err {
        ReportError::CaptureFailure { .. } => err,
        other => ReportError::capture(label, other),
    }
}

/// Hides the original, owns the staged clone, and undoes both on drop.
struct CaptureScope<'a> {
    view: SharedView,
    original: NodeId,
    prior_visibility: Option<String>,
    prior_marker: Option<String>,
    clone: Option<NodeId>,
    on_complete: Option<&'a dyn Fn()>,
}

impl<'a> CaptureScope<'a> {
    fn enter(view: SharedView, original: NodeId, on_complete: Option<&'a dyn Fn()>) -> Self {
        let (prior_visibility, prior_marker) = {
            let mut tree = view.borrow_mut();
            let visibility = tree.style(original, "visibility").map(str::to_string);
            let marker = tree.node(original).attr(names::ATTR_CAPTURE_HIDDEN).map(str::to_string);
            tree.set_style(original, "visibility", "hidden");
            tree.put_attr(original, names::ATTR_CAPTURE_HIDDEN, Some("capture"));
            (visibility, marker)
        };
        Self {
            view,
            original,
            prior_visibility,
            prior_marker,
            clone: None,
            on_complete,
        }
    }

    /// Deep-clone the original off-screen, replacing any earlier clone.
    fn stage(&mut self, tree: &mut ViewTree, kind: Option<EntryType>) -> NodeId {
        if let Some(previous) = self.clone.take() {
            tree.detach(previous);
        }
        let (clone, pairs) = tree.deep_clone(self.original);
        // Canvas pixels are not part of the structural clone.
        for (source, copy) in pairs {
            if let Some(pixels) = tree.node(source).canvas.clone() {
                tree.node_mut(copy).canvas = Some(pixels);
            }
        }
        let root = tree.root();
        tree.attach(root, clone);
        self.clone = Some(clone);

        if let Some(kind) = kind {
            prep::prepare_for_kind(tree, clone, kind);
        }
        prep::position_offscreen(tree, clone);
        prep::strip_decorative(tree, clone);
        clone
    }

    /// Strip decorative nodes that appeared while the clone was settling.
    fn stage_late(&mut self, tree: &mut ViewTree) -> NodeId {
        match self.clone {
            Some(clone) => {
                let late = prep::strip_decorative(tree, clone);
                if late > 0 {
                    debug!(late, "Removed late decorative nodes");
                }
                clone
            }
            None => self.stage(tree, None),
        }
    }
}

impl Drop for CaptureScope<'_> {
    fn drop(&mut self) {
        match self.view.try_borrow_mut() {
            Ok(mut tree) => {
                if let Some(clone) = self.clone.take() {
                    tree.detach(clone);
                }
                tree.put_style(self.original, "visibility", self.prior_visibility.as_deref());
                tree.put_attr(self.original, names::ATTR_CAPTURE_HIDDEN, self.prior_marker.as_deref());
            }
            Err(_) => error!(node = %self.original, "View busy; capture clone left in place"),
        }
        if let Some(callback) = self.on_complete {
            callback();
        }
    }
}
