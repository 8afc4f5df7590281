//! Error types for report generation.

use thiserror::Error;

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Errors that can occur while generating a report.
#[derive(Error, Debug)]
pub enum ReportError {
    /// A required collaborator was not supplied to the pipeline.
    #[error("missing required collaborator: {0}")]
    MissingDependency(&'static str),

    /// An expected anchor node is absent from the dashboard view.
    #[error("dashboard element not found: {selector}")]
    ElementNotFound { selector: String },

    /// Discovery found nothing worth printing.
    #[error("no valid panels found on the dashboard")]
    NoValidPanels,

    /// Rasterizing a single element failed.
    #[error("failed to capture '{element}': {reason}")]
    CaptureFailure { element: String, reason: String },

    /// Font embedding, page copy or serialization failed.
    #[error("failed to assemble PDF: {0}")]
    MergeFailure(String),

    /// Template document does not have the cover and back pages.
    #[error("template must contain at least 2 pages, found {pages}")]
    InvalidTemplate { pages: usize },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Image decode/encode error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<lopdf::Error> for ReportError {
    fn from(err: lopdf::Error) -> Self {
        ReportError::MergeFailure(err.to_string())
    }
}

impl ReportError {
    /// Build a capture failure for the named element.
    pub fn capture(element: impl Into<String>, reason: impl ToString) -> Self {
        ReportError::CaptureFailure {
            element: element.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error aborts the pipeline when it escapes a phase.
    ///
    /// Capture failures are only fatal when they escape a phase; auxiliary
    /// and per-panel captures swallow them before that can happen.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ReportError::CaptureFailure { .. })
    }

    /// Message suitable for the progress modal, if the error carries one.
    pub fn user_message(&self) -> Option<String> {
        match self {
            ReportError::NoValidPanels => Some(
                "No printable visualizations were found on this dashboard.".to_string(),
            ),
            ReportError::ElementNotFound { .. } => {
                Some("The dashboard is not ready to be exported.".to_string())
            }
            ReportError::InvalidTemplate { .. } => {
                Some("The report template is invalid.".to_string())
            }
            ReportError::MissingDependency(_) | ReportError::InvalidConfig(_) => {
                Some(self.to_string())
            }
            _ => None,
        }
    }
}
