//! Exit codes for the dashreport CLI.
//!
//! Exit code ranges:
//! - 0: Success
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal errors (bugs, should be reported)

use dr_report::ReportError;

/// Exit codes for dashreport operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Report written / command succeeded
    Clean = 0,

    // ========================================================================
    // User / Environment Errors (10-19)
    // ========================================================================
    /// Invalid arguments or unreadable input file
    ArgsError = 10,

    /// Configuration could not be loaded or is invalid
    ConfigError = 11,

    /// The dashboard has nothing printable
    NoPanels = 12,

    /// The dashboard root element is missing
    ElementMissing = 13,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error
    IoError = 21,

    /// Template invalid or PDF assembly failed
    MergeError = 22,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    /// Codes 10-19: resolvable by the user.
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// Codes 20-29: bugs or environment failures.
    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Error code name (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::NoPanels => "ERR_NO_PANELS",
            ExitCode::ElementMissing => "ERR_ELEMENT_MISSING",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
            ExitCode::MergeError => "ERR_MERGE",
        }
    }
}

impl From<&ReportError> for ExitCode {
    fn from(err: &ReportError) -> Self {
        match err {
            ReportError::InvalidConfig(_) => ExitCode::ConfigError,
            ReportError::NoValidPanels => ExitCode::NoPanels,
            ReportError::ElementNotFound { .. } => ExitCode::ElementMissing,
            ReportError::MergeFailure(_) | ReportError::InvalidTemplate { .. } => ExitCode::MergeError,
            ReportError::Io(_) => ExitCode::IoError,
            ReportError::Json(_) => ExitCode::ArgsError,
            ReportError::MissingDependency(_)
            | ReportError::CaptureFailure { .. }
            | ReportError::Image(_) => ExitCode::InternalError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges() {
        assert!(ExitCode::Clean.is_success());
        assert!(ExitCode::NoPanels.is_user_error());
        assert!(ExitCode::MergeError.is_internal_error());
        assert!(!ExitCode::ConfigError.is_internal_error());
    }

    #[test]
    fn test_report_error_mapping() {
        assert_eq!(ExitCode::from(&ReportError::NoValidPanels), ExitCode::NoPanels);
        assert_eq!(
            ExitCode::from(&ReportError::InvalidTemplate { pages: 1 }),
            ExitCode::MergeError
        );
        assert_eq!(
            ExitCode::from(&ReportError::ElementNotFound {
                selector: ".dashboard-container".to_string()
            })
            .as_i32(),
            13
        );
        assert_eq!(ExitCode::from(&ReportError::MissingDependency("rasterizer")), ExitCode::InternalError);
    }

    #[test]
    fn test_display() {
        assert_eq!(ExitCode::IoError.to_string(), "ERR_IO (21)");
    }
}
