//! Report configuration types.

use crate::error::{ReportError, Result};
use serde::{Deserialize, Serialize};

/// A4 page width in millimeters.
pub const A4_WIDTH_MM: f32 = 210.0;
/// A4 page height in millimeters.
pub const A4_HEIGHT_MM: f32 = 297.0;
/// Smallest allowed cover-text font size (pt).
pub const MIN_FONT_SIZE: f32 = 8.0;
/// Largest allowed cover-text font size (pt).
pub const MAX_FONT_SIZE: f32 = 102.0;

/// Placement of one cover-page text string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextPosition {
    /// Horizontal offset in millimeters.
    pub x: f32,
    /// Vertical offset in millimeters.
    pub y: f32,
    /// Font size in points.
    pub size: f32,
}

impl TextPosition {
    pub const fn new(x: f32, y: f32, size: f32) -> Self {
        Self { x, y, size }
    }

    fn validate(&self, field: &str) -> Result<()> {
        if !(0.0..=A4_WIDTH_MM).contains(&self.x) {
            return Err(ReportError::InvalidConfig(format!(
                "{field}.x must be within [0, {A4_WIDTH_MM}] mm, got {}",
                self.x
            )));
        }
        if !(0.0..=A4_HEIGHT_MM).contains(&self.y) {
            return Err(ReportError::InvalidConfig(format!(
                "{field}.y must be within [0, {A4_HEIGHT_MM}] mm, got {}",
                self.y
            )));
        }
        if !(MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&self.size) {
            return Err(ReportError::InvalidConfig(format!(
                "{field}.size must be within [{MIN_FONT_SIZE}, {MAX_FONT_SIZE}] pt, got {}",
                self.size
            )));
        }
        Ok(())
    }
}

/// Cover-page text placements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextPositions {
    #[serde(default = "default_tenant_position")]
    pub tenant_name: TextPosition,
    #[serde(default = "default_dashboard_position")]
    pub dashboard_name: TextPosition,
    #[serde(default = "default_timestamp_position")]
    pub timestamp: TextPosition,
}

fn default_tenant_position() -> TextPosition {
    TextPosition::new(20.0, 120.0, 28.0)
}

fn default_dashboard_position() -> TextPosition {
    TextPosition::new(20.0, 105.0, 20.0)
}

fn default_timestamp_position() -> TextPosition {
    TextPosition::new(20.0, 95.0, 12.0)
}

impl Default for TextPositions {
    fn default() -> Self {
        Self {
            tenant_name: default_tenant_position(),
            dashboard_name: default_dashboard_position(),
            timestamp: default_timestamp_position(),
        }
    }
}

impl TextPositions {
    /// Check every placement against the A4 page and font-size bounds.
    pub fn validate(&self) -> Result<()> {
        self.tenant_name.validate("tenant_name")?;
        self.dashboard_name.validate("dashboard_name")?;
        self.timestamp.validate("timestamp")
    }
}

/// Font faces used for the cover-page overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontFaces {
    /// Face for the tenant and dashboard names.
    #[serde(default = "default_bold_face")]
    pub bold: String,
    /// Face for the timestamp.
    #[serde(default = "default_regular_face")]
    pub regular: String,
}

fn default_bold_face() -> String {
    "Helvetica-Bold".to_string()
}

fn default_regular_face() -> String {
    "Helvetica".to_string()
}

impl Default for FontFaces {
    fn default() -> Self {
        Self {
            bold: default_bold_face(),
            regular: default_regular_face(),
        }
    }
}

/// Complete per-invocation report configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Cover-page text placements.
    #[serde(default)]
    pub text_positions: TextPositions,
    /// Emit the table-of-contents page.
    #[serde(default = "default_true")]
    pub allow_table_of_contents: bool,
    /// Organization shown in footers and used as the tenant fallback.
    #[serde(default)]
    pub organization: String,
    /// Cover-page font faces.
    #[serde(default)]
    pub fonts: FontFaces,
    /// Scale factor passed to the rasterizer.
    #[serde(default = "default_capture_scale")]
    pub capture_scale: f32,
}

fn default_true() -> bool {
    true
}

fn default_capture_scale() -> f32 {
    1.5
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            text_positions: TextPositions::default(),
            allow_table_of_contents: true,
            organization: String::new(),
            fonts: FontFaces::default(),
            capture_scale: default_capture_scale(),
        }
    }
}

impl ReportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the organization name.
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = organization.into();
        self
    }

    /// Enable or disable the table-of-contents page.
    pub fn with_table_of_contents(mut self, enabled: bool) -> Self {
        self.allow_table_of_contents = enabled;
        self
    }

    /// Replace the cover-page text placements.
    pub fn with_text_positions(mut self, positions: TextPositions) -> Self {
        self.text_positions = positions;
        self
    }

    /// Replace the cover-page font faces.
    pub fn with_fonts(mut self, fonts: FontFaces) -> Self {
        self.fonts = fonts;
        self
    }

    /// Validate ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.text_positions.validate()?;
        if !(self.capture_scale.is_finite() && self.capture_scale > 0.0) {
            return Err(ReportError::InvalidConfig(format!(
                "capture_scale must be positive, got {}",
                self.capture_scale
            )));
        }
        Ok(())
    }

    /// Load configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load configuration from TOML.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ReportError::InvalidConfig(e.to_string()))
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
