//! Page configuration, read from an optional JSON block in the page.

use serde::{Deserialize, Serialize};

use crate::capture::VideoConstraints;
use crate::catalog::FilterCatalog;
use crate::error::Result;

/// Ids of the page elements the session binds to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementIds {
    pub video: String,
    pub canvas: String,
    pub composition: String,
    pub color: String,
}

impl Default for ElementIds {
    fn default() -> Self {
        Self {
            video: "input".into(),
            canvas: "output".into(),
            composition: "composition".into(),
            color: "color".into(),
        }
    }
}

/// Capture size, used for the ideal constraints and as the frame size when
/// the video element carries no size attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

/// Filters selected before the user touches the selectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterDefaults {
    pub convolution: String,
    pub color: String,
}

impl Default for FilterDefaults {
    fn default() -> Self {
        Self {
            convolution: "none".into(),
            color: "none".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub elements: ElementIds,
    pub capture: CaptureConfig,
    pub filters: FilterDefaults,
    /// `tracing` filter directives, e.g. `"camfilter_wasm=debug"`.
    pub log_filter: String,
    /// Start capturing as soon as the module loads.
    pub autostart: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            elements: ElementIds::default(),
            capture: CaptureConfig::default(),
            filters: FilterDefaults::default(),
            log_filter: "info".into(),
            autostart: true,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_filters(mut self, convolution: impl Into<String>, color: impl Into<String>) -> Self {
        self.filters = FilterDefaults {
            convolution: convolution.into(),
            color: color.into(),
        };
        self
    }

    pub fn with_capture_size(mut self, width: u32, height: u32) -> Self {
        self.capture = CaptureConfig { width, height };
        self
    }

    /// Both initial filters must name catalog entries.
    pub fn validate(&self, catalog: &FilterCatalog) -> Result<()> {
        catalog.kernel(&self.filters.convolution)?;
        catalog.color(&self.filters.color)?;
        Ok(())
    }

    pub fn constraints(&self) -> VideoConstraints {
        VideoConstraints::ideal(self.capture.width, self.capture.height)
    }
}
