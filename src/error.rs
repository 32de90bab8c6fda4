//! Error types for the capture and filter pipeline.

use std::fmt;

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Shader stage that produced a compile diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Which preset table a filter name is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Convolution,
    Color,
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKind::Convolution => f.write_str("convolution"),
            FilterKind::Color => f.write_str("color"),
        }
    }
}

/// Every error here is fatal to the current capture session.
#[derive(Error, Debug)]
pub enum Error {
    // Capture errors
    #[error("video capture is not supported: no getUserMedia variant is available")]
    UnsupportedCapture,

    #[error("video capture denied: {name}: {message}")]
    CaptureDenied { name: String, message: String },

    #[error("video capture unavailable: {name}: {message}")]
    CaptureUnavailable { name: String, message: String },

    // Rendering errors
    #[error("the surface did not provide a usable rendering context")]
    MissingRenderContext,

    #[error("{stage} shader failed to compile: {log}")]
    ShaderCompileFailed { stage: ShaderStage, log: String },

    #[error("shader program failed to link: {0}")]
    ShaderLinkFailed(String),

    #[error("shader program has no active attribute or uniform `{0}`")]
    MissingBinding(String),

    #[error("GPU allocation failed: {0}")]
    Allocation(&'static str),

    #[error("frame upload failed: {0}")]
    FrameUpload(String),

    #[error("invalid frame size {width}x{height}")]
    InvalidFrameSize { width: u32, height: u32 },

    // Filter errors
    #[error("unknown {kind} filter `{name}`")]
    UnknownFilter { kind: FilterKind, name: String },

    // Page and configuration errors
    #[error("page element `{0}` not found")]
    MissingElement(String),

    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("JavaScript error: {0}")]
    Js(String),
}

impl Error {
    /// Map a `DOMException`-style failure name from a capture request onto
    /// the denied/unavailable split.
    pub fn capture_failure(name: impl Into<String>, message: impl Into<String>) -> Self {
        let name = name.into();
        let message = message.into();
        match name.as_str() {
            "NotAllowedError" | "PermissionDeniedError" | "SecurityError" => {
                Error::CaptureDenied { name, message }
            }
            _ => Error::CaptureUnavailable { name, message },
        }
    }

    /// Create an unknown-filter error.
    pub fn unknown_filter(kind: FilterKind, name: impl Into<String>) -> Self {
        Error::UnknownFilter {
            kind,
            name: name.into(),
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl From<Error> for wasm_bindgen::JsValue {
    fn from(err: Error) -> Self {
        js_sys::Error::new(&err.to_string()).into()
    }
}
