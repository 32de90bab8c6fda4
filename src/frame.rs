//! Frame sources the pipeline samples from.

use image::RgbaImage;

/// Pixel dimensions of a frame source, fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A live 2D image the render loop re-uploads every tick.
pub trait FrameSource {
    fn size(&self) -> FrameSize;

    /// Whether a frame is available to upload. A source that is not ready is
    /// skipped for that tick and the previous texels stay in place.
    fn is_ready(&self) -> bool {
        true
    }
}

impl FrameSource for RgbaImage {
    fn size(&self) -> FrameSize {
        FrameSize::new(self.width(), self.height())
    }
}
