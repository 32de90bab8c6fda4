//! The per-refresh step: re-read filters, re-upload the frame, draw.

use std::ops::ControlFlow;
use std::rc::Rc;

use tracing::{debug, error, trace};

use crate::catalog::FilterCatalog;
use crate::error::Result;
use crate::frame::FrameSource;
use crate::gpu::GraphicsContext;
use crate::pipeline::Pipeline;
use crate::selection::SelectionSource;
use crate::stop::StopHandle;

/// A running filter session.
///
/// The scheduler calls [`RenderLoop::tick`] once per display refresh and
/// schedules the next call only while it returns `Continue`.
pub struct RenderLoop<C: GraphicsContext, S> {
    pipeline: Pipeline<C>,
    catalog: Rc<FilterCatalog>,
    selection: S,
    frame: C::Frame,
    stop: StopHandle,
    ticks: u64,
}

impl<C: GraphicsContext, S: SelectionSource> RenderLoop<C, S> {
    pub fn new(pipeline: Pipeline<C>, catalog: Rc<FilterCatalog>, selection: S, frame: C::Frame) -> Self {
        Self {
            pipeline,
            catalog,
            selection,
            frame,
            stop: StopHandle::new(),
            ticks: 0,
        }
    }

    /// Render one frame.
    ///
    /// Filters are looked up afresh each tick so a selector change shows up on
    /// the next frame without touching the program. An unknown filter name is
    /// an error, not a silent fallback.
    pub fn tick(&mut self) -> Result<ControlFlow<()>> {
        if self.stop.is_stopped() {
            debug!(ticks = self.ticks, "render loop stopped");
            return Ok(ControlFlow::Break(()));
        }

        let convolution = self.selection.convolution();
        let color = self.selection.color();
        let kernel = self.catalog.kernel(&convolution)?;
        let matrix = self.catalog.color(&color)?;
        self.pipeline.set_filters(kernel, matrix);

        if self.frame.is_ready() {
            self.pipeline.upload_frame(&self.frame)?;
        } else {
            trace!("frame source not ready; keeping previous texels");
        }
        self.pipeline.draw();

        self.ticks += 1;
        trace!(tick = self.ticks, %convolution, %color, "frame rendered");
        Ok(ControlFlow::Continue(()))
    }

    /// Tick the loop held in `slot`, dropping it as soon as it breaks or
    /// fails so its GPU objects are released right away.
    ///
    /// Returns `Continue` only while a loop is still held.
    pub fn advance(slot: &mut Option<Self>) -> ControlFlow<()> {
        let Some(active) = slot.as_mut() else {
            return ControlFlow::Break(());
        };
        match active.tick() {
            Ok(ControlFlow::Continue(())) => return ControlFlow::Continue(()),
            Ok(ControlFlow::Break(())) => {}
            Err(err) => {
                error!(%err, ticks = active.ticks, "render loop failed; stopping");
                active.stop();
            }
        }
        *slot = None;
        ControlFlow::Break(())
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn frame_mut(&mut self) -> &mut C::Frame {
        &mut self.frame
    }
}
