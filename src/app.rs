//! Application context shared by the capture, setup and render steps.

use std::rc::Rc;

use tracing::debug;

use crate::catalog::FilterCatalog;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::frame::FrameSource;
use crate::gpu::{GraphicsContext, RenderSurface};
use crate::pipeline::Pipeline;
use crate::render_loop::RenderLoop;
use crate::selection::SelectionSource;
use crate::shader::ShaderSources;

/// Owns configuration, the preset catalog and the selection source.
pub struct App<S> {
    config: Config,
    catalog: Rc<FilterCatalog>,
    selection: S,
    sources: ShaderSources,
}

impl<S: SelectionSource + Clone> App<S> {
    pub fn new(config: Config, selection: S) -> Result<Self> {
        let catalog = FilterCatalog::builtin();
        config.validate(&catalog)?;
        Ok(Self {
            config,
            catalog: Rc::new(catalog),
            selection,
            sources: ShaderSources::default(),
        })
    }

    pub fn with_shader_sources(mut self, sources: ShaderSources) -> Self {
        self.sources = sources;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &FilterCatalog {
        &self.catalog
    }

    /// Build the pipeline on `surface` for `frame` and return the render loop,
    /// ready for its first tick.
    ///
    /// A surface without a rendering context fails before anything is
    /// compiled or allocated.
    pub fn launch<R>(
        &self,
        surface: &R,
        frame: <R::Context as GraphicsContext>::Frame,
    ) -> Result<RenderLoop<R::Context, S>>
    where
        R: RenderSurface,
    {
        let context = surface
            .rendering_context()
            .ok_or(Error::MissingRenderContext)?;
        let kernel = self.catalog.kernel(&self.selection.convolution())?;
        let color = self.catalog.color(&self.selection.color())?;
        let size = frame.size();
        debug!(width = size.width, height = size.height, "setting up filter pipeline");

        let pipeline = Pipeline::setup(context, size, &self.sources, kernel, color)?;
        Ok(RenderLoop::new(
            pipeline,
            Rc::clone(&self.catalog),
            self.selection.clone(),
            frame,
        ))
    }
}
