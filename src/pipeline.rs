//! One-pass filter pipeline: program, quad buffers, frame texture and uniforms.

use tracing::{debug, info};

use crate::catalog::{ColorMatrix, ConvolutionKernel};
use crate::error::{Result, ShaderStage};
use crate::frame::FrameSize;
use crate::gpu::{release_all, GpuResource, GraphicsContext, TextureParams};
use crate::shader::{
    binding, SampleOffsets, ShaderSources, QUAD_POSITIONS, QUAD_TEXCOORDS, QUAD_VERTEX_COUNT,
};

struct Bindings<C: GraphicsContext> {
    texture: C::Texture,
    kernel: C::Uniform,
    color: C::Uniform,
}

/// GPU state built once per capture session.
///
/// Everything allocated during setup is owned here and deleted when the
/// pipeline is dropped.
pub struct Pipeline<C: GraphicsContext> {
    context: C,
    bindings: Bindings<C>,
    owned: Vec<GpuResource<C>>,
}

impl<C: GraphicsContext> Pipeline<C> {
    /// Compile, link and wire the filter program for frames of `size`, with
    /// `kernel` and `color` as the initial filter uniforms.
    ///
    /// On error every object created so far is deleted again.
    pub fn setup(
        context: C,
        size: FrameSize,
        sources: &ShaderSources,
        kernel: &ConvolutionKernel,
        color: &ColorMatrix,
    ) -> Result<Self> {
        let offsets = SampleOffsets::new(size)?;
        let mut owned = Vec::new();
        match Self::build(&context, &mut owned, sources, &offsets) {
            Ok(bindings) => {
                info!(width = size.width, height = size.height, "filter pipeline ready");
                let pipeline = Self {
                    context,
                    bindings,
                    owned,
                };
                pipeline.set_filters(kernel, color);
                Ok(pipeline)
            }
            Err(err) => {
                release_all(&context, &mut owned);
                Err(err)
            }
        }
    }

    fn build(
        context: &C,
        owned: &mut Vec<GpuResource<C>>,
        sources: &ShaderSources,
        offsets: &SampleOffsets,
    ) -> Result<Bindings<C>> {
        let vertex = context.compile_shader(ShaderStage::Vertex, &sources.vertex)?;
        owned.push(GpuResource::Shader(vertex.clone()));
        let fragment = context.compile_shader(ShaderStage::Fragment, &sources.fragment)?;
        owned.push(GpuResource::Shader(fragment.clone()));

        let program = context.link_program(&vertex, &fragment)?;
        owned.push(GpuResource::Program(program.clone()));
        context.use_program(&program);
        debug!("filter program linked");

        // Static quad; never rewritten after this point.
        let positions = context.create_static_buffer(&QUAD_POSITIONS)?;
        owned.push(GpuResource::Buffer(positions.clone()));
        context.bind_attribute(&program, binding::POSITION, &positions, 2)?;

        let texcoords = context.create_static_buffer(&QUAD_TEXCOORDS)?;
        owned.push(GpuResource::Buffer(texcoords.clone()));
        context.bind_attribute(&program, binding::TEXCOORD, &texcoords, 2)?;

        let texture = context.create_texture(&TextureParams::default())?;
        owned.push(GpuResource::Texture(texture.clone()));

        let offset_uniform = context.uniform_location(&program, binding::OFFSETS)?;
        context.set_uniform_vec2_array(&offset_uniform, &offsets.flatten());

        let kernel = context.uniform_location(&program, binding::KERNEL)?;
        let color = context.uniform_location(&program, binding::COLOR)?;

        Ok(Bindings {
            texture,
            kernel,
            color,
        })
    }

    /// Upload the kernel and color matrix uniforms.
    pub fn set_filters(&self, kernel: &ConvolutionKernel, color: &ColorMatrix) {
        self.context
            .set_uniform_float_array(&self.bindings.kernel, kernel.weights());
        self.context
            .set_uniform_mat4(&self.bindings.color, color.elements());
    }

    /// Replace the texture contents with the current frame.
    pub fn upload_frame(&self, frame: &C::Frame) -> Result<()> {
        self.context.upload_frame(&self.bindings.texture, frame)
    }

    pub fn draw(&self) {
        self.context.draw_triangle_strip(QUAD_VERTEX_COUNT);
    }
}

impl<C: GraphicsContext> Drop for Pipeline<C> {
    fn drop(&mut self) {
        debug!(resources = self.owned.len(), "releasing filter pipeline");
        release_all(&self.context, &mut self.owned);
    }
}
