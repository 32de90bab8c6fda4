//! Rendering-context abstraction.
//!
//! [`GraphicsContext`] covers exactly the operations the filter pipeline
//! issues: shader compilation and linking, static vertex buffers, one
//! texture, uniform uploads and a triangle-strip draw. The WebGL2 context in
//! the browser and the software reference context both implement it.

use crate::error::{Result, ShaderStage};
use crate::frame::FrameSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureWrap {
    ClampToEdge,
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

/// Sampling parameters applied when a texture is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureParams {
    pub wrap: TextureWrap,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
}

impl Default for TextureParams {
    /// Clamp at the borders so edge taps repeat the outermost texels, and
    /// filter linearly in both directions.
    fn default() -> Self {
        Self {
            wrap: TextureWrap::ClampToEdge,
            min_filter: TextureFilter::Linear,
            mag_filter: TextureFilter::Linear,
        }
    }
}

/// A rendering context able to run the single-pass filter program.
///
/// Handles are cheap clones of opaque references owned by the context.
pub trait GraphicsContext {
    type Shader: Clone;
    type Program: Clone;
    type Buffer: Clone;
    type Texture: Clone;
    type Uniform: Clone;
    /// The frame representation this context can upload as a texture.
    type Frame: FrameSource;

    /// Compile one stage. A failed compile carries the compiler log.
    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<Self::Shader>;

    /// Link two compiled stages. A failed link carries the linker log.
    fn link_program(&self, vertex: &Self::Shader, fragment: &Self::Shader) -> Result<Self::Program>;

    fn use_program(&self, program: &Self::Program);

    /// Upload immutable vertex data.
    fn create_static_buffer(&self, data: &[f32]) -> Result<Self::Buffer>;

    /// Point the named vertex attribute at `buffer`, `components` floats per vertex.
    fn bind_attribute(
        &self,
        program: &Self::Program,
        name: &str,
        buffer: &Self::Buffer,
        components: i32,
    ) -> Result<()>;

    /// Create a 2D texture, bind it and apply `params`.
    fn create_texture(&self, params: &TextureParams) -> Result<Self::Texture>;

    fn uniform_location(&self, program: &Self::Program, name: &str) -> Result<Self::Uniform>;

    fn set_uniform_vec2_array(&self, uniform: &Self::Uniform, values: &[f32]);

    fn set_uniform_float_array(&self, uniform: &Self::Uniform, values: &[f32]);

    /// Column-major, untransposed.
    fn set_uniform_mat4(&self, uniform: &Self::Uniform, values: &[f32; 16]);

    /// Replace the texture contents with the current frame as RGBA8.
    fn upload_frame(&self, texture: &Self::Texture, frame: &Self::Frame) -> Result<()>;

    /// Draw `vertex_count` vertices as a triangle strip.
    fn draw_triangle_strip(&self, vertex_count: i32);

    fn delete_shader(&self, shader: &Self::Shader);
    fn delete_program(&self, program: &Self::Program);
    fn delete_buffer(&self, buffer: &Self::Buffer);
    fn delete_texture(&self, texture: &Self::Texture);
}

/// A drawable surface that may or may not yield a rendering context.
pub trait RenderSurface {
    type Context: GraphicsContext;

    fn rendering_context(&self) -> Option<Self::Context>;
}

/// A context-owned object that must be deleted explicitly.
pub enum GpuResource<C: GraphicsContext> {
    Shader(C::Shader),
    Program(C::Program),
    Buffer(C::Buffer),
    Texture(C::Texture),
}

impl<C: GraphicsContext> GpuResource<C> {
    pub fn release(self, context: &C) {
        match self {
            GpuResource::Shader(shader) => context.delete_shader(&shader),
            GpuResource::Program(program) => context.delete_program(&program),
            GpuResource::Buffer(buffer) => context.delete_buffer(&buffer),
            GpuResource::Texture(texture) => context.delete_texture(&texture),
        }
    }
}

/// Release `resources` newest first.
pub fn release_all<C: GraphicsContext>(context: &C, resources: &mut Vec<GpuResource<C>>) {
    while let Some(resource) = resources.pop() {
        resource.release(context);
    }
}
