//! WebGL2 implementation of the rendering context.

use wasm_bindgen::JsCast;
use web_sys::{
    HtmlCanvasElement, HtmlVideoElement, WebGl2RenderingContext as GL, WebGlBuffer, WebGlProgram,
    WebGlShader, WebGlTexture, WebGlUniformLocation,
};

use crate::error::{Error, Result, ShaderStage};
use crate::frame::{FrameSize, FrameSource};
use crate::gpu::{GraphicsContext, RenderSurface, TextureFilter, TextureParams, TextureWrap};

/// Video elements report `readyState >= HAVE_CURRENT_DATA` once a frame can be read.
const HAVE_CURRENT_DATA: u16 = 2;

pub struct WebGl {
    gl: GL,
}

impl WebGl {
    pub fn new(gl: GL) -> Self {
        Self { gl }
    }
}

impl RenderSurface for HtmlCanvasElement {
    type Context = WebGl;

    fn rendering_context(&self) -> Option<WebGl> {
        let gl: GL = self.get_context("webgl2").ok()??.dyn_into().ok()?;
        Some(WebGl::new(gl))
    }
}

impl FrameSource for HtmlVideoElement {
    fn size(&self) -> FrameSize {
        FrameSize::new(self.width(), self.height())
    }

    fn is_ready(&self) -> bool {
        self.ready_state() >= HAVE_CURRENT_DATA
    }
}

fn wrap_mode(wrap: TextureWrap) -> i32 {
    match wrap {
        TextureWrap::ClampToEdge => GL::CLAMP_TO_EDGE as i32,
        TextureWrap::Repeat => GL::REPEAT as i32,
    }
}

fn filter_mode(filter: TextureFilter) -> i32 {
    match filter {
        TextureFilter::Nearest => GL::NEAREST as i32,
        TextureFilter::Linear => GL::LINEAR as i32,
    }
}

impl GraphicsContext for WebGl {
    type Shader = WebGlShader;
    type Program = WebGlProgram;
    type Buffer = WebGlBuffer;
    type Texture = WebGlTexture;
    type Uniform = WebGlUniformLocation;
    type Frame = HtmlVideoElement;

    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<WebGlShader> {
        let kind = match stage {
            ShaderStage::Vertex => GL::VERTEX_SHADER,
            ShaderStage::Fragment => GL::FRAGMENT_SHADER,
        };
        let shader = self
            .gl
            .create_shader(kind)
            .ok_or(Error::Allocation("shader"))?;
        self.gl.shader_source(&shader, source);
        self.gl.compile_shader(&shader);

        let compiled = self
            .gl
            .get_shader_parameter(&shader, GL::COMPILE_STATUS)
            .as_bool()
            .unwrap_or(false);
        if compiled {
            Ok(shader)
        } else {
            let log = self.gl.get_shader_info_log(&shader).unwrap_or_default();
            self.gl.delete_shader(Some(&shader));
            Err(Error::ShaderCompileFailed { stage, log })
        }
    }

    fn link_program(&self, vertex: &WebGlShader, fragment: &WebGlShader) -> Result<WebGlProgram> {
        let program = self
            .gl
            .create_program()
            .ok_or(Error::Allocation("program"))?;
        self.gl.attach_shader(&program, vertex);
        self.gl.attach_shader(&program, fragment);
        self.gl.link_program(&program);

        let linked = self
            .gl
            .get_program_parameter(&program, GL::LINK_STATUS)
            .as_bool()
            .unwrap_or(false);
        if linked {
            Ok(program)
        } else {
            let log = self.gl.get_program_info_log(&program).unwrap_or_default();
            self.gl.delete_program(Some(&program));
            Err(Error::ShaderLinkFailed(log))
        }
    }

    fn use_program(&self, program: &WebGlProgram) {
        self.gl.use_program(Some(program));
    }

    fn create_static_buffer(&self, data: &[f32]) -> Result<WebGlBuffer> {
        let buffer = self
            .gl
            .create_buffer()
            .ok_or(Error::Allocation("buffer"))?;
        self.gl.bind_buffer(GL::ARRAY_BUFFER, Some(&buffer));
        let array = js_sys::Float32Array::from(data);
        self.gl
            .buffer_data_with_array_buffer_view(GL::ARRAY_BUFFER, &array, GL::STATIC_DRAW);
        Ok(buffer)
    }

    fn bind_attribute(
        &self,
        program: &WebGlProgram,
        name: &str,
        buffer: &WebGlBuffer,
        components: i32,
    ) -> Result<()> {
        let location = self.gl.get_attrib_location(program, name);
        if location < 0 {
            return Err(Error::MissingBinding(name.to_string()));
        }
        let location = location as u32;
        self.gl.bind_buffer(GL::ARRAY_BUFFER, Some(buffer));
        self.gl.enable_vertex_attrib_array(location);
        self.gl
            .vertex_attrib_pointer_with_i32(location, components, GL::FLOAT, false, 0, 0);
        Ok(())
    }

    fn create_texture(&self, params: &TextureParams) -> Result<WebGlTexture> {
        let texture = self
            .gl
            .create_texture()
            .ok_or(Error::Allocation("texture"))?;
        self.gl.bind_texture(GL::TEXTURE_2D, Some(&texture));
        let wrap = wrap_mode(params.wrap);
        self.gl
            .tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_WRAP_S, wrap);
        self.gl
            .tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_WRAP_T, wrap);
        self.gl.tex_parameteri(
            GL::TEXTURE_2D,
            GL::TEXTURE_MIN_FILTER,
            filter_mode(params.min_filter),
        );
        self.gl.tex_parameteri(
            GL::TEXTURE_2D,
            GL::TEXTURE_MAG_FILTER,
            filter_mode(params.mag_filter),
        );
        Ok(texture)
    }

    fn uniform_location(&self, program: &WebGlProgram, name: &str) -> Result<WebGlUniformLocation> {
        self.gl
            .get_uniform_location(program, name)
            .ok_or_else(|| Error::MissingBinding(name.to_string()))
    }

    fn set_uniform_vec2_array(&self, uniform: &WebGlUniformLocation, values: &[f32]) {
        self.gl.uniform2fv_with_f32_array(Some(uniform), values);
    }

    fn set_uniform_float_array(&self, uniform: &WebGlUniformLocation, values: &[f32]) {
        self.gl.uniform1fv_with_f32_array(Some(uniform), values);
    }

    fn set_uniform_mat4(&self, uniform: &WebGlUniformLocation, values: &[f32; 16]) {
        self.gl
            .uniform_matrix4fv_with_f32_array(Some(uniform), false, values);
    }

    fn upload_frame(&self, texture: &WebGlTexture, frame: &HtmlVideoElement) -> Result<()> {
        self.gl.bind_texture(GL::TEXTURE_2D, Some(texture));
        self.gl
            .tex_image_2d_with_u32_and_u32_and_html_video_element(
                GL::TEXTURE_2D,
                0,
                GL::RGBA as i32,
                GL::RGBA,
                GL::UNSIGNED_BYTE,
                frame,
            )
            .map_err(|err| Error::FrameUpload(format!("{err:?}")))
    }

    fn draw_triangle_strip(&self, vertex_count: i32) {
        self.gl.draw_arrays(GL::TRIANGLE_STRIP, 0, vertex_count);
    }

    fn delete_shader(&self, shader: &WebGlShader) {
        self.gl.delete_shader(Some(shader));
    }

    fn delete_program(&self, program: &WebGlProgram) {
        self.gl.delete_program(Some(program));
    }

    fn delete_buffer(&self, buffer: &WebGlBuffer) {
        self.gl.delete_buffer(Some(buffer));
    }

    fn delete_texture(&self, texture: &WebGlTexture) {
        self.gl.delete_texture(Some(texture));
    }
}
