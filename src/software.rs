//! CPU reference context.
//!
//! Implements [`GraphicsContext`] without a GPU so the pipeline can run in
//! host tests and in the `preview` command. Shaders are checked for their
//! declarations (attributes, varyings, uniforms and a `main` entry point) but
//! not executed: a draw runs the bundled filter program natively, reading
//! the same uniforms and attributes the GLSL version reads.
//!
//! The framebuffer is stored top row first, as the canvas displays it.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use image::{Rgba, RgbaImage};
use tracing::warn;

use crate::error::{Error, Result, ShaderStage};
use crate::gpu::{GraphicsContext, RenderSurface, TextureFilter, TextureParams, TextureWrap};
use crate::shader::binding;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoftShader(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoftProgram(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoftBuffer(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoftTexture(u32);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SoftUniform {
    program: u32,
    name: String,
}

/// Operation counters and live object counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoftwareStats {
    pub shaders_compiled: u32,
    pub programs_linked: u32,
    pub buffers_created: u32,
    pub textures_created: u32,
    pub texture_uploads: u32,
    pub draws: u32,
    pub live_shaders: usize,
    pub live_programs: usize,
    pub live_buffers: usize,
    pub live_textures: usize,
}

impl SoftwareStats {
    pub fn live_objects(&self) -> usize {
        self.live_shaders + self.live_programs + self.live_buffers + self.live_textures
    }

    pub fn allocations(&self) -> u32 {
        self.shaders_compiled + self.programs_linked + self.buffers_created + self.textures_created
    }
}

#[derive(Debug, Default)]
struct Declarations {
    attributes: HashSet<String>,
    varyings: HashMap<String, String>,
    uniforms: HashSet<String>,
}

#[derive(Debug)]
struct Shader {
    stage: ShaderStage,
    decls: Declarations,
}

#[derive(Debug, Default)]
struct Program {
    attributes: HashSet<String>,
    uniforms: HashSet<String>,
    bound_attributes: HashMap<String, u32>,
    values: HashMap<String, Vec<f32>>,
}

#[derive(Debug)]
struct Texture {
    params: TextureParams,
    image: RgbaImage,
}

#[derive(Debug)]
struct State {
    next_id: u32,
    shaders: HashMap<u32, Shader>,
    programs: HashMap<u32, Program>,
    buffers: HashMap<u32, Vec<f32>>,
    textures: HashMap<u32, Texture>,
    current_program: Option<u32>,
    bound_texture: Option<u32>,
    framebuffer: RgbaImage,
    stats: SoftwareStats,
}

impl State {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Software rendering context. Clones share the same state.
#[derive(Debug, Clone)]
pub struct SoftwareContext {
    state: Rc<RefCell<State>>,
}

impl SoftwareContext {
    /// A context whose viewport is `width`×`height`.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                next_id: 0,
                shaders: HashMap::new(),
                programs: HashMap::new(),
                buffers: HashMap::new(),
                textures: HashMap::new(),
                current_program: None,
                bound_texture: None,
                framebuffer: RgbaImage::new(width, height),
                stats: SoftwareStats::default(),
            })),
        }
    }

    /// Copy of the framebuffer.
    pub fn read_pixels(&self) -> RgbaImage {
        self.state.borrow().framebuffer.clone()
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.state.borrow().framebuffer.get_pixel(x, y).0
    }

    pub fn stats(&self) -> SoftwareStats {
        let state = self.state.borrow();
        SoftwareStats {
            live_shaders: state.shaders.len(),
            live_programs: state.programs.len(),
            live_buffers: state.buffers.len(),
            live_textures: state.textures.len(),
            ..state.stats
        }
    }
}

/// Surface backed by a [`SoftwareContext`]; every call hands out the same
/// shared context.
#[derive(Debug, Clone)]
pub struct SoftwareSurface {
    context: SoftwareContext,
}

impl SoftwareSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            context: SoftwareContext::new(width, height),
        }
    }

    pub fn context(&self) -> SoftwareContext {
        self.context.clone()
    }
}

impl RenderSurface for SoftwareSurface {
    type Context = SoftwareContext;

    fn rendering_context(&self) -> Option<SoftwareContext> {
        Some(self.context.clone())
    }
}

fn strip_comments(source: &str) -> String {
    source
        .lines()
        .map(|line| line.split("//").next().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_declarations(stage: ShaderStage, source: &str) -> std::result::Result<Declarations, String> {
    let source = strip_comments(source);
    let compact: String = source.chars().filter(|c| !c.is_whitespace()).collect();
    if !compact.contains("voidmain()") {
        return Err("ERROR: 0:0: 'main' : function not defined".into());
    }

    let mut decls = Declarations::default();
    for statement in source.split(|c: char| c == ';' || c == '{' || c == '}') {
        let mut words = statement.split_whitespace();
        let Some(qualifier) = words.next() else {
            continue;
        };
        if !matches!(qualifier, "attribute" | "varying" | "uniform") {
            continue;
        }
        let rest: Vec<&str> = words
            .filter(|w| !matches!(*w, "lowp" | "mediump" | "highp"))
            .collect();
        let &[ty, name] = rest.as_slice() else {
            return Err(format!("ERROR: 0:0: '{}' : syntax error", statement.trim()));
        };
        let name = name.split('[').next().unwrap_or(name).to_string();
        match qualifier {
            "attribute" if stage == ShaderStage::Fragment => {
                return Err(format!(
                    "ERROR: 0:0: 'attribute' : supported in vertex shaders only ('{name}')"
                ));
            }
            "attribute" => {
                decls.attributes.insert(name);
            }
            "varying" => {
                decls.varyings.insert(name, ty.to_string());
            }
            _ => {
                decls.uniforms.insert(name);
            }
        }
    }
    Ok(decls)
}

fn to_unorm8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl Texture {
    fn texel(&self, x: i64, y: i64) -> [f32; 4] {
        let (w, h) = (self.image.width() as i64, self.image.height() as i64);
        let (x, y) = match self.params.wrap {
            TextureWrap::ClampToEdge => (x.clamp(0, w - 1), y.clamp(0, h - 1)),
            TextureWrap::Repeat => (x.rem_euclid(w), y.rem_euclid(h)),
        };
        let Rgba(p) = *self.image.get_pixel(x as u32, y as u32);
        p.map(|c| c as f32 / 255.0)
    }

    fn sample(&self, u: f32, v: f32) -> [f32; 4] {
        if self.image.width() == 0 || self.image.height() == 0 {
            // Incomplete texture.
            return [0.0, 0.0, 0.0, 1.0];
        }
        let x = u * self.image.width() as f32;
        let y = v * self.image.height() as f32;
        // One output pixel per texel, so magnification is the filter in play.
        match self.params.mag_filter {
            TextureFilter::Nearest => self.texel(x.floor() as i64, y.floor() as i64),
            TextureFilter::Linear => {
                let (x, y) = (x - 0.5, y - 0.5);
                let (x0, y0) = (x.floor(), y.floor());
                let (fx, fy) = (x - x0, y - y0);
                let (x0, y0) = (x0 as i64, y0 as i64);
                let a = self.texel(x0, y0);
                let b = self.texel(x0 + 1, y0);
                let c = self.texel(x0, y0 + 1);
                let d = self.texel(x0 + 1, y0 + 1);
                let mut out = [0.0; 4];
                for i in 0..4 {
                    let top = a[i] + (b[i] - a[i]) * fx;
                    let bottom = c[i] + (d[i] - c[i]) * fx;
                    out[i] = top + (bottom - top) * fy;
                }
                out
            }
        }
    }
}

impl State {
    fn filter_fragment(&self, program: &Program, texture: &Texture, uv: [f32; 2]) -> [u8; 4] {
        let zeros = Vec::new();
        let offsets = program.values.get(binding::OFFSETS).unwrap_or(&zeros);
        let kernel = program.values.get(binding::KERNEL).unwrap_or(&zeros);
        let color = program.values.get(binding::COLOR).unwrap_or(&zeros);

        let mut sum = [0.0f32; 4];
        for i in 0..9 {
            let weight = kernel.get(i).copied().unwrap_or(0.0);
            let du = offsets.get(i * 2).copied().unwrap_or(0.0);
            let dv = offsets.get(i * 2 + 1).copied().unwrap_or(0.0);
            let texel = texture.sample(uv[0] + du, uv[1] + dv);
            for c in 0..4 {
                sum[c] += weight * texel[c];
            }
        }

        let mut out = [0u8; 4];
        for (row, value) in out.iter_mut().enumerate() {
            let v: f32 = (0..4)
                .map(|col| color.get(col * 4 + row).copied().unwrap_or(0.0) * sum[col])
                .sum();
            *value = to_unorm8(v);
        }
        out
    }

    fn vertices(&self, program: &Program, name: &str, count: usize) -> Option<Vec<[f32; 2]>> {
        let buffer = self.buffers.get(program.bound_attributes.get(name)?)?;
        if buffer.len() < count * 2 {
            return None;
        }
        Some(buffer.chunks_exact(2).take(count).map(|p| [p[0], p[1]]).collect())
    }

    /// Shade every pixel covered by the strip's triangles.
    fn rasterize(&self, count: usize) -> Vec<(u32, u32, [u8; 4])> {
        let mut fragments = Vec::new();
        let Some(program) = self.current_program.and_then(|id| self.programs.get(&id)) else {
            warn!("draw without a program in use");
            return fragments;
        };
        let Some(texture) = self.bound_texture.and_then(|id| self.textures.get(&id)) else {
            warn!("draw without a bound texture");
            return fragments;
        };
        let (Some(positions), Some(texcoords)) = (
            self.vertices(program, binding::POSITION, count),
            self.vertices(program, binding::TEXCOORD, count),
        ) else {
            warn!("draw with unbound vertex attributes");
            return fragments;
        };

        let (width, height) = self.framebuffer.dimensions();
        // Clip space (2x - 1, 1 - 2y) back to top-down pixel coordinates.
        let screen: Vec<[f32; 2]> = positions
            .iter()
            .map(|p| [p[0] * width as f32, p[1] * height as f32])
            .collect();

        for i in 0..count.saturating_sub(2) {
            let (a, b, c) = (screen[i], screen[i + 1], screen[i + 2]);
            let area = edge(a, b, c);
            if area == 0.0 {
                continue;
            }
            let (ta, tb, tc) = (texcoords[i], texcoords[i + 1], texcoords[i + 2]);
            let min_x = a[0].min(b[0]).min(c[0]).floor().max(0.0) as u32;
            let max_x = (a[0].max(b[0]).max(c[0]).ceil().max(0.0) as u32).min(width);
            let min_y = a[1].min(b[1]).min(c[1]).floor().max(0.0) as u32;
            let max_y = (a[1].max(b[1]).max(c[1]).ceil().max(0.0) as u32).min(height);
            for y in min_y..max_y {
                for x in min_x..max_x {
                    let p = [x as f32 + 0.5, y as f32 + 0.5];
                    let wa = edge(b, c, p) / area;
                    let wb = edge(c, a, p) / area;
                    let wc = edge(a, b, p) / area;
                    if wa < 0.0 || wb < 0.0 || wc < 0.0 {
                        continue;
                    }
                    let uv = [
                        wa * ta[0] + wb * tb[0] + wc * tc[0],
                        wa * ta[1] + wb * tb[1] + wc * tc[1],
                    ];
                    fragments.push((x, y, self.filter_fragment(program, texture, uv)));
                }
            }
        }
        fragments
    }
}

fn edge(a: [f32; 2], b: [f32; 2], p: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

impl GraphicsContext for SoftwareContext {
    type Shader = SoftShader;
    type Program = SoftProgram;
    type Buffer = SoftBuffer;
    type Texture = SoftTexture;
    type Uniform = SoftUniform;
    type Frame = RgbaImage;

    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<SoftShader> {
        let decls = parse_declarations(stage, source)
            .map_err(|log| Error::ShaderCompileFailed { stage, log })?;
        let mut state = self.state.borrow_mut();
        let id = state.next_id();
        state.shaders.insert(id, Shader { stage, decls });
        state.stats.shaders_compiled += 1;
        Ok(SoftShader(id))
    }

    fn link_program(&self, vertex: &SoftShader, fragment: &SoftShader) -> Result<SoftProgram> {
        let mut state = self.state.borrow_mut();
        let program = {
            let (Some(vs), Some(fs)) = (state.shaders.get(&vertex.0), state.shaders.get(&fragment.0))
            else {
                return Err(Error::ShaderLinkFailed("ERROR: invalid shader object".into()));
            };
            if vs.stage != ShaderStage::Vertex || fs.stage != ShaderStage::Fragment {
                return Err(Error::ShaderLinkFailed(
                    "ERROR: expected one vertex and one fragment shader".into(),
                ));
            }
            for (name, ty) in &fs.decls.varyings {
                match vs.decls.varyings.get(name) {
                    Some(vty) if vty == ty => {}
                    Some(_) => {
                        return Err(Error::ShaderLinkFailed(format!(
                            "ERROR: Types of varying '{name}' differ between the vertex and fragment shaders"
                        )));
                    }
                    None => {
                        return Err(Error::ShaderLinkFailed(format!(
                            "ERROR: Varying '{name}' is not declared in the vertex shader"
                        )));
                    }
                }
            }
            Program {
                attributes: vs.decls.attributes.clone(),
                uniforms: vs.decls.uniforms.union(&fs.decls.uniforms).cloned().collect(),
                ..Program::default()
            }
        };
        let id = state.next_id();
        state.programs.insert(id, program);
        state.stats.programs_linked += 1;
        Ok(SoftProgram(id))
    }

    fn use_program(&self, program: &SoftProgram) {
        self.state.borrow_mut().current_program = Some(program.0);
    }

    fn create_static_buffer(&self, data: &[f32]) -> Result<SoftBuffer> {
        let mut state = self.state.borrow_mut();
        let id = state.next_id();
        state.buffers.insert(id, data.to_vec());
        state.stats.buffers_created += 1;
        Ok(SoftBuffer(id))
    }

    fn bind_attribute(&self, program: &SoftProgram, name: &str, buffer: &SoftBuffer, components: i32) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let program = state
            .programs
            .get_mut(&program.0)
            .ok_or(Error::Allocation("program"))?;
        if !program.attributes.contains(name) {
            return Err(Error::MissingBinding(name.to_string()));
        }
        if components != 2 {
            warn!(name, components, "software context only reads vec2 attributes");
        }
        program.bound_attributes.insert(name.to_string(), buffer.0);
        Ok(())
    }

    fn create_texture(&self, params: &TextureParams) -> Result<SoftTexture> {
        let mut state = self.state.borrow_mut();
        let id = state.next_id();
        state.textures.insert(
            id,
            Texture {
                params: *params,
                image: RgbaImage::new(0, 0),
            },
        );
        state.bound_texture = Some(id);
        state.stats.textures_created += 1;
        Ok(SoftTexture(id))
    }

    fn uniform_location(&self, program: &SoftProgram, name: &str) -> Result<SoftUniform> {
        let state = self.state.borrow();
        let linked = state
            .programs
            .get(&program.0)
            .ok_or(Error::Allocation("program"))?;
        if !linked.uniforms.contains(name) {
            return Err(Error::MissingBinding(name.to_string()));
        }
        Ok(SoftUniform {
            program: program.0,
            name: name.to_string(),
        })
    }

    fn set_uniform_vec2_array(&self, uniform: &SoftUniform, values: &[f32]) {
        self.set_uniform_float_array(uniform, values);
    }

    fn set_uniform_float_array(&self, uniform: &SoftUniform, values: &[f32]) {
        let mut state = self.state.borrow_mut();
        if let Some(program) = state.programs.get_mut(&uniform.program) {
            program.values.insert(uniform.name.clone(), values.to_vec());
        }
    }

    fn set_uniform_mat4(&self, uniform: &SoftUniform, values: &[f32; 16]) {
        self.set_uniform_float_array(uniform, values);
    }

    fn upload_frame(&self, texture: &SoftTexture, frame: &RgbaImage) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let target = state
            .textures
            .get_mut(&texture.0)
            .ok_or_else(|| Error::FrameUpload(format!("texture {} was deleted", texture.0)))?;
        target.image.clone_from(frame);
        state.bound_texture = Some(texture.0);
        state.stats.texture_uploads += 1;
        Ok(())
    }

    fn draw_triangle_strip(&self, vertex_count: i32) {
        let mut state = self.state.borrow_mut();
        state.stats.draws += 1;
        let fragments = state.rasterize(vertex_count.max(0) as usize);
        for (x, y, rgba) in fragments {
            state.framebuffer.put_pixel(x, y, Rgba(rgba));
        }
    }

    fn delete_shader(&self, shader: &SoftShader) {
        self.state.borrow_mut().shaders.remove(&shader.0);
    }

    fn delete_program(&self, program: &SoftProgram) {
        let mut state = self.state.borrow_mut();
        state.programs.remove(&program.0);
        if state.current_program == Some(program.0) {
            state.current_program = None;
        }
    }

    fn delete_buffer(&self, buffer: &SoftBuffer) {
        self.state.borrow_mut().buffers.remove(&buffer.0);
    }

    fn delete_texture(&self, texture: &SoftTexture) {
        let mut state = self.state.borrow_mut();
        state.textures.remove(&texture.0);
        if state.bound_texture == Some(texture.0) {
            state.bound_texture = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{FRAGMENT_SHADER, VERTEX_SHADER};

    #[test]
    fn test_bundled_shaders_declare_their_bindings() {
        let vs = parse_declarations(ShaderStage::Vertex, VERTEX_SHADER).unwrap();
        assert!(vs.attributes.contains(binding::POSITION));
        assert!(vs.attributes.contains(binding::TEXCOORD));
        assert_eq!(vs.varyings.get("v_uv").map(String::as_str), Some("vec2"));

        let fs = parse_declarations(ShaderStage::Fragment, FRAGMENT_SHADER).unwrap();
        for name in [binding::OFFSETS, binding::KERNEL, binding::COLOR, "u_image"] {
            assert!(fs.uniforms.contains(name), "{name}");
        }
    }

    #[test]
    fn test_missing_main_fails_to_compile() {
        let err = parse_declarations(ShaderStage::Vertex, "attribute vec2 a_position;").unwrap_err();
        assert!(err.contains("'main'"));
    }

    #[test]
    fn test_attribute_in_fragment_stage_is_rejected() {
        let source = "attribute vec2 a; void main() {}";
        assert!(parse_declarations(ShaderStage::Fragment, source).is_err());
    }

    #[test]
    fn test_linear_sampling_clamps_at_the_border() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        image.put_pixel(1, 0, Rgba([255, 255, 255, 255]));
        let texture = Texture {
            params: TextureParams::default(),
            image,
        };
        // Halfway between the two texel centers.
        let mid = texture.sample(0.5, 0.5);
        assert!((mid[0] - 0.5).abs() < 1e-6);
        // Far outside on the left still reads the edge texel.
        assert_eq!(texture.sample(-3.0, 0.5), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_nearest_sampling_repeats_past_the_border() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        image.put_pixel(1, 0, Rgba([255, 255, 255, 255]));
        let texture = Texture {
            params: TextureParams {
                wrap: TextureWrap::Repeat,
                min_filter: TextureFilter::Nearest,
                mag_filter: TextureFilter::Nearest,
            },
            image,
        };
        let black = [0.0, 0.0, 0.0, 1.0];
        let white = [1.0, 1.0, 1.0, 1.0];
        // No blending between neighbors.
        assert_eq!(texture.sample(0.45, 0.5), black);
        assert_eq!(texture.sample(0.55, 0.5), white);
        // One texture width to the right wraps to the first texel.
        assert_eq!(texture.sample(1.25, 0.5), black);
        assert_eq!(texture.sample(-0.25, 0.5), white);
    }
}
