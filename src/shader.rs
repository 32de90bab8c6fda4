//! The single-pass filter program and the fixed data it is fed with.

use std::borrow::Cow;

use crate::error::{Error, Result};
use crate::frame::FrameSize;

/// Maps the unit quad onto clip space with Y pointing down, so that the first
/// row of the video lands at the top of the surface.
pub const VERTEX_SHADER: &str = r#"
attribute vec2 a_position;
attribute vec2 a_texcoord;
varying vec2 v_uv;

void main() {
    gl_Position = vec4(2.0 * a_position.x - 1.0, -2.0 * a_position.y + 1.0, 0.0, 1.0);
    v_uv = a_texcoord;
}
"#;

/// 3×3 convolution followed by a 4×4 color matrix.
pub const FRAGMENT_SHADER: &str = r#"
precision mediump float;
varying vec2 v_uv;
uniform sampler2D u_image;
uniform vec2 u_offsets[9];
uniform float u_kernel[9];
uniform mat4 u_color;

void main() {
    vec4 sum = vec4(0.0);
    for (int i = 0; i < 9; ++i) {
        sum += u_kernel[i] * texture2D(u_image, v_uv + u_offsets[i]);
    }
    gl_FragColor = u_color * sum;
}
"#;

/// Attribute and uniform names used by the bundled program.
pub mod binding {
    pub const POSITION: &str = "a_position";
    pub const TEXCOORD: &str = "a_texcoord";
    pub const OFFSETS: &str = "u_offsets";
    pub const KERNEL: &str = "u_kernel";
    pub const COLOR: &str = "u_color";
}

/// Unit square as a triangle strip.
///
/// ```text
///   p0 +--+ p1
///      | /|
///      |/ |
///   p2 +--+ p3
/// ```
pub const QUAD_POSITIONS: [f32; 8] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0];

/// Texture coordinates matching [`QUAD_POSITIONS`] one to one.
pub const QUAD_TEXCOORDS: [f32; 8] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0];

pub const QUAD_VERTEX_COUNT: i32 = 4;

/// Vertex and fragment source pair.
#[derive(Debug, Clone)]
pub struct ShaderSources {
    pub vertex: Cow<'static, str>,
    pub fragment: Cow<'static, str>,
}

impl Default for ShaderSources {
    fn default() -> Self {
        Self {
            vertex: Cow::Borrowed(VERTEX_SHADER),
            fragment: Cow::Borrowed(FRAGMENT_SHADER),
        }
    }
}

impl ShaderSources {
    pub fn new(vertex: impl Into<Cow<'static, str>>, fragment: impl Into<Cow<'static, str>>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }
}

/// Texel-space displacements of the nine convolution taps.
///
/// ```text
///   north west   north  north east
///              \   |    /
///         west - center - east
///              /   |    \
///   south west   south   south east
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleOffsets([[f32; 2]; 9]);

impl SampleOffsets {
    pub fn new(size: FrameSize) -> Result<Self> {
        if size.width == 0 || size.height == 0 {
            return Err(Error::InvalidFrameSize {
                width: size.width,
                height: size.height,
            });
        }
        let sw = 1.0 / size.width as f32;
        let sh = 1.0 / size.height as f32;
        Ok(Self([
            [-sw, -sh],
            [0.0, -sh],
            [sw, -sh],
            [-sw, 0.0],
            [0.0, 0.0],
            [sw, 0.0],
            [-sw, sh],
            [0.0, sh],
            [sw, sh],
        ]))
    }

    pub fn taps(&self) -> &[[f32; 2]; 9] {
        &self.0
    }

    /// Interleaved `x, y` pairs for `uniform2fv`.
    pub fn flatten(&self) -> [f32; 18] {
        let mut out = [0.0; 18];
        for (i, [x, y]) in self.0.iter().enumerate() {
            out[i * 2] = *x;
            out[i * 2 + 1] = *y;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_are_one_texel() {
        let offsets = SampleOffsets::new(FrameSize::new(640, 480)).unwrap();
        let taps = offsets.taps();
        assert_eq!(taps[5], [0.0015625, 0.0]);
        assert_eq!(taps[0], [-1.0 / 640.0, -1.0 / 480.0]);
        assert_eq!(taps[4], [0.0, 0.0]);
        assert_eq!(taps[8], [1.0 / 640.0, 1.0 / 480.0]);
    }

    #[test]
    fn test_flatten_interleaves_pairs() {
        let offsets = SampleOffsets::new(FrameSize::new(2, 4)).unwrap();
        let flat = offsets.flatten();
        assert_eq!(&flat[..4], &[-0.5, -0.25, 0.0, -0.25]);
        assert_eq!(&flat[16..], &[0.5, 0.25]);
    }

    #[test]
    fn test_zero_size_is_rejected() {
        assert!(matches!(
            SampleOffsets::new(FrameSize::new(0, 480)),
            Err(Error::InvalidFrameSize { width: 0, height: 480 })
        ));
    }

    #[test]
    fn test_bundled_sources_name_every_binding() {
        for name in [binding::POSITION, binding::TEXCOORD] {
            assert!(VERTEX_SHADER.contains(name));
        }
        for name in [binding::OFFSETS, binding::KERNEL, binding::COLOR] {
            assert!(FRAGMENT_SHADER.contains(name));
        }
    }
}
