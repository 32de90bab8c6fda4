//! Fixed filter presets.
//!
//! Both tables are static data; [`FilterCatalog`] only indexes them by name.
//! Kernels are row-major 3×3. Color matrices are column-major 4×4, i.e. laid
//! out exactly as they are handed to `uniformMatrix4fv` with `transpose = false`.

use crate::error::{Error, FilterKind, Result};

/// Nine weights applied to the NW, N, NE, W, C, E, SW, S, SE samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvolutionKernel(pub [f32; 9]);

impl ConvolutionKernel {
    pub fn weights(&self) -> &[f32; 9] {
        &self.0
    }

    pub fn weight_sum(&self) -> f32 {
        self.0.iter().sum()
    }
}

/// A 4×4 color transform, column-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrix(pub [f32; 16]);

impl ColorMatrix {
    pub fn elements(&self) -> &[f32; 16] {
        &self.0
    }

    /// `M * v` with `M` column-major.
    pub fn apply(&self, rgba: [f32; 4]) -> [f32; 4] {
        let m = &self.0;
        let mut out = [0.0; 4];
        for (row, value) in out.iter_mut().enumerate() {
            *value = (0..4).map(|col| m[col * 4 + row] * rgba[col]).sum();
        }
        out
    }
}

static CONVOLUTION_PRESETS: [(&str, ConvolutionKernel); 6] = [
    (
        "none",
        ConvolutionKernel([
            0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0,
        ]),
    ),
    (
        "box",
        ConvolutionKernel([
            1.0 / 9.0, 1.0 / 9.0, 1.0 / 9.0, //
            1.0 / 9.0, 1.0 / 9.0, 1.0 / 9.0, //
            1.0 / 9.0, 1.0 / 9.0, 1.0 / 9.0,
        ]),
    ),
    (
        "gaussian",
        ConvolutionKernel([
            1.0 / 16.0, 2.0 / 16.0, 1.0 / 16.0, //
            2.0 / 16.0, 4.0 / 16.0, 2.0 / 16.0, //
            1.0 / 16.0, 2.0 / 16.0, 1.0 / 16.0,
        ]),
    ),
    (
        "emboss",
        ConvolutionKernel([
            2.0, -1.0, 0.0, //
            0.0, -1.0, 0.0, //
            0.0, 0.0, -1.0,
        ]),
    ),
    (
        "sharpness",
        ConvolutionKernel([
            -1.0, -1.0, -1.0, //
            -1.0, 9.0, -1.0, //
            -1.0, -1.0, -1.0,
        ]),
    ),
    (
        "laplacian",
        ConvolutionKernel([
            0.0, 1.0, 0.0, //
            1.0, -4.0, 1.0, //
            0.0, 1.0, 0.0,
        ]),
    ),
];

static COLOR_PRESETS: [(&str, ColorMatrix); 4] = [
    (
        "none",
        ColorMatrix([
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]),
    ),
    (
        "bgra",
        ColorMatrix([
            0.0, 0.0, 1.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]),
    ),
    (
        "sepia",
        ColorMatrix([
            0.14, 0.12, 0.08, 0.0, //
            0.45, 0.39, 0.28, 0.0, //
            0.05, 0.04, 0.03, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]),
    ),
    (
        "monochrome",
        ColorMatrix([
            0.299, 0.299, 0.299, 0.0, //
            0.587, 0.587, 0.587, 0.0, //
            0.114, 0.114, 0.114, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]),
    ),
];

/// A looked-up preset of either kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterValue<'a> {
    Kernel(&'a ConvolutionKernel),
    Color(&'a ColorMatrix),
}

impl FilterValue<'_> {
    pub fn as_slice(&self) -> &[f32] {
        match self {
            FilterValue::Kernel(kernel) => &kernel.0,
            FilterValue::Color(matrix) => &matrix.0,
        }
    }
}

/// Name → preset lookup over the two built-in tables. Presets are `'static`
/// and outlive the catalog value.
#[derive(Debug, Clone)]
pub struct FilterCatalog {
    convolutions: &'static [(&'static str, ConvolutionKernel)],
    colors: &'static [(&'static str, ColorMatrix)],
}

impl Default for FilterCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FilterCatalog {
    pub fn builtin() -> Self {
        Self {
            convolutions: &CONVOLUTION_PRESETS,
            colors: &COLOR_PRESETS,
        }
    }

    pub fn kernel(&self, name: &str) -> Result<&'static ConvolutionKernel> {
        let table: &'static [(&'static str, ConvolutionKernel)] = self.convolutions;
        table
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, kernel)| kernel)
            .ok_or_else(|| Error::unknown_filter(FilterKind::Convolution, name))
    }

    pub fn color(&self, name: &str) -> Result<&'static ColorMatrix> {
        let table: &'static [(&'static str, ColorMatrix)] = self.colors;
        table
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, matrix)| matrix)
            .ok_or_else(|| Error::unknown_filter(FilterKind::Color, name))
    }

    pub fn lookup(&self, kind: FilterKind, name: &str) -> Result<FilterValue<'static>> {
        match kind {
            FilterKind::Convolution => self.kernel(name).map(FilterValue::Kernel),
            FilterKind::Color => self.color(name).map(FilterValue::Color),
        }
    }

    /// Preset names in declaration order.
    pub fn names(&self, kind: FilterKind) -> Vec<&'static str> {
        match kind {
            FilterKind::Convolution => self.convolutions.iter().map(|(name, _)| *name).collect(),
            FilterKind::Color => self.colors.iter().map(|(name, _)| *name).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_dispatches_by_kind() {
        let catalog = FilterCatalog::builtin();
        let kernel = catalog.lookup(FilterKind::Convolution, "laplacian").unwrap();
        assert_eq!(kernel.as_slice().len(), 9);
        let color = catalog.lookup(FilterKind::Color, "sepia").unwrap();
        assert_eq!(color.as_slice().len(), 16);
    }

    #[test]
    fn test_tables_are_separate() {
        let catalog = FilterCatalog::builtin();
        assert!(catalog.kernel("bgra").is_err());
        assert!(catalog.color("gaussian").is_err());
    }

    #[test]
    fn test_presets_outlive_the_catalog() {
        let kernel = FilterCatalog::builtin().kernel("box").unwrap();
        let matrix = FilterCatalog::builtin().color("none").unwrap();
        assert_eq!(kernel.weights().len(), 9);
        assert_eq!(matrix.apply([0.1, 0.2, 0.3, 1.0]), [0.1, 0.2, 0.3, 1.0]);
    }

    #[test]
    fn test_apply_is_column_major() {
        // Column 0 holds what red contributes to each output channel.
        let mut m = [0.0; 16];
        m[2] = 1.0;
        let out = ColorMatrix(m).apply([1.0, 0.0, 0.0, 0.0]);
        assert_eq!(out, [0.0, 0.0, 1.0, 0.0]);
    }
}
