use camfilter_wasm::catalog::FilterValue;
use camfilter_wasm::frame::FrameSize;
use camfilter_wasm::shader::SampleOffsets;
use camfilter_wasm::{Error, FilterCatalog, FilterKind};

const CONVOLUTIONS: [&str; 6] = ["none", "box", "gaussian", "emboss", "sharpness", "laplacian"];
const COLORS: [&str; 4] = ["none", "bgra", "sepia", "monochrome"];

#[test]
fn every_preset_has_the_right_arity() {
    let catalog = FilterCatalog::builtin();
    assert_eq!(catalog.names(FilterKind::Convolution), CONVOLUTIONS);
    assert_eq!(catalog.names(FilterKind::Color), COLORS);

    for name in CONVOLUTIONS {
        let value = catalog.lookup(FilterKind::Convolution, name).unwrap();
        assert!(matches!(value, FilterValue::Kernel(_)));
        assert_eq!(value.as_slice().len(), 9, "{name}");
    }
    for name in COLORS {
        let value = catalog.lookup(FilterKind::Color, name).unwrap();
        assert!(matches!(value, FilterValue::Color(_)));
        assert_eq!(value.as_slice().len(), 16, "{name}");
    }
}

#[test]
fn kernels_match_reference_values() {
    let catalog = FilterCatalog::builtin();
    assert_eq!(
        catalog.kernel("none").unwrap().weights(),
        &[0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]
    );
    assert_eq!(catalog.kernel("box").unwrap().weights(), &[1.0 / 9.0; 9]);
    assert_eq!(
        catalog.kernel("gaussian").unwrap().weights(),
        &[0.0625, 0.125, 0.0625, 0.125, 0.25, 0.125, 0.0625, 0.125, 0.0625]
    );
    assert_eq!(
        catalog.kernel("emboss").unwrap().weights(),
        &[2.0, -1.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, -1.0]
    );
    assert_eq!(
        catalog.kernel("sharpness").unwrap().weights(),
        &[-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0]
    );
    assert_eq!(
        catalog.kernel("laplacian").unwrap().weights(),
        &[0.0, 1.0, 0.0, 1.0, -4.0, 1.0, 0.0, 1.0, 0.0]
    );
}

#[test]
fn color_matrices_match_reference_values() {
    let catalog = FilterCatalog::builtin();
    let bgra = catalog.color("bgra").unwrap().elements();
    assert_eq!(
        bgra,
        &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]
    );
    let sepia = catalog.color("sepia").unwrap().elements();
    assert_eq!(
        sepia,
        &[0.14, 0.12, 0.08, 0.0, 0.45, 0.39, 0.28, 0.0, 0.05, 0.04, 0.03, 0.0, 0.0, 0.0, 0.0, 1.0]
    );

    let mono = catalog.color("monochrome").unwrap().elements();
    for (column, weight) in [0.299_f32, 0.587, 0.114].into_iter().enumerate() {
        assert_eq!(&mono[column * 4..column * 4 + 3], &[weight; 3]);
    }
}

#[test]
fn blur_kernels_preserve_energy() {
    let catalog = FilterCatalog::builtin();
    for name in ["none", "box", "gaussian"] {
        let sum = catalog.kernel(name).unwrap().weight_sum();
        assert!((sum - 1.0).abs() < 1e-6, "{name} sums to {sum}");
    }
}

#[test]
fn identity_matrix_returns_its_input() {
    let identity = FilterCatalog::builtin().color("none").unwrap();
    for rgba in [[0.0, 0.0, 0.0, 0.0], [0.2, 0.4, 0.6, 0.8], [1.0, 0.5, 0.25, 1.0]] {
        assert_eq!(identity.apply(rgba), rgba);
    }
}

#[test]
fn every_color_preset_preserves_alpha() {
    let catalog = FilterCatalog::builtin();
    for name in COLORS {
        let out = catalog.color(name).unwrap().apply([0.3, 0.6, 0.9, 0.5]);
        assert!((out[3] - 0.5).abs() < 1e-6, "{name}");
    }
}

#[test]
fn monochrome_produces_gray() {
    let mono = FilterCatalog::builtin().color("monochrome").unwrap();
    let [r, g, b, a] = mono.apply([1.0, 0.0, 0.0, 1.0]);
    assert_eq!((r, g, b, a), (0.299, 0.299, 0.299, 1.0));
}

#[test]
fn unknown_names_are_errors() {
    let catalog = FilterCatalog::builtin();
    let err = catalog.lookup(FilterKind::Convolution, "sobel").unwrap_err();
    assert!(matches!(
        err,
        Error::UnknownFilter { kind: FilterKind::Convolution, ref name } if name == "sobel"
    ));
    assert!(catalog.color("").is_err());
}

#[test]
fn sample_offsets_are_one_texel_steps() {
    let offsets = SampleOffsets::new(FrameSize::new(640, 480)).unwrap();
    let step_x = 1.0 / 640.0_f32;
    let step_y = 1.0 / 480.0_f32;
    assert_eq!(step_x, 0.0015625);
    assert_eq!(
        offsets.taps(),
        &[
            [-step_x, -step_y],
            [0.0, -step_y],
            [step_x, -step_y],
            [-step_x, 0.0],
            [0.0, 0.0],
            [step_x, 0.0],
            [-step_x, step_y],
            [0.0, step_y],
            [step_x, step_y],
        ]
    );
}
