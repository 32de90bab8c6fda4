use std::ops::ControlFlow;
use std::rc::Rc;

use image::{Rgba, RgbaImage};

use camfilter_wasm::error::ShaderStage;
use camfilter_wasm::gpu::RenderSurface;
use camfilter_wasm::selection::FilterSelection;
use camfilter_wasm::shader::{ShaderSources, VERTEX_SHADER};
use camfilter_wasm::software::{SoftwareContext, SoftwareSurface};
use camfilter_wasm::{App, Config, Error, FilterKind, RenderLoop};

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

fn solid(width: u32, height: u32, rgba: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(rgba))
}

fn filter_app(convolution: &str, color: &str) -> (App<Rc<FilterSelection>>, Rc<FilterSelection>) {
    let selection = Rc::new(FilterSelection::new(convolution, color));
    let config = Config::default().with_filters(convolution, color);
    (App::new(config, Rc::clone(&selection)).unwrap(), selection)
}

fn assert_every_pixel(context: &SoftwareContext, expected: [u8; 4]) {
    for (x, y, pixel) in context.read_pixels().enumerate_pixels() {
        assert_eq!(pixel.0, expected, "pixel ({x}, {y})");
    }
}

/// A surface that cannot produce a context, keeping an inspectable one aside.
struct NullSurface {
    context: SoftwareContext,
}

impl RenderSurface for NullSurface {
    type Context = SoftwareContext;

    fn rendering_context(&self) -> Option<SoftwareContext> {
        None
    }
}

#[test]
fn red_through_bgra_renders_blue() {
    let (app, _) = filter_app("none", "bgra");
    let surface = SoftwareSurface::new(2, 2);
    let mut render_loop = app.launch(&surface, solid(2, 2, RED)).unwrap();

    assert_eq!(render_loop.tick().unwrap(), ControlFlow::Continue(()));
    assert_every_pixel(&surface.context(), BLUE);
}

#[test]
fn identity_filters_pass_frames_through() {
    let mut frame = RgbaImage::new(3, 2);
    for (x, y, pixel) in frame.enumerate_pixels_mut() {
        *pixel = Rgba([x as u8 * 100, y as u8 * 200, 50, 255]);
    }
    let (app, _) = filter_app("none", "none");
    let surface = SoftwareSurface::new(3, 2);
    let mut render_loop = app.launch(&surface, frame.clone()).unwrap();
    assert!(render_loop.tick().unwrap().is_continue());

    // Row 0 of the frame is the top row of the surface.
    assert_eq!(surface.context().read_pixels(), frame);
}

#[test]
fn blurs_keep_uniform_frames_unchanged() {
    let color = [100, 150, 200, 255];
    for kernel in ["box", "gaussian"] {
        let (app, _) = filter_app(kernel, "none");
        let surface = SoftwareSurface::new(4, 3);
        let mut render_loop = app.launch(&surface, solid(4, 3, color)).unwrap();
        assert!(render_loop.tick().unwrap().is_continue());
        assert_every_pixel(&surface.context(), color);
    }
}

#[test]
fn laplacian_of_uniform_frame_is_zero() {
    // Weights sum to zero, alpha included.
    let (app, _) = filter_app("laplacian", "none");
    let surface = SoftwareSurface::new(3, 3);
    let mut render_loop = app.launch(&surface, solid(3, 3, [80, 160, 240, 255])).unwrap();
    assert!(render_loop.tick().unwrap().is_continue());
    assert_every_pixel(&surface.context(), [0, 0, 0, 0]);
}

#[test]
fn selection_changes_apply_without_rebuilding() {
    let (app, selection) = filter_app("none", "none");
    let surface = SoftwareSurface::new(2, 2);
    let context = surface.context();
    let mut render_loop = app.launch(&surface, solid(2, 2, RED)).unwrap();

    assert!(render_loop.tick().unwrap().is_continue());
    assert_every_pixel(&context, RED);
    let after_setup = context.stats();

    selection.select_color("bgra");
    assert!(render_loop.tick().unwrap().is_continue());
    assert_every_pixel(&context, BLUE);

    selection.select_color("monochrome");
    assert!(render_loop.tick().unwrap().is_continue());
    assert_eq!(context.pixel(0, 0), [76, 76, 76, 255]);

    let stats = context.stats();
    assert_eq!(stats.shaders_compiled, 2);
    assert_eq!(stats.programs_linked, 1);
    assert_eq!(stats.allocations(), after_setup.allocations());
    assert_eq!(stats.draws, 3);
    assert_eq!(stats.texture_uploads, 3);
    assert_eq!(render_loop.ticks(), 3);
}

#[test]
fn unknown_selection_fails_the_tick() {
    let (app, selection) = filter_app("none", "none");
    let surface = SoftwareSurface::new(2, 2);
    let mut render_loop = app.launch(&surface, solid(2, 2, RED)).unwrap();

    selection.select_color("purple");
    let err = render_loop.tick().unwrap_err();
    assert!(matches!(err, Error::UnknownFilter { kind: FilterKind::Color, .. }));
    assert_eq!(surface.context().stats().draws, 0);
}

#[test]
fn unknown_default_is_rejected_up_front() {
    let selection = Rc::new(FilterSelection::new("none", "none"));
    let config = Config::default().with_filters("edges", "none");
    assert!(matches!(
        App::new(config, selection),
        Err(Error::UnknownFilter { kind: FilterKind::Convolution, .. })
    ));
}

#[test]
fn missing_context_fails_before_any_allocation() {
    let (app, _) = filter_app("none", "none");
    let surface = NullSurface {
        context: SoftwareContext::new(2, 2),
    };
    let result = app.launch(&surface, solid(2, 2, RED));
    assert!(matches!(result, Err(Error::MissingRenderContext)));
    assert_eq!(surface.context.stats().allocations(), 0);
}

#[test]
fn zero_sized_frame_is_rejected() {
    let (app, _) = filter_app("none", "none");
    let surface = SoftwareSurface::new(2, 2);
    let result = app.launch(&surface, RgbaImage::new(0, 0));
    assert!(matches!(result, Err(Error::InvalidFrameSize { .. })));
    assert_eq!(surface.context().stats().allocations(), 0);
}

#[test]
fn compile_failure_releases_partial_setup() {
    let (app, _) = filter_app("none", "none");
    let app = app.with_shader_sources(ShaderSources::new(
        VERTEX_SHADER,
        "precision mediump float;\nuniform float u_kernel[9];\n",
    ));
    let surface = SoftwareSurface::new(2, 2);
    let err = app.launch(&surface, solid(2, 2, RED)).err().unwrap();

    assert!(matches!(
        err,
        Error::ShaderCompileFailed { stage: ShaderStage::Fragment, .. }
    ));
    let stats = surface.context().stats();
    assert_eq!(stats.shaders_compiled, 1);
    assert_eq!(stats.live_objects(), 0);
}

#[test]
fn link_failure_carries_the_log_and_releases_shaders() {
    let (app, _) = filter_app("none", "none");
    let app = app.with_shader_sources(ShaderSources::new(
        VERTEX_SHADER,
        "precision mediump float;\nvarying vec3 v_uv;\nvoid main() { gl_FragColor = vec4(v_uv, 1.0); }\n",
    ));
    let surface = SoftwareSurface::new(2, 2);
    let err = app.launch(&surface, solid(2, 2, RED)).err().unwrap();

    match err {
        Error::ShaderLinkFailed(log) => assert!(log.contains("v_uv"), "{log}"),
        other => panic!("expected a link failure, got {other}"),
    }
    let stats = surface.context().stats();
    assert_eq!(stats.shaders_compiled, 2);
    assert_eq!(stats.live_objects(), 0);
}

#[test]
fn missing_uniform_is_a_binding_error() {
    let (app, _) = filter_app("none", "none");
    let app = app.with_shader_sources(ShaderSources::new(
        VERTEX_SHADER,
        "precision mediump float;\nvarying vec2 v_uv;\nvoid main() { gl_FragColor = vec4(v_uv, 0.0, 1.0); }\n",
    ));
    let surface = SoftwareSurface::new(2, 2);
    let err = app.launch(&surface, solid(2, 2, RED)).err().unwrap();

    assert!(matches!(err, Error::MissingBinding(ref name) if name == "u_offsets"));
    assert_eq!(surface.context().stats().live_objects(), 0);
}

#[test]
fn dropping_the_loop_releases_every_object() {
    let (app, _) = filter_app("gaussian", "sepia");
    let surface = SoftwareSurface::new(2, 2);
    let context = surface.context();
    let mut render_loop = app.launch(&surface, solid(2, 2, RED)).unwrap();
    assert!(render_loop.tick().unwrap().is_continue());

    let live = context.stats();
    assert_eq!(live.live_shaders, 2);
    assert_eq!(live.live_programs, 1);
    assert_eq!(live.live_buffers, 2);
    assert_eq!(live.live_textures, 1);

    drop(render_loop);
    assert_eq!(context.stats().live_objects(), 0);
}

#[test]
fn stopped_loop_breaks_without_drawing() {
    let (app, _) = filter_app("none", "none");
    let surface = SoftwareSurface::new(2, 2);
    let mut render_loop = app.launch(&surface, solid(2, 2, RED)).unwrap();
    assert!(render_loop.tick().unwrap().is_continue());

    let handle = render_loop.stop_handle();
    handle.stop();
    assert_eq!(render_loop.tick().unwrap(), ControlFlow::Break(()));
    assert_eq!(render_loop.ticks(), 1);
    assert_eq!(surface.context().stats().draws, 1);
}

#[test]
fn frames_are_reuploaded_every_tick() {
    let (app, _) = filter_app("none", "none");
    let surface = SoftwareSurface::new(2, 2);
    let mut render_loop = app.launch(&surface, solid(2, 2, RED)).unwrap();
    assert!(render_loop.tick().unwrap().is_continue());

    *render_loop.frame_mut() = solid(2, 2, BLUE);
    assert!(render_loop.tick().unwrap().is_continue());
    assert_every_pixel(&surface.context(), BLUE);
}

#[test]
fn failed_advance_drops_the_loop_and_its_objects() {
    let (app, selection) = filter_app("none", "none");
    let surface = SoftwareSurface::new(2, 2);
    let context = surface.context();
    let mut slot = Some(app.launch(&surface, solid(2, 2, RED)).unwrap());

    assert_eq!(RenderLoop::advance(&mut slot), ControlFlow::Continue(()));
    assert!(slot.is_some());
    assert!(context.stats().live_objects() > 0);

    selection.select_convolution("sobel");
    assert_eq!(RenderLoop::advance(&mut slot), ControlFlow::Break(()));
    assert!(slot.is_none());
    assert_eq!(context.stats().live_objects(), 0);
    // An emptied slot stays stopped.
    assert_eq!(RenderLoop::advance(&mut slot), ControlFlow::Break(()));
}

#[test]
fn stopped_advance_drops_the_loop() {
    let (app, _) = filter_app("none", "none");
    let surface = SoftwareSurface::new(2, 2);
    let context = surface.context();
    let mut slot = Some(app.launch(&surface, solid(2, 2, RED)).unwrap());

    if let Some(render_loop) = &slot {
        render_loop.stop_handle().stop();
    }
    assert_eq!(RenderLoop::advance(&mut slot), ControlFlow::Break(()));
    assert!(slot.is_none());
    assert_eq!(context.stats().live_objects(), 0);
    assert_eq!(context.stats().draws, 0);
}
