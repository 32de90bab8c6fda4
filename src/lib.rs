#![cfg_attr(target_arch = "wasm32", allow(dead_code))]

//! Live camera filter: a 3×3 convolution and a 4×4 color matrix applied in a
//! single shader pass to every frame of a `getUserMedia` stream.
//!
//! The pipeline is written against [`gpu::GraphicsContext`]; the browser build
//! drives it with WebGL2 from `requestAnimationFrame`, host builds and tests
//! use [`software::SoftwareContext`].

pub mod app;
pub mod capture;
pub mod catalog;
pub mod config;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod pipeline;
pub mod render_loop;
pub mod selection;
pub mod shader;
pub mod software;
pub mod stop;

pub use app::App;
pub use catalog::{ColorMatrix, ConvolutionKernel, FilterCatalog};
pub use config::Config;
pub use error::{Error, FilterKind, Result};
pub use render_loop::RenderLoop;

// Only compile browser-specific code when targeting wasm32.

#[cfg(target_arch = "wasm32")]
pub mod wasm {
    use std::cell::RefCell;

    use wasm_bindgen::prelude::*;

    pub mod capture;
    pub mod console;
    pub mod dom;
    pub mod render;
    pub mod session;
    pub mod webgl;

    use crate::catalog::FilterCatalog;
    use crate::config::Config;
    use crate::error::FilterKind;
    use session::ActiveSession;

    thread_local! {
        /// The session started from JS, if any.
        static SESSION: RefCell<Option<ActiveSession>> = const { RefCell::new(None) };
    }

    #[wasm_bindgen(start)]
    pub fn main() -> Result<(), JsValue> {
        let document = dom::document()?;
        let config = dom::load_config(&document)?;
        console::init_logging(&config.log_filter);
        if config.autostart {
            start_with(config)?;
        }
        Ok(())
    }

    fn start_with(config: Config) -> Result<(), JsValue> {
        stop_capture();
        let session = ActiveSession::start(config)?;
        SESSION.with(|slot| *slot.borrow_mut() = Some(session));
        Ok(())
    }

    /// Start (or restart) capturing with the page configuration.
    #[wasm_bindgen]
    pub fn start_capture() -> Result<(), JsValue> {
        let config = dom::load_config(&dom::document()?)?;
        start_with(config)
    }

    /// Stop rendering, release the GPU resources and stop the camera.
    #[wasm_bindgen]
    pub fn stop_capture() {
        if let Some(session) = SESSION.with(|slot| slot.borrow_mut().take()) {
            session.stop();
        }
    }

    /// Preset names of one table: `"convolution"` or `"color"`.
    #[wasm_bindgen]
    pub fn filter_names(kind: &str) -> Result<Vec<JsValue>, JsValue> {
        let kind = match kind {
            "convolution" | "composition" => FilterKind::Convolution,
            "color" => FilterKind::Color,
            other => return Err(JsValue::from_str(&format!("unknown filter table `{other}`"))),
        };
        Ok(FilterCatalog::builtin()
            .names(kind)
            .into_iter()
            .map(JsValue::from_str)
            .collect())
    }
}
