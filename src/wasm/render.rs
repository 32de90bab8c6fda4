use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, error};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::window;

use crate::gpu::GraphicsContext;
use crate::render_loop::RenderLoop;
use crate::selection::SelectionSource;
use crate::stop::StopHandle;

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// `requestAnimationFrame` driver for a [`RenderLoop`].
///
/// Stopping (or dropping) cancels the pending frame request and drops the
/// callback, and with it the render loop and its GPU resources. A loop that
/// breaks or fails on its own releases them from inside the callback.
pub struct AnimationLoop {
    callback: FrameCallback,
    pending: Rc<Cell<Option<i32>>>,
    stop: StopHandle,
}

fn request_frame(callback: &Closure<dyn FnMut()>) -> Result<i32, JsValue> {
    window()
        .ok_or("no window")?
        .request_animation_frame(callback.as_ref().unchecked_ref())
}

impl AnimationLoop {
    /// Register `render_loop` as the first frame callback.
    pub fn start<C, S>(render_loop: RenderLoop<C, S>) -> Result<Self, JsValue>
    where
        C: GraphicsContext + 'static,
        S: SelectionSource + 'static,
    {
        let stop = render_loop.stop_handle();
        // Emptied once the loop breaks or fails; the closure itself lives on
        // until `stop`.
        let mut render_loop = Some(render_loop);

        // `callback` holds the animation-frame closure so that it can keep
        // calling `request_animation_frame` with itself. Storing it inside an
        // `Option` allows us to create the `Closure` first and then obtain a
        // reference to it from within itself.
        let callback: FrameCallback = Rc::new(RefCell::new(None));
        let pending = Rc::new(Cell::new(None));

        let next = callback.clone();
        let scheduled = pending.clone();
        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            scheduled.set(None);
            if RenderLoop::advance(&mut render_loop).is_break() {
                return;
            }

            // schedule next
            if let Some(cb) = next.borrow().as_ref() {
                match request_frame(cb) {
                    Ok(id) => scheduled.set(Some(id)),
                    Err(err) => {
                        error!(?err, "requestAnimationFrame failed");
                        render_loop = None;
                    }
                }
            }
        }) as Box<dyn FnMut()>));

        let first = match callback.borrow().as_ref() {
            Some(cb) => request_frame(cb)?,
            None => return Err("animation callback missing".into()),
        };
        pending.set(Some(first));
        debug!("render loop scheduled");

        Ok(Self {
            callback,
            pending,
            stop,
        })
    }

    pub fn stop(&self) {
        self.stop.stop();
        if let Some(id) = self.pending.take() {
            if let Some(window) = window() {
                let _ = window.cancel_animation_frame(id);
            }
        }
        if self.callback.borrow_mut().take().is_some() {
            debug!("render loop torn down");
        }
    }
}

impl Drop for AnimationLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
