//! Wires page, camera and pipeline together for one capture session.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{error, info, warn};
use web_sys::{HtmlCanvasElement, HtmlVideoElement, MediaStream};

use super::capture::BrowserCapture;
use super::dom::{self, SelectElements};
use super::render::AnimationLoop;
use crate::app::App;
use crate::capture::{CaptureSession, MediaCapture};
use crate::config::{CaptureConfig, Config};
use crate::error::{Error, Result};
use crate::stop::StopHandle;

/// A started session. Owns the camera stream and the animation loop once
/// capture is granted.
pub struct ActiveSession {
    capture: BrowserCapture,
    capture_stop: StopHandle,
    stream: Rc<RefCell<Option<MediaStream>>>,
    animation: Rc<RefCell<Option<AnimationLoop>>>,
}

/// Point the video element at the stream. Without size attributes the
/// element takes the configured capture size, which then fixes the frame size.
fn bind_stream(video: &HtmlVideoElement, stream: &MediaStream, fallback: CaptureConfig) {
    if video.width() == 0 || video.height() == 0 {
        video.set_width(fallback.width);
        video.set_height(fallback.height);
    }
    video.set_muted(true);
    video.set_autoplay(true);
    video.set_src_object(Some(stream));
    if let Err(err) = video.play() {
        warn!(?err, "video playback did not start");
    }
}

impl ActiveSession {
    /// Look up the page elements and request the camera. Setup runs when
    /// (and if) the request is granted.
    pub fn start(config: Config) -> Result<Self> {
        let window = web_sys::window().ok_or_else(|| Error::Js("no window".into()))?;
        let document = dom::document()?;
        let video: HtmlVideoElement = dom::element(&document, &config.elements.video)?;
        let canvas: HtmlCanvasElement = dom::element(&document, &config.elements.canvas)?;
        let selects = SelectElements::find(&document, &config)?;

        let constraints = config.constraints();
        let fallback = config.capture;
        let app = App::new(config, selects.clone())?;
        selects.populate(app.catalog(), app.config())?;

        let capture = BrowserCapture::new(window.navigator());
        let session = CaptureSession::new(capture.clone(), constraints);
        let stream = Rc::new(RefCell::new(None));
        let animation = Rc::new(RefCell::new(None));

        let on_granted = {
            let stream_slot = stream.clone();
            let animation_slot = animation.clone();
            move |granted: MediaStream| -> Result<()> {
                bind_stream(&video, &granted, fallback);
                *stream_slot.borrow_mut() = Some(granted);
                let render_loop = app.launch(&canvas, video)?;
                let driver = AnimationLoop::start(render_loop)
                    .map_err(|err| Error::Js(format!("{err:?}")))?;
                *animation_slot.borrow_mut() = Some(driver);
                Ok(())
            }
        };
        let on_error = |err: Error| {
            error!(%err, "camera filter is inert; no frame will be rendered");
        };
        session.start(on_granted, on_error)?;

        Ok(Self {
            capture,
            capture_stop: session.stop_handle(),
            stream,
            animation,
        })
    }

    /// Tear the session down: cancel a pending grant, stop the loop (which
    /// releases the GPU resources) and stop the camera tracks.
    pub fn stop(self) {
        self.capture_stop.stop();
        if let Some(driver) = self.animation.borrow_mut().take() {
            driver.stop();
        }
        if let Some(stream) = self.stream.borrow_mut().take() {
            self.capture.release(stream);
        }
        info!("capture session stopped");
    }
}
