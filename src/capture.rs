//! Capture session: negotiate a getUserMedia variant, request a video-only
//! stream and hand it to setup exactly once.

use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::stop::StopHandle;

/// getUserMedia flavours, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureApi {
    /// `navigator.mediaDevices.getUserMedia`, promise based.
    MediaDevices,
    /// `navigator.getUserMedia`, callback based.
    Legacy,
    Webkit,
    Moz,
}

impl CaptureApi {
    pub const PREFERENCE: [CaptureApi; 4] = [
        CaptureApi::MediaDevices,
        CaptureApi::Legacy,
        CaptureApi::Webkit,
        CaptureApi::Moz,
    ];

    /// Property name of the function on its owner object.
    pub fn function_name(self) -> &'static str {
        match self {
            CaptureApi::MediaDevices | CaptureApi::Legacy => "getUserMedia",
            CaptureApi::Webkit => "webkitGetUserMedia",
            CaptureApi::Moz => "mozGetUserMedia",
        }
    }

    pub fn is_legacy(self) -> bool {
        !matches!(self, CaptureApi::MediaDevices)
    }
}

/// Video-only stream request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VideoConstraints {
    pub ideal_width: Option<u32>,
    pub ideal_height: Option<u32>,
}

impl VideoConstraints {
    pub fn ideal(width: u32, height: u32) -> Self {
        Self {
            ideal_width: Some(width),
            ideal_height: Some(height),
        }
    }

    /// The constraints object passed to `api`. The legacy callback APIs only
    /// get `{ video: true }`; size hints are a MediaDevices feature.
    pub fn to_json(&self, api: CaptureApi) -> Value {
        let mut video = serde_json::Map::new();
        if !api.is_legacy() {
            if let Some(width) = self.ideal_width {
                video.insert("width".into(), json!({ "ideal": width }));
            }
            if let Some(height) = self.ideal_height {
                video.insert("height".into(), json!({ "ideal": height }));
            }
        }
        let video = if video.is_empty() {
            Value::Bool(true)
        } else {
            Value::Object(video)
        };
        json!({ "video": video, "audio": false })
    }
}

/// One-shot continuation of a capture request.
pub type CaptureReply<S> = Box<dyn FnOnce(Result<S>)>;

/// The platform's media-capture facility.
pub trait MediaCapture {
    type Stream;

    fn supports(&self, api: CaptureApi) -> bool;

    /// Ask for a stream. `reply` runs once, possibly before this returns.
    fn request(&self, api: CaptureApi, constraints: &VideoConstraints, reply: CaptureReply<Self::Stream>);

    /// Stop every track of a stream nobody is going to use.
    fn release(&self, stream: Self::Stream);
}

/// First supported API in [`CaptureApi::PREFERENCE`] order.
pub fn negotiate<M: MediaCapture>(capture: &M) -> Result<CaptureApi> {
    CaptureApi::PREFERENCE
        .into_iter()
        .find(|api| capture.supports(*api))
        .ok_or(Error::UnsupportedCapture)
}

pub struct CaptureSession<M> {
    capture: M,
    constraints: VideoConstraints,
    stop: StopHandle,
}

impl<M> CaptureSession<M>
where
    M: MediaCapture + Clone + 'static,
{
    pub fn new(capture: M, constraints: VideoConstraints) -> Self {
        Self {
            capture,
            constraints,
            stop: StopHandle::new(),
        }
    }

    /// Stopping before the grant arrives releases the stream unused.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Request a stream and run exactly one of the continuations.
    ///
    /// `on_granted` binds the stream and sets the pipeline up; an error it
    /// returns is forwarded to `on_error`, as is a refused request. When no
    /// capture API exists at all the error is returned here and neither
    /// continuation runs.
    pub fn start<G, E>(&self, on_granted: G, on_error: E) -> Result<CaptureApi>
    where
        G: FnOnce(M::Stream) -> Result<()> + 'static,
        E: FnOnce(Error) + 'static,
    {
        let api = negotiate(&self.capture)?;
        info!(api = api.function_name(), legacy = api.is_legacy(), "requesting video stream");

        let capture = self.capture.clone();
        let stop = self.stop.clone();
        let reply: CaptureReply<M::Stream> = Box::new(move |result| match result {
            Ok(stream) if stop.is_stopped() => {
                debug!("session stopped before capture was granted; releasing stream");
                capture.release(stream);
            }
            Ok(stream) => {
                info!("video capture granted");
                if let Err(err) = on_granted(stream) {
                    error!(%err, "filter pipeline setup failed");
                    on_error(err);
                }
            }
            Err(err) => {
                warn!(%err, "video capture refused");
                on_error(err);
            }
        });
        self.capture.request(api, &self.constraints, reply);
        Ok(api)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modern_constraints_carry_ideal_size() {
        let value = VideoConstraints::ideal(1280, 720).to_json(CaptureApi::MediaDevices);
        assert_eq!(
            value,
            json!({ "video": { "width": { "ideal": 1280 }, "height": { "ideal": 720 } }, "audio": false })
        );
    }

    #[test]
    fn test_legacy_constraints_are_plain() {
        let value = VideoConstraints::ideal(1280, 720).to_json(CaptureApi::Webkit);
        assert_eq!(value, json!({ "video": true, "audio": false }));
    }

    #[test]
    fn test_default_constraints_are_video_only() {
        let value = VideoConstraints::default().to_json(CaptureApi::MediaDevices);
        assert_eq!(value, json!({ "video": true, "audio": false }));
    }
}
