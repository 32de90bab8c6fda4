//! getUserMedia over `navigator`, modern and vendor-prefixed.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Function, Reflect, JSON};
use tracing::debug;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{MediaStream, MediaStreamTrack, Navigator};

use crate::capture::{CaptureApi, CaptureReply, MediaCapture, VideoConstraints};
use crate::error::{Error, Result};

#[derive(Clone)]
pub struct BrowserCapture {
    navigator: Navigator,
}

impl BrowserCapture {
    pub fn new(navigator: Navigator) -> Self {
        Self { navigator }
    }

    /// The object the API's function hangs off.
    fn owner(&self, api: CaptureApi) -> Option<JsValue> {
        match api {
            CaptureApi::MediaDevices => {
                let devices = Reflect::get(&self.navigator, &"mediaDevices".into()).ok()?;
                (!devices.is_undefined() && !devices.is_null()).then_some(devices)
            }
            _ => Some(self.navigator.clone().into()),
        }
    }

    fn function(&self, api: CaptureApi) -> Option<(JsValue, Function)> {
        let owner = self.owner(api)?;
        let function = Reflect::get(&owner, &api.function_name().into())
            .ok()?
            .dyn_into::<Function>()
            .ok()?;
        Some((owner, function))
    }
}

/// `DOMException`-like failure → capture error.
fn capture_error(value: &JsValue) -> Error {
    let field = |name: &str| {
        Reflect::get(value, &name.into())
            .ok()
            .and_then(|v| v.as_string())
            .unwrap_or_default()
    };
    let name = field("name");
    let message = field("message");
    if name.is_empty() && message.is_empty() {
        return Error::capture_failure("Error", format!("{value:?}"));
    }
    Error::capture_failure(name, message)
}

fn stream_result(value: JsValue) -> Result<MediaStream> {
    value.dyn_into::<MediaStream>().map_err(|_| Error::CaptureUnavailable {
        name: "TypeError".into(),
        message: "the browser did not provide a media stream".into(),
    })
}

impl MediaCapture for BrowserCapture {
    type Stream = MediaStream;

    fn supports(&self, api: CaptureApi) -> bool {
        self.function(api).is_some()
    }

    fn request(&self, api: CaptureApi, constraints: &VideoConstraints, reply: CaptureReply<MediaStream>) {
        // Whichever continuation fires first takes the reply; the other is a no-op.
        let slot = Rc::new(RefCell::new(Some(reply)));
        let deliver = move |result: Result<MediaStream>| {
            let reply = slot.borrow_mut().take();
            if let Some(reply) = reply {
                reply(result);
            }
        };

        let Some((owner, function)) = self.function(api) else {
            deliver(Err(Error::UnsupportedCapture));
            return;
        };
        let constraints = match JSON::parse(&constraints.to_json(api).to_string()) {
            Ok(value) => value,
            Err(err) => {
                deliver(Err(Error::Js(format!("{err:?}"))));
                return;
            }
        };

        let granted = {
            let deliver = deliver.clone();
            Closure::once_into_js(move |stream: JsValue| deliver(stream_result(stream)))
        };
        let denied = {
            let deliver = deliver.clone();
            Closure::once_into_js(move |err: JsValue| deliver(Err(capture_error(&err))))
        };

        debug!(api = api.function_name(), "calling getUserMedia");
        let called = if api.is_legacy() {
            function.call3(&owner, &constraints, &granted, &denied).map(|_| ())
        } else {
            function.call1(&owner, &constraints).and_then(|promise| {
                let then = Reflect::get(&promise, &"then".into())?.dyn_into::<Function>()?;
                then.call2(&promise, &granted, &denied).map(|_| ())
            })
        };
        if let Err(err) = called {
            deliver(Err(capture_error(&err)));
        }
    }

    fn release(&self, stream: MediaStream) {
        for track in stream.get_tracks().iter() {
            if let Ok(track) = track.dyn_into::<MediaStreamTrack>() {
                track.stop();
            }
        }
    }
}
