//! Browser backends
//!
//! Real implementations of the engine's seams on top of `web-sys`:
//! a DOM `<audio>` element for the background shim and a
//! `BroadcastChannel` transport connecting the main page and the
//! picture-in-picture window.

mod audio;
mod channel;

pub use audio::DomAudioElement;
pub use channel::BroadcastChannelTransport;

use crate::error::PlaybackError;
use wasm_bindgen::{JsCast, JsValue};

/// The browser's user agent string, if there is a window
pub fn user_agent() -> Option<String> {
    web_sys::window()?.navigator().user_agent().ok()
}

pub(crate) fn js_error(context: &str, value: &JsValue) -> PlaybackError {
    let detail = value
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{:?}", value));
    PlaybackError::media(format!("{context}: {detail}"))
}
