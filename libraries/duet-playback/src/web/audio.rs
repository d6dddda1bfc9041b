//! Hidden DOM `<audio>` element

use super::js_error;
use crate::error::Result;
use crate::shim::{MediaElement, ReadySignal};
use async_trait::async_trait;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::warn;
use wasm_bindgen::{closure::Closure, JsCast};
use wasm_bindgen_futures::JsFuture;
use web_sys::{HtmlAudioElement, HtmlMediaElement};

const ELEMENT_ID: &str = "duet-background-audio";

type ReadyWaiter = Rc<RefCell<Option<oneshot::Sender<ReadySignal>>>>;

/// `<audio>` element appended to `<body>`, hidden
#[derive(Debug)]
pub struct DomAudioElement {
    audio: HtmlAudioElement,
    waiter: ReadyWaiter,
    listeners: Vec<(&'static str, Closure<dyn FnMut()>)>,
}

impl DomAudioElement {
    /// Create the element and attach it to the document
    ///
    /// Returns `None` outside a browser or if the DOM refuses.
    pub fn create() -> Option<Self> {
        let document = web_sys::window()?.document()?;

        let audio: HtmlAudioElement = document.create_element("audio").ok()?.dyn_into().ok()?;
        audio.set_id(ELEMENT_ID);
        audio.set_hidden(true);
        audio.set_attribute("preload", "auto").ok()?;
        audio.set_attribute("playsinline", "").ok()?;
        document.body()?.append_child(&audio).ok()?;

        let waiter: ReadyWaiter = Rc::new(RefCell::new(None));
        let mut element = Self {
            audio,
            waiter,
            listeners: Vec::new(),
        };
        element.listen("canplay", ReadySignal::Ready);
        element.listen("error", ReadySignal::Error);

        Some(element)
    }

    fn listen(&mut self, event: &'static str, signal: ReadySignal) {
        let waiter = Rc::clone(&self.waiter);
        let callback = Closure::wrap(Box::new(move || {
            if let Some(tx) = waiter.borrow_mut().take() {
                let _ = tx.send(signal);
            }
        }) as Box<dyn FnMut()>);

        if let Err(e) = self
            .audio
            .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
        {
            warn!(event, "Failed to attach audio listener: {:?}", e);
            return;
        }
        self.listeners.push((event, callback));
    }
}

#[async_trait(?Send)]
impl MediaElement for DomAudioElement {
    fn set_src(&mut self, url: &str) {
        self.audio.set_src(url);
    }

    fn clear_src(&mut self) {
        let _ = self.audio.remove_attribute("src");
        self.audio.load();
    }

    fn src(&self) -> Option<String> {
        let src = self.audio.src();
        (!src.is_empty()).then_some(src)
    }

    fn is_ready(&self) -> bool {
        self.audio.ready_state() >= HtmlMediaElement::HAVE_FUTURE_DATA
    }

    async fn wait_ready(&mut self) -> ReadySignal {
        if self.is_ready() {
            return ReadySignal::Ready;
        }
        let (tx, rx) = oneshot::channel();
        *self.waiter.borrow_mut() = Some(tx);
        rx.await.unwrap_or(ReadySignal::Error)
    }

    async fn start(&mut self) -> Result<()> {
        let promise = self.audio.play().map_err(|e| js_error("play", &e))?;
        JsFuture::from(promise)
            .await
            .map_err(|e| js_error("play", &e))?;
        Ok(())
    }

    fn pause(&mut self) {
        if let Err(e) = self.audio.pause() {
            warn!("Background audio pause failed: {:?}", e);
        }
    }

    fn set_current_time(&mut self, time: Duration) {
        self.audio.set_current_time(time.as_secs_f64());
    }

    fn set_volume(&mut self, volume: f64) {
        self.audio.set_volume(volume);
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.audio.set_playback_rate(rate);
    }

    fn detach(&mut self) {
        for (event, callback) in self.listeners.drain(..) {
            let _ = self
                .audio
                .remove_event_listener_with_callback(event, callback.as_ref().unchecked_ref());
        }
        self.waiter.borrow_mut().take();
        self.audio.remove();
    }
}
