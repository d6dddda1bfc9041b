//! `BroadcastChannel` sync transport
//!
//! Connects surfaces living in different browsing contexts of the same
//! origin (the main page and the document picture-in-picture window).
//! Messages travel as JSON strings. The browser never delivers a message
//! back to the channel object that posted it.

use crate::error::{PlaybackError, Result};
use crate::sync::{SyncMessage, SyncTransport};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::warn;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{BroadcastChannel, MessageEvent};

/// Sync transport over a named `BroadcastChannel`
#[derive(Debug)]
pub struct BroadcastChannelTransport {
    channel: BroadcastChannel,
    inbox: Rc<RefCell<VecDeque<SyncMessage>>>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
}

impl BroadcastChannelTransport {
    /// Join the channel called `name`
    pub fn open(name: &str) -> Result<Self> {
        let channel =
            BroadcastChannel::new(name).map_err(|e| PlaybackError::sync(format!("{:?}", e)))?;

        let inbox = Rc::new(RefCell::new(VecDeque::new()));
        let sink = Rc::clone(&inbox);
        let on_message = Closure::wrap(Box::new(move |event: MessageEvent| {
            let Some(json) = event.data().as_string() else {
                warn!("Dropping non-text sync message");
                return;
            };
            match SyncMessage::from_json(&json) {
                Ok(message) => sink.borrow_mut().push_back(message),
                Err(e) => warn!("Dropping malformed sync message: {}", e),
            }
        }) as Box<dyn FnMut(MessageEvent)>);
        channel.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

        Ok(Self {
            channel,
            inbox,
            _on_message: on_message,
        })
    }

    /// Name of the underlying channel
    pub fn name(&self) -> String {
        self.channel.name()
    }
}

impl SyncTransport for BroadcastChannelTransport {
    fn publish(&mut self, message: &SyncMessage) -> Result<()> {
        let json = message.to_json()?;
        self.channel
            .post_message(&JsValue::from_str(&json))
            .map_err(|e| PlaybackError::sync(format!("postMessage failed: {:?}", e)))
    }

    fn try_recv(&mut self) -> Result<Option<SyncMessage>> {
        Ok(self.inbox.borrow_mut().pop_front())
    }
}

impl Drop for BroadcastChannelTransport {
    fn drop(&mut self) {
        self.channel.set_onmessage(None);
        self.channel.close();
    }
}
