//! Sync transports
//!
//! A transport moves [`SyncMessage`]s between surfaces. It is deliberately
//! dumb: no filtering, no origin checks. Messages arrive in publish order per
//! channel, and a surface may receive its own messages back; loop prevention
//! lives in [`SurfaceSync`](super::SurfaceSync).

use super::event::SyncMessage;
use crate::error::{PlaybackError, Result};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::warn;

/// Message channel between surfaces
pub trait SyncTransport {
    /// Send a message to every connected surface
    fn publish(&mut self, message: &SyncMessage) -> Result<()>;

    /// Next pending message, without waiting
    fn try_recv(&mut self) -> Result<Option<SyncMessage>>;
}

/// In-process bus for surfaces living in the same runtime
///
/// Cloning the bus gives another handle to the same channel.
#[derive(Debug, Clone)]
pub struct LocalBus {
    sender: broadcast::Sender<SyncMessage>,
}

impl LocalBus {
    /// Create a bus buffering up to `capacity` messages per receiver
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Connect a new surface to the bus
    ///
    /// The transport only sees messages published after this call.
    pub fn connect(&self) -> LocalTransport {
        LocalTransport {
            sender: self.sender.clone(),
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of connected transports
    pub fn connections(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// One surface's connection to a [`LocalBus`]
#[derive(Debug)]
pub struct LocalTransport {
    sender: broadcast::Sender<SyncMessage>,
    receiver: broadcast::Receiver<SyncMessage>,
}

impl LocalTransport {
    /// Wait for the next message
    ///
    /// Returns `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<SyncMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Sync receiver lagged, dropping oldest messages");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl SyncTransport for LocalTransport {
    fn publish(&mut self, message: &SyncMessage) -> Result<()> {
        self.sender
            .send(message.clone())
            .map(|_| ())
            .map_err(|_| PlaybackError::sync("no surface connected"))
    }

    fn try_recv(&mut self) -> Result<Option<SyncMessage>> {
        loop {
            match self.receiver.try_recv() {
                Ok(message) => return Ok(Some(message)),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Sync receiver lagged, dropping oldest messages");
                }
                Err(TryRecvError::Closed) => {
                    return Err(PlaybackError::sync("bus closed"));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::event::SyncEvent;
    use duet_core::SurfaceId;

    fn message(event: SyncEvent) -> SyncMessage {
        SyncMessage::new(SurfaceId::main(), event)
    }

    #[test]
    fn messages_arrive_in_publish_order() {
        let bus = LocalBus::new(8);
        let mut a = bus.connect();
        let mut b = bus.connect();

        a.publish(&message(SyncEvent::Play)).unwrap();
        a.publish(&message(SyncEvent::Pause)).unwrap();
        a.publish(&message(SyncEvent::Next)).unwrap();

        let received: Vec<_> = std::iter::from_fn(|| b.try_recv().unwrap())
            .map(|m| m.event)
            .collect();
        assert_eq!(received, vec![SyncEvent::Play, SyncEvent::Pause, SyncEvent::Next]);
    }

    #[test]
    fn publisher_sees_its_own_messages() {
        let bus = LocalBus::new(8);
        let mut a = bus.connect();
        a.publish(&message(SyncEvent::Play)).unwrap();
        assert_eq!(a.try_recv().unwrap().unwrap().event, SyncEvent::Play);
    }

    #[test]
    fn lagging_receiver_skips_to_newest() {
        let bus = LocalBus::new(2);
        let mut a = bus.connect();
        let mut b = bus.connect();

        for volume in [0.1, 0.2, 0.3, 0.4] {
            a.publish(&message(SyncEvent::Volume { volume })).unwrap();
        }

        let first = b.try_recv().unwrap().unwrap();
        assert_eq!(first.event, SyncEvent::Volume { volume: 0.3 });
    }

    #[test]
    fn late_connection_misses_earlier_messages() {
        let bus = LocalBus::new(8);
        let mut a = bus.connect();
        a.publish(&message(SyncEvent::Play)).unwrap();

        let mut late = bus.connect();
        assert!(late.try_recv().unwrap().is_none());
        assert_eq!(bus.connections(), 2);
    }

    #[tokio::test]
    async fn recv_waits_for_message() {
        let bus = LocalBus::new(8);
        let mut a = bus.connect();
        let mut b = bus.connect();

        let handle = tokio::spawn(async move { b.recv().await });
        a.publish(&message(SyncEvent::Previous)).unwrap();

        let received = handle.await.unwrap().unwrap();
        assert_eq!(received.event, SyncEvent::Previous);
    }
}
