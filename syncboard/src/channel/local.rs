//! In-process event topic.
//!
//! Uses a [`tokio::sync::broadcast`] channel to fan encoded event frames
//! out to every subscribed session. Frames cross the topic as bytes, so
//! subscribers exercise the same decode-and-validate path a networked
//! feed would.

use tokio::sync::{Mutex, broadcast};

use syncboard_proto::codec;
use syncboard_proto::event::BoardEvent;

use super::{ChannelError, EventFeed};

const DEFAULT_CAPACITY: usize = 256;

/// A shared broadcast topic for board events.
///
/// The topic itself is held by whoever wires the process together; each
/// session takes a [`TopicSubscriber`] and the store takes a
/// [`TopicPublisher`]. Subscribers only see frames published after they
/// joined.
#[derive(Debug)]
pub struct LocalTopic {
    tx: broadcast::Sender<Vec<u8>>,
}

impl LocalTopic {
    /// Create a topic with the default frame buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a topic buffering at most `capacity` frames per subscriber.
    ///
    /// A subscriber that falls more than `capacity` frames behind starts
    /// losing the oldest ones and sees [`ChannelError::Lagged`] on its
    /// next receive.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Attach a new subscriber to the topic.
    #[must_use]
    pub fn subscribe(&self) -> TopicSubscriber {
        TopicSubscriber {
            rx: Mutex::new(self.tx.subscribe()),
        }
    }

    /// Create a publishing handle for the topic.
    #[must_use]
    pub fn publisher(&self) -> TopicPublisher {
        TopicPublisher {
            tx: self.tx.clone(),
        }
    }
}

impl Default for LocalTopic {
    fn default() -> Self {
        Self::new()
    }
}

/// Sending side of a [`LocalTopic`].
#[derive(Debug, Clone)]
pub struct TopicPublisher {
    tx: broadcast::Sender<Vec<u8>>,
}

impl TopicPublisher {
    /// Encode and publish one event, returning how many subscribers the
    /// frame reached. A topic with no subscribers absorbs the frame.
    ///
    /// # Errors
    ///
    /// Returns [`codec::CodecError`] if the event fails to encode.
    pub fn publish(&self, event: &BoardEvent) -> Result<usize, codec::CodecError> {
        let frame = codec::encode(event)?;
        Ok(self.tx.send(frame).unwrap_or(0))
    }

    /// Publish a pre-encoded frame as-is.
    pub fn publish_raw(&self, frame: Vec<u8>) -> usize {
        self.tx.send(frame).unwrap_or(0)
    }
}

/// Receiving side of a [`LocalTopic`] for one session.
pub struct TopicSubscriber {
    rx: Mutex<broadcast::Receiver<Vec<u8>>>,
}

impl EventFeed for TopicSubscriber {
    async fn next_event(&self) -> Result<BoardEvent, ChannelError> {
        let frame = {
            let mut rx = self.rx.lock().await;
            rx.recv().await.map_err(|err| match err {
                broadcast::error::RecvError::Closed => ChannelError::Closed,
                broadcast::error::RecvError::Lagged(skipped) => ChannelError::Lagged { skipped },
            })?
        };
        Ok(codec::decode(&frame)?)
    }
}
