//! Event distribution between sessions.
//!
//! Defines the [`EventFeed`] trait every event source must satisfy.
//! The concrete implementation is [`local::LocalTopic`] — an in-process
//! broadcast topic whose subscribers receive the same encoded frames a
//! networked feed would carry.

pub mod local;

pub use local::{LocalTopic, TopicPublisher, TopicSubscriber};

use syncboard_proto::codec::CodecError;
use syncboard_proto::event::BoardEvent;
use thiserror::Error;

/// Errors that can occur while receiving from an event feed.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Every publisher for the feed is gone.
    #[error("event feed closed")]
    Closed,

    /// The subscriber fell behind and the feed dropped events.
    ///
    /// The local set may now be missing updates; the caller should
    /// recover by reloading the full snapshot.
    #[error("event feed lagged, {skipped} events dropped")]
    Lagged {
        /// Number of events that were dropped.
        skipped: u64,
    },

    /// A frame on the feed could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Async source of board events for one session.
///
/// Implementations decode frames into [`BoardEvent`] values but do not
/// validate them — the consumer runs [`BoardEvent::validate`] and decides
/// what to do with a payload that fails it.
pub trait EventFeed: Send + Sync {
    /// Wait for the next event on the feed.
    ///
    /// Blocks asynchronously until an event arrives or the feed ends.
    fn next_event(
        &self,
    ) -> impl std::future::Future<Output = Result<BoardEvent, ChannelError>> + Send;
}
