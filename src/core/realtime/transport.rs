//! Transport abstraction for realtime sessions.
//!
//! A [`RealtimeConnector`] establishes a [`RealtimeLink`]; the session owns at
//! most one link at a time and releases it on disconnect or drop.

use async_trait::async_trait;
use bytes::Bytes;

use super::base::RealtimeResult;
use super::events::ClientEvent;

/// Messages surfaced by a link to its session
#[derive(Debug, Clone, PartialEq)]
pub enum LinkMessage {
    /// The event channel opened
    Open,
    /// A text payload from the event channel
    Text(String),
    /// Audio from the remote side
    Audio(Bytes),
    /// The event channel failed
    Error(String),
    /// The remote side closed the link
    Closed,
}

/// An established connection to the realtime endpoint.
#[async_trait]
pub trait RealtimeLink: Send {
    /// Send a pre-serialized JSON payload over the event channel
    async fn send_text(&mut self, text: String) -> RealtimeResult<()>;

    /// Receive the next message, or `None` once the link is gone
    async fn recv(&mut self) -> Option<LinkMessage>;

    /// Enable or disable the local microphone track
    fn set_microphone_enabled(&mut self, enabled: bool);

    /// Whether the link owns a microphone track and an event channel
    fn has_microphone(&self) -> bool;

    /// Tear down the link and stop local media
    async fn close(&mut self);

    /// Serialize and send a client event
    async fn send_event(&mut self, event: &ClientEvent) -> RealtimeResult<()> {
        let json = serde_json::to_string(event)?;
        self.send_text(json).await
    }
}

/// Factory for realtime links.
#[async_trait]
pub trait RealtimeConnector: Send + Sync {
    /// Whether this host can capture audio at all
    fn is_supported(&self) -> bool;

    /// Fetch credentials, perform signaling and return a ready link
    async fn connect(&self) -> RealtimeResult<Box<dyn RealtimeLink>>;
}
