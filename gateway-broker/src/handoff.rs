//! Hand-off of inbound broker messages from the network task to the caller.

use std::borrow::Cow;

use tokio::sync::mpsc;
use tracing::trace;

/// A publish received from the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// The payload as text, invalid UTF-8 sequences are replaced
    pub fn payload_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Receives every inbound publish of a session.
///
/// Handlers are called from the task driving the connection, so they
/// must not block.
pub trait MessageHandler: Send + 'static {
    fn handle(&self, message: InboundMessage);
}

impl<F> MessageHandler for F
where
    F: Fn(InboundMessage) + Send + 'static,
{
    fn handle(&self, message: InboundMessage) {
        self(message)
    }
}

/// Sending half of the hand-off channel
#[derive(Debug, Clone)]
pub struct Handoff(mpsc::UnboundedSender<InboundMessage>);

impl MessageHandler for Handoff {
    fn handle(&self, message: InboundMessage) {
        if let Err(mpsc::error::SendError(message)) = self.0.send(message) {
            trace!(topic = %message.topic, "inbox dropped, discarding message");
        }
    }
}

/// Receiving half of the hand-off channel
#[derive(Debug)]
pub struct Inbox(mpsc::UnboundedReceiver<InboundMessage>);

impl Inbox {
    /// Wait for the next message, returns `None` once every [Handoff] is
    /// gone and the queue is drained.
    pub async fn recv(&mut self) -> Option<InboundMessage> {
        self.0.recv().await
    }
}

/// Create a new hand-off channel.
///
/// The queue is unbounded so the connection task never waits on the
/// consumer.
pub fn channel() -> (Handoff, Inbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Handoff(tx), Inbox(rx))
}
