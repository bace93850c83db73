use std::fmt::Display;
use std::time::Duration;

use rumqttc::QoS;
use thiserror::Error;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, instrument};

use crate::handoff::{InboundMessage, Inbox};
use crate::session::{Session, SessionError};

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("Subscribe failed: {0}")]
    Subscribe(#[source] SessionError),

    #[error("Publish #{index} failed: {source}")]
    Publish {
        index: usize,
        #[source]
        source: SessionError,
    },

    #[error("Received {received} of {expected} messages before timing out")]
    EchoTimeout { received: usize, expected: usize },

    #[error("Message hand-off closed after {received} of {expected} messages")]
    InboxClosed { received: usize, expected: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Init,
    Subscribed,
    Publishing,
    AwaitingEcho,
    Disconnected,
    Failed,
}

impl Display for ExchangeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExchangeState::Init => "init",
            ExchangeState::Subscribed => "subscribed",
            ExchangeState::Publishing => "publishing",
            ExchangeState::AwaitingEcho => "awaiting_echo",
            ExchangeState::Disconnected => "disconnected",
            ExchangeState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct ExchangeParams {
    pub topic: String,
    pub qos: QoS,
    pub payload: String,

    /// Number of messages to publish and then wait for
    pub count: usize,

    /// Upper bound on the wait for all echoed messages
    pub receive_timeout: Duration,

    pub disconnect_grace: Duration,
}

impl ExchangeParams {
    pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_DISCONNECT_GRACE: Duration = Duration::from_millis(250);

    pub fn new(topic: String, qos: QoS, payload: String, count: usize) -> Self {
        Self {
            topic,
            qos,
            payload,
            count,
            receive_timeout: Self::DEFAULT_RECEIVE_TIMEOUT,
            disconnect_grace: Self::DEFAULT_DISCONNECT_GRACE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExchangeReport {
    pub published: usize,
    pub received: Vec<InboundMessage>,
}

/// Subscribe to a topic, publish a payload a number of times and wait for
/// as many messages to come back before disconnecting.
pub struct Exchange<'a, S> {
    session: &'a mut S,
    inbox: &'a mut Inbox,
    state: ExchangeState,
}

impl<'a, S> Exchange<'a, S>
where
    S: Session,
{
    pub fn new(session: &'a mut S, inbox: &'a mut Inbox) -> Self {
        Self {
            session,
            inbox,
            state: ExchangeState::Init,
        }
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    fn transition(&mut self, next: ExchangeState) {
        debug!("{} -> {}", self.state, next);
        self.state = next;
    }

    /// Run the exchange to completion.
    ///
    /// A failed subscribe or publish leaves the session connected, it is
    /// up to the caller to give up on it. Running out of time while waiting
    /// for echoes still disconnects gracefully.
    #[instrument(name = "exchange", skip_all, fields(topic = %params.topic, qos = ?params.qos, count = params.count), err)]
    pub async fn run(&mut self, params: &ExchangeParams) -> Result<ExchangeReport, ExchangeError> {
        if let Err(err) = self.session.subscribe(&params.topic, params.qos).await {
            self.transition(ExchangeState::Failed);
            return Err(ExchangeError::Subscribe(err));
        }
        self.transition(ExchangeState::Subscribed);

        self.transition(ExchangeState::Publishing);
        for index in 0..params.count {
            debug!("publishing message #{index}");
            // each publish is acknowledged before the next goes out
            if let Err(source) = self
                .session
                .publish(&params.topic, params.qos, params.payload.as_bytes())
                .await
            {
                self.transition(ExchangeState::Failed);
                return Err(ExchangeError::Publish { index, source });
            }
        }

        self.transition(ExchangeState::AwaitingEcho);
        let deadline = Instant::now() + params.receive_timeout;
        let mut received = Vec::with_capacity(params.count);
        while received.len() < params.count {
            match timeout_at(deadline, self.inbox.recv()).await {
                Ok(Some(message)) => {
                    info!(topic = %message.topic, payload = %message.payload_str(), "received message");
                    received.push(message);
                }
                Ok(None) => {
                    self.transition(ExchangeState::Failed);
                    return Err(ExchangeError::InboxClosed {
                        received: received.len(),
                        expected: params.count,
                    });
                }
                Err(_) => {
                    self.session.disconnect(params.disconnect_grace).await;
                    self.transition(ExchangeState::Disconnected);
                    return Err(ExchangeError::EchoTimeout {
                        received: received.len(),
                        expected: params.count,
                    });
                }
            }
        }

        self.session.disconnect(params.disconnect_grace).await;
        self.transition(ExchangeState::Disconnected);

        Ok(ExchangeReport {
            published: params.count,
            received,
        })
    }
}
