use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ClientError, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions,
    Outgoing, Packet, QoS, SubscribeReasonCode,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, instrument, trace, warn};

use crate::address::BrokerAddress;
use crate::handoff::{InboundMessage, MessageHandler};
use crate::util::types::{DeviceId, DeviceKey};

// capacity of the request queue between the client and the event loop
const REQUEST_CAPACITY: usize = 10;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Broker connection failed: {0}")]
    Connect(#[from] ConnectionError),

    #[error("Broker refused connection: {0:?}")]
    Refused(ConnectReturnCode),

    #[error("Broker did not acknowledge connection within {0:?}")]
    ConnectTimeout(Duration),

    #[error("Broker request failed: {0}")]
    Client(#[from] ClientError),

    #[error("Broker rejected subscription to '{0}'")]
    SubscribeRejected(String),

    #[error("Broker connection closed")]
    Closed,
}

/// Broker connection parameters
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub address: BrokerAddress,
    pub client_id: String,
    pub username: DeviceId,
    pub password: DeviceKey,
    pub keep_alive: Duration,
    pub connect_timeout: Duration,
}

impl SessionConfig {
    pub const DEFAULT_CLIENT_ID: &'static str = "gateway";

    pub fn new(address: BrokerAddress, username: DeviceId, password: DeviceKey) -> Self {
        Self {
            address,
            client_id: Self::DEFAULT_CLIENT_ID.to_owned(),
            username,
            password,
            keep_alive: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }

    fn to_mqtt_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(
            &self.client_id,
            self.address.authority_host(),
            self.address.port(),
        );
        options
            .set_credentials(self.username.as_str(), self.password.as_str())
            .set_clean_session(true)
            .set_keep_alive(self.keep_alive);
        options
    }
}

/// The operations the exchange needs from a broker connection
#[async_trait]
pub trait Session {
    /// Subscribe to `topic` and wait for the broker to grant it
    async fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), SessionError>;

    /// Publish `payload` and wait until the publish is acknowledged at the
    /// requested QoS level
    async fn publish(&mut self, topic: &str, qos: QoS, payload: &[u8]) -> Result<(), SessionError>;

    /// Disconnect, giving in-flight acknowledgments up to `grace` to complete
    async fn disconnect(&mut self, grace: Duration);
}

/// Acknowledgments forwarded from the event loop task
#[derive(Debug)]
enum Ack {
    Subscribed(Vec<SubscribeReasonCode>),
    Sent,
    PubAck,
    PubComp,
}

/// A single MQTT connection to the broker
pub struct BrokerSession {
    client: AsyncClient,
    acks: mpsc::UnboundedReceiver<Ack>,
    driver: JoinHandle<()>,
}

impl BrokerSession {
    /// Connect to the broker.
    ///
    /// Returns once the broker has accepted the connection. From then on
    /// every inbound publish is passed to `handler`. There is no reconnect,
    /// once the connection drops every pending and future operation fails
    /// with [SessionError::Closed].
    #[instrument(name = "connect", skip_all, fields(broker = %config.address, client_id = %config.client_id), err)]
    pub async fn connect<H>(config: &SessionConfig, handler: H) -> Result<Self, SessionError>
    where
        H: MessageHandler,
    {
        let (client, mut eventloop) = AsyncClient::new(config.to_mqtt_options(), REQUEST_CAPACITY);

        // the connection is only attempted once the event loop gets polled
        timeout(config.connect_timeout, wait_for_connack(&mut eventloop))
            .await
            .map_err(|_| SessionError::ConnectTimeout(config.connect_timeout))??;
        debug!("connected");

        let (ack_tx, acks) = mpsc::unbounded_channel();
        let driver = tokio::spawn(drive(eventloop, handler, ack_tx));

        Ok(Self {
            client,
            acks,
            driver,
        })
    }

    async fn wait_for<T>(&mut self, mut accept: impl FnMut(Ack) -> Option<T>) -> Result<T, SessionError> {
        while let Some(ack) = self.acks.recv().await {
            if let Some(value) = accept(ack) {
                return Ok(value);
            }
        }
        Err(SessionError::Closed)
    }
}

#[async_trait]
impl Session for BrokerSession {
    #[instrument(skip(self), err)]
    async fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), SessionError> {
        self.client.subscribe(topic, qos).await?;

        let codes = self
            .wait_for(|ack| match ack {
                Ack::Subscribed(codes) => Some(codes),
                _ => None,
            })
            .await?;

        if codes
            .iter()
            .any(|code| matches!(code, SubscribeReasonCode::Failure))
        {
            return Err(SessionError::SubscribeRejected(topic.to_owned()));
        }

        debug!(granted = ?codes, "subscribed");
        Ok(())
    }

    #[instrument(skip(self, payload), fields(len = payload.len()), err)]
    async fn publish(&mut self, topic: &str, qos: QoS, payload: &[u8]) -> Result<(), SessionError> {
        self.client
            .publish(topic, qos, false, payload.to_vec())
            .await?;

        // QoS 0 has no acknowledgment, the publish is done once written out
        self.wait_for(|ack| match (qos, ack) {
            (QoS::AtMostOnce, Ack::Sent) => Some(()),
            (QoS::AtLeastOnce, Ack::PubAck) => Some(()),
            (QoS::ExactlyOnce, Ack::PubComp) => Some(()),
            _ => None,
        })
        .await
    }

    #[instrument(skip(self))]
    async fn disconnect(&mut self, grace: Duration) {
        if let Err(err) = self.client.disconnect().await {
            debug!("disconnect request failed: {err}");
        }

        if timeout(grace, &mut self.driver).await.is_err() {
            debug!("connection still busy after {grace:?}, closing");
            self.driver.abort();
        }
    }
}

impl Drop for BrokerSession {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<(), SessionError> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
            Ok(event) => trace!(?event, "waiting for connack"),
            // the event loop reports a non-success CONNACK as an error
            Err(ConnectionError::ConnectionRefused(code)) => {
                return Err(SessionError::Refused(code));
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Poll the connection until it closes, feeding inbound publishes to the
/// handler and acknowledgments back to the session.
async fn drive<H>(mut eventloop: EventLoop, handler: H, acks: mpsc::UnboundedSender<Ack>)
where
    H: MessageHandler,
{
    let mut disconnecting = false;
    loop {
        let ack = match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                trace!(topic = %publish.topic, "inbound publish");
                handler.handle(InboundMessage::new(publish.topic, publish.payload.to_vec()));
                continue;
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => Ack::Subscribed(suback.return_codes),
            Ok(Event::Incoming(Packet::PubAck(_))) => Ack::PubAck,
            Ok(Event::Incoming(Packet::PubComp(_))) => Ack::PubComp,
            Ok(Event::Outgoing(Outgoing::Publish(_))) => Ack::Sent,
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                disconnecting = true;
                continue;
            }
            Ok(event) => {
                trace!(?event, "ignoring event");
                continue;
            }
            Err(err) if disconnecting => {
                debug!("connection closed: {err}");
                break;
            }
            Err(err) => {
                warn!("broker connection lost: {err}");
                break;
            }
        };

        // the session may be gone already
        let _ = acks.send(ack);
    }
}
