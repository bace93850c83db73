/*
Everything that talks to the message broker.

A `BrokerSession` holds one MQTT connection authenticated with the device
identity. Inbound publishes are handed to the `MessageHandler` given at
connect time, usually the `Handoff` half of a `handoff::channel()`. The
`Exchange` drives the subscribe, publish and echo sequence over any
`Session`.
*/

mod address;
mod exchange;
pub mod handoff;
mod qos;
mod session;
mod topic;

pub use address::{BrokerAddress, InvalidAddressError};
pub use exchange::{Exchange, ExchangeError, ExchangeParams, ExchangeReport, ExchangeState};
pub use handoff::{Handoff, InboundMessage, Inbox, MessageHandler};
pub use qos::{InvalidQosError, parse_qos};
pub use rumqttc::QoS;
pub use session::{BrokerSession, Session, SessionConfig, SessionError};
pub use topic::channel_topic;

use gateway_util as util;
