use clap::Parser;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;

use crate::broker::{BrokerAddress, QoS, SessionConfig, parse_qos};

/// SenML sample published when no message is given
pub const SAMPLE_PAYLOAD: &str = r#"[{"bn":"some-base-name:","bt":1.276020076001e+09, "bu":"A","bver":5, "n":"voltage","u":"V","v":120.1}, {"n":"current","t":-5,"v":1.2}, {"n":"current","t":-4,"v":1.3}]"#;

fn parse_duration(s: &str) -> Result<Duration, ParseIntError> {
    let millis: u64 = s.parse()?;
    Ok(Duration::from_millis(millis))
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)] // read from Cargo.toml
pub struct Cli {
    /// Configuration file with the provisioning server URL and the thing's
    /// external id and key
    #[arg(
        env = "GATEWAY_CONFIG",
        long = "config",
        value_name = "path",
        default_value = "config.toml"
    )]
    pub config: PathBuf,

    /// MQTT broker address
    #[arg(
        env = "GATEWAY_BROKER_ADDRESS",
        long = "broker",
        value_name = "host:port",
        default_value = "localhost:1883"
    )]
    pub broker: BrokerAddress,

    /// MQTT client identifier
    #[arg(
        env = "GATEWAY_CLIENT_ID",
        long = "client-id",
        value_name = "id",
        default_value = SessionConfig::DEFAULT_CLIENT_ID
    )]
    pub client_id: String,

    /// The topic name to/from which to publish/subscribe, defaults to the
    /// first provisioned channel, eg. "channels/<id>/messages"
    #[arg(long = "topic", value_name = "topic")]
    pub topic: Option<String>,

    /// The Quality of Service 0, 1 or 2
    #[arg(long = "qos", value_name = "level", default_value = "0", value_parser = parse_qos)]
    pub qos: QoS,

    /// The message text to publish
    #[arg(long = "message", value_name = "text", default_value = SAMPLE_PAYLOAD)]
    pub message: String,

    /// The number of messages to publish and then receive
    #[arg(long = "num", value_name = "int", default_value_t = 3)]
    pub num: usize,

    /// Provisioning request timeout in milliseconds
    #[arg(
        env = "GATEWAY_REQUEST_TIMEOUT_MS",
        long = "request-timeout-ms",
        value_name = "ms",
        value_parser = parse_duration,
        default_value = "10000"
    )]
    pub request_timeout: Duration,

    /// How long to wait for the published messages to come back, in
    /// milliseconds
    #[arg(
        long = "receive-timeout-ms",
        value_name = "ms",
        value_parser = parse_duration,
        default_value = "30000"
    )]
    pub receive_timeout: Duration,
}

pub fn parse() -> Cli {
    Parser::parse()
}
