use anyhow::{Context, Result};
use tracing::{debug, info, instrument};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

mod cli;
mod config;

use gateway_broker as broker;
use gateway_remote as remote;
use gateway_util as util;

use crate::broker::{BrokerSession, Exchange, ExchangeParams, SessionConfig, channel_topic, handoff};
use crate::cli::Cli;
use crate::remote::{DeviceIdentity, ProvisioningConfig};

fn initialize_tracing() -> Result<()> {
    // Use some log defaults. These can be overriden using RUST_LOG
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or(
                EnvFilter::default()
                    .add_directive("debug".parse()?)
                    .add_directive("hyper=error".parse()?)
                    .add_directive("reqwest=info".parse()?)
                    .add_directive("rumqttc=warn".parse()?),
            ),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE)
                .event_format(fmt::format().compact().with_target(false).without_time()),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    initialize_tracing()?;

    let cli = cli::parse();
    debug!("{:#?}", cli);

    let provisioning = config::load(&cli.config)?.with_timeout(cli.request_timeout);
    info!("Configuration loaded successfully");

    start_gateway(&cli, provisioning).await
}

/// Resolve the device identity, connect to the broker with it and run the
/// test exchange.
#[instrument(name = "gateway", skip_all, err)]
async fn start_gateway(cli: &Cli, provisioning: ProvisioningConfig) -> Result<()> {
    let identity = remote::resolve(&provisioning)
        .await
        .context("failed to resolve device identity")?;
    info!(
        device_id = %identity.device_id,
        channels = identity.channels.len(),
        "device identity resolved"
    );
    debug!("{:#?}", identity);

    let topic = select_topic(cli.topic.clone(), &identity)?;

    let mut session_config = SessionConfig::new(
        cli.broker.clone(),
        identity.device_id.clone(),
        identity.device_key.clone(),
    );
    session_config.client_id = cli.client_id.clone();

    let (handoff, mut inbox) = handoff::channel();
    let mut session = BrokerSession::connect(&session_config, handoff)
        .await
        .context("failed to connect to MQTT broker")?;

    let mut params = ExchangeParams::new(topic, cli.qos, cli.message.clone(), cli.num);
    params.receive_timeout = cli.receive_timeout;

    let report = Exchange::new(&mut session, &mut inbox).run(&params).await?;
    info!(
        published = report.published,
        received = report.received.len(),
        "exchange complete"
    );

    Ok(())
}

/// Use the requested topic, or the topic of the first provisioned channel
fn select_topic(requested: Option<String>, identity: &DeviceIdentity) -> Result<String> {
    if let Some(topic) = requested {
        return Ok(topic);
    }

    identity
        .first_channel()
        .map(|channel| channel_topic(&channel.id))
        .context("provisioning returned no channels and no topic was given")
}
