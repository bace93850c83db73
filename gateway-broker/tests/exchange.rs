//! Runs a real `BrokerSession` against a minimal in-process MQTT 3.1.1
//! broker that echoes every publish back to the publisher.

use std::time::Duration;

use gateway_broker::{
    BrokerAddress, BrokerSession, Exchange, ExchangeError, ExchangeParams, ExchangeState, QoS,
    SessionConfig, SessionError, handoff,
};
use pretty_assertions::assert_eq;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Seen {
    Connect { username: String, password: String },
    Subscribe(String),
    Publish(String, u8),
    /// Packet type the client used to acknowledge an echo
    EchoAck(u8),
}

#[derive(Debug, Clone, Copy, Default)]
struct Behavior {
    reject_subscribe: bool,
    /// Echo at the QoS of the original publish instead of QoS 0
    echo_at_publish_qos: bool,
}

async fn read_packet(stream: &mut TcpStream) -> Option<(u8, Vec<u8>)> {
    let header = stream.read_u8().await.ok()?;

    let mut len = 0usize;
    let mut shift = 0;
    loop {
        let byte = stream.read_u8().await.ok()?;
        len |= ((byte & 0x7f) as usize) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }

    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await.ok()?;
    Some((header, body))
}

fn encode_len(mut len: usize, out: &mut Vec<u8>) {
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if len == 0 {
            break;
        }
    }
}

fn read_str(body: &[u8], at: usize) -> (String, usize) {
    let len = u16::from_be_bytes([body[at], body[at + 1]]) as usize;
    let s = String::from_utf8(body[at + 2..at + 2 + len].to_vec()).unwrap();
    (s, at + 2 + len)
}

/// Serve a single client, reporting what it sends on `seen`
async fn serve(mut stream: TcpStream, seen: mpsc::UnboundedSender<Seen>, behavior: Behavior) {
    let mut echo_id: u16 = 100;
    while let Some((header, body)) = read_packet(&mut stream).await {
        match header >> 4 {
            // CONNECT: fixed 10 byte variable header, then client id,
            // username and password
            1 => {
                let (_client_id, at) = read_str(&body, 10);
                let (username, at) = read_str(&body, at);
                let (password, _) = read_str(&body, at);
                seen.send(Seen::Connect { username, password }).unwrap();
                stream.write_all(&[0x20, 0x02, 0x00, 0x00]).await.unwrap();
            }
            // SUBSCRIBE
            8 => {
                let (topic, at) = read_str(&body, 2);
                let granted = if behavior.reject_subscribe { 0x80 } else { body[at] };
                seen.send(Seen::Subscribe(topic)).unwrap();
                stream
                    .write_all(&[0x90, 0x03, body[0], body[1], granted])
                    .await
                    .unwrap();
            }
            // PUBLISH
            3 => {
                let qos = (header >> 1) & 0x03;
                let (topic, mut at) = read_str(&body, 0);
                if qos > 0 {
                    let ack = if qos == 1 { 0x40 } else { 0x50 };
                    stream
                        .write_all(&[ack, 0x02, body[at], body[at + 1]])
                        .await
                        .unwrap();
                    at += 2;
                }
                let payload = &body[at..];
                seen.send(Seen::Publish(topic.clone(), qos)).unwrap();

                let echo_qos = if behavior.echo_at_publish_qos { qos } else { 0 };
                let id_len = if echo_qos > 0 { 2 } else { 0 };

                let mut echo = vec![0x30 | (echo_qos << 1)];
                encode_len(2 + topic.len() + id_len + payload.len(), &mut echo);
                echo.extend_from_slice(&(topic.len() as u16).to_be_bytes());
                echo.extend_from_slice(topic.as_bytes());
                if echo_qos > 0 {
                    echo_id += 1;
                    echo.extend_from_slice(&echo_id.to_be_bytes());
                }
                echo.extend_from_slice(payload);
                stream.write_all(&echo).await.unwrap();
            }
            // PUBACK and PUBCOMP for an echo
            4 | 7 => seen.send(Seen::EchoAck(header >> 4)).unwrap(),
            // PUBREC for an echo, release it
            5 => {
                seen.send(Seen::EchoAck(5)).unwrap();
                stream
                    .write_all(&[0x62, 0x02, body[0], body[1]])
                    .await
                    .unwrap();
            }
            // PUBREL
            6 => {
                stream
                    .write_all(&[0x70, 0x02, body[0], body[1]])
                    .await
                    .unwrap();
            }
            // PINGREQ
            12 => stream.write_all(&[0xd0, 0x00]).await.unwrap(),
            // DISCONNECT
            14 => break,
            _ => {}
        }
    }
}

async fn start_broker(behavior: Behavior) -> (u16, mpsc::UnboundedReceiver<Seen>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::unbounded_channel();

    let broker = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        serve(stream, tx, behavior).await;
    });

    (port, rx, broker)
}

fn session_config(port: u16) -> SessionConfig {
    let mut config = SessionConfig::new(
        BrokerAddress::new("127.0.0.1", port),
        "thing-1".into(),
        "thing-key".into(),
    );
    config.connect_timeout = Duration::from_secs(5);
    config
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Seen>) -> Vec<Seen> {
    let mut seen = Vec::new();
    while let Ok(item) = rx.try_recv() {
        seen.push(item);
    }
    seen
}

async fn run_exchange(qos: QoS, level: u8, behavior: Behavior) -> Vec<Seen> {
    let (port, mut seen, broker) = start_broker(behavior).await;
    let (handoff, mut inbox) = handoff::channel();

    let mut session = BrokerSession::connect(&session_config(port), handoff)
        .await
        .unwrap();

    let topic = gateway_broker::channel_topic("chan-1");
    let mut params = ExchangeParams::new(topic.clone(), qos, "[{\"n\":\"voltage\"}]".to_string(), 3);
    params.receive_timeout = Duration::from_secs(5);

    let mut exchange = Exchange::new(&mut session, &mut inbox);
    let report = exchange.run(&params).await.unwrap();
    assert_eq!(exchange.state(), ExchangeState::Disconnected);

    assert_eq!(report.published, 3);
    assert_eq!(report.received.len(), 3);
    for message in &report.received {
        assert_eq!(message.topic, topic);
        assert_eq!(message.payload_str(), "[{\"n\":\"voltage\"}]");
    }

    // the broker stops once it reads the DISCONNECT
    tokio::time::timeout(Duration::from_secs(5), broker)
        .await
        .unwrap()
        .unwrap();

    let (echo_acks, seen): (Vec<_>, Vec<_>) = drain(&mut seen)
        .into_iter()
        .partition(|s| matches!(s, Seen::EchoAck(_)));

    assert_eq!(
        seen,
        vec![
            Seen::Connect {
                username: "thing-1".to_string(),
                password: "thing-key".to_string()
            },
            Seen::Subscribe(topic.clone()),
            Seen::Publish(topic.clone(), level),
            Seen::Publish(topic.clone(), level),
            Seen::Publish(topic.clone(), level),
        ]
    );

    echo_acks
}

fn count_acks(acks: &[Seen], kind: u8) -> usize {
    acks.iter().filter(|s| **s == Seen::EchoAck(kind)).count()
}

#[tokio::test]
async fn test_exchange_at_most_once() {
    let acks = run_exchange(QoS::AtMostOnce, 0, Behavior::default()).await;
    assert!(acks.is_empty());
}

#[tokio::test]
async fn test_exchange_at_least_once() {
    run_exchange(QoS::AtLeastOnce, 1, Behavior::default()).await;
}

#[tokio::test]
async fn test_exchange_exactly_once() {
    run_exchange(QoS::ExactlyOnce, 2, Behavior::default()).await;
}

#[tokio::test]
async fn test_echoes_at_least_once_are_acknowledged() {
    let behavior = Behavior {
        echo_at_publish_qos: true,
        ..Default::default()
    };
    let acks = run_exchange(QoS::AtLeastOnce, 1, behavior).await;

    // one PUBACK per echo
    assert_eq!(count_acks(&acks, 4), 3);
    assert_eq!(acks.len(), 3);
}

#[tokio::test]
async fn test_echoes_exactly_once_complete_the_handshake() {
    let behavior = Behavior {
        echo_at_publish_qos: true,
        ..Default::default()
    };
    let acks = run_exchange(QoS::ExactlyOnce, 2, behavior).await;

    // PUBREC, then PUBCOMP once the broker released the echo. The release
    // of the last echo can cross the DISCONNECT.
    assert_eq!(count_acks(&acks, 5), 3);
    assert!((2..=3).contains(&count_acks(&acks, 7)));
}

#[tokio::test]
async fn test_rejected_subscription_fails_exchange() {
    let (port, mut seen, _broker) = start_broker(Behavior {
        reject_subscribe: true,
        ..Default::default()
    })
    .await;
    let (handoff, mut inbox) = handoff::channel();

    let mut session = BrokerSession::connect(&session_config(port), handoff)
        .await
        .unwrap();

    let params = ExchangeParams::new(
        "channels/forbidden/messages".to_string(),
        QoS::AtMostOnce,
        "x".to_string(),
        3,
    );
    let mut exchange = Exchange::new(&mut session, &mut inbox);
    let err = exchange.run(&params).await.unwrap_err();
    assert_eq!(exchange.state(), ExchangeState::Failed);

    assert!(matches!(
        err,
        ExchangeError::Subscribe(SessionError::SubscribeRejected(_))
    ));

    // nothing was published
    let published = drain(&mut seen)
        .into_iter()
        .filter(|s| matches!(s, Seen::Publish(..)))
        .count();
    assert_eq!(published, 0);
}
