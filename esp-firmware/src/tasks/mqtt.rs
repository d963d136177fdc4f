// MQTT Task - Published Telemetrie an MQTT Broker
use core::fmt::Write;

use defmt::{Debug2Format, error, info, warn};
use embassy_net::{IpAddress, Stack, dns::DnsQueryType, tcp::TcpSocket};
use embassy_time::{Duration, Timer, with_timeout};
use heapless::String;

use rust_mqtt::client::client::MqttClient;
use rust_mqtt::client::client_config::{ClientConfig, MqttVersion};
use rust_mqtt::packet::v5::publish_packet::QualityOfService;
use rust_mqtt::utils::rng_generator::CountingRng;
use rust_mqtt::utils::types::EncodedString;

use super::wifi::wait_for_network;
use crate::config::*;
use crate::{Telemetry, TelemetrySubscriber};
use esp_core::wire::encode_telemetry;

/// Topic-Länge: Prefix + "/" + Kind
type Topic = String<64>;

/// MQTT Task - läuft parallel zu anderen Tasks
///
/// Dieser Task übernimmt das MQTT-Publishing:
/// - Wartet auf Netzwerk-Verbindung
/// - Verbindet sich mit MQTT Broker
/// - Empfängt Telemetrie via PubSub Channel
/// - Published jede Nachricht als JSON auf `<prefix>/<kind>`
/// - Automatisches Reconnect bei Fehlern
///
/// # Parameter
/// - `stack`: embassy-net Stack für Netzwerk-Zugriff
/// - `subscriber`: PubSub Subscriber für Telemetrie-Broadcasts
#[embassy_executor::task]
pub async fn mqtt_task(stack: &'static Stack<'static>, mut subscriber: TelemetrySubscriber) {
    info!("MQTT: Task started, waiting for network...");
    wait_for_network(stack).await;
    info!("MQTT: Network ready");

    loop {
        match mqtt_connect_and_publish(stack, &mut subscriber).await {
            Ok(_) => warn!("MQTT: Connection closed normally"),
            Err(e) => error!("MQTT: Error: {}", Debug2Format(&e)),
        }
        info!("MQTT: Reconnecting in {}s...", MQTT_RECONNECT_DELAY_SECS);
        Timer::after(Duration::from_secs(MQTT_RECONNECT_DELAY_SECS)).await;
    }
}

/// Verbindet mit MQTT Broker und published Telemetrie
///
/// Diese Funktion übernimmt den kompletten MQTT-Lifecycle:
/// 1. DNS-Auflösung des Broker-Hostnames
/// 2. TCP-Verbindung aufbauen
/// 3. MQTT CONNECT senden
/// 4. Telemetrie empfangen und sofort publishen
///
/// Bei jedem Fehler wird die Funktion beendet und der Haupt-Loop
/// startet automatisch einen Reconnect-Versuch.
async fn mqtt_connect_and_publish(
    stack: &'static Stack<'static>,
    subscriber: &mut TelemetrySubscriber,
) -> Result<(), MqttError> {
    // DNS Lookup
    info!("MQTT: Resolving '{}'...", MQTT_BROKER);
    let broker_ip = resolve_hostname(stack, MQTT_BROKER).await?;
    info!("MQTT: Resolved to {}", Debug2Format(&broker_ip));

    // TCP Connect
    let mut rx_buffer = [0u8; 4096];
    let mut tx_buffer = [0u8; 4096];
    let mut socket = TcpSocket::new(*stack, &mut rx_buffer, &mut tx_buffer);
    socket.set_timeout(Some(Duration::from_secs(10)));

    socket
        .connect((broker_ip, MQTT_PORT))
        .await
        .map_err(|_| MqttError::ConnectionFailed)?;
    info!("MQTT: TCP connected");

    // MQTT Client Configuration
    let rng = CountingRng(20000);
    let mut config = ClientConfig::<5, _>::new(MqttVersion::MQTTv5, rng);
    config.client_id = EncodedString {
        string: MQTT_CLIENT_ID,
        len: MQTT_CLIENT_ID.len() as u16,
    };
    config.keep_alive = 30;
    config.max_packet_size = MQTT_BUFFER_SIZE as u32;

    // MQTT Buffer
    let mut send_buffer = [0u8; MQTT_BUFFER_SIZE];
    let mut recv_buffer = [0u8; MQTT_BUFFER_SIZE];

    // MQTT Client erstellen
    let mut client = MqttClient::<_, 5, _>::new(
        socket,
        &mut send_buffer,
        MQTT_BUFFER_SIZE,
        &mut recv_buffer,
        MQTT_BUFFER_SIZE,
        config,
    );

    // MQTT CONNECT
    client
        .connect_to_broker()
        .await
        .map_err(|_| MqttError::ProtocolError)?;
    info!("MQTT: Connected to broker");

    // Publish Loop - Event-basiert
    let mut payload = [0u8; TELEMETRY_JSON_SIZE];
    loop {
        let telemetry = subscriber.next_message_pure().await;

        let topic = topic_for(&telemetry)?;
        let len = match encode_telemetry(&telemetry, &mut payload) {
            Ok(len) => len,
            Err(e) => {
                warn!("MQTT: Failed to encode {} telemetry: {}", telemetry.kind(), e);
                continue;
            }
        };

        client
            .send_message(&topic, &payload[..len], QualityOfService::QoS0, false)
            .await
            .map_err(|_| MqttError::PublishFailed)?;
        info!("MQTT: Published {} bytes to '{}'", len, topic.as_str());
    }
}

/// Topic `<prefix>/<kind>` für eine Telemetrie-Nachricht
fn topic_for(telemetry: &Telemetry) -> Result<Topic, MqttError> {
    let mut topic = Topic::new();
    write!(topic, "{}/{}", MQTT_TOPIC_PREFIX, telemetry.kind())
        .map_err(|_| MqttError::TopicTooLong)?;
    Ok(topic)
}

/// Löst Hostname zu IPv4-Adresse auf
///
/// Nutzt embassy-net DNS-Stack mit konfigurierbarem Timeout.
async fn resolve_hostname(
    stack: &'static Stack<'static>,
    hostname: &str,
) -> Result<embassy_net::Ipv4Address, MqttError> {
    let result = with_timeout(
        Duration::from_secs(DNS_TIMEOUT_SECS),
        stack.dns_query(hostname, DnsQueryType::A),
    )
    .await;

    match result {
        Ok(Ok(addrs)) => {
            for addr in addrs {
                if let IpAddress::Ipv4(ipv4) = addr {
                    return Ok(ipv4);
                }
            }
            Err(MqttError::DnsResolutionFailed)
        }
        Ok(Err(_)) => Err(MqttError::DnsResolutionFailed),
        Err(_) => Err(MqttError::DnsTimeout),
    }
}

/// MQTT Fehler-Typen
///
/// Alle möglichen Fehler die während MQTT-Operationen auftreten können.
#[derive(Debug)]
enum MqttError {
    DnsResolutionFailed,
    DnsTimeout,
    ConnectionFailed,
    ProtocolError,
    PublishFailed,
    TopicTooLong,
}

impl defmt::Format for MqttError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            MqttError::DnsResolutionFailed => defmt::write!(fmt, "DNS failed"),
            MqttError::DnsTimeout => defmt::write!(fmt, "DNS timeout"),
            MqttError::ConnectionFailed => defmt::write!(fmt, "Connection failed"),
            MqttError::ProtocolError => defmt::write!(fmt, "Protocol error"),
            MqttError::PublishFailed => defmt::write!(fmt, "Publish failed"),
            MqttError::TopicTooLong => defmt::write!(fmt, "Topic too long"),
        }
    }
}
