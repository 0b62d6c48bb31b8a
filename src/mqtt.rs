//! MQTT feed client

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, Transport};

use crate::{
    config::MqttConfig,
    errors::RegistryError,
    feed::{VesselLocation, VesselMetadata},
    models::{AisMessage, AisMessageType, Mmsi},
};

/// Builds the connection to the AIS feed broker
pub struct MqttClientBuilder {
    client: AsyncClient,
    event_loop: EventLoop,
    tx: mpsc::Sender<AisMessage>,
    rx: mpsc::Receiver<AisMessage>,
}

/// Connected feed; yields decoded messages in arrival order
pub struct MqttClient {
    _client: AsyncClient,
    rx: mpsc::Receiver<AisMessage>,
    handle: tokio::task::JoinHandle<Result<(), RegistryError>>,
}

impl MqttClientBuilder {
    pub fn new(config: &MqttConfig) -> Result<Self, RegistryError> {
        let mut mqtt_options = MqttOptions::new(&config.client_id, &config.uri, config.port);

        mqtt_options.set_transport(Transport::wss_with_default_config());
        mqtt_options.set_keep_alive(Duration::from_secs(5));

        let (client, event_loop) = AsyncClient::new(mqtt_options, 100);
        let (tx, rx) = mpsc::channel(100);

        Ok(Self {
            client,
            event_loop,
            tx,
            rx,
        })
    }

    /// Start the event loop. Subscriptions are made on every (re)connect.
    pub fn connect(self, topics: &[String]) -> MqttClient {
        let handle = tokio::spawn(Self::process_events(
            self.tx,
            self.event_loop,
            self.client.clone(),
            topics.to_vec(),
        ));

        MqttClient {
            _client: self.client,
            rx: self.rx,
            handle,
        }
    }

    async fn subscribe(client: &AsyncClient, topics: &[String]) -> Result<(), RegistryError> {
        for topic in topics.iter() {
            info!("Subscribing to topic: {}", topic);
            client.subscribe(topic, QoS::AtLeastOnce).await?;
        }
        Ok(())
    }

    /// Process MQTT events
    ///
    /// `rumqttc` reconnects on its own after a lost connection, but topic
    /// subscriptions need to be re-established, so they are made here on
    /// every ConnAck. A failed subscription ends the loop.
    async fn process_events(
        tx: mpsc::Sender<AisMessage>,
        mut event_loop: EventLoop,
        client: AsyncClient,
        topics: Vec<String>,
    ) -> Result<(), RegistryError> {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("Connected to MQTT broker, subscribing to topics");
                    if let Err(e) = Self::subscribe(&client, &topics).await {
                        error!("Failed to subscribe: {}", e);
                        break Err(e);
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    match parse_message(&publish.topic, &publish.payload) {
                        Ok(message) => {
                            if tx.send(message).await.is_err() {
                                info!("Feed receiver dropped, stopping MQTT event loop");
                                break Ok(());
                            }
                        }
                        Err(e) => {
                            warn!("Failed to parse message on {}: {}", publish.topic, e);
                        }
                    }
                }
                Err(e) => {
                    error!("MQTT Error: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
                _ => continue,
            }
        }
    }
}

/// Parse a feed message based on its topic, `vessels-v2/<mmsi>/<kind>`
pub fn parse_message(topic: &str, payload: &[u8]) -> Result<AisMessage, RegistryError> {
    let parts: Vec<&str> = topic.split('/').collect();

    if parts.len() < 3 || parts[0] != "vessels-v2" {
        return Err(RegistryError::InvalidTopic(topic.to_string()));
    }

    let mmsi = Mmsi::try_from(parts[1])?;

    match parts[2] {
        "location" => {
            let location: VesselLocation = serde_json::from_slice(payload)?;
            Ok(AisMessage::new(
                mmsi,
                AisMessageType::PositionReport((&location).into()),
            ))
        }
        "metadata" => {
            let metadata: VesselMetadata = serde_json::from_slice(payload)?;
            Ok(AisMessage::new(
                mmsi,
                AisMessageType::StaticVoyage((&metadata).into()),
            ))
        }
        _ => Err(RegistryError::UnknownMessageType(parts[2].to_string())),
    }
}

impl MqttClient {
    /// Receive next message; `None` once the event loop has ended
    pub async fn recv(&mut self) -> Option<AisMessage> {
        self.rx.recv().await
    }

    /// Stop the event loop
    pub fn abort(&self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Position, PositionReport};

    #[test]
    fn parse_location_message() {
        let topic = "vessels-v2/230145000/location";
        let payload = r#"{
            "time":1668075025,
            "sog":10.7,
            "cog":326.6,
            "navStat":0,
            "rot":0,
            "posAcc":true,
            "raim":false,
            "heading":325,
            "lon":20.345818,
            "lat":60.03802
        }"#
        .as_bytes();

        let message = parse_message(topic, payload).unwrap();

        let expected = AisMessage {
            mmsi: Mmsi::try_from(230145000).unwrap(),
            message_type: AisMessageType::PositionReport(PositionReport {
                position: Position::new(60.03802, 20.345818),
                sog: Some(10.7),
                cog: Some(326.6),
                heading: Some(325),
                rot: Some(0i8),
                nav_status: Some(0),
                pos_acc: true,
                raim: false,
            }),
        };

        assert_eq!(message, expected);
    }

    #[test]
    fn parse_metadata_message() {
        let topic = "vessels-v2/123456/metadata";
        let payload = r#"{
            "timestamp":1668075026035,
            "destination":"UST LUGA",
            "name":"ARUNA CIHAN",
            "draught":68,
            "eta":733376,
            "posType":15,
            "refA":160,
            "refB":33,
            "refC":20,
            "refD":12,
            "callSign":"V7WW7",
            "imo":9543756,
            "type":70
        }"#
        .as_bytes();

        let message = parse_message(topic, payload).unwrap();
        assert_eq!(message.mmsi, Mmsi::try_from(123456).unwrap());
        match message.message_type {
            AisMessageType::StaticVoyage(report) => {
                assert_eq!(report.name.as_deref(), Some("ARUNA CIHAN"));
                assert_eq!(report.call_sign.as_deref(), Some("V7WW7"));
                assert_eq!(report.ship_type, Some(70));
                assert_eq!(report.draught, Some(6.8));
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_topics() {
        assert!(matches!(
            parse_message("vessels-v1/123456/location", b"{}"),
            Err(RegistryError::InvalidTopic(_))
        ));
        assert!(matches!(
            parse_message("vessels-v2/123456/status", b"{}"),
            Err(RegistryError::UnknownMessageType(_))
        ));
        assert!(matches!(
            parse_message("vessels-v2/abc/location", b"{}"),
            Err(RegistryError::InvalidMmsi(_))
        ));
    }
}
