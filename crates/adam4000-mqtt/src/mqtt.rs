//! MQTT sink
//!
//! Uses the blocking rumqttc client. The connection's event loop runs on its own
//! thread and reconnects on its own; publishing never waits for the broker.
//! [`MqttSink::disconnect`] joins that thread, so queued publications are on the
//! wire before it returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use adam4000_core::config::Config;
use adam4000_core::publish::{MeasurementSink, PublishValue, SinkError, Topic};
use anyhow::{Context, Result};
use rumqttc::{Client, Connection, Event, LastWill, MqttOptions, Outgoing, Packet, QoS};
use tracing::{debug, info, warn};

/// Requests buffered while the broker is unreachable
const REQUEST_CAPACITY: usize = 64;

/// Pause between reconnect attempts
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Broker connection options, including the last will
pub fn options(config: &Config) -> MqttOptions {
    let mqtt = &config.mqtt;
    let mut options = MqttOptions::new(mqtt.client_id.clone(), mqtt.address.clone(), mqtt.port);
    options.set_keep_alive(Duration::from_secs(mqtt.keep_alive_secs.max(5)));
    options.set_last_will(LastWill::new(
        config.will_topic(),
        mqtt.will_message.clone(),
        QoS::AtMostOnce,
        false,
    ));
    options
}

/// Publishes measurements with QoS 0 and no retain flag
pub struct MqttSink {
    client: Client,
    invalid_payload: String,
    closing: Arc<AtomicBool>,
    connection: JoinHandle<()>,
}

impl MqttSink {
    /// Start the client and its connection thread
    pub fn connect(config: &Config) -> Result<Self> {
        let options = options(config);
        let (host, port) = options.broker_address();
        info!(host = %host, port, client_id = %config.mqtt.client_id, "connecting to MQTT broker");

        let (client, connection) = Client::new(options, REQUEST_CAPACITY);
        let closing = Arc::new(AtomicBool::new(false));
        let connection = {
            let closing = Arc::clone(&closing);
            thread::Builder::new()
                .name("mqtt-connection".to_string())
                .spawn(move || drive_connection(connection, &closing))
                .context("could not start MQTT connection thread")?
        };

        Ok(Self {
            client,
            invalid_payload: config.mqtt.invalid_payload.clone(),
            closing,
            connection,
        })
    }

    /// Send everything still queued, then a DISCONNECT, and wait for the
    /// connection thread to finish
    ///
    /// If the broker is unreachable the thread gives up at its next connection
    /// error and queued publications are lost.
    pub fn disconnect(self) {
        let Self {
            mut client,
            closing,
            connection,
            ..
        } = self;

        closing.store(true, Ordering::SeqCst);
        if let Err(e) = client.try_disconnect() {
            debug!("MQTT disconnect: {}", e);
        }
        // With the last client handle gone the event loop ends once the queue is drained
        drop(client);

        if connection.join().is_err() {
            warn!("MQTT connection thread panicked");
        }
        info!("disconnected from MQTT broker");
    }
}

impl MeasurementSink for MqttSink {
    fn publish(&mut self, topic: &Topic, value: &PublishValue) -> Result<(), SinkError> {
        let payload = value.payload(&self.invalid_payload);
        debug!(topic = %topic, payload = %payload, "publishing");
        self.client
            .try_publish(topic.as_str(), QoS::AtMostOnce, false, payload)
            .map_err(|e| SinkError::Publish(e.to_string()))
    }
}

fn drive_connection(mut connection: Connection, closing: &AtomicBool) {
    for event in connection.iter() {
        match event {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                info!(code = ?ack.code, "connected to MQTT broker");
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                warn!("MQTT broker closed the session");
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("MQTT disconnect sent");
                break;
            }
            Ok(event) => debug!(?event, "MQTT event"),
            Err(e) if closing.load(Ordering::SeqCst) => {
                warn!("MQTT connection error while closing: {}", e);
                break;
            }
            Err(e) => {
                warn!("MQTT connection error: {}, retrying in {:?}", e, RECONNECT_DELAY);
                thread::sleep(RECONNECT_DELAY);
            }
        }
    }
    debug!("MQTT connection thread finished");
}
