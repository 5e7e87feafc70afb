// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT listener for device reports.
//!
//! The hub runs an MQTT broker (port 18080 by default) that accepts the API
//! client id as username and a current access token as password. Every device
//! report is published on `ylsubnet/<netId>/<deviceId>/report`.
//!
//! [`ReportListener`] owns the connection. Its event loop runs on a spawned
//! task, decodes each publish into an [`Event`] and hands it to the state
//! owner through an unbounded channel; it never touches the store itself.
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use yolocal_lib::protocol::ReportListener;
//!
//! # async fn example() -> yolocal_lib::Result<()> {
//! let (tx, mut rx) = mpsc::unbounded_channel();
//!
//! let listener = ReportListener::builder()
//!     .host("192.168.1.20")
//!     .net_id("net-id")
//!     .credentials("client-id", "access-token")
//!     .connect(tx)
//!     .await?;
//!
//! while let Some(event) = rx.recv().await {
//!     println!("{}: {:?}", event.device_id(), event.data());
//! }
//! # listener.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, EventLoop, MqttOptions, Outgoing, Packet,
    QoS,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::ProtocolError;
use crate::event::{DeviceEvent, Event, EventBus};

use super::ReportTopic;

/// Pause between reconnection attempts after the connection drops.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Connection settings for [`ReportListener`].
#[derive(Debug, Clone)]
pub struct ReportListenerConfig {
    host: String,
    port: u16,
    net_id: String,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    connection_timeout: Duration,
}

impl ReportListenerConfig {
    /// Default MQTT port of the hub.
    pub const DEFAULT_PORT: u16 = 18080;
}

impl Default for ReportListenerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: Self::DEFAULT_PORT,
            net_id: String::new(),
            credentials: None,
            keep_alive: Duration::from_secs(60),
            connection_timeout: Duration::from_secs(10),
        }
    }
}

/// A live subscription to the hub's device reports.
///
/// Dropping the listener stops its event loop.
pub struct ReportListener {
    client: AsyncClient,
    topic: String,
    connected: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl ReportListener {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn builder() -> ReportListenerBuilder {
        ReportListenerBuilder::default()
    }

    /// Returns the subscribed topic filter.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns `true` while the broker connection is up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Disconnects from the broker.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Mqtt`] if the request cannot be queued.
    pub async fn disconnect(&self) -> Result<(), ProtocolError> {
        tracing::info!(topic = %self.topic, "Disconnecting report listener");
        self.connected.store(false, Ordering::Release);
        self.client.disconnect().await.map_err(ProtocolError::Mqtt)
    }
}

impl Drop for ReportListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for ReportListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportListener")
            .field("topic", &self.topic)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ReportListener`].
#[derive(Debug, Default)]
pub struct ReportListenerBuilder {
    config: ReportListenerConfig,
    bus: Option<EventBus>,
}

impl ReportListenerBuilder {
    /// Sets the broker host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the broker port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the network identifier whose reports are subscribed.
    #[must_use]
    pub fn net_id(mut self, net_id: impl Into<String>) -> Self {
        self.config.net_id = net_id.into();
        self
    }

    /// Sets the API client id and access token used to log in.
    #[must_use]
    pub fn credentials(
        mut self,
        client_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        self.config.credentials = Some((client_id.into(), access_token.into()));
        self
    }

    /// Sets the keep-alive interval.
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.config.keep_alive = duration;
        self
    }

    /// Sets how long to wait for the broker to accept the connection.
    #[must_use]
    pub fn connection_timeout(mut self, duration: Duration) -> Self {
        self.config.connection_timeout = duration;
        self
    }

    /// Publishes connection changes on `bus`.
    #[must_use]
    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Connects, subscribes and starts forwarding reports to `sink`.
    ///
    /// Returns once the broker acknowledged the connection.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::InvalidAddress`] if host or net id is missing
    /// - [`ProtocolError::AuthenticationFailed`] if the broker rejects the login
    /// - [`ProtocolError::ConnectionFailed`] if the broker is unreachable or
    ///   does not answer within the connection timeout
    pub async fn connect(
        self,
        sink: mpsc::UnboundedSender<Event>,
    ) -> Result<ReportListener, ProtocolError> {
        let config = self.config;
        if config.host.is_empty() {
            return Err(ProtocolError::InvalidAddress(
                "MQTT host is required".to_string(),
            ));
        }
        if config.net_id.is_empty() {
            return Err(ProtocolError::InvalidAddress(
                "network id is required".to_string(),
            ));
        }

        let client_id = format!("yolocal_{}", uuid::Uuid::new_v4().simple());
        let mut mqtt_options = MqttOptions::new(&client_id, &config.host, config.port);
        mqtt_options.set_keep_alive(config.keep_alive);
        mqtt_options.set_clean_session(true);
        if let Some((ref username, ref password)) = config.credentials {
            mqtt_options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);
        let topic = ReportTopic::filter(&config.net_id);
        let connected = Arc::new(AtomicBool::new(false));
        let (connack_tx, connack_rx) = oneshot::channel();

        let task = tokio::spawn(run_event_loop(
            event_loop,
            EventLoopContext {
                client: client.clone(),
                topic: topic.clone(),
                sink,
                bus: self.bus,
                connected: Arc::clone(&connected),
            },
            connack_tx,
        ));

        let listener = ReportListener {
            client,
            topic,
            connected,
            task,
        };

        let timeout = config.connection_timeout;
        match tokio::time::timeout(timeout, connack_rx).await {
            Ok(Ok(Ok(()))) => {
                tracing::info!(
                    host = %config.host,
                    port = %config.port,
                    topic = %listener.topic,
                    "Connected to hub MQTT broker"
                );
                Ok(listener)
            }
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_)) => Err(ProtocolError::ConnectionFailed(
                "MQTT event loop terminated unexpectedly".to_string(),
            )),
            Err(_) => Err(ProtocolError::ConnectionFailed(format!(
                "MQTT connection timeout after {}s",
                timeout.as_secs()
            ))),
        }
    }
}

struct EventLoopContext {
    client: AsyncClient,
    topic: String,
    sink: mpsc::UnboundedSender<Event>,
    bus: Option<EventBus>,
    connected: Arc<AtomicBool>,
}

impl EventLoopContext {
    fn set_connected(&self, connected: bool, error: Option<String>) {
        let was = self.connected.swap(connected, Ordering::AcqRel);
        if was == connected {
            return;
        }
        if let Some(bus) = &self.bus {
            bus.publish(if connected {
                DeviceEvent::connected()
            } else {
                DeviceEvent::disconnected(error.unwrap_or_else(|| "disconnected".to_string()))
            });
        }
    }

    /// Returns `false` once nobody consumes reports anymore.
    fn forward(&self, topic: &str, payload: &[u8]) -> bool {
        match Event::decode(payload) {
            Ok(event) => {
                tracing::debug!(
                    topic = %topic,
                    device_id = %event.device_id(),
                    kind = ?event.kind(),
                    "Report received"
                );
                self.sink.send(event).is_ok()
            }
            Err(e) => {
                tracing::error!(
                    topic = %topic,
                    error = %e,
                    payload = %String::from_utf8_lossy(payload),
                    "Failed to decode report"
                );
                true
            }
        }
    }
}

async fn run_event_loop(
    mut event_loop: EventLoop,
    context: EventLoopContext,
    connack_tx: oneshot::Sender<Result<(), ProtocolError>>,
) {
    use rumqttc::Event as MqttEvent;

    let mut connack_tx = Some(connack_tx);

    loop {
        match event_loop.poll().await {
            Ok(MqttEvent::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT broker accepted connection");
                // Clean sessions lose subscriptions, so subscribe on every connect.
                if let Err(e) = context.client.try_subscribe(&context.topic, QoS::AtMostOnce) {
                    tracing::error!(topic = %context.topic, error = %e, "Failed to subscribe");
                }
                context.set_connected(true, None);
                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(Ok(()));
                }
            }
            Ok(MqttEvent::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Ok(MqttEvent::Incoming(Packet::Publish(publish))) => {
                if !context.forward(&publish.topic, &publish.payload) {
                    tracing::debug!("Report receiver dropped, stopping event loop");
                    break;
                }
            }
            Ok(MqttEvent::Incoming(Packet::Disconnect)) => {
                tracing::info!("MQTT broker closed the connection, reconnecting");
                context.set_connected(false, Some("broker disconnect".to_string()));
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
            Ok(MqttEvent::Outgoing(Outgoing::Disconnect)) => {
                context.set_connected(false, None);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(Err(connect_error(&e)));
                    break;
                }
                tracing::error!(error = %e, "MQTT event loop error, reconnecting");
                context.set_connected(false, Some(e.to_string()));
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

fn connect_error(error: &ConnectionError) -> ProtocolError {
    match error {
        ConnectionError::ConnectionRefused(
            ConnectReturnCode::BadUserNamePassword | ConnectReturnCode::NotAuthorized,
        ) => ProtocolError::AuthenticationFailed,
        other => ProtocolError::ConnectionFailed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_default_values() {
        let builder = ReportListenerBuilder::default();
        assert_eq!(builder.config.port, 18080);
        assert!(builder.config.host.is_empty());
        assert!(builder.config.credentials.is_none());
        assert_eq!(builder.config.keep_alive, Duration::from_secs(60));
        assert_eq!(builder.config.connection_timeout, Duration::from_secs(10));
    }

    #[test]
    fn builder_chain() {
        let builder = ReportListener::builder()
            .host("10.0.0.5")
            .port(1883)
            .net_id("net")
            .credentials("id", "token")
            .keep_alive(Duration::from_secs(30))
            .connection_timeout(Duration::from_secs(2));

        assert_eq!(builder.config.host, "10.0.0.5");
        assert_eq!(builder.config.port, 1883);
        assert_eq!(builder.config.net_id, "net");
        assert_eq!(
            builder.config.credentials,
            Some(("id".to_string(), "token".to_string()))
        );
        assert_eq!(builder.config.connection_timeout, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn missing_host_fails() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let err = ReportListener::builder().net_id("n").connect(tx).await.unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn missing_net_id_fails() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let err = ReportListener::builder().host("localhost").connect(tx).await.unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidAddress(_)));
    }

    #[test]
    fn refused_login_is_authentication_failure() {
        let err = connect_error(&ConnectionError::ConnectionRefused(
            ConnectReturnCode::BadUserNamePassword,
        ));
        assert!(matches!(err, ProtocolError::AuthenticationFailed));

        let err = connect_error(&ConnectionError::ConnectionRefused(
            ConnectReturnCode::ServiceUnavailable,
        ));
        assert!(matches!(err, ProtocolError::ConnectionFailed(_)));
    }

    #[test]
    fn forward_drops_malformed_reports() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (client, _event_loop) = AsyncClient::new(MqttOptions::new("t", "localhost", 1883), 1);
        let context = EventLoopContext {
            client,
            topic: ReportTopic::filter("n"),
            sink: tx,
            bus: None,
            connected: Arc::new(AtomicBool::new(false)),
        };

        assert!(context.forward("ylsubnet/n/d1/report", b"not json"));
        assert!(context.forward("ylsubnet/n/d1/report", b"\"text\""));
        assert!(context.forward(
            "ylsubnet/n/d1/report",
            br#"{"deviceId":"d1","data":{"state":"open"}}"#
        ));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.device_id(), "d1");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn connection_changes_are_published_once() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let (client, _event_loop) = AsyncClient::new(MqttOptions::new("t", "localhost", 1883), 1);
        let bus = EventBus::new();
        let mut events = bus.subscribe();
        let context = EventLoopContext {
            client,
            topic: ReportTopic::filter("n"),
            sink: tx,
            bus: Some(bus),
            connected: Arc::new(AtomicBool::new(false)),
        };

        context.set_connected(true, None);
        context.set_connected(true, None);
        context.set_connected(false, Some("reset".to_string()));

        assert_eq!(events.try_recv().unwrap(), DeviceEvent::connected());
        assert_eq!(events.try_recv().unwrap(), DeviceEvent::disconnected("reset"));
        assert!(events.try_recv().is_err());
    }
}
