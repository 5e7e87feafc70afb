// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the report listener using mockforge-mqtt.

use std::time::{Duration, Instant};

use mockforge_mqtt::broker::MqttConfig;
use mockforge_mqtt::start_mqtt_server;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use yolocal_lib::event::{DeviceEvent, Event};
use yolocal_lib::protocol::ReportListener;
use yolocal_lib::{Hub, HubConfig};

/// Helper to find an available port for testing.
fn get_test_port() -> u16 {
    use std::sync::atomic::{AtomicU16, Ordering};
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18950);
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Starts a mock MQTT broker on the given port.
async fn start_mock_broker(port: u16) {
    let config = MqttConfig {
        port,
        host: "127.0.0.1".to_string(),
        ..Default::default()
    };

    tokio::spawn(async move {
        let _ = start_mqtt_server(config).await;
    });

    // Give the broker time to bind before clients connect
    sleep(Duration::from_millis(500)).await;
}

/// CONNACK with return code "accepted".
const CONNACK: [u8; 4] = [0x20, 0x02, 0x00, 0x00];

/// Server-initiated DISCONNECT.
const DISCONNECT: [u8; 2] = [0xE0, 0x00];

/// Reads whatever the client sent in one go.
async fn read_packet(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = vec![0u8; 1024];
    let n = stream.read(&mut buf).await.unwrap();
    buf.truncate(n);
    buf
}

/// Connects a plain MQTT client and publishes `payloads` on `topic`.
fn publish_all(port: u16, topic: &str, payloads: Vec<Vec<u8>>) -> tokio::task::JoinHandle<()> {
    let options = MqttOptions::new("test-publisher", "127.0.0.1", port);
    let (client, mut event_loop) = AsyncClient::new(options, 10);
    let topic = topic.to_string();

    tokio::spawn(async move {
        tokio::spawn(async move {
            while event_loop.poll().await.is_ok() {}
        });
        for payload in payloads {
            client
                .publish(&topic, QoS::AtLeastOnce, false, payload)
                .await
                .unwrap();
        }
        // Keep the client alive until the queue is flushed.
        sleep(Duration::from_secs(2)).await;
    })
}

// ============================================================================
// ReportListener Connection Tests
// ============================================================================

mod listener_connection {
    use super::*;

    #[tokio::test]
    async fn connect_to_broker() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (tx, _rx) = mpsc::unbounded_channel::<Event>();
        let result = ReportListener::builder()
            .host("127.0.0.1")
            .port(port)
            .net_id("net1")
            .credentials("client", "token")
            .connect(tx)
            .await;

        assert!(result.is_ok(), "Failed to connect: {:?}", result.err());

        let listener = result.unwrap();
        assert_eq!(listener.topic(), "ylsubnet/net1/+/report");
        assert!(listener.is_connected());

        listener.disconnect().await.unwrap();
        assert!(!listener.is_connected());
    }

    #[tokio::test]
    async fn connect_publishes_connection_event() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let bus = yolocal_lib::event::EventBus::new();
        let mut events = bus.subscribe();
        let (tx, _rx) = mpsc::unbounded_channel::<Event>();

        let _listener = ReportListener::builder()
            .host("127.0.0.1")
            .port(port)
            .net_id("net1")
            .event_bus(bus)
            .connect(tx)
            .await
            .unwrap();

        assert_eq!(events.recv().await.unwrap(), DeviceEvent::connected());
    }

    #[tokio::test]
    async fn unreachable_broker_fails() {
        let port = get_test_port();

        let (tx, _rx) = mpsc::unbounded_channel::<Event>();
        let err = ReportListener::builder()
            .host("127.0.0.1")
            .port(port)
            .net_id("net1")
            .connection_timeout(Duration::from_secs(2))
            .connect(tx)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            yolocal_lib::ProtocolError::ConnectionFailed(_)
        ));
    }

    #[tokio::test]
    async fn silent_broker_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let (tx, _rx) = mpsc::unbounded_channel::<Event>();
        let started = Instant::now();
        let err = ReportListener::builder()
            .host("127.0.0.1")
            .port(port)
            .net_id("net1")
            .connection_timeout(Duration::from_secs(1))
            .connect(tx)
            .await
            .unwrap_err();

        match err {
            yolocal_lib::ProtocolError::ConnectionFailed(message) => {
                assert!(message.contains("timeout"), "unexpected message: {message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn malformed_report_keeps_connection() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let listener = ReportListener::builder()
            .host("127.0.0.1")
            .port(port)
            .net_id("net1")
            .connect(tx)
            .await
            .unwrap();
        sleep(Duration::from_millis(300)).await;

        publish_all(
            port,
            "ylsubnet/net1/door/report",
            vec![
                b"garbage".to_vec(),
                br#"{"deviceId":"door","data":{"state":"open"}}"#.to_vec(),
            ],
        );

        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.device_id(), "door");
        assert!(listener.is_connected());
    }

    #[tokio::test]
    async fn reconnects_after_broker_disconnect() {
        let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();
        let broker = tokio::spawn(async move {
            let (mut first, _) = server.accept().await.unwrap();
            let connect = read_packet(&mut first).await;
            assert_eq!(connect.first().map(|b| b >> 4), Some(1));
            first.write_all(&CONNACK).await.unwrap();
            sleep(Duration::from_millis(200)).await;
            first.write_all(&DISCONNECT).await.unwrap();
            drop(first);

            let (mut second, _) = server.accept().await.unwrap();
            read_packet(&mut second).await;
            second.write_all(&CONNACK).await.unwrap();
            second
        });

        let bus = yolocal_lib::event::EventBus::new();
        let mut events = bus.subscribe();
        let (tx, _rx) = mpsc::unbounded_channel::<Event>();
        let listener = ReportListener::builder()
            .host("127.0.0.1")
            .port(port)
            .net_id("net1")
            .event_bus(bus)
            .connect(tx)
            .await
            .unwrap();

        let mut flags = Vec::new();
        while flags.len() < 3 {
            let event = timeout(Duration::from_secs(30), events.recv())
                .await
                .unwrap()
                .unwrap();
            if let DeviceEvent::ConnectionChanged { connected, .. } = event {
                flags.push(connected);
            }
        }
        assert_eq!(flags, vec![true, false, true]);
        assert!(listener.is_connected());

        let _second = broker.await.unwrap();
    }
}

// ============================================================================
// Hub Tests
// ============================================================================

mod hub_connect {
    use super::*;

    async fn mock_api() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/open/yolink/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "token",
                "expires_in": 7200
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/open/yolink/v2/api"))
            .and(body_partial_json(json!({"method": "Home.getDeviceList"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": "000000",
                "data": {"devices": [
                    {"deviceId": "door", "name": "Door", "token": "t", "type": "DoorSensor"}
                ]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/open/yolink/v2/api"))
            .and(body_partial_json(json!({"method": "DoorSensor.getState"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": "000000",
                "data": {"online": true, "state": {"state": "closed", "battery": 4}}
            })))
            .mount(&server)
            .await;
        server
    }

    fn config(server: &MockServer, mqtt_port: u16) -> HubConfig {
        let http_port = server.address().port();
        HubConfig::new("127.0.0.1", "client", "secret", "net1")
            .with_http_port(http_port)
            .with_mqtt_port(mqtt_port)
            .with_connect_timeout(Duration::from_secs(2))
    }

    #[tokio::test]
    async fn connect_loads_state_and_applies_events() {
        let server = mock_api().await;
        let port = get_test_port();
        start_mock_broker(port).await;

        let hub = Hub::connect(config(&server, port)).await.unwrap();
        assert!(hub.is_connected());
        assert_eq!(hub.list_devices().len(), 1);

        let mut watch = hub.watch_states();
        hub.event_sender()
            .unwrap()
            .send(Event::decode(br#"{"deviceId":"door","data":{"state":"open"}}"#).unwrap())
            .unwrap();
        timeout(Duration::from_secs(1), watch.changed())
            .await
            .unwrap()
            .unwrap();

        let state = hub.get_state("door").unwrap();
        assert_eq!(state.field("state").and_then(|v| v.as_str()), Some("open"));
        assert_eq!(state.field("battery").and_then(|v| v.as_i64()), Some(4));

        hub.shutdown().await;
        assert!(!hub.is_connected());
    }

    #[tokio::test]
    async fn published_report_reaches_store() {
        let server = mock_api().await;
        let port = get_test_port();
        start_mock_broker(port).await;

        let hub = Hub::connect(config(&server, port)).await.unwrap();
        let mut watch = hub.watch_states();
        sleep(Duration::from_millis(300)).await;

        publish_all(
            port,
            "ylsubnet/net1/door/report",
            vec![
                b"garbage".to_vec(),
                br#"{"deviceId":"door","event":"DoorSensor.Alert","data":{"state":"open"}}"#
                    .to_vec(),
            ],
        );

        timeout(Duration::from_secs(5), watch.changed())
            .await
            .unwrap()
            .unwrap();

        let state = hub.get_state("door").unwrap();
        assert_eq!(state.field("state").and_then(|v| v.as_str()), Some("open"));
        assert_eq!(state.field("battery").and_then(|v| v.as_i64()), Some(4));
        assert!(hub.is_connected());

        hub.shutdown().await;
    }

    #[tokio::test]
    async fn connect_fails_without_broker() {
        let server = mock_api().await;
        let port = get_test_port();

        let err = Hub::connect(config(&server, port)).await.unwrap_err();
        assert!(err.is_connection());
    }
}
