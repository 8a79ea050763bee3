// Integration tests for the transport listeners and the monitor runtime
// Everything runs against loopback sockets; no external network access

use parking_lot::Mutex;
use sondewatch::core::geo::Coordinate;
use sondewatch::core::monitor::Monitor;
use sondewatch::core::tracker::{Alert, TrackerConfig};
use sondewatch::listeners::mqtt::MqttConfig;
use sondewatch::listeners::{ListenerHandle, MqttListener, RecordCallback, UdpListener, WebListener};
use sondewatch::notify::AlertSink;
use sondewatch::TelemetryRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::broadcast;

fn collector() -> (RecordCallback, Arc<Mutex<Vec<TelemetryRecord>>>) {
    let records = Arc::new(Mutex::new(Vec::new()));
    let sink = records.clone();
    let callback: RecordCallback = Arc::new(move |record| sink.lock().push(record));
    (callback, records)
}

fn summary(callsign: &str, altitude: f64) -> Vec<u8> {
    format!(
        r#"{{"type":"PAYLOAD_SUMMARY","callsign":"{}","latitude":0.045,"longitude":0.0,"altitude":{}}}"#,
        callsign, altitude
    )
    .into_bytes()
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_udp_listener_delivers_records_and_skips_junk() {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let listener = UdpListener::with_socket(socket).unwrap();

    let (callback, records) = collector();
    let handle = ListenerHandle::start(Box::new(listener), callback);

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sender.send_to(b"garbage", addr).await.unwrap();
    sender.send_to(br#"{"type":"OZIMUX"}"#, addr).await.unwrap();
    sender.send_to(&summary("U1", 1200.0), addr).await.unwrap();
    sender.send_to(&summary("U1", 900.0), addr).await.unwrap();

    wait_for(|| records.lock().len() == 2).await;
    tokio::time::timeout(Duration::from_secs(1), handle.stop())
        .await
        .expect("listener should stop promptly")
        .unwrap();

    let records = records.lock();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].altitude, 1200.0);
    assert_eq!(records[1].altitude, 900.0);
}

#[tokio::test]
async fn test_udp_bind_conflict_is_an_error() {
    let taken = std::net::UdpSocket::bind("0.0.0.0:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let (callback, _records) = collector();
    let mut handle = ListenerHandle::start(Box::new(UdpListener::new(port)), callback);
    let result = tokio::time::timeout(Duration::from_secs(1), handle.finished())
        .await
        .expect("bind failure should end the listener");
    assert!(result.is_err());
}

#[tokio::test]
async fn test_mqtt_stop_without_connection() {
    // Nothing listens on port 1; the listener keeps retrying until stopped
    let listener = MqttListener::with_config(MqttConfig {
        broker_url: "127.0.0.1".to_string(),
        port: 1,
        topic: "sondes/#".to_string(),
        reconnect_delay: Duration::from_millis(50),
        secure_websocket: false,
    });

    let (callback, records) = collector();
    let handle = ListenerHandle::start(Box::new(listener), callback);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!handle.is_finished(), "connection failures are retried");

    tokio::time::timeout(Duration::from_secs(1), handle.stop())
        .await
        .expect("stop should resolve within one backoff interval")
        .unwrap();
    assert!(records.lock().is_empty());
}

/// Serve one canned HTTP response per connection
async fn http_server(status: &'static str, body: String) -> String {
    let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = server.accept().await {
            let body = body.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    format!("http://{}/export/export_map.php?live_map=1", addr)
}

#[tokio::test]
async fn test_web_poll_maps_features() {
    let body = serde_json::json!({
        "type": "FeatureCollection",
        "features": [
            {
                "geometry": {"type": "Point", "coordinates": [0.0, 0.045]},
                "properties": {"number": "W1", "latitude": "0.045", "longitude": "0.0", "altitude": "900 m"}
            },
            {
                "geometry": {"type": "Point"},
                "properties": {"number": "W2", "altitude": "n/a"}
            }
        ]
    })
    .to_string();
    let url = http_server("200 OK", body).await;

    let listener = WebListener::with_endpoint(&url, Duration::from_millis(50)).unwrap();
    let records = listener.poll_once().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].device_id, "W1");
    assert_eq!(records[0].altitude, 900.0);

    // Same endpoint driven through the polling loop
    let (callback, collected) = collector();
    let handle = ListenerHandle::start(Box::new(listener), callback);
    wait_for(|| collected.lock().len() >= 2).await;
    handle.stop().await.unwrap();
    assert!(collected.lock().len() >= 2, "each poll cycle delivers the batch again");
}

#[tokio::test]
async fn test_web_error_status_yields_nothing() {
    let url = http_server("503 Service Unavailable", "{}".to_string()).await;
    let listener = WebListener::with_endpoint(&url, Duration::from_millis(50)).unwrap();
    assert!(listener.poll_once().await.is_empty());
}

#[tokio::test]
async fn test_web_unreachable_yields_nothing() {
    let listener =
        WebListener::with_endpoint("http://127.0.0.1:1/", Duration::from_secs(10)).unwrap();
    assert!(listener.poll_once().await.is_empty());
}

#[derive(Default)]
struct RecordingSink {
    alerts: Mutex<Vec<Alert>>,
}

impl AlertSink for RecordingSink {
    fn dispatch(&self, alert: Alert) {
        self.alerts.lock().push(alert);
    }
}

#[tokio::test]
async fn test_monitor_end_to_end_over_udp() {
    let config = TrackerConfig {
        home: Coordinate::new(0.0, 0.0).unwrap(),
        distance_km: 20.0,
        altitude_threshold_m: 1000.0,
        landing_timeout: None,
        retention: chrono::Duration::hours(2),
    };
    let sink = Arc::new(RecordingSink::default());
    let monitor = Monitor::new(config, sink.clone()).with_purge_interval(Duration::from_millis(50));
    let tracker = monitor.tracker();

    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let listener = UdpListener::with_socket(socket).unwrap();

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let run = tokio::spawn(monitor.run(Box::new(listener), shutdown_rx));

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    for altitude in [1200.0, 900.0, 800.0] {
        sender.send_to(&summary("A", altitude), addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    wait_for(|| tracker.lock().get("A").map(|s| s.last_altitude) == Some(800.0)).await;
    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(2), run)
        .await
        .expect("monitor should stop promptly")
        .unwrap()
        .unwrap();

    let alerts = sink.alerts.lock();
    assert_eq!(alerts.len(), 1, "exactly one threshold alert for the descent");
    assert_eq!(alerts[0].record.altitude, 900.0);
}

#[tokio::test]
async fn test_monitor_reports_listener_failure() {
    let taken = std::net::UdpSocket::bind("0.0.0.0:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let config = TrackerConfig {
        home: Coordinate::new(0.0, 0.0).unwrap(),
        distance_km: 20.0,
        altitude_threshold_m: 1000.0,
        landing_timeout: None,
        retention: chrono::Duration::hours(2),
    };
    let monitor = Monitor::new(config, Arc::new(RecordingSink::default()));

    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let result = tokio::time::timeout(
        Duration::from_secs(2),
        monitor.run(Box::new(UdpListener::new(port)), shutdown_rx),
    )
    .await
    .expect("monitor should exit when the listener fails");
    assert!(result.is_err());
}
