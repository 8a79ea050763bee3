use sondewatch::core::config::{ListenerKind, Settings, DEFAULT_UDP_PORT};
use sondewatch::core::tracker::TrackerConfig;
use sondewatch::SondeError;
use tempfile::TempDir;

#[test]
fn test_missing_file_is_created_with_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.json");

    let settings = Settings::load_from(&path).unwrap();
    assert!(path.exists(), "defaults should be written on first load");
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.listener_type, ListenerKind::Udp);
    assert_eq!(settings.udp_broadcast.listen_port, DEFAULT_UDP_PORT);

    // Second load reads the file back
    assert_eq!(Settings::load_from(&path).unwrap(), settings);
}

#[test]
fn test_load_full_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
            "listener_location": {"latitude": 46.05, "longitude": 14.51, "altitude": 295},
            "notification_thresholds": {
                "distance_km": 35.5,
                "altitude_meters": 2500,
                "landing_point_timeout_minutes": 15
            },
            "udp_broadcast": {"enabled": false, "listen_port": 55000},
            "listener_type": "MQTT",
            "notifications": {"services": [
                {"url": "https://hooks.example.com/sonde", "enabled": true},
                {"url": "https://hooks.example.com/off", "enabled": false}
            ]}
        }"#,
    )
    .unwrap();

    let settings = Settings::load_from(&path).unwrap();
    assert_eq!(settings.listener_type, ListenerKind::Mqtt);
    assert_eq!(settings.notification_thresholds.landing_point_timeout_minutes, 15);
    assert_eq!(settings.udp_broadcast.listen_port, 55000);
    assert_eq!(
        settings.notifications.active_urls(),
        vec!["https://hooks.example.com/sonde".to_string()]
    );

    let tracker = TrackerConfig::from_settings(&settings).unwrap();
    assert_eq!(tracker.distance_km, 35.5);
    assert_eq!(tracker.altitude_threshold_m, 2500.0);
    assert_eq!(tracker.landing_timeout, Some(chrono::Duration::minutes(15)));
    assert_eq!(tracker.retention, chrono::Duration::hours(2));
}

#[test]
fn test_optional_sections_default() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
            "listener_location": {"latitude": 1, "longitude": 2},
            "notification_thresholds": {"distance_km": 20, "altitude_meters": 1000},
            "listener_type": "WEB"
        }"#,
    )
    .unwrap();

    let settings = Settings::load_from(&path).unwrap();
    assert_eq!(settings.listener_type, ListenerKind::Web);
    assert!(settings.udp_broadcast.enabled);
    assert!(settings.notifications.services.is_empty());

    let tracker = TrackerConfig::from_settings(&settings).unwrap();
    assert_eq!(tracker.landing_timeout, None);
}

#[test]
fn test_unknown_listener_fails_startup() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
            "listener_location": {"latitude": 1, "longitude": 2},
            "notification_thresholds": {"distance_km": 20, "altitude_meters": 1000},
            "listener_type": "APRS"
        }"#,
    )
    .unwrap();

    let err = Settings::load_from(&path).unwrap_err();
    assert!(matches!(err, SondeError::Config(_)));
    assert!(err.to_string().contains("APRS"), "error should name the bad value: {}", err);
}

#[test]
fn test_invalid_values_fail_startup() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
            "listener_location": {"latitude": 1, "longitude": 2},
            "notification_thresholds": {"distance_km": -5, "altitude_meters": 1000},
            "listener_type": "UDP"
        }"#,
    )
    .unwrap();

    assert!(matches!(Settings::load_from(&path), Err(SondeError::Config(_))));
}

#[test]
fn test_non_webhook_endpoint_fails_startup() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
            "listener_location": {"latitude": 1, "longitude": 2},
            "notification_thresholds": {"distance_km": 20, "altitude_meters": 1000},
            "listener_type": "UDP",
            "notifications": {"services": [{"url": "tgram://bottoken/chatid", "enabled": true}]}
        }"#,
    )
    .unwrap();

    let err = Settings::load_from(&path).unwrap_err();
    assert!(matches!(err, SondeError::Config(_)));
    assert!(err.to_string().contains("tgram://bottoken/chatid"), "{}", err);
}

#[test]
fn test_corrupted_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(Settings::load_from(&path).is_err());
}

#[test]
fn test_save_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");

    let mut settings = Settings::default();
    settings.listener_location.latitude = -33.9;
    settings.listener_location.longitude = 151.2;
    settings.listener_type = ListenerKind::Web;
    settings.save_to(&path).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"listener_type\": \"WEB\""));
    assert_eq!(Settings::load_from(&path).unwrap(), settings);
}
