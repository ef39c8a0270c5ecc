//! Integration tests for the device registry and configuration files.

use std::io::Write;
use std::time::Duration;

use pixelfx::audio::{AudioBus, FeatureSynth};
use pixelfx::config::SystemConfig;
use pixelfx::devices::{DeviceError, Devices};
use serde_json::{json, Value};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const SYSTEM_CONFIG: &str = r#"{
    "devices": [
        {
            "id": "desk",
            "type": "memory",
            "config": {"name": "Desk", "pixel_count": 30, "max_brightness": 0.5},
            "effect": {"type": "water", "config": {"bass_viscosity": 7}}
        },
        {
            "id": "shelf",
            "type": "null",
            "config": {"name": "Shelf", "pixel_count": 12, "refresh_rate": 30}
        }
    ]
}"#;

fn write_config(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_and_create_from_config_file() {
    init_logging();
    let file = write_config(SYSTEM_CONFIG);
    let config = SystemConfig::load(file.path()).unwrap();
    assert_eq!(config.devices.len(), 2);

    let mut devices = Devices::new(AudioBus::new());
    devices.create_from_config(&config.devices).unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices.ids().collect::<Vec<_>>(), vec!["desk", "shelf"]);

    let desk = devices.get_device("desk").unwrap();
    assert_eq!(desk.name(), "Desk");
    assert_eq!(desk.pixel_count(), 30);
    assert_eq!(desk.max_brightness(), 128.0);
    assert_eq!(desk.active_effect_name(), Some("Water"));
    assert_eq!(desk.effect_config().unwrap()["bass_viscosity"], 7);
    assert!(devices.audio_bus().is_subscribed("desk"));

    let shelf = devices.get_device("shelf").unwrap();
    assert_eq!(shelf.refresh_rate(), 30);
    assert!(!shelf.is_active());
    assert!(devices.get_device("attic").is_none());
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(SystemConfig::load(dir.path().join("absent.json")).is_err());
}

#[test]
fn test_bad_effect_in_config_is_reported() {
    let mut devices = Devices::new(AudioBus::new());
    let config: SystemConfig = serde_json::from_value(json!({
        "devices": [{
            "id": "desk",
            "type": "memory",
            "config": {"name": "Desk", "pixel_count": 8},
            "effect": {"type": "water", "config": {"bass_viscosity": 99}}
        }]
    }))
    .unwrap();

    let err = devices.create_from_config(&config.devices).unwrap_err();
    assert!(matches!(err, DeviceError::Effect(_)));
}

#[test]
fn test_clear_all_effects_blanks_every_device() {
    init_logging();
    let mut devices = Devices::new(AudioBus::new());
    for id in ["a", "b", "c"] {
        devices
            .create(id, "memory", &json!({"name": id, "pixel_count": 6}))
            .unwrap();
        devices
            .set_effect_by_name(id, "solid", &json!({"color": [9, 9, 9]}))
            .unwrap();
    }
    for device in devices.values() {
        device.tick();
        assert_eq!(device.latest_frame(), vec![[9.0; 3]; 6]);
    }

    devices.clear_all_effects();
    for device in devices.values() {
        assert!(!device.is_active());
        assert_eq!(device.active_effect_name(), None);
        assert_eq!(device.latest_frame(), vec![[0.0; 3]; 6]);
    }
}

#[test]
fn test_remove_unsubscribes_audio() {
    let mut devices = Devices::new(AudioBus::new());
    devices
        .create("a", "null", &json!({"name": "A", "pixel_count": 6}))
        .unwrap();
    devices.set_effect_by_name("a", "huxley_melt", &Value::Null).unwrap();
    assert_eq!(devices.audio_bus().len(), 1);

    let removed = devices.remove("a").unwrap();
    assert!(!removed.is_active());
    assert!(devices.audio_bus().is_empty());
    assert!(devices.remove("a").is_none());
}

#[test]
fn test_udp_device_requires_address() {
    let mut devices = Devices::new(AudioBus::new());
    let result = devices.create("a", "udp", &json!({"name": "A", "pixel_count": 6}));
    assert!(matches!(result, Err(DeviceError::InvalidConfig(_))));

    let device = devices
        .create(
            "b",
            "udp",
            &json!({"name": "B", "pixel_count": 6, "ip_address": "127.0.0.1", "port": 21324}),
        )
        .unwrap();
    assert_eq!(device.pixel_count(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_audio_bus_drives_bound_devices() {
    init_logging();
    let bus = AudioBus::new();
    let mut devices = Devices::new(bus.clone());
    devices
        .create("desk", "memory", &json!({"name": "Desk", "pixel_count": 24}))
        .unwrap();
    devices.set_effect_by_name("desk", "water", &Value::Null).unwrap();
    let desk = devices.get_device("desk").unwrap();

    let mut synth = FeatureSynth::new(120.0, 60.0);
    for frame in synth.frames(60) {
        bus.publish(&frame);
        tokio::time::sleep(Duration::from_millis(17)).await;
    }

    let frame = desk.latest_frame();
    assert_eq!(frame.len(), 24);
    assert!(frame.iter().any(|p| p.iter().any(|&c| c > 0.0)));
    assert!(frame.iter().flatten().all(|&c| (0.0..=255.0).contains(&c)));

    devices.clear_all_effects();
    assert!(!desk.is_active());
}
