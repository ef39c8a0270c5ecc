//! Example: Drive devices from synthetic audio.
//!
//! Builds devices from a JSON system config (or a built-in one), binds the
//! configured effects and feeds them a synthetic 4/4 beat from a separate
//! thread, printing a coarse preview of each device once a second.
//!
//! Run with:
//!     cargo run --example synthetic_show [-- path/to/config.json]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use pixelfx::audio::{AudioBus, FeatureSynth};
use pixelfx::config::SystemConfig;
use pixelfx::devices::Devices;
use pixelfx::effects::Pixel;

const BUILTIN_CONFIG: &str = r#"{
    "devices": [
        {
            "id": "water",
            "type": "memory",
            "config": {"name": "Water Preview", "pixel_count": 60, "refresh_rate": 60},
            "effect": {"type": "water"}
        },
        {
            "id": "melt",
            "type": "memory",
            "config": {"name": "Melt Preview", "pixel_count": 60, "max_brightness": 0.8},
            "effect": {"type": "huxley_melt", "config": {"strobe_rate": 0.9}}
        },
        {
            "id": "station",
            "type": "memory",
            "config": {"name": "Station Preview", "pixel_count": 60, "refresh_rate": 30},
            "effect": {"type": "space_station", "config": {"speed": 0.8}}
        }
    ]
}"#;

const RUN_SECONDS: u64 = 5;
const FEATURE_RATE: f32 = 60.0;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("PixelFX - Synthetic Audio Show");
    println!("==============================\n");

    let config = match std::env::args().nth(1) {
        Some(path) => SystemConfig::load(&path).with_context(|| format!("loading {}", path))?,
        None => serde_json::from_str(BUILTIN_CONFIG).context("parsing built-in config")?,
    };

    let bus = AudioBus::new();
    let mut devices = Devices::new(bus.clone());
    devices
        .create_from_config(&config.devices)
        .context("creating devices")?;
    println!("Devices: {}", devices.ids().collect::<Vec<_>>().join(", "));
    println!("Audio subscribers: {}\n", bus.len());

    // The audio pipeline runs on its own thread at its own cadence.
    let running = Arc::new(AtomicBool::new(true));
    let audio_thread = {
        let running = Arc::clone(&running);
        let bus = bus.clone();
        thread::spawn(move || {
            let period = Duration::from_secs_f32(1.0 / FEATURE_RATE);
            let mut published = 0u64;
            for frame in FeatureSynth::new(120.0, FEATURE_RATE) {
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                bus.publish(&frame);
                published += 1;
                thread::sleep(period);
            }
            published
        })
    };

    for second in 1..=RUN_SECONDS {
        tokio::time::sleep(Duration::from_secs(1)).await;
        println!("t = {}s", second);
        for device in devices.values() {
            let effect = device.active_effect_name().unwrap_or("-");
            println!(
                "  {:<16} {:<14} {}",
                device.name(),
                effect,
                preview(&device.latest_frame())
            );
        }
    }

    running.store(false, Ordering::Relaxed);
    let published = audio_thread
        .join()
        .map_err(|_| anyhow::anyhow!("audio thread panicked"))?;

    devices.clear_all_effects();
    println!("\nPublished {} feature frames", published);
    println!("Done!");
    Ok(())
}

/// One character per pixel, by brightness.
fn preview(frame: &[Pixel]) -> String {
    const RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];
    frame
        .iter()
        .map(|pixel| {
            let level = pixel.iter().copied().fold(0.0f32, f32::max) / 255.0;
            let index = (level * (RAMP.len() - 1) as f32).round() as usize;
            RAMP[index.min(RAMP.len() - 1)]
        })
        .collect()
}
