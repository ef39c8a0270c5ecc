//! PixelFX Core
//!
//! Audio-reactive effects for addressable LED strings.
//!
//! # Features
//!
//! - Per-device output scheduling on tokio intervals with dirty tracking,
//!   brightness scaling and preview mode
//! - Effects split into a render half and an audio half, exchanging data
//!   through atomics and a lock-free event queue
//! - Adaptive exponential filters and a damped 1-D wave simulation
//! - UDP, in-memory and null output sinks
//! - JSON configuration with per-type option schemas

pub mod audio;
pub mod config;
pub mod devices;
pub mod effects;

// Re-export commonly used types
pub use audio::{AudioBus, BandPower, FeatureFrame, FeatureSynth};
pub use config::{ConfigError, OptionSpec, Params, SystemConfig};
pub use devices::{Device, DeviceConfig, DeviceError, DeviceType, Devices, MemoryOutput, Output, OutputError};
pub use effects::{
    create_effect, default_params, AudioReactive, Effect, EffectError, EffectType, ExpFilter, Pixel,
    RippleSim,
};
