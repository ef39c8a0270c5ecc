//! Visual effects rendered onto pixel strings.
//!
//! An effect is built from two small traits:
//! - [`Effect`]: owns the pixel buffers and produces a colour field on the
//!   render context.
//! - [`AudioReactive`]: ingests [`FeatureFrame`]s on the audio context.
//!   Effects that react to audio hand out an `Arc` of their audio half via
//!   [`Effect::audio_input`]; it only touches atomics and the event queue.
//!
//! Available effects:
//! - Water: damped ripples driven by bass power and onsets
//! - HuxleyMelt: slow melting hue field with percussive strobes
//! - SpaceStation: a lit segment sweeping along the strip
//! - Solid: a single static colour

pub mod filter;
pub mod hsv;
mod huxley_melt;
pub mod params;
pub mod queue;
pub mod registry;
pub mod ripple;
pub mod shared;
mod solid;
mod space_station;
mod water;

pub use filter::ExpFilter;
pub use hsv::HsvCanvas;
pub use huxley_melt::HuxleyMeltEffect;
pub use params::{HuxleyMeltParams, SolidParams, SpaceStationParams, WaterParams};
pub use queue::EventQueue;
pub use registry::{create_effect, default_params};
pub use ripple::RippleSim;
pub use solid::SolidEffect;
pub use space_station::SpaceStationEffect;
pub use water::WaterEffect;

use std::sync::Arc;

use serde_json::Value;

use crate::audio::FeatureFrame;
use crate::config::{ConfigError, OptionSpec, Params};

/// One RGB (or HSV, before conversion) triple.
pub type Pixel = [f32; 3];

/// Errors raised by effect construction and configuration.
#[derive(Debug, thiserror::Error)]
pub enum EffectError {
    #[error("Invalid effect configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("Unknown effect type: {0}")]
    UnknownType(String),
}

/// Render-side contract of an effect.
///
/// Lifecycle: `activate(pixel_count)`, then any interleaving of
/// `config_updated`, `render` and audio updates, then `deactivate`.
/// Re-activating after `deactivate` starts from a clean state.
pub trait Effect: Send {
    fn effect_type(&self) -> EffectType;

    /// Display name.
    fn name(&self) -> &'static str {
        self.effect_type().display_name()
    }

    /// Display grouping.
    fn category(&self) -> &'static str {
        self.effect_type().category()
    }

    /// Allocate buffers for `pixel_count` LEDs and reset derived state.
    fn activate(&mut self, pixel_count: usize);

    /// Release buffers and discard pending events.
    fn deactivate(&mut self);

    fn is_active(&self) -> bool;

    fn pixel_count(&self) -> usize;

    /// Apply a new configuration mapping, resetting all derived state.
    fn config_updated(&mut self, config: &Value) -> Result<(), EffectError>;

    /// Current configuration as a JSON mapping.
    fn config(&self) -> Value;

    /// Produce a new frame into [`pixels`](Self::pixels) and mark it dirty.
    fn render(&mut self);

    /// RGB pixels in `0..=255`.
    fn pixels(&self) -> &[Pixel];

    fn is_dirty(&self) -> bool;

    fn set_dirty(&mut self, dirty: bool);

    /// Whether the device should call [`render`](Self::render) every tick.
    ///
    /// Static effects render on activation and configuration changes only.
    fn is_animated(&self) -> bool {
        true
    }

    /// The audio half of an audio-reactive effect.
    fn audio_input(&self) -> Option<Arc<dyn AudioReactive>> {
        None
    }
}

/// Audio-side contract of an effect.
///
/// Called from the audio pipeline's thread at its own cadence. Must not write
/// the render buffers.
pub trait AudioReactive: Send + Sync {
    fn audio_data_updated(&self, data: &FeatureFrame);
}

/// Available effect types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectType {
    Water,
    HuxleyMelt,
    SpaceStation,
    Solid,
}

impl EffectType {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "water" => Some(Self::Water),
            "huxley_melt" | "huxley-melt" | "huxleymelt" | "melt" => Some(Self::HuxleyMelt),
            "space_station" | "space-station" | "spacestation" => Some(Self::SpaceStation),
            "solid" | "single_color" | "singlecolor" => Some(Self::Solid),
            _ => None,
        }
    }

    /// Registry key.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::HuxleyMelt => "huxley_melt",
            Self::SpaceStation => "space_station",
            Self::Solid => "solid",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Water => "Water",
            Self::HuxleyMelt => "Huxley Melt",
            Self::SpaceStation => "Space Station",
            Self::Solid => "Solid",
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::Water | Self::HuxleyMelt | Self::SpaceStation => "Atmospheric",
            Self::Solid => "Non-Reactive",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Water => "Rippling water: bass waves with onset droplets",
            Self::HuxleyMelt => "Melting hue field with percussive strobes",
            Self::SpaceStation => "A lit segment sweeping along the strip",
            Self::Solid => "A single static colour",
        }
    }

    pub fn schema(&self) -> &'static [OptionSpec] {
        match self {
            Self::Water => WaterParams::SCHEMA,
            Self::HuxleyMelt => HuxleyMeltParams::SCHEMA,
            Self::SpaceStation => SpaceStationParams::SCHEMA,
            Self::Solid => SolidParams::SCHEMA,
        }
    }

    pub fn is_audio_reactive(&self) -> bool {
        matches!(self, Self::Water | Self::HuxleyMelt)
    }

    pub fn all() -> &'static [Self] {
        &[Self::Water, Self::HuxleyMelt, Self::SpaceStation, Self::Solid]
    }
}
