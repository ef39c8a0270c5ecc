//! Effect parameter types and their option schemas.

use serde::{Deserialize, Serialize};

use crate::config::{OptionSpec, Params};

// ============================================================================
// Audio-reactive effects
// ============================================================================

/// Parameters for the water effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterParams {
    /// Viscosity exponent of the bass waves. Higher is less viscous.
    pub bass_viscosity: u32,
    /// Viscosity exponent of the onset droplets.
    pub highs_viscosity: u32,
}

impl Default for WaterParams {
    fn default() -> Self {
        Self {
            bass_viscosity: 9,
            highs_viscosity: 3,
        }
    }
}

impl Params for WaterParams {
    const SCHEMA: &'static [OptionSpec] = &[
        OptionSpec::int("bass_viscosity", "Viscosity of the bass waves, higher is less viscous", 1, 16),
        OptionSpec::int("highs_viscosity", "Viscosity of the onset droplets, higher is less viscous", 1, 16),
    ];
}

/// Parameters for the Huxley melt effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HuxleyMeltParams {
    /// Effect speed modifier.
    pub speed: f32,
    /// Audio reactive modifier.
    pub reactivity: f32,
    /// Percussive strobe width, in pixels.
    pub strobe_width: usize,
    /// Percussive strobe decay rate. Higher decays faster.
    pub strobe_decay_rate: f32,
    /// Gaussian blur applied to the strobes every frame.
    pub strobe_blur: f32,
    /// Brightness of the melt background.
    pub bg_bright: f32,
    /// Cutoff for quiet sounds. Higher means only loud sounds strobe.
    pub strobe_threshold: f32,
    /// Higher means more strobes.
    pub strobe_rate: f32,
}

impl Default for HuxleyMeltParams {
    fn default() -> Self {
        Self {
            speed: 0.5,
            reactivity: 0.5,
            strobe_width: 10,
            strobe_decay_rate: 0.25,
            strobe_blur: 3.5,
            bg_bright: 0.4,
            strobe_threshold: 0.75,
            strobe_rate: 0.75,
        }
    }
}

impl Params for HuxleyMeltParams {
    const SCHEMA: &'static [OptionSpec] = &[
        OptionSpec::float("speed", "Effect Speed modifier", 0.001, 1.0),
        OptionSpec::float("reactivity", "Audio Reactive modifier", 0.0001, 1.0),
        OptionSpec::int("strobe_width", "Percussive strobe width, in pixels", 0, 1000),
        OptionSpec::float(
            "strobe_decay_rate",
            "Percussive strobe decay rate. Higher -> decays faster.",
            0.0,
            1.0,
        ),
        OptionSpec::float("strobe_blur", "How much to blur the strobes", 0.0, 10.0),
        OptionSpec::float("bg_bright", "How bright the melt bg should be", 0.0, 1.0),
        OptionSpec::float(
            "strobe_threshold",
            "Cutoff for quiet sounds. Higher -> only loud sounds are detected",
            0.0,
            1.0,
        ),
        OptionSpec::float("strobe_rate", "higher numbers -> more strobes", 0.0, 1.0),
    ];
}

// ============================================================================
// Non-reactive effects
// ============================================================================

/// Parameters for the space station effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceStationParams {
    /// Sweep from both ends towards the middle.
    pub mirror: bool,
    /// Sweeps per second.
    pub speed: f32,
    /// Width of the lit segment, in pixels.
    pub strobe_width: usize,
    /// Dark pause after each sweep, in pixel slots.
    pub delay_width: usize,
}

impl Default for SpaceStationParams {
    fn default() -> Self {
        Self {
            mirror: true,
            speed: 0.5,
            strobe_width: 5,
            delay_width: 5,
        }
    }
}

impl Params for SpaceStationParams {
    const SCHEMA: &'static [OptionSpec] = &[
        OptionSpec::boolean("mirror", "Mirror the effect"),
        OptionSpec::float("speed", "Effect Speed modifier", 0.001, 1.0),
        OptionSpec::int(
            "strobe_width",
            "Percussive strobe width, from one pixel to the full length",
            1,
            100,
        ),
        OptionSpec::int("delay_width", "Pause between sweeps, in pixel slots", 0, 2000),
    ];
}

/// Parameters for the solid colour effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolidParams {
    /// RGB colour, each channel in `0..=255`.
    pub color: [f32; 3],
}

impl Default for SolidParams {
    fn default() -> Self {
        Self {
            color: [255.0, 255.0, 255.0],
        }
    }
}

impl Params for SolidParams {
    const SCHEMA: &'static [OptionSpec] = &[OptionSpec::color("color", "Colour of the strip")];
}
