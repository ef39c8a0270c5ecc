//! Per-tick audio feature summary consumed by audio-reactive effects.
//!
//! The analysis pipeline (capture, FFT, mel banks, onset detection) lives
//! outside this crate. It hands one [`FeatureFrame`] per analysis tick to the
//! [`AudioBus`](super::AudioBus).

use serde::{Deserialize, Serialize};

/// Power of one frequency band, raw and smoothed by the analysis pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandPower {
    pub raw: f32,
    pub filtered: f32,
}

impl BandPower {
    pub fn new(raw: f32, filtered: f32) -> Self {
        Self { raw, filtered }
    }

    #[inline]
    pub fn get(&self, filtered: bool) -> f32 {
        if filtered {
            self.filtered
        } else {
            self.raw
        }
    }
}

/// Spectral summary for one analysis tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFrame {
    pub lows: BandPower,
    pub mids: BandPower,
    pub highs: BandPower,
    /// Mel bank intensities covering the low third of the spectrum.
    pub melbank_lows: Vec<f32>,
    /// Mel bank intensities covering the middle third of the spectrum.
    pub melbank_mids: Vec<f32>,
    /// Mel bank intensities covering the high third of the spectrum.
    pub melbank_highs: Vec<f32>,
    /// A percussive onset was detected during this tick.
    pub onset: bool,
}

impl FeatureFrame {
    pub fn lows_power(&self, filtered: bool) -> f32 {
        self.lows.get(filtered)
    }

    pub fn mids_power(&self, filtered: bool) -> f32 {
        self.mids.get(filtered)
    }

    pub fn high_power(&self, filtered: bool) -> f32 {
        self.highs.get(filtered)
    }

    pub fn onset(&self) -> bool {
        self.onset
    }

    /// Mel bank split into low, mid and high thirds.
    pub fn melbank_thirds(&self) -> [&[f32]; 3] {
        [&self.melbank_lows, &self.melbank_mids, &self.melbank_highs]
    }

    /// Squared peak of each mel third, clamped to `[0, 1]`.
    ///
    /// Used by effects for loudness threshold tests.
    pub fn thirds_peak_intensity(&self) -> [f32; 3] {
        self.melbank_thirds().map(|band| {
            let peak = band.iter().copied().fold(0.0f32, f32::max);
            (peak * peak).clamp(0.0, 1.0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_power_selects_variant() {
        let band = BandPower::new(0.8, 0.3);
        assert_eq!(band.get(false), 0.8);
        assert_eq!(band.get(true), 0.3);
    }

    #[test]
    fn test_thirds_peak_intensity() {
        let frame = FeatureFrame {
            melbank_lows: vec![0.1, 0.5, 0.2],
            melbank_mids: vec![],
            melbank_highs: vec![2.0],
            ..Default::default()
        };
        let peaks = frame.thirds_peak_intensity();
        assert!((peaks[0] - 0.25).abs() < 1e-6);
        assert_eq!(peaks[1], 0.0);
        assert_eq!(peaks[2], 1.0);
    }

    #[test]
    fn test_feature_frame_json_shape() {
        let json = r#"{"lows":{"raw":0.5,"filtered":0.25},"onset":true}"#;
        let frame: FeatureFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.lows_power(false), 0.5);
        assert_eq!(frame.lows_power(true), 0.25);
        assert_eq!(frame.mids_power(false), 0.0);
        assert!(frame.onset());
    }
}
