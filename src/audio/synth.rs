//! Synthetic feature frames for demos, tests and benches.
//!
//! Stands in for a live analysis pipeline: a 4/4 pattern with kicks on beats
//! 1 and 3 and hi-hats on every eighth, sampled at a fixed frame rate.

use super::{BandPower, FeatureFrame};
use crate::effects::ExpFilter;

/// Deterministic generator of [`FeatureFrame`]s following a test beat.
#[derive(Debug, Clone)]
pub struct FeatureSynth {
    bpm: f64,
    frame_rate: f64,
    frame_index: u64,
    last_step: Option<u64>,
    noise_state: u64,
    lows_filter: ExpFilter,
    mids_filter: ExpFilter,
    highs_filter: ExpFilter,
}

impl FeatureSynth {
    /// # Arguments
    /// * `bpm` - Tempo of the pattern
    /// * `frame_rate` - Feature frames per second
    pub fn new(bpm: f32, frame_rate: f32) -> Self {
        Self {
            bpm: bpm.max(1.0) as f64,
            frame_rate: frame_rate.max(1.0) as f64,
            frame_index: 0,
            last_step: None,
            noise_state: 12345,
            lows_filter: ExpFilter::new(0.9, 0.2),
            mids_filter: ExpFilter::new(0.9, 0.2),
            highs_filter: ExpFilter::new(0.9, 0.2),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.noise_state = seed;
        self
    }

    /// Seconds covered by the frames produced so far.
    pub fn elapsed(&self) -> f64 {
        self.frame_index as f64 / self.frame_rate
    }

    /// Produce the next frame.
    pub fn next_frame(&mut self) -> FeatureFrame {
        let t = self.elapsed();
        let sixteenth = 60.0 / self.bpm / 4.0;
        let step = (t / sixteenth).floor() as u64;

        // Kicks on steps 0 and 8 of every 16, hi-hats on every even step.
        let since_kick = t - (step - step % 8) as f64 * sixteenth;
        let since_hat = t - (step - step % 2) as f64 * sixteenth;
        let kick = 0.8 * (-since_kick * 15.0).exp() as f32;
        let hat = (-since_hat * 50.0).exp() as f32;

        let onset = step % 2 == 0 && self.last_step != Some(step);
        self.last_step = Some(step);

        let lows = kick + self.noise(0.02);
        let mids = 0.2 * kick + 0.1 * hat + self.noise(0.02);
        let highs = 0.6 * hat + self.noise(0.02);

        self.frame_index += 1;
        FeatureFrame {
            lows: BandPower::new(lows, self.lows_filter.update(lows)),
            mids: BandPower::new(mids, self.mids_filter.update(mids)),
            highs: BandPower::new(highs, self.highs_filter.update(highs)),
            melbank_lows: vec![lows, 0.5 * lows],
            melbank_mids: vec![mids, 0.7 * mids, 0.4 * mids],
            melbank_highs: vec![0.6 * hat, hat, 0.8 * hat, 0.5 * hat],
            onset,
        }
    }

    /// Produce the next `count` frames.
    pub fn frames(&mut self, count: usize) -> Vec<FeatureFrame> {
        (0..count).map(|_| self.next_frame()).collect()
    }

    /// Non-negative noise in `[0, amplitude]`.
    ///
    /// Simple LCG for reproducible output.
    fn noise(&mut self, amplitude: f32) -> f32 {
        self.noise_state = self
            .noise_state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        amplitude * ((self.noise_state >> 40) as f32 / (1u64 << 24) as f32)
    }
}

impl Default for FeatureSynth {
    fn default() -> Self {
        Self::new(120.0, 60.0)
    }
}

impl Iterator for FeatureSynth {
    type Item = FeatureFrame;

    fn next(&mut self) -> Option<FeatureFrame> {
        Some(self.next_frame())
    }
}
