//! Rippling water effect.
//!
//! Bass power keeps three wave sources pumping along the strip; onsets drop
//! small droplets at random points. Both run through their own damped
//! [`RippleSim`], and the two surfaces are mapped to hue and value.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use atomic_float::AtomicF32;
use serde_json::Value;

use super::hsv::HsvCanvas;
use super::ripple::{damp_factor, RippleSim};
use super::shared::{lock, Rng};
use super::{AudioReactive, Effect, EffectError, EffectType, EventQueue, ExpFilter, Pixel};
use crate::audio::FeatureFrame;
use crate::config::Params;
use crate::effects::params::WaterParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Surface {
    Bass,
    Highs,
}

/// A drop computed on the audio context, applied on the render context.
#[derive(Debug, Clone, Copy, PartialEq)]
struct WaterDrop {
    surface: Surface,
    position: usize,
    height: f32,
}

struct AudioState {
    lows_filter: ExpFilter,
    mids_filter: ExpFilter,
    rng: Rng,
}

impl AudioState {
    fn new() -> Self {
        Self {
            lows_filter: ExpFilter::new(0.1, 0.1),
            mids_filter: ExpFilter::new(0.1, 0.1),
            rng: Rng::new(0x5eed_da7a),
        }
    }
}

/// Audio half of [`WaterEffect`].
struct WaterAudio {
    active: AtomicBool,
    pixel_count: AtomicUsize,
    state: Mutex<AudioState>,
    lows_power: AtomicF32,
    mids_power: AtomicF32,
    drops: EventQueue<WaterDrop>,
}

impl WaterAudio {
    /// Reset smoothing and discard queued drops.
    fn reset(&self, state: &mut AudioState) {
        *state = AudioState::new();
        self.lows_power.store(0.0, Ordering::Relaxed);
        self.mids_power.store(0.0, Ordering::Relaxed);
        self.drops.clear();
    }
}

impl AudioReactive for WaterAudio {
    fn audio_data_updated(&self, data: &FeatureFrame) {
        let mut state = lock(&self.state);
        if !self.active.load(Ordering::Acquire) {
            return;
        }
        let pixel_count = self.pixel_count.load(Ordering::Acquire);

        let lows = state.lows_filter.update(data.lows_power(false));
        let mids = state
            .mids_filter
            .update(data.mids_power(false) + data.high_power(false));
        self.lows_power.store(lows, Ordering::Relaxed);
        self.mids_power.store(mids, Ordering::Relaxed);

        for position in [1, pixel_count / 2, pixel_count.saturating_sub(2)] {
            self.drops.push(WaterDrop {
                surface: Surface::Bass,
                position,
                height: lows * 4.0,
            });
        }

        if data.onset() {
            let position = state.rng.next_range(1, pixel_count.saturating_sub(2));
            self.drops.push(WaterDrop {
                surface: Surface::Highs,
                position,
                height: mids * 10.0,
            });
        }
    }
}

/// A rippling water effect.
///
/// References:
/// * <https://mikro.naprvyraz.sk/docs/Coding/1/WATER.TXT>
/// * <https://github.com/Zygo/xscreensaver/blob/master/hacks/ripples.c>
pub struct WaterEffect {
    params: WaterParams,
    bass_damp: f32,
    highs_damp: f32,
    canvas: HsvCanvas,
    bass: RippleSim,
    highs: RippleSim,
    audio: Arc<WaterAudio>,
}

impl WaterEffect {
    pub fn new(params: WaterParams) -> Self {
        Self {
            bass_damp: damp_factor(params.bass_viscosity),
            highs_damp: damp_factor(params.highs_viscosity),
            params,
            canvas: HsvCanvas::default(),
            bass: RippleSim::new(0),
            highs: RippleSim::new(0),
            audio: Arc::new(WaterAudio {
                active: AtomicBool::new(false),
                pixel_count: AtomicUsize::new(0),
                state: Mutex::new(AudioState::new()),
                lows_power: AtomicF32::new(0.0),
                mids_power: AtomicF32::new(0.0),
                drops: EventQueue::new(),
            }),
        }
    }

    pub fn params(&self) -> &WaterParams {
        &self.params
    }

    /// Smoothed low-band power as last published by the audio half.
    pub fn lows_power(&self) -> f32 {
        self.audio.lows_power.load(Ordering::Relaxed)
    }

    /// Smoothed mid plus high band power as last published by the audio half.
    pub fn mids_power(&self) -> f32 {
        self.audio.mids_power.load(Ordering::Relaxed)
    }

    /// Drops queued by the audio half and not yet rendered.
    pub fn pending_drops(&self) -> usize {
        self.audio.drops.len()
    }

    fn apply_params(&mut self) {
        self.bass_damp = damp_factor(self.params.bass_viscosity);
        self.highs_damp = damp_factor(self.params.highs_viscosity);
        let mut state = lock(&self.audio.state);
        self.audio.reset(&mut state);
    }
}

impl Default for WaterEffect {
    fn default() -> Self {
        Self::new(WaterParams::default())
    }
}

impl Effect for WaterEffect {
    fn effect_type(&self) -> EffectType {
        EffectType::Water
    }

    fn activate(&mut self, pixel_count: usize) {
        debug_assert!(!self.is_active(), "water effect activated twice");
        self.canvas = HsvCanvas::allocate(pixel_count);
        self.canvas.fill_saturation(1.0);
        self.bass = RippleSim::new(pixel_count);
        self.highs = RippleSim::new(pixel_count);

        let mut state = lock(&self.audio.state);
        self.audio.reset(&mut state);
        self.audio.pixel_count.store(pixel_count, Ordering::Release);
        self.audio.active.store(true, Ordering::Release);
    }

    fn deactivate(&mut self) {
        {
            let mut state = lock(&self.audio.state);
            self.audio.active.store(false, Ordering::Release);
            self.audio.reset(&mut state);
        }
        self.canvas.release();
        self.bass = RippleSim::new(0);
        self.highs = RippleSim::new(0);
    }

    fn is_active(&self) -> bool {
        self.audio.active.load(Ordering::Acquire)
    }

    fn pixel_count(&self) -> usize {
        self.canvas.len()
    }

    fn config_updated(&mut self, config: &Value) -> Result<(), EffectError> {
        self.params = WaterParams::from_config(config)?;
        self.apply_params();
        Ok(())
    }

    fn config(&self) -> Value {
        serde_json::to_value(&self.params).unwrap_or(Value::Null)
    }

    fn render(&mut self) {
        for splash in self.audio.drops.drain() {
            let sim = match splash.surface {
                Surface::Bass => &mut self.bass,
                Surface::Highs => &mut self.highs,
            };
            sim.drop_at(splash.position, splash.height);
        }

        self.bass.step(self.bass_damp);
        self.highs.step(self.highs_damp);

        let (hue, value): (Vec<f32>, Vec<f32>) = self
            .bass
            .current()
            .iter()
            .zip(self.highs.current())
            .map(|(&bass, &highs)| (bass + 1.0 - highs, (bass + highs).abs().min(1.0)))
            .unzip();

        self.canvas.set_hue(&hue);
        self.canvas.set_value(&value);
        self.canvas.commit();
    }

    fn pixels(&self) -> &[Pixel] {
        self.canvas.pixels()
    }

    fn is_dirty(&self) -> bool {
        self.canvas.is_dirty()
    }

    fn set_dirty(&mut self, dirty: bool) {
        self.canvas.set_dirty(dirty);
    }

    fn audio_input(&self) -> Option<Arc<dyn AudioReactive>> {
        Some(self.audio.clone() as Arc<dyn AudioReactive>)
    }
}
