//! Huxley melt effect.
//!
//! A slowly melting hue/value field whose speed is warped by bass power, with
//! white strobes dropped at random positions on percussive onsets. Strobes
//! fade and blur out over the following frames.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use atomic_float::AtomicF32;
use serde_json::Value;

use super::hsv::{array_sin, gaussian_smooth, linspace, time_cycle, HsvCanvas};
use super::shared::{lock, Rng};
use super::{AudioReactive, Effect, EffectError, EffectType, EventQueue, ExpFilter, Pixel};
use crate::audio::FeatureFrame;
use crate::config::Params;
use crate::effects::params::HuxleyMeltParams;

/// Bass-driven time warp, in nanoseconds per unit of `lows * reactivity * speed`.
const TIME_WARP_NS: f64 = 1e8;

/// Chance of the melt reversing on a loud bass frame.
const DIRECTION_FLIP_ODDS: usize = 200;

/// A percussive onset that passed the strobe gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Strobe;

struct AudioState {
    lows_filter: ExpFilter,
    mids_filter: ExpFilter,
    rng: Rng,
    last_strobe: Option<Instant>,
    strobe_cutoff: f32,
    strobe_wait: Duration,
}

impl AudioState {
    fn new(params: &HuxleyMeltParams) -> Self {
        Self {
            lows_filter: ExpFilter::new(0.1, 0.1),
            mids_filter: ExpFilter::new(0.1, 0.1),
            rng: Rng::new(0x4d45_4c54),
            last_strobe: None,
            strobe_cutoff: params.strobe_threshold / 10.0,
            strobe_wait: Duration::from_secs_f32((1.0 - params.strobe_rate).max(0.0)),
        }
    }

    fn strobe_ready(&self, now: Instant) -> bool {
        self.last_strobe
            .map_or(true, |last| now.duration_since(last) >= self.strobe_wait)
    }
}

/// Audio half of [`HuxleyMeltEffect`].
struct MeltAudio {
    active: AtomicBool,
    state: Mutex<AudioState>,
    lows_power: AtomicF32,
    mids_power: AtomicF32,
    direction: AtomicF32,
    strobes: EventQueue<Strobe>,
}

impl MeltAudio {
    fn reset(&self, state: &mut AudioState, params: &HuxleyMeltParams) {
        *state = AudioState::new(params);
        self.lows_power.store(0.0, Ordering::Relaxed);
        self.mids_power.store(0.0, Ordering::Relaxed);
        self.direction.store(1.0, Ordering::Relaxed);
    }
}

impl AudioReactive for MeltAudio {
    fn audio_data_updated(&self, data: &FeatureFrame) {
        let mut state = lock(&self.state);
        if !self.active.load(Ordering::Acquire) {
            return;
        }

        let lows = state.lows_filter.update(data.lows_power(false));
        self.lows_power.store(lows, Ordering::Relaxed);

        if lows > state.strobe_cutoff && state.rng.next_range(0, DIRECTION_FLIP_ODDS) == 0 {
            self.direction.store(-self.direction.load(Ordering::Relaxed), Ordering::Relaxed);
        }

        let intensities = data.thirds_peak_intensity();
        let mids = state.mids_filter.update(data.mids_power(true));
        self.mids_power.store(mids, Ordering::Relaxed);

        let now = Instant::now();
        if data.onset() && state.strobe_ready(now) && intensities[2] > state.strobe_cutoff {
            self.strobes.push(Strobe);
            state.last_strobe = Some(now);
        }
    }
}

/// Melting hue field with percussive strobes.
pub struct HuxleyMeltEffect {
    params: HuxleyMeltParams,
    canvas: HsvCanvas,
    overlay: Vec<f32>,
    timestep: f64,
    last_time: Instant,
    rng: Rng,
    strobes_fired: u64,
    audio: Arc<MeltAudio>,
}

impl HuxleyMeltEffect {
    pub fn new(params: HuxleyMeltParams) -> Self {
        let state = AudioState::new(&params);
        Self {
            params,
            canvas: HsvCanvas::default(),
            overlay: Vec::new(),
            timestep: 0.0,
            last_time: Instant::now(),
            rng: Rng::new(0x5742_0be5),
            strobes_fired: 0,
            audio: Arc::new(MeltAudio {
                active: AtomicBool::new(false),
                state: Mutex::new(state),
                lows_power: AtomicF32::new(0.0),
                mids_power: AtomicF32::new(0.0),
                direction: AtomicF32::new(1.0),
                strobes: EventQueue::new(),
            }),
        }
    }

    pub fn params(&self) -> &HuxleyMeltParams {
        &self.params
    }

    pub fn lows_power(&self) -> f32 {
        self.audio.lows_power.load(Ordering::Relaxed)
    }

    pub fn mids_power(&self) -> f32 {
        self.audio.mids_power.load(Ordering::Relaxed)
    }

    /// `1.0` or `-1.0`; the direction the melt currently runs.
    pub fn direction(&self) -> f32 {
        self.audio.direction.load(Ordering::Relaxed)
    }

    /// Strobes queued by the audio half and not yet rendered.
    pub fn pending_strobes(&self) -> usize {
        self.audio.strobes.len()
    }

    /// Strobes placed onto the overlay since activation.
    pub fn strobes_fired(&self) -> u64 {
        self.strobes_fired
    }

    fn fire_strobe(&mut self) {
        let pixel_count = self.overlay.len();
        let width = self.params.strobe_width.min(pixel_count);
        let position = self.rng.next_range(0, pixel_count - width);
        self.overlay[position..position + width].fill(1.0);
        self.strobes_fired += 1;
    }

    fn render_with_dt(&mut self, dt_ns: f64) {
        let pixel_count = self.canvas.len();
        let speed = self.params.speed;
        let lows = self.audio.lows_power.load(Ordering::Relaxed);
        let mids = self.audio.mids_power.load(Ordering::Relaxed);
        let direction = self.audio.direction.load(Ordering::Relaxed);

        self.timestep += dt_ns;
        self.timestep += (lows * self.params.reactivity * speed) as f64 * TIME_WARP_NS;

        let t1 = time_cycle(speed * 20.0, self.timestep);
        let t2 = lows * self.params.reactivity * 0.5;

        let mut hue = linspace(0.0, 1.0, pixel_count);
        hue.iter_mut().for_each(|h| *h = 1.0 - *h);
        array_sin(&mut hue);
        let mut value = hue.clone();
        array_sin(&mut hue);

        array_sin(&mut value);
        value.iter_mut().for_each(|v| *v += t1 * direction);
        array_sin(&mut value);
        value.iter_mut().for_each(|v| *v += t2 * direction);
        array_sin(&mut value);

        let power = 5.0 - mids.clamp(0.0, 1.0) * 5.0;
        let bg_bright = self.params.bg_bright;
        value.iter_mut().for_each(|v| *v = v.powf(power) * bg_bright);

        for Strobe in self.audio.strobes.drain() {
            self.fire_strobe();
        }

        let saturation: Vec<f32> = self.overlay.iter().map(|o| 1.0 - o).collect();
        for (v, o) in value.iter_mut().zip(&self.overlay) {
            *v = (*v + o).min(1.0);
        }

        self.canvas.set_hue(&hue);
        self.canvas.set_saturation(&saturation);
        self.canvas.set_value(&value);
        self.canvas.commit();

        let decay = 1.0 - self.params.strobe_decay_rate;
        self.overlay.iter_mut().for_each(|o| *o *= decay);
        self.overlay = gaussian_smooth(&self.overlay, self.params.strobe_blur);
    }
}

impl Default for HuxleyMeltEffect {
    fn default() -> Self {
        Self::new(HuxleyMeltParams::default())
    }
}

impl Effect for HuxleyMeltEffect {
    fn effect_type(&self) -> EffectType {
        EffectType::HuxleyMelt
    }

    fn activate(&mut self, pixel_count: usize) {
        debug_assert!(!self.is_active(), "huxley melt activated twice");
        self.canvas = HsvCanvas::allocate(pixel_count);
        self.overlay = vec![0.0; pixel_count];
        self.timestep = 0.0;
        self.last_time = Instant::now();
        self.strobes_fired = 0;

        let mut state = lock(&self.audio.state);
        self.audio.reset(&mut state, &self.params);
        self.audio.strobes.clear();
        self.audio.active.store(true, Ordering::Release);
    }

    fn deactivate(&mut self) {
        {
            let mut state = lock(&self.audio.state);
            self.audio.active.store(false, Ordering::Release);
            self.audio.reset(&mut state, &self.params);
            self.audio.strobes.clear();
        }
        self.canvas.release();
        self.overlay = Vec::new();
    }

    fn is_active(&self) -> bool {
        self.audio.active.load(Ordering::Acquire)
    }

    fn pixel_count(&self) -> usize {
        self.canvas.len()
    }

    fn config_updated(&mut self, config: &Value) -> Result<(), EffectError> {
        self.params = HuxleyMeltParams::from_config(config)?;
        let mut state = lock(&self.audio.state);
        self.audio.reset(&mut state, &self.params);
        Ok(())
    }

    fn config(&self) -> Value {
        serde_json::to_value(&self.params).unwrap_or(Value::Null)
    }

    fn render(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_time);
        self.last_time = now;
        self.render_with_dt(dt.as_nanos() as f64);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::BandPower;
    use serde_json::json;

    fn onset_frame() -> FeatureFrame {
        FeatureFrame {
            melbank_highs: vec![0.2, 0.9, 0.4],
            onset: true,
            ..Default::default()
        }
    }

    fn eager_melt() -> HuxleyMeltEffect {
        HuxleyMeltEffect::new(HuxleyMeltParams {
            strobe_rate: 1.0,
            ..Default::default()
        })
    }

    #[test]
    fn test_each_onset_fires_exactly_one_strobe() {
        let mut effect = eager_melt();
        effect.activate(60);
        let audio = effect.audio_input().unwrap();

        for _ in 0..5 {
            audio.audio_data_updated(&onset_frame());
        }
        assert_eq!(effect.pending_strobes(), 5);

        effect.render_with_dt(16e6);
        assert_eq!(effect.strobes_fired(), 5);
        assert_eq!(effect.pending_strobes(), 0);

        effect.render_with_dt(16e6);
        assert_eq!(effect.strobes_fired(), 5);
    }

    #[test]
    fn test_onset_gate_requires_loud_highs() {
        let mut effect = eager_melt();
        effect.activate(30);
        let audio = effect.audio_input().unwrap();

        let quiet = FeatureFrame {
            melbank_highs: vec![0.1, 0.2],
            onset: true,
            ..Default::default()
        };
        audio.audio_data_updated(&quiet);
        audio.audio_data_updated(&FeatureFrame {
            onset: false,
            ..onset_frame()
        });
        assert_eq!(effect.pending_strobes(), 0);
    }

    #[test]
    fn test_strobe_wait_limits_rate() {
        let mut effect = HuxleyMeltEffect::new(HuxleyMeltParams {
            strobe_rate: 0.0,
            ..Default::default()
        });
        effect.activate(30);
        let audio = effect.audio_input().unwrap();

        audio.audio_data_updated(&onset_frame());
        audio.audio_data_updated(&onset_frame());
        audio.audio_data_updated(&onset_frame());
        assert_eq!(effect.pending_strobes(), 1);
    }

    #[test]
    fn test_strobe_desaturates_and_brightens() {
        let mut effect = HuxleyMeltEffect::new(HuxleyMeltParams {
            strobe_rate: 1.0,
            strobe_width: 200,
            strobe_blur: 0.0,
            ..Default::default()
        });
        effect.activate(20);
        let audio = effect.audio_input().unwrap();
        audio.audio_data_updated(&onset_frame());

        effect.render_with_dt(0.0);
        for pixel in effect.pixels() {
            assert!(pixel.iter().all(|c| (c - 255.0).abs() < 0.01), "{:?}", pixel);
        }

        // Overlay decays to 0.75 with the default decay rate.
        assert!(effect.overlay.iter().all(|o| (o - 0.75).abs() < 1e-6));
    }

    #[test]
    fn test_render_stays_in_range() {
        let mut effect = eager_melt();
        effect.activate(50);
        let audio = effect.audio_input().unwrap();

        for i in 0..120 {
            let frame = FeatureFrame {
                lows: BandPower::new((i % 4) as f32 * 0.4, 0.0),
                mids: BandPower::new(0.0, 1.5),
                onset: i % 3 == 0,
                melbank_highs: vec![0.95],
                ..Default::default()
            };
            audio.audio_data_updated(&frame);
            effect.render_with_dt(16e6);
            assert!(effect.is_dirty());
            for pixel in effect.pixels() {
                assert!(pixel.iter().all(|c| c.is_finite() && (0.0..=255.0).contains(c)));
            }
        }
    }

    #[test]
    fn test_config_updated_is_idempotent() {
        let mut effect = HuxleyMeltEffect::default();
        effect.activate(30);
        let audio = effect.audio_input().unwrap();
        audio.audio_data_updated(&FeatureFrame {
            lows: BandPower::new(1.0, 1.0),
            ..Default::default()
        });
        assert!(effect.lows_power() > 0.0);

        let config = json!({"strobe_threshold": 0.5, "strobe_rate": 0.25});
        let snapshot = |effect: &HuxleyMeltEffect| {
            let state = lock(&effect.audio.state);
            (
                effect.params.clone(),
                state.strobe_cutoff,
                state.strobe_wait,
                state.last_strobe,
                effect.lows_power(),
                effect.mids_power(),
                effect.direction(),
            )
        };

        effect.config_updated(&config).unwrap();
        let once = snapshot(&effect);
        effect.config_updated(&config).unwrap();
        let twice = snapshot(&effect);

        assert_eq!(once, twice);
        assert!((once.1 - 0.05).abs() < 1e-6);
        assert_eq!(once.2, Duration::from_secs_f32(0.75));
        assert_eq!(once.4, 0.0);
        assert_eq!(once.6, 1.0);
    }

    #[test]
    fn test_deactivate_discards_pending_strobes() {
        let mut effect = eager_melt();
        effect.activate(30);
        let audio = effect.audio_input().unwrap();
        audio.audio_data_updated(&onset_frame());
        audio.audio_data_updated(&onset_frame());

        effect.deactivate();
        assert_eq!(effect.pending_strobes(), 0);

        audio.audio_data_updated(&onset_frame());
        assert_eq!(effect.pending_strobes(), 0);

        effect.activate(30);
        assert_eq!(effect.strobes_fired(), 0);
        assert_eq!(effect.lows_power(), 0.0);
    }
}
