//! Space station effect: a red segment sweeping along the strip.

use std::time::Instant;

use serde_json::Value;

use super::hsv::HsvCanvas;
use super::{Effect, EffectError, EffectType, Pixel};
use crate::config::Params;
use crate::effects::params::SpaceStationParams;

/// One full sweep, in nanoseconds of `dt * speed`.
const SWEEP_NS: f64 = 1e9;

/// A lit segment sweeping the strip once per `1 / speed` seconds.
pub struct SpaceStationEffect {
    params: SpaceStationParams,
    canvas: HsvCanvas,
    position: f64,
    last_time: Instant,
    active: bool,
}

impl SpaceStationEffect {
    pub fn new(params: SpaceStationParams) -> Self {
        Self {
            params,
            canvas: HsvCanvas::default(),
            position: 0.0,
            last_time: Instant::now(),
            active: false,
        }
    }

    pub fn params(&self) -> &SpaceStationParams {
        &self.params
    }

    /// First lit pixel for the current sweep position, or `None` during the pause.
    ///
    /// The segment never reaches the final slot, so a segment as wide as the
    /// strip stays dark.
    fn lit_start(&self) -> Option<usize> {
        let pixel_count = self.canvas.len();
        let width = self.params.strobe_width.min(pixel_count);
        let slots = pixel_count + self.params.delay_width - width;
        let index = (self.position / SWEEP_NS * slots as f64) as usize;
        (index + width < pixel_count && width > 0).then_some(index)
    }

    fn render_with_dt(&mut self, dt_ns: f64) {
        self.position += dt_ns * self.params.speed as f64;
        self.position %= SWEEP_NS;

        let pixel_count = self.canvas.len();
        let mut value = vec![0.0f32; pixel_count];
        if let Some(start) = self.lit_start() {
            let width = self.params.strobe_width.min(pixel_count);
            value[start..start + width].fill(1.0);
        }
        if self.params.mirror {
            let reversed: Vec<f32> = value.iter().rev().copied().collect();
            for (v, r) in value.iter_mut().zip(reversed) {
                *v = v.max(r);
            }
        }

        self.canvas.set_value(&value);
        self.canvas.commit();
    }
}

impl Default for SpaceStationEffect {
    fn default() -> Self {
        Self::new(SpaceStationParams::default())
    }
}

impl Effect for SpaceStationEffect {
    fn effect_type(&self) -> EffectType {
        EffectType::SpaceStation
    }

    fn activate(&mut self, pixel_count: usize) {
        self.canvas = HsvCanvas::allocate(pixel_count);
        self.canvas.fill_saturation(1.0);
        self.position = 0.0;
        self.last_time = Instant::now();
        self.active = true;
    }

    fn deactivate(&mut self) {
        self.canvas.release();
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn pixel_count(&self) -> usize {
        self.canvas.len()
    }

    fn config_updated(&mut self, config: &Value) -> Result<(), EffectError> {
        self.params = SpaceStationParams::from_config(config)?;
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
}
