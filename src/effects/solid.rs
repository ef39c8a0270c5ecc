//! Solid colour effect.

use serde_json::Value;

use super::hsv::HsvCanvas;
use super::{Effect, EffectError, EffectType, Pixel};
use crate::config::Params;
use crate::effects::params::SolidParams;

/// Fills the strip with one colour.
///
/// Static: the frame is produced on activation and on every configuration
/// change, never by the device's tick.
pub struct SolidEffect {
    params: SolidParams,
    canvas: HsvCanvas,
    active: bool,
}

impl SolidEffect {
    pub fn new(params: SolidParams) -> Self {
        Self {
            params,
            canvas: HsvCanvas::default(),
            active: false,
        }
    }

    pub fn params(&self) -> &SolidParams {
        &self.params
    }
}

impl Default for SolidEffect {
    fn default() -> Self {
        Self::new(SolidParams::default())
    }
}

impl Effect for SolidEffect {
    fn effect_type(&self) -> EffectType {
        EffectType::Solid
    }

    fn activate(&mut self, pixel_count: usize) {
        self.canvas = HsvCanvas::allocate(pixel_count);
        self.active = true;
        self.render();
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
        self.params = SolidParams::from_config(config)?;
        if self.active {
            self.render();
        }
        Ok(())
    }

    fn config(&self) -> Value {
        serde_json::to_value(&self.params).unwrap_or(Value::Null)
    }

    fn render(&mut self) {
        let color = self.params.color.map(|c| c.clamp(0.0, 255.0));
        self.canvas.commit_rgb(color);
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

    fn is_animated(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_activate_renders_once() {
        let mut effect = SolidEffect::new(SolidParams {
            color: [200.0, 10.0, 0.0],
        });
        effect.activate(4);
        assert!(effect.is_dirty());
        assert_eq!(effect.pixels(), &[[200.0, 10.0, 0.0]; 4]);
    }

    #[test]
    fn test_config_change_marks_dirty_while_active() {
        let mut effect = SolidEffect::default();
        effect.config_updated(&json!({"color": [1, 2, 3]})).unwrap();
        assert!(!effect.is_dirty());

        effect.activate(2);
        effect.set_dirty(false);
        effect.config_updated(&json!({"color": [9, 9, 9]})).unwrap();
        assert!(effect.is_dirty());
        assert_eq!(effect.pixels(), &[[9.0, 9.0, 9.0]; 2]);
    }

    #[test]
    fn test_invalid_color_rejected() {
        let mut effect = SolidEffect::default();
        assert!(effect.config_updated(&json!({"color": "red"})).is_err());
        assert_eq!(effect.params().color, [255.0; 3]);
    }
}
