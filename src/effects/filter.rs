//! Asymmetric exponential smoothing for audio control signals.

/// Exponential filter with separate rise and decay rates.
///
/// `alpha_rise` applies when a sample is above the current value, `alpha_decay`
/// otherwise. A high rise rate with a low decay rate gives a fast attack and
/// a slow release.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpFilter {
    alpha_rise: f32,
    alpha_decay: f32,
    value: f32,
}

impl ExpFilter {
    /// Create a filter at the zero baseline.
    ///
    /// Both alphas must lie in `(0, 1]`.
    pub fn new(alpha_rise: f32, alpha_decay: f32) -> Self {
        debug_assert!(alpha_rise > 0.0 && alpha_rise <= 1.0, "alpha_rise out of range");
        debug_assert!(alpha_decay > 0.0 && alpha_decay <= 1.0, "alpha_decay out of range");
        Self {
            alpha_rise,
            alpha_decay,
            value: 0.0,
        }
    }

    /// Feed one sample and return the smoothed value.
    #[inline]
    pub fn update(&mut self, sample: f32) -> f32 {
        let alpha = if sample > self.value {
            self.alpha_rise
        } else {
            self.alpha_decay
        };
        self.value += alpha * (sample - self.value);
        self.value
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Return to the zero baseline, keeping the rates.
    pub fn reset(&mut self) {
        self.value = 0.0;
    }

    pub fn alpha_rise(&self) -> f32 {
        self.alpha_rise
    }

    pub fn alpha_decay(&self) -> f32 {
        self.alpha_decay
    }
}
