//! HSV rendering model shared by the field-generating effects.
//!
//! Effects write hue, saturation and value per pixel into an [`HsvCanvas`]
//! and call [`HsvCanvas::commit`] to produce RGB pixels in `0..=255`.

use std::f32::consts::TAU;

use palette::{FromColor, Hsv, Srgb};

use super::Pixel;

/// Working buffers for an HSV effect: one HSV triple and one RGB pixel per LED.
#[derive(Debug, Clone, Default)]
pub struct HsvCanvas {
    hsv: Vec<[f32; 3]>,
    pixels: Vec<Pixel>,
    dirty: bool,
}

impl HsvCanvas {
    /// Allocate buffers for `pixel_count` LEDs, all black.
    pub fn allocate(pixel_count: usize) -> Self {
        Self {
            hsv: vec![[0.0; 3]; pixel_count],
            pixels: vec![[0.0; 3]; pixel_count],
            dirty: false,
        }
    }

    /// Drop the buffers.
    pub fn release(&mut self) {
        self.hsv = Vec::new();
        self.pixels = Vec::new();
        self.dirty = false;
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn set_hue(&mut self, hue: &[f32]) {
        for (cell, &h) in self.hsv.iter_mut().zip(hue) {
            cell[0] = h;
        }
    }

    pub fn set_saturation(&mut self, saturation: &[f32]) {
        for (cell, &s) in self.hsv.iter_mut().zip(saturation) {
            cell[1] = s;
        }
    }

    pub fn set_value(&mut self, value: &[f32]) {
        for (cell, &v) in self.hsv.iter_mut().zip(value) {
            cell[2] = v;
        }
    }

    pub fn fill_saturation(&mut self, saturation: f32) {
        for cell in &mut self.hsv {
            cell[1] = saturation;
        }
    }

    pub fn hsv(&self) -> &[[f32; 3]] {
        &self.hsv
    }

    /// Convert the HSV field to RGB pixels and mark the frame dirty.
    pub fn commit(&mut self) {
        for (pixel, &[h, s, v]) in self.pixels.iter_mut().zip(&self.hsv) {
            *pixel = hsv_to_rgb(h, s, v);
        }
        self.dirty = true;
    }

    /// Write RGB pixels directly, bypassing the HSV field.
    pub fn commit_rgb(&mut self, color: Pixel) {
        self.pixels.fill(color);
        self.dirty = true;
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }
}

/// HSV (each in `[0, 1]`, hue wrapping) to RGB in `0..=255`.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Pixel {
    let hsv: Hsv = Hsv::new(h.rem_euclid(1.0) * 360.0, s.clamp(0.0, 1.0), v.clamp(0.0, 1.0));
    let rgb: Srgb = Srgb::from_color(hsv);
    [rgb.red, rgb.green, rgb.blue].map(|c| (c * 255.0).clamp(0.0, 255.0))
}

/// One sine period per unit mapped into `[0, 1]`, in place.
pub fn array_sin(values: &mut [f32]) {
    for v in values {
        *v = 0.5 + 0.5 * (*v * TAU).sin();
    }
}

/// Phase in `[0, 1)` of a cycle lasting `100 / modifier` seconds, after
/// `timestep_ns` nanoseconds of (possibly warped) time.
pub fn time_cycle(modifier: f32, timestep_ns: f64) -> f32 {
    (timestep_ns * 1e-9 * modifier as f64 / 100.0).rem_euclid(1.0) as f32
}

/// Evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f32, end: f32, count: usize) -> Vec<f32> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f32;
            (0..count).map(|i| start + step * i as f32).collect()
        }
    }
}

/// Gaussian blur with edge clamping. `sigma <= 0` leaves the input untouched.
pub fn gaussian_smooth(values: &[f32], sigma: f32) -> Vec<f32> {
    if sigma <= 0.0 || values.is_empty() {
        return values.to_vec();
    }

    let radius = (3.0 * sigma).round().max(1.0) as isize;
    let kernel: Vec<f32> = (-radius..=radius)
        .map(|k| (-(k * k) as f32 / (2.0 * sigma * sigma)).exp())
        .collect();
    let norm: f32 = kernel.iter().sum();

    let last = values.len() as isize - 1;
    (0..values.len() as isize)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let idx = (i + k as isize - radius).clamp(0, last) as usize;
                    values[idx] * w
                })
                .sum::<f32>()
                / norm
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Pixel, b: Pixel) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 0.01)
    }

    #[test]
    fn test_hsv_primaries() {
        assert!(approx(hsv_to_rgb(0.0, 1.0, 1.0), [255.0, 0.0, 0.0]));
        assert!(approx(hsv_to_rgb(1.0 / 3.0, 1.0, 1.0), [0.0, 255.0, 0.0]));
        assert!(approx(hsv_to_rgb(2.0 / 3.0, 1.0, 1.0), [0.0, 0.0, 255.0]));
        assert!(approx(hsv_to_rgb(1.0, 1.0, 1.0), [255.0, 0.0, 0.0]));
    }

    #[test]
    fn test_hsv_grey_and_black() {
        assert!(approx(hsv_to_rgb(0.4, 0.0, 0.5), [127.5, 127.5, 127.5]));
        assert!(approx(hsv_to_rgb(0.7, 1.0, 0.0), [0.0, 0.0, 0.0]));
    }

    #[test]
    fn test_array_sin_range() {
        let mut values = linspace(-2.0, 2.0, 101);
        array_sin(&mut values);
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!((values[50] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_hue_wraps_outside_unit_range() {
        assert!(approx(hsv_to_rgb(1.5, 1.0, 1.0), hsv_to_rgb(0.5, 1.0, 1.0)));
        assert!(approx(hsv_to_rgb(-0.25, 1.0, 1.0), hsv_to_rgb(0.75, 1.0, 1.0)));
        assert!(approx(hsv_to_rgb(0.5, 1.0, 1.0), [0.0, 255.0, 255.0]));
    }

    #[test]
    fn test_out_of_range_saturation_and_value_clamp() {
        assert!(approx(hsv_to_rgb(0.0, 2.0, 3.0), [255.0, 0.0, 0.0]));
        assert!(approx(hsv_to_rgb(0.3, 0.5, -1.0), [0.0, 0.0, 0.0]));
    }

    #[test]
    fn test_time_cycle_wraps() {
        assert_eq!(time_cycle(10.0, 0.0), 0.0);
        assert!((time_cycle(10.0, 5e9) - 0.5).abs() < 1e-6);
        assert!((time_cycle(10.0, 12.5e9) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_linspace_endpoints() {
        let values = linspace(0.0, 1.0, 5);
        assert_eq!(values, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(3.0, 1.0, 1), vec![3.0]);
    }

    #[test]
    fn test_gaussian_smooth_spreads_and_preserves_constant() {
        let flat = vec![0.7; 16];
        let smoothed = gaussian_smooth(&flat, 2.0);
        assert!(smoothed.iter().all(|v| (v - 0.7).abs() < 1e-5));

        let mut spike = vec![0.0; 21];
        spike[10] = 1.0;
        let smoothed = gaussian_smooth(&spike, 1.5);
        assert!(smoothed[10] < 1.0);
        assert!(smoothed[9] > 0.0 && smoothed[11] > 0.0);
        assert!((smoothed[9] - smoothed[11]).abs() < 1e-6);
    }

    #[test]
    fn test_canvas_commit_sets_dirty() {
        let mut canvas = HsvCanvas::allocate(4);
        assert!(!canvas.is_dirty());
        canvas.set_value(&[1.0; 4]);
        canvas.commit();
        assert!(canvas.is_dirty());
        assert!(canvas.pixels().iter().all(|p| approx(*p, [255.0, 255.0, 255.0])));

        canvas.release();
        assert!(canvas.is_empty());
        assert!(!canvas.is_dirty());
    }
}
