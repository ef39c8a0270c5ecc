//! Damped 1-D wave propagation over a pixel span.
//!
//! Classic two-plane "water" ripple: each pass reads the source plane and
//! overwrites the destination plane, whose previous contents act as the
//! velocity term. The planes swap roles every pass.
//!
//! References:
//! * <https://mikro.naprvyraz.sk/docs/Coding/1/WATER.TXT>
//! * <https://github.com/Zygo/xscreensaver/blob/master/hacks/ripples.c>

/// Damping factor for a viscosity exponent: `2^viscosity`.
///
/// Higher viscosity means a larger factor, so less damping per pass.
pub fn damp_factor(viscosity: u32) -> f32 {
    2f32.powi(viscosity as i32)
}

/// Double-buffered wave simulation. Endpoints are fixed boundaries.
#[derive(Debug, Clone)]
pub struct RippleSim {
    planes: [Vec<f32>; 2],
    current: usize,
}

impl RippleSim {
    pub fn new(pixel_count: usize) -> Self {
        Self {
            planes: [vec![0.0; pixel_count], vec![0.0; pixel_count]],
            current: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.planes[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes[0].is_empty()
    }

    /// The plane written by the most recent [`step`](Self::step).
    pub fn current(&self) -> &[f32] {
        &self.planes[self.current]
    }

    /// Deposit `height` on `position` and both neighbours, in both planes.
    ///
    /// Writing both planes makes the drop visible whichever plane becomes the
    /// source on the next flip. Positions are clamped to the interior; spans
    /// shorter than three cells ignore drops.
    pub fn drop_at(&mut self, position: usize, height: f32) {
        let len = self.len();
        if len < 3 {
            return;
        }
        let position = position.clamp(1, len - 2);
        for plane in &mut self.planes {
            plane[position - 1] = height;
            plane[position] = height;
            plane[position + 1] = height;
        }
    }

    /// Flip planes and run one propagation, smoothing and damping pass.
    pub fn step(&mut self, damp_factor: f32) {
        self.current = 1 - self.current;
        let len = self.len();
        if len < 3 {
            return;
        }

        let (first, second) = self.planes.split_at_mut(1);
        let (src, dest) = if self.current == 0 {
            (&second[0], &mut first[0])
        } else {
            (&first[0], &mut second[0])
        };

        for i in 1..len - 1 {
            dest[i] = (src[i - 1] + src[i + 1] + src[i] * 2.0) / 2.0 - dest[i];
        }

        // Left to right in place: each cell sees its already-smoothed left neighbour.
        for i in 1..len - 1 {
            let avg = (dest[i - 1] + dest[i + 1] + dest[i]) / 3.0;
            dest[i] = avg - avg / damp_factor;
        }
    }

    /// Zero both planes.
    pub fn clear(&mut self) {
        for plane in &mut self.planes {
            plane.fill(0.0);
        }
        self.current = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(values: &[f32]) -> f32 {
        values.iter().map(|v| v.abs()).fold(0.0, f32::max)
    }

    #[test]
    fn test_damp_factor_from_viscosity() {
        assert_eq!(damp_factor(0), 1.0);
        assert_eq!(damp_factor(3), 8.0);
        assert_eq!(damp_factor(9), 512.0);
    }

    #[test]
    fn test_drop_writes_both_planes() {
        let mut sim = RippleSim::new(8);
        sim.drop_at(4, 2.0);
        assert_eq!(&sim.planes[0][3..6], &[2.0, 2.0, 2.0]);
        assert_eq!(&sim.planes[1][3..6], &[2.0, 2.0, 2.0]);
        assert_eq!(sim.planes[0][2], 0.0);
    }

    #[test]
    fn test_drop_position_is_clamped() {
        let mut sim = RippleSim::new(5);
        sim.drop_at(0, 1.0);
        assert_eq!(&sim.current()[..3], &[1.0, 1.0, 1.0]);
        sim.drop_at(100, 3.0);
        assert_eq!(&sim.current()[2..], &[3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_short_span_ignores_drops() {
        let mut sim = RippleSim::new(2);
        sim.drop_at(1, 1.0);
        sim.step(8.0);
        assert_eq!(sim.current(), &[0.0, 0.0]);
    }

    #[test]
    fn test_recurrence_first_pass() {
        // Drop of 1.0 at cells 2..=4 of a 7 cell span, both planes equal.
        let mut sim = RippleSim::new(7);
        sim.drop_at(3, 1.0);
        sim.step(f32::INFINITY);

        // Propagation: (l + r + 2c) / 2 - previous dest
        let propagated = [0.0, 0.5, 0.5, 1.0, 0.5, 0.5, 0.0];
        // Sequential 3-tap smoothing with no damping
        let mut expected = propagated;
        for i in 1..6 {
            expected[i] = (expected[i - 1] + expected[i + 1] + expected[i]) / 3.0;
        }
        for (got, want) in sim.current().iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-6, "got {got}, want {want}");
        }
    }

    #[test]
    fn test_planes_alternate() {
        let mut sim = RippleSim::new(6);
        assert_eq!(sim.current, 0);
        sim.step(8.0);
        assert_eq!(sim.current, 1);
        sim.step(8.0);
        assert_eq!(sim.current, 0);
    }

    #[test]
    fn test_endpoints_are_fixed() {
        let mut sim = RippleSim::new(10);
        sim.drop_at(5, 1.0);
        for _ in 0..50 {
            sim.step(8.0);
            assert_eq!(sim.current()[0], 0.0);
            assert_eq!(sim.current()[9], 0.0);
        }
    }

    #[test]
    fn test_clear_zeroes_everything() {
        let mut sim = RippleSim::new(10);
        sim.drop_at(5, 1.0);
        sim.step(8.0);
        sim.clear();
        assert_eq!(peak(sim.current()), 0.0);
        sim.step(8.0);
        assert_eq!(peak(sim.current()), 0.0);
    }
}
