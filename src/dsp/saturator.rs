//! # Feedback Saturator
//!
//! A soft clipper between the two feedback filters. At low drive it is
//! almost linear; pushed harder, `tanh()` rounds off the peaks of each repeat
//! and adds odd harmonics. Because `|tanh(x)| < 1`, it also keeps a loop with
//! high feedback from running away: the repeats compress instead of growing.
//!
//! ```text
//! y = tanh(drive * x) * post_gain
//! ```

/// Stateless `tanh` waveshaper with pre- and post-gain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Saturator {
    /// Linear gain applied before the curve.
    pub drive: f32,
    /// Linear gain applied after the curve.
    pub post_gain: f32,
}

impl Default for Saturator {
    fn default() -> Self {
        Self {
            drive: 1.0,
            post_gain: 1.0,
        }
    }
}

impl Saturator {
    #[inline]
    pub fn process(&self, input: f32) -> f32 {
        (self.drive * input).tanh() * self.post_gain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_signals_pass_nearly_unchanged() {
        let sat = Saturator::default();
        let out = sat.process(0.01);
        assert!((out - 0.01).abs() < 1e-5, "got {out}");
    }

    #[test]
    fn test_output_is_bounded_by_post_gain() {
        let sat = Saturator { drive: 100.0, post_gain: 0.5 };
        for x in [-10.0, -1.0, 1.0, 10.0, 1e6] {
            assert!(sat.process(x).abs() <= 0.5);
        }
    }

    #[test]
    fn test_curve_is_odd() {
        let sat = Saturator { drive: 4.0, post_gain: 1.0 };
        for x in [0.1, 0.3, 0.9] {
            assert!((sat.process(x) + sat.process(-x)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_zero_in_zero_out() {
        let sat = Saturator { drive: 15.85, post_gain: 15.85 };
        assert_eq!(sat.process(0.0), 0.0);
    }
}
