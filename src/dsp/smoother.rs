//! # Parameter Smoothers
//!
//! When a user moves a knob, or the host plays back automation, the
//! parameter value jumps. Applying that jump to the audio directly creates a
//! discontinuity you hear as a click or "zipper noise". A smoother sits
//! between the raw value and the signal path and moves toward each new
//! target a little every sample.
//!
//! Two shapes are used here:
//!
//! - [`LinearSmoother`] walks to the target in a fixed number of equal steps
//!   (20 ms by default). Good for gains, mix amounts and filter settings:
//!   the change is over quickly and predictably.
//! - [`OnePoleSmoother`] moves a fixed *fraction* of the remaining distance
//!   each sample, an exponential glide. Delay time uses this with a 200 ms
//!   time constant. Changing the delay time moves the read head, and moving
//!   it quickly resamples the buffer contents (pitch shift) or skips over
//!   them (click). A slow glide turns a jump into a short, tape-like pitch
//!   bend instead.
//!
//! ```text
//! coeff  = 1 - e^(-1 / (time_constant_seconds * sample_rate))
//! value += (target - value) * coeff
//! ```

use std::f32::consts::FRAC_PI_4;

/// Ramps linearly to each new target over a fixed duration.
#[derive(Debug, Clone)]
pub struct LinearSmoother {
    current: f32,
    target: f32,
    step: f32,
    /// Ramp length in samples.
    ramp_len: u32,
    steps_remaining: u32,
}

impl LinearSmoother {
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            step: 0.0,
            ramp_len: 0,
            steps_remaining: 0,
        }
    }

    /// Set how long a ramp lasts. A new length only affects ramps started
    /// afterwards; call [`reset()`](Self::reset) to settle immediately.
    pub fn set_ramp_length(&mut self, sample_rate: f32, seconds: f32) {
        self.ramp_len = (seconds * sample_rate).round().max(0.0) as u32;
    }

    /// Start ramping from the current value toward `target`.
    ///
    /// Setting the same target again does not restart the ramp.
    pub fn set_target(&mut self, target: f32) {
        if target == self.target {
            return;
        }

        self.target = target;
        if self.ramp_len == 0 {
            self.current = target;
            self.steps_remaining = 0;
        } else {
            self.step = (target - self.current) / self.ramp_len as f32;
            self.steps_remaining = self.ramp_len;
        }
    }

    /// Jump straight to `value` with no ramp.
    pub fn reset(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.steps_remaining = 0;
    }

    /// Advance by one sample and return the new value.
    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.steps_remaining > 0 {
            self.steps_remaining -= 1;
            self.current = if self.steps_remaining == 0 {
                // Land exactly on the target regardless of rounding.
                self.target
            } else {
                self.current + self.step
            };
        }
        self.current
    }

    #[cfg(test)]
    fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    #[cfg(test)]
    fn is_smoothing(&self) -> bool {
        self.steps_remaining > 0
    }
}

/// Exponential (one-pole lowpass) glide toward the target.
#[derive(Debug, Clone)]
pub struct OnePoleSmoother {
    current: f32,
    target: f32,
    coeff: f32,
}

impl OnePoleSmoother {
    /// Create a smoother with no smoothing until a time constant is set.
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff: 1.0,
        }
    }

    /// Set the time it takes to cover ~63% of the distance to the target.
    pub fn set_time_constant(&mut self, sample_rate: f32, seconds: f32) {
        self.coeff = if seconds > 0.0 && sample_rate > 0.0 {
            1.0 - (-1.0 / (seconds * sample_rate)).exp()
        } else {
            1.0
        };
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jump straight to `value` with no glide.
    pub fn reset(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    /// Advance by one sample and return the new value.
    #[inline]
    pub fn next(&mut self) -> f32 {
        self.current += (self.target - self.current) * self.coeff;
        self.current
    }

    #[cfg(test)]
    fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn coefficient(&self) -> f32 {
        self.coeff
    }
}

/// Map a stereo spread in `[-1, 1]` to equal-power `(left, right)` gains.
///
/// `-1` is hard left, `0` is center (both gains `1/√2`), `1` is hard right.
/// The gains follow a quarter cosine/sine cycle, so `left² + right² = 1`
/// everywhere and the perceived loudness stays put across the range. A
/// linear crossfade would dip by 3 dB in the middle.
pub fn equal_power_pan(spread: f32) -> (f32, f32) {
    let theta = (spread.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
    (theta.cos(), theta.sin())
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_linear_reaches_target_in_ramp_length() {
        let mut s = LinearSmoother::new(0.0);
        s.set_ramp_length(1000.0, 0.02); // 20 samples
        s.set_target(1.0);

        for i in 1..20 {
            let v = s.next();
            assert!((v - i as f32 / 20.0).abs() < 1e-5, "step {i}: {v}");
            assert!(s.is_smoothing());
        }

        assert_eq!(s.next(), 1.0);
        assert!(!s.is_smoothing());
        assert_eq!(s.next(), 1.0);
    }

    #[test]
    fn test_linear_retarget_starts_from_current_value() {
        let mut s = LinearSmoother::new(0.0);
        s.set_ramp_length(1000.0, 0.01); // 10 samples
        s.set_target(1.0);
        for _ in 0..5 {
            s.next();
        }
        let midway = s.current();

        s.set_target(0.0);
        let v = s.next();
        assert!(v < midway, "should turn around, got {v} after {midway}");
        assert!((midway - v - midway / 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_linear_same_target_does_not_restart() {
        let mut s = LinearSmoother::new(0.0);
        s.set_ramp_length(1000.0, 0.01);
        s.set_target(1.0);
        for _ in 0..9 {
            s.next();
            s.set_target(1.0);
        }
        assert_eq!(s.next(), 1.0);
    }

    #[test]
    fn test_linear_without_ramp_is_instant() {
        let mut s = LinearSmoother::new(0.0);
        s.set_target(0.5);
        assert_eq!(s.current(), 0.5);
    }

    #[test]
    fn test_reset_snaps_without_glide() {
        let mut lin = LinearSmoother::new(0.0);
        lin.set_ramp_length(48000.0, 0.02);
        lin.reset(0.8);
        assert_eq!(lin.next(), 0.8);
        assert_eq!(lin.target(), 0.8);

        let mut pole = OnePoleSmoother::new(0.0);
        pole.set_time_constant(48000.0, 0.2);
        pole.reset(250.0);
        assert_eq!(pole.next(), 250.0);
        assert_eq!(pole.target(), 250.0);
    }

    #[test]
    fn test_one_pole_coefficient() {
        let mut s = OnePoleSmoother::new(0.0);
        s.set_time_constant(48000.0, 0.2);
        let expected = 1.0 - (-1.0_f32 / 9600.0).exp();
        assert!((s.coefficient() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_one_pole_covers_63_percent_in_one_time_constant() {
        let mut s = OnePoleSmoother::new(0.0);
        s.set_time_constant(1000.0, 0.2);
        s.set_target(1.0);

        for _ in 0..200 {
            s.next();
        }

        assert!((s.current() - 0.632).abs() < 0.01, "got {}", s.current());
    }

    #[test]
    fn test_pan_center_is_balanced() {
        let (l, r) = equal_power_pan(0.0);
        assert!((l - r).abs() < 1e-6);
        assert!((l - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_pan_extremes() {
        let (l, r) = equal_power_pan(-1.0);
        assert!((l - 1.0).abs() < 1e-6 && r.abs() < 1e-6);

        let (l, r) = equal_power_pan(1.0);
        assert!(l.abs() < 1e-6 && (r - 1.0).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn pan_is_equal_power(spread in -1.0f32..=1.0f32) {
            let (l, r) = equal_power_pan(spread);
            prop_assert!((l * l + r * r - 1.0).abs() < 1e-5);
            prop_assert!(l >= -1e-6 && r >= -1e-6);
        }

        /// Each step of the delay-time glide moves at most `coeff` times the
        /// size of the jump. It never snaps.
        #[test]
        fn one_pole_slew_is_bounded(
            start in 5.0f32..=5000.0f32,
            target in 5.0f32..=5000.0f32,
        ) {
            let mut s = OnePoleSmoother::new(0.0);
            s.set_time_constant(44100.0, 0.2);
            s.reset(start);
            s.set_target(target);

            // f32 spacing near 5000 is ~5e-4, hence the absolute slack.
            let bound = s.coefficient() * (target - start).abs() * 1.0001 + 1e-3;
            let mut previous = start;
            for _ in 0..2000 {
                let v = s.next();
                prop_assert!((v - previous).abs() <= bound);
                previous = v;
            }
        }
    }
}
