//! # Delay Line (Ring Buffer)
//!
//! A delay line stores audio samples and lets you read them back after a
//! specified time delay. It is the heart of the echo effect: each channel
//! owns one, and the feedback loop writes the processed repeats back into it.
//!
//! ## How the Ring Buffer Works
//!
//! Imagine a circular tape loop. A "write head" records incoming audio
//! onto the tape, and a "read head" plays it back from a position further
//! behind. The distance between the two heads is the delay time.
//!
//! Unlike a write-after-read design, this line always **writes first**:
//!
//! 1. `write()` advances the cursor by one slot (wrapping at the end) and
//!    stores the new sample there. The cursor therefore always points at
//!    the most recently written sample.
//! 2. `read(n)` then looks `n` samples behind the cursor. A delay of `1.0`
//!    returns the sample written on the previous call.
//!
//! ## Hermite (Catmull-Rom) Interpolation
//!
//! Delay times are rarely whole samples: 100 ms at 44.1 kHz is 4410 samples,
//! but a gliding delay time passes through every fractional value in
//! between. Linear interpolation between two neighbours audibly dulls the
//! high end, and rounding to the nearest sample produces zipper noise while
//! the time moves. A 4-point cubic through the two samples on either side of
//! the read position is nearly transparent:
//!
//! ```text
//!   newer                               older
//!     A ─────── B ──── x ──── C ─────── D
//!               └ frac ┘
//! ```
//!
//! `B` and `C` bracket the read position; `A` and `D` supply the slopes.
//! This is why the buffer is two samples longer than the maximum delay and
//! why reads must stay in `[1, len - 2]`.

use nih_plug::prelude::*;

/// Extra slots on top of the requested maximum delay, needed by the
/// outer taps of the Hermite interpolator.
const INTERPOLATION_PADDING: usize = 2;

/// A grow-only ring buffer with fractional-delay reads.
///
/// The buffer is sized in [`set_maximum_delay()`](Self::set_maximum_delay)
/// before audio starts, so no allocation ever happens while processing.
#[derive(Debug, Default)]
pub struct DelayLine {
    /// The circular buffer storing audio samples.
    buffer: Vec<f32>,

    /// Index of the most recently written sample.
    write_index: usize,
}

impl DelayLine {
    /// Create an empty delay line. Until
    /// [`set_maximum_delay()`](Self::set_maximum_delay) is called, writes
    /// are dropped and reads return silence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make room for delays of up to `max_delay_samples` samples.
    ///
    /// The buffer only ever grows: asking for less than the current
    /// capacity keeps the existing allocation. The contents are not
    /// meaningful afterwards, so call [`reset()`](Self::reset) next.
    ///
    /// Must not be called while the audio thread is using the line.
    pub fn set_maximum_delay(&mut self, max_delay_samples: usize) {
        nih_debug_assert!(max_delay_samples > 0);

        let padded_len = max_delay_samples + INTERPOLATION_PADDING;
        if self.buffer.len() < padded_len {
            self.buffer = vec![0.0; padded_len];
            self.write_index = padded_len - 1;
        }
    }

    /// The longest delay (in samples) that [`read()`](Self::read) accepts.
    pub fn capacity(&self) -> f32 {
        self.buffer.len().saturating_sub(INTERPOLATION_PADDING) as f32
    }

    /// Fill the buffer with silence and park the cursor on the last slot,
    /// so the first write lands at index 0.
    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_index = self.buffer.len().saturating_sub(1);
    }

    /// Advance the cursor and store one sample.
    ///
    /// Call exactly once per sample, before the matching `read()`.
    pub fn write(&mut self, sample: f32) {
        let len = self.buffer.len();
        if len == 0 {
            return;
        }

        self.write_index += 1;
        if self.write_index >= len {
            self.write_index = 0;
        }

        self.buffer[self.write_index] = sample;
    }

    /// Read the signal `delay_samples` samples behind the cursor.
    ///
    /// # Precondition
    ///
    /// `1.0 <= delay_samples <= capacity()`. The caller is expected to clamp;
    /// debug builds report violations and the value is clamped here as well
    /// so an out-of-range request can never index past the buffer.
    ///
    /// # The Math
    ///
    /// With `frac` the fractional part of the delay and `A..D` the four taps
    /// from newest to oldest:
    ///
    /// ```text
    /// slope0 = (C - A) / 2          slope1 = (D - B) / 2
    /// v = B - C    w = slope0 + v    a = w + v + slope1    b = w + a
    /// out = ((a * frac - b) * frac + slope0) * frac + B
    /// ```
    ///
    /// At `frac = 0` this collapses to `B`, so whole-sample delays are exact.
    pub fn read(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        if len <= INTERPOLATION_PADDING {
            return 0.0;
        }

        let max_delay = self.capacity();
        nih_debug_assert!(
            (1.0..=max_delay).contains(&delay_samples),
            "delay of {} samples is outside [1, {}]",
            delay_samples,
            max_delay
        );
        let delay = delay_samples.clamp(1.0, max_delay);

        let integer_delay = delay as usize;
        let fraction = delay - integer_delay as f32;

        // `integer_delay <= len - 2`, so `base >= 2` and none of the
        // subtractions below can underflow before the modulo wraps them.
        let base = self.write_index + len - integer_delay;
        let sample_a = self.buffer[(base + 1) % len];
        let sample_b = self.buffer[base % len];
        let sample_c = self.buffer[(base - 1) % len];
        let sample_d = self.buffer[(base - 2) % len];

        let slope0 = (sample_c - sample_a) * 0.5;
        let slope1 = (sample_d - sample_b) * 0.5;
        let v = sample_b - sample_c;
        let w = slope0 + v;
        let a = w + v + slope1;
        let b = w + a;
        let stage1 = a * fraction - b;
        let stage2 = stage1 * fraction + slope0;
        stage2 * fraction + sample_b
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn prepared(max_delay: usize) -> DelayLine {
        let mut dl = DelayLine::new();
        dl.set_maximum_delay(max_delay);
        dl.reset();
        dl
    }

    /// Write a unit impulse followed by `zeros` silent samples, which leaves
    /// the impulse exactly `zeros` samples behind the cursor.
    fn impulse_then_silence(dl: &mut DelayLine, zeros: usize) {
        dl.write(1.0);
        for _ in 0..zeros {
            dl.write(0.0);
        }
    }

    #[test]
    fn test_capacity_includes_padding() {
        let dl = prepared(100);
        assert_eq!(dl.buffer.len(), 102);
        assert!((dl.capacity() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_set_maximum_delay_never_shrinks() {
        let mut dl = prepared(100);
        dl.set_maximum_delay(10);
        assert_eq!(dl.buffer.len(), 102);

        dl.set_maximum_delay(200);
        assert_eq!(dl.buffer.len(), 202);
    }

    #[test]
    fn test_write_then_read_exact() {
        let mut dl = prepared(100);

        dl.write(0.75);
        dl.write(0.0);

        let result = dl.read(1.0);
        assert!((result - 0.75).abs() < 1e-6, "Expected 0.75, got {result}");
    }

    #[test]
    fn test_whole_sample_delays_are_exact() {
        let mut dl = prepared(10);

        for i in 1..=5 {
            dl.write(i as f32);
        }

        // The cursor sits on 5.0; one sample back is 4.0.
        assert!((dl.read(1.0) - 4.0).abs() < 1e-6);
        assert!((dl.read(2.0) - 3.0).abs() < 1e-6);
        assert!((dl.read(3.0) - 2.0).abs() < 1e-6);
        assert!((dl.read(4.0) - 1.0).abs() < 1e-6);
    }

    /// Catmull-Rom weights at frac = 0.5 are (-1/16, 9/16, 9/16, -1/16).
    /// Sliding the impulse through each tap must reproduce them.
    #[test]
    fn test_hermite_impulse_weights_at_half_sample() {
        let zeros = 20;

        let cases = [
            // (read delay, expected weight, tap the impulse lands on)
            (zeros as f32 - 1.5, -0.0625), // D
            (zeros as f32 - 0.5, 0.5625),  // C
            (zeros as f32 + 0.5, 0.5625),  // B
            (zeros as f32 + 1.5, -0.0625), // A
        ];

        for (delay, expected) in cases {
            let mut dl = prepared(64);
            impulse_then_silence(&mut dl, zeros);
            let result = dl.read(delay);
            assert!(
                (result - expected).abs() < 1e-6,
                "delay {delay}: expected {expected}, got {result}"
            );
        }
    }

    /// The weight on `B` follows 1.5t³ - 2.5t² + 1 across the fraction.
    #[test]
    fn test_hermite_matches_hand_computed_curve() {
        let zeros = 30;
        let mut dl = prepared(64);
        impulse_then_silence(&mut dl, zeros);

        for step in 0..10 {
            let t = step as f32 / 10.0;
            let expected = 1.5 * t * t * t - 2.5 * t * t + 1.0;
            let result = dl.read(zeros as f32 + t);
            assert!(
                (result - expected).abs() < 1e-5,
                "t = {t}: expected {expected}, got {result}"
            );
        }
    }

    #[test]
    fn test_wrapping() {
        let mut dl = prepared(4); // six slots

        for i in 0..20 {
            dl.write(i as f32);
        }

        // The last six writes survive: 14..=19.
        assert!((dl.read(1.0) - 18.0).abs() < 1e-6);
        assert!((dl.read(4.0) - 15.0).abs() < 1e-6);
        assert!((dl.read(3.5) - 15.5).abs() < 1e-6);
    }

    #[test]
    fn test_linear_ramp_is_reconstructed_exactly() {
        // A cubic through evenly spaced points on a line is that line.
        let mut dl = prepared(32);
        for i in 0..32 {
            dl.write(i as f32);
        }

        let result = dl.read(10.25);
        assert!((result - 20.75).abs() < 1e-4, "got {result}");
    }

    #[test]
    fn test_silence_in_silence_out() {
        let dl = prepared(100);

        for delay in [1.0, 10.0, 50.5, 100.0] {
            let result = dl.read(delay);
            assert!(result.abs() < 1e-9, "delay {delay} gave {result}");
        }
    }

    #[test]
    fn test_unprepared_line_is_silent() {
        let mut dl = DelayLine::new();
        dl.write(1.0);
        assert_eq!(dl.read(1.0), 0.0);
    }

    proptest! {
        /// Resetting twice in a row leaves the line silent everywhere, no
        /// matter what was written before.
        #[test]
        fn reset_is_idempotent(
            samples in prop::collection::vec(-1.0f32..=1.0f32, 1..256),
            delay in 1.0f32..=64.0f32,
        ) {
            let mut dl = prepared(64);
            for &s in &samples {
                dl.write(s);
            }

            dl.reset();
            prop_assert!(dl.buffer.iter().all(|&s| s == 0.0));
            dl.reset();
            prop_assert!(dl.buffer.iter().all(|&s| s == 0.0));
            prop_assert_eq!(dl.write_index, dl.buffer.len() - 1);
            prop_assert_eq!(dl.read(delay), 0.0);
        }
    }
}
