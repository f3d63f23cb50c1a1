//! # State-Variable Filter (Low Cut / High Cut)
//!
//! Two of these sit in the feedback path: a highpass ("low cut") that thins
//! out the repeats and a lowpass ("high cut") that darkens them. Every pass
//! through the loop goes through both filters again, so the repeats get
//! progressively thinner and darker, the way tape and bucket-brigade echoes
//! lose their extremes.
//!
//! ## Topology
//!
//! This is the topology-preserving transform (TPT) state-variable filter
//! from Zavalishin's "The Art of VA Filter Design". It uses two
//! trapezoidal integrators, which keeps it stable while the cutoff is being
//! swept (the smoother moves it a little every sample):
//!
//! ```text
//! g  = tan(π * cutoff / sample_rate)
//! R2 = 1 / Q
//! h  = 1 / (1 + R2 * g + g²)
//!
//! hp = h * (x - s1 * (g + R2) - s2)
//! bp = hp * g + s1        s1 = hp * g + bp
//! lp = bp * g + s2        s2 = bp * g + lp
//! ```
//!
//! ## Channels
//!
//! One filter instance serves both stereo channels: the coefficients are
//! shared, but each channel keeps its own pair of integrator states so the
//! left and right repeats never bleed into each other.

use std::f32::consts::PI;

/// Number of independent channel states a filter carries.
const MAX_CHANNELS: usize = 2;

/// Which response the filter produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    /// Removes content below the cutoff ("low cut").
    Highpass,
    /// Removes content above the cutoff ("high cut").
    Lowpass,
}

/// A 2-pole TPT state-variable filter with per-channel state.
#[derive(Debug, Clone)]
pub struct StateVariableFilter {
    filter_type: FilterType,
    sample_rate: f32,
    cutoff: f32,
    resonance: f32,

    // Coefficients, derived from cutoff and resonance.
    g: f32,
    r2: f32,
    h: f32,

    /// First and second integrator state for each channel.
    s1: [f32; MAX_CHANNELS],
    s2: [f32; MAX_CHANNELS],
}

impl StateVariableFilter {
    /// Create a filter of the given type at 44.1 kHz, 1 kHz cutoff and a
    /// Butterworth Q. Call [`prepare()`](Self::prepare) with the real
    /// sample rate before processing.
    pub fn new(filter_type: FilterType) -> Self {
        let mut filter = Self {
            filter_type,
            sample_rate: 44100.0,
            cutoff: 1000.0,
            resonance: std::f32::consts::FRAC_1_SQRT_2,
            g: 0.0,
            r2: 0.0,
            h: 0.0,
            s1: [0.0; MAX_CHANNELS],
            s2: [0.0; MAX_CHANNELS],
        };
        filter.update_coefficients();
        filter
    }

    /// Set the sample rate and clear the channel states.
    pub fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.update_coefficients();
        self.reset();
    }

    /// Set the cutoff frequency in Hz.
    ///
    /// Clamped to `[20 Hz, 0.49 * sample_rate]`: `tan()` blows up as the
    /// cutoff approaches Nyquist.
    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.cutoff = cutoff_hz.clamp(20.0, self.sample_rate * 0.49);
        self.update_coefficients();
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Set the resonance as a Q factor. 0.707 is maximally flat; higher
    /// values add a peak at the cutoff.
    pub fn set_resonance(&mut self, q: f32) {
        self.resonance = q.max(0.1);
        self.update_coefficients();
    }

    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    /// Clear every channel's integrator state.
    pub fn reset(&mut self) {
        self.s1 = [0.0; MAX_CHANNELS];
        self.s2 = [0.0; MAX_CHANNELS];
    }

    /// Filter one sample on the given channel (0 = left, 1 = right).
    pub fn process(&mut self, channel: usize, input: f32) -> f32 {
        let channel = channel.min(MAX_CHANNELS - 1);
        let s1 = self.s1[channel];
        let s2 = self.s2[channel];

        let hp = self.h * (input - s1 * (self.g + self.r2) - s2);
        let bp = hp * self.g + s1;
        let lp = bp * self.g + s2;

        self.s1[channel] = hp * self.g + bp;
        self.s2[channel] = bp * self.g + lp;

        match self.filter_type {
            FilterType::Highpass => hp,
            FilterType::Lowpass => lp,
        }
    }

    fn update_coefficients(&mut self) {
        self.g = (PI * self.cutoff / self.sample_rate).tan();
        self.r2 = 1.0 / self.resonance;
        self.h = 1.0 / (1.0 + self.r2 * self.g + self.g * self.g);
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48000.0;

    fn filter(filter_type: FilterType, cutoff: f32) -> StateVariableFilter {
        let mut f = StateVariableFilter::new(filter_type);
        f.prepare(SAMPLE_RATE);
        f.set_cutoff(cutoff);
        f.set_resonance(0.707);
        f
    }

    /// Peak output for a sine at `freq` once the filter has settled.
    fn steady_state_peak(f: &mut StateVariableFilter, freq: f32) -> f32 {
        let mut peak = 0.0_f32;
        for n in 0..9600 {
            let x = (2.0 * PI * freq * n as f32 / SAMPLE_RATE).sin();
            let y = f.process(0, x);
            if n >= 4800 {
                peak = peak.max(y.abs());
            }
        }
        peak
    }

    #[test]
    fn test_lowpass_passes_dc() {
        let mut f = filter(FilterType::Lowpass, 200.0);

        let mut output = 0.0;
        for _ in 0..10000 {
            output = f.process(0, 1.0);
        }

        assert!((output - 1.0).abs() < 1e-4, "DC should pass, got {output}");
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let mut f = filter(FilterType::Highpass, 200.0);

        let mut output = 1.0;
        for _ in 0..10000 {
            output = f.process(0, 1.0);
        }

        assert!(output.abs() < 1e-4, "DC should be removed, got {output}");
    }

    #[test]
    fn test_lowpass_attenuates_above_cutoff() {
        let mut f = filter(FilterType::Lowpass, 500.0);
        let peak = steady_state_peak(&mut f, 8000.0);

        // Four octaves above cutoff at 12 dB/oct.
        assert!(peak < 0.02, "Expected heavy attenuation, got {peak}");
    }

    #[test]
    fn test_highpass_attenuates_below_cutoff() {
        let mut f = filter(FilterType::Highpass, 4000.0);
        let peak = steady_state_peak(&mut f, 250.0);

        assert!(peak < 0.01, "Expected heavy attenuation, got {peak}");
    }

    #[test]
    fn test_cutoff_is_minus_three_db() {
        let mut f = filter(FilterType::Lowpass, 1000.0);
        let peak = steady_state_peak(&mut f, 1000.0);

        assert!((peak - 0.707).abs() < 0.02, "Expected ~0.707, got {peak}");
    }

    #[test]
    fn test_resonance_boosts_cutoff() {
        let mut f = filter(FilterType::Lowpass, 1000.0);
        f.set_resonance(5.0);
        let peak = steady_state_peak(&mut f, 1000.0);

        assert!(peak > 4.0, "Q = 5 should ring at cutoff, got {peak}");
    }

    #[test]
    fn test_cutoff_clamped_below_nyquist() {
        let mut f = filter(FilterType::Lowpass, 1000.0);
        f.set_cutoff(100_000.0);
        assert!((f.cutoff() - SAMPLE_RATE * 0.49).abs() < 1e-3);

        f.set_cutoff(1.0);
        assert!((f.cutoff() - 20.0).abs() < 1e-6);
        assert!(f.process(0, 1.0).is_finite());
    }

    #[test]
    fn test_channels_are_independent() {
        let mut f = filter(FilterType::Lowpass, 1000.0);

        for _ in 0..100 {
            f.process(0, 1.0);
        }

        // Channel 1 never saw any input, so its first output is silence.
        assert_eq!(f.process(1, 0.0), 0.0);
        assert!(f.s1[0].abs() > 0.0);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut f = filter(FilterType::Highpass, 1000.0);
        f.process(0, 1.0);
        f.process(1, -1.0);

        f.reset();

        assert_eq!(f.s1, [0.0; MAX_CHANNELS]);
        assert_eq!(f.s2, [0.0; MAX_CHANNELS]);
    }
}
