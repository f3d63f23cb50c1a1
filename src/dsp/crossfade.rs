//! # Bypass Crossfade
//!
//! Flipping bypass on a delay is an instant switch between two very
//! different signals (the wet mix and the untouched input), which would
//! click. Instead the switch starts a short linear crossfade, 50 ms by
//! default.
//!
//! The fade is tracked as a single position between "fully dry" (0) and
//! "fully processed" (1). Toggling bypass changes only the direction the
//! position travels, so toggling again mid-fade turns the fade around from
//! wherever it is instead of jumping back to an end point.
//!
//! ```text
//!  Active ──(bypass on)──►  fading out  ──►  Bypassed
//!     ▲                        │   ▲              │
//!     └──  fading in  ◄────────┘   └─(bypass on)──┤
//!                ◄───────────(bypass off)─────────┘
//! ```

/// A linear crossfade between the dry input and the processed output.
#[derive(Debug, Clone)]
pub struct BypassCrossfade {
    bypassed: bool,
    /// 0 = dry only, 1 = processed only.
    position: f32,
    /// Position change per sample.
    increment: f32,
}

impl Default for BypassCrossfade {
    fn default() -> Self {
        Self {
            bypassed: false,
            position: 1.0,
            increment: 1.0,
        }
    }
}

impl BypassCrossfade {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fade length.
    pub fn prepare(&mut self, sample_rate: f32, seconds: f32) {
        let samples = seconds * sample_rate;
        self.increment = if samples >= 1.0 { 1.0 / samples } else { 1.0 };
    }

    /// Settle on the given state with no fade.
    pub fn reset(&mut self, bypassed: bool) {
        self.bypassed = bypassed;
        self.position = if bypassed { 0.0 } else { 1.0 };
    }

    /// Report the host's bypass flag. Only an edge starts a fade.
    pub fn set_bypassed(&mut self, bypassed: bool) {
        self.bypassed = bypassed;
    }

    #[cfg(test)]
    fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    /// `true` while the output is a blend of dry and processed signal.
    #[cfg(test)]
    fn is_fading(&self) -> bool {
        let target = if self.bypassed { 0.0 } else { 1.0 };
        self.position != target
    }

    /// Advance by one sample and return the weight of the processed signal.
    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.bypassed {
            self.position = (self.position - self.increment).max(0.0);
        } else {
            self.position = (self.position + self.increment).min(1.0);
        }
        self.position
    }

    /// Blend one sample with a weight returned by [`next()`](Self::next).
    #[inline]
    pub fn mix(weight: f32, dry: f32, processed: f32) -> f32 {
        if weight >= 1.0 {
            processed
        } else if weight <= 0.0 {
            dry
        } else {
            dry + (processed - dry) * weight
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fade(sample_rate: f32) -> BypassCrossfade {
        let mut xf = BypassCrossfade::new();
        xf.prepare(sample_rate, 0.05);
        xf.reset(false);
        xf
    }

    #[test]
    fn test_steady_state_passes_one_side() {
        let mut xf = fade(1000.0);
        let w = xf.next();
        assert_eq!(BypassCrossfade::mix(w, 0.2, 0.9), 0.9);
        assert!(!xf.is_fading());

        xf.reset(true);
        let w = xf.next();
        assert_eq!(BypassCrossfade::mix(w, 0.2, 0.9), 0.2);
    }

    #[test]
    fn test_fade_takes_fifty_ms() {
        let mut xf = fade(1000.0); // 50 samples
        xf.set_bypassed(true);

        for _ in 0..49 {
            xf.next();
            assert!(xf.is_fading());
        }
        let w = xf.next();
        assert!(w.abs() < 1e-5, "got {w}");
    }

    #[test]
    fn test_toggle_mid_fade_turns_around() {
        let mut xf = fade(1000.0);
        xf.set_bypassed(true);
        for _ in 0..10 {
            xf.next();
        }
        let before = xf.position;

        xf.set_bypassed(false);
        let after = xf.next();

        assert!(after > before);
        assert!((after - before - xf.increment).abs() < 1e-6);
    }

    #[test]
    fn test_reset_bypassed_starts_dry() {
        let mut xf = fade(48000.0);
        xf.reset(true);
        assert!(xf.is_bypassed());
        assert!(!xf.is_fading());
        assert_eq!(xf.next(), 0.0);
    }
}
