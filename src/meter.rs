//! # Peak Level Meter
//!
//! The audio thread records the loudest output sample of every block; a UI
//! (or anything else on another thread) polls those readings to draw level
//! meters. This is the only state shared between threads, so it has to be
//! lock-free: the audio thread must never wait on the UI.
//!
//! Each reading is an `f32` stored as its bit pattern in an `AtomicU32`.
//! For non-negative floats the bit patterns sort in the same order as the
//! values, so "keep the larger of the stored and the new peak" is a single
//! `fetch_max()` on the bits. The reader takes the value with `swap(0)`,
//! which clears the hold so the next reading starts fresh. A reading can be
//! one block stale, which a meter refreshing at 60 Hz never notices.

use std::sync::atomic::{AtomicU32, Ordering};

/// Left/right peak readings shared between the audio and UI threads.
#[derive(Debug, Default)]
pub struct PeakMeter {
    left: AtomicU32,
    right: AtomicU32,
}

impl PeakMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the stored peaks to `left`/`right` if those are larger.
    /// Called by the audio thread once per block.
    pub fn update_if_greater(&self, left: f32, right: f32) {
        store_max(&self.left, left);
        store_max(&self.right, right);
    }

    /// Current left peak without clearing it.
    pub fn left(&self) -> f32 {
        f32::from_bits(self.left.load(Ordering::Relaxed))
    }

    /// Current right peak without clearing it.
    pub fn right(&self) -> f32 {
        f32::from_bits(self.right.load(Ordering::Relaxed))
    }

    /// Read and clear both peaks. Used by the meter's refresh timer.
    pub fn take(&self) -> (f32, f32) {
        (
            f32::from_bits(self.left.swap(0, Ordering::Relaxed)),
            f32::from_bits(self.right.swap(0, Ordering::Relaxed)),
        )
    }

    /// Clear both peaks.
    pub fn reset(&self) {
        self.left.store(0, Ordering::Relaxed);
        self.right.store(0, Ordering::Relaxed);
    }
}

fn store_max(slot: &AtomicU32, level: f32) {
    // NaN and negative values would break the bit-order trick, and neither
    // is a meaningful peak.
    if level.is_finite() && level > 0.0 {
        slot.fetch_max(level.to_bits(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_starts_silent() {
        let meter = PeakMeter::new();
        assert_eq!(meter.left(), 0.0);
        assert_eq!(meter.right(), 0.0);
    }

    #[test]
    fn test_keeps_the_larger_peak() {
        let meter = PeakMeter::new();
        meter.update_if_greater(0.5, 0.25);
        meter.update_if_greater(0.3, 0.75);

        assert_eq!(meter.left(), 0.5);
        assert_eq!(meter.right(), 0.75);
    }

    #[test]
    fn test_take_clears() {
        let meter = PeakMeter::new();
        meter.update_if_greater(0.9, 0.1);

        assert_eq!(meter.take(), (0.9, 0.1));
        assert_eq!(meter.take(), (0.0, 0.0));
    }

    #[test]
    fn test_ignores_garbage() {
        let meter = PeakMeter::new();
        meter.update_if_greater(0.2, 0.2);
        meter.update_if_greater(f32::NAN, f32::INFINITY);

        assert_eq!(meter.left(), 0.2);
        assert_eq!(meter.right(), 0.2);
    }

    #[test]
    fn test_shared_across_threads() {
        let meter = Arc::new(PeakMeter::new());

        let writer = {
            let meter = Arc::clone(&meter);
            thread::spawn(move || {
                for i in 0..1000 {
                    let level = i as f32 / 1000.0;
                    meter.update_if_greater(level, level * 0.5);
                }
            })
        };
        writer.join().unwrap();

        assert_eq!(meter.left(), 0.999);
        assert_eq!(meter.right(), 0.4995);
    }
}
