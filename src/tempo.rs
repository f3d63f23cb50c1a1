//! # Tempo Sync
//!
//! With tempo sync on, the delay time comes from the song tempo and a note
//! length instead of the millisecond knob. One whole note (four beats)
//! lasts `240000 / bpm` milliseconds, so at 120 BPM:
//!
//! ```text
//! 1/1  = 2000 ms      1/4 = 500 ms      1/16 = 125 ms
//! 1/4 dot  = 500 ms × 1.5 = 750 ms
//! 1/4 trip = 500 ms × 2/3 ≈ 333 ms
//! ```
//!
//! The host reports its tempo once per block. [`Tempo::update()`] latches it
//! so every sample in the block sees the same BPM.

use nih_plug::prelude::*;

/// Used whenever the host does not report a tempo.
pub const DEFAULT_BPM: f64 = 120.0;

/// Note lengths offered by the "Delay Note" parameters, shortest first.
///
/// The `#[id]` strings are what hosts save in presets, so they must never
/// change. The order is the order the host shows in its menu.
#[derive(Enum, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum NoteLength {
    #[id = "1/32"]
    #[name = "1/32"]
    ThirtySecond,
    #[id = "1/16t"]
    #[name = "1/16 trip"]
    SixteenthTriplet,
    #[id = "1/32d"]
    #[name = "1/32 dot"]
    ThirtySecondDotted,
    #[id = "1/16"]
    #[name = "1/16"]
    Sixteenth,
    #[id = "1/8t"]
    #[name = "1/8 trip"]
    EighthTriplet,
    #[id = "1/16d"]
    #[name = "1/16 dot"]
    SixteenthDotted,
    #[id = "1/8"]
    #[name = "1/8"]
    Eighth,
    #[id = "1/4t"]
    #[name = "1/4 trip"]
    QuarterTriplet,
    #[id = "1/8d"]
    #[name = "1/8 dot"]
    EighthDotted,
    #[id = "1/4"]
    #[name = "1/4"]
    #[default]
    Quarter,
    #[id = "1/2t"]
    #[name = "1/2 trip"]
    HalfTriplet,
    #[id = "1/4d"]
    #[name = "1/4 dot"]
    QuarterDotted,
    #[id = "1/2"]
    #[name = "1/2"]
    Half,
    #[id = "1/1t"]
    #[name = "1/1 trip"]
    WholeTriplet,
    #[id = "1/2d"]
    #[name = "1/2 dot"]
    HalfDotted,
    #[id = "1/1"]
    #[name = "1/1"]
    Whole,
}

impl NoteLength {
    /// Base length as a fraction of a whole note, before any dot or triplet.
    fn whole_note_fraction(self) -> f64 {
        match self {
            Self::ThirtySecond | Self::ThirtySecondDotted => 1.0 / 32.0,
            Self::Sixteenth | Self::SixteenthTriplet | Self::SixteenthDotted => 1.0 / 16.0,
            Self::Eighth | Self::EighthTriplet | Self::EighthDotted => 1.0 / 8.0,
            Self::Quarter | Self::QuarterTriplet | Self::QuarterDotted => 1.0 / 4.0,
            Self::Half | Self::HalfTriplet | Self::HalfDotted => 1.0 / 2.0,
            Self::Whole | Self::WholeTriplet => 1.0,
        }
    }

    /// Length multiplier: 1.5 for dotted notes, 2/3 for triplets.
    fn modifier(self) -> f64 {
        match self {
            Self::ThirtySecondDotted
            | Self::SixteenthDotted
            | Self::EighthDotted
            | Self::QuarterDotted
            | Self::HalfDotted => 1.5,
            Self::SixteenthTriplet
            | Self::EighthTriplet
            | Self::QuarterTriplet
            | Self::HalfTriplet
            | Self::WholeTriplet => 2.0 / 3.0,
            _ => 1.0,
        }
    }

    /// Duration of this note in milliseconds at the given tempo.
    pub fn to_ms(self, bpm: f64) -> f64 {
        self.whole_note_fraction() * self.modifier() * (240_000.0 / bpm)
    }
}

/// The host tempo for the current block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    bpm: f64,
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: DEFAULT_BPM }
    }
}

impl Tempo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tempo fixed at `bpm`, for offline use and tests.
    pub fn with_bpm(bpm: f64) -> Self {
        let mut tempo = Self::default();
        tempo.update(Some(bpm));
        tempo
    }

    pub fn reset(&mut self) {
        self.bpm = DEFAULT_BPM;
    }

    /// Latch the host tempo for the next block.
    ///
    /// Falls back to [`DEFAULT_BPM`] when the host has no transport, or
    /// reports something that isn't a usable tempo.
    pub fn update(&mut self, host_bpm: Option<f64>) {
        self.reset();

        if let Some(bpm) = host_bpm.filter(|bpm| bpm.is_finite() && *bpm > 0.0) {
            self.bpm = bpm;
        }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of `note` in milliseconds at the latched tempo.
    pub fn milliseconds_for(&self, note: NoteLength) -> f64 {
        note.to_ms(self.bpm)
    }
}
