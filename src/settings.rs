//! # Settings and Their Smoothed Snapshot
//!
//! [`DelaySettings`] is the plain, typed description of what the user asked
//! for, in the units the host shows (dB, ms, %, Hz). The plugin fills one in
//! from the parameter store at the start of every block; tests and offline
//! callers build one with the `with_*` setters.
//!
//! [`SmoothedParameters`] turns those raw values into what the signal path
//! actually uses, one sample at a time: gains become linear, percentages
//! become fractions, and every continuous value is smoothed so that no
//! change ever reaches the audio as a step. The per-sample loop only ever
//! reads from this snapshot, never from the host.

use crate::dsp::smoother::{equal_power_pan, LinearSmoother, OnePoleSmoother};
use crate::tempo::{NoteLength, Tempo};
use nih_plug::util::db_to_gain;

/// Shortest manual delay time.
pub const MIN_DELAY_TIME_MS: f32 = 5.0;

/// Longest delay time, manual or synced. The delay lines are sized for it.
pub const MAX_DELAY_TIME_MS: f32 = 5000.0;

/// Ramp length for every linearly smoothed parameter.
const LINEAR_RAMP_SECONDS: f32 = 0.02;

/// Time constant of the delay-time glide.
const DELAY_TIME_GLIDE_SECONDS: f32 = 0.2;

/// Everything the delay needs to know from the host, in host units.
#[derive(Debug, Clone, PartialEq)]
pub struct DelaySettings {
    /// Output gain in dB.
    pub gain_db: f32,
    /// Manual delay time for the left channel (and mono) in ms.
    pub delay_time_l_ms: f32,
    /// Manual delay time for the right channel in ms.
    pub delay_time_r_ms: f32,
    /// Dry/wet balance, 0 to 100 %.
    pub mix_percent: f32,
    /// Feedback amount, -100 to 100 %. Negative values flip the polarity of
    /// every repeat.
    pub feedback_percent: f32,
    /// Stereo spread, -100 (left) to 100 % (right).
    pub stereo_percent: f32,
    /// Low cut (highpass) frequency in Hz.
    pub low_cut_hz: f32,
    /// High cut (lowpass) frequency in Hz.
    pub high_cut_hz: f32,
    pub low_cut_q: f32,
    pub high_cut_q: f32,
    /// Saturator pre-gain in dB.
    pub drive_db: f32,
    /// Saturator post-gain in dB.
    pub post_gain_db: f32,
    pub tempo_sync: bool,
    pub delay_note_l: NoteLength,
    pub delay_note_r: NoteLength,
    pub bypassed: bool,
}

impl Default for DelaySettings {
    fn default() -> Self {
        Self {
            gain_db: 0.0,
            delay_time_l_ms: 100.0,
            delay_time_r_ms: 100.0,
            mix_percent: 50.0,
            feedback_percent: 0.0,
            stereo_percent: 0.0,
            low_cut_hz: 20.0,
            high_cut_hz: 20000.0,
            low_cut_q: 0.707,
            high_cut_q: 0.707,
            drive_db: 0.0,
            post_gain_db: 0.0,
            tempo_sync: false,
            delay_note_l: NoteLength::Quarter,
            delay_note_r: NoteLength::Quarter,
            bypassed: false,
        }
    }
}

impl DelaySettings {
    pub fn with_gain_db(mut self, gain_db: f32) -> Self {
        self.gain_db = gain_db;
        self
    }

    /// Set the same manual delay time on both channels.
    pub fn with_delay_time_ms(mut self, delay_ms: f32) -> Self {
        self.delay_time_l_ms = delay_ms;
        self.delay_time_r_ms = delay_ms;
        self
    }

    pub fn with_delay_times_ms(mut self, left_ms: f32, right_ms: f32) -> Self {
        self.delay_time_l_ms = left_ms;
        self.delay_time_r_ms = right_ms;
        self
    }

    pub fn with_mix_percent(mut self, mix: f32) -> Self {
        self.mix_percent = mix;
        self
    }

    pub fn with_feedback_percent(mut self, feedback: f32) -> Self {
        self.feedback_percent = feedback;
        self
    }

    pub fn with_stereo_percent(mut self, stereo: f32) -> Self {
        self.stereo_percent = stereo;
        self
    }

    pub fn with_low_cut(mut self, hz: f32, q: f32) -> Self {
        self.low_cut_hz = hz;
        self.low_cut_q = q;
        self
    }

    pub fn with_high_cut(mut self, hz: f32, q: f32) -> Self {
        self.high_cut_hz = hz;
        self.high_cut_q = q;
        self
    }

    pub fn with_saturation_db(mut self, drive_db: f32, post_gain_db: f32) -> Self {
        self.drive_db = drive_db;
        self.post_gain_db = post_gain_db;
        self
    }

    /// Turn tempo sync on with the same note length on both channels.
    pub fn with_tempo_sync(mut self, note: NoteLength) -> Self {
        self.tempo_sync = true;
        self.delay_note_l = note;
        self.delay_note_r = note;
        self
    }

    pub fn with_bypass(mut self, bypassed: bool) -> Self {
        self.bypassed = bypassed;
        self
    }

    /// The delay times actually in effect, in ms: the synced note lengths
    /// (capped at [`MAX_DELAY_TIME_MS`]) when tempo sync is on, otherwise
    /// the manual times.
    pub fn effective_delay_times_ms(&self, tempo: &Tempo) -> (f32, f32) {
        if self.tempo_sync {
            let synced = |note| (tempo.milliseconds_for(note) as f32).min(MAX_DELAY_TIME_MS);
            (synced(self.delay_note_l), synced(self.delay_note_r))
        } else {
            (self.delay_time_l_ms, self.delay_time_r_ms)
        }
    }
}

/// The per-sample values the signal path reads, plus their smoothers.
///
/// Call [`update()`](Self::update) once per block with fresh settings, then
/// [`smoothen()`](Self::smoothen) once per sample before reading the public
/// fields.
#[derive(Debug, Clone)]
pub struct SmoothedParameters {
    /// Linear output gain.
    pub gain: f32,
    /// Effective delay time in ms, gliding.
    pub delay_time_l: f32,
    pub delay_time_r: f32,
    /// Wet fraction, 0 to 1.
    pub mix: f32,
    /// Feedback fraction, -1 to 1.
    pub feedback: f32,
    /// Equal-power pan gains derived from the stereo spread.
    pub pan_l: f32,
    pub pan_r: f32,
    pub low_cut: f32,
    pub high_cut: f32,
    pub low_cut_q: f32,
    pub high_cut_q: f32,
    /// Linear saturator pre-gain.
    pub drive: f32,
    /// Linear saturator post-gain.
    pub post_gain: f32,
    pub bypassed: bool,

    gain_smoother: LinearSmoother,
    delay_time_l_smoother: OnePoleSmoother,
    delay_time_r_smoother: OnePoleSmoother,
    mix_smoother: LinearSmoother,
    feedback_smoother: LinearSmoother,
    stereo_smoother: LinearSmoother,
    low_cut_smoother: LinearSmoother,
    high_cut_smoother: LinearSmoother,
    low_cut_q_smoother: LinearSmoother,
    high_cut_q_smoother: LinearSmoother,
    drive_smoother: LinearSmoother,
    post_gain_smoother: LinearSmoother,

    /// Cleared by `reset()`; the next `update()` snaps instead of ramping.
    primed: bool,
}

impl Default for SmoothedParameters {
    fn default() -> Self {
        let (pan_l, pan_r) = equal_power_pan(0.0);
        Self {
            gain: 1.0,
            delay_time_l: 0.0,
            delay_time_r: 0.0,
            mix: 0.5,
            feedback: 0.0,
            pan_l,
            pan_r,
            low_cut: 20.0,
            high_cut: 20000.0,
            low_cut_q: 0.707,
            high_cut_q: 0.707,
            drive: 1.0,
            post_gain: 1.0,
            bypassed: false,
            gain_smoother: LinearSmoother::new(1.0),
            delay_time_l_smoother: OnePoleSmoother::new(0.0),
            delay_time_r_smoother: OnePoleSmoother::new(0.0),
            mix_smoother: LinearSmoother::new(0.5),
            feedback_smoother: LinearSmoother::new(0.0),
            stereo_smoother: LinearSmoother::new(0.0),
            low_cut_smoother: LinearSmoother::new(20.0),
            high_cut_smoother: LinearSmoother::new(20000.0),
            low_cut_q_smoother: LinearSmoother::new(0.707),
            high_cut_q_smoother: LinearSmoother::new(0.707),
            drive_smoother: LinearSmoother::new(1.0),
            post_gain_smoother: LinearSmoother::new(1.0),
            primed: false,
        }
    }
}

impl SmoothedParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the smoothing coefficients for a new sample rate.
    pub fn prepare(&mut self, sample_rate: f32) {
        for smoother in self.linear_smoothers_mut() {
            smoother.set_ramp_length(sample_rate, LINEAR_RAMP_SECONDS);
        }
        self.delay_time_l_smoother.set_time_constant(sample_rate, DELAY_TIME_GLIDE_SECONDS);
        self.delay_time_r_smoother.set_time_constant(sample_rate, DELAY_TIME_GLIDE_SECONDS);
    }

    /// Forget any glide in progress. The next [`update()`](Self::update)
    /// jumps every value straight to its target, so playback never starts
    /// with a sweep up from zero.
    pub fn reset(&mut self) {
        self.primed = false;
    }

    /// Take new targets from the host. Called once per block.
    pub fn update(&mut self, settings: &DelaySettings, tempo: &Tempo) {
        let (delay_l, delay_r) = settings.effective_delay_times_ms(tempo);

        self.gain_smoother.set_target(db_to_gain(settings.gain_db));
        self.delay_time_l_smoother.set_target(delay_l);
        self.delay_time_r_smoother.set_target(delay_r);
        self.mix_smoother.set_target(settings.mix_percent * 0.01);
        self.feedback_smoother.set_target(settings.feedback_percent * 0.01);
        self.stereo_smoother.set_target(settings.stereo_percent * 0.01);
        self.low_cut_smoother.set_target(settings.low_cut_hz);
        self.high_cut_smoother.set_target(settings.high_cut_hz);
        self.low_cut_q_smoother.set_target(settings.low_cut_q);
        self.high_cut_q_smoother.set_target(settings.high_cut_q);
        self.drive_smoother.set_target(db_to_gain(settings.drive_db));
        self.post_gain_smoother.set_target(db_to_gain(settings.post_gain_db));
        self.bypassed = settings.bypassed;

        if !self.primed {
            self.snap_to_targets();
            self.primed = true;
        }
    }

    /// Advance every smoother by one sample.
    #[inline]
    pub fn smoothen(&mut self) {
        self.gain = self.gain_smoother.next();
        self.delay_time_l = self.delay_time_l_smoother.next();
        self.delay_time_r = self.delay_time_r_smoother.next();
        self.mix = self.mix_smoother.next();
        self.feedback = self.feedback_smoother.next();
        (self.pan_l, self.pan_r) = equal_power_pan(self.stereo_smoother.next());
        self.low_cut = self.low_cut_smoother.next();
        self.high_cut = self.high_cut_smoother.next();
        self.low_cut_q = self.low_cut_q_smoother.next();
        self.high_cut_q = self.high_cut_q_smoother.next();
        self.drive = self.drive_smoother.next();
        self.post_gain = self.post_gain_smoother.next();
    }

    /// The delay time the left glide is heading toward, in ms.
    pub fn target_delay_time_l(&self) -> f32 {
        self.delay_time_l_smoother.target()
    }

    pub fn target_delay_time_r(&self) -> f32 {
        self.delay_time_r_smoother.target()
    }

    /// The delay-time glide coefficient, i.e. the largest fraction of a
    /// jump the delay time may cover in one sample.
    pub fn delay_time_coefficient(&self) -> f32 {
        self.delay_time_l_smoother.coefficient()
    }

    fn snap_to_targets(&mut self) {
        for smoother in self.linear_smoothers_mut() {
            let target = smoother.target();
            smoother.reset(target);
        }
        let target_l = self.delay_time_l_smoother.target();
        self.delay_time_l_smoother.reset(target_l);
        let target_r = self.delay_time_r_smoother.target();
        self.delay_time_r_smoother.reset(target_r);
    }

    fn linear_smoothers_mut(&mut self) -> [&mut LinearSmoother; 10] {
        [
            &mut self.gain_smoother,
            &mut self.mix_smoother,
            &mut self.feedback_smoother,
            &mut self.stereo_smoother,
            &mut self.low_cut_smoother,
            &mut self.high_cut_smoother,
            &mut self.low_cut_q_smoother,
            &mut self.high_cut_q_smoother,
            &mut self.drive_smoother,
            &mut self.post_gain_smoother,
        ]
    }
}
