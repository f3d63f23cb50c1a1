//! # The Delay Processor
//!
//! Everything that happens to the audio lives here, independent of any
//! plugin format: the plugin wrapper hands over the channel buffers, the
//! current [`DelaySettings`] and the host [`Tempo`], and gets processed
//! audio back in place.
//!
//! ## Signal Flow (stereo)
//!
//! ```text
//!  in L ─┐                                                       ┌─► dry L
//!        ├─► (L+R)/2 ─► mono ─┬─ × pan L ─(+)─► [Delay L] ─► wet L ─┐
//!  in R ─┘                    │            ▲                       │
//!                             │            │  fb R                 │
//!                             │            └─────────┐             │
//!                             │                      │             │
//!                             └─ × pan R ─(+)─► [Delay R] ─► wet R ─┤
//!                                          ▲         │             │
//!                                          └── fb L ─┼─────────┐   │
//!                                                    │         │   │
//!   wet ─► × feedback ─► [Low Cut] ─► tanh ─► [High Cut] ─► fb (next sample)
//!
//!  out = bypass_xfade(dry, ((1 - mix) · dry + mix · wet) · gain)
//! ```
//!
//! Each channel's feedback is written into the *other* channel's delay
//! line, so repeats bounce from side to side (ping-pong). With the stereo
//! control off-center, the first echo lands on one side and the next on the
//! other.
//!
//! ## Mono
//!
//! A single-channel input runs the same loop on the left delay line only:
//! no mono fold-down, no pan and no cross-feedback. With a mono input and a
//! stereo output, the result is copied to both sides.
//!
//! ## Real-time Rules
//!
//! [`DelayProcessor::configure()`] allocates everything. `process()` never
//! allocates, locks or blocks: it runs inside the host's audio deadline.

use std::sync::Arc;

use nih_plug::prelude::*;

use crate::dsp::crossfade::BypassCrossfade;
use crate::dsp::delay_line::DelayLine;
use crate::dsp::filter::{FilterType, StateVariableFilter};
use crate::dsp::saturator::Saturator;
use crate::meter::PeakMeter;
use crate::settings::{DelaySettings, SmoothedParameters, MAX_DELAY_TIME_MS};
use crate::tempo::Tempo;

/// Length of the bypass crossfade.
const BYPASS_FADE_SECONDS: f32 = 0.05;

/// Loop gain at which the echoes no longer die away on their own.
const SUSTAINING_LOOP_GAIN: f32 = 0.999;

/// The channel configurations the delay can run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    /// One channel in, one channel out.
    Mono,
    /// One channel in, the same result on both outputs.
    MonoToStereo,
    /// Two channels in, two out.
    Stereo,
}

impl ChannelLayout {
    /// Match a host channel configuration, or `None` if the delay can't run
    /// in it. Hosts ask this before any audio flows.
    pub fn from_channels(inputs: u32, outputs: u32) -> Option<Self> {
        match (inputs, outputs) {
            (1, 1) => Some(Self::Mono),
            (1, 2) => Some(Self::MonoToStereo),
            (2, 2) => Some(Self::Stereo),
            _ => None,
        }
    }
}

/// The complete delay effect: two delay lines, the feedback tone shaping,
/// the smoothed parameters and the bypass switch.
pub struct DelayProcessor {
    sample_rate: f32,
    max_block_size: usize,
    layout: ChannelLayout,

    params: SmoothedParameters,

    delay_line_l: DelayLine,
    delay_line_r: DelayLine,

    /// Feedback computed on the previous sample, one per channel. These
    /// carry over between blocks and are only cleared on reset.
    feedback_l: f32,
    feedback_r: f32,

    low_cut_filter: StateVariableFilter,
    high_cut_filter: StateVariableFilter,
    saturator: Saturator,

    // The values last pushed into the filters. Coefficients are only
    // recomputed when the smoothed value differs. -1.0 forces the first
    // sample to apply.
    last_low_cut: f32,
    last_low_cut_q: f32,
    last_high_cut: f32,
    last_high_cut_q: f32,

    bypass: BypassCrossfade,
    /// Set on reset so the first block adopts the host's bypass state
    /// without fading into it.
    settle_bypass: bool,

    meter: Arc<PeakMeter>,
}

impl Default for DelayProcessor {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            max_block_size: 0,
            layout: ChannelLayout::Stereo,
            params: SmoothedParameters::new(),
            delay_line_l: DelayLine::new(),
            delay_line_r: DelayLine::new(),
            feedback_l: 0.0,
            feedback_r: 0.0,
            low_cut_filter: StateVariableFilter::new(FilterType::Highpass),
            high_cut_filter: StateVariableFilter::new(FilterType::Lowpass),
            saturator: Saturator::default(),
            last_low_cut: -1.0,
            last_low_cut_q: -1.0,
            last_high_cut: -1.0,
            last_high_cut_q: -1.0,
            bypass: BypassCrossfade::new(),
            settle_bypass: true,
            meter: Arc::new(PeakMeter::new()),
        }
    }
}

impl DelayProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The peak meter this processor writes to. Clone the `Arc` and hand it
    /// to whatever draws the meters.
    pub fn meter(&self) -> Arc<PeakMeter> {
        Arc::clone(&self.meter)
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    /// Prepare for playback. Allocates the delay lines, so it must be
    /// called off the audio thread, before the first `process()` and after
    /// any sample-rate or layout change. Leaves the processor reset.
    pub fn configure(&mut self, sample_rate: f32, max_block_size: usize, layout: ChannelLayout) {
        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;
        self.layout = layout;

        self.params.prepare(sample_rate);

        let max_delay_samples = (MAX_DELAY_TIME_MS / 1000.0 * sample_rate).ceil() as usize;
        self.delay_line_l.set_maximum_delay(max_delay_samples);
        self.delay_line_r.set_maximum_delay(max_delay_samples);

        self.low_cut_filter.prepare(sample_rate);
        self.high_cut_filter.prepare(sample_rate);
        self.bypass.prepare(sample_rate, BYPASS_FADE_SECONDS);

        self.reset();
    }

    /// Silence all delay and filter memory. The next block snaps every
    /// parameter to its value instead of gliding there.
    pub fn reset(&mut self) {
        self.params.reset();

        self.delay_line_l.reset();
        self.delay_line_r.reset();
        self.feedback_l = 0.0;
        self.feedback_r = 0.0;

        self.low_cut_filter.reset();
        self.high_cut_filter.reset();
        self.last_low_cut = -1.0;
        self.last_low_cut_q = -1.0;
        self.last_high_cut = -1.0;
        self.last_high_cut_q = -1.0;

        self.settle_bypass = true;
        self.meter.reset();
    }

    /// Process one block in place.
    ///
    /// `channels` holds one slice per output channel. For
    /// [`ChannelLayout::MonoToStereo`] the input is expected in the first
    /// slice; the second is overwritten.
    pub fn process(
        &mut self,
        channels: &mut [&mut [f32]],
        settings: &DelaySettings,
        tempo: &Tempo,
    ) {
        self.params.update(settings, tempo);

        if self.settle_bypass {
            self.bypass.reset(settings.bypassed);
            self.settle_bypass = false;
        }
        self.bypass.set_bypassed(self.params.bypassed);

        let (peak_l, peak_r) = match (self.layout, &mut *channels) {
            (ChannelLayout::Stereo, [left, right, ..]) => self.process_stereo(left, right),
            (ChannelLayout::MonoToStereo, [left, right, ..]) => {
                let peak = self.process_mono(left);
                for (out, processed) in right.iter_mut().zip(left.iter()) {
                    *out = *processed;
                }
                (peak, peak)
            }
            (_, [mono, ..]) => {
                let peak = self.process_mono(mono);
                (peak, peak)
            }
            (_, []) => return,
        };

        self.meter.update_if_greater(peak_l, peak_r);

        #[cfg(debug_assertions)]
        protect_your_ears(channels);
    }

    /// Convert a delay time to samples, clamped to what the delay lines can
    /// interpolate.
    pub fn delay_in_samples(&self, delay_ms: f32) -> f32 {
        let max_delay = self.delay_line_l.capacity().max(1.0);
        (delay_ms * self.sample_rate / 1000.0).clamp(1.0, max_delay)
    }

    /// How many samples of output remain after the input goes silent, or
    /// `None` if the repeats sustain indefinitely.
    ///
    /// Each repeat is scaled by the small-signal loop gain
    /// `|feedback| × drive × post_gain`, so after `N` repeats the level is
    /// `gain^N`. Solving `gain^N = 0.001` (-60 dB) gives `N = -3 / log10(gain)`.
    pub fn tail_samples(&self) -> Option<u32> {
        let delay_ms = self.params.target_delay_time_l().max(self.params.target_delay_time_r());
        let delay_samples = self.delay_in_samples(delay_ms);

        let loop_gain = self.params.feedback.abs() * self.params.drive * self.params.post_gain;
        if loop_gain >= SUSTAINING_LOOP_GAIN {
            None
        } else if loop_gain > 0.001 {
            let repeats = -3.0 / loop_gain.log10();
            Some((repeats * delay_samples) as u32)
        } else {
            Some(delay_samples as u32)
        }
    }

    fn process_stereo(&mut self, left: &mut [f32], right: &mut [f32]) -> (f32, f32) {
        self.debug_check_block(left.len());

        let mut max_l = 0.0_f32;
        let mut max_r = 0.0_f32;

        for (sample_l, sample_r) in left.iter_mut().zip(right.iter_mut()) {
            self.params.smoothen();
            self.update_tone_shaping();

            let delay_l = self.delay_in_samples(self.params.delay_time_l);
            let delay_r = self.delay_in_samples(self.params.delay_time_r);

            let dry_l = *sample_l;
            let dry_r = *sample_r;
            let mono = (dry_l + dry_r) * 0.5;

            // Cross-feedback: each line is fed the other side's repeats.
            self.delay_line_l.write(mono * self.params.pan_l + self.feedback_r);
            self.delay_line_r.write(mono * self.params.pan_r + self.feedback_l);

            let wet_l = self.delay_line_l.read(delay_l);
            let wet_r = self.delay_line_r.read(delay_r);

            self.feedback_l = self.shape_feedback(0, wet_l);
            self.feedback_r = self.shape_feedback(1, wet_r);

            let mix = self.params.mix;
            let processed_l = ((1.0 - mix) * dry_l + mix * wet_l) * self.params.gain;
            let processed_r = ((1.0 - mix) * dry_r + mix * wet_r) * self.params.gain;

            let weight = self.bypass.next();
            let out_l = BypassCrossfade::mix(weight, dry_l, processed_l);
            let out_r = BypassCrossfade::mix(weight, dry_r, processed_r);

            *sample_l = out_l;
            *sample_r = out_r;

            max_l = max_l.max(out_l.abs());
            max_r = max_r.max(out_r.abs());
        }

        (max_l, max_r)
    }

    fn process_mono(&mut self, samples: &mut [f32]) -> f32 {
        self.debug_check_block(samples.len());

        let mut max = 0.0_f32;

        for sample in samples.iter_mut() {
            self.params.smoothen();
            self.update_tone_shaping();

            let delay = self.delay_in_samples(self.params.delay_time_l);

            let dry = *sample;
            self.delay_line_l.write(dry + self.feedback_l);
            let wet = self.delay_line_l.read(delay);
            self.feedback_l = self.shape_feedback(0, wet);

            let mix = self.params.mix;
            let processed = ((1.0 - mix) * dry + mix * wet) * self.params.gain;

            let out = BypassCrossfade::mix(self.bypass.next(), dry, processed);
            *sample = out;

            max = max.max(out.abs());
        }

        max
    }

    /// Scale, filter and saturate one channel's wet signal into the value
    /// written back on the next sample.
    #[inline]
    fn shape_feedback(&mut self, channel: usize, wet: f32) -> f32 {
        let feedback = wet * self.params.feedback;
        let feedback = self.low_cut_filter.process(channel, feedback);
        let feedback = self.saturator.process(feedback);
        let feedback = self.high_cut_filter.process(channel, feedback);
        flush_denormal(feedback)
    }

    /// Push the current smoothed filter and saturator settings into the DSP
    /// blocks, recomputing filter coefficients only when a value moved.
    #[inline]
    fn update_tone_shaping(&mut self) {
        let params = &self.params;

        if params.low_cut != self.last_low_cut {
            self.low_cut_filter.set_cutoff(params.low_cut);
            self.last_low_cut = params.low_cut;
        }
        if params.low_cut_q != self.last_low_cut_q {
            self.low_cut_filter.set_resonance(params.low_cut_q);
            self.last_low_cut_q = params.low_cut_q;
        }
        if params.high_cut != self.last_high_cut {
            self.high_cut_filter.set_cutoff(params.high_cut);
            self.last_high_cut = params.high_cut;
        }
        if params.high_cut_q != self.last_high_cut_q {
            self.high_cut_filter.set_resonance(params.high_cut_q);
            self.last_high_cut_q = params.high_cut_q;
        }

        self.saturator.drive = params.drive;
        self.saturator.post_gain = params.post_gain;
    }

    fn debug_check_block(&self, len: usize) {
        nih_debug_assert!(
            len <= self.max_block_size,
            "block of {} samples exceeds the configured maximum of {}",
            len,
            self.max_block_size
        );
    }
}

/// Flush values too small to hear to zero, so a decaying feedback loop
/// never grinds through subnormal floats.
#[inline]
fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 {
        0.0
    } else {
        x
    }
}

/// Development-only guard against blowing up speakers and ears: if the
/// block contains a NaN, an infinity, or anything louder than +6 dBFS,
/// silence the whole block and report it.
#[cfg(debug_assertions)]
fn protect_your_ears(channels: &mut [&mut [f32]]) {
    if let Some(sample) = mute_unsafe_block(channels) {
        nih_debug_assert_failure!("unsafe output sample {}, muting block", sample);
    }
}

/// Silence every channel if any sample is non-finite or above +6 dBFS.
/// Returns the first offending sample.
#[cfg(debug_assertions)]
fn mute_unsafe_block(channels: &mut [&mut [f32]]) -> Option<f32> {
    let dangerous = channels
        .iter()
        .flat_map(|channel| channel.iter().copied())
        .find(|sample| !sample.is_finite() || sample.abs() > 2.0)?;

    for channel in channels.iter_mut() {
        channel.fill(0.0);
    }
    Some(dangerous)
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
