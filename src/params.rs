//! # Plugin Parameters
//!
//! Parameters are the knobs and switches the user sees in the DAW. Each
//! parameter has:
//!
//! - A **unique string ID** (`#[id = "..."]`) that the host uses to
//!   save and recall presets. Once published, never change these IDs
//!   or existing presets will break.
//! - A **human-readable name** shown in the DAW's UI.
//! - A **range** (min, max, and optional skew).
//! - A **default value**.
//!
//! nih-plug saves and restores the whole set as the plugin state, so there
//! is no state format of our own.
//!
//! ## No smoothing here
//!
//! Unlike a typical nih-plug plugin, these parameters carry no
//! `with_smoother()`. The processor reads each value once per block into a
//! [`DelaySettings`] and does its own smoothing (see `settings.rs`), which
//! lets the delay time use a slow exponential glide while everything else
//! uses a short linear ramp.

use std::sync::Arc;

use nih_plug::prelude::*;

use crate::settings::{DelaySettings, MAX_DELAY_TIME_MS, MIN_DELAY_TIME_MS};
use crate::tempo::NoteLength;

/// All user-facing parameters for the Loveless Delay plugin.
#[derive(Params)]
pub struct PluginParams {
    /// **Output Gain**: level of the final output, -12 to +12 dB.
    #[id = "gain"]
    pub gain: FloatParam,

    /// **Delay Time (L)**: manual delay for the left channel, and for mono.
    ///
    /// Skewed so that the short times, where a few milliseconds make an
    /// audible difference, get most of the knob travel.
    #[id = "delayTimeL"]
    pub delay_time_l: FloatParam,

    /// **Delay Time (R)**: manual delay for the right channel.
    #[id = "delayTimeR"]
    pub delay_time_r: FloatParam,

    /// **Mix**: 0 % is fully dry, 100 % fully wet.
    #[id = "mix"]
    pub mix: FloatParam,

    /// **Feedback**: how much of each repeat is fed back in.
    ///
    /// Negative values invert the repeat each time around the loop, which
    /// gives a hollower sound. The saturator in the loop keeps even ±100 %
    /// from running away.
    #[id = "feedback"]
    pub feedback: FloatParam,

    /// **Stereo**: where the input lands in the stereo field before it
    /// enters the delay lines. -100 % is hard left, 100 % hard right.
    #[id = "stereo"]
    pub stereo: FloatParam,

    /// **Low Cut**: highpass in the feedback path. Repeats get thinner.
    #[id = "lowCut"]
    pub low_cut: FloatParam,

    /// **High Cut**: lowpass in the feedback path. Repeats get darker.
    #[id = "highCut"]
    pub high_cut: FloatParam,

    #[id = "lowCutQ"]
    pub low_cut_q: FloatParam,

    #[id = "highCutQ"]
    pub high_cut_q: FloatParam,

    /// **Dist Pre-gain**: how hard the repeats hit the saturator.
    #[id = "drive"]
    pub drive: FloatParam,

    /// **Dist Post-gain**: level after the saturator.
    #[id = "postWSGain"]
    pub post_gain: FloatParam,

    /// **Tempo Sync**: take the delay times from the host tempo and the
    /// note lengths below instead of the millisecond knobs.
    #[id = "tempoSync"]
    pub tempo_sync: BoolParam,

    #[id = "delayNoteL"]
    pub delay_note_l: EnumParam<NoteLength>,

    #[id = "delayNoteR"]
    pub delay_note_r: EnumParam<NoteLength>,

    /// The host's bypass switch. The processor crossfades instead of
    /// cutting over.
    #[id = "bypass"]
    pub bypass: BoolParam,
}

impl Default for PluginParams {
    fn default() -> Self {
        Self {
            gain: decibel_param("Output Gain", -12.0, 12.0),

            delay_time_l: delay_time_param("Delay Time (L)"),
            delay_time_r: delay_time_param("Delay Time (R)"),

            mix: percent_param("Mix", 50.0, 0.0, 100.0),
            feedback: percent_param("Feedback", 0.0, -100.0, 100.0),
            stereo: percent_param("Stereo", 0.0, -100.0, 100.0),

            low_cut: frequency_param("Low Cut", 20.0),
            high_cut: frequency_param("High Cut", 20000.0),
            low_cut_q: q_param("Low Cut Q"),
            high_cut_q: q_param("High Cut Q"),

            drive: decibel_param("Dist Pre-gain", -24.0, 24.0),
            post_gain: decibel_param("Dist Post-gain", -24.0, 24.0),

            tempo_sync: BoolParam::new("Tempo Sync", false),
            delay_note_l: EnumParam::new("Delay Note (L)", NoteLength::Quarter),
            delay_note_r: EnumParam::new("Delay Note (R)", NoteLength::Quarter),

            bypass: BoolParam::new("Bypass", false).make_bypass(),
        }
    }
}

impl PluginParams {
    /// Snapshot the current values for one block of processing.
    pub fn settings(&self) -> DelaySettings {
        DelaySettings {
            gain_db: self.gain.value(),
            delay_time_l_ms: self.delay_time_l.value(),
            delay_time_r_ms: self.delay_time_r.value(),
            mix_percent: self.mix.value(),
            feedback_percent: self.feedback.value(),
            stereo_percent: self.stereo.value(),
            low_cut_hz: self.low_cut.value(),
            high_cut_hz: self.high_cut.value(),
            low_cut_q: self.low_cut_q.value(),
            high_cut_q: self.high_cut_q.value(),
            drive_db: self.drive.value(),
            post_gain_db: self.post_gain.value(),
            tempo_sync: self.tempo_sync.value(),
            delay_note_l: self.delay_note_l.value(),
            delay_note_r: self.delay_note_r.value(),
            bypassed: self.bypass.value(),
        }
    }
}

fn decibel_param(name: &str, min: f32, max: f32) -> FloatParam {
    FloatParam::new(name, 0.0, FloatRange::Linear { min, max })
        .with_unit(" dB")
        .with_value_to_string(formatters::v2s_f32_rounded(1))
}

fn delay_time_param(name: &str) -> FloatParam {
    FloatParam::new(
        name,
        100.0,
        FloatRange::Skewed {
            min: MIN_DELAY_TIME_MS,
            max: MAX_DELAY_TIME_MS,
            factor: FloatRange::skew_factor(-2.0),
        },
    )
    .with_value_to_string(v2s_milliseconds())
    .with_string_to_value(s2v_milliseconds())
}

fn percent_param(name: &str, default: f32, min: f32, max: f32) -> FloatParam {
    FloatParam::new(name, default, FloatRange::Linear { min, max })
        .with_unit(" %")
        .with_step_size(1.0)
        .with_value_to_string(formatters::v2s_f32_rounded(0))
}

fn frequency_param(name: &str, default: f32) -> FloatParam {
    FloatParam::new(
        name,
        default,
        FloatRange::Skewed {
            min: 20.0,
            max: 20000.0,
            // Pitch perception is roughly logarithmic: give the low end
            // most of the travel.
            factor: FloatRange::skew_factor(-1.7),
        },
    )
    .with_step_size(1.0)
    .with_value_to_string(v2s_hertz())
    .with_string_to_value(s2v_hertz())
}

fn q_param(name: &str) -> FloatParam {
    FloatParam::new(name, 0.707, FloatRange::Linear { min: 0.5, max: 10.0 })
        .with_step_size(0.001)
        .with_value_to_string(formatters::v2s_f32_rounded(2))
}

// ─────────────────────────────────────────────────────────────────────
// Display formatting
// ─────────────────────────────────────────────────────────────────────

/// "4.25 ms", "42.5 ms", "425 ms", "4.25 s".
fn format_milliseconds(value: f32) -> String {
    if value < 10.0 {
        format!("{value:.2} ms")
    } else if value < 100.0 {
        format!("{value:.1} ms")
    } else if value < 1000.0 {
        format!("{} ms", value as i32)
    } else {
        format!("{:.2} s", value * 0.001)
    }
}

/// Parse a delay time typed by the user.
///
/// "250", "250ms" and "250 ms" are milliseconds. "1.5s" is seconds, and so
/// is a bare number below the shortest delay time ("2" means two seconds,
/// not two milliseconds).
fn parse_milliseconds(text: &str) -> Option<f32> {
    let text = text.trim().to_ascii_lowercase();

    if let Some(number) = text.strip_suffix("ms") {
        return number.trim().parse().ok();
    }
    if let Some(number) = text.strip_suffix('s') {
        return number.trim().parse::<f32>().ok().map(|s| s * 1000.0);
    }

    let value: f32 = text.parse().ok()?;
    if value < MIN_DELAY_TIME_MS {
        Some(value * 1000.0)
    } else {
        Some(value)
    }
}

/// "440 Hz", "4.40 kHz", "14.4 kHz".
fn format_hertz(value: f32) -> String {
    if value < 1000.0 {
        format!("{} Hz", value.round() as i32)
    } else if value < 10000.0 {
        format!("{:.2} kHz", value / 1000.0)
    } else {
        format!("{:.1} kHz", value / 1000.0)
    }
}

/// Parse a frequency typed by the user. "k"/"kHz" suffixes multiply by
/// 1000, and so does a bare number below 20, since no cutoff goes that low
/// ("5" means 5 kHz).
fn parse_hertz(text: &str) -> Option<f32> {
    let text = text.trim().to_ascii_lowercase();
    let text = text.strip_suffix("hz").unwrap_or(&text).trim_end();

    if let Some(number) = text.strip_suffix('k') {
        return number.trim().parse::<f32>().ok().map(|k| k * 1000.0);
    }

    let value: f32 = text.parse().ok()?;
    if value < 20.0 {
        Some(value * 1000.0)
    } else {
        Some(value)
    }
}

fn v2s_milliseconds() -> Arc<dyn Fn(f32) -> String + Send + Sync> {
    Arc::new(format_milliseconds)
}

fn s2v_milliseconds() -> Arc<dyn Fn(&str) -> Option<f32> + Send + Sync> {
    Arc::new(parse_milliseconds)
}

fn v2s_hertz() -> Arc<dyn Fn(f32) -> String + Send + Sync> {
    Arc::new(format_hertz)
}

fn s2v_hertz() -> Arc<dyn Fn(&str) -> Option<f32> + Send + Sync> {
    Arc::new(parse_hertz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_delay_settings_defaults() {
        let params = PluginParams::default();
        assert_eq!(params.settings(), DelaySettings::default());
    }

    #[test]
    fn test_delay_time_range() {
        let params = PluginParams::default();
        assert_eq!(params.delay_time_l.preview_plain(0.0), MIN_DELAY_TIME_MS);
        assert_eq!(params.delay_time_l.preview_plain(1.0), MAX_DELAY_TIME_MS);
    }

    #[test]
    fn test_format_milliseconds() {
        assert_eq!(format_milliseconds(4.25), "4.25 ms");
        assert_eq!(format_milliseconds(42.5), "42.5 ms");
        assert_eq!(format_milliseconds(425.7), "425 ms");
        assert_eq!(format_milliseconds(4250.0), "4.25 s");
    }

    #[test]
    fn test_parse_milliseconds() {
        assert_eq!(parse_milliseconds("250"), Some(250.0));
        assert_eq!(parse_milliseconds("250 ms"), Some(250.0));
        assert_eq!(parse_milliseconds("1.5s"), Some(1500.0));
        assert_eq!(parse_milliseconds(" 2 S "), Some(2000.0));
        assert_eq!(parse_milliseconds("2"), Some(2000.0));
        assert_eq!(parse_milliseconds("soon"), None);
    }

    #[test]
    fn test_format_hertz() {
        assert_eq!(format_hertz(440.0), "440 Hz");
        assert_eq!(format_hertz(4400.0), "4.40 kHz");
        assert_eq!(format_hertz(14400.0), "14.4 kHz");
    }

    #[test]
    fn test_parse_hertz() {
        assert_eq!(parse_hertz("440"), Some(440.0));
        assert_eq!(parse_hertz("440 Hz"), Some(440.0));
        assert_eq!(parse_hertz("4.4k"), Some(4400.0));
        assert_eq!(parse_hertz("4.4 kHz"), Some(4400.0));
        assert_eq!(parse_hertz("5"), Some(5000.0));
        assert_eq!(parse_hertz("bright"), None);
    }
}
