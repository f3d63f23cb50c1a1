//! # Loveless Delay v2: A Stereo Ping-Pong Delay (AU/VST3/CLAP)
//!
//! A stereo delay built with [nih-plug](https://github.com/robbert-vdh/nih-plug).
//! Outputs Audio Unit (AUv2), VST3, and CLAP formats from a single codebase.
//!
//! The repeats bounce between the channels, the delay time can follow the
//! host tempo, and the feedback path runs through a low cut,
//! a tanh saturator and a high cut, so every repeat comes back a little
//! darker and dirtier than the one before.
//!
//! ## Layout
//!
//! ```text
//! lib.rs        nih-plug glue: layouts, host tempo, tail reporting
//! params.rs     parameter registry and display formatting
//! settings.rs   per-block parameter snapshot + smoothing
//! tempo.rs      note lengths and the host tempo
//! processor.rs  the signal graph (format independent)
//! meter.rs      lock-free peak meter
//! dsp/          delay line, filters, saturator, smoothers, bypass crossfade
//! ```
//!
//! The DSP never touches nih-plug types beyond its logging macros, so the
//! whole signal graph can be driven from plain slices in tests.

pub mod dsp;
pub mod meter;
pub mod params;
pub mod processor;
pub mod settings;
pub mod tempo;

use std::num::NonZeroU32;
use std::sync::Arc;

use meter::PeakMeter;
use nih_plug::prelude::*;
use params::PluginParams;
use processor::{ChannelLayout, DelayProcessor};
use tempo::Tempo;

/// The main plugin struct.
///
/// Parameters (`PluginParams`) are shared with the host via `Arc` and can be
/// read from any thread. Everything else is owned by the audio thread and
/// only touched in `initialize()`, `reset()` and `process()`, except for the
/// peak meter, which any thread may read through [`Self::peak_meter()`].
pub struct LovelessDelay {
    params: Arc<PluginParams>,

    /// The signal graph. Allocated in `initialize()`.
    processor: DelayProcessor,

    /// The host tempo, latched once per block.
    tempo: Tempo,
}

impl Default for LovelessDelay {
    fn default() -> Self {
        Self {
            params: Arc::new(PluginParams::default()),
            processor: DelayProcessor::new(),
            tempo: Tempo::new(),
        }
    }
}

impl LovelessDelay {
    /// Shared handle to the output peak meter, for an editor or any other
    /// reader outside the audio thread.
    pub fn peak_meter(&self) -> Arc<PeakMeter> {
        self.processor.meter()
    }
}

impl Plugin for LovelessDelay {
    const NAME: &'static str = "Loveless Delay";
    const VENDOR: &'static str = "Loveless Audio";
    const URL: &'static str = "";
    const EMAIL: &'static str = "steve.loveless@gmail.com";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // The host picks the first layout that matches the track. Stereo first
    // since most DAW tracks are stereo; a mono track feeding a stereo bus
    // gets the mono-to-stereo layout.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    // Parameter values are read once per block, so split the block at
    // every automation point.
    const SAMPLE_ACCURATE_AUTOMATION: bool = true;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Called when the plugin is first loaded, or when the sample rate or
    /// channel configuration changes. This is where the delay lines are
    /// allocated, since their size depends on the sample rate.
    ///
    /// Returning `false` tells the host the plugin can't run in this
    /// configuration.
    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        let inputs = audio_io_layout.main_input_channels.map_or(0, NonZeroU32::get);
        let outputs = audio_io_layout.main_output_channels.map_or(0, NonZeroU32::get);

        let Some(layout) = ChannelLayout::from_channels(inputs, outputs) else {
            nih_log!("Unsupported channel layout: {inputs} in, {outputs} out");
            return false;
        };

        self.processor.configure(
            buffer_config.sample_rate,
            buffer_config.max_buffer_size as usize,
            layout,
        );
        self.tempo.reset();

        nih_log!(
            "Initialized at {} Hz, up to {} samples per block, {:?}",
            buffer_config.sample_rate,
            buffer_config.max_buffer_size,
            self.processor.layout()
        );

        true
    }

    /// Called when playback stops or the plugin is re-activated. Clears the
    /// delay lines so old echoes don't play when the transport restarts.
    fn reset(&mut self) {
        self.processor.reset();
        self.tempo.reset();
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        let settings = self.params.settings();
        self.tempo.update(context.transport().tempo);

        self.processor.process(buffer.as_slice(), &settings, &self.tempo);

        // Keep the host calling process() after the input goes silent, so
        // the repeats ring out instead of being cut off.
        match self.processor.tail_samples() {
            Some(samples) => ProcessStatus::Tail(samples),
            None => ProcessStatus::KeepAlive,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Plugin format trait implementations
// ─────────────────────────────────────────────────────────────────────

impl ClapPlugin for LovelessDelay {
    const CLAP_ID: &'static str = "com.loveless-audio.loveless-delay-v2";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("A stereo ping-pong delay with tempo sync and a saturated, filtered feedback path");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Delay,
    ];
}

impl Vst3Plugin for LovelessDelay {
    // Must differ from v1's ID so both versions can be installed side by side.
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssDelay__v002";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] = &[
        Vst3SubCategory::Fx,
        Vst3SubCategory::Delay,
        Vst3SubCategory::Stereo,
    ];
}

// ─────────────────────────────────────────────────────────────────────
// Export macros
// ─────────────────────────────────────────────────────────────────────
//
// nih_export_clap! exports the `clap_entry` symbol for CLAP hosts.
// nih_export_vst3! exports `GetPluginFactory` for VST3 hosts.
// clap_wrapper re-exports the CLAP entry point as an AUv2 component so
// Logic Pro (Audio Units only) can load it.

nih_export_clap!(LovelessDelay);
nih_export_vst3!(LovelessDelay);

clap_wrapper::export_auv2!();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_meter_is_shared_with_the_processor() {
        let plugin = LovelessDelay::default();
        let meter = plugin.peak_meter();
        assert!(Arc::ptr_eq(&meter, &plugin.processor.meter()));

        meter.update_if_greater(0.5, 0.25);
        assert_eq!(plugin.peak_meter().take(), (0.5, 0.25));
        assert_eq!((meter.left(), meter.right()), (0.0, 0.0));
    }
}
