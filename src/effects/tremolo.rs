//! Sine tremolo.
//!
//! The gain at sample `i` is `1 + depth * sin(2π · i · f / sample_rate)`. It depends
//! only on the absolute index, so any index range can be processed on its own and
//! long signals accumulate no phase error.

use crate::audio_io::{AudioData, AudioError};
use crate::effects::dsp::sine_wave;
use crate::effects::AudioEffect;

/// How interleaved channels are mapped onto the oscillator index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelMode {
    /// Every interleaved element advances the oscillator, regardless of channel.
    #[default]
    Interleaved,
    /// All channels of a frame share the gain of the frame index.
    PerFrame,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TremoloParams {
    /// Oscillator rate in Hz.
    pub mod_frequency: f64,
    /// Fraction of amplitude swing. Values above 1 flip polarity at the troughs.
    pub depth: f64,
    pub channel_mode: ChannelMode,
}

impl Default for TremoloParams {
    fn default() -> Self {
        Self {
            mod_frequency: 5.0,
            depth: 0.5,
            channel_mode: ChannelMode::Interleaved,
        }
    }
}

/// Gain applied to the sample at `index`.
pub fn tremolo_gain(index: usize, mod_frequency: f64, sample_rate: f64, depth: f64) -> f64 {
    let phase = index as f64 * mod_frequency / sample_rate;
    1.0 + depth * sine_wave(phase)
}

/// Modulate a copy of `signal`.
pub fn apply_tremolo(signal: &[f64], mod_frequency: f64, sample_rate: f64, depth: f64) -> Vec<f64> {
    let mut output = signal.to_vec();
    apply_tremolo_in_place(&mut output, 0, mod_frequency, sample_rate, depth);
    output
}

/// Modulate `samples` in place, where `samples[0]` sits at absolute index `start_index`.
pub fn apply_tremolo_in_place(
    samples: &mut [f64],
    start_index: usize,
    mod_frequency: f64,
    sample_rate: f64,
    depth: f64,
) {
    for (offset, sample) in samples.iter_mut().enumerate() {
        *sample *= tremolo_gain(start_index + offset, mod_frequency, sample_rate, depth);
    }
}

/// Modulate interleaved frames so that every channel of a frame gets the same gain.
pub fn apply_tremolo_frames(
    signal: &[f64],
    channels: usize,
    mod_frequency: f64,
    sample_rate: f64,
    depth: f64,
) -> Vec<f64> {
    let channels = channels.max(1);
    signal
        .chunks(channels)
        .enumerate()
        .flat_map(|(frame, samples)| {
            let gain = tremolo_gain(frame, mod_frequency, sample_rate, depth);
            samples.iter().map(move |s| s * gain)
        })
        .collect()
}

pub struct TremoloEffect {
    params: TremoloParams,
}

impl Default for TremoloEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl TremoloEffect {
    pub fn new() -> Self {
        Self::with_params(TremoloParams::default())
    }

    pub fn with_params(params: TremoloParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TremoloParams {
        &self.params
    }
}

impl AudioEffect for TremoloEffect {
    fn name(&self) -> &str {
        "Tremolo"
    }

    fn process(&self, input: &AudioData) -> Result<AudioData, AudioError> {
        if !self.supports_format(&input.format) {
            return Err(AudioError::Format(format!(
                "tremolo cannot process {} channels at {} Hz",
                input.format.channels, input.format.sample_rate
            )));
        }

        let TremoloParams {
            mod_frequency,
            depth,
            channel_mode,
        } = self.params;
        let sample_rate = input.sample_rate() as f64;

        let samples = match channel_mode {
            ChannelMode::Interleaved => {
                apply_tremolo(&input.samples, mod_frequency, sample_rate, depth)
            }
            ChannelMode::PerFrame => apply_tremolo_frames(
                &input.samples,
                input.num_channels(),
                mod_frequency,
                sample_rate,
                depth,
            ),
        };

        Ok(AudioData::new(samples, input.format))
    }
}
