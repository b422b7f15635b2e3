use crate::audio_io::{AudioData, AudioError, PcmFormat};

pub mod tremolo;

/// Common trait for audio effects
pub trait AudioEffect {
    /// Get the name of the effect
    fn name(&self) -> &str;

    /// Process audio data through the effect
    fn process(&self, input: &AudioData) -> Result<AudioData, AudioError>;

    /// Check if the effect can handle the given format
    fn supports_format(&self, format: &PcmFormat) -> bool {
        format.sample_rate > 0 && format.channels >= 1
    }
}

/// Common DSP utilities
pub mod dsp {
    use std::f64::consts::PI;

    /// Sine of a phase measured in cycles
    pub fn sine_wave(phase: f64) -> f64 {
        (2.0 * PI * phase).sin()
    }
}
