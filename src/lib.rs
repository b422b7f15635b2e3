//! Sine tremolo for integer PCM WAV files.
//!
//! Reads `input.wav`, shows the waveform, modulates its amplitude, shows the
//! result and writes `tremolo.wav` with the input's exact format. The decoded
//! input also gets an offline YIN pitch estimate per channel.

pub mod audio_io;
pub mod cli;
pub mod display;
pub mod effects;
pub mod pipeline;
pub mod pitch;

pub use audio_io::{AudioData, AudioError, NormScale, PcmBuffer, PcmFormat};
pub use effects::tremolo::{apply_tremolo, ChannelMode, TremoloEffect, TremoloParams};
pub use effects::AudioEffect;
pub use pipeline::{run, RunConfig, RunSummary};
pub use pitch::{PitchEstimate, PitchSummary, Yin, YinParams};
