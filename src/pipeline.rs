use crate::audio_io::{read_audio_file, write_audio_file, AudioData, AudioError, PcmFormat};
use crate::display::WaveformDisplay;
use crate::effects::tremolo::{TremoloEffect, TremoloParams};
use crate::effects::AudioEffect;
use crate::pitch::YinParams;
use std::path::PathBuf;

pub const DEFAULT_INPUT: &str = "input.wav";
pub const DEFAULT_OUTPUT: &str = "tremolo.wav";

/// Where to read, where to write and how to modulate.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub tremolo: TremoloParams,
    pub pitch: YinParams,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            output: PathBuf::from(DEFAULT_OUTPUT),
            tremolo: TremoloParams::default(),
            pitch: YinParams::default(),
        }
    }
}

/// What a completed run did.
#[derive(Debug)]
pub struct RunSummary {
    pub effect: String,
    pub format: PcmFormat,
    pub samples: usize,
    /// Display failures; these never abort a run.
    pub display_errors: Vec<std::io::Error>,
}

/// Decode, show, modulate, show, encode.
///
/// Either the output file is written in full or an error is returned and no
/// output is left behind.
pub fn run(config: &RunConfig, display: &mut dyn WaveformDisplay) -> Result<RunSummary, AudioError> {
    let input = load(config)?;
    let effect = TremoloEffect::with_params(config.tremolo);
    process_loaded(config, &effect, &input, display)
}

pub fn load(config: &RunConfig) -> Result<AudioData, AudioError> {
    read_audio_file(&config.input)
}

/// Everything after decoding: show, process, show, encode.
pub fn process_loaded(
    config: &RunConfig,
    effect: &dyn AudioEffect,
    input: &AudioData,
    display: &mut dyn WaveformDisplay,
) -> Result<RunSummary, AudioError> {
    let mut display_errors = Vec::new();
    if let Err(e) = display.display("Original signal", &input.samples) {
        display_errors.push(e);
    }

    let output = effect.process(input)?;

    if let Err(e) = display.display(&format!("{} signal", effect.name()), &output.samples) {
        display_errors.push(e);
    }

    write_audio_file(&config.output, &output)?;

    Ok(RunSummary {
        effect: effect.name().to_string(),
        format: output.format,
        samples: output.len(),
        display_errors,
    })
}
