use crate::audio_io::AudioData;
use crate::display::{NullDisplay, TerminalDisplay, WaveformDisplay};
use crate::effects::tremolo::TremoloEffect;
use crate::pipeline::{load, process_loaded, RunConfig, RunSummary};
use crate::pitch::{analyze_audio, guitar_string};
use anyhow::{Context, Result};
use std::io::{self, IsTerminal};
use std::process;

pub struct CliApp {
    config: RunConfig,
    interactive: bool,
}

impl CliApp {
    pub fn new() -> Self {
        Self {
            config: RunConfig::default(),
            interactive: io::stdout().is_terminal(),
        }
    }

    pub fn with_config(config: RunConfig, interactive: bool) -> Self {
        Self {
            config,
            interactive,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn run(&self) -> Result<RunSummary> {
        println!(
            "Processing {} with tremolo effect ({} Hz, depth {})...",
            self.config.input.display(),
            self.config.tremolo.mod_frequency,
            self.config.tremolo.depth
        );

        let input = load(&self.config).with_context(|| {
            format!("Failed to read input file {}", self.config.input.display())
        })?;
        self.report_input(&input);

        let effect = TremoloEffect::with_params(self.config.tremolo);
        let mut display = self.display();
        let summary = process_loaded(&self.config, &effect, &input, display.as_mut())
            .with_context(|| {
                format!(
                    "Failed to apply tremolo to {}",
                    self.config.input.display()
                )
            })?;

        self.report(&summary);
        Ok(summary)
    }

    fn display(&self) -> Box<dyn WaveformDisplay> {
        if self.interactive {
            Box::new(TerminalDisplay)
        } else {
            Box::new(NullDisplay)
        }
    }

    fn report_input(&self, input: &AudioData) {
        println!(
            "Input: {} channels, {} Hz, {}-bit, {:.2}s duration",
            input.format.channels,
            input.format.sample_rate,
            input.format.bits_per_sample,
            input.duration_seconds()
        );

        for pitch in analyze_audio(input, self.config.pitch) {
            match pitch.median_pitch {
                Some(hz) => println!(
                    "  Channel {}: pitch {:.2} Hz, note {}, {}/{} windows voiced",
                    pitch.channel,
                    hz,
                    guitar_string(hz).unwrap_or('-'),
                    pitch.voiced,
                    pitch.windows
                ),
                None => println!(
                    "  Channel {}: no pitch detected in {} windows",
                    pitch.channel, pitch.windows
                ),
            }
        }
    }

    fn report(&self, summary: &RunSummary) {
        for error in &summary.display_errors {
            eprintln!("Warning: waveform display failed: {}", error);
        }
        println!(
            "{} effect applied to {} samples. Successfully wrote output to: {}",
            summary.effect,
            summary.samples,
            self.config.output.display()
        );
    }
}

impl Default for CliApp {
    fn default() -> Self {
        Self::new()
    }
}

pub fn run_cli() {
    let app = CliApp::new();

    if let Err(error) = app.run() {
        eprintln!("Error: {:#}", error);
        process::exit(1);
    }
}
