//! YIN pitch estimation over a decoded signal.
//!
//! Sliding windows of `window_len` samples, advanced by `window_step`. Each window
//! goes through the difference function (computed with an FFT autocorrelation), the
//! cumulative mean normalized difference function, and an absolute threshold search.

use crate::audio_io::AudioData;
use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Windows whose harmonic rate is above this are reported as unvoiced.
pub const VOICED_RATE: f64 = 0.03;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YinParams {
    pub window_step: usize,
    pub window_len: usize,
    /// CMNDF value below which a lag counts as a period candidate.
    pub threshold: f64,
    /// Lowest detectable pitch in Hz; sets the largest lag.
    pub f0_min: f64,
    /// Highest detectable pitch in Hz; sets the smallest lag.
    pub f0_max: f64,
}

impl Default for YinParams {
    fn default() -> Self {
        Self {
            window_step: 128,
            window_len: 1024,
            threshold: 0.10,
            f0_min: 54.0,
            f0_max: 1320.0,
        }
    }
}

/// Pitch in Hz (0.0 when nothing was found) and the CMNDF value it was taken at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimate {
    pub pitch: f64,
    pub harmonic_rate: f64,
}

impl PitchEstimate {
    pub const UNVOICED: PitchEstimate = PitchEstimate {
        pitch: 0.0,
        harmonic_rate: 1.0,
    };

    pub fn is_voiced(&self) -> bool {
        self.pitch > 0.0 && self.harmonic_rate <= VOICED_RATE
    }
}

pub struct Yin {
    sample_rate: f64,
    window_step: usize,
    window_len: usize,
    threshold: f64,
    tau_min: usize,
    tau_max: usize,
    size_pad: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl Yin {
    /// Plan a detector for `sample_rate`.
    ///
    /// The window is grown in whole steps until it is longer than the largest lag.
    pub fn new(params: YinParams, sample_rate: u32) -> Self {
        let sample_rate = sample_rate as f64;
        let tau_max = ((sample_rate / params.f0_min) as usize).max(2);
        let tau_min = ((sample_rate / params.f0_max) as usize).clamp(1, tau_max - 1);

        let window_step = params.window_step.max(1);
        let mut window_len = params.window_len.max(window_step);
        while window_len <= tau_max {
            window_len += window_step;
        }

        // Zero padding keeps the circular correlation from wrapping into valid lags
        let size_pad = (window_len + tau_max).next_power_of_two();
        let mut planner = FftPlanner::new();

        Self {
            sample_rate,
            window_step,
            window_len,
            threshold: params.threshold,
            tau_min,
            tau_max,
            size_pad,
            forward: planner.plan_fft_forward(size_pad),
            inverse: planner.plan_fft_inverse(size_pad),
        }
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    pub fn tau_range(&self) -> (usize, usize) {
        (self.tau_min, self.tau_max)
    }

    /// `d(τ) = Σ (x[j] - x[j + τ])²` for `τ` in `0..tau_max`.
    pub fn difference_function(&self, frame: &[f64]) -> Vec<f64> {
        let frame = &frame[..frame.len().min(self.window_len)];
        let w = frame.len();

        let mut cumsum = Vec::with_capacity(w + 1);
        let mut sum = 0.0;
        cumsum.push(sum);
        for x in frame {
            sum += x * x;
            cumsum.push(sum);
        }

        let mut spectrum: Vec<Complex64> = frame
            .iter()
            .map(|&x| Complex64::new(x, 0.0))
            .chain(std::iter::repeat(Complex64::new(0.0, 0.0)))
            .take(self.size_pad)
            .collect();
        self.forward.process(&mut spectrum);
        for x in spectrum.iter_mut() {
            *x = Complex64::new(x.norm_sqr(), 0.0);
        }
        self.inverse.process(&mut spectrum);

        let scale = self.size_pad as f64;
        (0..self.tau_max)
            .map(|tau| {
                if tau > w {
                    return 0.0;
                }
                let acf = spectrum[tau].re / scale;
                (cumsum[w - tau] + cumsum[w] - cumsum[tau] - 2.0 * acf).max(0.0)
            })
            .collect()
    }

    fn evaluate(&self, cmndf: &[f64]) -> PitchEstimate {
        let mut tau = self.tau_min;
        while tau < self.tau_max {
            if cmndf[tau] < self.threshold {
                while tau + 1 < self.tau_max && cmndf[tau + 1] < cmndf[tau] {
                    tau += 1;
                }
                return PitchEstimate {
                    pitch: self.sample_rate / tau as f64,
                    harmonic_rate: cmndf[tau],
                };
            }
            tau += 1;
        }

        PitchEstimate {
            pitch: 0.0,
            harmonic_rate: cmndf.iter().copied().fold(1.0, f64::min),
        }
    }

    /// Estimate the pitch of one window.
    pub fn estimate(&self, frame: &[f64]) -> PitchEstimate {
        let df = self.difference_function(frame);
        self.evaluate(&cumulative_mean_normalized(&df))
    }

    /// Estimate every full window of `signal`. Signals shorter than a window give nothing.
    pub fn analyze(&self, signal: &[f64]) -> Vec<PitchEstimate> {
        signal
            .windows(self.window_len)
            .step_by(self.window_step)
            .map(|frame| self.estimate(frame))
            .collect()
    }
}

/// `d'(0) = 1`, `d'(τ) = d(τ) · τ / Σ_{j=1..=τ} d(j)`.
pub fn cumulative_mean_normalized(df: &[f64]) -> Vec<f64> {
    let mut cmndf = vec![1.0; df.len()];
    let mut sum = 0.0;
    for tau in 1..df.len() {
        sum += df[tau];
        if sum > 0.0 {
            cmndf[tau] = df[tau] * tau as f64 / sum;
        }
    }
    cmndf
}

/// Open guitar string closest to `pitch`, if it is in tune enough to name.
pub fn guitar_string(pitch: f64) -> Option<char> {
    const STRINGS: [(f64, f64, char); 6] = [
        (80.0, 85.0, 'E'),
        (106.0, 113.0, 'A'),
        (142.0, 151.0, 'D'),
        (190.0, 201.0, 'G'),
        (239.0, 254.0, 'B'),
        (320.0, 340.0, 'e'),
    ];
    STRINGS
        .iter()
        .find(|(lo, hi, _)| pitch > *lo && pitch < *hi)
        .map(|&(_, _, name)| name)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PitchSummary {
    pub channel: usize,
    pub windows: usize,
    pub voiced: usize,
    /// Median over voiced windows.
    pub median_pitch: Option<f64>,
}

pub fn summarize(channel: usize, estimates: &[PitchEstimate]) -> PitchSummary {
    let mut voiced: Vec<f64> = estimates
        .iter()
        .filter(|e| e.is_voiced())
        .map(|e| e.pitch)
        .collect();
    voiced.sort_by(f64::total_cmp);

    PitchSummary {
        channel,
        windows: estimates.len(),
        voiced: voiced.len(),
        median_pitch: voiced.get(voiced.len() / 2).copied(),
    }
}

/// Run YIN over each channel of `audio` separately.
pub fn analyze_audio(audio: &AudioData, params: YinParams) -> Vec<PitchSummary> {
    let yin = Yin::new(params, audio.sample_rate());
    (0..audio.num_channels())
        .map(|channel| summarize(channel, &yin.analyze(&audio.channel(channel))))
        .collect()
}
