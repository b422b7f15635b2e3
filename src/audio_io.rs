use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Label used for errors raised while decoding or encoding a stream that has no path.
const STREAM_ORIGIN: &str = "<stream>";

#[derive(Debug, Error)]
pub enum AudioError {
    /// The file is missing, unreadable or cannot be written.
    #[error("cannot access {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The container uses an encoding this codec cannot interpret.
    #[error("invalid audio format: {0}")]
    Format(String),
}

impl AudioError {
    fn from_hound(path: &Path, err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(source) => AudioError::FileAccess {
                path: path.to_path_buf(),
                source,
            },
            other => AudioError::Format(format!("{}: {}", path.display(), other)),
        }
    }

    /// Like `from_hound`, but a read that runs out of bytes means the container is malformed.
    fn from_hound_read(path: &Path, err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(source)
                if matches!(
                    source.kind(),
                    io::ErrorKind::UnexpectedEof | io::ErrorKind::Other
                ) =>
            {
                AudioError::Format(format!("{}: truncated container: {}", path.display(), source))
            }
            other => Self::from_hound(path, other),
        }
    }

    fn access(path: &Path, source: io::Error) -> Self {
        AudioError::FileAccess {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Format parameters of a PCM container.
///
/// Read from the input header and handed unchanged to the output writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub channels: u16,
    pub bits_per_sample: u16,
    pub sample_rate: u32,
    /// Number of frames, one sample per channel each.
    pub frame_count: u32,
}

impl PcmFormat {
    /// Validate a WAV header and capture its parameters.
    ///
    /// Only integer PCM between 1 and 32 bits with at least one channel is accepted.
    pub fn from_spec(spec: WavSpec, frame_count: u32) -> Result<Self, AudioError> {
        if spec.sample_format != SampleFormat::Int {
            return Err(AudioError::Format(
                "only integer PCM samples are supported".to_string(),
            ));
        }
        if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
            return Err(AudioError::Format(format!(
                "unsupported sample width: {} bits",
                spec.bits_per_sample
            )));
        }
        if spec.channels == 0 {
            return Err(AudioError::Format("container declares no channels".to_string()));
        }

        Ok(Self {
            channels: spec.channels,
            bits_per_sample: spec.bits_per_sample,
            sample_rate: spec.sample_rate,
            frame_count,
        })
    }

    pub fn wav_spec(&self) -> WavSpec {
        WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            sample_format: SampleFormat::Int,
        }
    }

    /// Normalization constant for this format's bit depth.
    pub fn norm_scale(&self) -> Result<NormScale, AudioError> {
        NormScale::for_bits(self.bits_per_sample)
    }

    /// Total number of interleaved samples.
    pub fn sample_count(&self) -> usize {
        self.frame_count as usize * self.channels as usize
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count as f64 / self.sample_rate as f64
    }
}

/// Conversion constant between integer PCM and normalized floats.
///
/// The factor is the full-scale magnitude of the bit depth plus a little
/// headroom, so the most negative integer lands just inside -1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormScale {
    factor: f64,
    min: i32,
    max: i32,
}

impl NormScale {
    pub const HEADROOM: f64 = 0.49999;

    pub fn for_bits(bits: u16) -> Result<Self, AudioError> {
        if bits == 0 || bits > 32 {
            return Err(AudioError::Format(format!(
                "no normalization constant for {} bits",
                bits
            )));
        }
        let full_scale = 1i64 << (bits - 1);

        Ok(Self {
            factor: full_scale as f64 + Self::HEADROOM,
            min: -full_scale as i32,
            max: (full_scale - 1) as i32,
        })
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn to_float(&self, sample: i32) -> f64 {
        sample as f64 / self.factor
    }

    /// Scale back to the integer range, truncating toward zero.
    ///
    /// Values beyond the bit depth saturate at its limits; NaN maps to zero.
    pub fn to_int(&self, sample: f64) -> i32 {
        let scaled = (sample * self.factor).trunc();
        if scaled.is_nan() {
            return 0;
        }
        scaled.clamp(self.min as f64, self.max as f64) as i32
    }
}

pub fn normalize(samples: &[i32], scale: NormScale) -> Vec<f64> {
    samples.iter().map(|&s| scale.to_float(s)).collect()
}

pub fn denormalize(samples: &[f64], scale: NormScale) -> Vec<i32> {
    samples.iter().map(|&s| scale.to_int(s)).collect()
}

/// Raw integer samples exactly as stored in the container, interleaved.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    pub samples: Vec<i32>,
    pub format: PcmFormat,
}

impl PcmBuffer {
    pub fn to_audio_data(&self) -> Result<AudioData, AudioError> {
        let scale = self.format.norm_scale()?;
        Ok(AudioData::new(normalize(&self.samples, scale), self.format))
    }
}

/// Normalized samples in [-1.0, 1.0] with the format they were decoded from.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioData {
    pub samples: Vec<f64>,
    pub format: PcmFormat,
}

impl AudioData {
    pub fn new(samples: Vec<f64>, format: PcmFormat) -> Self {
        Self { samples, format }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn num_channels(&self) -> usize {
        self.format.channels as usize
    }

    pub fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    pub fn duration_seconds(&self) -> f64 {
        self.format.duration_seconds()
    }

    /// De-interleave one channel.
    pub fn channel(&self, channel: usize) -> Vec<f64> {
        if channel >= self.num_channels() {
            return Vec::new();
        }
        self.samples
            .iter()
            .skip(channel)
            .step_by(self.num_channels())
            .copied()
            .collect()
    }

    pub fn to_pcm(&self) -> Result<PcmBuffer, AudioError> {
        let scale = self.format.norm_scale()?;
        Ok(PcmBuffer {
            samples: denormalize(&self.samples, scale),
            format: self.format,
        })
    }
}

/// Decode a whole WAV stream into integer samples.
pub fn read_pcm<R: Read>(reader: R) -> Result<PcmBuffer, AudioError> {
    decode(reader, Path::new(STREAM_ORIGIN))
}

/// Decode a whole WAV file into integer samples.
pub fn read_pcm_file<P: AsRef<Path>>(path: P) -> Result<PcmBuffer, AudioError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| AudioError::access(path, e))?;
    decode(BufReader::new(file), path)
}

fn decode<R: Read>(reader: R, origin: &Path) -> Result<PcmBuffer, AudioError> {
    let mut reader =
        WavReader::new(reader).map_err(|e| AudioError::from_hound_read(origin, e))?;
    let format = PcmFormat::from_spec(reader.spec(), reader.duration())?;

    let samples = reader
        .samples::<i32>()
        .collect::<Result<Vec<i32>, _>>()
        .map_err(|e| AudioError::from_hound_read(origin, e))?;

    if samples.len() != format.sample_count() {
        return Err(AudioError::Format(format!(
            "{}: expected {} samples, found {}",
            origin.display(),
            format.sample_count(),
            samples.len()
        )));
    }

    Ok(PcmBuffer { samples, format })
}

/// Encode integer samples into a WAV stream.
pub fn write_pcm<W: Write + Seek>(writer: W, buffer: &PcmBuffer) -> Result<(), AudioError> {
    encode(writer, buffer, Path::new(STREAM_ORIGIN))
}

/// Encode integer samples into a new WAV file.
///
/// A file left half-written by a failed encode is removed.
pub fn write_pcm_file<P: AsRef<Path>>(path: P, buffer: &PcmBuffer) -> Result<(), AudioError> {
    let path = path.as_ref();
    check_frames(buffer, path)?;

    let file = File::create(path).map_err(|e| AudioError::access(path, e))?;
    encode_or_remove(BufWriter::new(file), buffer, path)
}

/// Encode into `writer`, which backs the file at `path`; remove that file on failure.
fn encode_or_remove<W: Write + Seek>(
    writer: W,
    buffer: &PcmBuffer,
    path: &Path,
) -> Result<(), AudioError> {
    let result = encode(writer, buffer, path);
    if result.is_err() {
        let _ = fs::remove_file(path);
    }
    result
}

fn check_frames(buffer: &PcmBuffer, origin: &Path) -> Result<(), AudioError> {
    if buffer.samples.len() != buffer.format.sample_count() {
        return Err(AudioError::Format(format!(
            "{}: {} samples do not fill {} frames of {} channels",
            origin.display(),
            buffer.samples.len(),
            buffer.format.frame_count,
            buffer.format.channels
        )));
    }
    Ok(())
}

fn encode<W: Write + Seek>(writer: W, buffer: &PcmBuffer, origin: &Path) -> Result<(), AudioError> {
    check_frames(buffer, origin)?;

    let mut writer = WavWriter::new(writer, buffer.format.wav_spec())
        .map_err(|e| AudioError::from_hound(origin, e))?;

    for &sample in &buffer.samples {
        writer
            .write_sample(sample)
            .map_err(|e| AudioError::from_hound(origin, e))?;
    }

    writer
        .finalize()
        .map_err(|e| AudioError::from_hound(origin, e))
}

/// Read an audio file and return samples normalized to [-1.0, 1.0].
pub fn read_audio_file<P: AsRef<Path>>(path: P) -> Result<AudioData, AudioError> {
    read_pcm_file(path)?.to_audio_data()
}

/// Write normalized samples to a WAV file using their own format.
pub fn write_audio_file<P: AsRef<Path>>(path: P, audio: &AudioData) -> Result<(), AudioError> {
    write_pcm_file(path, &audio.to_pcm()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn mono16(frame_count: u32) -> PcmFormat {
        PcmFormat {
            channels: 1,
            bits_per_sample: 16,
            sample_rate: 44100,
            frame_count,
        }
    }

    fn encode_to_bytes(buffer: &PcmBuffer) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        write_pcm(&mut cursor, buffer).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_norm_scale_constants() {
        let scale = NormScale::for_bits(16).unwrap();
        assert!((scale.factor() - 32_768.49999).abs() < 1e-9);

        let scale = NormScale::for_bits(32).unwrap();
        assert!((scale.factor() - 2_147_483_648.49999).abs() < 1e-6);

        assert!(NormScale::for_bits(0).is_err());
        assert!(NormScale::for_bits(33).is_err());
    }

    #[test]
    fn test_sample_conversion() {
        let scale = NormScale::for_bits(16).unwrap();
        assert_eq!(scale.to_float(0), 0.0);
        assert!(scale.to_float(-32768) > -1.0);
        assert!((scale.to_float(-32768) + 1.0).abs() < 1e-4);
        assert!(scale.to_float(32767) < 1.0);

        assert_eq!(scale.to_int(0.0), 0);
        assert_eq!(scale.to_int(f64::NAN), 0);
        // Truncation toward zero, not rounding
        assert_eq!(scale.to_int(0.9 / scale.factor()), 0);
        assert_eq!(scale.to_int(-1.9 / scale.factor()), -1);
    }

    #[test]
    fn test_denormalize_saturates() {
        let scale = NormScale::for_bits(16).unwrap();
        assert_eq!(scale.to_int(1.5), 32767);
        assert_eq!(scale.to_int(-1.5), -32768);

        let scale = NormScale::for_bits(32).unwrap();
        assert_eq!(scale.to_int(2.0), i32::MAX);
        assert_eq!(scale.to_int(-2.0), i32::MIN);

        let scale = NormScale::for_bits(8).unwrap();
        assert_eq!(scale.to_int(1.0), 127);
        assert_eq!(scale.to_int(-1.0), -128);
    }

    #[test]
    fn test_normalize_round_trip_within_one_lsb() {
        for bits in [8u16, 16, 24, 32] {
            let scale = NormScale::for_bits(bits).unwrap();
            let max = ((1i64 << (bits - 1)) - 1) as i32;
            let min = -(1i64 << (bits - 1)) as i32;
            let samples = vec![min, min + 1, -1, 0, 1, max / 3, max - 1, max];

            let restored = denormalize(&normalize(&samples, scale), scale);
            assert_eq!(restored.len(), samples.len());
            for (a, b) in samples.iter().zip(&restored) {
                assert!((*a as i64 - *b as i64).abs() <= 1, "{} bits: {} -> {}", bits, a, b);
            }
        }
    }

    #[test]
    fn test_format_rejects_float_samples() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        assert!(matches!(
            PcmFormat::from_spec(spec, 0),
            Err(AudioError::Format(_))
        ));
    }

    #[test]
    fn test_stream_round_trip_preserves_format() {
        let format = PcmFormat {
            channels: 2,
            bits_per_sample: 24,
            sample_rate: 48000,
            frame_count: 3,
        };
        let buffer = PcmBuffer {
            samples: vec![0, 1, -1, 8_388_607, -8_388_608, 12345],
            format,
        };

        let bytes = encode_to_bytes(&buffer);
        let decoded = read_pcm(Cursor::new(bytes)).unwrap();

        assert_eq!(decoded, buffer);
    }

    #[test]
    fn test_empty_buffer_writes_valid_container() {
        let buffer = PcmBuffer {
            samples: Vec::new(),
            format: mono16(0),
        };

        let bytes = encode_to_bytes(&buffer);
        let decoded = read_pcm(Cursor::new(bytes)).unwrap();

        assert!(decoded.samples.is_empty());
        assert_eq!(decoded.format, buffer.format);
    }

    #[test]
    fn test_misaligned_buffer_is_rejected() {
        let buffer = PcmBuffer {
            samples: vec![1, 2, 3],
            format: PcmFormat {
                channels: 2,
                ..mono16(1)
            },
        };
        let mut cursor = Cursor::new(Vec::new());
        assert!(matches!(
            write_pcm(&mut cursor, &buffer),
            Err(AudioError::Format(_))
        ));
    }

    #[test]
    fn test_garbage_input_is_format_error() {
        let result = read_pcm(Cursor::new(b"not a wav file".to_vec()));
        assert!(matches!(result, Err(AudioError::Format(_))));
    }

    #[test]
    fn test_truncated_header_is_format_error() {
        let result = read_pcm(Cursor::new(b"RIFF\x00\x00".to_vec()));
        assert!(matches!(result, Err(AudioError::Format(_))));
    }

    #[test]
    fn test_truncated_data_is_format_error() {
        let buffer = PcmBuffer {
            samples: (0..100).map(|i| i * 300 - 15_000).collect(),
            format: mono16(100),
        };
        let mut bytes = encode_to_bytes(&buffer);
        bytes.truncate(bytes.len() - 51);

        let result = read_pcm(Cursor::new(bytes));
        assert!(matches!(result, Err(AudioError::Format(_))));
    }

    /// Accepts a fixed number of bytes, then fails every write.
    struct ShortWriter {
        budget: usize,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::other("disk full"));
            }
            let n = buf.len().min(self.budget);
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Seek for ShortWriter {
        fn seek(&mut self, _pos: io::SeekFrom) -> io::Result<u64> {
            Ok(0)
        }
    }

    #[test]
    fn test_failed_encode_removes_file() {
        let path = std::env::temp_dir().join(format!(
            "tremolofx_partial_{}.wav",
            std::process::id()
        ));
        fs::write(&path, b"partial").unwrap();
        let buffer = PcmBuffer {
            samples: vec![1000; 256],
            format: mono16(256),
        };

        let result = encode_or_remove(ShortWriter { budget: 64 }, &buffer, &path);

        assert!(matches!(result, Err(AudioError::FileAccess { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_file_is_access_error() {
        let result = read_audio_file("/nonexistent/path/input.wav");
        assert!(matches!(result, Err(AudioError::FileAccess { .. })));
    }

    #[test]
    fn test_audio_data_channels() {
        let format = PcmFormat {
            channels: 2,
            ..mono16(3)
        };
        let audio = AudioData::new(vec![0.1, -0.1, 0.2, -0.2, 0.3, -0.3], format);

        assert_eq!(audio.len(), 6);
        assert_eq!(audio.num_channels(), 2);
        assert_eq!(audio.channel(0), vec![0.1, 0.2, 0.3]);
        assert_eq!(audio.channel(1), vec![-0.1, -0.2, -0.3]);
        assert!(audio.channel(2).is_empty());
        assert!((audio.duration_seconds() - 3.0 / 44100.0).abs() < 1e-12);
    }
}
