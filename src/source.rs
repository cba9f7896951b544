//! Audio feature sources: decoded samples plus a live frequency snapshot.
//!
//! The rest of the pipeline treats audio as already decoded; a source
//! hands out channel-0 samples for structure generation and a 0-255
//! magnitude snapshot at the current playhead for per-frame feature
//! extraction. Decode or playback machinery beyond that is someone
//! else's problem.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::HelixError;

/// FFT window size for snapshot analysis (power of 2).
pub const FFT_SIZE: usize = 1024;

/// Bins in a frequency snapshot (positive half of the FFT).
pub const SNAPSHOT_BINS: usize = FFT_SIZE / 2;

/// Magnitude mapping floor (decibels), below which a bin reads 0.
const MIN_DB: f32 = -100.0;

/// Magnitude mapping ceiling (decibels), above which a bin reads 255.
const MAX_DB: f32 = -30.0;

/// Capability exposed to the visualizer: decoded first-channel samples,
/// duration, and an on-demand frequency snapshot at the playhead.
pub trait AudioSource {
    /// Fill `out` with 0-255 bin magnitudes at the current playhead.
    /// `out` is typically [`SNAPSHOT_BINS`] long; extra bins are zeroed.
    fn frequency_snapshot(&mut self, out: &mut [u8]);

    /// Decoded channel-0 samples.
    fn channel_samples(&self) -> &[f32];

    /// Total duration in seconds.
    fn duration_secs(&self) -> f32;

    /// Move the playhead forward. Looping past the end is the source's
    /// choice; [`WavSource`] wraps around.
    fn advance(&mut self, dt_s: f32);
}

/// Placeholder source while no audio is loaded: zero bins, no samples.
#[derive(Debug, Default)]
pub struct SilenceSource;

impl AudioSource for SilenceSource {
    fn frequency_snapshot(&mut self, out: &mut [u8]) {
        out.fill(0);
    }

    fn channel_samples(&self) -> &[f32] {
        &[]
    }

    fn duration_secs(&self) -> f32 {
        0.0
    }

    fn advance(&mut self, _dt_s: f32) {}
}

/// WAV-backed source: decodes the first channel up front and serves
/// Hann-windowed FFT snapshots as the playhead advances.
pub struct WavSource {
    samples: Vec<f32>,
    sample_rate: u32,
    playhead_s: f64,

    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    fft_buffer: Vec<Complex<f32>>,
}

impl WavSource {
    /// Decode a WAV file. Integer formats are normalized to [-1, 1];
    /// only the first channel is kept. Fails without touching any prior
    /// state the caller holds.
    pub fn load(path: &Path) -> Result<Self, HelixError> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .enumerate()
                .filter(|(i, _)| i % channels == 0)
                .map(|(_, s)| s)
                .collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .enumerate()
                    .filter(|(i, _)| i % channels == 0)
                    .map(|(_, s)| s.map(|v| v as f32 * scale))
                    .collect::<Result<_, _>>()?
            }
        };

        debug!(
            path = %path.display(),
            samples = samples.len(),
            sample_rate = spec.sample_rate,
            channels,
            "wav decoded"
        );

        Ok(Self::from_samples(samples, spec.sample_rate))
    }

    /// Build a source from already-decoded channel-0 samples.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);

        // Pre-compute Hann window
        let window: Vec<f32> = (0..FFT_SIZE)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (FFT_SIZE - 1) as f32).cos()))
            .collect();

        Self {
            samples,
            sample_rate: sample_rate.max(1),
            playhead_s: 0.0,
            fft,
            window,
            fft_buffer: vec![Complex::new(0.0, 0.0); FFT_SIZE],
        }
    }

    /// Current playhead position in seconds.
    pub fn playhead_secs(&self) -> f64 {
        self.playhead_s
    }
}

impl AudioSource for WavSource {
    fn frequency_snapshot(&mut self, out: &mut [u8]) {
        let start = (self.playhead_s * self.sample_rate as f64) as usize;

        // Window the samples under the playhead, zero-padding past the end
        for (i, slot) in self.fft_buffer.iter_mut().enumerate() {
            let sample = self.samples.get(start + i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process(&mut self.fft_buffer);

        let norm = 2.0 / FFT_SIZE as f32;
        let db_span = MAX_DB - MIN_DB;
        for (k, slot) in out.iter_mut().enumerate() {
            if k >= SNAPSHOT_BINS {
                *slot = 0;
                continue;
            }
            let magnitude = self.fft_buffer[k].norm() * norm;
            let db = 20.0 * (magnitude + 1e-9).log10();
            *slot = (((db - MIN_DB) / db_span).clamp(0.0, 1.0) * 255.0) as u8;
        }
    }

    fn channel_samples(&self) -> &[f32] {
        &self.samples
    }

    fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    fn advance(&mut self, dt_s: f32) {
        let duration = self.duration_secs() as f64;
        if duration <= 0.0 {
            return;
        }
        self.playhead_s += dt_s.max(0.0) as f64;
        while self.playhead_s >= duration {
            self.playhead_s -= duration;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, rate: u32, secs: f32) -> Vec<f32> {
        (0..(rate as f32 * secs) as usize)
            .map(|i| (2.0 * PI * freq * i as f32 / rate as f32).sin() * 0.5)
            .collect()
    }

    fn write_wav(path: &Path, samples: &[f32], rate: u32, channels: u16) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
            for _ in 1..channels {
                writer.write_sample(0.0f32).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(WavSource::load(Path::new("/definitely/not/here.wav")).is_err());
    }

    #[test]
    fn test_load_roundtrip_keeps_first_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples = sine(440.0, 44_100, 1.0);
        // Second channel is silent; only the first should be decoded
        write_wav(&path, &samples, 44_100, 2);

        let source = WavSource::load(&path).unwrap();
        assert_eq!(source.channel_samples().len(), samples.len());
        assert!((source.duration_secs() - 1.0).abs() < 1e-3);
        assert!(source.channel_samples().iter().any(|&s| s.abs() > 0.1));
    }

    #[test]
    fn test_snapshot_peaks_in_low_bins_for_low_tone() {
        let samples = sine(100.0, 44_100, 1.0);
        let mut source = WavSource::from_samples(samples, 44_100);

        let mut bins = [0u8; SNAPSHOT_BINS];
        source.frequency_snapshot(&mut bins);

        let peak_bin = bins
            .iter()
            .enumerate()
            .max_by_key(|(_, &v)| v)
            .map(|(i, _)| i)
            .unwrap();
        // 100 Hz at 44.1 kHz / 1024-point FFT lands near bin 2
        assert!(peak_bin < 10, "peak bin {} too high for 100 Hz", peak_bin);
        assert!(bins[peak_bin] > 0);
    }

    #[test]
    fn test_playhead_wraps_at_end() {
        let samples = sine(440.0, 44_100, 1.0);
        let mut source = WavSource::from_samples(samples, 44_100);

        source.advance(0.75);
        assert!((source.playhead_secs() - 0.75).abs() < 1e-6);
        source.advance(0.5);
        assert!(source.playhead_secs() < 1.0);
    }

    #[test]
    fn test_silence_source_is_empty() {
        let mut source = SilenceSource;
        let mut bins = [7u8; 64];
        source.frequency_snapshot(&mut bins);
        assert!(bins.iter().all(|&b| b == 0));
        assert!(source.channel_samples().is_empty());
        assert_eq!(source.duration_secs(), 0.0);
    }
}
