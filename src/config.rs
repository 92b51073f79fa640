// Analysis, rendering and server settings.
// Defaults reproduce the frame sizes and scales of the usual librosa feature calls,
// so plots line up with what people expect from that toolchain.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Parameters for decoding, feature extraction and figure rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Target sample rate after load (Hz)
    pub sample_rate: u32,
    /// Resample to `sample_rate`; false keeps the file's native rate
    pub resample: bool,
    /// FFT size, also the frame length for RMS and zero crossing rate
    pub n_fft: usize,
    /// Samples between consecutive frames
    pub hop_length: usize,
    pub n_mels: usize,
    pub n_mfcc: usize,
    /// Butterworth order used by every filter
    pub filter_order: usize,
    pub rolloff_percent: f32,
    pub contrast_bands: usize,
    pub contrast_fmin: f32,
    pub contrast_quantile: f32,
    /// Window of the tempogram figure, in onset frames
    pub tempogram_win_length: usize,
    /// Autocorrelation window for the dynamic tempo estimate, in seconds
    pub tempo_ac_size: f32,
    pub start_bpm: f32,
    pub std_bpm: f32,
    pub max_tempo: f32,
    pub render: RenderConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            resample: true,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            n_mfcc: 13,
            filter_order: 5,
            rolloff_percent: 0.85,
            contrast_bands: 6,
            contrast_fmin: 200.0,
            contrast_quantile: 0.02,
            tempogram_win_length: 384,
            tempo_ac_size: 8.0,
            start_bpm: 120.0,
            std_bpm: 1.0,
            max_tempo: 320.0,
            render: RenderConfig::default(),
        }
    }
}

/// Figure size in pixels. 1400x500 is a 14x5 inch figure at 100 dpi.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1400,
            height: 500,
        }
    }
}

impl AnalysisConfig {
    /// Load a TOML config file. Fields missing from the file keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the parameters describe a computable analysis.
    ///
    /// Contrast band edges depend on the sample rate actually used, so
    /// [`AnalysisConfig::validate_for_rate`] repeats that check once the audio is loaded.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidParameter(msg));

        if self.resample && self.sample_rate == 0 {
            return invalid("sample_rate must be positive".to_string());
        }
        if self.n_fft < 2 {
            return invalid(format!("n_fft must be at least 2, got {}", self.n_fft));
        }
        if self.hop_length == 0 || self.hop_length > self.n_fft {
            return invalid(format!(
                "hop_length must be in 1..={}, got {}",
                self.n_fft, self.hop_length
            ));
        }
        if self.n_mels == 0 {
            return invalid("n_mels must be positive".to_string());
        }
        if self.n_mfcc == 0 || self.n_mfcc > self.n_mels {
            return invalid(format!(
                "n_mfcc must be in 1..={}, got {}",
                self.n_mels, self.n_mfcc
            ));
        }
        if self.filter_order == 0 {
            return invalid("filter_order must be positive".to_string());
        }
        if !(self.rolloff_percent > 0.0 && self.rolloff_percent <= 1.0) {
            return invalid(format!(
                "rolloff_percent must be in (0, 1], got {}",
                self.rolloff_percent
            ));
        }
        if !(self.contrast_quantile > 0.0 && self.contrast_quantile < 1.0) {
            return invalid(format!(
                "contrast_quantile must be in (0, 1), got {}",
                self.contrast_quantile
            ));
        }
        if self.contrast_bands == 0 || self.contrast_fmin <= 0.0 {
            return invalid("contrast_bands and contrast_fmin must be positive".to_string());
        }
        if self.tempogram_win_length < 2 {
            return invalid("tempogram_win_length must be at least 2".to_string());
        }
        if self.tempo_ac_size <= 0.0 || self.start_bpm <= 0.0 || self.std_bpm <= 0.0 {
            return invalid("tempo_ac_size, start_bpm and std_bpm must be positive".to_string());
        }
        if self.render.width < 200 || self.render.height < 120 {
            return invalid(format!(
                "render size {}x{} is too small (minimum 200x120)",
                self.render.width, self.render.height
            ));
        }
        if self.resample {
            self.validate_for_rate(self.sample_rate)?;
        }
        Ok(())
    }

    /// Checks that depend on the effective sample rate.
    pub fn validate_for_rate(&self, sample_rate: u32) -> Result<()> {
        let nyquist = sample_rate as f32 / 2.0;
        let highest_lower_edge =
            self.contrast_fmin * 2f32.powi(self.contrast_bands as i32 - 1);
        if highest_lower_edge >= nyquist {
            return Err(Error::InvalidParameter(format!(
                "spectral contrast band starting at {:.0} Hz exceeds Nyquist ({:.0} Hz); \
                 reduce contrast_fmin or contrast_bands",
                highest_lower_edge, nyquist
            )));
        }
        let tempo_window = self.tempo_window_frames(sample_rate);
        if tempo_window < 2 {
            return Err(Error::InvalidParameter(format!(
                "tempo_ac_size of {}s covers fewer than 2 frames",
                self.tempo_ac_size
            )));
        }
        Ok(())
    }

    /// Autocorrelation window for tempo estimation, in frames.
    pub fn tempo_window_frames(&self, sample_rate: u32) -> usize {
        (self.tempo_ac_size as f64 * sample_rate as f64 / self.hop_length as f64).floor() as usize
    }
}

/// Settings for `audiofeat serve`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Maximum number of analyses running at once
    pub max_queue: usize,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 7860,
            max_queue: 10,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tempo_window_frames(22050), 344);
    }

    #[test]
    fn test_load_partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "n_mfcc = 20\nhop_length = 256\n\n[render]\nwidth = 800").unwrap();

        let config = AnalysisConfig::load(file.path()).unwrap();
        assert_eq!(config.n_mfcc, 20);
        assert_eq!(config.hop_length, 256);
        assert_eq!(config.render.width, 800);
        assert_eq!(config.render.height, 500);
        assert_eq!(config.n_fft, 2048);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "n_fft = \"big\"").unwrap();
        assert!(matches!(
            AnalysisConfig::load(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AnalysisConfig::default();
        config.hop_length = 4096;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.n_mfcc = 200;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.rolloff_percent = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_contrast_bands_must_fit_below_nyquist() {
        let config = AnalysisConfig::default();
        // 200 * 2^5 = 6400 Hz is the last lower edge; 8 kHz audio has a 4 kHz Nyquist
        assert!(config.validate_for_rate(8000).is_err());
        assert!(config.validate_for_rate(16000).is_ok());
    }
}
