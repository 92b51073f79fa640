// Analysis pipeline: decoded audio in, eleven rendered feature plots out.
//
// 1. Apply the requested Butterworth filters
// 2. Compute the requested features from one shared STFT and mel spectrogram
// 3. Build a figure per visualization and render them in parallel (order preserved)

use ndarray::Array2;
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::audio::decoder::{decode_bytes_to_mono, MonoAudio};
use crate::audio::features::{
    median, rms, spectral_bandwidth, spectral_centroid, spectral_contrast, spectral_rolloff,
    zero_crossing_rate,
};
use crate::audio::filter::{apply_filters, FilterBand, FilterSettings};
use crate::audio::mel::{mel_filterbank, melspectrogram, mfcc};
use crate::audio::resample::{conform, load};
use crate::audio::rhythm::{dynamic_tempo, onset_strength, tempogram, TempoParams};
use crate::audio::stft::{
    amplitude_to_db, fft_frequencies, frame_count, frames_to_time, stft_magnitude, Reference,
};
use crate::audio::waveform::WaveformEnvelope;
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::render::{render_png, Figure, PlotKind, YAxis};

/// The plots produced for every file, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visualization {
    Waveform,
    Spectrogram,
    Mfcc,
    ZeroCrossingRate,
    SpectralCentroid,
    SpectralBandwidth,
    RmsEnergy,
    SpectralContrast,
    SpectralRolloff,
    Tempo,
    Tempogram,
}

impl Visualization {
    pub const ALL: [Visualization; 11] = [
        Visualization::Waveform,
        Visualization::Spectrogram,
        Visualization::Mfcc,
        Visualization::ZeroCrossingRate,
        Visualization::SpectralCentroid,
        Visualization::SpectralBandwidth,
        Visualization::RmsEnergy,
        Visualization::SpectralContrast,
        Visualization::SpectralRolloff,
        Visualization::Tempo,
        Visualization::Tempogram,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Visualization::Waveform => "Waveform",
            Visualization::Spectrogram => "Spectrogram",
            Visualization::Mfcc => "MFCC",
            Visualization::ZeroCrossingRate => "Zero Crossing Rate",
            Visualization::SpectralCentroid => "Spectral Centroid",
            Visualization::SpectralBandwidth => "Spectral Bandwidth",
            Visualization::RmsEnergy => "RMS Energy",
            Visualization::SpectralContrast => "Spectral Contrast",
            Visualization::SpectralRolloff => "Spectral Rolloff",
            Visualization::Tempo => "Tempo",
            Visualization::Tempogram => "Tempogram",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Visualization::Waveform => "Visual representation of the audio signal over time.",
            Visualization::Spectrogram => {
                "Graphical representation of the spectrum of frequencies in a sound signal as they vary with time."
            }
            Visualization::Mfcc => {
                "Mel-frequency cepstral coefficients, representing the short-term power spectrum of a sound."
            }
            Visualization::ZeroCrossingRate => {
                "Rate at which the signal changes from positive to negative or back."
            }
            Visualization::SpectralCentroid => {
                "Indicates where the center of mass of the spectrum is located."
            }
            Visualization::SpectralBandwidth => "The width of a range of frequencies.",
            Visualization::RmsEnergy => "Root Mean Square energy of the audio signal.",
            Visualization::SpectralContrast => {
                "Difference in amplitude between peaks and valleys in a sound spectrum."
            }
            Visualization::SpectralRolloff => {
                "Frequency below which a specified percentage of the total spectral energy lies."
            }
            Visualization::Tempo => "Estimated tempo of the audio signal.",
            Visualization::Tempogram => "Localized autocorrelation of the onset strength envelope.",
        }
    }

    /// `"<name>: <description>"`, the caption shown next to each plot.
    pub fn label(&self) -> String {
        format!("{}: {}", self.name(), self.description())
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Visualization::Waveform => "waveform",
            Visualization::Spectrogram => "spectrogram",
            Visualization::Mfcc => "mfcc",
            Visualization::ZeroCrossingRate => "zero_crossing_rate",
            Visualization::SpectralCentroid => "spectral_centroid",
            Visualization::SpectralBandwidth => "spectral_bandwidth",
            Visualization::RmsEnergy => "rms_energy",
            Visualization::SpectralContrast => "spectral_contrast",
            Visualization::SpectralRolloff => "spectral_rolloff",
            Visualization::Tempo => "tempo",
            Visualization::Tempogram => "tempogram",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        let slug = slug.trim().to_lowercase().replace('-', "_");
        Self::ALL.iter().copied().find(|v| v.slug() == slug)
    }

    /// Position in the output order, starting at 1.
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|v| v == self).map_or(0, |i| i + 1)
    }
}

/// Every feature array the plots are drawn from.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub sample_rate: u32,
    pub hop_length: usize,
    /// STFT frames; every frame-based feature has this many values
    pub n_frames: usize,
    /// Magnitude spectrogram in dB relative to its peak
    pub spectrogram_db: Array2<f32>,
    pub mfcc: Array2<f32>,
    pub zero_crossing_rate: Vec<f32>,
    pub spectral_centroid: Vec<f32>,
    pub spectral_bandwidth: Vec<f32>,
    pub rms: Vec<f32>,
    pub spectral_contrast: Array2<f32>,
    pub spectral_rolloff: Vec<f32>,
    pub onset_strength: Vec<f32>,
    /// Tempo estimate per frame (BPM)
    pub tempo: Vec<f32>,
    pub tempogram: Array2<f32>,
}

impl FeatureSet {
    /// Compute every feature.
    pub fn compute(samples: &[f32], sample_rate: u32, config: &AnalysisConfig) -> Result<Self> {
        Self::compute_for(samples, sample_rate, config, &Visualization::ALL)
    }

    /// Compute only the features `selection` plots. Fields nobody asked for stay empty.
    pub fn compute_for(
        samples: &[f32],
        sample_rate: u32,
        config: &AnalysisConfig,
        selection: &[Visualization],
    ) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::EmptyAudio);
        }
        config.validate()?;
        config.validate_for_rate(sample_rate)?;

        let wants = |v: Visualization| selection.contains(&v);
        let needs_stft = selection.iter().any(|&v| v != Visualization::Waveform);
        let needs_onset = wants(Visualization::Tempo) || wants(Visualization::Tempogram);

        let (n_fft, hop) = (config.n_fft, config.hop_length);
        let mut features = Self {
            sample_rate,
            hop_length: hop,
            n_frames: frame_count(samples.len(), n_fft, hop),
            spectrogram_db: Array2::zeros((0, 0)),
            mfcc: Array2::zeros((0, 0)),
            zero_crossing_rate: Vec::new(),
            spectral_centroid: Vec::new(),
            spectral_bandwidth: Vec::new(),
            rms: Vec::new(),
            spectral_contrast: Array2::zeros((0, 0)),
            spectral_rolloff: Vec::new(),
            onset_strength: Vec::new(),
            tempo: Vec::new(),
            tempogram: Array2::zeros((0, 0)),
        };
        if !needs_stft {
            return Ok(features);
        }

        let magnitude = stft_magnitude(samples, n_fft, hop);
        let freqs = fft_frequencies(sample_rate, n_fft);
        features.n_frames = magnitude.ncols();

        if wants(Visualization::Spectrogram) {
            features.spectrogram_db =
                amplitude_to_db(&magnitude, Reference::Max, 1e-5, Some(80.0));
        }
        if wants(Visualization::ZeroCrossingRate) {
            features.zero_crossing_rate = zero_crossing_rate(samples, n_fft, hop);
        }
        if wants(Visualization::RmsEnergy) {
            features.rms = rms(samples, n_fft, hop);
        }
        if wants(Visualization::SpectralCentroid) || wants(Visualization::SpectralBandwidth) {
            let centroid = spectral_centroid(&magnitude, &freqs);
            if wants(Visualization::SpectralBandwidth) {
                features.spectral_bandwidth = spectral_bandwidth(&magnitude, &freqs, &centroid);
            }
            features.spectral_centroid = centroid;
        }
        if wants(Visualization::SpectralContrast) {
            features.spectral_contrast = spectral_contrast(
                &magnitude,
                &freqs,
                sample_rate,
                config.contrast_bands,
                config.contrast_fmin,
                config.contrast_quantile,
            )?;
        }
        if wants(Visualization::SpectralRolloff) {
            features.spectral_rolloff =
                spectral_rolloff(&magnitude, &freqs, config.rolloff_percent);
        }

        if wants(Visualization::Mfcc) || needs_onset {
            let power = magnitude.mapv(|v| v * v);
            let mel = melspectrogram(&power, &mel_filterbank(sample_rate, n_fft, config.n_mels));
            if wants(Visualization::Mfcc) {
                features.mfcc = mfcc(&mel, config.n_mfcc);
            }
            if needs_onset {
                let onset = onset_strength(&mel, n_fft, hop);
                if wants(Visualization::Tempo) {
                    let tempo_params = TempoParams {
                        ac_size: config.tempo_ac_size,
                        start_bpm: config.start_bpm,
                        std_bpm: config.std_bpm,
                        max_tempo: config.max_tempo,
                    };
                    features.tempo = dynamic_tempo(&onset, sample_rate, hop, &tempo_params)?;
                }
                if wants(Visualization::Tempogram) {
                    features.tempogram = tempogram(&onset, config.tempogram_win_length)?;
                }
                features.onset_strength = onset;
            }
        }

        Ok(features)
    }

    /// Time in seconds covered by `n_frames` frames.
    fn frames_duration(&self) -> f32 {
        (self.n_frames * self.hop_length) as f32 / self.sample_rate as f32
    }

    fn frame_times(&self, frames: usize) -> Vec<f32> {
        frames_to_time(frames, self.sample_rate, self.hop_length)
    }
}

/// One rendered plot.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedPlot {
    pub visualization: Visualization,
    pub title: String,
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub png: Vec<u8>,
}

/// Everything produced for one input file.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub file_name: String,
    /// Rate the features were computed at
    pub sample_rate: u32,
    pub duration_ms: u64,
    /// Filters that actually ran, in order
    pub filters: Vec<FilterBand>,
    /// Median of the per-frame tempo estimate; `None` when the tempo plot was not requested
    pub median_tempo_bpm: Option<f32>,
    pub plots: Vec<RenderedPlot>,
}

/// Decode, filter, analyze and render an audio file.
pub fn analyze_file(
    path: &Path,
    filters: &FilterSettings,
    config: &AnalysisConfig,
) -> Result<AnalysisReport> {
    analyze_file_with(path, filters, config, &Visualization::ALL)
}

/// [`analyze_file`] restricted to a subset of plots (kept in output order).
pub fn analyze_file_with(
    path: &Path,
    filters: &FilterSettings,
    config: &AnalysisConfig,
    selection: &[Visualization],
) -> Result<AnalysisReport> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let audio = load(path, config)?;
    analyze_audio_with(&file_name, audio, filters, config, selection)
}

/// Analyze an in-memory audio file, e.g. an HTTP upload. The extension of
/// `file_name` is used as a format hint.
pub fn analyze_bytes(
    file_name: &str,
    bytes: Vec<u8>,
    filters: &FilterSettings,
    config: &AnalysisConfig,
) -> Result<AnalysisReport> {
    let extension = Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase());
    let audio = decode_bytes_to_mono(bytes, extension.as_deref())?;
    let audio = conform(audio, config)?;
    analyze_audio(file_name, audio, filters, config)
}

/// Run the full pipeline on decoded audio.
pub fn analyze_audio(
    file_name: &str,
    audio: MonoAudio,
    filters: &FilterSettings,
    config: &AnalysisConfig,
) -> Result<AnalysisReport> {
    analyze_audio_with(file_name, audio, filters, config, &Visualization::ALL)
}

pub fn analyze_audio_with(
    file_name: &str,
    audio: MonoAudio,
    filters: &FilterSettings,
    config: &AnalysisConfig,
    selection: &[Visualization],
) -> Result<AnalysisReport> {
    if audio.is_empty() {
        return Err(Error::EmptyAudio);
    }
    config.validate()?;
    let started = Instant::now();
    info!(
        file = file_name,
        sample_rate = audio.sample_rate,
        duration_ms = audio.duration_ms,
        "analyzing"
    );

    let (samples, applied) =
        apply_filters(&audio.samples, audio.sample_rate, filters, config.filter_order)?;
    let wanted: Vec<Visualization> = Visualization::ALL
        .iter()
        .copied()
        .filter(|v| selection.contains(v))
        .collect();

    let features = FeatureSet::compute_for(&samples, audio.sample_rate, config, &wanted)?;
    debug!(
        frames = features.n_frames,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "features computed"
    );

    let plots = wanted
        .par_iter()
        .map(|&visualization| {
            let figure = build_figure(visualization, &features, &samples, file_name, config);
            let png = render_png(&figure, &config.render)?;
            Ok(RenderedPlot {
                visualization,
                title: figure.title,
                width: config.render.width,
                height: config.render.height,
                png,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let median_tempo_bpm = median(&features.tempo);
    info!(
        file = file_name,
        plots = plots.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "analysis complete"
    );

    Ok(AnalysisReport {
        file_name: file_name.to_string(),
        sample_rate: audio.sample_rate,
        duration_ms: audio.duration_ms,
        filters: applied,
        median_tempo_bpm,
        plots,
    })
}

/// Figure for one visualization; titles read `"<name> (<file name>)"`.
pub fn build_figure(
    visualization: Visualization,
    features: &FeatureSet,
    samples: &[f32],
    file_name: &str,
    config: &AnalysisConfig,
) -> Figure {
    let title = format!("{} ({})", visualization.name(), file_name);
    let duration_s = features.frames_duration();
    let frames = |values: &[f32]| (0..values.len()).map(|i| i as f32).collect::<Vec<_>>();

    let (x_label, y_label, kind) = match visualization {
        Visualization::Waveform => (
            "Time",
            "Amplitude",
            PlotKind::Waveform {
                envelope: WaveformEnvelope::from_samples(samples, config.render.width as usize),
                duration_s: samples.len() as f32 / features.sample_rate as f32,
            },
        ),
        Visualization::Spectrogram => (
            "Time",
            "Hz",
            PlotKind::Heatmap {
                values: features.spectrogram_db.clone(),
                duration_s,
                y_axis: YAxis::LogFrequency {
                    max_hz: features.sample_rate as f32 / 2.0,
                },
                colorbar_unit: Some("dB".to_string()),
            },
        ),
        Visualization::Mfcc => (
            "Time",
            "Coefficient",
            heatmap(features.mfcc.clone(), duration_s),
        ),
        Visualization::ZeroCrossingRate => (
            "Frames",
            "Rate",
            PlotKind::Line {
                x: frames(&features.zero_crossing_rate),
                y: features.zero_crossing_rate.clone(),
                log_y: false,
            },
        ),
        Visualization::SpectralCentroid => (
            "Time",
            "Hz",
            PlotKind::Line {
                x: features.frame_times(features.spectral_centroid.len()),
                y: features.spectral_centroid.clone(),
                log_y: true,
            },
        ),
        Visualization::SpectralBandwidth => (
            "Time",
            "Hz",
            PlotKind::Line {
                x: features.frame_times(features.spectral_bandwidth.len()),
                y: features.spectral_bandwidth.clone(),
                log_y: true,
            },
        ),
        Visualization::RmsEnergy => (
            "Frames",
            "RMS",
            PlotKind::Line {
                x: frames(&features.rms),
                y: features.rms.clone(),
                log_y: false,
            },
        ),
        Visualization::SpectralContrast => (
            "Time",
            "Band",
            heatmap(features.spectral_contrast.clone(), duration_s),
        ),
        Visualization::SpectralRolloff => (
            "Time",
            "Hz",
            PlotKind::Line {
                x: features.frame_times(features.spectral_rolloff.len()),
                y: features.spectral_rolloff.clone(),
                log_y: true,
            },
        ),
        Visualization::Tempo => (
            "Time",
            "Tempo",
            PlotKind::Line {
                x: features.frame_times(features.tempo.len()),
                y: features.tempo.clone(),
                log_y: false,
            },
        ),
        Visualization::Tempogram => (
            "Time",
            "Lag (frames)",
            heatmap(features.tempogram.clone(), duration_s),
        ),
    };

    Figure {
        title,
        x_label: x_label.to_string(),
        y_label: y_label.to_string(),
        kind,
    }
}

fn heatmap(values: Array2<f32>, duration_s: f32) -> PlotKind {
    PlotKind::Heatmap {
        values,
        duration_s,
        y_axis: YAxis::Linear,
        colorbar_unit: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use std::f64::consts::PI;

    fn small_config() -> AnalysisConfig {
        AnalysisConfig {
            render: RenderConfig {
                width: 300,
                height: 150,
            },
            ..AnalysisConfig::default()
        }
    }

    fn tone(freq: f64, sample_rate: u32, seconds: f64) -> MonoAudio {
        let n = (sample_rate as f64 * seconds) as usize;
        let samples = (0..n)
            .map(|i| (0.5 * (2.0 * PI * freq * i as f64 / sample_rate as f64).sin()) as f32)
            .collect();
        MonoAudio::new(samples, sample_rate)
    }

    #[test]
    fn test_visualization_metadata() {
        assert_eq!(Visualization::ALL.len(), 11);
        assert_eq!(Visualization::ALL[0].name(), "Waveform");
        assert_eq!(Visualization::ALL[10].name(), "Tempogram");
        assert_eq!(
            Visualization::RmsEnergy.label(),
            "RMS Energy: Root Mean Square energy of the audio signal."
        );
        assert_eq!(Visualization::Tempo.index(), 10);
        assert_eq!(
            Visualization::from_slug("Zero-Crossing-Rate"),
            Some(Visualization::ZeroCrossingRate)
        );
        assert_eq!(Visualization::from_slug("loudness"), None);
        for v in Visualization::ALL {
            assert_eq!(Visualization::from_slug(v.slug()), Some(v));
            assert_eq!(
                serde_json::to_value(v).unwrap(),
                serde_json::Value::String(v.slug().to_string())
            );
        }
    }

    #[test]
    fn test_feature_frames_agree() {
        let audio = tone(440.0, 22050, 2.0);
        let features = FeatureSet::compute(&audio.samples, 22050, &small_config()).unwrap();
        let frames = 1 + audio.samples.len() / 512;
        assert_eq!(features.n_frames, frames);
        assert_eq!(features.zero_crossing_rate.len(), frames);
        assert_eq!(features.rms.len(), frames);
        assert_eq!(features.spectral_centroid.len(), frames);
        assert_eq!(features.spectral_rolloff.len(), frames);
        assert_eq!(features.onset_strength.len(), frames);
        assert_eq!(features.tempo.len(), frames);
        assert_eq!(features.spectrogram_db.shape(), &[1025, frames]);
        assert_eq!(features.mfcc.shape(), &[13, frames]);
        assert_eq!(features.spectral_contrast.shape(), &[7, frames]);
        assert_eq!(features.tempogram.shape(), &[384, frames]);
    }

    #[test]
    fn test_silence_produces_finite_features() {
        let samples = vec![0.0f32; 22050];
        let features = FeatureSet::compute(&samples, 22050, &small_config()).unwrap();
        let all_finite = |v: &[f32]| v.iter().all(|x| x.is_finite());
        assert!(all_finite(&features.zero_crossing_rate));
        assert!(all_finite(&features.spectral_centroid));
        assert!(all_finite(&features.spectral_bandwidth));
        assert!(all_finite(&features.spectral_rolloff));
        assert!(all_finite(&features.rms));
        assert!(all_finite(&features.tempo));
        assert!(features.spectrogram_db.iter().all(|x| x.is_finite()));
        assert!(features.mfcc.iter().all(|x| x.is_finite()));
        assert!(features.spectral_contrast.iter().all(|x| x.is_finite()));
        assert!(features.tempogram.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_empty_audio_is_rejected() {
        let audio = MonoAudio::new(Vec::new(), 22050);
        let result = analyze_audio("empty.wav", audio, &FilterSettings::default(), &small_config());
        assert!(matches!(result, Err(Error::EmptyAudio)));
    }

    #[test]
    fn test_analyze_audio_renders_all_plots_in_order() {
        let audio = tone(440.0, 22050, 1.5);
        let report =
            analyze_audio("tone.wav", audio, &FilterSettings::default(), &small_config()).unwrap();

        assert_eq!(report.file_name, "tone.wav");
        assert!(report.filters.is_empty());
        assert_eq!(report.plots.len(), 11);
        for (plot, expected) in report.plots.iter().zip(Visualization::ALL) {
            assert_eq!(plot.visualization, expected);
            assert_eq!(plot.title, format!("{} (tone.wav)", expected.name()));
            assert_eq!((plot.width, plot.height), (300, 150));
            assert_eq!(&plot.png[..4], b"\x89PNG");
        }
        assert!(report.median_tempo_bpm.is_some());
    }

    #[test]
    fn test_filters_are_reported_and_selection_respected() {
        let audio = tone(440.0, 22050, 1.0);
        let filters = FilterSettings {
            highpass_hz: 100,
            lowpass_hz: 15000,
            ..FilterSettings::default()
        };
        let report = analyze_audio_with(
            "tone.wav",
            audio,
            &filters,
            &small_config(),
            &[Visualization::Tempogram, Visualization::Waveform],
        )
        .unwrap();
        // Low-pass above Nyquist (11025 Hz) is skipped
        assert_eq!(report.filters, vec![FilterBand::HighPass { cutoff_hz: 100.0 }]);
        let order: Vec<_> = report.plots.iter().map(|p| p.visualization).collect();
        assert_eq!(order, vec![Visualization::Waveform, Visualization::Tempogram]);
    }

    #[test]
    fn test_invalid_config_is_rejected_before_any_work() {
        for config in [
            AnalysisConfig {
                hop_length: 0,
                ..small_config()
            },
            AnalysisConfig {
                n_fft: 0,
                ..small_config()
            },
            AnalysisConfig {
                n_mfcc: 0,
                ..small_config()
            },
        ] {
            let audio = MonoAudio::new(vec![0.1f32; 22050], 22050);
            let result = analyze_audio("a.wav", audio, &FilterSettings::default(), &config);
            assert!(matches!(result, Err(Error::InvalidParameter(_))));

            let result = FeatureSet::compute(&[0.1f32; 4096], 22050, &config);
            assert!(matches!(result, Err(Error::InvalidParameter(_))));
        }
    }

    #[test]
    fn test_unselected_features_are_skipped() {
        let audio = tone(440.0, 22050, 1.0);
        let frames = 1 + audio.samples.len() / 512;

        let features = FeatureSet::compute_for(
            &audio.samples,
            22050,
            &small_config(),
            &[Visualization::Waveform],
        )
        .unwrap();
        assert_eq!(features.n_frames, frames);
        assert!(features.spectrogram_db.is_empty());
        assert!(features.tempo.is_empty());
        assert!(features.tempogram.is_empty());

        let features = FeatureSet::compute_for(
            &audio.samples,
            22050,
            &small_config(),
            &[Visualization::Tempo],
        )
        .unwrap();
        assert_eq!(features.tempo.len(), frames);
        assert_eq!(features.onset_strength.len(), frames);
        assert!(features.mfcc.is_empty());
        assert!(features.tempogram.is_empty());

        let report = analyze_audio_with(
            "tone.wav",
            tone(440.0, 22050, 1.0),
            &FilterSettings::default(),
            &small_config(),
            &[Visualization::Waveform],
        )
        .unwrap();
        assert_eq!(report.plots.len(), 1);
        assert_eq!(report.median_tempo_bpm, None);
    }

    #[test]
    fn test_report_json_omits_png_bytes() {
        let audio = tone(220.0, 22050, 0.5);
        let report = analyze_audio_with(
            "a.wav",
            audio,
            &FilterSettings::default(),
            &small_config(),
            &[Visualization::Spectrogram],
        )
        .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["plots"][0]["visualization"], "spectrogram");
        assert!(json["plots"][0].get("png").is_none());
    }
}
