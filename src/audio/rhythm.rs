// Rhythm analysis: onset strength envelope, autocorrelation tempogram and a
// frame-by-frame (dynamic) tempo estimate.
//
// Algorithm overview:
// 1. Log-power mel spectrogram, positive first difference in time, averaged over bands
//    → onset strength envelope (one value per STFT frame)
// 2. Windowed autocorrelation of the envelope around every frame → tempogram
// 3. Each tempogram column weighted by a log-normal prior around `start_bpm`
//    → best lag per frame → BPM per frame

use ndarray::{Array2, Axis};
use rustfft::{num_complex::Complex, FftPlanner};

use super::stft::{hann_window, power_to_db, Reference};
use crate::error::{Error, Result};

/// Onset strength envelope from a mel power spectrogram `(n_mels, frames)`.
///
/// The envelope is shifted right by `1 + n_fft / (2 hop)` frames so onsets line up
/// with the centered STFT frames they were detected in.
pub fn onset_strength(mel_power: &Array2<f32>, n_fft: usize, hop_length: usize) -> Vec<f32> {
    let n_frames = mel_power.len_of(Axis(1));
    let n_bands = mel_power.len_of(Axis(0));
    if n_frames == 0 {
        return Vec::new();
    }

    let log_mel = power_to_db(mel_power, Reference::Value(1.0), 1e-10, Some(80.0));

    let lag = 1;
    let mut flux = vec![0.0f32; n_frames.saturating_sub(lag)];
    if n_bands > 0 {
        for (t, value) in flux.iter_mut().enumerate() {
            let sum: f32 = log_mel
                .column(t + lag)
                .iter()
                .zip(log_mel.column(t).iter())
                .map(|(now, before)| (now - before).max(0.0))
                .sum();
            *value = sum / n_bands as f32;
        }
    }

    let shift = lag + n_fft / (2 * hop_length);
    let mut envelope = vec![0.0f32; shift];
    envelope.extend(flux);
    envelope.truncate(n_frames);
    envelope.resize(n_frames, 0.0);
    envelope
}

/// Local autocorrelation of the onset envelope, shape `(win_length, frames)`.
///
/// Row `k` is lag `k` frames. Each column is scaled so its largest magnitude is 1.
pub fn tempogram(onset: &[f32], win_length: usize) -> Result<Array2<f32>> {
    if win_length < 2 {
        return Err(Error::InvalidParameter(format!(
            "tempogram window must be at least 2 frames, got {}",
            win_length
        )));
    }
    let n = onset.len();
    let mut tg = Array2::<f32>::zeros((win_length, n));
    if n == 0 {
        return Ok(tg);
    }

    let padded = linear_ramp_pad(onset, win_length / 2);
    let window = hann_window(win_length);

    let n_pad = (2 * win_length - 1).next_power_of_two();
    let mut planner = FftPlanner::<f32>::new();
    let forward = planner.plan_fft_forward(n_pad);
    let inverse = planner.plan_fft_inverse(n_pad);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); n_pad];

    for t in 0..n {
        for slot in buffer.iter_mut() {
            *slot = Complex::new(0.0, 0.0);
        }
        for (i, slot) in buffer[..win_length].iter_mut().enumerate() {
            *slot = Complex::new(padded[t + i] * window[i], 0.0);
        }
        forward.process(&mut buffer);
        for value in buffer.iter_mut() {
            *value = Complex::new(value.norm_sqr(), 0.0);
        }
        inverse.process(&mut buffer);

        let mut column = tg.column_mut(t);
        for (lag, slot) in column.iter_mut().enumerate() {
            *slot = buffer[lag].re / n_pad as f32;
        }

        let peak = column.iter().fold(0.0f32, |m, v| m.max(v.abs()));
        if peak >= f32::MIN_POSITIVE {
            column.mapv_inplace(|v| v / peak);
        }
    }

    Ok(tg)
}

/// Pad both ends with a linear ramp from 0 up to the edge value.
fn linear_ramp_pad(values: &[f32], pad: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(values.len() + 2 * pad);
    let (first, last) = match (values.first(), values.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return vec![0.0; 2 * pad],
    };
    out.extend((0..pad).map(|i| first * i as f32 / pad as f32));
    out.extend_from_slice(values);
    out.extend((0..pad).map(|j| last * (pad - 1 - j) as f32 / pad as f32));
    out
}

/// BPM for each tempogram lag. Lag 0 is infinite.
pub fn tempo_frequencies(n_bins: usize, hop_length: usize, sample_rate: u32) -> Vec<f32> {
    (0..n_bins)
        .map(|k| {
            if k == 0 {
                f32::INFINITY
            } else {
                60.0 * sample_rate as f32 / (hop_length * k) as f32
            }
        })
        .collect()
}

/// Parameters of the dynamic tempo estimator.
#[derive(Debug, Clone, Copy)]
pub struct TempoParams {
    /// Autocorrelation window length in seconds
    pub ac_size: f32,
    pub start_bpm: f32,
    /// Prior width in octaves
    pub std_bpm: f32,
    pub max_tempo: f32,
}

/// Estimate the tempo around every frame of the onset envelope, in BPM.
pub fn dynamic_tempo(
    onset: &[f32],
    sample_rate: u32,
    hop_length: usize,
    params: &TempoParams,
) -> Result<Vec<f32>> {
    let win_length = (params.ac_size * sample_rate as f32 / hop_length as f32).floor() as usize;
    let tg = tempogram(onset, win_length)?;
    let bpms = tempo_frequencies(win_length, hop_length, sample_rate);

    let log_start = params.start_bpm.log2();
    let mut prior: Vec<f32> = bpms
        .iter()
        .map(|&bpm| -0.5 * ((bpm.log2() - log_start) / params.std_bpm).powi(2))
        .collect();
    // Lags shorter than the fastest allowed beat period are out
    let first_allowed = bpms
        .iter()
        .position(|&bpm| bpm < params.max_tempo)
        .unwrap_or(0);
    for p in prior.iter_mut().take(first_allowed) {
        *p = f32::NEG_INFINITY;
    }

    let tempo = tg
        .axis_iter(Axis(1))
        .map(|column| {
            let mut best = first_allowed;
            let mut best_score = f32::NEG_INFINITY;
            for (k, (&value, &weight)) in column.iter().zip(prior.iter()).enumerate() {
                let score = (1e6 * value).ln_1p() + weight;
                if score > best_score {
                    best_score = score;
                    best = k;
                }
            }
            bpms[best]
        })
        .collect();
    Ok(tempo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mel::{mel_filterbank, melspectrogram};
    use crate::audio::stft::stft_magnitude;
    use std::f32::consts::PI;

    const SR: u32 = 22050;

    fn default_params() -> TempoParams {
        TempoParams {
            ac_size: 8.0,
            start_bpm: 120.0,
            std_bpm: 1.0,
            max_tempo: 320.0,
        }
    }

    /// Short decaying 1 kHz clicks at a fixed tempo.
    fn generate_click_track(bpm: f64, sample_rate: u32, duration_seconds: f64) -> Vec<f32> {
        let total_samples = (sample_rate as f64 * duration_seconds) as usize;
        let mut samples = vec![0.0f32; total_samples];
        let samples_per_beat = (60.0 / bpm) * sample_rate as f64;
        let click_duration = (sample_rate as f64 * 0.005) as usize;

        let mut position = 0.0f64;
        while (position as usize) < total_samples {
            let start = position as usize;
            for j in 0..click_duration {
                let idx = start + j;
                if idx < total_samples {
                    let t = j as f32 / sample_rate as f32;
                    samples[idx] = (2.0 * PI * 1000.0 * t).sin() * (-t * 500.0).exp();
                }
            }
            position += samples_per_beat;
        }
        samples
    }

    fn onset_envelope(samples: &[f32]) -> Vec<f32> {
        let spec = stft_magnitude(samples, 2048, 512).mapv(|v| v * v);
        let mel = melspectrogram(&spec, &mel_filterbank(SR, 2048, 128));
        onset_strength(&mel, 2048, 512)
    }

    fn median(values: &[f32]) -> f32 {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        sorted[sorted.len() / 2]
    }

    #[test]
    fn test_onset_envelope_length_and_shift() {
        let mut mel = Array2::<f32>::zeros((4, 10));
        // Step up in frame 5
        for band in 0..4 {
            for t in 5..10 {
                mel[[band, t]] = 1.0;
            }
        }
        let env = onset_strength(&mel, 2048, 512);
        assert_eq!(env.len(), 10);
        // Difference lands at index 4 of the raw flux, shifted by 3
        let peak = env
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) })
            .0;
        assert_eq!(peak, 7);
        assert!(env[..3].iter().all(|&v| v == 0.0));
        // 0 dB minus the -80 dB floor
        assert!((env[7] - 80.0).abs() < 1e-3);
    }

    #[test]
    fn test_tempogram_shape_and_normalization() {
        let onset = onset_envelope(&generate_click_track(120.0, SR, 10.0));
        let tg = tempogram(&onset, 384).unwrap();
        assert_eq!(tg.shape(), &[384, onset.len()]);
        for column in tg.axis_iter(Axis(1)) {
            let peak = column.iter().fold(0.0f32, |m, v| m.max(v.abs()));
            assert!(peak == 0.0 || (peak - 1.0).abs() < 1e-4);
            // Zero lag always carries the energy
            assert!(column[0] >= 0.0);
        }
    }

    #[test]
    fn test_tempogram_rejects_tiny_window() {
        assert!(tempogram(&[1.0, 2.0], 1).is_err());
    }

    #[test]
    fn test_linear_ramp_padding() {
        let padded = linear_ramp_pad(&[4.0, 8.0], 4);
        assert_eq!(padded, vec![0.0, 1.0, 2.0, 3.0, 4.0, 8.0, 6.0, 4.0, 2.0, 0.0]);
    }

    #[test]
    fn test_tempo_frequencies() {
        let bpms = tempo_frequencies(4, 512, SR);
        assert!(bpms[0].is_infinite());
        assert!((bpms[1] - 60.0 * 22050.0 / 512.0).abs() < 1e-2);
        assert!((bpms[2] - bpms[1] / 2.0).abs() < 1e-2);
    }

    #[test]
    fn test_dynamic_tempo_120bpm() {
        let onset = onset_envelope(&generate_click_track(120.0, SR, 20.0));
        let tempo = dynamic_tempo(&onset, SR, 512, &default_params()).unwrap();
        assert_eq!(tempo.len(), onset.len());
        let bpm = median(&tempo);
        // One frame of lag resolution around 120 BPM is ~2.8 BPM
        assert!((bpm - 120.0).abs() < 6.0, "expected ~120 BPM, got {}", bpm);
    }

    #[test]
    fn test_dynamic_tempo_100bpm() {
        let onset = onset_envelope(&generate_click_track(100.0, SR, 20.0));
        let tempo = dynamic_tempo(&onset, SR, 512, &default_params()).unwrap();
        let bpm = median(&tempo);
        assert!((bpm - 100.0).abs() < 5.0, "expected ~100 BPM, got {}", bpm);
    }

    #[test]
    fn test_dynamic_tempo_silence_is_finite() {
        let onset = vec![0.0f32; 200];
        let tempo = dynamic_tempo(&onset, SR, 512, &default_params()).unwrap();
        assert!(tempo.iter().all(|t| t.is_finite() && *t > 0.0));
        // No evidence: the prior centre wins
        assert!((tempo[100] - 120.0).abs() < 3.0);
    }
}
