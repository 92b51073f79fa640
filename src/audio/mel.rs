// Mel filterbank, mel spectrogram and MFCCs.
//
// Uses the Slaney mel scale (linear below 1 kHz, logarithmic above) with area-normalized
// triangular filters, so bands keep roughly constant energy per Hz.

use ndarray::{Array2, Axis};
use std::f32::consts::PI;

use super::stft::{fft_frequencies, power_to_db, Reference};

const F_SP: f32 = 200.0 / 3.0;
const MIN_LOG_HZ: f32 = 1000.0;
const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;

fn log_step() -> f32 {
    6.4f32.ln() / 27.0
}

/// Hz to mel (Slaney).
pub fn hz_to_mel(hz: f32) -> f32 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Mel to Hz (Slaney).
pub fn mel_to_hz(mel: f32) -> f32 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// `n` frequencies evenly spaced on the mel scale between `fmin` and `fmax`.
pub fn mel_frequencies(n: usize, fmin: f32, fmax: f32) -> Vec<f32> {
    let (lo, hi) = (hz_to_mel(fmin), hz_to_mel(fmax));
    if n == 1 {
        return vec![mel_to_hz(lo)];
    }
    (0..n)
        .map(|i| mel_to_hz(lo + (hi - lo) * i as f32 / (n - 1) as f32))
        .collect()
}

/// Triangular mel filterbank, shape `(n_mels, 1 + n_fft / 2)`, covering `0 ..= sr / 2`.
pub fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Array2<f32> {
    let fft_freqs = fft_frequencies(sample_rate, n_fft);
    let mel_f = mel_frequencies(n_mels + 2, 0.0, sample_rate as f32 / 2.0);

    let mut weights = Array2::<f32>::zeros((n_mels, fft_freqs.len()));
    for m in 0..n_mels {
        let (left, center, right) = (mel_f[m], mel_f[m + 1], mel_f[m + 2]);
        let enorm = 2.0 / (right - left);
        for (k, &f) in fft_freqs.iter().enumerate() {
            let lower = (f - left) / (center - left);
            let upper = (right - f) / (right - center);
            weights[[m, k]] = lower.min(upper).max(0.0) * enorm;
        }
    }
    weights
}

/// Project a power spectrogram `(bins, frames)` onto the mel filterbank.
pub fn melspectrogram(power_spec: &Array2<f32>, filterbank: &Array2<f32>) -> Array2<f32> {
    filterbank.dot(power_spec)
}

/// Mel-frequency cepstral coefficients, shape `(n_mfcc, frames)`.
///
/// Log-power mel spectrogram (dB, ref 1.0, 80 dB range) followed by an orthonormal
/// DCT-II over the mel axis.
pub fn mfcc(mel_power: &Array2<f32>, n_mfcc: usize) -> Array2<f32> {
    let log_mel = power_to_db(mel_power, Reference::Value(1.0), 1e-10, Some(80.0));
    let n_mels = log_mel.len_of(Axis(0));
    let n_frames = log_mel.len_of(Axis(1));
    let n_out = n_mfcc.min(n_mels);

    let basis = dct_basis(n_out, n_mels);
    let mut out = Array2::<f32>::zeros((n_out, n_frames));
    for (t, column) in log_mel.axis_iter(Axis(1)).enumerate() {
        for k in 0..n_out {
            out[[k, t]] = basis
                .row(k)
                .iter()
                .zip(column.iter())
                .map(|(b, x)| b * x)
                .sum();
        }
    }
    out
}

/// Rows of the orthonormal DCT-II matrix.
fn dct_basis(n_out: usize, n: usize) -> Array2<f32> {
    let mut basis = Array2::<f32>::zeros((n_out, n));
    let n_f = n as f32;
    for k in 0..n_out {
        let scale = if k == 0 {
            (1.0 / n_f).sqrt()
        } else {
            (2.0 / n_f).sqrt()
        };
        for i in 0..n {
            basis[[k, i]] = scale * (PI * k as f32 * (2 * i + 1) as f32 / (2.0 * n_f)).cos();
        }
    }
    basis
}
