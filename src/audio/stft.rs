// Short-time Fourier transform and decibel scaling.
//
// Frames are centered: the signal is zero-padded by n_fft/2 on both sides, so frame t
// is centered on sample t * hop and a signal of `len` samples yields 1 + len / hop frames.

use ndarray::Array2;
use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;

/// Periodic Hann window (the DFT-even variant used for spectral analysis).
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / size as f32).cos())
        .collect()
}

/// Number of centered frames for a signal of `len` samples.
pub fn frame_count(len: usize, frame_length: usize, hop_length: usize) -> usize {
    let padded = len + 2 * (frame_length / 2);
    if padded < frame_length {
        0
    } else {
        1 + (padded - frame_length) / hop_length
    }
}

/// Magnitude spectrogram `|STFT|`, shape `(1 + n_fft / 2, frames)`.
pub fn stft_magnitude(samples: &[f32], n_fft: usize, hop_length: usize) -> Array2<f32> {
    let pad = n_fft / 2;
    let mut padded = vec![0.0f32; samples.len() + 2 * pad];
    padded[pad..pad + samples.len()].copy_from_slice(samples);

    let n_bins = n_fft / 2 + 1;
    let n_frames = frame_count(samples.len(), n_fft, hop_length);
    let window = hann_window(n_fft);

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);
    let mut scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
    let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];

    let mut spectrogram = Array2::<f32>::zeros((n_bins, n_frames));
    for t in 0..n_frames {
        let start = t * hop_length;
        for (i, slot) in buffer.iter_mut().enumerate() {
            *slot = Complex::new(padded[start + i] * window[i], 0.0);
        }
        fft.process_with_scratch(&mut buffer, &mut scratch);
        for (k, value) in buffer[..n_bins].iter().enumerate() {
            spectrogram[[k, t]] = value.norm();
        }
    }

    spectrogram
}

/// Center frequency of each STFT bin, `0 ..= sr / 2`.
pub fn fft_frequencies(sample_rate: u32, n_fft: usize) -> Vec<f32> {
    (0..=n_fft / 2)
        .map(|k| k as f32 * sample_rate as f32 / n_fft as f32)
        .collect()
}

/// Time in seconds of each of the first `frames` frames.
pub fn frames_to_time(frames: usize, sample_rate: u32, hop_length: usize) -> Vec<f32> {
    (0..frames)
        .map(|t| (t * hop_length) as f32 / sample_rate as f32)
        .collect()
}

/// Reference level for decibel conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reference {
    /// Scale so the loudest value maps to 0 dB
    Max,
    Value(f32),
}

/// Convert a power spectrogram to decibels: `10 log10(max(amin, S) / ref)`,
/// then floor everything at `max - top_db` when `top_db` is set.
pub fn power_to_db(
    spec: &Array2<f32>,
    reference: Reference,
    amin: f32,
    top_db: Option<f32>,
) -> Array2<f32> {
    let ref_value = match reference {
        Reference::Max => spec.iter().copied().fold(f32::NEG_INFINITY, f32::max),
        Reference::Value(v) => v,
    };
    let ref_db = 10.0 * ref_value.abs().max(amin).log10();

    let mut db = spec.mapv(|v| 10.0 * v.max(amin).log10() - ref_db);
    if let Some(top_db) = top_db {
        let peak = db.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let floor = peak - top_db;
        db.mapv_inplace(|v| v.max(floor));
    }
    db
}

/// Convert an amplitude spectrogram to decibels (`20 log10`), same clipping rules.
pub fn amplitude_to_db(
    spec: &Array2<f32>,
    reference: Reference,
    amin: f32,
    top_db: Option<f32>,
) -> Array2<f32> {
    let power = spec.mapv(|v| v * v);
    let reference = match reference {
        Reference::Max => {
            let peak = spec.iter().fold(0.0f32, |m, v| m.max(v.abs()));
            Reference::Value(peak * peak)
        }
        Reference::Value(v) => Reference::Value(v * v),
    };
    power_to_db(&power, reference, amin * amin, top_db)
}
