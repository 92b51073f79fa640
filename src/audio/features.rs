// Frame-level features: zero crossing rate, RMS energy and the spectral shape family
// (centroid, bandwidth, rolloff, contrast).
//
// Spectral features take a magnitude spectrogram `(bins, frames)` together with the
// bin center frequencies.

use ndarray::{Array2, Axis};

use super::stft::{frame_count, power_to_db, Reference};
use crate::error::{Error, Result};

/// Magnitudes below this count as zero when looking for sign changes.
const ZERO_THRESHOLD: f32 = 1e-10;

/// Column sums below this are treated as silent frames.
const TINY: f32 = f32::MIN_POSITIVE;

/// Fraction of sign changes per frame.
///
/// The signal is edge-padded by half a frame on each side. Near-zero samples are
/// snapped to zero and zero counts as positive; the first sample of each frame has
/// no predecessor and never counts as a crossing.
pub fn zero_crossing_rate(samples: &[f32], frame_length: usize, hop_length: usize) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }
    let pad = frame_length / 2;
    let first = samples[0];
    let last = samples[samples.len() - 1];
    let mut padded = Vec::with_capacity(samples.len() + 2 * pad);
    padded.extend(std::iter::repeat(first).take(pad));
    padded.extend_from_slice(samples);
    padded.extend(std::iter::repeat(last).take(pad));

    let negative: Vec<bool> = padded
        .iter()
        .map(|&x| x.abs() > ZERO_THRESHOLD && x.is_sign_negative())
        .collect();

    let n_frames = frame_count(samples.len(), frame_length, hop_length);
    (0..n_frames)
        .map(|t| {
            let frame = &negative[t * hop_length..t * hop_length + frame_length];
            let crossings = frame.windows(2).filter(|w| w[0] != w[1]).count();
            crossings as f32 / frame_length as f32
        })
        .collect()
}

/// Root-mean-square energy per frame, zero-padded by half a frame on each side.
pub fn rms(samples: &[f32], frame_length: usize, hop_length: usize) -> Vec<f32> {
    let pad = frame_length / 2;
    let mut padded = vec![0.0f32; samples.len() + 2 * pad];
    padded[pad..pad + samples.len()].copy_from_slice(samples);

    let n_frames = frame_count(samples.len(), frame_length, hop_length);
    (0..n_frames)
        .map(|t| {
            let frame = &padded[t * hop_length..t * hop_length + frame_length];
            let power: f64 = frame.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>()
                / frame_length as f64;
            power.sqrt() as f32
        })
        .collect()
}

/// Center of mass of each spectrum frame, in Hz. Silent frames give 0.
pub fn spectral_centroid(spec: &Array2<f32>, freqs: &[f32]) -> Vec<f32> {
    spec.axis_iter(Axis(1))
        .map(|column| {
            let total: f32 = column.sum();
            if total < TINY {
                return 0.0;
            }
            column
                .iter()
                .zip(freqs)
                .map(|(&s, &f)| f * s)
                .sum::<f32>()
                / total
        })
        .collect()
}

/// Second-order spectral bandwidth around `centroid`, in Hz. Silent frames give 0.
pub fn spectral_bandwidth(spec: &Array2<f32>, freqs: &[f32], centroid: &[f32]) -> Vec<f32> {
    spec.axis_iter(Axis(1))
        .zip(centroid)
        .map(|(column, &c)| {
            let total: f32 = column.sum();
            if total < TINY {
                return 0.0;
            }
            let spread: f32 = column
                .iter()
                .zip(freqs)
                .map(|(&s, &f)| (s / total) * (f - c) * (f - c))
                .sum();
            spread.sqrt()
        })
        .collect()
}

/// Lowest bin frequency at which the cumulative energy reaches `roll_percent` of
/// the frame total. Silent frames give the lowest bin (0 Hz).
pub fn spectral_rolloff(spec: &Array2<f32>, freqs: &[f32], roll_percent: f32) -> Vec<f32> {
    spec.axis_iter(Axis(1))
        .map(|column| {
            let total: f32 = column.sum();
            let threshold = roll_percent * total;
            let mut cumulative = 0.0f32;
            for (&s, &f) in column.iter().zip(freqs) {
                cumulative += s;
                if cumulative >= threshold {
                    return f;
                }
            }
            freqs.last().copied().unwrap_or(0.0)
        })
        .collect()
}

/// Octave-band spectral contrast, shape `(n_bands + 1, frames)`, in dB.
///
/// Band edges are `[0, fmin, 2 fmin, ..., fmin 2^n_bands]`. Each band after the first
/// also takes the bin just below its lower edge, the last band runs to Nyquist, and all
/// but the last band drop their top bin. Peak and valley are the means of the highest
/// and lowest `max(1, round(quantile * band_bins))` magnitudes.
pub fn spectral_contrast(
    spec: &Array2<f32>,
    freqs: &[f32],
    sample_rate: u32,
    n_bands: usize,
    fmin: f32,
    quantile: f32,
) -> Result<Array2<f32>> {
    let mut edges = vec![0.0f32; n_bands + 2];
    for (i, edge) in edges.iter_mut().enumerate().skip(1) {
        *edge = fmin * 2f32.powi(i as i32 - 1);
    }
    let nyquist = 0.5 * sample_rate as f32;
    if edges[..n_bands + 1].iter().any(|&e| e >= nyquist) {
        return Err(Error::InvalidParameter(format!(
            "spectral contrast band edges {:?} exceed Nyquist ({} Hz)",
            &edges[..n_bands + 1],
            nyquist
        )));
    }

    let n_frames = spec.len_of(Axis(1));
    let mut valley = Array2::<f32>::zeros((n_bands + 1, n_frames));
    let mut peak = Array2::<f32>::zeros((n_bands + 1, n_frames));

    for k in 0..=n_bands {
        let (f_low, f_high) = (edges[k], edges[k + 1]);
        let in_band: Vec<usize> = freqs
            .iter()
            .enumerate()
            .filter(|(_, &f)| f >= f_low && f <= f_high)
            .map(|(i, _)| i)
            .collect();
        let (first, last) = match (in_band.first(), in_band.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => {
                return Err(Error::InvalidParameter(format!(
                    "spectral contrast band {:.0}-{:.0} Hz contains no FFT bins",
                    f_low, f_high
                )))
            }
        };

        let start = if k > 0 { first.saturating_sub(1) } else { first };
        let end = if k == n_bands { freqs.len() - 1 } else { last };
        let band_bins = end - start + 1;
        // Every band but the last drops its top bin
        let sub_end = if k < n_bands { end } else { end + 1 };
        let sub_band_len = sub_end - start;

        let count = quantile_count(quantile, band_bins);

        for t in 0..n_frames {
            let mut values: Vec<f32> = (start..sub_end).map(|i| spec[[i, t]]).collect();
            values.sort_by(|a, b| a.total_cmp(b));
            let take = count.min(sub_band_len.max(1));
            if values.is_empty() {
                continue;
            }
            valley[[k, t]] = mean(&values[..take]);
            peak[[k, t]] = mean(&values[values.len() - take..]);
        }
    }

    let peak_db = power_to_db(&peak, Reference::Value(1.0), 1e-10, Some(80.0));
    let valley_db = power_to_db(&valley, Reference::Value(1.0), 1e-10, Some(80.0));
    Ok(peak_db - valley_db)
}

/// Bins averaged for the peak and valley of a band; halves round to even.
fn quantile_count(quantile: f32, band_bins: usize) -> usize {
    ((quantile * band_bins as f32).round_ties_even() as usize).max(1)
}

fn mean(values: &[f32]) -> f32 {
    values.iter().sum::<f32>() / values.len() as f32
}

/// Median of a series, ignoring NaNs. `None` for an empty series.
pub fn median(series: &[f32]) -> Option<f32> {
    let mut values: Vec<f32> = series.iter().copied().filter(|v| !v.is_nan()).collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    })
}
