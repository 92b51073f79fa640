// Butterworth IIR filters (high-pass, low-pass, band-pass).
//
// Design follows the classic digital Butterworth recipe:
// 1. Analog prototype poles on the unit circle (no zeros, unity gain)
// 2. Pre-warp the normalized cutoff(s) for the bilinear transform (fs = 2)
// 3. Frequency-transform the prototype to low/high/band-pass
// 4. Bilinear transform to the z-plane, expand zeros/poles into (b, a)
//
// Filtering runs in f64 as a direct form II transposed difference equation.

use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

use crate::error::{Error, Result};

/// Cutoff values at or below this disable the corresponding filter.
pub const FILTER_LOWER_BOUND: i32 = 0;
/// Highest accepted cutoff (Hz).
pub const FILTER_UPPER_BOUND: i32 = 20000;
/// Value meaning "no filter".
pub const FILTER_DISABLED: i32 = FILTER_LOWER_BOUND - 1;

/// User-selected cutoffs, in Hz. Anything <= 0 turns that filter off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Frequency above which signals pass through
    pub highpass_hz: i32,
    /// Frequency below which signals pass through
    pub lowpass_hz: i32,
    /// Lower edge of the band-pass
    pub bandpass_low_hz: i32,
    /// Upper edge of the band-pass
    pub bandpass_high_hz: i32,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            highpass_hz: FILTER_DISABLED,
            lowpass_hz: FILTER_DISABLED,
            bandpass_low_hz: FILTER_DISABLED,
            bandpass_high_hz: FILTER_DISABLED,
        }
    }
}

impl FilterSettings {
    /// Every cutoff must lie in `[FILTER_DISABLED, FILTER_UPPER_BOUND]`.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("high-pass cutoff", self.highpass_hz),
            ("low-pass cutoff", self.lowpass_hz),
            ("band-pass low cutoff", self.bandpass_low_hz),
            ("band-pass high cutoff", self.bandpass_high_hz),
        ];
        for (name, value) in fields {
            if !(FILTER_DISABLED..=FILTER_UPPER_BOUND).contains(&value) {
                return Err(Error::InvalidFilter(format!(
                    "{} must be between {} and {} Hz, got {}",
                    name, FILTER_DISABLED, FILTER_UPPER_BOUND, value
                )));
            }
        }
        Ok(())
    }
}

/// A filter response type with its cutoff frequencies in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterBand {
    HighPass { cutoff_hz: f64 },
    LowPass { cutoff_hz: f64 },
    BandPass { low_hz: f64, high_hz: f64 },
}

/// Digital filter coefficients: `H(z) = B(z) / A(z)`, highest power first.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunction {
    pub b: Vec<f64>,
    pub a: Vec<f64>,
}

impl TransferFunction {
    /// Run the filter over `input` from a zero initial state.
    pub fn apply(&self, input: &[f32]) -> Vec<f32> {
        let a0 = self.a[0];
        let len = self.b.len().max(self.a.len());
        let mut b = vec![0.0f64; len];
        let mut a = vec![0.0f64; len];
        for (dst, src) in b.iter_mut().zip(&self.b) {
            *dst = src / a0;
        }
        for (dst, src) in a.iter_mut().zip(&self.a) {
            *dst = src / a0;
        }

        let order = len - 1;
        let mut state = vec![0.0f64; order];
        let mut output = Vec::with_capacity(input.len());

        for &sample in input {
            let x = sample as f64;
            let y = b[0] * x + state.first().copied().unwrap_or(0.0);
            for i in 0..order {
                let next = if i + 1 < order { state[i + 1] } else { 0.0 };
                state[i] = b[i + 1] * x - a[i + 1] * y + next;
            }
            output.push(y as f32);
        }

        output
    }

    /// Magnitude response at `freq_hz` for a signal sampled at `sample_rate`.
    pub fn magnitude_at(&self, freq_hz: f64, sample_rate: u32) -> f64 {
        let w = 2.0 * PI * freq_hz / sample_rate as f64;
        let eval = |coeffs: &[f64]| -> Complex64 {
            coeffs
                .iter()
                .enumerate()
                .map(|(k, &c)| Complex64::from_polar(c, -w * k as f64))
                .sum()
        };
        (eval(&self.b[..]) / eval(&self.a[..])).norm()
    }
}

/// Design a digital Butterworth filter of the given order.
///
/// Cutoffs are normalized by Nyquist and must fall strictly inside (0, 1);
/// band-pass edges must also be increasing.
pub fn butterworth(order: usize, band: FilterBand, sample_rate: u32) -> Result<TransferFunction> {
    if order == 0 {
        return Err(Error::InvalidFilter("filter order must be positive".to_string()));
    }
    let nyquist = 0.5 * sample_rate as f64;
    let normalize = |hz: f64| -> Result<f64> {
        let wn = hz / nyquist;
        if wn > 0.0 && wn < 1.0 {
            Ok(wn)
        } else {
            Err(Error::InvalidFilter(format!(
                "cutoff {} Hz must lie strictly between 0 and Nyquist ({} Hz)",
                hz, nyquist
            )))
        }
    };
    // Pre-warp for the bilinear transform at fs = 2
    let warp = |wn: f64| 4.0 * (PI * wn / 2.0).tan();

    let n = order as f64;
    let prototype: Vec<Complex64> = (0..order)
        .map(|k| {
            let m = -n + 1.0 + 2.0 * k as f64;
            -Complex64::from_polar(1.0, PI * m / (2.0 * n))
        })
        .collect();

    let (zeros, poles, gain) = match band {
        FilterBand::LowPass { cutoff_hz } => {
            let wo = warp(normalize(cutoff_hz)?);
            let poles: Vec<Complex64> = prototype.iter().map(|&p| p * wo).collect();
            (Vec::new(), poles, wo.powi(order as i32))
        }
        FilterBand::HighPass { cutoff_hz } => {
            let wo = warp(normalize(cutoff_hz)?);
            let poles: Vec<Complex64> = prototype.iter().map(|&p| wo / p).collect();
            let denom: Complex64 = prototype.iter().map(|&p| -p).product();
            (vec![Complex64::new(0.0, 0.0); order], poles, (1.0 / denom).re)
        }
        FilterBand::BandPass { low_hz, high_hz } => {
            let low = normalize(low_hz)?;
            let high = normalize(high_hz)?;
            if low >= high {
                return Err(Error::InvalidFilter(format!(
                    "band-pass low cutoff ({} Hz) must be below the high cutoff ({} Hz)",
                    low_hz, high_hz
                )));
            }
            let (w1, w2) = (warp(low), warp(high));
            let bw = w2 - w1;
            let wo = (w1 * w2).sqrt();

            let scaled: Vec<Complex64> = prototype.iter().map(|&p| p * (bw / 2.0)).collect();
            let mut poles = Vec::with_capacity(2 * order);
            for &p in &scaled {
                poles.push(p + (p * p - wo * wo).sqrt());
            }
            for &p in &scaled {
                poles.push(p - (p * p - wo * wo).sqrt());
            }
            (vec![Complex64::new(0.0, 0.0); order], poles, bw.powi(order as i32))
        }
    };

    let (zeros, poles, gain) = bilinear(zeros, poles, gain);
    let b = poly(&zeros).into_iter().map(|c| c.re * gain).collect();
    let a = poly(&poles).into_iter().map(|c| c.re).collect();

    Ok(TransferFunction { b, a })
}

/// Bilinear transform of an analog zero/pole/gain system at fs = 2.
fn bilinear(
    zeros: Vec<Complex64>,
    poles: Vec<Complex64>,
    gain: f64,
) -> (Vec<Complex64>, Vec<Complex64>, f64) {
    let fs2 = Complex64::new(4.0, 0.0);
    let degree = poles.len() - zeros.len();

    let mut z: Vec<Complex64> = zeros.iter().map(|&z| (fs2 + z) / (fs2 - z)).collect();
    let p: Vec<Complex64> = poles.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect();
    // Zeros at infinity move to Nyquist
    z.extend(std::iter::repeat(Complex64::new(-1.0, 0.0)).take(degree));

    let num: Complex64 = zeros.iter().map(|&z| fs2 - z).product();
    let den: Complex64 = poles.iter().map(|&p| fs2 - p).product();
    (z, p, gain * (num / den).re)
}

/// Polynomial coefficients (highest power first) with the given roots.
fn poly(roots: &[Complex64]) -> Vec<Complex64> {
    let mut coeffs = vec![Complex64::new(1.0, 0.0)];
    for &root in roots {
        let mut next = vec![Complex64::new(0.0, 0.0); coeffs.len() + 1];
        for (i, &c) in coeffs.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c * root;
        }
        coeffs = next;
    }
    coeffs
}

/// Apply the enabled filters in order: high-pass, low-pass, band-pass.
///
/// - high-pass runs when its cutoff is above [`FILTER_LOWER_BOUND`]
/// - low-pass runs when its cutoff is above the bound and below Nyquist
///   (a low-pass at or above Nyquist would be a no-op and is skipped)
/// - band-pass runs when its low edge is above the bound and its high edge below Nyquist
///
/// Returns the filtered samples and the filters actually applied.
pub fn apply_filters(
    samples: &[f32],
    sample_rate: u32,
    settings: &FilterSettings,
    order: usize,
) -> Result<(Vec<f32>, Vec<FilterBand>)> {
    settings.validate()?;
    let nyquist = sample_rate as f64 / 2.0;

    let mut bands = Vec::new();
    if settings.highpass_hz > FILTER_LOWER_BOUND {
        bands.push(FilterBand::HighPass {
            cutoff_hz: settings.highpass_hz as f64,
        });
    }
    if settings.lowpass_hz > FILTER_LOWER_BOUND && (settings.lowpass_hz as f64) < nyquist {
        bands.push(FilterBand::LowPass {
            cutoff_hz: settings.lowpass_hz as f64,
        });
    }
    if settings.bandpass_low_hz > FILTER_LOWER_BOUND
        && (settings.bandpass_high_hz as f64) < nyquist
    {
        bands.push(FilterBand::BandPass {
            low_hz: settings.bandpass_low_hz as f64,
            high_hz: settings.bandpass_high_hz as f64,
        });
    }

    let mut signal = samples.to_vec();
    for band in &bands {
        debug!(?band, order, sample_rate, "applying filter");
        signal = butterworth(order, *band, sample_rate)?.apply(&signal);
    }

    Ok((signal, bands))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI as PI32;

    fn assert_coeffs(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-6, "got {:?}, expected {:?}", actual, expected);
        }
    }

    fn tone(freqs: &[f32], sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                freqs.iter().map(|f| (2.0 * PI32 * f * t).sin()).sum::<f32>()
            })
            .collect()
    }

    fn rms(x: &[f32]) -> f32 {
        (x.iter().map(|v| v * v).sum::<f32>() / x.len() as f32).sqrt()
    }

    #[test]
    fn test_second_order_lowpass_half_band() {
        // Wn = 250 / 500 = 0.5
        let tf = butterworth(2, FilterBand::LowPass { cutoff_hz: 250.0 }, 1000).unwrap();
        assert_coeffs(&tf.b, &[0.29289322, 0.58578644, 0.29289322]);
        assert_coeffs(&tf.a, &[1.0, 0.0, 0.17157288]);
    }

    #[test]
    fn test_second_order_highpass_half_band() {
        let tf = butterworth(2, FilterBand::HighPass { cutoff_hz: 250.0 }, 1000).unwrap();
        assert_coeffs(&tf.b, &[0.29289322, -0.58578644, 0.29289322]);
        assert_coeffs(&tf.a, &[1.0, 0.0, 0.17157288]);
    }

    #[test]
    fn test_lowpass_response_shape() {
        let tf = butterworth(5, FilterBand::LowPass { cutoff_hz: 1000.0 }, 22050).unwrap();
        assert!((tf.magnitude_at(0.0, 22050) - 1.0).abs() < 1e-6);
        assert!((tf.magnitude_at(1000.0, 22050) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-3);
        assert!(tf.magnitude_at(5000.0, 22050) < 1e-3);
    }

    #[test]
    fn test_highpass_response_shape() {
        let tf = butterworth(5, FilterBand::HighPass { cutoff_hz: 1000.0 }, 22050).unwrap();
        assert!(tf.magnitude_at(0.0, 22050) < 1e-9);
        assert!((tf.magnitude_at(11025.0, 22050) - 1.0).abs() < 1e-6);
        assert!((tf.magnitude_at(1000.0, 22050) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-3);
    }

    #[test]
    fn test_bandpass_response_shape() {
        let tf = butterworth(
            5,
            FilterBand::BandPass {
                low_hz: 500.0,
                high_hz: 2000.0,
            },
            22050,
        )
        .unwrap();
        assert_eq!(tf.a.len(), 11);
        assert!(tf.magnitude_at(1000.0, 22050) > 0.95);
        assert!((tf.magnitude_at(500.0, 22050) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-3);
        assert!(tf.magnitude_at(100.0, 22050) < 0.01);
        assert!(tf.magnitude_at(8000.0, 22050) < 0.01);
    }

    #[test]
    fn test_defaults_leave_signal_untouched() {
        let input = tone(&[440.0], 22050, 0.5);
        let (output, applied) =
            apply_filters(&input, 22050, &FilterSettings::default(), 5).unwrap();
        assert!(applied.is_empty());
        assert_eq!(output, input);
    }

    #[test]
    fn test_lowpass_removes_high_tone() {
        let input = tone(&[100.0, 3000.0], 22050, 1.0);
        let settings = FilterSettings {
            lowpass_hz: 1000,
            ..Default::default()
        };
        let (output, applied) = apply_filters(&input, 22050, &settings, 5).unwrap();
        assert_eq!(applied, vec![FilterBand::LowPass { cutoff_hz: 1000.0 }]);

        // Only the 100 Hz component (rms 1/sqrt(2)) should survive
        let tail = &output[11025..];
        assert!((rms(tail) - std::f32::consts::FRAC_1_SQRT_2).abs() < 0.02);
    }

    #[test]
    fn test_highpass_removes_dc() {
        let input = vec![0.5f32; 22050];
        let settings = FilterSettings {
            highpass_hz: 200,
            ..Default::default()
        };
        let (output, _) = apply_filters(&input, 22050, &settings, 5).unwrap();
        assert!(output[20000..].iter().all(|v| v.abs() < 1e-3));
    }

    #[test]
    fn test_lowpass_above_nyquist_is_skipped() {
        let input = tone(&[440.0], 22050, 0.1);
        let settings = FilterSettings {
            lowpass_hz: 15000,
            ..Default::default()
        };
        let (output, applied) = apply_filters(&input, 22050, &settings, 5).unwrap();
        assert!(applied.is_empty());
        assert_eq!(output, input);
    }

    #[test]
    fn test_highpass_above_nyquist_is_an_error() {
        let settings = FilterSettings {
            highpass_hz: 15000,
            ..Default::default()
        };
        let result = apply_filters(&[0.0; 100], 22050, &settings, 5);
        assert!(matches!(result, Err(Error::InvalidFilter(_))));
    }

    #[test]
    fn test_bandpass_without_high_edge_is_an_error() {
        // High edge left at its disabled default: the gate opens but the band is invalid
        let settings = FilterSettings {
            bandpass_low_hz: 500,
            ..Default::default()
        };
        let result = apply_filters(&[0.0; 100], 22050, &settings, 5);
        assert!(matches!(result, Err(Error::InvalidFilter(_))));
    }

    #[test]
    fn test_bandpass_inverted_edges_is_an_error() {
        let settings = FilterSettings {
            bandpass_low_hz: 3000,
            bandpass_high_hz: 1000,
            ..Default::default()
        };
        assert!(apply_filters(&[0.0; 100], 22050, &settings, 5).is_err());
    }

    #[test]
    fn test_out_of_range_setting_is_rejected() {
        let settings = FilterSettings {
            lowpass_hz: 25000,
            ..Default::default()
        };
        assert!(matches!(
            apply_filters(&[0.0; 100], 22050, &settings, 5),
            Err(Error::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_filters_apply_in_order() {
        let settings = FilterSettings {
            highpass_hz: 100,
            lowpass_hz: 5000,
            bandpass_low_hz: 300,
            bandpass_high_hz: 3000,
        };
        let (_, applied) = apply_filters(&[0.0; 1000], 22050, &settings, 5).unwrap();
        assert_eq!(
            applied,
            vec![
                FilterBand::HighPass { cutoff_hz: 100.0 },
                FilterBand::LowPass { cutoff_hz: 5000.0 },
                FilterBand::BandPass {
                    low_hz: 300.0,
                    high_hz: 3000.0
                },
            ]
        );
    }
}
