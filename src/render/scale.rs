// Axis scales and tick placement.

/// Mapping from data values to a `[0, 1]` axis fraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scale {
    Linear { min: f32, max: f32 },
    /// Base-10 logarithmic axis; both bounds must be positive
    Log { min: f32, max: f32 },
}

impl Scale {
    /// Linear scale over the data range with a 5% margin on each side.
    ///
    /// A flat series gets a unit-wide range around its value.
    pub fn linear_padded<'a>(values: impl IntoIterator<Item = &'a f32>) -> Self {
        let (lo, hi) = finite_range(values.into_iter().copied()).unwrap_or((0.0, 1.0));
        if hi - lo <= f32::EPSILON * hi.abs().max(1.0) {
            return Scale::Linear {
                min: lo - 0.5,
                max: hi + 0.5,
            };
        }
        let margin = 0.05 * (hi - lo);
        Scale::Linear {
            min: lo - margin,
            max: hi + margin,
        }
    }

    /// Log scale over the positive data values, padded by 5% of the decade span.
    pub fn log_padded<'a>(values: impl IntoIterator<Item = &'a f32>) -> Self {
        let positive = values.into_iter().copied().filter(|v| *v > 0.0);
        let (lo, hi) = finite_range(positive).unwrap_or((1.0, 10.0));
        let (llo, lhi) = (lo.log10(), hi.log10());
        let (llo, lhi) = if lhi - llo < 1e-6 {
            (llo - 0.5, lhi + 0.5)
        } else {
            let margin = 0.05 * (lhi - llo);
            (llo - margin, lhi + margin)
        };
        Scale::Log {
            min: 10f32.powf(llo),
            max: 10f32.powf(lhi),
        }
    }

    pub fn bounds(&self) -> (f32, f32) {
        match *self {
            Scale::Linear { min, max } | Scale::Log { min, max } => (min, max),
        }
    }

    /// Axis fraction of `value`; `None` when it cannot be placed (e.g. <= 0 on a log axis).
    pub fn fraction(&self, value: f32) -> Option<f32> {
        if !value.is_finite() {
            return None;
        }
        match *self {
            Scale::Linear { min, max } => Some((value - min) / (max - min)),
            Scale::Log { min, max } => {
                if value <= 0.0 {
                    None
                } else {
                    Some((value.log10() - min.log10()) / (max.log10() - min.log10()))
                }
            }
        }
    }

    /// Inverse of [`Scale::fraction`].
    pub fn value_at(&self, fraction: f32) -> f32 {
        match *self {
            Scale::Linear { min, max } => min + (max - min) * fraction,
            Scale::Log { min, max } => {
                10f32.powf(min.log10() + (max.log10() - min.log10()) * fraction)
            }
        }
    }

    /// Tick positions inside the axis range.
    pub fn ticks(&self, target: usize) -> Vec<f32> {
        match *self {
            Scale::Linear { min, max } => nice_ticks(min, max, target),
            Scale::Log { min, max } => {
                let first = min.log10().ceil() as i32;
                let last = max.log10().floor() as i32;
                (first..=last).map(|e| 10f32.powi(e)).collect()
            }
        }
    }
}

fn finite_range(values: impl Iterator<Item = f32>) -> Option<(f32, f32)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Round tick values (1, 2, 2.5 or 5 times a power of ten) covering `[min, max]`.
pub fn nice_ticks(min: f32, max: f32, target: usize) -> Vec<f32> {
    if !(max > min) || target == 0 {
        return Vec::new();
    }
    let raw_step = (max - min) / target as f32;
    let magnitude = 10f32.powf(raw_step.log10().floor());
    let step = [1.0, 2.0, 2.5, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw_step * (1.0 - 1e-4))
        .unwrap_or(10.0 * magnitude);

    // Tolerance keeps ticks that land on the range ends despite rounding
    let first = (min / step - 1e-4).ceil() as i64;
    let last = (max / step + 1e-4).floor() as i64;
    (first..=last)
        .map(|i| i as f32 * step)
        // -0.0 prints badly
        .map(|v| if v == 0.0 { 0.0 } else { v })
        .collect()
}

/// Short label for a tick value, trimmed of trailing zeros.
pub fn format_tick(value: f32) -> String {
    if value != 0.0 && (value.abs() >= 1e5 || value.abs() < 1e-3) {
        return format!("{:.0e}", value);
    }
    let text = format!("{:.3}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nice_ticks() {
        assert_eq!(nice_ticks(0.0, 10.0, 5), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        let ticks = nice_ticks(-0.3, 0.3, 6);
        assert_eq!(ticks.len(), 7);
        assert!((ticks[0] + 0.3).abs() < 1e-5);
        assert!(ticks.contains(&0.0));
        assert!(nice_ticks(5.0, 5.0, 4).is_empty());
    }

    #[test]
    fn test_linear_fraction_round_trip() {
        let scale = Scale::Linear { min: -1.0, max: 3.0 };
        assert_eq!(scale.fraction(1.0), Some(0.5));
        assert!((scale.value_at(0.25) - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_log_scale_masks_non_positive() {
        let scale = Scale::Log { min: 10.0, max: 10000.0 };
        assert_eq!(scale.fraction(0.0), None);
        assert_eq!(scale.fraction(-3.0), None);
        assert!((scale.fraction(100.0).unwrap() - 1.0 / 3.0).abs() < 1e-5);
        assert_eq!(scale.ticks(5), vec![10.0, 100.0, 1000.0, 10000.0]);
    }

    #[test]
    fn test_padded_ranges() {
        let values = [0.0f32, 10.0];
        let (lo, hi) = Scale::linear_padded(&values).bounds();
        assert!((lo + 0.5).abs() < 1e-5 && (hi - 10.5).abs() < 1e-5);

        let flat = [2.0f32; 4];
        assert_eq!(Scale::linear_padded(&flat).bounds(), (1.5, 2.5));

        let with_zero = [0.0f32, 100.0, 1000.0];
        let (lo, hi) = Scale::log_padded(&with_zero).bounds();
        assert!(lo < 100.0 && lo > 50.0);
        assert!(hi > 1000.0 && hi < 2000.0);
    }

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(2.5), "2.5");
        assert_eq!(format_tick(100.0), "100");
        assert_eq!(format_tick(-0.0), "0");
        assert_eq!(format_tick(0.125), "0.125");
    }
}
