// Colormaps for heatmaps: a sequential map for one-signed data and a diverging map
// for data that spans zero.

use image::Rgb;

/// Anchor colors sampled evenly from matplotlib's "magma".
const MAGMA: [[u8; 3]; 9] = [
    [0, 0, 4],
    [28, 16, 68],
    [79, 18, 123],
    [129, 37, 129],
    [181, 54, 122],
    [229, 80, 100],
    [251, 135, 97],
    [254, 194, 135],
    [252, 253, 191],
];

/// Blue to light grey to red, after matplotlib's "coolwarm".
const COOLWARM: [[u8; 3]; 5] = [
    [59, 76, 192],
    [141, 176, 254],
    [221, 221, 221],
    [244, 154, 123],
    [180, 4, 38],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colormap {
    Magma,
    Coolwarm,
}

impl Colormap {
    /// Pick the map the way specshow does: sequential unless the robust
    /// (1st to 99th percentile) range straddles zero.
    pub fn for_data<'a>(values: impl IntoIterator<Item = &'a f32>) -> Self {
        let mut finite: Vec<f32> = values.into_iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return Colormap::Magma;
        }
        finite.sort_by(|a, b| a.total_cmp(b));
        let low = percentile(&finite, 1.0);
        let high = percentile(&finite, 99.0);
        if low >= 0.0 || high <= 0.0 {
            Colormap::Magma
        } else {
            Colormap::Coolwarm
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Colormap::Magma => "magma",
            Colormap::Coolwarm => "coolwarm",
        }
    }

    /// Color for `t` in `[0, 1]` (clamped).
    pub fn sample(&self, t: f32) -> Rgb<u8> {
        let anchors: &[[u8; 3]] = match self {
            Colormap::Magma => &MAGMA,
            Colormap::Coolwarm => &COOLWARM,
        };
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let pos = t * (anchors.len() - 1) as f32;
        let i = (pos.floor() as usize).min(anchors.len() - 2);
        let frac = pos - i as f32;
        let (a, b) = (anchors[i], anchors[i + 1]);
        let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * frac).round() as u8;
        Rgb([mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2])])
    }
}

/// Linear-interpolated percentile of sorted data.
fn percentile(sorted: &[f32], p: f32) -> f32 {
    let rank = p / 100.0 * (sorted.len() - 1) as f32;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(Colormap::Magma.sample(0.0), Rgb([0, 0, 4]));
        assert_eq!(Colormap::Magma.sample(1.0), Rgb([252, 253, 191]));
        assert_eq!(Colormap::Coolwarm.sample(0.5), Rgb([221, 221, 221]));
        // Out of range and NaN clamp instead of panicking
        assert_eq!(Colormap::Magma.sample(7.0), Rgb([252, 253, 191]));
        assert_eq!(Colormap::Coolwarm.sample(f32::NAN), Rgb([59, 76, 192]));
    }

    #[test]
    fn test_choice_follows_sign_of_robust_range() {
        let positive = vec![0.0f32, 1.0, 2.0, 3.0];
        assert_eq!(Colormap::for_data(&positive), Colormap::Magma);

        let negative = vec![-80.0f32, -40.0, -1.0, 0.0];
        assert_eq!(Colormap::for_data(&negative), Colormap::Magma);

        let mixed = vec![-300.0f32, -20.0, 5.0, 40.0];
        assert_eq!(Colormap::for_data(&mixed), Colormap::Coolwarm);
    }

    #[test]
    fn test_single_outlier_does_not_flip_map() {
        // One negative value out of 1000 sits below the 1st percentile
        let mut values = vec![1.0f32; 1000];
        values[0] = -5.0;
        assert_eq!(Colormap::for_data(&values), Colormap::Magma);
    }
}
