// Waveform envelope for plotting.
// A zoomed-out waveform is drawn as a filled band between the lowest and highest
// sample inside each pixel column.

/// One column of the envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopePoint {
    pub min: f32,
    pub max: f32,
}

/// Min/max envelope of a signal, one point per output column.
#[derive(Debug, Clone, Default)]
pub struct WaveformEnvelope {
    pub points: Vec<EnvelopePoint>,
}

impl WaveformEnvelope {
    /// Reduce `samples` to at most `columns` min/max points.
    ///
    /// Signals shorter than `columns` get one point per sample.
    pub fn from_samples(samples: &[f32], columns: usize) -> Self {
        if samples.is_empty() || columns == 0 {
            return Self::default();
        }

        let actual = columns.min(samples.len());
        let points = (0..actual)
            .map(|i| {
                // Integer bucket edges so every sample lands in exactly one column
                let start = i * samples.len() / actual;
                let end = ((i + 1) * samples.len() / actual).max(start + 1);
                let slice = &samples[start..end];
                let (min, max) = slice
                    .iter()
                    .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| {
                        (lo.min(s), hi.max(s))
                    });
                EnvelopePoint { min, max }
            })
            .collect();

        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Largest absolute sample value covered by the envelope.
    pub fn peak_amplitude(&self) -> f32 {
        self.points
            .iter()
            .fold(0.0f32, |m, p| m.max(p.min.abs()).max(p.max.abs()))
    }
}
