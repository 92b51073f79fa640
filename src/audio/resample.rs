// Sample rate conversion with rubato's windowed-sinc resampler.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::path::Path;
use tracing::debug;

use super::decoder::{decode_to_mono, MonoAudio};
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};

/// Input frames fed to the resampler per call.
const CHUNK_SIZE: usize = 1024;

/// Resample mono audio from `from_sr` to `to_sr`.
///
/// The output has `ceil(len * to_sr / from_sr)` samples and is aligned with the
/// input: the filter's group delay is trimmed off the front.
pub fn resample(samples: &[f32], from_sr: u32, to_sr: u32) -> Result<Vec<f32>> {
    if from_sr == 0 || to_sr == 0 {
        return Err(Error::InvalidParameter(format!(
            "cannot resample from {} Hz to {} Hz",
            from_sr, to_sr
        )));
    }
    if from_sr == to_sr || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let ratio = to_sr as f64 / from_sr as f64;
    let expected = (samples.len() as f64 * ratio).ceil() as usize;

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_SIZE, 1)
        .map_err(|e| Error::Resample(e.to_string()))?;
    let delay = resampler.output_delay();

    let mut output: Vec<f32> = Vec::with_capacity(expected + delay + CHUNK_SIZE);
    let mut chunks = samples.chunks_exact(CHUNK_SIZE);
    for chunk in &mut chunks {
        let out = resampler
            .process(&[chunk], None)
            .map_err(|e| Error::Resample(e.to_string()))?;
        output.extend_from_slice(&out[0]);
    }

    let rest = chunks.remainder();
    if !rest.is_empty() {
        let out = resampler
            .process_partial(Some(&[rest]), None)
            .map_err(|e| Error::Resample(e.to_string()))?;
        output.extend_from_slice(&out[0]);
    }

    // Flush the filter tail until the delayed signal is fully out
    while output.len() < delay + expected {
        let out = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(|e| Error::Resample(e.to_string()))?;
        if out[0].is_empty() {
            break;
        }
        output.extend_from_slice(&out[0]);
    }

    output.drain(..delay.min(output.len()));
    output.resize(expected, 0.0);
    Ok(output)
}

/// Decode a file and bring it to the configured analysis rate.
pub fn load(path: &Path, config: &AnalysisConfig) -> Result<MonoAudio> {
    let audio = decode_to_mono(path)?;
    conform(audio, config)
}

/// Resample already-decoded audio to the configured analysis rate (no-op when disabled).
pub fn conform(audio: MonoAudio, config: &AnalysisConfig) -> Result<MonoAudio> {
    if !config.resample || audio.sample_rate == config.sample_rate {
        return Ok(audio);
    }
    debug!(
        from = audio.sample_rate,
        to = config.sample_rate,
        "resampling"
    );
    let samples = resample(&audio.samples, audio.sample_rate, config.sample_rate)?;
    Ok(MonoAudio::new(samples, config.sample_rate))
}
