// Audio decoding to mono f32 PCM via symphonia.
// Every analysis starts here: read the whole stream, convert to f32, mix down to mono.

use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::conv::FromSample;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Result of decoding an entire audio file to mono f32 samples.
#[derive(Debug, Clone)]
pub struct MonoAudio {
    /// Mono audio samples in range [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate of the audio (e.g., 22050, 44100)
    pub sample_rate: u32,
    /// Total duration in milliseconds
    pub duration_ms: u64,
}

impl MonoAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        let duration_ms = duration_ms(samples.len(), sample_rate);
        Self {
            samples,
            sample_rate,
            duration_ms,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

fn duration_ms(len: usize, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        0
    } else {
        (len as u64 * 1000) / sample_rate as u64
    }
}

/// Decode an entire audio file to mono f32 samples at the file's native rate.
pub fn decode_to_mono(path: &Path) -> Result<MonoAudio> {
    let file = std::fs::File::open(path).map_err(|e| Error::io(path, e))?;
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase());
    decode_source(Box::new(file), extension.as_deref())
}

/// Decode an in-memory audio file (e.g. an HTTP upload).
///
/// `extension_hint` is the file extension without the dot, if known.
pub fn decode_bytes_to_mono(bytes: Vec<u8>, extension_hint: Option<&str>) -> Result<MonoAudio> {
    decode_source(Box::new(Cursor::new(bytes)), extension_hint)
}

fn decode_source(source: Box<dyn MediaSource>, extension_hint: Option<&str>) -> Result<MonoAudio> {
    let mss = MediaSourceStream::new(source, Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension_hint {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| Error::Decode(format!("failed to probe audio format: {}", e)))?;

    let mut format_reader = probed.format;

    let track = format_reader.default_track().ok_or(Error::NoAudioTrack)?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| Error::Decode("stream does not declare a sample rate".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("failed to create decoder: {}", e)))?;

    let mut all_samples: Vec<f32> = Vec::new();
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(symphonia::core::errors::Error::ResetRequired) => break,
            Err(e) => return Err(Error::Decode(format!("error reading packet: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(msg)) => {
                warn!("skipping corrupted packet: {}", msg);
                skipped_packets += 1;
                continue;
            }
            Err(e) => return Err(Error::Decode(e.to_string())),
        };

        let mono_chunk = convert_to_mono_f32(&decoded);
        all_samples.extend_from_slice(&mono_chunk);
    }

    debug!(
        samples = all_samples.len(),
        sample_rate, skipped_packets, "decoded audio stream"
    );

    Ok(MonoAudio::new(all_samples, sample_rate))
}

/// Convert decoded audio buffer to mono f32 samples.
/// Multichannel audio is averaged across channels.
fn convert_to_mono_f32(decoded: &AudioBufferRef) -> Vec<f32> {
    match decoded {
        AudioBufferRef::F32(buf) => mix_to_mono(buf),
        AudioBufferRef::U8(buf) => mix_to_mono(buf),
        AudioBufferRef::U16(buf) => mix_to_mono(buf),
        AudioBufferRef::U24(buf) => mix_to_mono(buf),
        AudioBufferRef::U32(buf) => mix_to_mono(buf),
        AudioBufferRef::S8(buf) => mix_to_mono(buf),
        AudioBufferRef::S16(buf) => mix_to_mono(buf),
        AudioBufferRef::S24(buf) => mix_to_mono(buf),
        AudioBufferRef::S32(buf) => mix_to_mono(buf),
        AudioBufferRef::F64(buf) => mix_to_mono(buf),
    }
}

fn mix_to_mono<S>(buf: &AudioBuffer<S>) -> Vec<f32>
where
    S: Sample,
    f32: FromSample<S>,
{
    let channels = buf.spec().channels.count();
    let frames = buf.frames();

    if channels == 0 || frames == 0 {
        return Vec::new();
    }

    if channels == 1 {
        buf.chan(0).iter().map(|&s| f32::from_sample(s)).collect()
    } else {
        let mut mono = vec![0.0f32; frames];
        let scale = 1.0 / channels as f32;
        for ch in 0..channels {
            for (out, &sample) in mono.iter_mut().zip(buf.chan(ch)) {
                *out += f32::from_sample(sample) * scale;
            }
        }
        mono
    }
}
