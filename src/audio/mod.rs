// Audio processing (DSP)
// Modules: decoder, resample, filter, stft, mel, features, rhythm, waveform

pub mod decoder;
pub mod features;
pub mod filter;
pub mod mel;
pub mod resample;
pub mod rhythm;
pub mod stft;
pub mod waveform;
