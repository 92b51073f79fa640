// Modules
pub mod audio;
pub mod commands;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod scanner;
pub mod server;

pub use audio::filter::{FilterBand, FilterSettings};
pub use config::{AnalysisConfig, RenderConfig, ServerConfig};
pub use error::{Error, Result};
pub use pipeline::{
    analyze_audio, analyze_bytes, analyze_file, AnalysisReport, FeatureSet, RenderedPlot,
    Visualization,
};

/// Crate version, embedded in PNG metadata and `/api/status`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
