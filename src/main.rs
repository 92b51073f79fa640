// audiofeat CLI - analyze audio files into feature plots, or serve the HTTP API

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use audiofeat_lib::commands::{self, parse_selection};
use audiofeat_lib::server::start_server;
use audiofeat_lib::{AnalysisConfig, FilterSettings, ServerConfig, Visualization, VERSION};

/// audiofeat - Audio feature extraction and visualization
#[derive(Parser, Debug)]
#[command(name = "audiofeat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Cutoffs in Hz; values <= 0 leave that filter off
#[derive(Args, Debug, Clone, Copy)]
struct FilterArgs {
    /// High-pass cutoff
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    highpass: i32,

    /// Low-pass cutoff
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    lowpass: i32,

    /// Band-pass lower edge
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    bandpass_low: i32,

    /// Band-pass upper edge
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    bandpass_high: i32,
}

impl From<FilterArgs> for FilterSettings {
    fn from(args: FilterArgs) -> Self {
        FilterSettings {
            highpass_hz: args.highpass,
            lowpass_hz: args.lowpass,
            bandpass_low_hz: args.bandpass_low,
            bandpass_high_hz: args.bandpass_high,
        }
    }
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Analysis parameters (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the plots are written to
    #[arg(short, long, default_value = "plots")]
    out_dir: PathBuf,

    /// Comma-separated plot slugs to render (default: all)
    #[arg(long)]
    only: Option<String>,
}

impl OutputArgs {
    fn selection(&self) -> Result<Vec<Visualization>> {
        match &self.only {
            Some(list) => parse_selection(list).map_err(anyhow::Error::msg),
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze one audio file
    Analyze {
        /// Audio file (mp3, flac, wav, aiff, m4a, ogg)
        file: PathBuf,

        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Analyze every audio file under a directory
    Batch {
        dir: PathBuf,

        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Start the HTTP API
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 7860)]
        port: u16,

        /// Maximum concurrent analyses
        #[arg(long, default_value_t = 10)]
        max_queue: usize,

        /// Analysis parameters (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List the available plots
    Plots,
}

fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(AnalysisConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    info!("audiofeat v{}", VERSION);

    match cli.command {
        Commands::Analyze {
            file,
            filters,
            output,
        } => {
            let config = load_config(output.config.as_deref())?;
            let only = output.selection()?;
            let filters = FilterSettings::from(filters);
            let out_dir = output.out_dir;

            let outcome = tokio::task::spawn_blocking(move || {
                commands::run_analyze(&file, &filters, &config, &out_dir, &only)
                    .with_context(|| format!("Failed to analyze {}", file.display()))
            })
            .await
            .context("Analysis task panicked")??;

            for path in &outcome.written {
                println!("{}", path.display());
            }
            if let Some(bpm) = outcome.report.median_tempo_bpm {
                info!("median tempo {:.1} BPM", bpm);
            }
            Ok(())
        }

        Commands::Batch {
            dir,
            filters,
            output,
        } => {
            let config = load_config(output.config.as_deref())?;
            let only = output.selection()?;
            let filters = FilterSettings::from(filters);
            let out_dir = output.out_dir;

            let result = tokio::task::spawn_blocking(move || {
                commands::run_batch(&dir, &filters, &config, &out_dir, &only)
            })
            .await
            .context("Batch task panicked")?;

            for error in &result.errors {
                warn!(file = %error.file_path.display(), "{}", error.error);
            }
            println!(
                "{} of {} files analyzed",
                result.analyzed, result.total_files
            );
            if result.analyzed == 0 && result.total_files > 0 {
                anyhow::bail!("No file could be analyzed");
            }
            Ok(())
        }

        Commands::Serve {
            port,
            max_queue,
            config,
        } => {
            let analysis_config = load_config(config.as_deref())?;
            let server_config = ServerConfig {
                port,
                max_queue,
                ..ServerConfig::default()
            };

            let server = start_server(server_config, analysis_config)
                .await
                .context("Failed to start server")?;
            println!("Listening on http://{}", server.addr);

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for ctrl-c")?;
            server.shutdown().await;
            Ok(())
        }

        Commands::Plots => {
            for plot in commands::visualizations() {
                println!("{:>2}. {:<20} {}", plot.index, plot.slug, plot.description);
            }
            Ok(())
        }
    }
}
