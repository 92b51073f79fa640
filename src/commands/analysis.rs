// Single-file analysis command.
//
// Runs the pipeline on one file and writes:
//   <out_dir>/<stem>/<NN>_<slug>.png   one per requested visualization
//   <out_dir>/<stem>/report.json       metadata (sample rate, filters, tempo, plot list)

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::audio::filter::FilterSettings;
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::pipeline::{analyze_file_with, AnalysisReport, Visualization};

/// What `run_analyze` produced on disk.
#[derive(Debug)]
pub struct AnalyzeOutcome {
    pub report: AnalysisReport,
    /// Directory holding this file's plots
    pub output_dir: PathBuf,
    /// PNG files in output order, followed by `report.json`
    pub written: Vec<PathBuf>,
}

/// Analyze one audio file and write its plots to `<out_dir>/<file stem>/`.
///
/// An empty `only` means every visualization.
pub fn run_analyze(
    path: &Path,
    filters: &FilterSettings,
    config: &AnalysisConfig,
    out_dir: &Path,
    only: &[Visualization],
) -> Result<AnalyzeOutcome> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    run_analyze_into(path, filters, config, &out_dir.join(stem), only)
}

/// [`run_analyze`] writing straight into `output_dir`.
pub fn run_analyze_into(
    path: &Path,
    filters: &FilterSettings,
    config: &AnalysisConfig,
    output_dir: &Path,
    only: &[Visualization],
) -> Result<AnalyzeOutcome> {
    let selection: &[Visualization] = if only.is_empty() {
        &Visualization::ALL
    } else {
        only
    };

    let report = analyze_file_with(path, filters, config, selection)?;

    let output_dir = output_dir.to_path_buf();
    fs::create_dir_all(&output_dir).map_err(|e| Error::io(&output_dir, e))?;

    let mut written = Vec::with_capacity(report.plots.len() + 1);
    for plot in &report.plots {
        let file = output_dir.join(plot_file_name(plot.visualization));
        fs::write(&file, &plot.png).map_err(|e| Error::io(&file, e))?;
        written.push(file);
    }

    let report_path = output_dir.join("report.json");
    let json = serde_json::to_vec_pretty(&report)
        .map_err(|e| Error::Render(format!("failed to serialize report: {}", e)))?;
    fs::write(&report_path, json).map_err(|e| Error::io(&report_path, e))?;
    written.push(report_path);

    info!(
        file = %path.display(),
        out = %output_dir.display(),
        plots = report.plots.len(),
        "wrote plots"
    );

    Ok(AnalyzeOutcome {
        report,
        output_dir,
        written,
    })
}

/// `"<NN>_<slug>.png"`, numbered by output position so a directory listing sorts
/// in plot order.
pub fn plot_file_name(visualization: Visualization) -> String {
    format!("{:02}_{}.png", visualization.index(), visualization.slug())
}
