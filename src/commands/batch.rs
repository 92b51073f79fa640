// Batch analysis: every audio file under a directory.
// A file that fails to decode or analyze is recorded and the batch moves on.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::analysis::run_analyze_into;
use crate::audio::filter::FilterSettings;
use crate::config::AnalysisConfig;
use crate::pipeline::Visualization;
use crate::scanner::Scanner;

/// Result of analyzing a directory
#[derive(Debug, Serialize)]
pub struct BatchResult {
    pub total_files: usize,
    pub analyzed: usize,
    pub errors: Vec<BatchError>,
}

/// A file that could not be analyzed
#[derive(Debug, Serialize)]
pub struct BatchError {
    pub file_path: PathBuf,
    pub error: String,
}

/// Analyze every supported file under `dir`.
///
/// Plots for `dir/a/b.wav` land in `out_dir/a/b/`. See [`output_dirs`] for files
/// that share a stem.
pub fn run_batch(
    dir: &Path,
    filters: &FilterSettings,
    config: &AnalysisConfig,
    out_dir: &Path,
    only: &[Visualization],
) -> BatchResult {
    let files = Scanner::scan_directory(dir);
    let targets = output_dirs(&files, dir, out_dir);
    let total_files = files.len();
    let mut analyzed = 0;
    let mut errors = Vec::new();

    info!(dir = %dir.display(), total_files, "starting batch");

    for (i, (file_path, target)) in files.into_iter().zip(targets).enumerate() {
        match run_analyze_into(&file_path, filters, config, &target, only) {
            Ok(_) => {
                analyzed += 1;
                info!(progress = i + 1, total_files, file = %file_path.display(), "analyzed");
            }
            Err(e) => {
                warn!(file = %file_path.display(), error = %e, "analysis failed");
                errors.push(BatchError {
                    file_path,
                    error: e.to_string(),
                });
            }
        }
    }

    BatchResult {
        total_files,
        analyzed,
        errors,
    }
}

/// One output directory per file, `<out_dir>/<relative parent>/<stem>`.
///
/// Files in the same folder whose stems match (ignoring case) use `<stem>_<ext>`
/// instead, with a numeric suffix if even that clashes.
fn output_dirs(files: &[PathBuf], dir: &Path, out_dir: &Path) -> Vec<PathBuf> {
    let parts: Vec<(PathBuf, String, String)> = files
        .iter()
        .map(|file| {
            let parent = file
                .strip_prefix(dir)
                .ok()
                .and_then(Path::parent)
                .map(Path::to_path_buf)
                .unwrap_or_default();
            let stem = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "audio".to_string());
            let ext = file
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            (parent, stem, ext)
        })
        .collect();

    let mut stem_counts: HashMap<(PathBuf, String), usize> = HashMap::new();
    for (parent, stem, _) in &parts {
        *stem_counts
            .entry((parent.clone(), stem.to_lowercase()))
            .or_default() += 1;
    }

    let mut used: HashSet<(PathBuf, String)> = HashSet::new();
    parts
        .into_iter()
        .map(|(parent, stem, ext)| {
            let shared = stem_counts[&(parent.clone(), stem.to_lowercase())] > 1;
            let base = if shared && !ext.is_empty() {
                format!("{}_{}", stem, ext)
            } else {
                stem
            };
            let mut name = base.clone();
            let mut n = 2;
            while !used.insert((parent.clone(), name.to_lowercase())) {
                name = format!("{}_{}", base, n);
                n += 1;
            }
            out_dir.join(parent).join(name)
        })
        .collect()
}
