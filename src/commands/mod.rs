// Command handlers shared by the CLI and the HTTP server

pub mod analysis;
pub mod batch;

use serde::Serialize;

use crate::pipeline::Visualization;

pub use analysis::{run_analyze, run_analyze_into, AnalyzeOutcome};
pub use batch::{run_batch, BatchError, BatchResult};

/// Public description of one visualization
#[derive(Debug, Clone, Serialize)]
pub struct VisualizationInfo {
    pub index: usize,
    pub name: &'static str,
    pub slug: &'static str,
    pub description: &'static str,
    pub label: String,
}

impl From<Visualization> for VisualizationInfo {
    fn from(v: Visualization) -> Self {
        VisualizationInfo {
            index: v.index(),
            name: v.name(),
            slug: v.slug(),
            description: v.description(),
            label: v.label(),
        }
    }
}

/// All visualizations in output order.
pub fn visualizations() -> Vec<VisualizationInfo> {
    Visualization::ALL.iter().copied().map(VisualizationInfo::from).collect()
}

/// Parse a comma-separated list of visualization slugs. Empty input selects nothing
/// (callers treat that as "all").
pub fn parse_selection(list: &str) -> Result<Vec<Visualization>, String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|slug| {
            Visualization::from_slug(slug).ok_or_else(|| {
                let known: Vec<&str> = Visualization::ALL.iter().map(|v| v.slug()).collect();
                format!("unknown plot '{}' (expected one of: {})", slug, known.join(", "))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visualizations_listing() {
        let list = visualizations();
        assert_eq!(list.len(), 11);
        assert_eq!(list[1].name, "Spectrogram");
        assert_eq!(list[1].index, 2);
        assert!(list[1].label.starts_with("Spectrogram: Graphical representation"));
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(
            parse_selection("tempo, mfcc").unwrap(),
            vec![Visualization::Tempo, Visualization::Mfcc]
        );
        assert!(parse_selection("").unwrap().is_empty());
        let err = parse_selection("mfcc,chroma").unwrap_err();
        assert!(err.contains("chroma"));
    }
}
