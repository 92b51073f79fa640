// Directory scanner - Find audio files to analyze in batch mode

use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Supported audio file extensions
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "aiff", "aif", "m4a", "ogg"];

/// Directory scanner
pub struct Scanner;

impl Scanner {
    /// Scan a directory recursively for audio files.
    /// Symlinks are followed, unreadable entries skipped, results sorted by path.
    pub fn scan_directory(path: &Path) -> Vec<PathBuf> {
        let mut audio_files: Vec<PathBuf> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| Self::is_supported(path))
            .collect();

        audio_files.sort();
        debug!(dir = %path.display(), found = audio_files.len(), "scanned directory");
        audio_files
    }

    /// True when the file extension is one the decoder handles.
    pub fn is_supported(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .map_or(false, |ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn create_temp_audio_files() -> TempDir {
        let temp_dir = TempDir::new().unwrap();

        let subdir = temp_dir.path().join("subdir");
        fs::create_dir(&subdir).unwrap();

        // Not real audio, only the extensions matter here
        let files = vec![
            temp_dir.path().join("track1.mp3"),
            temp_dir.path().join("track2.FLAC"),
            subdir.join("track3.wav"),
            temp_dir.path().join("not_audio.txt"),
        ];

        for file in &files {
            let mut f = File::create(file).unwrap();
            f.write_all(b"dummy content").unwrap();
        }

        temp_dir
    }

    #[test]
    fn test_scan_directory_finds_audio_files() {
        let temp_dir = create_temp_audio_files();
        let audio_files = Scanner::scan_directory(temp_dir.path());

        // mp3, FLAC and the nested wav, but not the txt file
        assert_eq!(audio_files.len(), 3);

        let extensions: Vec<_> = audio_files
            .iter()
            .filter_map(|p| p.extension())
            .map(|e| e.to_string_lossy().to_lowercase())
            .collect();

        assert!(extensions.contains(&"mp3".to_string()));
        assert!(extensions.contains(&"flac".to_string()));
        assert!(extensions.contains(&"wav".to_string()));
        assert!(!extensions.contains(&"txt".to_string()));
    }

    #[test]
    fn test_scan_results_are_sorted() {
        let temp_dir = create_temp_audio_files();
        let audio_files = Scanner::scan_directory(temp_dir.path());
        let mut sorted = audio_files.clone();
        sorted.sort();
        assert_eq!(audio_files, sorted);
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let audio_files = Scanner::scan_directory(temp_dir.path());
        assert_eq!(audio_files.len(), 0);
    }

    #[test]
    fn test_directory_named_like_audio_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("album.wav")).unwrap();
        assert!(Scanner::scan_directory(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_supported_extensions() {
        assert!(SUPPORTED_EXTENSIONS.contains(&"mp3"));
        assert!(SUPPORTED_EXTENSIONS.contains(&"flac"));
        assert!(SUPPORTED_EXTENSIONS.contains(&"wav"));
        assert!(SUPPORTED_EXTENSIONS.contains(&"aiff"));
        assert!(!SUPPORTED_EXTENSIONS.contains(&"txt"));
        assert!(Scanner::is_supported(Path::new("a/b/Song.OGG")));
        assert!(!Scanner::is_supported(Path::new("README")));
    }
}
