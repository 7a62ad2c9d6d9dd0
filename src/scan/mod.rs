//! Directory scanning — produces the ordered candidate file list the
//! Orchestrator drives, and the per-folder `(index, total)` ordinals
//! computed once up front (spec.md §4.7, §5 ordering guarantees).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Video file extensions this tool recognizes while walking a tree.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm"];

fn is_hidden(entry: &Path) -> bool {
    entry
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

fn is_video_file(path: &Path) -> bool {
    if !path.is_file() || is_hidden(path) {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Recursively scans `directory` for video files, returning them in
/// `walkdir`'s natural (depth-first, directory-order) iteration order.
/// Callers that need a stable per-folder ordinal should pass the result
/// through [`ordinals_by_folder`] rather than relying on this order.
pub fn scan_directory<P: AsRef<Path>>(directory: P) -> Vec<PathBuf> {
    let directory = directory.as_ref();
    if !directory.exists() {
        log::error!("directory not found: {:?}", directory);
        return Vec::new();
    }

    WalkDir::new(directory)
        .min_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .filter(|path| is_video_file(path))
        .collect()
}

/// The 1-based position of a file within its folder's name-sorted view,
/// and the size of that folder (spec.md's "Ordinal" — §3, §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordinal {
    pub index: usize,
    pub total: usize,
}

/// Computes a stable `(index, total)` ordinal for every file in `files`,
/// grouped by parent directory and sorted by file name ascending. This is
/// computed once, before any worker runs, so it stays stable regardless of
/// completion order (spec.md §5 Ordering guarantees, testable property 3).
pub fn ordinals_by_folder(files: &[PathBuf]) -> BTreeMap<PathBuf, Ordinal> {
    let mut by_folder: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for file in files {
        let folder = file
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(""));
        by_folder.entry(folder).or_insert_with(Vec::new).push(file.clone());
    }

    let mut result = BTreeMap::new();
    for files in by_folder.values_mut() {
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        let total = files.len();
        for (i, file) in files.iter().enumerate() {
            result.insert(file.clone(), Ordinal { index: i + 1, total });
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn scan_directory_finds_recognized_video_extensions_only() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("clip.mp4"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::write(dir.path().join(".hidden.mp4"), b"x").unwrap();

        let found = scan_directory(dir.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file_name().unwrap(), "clip.mp4");
    }

    #[test]
    fn scan_directory_recurses_into_subfolders() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("Vacation");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("clip01.mp4"), b"x").unwrap();

        let found = scan_directory(dir.path());
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn scan_directory_missing_root_returns_empty() {
        assert!(scan_directory("/does/not/exist/anywhere").is_empty());
    }

    #[test]
    fn ordinals_are_stable_and_sorted_by_name() {
        let folder = PathBuf::from("/in/Vacation");
        let files = vec![
            folder.join("b.mp4"),
            folder.join("a.mp4"),
            folder.join("c.mp4"),
        ];
        let ordinals = ordinals_by_folder(&files);
        assert_eq!(ordinals[&folder.join("a.mp4")], Ordinal { index: 1, total: 3 });
        assert_eq!(ordinals[&folder.join("b.mp4")], Ordinal { index: 2, total: 3 });
        assert_eq!(ordinals[&folder.join("c.mp4")], Ordinal { index: 3, total: 3 });
    }

    #[test]
    fn ordinals_are_computed_independently_per_folder() {
        let files = vec![
            PathBuf::from("/in/A/one.mp4"),
            PathBuf::from("/in/B/one.mp4"),
            PathBuf::from("/in/B/two.mp4"),
        ];
        let ordinals = ordinals_by_folder(&files);
        assert_eq!(ordinals[&PathBuf::from("/in/A/one.mp4")].total, 1);
        assert_eq!(ordinals[&PathBuf::from("/in/B/one.mp4")].total, 2);
    }
}
