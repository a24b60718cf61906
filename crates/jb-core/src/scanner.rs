//! Directory scanner for discovering land record files

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File extensions treated as delimited record files
const RECORD_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];

/// A record file found under one of the scanned roots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFile {
    /// Full path to the file
    pub path: PathBuf,
    /// Root the file was found under
    pub root: PathBuf,
}

impl RecordFile {
    /// Path of the file below its root (the file name if the root is the file itself)
    pub fn relative_path(&self) -> &Path {
        match self.path.strip_prefix(&self.root) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel,
            _ => self
                .path
                .file_name()
                .map(Path::new)
                .unwrap_or(self.path.as_path()),
        }
    }
}

/// Result of scanning directories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Root directories that were scanned
    pub roots: Vec<PathBuf>,
    /// Discovered record files, sorted by path
    pub files: Vec<RecordFile>,
}

impl ScanResult {
    /// Get the number of discovered files
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Scan one or more directories for record files
pub fn scan_directory<P: AsRef<Path>>(roots: &[P]) -> Result<ScanResult> {
    let mut files = Vec::new();

    for root in roots {
        let root = root.as_ref();

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry?;
            if entry.file_type().is_file() && is_record_file(entry.path()) {
                files.push(RecordFile {
                    path: entry.into_path(),
                    root: root.to_path_buf(),
                });
            }
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    files.dedup_by(|a, b| a.path == b.path);

    tracing::debug!(roots = roots.len(), files = files.len(), "scanned record directories");

    Ok(ScanResult {
        roots: roots.iter().map(|r| r.as_ref().to_path_buf()).collect(),
        files,
    })
}

fn is_record_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            RECORD_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_is_record_file() {
        assert!(is_record_file(Path::new("village/khewat_594.csv")));
        assert!(is_record_file(Path::new("paste.TSV")));
        assert!(is_record_file(Path::new("paste.txt")));
        assert!(!is_record_file(Path::new("report.json")));
        assert!(!is_record_file(Path::new("README")));
    }

    #[test]
    fn test_scan_directory_finds_nested_files() {
        let root = std::env::temp_dir().join(format!("jb-scan-{}", std::process::id()));
        let nested = root.join("tehsil");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.join("b.csv"), "Kanal,Marla\n").unwrap();
        fs::write(nested.join("a.tsv"), "Kanal\tMarla\n").unwrap();
        fs::write(root.join("notes.json"), "{}").unwrap();

        let result = scan_directory(&[&root]).unwrap();
        fs::remove_dir_all(&root).unwrap();

        assert_eq!(result.file_count(), 2);
        assert_eq!(result.files[0].path, root.join("b.csv"));
        assert_eq!(result.files[1].path, nested.join("a.tsv"));
        assert_eq!(result.files[1].relative_path(), Path::new("tehsil/a.tsv"));
    }

    #[test]
    fn test_relative_path_of_file_root() {
        let file = RecordFile {
            path: PathBuf::from("records/v1.csv"),
            root: PathBuf::from("records/v1.csv"),
        };
        assert_eq!(file.relative_path(), Path::new("v1.csv"));
    }

    #[test]
    fn test_scan_missing_root_is_error() {
        assert!(scan_directory(&["/nonexistent/jamabandi"]).is_err());
    }
}
