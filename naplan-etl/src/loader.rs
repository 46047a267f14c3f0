//! JSON document loader
//!
//! Lists the `.json` files directly inside an input directory, sorted by file
//! name, and parses them one at a time as the caller iterates. A failure on one
//! file is returned for that file only; the remaining files still load.

use crate::error::{EtlError, EtlResult};
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Default per-file size ceiling (512 MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 512 * 1024 * 1024;

/// Loads yearly export documents from a directory
pub struct DocumentLoader {
    max_file_size: u64,
}

impl DocumentLoader {
    /// Create loader with the default size ceiling
    pub fn new() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Override the per-file size ceiling
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// List JSON documents in `dir`
    ///
    /// Fails with [`EtlError::Io`] when the directory is missing or unreadable.
    pub fn documents(&self, dir: &Path) -> EtlResult<Documents> {
        if !dir.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Input directory not found: {}", dir.display()),
            )
            .into());
        }

        if !dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Not a directory: {}", dir.display()),
            )
            .into());
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                io::Error::new(
                    io::ErrorKind::Other,
                    format!("Failed to list {}: {}", dir.display(), e),
                )
            })?;

            if entry.file_type().is_file() && is_json_file(entry.path()) {
                paths.push(entry.path().to_path_buf());
            } else {
                debug!("Ignoring {}", entry.path().display());
            }
        }

        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        debug!("Found {} JSON documents in {}", paths.len(), dir.display());

        Ok(Documents {
            paths: paths.into_iter(),
            max_file_size: self.max_file_size,
        })
    }
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy sequence of `(file name, parsed document)` pairs
pub struct Documents {
    paths: std::vec::IntoIter<PathBuf>,
    max_file_size: u64,
}

impl Documents {
    /// Number of documents not yet loaded
    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl Iterator for Documents {
    type Item = (String, EtlResult<Value>);

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.next()?;
        let name = file_name(&path);
        let document = load_document(&path, self.max_file_size);
        if let Err(e) = &document {
            debug!("Failed to load {}: {}", name, e);
        }
        Some((name, document))
    }
}

fn load_document(path: &Path, max_file_size: u64) -> EtlResult<Value> {
    let size = std::fs::metadata(path)?.len();
    if size > max_file_size {
        return Err(EtlError::DocumentTooLarge {
            file: path.to_path_buf(),
            size,
            limit: max_file_size,
        });
    }

    let bytes = std::fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|source| EtlError::Parse {
        file: file_name(path),
        source,
    })
}

fn is_json_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Year label stamped on a document's questions
///
/// The leading four digits of the file stem (`2019_naplan.json` → `2019`),
/// otherwise the whole stem.
pub fn year_label(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());

    let digits: String = stem.chars().take(4).collect();
    if digits.len() == 4 && digits.chars().all(|c| c.is_ascii_digit()) {
        digits
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_year_label() {
        assert_eq!(year_label("2019_naplan.json"), "2019");
        assert_eq!(year_label("2021.json"), "2021");
        assert_eq!(year_label("results-2022.json"), "results-2022");
        assert_eq!(year_label("201.json"), "201");
    }

    #[test]
    fn test_documents_sorted_and_filtered() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("2022.json"), "{}").unwrap();
        fs::write(temp_dir.path().join("2020.JSON"), "{}").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "ignore me").unwrap();
        fs::create_dir(temp_dir.path().join("archive.json")).unwrap();

        let loader = DocumentLoader::new();
        let names: Vec<String> = loader
            .documents(temp_dir.path())
            .unwrap()
            .map(|(name, doc)| {
                assert!(doc.is_ok());
                name
            })
            .collect();

        assert_eq!(names, vec!["2020.JSON", "2022.json"]);
    }

    #[test]
    fn test_malformed_document_is_isolated() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.json"), "{\"domains\": [").unwrap();
        fs::write(temp_dir.path().join("b.json"), "{\"domains\": []}").unwrap();

        let results: Vec<(String, EtlResult<Value>)> =
            DocumentLoader::new().documents(temp_dir.path()).unwrap().collect();

        assert_eq!(results.len(), 2);
        match &results[0].1 {
            Err(EtlError::Parse { file, .. }) => assert_eq!(file, "a.json"),
            other => panic!("Expected Parse error, got {:?}", other),
        }
        assert!(results[1].1.is_ok());
    }

    #[test]
    fn test_size_ceiling() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("big.json");
        fs::write(&path, "[1, 2, 3, 4, 5, 6, 7, 8]").unwrap();

        let mut documents = DocumentLoader::new()
            .with_max_file_size(4)
            .documents(temp_dir.path())
            .unwrap();
        match documents.next() {
            Some((_, Err(EtlError::DocumentTooLarge { file, limit, .. }))) => {
                assert_eq!(file, path);
                assert_eq!(limit, 4);
            }
            other => panic!("Expected DocumentTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let result = DocumentLoader::new().documents(Path::new("/nonexistent/naplan/raw"));
        assert!(matches!(result, Err(EtlError::Io(_))));
    }
}
