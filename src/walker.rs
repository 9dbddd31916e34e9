use std::path::{Path, PathBuf};

use crate::{
    document::SUPPORTED_EXTENSION,
    error::{Error, Result},
};

/// A resume file found in a candidate folder.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// File name within the folder.
    pub file_name: String,
    /// Fully resolved absolute path.
    pub absolute_path: PathBuf,
}

/// List the resume files directly inside `root`.
///
/// The scan is not recursive. Hidden entries (names starting with `.`),
/// Word lock files (`~$name.docx`) and files without the supported
/// extension are skipped. Results are sorted by file name so the input
/// order of the ranking pipeline is stable.
pub fn discover_files(root: &Path) -> Result<Vec<DiscoveredFile>> {
    if !root.is_dir() {
        return Err(Error::Config(format!(
            "resume folder does not exist or is not a directory: {}",
            root.display()
        )));
    }

    let canonical_root = root.canonicalize()?;
    let mut results = Vec::new();

    for entry in std::fs::read_dir(&canonical_root)? {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().to_string();

        if file_name.starts_with('.') || file_name.starts_with("~$") {
            continue;
        }

        let path = entry.path();
        if !is_supported(&path) {
            continue;
        }

        // Follows symlinks; broken links and directories named *.docx drop out.
        let resolved = match path.canonicalize() {
            Ok(p) if p.is_file() => p,
            _ => continue,
        };

        results.push(DiscoveredFile {
            file_name,
            absolute_path: resolved,
        });
    }

    results.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(results)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(SUPPORTED_EXTENSION))
}
