//! Optional bookkeeping of ranking inputs.
//!
//! Layout under the data directory:
//!
//! ```text
//! input_data/
//!   job_description.txt
//!   folder_path.txt
//!   candidate_details.txt
//!   resumes/<uploaded file>
//! ```

use std::path::{Path, PathBuf};

use crate::{
    document::DocumentSource,
    error::{Error, Result},
    pipeline::RankingRequest,
};

pub const DATA_DIR_ENV_VAR: &str = "RESUMERANK_DATA_DIR";

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone)]
pub struct InputStore {
    root: PathBuf,
}

impl InputStore {
    /// Resolve the data directory from, in order of priority:
    /// 1. An explicit path (from --data-dir)
    /// 2. The RESUMERANK_DATA_DIR environment variable
    /// 3. The XDG data directory (~/.local/share/resumerank/)
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = if let Some(path) = explicit {
            path.to_path_buf()
        } else if let Ok(val) = std::env::var(DATA_DIR_ENV_VAR) {
            PathBuf::from(val)
        } else {
            xdg::BaseDirectories::with_prefix("resumerank")
                .get_data_home()
                .ok_or_else(|| {
                    Error::Config(
                        "could not determine XDG data home directory".into(),
                    )
                })?
        };

        std::fs::create_dir_all(&root)
            .map_err(|_| Error::DataDir(root.clone()))?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn input_dir(&self) -> PathBuf {
        self.root.join("input_data")
    }

    pub fn resumes_dir(&self) -> PathBuf {
        self.input_dir().join("resumes")
    }

    /// Write the request's inputs, overwriting the previous request's.
    ///
    /// Returns the number of resumes copied.
    pub fn record(&self, request: &RankingRequest) -> Result<usize> {
        let input_dir = self.input_dir();
        std::fs::create_dir_all(&input_dir)
            .map_err(|_| Error::DataDir(input_dir.clone()))?;

        std::fs::write(
            input_dir.join("job_description.txt"),
            &request.job_description,
        )?;
        let folder = request
            .folder
            .as_deref()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();
        std::fs::write(input_dir.join("folder_path.txt"), folder)?;

        let mut details = String::new();
        let mut copied = 0;
        if !request.uploads.is_empty() {
            let resumes_dir = self.resumes_dir();
            std::fs::create_dir_all(&resumes_dir)
                .map_err(|_| Error::DataDir(resumes_dir.clone()))?;

            for upload in &request.uploads {
                match stage_upload(&resumes_dir, upload) {
                    Ok(()) => copied += 1,
                    Err(e) => tracing::warn!(
                        file = %upload.file_name(),
                        "could not stage upload: {e}"
                    ),
                }
                // Contact and address extraction is not implemented.
                details.push_str(&format!(
                    "Name: {}, Contact: {UNKNOWN}, Address: {UNKNOWN}\n",
                    upload.candidate_name()
                ));
            }
        }
        std::fs::write(input_dir.join("candidate_details.txt"), details)?;

        tracing::debug!(dir = %input_dir.display(), copied, "staged inputs");
        Ok(copied)
    }
}

fn stage_upload(resumes_dir: &Path, upload: &DocumentSource) -> Result<()> {
    let file_name = upload.file_name();
    // Only the final component, so "../x.docx" cannot escape the folder.
    let safe_name = Path::new(&file_name)
        .file_name()
        .ok_or_else(|| Error::Config(format!("invalid file name: {file_name}")))?;
    let target = resumes_dir.join(safe_name);

    match upload {
        DocumentSource::Upload { bytes, .. } => std::fs::write(target, bytes)?,
        DocumentSource::File(path) | DocumentSource::UploadedFile(path) => {
            std::fs::copy(path, target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_with_explicit_path() {
        let tmp = tempfile::tempdir().unwrap();
        let store = InputStore::resolve(Some(tmp.path())).unwrap();

        assert_eq!(store.root(), tmp.path());
        assert_eq!(store.input_dir(), tmp.path().join("input_data"));
        assert_eq!(
            store.resumes_dir(),
            tmp.path().join("input_data").join("resumes")
        );
    }

    #[test]
    fn records_request() {
        let tmp = tempfile::tempdir().unwrap();
        let store = InputStore::resolve(Some(tmp.path())).unwrap();

        let on_disk = tmp.path().join("bob.smith.docx");
        std::fs::write(&on_disk, b"bob bytes").unwrap();

        let request = RankingRequest {
            job_description: "Rust engineer".to_string(),
            uploads: vec![
                DocumentSource::upload("../alice.docx", b"alice".to_vec()),
                DocumentSource::UploadedFile(on_disk),
            ],
            folder: Some(PathBuf::from("/srv/resumes")),
        };

        assert_eq!(store.record(&request).unwrap(), 2);

        let input = store.input_dir();
        assert_eq!(
            std::fs::read_to_string(input.join("job_description.txt")).unwrap(),
            "Rust engineer"
        );
        assert_eq!(
            std::fs::read_to_string(input.join("folder_path.txt")).unwrap(),
            "/srv/resumes"
        );
        assert_eq!(
            std::fs::read(store.resumes_dir().join("alice.docx")).unwrap(),
            b"alice"
        );
        assert_eq!(
            std::fs::read(store.resumes_dir().join("bob.smith.docx")).unwrap(),
            b"bob bytes"
        );
        let details =
            std::fs::read_to_string(input.join("candidate_details.txt")).unwrap();
        assert_eq!(
            details,
            "Name: alice, Contact: Unknown, Address: Unknown\n\
             Name: bob, Contact: Unknown, Address: Unknown\n"
        );
    }

    #[test]
    fn folder_only_request_writes_no_resumes() {
        let tmp = tempfile::tempdir().unwrap();
        let store = InputStore::resolve(Some(tmp.path())).unwrap();
        let request = RankingRequest {
            job_description: "Chef".to_string(),
            uploads: vec![],
            folder: Some(PathBuf::from("/srv/resumes")),
        };

        assert_eq!(store.record(&request).unwrap(), 0);
        assert!(!store.resumes_dir().exists());
        let details = std::fs::read_to_string(
            store.input_dir().join("candidate_details.txt"),
        )
        .unwrap();
        assert!(details.is_empty());
    }
}
