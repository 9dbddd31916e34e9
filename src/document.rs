use std::{
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    sync::mpsc::{self, RecvTimeoutError},
    time::Duration,
};

use docx_rs::{DocumentChild, ParagraphChild, RunChild};

use crate::error::{Error, Result};

/// File extension of the one container format the reader understands.
pub const SUPPORTED_EXTENSION: &str = "docx";

/// Longest a single document parse may take before it is abandoned.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a resume comes from: a file on disk or an in-memory upload.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// A file found by scanning a folder.
    File(PathBuf),
    /// An upload still on disk, as passed on the command line or over MCP.
    UploadedFile(PathBuf),
    Upload { file_name: String, bytes: Vec<u8> },
}

impl DocumentSource {
    pub fn upload(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::Upload {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Candidate name derived from the source.
    ///
    /// Folder files use the file stem; uploads use everything before the
    /// first `.` so that `jane.doe.docx` and `jane.docx` are treated the
    /// way the upload form named them.
    pub fn candidate_name(&self) -> String {
        match self {
            Self::File(path) => path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("untitled")
                .to_string(),
            Self::UploadedFile(_) | Self::Upload { .. } => {
                let file_name = self.file_name();
                let base = Path::new(&file_name)
                    .file_name()
                    .and_then(|s| s.to_str())
                    .unwrap_or(&file_name);
                match base.split('.').next() {
                    Some(stem) if !stem.is_empty() => stem.to_string(),
                    _ => base.to_string(),
                }
            }
        }
    }

    /// File name as it should appear when staged or reported.
    pub fn file_name(&self) -> String {
        match self {
            Self::File(path) | Self::UploadedFile(path) => path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            Self::Upload { file_name, .. } => file_name.clone(),
        }
    }
}

/// Extract the paragraph text of a resume, one paragraph per line.
///
/// Any failure, including not being able to open the file, is reported as
/// [`Error::UnreadableDocument`] so the caller can skip the candidate
/// instead of aborting the batch.
pub fn read_document(source: &DocumentSource) -> Result<String> {
    read_document_within(source, DEFAULT_READ_TIMEOUT)
}

/// [`read_document`] with an explicit parse deadline.
pub fn read_document_within(
    source: &DocumentSource,
    timeout: Duration,
) -> Result<String> {
    let name = source.candidate_name();
    match source {
        DocumentSource::File(path) | DocumentSource::UploadedFile(path) => {
            let bytes = std::fs::read(path).map_err(|e| {
                Error::UnreadableDocument {
                    name: name.clone(),
                    reason: format!("cannot read {}: {e}", path.display()),
                }
            })?;
            read_docx_bytes(&name, &bytes, timeout)
        }
        DocumentSource::Upload { bytes, .. } => {
            read_docx_bytes(&name, bytes, timeout)
        }
    }
}

/// Parse a `.docx` buffer and concatenate its body paragraphs.
///
/// The parser runs on its own thread. A parser panic becomes
/// `UnreadableDocument`, and so does a parse still running after
/// `timeout`. A timed-out parser thread is detached, not killed.
pub fn read_docx_bytes(
    name: &str,
    bytes: &[u8],
    timeout: Duration,
) -> Result<String> {
    let unreadable = |reason: String| Error::UnreadableDocument {
        name: name.to_string(),
        reason,
    };

    let (tx, rx) = mpsc::channel();
    let owned = bytes.to_vec();
    std::thread::Builder::new()
        .name("resumerank-docx".to_string())
        .spawn(move || {
            let parsed =
                panic::catch_unwind(AssertUnwindSafe(|| extract_text(&owned)));
            // The reader may have given up already.
            if tx.send(parsed).is_err() {
                tracing::debug!("document parse finished after its deadline");
            }
        })
        .map_err(|e| unreadable(format!("cannot start parser thread: {e}")))?;

    match rx.recv_timeout(timeout) {
        Ok(Ok(result)) => result.map_err(unreadable),
        Ok(Err(_)) | Err(RecvTimeoutError::Disconnected) => {
            Err(unreadable("document parser panicked".to_string()))
        }
        Err(RecvTimeoutError::Timeout) => {
            tracing::warn!(candidate = name, ?timeout, "document parse timed out");
            Err(unreadable(format!("timed out after {timeout:?}")))
        }
    }
}

fn extract_text(bytes: &[u8]) -> std::result::Result<String, String> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| e.to_string())?;

    let mut text = String::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(paragraph) = child {
            for part in &paragraph.children {
                push_paragraph_child(&mut text, part);
            }
            text.push('\n');
        }
    }

    Ok(text)
}

fn push_paragraph_child(text: &mut String, child: &ParagraphChild) {
    match child {
        ParagraphChild::Run(run) => {
            for run_child in &run.children {
                match run_child {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Tab(_) => text.push('\t'),
                    _ => {}
                }
            }
        }
        ParagraphChild::Hyperlink(link) => {
            for inner in &link.children {
                push_paragraph_child(text, inner);
            }
        }
        _ => {}
    }
}

/// `.docx` fixtures shared by unit tests.
#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::{Cursor, Read, Write};

    use docx_rs::{Docx, Paragraph, Run};

    const W_NS: &str =
        "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    pub(crate) fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
        let mut docx = Docx::new();
        for p in paragraphs {
            docx = docx.add_paragraph(
                Paragraph::new().add_run(Run::new().add_text(*p)),
            );
        }
        let mut buf = Cursor::new(Vec::new());
        docx.build().pack(&mut buf).unwrap();
        buf.into_inner()
    }

    /// A valid package whose `word/document.xml` is replaced by `body`.
    pub(crate) fn with_document_xml(body: &str) -> Vec<u8> {
        let base = docx_bytes(&["placeholder"]);
        let mut archive = zip::ZipArchive::new(Cursor::new(base)).unwrap();
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).unwrap();
            let entry_name = entry.name().to_string();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            if entry_name == "word/document.xml" {
                data = body.as_bytes().to_vec();
            }
            writer
                .start_file(entry_name, zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(&data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    /// Cuts off mid-run; the parser never returns on it.
    pub(crate) fn truncated_document() -> Vec<u8> {
        with_document_xml(&format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}"><w:body><w:p><w:r><w:t>hi"#
        ))
    }

    /// A table grid width that is not a number; the parser panics on it.
    pub(crate) fn bad_grid_width_document() -> Vec<u8> {
        with_document_xml(&format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}"><w:body><w:tbl><w:tblGrid><w:gridCol w:w="abc"/></w:tblGrid></w:tbl></w:body></w:document>"#
        ))
    }
}
