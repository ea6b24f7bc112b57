//! Document text extraction
//!
//! Turns uploaded bytes into plain text by file type, then hands the text
//! to the chunker.

mod docx;
mod pdf;
mod text;

pub use docx::*;
pub use pdf::*;
pub use text::*;

use crate::chunk::{chunk_document, Chunk, TokenChunker};
use crate::error::{Error, Result};
use std::path::Path;
use tracing::debug;

/// Document formats we can extract text from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Txt,
}

impl DocumentKind {
    /// Map a lower-case extension (dot included) to a kind
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            ".pdf" if cfg!(feature = "pdf") => Some(DocumentKind::Pdf),
            ".docx" => Some(DocumentKind::Docx),
            ".txt" => Some(DocumentKind::Txt),
            _ => None,
        }
    }

    /// Detect the kind of `filename`, restricted to the `allowed` extensions
    pub fn from_filename(filename: &str, allowed: &[String]) -> Result<Self> {
        let ext = file_extension(filename);
        let unsupported = || Error::UnsupportedFileType {
            extension: if ext.is_empty() {
                "(none)".to_string()
            } else {
                ext.clone()
            },
            allowed: allowed.join(", "),
        };

        if !allowed.iter().any(|a| a == &ext) {
            return Err(unsupported());
        }
        Self::from_extension(&ext).ok_or_else(unsupported)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Docx => "docx",
            DocumentKind::Txt => "txt",
        }
    }
}

/// Lower-case extension of `filename` including the dot, or "" if there is none
pub fn file_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

/// Extract plain text from document bytes
pub fn extract_text(bytes: &[u8], kind: DocumentKind) -> Result<String> {
    match kind {
        DocumentKind::Pdf => extract_pdf(bytes),
        DocumentKind::Docx => extract_docx(bytes),
        DocumentKind::Txt => Ok(decode_text(bytes)),
    }
}

/// Extract and chunk a document
pub fn process_document(
    bytes: &[u8],
    filename: &str,
    kind: DocumentKind,
    chunker: &TokenChunker,
) -> Result<Vec<Chunk>> {
    let text = extract_text(bytes, kind)?;
    debug!(
        filename,
        kind = kind.as_str(),
        chars = text.chars().count(),
        "Extracted document text"
    );
    chunk_document(&text, filename, chunker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_allowed_extensions;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("report.PDF"), ".pdf");
        assert_eq!(file_extension("archive.tar.gz"), ".gz");
        assert_eq!(file_extension("README"), "");
        assert_eq!(file_extension(".bashrc"), "");
    }

    #[test]
    fn test_from_filename() {
        let allowed = default_allowed_extensions();
        assert_eq!(
            DocumentKind::from_filename("Notes.TXT", &allowed).unwrap(),
            DocumentKind::Txt
        );
        assert_eq!(
            DocumentKind::from_filename("contract.docx", &allowed).unwrap(),
            DocumentKind::Docx
        );

        let err = DocumentKind::from_filename("malware.exe", &allowed).unwrap_err();
        assert!(err.to_string().contains(".exe"));
        assert!(err.to_string().contains(".pdf, .docx, .txt"));

        assert!(DocumentKind::from_filename("README", &allowed).is_err());
    }

    #[test]
    fn test_allowed_list_is_enforced() {
        let only_txt = vec![".txt".to_string()];
        assert!(DocumentKind::from_filename("a.docx", &only_txt).is_err());
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_pdf_kind() {
        assert_eq!(
            DocumentKind::from_filename("a.pdf", &default_allowed_extensions()).unwrap(),
            DocumentKind::Pdf
        );
    }

    #[test]
    fn test_extract_docx_via_kind() {
        let bytes = docx::tests::docx_bytes("<w:p><w:r><w:t>hello</w:t></w:r></w:p>");
        assert_eq!(extract_text(&bytes, DocumentKind::Docx).unwrap(), "hello");
    }
}
