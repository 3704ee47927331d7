//! Source-document text extraction seam.
//!
//! [`PlainTextExtractor`] reads UTF-8 sources and refuses known binary formats. With the `pdf`
//! feature, `PdfTextExtractor` converts PDFs through poppler's `pdftotext`.
//! [`DocumentExtractor`] picks one of them from the file extension.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Extensions of binary formats that can never be read as plain text.
const BINARY_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "odt", "epub", "rtf"];

/// Errors raised while turning a source file into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid UTF-8 text.
    #[error("file is not valid UTF-8")]
    NotUtf8,
    /// The extractor does not understand this kind of file.
    #[error("unsupported document type: {0}")]
    Unsupported(String),
    /// The external converter failed or could not be started.
    #[cfg(feature = "pdf")]
    #[error("{program} failed: {message}")]
    Converter {
        /// Converter binary that was invoked.
        program: String,
        /// Converter stderr or spawn error.
        message: String,
    },
}

/// Turns one source file into its raw text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the full text of the document at `path`.
    async fn extract_text(&self, path: &Path) -> Result<String, ExtractionError>;
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Reads UTF-8 text files verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        let binary = extension_of(path).filter(|ext| BINARY_EXTENSIONS.contains(&ext.as_str()));
        if let Some(ext) = binary {
            return Err(ExtractionError::Unsupported(ext));
        }
        let bytes = tokio::fs::read(path).await?;
        String::from_utf8(bytes).map_err(|_| ExtractionError::NotUtf8)
    }
}

/// Converts PDFs to text with an external `pdftotext` binary.
#[cfg(feature = "pdf")]
#[derive(Debug, Clone)]
pub struct PdfTextExtractor {
    program: String,
}

#[cfg(feature = "pdf")]
impl Default for PdfTextExtractor {
    fn default() -> Self {
        Self::with_program("pdftotext")
    }
}

#[cfg(feature = "pdf")]
impl PdfTextExtractor {
    /// Use `program` instead of `pdftotext` found on `PATH`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[cfg(feature = "pdf")]
#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        let converter_error = |message: String| ExtractionError::Converter {
            program: self.program.clone(),
            message,
        };

        let output = tokio::process::Command::new(&self.program)
            .arg("-layout")
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .output()
            .await
            .map_err(|error| converter_error(format!("{error} (is poppler installed?)")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(
                path = %path.display(),
                status = %output.status,
                %stderr,
                "PDF conversion failed"
            );
            return Err(converter_error(stderr));
        }

        let text = String::from_utf8(output.stdout).map_err(|_| ExtractionError::NotUtf8)?;
        tracing::debug!(
            path = %path.display(),
            characters = text.chars().count(),
            "Extracted PDF text"
        );
        Ok(text)
    }
}

/// Routes each file to the extractor for its extension.
///
/// PDFs go to `PdfTextExtractor` when the `pdf` feature is enabled; everything else, and PDFs
/// without the feature, goes to [`PlainTextExtractor`].
#[derive(Debug, Clone, Default)]
pub struct DocumentExtractor {
    #[cfg(feature = "pdf")]
    pdf: PdfTextExtractor,
}

#[async_trait]
impl TextExtractor for DocumentExtractor {
    async fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        #[cfg(feature = "pdf")]
        if extension_of(path).as_deref() == Some("pdf") {
            return self.pdf.extract_text(path).await;
        }
        PlainTextExtractor.extract_text(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn plain_text_extractor_reads_utf8_files() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "Grüße aus Paris").expect("write");

        let text = PlainTextExtractor.extract_text(&path).await.expect("text");
        assert_eq!(text, "Grüße aus Paris");
    }

    #[tokio::test]
    async fn plain_text_extractor_rejects_binary_content() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("doc.bin");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x9f]).expect("write");

        let error = PlainTextExtractor.extract_text(&path).await.unwrap_err();
        assert!(matches!(error, ExtractionError::NotUtf8));
    }

    #[tokio::test]
    async fn plain_text_extractor_refuses_binary_document_formats() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("Report.PDF");
        std::fs::write(&path, "%PDF-1.7 looks like text but is not").expect("write");

        let error = PlainTextExtractor.extract_text(&path).await.unwrap_err();
        assert!(matches!(error, ExtractionError::Unsupported(ref ext) if ext == "pdf"));
    }

    #[tokio::test]
    async fn plain_text_extractor_surfaces_missing_files() {
        let dir = TempDir::new().expect("temp dir");
        let error = PlainTextExtractor
            .extract_text(&dir.path().join("missing.txt"))
            .await
            .unwrap_err();
        assert!(matches!(error, ExtractionError::Io(_)));
    }

    #[tokio::test]
    async fn document_extractor_reads_text_formats_directly() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# Notes\n\nParis is in France.").expect("write");

        let text = DocumentExtractor::default()
            .extract_text(&path)
            .await
            .expect("text");
        assert_eq!(text, "# Notes\n\nParis is in France.");
    }

    #[cfg(not(feature = "pdf"))]
    #[tokio::test]
    async fn document_extractor_without_pdf_support_refuses_pdfs() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("paper.pdf");
        std::fs::write(&path, "%PDF-1.7").expect("write");

        let error = DocumentExtractor::default()
            .extract_text(&path)
            .await
            .unwrap_err();
        assert!(matches!(error, ExtractionError::Unsupported(_)));
    }

    #[cfg(all(feature = "pdf", unix))]
    #[tokio::test]
    async fn pdf_extractor_returns_converter_stdout() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("paper.pdf");
        std::fs::write(&path, "%PDF-1.7").expect("write");

        // `echo` stands in for the converter and prints the arguments it was given.
        let text = PdfTextExtractor::with_program("echo")
            .extract_text(&path)
            .await
            .expect("text");
        assert_eq!(
            text.trim_end(),
            format!("-layout -enc UTF-8 {} -", path.display())
        );
    }

    #[cfg(all(feature = "pdf", unix))]
    #[tokio::test]
    async fn pdf_extractor_reports_failing_or_missing_converter() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("paper.pdf");
        std::fs::write(&path, "%PDF-1.7").expect("write");

        let error = PdfTextExtractor::with_program("false")
            .extract_text(&path)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            ExtractionError::Converter { ref program, .. } if program == "false"
        ));

        let error = PdfTextExtractor::with_program("rustydocs-no-such-converter")
            .extract_text(&path)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            ExtractionError::Converter { ref message, .. } if message.contains("poppler")
        ));
    }
}
