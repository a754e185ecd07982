//! Error types for the edgequake-doc2md library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Doc2MdError`]: **Fatal**: the conversion cannot proceed at all
//!   (missing input, missing tool, the converter exited non-zero). Returned
//!   as `Err(Doc2MdError)` from the top-level `convert*` functions.
//!
//! * [`CaptionError`]: **Non-fatal**: a single image could not be captioned
//!   but the Markdown and every other caption are fine. Stored inside
//!   [`crate::output::CaptionResult`] so callers can see which images were
//!   skipped.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-doc2md library.
#[derive(Debug, Error)]
pub enum Doc2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Tool errors ───────────────────────────────────────────────────────
    /// The external converter needed for this file type is not available.
    #[error("Required tool '{tool}' is not available.\n{hint}")]
    ToolMissing { tool: String, hint: String },

    /// The external converter ran but reported failure.
    ///
    /// `message` is the tool's error stream, trimmed.
    #[error("{tool} conversion failed: {message}")]
    ConversionFailed { tool: String, message: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium could not read a page's text or an embedded image.
    #[error("Extraction failed on page {page}: {detail}")]
    ImageExtractionFailed { page: usize, detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file or directory.
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not read back a file the conversion produced.
    #[error("Failed to read '{path}': {source}")]
    OutputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Unexpected error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image during captioning.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum CaptionError {
    /// The image file could not be read from the media directory.
    #[error("{image}: could not read image: {detail}")]
    ReadFailed { image: String, detail: String },

    /// The VLM call failed.
    #[error("{image}: caption request failed: {detail}")]
    LlmFailed { image: String, detail: String },

    /// The VLM answered with nothing usable.
    #[error("{image}: model returned an empty description")]
    EmptyResponse { image: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_missing_display() {
        let e = Doc2MdError::ToolMissing {
            tool: "pandoc".into(),
            hint: "Install from https://pandoc.org/installing.html".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("pandoc"), "got: {msg}");
        assert!(msg.contains("pandoc.org"), "got: {msg}");
    }

    #[test]
    fn conversion_failed_carries_tool_output() {
        let e = Doc2MdError::ConversionFailed {
            tool: "pandoc".into(),
            message: "Unknown input format docz".into(),
        };
        assert!(e.to_string().contains("Unknown input format docz"));
    }

    #[test]
    fn file_not_found_names_the_file() {
        let e = Doc2MdError::FileNotFound {
            path: PathBuf::from("/nope/report.docx"),
        };
        assert!(e.to_string().contains("report.docx"));
    }

    #[test]
    fn internal_reads_as_unexpected() {
        let e = Doc2MdError::Internal("boom".into());
        assert_eq!(e.to_string(), "Unexpected error: boom");
    }

    #[test]
    fn caption_error_names_the_image() {
        let e = CaptionError::LlmFailed {
            image: "page1_img0.png".into(),
            detail: "401".into(),
        };
        assert!(e.to_string().starts_with("page1_img0.png"));
    }
}
