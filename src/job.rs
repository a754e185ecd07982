//! The per-request conversion job: where the input is and where output goes.
//!
//! A job is pure path arithmetic. It is built once per conversion, never
//! persisted, and every later stage takes its paths from here so the naming
//! rules live in one place:
//!
//! ```text
//! <output_dir>/<stem>.md        Markdown
//! <output_dir>/<stem>_media/    extracted images (sibling of the .md)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// How a given input file is turned into Markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Shell out to pandoc (DOCX, ODT, EPUB, HTML, …).
    Pandoc,
    /// Read text and embedded images directly with pdfium.
    PdfExtract,
}

impl Strategy {
    /// Pick the strategy from the file extension. Only `.pdf`
    /// (any case) goes to pdfium; everything else goes to pandoc.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("pdf") => Strategy::PdfExtract,
            _ => Strategy::Pandoc,
        }
    }

    /// Name of the external tool the strategy depends on.
    pub fn tool(&self) -> &'static str {
        match self {
            Strategy::Pandoc => "pandoc",
            Strategy::PdfExtract => "pdfium",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Pandoc => "pandoc",
            Strategy::PdfExtract => "pdf",
        })
    }
}

/// Paths for a single conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// Input file stem; names both outputs.
    pub base_name: String,
    pub markdown_path: PathBuf,
    pub media_dir: PathBuf,
    pub strategy: Strategy,
}

impl ConversionJob {
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        let input = input.into();
        let output_dir = output_dir.into();
        let base_name = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "document".to_string());

        let markdown_path = output_dir.join(format!("{base_name}.md"));
        let media_dir = output_dir.join(media_dir_name(&base_name));
        let strategy = Strategy::for_path(&input);

        Self {
            input,
            output_dir,
            base_name,
            markdown_path,
            media_dir,
            strategy,
        }
    }

    /// The media directory's name relative to the Markdown file.
    ///
    /// Image links written by both converters start with this.
    pub fn media_dir_name(&self) -> String {
        media_dir_name(&self.base_name)
    }
}

fn media_dir_name(base_name: &str) -> String {
    format!("{base_name}_media")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_by_extension() {
        assert_eq!(Strategy::for_path(Path::new("a.pdf")), Strategy::PdfExtract);
        assert_eq!(Strategy::for_path(Path::new("A.PDF")), Strategy::PdfExtract);
        assert_eq!(Strategy::for_path(Path::new("a.docx")), Strategy::Pandoc);
        assert_eq!(Strategy::for_path(Path::new("a.pdf.docx")), Strategy::Pandoc);
        assert_eq!(Strategy::for_path(Path::new("README")), Strategy::Pandoc);
    }

    #[test]
    fn outputs_named_from_input_stem() {
        let job = ConversionJob::new("/in/Quarterly Report.docx", "/out");
        assert_eq!(job.base_name, "Quarterly Report");
        assert_eq!(job.markdown_path, PathBuf::from("/out/Quarterly Report.md"));
        assert_eq!(job.media_dir, PathBuf::from("/out/Quarterly Report_media"));
        assert_eq!(job.strategy, Strategy::Pandoc);
    }

    #[test]
    fn media_dir_is_sibling_of_markdown() {
        let job = ConversionJob::new("slides.pdf", "converted");
        assert_eq!(job.media_dir.parent(), job.markdown_path.parent());
        assert_eq!(job.media_dir_name(), "slides_media");
        assert_eq!(job.strategy, Strategy::PdfExtract);
    }

    #[test]
    fn strategy_display_and_tool() {
        assert_eq!(Strategy::Pandoc.to_string(), "pandoc");
        assert_eq!(Strategy::PdfExtract.to_string(), "pdf");
        assert_eq!(Strategy::PdfExtract.tool(), "pdfium");
    }
}
