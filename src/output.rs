//! Result types returned by [`crate::convert::convert`].

use crate::error::CaptionError;
use crate::job::Strategy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything a finished conversion produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// The Markdown exactly as written to `markdown_path` (captions included).
    pub markdown: String,
    pub markdown_path: PathBuf,
    pub media_dir: PathBuf,
    pub strategy: Strategy,
    /// Image files found in `media_dir` after conversion, sorted.
    pub images: Vec<PathBuf>,
    /// One entry per captioned image; empty when captioning is off.
    pub captions: Vec<CaptionResult>,
    pub stats: ConversionStats,
}

/// Counters and timings for a conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Page count, known only for PDFs.
    pub pages: Option<usize>,
    pub images_extracted: usize,
    pub images_captioned: usize,
    pub caption_failures: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub convert_duration_ms: u64,
    pub caption_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// The outcome of captioning one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionResult {
    pub image: PathBuf,
    /// File name as it appears in the caption line.
    pub file_name: String,
    /// Cleaned caption; empty when `error` is set.
    pub description: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    pub error: Option<CaptionError>,
}

impl CaptionResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
