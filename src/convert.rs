//! Conversion entry points: validate, dispatch by extension, caption.
//!
//! The order matters for the "nothing written on failure" guarantee: the
//! input and the required tool are both checked before the output folders
//! are created, so a missing file or a missing pandoc leaves the output
//! directory untouched.

use crate::config::ConversionConfig;
use crate::error::Doc2MdError;
use crate::job::{ConversionJob, Strategy};
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::caption::{caption_media, VlmDescriber};
use crate::pipeline::media::list_media_images;
use crate::pipeline::{pandoc, pdf};
use crate::prompts::DEFAULT_CAPTION_PROMPT;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Convert a document to Markdown under `output_dir`.
///
/// Writes `<output_dir>/<stem>.md` and `<output_dir>/<stem>_media/`.
/// PDFs are extracted with pdfium; everything else goes through pandoc.
/// With `config.caption_images`, every PNG/JPEG in the media folder is
/// described by the configured VLM and the captions are appended.
///
/// # Errors
/// - `FileNotFound` / `PermissionDenied`: input unusable, nothing written
/// - `ToolMissing`: pandoc or pdfium unavailable, nothing written
/// - `ConversionFailed`: pandoc exited non-zero (carries its stderr)
/// - `ProviderNotConfigured`: captioning requested without a usable model
pub async fn convert(
    input: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Doc2MdError> {
    let total_start = Instant::now();
    let job = ConversionJob::new(input.as_ref(), output_dir.as_ref());
    info!(
        "Starting conversion: {} ({})",
        job.input.display(),
        job.strategy
    );

    // ── Step 1: Validate input ───────────────────────────────────────────
    validate_input(&job.input)?;

    // ── Step 2: Check the required tool ──────────────────────────────────
    check_tool(job.strategy, config).await?;

    // Captioning failures to resolve a provider should also stop us before
    // anything is written.
    let describer = if config.caption_images {
        Some(VlmDescriber::from_config(config)?)
    } else {
        None
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(&job.input.to_string_lossy(), job.strategy);
    }

    // ── Step 3: Create output folders ────────────────────────────────────
    create_dir(&job.output_dir)?;
    create_dir(&job.media_dir)?;

    // ── Step 4: Dispatch ─────────────────────────────────────────────────
    let convert_start = Instant::now();
    let pages = match job.strategy {
        Strategy::Pandoc => {
            pandoc::convert_with_pandoc(&job, config).await?;
            None
        }
        Strategy::PdfExtract => Some(pdf::extract_pdf(&job, config).await?.page_count),
    };
    let convert_duration_ms = convert_start.elapsed().as_millis() as u64;

    let images = list_media_images(&job.media_dir, None);
    info!(
        "Converted {} → {} ({} images) in {}ms",
        job.input.display(),
        job.markdown_path.display(),
        images.len(),
        convert_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(images.len());
    }

    // ── Step 5: Caption ──────────────────────────────────────────────────
    let caption_start = Instant::now();
    let captions = match describer {
        Some(ref describer) => {
            let prompt = config
                .caption_prompt
                .as_deref()
                .unwrap_or(DEFAULT_CAPTION_PROMPT);
            caption_media(
                &job.markdown_path,
                &job.media_dir,
                describer,
                prompt,
                config.progress_callback.as_ref(),
            )
            .await?
        }
        None => Vec::new(),
    };
    let caption_duration_ms = caption_start.elapsed().as_millis() as u64;

    // ── Step 6: Read back ────────────────────────────────────────────────
    let markdown = tokio::fs::read_to_string(&job.markdown_path)
        .await
        .map_err(|e| Doc2MdError::OutputReadFailed {
            path: job.markdown_path.clone(),
            source: e,
        })?;

    let captioned = captions.iter().filter(|c| c.is_ok()).count();
    let stats = ConversionStats {
        pages,
        images_extracted: images.len(),
        images_captioned: captioned,
        caption_failures: captions.len() - captioned,
        total_input_tokens: captions.iter().map(|c| c.input_tokens as u64).sum(),
        total_output_tokens: captions.iter().map(|c| c.output_tokens as u64).sum(),
        convert_duration_ms,
        caption_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(images.len(), captioned);
    }
    debug!("Conversion stats: {:?}", stats);

    Ok(ConversionOutput {
        markdown,
        markdown_path: job.markdown_path,
        media_dir: job.media_dir,
        strategy: job.strategy,
        images,
        captions,
        stats,
    })
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Doc2MdError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Doc2MdError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input, output_dir, config))
}

/// Check the external tool a strategy needs, without converting anything.
pub async fn check_tool(strategy: Strategy, config: &ConversionConfig) -> Result<(), Doc2MdError> {
    match strategy {
        Strategy::Pandoc => pandoc::check_pandoc(&config.pandoc_path).await.map(drop),
        Strategy::PdfExtract => pdf::check_pdfium(config).await,
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// The input must exist, be a regular file, and be readable.
fn validate_input(path: &Path) -> Result<(), Doc2MdError> {
    if !path.is_file() {
        return Err(Doc2MdError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    match std::fs::File::open(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(Doc2MdError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => Err(Doc2MdError::FileNotFound {
            path: path.to_path_buf(),
        }),
    }
}

fn create_dir(path: &Path) -> Result<(), Doc2MdError> {
    std::fs::create_dir_all(path).map_err(|e| Doc2MdError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}
