//! Direct PDF extraction: page text plus embedded images via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is not safe to drive from async tasks. The whole extraction
//! (bind, load, walk pages, write files) runs on one blocking-pool thread.
//!
//! ## Output layout
//!
//! For each page, in page order: the page text, then one image link per
//! embedded raster image, each written to the media folder as
//! `page{N}_img{K}.png` where `N` is the 1-based page number and `K` the
//! image's index in the page's object list. Vector drawings are not images
//! to pdfium and are skipped; identical images on different pages are
//! written once per occurrence.

use crate::config::ConversionConfig;
use crate::error::Doc2MdError;
use crate::job::ConversionJob;
use crate::pipeline::media::link_target;
use image::{ColorType, DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const INSTALL_HINT: &str = "Download a pdfium build from \
https://github.com/bblanchon/pdfium-binaries/releases and set PDFIUM_LIB_PATH \
to the library (or pass --pdfium-lib).";

/// What the PDF extractor produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfExtraction {
    pub page_count: usize,
    /// Image files written, in the order their links appear.
    pub images: Vec<PathBuf>,
}

/// One page's raw content as read from pdfium.
pub struct ExtractedPage {
    /// 1-based.
    pub page_num: usize,
    pub text: String,
    pub images: Vec<ExtractedImage>,
}

/// An embedded raster image and its position in the page's object list.
pub struct ExtractedImage {
    pub object_index: usize,
    pub image: DynamicImage,
}

/// Bind to a pdfium library.
///
/// Resolution order: `explicit` → `PDFIUM_LIB_PATH` → working directory →
/// system library path. Both explicit forms accept either the library file
/// or the directory containing it.
pub fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, Doc2MdError> {
    if let Some(path) = explicit {
        return bind_at(path);
    }
    if let Ok(env_path) = std::env::var("PDFIUM_LIB_PATH") {
        if !env_path.is_empty() {
            return bind_at(Path::new(&env_path));
        }
    }

    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| Doc2MdError::ToolMissing {
            tool: "pdfium".to_string(),
            hint: format!("{e:?}\n{INSTALL_HINT}"),
        })
}

fn bind_at(path: &Path) -> Result<Pdfium, Doc2MdError> {
    let lib = if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(path)
    } else {
        path.to_path_buf()
    };
    Pdfium::bind_to_library(&lib)
        .map(Pdfium::new)
        .map_err(|e| Doc2MdError::ToolMissing {
            tool: "pdfium".to_string(),
            hint: format!("Failed to bind '{}': {e:?}\n{INSTALL_HINT}", lib.display()),
        })
}

/// Check that pdfium can be bound, without opening any document.
pub async fn check_pdfium(config: &ConversionConfig) -> Result<(), Doc2MdError> {
    let explicit = config.pdfium_lib_path.clone();
    tokio::task::spawn_blocking(move || bind_pdfium(explicit.as_deref()).map(drop))
        .await
        .map_err(|e| Doc2MdError::Internal(format!("pdfium check panicked: {e}")))?
}

/// Extract `job.input` into `job.markdown_path` and `job.media_dir`.
///
/// The media directory must already exist.
pub async fn extract_pdf(
    job: &ConversionJob,
    config: &ConversionConfig,
) -> Result<PdfExtraction, Doc2MdError> {
    let job = job.clone();
    let explicit = config.pdfium_lib_path.clone();
    let password = config.password.clone();

    tokio::task::spawn_blocking(move || {
        extract_pdf_blocking(&job, explicit.as_deref(), password.as_deref())
    })
    .await
    .map_err(|e| Doc2MdError::Internal(format!("PDF extraction task panicked: {e}")))?
}

fn extract_pdf_blocking(
    job: &ConversionJob,
    explicit_lib: Option<&Path>,
    password: Option<&str>,
) -> Result<PdfExtraction, Doc2MdError> {
    let pdfium = bind_pdfium(explicit_lib)?;
    let pdf_path = job.input.as_path();

    let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                Doc2MdError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                Doc2MdError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            Doc2MdError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut assembler = MarkdownAssembler::new(&job.media_dir, job.media_dir_name());

    for (idx, page) in pages.iter().enumerate() {
        let page_num = idx + 1;

        let text = page
            .text()
            .map_err(|e| Doc2MdError::ImageExtractionFailed {
                page: page_num,
                detail: format!("text: {e:?}"),
            })?
            .all();

        let images = collect_images(
            page_num,
            page.objects().iter().enumerate().filter_map(|(i, object)| {
                object
                    .as_image_object()
                    .map(|image| (i, image.get_raw_image().map_err(|e| format!("{e:?}"))))
            }),
        );

        debug!(
            "Page {}: {} chars, {} images",
            page_num,
            text.len(),
            images.len()
        );
        assembler.push_page(ExtractedPage {
            page_num,
            text,
            images,
        })?;
    }

    assembler.finish(&job.markdown_path)
}

/// Keep the image objects pdfium could decode.
///
/// Masks and unsupported filters have no bitmap; those objects are skipped
/// with a warning and get neither a file nor a link.
fn collect_images(
    page_num: usize,
    objects: impl Iterator<Item = (usize, Result<DynamicImage, String>)>,
) -> Vec<ExtractedImage> {
    objects
        .filter_map(|(object_index, decoded)| match decoded {
            Ok(image) => Some(ExtractedImage {
                object_index,
                image,
            }),
            Err(e) => {
                warn!(
                    "Page {}: skipping image object {}: {}",
                    page_num, object_index, e
                );
                None
            }
        })
        .collect()
}

/// Accumulates page Markdown and writes images as pages arrive, so only one
/// page's images are held in memory at a time.
pub struct MarkdownAssembler {
    media_dir: PathBuf,
    link_prefix: String,
    markdown: String,
    images: Vec<PathBuf>,
    pages: usize,
}

impl MarkdownAssembler {
    /// `link_prefix` is the media folder as seen from the Markdown file.
    pub fn new(media_dir: &Path, link_prefix: impl Into<String>) -> Self {
        Self {
            media_dir: media_dir.to_path_buf(),
            link_prefix: link_prefix.into(),
            markdown: String::new(),
            images: Vec::new(),
            pages: 0,
        }
    }

    /// Append a page's text, then write each image and append its link.
    ///
    /// Blocks are separated by one blank line; a page without text adds
    /// only its image links.
    pub fn push_page(&mut self, page: ExtractedPage) -> Result<(), Doc2MdError> {
        self.pages += 1;

        // pdfium separates lines with CRLF.
        let text = page.text.replace("\r\n", "\n").replace('\r', "\n");
        let text = text.trim_end();
        if !text.trim().is_empty() {
            self.push_block(text);
        }

        for extracted in page.images {
            let name = format!("page{}_img{}.png", page.page_num, extracted.object_index);
            let path = self.media_dir.join(&name);
            save_png(extracted.image, &path)?;

            let link = format!(
                "![]({})",
                link_target(&format!("{}/{}", self.link_prefix, name))
            );
            self.push_block(&link);
            self.images.push(path);
        }
        Ok(())
    }

    fn push_block(&mut self, block: &str) {
        if !self.markdown.is_empty() {
            self.markdown.push_str("\n\n");
        }
        self.markdown.push_str(block);
    }

    /// Number of image links appended so far.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn markdown(&self) -> &str {
        &self.markdown
    }

    /// Write the Markdown file.
    pub fn finish(mut self, markdown_path: &Path) -> Result<PdfExtraction, Doc2MdError> {
        if !self.markdown.ends_with('\n') {
            self.markdown.push('\n');
        }
        std::fs::write(markdown_path, &self.markdown).map_err(|e| {
            Doc2MdError::OutputWriteFailed {
                path: markdown_path.to_path_buf(),
                source: e,
            }
        })?;
        info!(
            "Wrote {} ({} pages, {} images)",
            markdown_path.display(),
            self.pages,
            self.images.len()
        );
        Ok(PdfExtraction {
            page_count: self.pages,
            images: self.images,
        })
    }
}

/// PNG has no float pixel formats; everything else encodes as-is.
fn save_png(image: DynamicImage, path: &Path) -> Result<(), Doc2MdError> {
    let image = match image.color() {
        ColorType::Rgb32F | ColorType::Rgba32F => DynamicImage::ImageRgba8(image.to_rgba8()),
        _ => image,
    };
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| Doc2MdError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: std::io::Error::other(e),
        })
}
