//! # edgequake-doc2md
//!
//! Convert documents (PDF, DOCX, ODT, EPUB, HTML, …) to Markdown, extracting
//! embedded images into a media folder next to the Markdown file, and
//! optionally captioning those images with a Vision Language Model (VLM).
//!
//! ## Pipeline Overview
//!
//! ```text
//! document
//!  │
//!  ├─ 1. Validate  input exists, required tool is installed
//!  ├─ 2. Dispatch  .pdf → pdfium text + images, anything else → pandoc
//!  ├─ 3. Media     images land in <stem>_media/, linked relatively
//!  ├─ 4. Caption   (optional) one VLM call per image, captions appended
//!  └─ 5. Output    <stem>.md + stats; inline images as data URIs on demand
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_doc2md::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let output = convert("manual.docx", "converted_documents", &config).await?;
//!     println!("{}", output.markdown_path.display());
//!     eprintln!("{} images in {}", output.images.len(), output.media_dir.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `doc2md` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `server` | on      | Web form (`axum`), also pulled in by `cli` |
//!
//! ## External tools
//!
//! | Input | Needs |
//! |-------|-------|
//! | `.pdf` | a pdfium shared library (`PDFIUM_LIB_PATH`, `./`, or system) |
//! | anything else | `pandoc` on `PATH` (or `ConversionConfig::pandoc_path`) |
//! | `--caption` | an API key for a vision model (`OPENAI_API_KEY`, …) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod job;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::{check_tool, convert, convert_sync};
pub use error::{CaptionError, Doc2MdError};
pub use job::{ConversionJob, Strategy};
pub use output::{CaptionResult, ConversionOutput, ConversionStats};
pub use pipeline::caption::{caption_media, ImageDescriber, VlmDescriber};
pub use pipeline::media::{absolutize_image_links, inline_images, inline_images_in_file};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
