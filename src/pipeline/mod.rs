//! Pipeline stages for document-to-Markdown conversion.
//!
//! Each submodule implements one step. The dispatcher in
//! [`crate::convert`] picks exactly one extractor per input and then runs
//! the optional captioning stage over whatever landed in the media folder.
//!
//! ## Data Flow
//!
//! ```text
//!            ┌──▶ pandoc ──┐
//! input ─────┤             ├──▶ media dir ──▶ caption ──▶ .md
//! (by ext)   └──▶ pdf ─────┘                  (VLM)
//! ```
//!
//! 1. [`pandoc`] : subprocess converter for every non-PDF format
//! 2. [`pdf`]    : in-process text + image extraction via pdfium;
//!    runs in `spawn_blocking` because pdfium is not async-safe
//! 3. [`caption`]: one VLM call per image, captions appended to the file
//! 4. [`media`]  : image-link discovery and rewriting (absolute paths,
//!    base64 data URIs)
//! 5. [`encode`] : base64 helpers and the MIME table
//! 6. [`postprocess`]: deterministic cleanup of VLM caption text

pub mod caption;
pub mod encode;
pub mod media;
pub mod pandoc;
pub mod pdf;
pub mod postprocess;
