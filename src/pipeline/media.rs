//! Image references: find `![alt](target)` links and rewrite their targets.
//!
//! Both converters write links relative to the Markdown file
//! (`report_media/media/image1.png`, `slides_media/page2_img0.png`). That is
//! right for the file on disk, but a caller rendering the text somewhere
//! else needs either absolute paths or the bytes themselves. Rewriting only
//! touches the target; alt text, titles and pandoc attribute blocks such as
//! `{width="3in"}` survive unchanged.

use crate::error::Doc2MdError;
use crate::pipeline::encode::{data_uri, mime_for_path};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

static RE_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"!\[(?P<alt>[^\]]*)\]\((?P<target><[^>\n]*>|[^)\s]+)(?P<title>\s+"[^"\n]*")?\)"#)
        .unwrap()
});

// A URI scheme needs at least two characters so `C:\img.png` stays a path.
static RE_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]+:").unwrap());

/// A Markdown image link found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub alt: String,
    /// Link target with any `<…>` wrapper removed.
    pub target: String,
    /// Title including its leading whitespace and quotes, if present.
    pub title: Option<String>,
    /// Byte range of the whole `![…](…)` in the source text.
    pub span: Range<usize>,
}

impl ImageRef {
    fn from_captures(caps: &Captures<'_>) -> Self {
        let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
        let raw = &caps["target"];
        let target = raw
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .unwrap_or(raw)
            .to_string();
        Self {
            alt: caps["alt"].to_string(),
            target,
            title: caps.name("title").map(|m| m.as_str().to_string()),
            span: whole,
        }
    }

    /// `true` for file-system paths, `false` for URLs and `data:` URIs.
    pub fn is_local(&self) -> bool {
        !self.target.is_empty()
            && !self.target.starts_with("//")
            && !self.target.starts_with('#')
            && !RE_SCHEME.is_match(&self.target)
    }

    /// Resolve a local target against `base_dir`.
    ///
    /// Percent-encoded targets (`my%20doc_media/a.png`) are decoded when the
    /// literal path does not exist.
    pub fn resolve(&self, base_dir: &Path) -> Option<PathBuf> {
        if !self.is_local() {
            return None;
        }
        let join = |target: &str| {
            let path = Path::new(target);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                base_dir.join(path)
            }
        };
        let literal = join(&self.target);
        if literal.exists() || !self.target.contains('%') {
            return Some(literal);
        }
        match percent_decode(&self.target) {
            Some(decoded) if join(&decoded).exists() => Some(join(&decoded)),
            _ => Some(literal),
        }
    }

    fn render(&self, target: &str) -> String {
        format!(
            "![{}]({}{})",
            self.alt,
            link_target(target),
            self.title.as_deref().unwrap_or("")
        )
    }
}

/// Format a path as a Markdown link destination.
///
/// Targets with whitespace or parentheses are wrapped in `<…>`, the only
/// CommonMark form that accepts them verbatim.
pub fn link_target(target: &str) -> String {
    if target.contains(|c: char| c.is_whitespace() || c == '(' || c == ')') {
        format!("<{target}>")
    } else {
        target.to_string()
    }
}

/// Decode `%XX` escapes. `None` when an escape is malformed or the result is
/// not UTF-8.
fn percent_decode(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s
                .get(i + 1..i + 3)
                .filter(|h| h.bytes().all(|b| b.is_ascii_hexdigit()))?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Every image link in `markdown`, in document order.
pub fn find_image_refs(markdown: &str) -> Vec<ImageRef> {
    RE_IMAGE
        .captures_iter(markdown)
        .map(|c| ImageRef::from_captures(&c))
        .collect()
}

/// Replace link targets. `rewrite` returns `None` to keep a link as-is.
fn rewrite_targets(markdown: &str, mut rewrite: impl FnMut(&ImageRef) -> Option<String>) -> String {
    RE_IMAGE
        .replace_all(markdown, |caps: &Captures<'_>| {
            let image = ImageRef::from_captures(caps);
            match rewrite(&image) {
                Some(target) => image.render(&target),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Rewrite relative image links to absolute paths under `base_dir`.
///
/// URLs, `data:` URIs and already-absolute paths are kept. `base_dir` is
/// joined as given, so pass an absolute directory to get absolute links.
pub fn absolutize_image_links(markdown: &str, base_dir: &Path) -> String {
    rewrite_targets(markdown, |image| {
        if !image.is_local() || Path::new(&image.target).is_absolute() {
            return None;
        }
        image
            .resolve(base_dir)
            .map(|p| p.to_string_lossy().into_owned())
    })
}

/// Replace local image links with base64 `data:` URIs.
///
/// A link is inlined only when its file exists and has a known image MIME
/// type; everything else is left untouched so the document never loses a
/// reference.
pub fn inline_images(markdown: &str, base_dir: &Path) -> String {
    rewrite_targets(markdown, |image| {
        let path = image.resolve(base_dir)?;
        let mime = mime_for_path(&path)?;
        if !path.is_file() {
            debug!("Not inlining missing image: {}", path.display());
            return None;
        }
        match std::fs::read(&path) {
            Ok(bytes) => Some(data_uri(&bytes, mime)),
            Err(e) => {
                warn!("Could not read {} for inlining: {}", path.display(), e);
                None
            }
        }
    })
}

/// Read a Markdown file and inline its images relative to the file's folder.
pub fn inline_images_in_file(markdown_path: &Path) -> Result<String, Doc2MdError> {
    let markdown =
        std::fs::read_to_string(markdown_path).map_err(|e| Doc2MdError::OutputReadFailed {
            path: markdown_path.to_path_buf(),
            source: e,
        })?;
    let base_dir = markdown_path.parent().unwrap_or_else(|| Path::new("."));
    Ok(inline_images(&markdown, base_dir))
}

/// Image files under `dir`, recursively, sorted by path.
///
/// With `extensions = None` every file with a known image MIME type is
/// returned; otherwise only the listed extensions (case-insensitive).
/// A missing directory yields an empty list.
pub fn list_media_images(dir: &Path, extensions: Option<&[&str]>) -> Vec<PathBuf> {
    let mut images: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| match extensions {
            None => mime_for_path(path).is_some(),
            Some(exts) => path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| exts.iter().any(|x| x.eq_ignore_ascii_case(e))),
        })
        .collect();
    images.sort();
    images
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_links_in_order() {
        let md = "intro ![a](x/1.png) mid ![](<dir with space/2.jpg> \"Fig 2\") end";
        let refs = find_image_refs(md);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].alt, "a");
        assert_eq!(refs[0].target, "x/1.png");
        assert_eq!(&md[refs[0].span.clone()], "![a](x/1.png)");
        assert_eq!(refs[1].target, "dir with space/2.jpg");
        assert_eq!(refs[1].title.as_deref(), Some(" \"Fig 2\""));
    }

    #[test]
    fn ignores_plain_links() {
        assert!(find_image_refs("[not an image](a.png)").is_empty());
    }

    #[test]
    fn locality() {
        let refs = find_image_refs(
            "![](a.png) ![](https://x.io/a.png) ![](data:image/png;base64,AA==) ![](/abs/a.png)",
        );
        let local: Vec<bool> = refs.iter().map(|r| r.is_local()).collect();
        assert_eq!(local, vec![true, false, false, true]);
    }

    #[test]
    fn absolutize_rewrites_only_relative_paths() {
        let md = "![fig](doc_media/page1_img0.png){width=50%}\n![](https://x.io/a.png)\n![](/already/abs.png)";
        let out = absolutize_image_links(md, Path::new("/out"));
        assert_eq!(
            out,
            "![fig](/out/doc_media/page1_img0.png){width=50%}\n![](https://x.io/a.png)\n![](/already/abs.png)"
        );
    }

    #[test]
    fn absolutize_wraps_paths_with_spaces() {
        let out = absolutize_image_links("![](a.png)", Path::new("/my docs"));
        assert_eq!(out, "![](</my docs/a.png>)");
    }

    #[test]
    fn inline_replaces_existing_image_with_data_uri() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("doc_media");
        std::fs::create_dir_all(&media).unwrap();
        std::fs::write(media.join("shot.jpg"), b"\xFF\xD8\xFF").unwrap();

        let out = inline_images("see ![ui](doc_media/shot.jpg \"t\")", dir.path());
        assert_eq!(out, "see ![ui](data:image/jpeg;base64,/9j/ \"t\")");
    }

    #[test]
    fn link_target_wraps_spaces_and_parentheses() {
        assert_eq!(link_target("deck_media/a.png"), "deck_media/a.png");
        assert_eq!(link_target("My Report_media/a.png"), "<My Report_media/a.png>");
        assert_eq!(link_target("report (1)_media/a.png"), "<report (1)_media/a.png>");

        let refs = find_image_refs("![](<report (1)_media/a.png>)");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].target, "report (1)_media/a.png");
    }

    #[test]
    fn inline_decodes_percent_encoded_targets() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("setup guide_media/media");
        std::fs::create_dir_all(&media).unwrap();
        std::fs::write(media.join("image1.png"), b"PNG").unwrap();

        let out = inline_images("![](setup%20guide_media/media/image1.png)", dir.path());
        assert_eq!(out, "![](data:image/png;base64,UE5H)");
    }

    #[test]
    fn percent_decode_rejects_malformed_escapes() {
        assert_eq!(percent_decode("a%20b").as_deref(), Some("a b"));
        assert_eq!(percent_decode("100%"), None);
        assert_eq!(percent_decode("%zz"), None);
        assert_eq!(percent_decode("%+1"), None);
    }

    #[test]
    fn inline_leaves_missing_and_remote_images() {
        let dir = tempfile::tempdir().unwrap();
        let md = "![](gone.png) ![](https://x.io/a.png) ![](notes.txt)";
        assert_eq!(inline_images(md, dir.path()), md);
    }

    #[test]
    fn inline_images_in_file_uses_markdown_parent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("r_media")).unwrap();
        std::fs::write(dir.path().join("r_media/a.png"), b"png").unwrap();
        let md_path = dir.path().join("r.md");
        std::fs::write(&md_path, "![](r_media/a.png)").unwrap();

        let out = inline_images_in_file(&md_path).unwrap();
        assert!(out.starts_with("![](data:image/png;base64,"), "got: {out}");
    }

    #[test]
    fn list_media_images_is_recursive_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("media");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("image2.PNG"), b"").unwrap();
        std::fs::write(dir.path().join("b.jpeg"), b"").unwrap();
        std::fs::write(dir.path().join("a.gif"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let all = list_media_images(dir.path(), None);
        let names: Vec<_> = all
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.gif", "b.jpeg", "media/image2.PNG"]);

        let captionable = list_media_images(dir.path(), Some(&["png", "jpg", "jpeg"]));
        assert_eq!(captionable.len(), 2);
    }

    #[test]
    fn list_media_images_missing_dir_is_empty() {
        assert!(list_media_images(Path::new("/definitely/not/here"), None).is_empty());
    }
}
