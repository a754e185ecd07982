//! Image encoding: file bytes → base64, either as `ImageData` for the VLM
//! request body or as a `data:` URI for inlining into Markdown.
//!
//! Both paths share the same MIME table so an image inlined into the
//! preview and the same image sent for captioning are labelled identically.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use std::path::Path;
use tracing::debug;

/// MIME type for an image file, by extension (case-insensitive).
///
/// Returns `None` for anything that is not a browser-displayable image,
/// which callers treat as "leave the reference alone".
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "ico" => "image/x-icon",
        _ => return None,
    };
    Some(mime)
}

/// Encode raw bytes as a `data:` URI.
pub fn data_uri(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Encode an image file for the VLM API.
///
/// `detail: "high"` lets GPT-4-class models tile the image instead of
/// downscaling it to a single 512 px overview; small UI text in screenshots
/// is unreadable otherwise.
pub fn encode_image(bytes: &[u8], mime: &str) -> ImageData {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded image → {} bytes base64", b64.len());
    ImageData::new(b64, mime).with_detail("high")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_lookup_is_case_insensitive() {
        assert_eq!(mime_for_path(Path::new("a.PNG")), Some("image/png"));
        assert_eq!(mime_for_path(Path::new("a.jpeg")), Some("image/jpeg"));
        assert_eq!(mime_for_path(Path::new("dir/a.JPG")), Some("image/jpeg"));
        assert_eq!(mime_for_path(Path::new("a.svg")), Some("image/svg+xml"));
        assert_eq!(mime_for_path(Path::new("a.emf")), None);
        assert_eq!(mime_for_path(Path::new("noext")), None);
    }

    #[test]
    fn data_uri_shape() {
        let uri = data_uri(b"GIF89a", "image/gif");
        assert_eq!(uri, "data:image/gif;base64,R0lGODlh");
    }

    #[test]
    fn encode_image_round_trips_bytes() {
        let data = encode_image(&[0x89, b'P', b'N', b'G'], "image/png");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(decoded, vec![0x89, b'P', b'N', b'G']);
    }
}
