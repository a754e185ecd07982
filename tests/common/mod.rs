//! Shared fixtures for the integration tests.

#![allow(dead_code, unused_macros)]

use std::path::{Path, PathBuf};

/// Skip this test when no pdfium library can be bound.
macro_rules! skip_unless_pdfium {
    () => {{
        if let Err(e) = edgequake_doc2md::pipeline::pdf::bind_pdfium(None) {
            println!("SKIP — pdfium not available: {}", e);
            println!("       Set PDFIUM_LIB_PATH to run PDF tests");
            return;
        }
    }};
}

/// Write a stand-in for pandoc into `dir`.
///
/// It answers `--version`, and for a conversion writes the Markdown file plus
/// one PNG under `<media>/media/`, linked relatively the way pandoc does
/// (spaces in the link percent-encoded).
/// Inputs whose name contains `broken` fail with a pandoc-style message.
#[cfg(unix)]
pub fn fake_pandoc(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = r#"#!/bin/sh
if [ "$1" = "--version" ]; then
  echo "pandoc 3.1.9"
  exit 0
fi
in="$1"
out="$3"
media="${4#--extract-media=}"
case "$in" in
  *broken*)
    echo "Unknown input format broken" >&2
    exit 21
    ;;
esac
mkdir -p "$media/media"
printf 'PNG' > "$media/media/image1.png"
link=$(printf '%s' "$media" | sed 's/ /%20/g')
printf '# Setup guide\n\nOpen the settings dialog.\n\n![](%s/media/image1.png)\n' "$link" > "$out"
"#;
    let path = dir.join("fake-pandoc");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A small two-page PDF: page 1 has a line of text and draws the same 2×2
/// RGB image twice, page 2 has text only.
pub fn two_page_pdf() -> Vec<u8> {
    let page1 = b"BT /F1 12 Tf 72 720 Td (Hello page one) Tj ET\n\
q 50 0 0 50 72 600 cm /Im1 Do Q\n\
q 50 0 0 50 200 600 cm /Im1 Do Q\n";
    let page2 = b"BT /F1 12 Tf 72 720 Td (Second page) Tj ET\n";
    let pixels: [u8; 12] = [255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];

    let objects: Vec<Vec<u8>> = vec![
        b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
        b"<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>".to_vec(),
        b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
/Resources << /Font << /F1 5 0 R >> /XObject << /Im1 6 0 R >> >> /Contents 7 0 R >>"
            .to_vec(),
        b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
/Resources << /Font << /F1 5 0 R >> >> /Contents 8 0 R >>"
            .to_vec(),
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_vec(),
        stream(
            "/Type /XObject /Subtype /Image /Width 2 /Height 2 \
/ColorSpace /DeviceRGB /BitsPerComponent 8",
            &pixels,
        ),
        stream("", page1),
        stream("", page2),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        pdf.extend_from_slice(body);
        pdf.extend_from_slice(b"\nendobj\n");
    }

    let xref_at = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    pdf.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    pdf
}

fn stream(dict_entries: &str, data: &[u8]) -> Vec<u8> {
    let mut out = format!("<< {} /Length {} >>\nstream\n", dict_entries, data.len()).into_bytes();
    out.extend_from_slice(data);
    out.extend_from_slice(b"\nendstream");
    out
}
