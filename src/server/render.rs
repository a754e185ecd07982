//! HTML for the web form: the upload page and the result page.

use pulldown_cmark::{html, Event, Options, Parser};
use std::path::Path;

const CSS: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 960px; margin: 2rem auto; padding: 0 1rem; color: #1f2937; }
h1 { font-size: 1.6rem; }
form { display: grid; gap: 0.8rem; padding: 1rem; border: 1px solid #e5e7eb; border-radius: 8px; }
label { font-weight: 600; }
small { color: #6b7280; }
input[type=text] { width: 100%; padding: 0.4rem; }
button { width: 10rem; padding: 0.5rem; }
pre.status { background: #f3f4f6; padding: 0.8rem; white-space: pre-wrap; }
pre.status.error { background: #fef2f2; color: #991b1b; }
article { border-top: 1px solid #e5e7eb; margin-top: 1rem; padding-top: 1rem; }
article img { max-width: 100%; }
"#;

/// The upload form, optionally followed by a status box and a preview.
pub(crate) fn page(
    default_output_dir: &Path,
    status: Option<(&str, bool)>,
    preview: Option<&str>,
) -> String {
    let status = match status {
        Some((text, is_error)) => format!(
            r#"<h2>Status</h2>
<pre class="status{}">{}</pre>"#,
            if is_error { " error" } else { "" },
            html_escape(text)
        ),
        None => String::new(),
    };
    let preview = match preview {
        Some(body) => format!("<h2>Markdown preview</h2>\n<article>\n{body}\n</article>"),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Document to Markdown</title>
    <style>{css}</style>
</head>
<body>
<h1>Document to Markdown</h1>
<p>Convert PDF, DOCX, ODT, EPUB, HTML and other documents to Markdown. Embedded images are saved to a media folder next to the Markdown file.</p>
<form action="/convert" method="post" enctype="multipart/form-data">
    <label for="file">Document</label>
    <input id="file" name="file" type="file" required>
    <label for="output_dir">Output directory</label>
    <input id="output_dir" name="output_dir" type="text" placeholder="{default_dir}">
    <label><input name="inline_images" type="checkbox"> Embed images in the preview</label>
    <small>Unticked, the preview links images by their path on the server's disk, which browsers will not load from this page.</small>
    <label><input name="caption_images" type="checkbox"> Caption images with a vision model</label>
    <button type="submit">Convert</button>
</form>
{status}
{preview}
</body>
</html>"#,
        css = CSS,
        default_dir = html_escape(&default_output_dir.to_string_lossy()),
        status = status,
        preview = preview,
    )
}

/// Render Markdown to HTML. Raw HTML in the document is shown as text.
pub(crate) fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut out, parser);
    out
}

/// Escape HTML special characters.
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
