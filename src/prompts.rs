//! Prompts sent to the vision model.
//!
//! Callers can override the caption prompt via
//! [`crate::config::ConversionConfig::caption_prompt`]; the constants here are
//! used only when no override is provided.

/// Default prompt sent alongside each extracted image.
///
/// The converted documents are mostly manuals and how-to guides, so the
/// prompt asks about on-screen controls rather than a generic description.
pub const DEFAULT_CAPTION_PROMPT: &str =
    "Describe the interface elements and actions shown in this screenshot";

/// Build the caption line appended to the Markdown for one image.
pub fn caption_line(file_name: &str, description: &str) -> String {
    format!("\n\n*Screenshot Description ({file_name}):* {description}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caption_line_format() {
        assert_eq!(
            caption_line("image1.png", "A login dialog."),
            "\n\n*Screenshot Description (image1.png):* A login dialog."
        );
    }

    #[test]
    fn default_prompt_mentions_interface() {
        assert!(DEFAULT_CAPTION_PROMPT.contains("interface elements"));
    }
}
