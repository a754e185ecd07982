//! Post-processing: deterministic cleanup of VLM caption text.
//!
//! A caption is appended as a single italic-prefixed line, so whatever the
//! model returns has to be flattened into one paragraph first. Models
//! routinely wrap short answers in fences, answer with CRLF line endings,
//! or leak zero-width characters from their tokenizer.
//!
//! ## Rule Order
//!
//! Normalise line endings before stripping fences so the fence regex sees
//! `\n`; remove invisible characters before collapsing whitespace so a
//! zero-width space between two newlines does not survive as a gap.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw caption.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip an outer code fence (models sometimes disobey)
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 4. Drop a leading `Assistant:` echo some chat templates leave behind
/// 5. Collapse all whitespace runs, newlines included, to single spaces
pub fn clean_caption(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_fences(&s);
    let s = remove_invisible_chars(&s);
    let s = strip_role_prefix(&s);
    collapse_whitespace(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip outer fences ───────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\n(.*)\n```\s*$").unwrap());

fn strip_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Strip role echo ──────────────────────────────────────────────────

static RE_ROLE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*assistant\s*:\s*").unwrap());

fn strip_role_prefix(input: &str) -> String {
    RE_ROLE_PREFIX.replace(input, "").into_owned()
}

// ── Rule 5: Collapse whitespace ──────────────────────────────────────────────

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences_and_flattens() {
        let raw = "```text\nA settings window.\n\nThe Save button is highlighted.\n```";
        assert_eq!(
            clean_caption(raw),
            "A settings window. The Save button is highlighted."
        );
    }

    #[test]
    fn normalises_crlf() {
        assert_eq!(clean_caption("one\r\ntwo\rthree"), "one two three");
    }

    #[test]
    fn removes_invisible_chars() {
        assert_eq!(clean_caption("\u{FEFF}Menu\u{200B} bar"), "Menu bar");
    }

    #[test]
    fn strips_assistant_echo() {
        assert_eq!(clean_caption("Assistant: A toolbar."), "A toolbar.");
        assert_eq!(clean_caption("The assistant: panel"), "The assistant: panel");
    }

    #[test]
    fn blank_stays_blank() {
        assert_eq!(clean_caption("  \n\t "), "");
    }
}
