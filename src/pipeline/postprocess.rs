//! Deterministic cleanup of generated prose (corrective messages, summaries).
//!
//! Models occasionally wrap an answer in code fences, answer with `\r\n`
//! line endings, or pad paragraphs with runs of blank lines. None of that
//! changes what the text says, so it is removed here with cheap string and
//! regex passes rather than prompt engineering.
//!
//! Rules, in order:
//! 1. Strip one pair of outer code fences (any info string)
//! 2. Normalise line endings (CRLF / CR → LF)
//! 3. Trim trailing whitespace per line
//! 4. Collapse runs of blank lines to a single blank line
//! 5. Trim the whole text
//!
//! Fence stripping runs on the trimmed input, so a fence followed by CRLF is
//! recognised only after rule 2; [`clean_generated_text`] therefore
//! normalises line endings first when checking for fences.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules. The result may be empty.
pub fn clean_generated_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_outer_fences(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Strip outer fences ───────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z0-9_-]*[ \t]*\n(.*?)\n?```\s*$").unwrap());

fn strip_outer_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse blank lines ─────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").into_owned()
}
