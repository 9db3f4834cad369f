//! Turn OCR blocks into the ordered list of text lines every later stage
//! consumes, plus a bounded preview for prompts.

use crate::model::TextBlock;

/// Block type carrying one line of detected text.
pub const LINE_BLOCK: &str = "LINE";

/// The `text` of every `LINE` block, in OCR order.
///
/// No trimming, no deduplication: repeated lines stay repeated.
pub fn extract_lines(blocks: &[TextBlock]) -> Vec<String> {
    blocks
        .iter()
        .filter(|b| b.block_type == LINE_BLOCK)
        .map(|b| b.text.clone())
        .collect()
}

/// First `max_lines` lines joined with `", "`, cut to at most `max_chars`
/// characters.
///
/// Keeps generated prompts small regardless of document length.
pub fn preview(lines: &[String], max_lines: usize, max_chars: usize) -> String {
    let joined = lines
        .iter()
        .take(max_lines)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    match joined.char_indices().nth(max_chars) {
        Some((cut, _)) => joined[..cut].to_string(),
        None => joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_lines_in_order() {
        let blocks = vec![
            TextBlock::new("PAGE", ""),
            TextBlock::line("Coaching Certification Letter"),
            TextBlock::new("WORD", "Coaching"),
            TextBlock::line("Issued 2023"),
            TextBlock::line("Issued 2023"),
        ];
        assert_eq!(
            extract_lines(&blocks),
            vec!["Coaching Certification Letter", "Issued 2023", "Issued 2023"]
        );
    }

    #[test]
    fn does_not_trim() {
        let blocks = vec![TextBlock::line("  padded  ")];
        assert_eq!(extract_lines(&blocks), vec!["  padded  "]);
    }

    #[test]
    fn line_type_is_case_sensitive() {
        assert!(extract_lines(&[TextBlock::new("line", "x")]).is_empty());
    }

    #[test]
    fn preview_bounds_lines() {
        let lines: Vec<String> = (1..=8).map(|i| format!("l{i}")).collect();
        assert_eq!(preview(&lines, 5, 1000), "l1, l2, l3, l4, l5");
    }

    #[test]
    fn preview_bounds_chars_on_char_boundary() {
        let lines = vec!["héllo wörld".to_string()];
        assert_eq!(preview(&lines, 5, 4), "héll");
        assert_eq!(preview(&lines, 5, 100), "héllo wörld");
    }

    #[test]
    fn preview_of_nothing_is_empty() {
        assert_eq!(preview(&[], 5, 10), "");
    }
}
