//! Text normalization and truncation helpers.

use unicode_segmentation::UnicodeSegmentation;

use super::ansi::{extract_ansi_code, is_sequence_start, rejected_escape_len};
use super::width::{grapheme_width, visible_width};

const ANSI_RESET: &str = "\x1b[0m";

/// Converts `\r\n` and lone `\r` into `\n`.
pub fn normalize_newlines(input: &str) -> String {
    if !input.contains('\r') {
        return input.to_string();
    }
    input.replace("\r\n", "\n").replace('\r', "\n")
}

/// Truncates to `max_width` columns, keeping SGR state intact and appending `ellipsis`.
pub fn truncate_to_width(text: &str, max_width: usize, ellipsis: &str) -> String {
    if max_width == 0 {
        return String::new();
    }

    if visible_width(text) <= max_width {
        return text.to_string();
    }

    let ellipsis_width = visible_width(ellipsis);
    let target_width = max_width.saturating_sub(ellipsis_width);
    if target_width == 0 {
        return ellipsis.chars().take(max_width).collect();
    }

    let mut truncated = String::new();
    let mut current_width = 0;
    let mut idx = 0;
    'outer: while idx < text.len() {
        if let Some(ansi) = extract_ansi_code(text, idx) {
            truncated.push_str(ansi.code);
            idx += ansi.len();
            continue;
        }
        if is_sequence_start(text, idx) {
            idx += rejected_escape_len(text, idx);
            continue;
        }

        let text_end = next_escape_or_end(text, idx);
        for grapheme in text[idx..text_end].graphemes(true) {
            let width = grapheme_width(grapheme);
            if current_width + width > target_width {
                break 'outer;
            }
            truncated.push_str(grapheme);
            current_width += width;
        }
        idx = text_end;
    }

    let mut result = String::with_capacity(truncated.len() + ellipsis.len() + ANSI_RESET.len());
    result.push_str(&truncated);
    result.push_str(ANSI_RESET);
    result.push_str(ellipsis);
    result
}

fn next_escape_or_end(input: &str, idx: usize) -> usize {
    input[idx..]
        .char_indices()
        .skip(1)
        .find(|(offset, _)| is_sequence_start(input, idx + offset))
        .map_or(input.len(), |(offset, _)| idx + offset)
}
