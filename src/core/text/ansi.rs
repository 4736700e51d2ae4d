//! Escape-sequence boundary detection.
//!
//! Sequences are classified by their ECMA-48 structure (introducer, parameter bytes,
//! intermediate bytes, final byte), so neighbouring sequences never bleed into each other.

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;
/// UTF-8 lead byte of U+0080..=U+00BF.
const C1_LEAD: u8 = 0xc2;
const C1_ST: u8 = 0x9c;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnsiCodeKind {
    /// `ESC [` control sequence (SGR, cursor movement, mode changes, ...).
    Csi,
    /// `ESC ]` operating-system command.
    Osc,
    /// `ESC _` application program command.
    Apc,
    /// `ESC P` device control string.
    Dcs,
    /// `ESC ^` privacy message or `ESC X` start of string.
    Pm,
    /// `ESC O` single shift three.
    Ss3,
    /// Short `ESC [intermediates] final` sequence (`ESC 7`, `ESC ( B`, `ESC =`, ...).
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnsiCode<'a> {
    pub code: &'a str,
    pub kind: AnsiCodeKind,
}

impl<'a> AnsiCode<'a> {
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Parameter string of a well-formed SGR sequence (`ESC [ params m`).
    ///
    /// Private-mode or intermediate-carrying CSIs ending in `m` are not SGR.
    pub fn sgr_params(&self) -> Option<&'a str> {
        if self.kind != AnsiCodeKind::Csi {
            return None;
        }
        let params = self
            .code
            .strip_prefix("\x1b[")
            .or_else(|| self.code.strip_prefix('\u{9b}'))?
            .strip_suffix('m')?;
        if params
            .bytes()
            .all(|b| b.is_ascii_digit() || b == b';' || b == b':')
        {
            Some(params)
        } else {
            None
        }
    }
}

/// True when `pos` starts an escape sequence: `ESC` or an 8-bit C1 introducer (`U+009B` CSI,
/// `U+009D` OSC, `U+0090` DCS, ...).
pub fn is_sequence_start(input: &str, pos: usize) -> bool {
    sequence_start(input.as_bytes(), pos).is_some()
}

/// Extracts the complete escape sequence starting at `pos`, if any.
pub fn extract_ansi_code(input: &str, pos: usize) -> Option<AnsiCode<'_>> {
    let bytes = input.as_bytes();
    let selector = match sequence_start(bytes, pos)? {
        Start::Esc => *bytes.get(pos + 1)?,
        Start::C1(selector) => selector,
    };

    let end = scan(bytes, pos, selector).ok()?;
    let kind = match selector {
        b'[' => AnsiCodeKind::Csi,
        b']' => AnsiCodeKind::Osc,
        b'_' => AnsiCodeKind::Apc,
        b'P' => AnsiCodeKind::Dcs,
        b'^' | b'X' => AnsiCodeKind::Pm,
        b'O' => AnsiCodeKind::Ss3,
        _ => AnsiCodeKind::Escape,
    };

    Some(AnsiCode {
        code: &input[pos..end],
        kind,
    })
}

/// Number of bytes to discard at a sequence start that [`extract_ansi_code`] rejected.
///
/// A sequence cut off by the end of input swallows the rest of the input; a malformed one
/// is dropped up to the first byte that broke it, so the text or sequence after it survives.
/// Returns 0 when `pos` does not start a sequence.
pub fn rejected_escape_len(input: &str, pos: usize) -> usize {
    let bytes = input.as_bytes();
    let selector = match sequence_start(bytes, pos) {
        None => return 0,
        Some(Start::Esc) => match bytes.get(pos + 1) {
            Some(selector) => *selector,
            None => return 1,
        },
        Some(Start::C1(selector)) => selector,
    };

    match scan(bytes, pos, selector) {
        Ok(end) => end - pos,
        Err(Scan::Truncated) => bytes.len() - pos,
        Err(Scan::Malformed(stop)) => (stop - pos).max(1),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Start {
    Esc,
    /// Two-byte UTF-8 C1 introducer, carrying the byte that follows `ESC` in its 7-bit form.
    C1(u8),
}

fn sequence_start(bytes: &[u8], pos: usize) -> Option<Start> {
    match bytes.get(pos)? {
        &ESC => Some(Start::Esc),
        &C1_LEAD => c1_selector(*bytes.get(pos + 1)?).map(Start::C1),
        _ => None,
    }
}

fn c1_selector(second: u8) -> Option<u8> {
    match second {
        0x9b => Some(b'['),
        0x9d => Some(b']'),
        0x90 => Some(b'P'),
        0x9f => Some(b'_'),
        0x9e => Some(b'^'),
        0x98 => Some(b'X'),
        0x8f => Some(b'O'),
        _ => None,
    }
}

// Every introducer is two bytes, so bodies start at `pos + 2` in both forms.
fn scan(bytes: &[u8], pos: usize, selector: u8) -> Result<usize, Scan> {
    match selector {
        b'[' => scan_csi(bytes, pos),
        b']' | b'_' | b'P' | b'^' | b'X' => scan_string_terminated(bytes, pos),
        b'O' => scan_ss3(bytes, pos),
        _ => scan_escape(bytes, pos),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Truncated,
    /// Index of the first byte that is not part of the sequence.
    Malformed(usize),
}

fn scan_csi(bytes: &[u8], pos: usize) -> Result<usize, Scan> {
    let mut idx = pos + 2;
    while idx < bytes.len() && (0x30..=0x3f).contains(&bytes[idx]) {
        idx += 1;
    }
    while idx < bytes.len() && (0x20..=0x2f).contains(&bytes[idx]) {
        idx += 1;
    }
    match bytes.get(idx) {
        None => Err(Scan::Truncated),
        Some(b) if (0x40..=0x7e).contains(b) => Ok(idx + 1),
        Some(_) => Err(Scan::Malformed(idx)),
    }
}

fn scan_ss3(bytes: &[u8], pos: usize) -> Result<usize, Scan> {
    match bytes.get(pos + 2) {
        None => Err(Scan::Truncated),
        Some(b) if (0x40..=0x7e).contains(b) => Ok(pos + 3),
        Some(_) => Err(Scan::Malformed(pos + 2)),
    }
}

fn scan_escape(bytes: &[u8], pos: usize) -> Result<usize, Scan> {
    let mut idx = pos + 1;
    while idx < bytes.len() && (0x20..=0x2f).contains(&bytes[idx]) {
        idx += 1;
    }
    match bytes.get(idx) {
        None => Err(Scan::Truncated),
        Some(b) if (0x30..=0x7e).contains(b) => Ok(idx + 1),
        Some(_) => Err(Scan::Malformed(idx)),
    }
}

fn scan_string_terminated(bytes: &[u8], pos: usize) -> Result<usize, Scan> {
    let mut idx = pos + 2;
    while idx < bytes.len() {
        if bytes[idx] == BEL {
            return Ok(idx + 1);
        }
        if bytes[idx] == C1_LEAD && bytes.get(idx + 1) == Some(&C1_ST) {
            return Ok(idx + 2);
        }
        if bytes[idx] == ESC {
            return match bytes.get(idx + 1) {
                Some(b'\\') => Ok(idx + 2),
                None => Err(Scan::Truncated),
                // An unterminated string followed by a fresh sequence.
                Some(_) => Err(Scan::Malformed(idx)),
            };
        }
        idx += 1;
    }
    Err(Scan::Truncated)
}

#[cfg(test)]
mod tests {
    use super::{extract_ansi_code, is_sequence_start, rejected_escape_len, AnsiCodeKind};

    #[test]
    fn sgr_is_recognized_with_params() {
        let code = extract_ansi_code("\x1b[1;31mred", 0).expect("sgr");
        assert_eq!(code.kind, AnsiCodeKind::Csi);
        assert_eq!(code.code, "\x1b[1;31m");
        assert_eq!(code.sgr_params(), Some("1;31"));
    }

    #[test]
    fn private_mode_csi_is_not_sgr() {
        let code = extract_ansi_code("\x1b[?2004h", 0).expect("csi");
        assert_eq!(code.kind, AnsiCodeKind::Csi);
        assert_eq!(code.len(), 8);
        assert_eq!(code.sgr_params(), None);

        let code = extract_ansi_code("\x1b[>4;2m", 0).expect("csi");
        assert_eq!(code.sgr_params(), None);
    }

    #[test]
    fn osc_stops_at_bel_or_st() {
        let input = "\x1b]0;title\x07\x1b[32m";
        let code = extract_ansi_code(input, 0).expect("osc");
        assert_eq!(code.kind, AnsiCodeKind::Osc);
        assert_eq!(code.code, "\x1b]0;title\x07");

        let code = extract_ansi_code("\x1b]8;;x\x1b\\", 0).expect("osc st");
        assert_eq!(code.code, "\x1b]8;;x\x1b\\");
    }

    #[test]
    fn short_escapes_are_recognized() {
        assert_eq!(
            extract_ansi_code("\x1b(Bx", 0).map(|code| code.code),
            Some("\x1b(B")
        );
        assert_eq!(
            extract_ansi_code("\x1b=x", 0).map(|code| code.kind),
            Some(AnsiCodeKind::Escape)
        );
        assert_eq!(
            extract_ansi_code("\x1bOA", 0).map(|code| code.kind),
            Some(AnsiCodeKind::Ss3)
        );
    }

    #[test]
    fn truncated_sequences_swallow_the_rest() {
        assert!(extract_ansi_code("\x1b[31", 0).is_none());
        assert_eq!(rejected_escape_len("ab\x1b[31", 2), 4);
        assert_eq!(rejected_escape_len("\x1b]0;never ends", 0), 14);
        assert_eq!(rejected_escape_len("\x1b", 0), 1);
    }

    #[test]
    fn malformed_csi_stops_before_the_offending_byte() {
        let input = "\x1b[3\u{e9}x";
        assert!(extract_ansi_code(input, 0).is_none());
        assert_eq!(rejected_escape_len(input, 0), 3);
    }

    #[test]
    fn unterminated_osc_before_sgr_keeps_the_sgr() {
        let input = "\x1b]0;title\x1b[31m";
        assert!(extract_ansi_code(input, 0).is_none());
        assert_eq!(rejected_escape_len(input, 0), 9);
        let rest = &input[9..];
        assert_eq!(extract_ansi_code(rest, 0).map(|code| code.code), Some("\x1b[31m"));
    }

    #[test]
    fn c1_introducers_start_sequences() {
        let code = extract_ansi_code("\u{9b}31mred", 0).expect("c1 csi");
        assert_eq!(code.kind, AnsiCodeKind::Csi);
        assert_eq!(code.code, "\u{9b}31m");
        assert_eq!(code.sgr_params(), Some("31"));

        let code = extract_ansi_code("\u{9d}0;title\u{9c}rest", 0).expect("c1 osc");
        assert_eq!(code.kind, AnsiCodeKind::Osc);
        assert_eq!(code.code, "\u{9d}0;title\u{9c}");

        let code = extract_ansi_code("\u{90}q\x1b\\", 0).expect("c1 dcs");
        assert_eq!(code.kind, AnsiCodeKind::Dcs);

        assert!(is_sequence_start("a\u{9b}2K", 1));
        assert!(!is_sequence_start("\u{e9}", 0));
        assert!(!is_sequence_start("\u{85}", 0));
    }

    #[test]
    fn truncated_c1_sequences_are_rejected_whole() {
        assert!(extract_ansi_code("\u{9b}31", 0).is_none());
        assert_eq!(rejected_escape_len("\u{9b}31", 0), 4);
        assert_eq!(rejected_escape_len("\u{9b}\u{e9}", 0), 2);
        assert_eq!(rejected_escape_len("plain", 0), 0);
    }
}
