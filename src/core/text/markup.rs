//! SGR-to-HTML markup rendering.
//!
//! Only SGR sequences survive as styling. Every other escape sequence (cursor movement,
//! screen clears, mode toggles, OSC/DCS/APC strings) and bare control bytes are dropped.

use std::fmt::Write as _;

use super::ansi::{extract_ansi_code, is_sequence_start, rejected_escape_len};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    fn css(self) -> String {
        format!("rgb({},{},{})", self.0, self.1, self.2)
    }
}

/// Colors 0-15: black, red, green, yellow, blue, magenta, cyan, white, then bright variants.
pub const ANSI_PALETTE: [Rgb; 16] = [
    Rgb(0, 0, 0),
    Rgb(187, 0, 0),
    Rgb(0, 187, 0),
    Rgb(187, 187, 0),
    Rgb(0, 0, 187),
    Rgb(187, 0, 187),
    Rgb(0, 187, 187),
    Rgb(255, 255, 255),
    Rgb(85, 85, 85),
    Rgb(255, 85, 85),
    Rgb(0, 255, 0),
    Rgb(255, 255, 85),
    Rgb(85, 85, 255),
    Rgb(255, 85, 255),
    Rgb(85, 255, 255),
    Rgb(255, 255, 255),
];

const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub colors: [Rgb; 16],
    pub default_foreground: Rgb,
    pub default_background: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: ANSI_PALETTE,
            default_foreground: Rgb(229, 229, 229),
            default_background: Rgb(0, 0, 0),
        }
    }
}

impl Palette {
    /// xterm 256-color lookup; 0-15 come from this palette.
    pub fn indexed(&self, index: u8) -> Rgb {
        match index {
            0..=15 => self.colors[usize::from(index)],
            16..=231 => {
                let cube = index - 16;
                Rgb(
                    CUBE_LEVELS[usize::from(cube / 36)],
                    CUBE_LEVELS[usize::from((cube / 6) % 6)],
                    CUBE_LEVELS[usize::from(cube % 6)],
                )
            }
            _ => {
                let level = 8 + (index - 232) * 10;
                Rgb(level, level, level)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupOptions {
    pub palette: Palette,
    /// Escape `& < > " '` in terminal text. Off by default so plain text passes through.
    pub escape_html: bool,
}

impl Default for MarkupOptions {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            escape_html: false,
        }
    }
}

/// Current graphic rendition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SgrStyle {
    pub bold: bool,
    pub dim: bool,
    pub italic: bool,
    pub underline: bool,
    pub inverse: bool,
    pub hidden: bool,
    pub strikethrough: bool,
    pub fg: Option<Rgb>,
    pub bg: Option<Rgb>,
}

impl SgrStyle {
    /// Applies the parameter list of one SGR sequence.
    pub fn apply(&mut self, params: &str, palette: &Palette) {
        if params.is_empty() {
            self.reset();
            return;
        }

        let parts: Vec<&str> = params.split(';').collect();
        let mut idx = 0;
        while idx < parts.len() {
            let part = parts[idx];
            if part.contains(':') {
                self.apply_subparams(part, palette);
                idx += 1;
                continue;
            }

            let code = if part.is_empty() {
                Some(0)
            } else {
                part.parse::<u16>().ok()
            };
            let Some(code) = code else {
                idx += 1;
                continue;
            };

            match code {
                38 | 48 | 58 => {
                    let (color, consumed) = extended_color(&parts[idx + 1..], palette);
                    match (code, color) {
                        (38, Some(color)) => self.fg = Some(color),
                        (48, Some(color)) => self.bg = Some(color),
                        _ => {}
                    }
                    idx += 1 + consumed;
                    continue;
                }
                _ => self.apply_code(code, palette),
            }
            idx += 1;
        }
    }

    // `38:2::255:0:0`, `38:5:196`, `4:3`.
    fn apply_subparams(&mut self, part: &str, palette: &Palette) {
        let subparts: Vec<&str> = part.split(':').collect();
        let Some(code) = subparts.first().and_then(|value| value.parse::<u16>().ok()) else {
            return;
        };
        match code {
            38 | 48 => {
                let rest = &subparts[1..];
                let color = match rest.first().copied() {
                    // Colon form may carry a color-space id before the components.
                    Some("2") if rest.len() >= 5 => {
                        extended_color(&[rest[0], rest[2], rest[3], rest[4]], palette).0
                    }
                    _ => extended_color(rest, palette).0,
                };
                if let Some(color) = color {
                    if code == 38 {
                        self.fg = Some(color);
                    } else {
                        self.bg = Some(color);
                    }
                }
            }
            4 => {
                self.underline = subparts.get(1).map_or(true, |style| *style != "0");
            }
            _ => self.apply_code(code, palette),
        }
    }

    fn apply_code(&mut self, code: u16, palette: &Palette) {
        match code {
            0 => self.reset(),
            1 => self.bold = true,
            2 => self.dim = true,
            3 => self.italic = true,
            4 => self.underline = true,
            7 => self.inverse = true,
            8 => self.hidden = true,
            9 => self.strikethrough = true,
            21 => self.bold = false,
            22 => {
                self.bold = false;
                self.dim = false;
            }
            23 => self.italic = false,
            24 => self.underline = false,
            27 => self.inverse = false,
            28 => self.hidden = false,
            29 => self.strikethrough = false,
            30..=37 => self.fg = Some(palette.colors[usize::from(code - 30)]),
            39 => self.fg = None,
            40..=47 => self.bg = Some(palette.colors[usize::from(code - 40)]),
            49 => self.bg = None,
            90..=97 => self.fg = Some(palette.colors[usize::from(code - 90 + 8)]),
            100..=107 => self.bg = Some(palette.colors[usize::from(code - 100 + 8)]),
            _ => {}
        }
    }

    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }

    /// Inline CSS for this style; empty when the style is plain.
    pub fn css(&self, palette: &Palette) -> String {
        let (mut fg, mut bg) = (self.fg, self.bg);
        if self.inverse {
            let swapped_fg = bg.unwrap_or(palette.default_background);
            let swapped_bg = fg.unwrap_or(palette.default_foreground);
            fg = Some(swapped_fg);
            bg = Some(swapped_bg);
        }

        let mut rules: Vec<String> = Vec::new();
        if let Some(fg) = fg {
            rules.push(format!("color:{}", fg.css()));
        }
        if let Some(bg) = bg {
            rules.push(format!("background-color:{}", bg.css()));
        }
        if self.bold {
            rules.push("font-weight:bold".to_string());
        }
        if self.dim {
            rules.push("opacity:0.7".to_string());
        }
        if self.italic {
            rules.push("font-style:italic".to_string());
        }
        match (self.underline, self.strikethrough) {
            (true, true) => rules.push("text-decoration:underline line-through".to_string()),
            (true, false) => rules.push("text-decoration:underline".to_string()),
            (false, true) => rules.push("text-decoration:line-through".to_string()),
            (false, false) => {}
        }
        if self.hidden {
            rules.push("visibility:hidden".to_string());
        }
        rules.join(";")
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Parses `5;n` or `2;r;g;b` after a 38/48/58. Returns the color and how many parts it used.
fn extended_color(rest: &[&str], palette: &Palette) -> (Option<Rgb>, usize) {
    match rest.first().copied() {
        Some("5") => {
            let color = rest
                .get(1)
                .and_then(|value| value.parse::<u8>().ok())
                .map(|index| palette.indexed(index));
            (color, rest.len().min(2))
        }
        Some("2") => {
            if rest.len() < 4 {
                return (None, rest.len());
            }
            let channels: Option<Vec<u8>> = rest[1..4]
                .iter()
                .map(|value| value.parse::<u8>().ok())
                .collect();
            let color = channels.map(|rgb| Rgb(rgb[0], rgb[1], rgb[2]));
            (color, 4)
        }
        // Unknown color space: the remaining parameters cannot be interpreted safely.
        _ => (None, rest.len()),
    }
}

/// Renders terminal text (newlines already normalized) to HTML spans.
pub fn render_markup(input: &str, options: &MarkupOptions) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending = String::new();
    let mut style = SgrStyle::default();

    let mut idx = 0;
    while idx < input.len() {
        if is_sequence_start(input, idx) {
            if let Some(code) = extract_ansi_code(input, idx) {
                if let Some(params) = code.sgr_params() {
                    let mut next = style;
                    next.apply(params, &options.palette);
                    if next != style {
                        flush_span(&mut out, &mut pending, &style, options);
                        style = next;
                    }
                }
                idx += code.len();
            } else {
                idx += rejected_escape_len(input, idx);
            }
            continue;
        }

        let Some(ch) = input[idx..].chars().next() else {
            break;
        };
        idx += ch.len_utf8();
        if is_dropped_control(ch) {
            continue;
        }
        pending.push(ch);
    }
    flush_span(&mut out, &mut pending, &style, options);

    out
}

/// Removes every escape sequence and non-printing control byte.
pub fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut idx = 0;
    while idx < input.len() {
        if is_sequence_start(input, idx) {
            idx += match extract_ansi_code(input, idx) {
                Some(code) => code.len(),
                None => rejected_escape_len(input, idx),
            };
            continue;
        }
        let Some(ch) = input[idx..].chars().next() else {
            break;
        };
        idx += ch.len_utf8();
        if !is_dropped_control(ch) {
            out.push(ch);
        }
    }
    out
}

fn is_dropped_control(ch: char) -> bool {
    ch.is_control() && ch != '\n' && ch != '\t'
}

fn flush_span(out: &mut String, pending: &mut String, style: &SgrStyle, options: &MarkupOptions) {
    if pending.is_empty() {
        return;
    }
    if style.is_plain() {
        push_text(out, pending, options.escape_html);
    } else {
        let _ = write!(out, "<span style=\"{}\">", style.css(&options.palette));
        push_text(out, pending, options.escape_html);
        out.push_str("</span>");
    }
    pending.clear();
}

fn push_text(out: &mut String, text: &str, escape_html: bool) {
    if !escape_html {
        out.push_str(text);
        return;
    }
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
}
