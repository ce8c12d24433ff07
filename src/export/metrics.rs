//! Font metrics and word wrapping
//!
//! `Helvetica` carries the standard AFM advance widths in 1/1000 em for the
//! printable ASCII range; anything else is measured as a digit. A configured
//! TrueType body font measures with its own `hmtx` advances instead.

const POINT_MM: f32 = 25.4 / 72.0;
const DEFAULT_WIDTH: u16 = 556;

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    // ' ' ! " # $ % & ' ( ) * + , - . /
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    // 0-9
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    // : ; < = > ? @
    278, 278, 584, 584, 584, 556, 1015,
    // A-Z
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    // [ \ ] ^ _ `
    278, 278, 278, 469, 556, 333,
    // a-z
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    // { | } ~
    334, 260, 334, 584,
];

/// Advance widths used for line wrapping
pub trait FontMetrics {
    /// Advance of `c` in 1/1000 em
    fn advance(&self, c: char) -> f32;

    /// Width of `text` in millimetres at `font_size` points
    fn text_width_mm(&self, text: &str, font_size: f32) -> f32 {
        let units: f32 = text.chars().map(|c| self.advance(c)).sum();
        units / 1000.0 * font_size * POINT_MM
    }
}

/// Built-in PDF Helvetica
pub struct Helvetica;

impl FontMetrics for Helvetica {
    fn advance(&self, c: char) -> f32 {
        let code = u32::from(c);
        let width = if (32..127).contains(&code) {
            HELVETICA_WIDTHS[(code - 32) as usize]
        } else {
            DEFAULT_WIDTH
        };
        f32::from(width)
    }
}

/// Map text onto what the built-in PDF fonts can draw
pub fn pdf_safe(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\u{2022}' => '*',
            '\t' => ' ',
            c if (' '..='~').contains(&c) || ('\u{A0}'..='\u{FF}').contains(&c) => c,
            _ => '?',
        })
        .collect()
}

/// Wrap text to `max_width_mm`
///
/// Explicit newlines always break. Words wider than a whole line are split
/// by character. An empty paragraph still yields one (empty) line.
pub fn wrap_text(
    text: &str,
    max_width_mm: f32,
    font_size: f32,
    metrics: &dyn FontMetrics,
) -> Vec<String> {
    let space = metrics.text_width_mm(" ", font_size);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut line_width = 0.0_f32;

        for word in paragraph.split_whitespace() {
            let word_width = metrics.text_width_mm(word, font_size);

            if !line.is_empty() && line_width + space + word_width <= max_width_mm {
                line.push(' ');
                line.push_str(word);
                line_width += space + word_width;
                continue;
            }

            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }

            if word_width <= max_width_mm {
                line.push_str(word);
                line_width = word_width;
            } else {
                let mut chunks = split_long_word(word, max_width_mm, font_size, metrics);
                line = chunks.pop().unwrap_or_default();
                line_width = metrics.text_width_mm(&line, font_size);
                lines.extend(chunks);
            }
        }

        lines.push(line);
    }

    lines
}

fn split_long_word(
    word: &str,
    max_width_mm: f32,
    font_size: f32,
    metrics: &dyn FontMetrics,
) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut chunk = String::new();
    let mut width = 0.0_f32;

    for c in word.chars() {
        let w = metrics.text_width_mm(c.encode_utf8(&mut [0; 4]), font_size);
        if !chunk.is_empty() && width + w > max_width_mm {
            chunks.push(std::mem::take(&mut chunk));
            width = 0.0;
        }
        chunk.push(c);
        width += w;
    }
    if !chunk.is_empty() {
        chunks.push(chunk);
    }
    chunks
}
