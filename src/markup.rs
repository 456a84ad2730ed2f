//! On-screen preview of extracted paragraphs.
//!
//! Everything here is display-only: the rendered style strings never flow
//! back into the exported document.

use crate::docx::scheme_slot;
use crate::model::{Alignment, Color, EMU_PER_POINT, ParagraphRecord};

const PX_PER_POINT: f64 = 1.33;

/// Default Office colour scheme, used for theme colours the package theme
/// did not define.
const OFFICE_PALETTE: &[(&str, u32)] = &[
    ("dk1", 0x000000),
    ("lt1", 0xFFFFFF),
    ("dk2", 0x44546A),
    ("lt2", 0xE7E6E6),
    ("accent1", 0x4472C4),
    ("accent2", 0xED7D31),
    ("accent3", 0xA5A5A5),
    ("accent4", 0xFFC000),
    ("accent5", 0x5B9BD5),
    ("accent6", 0x70AD47),
    ("hlink", 0x0563C1),
    ("folHlink", 0x954F72),
];

/// Point size to screen pixels, rounded to two decimals (12pt -> 15.96).
pub fn emu_to_px(emu: u64) -> f64 {
    let points = emu as f64 / EMU_PER_POINT as f64;
    (points * PX_PER_POINT * 100.0).round() / 100.0
}

/// CSS declaration for a run colour; `None` when the run has no colour.
pub fn color_css(color: &Color) -> Option<String> {
    match color {
        Color::NoColor => None,
        Color::PackedInt(packed) => {
            let r = packed & 0xFF;
            let g = (packed >> 8) & 0xFF;
            let b = (packed >> 16) & 0xFF;
            Some(format!("color: rgb({r}, {g}, {b}); "))
        }
        Color::Named(name) => {
            let slot = scheme_slot(name);
            let css = match OFFICE_PALETTE.iter().find(|(s, _)| *s == slot) {
                Some((_, hex)) => format!("color: #{hex:06x}; "),
                None => "color: black; ".to_string(),
            };
            Some(css)
        }
    }
}

/// Inline style for paragraph `index`. Only the first run's formatting is
/// shown. Out-of-range indices give an empty string.
pub fn paragraph_style(paragraphs: &[ParagraphRecord], index: usize) -> String {
    let Some(record) = paragraphs.get(index) else {
        return String::new();
    };

    let mut css = String::new();
    match record.alignment {
        Alignment::Center => css.push_str("text-align: center; "),
        Alignment::Right => css.push_str("text-align: right; "),
        Alignment::Justify => css.push_str("text-align: justify; "),
        Alignment::Left | Alignment::Unset => {}
    }

    let Some(first) = record.runs.first() else {
        return css;
    };

    if first.bold == Some(true) {
        css.push_str("font-weight: bold; ");
    }
    if first.italic == Some(true) {
        css.push_str("font-style: italic; ");
    }
    if first.underline == Some(true) {
        css.push_str("text-decoration: underline; ");
    }
    if let Some(size) = first.font_size {
        css.push_str(&format!("font-size: {}px; ", emu_to_px(size)));
    }
    if let Some(name) = &first.font_name {
        let family: String = name.chars().filter(|c| !matches!(c, '\'' | ';')).collect();
        css.push_str(&format!("font-family: '{family}', sans-serif; "));
    }
    if let Some(color) = color_css(&first.color) {
        css.push_str(&color);
    }

    css
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbabilityBand {
    High,
    Elevated,
    Moderate,
    Low,
}

impl ProbabilityBand {
    pub fn of(probability: u8) -> Self {
        match probability {
            71.. => ProbabilityBand::High,
            60..=70 => ProbabilityBand::Elevated,
            50..=59 => ProbabilityBand::Moderate,
            _ => ProbabilityBand::Low,
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            ProbabilityBand::High => "color-red",
            ProbabilityBand::Elevated => "color-orange",
            ProbabilityBand::Moderate => "color-purple",
            ProbabilityBand::Low => "color-black",
        }
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
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
    out
}

/// One `<p>` per paragraph, showing `texts[i]` in the style of
/// `paragraphs[i]` with the band class of `probabilities[i]`.
pub fn render_preview(paragraphs: &[ParagraphRecord], texts: &[String], probabilities: &[u8]) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n\
         .color-red { color: #d32f2f; }\n\
         .color-orange { color: #ef6c00; }\n\
         .color-purple { color: #7b1fa2; }\n\
         .color-black { color: #000000; }\n\
         </style>\n</head>\n<body>\n",
    );

    for (index, text) in texts.iter().enumerate() {
        let probability = probabilities
            .get(index)
            .copied()
            .unwrap_or(crate::model::DEFAULT_AI_PROBABILITY);
        let class = ProbabilityBand::of(probability).css_class();
        let style = paragraph_style(paragraphs, index);
        html.push_str(&format!(
            "<p class=\"{class}\" style=\"{}\" data-ai-probability=\"{probability}\">{}</p>\n",
            escape_html(&style),
            escape_html(text).replace('\n', "<br>")
        ));
    }

    html.push_str("</body>\n</html>\n");
    html
}
