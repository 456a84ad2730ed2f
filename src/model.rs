use serde::Serialize;

/// English Metric Units per typographic point.
pub const EMU_PER_POINT: u64 = 12_700;

/// Probability assigned to every paragraph right after upload.
pub const DEFAULT_AI_PROBABILITY: u8 = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
    Unset,
}

impl Alignment {
    /// Numeric code used by Word's paragraph alignment enumeration
    /// (left 0, center 1, right 2, justify 3).
    pub fn code(self) -> Option<u8> {
        match self {
            Alignment::Left => Some(0),
            Alignment::Center => Some(1),
            Alignment::Right => Some(2),
            Alignment::Justify => Some(3),
            Alignment::Unset => None,
        }
    }
}

pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    u32::from(r) | u32::from(g) << 8 | u32::from(b) << 16
}

/// Run colour, decided once at extraction time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Color {
    NoColor,
    /// Red in the low byte: `r | g << 8 | b << 16`.
    PackedInt(u32),
    /// Theme colour name that the package theme could not resolve.
    Named(String),
}

impl Color {
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Color::PackedInt(pack_rgb(r, g, b))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunStyle {
    pub text: String,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub font_size: Option<u64>, // EMU
    pub font_name: Option<String>,
    pub color: Color,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParagraphRecord {
    pub text: String,
    pub style_id: Option<String>,
    pub style_name: String,
    pub alignment: Alignment,
    pub runs: Vec<RunStyle>,
}

/// Output of one extraction pass: the records and a probability per record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub paragraphs: Vec<ParagraphRecord>,
    pub ai_probabilities: Vec<u8>,
}

impl Extraction {
    pub fn texts(&self) -> Vec<String> {
        self.paragraphs.iter().map(|p| p.text.clone()).collect()
    }
}
