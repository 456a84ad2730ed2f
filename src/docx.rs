use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use log::{debug, info, warn};

use crate::error::Error;
use crate::model::{
    Alignment, Color, DEFAULT_AI_PROBABILITY, EMU_PER_POINT, Extraction, ParagraphRecord, RunStyle,
    pack_rgb,
};

pub(crate) const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const DML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

pub(crate) const DOCUMENT_PART: &str = "word/document.xml";
pub(crate) const STYLES_PART: &str = "word/styles.xml";

/// Font sizes in WordprocessingML are half-points.
/// Sizes too large to represent come back as `None`.
fn half_points_to_emu(half_points: u64) -> Option<u64> {
    half_points.checked_mul(EMU_PER_POINT).map(|emu| emu / 2)
}

fn parse_hex_color(val: &str) -> Option<[u8; 3]> {
    if val == "auto" || val.len() != 6 || !val.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(val.get(0..2)?, 16).ok()?;
    let g = u8::from_str_radix(val.get(2..4)?, 16).ok()?;
    let b = u8::from_str_radix(val.get(4..6)?, 16).ok()?;
    Some([r, g, b])
}

fn wml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(WML_NS))
}

fn wml_attr<'a>(node: roxmltree::Node<'a, 'a>, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| n.attribute((WML_NS, "val")))
}

fn is_wml(node: roxmltree::Node, name: &str) -> bool {
    node.tag_name().name() == name && node.tag_name().namespace() == Some(WML_NS)
}

fn dml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(DML_NS))
}

fn latin_typeface<'a>(node: roxmltree::Node<'a, 'a>) -> Option<&'a str> {
    dml(node, "latin")
        .and_then(|n| n.attribute("typeface"))
        .filter(|tf| !tf.is_empty())
}

/// An uploaded package, validated and held as the parts the extractor and
/// exporter need. Nothing is written to disk while loading.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    document_xml: String,
    styles_xml: Option<String>,
    theme: Option<(String, String)>,
}

fn read_part<R: Read + Seek>(
    zip: &mut zip::ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, Error> {
    let mut file = match zip.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(Some(content))
}

impl LoadedDocument {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes))?;

        let document_xml = read_part(&mut zip, DOCUMENT_PART)?
            .ok_or_else(|| Error::InvalidDocx(format!("missing {DOCUMENT_PART}")))?;

        {
            let xml = roxmltree::Document::parse(&document_xml)?;
            let root = xml.root_element();
            if !is_wml(root, "document") {
                return Err(Error::InvalidDocx("root element is not w:document".into()));
            }
            if wml(root, "body").is_none() {
                return Err(Error::InvalidDocx("missing w:body".into()));
            }
        }

        let styles_xml = read_part(&mut zip, STYLES_PART)?;

        let names: Vec<String> = zip.file_names().map(|s| s.to_string()).collect();
        let theme = match names
            .iter()
            .find(|n| n.starts_with("word/theme/") && n.ends_with(".xml"))
        {
            Some(name) => read_part(&mut zip, name)?.map(|xml| (name.clone(), xml)),
            None => None,
        };

        info!(
            "loaded package: {} entries, styles: {}, theme: {}",
            zip.len(),
            styles_xml.is_some(),
            theme.is_some()
        );

        Ok(LoadedDocument { document_xml, styles_xml, theme })
    }

    pub fn open(path: &Path) -> Result<Self, Error> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub(crate) fn styles_xml(&self) -> Option<&str> {
        self.styles_xml.as_deref()
    }

    /// Package path and content of the theme part, when the package has one.
    pub(crate) fn theme_part(&self) -> Option<(&str, &str)> {
        self.theme
            .as_ref()
            .map(|(name, xml)| (name.as_str(), xml.as_str()))
    }

    /// Walks the body paragraphs and records text, named style, alignment
    /// and direct run formatting for every paragraph with visible text.
    pub fn extract(&self) -> Result<Extraction, Error> {
        let theme = self
            .theme
            .as_ref()
            .map(|(_, xml)| parse_theme(xml))
            .unwrap_or_default();
        let sheet = self
            .styles_xml
            .as_deref()
            .map(parse_styles)
            .unwrap_or_default();

        let xml = roxmltree::Document::parse(&self.document_xml)?;
        let body = wml(xml.root_element(), "body")
            .ok_or_else(|| Error::InvalidDocx("missing w:body".into()))?;

        let mut paragraphs = Vec::new();
        for node in body.children().filter(|n| is_wml(*n, "p")) {
            let runs: Vec<RunStyle> = paragraph_runs(node)
                .map(|run| extract_run(run, &theme))
                .collect();
            let text: String = runs.iter().map(|r| r.text.as_str()).collect();
            if text.trim().is_empty() {
                continue;
            }

            let ppr = wml(node, "pPr");
            let style_id = ppr
                .and_then(|ppr| wml_attr(ppr, "pStyle"))
                .map(str::to_string);
            let style_name = sheet.display_name(style_id.as_deref());
            let alignment = ppr
                .and_then(|ppr| wml_attr(ppr, "jc"))
                .map(parse_alignment)
                .unwrap_or(Alignment::Unset);

            debug!(
                "paragraph {}: style {:?}, {:?}, {} runs",
                paragraphs.len(),
                style_name,
                alignment,
                runs.len()
            );
            paragraphs.push(ParagraphRecord { text, style_id, style_name, alignment, runs });
        }

        let ai_probabilities = vec![DEFAULT_AI_PROBABILITY; paragraphs.len()];
        Ok(Extraction { paragraphs, ai_probabilities })
    }
}

fn parse_alignment(val: &str) -> Alignment {
    match val {
        "left" | "start" => Alignment::Left,
        "center" => Alignment::Center,
        "right" | "end" => Alignment::Right,
        "both" | "distribute" => Alignment::Justify,
        _ => Alignment::Unset,
    }
}

/// Direct runs plus the runs nested in hyperlinks, in document order.
fn paragraph_runs<'a>(
    para: roxmltree::Node<'a, 'a>,
) -> impl Iterator<Item = roxmltree::Node<'a, 'a>> {
    para.children().flat_map(|child| {
        let nested: Vec<_> = if is_wml(child, "r") {
            vec![child]
        } else if is_wml(child, "hyperlink") {
            child.children().filter(|n| is_wml(*n, "r")).collect()
        } else {
            Vec::new()
        };
        nested
    })
}

fn run_text(run: roxmltree::Node) -> String {
    let mut text = String::new();
    for child in run.children() {
        if child.tag_name().namespace() != Some(WML_NS) {
            continue;
        }
        match child.tag_name().name() {
            "t" => text.push_str(child.text().unwrap_or("")),
            "tab" => text.push('\t'),
            "br" | "cr" => text.push('\n'),
            _ => {}
        }
    }
    text
}

fn toggle(rpr: Option<roxmltree::Node>, name: &str) -> Option<bool> {
    let node = wml(rpr?, name)?;
    Some(!matches!(
        node.attribute((WML_NS, "val")),
        Some("0" | "false" | "off")
    ))
}

fn underline(rpr: Option<roxmltree::Node>) -> Option<bool> {
    let node = wml(rpr?, "u")?;
    Some(node.attribute((WML_NS, "val")) != Some("none"))
}

fn extract_run(run: roxmltree::Node, theme: &Theme) -> RunStyle {
    let rpr = wml(run, "rPr");

    let font_size = rpr
        .and_then(|n| wml_attr(n, "sz"))
        .and_then(|v| v.parse::<u64>().ok())
        .and_then(half_points_to_emu);

    let font_name = rpr
        .and_then(|n| wml(n, "rFonts"))
        .and_then(|rfonts| theme.resolve_font(rfonts));

    RunStyle {
        text: run_text(run),
        bold: toggle(rpr, "b"),
        italic: toggle(rpr, "i"),
        underline: underline(rpr),
        font_size,
        font_name,
        color: run_color(rpr, theme),
    }
}

/// Any colour value that cannot be read leaves the run colourless.
fn run_color(rpr: Option<roxmltree::Node>, theme: &Theme) -> Color {
    let Some(node) = rpr.and_then(|n| wml(n, "color")) else {
        return Color::NoColor;
    };

    if let Some(theme_color) = node.attribute((WML_NS, "themeColor"))
        && let Some(packed) = theme.colors.get(scheme_slot(theme_color))
    {
        return Color::PackedInt(*packed);
    }

    match node.attribute((WML_NS, "val")) {
        None | Some("auto") => {}
        Some(val) => match parse_hex_color(val) {
            Some([r, g, b]) => return Color::from_rgb(r, g, b),
            None => warn!("ignoring unreadable run colour {val:?}"),
        },
    }

    match node.attribute((WML_NS, "themeColor")) {
        Some(name) => Color::Named(name.to_string()),
        None => Color::NoColor,
    }
}

/// Maps a `w:themeColor` value onto the colour-scheme slot that defines it.
pub(crate) fn scheme_slot(theme_color: &str) -> &str {
    match theme_color {
        "text1" | "dark1" => "dk1",
        "background1" | "light1" => "lt1",
        "text2" | "dark2" => "dk2",
        "background2" | "light2" => "lt2",
        "hyperlink" => "hlink",
        "followedHyperlink" => "folHlink",
        other => other,
    }
}

#[derive(Default)]
struct Theme {
    major: Option<String>,
    minor: Option<String>,
    colors: HashMap<String, u32>,
}

impl Theme {
    fn resolve_font(&self, rfonts: roxmltree::Node) -> Option<String> {
        if let Some(f) = rfonts.attribute((WML_NS, "ascii")) {
            return Some(f.to_string());
        }
        match rfonts.attribute((WML_NS, "asciiTheme")) {
            Some("majorHAnsi" | "majorAscii") => self.major.clone(),
            Some("minorHAnsi" | "minorAscii") => self.minor.clone(),
            _ => None,
        }
    }
}

fn parse_theme(xml_content: &str) -> Theme {
    let mut theme = Theme::default();
    let Ok(xml) = roxmltree::Document::parse(xml_content) else {
        warn!("theme part is not well-formed XML; theme references stay unresolved");
        return theme;
    };

    for node in xml.descendants() {
        if node.tag_name().namespace() != Some(DML_NS) {
            continue;
        }
        match node.tag_name().name() {
            "majorFont" => theme.major = latin_typeface(node).map(str::to_string),
            "minorFont" => theme.minor = latin_typeface(node).map(str::to_string),
            "clrScheme" => {
                for slot in node.children().filter(|n| n.is_element()) {
                    let hex = dml(slot, "srgbClr")
                        .and_then(|n| n.attribute("val"))
                        .or_else(|| dml(slot, "sysClr").and_then(|n| n.attribute("lastClr")));
                    if let Some([r, g, b]) = hex.and_then(parse_hex_color) {
                        theme
                            .colors
                            .insert(slot.tag_name().name().to_string(), pack_rgb(r, g, b));
                    }
                }
            }
            _ => {}
        }
    }

    theme
}

#[derive(Default)]
struct StyleSheet {
    names: HashMap<String, String>,
    default_paragraph: Option<String>,
}

impl StyleSheet {
    fn display_name(&self, style_id: Option<&str>) -> String {
        let name = match style_id {
            Some(id) => self.names.get(id).cloned().unwrap_or_else(|| id.to_string()),
            None => self
                .default_paragraph
                .clone()
                .unwrap_or_else(|| "Normal".to_string()),
        };
        ui_style_name(&name)
    }
}

/// Word stores some built-in style names in lowercase; the UI shows them
/// capitalised.
fn ui_style_name(name: &str) -> String {
    let builtin = name.starts_with("heading ")
        || matches!(
            name,
            "caption" | "footer" | "header" | "normal" | "title" | "subtitle" | "body text"
        );
    if !builtin {
        return name.to_string();
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn parse_styles(xml_content: &str) -> StyleSheet {
    let mut sheet = StyleSheet::default();
    let Ok(xml) = roxmltree::Document::parse(xml_content) else {
        warn!("style sheet is not well-formed XML; style ids are reported as names");
        return sheet;
    };

    for style_node in xml.root_element().children() {
        if !is_wml(style_node, "style") {
            continue;
        }
        if style_node.attribute((WML_NS, "type")) != Some("paragraph") {
            continue;
        }
        let Some(style_id) = style_node.attribute((WML_NS, "styleId")) else {
            continue;
        };
        let name = wml_attr(style_node, "name").unwrap_or(style_id).to_string();
        if matches!(style_node.attribute((WML_NS, "default")), Some("1" | "true")) {
            sheet.default_paragraph = Some(name.clone());
        }
        sheet.names.insert(style_id.to_string(), name);
    }

    sheet
}
