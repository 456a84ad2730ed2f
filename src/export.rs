use std::io::{Cursor, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::{debug, info};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::docx::{DOCUMENT_PART, LoadedDocument, STYLES_PART};
use crate::error::Error;
use crate::model::ParagraphRecord;

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const DEFAULT_FILENAME: &str = "modified_document.docx";

const MINIMAL_STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style></w:styles>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const SECTION_PROPERTIES: &str = r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr>"#;

fn xml_escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // XML 1.0 forbids the remaining C0 controls
            c if c < '\u{20}' && !matches!(c, '\t' | '\n' | '\r') => {}
            _ => out.push(ch),
        }
    }
    out
}

/// One unformatted run; line breaks and tabs become `w:br` and `w:tab`.
fn run_xml(text: &str) -> String {
    let mut xml = String::from("<w:r>");
    let mut pending = String::new();
    let flush = |xml: &mut String, pending: &mut String| {
        if !pending.is_empty() {
            xml.push_str(&format!(
                "<w:t xml:space=\"preserve\">{}</w:t>",
                xml_escape_text(pending.as_str())
            ));
            pending.clear();
        }
    };
    for ch in text.chars() {
        match ch {
            '\n' => {
                flush(&mut xml, &mut pending);
                xml.push_str("<w:br/>");
            }
            '\t' => {
                flush(&mut xml, &mut pending);
                xml.push_str("<w:tab/>");
            }
            '\r' => {}
            _ => pending.push(ch),
        }
    }
    flush(&mut xml, &mut pending);
    xml.push_str("</w:r>");
    xml
}

fn paragraph_xml(record: &ParagraphRecord, text: &str) -> String {
    let mut xml = String::from("<w:p>");
    if let Some(style_id) = &record.style_id {
        xml.push_str(&format!(
            "<w:pPr><w:pStyle w:val=\"{}\"/></w:pPr>",
            xml_escape_text(style_id)
        ));
    }
    xml.push_str(&run_xml(text));
    xml.push_str("</w:p>");
    xml
}

fn document_xml(paragraphs: &[ParagraphRecord], modified: &[String]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>",
    );
    for (record, text) in paragraphs.iter().zip(modified) {
        xml.push_str(&paragraph_xml(record, text));
    }
    xml.push_str(SECTION_PROPERTIES);
    xml.push_str("</w:body></w:document>");
    xml
}

fn content_types_xml(theme_part: Option<&str>) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
         <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
         <Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\
         <Override PartName=\"/word/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml\"/>",
    );
    if let Some(name) = theme_part {
        xml.push_str(&format!(
            "<Override PartName=\"/{name}\" ContentType=\"application/vnd.openxmlformats-officedocument.theme+xml\"/>"
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn document_rels_xml(theme_part: Option<&str>) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
         <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>",
    );
    if let Some(name) = theme_part {
        let target = name.strip_prefix("word/").unwrap_or(name);
        xml.push_str(&format!(
            "<Relationship Id=\"rId2\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme\" Target=\"{target}\"/>"
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

/// Builds a fresh package holding one paragraph per record, in order, with
/// the record's named style and `modified[i]` as its only, unformatted run.
/// The source style sheet and theme are carried over so style references
/// resolve. Returns the finished package bytes.
pub fn export(
    source: &LoadedDocument,
    paragraphs: &[ParagraphRecord],
    modified: &[String],
) -> Result<Vec<u8>, Error> {
    let theme = source.theme_part();
    let theme_name = theme.map(|(name, _)| name);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut parts: Vec<(&str, String)> = vec![
        ("[Content_Types].xml", content_types_xml(theme_name)),
        ("_rels/.rels", ROOT_RELS.to_string()),
        (DOCUMENT_PART, document_xml(paragraphs, modified)),
        ("word/_rels/document.xml.rels", document_rels_xml(theme_name)),
        (
            STYLES_PART,
            source.styles_xml().unwrap_or(MINIMAL_STYLES).to_string(),
        ),
    ];
    if let Some((name, xml)) = theme {
        parts.push((name, xml.to_string()));
    }

    for (name, data) in &parts {
        debug!("writing {name} ({} bytes)", data.len());
        zip.start_file(*name, options)?;
        zip.write_all(data.as_bytes())?;
    }

    let bytes = zip.finish()?.into_inner();
    info!(
        "exported {} paragraphs ({} bytes)",
        paragraphs.len().min(modified.len()),
        bytes.len()
    );
    Ok(bytes)
}

pub fn data_uri(bytes: &[u8]) -> String {
    format!("data:{DOCX_MIME};base64,{}", BASE64.encode(bytes))
}

/// Anchor element that downloads `bytes` as `filename`.
pub fn download_link(bytes: &[u8], filename: &str) -> String {
    format!(
        "<a href=\"{}\" download=\"{}\">Download the modified document</a>",
        data_uri(bytes),
        xml_escape_text(filename)
    )
}
