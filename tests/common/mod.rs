#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{Cursor, Write};

use docx_humanize::Error;
use docx_humanize::rewrite::{HttpReply, Transport};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

pub struct DocxBuilder {
    body: String,
    styles: Option<String>,
    theme: Option<String>,
}

/// Package whose body is `body` (already-serialised `w:p` elements).
pub fn docx(body: &str) -> DocxBuilder {
    DocxBuilder { body: body.to_string(), styles: None, theme: None }
}

impl DocxBuilder {
    pub fn styles(mut self, xml: String) -> Self {
        self.styles = Some(xml);
        self
    }

    pub fn theme(mut self, xml: String) -> Self {
        self.theme = Some(xml);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body>{}<w:sectPr/></w:body></w:document>"#,
            self.body
        );

        let mut parts = vec![
            ("[Content_Types].xml", CONTENT_TYPES.to_string()),
            ("_rels/.rels", ROOT_RELS.to_string()),
            ("word/document.xml", document),
        ];
        if let Some(styles) = self.styles {
            parts.push(("word/styles.xml", styles));
        }
        if let Some(theme) = self.theme {
            parts.push(("word/theme/theme1.xml", theme));
        }
        zip_parts(&parts)
    }
}

pub fn zip_parts(parts: &[(&str, String)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, data) in parts {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// `w:p` with an optional style id and the given raw run XML.
pub fn para(style_id: Option<&str>, runs: &str) -> String {
    let ppr = style_id
        .map(|id| format!(r#"<w:pPr><w:pStyle w:val="{id}"/></w:pPr>"#))
        .unwrap_or_default();
    format!("<w:p>{ppr}{runs}</w:p>")
}

/// Plain run.
pub fn run(text: &str) -> String {
    format!(r#"<w:r><w:t xml:space="preserve">{text}</w:t></w:r>"#)
}

/// Run with raw `w:rPr` children.
pub fn styled_run(rpr: &str, text: &str) -> String {
    format!(r#"<w:r><w:rPr>{rpr}</w:rPr><w:t xml:space="preserve">{text}</w:t></w:r>"#)
}

/// Style sheet of paragraph styles `(id, name)`; the first one is the default.
pub fn styles(entries: &[(&str, &str)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
    );
    for (i, (id, name)) in entries.iter().enumerate() {
        let default = if i == 0 { r#" w:default="1""# } else { "" };
        xml.push_str(&format!(
            r#"<w:style w:type="paragraph"{default} w:styleId="{id}"><w:name w:val="{name}"/></w:style>"#
        ));
    }
    xml.push_str("</w:styles>");
    xml
}

pub fn theme(major: &str, minor: &str, accent1: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements><a:clrScheme name="Office"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1><a:accent1><a:srgbClr val="{accent1}"/></a:accent1></a:clrScheme><a:fontScheme name="Office"><a:majorFont><a:latin typeface="{major}"/></a:majorFont><a:minorFont><a:latin typeface="{minor}"/></a:minorFont></a:fontScheme></a:themeElements></a:theme>"#
    )
}

/// Completion envelope whose assistant message is `content`.
pub fn completion(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-test",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

pub fn ok(content: &str) -> Result<HttpReply, Error> {
    Ok(HttpReply { status: 200, body: completion(content) })
}

pub fn status(status: u16, body: &str) -> Result<HttpReply, Error> {
    Ok(HttpReply { status, body: body.to_string() })
}

pub fn connection_refused() -> Result<HttpReply, Error> {
    Err(Error::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "connection refused",
    )))
}

#[derive(Debug, Clone)]
pub struct SentRequest {
    pub url: String,
    pub api_key: String,
    pub body: serde_json::Value,
}

impl SentRequest {
    pub fn system(&self) -> &str {
        self.body["messages"][0]["content"].as_str().unwrap()
    }

    pub fn user(&self) -> &str {
        self.body["messages"][1]["content"].as_str().unwrap()
    }
}

/// Hands out scripted replies in order and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: RefCell<VecDeque<Result<HttpReply, Error>>>,
    pub requests: RefCell<Vec<SentRequest>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Result<HttpReply, Error>>) -> Self {
        ScriptedTransport {
            replies: RefCell::new(replies.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.requests.borrow().clone()
    }
}

impl Transport for ScriptedTransport {
    fn post_json(&self, url: &str, api_key: &str, body: String) -> Result<HttpReply, Error> {
        self.requests.borrow_mut().push(SentRequest {
            url: url.to_string(),
            api_key: api_key.to_string(),
            body: serde_json::from_str(&body).unwrap(),
        });
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| status(500, "no scripted reply"))
    }
}
