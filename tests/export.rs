mod common;

use std::io::{Cursor, Read};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use common::{docx, para, run, styled_run, styles, theme};
use docx_humanize::export::{self, DEFAULT_FILENAME, DOCX_MIME};
use docx_humanize::{Color, Error, LoadedDocument, Session, SessionState};

fn part(bytes: &[u8], name: &str) -> Option<String> {
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = zip.by_name(name).ok()?;
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    Some(content)
}

fn reextract(bytes: &[u8]) -> docx_humanize::Extraction {
    LoadedDocument::from_bytes(bytes).unwrap().extract().unwrap()
}

#[test]
fn exported_paragraphs_keep_style_and_drop_run_formatting() {
    let formatted = r#"<w:b/><w:i/><w:color w:val="FF0000"/><w:sz w:val="32"/><w:rFonts w:ascii="Arial"/>"#;
    let body = [
        para(Some("Normal"), &styled_run(formatted, "A")),
        para(Some("Normal"), &[styled_run("<w:u w:val=\"single\"/>", "B"), run("")].concat()),
    ]
    .concat();
    let source = docx(&body).styles(styles(&[("Normal", "Normal")])).build();

    let doc = LoadedDocument::from_bytes(&source).unwrap();
    let extraction = doc.extract().unwrap();
    let modified = vec!["A2".to_string(), "B2".to_string()];
    let bytes = export::export(&doc, &extraction.paragraphs, &modified).unwrap();

    let exported = reextract(&bytes);
    assert_eq!(exported.paragraphs.len(), 2);
    assert_eq!(exported.texts(), modified);
    for record in &exported.paragraphs {
        assert_eq!(record.style_name, "Normal");
        assert_eq!(record.runs.len(), 1);
        let run = &record.runs[0];
        assert_eq!(run.bold, None);
        assert_eq!(run.italic, None);
        assert_eq!(run.underline, None);
        assert_eq!(run.font_size, None);
        assert_eq!(run.font_name, None);
        assert_eq!(run.color, Color::NoColor);
    }
}

#[test]
fn named_styles_survive_the_round_trip() {
    let body = [
        para(Some("Heading1"), &run("Intro")),
        para(None, &run("Body text")),
        para(Some("Quote"), &run("Cited")),
    ]
    .concat();
    let source = docx(&body)
        .styles(styles(&[
            ("Normal", "Normal"),
            ("Heading1", "heading 1"),
            ("Quote", "Quote"),
        ]))
        .build();

    let mut session = Session::new();
    session.upload(&source).unwrap();
    session.edit(1, "Rewritten body").unwrap();
    let bytes = session.export().unwrap();

    let exported = reextract(&bytes);
    let names: Vec<&str> = exported
        .paragraphs
        .iter()
        .map(|p| p.style_name.as_str())
        .collect();
    assert_eq!(names, vec!["Heading 1", "Normal", "Quote"]);
    assert_eq!(exported.texts(), vec!["Intro", "Rewritten body", "Cited"]);
}

#[test]
fn alignment_is_not_carried_over() {
    let body = r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:t>centred</w:t></w:r></w:p>"#;
    let mut session = Session::new();
    session.upload(&docx(body).build()).unwrap();
    let bytes = session.export().unwrap();
    assert_eq!(
        reextract(&bytes).paragraphs[0].alignment,
        docx_humanize::Alignment::Unset
    );
}

#[test]
fn breaks_tabs_and_markup_characters_round_trip() {
    let mut session = Session::new();
    session.upload(&docx(&para(None, &run("x"))).build()).unwrap();
    session.edit(0, "a < b & \"c\"\nsecond\tline").unwrap();

    let bytes = session.export().unwrap();
    let document = part(&bytes, "word/document.xml").unwrap();
    assert!(document.contains("<w:br/>"));
    assert!(document.contains("<w:tab/>"));
    assert_eq!(reextract(&bytes).paragraphs[0].text, "a < b & \"c\"\nsecond\tline");
}

#[test]
fn source_without_style_sheet_gets_a_minimal_one() {
    let mut session = Session::new();
    session.upload(&docx(&para(None, &run("only"))).build()).unwrap();
    let bytes = session.export().unwrap();

    let styles = part(&bytes, "word/styles.xml").unwrap();
    assert!(styles.contains(r#"w:styleId="Normal""#));
    assert!(part(&bytes, "[Content_Types].xml").is_some());
    assert!(part(&bytes, "_rels/.rels").is_some());
    assert_eq!(reextract(&bytes).paragraphs[0].style_name, "Normal");
}

#[test]
fn theme_part_is_carried_over() {
    let source = docx(&para(None, &run("themed")))
        .theme(theme("Aptos Display", "Aptos", "4472C4"))
        .build();
    let mut session = Session::new();
    session.upload(&source).unwrap();
    let bytes = session.export().unwrap();

    assert!(part(&bytes, "word/theme/theme1.xml").is_some());
    let rels = part(&bytes, "word/_rels/document.xml.rels").unwrap();
    assert!(rels.contains(r#"Target="theme/theme1.xml""#));
    let types = part(&bytes, "[Content_Types].xml").unwrap();
    assert!(types.contains(r#"PartName="/word/theme/theme1.xml""#));
}

#[test]
fn export_without_document_fails_closed() {
    let mut session = Session::new();
    let err = session.export().unwrap_err();
    assert!(matches!(err, Error::NoDocument));
    assert_eq!(session.state(), SessionState::Empty);
    let messages = session.take_messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("no document"));
}

#[test]
fn data_uri_carries_the_package() {
    let mut session = Session::new();
    session.upload(&docx(&para(None, &run("link"))).build()).unwrap();
    let bytes = session.export().unwrap();

    let uri = export::data_uri(&bytes);
    let prefix = format!("data:{DOCX_MIME};base64,");
    assert!(uri.starts_with(&prefix));
    assert_eq!(BASE64.decode(&uri[prefix.len()..]).unwrap(), bytes);

    let link = export::download_link(&bytes, DEFAULT_FILENAME);
    assert!(link.starts_with("<a href=\"data:"));
    assert!(link.contains(r#"download="modified_document.docx""#));
}

#[test]
fn exported_file_reopens_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(DEFAULT_FILENAME);

    let mut session = Session::new();
    session.upload(&docx(&para(None, &run("persisted"))).build()).unwrap();
    std::fs::write(&path, session.export().unwrap()).unwrap();

    let extraction = LoadedDocument::open(&path).unwrap().extract().unwrap();
    assert_eq!(extraction.texts(), vec!["persisted".to_string()]);
}
