//! OPML outline → markdown conversion.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Convert an OPML outline document to markdown text.
///
/// Each `<outline>` element becomes a heading at its nesting depth (capped
/// at level 6) and its `_note` attribute becomes body paragraphs. Malformed
/// XML ends the conversion with whatever was collected so far.
pub fn opml_to_markdown(source: &str) -> String {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(true);

    let mut out = String::new();
    let mut depth: usize = 0;
    let mut in_body = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"body" => in_body = true,
                b"outline" if in_body => {
                    depth += 1;
                    write_outline(&mut out, &e, depth);
                }
                _ => {}
            },
            Ok(Event::Empty(e)) if in_body && e.name().as_ref() == b"outline" => {
                write_outline(&mut out, &e, depth + 1);
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"outline" => depth = depth.saturating_sub(1),
                b"body" => in_body = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
    }
    out
}

fn write_outline(out: &mut String, element: &BytesStart, depth: usize) {
    let mut text = String::new();
    let mut note = String::new();
    for attr in element.attributes().flatten() {
        let value = attr.unescape_value().unwrap_or_default();
        match attr.key.as_ref() {
            b"text" => text = value.into_owned(),
            b"_note" => note = value.into_owned(),
            _ => {}
        }
    }

    if !text.is_empty() {
        let level = depth.min(6);
        for _ in 0..level {
            out.push('#');
        }
        out.push(' ');
        out.push_str(&text);
        out.push_str("\n\n");
    }
    if !note.is_empty() {
        out.push_str(&note);
        out.push_str("\n\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outline_becomes_headings() {
        let opml = r#"<?xml version="1.0"?>
<opml version="1.0">
  <head><title>Test</title></head>
  <body>
    <outline text="Chapter One" _note="Some body text.">
      <outline text="Section A"/>
    </outline>
    <outline text="Chapter Two"/>
  </body>
</opml>"#;
        let md = opml_to_markdown(opml);
        assert!(md.contains("# Chapter One"));
        assert!(md.contains("Some body text."));
        assert!(md.contains("## Section A"));
        assert!(md.contains("# Chapter Two"));
    }

    #[test]
    fn entities_in_attributes_unescaped() {
        let opml = r#"<opml><body><outline text="A &amp; B"/></body></opml>"#;
        let md = opml_to_markdown(opml);
        assert!(md.contains("# A & B"));
    }

    #[test]
    fn malformed_xml_degrades() {
        let md = opml_to_markdown("<opml><body><outline text=\"ok\"/><broken");
        assert!(md.contains("# ok"));
    }

    #[test]
    fn depth_caps_at_six() {
        let mut opml = String::from("<opml><body>");
        for i in 0..8 {
            opml.push_str(&format!("<outline text=\"L{i}\">"));
        }
        for _ in 0..8 {
            opml.push_str("</outline>");
        }
        opml.push_str("</body></opml>");
        let md = opml_to_markdown(&opml);
        assert!(md.contains("###### L5"));
        assert!(md.contains("###### L7"));
        assert!(!md.contains("####### "));
    }
}
