//! iThoughts (ITMZ) map → markdown conversion.
//!
//! An `.itmz` file on disk is a zip archive whose `mapdata.xml` holds a
//! `<topic>` tree; the string API accepts that XML text directly (the CLI
//! unpacks the archive).

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Convert iThoughts map XML to markdown text.
///
/// Topics become headings at their nesting depth (capped at level 6);
/// `note` attributes become body paragraphs.
pub fn itmz_to_markdown(source: &str) -> String {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(true);

    let mut out = String::new();
    let mut depth: usize = 0;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"topic" => {
                depth += 1;
                write_topic(&mut out, &e, depth);
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"topic" => {
                write_topic(&mut out, &e, depth + 1);
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"topic" => {
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
    }
    out
}

fn write_topic(out: &mut String, element: &BytesStart, depth: usize) {
    let mut text = String::new();
    let mut note = String::new();
    for attr in element.attributes().flatten() {
        let value = attr.unescape_value().unwrap_or_default();
        match attr.key.as_ref() {
            b"text" => text = value.into_owned(),
            b"note" => note = value.into_owned(),
            _ => {}
        }
    }

    if !text.is_empty() {
        let level = depth.min(6);
        for _ in 0..level {
            out.push('#');
        }
        out.push(' ');
        // Topic text may span lines; only the first line titles the heading.
        let mut lines = text.lines();
        out.push_str(lines.next().unwrap_or(""));
        out.push_str("\n\n");
        let rest: Vec<&str> = lines.collect();
        if !rest.is_empty() {
            out.push_str(&rest.join("\n"));
            out.push_str("\n\n");
        }
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
    fn topics_become_headings() {
        let xml = r#"<itmz>
  <topics>
    <topic text="Root Idea" note="Details here.">
      <topic text="Child"/>
    </topic>
  </topics>
</itmz>"#;
        let md = itmz_to_markdown(xml);
        assert!(md.contains("# Root Idea"));
        assert!(md.contains("Details here."));
        assert!(md.contains("## Child"));
    }

    #[test]
    fn multiline_topic_text_splits() {
        let xml = "<itmz><topic text=\"Title\nbody line\"/></itmz>";
        let md = itmz_to_markdown(xml);
        assert!(md.contains("# Title"));
        assert!(md.contains("body line"));
    }
}
